//! The `env` section: copies and links, a directory tree, then commands.
use std::path::Path;

use super::{Context, Outcomes, Provider, SectionProvider};
use crate::config::env::{CopyEntry, DirTreeConfig, EnvPattern, ExecAction, ExecEntry};
use crate::error::ProviderError;
use crate::operations::OperationResult;
use crate::resources::command::{ShellCommand, ShellInput, resolve_shell};
use crate::resources::converge;
use crate::resources::copy::{CopyResource, LinkResource, resolve_dest};
use crate::resources::dirtree::build_tree;

/// Applies the `env` section.
///
/// Copies run first, then the directory tree, then commands.  The first
/// failing action stops the provider.
#[derive(Debug, Clone)]
pub struct EnvProvider {
    pattern: EnvPattern,
}

impl SectionProvider for EnvProvider {
    const SECTION_KEY: &'static str = "env";
    const PRIORITY: u32 = 2;
    type Pattern = EnvPattern;

    fn from_pattern(pattern: EnvPattern) -> Self {
        Self { pattern }
    }
}

fn copy(ctx: &Context, entry: &CopyEntry) -> OperationResult {
    let source = match ctx.environment.contain_direct_child(Path::new(&entry.source)) {
        Ok(path) => path,
        Err(e) => return OperationResult::failed(e.to_string()),
    };
    let dest = match resolve_dest(&entry.dest, &source) {
        Ok(path) => path,
        Err(e) => return OperationResult::failed(format!("{e:#}")),
    };

    if entry.as_link {
        ctx.log.info(&format!("link {} -> {}", dest.display(), source.display()));
        converge(&LinkResource::new(source, dest), ctx.force)
    } else {
        ctx.log.info(&format!("copy {} -> {}", source.display(), dest.display()));
        converge(&CopyResource::new(source, dest), ctx.force)
    }
}

fn dirtree(ctx: &Context, tree: &DirTreeConfig) -> OperationResult {
    let nodes = match tree.nodes() {
        Ok(nodes) => nodes,
        Err(errors) => {
            let reasons: Vec<String> = errors.iter().map(ToString::to_string).collect();
            return OperationResult::failed(reasons.join("; "));
        }
    };
    let root = tree.root_path(&ctx.platform.user.home);
    let owner = (ctx.platform.is_root() && ctx.platform.runs_as_other_user())
        .then_some((ctx.platform.user.uid, ctx.platform.user.gid));

    ctx.log.info(&format!("directory tree under {}", root.display()));
    let result = build_tree(&root, &nodes, owner);
    if let Some(created) = &result.data {
        ctx.log.debug(&format!("{created} directories created"));
    }
    result
}

fn exec(ctx: &Context, entry: &ExecEntry) -> OperationResult {
    let input = match entry.action() {
        Some(ExecAction::Command(cmd)) => ShellInput::Inline(cmd.to_string()),
        Some(ExecAction::Script(script)) => match ctx.environment.contain(Path::new(script)) {
            Ok(path) => ShellInput::Script(path),
            Err(e) => return OperationResult::failed(e.to_string()),
        },
        None => {
            return OperationResult::failed("exec entry needs exactly one of 'command' or 'script'");
        }
    };
    let shell = match resolve_shell(ctx.executor.as_ref(), entry.shell.as_deref()) {
        Ok(shell) => shell,
        Err(result) => return result,
    };
    let run_as = (!entry.as_root && ctx.platform.runs_as_other_user())
        .then(|| ctx.platform.user.name.clone());

    let command = ShellCommand {
        input,
        shell,
        env: entry
            .env
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
        run_as,
        workdir: ctx.environment.folder_path().to_path_buf(),
    };
    match &command.input {
        ShellInput::Inline(cmd) => ctx.log.info(&format!("exec {cmd}")),
        ShellInput::Script(path) => ctx.log.info(&format!("exec {}", path.display())),
    }
    command.run(ctx.executor.as_ref())
}

impl Provider for EnvProvider {
    fn section_key(&self) -> &'static str {
        Self::SECTION_KEY
    }

    fn priority(&self) -> u32 {
        Self::PRIORITY
    }

    fn apply(&self, ctx: &Context) -> Result<Vec<OperationResult>, ProviderError> {
        let mut outcomes = Outcomes::new(Self::SECTION_KEY);

        for entry in &self.pattern.copies {
            outcomes.push(copy(ctx, entry))?;
        }

        if let Some(tree) = &self.pattern.dirtree {
            outcomes.push(dirtree(ctx, tree))?;
        }

        for entry in &self.pattern.exec {
            outcomes.push(exec(ctx, entry))?;
        }

        Ok(outcomes.finish())
    }
}
