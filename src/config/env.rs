//! Pattern for the `[env]` section: copy/link, directory tree and exec.
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::validation::{ConfigValidator, ValidationError, normalize_mode};

/// Permission mode for directory nodes that do not set one.
pub const DEFAULT_DIR_MODE: &str = "755";

/// Key inside a tree node holding the node's own permission mode.
const MODE_KEY: &str = "mode";

/// Validated shape of the `[env]` section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EnvPattern {
    /// Files to copy or link, in order.
    #[serde(default, rename = "copy")]
    pub copies: Vec<CopyEntry>,
    /// Directory tree to create.
    #[serde(default)]
    pub dirtree: Option<DirTreeConfig>,
    /// Commands and scripts to run, in order.
    #[serde(default)]
    pub exec: Vec<ExecEntry>,
}

/// Place a file from the environment folder somewhere on the machine.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CopyEntry {
    /// File name relative to the environment folder.
    pub source: String,
    /// Destination path; relative paths are taken from the current directory.
    pub dest: String,
    /// Create a symlink instead of copying bytes.
    #[serde(default)]
    pub as_link: bool,
}

/// A nested directory tree to create.
///
/// ```toml
/// [env.dirtree]
/// root = "~"
/// [env.dirtree.tree.projects]
/// mode = "0750"
/// [env.dirtree.tree.projects.work]
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DirTreeConfig {
    /// Tree root; defaults to the invoking user's home.
    #[serde(default)]
    pub root: Option<String>,
    /// Nested tables, one per directory.
    #[serde(default)]
    pub tree: toml::Table,
}

/// One directory in a [`DirTreeConfig`], with its normalized mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirNode {
    /// Directory name.
    pub name: String,
    /// Normalized octal mode (`"755"`).
    pub mode: String,
    /// Subdirectories.
    pub children: Vec<DirNode>,
}

impl DirTreeConfig {
    /// Build the node tree, collecting every malformed node.
    ///
    /// # Errors
    ///
    /// Returns all violations when any node is malformed.
    pub fn nodes(&self) -> Result<Vec<DirNode>, Vec<ValidationError>> {
        let mut errors = Vec::new();
        let nodes = parse_nodes(&self.tree, "dirtree.tree", true, &mut errors);
        if errors.is_empty() {
            Ok(nodes)
        } else {
            Err(errors)
        }
    }

    /// Resolve the tree root: `~` expands to `home`, relative paths are
    /// taken from `home`, and an absent root means `home` itself.
    #[must_use]
    pub fn root_path(&self, home: &Path) -> PathBuf {
        let Some(root) = self.root.as_deref() else {
            return home.to_path_buf();
        };
        if root == "~" {
            return home.to_path_buf();
        }
        if let Some(rest) = root.strip_prefix("~/") {
            return home.join(rest);
        }
        home.join(root)
    }
}

fn parse_nodes(
    table: &toml::Table,
    prefix: &str,
    is_root: bool,
    errors: &mut Vec<ValidationError>,
) -> Vec<DirNode> {
    let mut nodes = Vec::new();

    for (name, value) in table {
        let field = format!("{prefix}.{name}");
        match value {
            toml::Value::String(_) if name == MODE_KEY && !is_root => {}
            toml::Value::Table(children) => {
                if name.is_empty() || name == "." || name == ".." || name.contains('/') {
                    errors.push(ValidationError::new(
                        &field,
                        "directory name must be a single path component",
                    ));
                    continue;
                }
                let mode = match children.get(MODE_KEY) {
                    Some(toml::Value::String(raw)) => normalize_mode(raw).unwrap_or_else(|msg| {
                        errors.push(ValidationError::new(format!("{field}.{MODE_KEY}"), msg));
                        DEFAULT_DIR_MODE.to_string()
                    }),
                    _ => DEFAULT_DIR_MODE.to_string(),
                };
                nodes.push(DirNode {
                    name: name.clone(),
                    mode,
                    children: parse_nodes(children, &field, false, errors),
                });
            }
            toml::Value::String(_) => errors.push(ValidationError::new(
                &field,
                "a mode needs an enclosing directory",
            )),
            other => errors.push(ValidationError::new(
                &field,
                format!(
                    "expected a table of subdirectories, found {}",
                    other.type_str()
                ),
            )),
        }
    }

    nodes
}

/// A command to run through a shell.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExecEntry {
    /// Inline command line.
    #[serde(default, alias = "cmd")]
    pub command: Option<String>,
    /// Script path relative to the environment folder.
    #[serde(default)]
    pub script: Option<String>,
    /// Shell to run with instead of `/bin/sh`.
    #[serde(default)]
    pub shell: Option<String>,
    /// Extra environment variables.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Keep root privileges instead of dropping to the invoking user.
    #[serde(default)]
    pub as_root: bool,
}

/// What an [`ExecEntry`] runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecAction<'a> {
    /// Inline command text.
    Command(&'a str),
    /// Script path relative to the environment folder.
    Script(&'a str),
}

impl ExecEntry {
    /// The action to run, or `None` when the entry is ambiguous.
    #[must_use]
    pub fn action(&self) -> Option<ExecAction<'_>> {
        match (&self.command, &self.script) {
            (Some(cmd), None) => Some(ExecAction::Command(cmd)),
            (None, Some(script)) => Some(ExecAction::Script(script)),
            _ => None,
        }
    }
}

fn is_env_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl ConfigValidator for EnvPattern {
    fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        for (i, copy) in self.copies.iter().enumerate() {
            if copy.source.trim().is_empty() {
                errors.push(ValidationError::new(
                    format!("copy[{i}].source"),
                    "must not be empty",
                ));
            }
            if copy.dest.trim().is_empty() {
                errors.push(ValidationError::new(
                    format!("copy[{i}].dest"),
                    "must not be empty",
                ));
            }
        }

        if let Some(dirtree) = &self.dirtree
            && let Err(tree_errors) = dirtree.nodes()
        {
            errors.extend(tree_errors);
        }

        for (i, exec) in self.exec.iter().enumerate() {
            let field = format!("exec[{i}]");
            match (&exec.command, &exec.script) {
                (Some(_), Some(_)) => errors.push(ValidationError::new(
                    &field,
                    "set either 'command' or 'script', not both",
                )),
                (None, None) => errors.push(ValidationError::new(
                    &field,
                    "one of 'command' or 'script' is required",
                )),
                (Some(value), None) | (None, Some(value)) if value.trim().is_empty() => {
                    errors.push(ValidationError::new(&field, "command or script is empty"));
                }
                _ => {}
            }
            if exec.shell.as_deref().is_some_and(|s| s.trim().is_empty()) {
                errors.push(ValidationError::new(
                    format!("{field}.shell"),
                    "must not be empty",
                ));
            }
            for name in exec.env.keys().filter(|k| !is_env_name(k)) {
                errors.push(ValidationError::new(
                    format!("{field}.env"),
                    format!("'{name}' is not a valid variable name"),
                ));
            }
        }

        errors
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn parse(text: &str) -> EnvPattern {
        toml::from_str(text).unwrap()
    }

    #[test]
    fn empty_section_is_valid() {
        let p = parse("");
        assert!(p.copies.is_empty());
        assert!(p.dirtree.is_none());
        assert!(p.exec.is_empty());
        assert!(p.validate().is_empty());
    }

    #[test]
    fn copy_entries_default_to_copy_mode() {
        let p = parse(
            r#"
copy = [
  { source = "bashrc", dest = "/home/dev/.bashrc" },
  { source = "vimrc", dest = "/home/dev/.vimrc", as_link = true },
]
"#,
        );
        assert!(!p.copies[0].as_link);
        assert!(p.copies[1].as_link);
    }

    #[test]
    fn exec_with_command_and_script_fails_validation() {
        let p = parse(r#"exec = [{ command = "echo hi", script = "setup.sh" }]"#);
        let errors = p.validate();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "exec[0]");
        assert!(errors[0].message.contains("not both"));
    }

    #[test]
    fn exec_with_neither_fails_validation() {
        let p = parse(r#"exec = [{ shell = "/bin/bash" }]"#);
        let errors = p.validate();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("required"));
    }

    #[test]
    fn exec_cmd_alias_and_action() {
        let p = parse(r#"exec = [{ cmd = "echo hi", env = { GREETING = "hi" } }]"#);
        assert_eq!(p.exec[0].action(), Some(ExecAction::Command("echo hi")));
        assert_eq!(p.exec[0].env.get("GREETING").map(String::as_str), Some("hi"));
        assert!(p.validate().is_empty());
    }

    #[test]
    fn exec_rejects_bad_env_names() {
        let p = parse(r#"exec = [{ command = "true", env = { "1BAD" = "x", "A B" = "y" } }]"#);
        assert_eq!(p.validate().len(), 2);
    }

    #[test]
    fn dirtree_nodes_with_modes() {
        let p = parse(
            r#"
[dirtree]
root = "/srv"
[dirtree.tree.projects]
mode = "0750"
[dirtree.tree.projects.work]
[dirtree.tree.tmp]
mode = "7"
"#,
        );
        let nodes = p.dirtree.as_ref().unwrap().nodes().unwrap();
        assert_eq!(nodes.len(), 2);
        let projects = nodes.iter().find(|n| n.name == "projects").unwrap();
        assert_eq!(projects.mode, "750");
        assert_eq!(projects.children.len(), 1);
        assert_eq!(projects.children[0].name, "work");
        assert_eq!(projects.children[0].mode, DEFAULT_DIR_MODE);
        let tmp = nodes.iter().find(|n| n.name == "tmp").unwrap();
        assert_eq!(tmp.mode, "007");
    }

    #[test]
    fn dirtree_invalid_mode_is_reported_with_path() {
        let p = parse("[dirtree.tree.a.b]\nmode = \"855\"\n");
        let errors = p.validate();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "dirtree.tree.a.b.mode");
    }

    #[test]
    fn dirtree_non_table_node_is_reported() {
        let p = parse("[dirtree.tree]\na = 1\nmode = \"755\"\n");
        let fields: Vec<_> = p.validate().into_iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["dirtree.tree.a", "dirtree.tree.mode"]);
    }

    #[test]
    fn dirtree_root_resolution() {
        let home = Path::new("/home/dev");
        let tree = |root: Option<&str>| DirTreeConfig {
            root: root.map(String::from),
            tree: toml::Table::new(),
        };
        assert_eq!(tree(None).root_path(home), home);
        assert_eq!(tree(Some("~")).root_path(home), home);
        assert_eq!(tree(Some("~/code")).root_path(home), home.join("code"));
        assert_eq!(tree(Some("/srv")).root_path(home), Path::new("/srv"));
        assert_eq!(tree(Some("code")).root_path(home), home.join("code"));
    }
}
