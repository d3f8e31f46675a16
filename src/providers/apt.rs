//! The `apt` section: repositories, signing keys and packages.
use std::path::PathBuf;
use std::time::Duration;

use super::{Context, Outcomes, Provider, SectionProvider};
use crate::config::apt::{AptPattern, Repository};
use crate::error::ProviderError;
use crate::operations::OperationResult;
use crate::resources::converge;
use crate::resources::keyring::{KeyLocation, install_key};
use crate::resources::package;
use crate::resources::repository::{SourceListEntry, source_line};

/// Applies the `apt` section.
#[derive(Debug, Clone)]
pub struct AptProvider {
    pattern: AptPattern,
}

impl SectionProvider for AptProvider {
    const SECTION_KEY: &'static str = "apt";
    const PRIORITY: u32 = 1;
    type Pattern = AptPattern;

    fn from_pattern(pattern: AptPattern) -> Self {
        Self { pattern }
    }
}

impl AptProvider {
    /// Install the repository's key (if any) and ensure its source line.
    fn add_repository(
        &self,
        ctx: &Context,
        repo: &Repository,
        outcomes: &mut Outcomes,
    ) -> Result<(), ProviderError> {
        ctx.log.info(&format!("repository {}", repo.url));

        let keyring = match &repo.key_url {
            Some(key_url) => {
                let Some(location) =
                    KeyLocation::for_url(key_url, &ctx.paths.keyring_dir, &ctx.paths.cache_dir)
                else {
                    return outcomes.push(OperationResult::failed(format!(
                        "key URL '{key_url}' has no host"
                    )));
                };
                let timeout = Duration::from_secs(self.pattern.key_timeout);
                let result = install_key(
                    ctx.keys.as_ref(),
                    ctx.executor.as_ref(),
                    key_url,
                    &location,
                    timeout,
                );
                let keyring = result.data.as_ref().map(PathBuf::from);
                outcomes.push(result)?;
                keyring
            }
            None => None,
        };

        let line = source_line(
            &repo.kind,
            keyring.as_deref(),
            &repo.url,
            &ctx.platform.release.codename,
            &repo.branch,
        );
        let entry = SourceListEntry::new(
            ctx.paths.sources_dir.join(&repo.source_list),
            line,
            repo.url.clone(),
        );
        outcomes.push(converge(&entry, ctx.force))
    }
}

impl Provider for AptProvider {
    fn section_key(&self) -> &'static str {
        Self::SECTION_KEY
    }

    fn priority(&self) -> u32 {
        Self::PRIORITY
    }

    fn apply(&self, ctx: &Context) -> Result<Vec<OperationResult>, ProviderError> {
        let mut outcomes = Outcomes::new(Self::SECTION_KEY);

        for repo in &self.pattern.repos {
            self.add_repository(ctx, repo, &mut outcomes)?;
        }

        if self.pattern.update {
            ctx.log.info("updating package lists");
            outcomes.push(package::update(ctx.executor.as_ref()))?;
        }

        if self.pattern.upgrade {
            ctx.log.info("upgrading packages");
            outcomes.push(package::upgrade(ctx.executor.as_ref()))?;
        }

        for pkg in &self.pattern.install {
            let result = package::install(ctx.executor.as_ref(), pkg);
            if let Some(version) = &result.data {
                ctx.log.info(&format!("{} {version}", pkg.name));
            }
            outcomes.push(result)?;
        }

        Ok(outcomes.finish())
    }
}
