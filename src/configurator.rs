//! Loads the configuration document and drives the providers in priority
//! order.
use crate::config::Document;
use crate::config::macros::MacroValues;
use crate::error::{ConfigError, EnviraError};
use crate::logging::StepStatus;
use crate::providers::{self, Context, Provider};

/// One registry row resolved against a document.
#[derive(Debug)]
pub struct PlannedStep {
    /// Section key.
    pub section_key: &'static str,
    /// The provider, or `None` when the document has no such section.
    pub provider: Option<Box<dyn Provider>>,
}

/// Build a provider for every section present in `document`, in registry
/// order.
///
/// Every section is validated before anything is applied, so a schema
/// violation anywhere aborts the run with no side effects.  Sections no
/// provider claims are reported and ignored.
///
/// # Errors
///
/// Returns the first section's [`ConfigError`].
pub fn plan(document: &Document, ctx: &Context) -> Result<Vec<PlannedStep>, ConfigError> {
    let registry = providers::registry();

    for key in document.keys() {
        if !registry.iter().any(|e| e.section_key == key) {
            ctx.log.warn(&format!("ignoring unknown section [{key}]"));
        }
    }

    registry
        .iter()
        .map(|entry| {
            let provider = document
                .section(entry.section_key)
                .map(entry.build)
                .transpose()?;
            Ok(PlannedStep {
                section_key: entry.section_key,
                provider,
            })
        })
        .collect()
}

/// Apply `steps` in order, halting at the first provider failure.
///
/// Every step is recorded in the log summary: absent sections as not
/// applicable, steps after a failure as not run.
///
/// # Errors
///
/// Returns the failing provider's error.  Earlier providers are not rolled
/// back.
pub fn apply(steps: &[PlannedStep], ctx: &Context) -> Result<(), EnviraError> {
    let mut failure = None;

    for step in steps {
        let Some(provider) = &step.provider else {
            ctx.log
                .record_step(step.section_key, StepStatus::NotApplicable, None);
            continue;
        };
        if failure.is_some() {
            ctx.log.record_step(step.section_key, StepStatus::NotRun, None);
            continue;
        }

        ctx.log.stage(&format!("[{}]", step.section_key));
        match provider.apply(ctx) {
            Ok(results) => {
                let msg = format!("{} actions", results.len());
                ctx.log.record_step(step.section_key, StepStatus::Ok, Some(msg.as_str()));
            }
            Err(e) => {
                ctx.log.error(&e.result.to_string());
                let reason = e.result.error.clone().unwrap_or_default();
                ctx.log
                    .record_step(step.section_key, StepStatus::Failed, Some(reason.as_str()));
                failure = Some(e);
            }
        }
    }

    failure.map_or(Ok(()), |e| Err(e.into()))
}

/// Expand, parse, validate and apply configuration text.
///
/// # Errors
///
/// Returns a configuration error before anything is applied, or the first
/// provider failure.
pub fn load(text: &str, ctx: &Context) -> Result<(), EnviraError> {
    let document = Document::parse(text, &MacroValues::from_platform(&ctx.platform))?;
    run(&document, ctx)
}

/// Like [`load`], reading the environment's configuration file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, or as for [`load`].
pub fn load_environment(ctx: &Context) -> Result<(), EnviraError> {
    let path = ctx.environment.config_path();
    ctx.log.stage("Loading configuration");
    ctx.log.info(&format!("config: {}", path.display()));
    let document = Document::load(path, &MacroValues::from_platform(&ctx.platform))?;
    run(&document, ctx)
}

fn run(document: &Document, ctx: &Context) -> Result<(), EnviraError> {
    let steps = plan(document, ctx)?;
    apply(&steps, ctx)
}
