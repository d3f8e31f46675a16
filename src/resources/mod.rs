//! Idempotent resource primitives (check + apply pattern).
pub mod command;
pub mod copy;
pub mod dirtree;
pub mod helpers;
pub mod keyring;
pub mod package;
pub mod repository;

use anyhow::Result;

use crate::operations::OperationResult;

/// State of a resource (file, list entry, directory).
///
/// # Examples
///
/// ```
/// use envira::resources::ResourceState;
///
/// let missing = ResourceState::Missing;
/// let wrong = ResourceState::Incorrect { current: "points to /other".into() };
///
/// assert_ne!(missing, ResourceState::Correct);
/// assert!(matches!(wrong, ResourceState::Incorrect { .. }));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceState {
    /// Resource does not exist yet.
    Missing,
    /// Resource exists and matches the desired state.
    Correct,
    /// Resource exists but differs; replacing it requires `force`.
    Incorrect {
        /// What is there instead.
        current: String,
    },
    /// Resource cannot be applied, even with `force`.
    Invalid {
        /// Why the resource cannot be applied.
        reason: String,
    },
}

/// Result of applying a resource change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceChange {
    /// Resource was created or replaced.
    Applied,
    /// Resource was already correct.
    AlreadyCorrect,
}

/// A piece of machine state that can be inspected and converged.
pub trait Resource {
    /// Human-readable description of this resource.
    fn description(&self) -> String;

    /// Check the current state of the resource.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be determined (I/O failure,
    /// permission problem).
    fn current_state(&self) -> Result<ResourceState>;

    /// Create or replace the resource.
    ///
    /// Called only when the state is [`ResourceState::Missing`], or
    /// [`ResourceState::Incorrect`] with `force` set.
    ///
    /// # Errors
    ///
    /// Returns an error if the change cannot be made.
    fn apply(&self) -> Result<ResourceChange>;

    /// Message reported when the resource conflicts and `force` is not set.
    fn conflict(&self, current: &str) -> String {
        format!(
            "{} already exists ({current})! Use -f/--force to overwrite!",
            self.description()
        )
    }
}

/// Bring `resource` into its desired state.
///
/// A correct resource is left alone, a missing one is applied, a conflicting
/// one is replaced only with `force`, and an invalid one always fails.
pub fn converge(resource: &dyn Resource, force: bool) -> OperationResult {
    match converge_change(resource, force) {
        Ok(_) => OperationResult::ok(),
        Err(failed) => failed,
    }
}

/// Like [`converge`], reporting whether anything was changed.
///
/// # Errors
///
/// Returns the failed result when the state cannot be read, the resource is
/// invalid, it conflicts without `force`, or applying it fails.
pub fn converge_change(
    resource: &dyn Resource,
    force: bool,
) -> Result<ResourceChange, OperationResult> {
    let state = resource
        .current_state()
        .map_err(|e| OperationResult::failed(format!("{e:#}")))?;

    match state {
        ResourceState::Correct => {
            tracing::debug!("{}: already correct", resource.description());
            Ok(ResourceChange::AlreadyCorrect)
        }
        ResourceState::Invalid { reason } => Err(OperationResult::failed(format!(
            "{}: {reason}",
            resource.description()
        ))),
        ResourceState::Incorrect { current } if !force => {
            Err(OperationResult::failed(resource.conflict(&current)))
        }
        ResourceState::Incorrect { current } => {
            tracing::warn!(
                "{}: replacing ({current}) because --force is set",
                resource.description()
            );
            apply_resource(resource)
        }
        ResourceState::Missing => apply_resource(resource),
    }
}

fn apply_resource(resource: &dyn Resource) -> Result<ResourceChange, OperationResult> {
    let change = resource
        .apply()
        .map_err(|e| OperationResult::failed(format!("{e:#}")))?;
    tracing::debug!("{}: applied", resource.description());
    Ok(change)
}
