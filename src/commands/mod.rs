//! Top-level command orchestration.
pub mod apply;
