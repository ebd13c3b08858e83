//! Tag lifecycle orchestration.

pub mod lifecycle;

pub use lifecycle::{TagLifecycleController, TagOptions, TagOutcome};
