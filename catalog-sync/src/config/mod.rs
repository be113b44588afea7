//! Configuration and dependency initialization.

mod dependencies;
mod settings;

pub use dependencies::{Dependencies, SyncComponents};
pub use settings::{ConnectionMode, Settings};
