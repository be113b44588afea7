//! Processor module for the change-event ingest.
//!
//! Filters and routes change events and drives the sync primitive for each row.

mod change_processor;

pub use change_processor::{BatchReport, ChangeProcessor};
