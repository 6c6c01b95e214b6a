//! Prelude module - commonly used test helpers.
//!
//! Use `use mosaic_test::prelude::*;` to import them.

pub use crate::fixtures::{EntryPage, TEST_CONTAINER, entry_url, init_test_logging, test_descriptor};
pub use crate::mocks::{CallLog, Hook, RecordingApp, ScriptedEngine, StaticFetcher};
