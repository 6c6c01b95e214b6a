//! Mosaic Test - Shared test utilities for the Mosaic orchestrator.
//!
//! This crate provides in-memory stand-ins for the network and the script
//! engine, plus a recording application, for use as a dev-dependency.
//!
//! ```rust,ignore
//! use mosaic_test::{CallLog, EntryPage, RecordingApp, ScriptedEngine, StaticFetcher};
//!
//! let log = CallLog::new();
//! let app = RecordingApp::new("a", &log);
//! let fetcher = StaticFetcher::new()
//!     .with_page("http://apps.test/a/", EntryPage::new().inline_script("boot:a").render());
//! let engine = ScriptedEngine::new().with_app("boot:a", &app);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod fixtures;
pub mod mocks;

pub use fixtures::*;
pub use mocks::*;
