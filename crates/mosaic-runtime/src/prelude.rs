//! Prelude module - commonly used types for convenient import.
//!
//! Use `use mosaic_runtime::prelude::*;` to import all essential types.

pub use crate::{DocumentHost, History, MemoryDocument, MemoryHistory};
pub use crate::{Mosaic, MosaicBuilder, RouteOutcome};
pub use crate::{RuntimeError, RuntimeResult};
