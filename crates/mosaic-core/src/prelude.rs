//! Prelude module - commonly used types for convenient import.
//!
//! Use `use mosaic_core::prelude::*;` to import all essential types.

pub use crate::{ActivationRule, AppDescriptor, AppName, LifecycleStatus};
pub use crate::{CoreError, CoreResult};
