//! Mosaic Core - Foundation types shared by every Mosaic crate.
//!
//! This crate provides:
//! - [`AppName`], the validated unique key of a registered application
//! - [`ActivationRule`], the path-prefix predicate deciding when an application is active
//! - [`AppDescriptor`], the immutable registration record
//! - [`LifecycleStatus`], the per-instance lifecycle state
//!
//! # Example
//!
//! ```rust
//! use mosaic_core::{AppDescriptor, LifecycleStatus};
//!
//! let app = AppDescriptor::new("billing", "http://localhost:7100/", "#subapp", "/billing").unwrap();
//! assert!(app.matches("/billing/invoices"));
//! assert!(!LifecycleStatus::NotLoaded.is_active());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod app;
mod error;
mod status;

pub use app::{ActivationRule, AppDescriptor, AppName};
pub use error::{CoreError, CoreResult};
pub use status::LifecycleStatus;
