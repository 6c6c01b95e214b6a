//! Mosaic Runtime - Registry, navigation interception and the lifecycle
//! orchestrator.
//!
//! This crate provides:
//! - [`AppRegistry`], the ordered set of registered applications
//! - [`NavigationInterceptor`], the single owner of history mutation
//! - [`Orchestrator`], the route-driven load, bootstrap, mount and unmount
//!   state machine
//! - [`Mosaic`], the facade tying them together with a background route
//!   driver
//!
//! # Example
//!
//! ```rust,no_run
//! use mosaic_core::AppDescriptor;
//! use mosaic_runtime::Mosaic;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mosaic = Mosaic::builder().build()?;
//! mosaic.register_application(AppDescriptor::new(
//!     "orders",
//!     "http://localhost:7100/",
//!     "#subapp",
//!     "/orders",
//! )?)?;
//!
//! mosaic.start().await;
//! let outcome = mosaic.navigate_to("/orders").await?;
//! assert_eq!(outcome.mounted.as_ref().map(|n| n.as_str()), Some("orders"));
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod document;
mod error;
mod lifecycle;
mod mosaic;
mod navigation;
mod orchestrator;
mod registry;

pub use document::{DocumentError, DocumentHost, MemoryDocument, StyleNode, wrap_markup};
pub use error::{HookFailure, RuntimeError, RuntimeResult};
pub use lifecycle::{Lifecycles, mount_props};
pub use mosaic::{DEFAULT_LIFECYCLE_TIMEOUT, Mosaic, MosaicBuilder};
pub use navigation::{
    History, MemoryHistory, NavigationInterceptor, RouteListener, RouteListenerId,
};
pub use orchestrator::{AppStatus, Orchestrator, OrchestratorContext, RouteOutcome};
pub use registry::AppRegistry;
