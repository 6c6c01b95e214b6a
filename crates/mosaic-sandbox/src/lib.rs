//! Mosaic Sandbox - Isolated global execution contexts.
//!
//! Every application instance owns one [`Sandbox`]: an explicit wrapper
//! holding a shared reference to the host's true globals ([`HostGlobals`])
//! and an application-private store. Reads consult the private store first
//! and fall back to the host; writes always land in the private store.
//!
//! A single [`GlobalScope`] stands in for "the global object" seen by
//! whichever application is currently running. Switching applications is an
//! atomic pointer swap, and the cache of compound-value wrappers
//! ([`ScopedObject`]) is invalidated on every switch.
//!
//! Application code is run through the [`ScriptEngine`] seam, which receives
//! a [`GlobalView`] instead of the host globals.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod error;
mod host;
mod sandbox;
mod scope;
mod script;
mod value;

pub use error::{SandboxError, SandboxResult};
pub use host::{HostGlobals, PASSTHROUGH_KEYS};
pub use sandbox::Sandbox;
pub use scope::{GlobalScope, GlobalView, ScopedObject};
pub use script::{InertEngine, Script, ScriptEngine, ScriptError, ScriptOrigin};
pub use value::{HostFunction, Value};
