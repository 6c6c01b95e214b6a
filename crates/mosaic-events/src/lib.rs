//! Mosaic Events - Runtime event bus and cross-application state channel.
//!
//! This crate provides:
//! - [`MosaicEvent`], every observable orchestrator event
//! - [`EventBus`], a broadcast bus delivering events to async receivers
//! - [`GlobalState`], the opt-in shared key/value store applications use to
//!   talk to each other
//!
//! # Example
//!
//! ```rust
//! use mosaic_events::{EventBus, EventMetadata, MosaicEvent};
//!
//! # async fn example() {
//! let bus = EventBus::new();
//! let mut receiver = bus.subscribe();
//!
//! bus.publish(MosaicEvent::RouteChanged {
//!     metadata: EventMetadata::new("navigation"),
//!     path: "/orders".to_string(),
//! });
//!
//! let event = receiver.recv().await.unwrap();
//! assert_eq!(event.event_type(), "route_changed");
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod bus;
mod event;
mod state;

pub use bus::{DEFAULT_CHANNEL_CAPACITY, EventBus, EventReceiver};
pub use event::{EventMetadata, LifecycleStage, MosaicEvent};
pub use state::{GlobalState, StateListenerId, StateMap};
