//! Mosaic Assets - Turning an entry location into mountable parts.
//!
//! This crate provides:
//! - [`Fetcher`], the network seam, with the [`HttpFetcher`] implementation
//! - [`parse_entry`], which extracts script and style references from an
//!   entry document in document order and strips them from the markup
//! - [`AssetResolver`], which fetches entries and caches external asset bodies
//! - [`scope_css`], which namespaces every top-level style rule

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod error;
mod fetch;
mod parse;
mod resolver;
mod style;

pub use error::{AssetError, AssetResult};
pub use fetch::{FetchSettings, Fetcher, HttpFetcher};
pub use parse::{AssetKind, AssetOrigin, AssetRef, EntryAssets, parse_entry};
pub use resolver::AssetResolver;
pub use style::scope_css;
