//! Subcommand implementations.

pub(crate) mod config;
pub(crate) mod inspect;
pub(crate) mod scope;
pub(crate) mod simulate;
