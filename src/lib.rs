//! dcrps library: discovery, tree rendering and diagnostics of a process family

pub mod agent;
pub mod app;
pub mod config;
pub mod error;
pub mod inspect;
pub mod invocation;
pub mod listing;
pub mod logger;
pub mod prelude;
pub mod process;
pub mod snapshot;
pub mod tree;
