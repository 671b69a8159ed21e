//! CLI commands

pub mod config;
pub mod gate;
pub mod mapping;
pub mod store;
pub mod thread;
