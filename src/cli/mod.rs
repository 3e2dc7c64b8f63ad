//! Command-line interface
//!
//! - [`args`] - Clap definitions
//! - [`commands`] - handlers and dispatch

pub mod args;
pub mod commands;
