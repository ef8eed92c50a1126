//! CLI command implementations.
//!
//! Each subcommand has its own module with argument definitions and handlers.
//!
//! # Command Modules
//!
//! - [`cache`] - Cache management (clear, stats)
//! - [`config`] - Configuration management (path, show, init)
//! - [`fetch`] - Fetch resources through the coordinator
//! - [`normalize`] - Print the normalized URL for a resource

pub mod cache;
pub mod config;
pub mod fetch;
pub mod normalize;
