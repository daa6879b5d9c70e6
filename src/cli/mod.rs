//! CLI module
//!
//! Command-line interface for fetching from the ISE REST APIs.
//!
//! # Commands
//!
//! - `fetch` - Fetch an endpoint, merging pages by default
//! - `endpoints` - List catalog entries
//! - `category` - Resolve the rate-limit category of a path
//! - `limits` - Show rate limiting and backoff settings

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::{FetchArgs, Runner, ENV_PASSWORD, ENV_USERNAME};
