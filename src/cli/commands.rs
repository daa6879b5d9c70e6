//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Rate-limited, cached fetch client for the ISE REST APIs
#[derive(Parser, Debug)]
#[command(name = "ise-fetch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Engine configuration file (YAML)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Endpoint catalog file (JSON)
    #[arg(long, global = true)]
    pub catalog: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch an endpoint and print the document
    Fetch {
        /// Endpoint path, e.g. /ers/config/networkdevice
        path: String,

        /// Filter expression, e.g. name.CONTAINS.core
        #[arg(long)]
        filter: Option<String>,

        /// Extra query parameter (repeatable)
        #[arg(short, long = "param", value_name = "KEY=VALUE", value_parser = parse_key_val)]
        params: Vec<(String, String)>,

        /// Records per page (max 100)
        #[arg(long)]
        size: Option<u32>,

        /// Page to fetch; only meaningful with --no-paginate
        #[arg(long)]
        page: Option<u32>,

        /// Fetch a single page instead of merging all pages
        #[arg(long)]
        no_paginate: bool,

        /// Bypass the response cache
        #[arg(long)]
        no_cache: bool,

        /// Print each page as it arrives instead of merging
        #[arg(long, conflicts_with = "no_paginate")]
        stream: bool,
    },

    /// List endpoints from the catalog
    Endpoints,

    /// Show the rate-limit category of a path
    Category {
        /// Endpoint path
        path: String,
    },

    /// Show rate limiting and backoff settings
    Limits,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Compact JSON, one document per line
    Json,
    /// Indented JSON
    Pretty,
}

/// Parse `KEY=VALUE`
fn parse_key_val(s: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid KEY=VALUE: no '=' found in '{s}'"))?;
    if key.is_empty() {
        return Err(format!("invalid KEY=VALUE: empty key in '{s}'"));
    }
    Ok((key.to_string(), value.to_string()))
}
