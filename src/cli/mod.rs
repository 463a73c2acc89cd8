//! Command-line interface for book-enricher.
//!
//! This module provides CLI commands for enriching, searching and
//! cataloguing books. Results are printed as JSON on stdout.

mod commands;

pub use commands::{Cli, Commands, run_command};
