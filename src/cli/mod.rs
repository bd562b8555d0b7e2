//! # CLI Module
//!
//! Command-line entry points for the `items-api` binary.
//!
//! ## Commands
//!
//! ### `serve`
//!
//! Start the HTTP server:
//!
//! ```bash
//! items-api serve --config config/config.yaml --addr 127.0.0.1:8080
//! ```
//!
//! - `--config <FILE>` - YAML configuration (default: `config/config.yaml` if present)
//! - `--addr <ADDR>` - Listen address, overrides config and `ITEMS_ADDR`
//! - `--spec <FILE>` - OpenAPI document, overrides config; embedded copy otherwise
//!
//! The server runs until SIGINT or SIGTERM.
//!
//! ### `routes`
//!
//! Print the route table derived from the OpenAPI document.
//!
//! ### `check`
//!
//! Load the document, report spec issues and operations without a controller,
//! and exit non-zero if there are any.

mod commands;

#[cfg(test)]
mod tests;

pub use commands::{format_route_table, run_cli, Cli, Commands};
