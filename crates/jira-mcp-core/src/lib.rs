//! Core traits, types, and error handling for jira-mcp.
//!
//! This crate provides the abstractions shared by the Jira client, the MCP
//! server and the CLI: the [`IssueTracker`] capability, the Jira-shaped
//! domain types and the configuration layer.

pub mod config;
pub mod error;
pub mod tracker;
pub mod types;

pub use config::{ApiFlavor, Config, JiraConfig, JiraSettings};
pub use error::{Error, Result};
pub use tracker::IssueTracker;
pub use types::*;
