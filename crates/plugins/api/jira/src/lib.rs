//! Jira client for jira-mcp.
//!
//! This crate implements [`jira_mcp_core::IssueTracker`] on top of the Jira
//! REST API. Supports both Jira Cloud (API v3) and Jira Self-Hosted/Data
//! Center (API v2).
//!
//! Only [`JiraClient`] is public; request payloads stay internal:
//!
//! ```compile_fail
//! use jira_mcp_jira::CreateIssuePayload;
//! ```

mod adf;
mod client;
mod types;

pub use client::JiraClient;
