//! MCP (Model Context Protocol) server for jira-mcp.
//!
//! This crate implements the MCP server that exposes Jira projects as
//! resources and issue operations as tools to AI assistants.

pub mod handlers;
pub mod protocol;
pub mod resources;
pub mod server;
pub mod transport;

pub use handlers::ToolHandler;
pub use resources::ResourceHandler;
pub use server::McpServer;
pub use transport::StdioTransport;

#[cfg(test)]
mod test_support;
