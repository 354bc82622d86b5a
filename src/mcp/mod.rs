//! MCP server for catalog retrieval
//!
//! Exposes query, search, index and status as tools over stdio. One gateway
//! lives for the whole server process, so the keyword fallback keeps its
//! documents between calls.

mod server;

pub use server::run_mcp_server;
