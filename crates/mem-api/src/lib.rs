//! Outer surface of the knowledge graph memory: configuration, tool dispatch, MCP stdio server.

pub mod config;
pub mod protocol;
pub mod server;
pub mod tools;
