//! An MCP server exposing Medium publishing tools over stdio or HTTP+SSE.
//!
//! The interesting part is the session core: [`registry`] tracks open
//! sessions, [`transport::stream`] opens and tears them down, and
//! [`transport::message`] routes posted messages to them. [`server`] runs the
//! MCP protocol for each session and [`tools`] binds the Medium API to it.

extern crate self as medium_mcp;

pub mod config;
pub mod error;
pub mod logging;
pub mod medium;
pub mod network_adapter;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod tools;
pub mod transport;
pub mod types;

pub use error::{Error, Result};
pub use medium_mcp_macros::ToolArguments;
pub use server::{ConnectionHandle, Server};
pub use types::ToolArgumentsDescriptor;

/// Name reported to MCP clients and on the HTTP info endpoints.
pub const SERVICE_NAME: &str = "medium-mcp-server";
