//! The MCP server: the tool table and the per-session protocol loop.

mod server;
pub mod session;

pub use server::Server;
pub use session::ConnectionHandle;
