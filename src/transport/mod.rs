//! Transports: how sessions are opened, fed, and torn down.
//!
//! `stream` and `message` are transport-agnostic; `http` (SSE + POST) and
//! `stdio` (newline-delimited JSON) are built on top of them.

pub mod http;
pub mod message;
pub mod stdio;
pub mod stream;

pub use message::{route_message, RouteOutcome};
pub use stream::{open_session, SessionStream};
