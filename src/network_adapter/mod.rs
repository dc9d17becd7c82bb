//! Transports a session talks through.

pub mod channel;
pub mod r#trait;

pub use channel::ChannelAdapter;
pub use r#trait::NetworkAdapter;
