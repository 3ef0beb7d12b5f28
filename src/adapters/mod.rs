// Adapters layer: concrete implementations of the domain ports.

pub mod channel;
pub mod codec;
pub mod dispatch;
pub mod http;
pub mod memory_store;
