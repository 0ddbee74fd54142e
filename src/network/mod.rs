//! Network transport.

mod gateway;

pub use gateway::Gateway;
