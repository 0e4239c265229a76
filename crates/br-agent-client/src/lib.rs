//! RPC client and per-host connection pool for the per-host agent service.

mod client;
mod error;
mod pool;
pub mod wire;

pub use client::AgentClient;
pub use error::{AgentClientError, AgentClientResult};
pub use pool::AgentPool;
pub use wire::{ServiceKind, ServiceStatusValue};
