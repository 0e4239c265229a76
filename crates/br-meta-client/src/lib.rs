//! Leader-following RPC client for the meta service.

mod client;
mod error;
pub mod wire;

pub use client::MetaClient;
pub use error::{MetaClientError, MetaClientResult};
