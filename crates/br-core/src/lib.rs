//! Shared topology model and error types used across the nebula-br crates.

mod error;
mod host_addr;
mod role;
mod service;
mod suffix;
mod topology;

pub use error::{BrError, BrResult};
pub use host_addr::HostAddr;
pub use role::ServiceRole;
pub use service::ServiceInfo;
pub use suffix::SideCopySuffix;
pub use topology::{HostDir, Topology};
