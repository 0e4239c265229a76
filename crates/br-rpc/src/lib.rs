//! Generic length-framed transport shared by the meta and agent RPC clients.

mod channel;
mod error;
mod frame;

pub use channel::FramedChannel;
pub use error::{RpcError, RpcResult};
pub use frame::{read_frame, write_frame, MAX_FRAME_BYTES};
