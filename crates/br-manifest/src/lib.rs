//! Backup manifest data model and its binary codec.

mod codec;
mod model;

pub use codec::{dump, parse, CodecError, CodecResult};
pub use model::{Checkpoint, HostBackup, Manifest, SpaceBackup};
