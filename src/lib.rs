pub mod buffers;
pub mod message;
pub mod roles;

pub use buffers::sync_buffer::SyncBuffer;
pub use buffers::{BufferConfig, EvictionPolicy};
pub use message::{BufferId, ConsumerId, Delivery, SpecialEnvelope};

use buffers::BufferError;
use roles::RoleError;
use thiserror::Error;

/// Possible relay error
#[derive(Debug, Error, Clone)]
pub enum RelayError {
    #[error(transparent)]
    BufferError(#[from] BufferError),
    #[error(transparent)]
    RoleError(#[from] RoleError),
}
