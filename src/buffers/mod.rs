pub mod ordinary_queue;
pub mod sync_buffer;

use thiserror::Error;

pub use ordinary_queue::OrdinaryQueue;
pub use sync_buffer::SyncBuffer;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum BufferError {
    #[error("Buffer capacity must be greater than zero, got {0:?}.")]
    InvalidCapacity(usize),
    #[error("Special message limit must be greater than zero, got {0:?}.")]
    InvalidSpecialLimit(usize),
    #[error("Eviction policy needs a limit greater than zero: {0:?}.")]
    InvalidPolicy(EvictionPolicy),
}

/// How a buffer decides that a pending special message is used up.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EvictionPolicy {
    /// Deliver until the envelope was read `read_limit` times in total, then
    /// evict it.
    Counted { read_limit: usize },
    /// Keep the envelope pending until `quorum` distinct consumers
    /// acknowledged it, then evict it.
    Quorum { quorum: usize },
}

impl EvictionPolicy {
    pub fn requires_acknowledgment(&self) -> bool {
        matches!(self, EvictionPolicy::Quorum { .. })
    }
}

/// Buffer tuning. Every delivery constant is configuration; the defaults
/// mirror the reference system (capacity 10, special limit 5, read limit 3).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BufferConfig {
    pub capacity: usize,
    pub special_limit: usize,
    pub policy: EvictionPolicy,
}

impl Default for BufferConfig {
    fn default() -> Self {
        BufferConfig {
            capacity: 10,
            special_limit: 5,
            policy: EvictionPolicy::Counted { read_limit: 3 },
        }
    }
}

impl BufferConfig {
    pub fn with_capacity(capacity: usize) -> Self {
        BufferConfig {
            capacity,
            ..Default::default()
        }
    }

    pub fn with_policy(self, policy: EvictionPolicy) -> Self {
        BufferConfig { policy, ..self }
    }

    pub fn with_special_limit(self, special_limit: usize) -> Self {
        BufferConfig {
            special_limit,
            ..self
        }
    }

    pub fn validate(&self) -> Result<(), BufferError> {
        if self.capacity == 0 {
            return Err(BufferError::InvalidCapacity(self.capacity));
        }
        if self.special_limit == 0 {
            return Err(BufferError::InvalidSpecialLimit(self.special_limit));
        }
        match self.policy {
            EvictionPolicy::Counted { read_limit: 0 } | EvictionPolicy::Quorum { quorum: 0 } => {
                Err(BufferError::InvalidPolicy(self.policy))
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod buffer_config_tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(BufferConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        let config = BufferConfig::with_capacity(0);
        assert_eq!(config.validate(), Err(BufferError::InvalidCapacity(0)));
    }

    #[test]
    fn test_zero_special_limit_is_rejected() {
        let config = BufferConfig::default().with_special_limit(0);
        assert_eq!(config.validate(), Err(BufferError::InvalidSpecialLimit(0)));
    }

    #[test]
    fn test_zero_policy_limits_are_rejected() {
        let counted = BufferConfig::default().with_policy(EvictionPolicy::Counted { read_limit: 0 });
        assert!(counted.validate().is_err());
        let quorum = BufferConfig::default().with_policy(EvictionPolicy::Quorum { quorum: 0 });
        assert!(quorum.validate().is_err());
    }
}
