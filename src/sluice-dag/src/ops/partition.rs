//! Partitioning by an integer key.

use serde::{Deserialize, Serialize};

use common_error::{SluiceError, SluiceResult};

/// Partition - prefixes every tuple with its partition number
/// `key.rem_euclid(num_partitions)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionOp {
    pub num_partitions: usize,
    /// Input field holding the integer key.
    #[serde(default)]
    pub key: usize,
}

impl PartitionOp {
    pub fn new(num_partitions: usize) -> SluiceResult<Self> {
        let op = Self {
            num_partitions,
            key: 0,
        };
        op.validate()?;
        Ok(op)
    }

    pub fn validate(&self) -> SluiceResult<()> {
        if self.num_partitions == 0 {
            return Err(SluiceError::invalid_parameter(
                "partition count must be positive",
            ));
        }
        Ok(())
    }

    /// Partition number of `key`.
    pub fn partition_of(&self, key: i64) -> i64 {
        key.rem_euclid(i64::try_from(self.num_partitions).unwrap_or(i64::MAX))
    }
}

impl std::fmt::Display for PartitionOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "num_partitions={}, key=${}", self.num_partitions, self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_of() {
        let op = PartitionOp::new(4).unwrap();
        assert_eq!(op.partition_of(9), 1);
        assert_eq!(op.partition_of(-1), 3);
        assert!(PartitionOp::new(0).is_err());
    }
}
