use serde::Deserialize;
use snafu::{ensure, Location, Snafu};

const DEFAULT_TIER_SIZES: [usize; 5] = [256, 4 << 10, 16 << 10, 32 << 10, 1 << 20];
const DEFAULT_MAX_IDLE_PER_TIER: usize = 64;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("buffer pool needs at least one tier"))]
    EmptyTiers {
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("buffer pool tier size must be non-zero"))]
    ZeroTier {
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("buffer pool tiers must be strictly increasing, got {prev} then {next}"))]
    UnorderedTiers {
        prev: usize,
        next: usize,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("buffer pool must keep at least one idle buffer per tier"))]
    ZeroMaxIdle {
        #[snafu(implicit)]
        location: Location,
    },
}

/// Size classes of a [`TieredBufferPool`](crate::mem::TieredBufferPool).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawPoolConfig")]
pub struct PoolConfig {
    tier_sizes: Vec<usize>,
    max_idle_per_tier: usize,
}

impl PoolConfig {
    pub fn builder() -> PoolConfigBuilder {
        PoolConfigBuilder {
            tier_sizes: DEFAULT_TIER_SIZES.to_vec(),
            max_idle_per_tier: DEFAULT_MAX_IDLE_PER_TIER,
        }
    }

    pub fn tier_sizes(&self) -> &[usize] {
        &self.tier_sizes
    }

    /// Released buffers a tier keeps for reuse; the rest are dropped.
    pub fn max_idle_per_tier(&self) -> usize {
        self.max_idle_per_tier
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            tier_sizes: DEFAULT_TIER_SIZES.to_vec(),
            max_idle_per_tier: DEFAULT_MAX_IDLE_PER_TIER,
        }
    }
}

pub struct PoolConfigBuilder {
    /// unit: bytes, ascending
    tier_sizes: Vec<usize>,
    max_idle_per_tier: usize,
}

impl PoolConfigBuilder {
    pub fn tier_sizes(mut self, tier_sizes: Vec<usize>) -> Self {
        self.tier_sizes = tier_sizes;
        self
    }

    pub fn max_idle_per_tier(mut self, max_idle_per_tier: usize) -> Self {
        self.max_idle_per_tier = max_idle_per_tier;
        self
    }

    pub fn build(self) -> Result<PoolConfig, Error> {
        ensure!(!self.tier_sizes.is_empty(), EmptyTiersSnafu);
        ensure!(self.tier_sizes[0] > 0, ZeroTierSnafu);
        for pair in self.tier_sizes.windows(2) {
            ensure!(
                pair[0] < pair[1],
                UnorderedTiersSnafu {
                    prev: pair[0],
                    next: pair[1],
                }
            );
        }
        ensure!(self.max_idle_per_tier > 0, ZeroMaxIdleSnafu);
        Ok(PoolConfig {
            tier_sizes: self.tier_sizes,
            max_idle_per_tier: self.max_idle_per_tier,
        })
    }
}

#[derive(Deserialize)]
struct RawPoolConfig {
    #[serde(default = "default_tier_sizes")]
    tier_sizes: Vec<usize>,
    #[serde(default = "default_max_idle_per_tier")]
    max_idle_per_tier: usize,
}

fn default_tier_sizes() -> Vec<usize> {
    DEFAULT_TIER_SIZES.to_vec()
}

fn default_max_idle_per_tier() -> usize {
    DEFAULT_MAX_IDLE_PER_TIER
}

impl TryFrom<RawPoolConfig> for PoolConfig {
    type Error = Error;

    fn try_from(raw: RawPoolConfig) -> Result<Self, Self::Error> {
        PoolConfig::builder()
            .tier_sizes(raw.tier_sizes)
            .max_idle_per_tier(raw.max_idle_per_tier)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_builder() {
        assert_eq!(PoolConfig::builder().build().unwrap(), PoolConfig::default());
    }

    #[test]
    fn rejects_bad_tiers() {
        assert!(matches!(
            PoolConfig::builder().tier_sizes(vec![]).build(),
            Err(Error::EmptyTiers { .. })
        ));
        assert!(matches!(
            PoolConfig::builder().tier_sizes(vec![0, 8]).build(),
            Err(Error::ZeroTier { .. })
        ));
        assert!(matches!(
            PoolConfig::builder().tier_sizes(vec![8, 64, 64]).build(),
            Err(Error::UnorderedTiers { prev: 64, next: 64, .. })
        ));
        assert!(matches!(
            PoolConfig::builder().max_idle_per_tier(0).build(),
            Err(Error::ZeroMaxIdle { .. })
        ));
    }

    #[test]
    fn deserialize_validates() {
        let config: PoolConfig = serde_json::from_str(r#"{"tier_sizes":[64,512]}"#).unwrap();
        assert_eq!(config.tier_sizes(), &[64, 512]);

        let config: PoolConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, PoolConfig::default());

        let err = serde_json::from_str::<PoolConfig>(r#"{"tier_sizes":[512,64]}"#).unwrap_err();
        assert!(err.to_string().contains("strictly increasing"));

        let config: PoolConfig = serde_json::from_str(r#"{"max_idle_per_tier":4}"#).unwrap();
        assert_eq!(config.max_idle_per_tier(), 4);
        assert_eq!(config.tier_sizes(), PoolConfig::default().tier_sizes());

        let err = serde_json::from_str::<PoolConfig>(r#"{"max_idle_per_tier":0}"#).unwrap_err();
        assert!(err.to_string().contains("at least one idle buffer"));
    }
}
