//! Service configuration.

use serde::{Deserialize, Serialize};

use crate::cache::{CacheOptions, DEFAULT_COMPACTION_RATIO};
use crate::decode::FilterType;
use crate::error::ServiceError;

/// Settings for an [`crate::ImageService`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Resampling filter used when scaling sources.
    pub filter: FilterType,
    /// Honour EXIF orientation in source images.
    pub apply_orientation: bool,
    /// Share of cached bytes released on moderate memory pressure (0 to 1].
    pub compaction_ratio: f64,
    /// Soft cap on cached bytes; `None` leaves the cache pressure-bound only.
    pub memory_limit: Option<usize>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            filter: FilterType::Bilinear,
            apply_orientation: true,
            compaction_ratio: DEFAULT_COMPACTION_RATIO,
            memory_limit: None,
        }
    }
}

impl ServiceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject values the cache would otherwise have to silently correct.
    pub fn validate(&self) -> Result<(), ServiceError> {
        if !self.compaction_ratio.is_finite()
            || self.compaction_ratio <= 0.0
            || self.compaction_ratio > 1.0
        {
            return Err(ServiceError::invalid(format!(
                "compaction_ratio must be in (0, 1], got {}",
                self.compaction_ratio
            )));
        }
        if self.memory_limit == Some(0) {
            return Err(ServiceError::invalid("memory_limit must be non-zero"));
        }
        Ok(())
    }

    pub fn cache_options(&self) -> CacheOptions {
        CacheOptions {
            compaction_ratio: self.compaction_ratio,
            memory_limit: self.memory_limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ServiceConfig::new();
        assert!(config.validate().is_ok());
        assert_eq!(config.filter, FilterType::Bilinear);
        assert!(config.apply_orientation);
        assert_eq!(config.memory_limit, None);
    }

    #[test]
    fn test_validate_ratio() {
        let mut config = ServiceConfig::default();
        for bad in [0.0, -0.5, 1.5, f64::NAN] {
            config.compaction_ratio = bad;
            assert!(config.validate().unwrap_err().is_invalid_request());
        }
        config.compaction_ratio = 1.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_memory_limit() {
        let mut config = ServiceConfig::default();
        config.memory_limit = Some(0);
        assert!(config.validate().is_err());
        config.memory_limit = Some(1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_cache_options_mirror_config() {
        let mut config = ServiceConfig::default();
        config.compaction_ratio = 0.5;
        config.memory_limit = Some(4096);

        let options = config.cache_options();
        assert_eq!(options.compaction_ratio, 0.5);
        assert_eq!(options.memory_limit, Some(4096));
    }
}
