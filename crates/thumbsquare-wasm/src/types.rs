//! JS-facing value types and error conversion.

use serde::{Deserialize, Serialize};
use thumbsquare_core::cache::CacheStats;
use thumbsquare_core::decode::FilterType;
use thumbsquare_core::{ServiceConfig, ServiceError};
use wasm_bindgen::prelude::*;

/// Convert a core error into a JS `Error` object.
pub(crate) fn to_js_error(err: ServiceError) -> JsValue {
    js_sys::Error::new(&err.to_string()).into()
}

/// Service options as passed from JavaScript.
///
/// Every field is optional; missing fields keep the core defaults.
///
/// ```typescript
/// new JsImageService({ filter: 2, compactionRatio: 0.5, memoryLimit: 8 << 20 });
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ConfigJs {
    filter: Option<u8>,
    apply_orientation: Option<bool>,
    compaction_ratio: Option<f64>,
    memory_limit: Option<usize>,
}

impl ConfigJs {
    pub(crate) fn into_config(self) -> ServiceConfig {
        let mut config = ServiceConfig::default();
        if let Some(filter) = self.filter {
            config.filter = filter_from_u8(filter);
        }
        if let Some(apply) = self.apply_orientation {
            config.apply_orientation = apply;
        }
        if let Some(ratio) = self.compaction_ratio {
            config.compaction_ratio = ratio;
        }
        if self.memory_limit.is_some() {
            config.memory_limit = self.memory_limit;
        }
        config
    }
}

/// Cache counters as returned to JavaScript.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StatsJs {
    hits: u64,
    misses: u64,
    stores: u64,
    evictions: u64,
    entries: usize,
    resident_bytes: usize,
}

impl StatsJs {
    pub(crate) fn new(stats: CacheStats, entries: usize, resident_bytes: usize) -> Self {
        Self {
            hits: stats.hits,
            misses: stats.misses,
            stores: stats.stores,
            evictions: stats.evictions,
            entries,
            resident_bytes,
        }
    }
}

/// Convert a u8 filter type value to the core FilterType enum.
///
/// Values:
/// - 0 = Nearest (fastest, lowest quality)
/// - 1 = Bilinear (good balance of speed and quality)
/// - 2 = Lanczos3 (best quality, slowest)
///
/// Any other value defaults to Bilinear.
pub(crate) fn filter_from_u8(value: u8) -> FilterType {
    match value {
        0 => FilterType::Nearest,
        2 => FilterType::Lanczos3,
        _ => FilterType::Bilinear, // Default
    }
}
