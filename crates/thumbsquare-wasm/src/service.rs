//! Cached square image service for JavaScript callers.
//!
//! # Example (TypeScript)
//!
//! ```typescript
//! import init, { JsImageService } from '@thumbsquare/wasm';
//!
//! await init();
//! const service = new JsImageService({ memoryLimit: 16 << 20 });
//!
//! const avatar = service.square(bytes, 96, `avatar-${userId}`);
//! const placeholder = service.solid_color(96, 220, 220, 220, 255, 'placeholder');
//!
//! // Forward the host's low-memory hint
//! window.addEventListener('pagehide', () => service.notify_memory_pressure(false));
//! ```

use std::io::Cursor;

use thumbsquare_core::cache::PressureLevel;
use thumbsquare_core::{ImageService, MemoryPressure, Rgba, ServiceConfig, ServiceError};
use wasm_bindgen::prelude::*;

use crate::types::{to_js_error, ConfigJs, StatsJs};

/// A square image service with its own result cache.
///
/// The cache is subscribed to a pressure source owned by this object; call
/// [`JsImageService::notify_memory_pressure`] to shrink it.
#[wasm_bindgen]
pub struct JsImageService {
    inner: ImageService,
    pressure: MemoryPressure,
}

#[wasm_bindgen]
impl JsImageService {
    /// Create a service. `config` may be `undefined` for defaults.
    ///
    /// # Errors
    /// Returns an error if the config object has the wrong shape or invalid values.
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<JsImageService, JsValue> {
        let config = if config.is_undefined() || config.is_null() {
            ServiceConfig::default()
        } else {
            let parsed: ConfigJs = serde_wasm_bindgen::from_value(config)
                .map_err(|e| JsValue::from_str(&format!("Invalid service config: {}", e)))?;
            parsed.into_config()
        };
        Self::from_config(config).map_err(to_js_error)
    }

    /// Center-crop `bytes` to a `size x size` PNG.
    ///
    /// Returns `undefined` when `bytes` is `undefined`; an empty or
    /// undecodable array is an error.
    pub fn square(
        &self,
        bytes: Option<Vec<u8>>,
        size: f32,
        cache_key: Option<String>,
    ) -> Result<Option<Vec<u8>>, JsValue> {
        self.square_impl(bytes, size, cache_key.as_deref())
            .map_err(to_js_error)
    }

    /// A `size x size` PNG of one RGBA color.
    pub fn solid_color(
        &self,
        size: f32,
        r: u8,
        g: u8,
        b: u8,
        a: u8,
        cache_key: Option<String>,
    ) -> Result<Vec<u8>, JsValue> {
        self.inner
            .solid_color(size, Rgba::new(r, g, b, a), cache_key.as_deref())
            .map_err(to_js_error)
    }

    /// Release cached results. `critical` drops everything.
    pub fn notify_memory_pressure(&self, critical: bool) {
        let level = if critical {
            PressureLevel::Critical
        } else {
            PressureLevel::Moderate
        };
        self.pressure.notify(level);
    }

    /// Drop every cached result.
    pub fn clear_cache(&self) {
        self.inner.cache().clear();
    }

    /// Total bytes held by the cache.
    #[wasm_bindgen(getter)]
    pub fn cached_bytes(&self) -> usize {
        self.inner.cache().resident_bytes()
    }

    /// Number of cached results.
    #[wasm_bindgen(getter)]
    pub fn cached_entries(&self) -> usize {
        self.inner.cache().len()
    }

    /// Cache counters as `{ hits, misses, stores, evictions, entries, residentBytes }`.
    pub fn stats(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.stats_snapshot())
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }
}

impl JsImageService {
    pub(crate) fn from_config(config: ServiceConfig) -> Result<Self, ServiceError> {
        let pressure = MemoryPressure::new();
        let inner = ImageService::with_pressure(config, &pressure)?;
        Ok(Self { inner, pressure })
    }

    fn square_impl(
        &self,
        bytes: Option<Vec<u8>>,
        size: f32,
        cache_key: Option<&str>,
    ) -> Result<Option<Vec<u8>>, ServiceError> {
        self.inner.square(bytes.map(Cursor::new), size, cache_key)
    }

    fn stats_snapshot(&self) -> StatsJs {
        let cache = self.inner.cache();
        StatsJs::new(cache.stats(), cache.len(), cache.resident_bytes())
    }
}

/// Tests that avoid `JsValue` and run on every target.
#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> JsImageService {
        JsImageService::from_config(ServiceConfig::default()).unwrap()
    }

    #[test]
    fn test_square_absent_bytes() {
        let svc = service();
        assert_eq!(svc.square_impl(None, 32.0, Some("k")).unwrap(), None);
        assert_eq!(svc.cached_entries(), 0);
    }

    #[test]
    fn test_square_caches_by_key() {
        let svc = service();
        let source = crate::transform::solid_square(64.0, Rgba::opaque(5, 5, 5)).unwrap();

        let first = svc.square_impl(Some(source.clone()), 16.0, Some("k")).unwrap();
        let second = svc.square_impl(Some(source), 16.0, Some("k")).unwrap();

        assert_eq!(first, second);
        assert_eq!(svc.cached_entries(), 1);

        let stats = svc.inner.cache().stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(
            svc.stats_snapshot(),
            StatsJs::new(stats, 1, svc.cached_bytes())
        );
    }

    #[test]
    fn test_square_empty_bytes_is_error() {
        let svc = service();
        assert!(matches!(
            svc.square_impl(Some(Vec::new()), 16.0, None),
            Err(ServiceError::Decode(_))
        ));
    }

    #[test]
    fn test_pressure_notifications() {
        let svc = service();
        for i in 0..4u8 {
            svc.solid_color(8.0, i, i, i, 255, Some(format!("c{i}")))
                .unwrap();
        }
        let before = svc.cached_bytes();

        svc.notify_memory_pressure(false);
        assert!(svc.cached_bytes() < before);
        assert!(svc.cached_entries() > 0);

        svc.notify_memory_pressure(true);
        assert_eq!(svc.cached_entries(), 0);
        assert_eq!(svc.cached_bytes(), 0);
    }

    #[test]
    fn test_clear_cache() {
        let svc = service();
        svc.solid_color(8.0, 1, 2, 3, 4, Some("x".to_string()))
            .unwrap();
        svc.clear_cache();
        assert_eq!(svc.cached_entries(), 0);
        assert_eq!(svc.inner.cache().stats().evictions, 1);
    }

    #[test]
    fn test_huge_size_is_rejected() {
        let svc = service();
        let source = crate::transform::solid_square(4.0, Rgba::opaque(5, 5, 5)).unwrap();
        assert!(matches!(
            svc.square_impl(Some(source), 4.0e9, Some("k")),
            Err(ServiceError::InvalidRequest(_))
        ));
        assert_eq!(svc.cached_entries(), 0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = ServiceConfig::default();
        config.compaction_ratio = 0.0;
        assert!(JsImageService::from_config(config).is_err());
    }
}
