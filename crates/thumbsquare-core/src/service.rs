//! Caller-facing square image service.
//!
//! [`ImageService`] puts the [`ResultCache`] in front of the transform engine:
//!
//! ```text
//! request ──► validate ──► cache lookup ──hit──► bytes
//!                               │
//!                              miss
//!                               ▼
//!                 cropped square (source) or solid square (color)
//!                               │
//!                         cache store ──► bytes
//! ```
//!
//! Decode, resample and encode are CPU-bound and may take a while for large
//! sources. Call the synchronous methods from a worker thread, or use
//! [`ImageService::get_square_image_async`] which moves the work onto the
//! blocking pool.

use std::io::Read;
#[cfg(feature = "tokio")]
use std::sync::Arc;

use crate::cache::{MemoryPressure, ResultCache};
use crate::codec::{ImageCodec, PngCodec};
use crate::config::ServiceConfig;
use crate::decode;
use crate::error::ServiceError;
use crate::pixel::Rgba;
use crate::transform;

/// A request for a square image.
///
/// Exactly one of `source` or `color` is used: a source takes precedence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageRequest {
    /// Encoded source image. Absent for solid-color requests.
    pub source: Option<Vec<u8>>,
    /// Side length of the output square.
    pub size: f32,
    /// Cache name; absent or empty opts the request out of caching.
    pub cache_key: Option<String>,
    /// Fill color for solid-color requests.
    pub color: Option<Rgba>,
}

impl ImageRequest {
    /// Request a center-cropped square of `source`.
    pub fn from_source(source: Vec<u8>, size: f32) -> Self {
        Self {
            source: Some(source),
            size,
            ..Self::default()
        }
    }

    /// Request a square filled with `color`.
    pub fn solid(color: Rgba, size: f32) -> Self {
        Self {
            color: Some(color),
            size,
            ..Self::default()
        }
    }

    pub fn with_cache_key(mut self, key: impl Into<String>) -> Self {
        self.cache_key = Some(key.into());
        self
    }

    /// Check the request shape before any work is done.
    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.source.is_none() && self.color.is_none() {
            return Err(ServiceError::invalid(
                "either a source image or a color is required",
            ));
        }
        transform::target_side(self.size)?;
        Ok(())
    }

    fn key(&self) -> Option<&str> {
        self.cache_key.as_deref()
    }
}

/// Cached square image generation.
///
/// The service is `Send + Sync`; share it behind an `Arc` to serve requests
/// from several threads. Concurrent misses on the same key each compute the
/// result and the last store wins.
pub struct ImageService {
    codec: Box<dyn ImageCodec>,
    cache: ResultCache,
    config: ServiceConfig,
}

impl ImageService {
    /// Create a service whose cache shrinks only through its soft limit or
    /// explicit [`ResultCache::relieve`] calls.
    pub fn new(config: ServiceConfig) -> Result<Self, ServiceError> {
        config.validate()?;
        Ok(Self {
            codec: Box::new(PngCodec::with_orientation(config.apply_orientation)),
            cache: ResultCache::new(config.cache_options()),
            config,
        })
    }

    /// Create a service whose cache subscribes to `pressure` for its lifetime.
    pub fn with_pressure(
        config: ServiceConfig,
        pressure: &MemoryPressure,
    ) -> Result<Self, ServiceError> {
        config.validate()?;
        Ok(Self {
            codec: Box::new(PngCodec::with_orientation(config.apply_orientation)),
            cache: ResultCache::subscribed(pressure, config.cache_options()),
            config,
        })
    }

    /// Replace the codec used to decode sources and encode results.
    pub fn with_codec(mut self, codec: impl ImageCodec + 'static) -> Self {
        self.codec = Box::new(codec);
        self
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Return the square image for `request`, from cache when possible.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest` if neither source nor color is given, or the size
    ///   is not positive
    /// - `Decode` / `Encode` if the transform fails; nothing is cached then
    pub fn get_square_image(&self, request: &ImageRequest) -> Result<Vec<u8>, ServiceError> {
        if let Err(err) = request.validate() {
            log::warn!("rejecting square image request: {err}");
            return Err(err);
        }

        if let Some(hit) = self.cache.lookup(request.key()) {
            return Ok(hit);
        }

        let result = if let Some(source) = &request.source {
            self.compute_cropped(source, request.size)?
        } else if let Some(color) = request.color {
            self.compute_solid(request.size, color)?
        } else {
            return Err(ServiceError::invalid("no source image or color"));
        };

        self.cache.store(request.key(), result.clone());
        Ok(result)
    }

    /// Square an image read from `source`.
    ///
    /// Returns `Ok(None)` when no stream is given at all. A stream that is
    /// present but empty is a decode error.
    pub fn square<R: Read>(
        &self,
        source: Option<R>,
        size: f32,
        key: Option<&str>,
    ) -> Result<Option<Vec<u8>>, ServiceError> {
        let Some(reader) = source else {
            return Ok(None);
        };
        transform::target_side(size)?;

        if let Some(hit) = self.cache.lookup(key) {
            return Ok(Some(hit));
        }

        let bytes = decode::read_source(reader)?;
        let result = self.compute_cropped(&bytes, size)?;
        self.cache.store(key, result.clone());
        Ok(Some(result))
    }

    /// A `size x size` square of `color`.
    pub fn solid_color(
        &self,
        size: f32,
        color: Rgba,
        key: Option<&str>,
    ) -> Result<Vec<u8>, ServiceError> {
        let mut request = ImageRequest::solid(color, size);
        request.cache_key = key.map(str::to_owned);
        self.get_square_image(&request)
    }

    /// Run [`ImageService::get_square_image`] on the blocking thread pool.
    ///
    /// Dropping the returned future does not stop the computation; its
    /// result may still be stored in the cache.
    #[cfg(feature = "tokio")]
    pub async fn get_square_image_async(
        self: Arc<Self>,
        request: ImageRequest,
    ) -> Result<Vec<u8>, ServiceError> {
        let handle = tokio::task::spawn_blocking(move || self.get_square_image(&request));
        match handle.await {
            Ok(result) => result,
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            Err(_) => Err(ServiceError::Cancelled),
        }
    }

    fn compute_cropped(&self, source: &[u8], size: f32) -> Result<Vec<u8>, ServiceError> {
        transform::compute_cropped_square(self.codec.as_ref(), source, size, self.config.filter)
    }

    fn compute_solid(&self, size: f32, color: Rgba) -> Result<Vec<u8>, ServiceError> {
        transform::compute_solid_square(self.codec.as_ref(), size, color)
    }
}

impl std::fmt::Debug for ImageService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageService")
            .field("cache", &self.cache)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::PressureLevel;
    use crate::decode::DecodeError;
    use crate::encode::EncodeError;
    use crate::pixel::PixelBuffer;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn service() -> ImageService {
        ImageService::new(ServiceConfig::default()).unwrap()
    }

    fn png_source(width: u32, height: u32) -> Vec<u8> {
        let mut img = PixelBuffer::new(width, height).unwrap();
        img.fill(Rgba::opaque(30, 60, 90));
        PngCodec::new().encode(&img).unwrap()
    }

    /// Counts decode calls so tests can tell a cache hit from a recompute.
    struct CountingCodec {
        decodes: Arc<AtomicUsize>,
        inner: PngCodec,
    }

    impl ImageCodec for CountingCodec {
        fn decode(&self, bytes: &[u8]) -> Result<PixelBuffer, DecodeError> {
            self.decodes.fetch_add(1, Ordering::SeqCst);
            self.inner.decode(bytes)
        }

        fn encode(&self, image: &PixelBuffer) -> Result<Vec<u8>, EncodeError> {
            self.inner.encode(image)
        }
    }

    struct FailingEncoder;

    impl ImageCodec for FailingEncoder {
        fn decode(&self, bytes: &[u8]) -> Result<PixelBuffer, DecodeError> {
            PngCodec::new().decode(bytes)
        }

        fn encode(&self, _image: &PixelBuffer) -> Result<Vec<u8>, EncodeError> {
            Err(EncodeError::EncodingFailed("sink closed".to_string()))
        }
    }

    #[test]
    fn test_request_validation() {
        assert!(ImageRequest::default().validate().is_err());
        assert!(ImageRequest::solid(Rgba::default(), 0.0).validate().is_err());
        assert!(ImageRequest::solid(Rgba::default(), -4.0).validate().is_err());
        assert!(ImageRequest::from_source(vec![], 8.0).validate().is_ok());
    }

    #[test]
    fn test_invalid_requests_are_rejected() {
        let svc = service();
        let neither = ImageRequest {
            size: 10.0,
            ..ImageRequest::default()
        };
        assert!(svc.get_square_image(&neither).unwrap_err().is_invalid_request());

        let zero = ImageRequest::solid(Rgba::opaque(1, 2, 3), 0.0);
        assert!(svc.get_square_image(&zero).unwrap_err().is_invalid_request());

        let negative = ImageRequest::from_source(png_source(4, 4), -1.0);
        assert!(svc.get_square_image(&negative).unwrap_err().is_invalid_request());
    }

    #[test]
    fn test_invalid_request_does_not_consult_cache() {
        let svc = service();
        svc.cache().store(Some("k"), vec![1, 2, 3]);

        let request = ImageRequest {
            size: 0.0,
            cache_key: Some("k".to_string()),
            ..ImageRequest::default()
        };
        assert!(svc.get_square_image(&request).is_err());
        assert_eq!(svc.cache().stats().hits, 0);
    }

    #[test]
    fn test_second_call_is_served_from_cache() {
        let decodes = Arc::new(AtomicUsize::new(0));
        let svc = service().with_codec(CountingCodec {
            decodes: decodes.clone(),
            inner: PngCodec::new(),
        });
        let request = ImageRequest::from_source(png_source(200, 100), 50.0).with_cache_key("avatar");

        let first = svc.get_square_image(&request).unwrap();
        let second = svc.get_square_image(&request).unwrap();

        assert_eq!(first, second);
        assert_eq!(decodes.load(Ordering::SeqCst), 1);
        assert_eq!(svc.cache().stats().hits, 1);
    }

    #[test]
    fn test_uncached_request_recomputes() {
        let decodes = Arc::new(AtomicUsize::new(0));
        let svc = service().with_codec(CountingCodec {
            decodes: decodes.clone(),
            inner: PngCodec::new(),
        });
        let request = ImageRequest::from_source(png_source(10, 10), 5.0);

        svc.get_square_image(&request).unwrap();
        svc.get_square_image(&request).unwrap();

        assert_eq!(decodes.load(Ordering::SeqCst), 2);
        assert!(svc.cache().is_empty());
    }

    #[test]
    fn test_source_takes_precedence_over_color() {
        let svc = service();
        let mut request = ImageRequest::from_source(png_source(8, 8), 4.0);
        request.color = Some(Rgba::opaque(255, 0, 0));

        let png = svc.get_square_image(&request).unwrap();
        let out = PngCodec::new().decode(&png).unwrap();
        let px = out.pixel(0, 0).unwrap();
        assert!(px.r.abs_diff(30) <= 1, "expected source color, got {px:?}");
        assert!(px.b.abs_diff(90) <= 1, "expected source color, got {px:?}");
    }

    #[test]
    fn test_recompute_after_eviction() {
        let decodes = Arc::new(AtomicUsize::new(0));
        let svc = service().with_codec(CountingCodec {
            decodes: decodes.clone(),
            inner: PngCodec::new(),
        });
        let request = ImageRequest::from_source(png_source(30, 20), 10.0).with_cache_key("thumb");

        let first = svc.get_square_image(&request).unwrap();
        svc.cache().relieve(PressureLevel::Critical);
        assert!(!svc.cache().contains("thumb"));

        let second = svc.get_square_image(&request).unwrap();
        assert_eq!(first, second);
        assert_eq!(decodes.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_decode_failure_is_not_cached() {
        let svc = service();
        let request = ImageRequest::from_source(b"broken".to_vec(), 10.0).with_cache_key("bad");

        assert!(matches!(
            svc.get_square_image(&request),
            Err(ServiceError::Decode(_))
        ));
        assert!(!svc.cache().contains("bad"));
    }

    #[test]
    fn test_encode_failure_propagates() {
        let svc = service().with_codec(FailingEncoder);
        let result = svc.solid_color(4.0, Rgba::opaque(0, 0, 0), Some("black"));

        assert!(matches!(result, Err(ServiceError::Encode(_))));
        assert!(svc.cache().is_empty());
    }

    #[test]
    fn test_square_without_stream_returns_none() {
        let svc = service();
        let result = svc.square(None::<Cursor<Vec<u8>>>, 50.0, Some("k")).unwrap();
        assert!(result.is_none());
        assert_eq!(svc.cache().stats().misses, 0);
    }

    #[test]
    fn test_square_with_empty_stream_is_decode_error() {
        let svc = service();
        let result = svc.square(Some(std::io::empty()), 50.0, None);
        assert!(matches!(result, Err(ServiceError::Decode(DecodeError::Empty))));
    }

    #[test]
    fn test_square_from_stream() {
        let svc = service();
        let png = svc
            .square(Some(Cursor::new(png_source(200, 100))), 50.0, Some("s"))
            .unwrap()
            .unwrap();

        let out = PngCodec::new().decode(&png).unwrap();
        assert_eq!((out.width(), out.height()), (50, 50));
        assert_eq!(svc.cache().lookup(Some("s")), Some(png));
    }

    #[test]
    fn test_square_hit_skips_reading_stream() {
        let svc = service();
        svc.cache().store(Some("s"), vec![9, 9, 9]);

        // A stream that would fail to decode is never read on a hit
        let result = svc
            .square(Some(Cursor::new(b"junk".to_vec())), 50.0, Some("s"))
            .unwrap();
        assert_eq!(result, Some(vec![9, 9, 9]));
    }

    #[test]
    fn test_solid_color_is_cached() {
        let svc = service();
        let first = svc
            .solid_color(10.0, Rgba::new(255, 0, 0, 255), Some("red"))
            .unwrap();
        assert_eq!(svc.cache().lookup(Some("red")), Some(first.clone()));

        let decoded = PngCodec::new().decode(&first).unwrap();
        assert_eq!(decoded.pixel(9, 9), Some(Rgba::new(255, 0, 0, 255)));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = ServiceConfig::default();
        config.compaction_ratio = 2.0;
        assert!(ImageService::new(config).is_err());
    }

    #[test]
    fn test_service_subscribes_for_its_lifetime() {
        let pressure = MemoryPressure::new();
        let svc = ImageService::with_pressure(ServiceConfig::default(), &pressure).unwrap();
        svc.solid_color(4.0, Rgba::opaque(1, 1, 1), Some("a")).unwrap();

        pressure.notify(PressureLevel::Critical);
        assert!(svc.cache().is_empty());

        drop(svc);
        assert_eq!(pressure.listener_count(), 0);
    }
}
