//! Process-wide context and per-call worker scope.
//!
//! [`Context::new`] is the single initialization point: it pins the backend
//! to one thread per call, disables its result cache, and builds the batch
//! pool. Every public operation then runs inside a [`Worker`], a guard bound
//! to the current thread that flushes the backend's thread-local state when
//! it goes out of scope, whatever the outcome of the call.
//!
//! ```no_run
//! use safethumb::{Config, Context, Options};
//!
//! let config = Config::default();
//! let ctx = Context::new(config.backend.rust_backend(), config)?;
//!
//! let blob = std::fs::read("photo.jpg")?;
//! let thumb = ctx.thumbnail(&blob, &Options::cropped(200, 200))?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::config::{Config, ConfigError, effective_threads};
use crate::imager::{Error, Imager};
use crate::imaging::{BackendError, Format, ImageBackend, Options, Orientation};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};
use serde::Serialize;
use std::marker::PhantomData;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum InitError {
    #[error("Invalid config: {0}")]
    Config(#[from] ConfigError),
    #[error("Backend rejected configuration: {0}")]
    Backend(#[from] BackendError),
    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] ThreadPoolBuildError),
}

/// What [`Context::metadata`] reports about an image.
///
/// Width and height are upright, i.e. already swapped for quarter-turn
/// orientations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Metadata {
    pub width: u32,
    pub height: u32,
    pub format: Format,
    pub orientation: Orientation,
}

/// Initialized backend plus the settings every call shares.
pub struct Context<B: ImageBackend> {
    backend: B,
    config: Config,
    pool: ThreadPool,
}

impl<B: ImageBackend> Context<B> {
    /// Validate `config`, apply it to `backend`, and build the worker pool.
    pub fn new(mut backend: B, config: Config) -> Result<Self, InitError> {
        config.validate()?;

        backend.configure_concurrency(config.backend.concurrency)?;
        backend.disable_result_cache();

        let threads = effective_threads(&config.workers);
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("safethumb-worker-{i}"))
            .build()?;

        info!(
            threads,
            concurrency = config.backend.concurrency,
            "image context initialized"
        );
        Ok(Self {
            backend,
            config,
            pool,
        })
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Enter a worker scope on the current thread.
    pub fn worker(&self) -> Worker<'_, B> {
        Worker {
            backend: &self.backend,
            _pinned: PhantomData,
        }
    }

    /// Produce a thumbnail or exact crop of `blob` as described by `options`.
    pub fn thumbnail(&self, blob: &[u8], options: &Options) -> Result<Vec<u8>, Error> {
        let worker = self.worker();
        let imager = worker.load(blob)?;
        let quality = options
            .quality
            .unwrap_or_else(|| self.config.output.quality());

        if options.crop {
            imager.crop(options, quality)
        } else {
            imager.thumbnail(options, quality)
        }
    }

    /// Validate `blob` and report its upright size, format, and orientation.
    pub fn metadata(&self, blob: &[u8]) -> Result<Metadata, Error> {
        let worker = self.worker();
        let imager = worker.load(blob)?;
        let metadata = Metadata {
            width: imager.width(),
            height: imager.height(),
            format: imager.format(),
            orientation: imager.orientation(),
        };
        imager.close();
        Ok(metadata)
    }

    /// Run independent thumbnail requests on the worker pool, one request per
    /// worker thread at a time. Results keep the order of `jobs`.
    pub fn thumbnail_batch<T>(&self, jobs: &[(T, Options)]) -> Vec<Result<Vec<u8>, Error>>
    where
        T: AsRef<[u8]> + Sync,
    {
        debug!(jobs = jobs.len(), "starting batch");
        self.pool.install(|| {
            jobs.par_iter()
                .map(|(blob, options)| self.thumbnail(blob.as_ref(), options))
                .collect()
        })
    }
}

/// Scope of one call on one thread.
///
/// Not `Send`: the backend's thread-local state belongs to the thread that
/// created the guard, and that is the thread it is flushed on.
pub struct Worker<'c, B: ImageBackend> {
    backend: &'c B,
    _pinned: PhantomData<*const ()>,
}

impl<'c, B: ImageBackend> Worker<'c, B> {
    /// Load and validate `blob`. The returned image cannot outlive the worker.
    pub fn load<'a>(&'a self, blob: &'a [u8]) -> Result<Imager<'a, B::Image>, Error> {
        Imager::load(self.backend, blob)
    }
}

impl<B: ImageBackend> Drop for Worker<'_, B> {
    fn drop(&mut self) {
        self.backend.flush_worker_local_state();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{MockBackend, MockFailures, RecordedOp};
    use crate::imaging::{Quality, RustBackend};
    use crate::test_helpers::*;

    fn context(backend: MockBackend) -> Context<MockBackend> {
        Context::new(backend, Config::default()).unwrap()
    }

    fn ops_after_init(ctx: &Context<MockBackend>) -> Vec<RecordedOp> {
        ctx.backend().get_operations().into_iter().skip(2).collect()
    }

    #[test]
    fn new_configures_backend_once() {
        let ctx = context(MockBackend::new());
        assert_eq!(
            ctx.backend().get_operations(),
            vec![
                RecordedOp::ConfigureConcurrency(1),
                RecordedOp::DisableResultCache
            ]
        );
    }

    #[test]
    fn new_rejects_invalid_config() {
        let mut config = Config::default();
        config.output.quality = 0;
        let result = Context::new(MockBackend::new(), config);
        assert!(matches!(result, Err(InitError::Config(_))));
    }

    #[test]
    fn new_surfaces_backend_refusal() {
        let mut config = Config::default();
        config.backend.concurrency = 4;
        let result = Context::new(RustBackend::new(), config);
        assert!(matches!(result, Err(InitError::Backend(_))));
    }

    #[test]
    fn thumbnail_flushes_after_release() {
        let ctx = context(MockBackend::with_source(400, 300));
        ctx.thumbnail(&encode_jpeg(4, 4), &Options::fit(100, 100))
            .unwrap();

        let ops = ops_after_init(&ctx);
        assert!(ops.ends_with(&[
            RecordedOp::ReleaseResult,
            RecordedOp::ReleaseImage,
            RecordedOp::Flush
        ]));
    }

    #[test]
    fn flush_happens_on_rejection_too() {
        let ctx = context(MockBackend::with_source(1, 1));
        let result = ctx.thumbnail(&encode_png(4, 4), &Options::fit(100, 100));
        assert_eq!(result, Err(Error::TooSmall));
        assert_eq!(ops_after_init(&ctx).last(), Some(&RecordedOp::Flush));
    }

    #[test]
    fn flush_happens_for_unknown_format() {
        let ctx = context(MockBackend::new());
        let result = ctx.thumbnail(b"plain text", &Options::fit(100, 100));
        assert_eq!(result, Err(Error::UnknownFormat));
        assert_eq!(ops_after_init(&ctx), vec![RecordedOp::Flush]);
    }

    #[test]
    fn flush_happens_on_processing_failure() {
        let ctx = context(MockBackend::with_source(400, 300).failing(MockFailures {
            serialize: true,
            ..MockFailures::default()
        }));
        let result = ctx.thumbnail(&encode_jpeg(4, 4), &Options::cropped(100, 100));
        assert_eq!(result, Err(Error::ProcessingFailed));
        assert_eq!(ops_after_init(&ctx).last(), Some(&RecordedOp::Flush));
    }

    #[test]
    fn crop_flag_selects_crop() {
        let ctx = context(MockBackend::with_source(400, 300));
        let bytes = ctx
            .thumbnail(&encode_jpeg(4, 4), &Options::cropped(100, 100))
            .unwrap();
        assert_eq!(bytes, b"jpeg:100x100");
    }

    #[test]
    fn metadata_reports_upright_dimensions() {
        let ctx = context(MockBackend::with_source(3000, 4000).orientation(6));
        let meta = ctx.metadata(&encode_jpeg(4, 4)).unwrap();
        assert_eq!(
            meta,
            Metadata {
                width: 4000,
                height: 3000,
                format: Format::Jpeg,
                orientation: Orientation::RightTop,
            }
        );
        assert!(ops_after_init(&ctx).ends_with(&[RecordedOp::ReleaseImage, RecordedOp::Flush]));
    }

    #[test]
    fn metadata_matches_load() {
        let ctx = context(MockBackend::with_source(640, 480).orientation(3));
        let blob = encode_png(4, 4);
        let meta = ctx.metadata(&blob).unwrap();

        let worker = ctx.worker();
        let imager = worker.load(&blob).unwrap();
        assert_eq!(
            (imager.width(), imager.height(), imager.format(), imager.orientation()),
            (meta.width, meta.height, meta.format, meta.orientation)
        );
    }

    #[test]
    fn metadata_serializes() {
        let meta = Metadata {
            width: 4000,
            height: 3000,
            format: Format::Webp,
            orientation: Orientation::LeftBottom,
        };
        let json = serde_json::to_value(meta).unwrap();
        assert_eq!(json["width"], 4000);
        assert_eq!(json["format"], "webp");
        assert_eq!(json["orientation"], 8);
    }

    fn serialized_quality(ctx: &Context<MockBackend>) -> Option<Quality> {
        ops_after_init(ctx).into_iter().find_map(|op| match op {
            RecordedOp::Serialize(_, quality) => Some(quality),
            _ => None,
        })
    }

    #[test]
    fn request_quality_overrides_config() {
        let mut config = Config::default();
        config.output.quality = 70;
        let ctx = Context::new(MockBackend::with_source(400, 300), config).unwrap();

        let options = Options::fit(100, 100).with_quality(Quality::new(40));
        ctx.thumbnail(&encode_jpeg(4, 4), &options).unwrap();
        assert_eq!(serialized_quality(&ctx), Some(Quality::new(40)));
    }

    #[test]
    fn config_quality_used_when_request_has_none() {
        let mut config = Config::default();
        config.output.quality = 70;
        let ctx = Context::new(MockBackend::with_source(400, 300), config).unwrap();

        ctx.thumbnail(&encode_jpeg(4, 4), &Options::cropped(100, 100))
            .unwrap();
        assert_eq!(serialized_quality(&ctx), Some(Quality::new(70)));
    }

    #[test]
    fn batch_preserves_order_and_flushes_per_job() {
        let ctx = context(MockBackend::with_source(400, 300));
        let jpeg = encode_jpeg(4, 4);
        let jobs = vec![
            (jpeg.clone(), Options::fit(100, 100)),
            (b"nope".to_vec(), Options::fit(100, 100)),
            (jpeg.clone(), Options::cropped(50, 50)),
        ];

        let results = ctx.thumbnail_batch(&jobs);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_deref(), Ok(&b"jpeg:100x75"[..]));
        assert_eq!(results[1], Err(Error::UnknownFormat));
        assert_eq!(results[2].as_deref(), Ok(&b"jpeg:50x50"[..]));

        let flushes = ops_after_init(&ctx)
            .into_iter()
            .filter(|op| *op == RecordedOp::Flush)
            .count();
        assert_eq!(flushes, 3);
    }

    #[test]
    fn real_backend_round_trip() {
        let config = Config::default();
        let ctx = Context::new(config.backend.rust_backend(), config).unwrap();
        let blob = with_exif_orientation(&encode_jpeg(300, 400), 6);

        let meta = ctx.metadata(&blob).unwrap();
        assert_eq!((meta.width, meta.height), (400, 300));
        assert_eq!(meta.orientation, Orientation::RightTop);

        let thumb = ctx.thumbnail(&blob, &Options::fit(100, 100)).unwrap();
        let decoded = image::load_from_memory(&thumb).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (100, 75));
    }
}
