//! Try-on request orchestration.
//!
//! Every operation walks the same stages:
//! `Validate -> ResolveGarment -> DetectPose -> Composite -> Persist -> Respond`.
//! CPU-heavy work (decode, inference, compositing, encoding) runs on the
//! blocking pool; each failure is tagged with the stage it happened in.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use image::{DynamicImage, RgbaImage};
use tracing::{debug, warn};

use vtryon_media::{compositor, decode_image, BackgroundRemover, MediaError, PoseEstimator, TempFrame};
use vtryon_models::{
    ClearCacheResponse, GarmentSource, LiveTryOnResponse, PoseResult, ProcessingMode, RemoveBgResponse,
    TryOnRequest, TryOnResponse,
};
use vtryon_storage::{public_url, GarmentCache, GarmentCatalog, GarmentFetcher, ResultStore, StorageError};

use super::housekeeper::Housekeeper;
use super::logging::PipelineLogger;
use super::rate_limiter::SlidingWindowLimiter;
use super::stage::{PipelineError, PipelineStage};
use crate::metrics;
use crate::security::{validate_garment_url, validate_user_image_filename};

/// Collaborators the pipeline needs.
pub struct PipelineDeps {
    pub store: ResultStore,
    pub fetcher: GarmentFetcher,
    pub catalog: Arc<dyn GarmentCatalog>,
    pub cache: Arc<GarmentCache>,
    pub limiter: Arc<SlidingWindowLimiter>,
    pub pose: Arc<dyn PoseEstimator>,
    pub remover: Arc<dyn BackgroundRemover>,
    pub housekeeper: Arc<Housekeeper>,
    /// Where live frames are staged; must not be publicly served
    pub frame_dir: PathBuf,
    /// Permit garment URLs on loopback/private hosts
    pub allow_private_hosts: bool,
}

/// Try-on orchestrator shared by all handlers.
pub struct TryOnPipeline {
    store: ResultStore,
    fetcher: GarmentFetcher,
    catalog: Arc<dyn GarmentCatalog>,
    cache: Arc<GarmentCache>,
    limiter: Arc<SlidingWindowLimiter>,
    pose: Arc<dyn PoseEstimator>,
    remover: Arc<dyn BackgroundRemover>,
    housekeeper: Arc<Housekeeper>,
    frame_dir: PathBuf,
    allow_private_hosts: bool,
}

/// Run CPU-bound work off the async runtime.
async fn run_blocking<T, F>(stage: PipelineStage, f: F) -> Result<T, PipelineError>
where
    F: FnOnce() -> Result<T, PipelineError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| PipelineError::internal(stage, format!("Worker task failed: {}", e)))?
}

impl TryOnPipeline {
    pub fn new(deps: PipelineDeps) -> Self {
        Self {
            store: deps.store,
            fetcher: deps.fetcher,
            catalog: deps.catalog,
            cache: deps.cache,
            limiter: deps.limiter,
            pose: deps.pose,
            remover: deps.remover,
            housekeeper: deps.housekeeper,
            frame_dir: deps.frame_dir,
            allow_private_hosts: deps.allow_private_hosts,
        }
    }

    /// One-shot try-on of a previously uploaded photo.
    pub async fn try_on(&self, request: &TryOnRequest, request_id: &str) -> Result<TryOnResponse, PipelineError> {
        let logger = PipelineLogger::new(request_id, "try_on");
        let result = self.try_on_inner(request, &logger).await;
        self.finish(&logger, result, |r| r.result_image_url.as_str())
            .map(|(response, _)| response)
    }

    async fn try_on_inner(&self, request: &TryOnRequest, logger: &PipelineLogger) -> Result<TryOnResponse, PipelineError> {
        let mode = ProcessingMode::SingleShot;

        // Validate
        let started = Instant::now();
        let filename = request.user_image_filename.as_deref().unwrap_or_default();
        let filename = validate_user_image_filename(filename)
            .map_err(|msg| PipelineError::validation(PipelineStage::Validate, msg))?;
        let source = GarmentSource::from_parts(request.clothing_item_id, request.clothing_image_url.as_deref())
            .ok_or_else(|| {
                PipelineError::validation(
                    PipelineStage::Validate,
                    "Either clothingImageUrl or clothingItemId is required",
                )
            })?;
        logger.log_start(&format!("user image {} with {}", filename, source));

        let user_path = self
            .store
            .resolve_existing(filename)
            .map_err(|e| match e {
                StorageError::NotFound(_) => {
                    PipelineError::not_found(PipelineStage::Validate, format!("User image '{}' not found", filename))
                }
                other => PipelineError::from_storage(PipelineStage::Validate, other),
            })?;
        let user = run_blocking(PipelineStage::Validate, move || {
            vtryon_media::open_image(&user_path).map_err(|e| PipelineError::from_media(PipelineStage::Validate, e))
        })
        .await?;
        logger.log_stage(PipelineStage::Validate, started);

        let garment = self.resolve_garment(&source, logger).await?;
        let (user, pose) = self.detect_pose(user, mode, logger).await?;
        let composited = self.composite(user, garment, pose, mode, logger).await?;

        // Persist
        let started = Instant::now();
        let store = self.store.clone();
        let name = run_blocking(PipelineStage::Persist, move || {
            store
                .save_tryon_result(&composited)
                .map_err(|e| PipelineError::from_storage(PipelineStage::Persist, e).into_internal())
        })
        .await?;
        logger.log_stage(PipelineStage::Persist, started);

        Ok(TryOnResponse {
            message: "Virtual try-on completed successfully".to_string(),
            result_image_url: public_url(&name),
        })
    }

    /// Process one webcam frame.
    pub async fn live_try_on(
        &self,
        client_id: &str,
        frame: Vec<u8>,
        item_id: Option<i64>,
        request_id: &str,
    ) -> Result<LiveTryOnResponse, PipelineError> {
        let logger = PipelineLogger::new(request_id, "live_try_on");
        let result = self.live_try_on_inner(client_id, frame, item_id, &logger).await;
        self.finish(&logger, result, |r| r.result_image_url.as_str())
            .map(|(mut response, elapsed_ms)| {
                response.processing_time_ms = elapsed_ms;
                response
            })
    }

    async fn live_try_on_inner(
        &self,
        client_id: &str,
        frame: Vec<u8>,
        item_id: Option<i64>,
        logger: &PipelineLogger,
    ) -> Result<LiveTryOnResponse, PipelineError> {
        let mode = ProcessingMode::Streaming;

        // Validate
        let started = Instant::now();
        if !self.limiter.allow(client_id) {
            metrics::record_live_rate_limited();
            return Err(PipelineError::rate_limited());
        }
        if frame.is_empty() {
            return Err(PipelineError::validation(PipelineStage::Validate, "No frame provided"));
        }
        let item_id = item_id
            .ok_or_else(|| PipelineError::validation(PipelineStage::Validate, "clothingItemId is required"))?;
        logger.log_start(&format!("client {} with catalog item {}", client_id, item_id));

        // The guard removes the scratch file on every return path below
        let frame_dir = self.frame_dir.clone();
        let (temp_frame, user) = run_blocking(PipelineStage::Validate, move || {
            let temp_frame = TempFrame::create_in(&frame_dir, &frame)
                .map_err(|e| PipelineError::from_media(PipelineStage::Validate, e).into_internal())?;
            let user = temp_frame
                .decode()
                .map_err(|e| PipelineError::from_media(PipelineStage::Validate, e))?;
            Ok((temp_frame, user))
        })
        .await?;
        logger.log_stage(PipelineStage::Validate, started);

        let garment = self.resolve_garment(&GarmentSource::CatalogItem(item_id), logger).await?;
        let (user, pose) = self.detect_pose(user, mode, logger).await?;
        let composited = self.composite(user, garment, pose, mode, logger).await?;

        // Persist
        let started = Instant::now();
        let store = self.store.clone();
        let name = run_blocking(PipelineStage::Persist, move || {
            store
                .save_live_result(&composited)
                .map_err(|e| PipelineError::from_storage(PipelineStage::Persist, e).into_internal())
        })
        .await?;
        logger.log_stage(PipelineStage::Persist, started);

        if let Err(e) = temp_frame.close() {
            warn!(request_id = %logger.request_id(), error = %e, "Temp frame cleanup failed");
        }
        self.housekeeper.record_write().await;

        Ok(LiveTryOnResponse {
            message: "Live try-on frame processed".to_string(),
            result_image_url: public_url(&name),
            // Filled in once the request completes
            processing_time_ms: 0,
        })
    }

    /// Remove the background of an arbitrary image and store it as PNG.
    ///
    /// Apart from a missing URL, every failure is reported as internal.
    pub async fn remove_background(
        &self,
        image_url: Option<&str>,
        request_id: &str,
    ) -> Result<RemoveBgResponse, PipelineError> {
        let logger = PipelineLogger::new(request_id, "remove_background");
        let url = image_url.map(str::trim).filter(|u| !u.is_empty());
        let result = match url {
            None => Err(PipelineError::validation(PipelineStage::Validate, "imageUrl is required")),
            Some(url) => self
                .remove_background_inner(url, &logger)
                .await
                .map_err(PipelineError::into_internal),
        };
        self.finish(&logger, result, |r| r.result_image_url.as_str())
            .map(|(response, _)| response)
    }

    async fn remove_background_inner(&self, url: &str, logger: &PipelineLogger) -> Result<RemoveBgResponse, PipelineError> {
        logger.log_start(url);

        let started = Instant::now();
        let url = validate_garment_url(url, self.allow_private_hosts)
            .into_result()
            .map_err(|msg| PipelineError::validation(PipelineStage::Validate, msg))?;
        logger.log_stage(PipelineStage::Validate, started);

        let started = Instant::now();
        let bytes = self
            .fetcher
            .fetch_bytes(&url)
            .await
            .map_err(|e| PipelineError::from_storage(PipelineStage::ResolveGarment, e))?;
        let remover = Arc::clone(&self.remover);
        let store = self.store.clone();
        let name = run_blocking(PipelineStage::ResolveGarment, move || {
            let image = decode_image(&bytes).map_err(|e| PipelineError::from_media(PipelineStage::ResolveGarment, e))?;
            let cutout = remover
                .remove_background(&image)
                .map_err(|e| PipelineError::from_media(PipelineStage::ResolveGarment, e))?;
            store
                .save_nobg(&cutout)
                .map_err(|e| PipelineError::from_storage(PipelineStage::Persist, e))
        })
        .await?;
        logger.log_stage(PipelineStage::Persist, started);

        Ok(RemoveBgResponse {
            result_image_url: public_url(&name),
        })
    }

    /// Drop cached garments, limiter state and the write counter.
    pub fn clear_caches(&self) -> ClearCacheResponse {
        let cleared_cache_entries = self.cache.clear();
        let cleared_clients = self.limiter.clear();
        self.housekeeper.reset_write_count();
        debug!(cleared_cache_entries, cleared_clients, "Cleared in-memory state");

        ClearCacheResponse {
            message: "Caches cleared".to_string(),
            cleared_cache_entries,
            cleared_clients,
        }
    }

    /// Fetch a garment and strip its background, going through the cache.
    async fn resolve_garment(
        &self,
        source: &GarmentSource,
        logger: &PipelineLogger,
    ) -> Result<Arc<RgbaImage>, PipelineError> {
        let stage = PipelineStage::ResolveGarment;
        let started = Instant::now();

        let url = match source {
            GarmentSource::CatalogItem(id) => {
                let item = self
                    .catalog
                    .find_item(*id)
                    .await
                    .map_err(|e| PipelineError::from_storage(stage, e))?
                    .ok_or_else(|| PipelineError::not_found(stage, format!("Clothing item {} not found", id)))?;
                item.image_url
                    .filter(|u| !u.trim().is_empty())
                    .ok_or_else(|| PipelineError::not_found(stage, format!("Clothing item {} has no image", id)))?
            }
            GarmentSource::Url(url) => url.clone(),
        };
        let url = validate_garment_url(&url, self.allow_private_hosts)
            .into_result()
            .map_err(|msg| PipelineError::validation(stage, msg))?;

        let garment = self
            .cache
            .get_or_compute(&source.cache_key(), || async {
                let bytes = self
                    .fetcher
                    .fetch_bytes(&url)
                    .await
                    .map_err(|e| PipelineError::from_storage(stage, e))?;
                let remover = Arc::clone(&self.remover);
                run_blocking(stage, move || {
                    let image = decode_image(&bytes).map_err(|e| PipelineError::from_media(stage, e))?;
                    remover
                        .remove_background(&image)
                        .map_err(|e| PipelineError::from_media(stage, e))
                })
                .await
            })
            .await?;

        logger.log_stage(stage, started);
        Ok(garment)
    }

    /// Estimate pose with a session opened for this call only.
    async fn detect_pose(
        &self,
        user: DynamicImage,
        mode: ProcessingMode,
        logger: &PipelineLogger,
    ) -> Result<(DynamicImage, PoseResult), PipelineError> {
        let stage = PipelineStage::DetectPose;
        let started = Instant::now();
        let estimator = Arc::clone(&self.pose);

        let (user, pose) = run_blocking(stage, move || {
            let mut session = estimator
                .open_session(mode)
                .map_err(|e| PipelineError::from_media(stage, e))?;
            let pose = session
                .estimate(&user.to_rgb8())
                .map_err(|e| PipelineError::from_media(stage, e))?;
            Ok((user, pose))
        })
        .await?;

        if !pose.is_detected() {
            metrics::record_pose_not_detected(mode.as_str());
            return Err(PipelineError::from_media(stage, MediaError::PoseNotDetected));
        }
        logger.log_stage(stage, started);
        Ok((user, pose))
    }

    async fn composite(
        &self,
        user: DynamicImage,
        garment: Arc<RgbaImage>,
        pose: PoseResult,
        mode: ProcessingMode,
        logger: &PipelineLogger,
    ) -> Result<RgbaImage, PipelineError> {
        let stage = PipelineStage::Composite;
        let started = Instant::now();
        let (composited, _placement) = run_blocking(stage, move || {
            compositor::try_on(&user, &garment, &pose, mode).map_err(|e| PipelineError::from_media(stage, e))
        })
        .await?;
        logger.log_stage(stage, started);
        Ok(composited)
    }

    /// Log the outcome and record metrics for any operation.
    ///
    /// On success also returns the total processing time in milliseconds.
    fn finish<T>(
        &self,
        logger: &PipelineLogger,
        result: Result<T, PipelineError>,
        url: impl Fn(&T) -> &str,
    ) -> Result<(T, u64), PipelineError> {
        match result {
            Ok(response) => {
                metrics::record_operation(logger.operation(), "success");
                let elapsed_ms = logger.log_completion(url(&response));
                Ok((response, elapsed_ms))
            }
            Err(e) => {
                metrics::record_operation(logger.operation(), e.kind.as_str());
                logger.log_failure(&e);
                Err(e)
            }
        }
    }
}
