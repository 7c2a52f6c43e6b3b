//! Application state.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use vtryon_media::{BackgroundRemover, OrtBackgroundRemover, OrtPoseEstimator, PoseEstimator};
use vtryon_storage::{GarmentCache, GarmentCatalog, GarmentFetcher, JsonGarmentCatalog, ResultStore};

use crate::config::ApiConfig;
use crate::services::{Housekeeper, HousekeeperConfig, PipelineDeps, SlidingWindowLimiter, TryOnPipeline};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub store: ResultStore,
    pub pipeline: Arc<TryOnPipeline>,
    pub housekeeper: Arc<Housekeeper>,
}

impl AppState {
    /// Create application state, loading models and the garment catalog.
    pub async fn new(config: ApiConfig) -> anyhow::Result<Self> {
        let single_shot = config.pose_model_single_shot.clone();
        let streaming = config.pose_model_streaming.clone();
        let bg_model = config.bg_model_path.clone();

        // Model loading parses large files; keep it off the runtime threads
        let (pose, remover) = tokio::task::spawn_blocking(move || -> anyhow::Result<_> {
            let pose = OrtPoseEstimator::from_paths(single_shot.as_deref(), streaming.as_deref())
                .context("Failed to load pose models")?;
            let remover =
                OrtBackgroundRemover::from_path(bg_model.as_deref()).context("Failed to load background model")?;
            Ok((pose, remover))
        })
        .await
        .context("Model loading task failed")??;

        let catalog = JsonGarmentCatalog::load(&config.catalog_path)
            .await
            .with_context(|| format!("Failed to load catalog {}", config.catalog_path.display()))?;
        info!(items = catalog.len(), path = %config.catalog_path.display(), "Loaded garment catalog");

        Self::with_services(config, Arc::new(catalog), Arc::new(pose), Arc::new(remover))
    }

    /// Assemble state from already constructed collaborators.
    pub fn with_services(
        config: ApiConfig,
        catalog: Arc<dyn GarmentCatalog>,
        pose: Arc<dyn PoseEstimator>,
        remover: Arc<dyn BackgroundRemover>,
    ) -> anyhow::Result<Self> {
        let store = ResultStore::open(&config.upload_dir)
            .with_context(|| format!("Failed to open upload dir {}", config.upload_dir.display()))?;
        let fetcher = GarmentFetcher::new(config.garment_fetch_timeout, store.root())
            .context("Failed to build garment fetcher")?
            .with_max_bytes(config.max_garment_bytes);
        std::fs::create_dir_all(&config.frame_scratch_dir)
            .with_context(|| format!("Failed to create frame dir {}", config.frame_scratch_dir.display()))?;

        let cache = Arc::new(GarmentCache::new(config.garment_cache_capacity));
        let limiter = Arc::new(SlidingWindowLimiter::new(config.live_rate_limit, config.live_rate_window));
        let housekeeper = Arc::new(Housekeeper::new(
            store.clone(),
            Arc::clone(&cache),
            Arc::clone(&limiter),
            HousekeeperConfig {
                retention: config.retention,
                limiter_retention: config.rate_limit_retention,
                clean_every_writes: config.clean_every_writes,
                interval: config.housekeeping_interval,
            },
        ));

        let pipeline = Arc::new(TryOnPipeline::new(PipelineDeps {
            store: store.clone(),
            fetcher,
            catalog,
            cache,
            limiter,
            pose,
            remover,
            housekeeper: Arc::clone(&housekeeper),
            frame_dir: config.frame_scratch_dir.clone(),
            allow_private_hosts: config.is_development(),
        }));

        Ok(Self {
            config,
            store,
            pipeline,
            housekeeper,
        })
    }
}
