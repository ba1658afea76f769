use std::sync::Arc;
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::core::{
    Action, AppState, Artifact, ConverterEvent, Dimensions, ImageBlob, ItemId, Notification,
    Progress, ProgressType,
};
use crate::history::HistoryRecord;
use crate::processing::codec::Codec;
use crate::utils::{ConverterError, ConverterResult};

use super::pipeline::{PipelineSettings, PlannedStage, Stage, plan};

/// Counts for one finished batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Items pending when the run started
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Removed or edited before their turn, or removed mid-conversion
    pub skipped: usize,
}

/// What the pipeline captured about an item when its conversion started.
struct Job {
    id: ItemId,
    name: String,
    mime: String,
    source: ImageBlob,
    settings: PipelineSettings,
}

/// Lowers the converting flag however the run ends.
struct RunGuard<'a>(&'a AppState);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.end_run();
    }
}

/// Runs item pipelines against the shared state, one item at a time.
pub struct BatchProcessor<C> {
    state: AppState,
    codec: Arc<C>,
}

impl<C> Clone for BatchProcessor<C> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            codec: Arc::clone(&self.codec),
        }
    }
}

impl<C: Codec> BatchProcessor<C> {
    pub fn new(state: AppState, codec: C) -> Self {
        Self {
            state,
            codec: Arc::new(codec),
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Original dimensions of an item, probing the source the first time.
    pub async fn ensure_dimensions(&self, id: &ItemId) -> ConverterResult<Dimensions> {
        let source = {
            let registry = self.state.registry();
            let item = registry
                .get(id)
                .ok_or_else(|| ConverterError::ItemNotFound(id.clone()))?;
            if let Some(dimensions) = item.original_dimensions {
                return Ok(dimensions);
            }
            ImageBlob::new(Arc::clone(&item.source.bytes), item.source_format)
        };

        self.probe(id, &source).await
    }

    async fn probe(&self, id: &ItemId, source: &ImageBlob) -> ConverterResult<Dimensions> {
        let dimensions = self.codec.probe(source).await?;
        debug!("Probed {}: {}×{}", id, dimensions.width, dimensions.height);
        self.state.dispatch(Action::SetOriginalDimensions { id: id.clone(), dimensions });
        Ok(dimensions)
    }

    /// Converts one item outside a batch run and notifies the outcome.
    pub async fn convert_item(&self, id: &ItemId) -> ConverterResult<Artifact> {
        let (name, resizes) = {
            let registry = self.state.registry();
            let item = registry
                .get(id)
                .ok_or_else(|| ConverterError::ItemNotFound(id.clone()))?;
            (item.name().to_string(), item.resize_settings.enabled)
        };

        match self.run_pipeline(id).await? {
            Some(artifact) => {
                let verb = if resizes { "resized and converted" } else { "converted" };
                self.state
                    .notify(Notification::success(format!("{name} {verb} successfully")));
                Ok(artifact)
            }
            None => Err(ConverterError::ItemNotFound(id.clone())),
        }
    }

    /// Converts every item that is pending right now, sequentially in
    /// registry order. Items added during the run wait for the next one.
    pub async fn convert_all(&self) -> ConverterResult<BatchSummary> {
        if !self.state.try_begin_run() {
            return Err(ConverterError::Busy("A batch conversion is already running".into()));
        }
        let _guard = RunGuard(&self.state);

        let snapshot = self.state.registry().pending_ids();
        let mut summary = BatchSummary {
            total: snapshot.len(),
            ..Default::default()
        };
        if snapshot.is_empty() {
            debug!("No pending items to convert");
            return Ok(summary);
        }

        info!("Converting {} pending item(s)", summary.total);
        self.emit_batch(ProgressType::Start, &summary);

        for (idx, id) in snapshot.iter().enumerate() {
            let still_pending = self.state.registry().get(id).is_some_and(|item| item.is_pending());
            if !still_pending {
                debug!("Skipping {id}: no longer pending");
                summary.skipped += 1;
            } else {
                debug!("Item {}/{}: {}", idx + 1, summary.total, id);
                match self.run_pipeline(id).await {
                    Ok(Some(_)) => summary.succeeded += 1,
                    // Removed, or started elsewhere since the snapshot
                    Ok(None) | Err(ConverterError::Busy(_)) => summary.skipped += 1,
                    Err(_) => summary.failed += 1,
                }
            }

            let processed = summary.succeeded + summary.failed + summary.skipped;
            self.state
                .set_global_progress(crate::core::percentage(processed, summary.total));
            self.emit_batch(ProgressType::Progress, &summary);
        }

        if summary.failed > 0 {
            warn!(
                "Batch finished with {} failed item(s) out of {}",
                summary.failed, summary.total
            );
        } else {
            info!("Batch finished: {} item(s) converted", summary.succeeded);
        }
        self.emit_batch(ProgressType::Complete, &summary);
        self.state.notify(Notification::success(format!(
            "{} file(s) converted successfully",
            summary.succeeded
        )));
        Ok(summary)
    }

    fn emit_batch(&self, progress_type: ProgressType, summary: &BatchSummary) {
        let processed = summary.succeeded + summary.failed + summary.skipped;
        let progress = match progress_type {
            ProgressType::Start => Progress::new(progress_type, 0, 0, summary.total),
            _ => Progress::new(progress_type, processed, summary.succeeded, summary.total),
        };
        self.state.emit(ConverterEvent::Batch(progress));
    }

    // ── Per-item pipeline ─────────────────────────────────────────────────────────────

    /// Runs all planned stages for one item and commits the outcome.
    ///
    /// `Ok(None)` means the item was removed before its outcome could be
    /// committed; any result is dropped. `Busy` means it was already converting.
    async fn run_pipeline(&self, id: &ItemId) -> ConverterResult<Option<Artifact>> {
        let Some(mut job) = self.start(id)? else {
            debug!("{id} was removed before conversion started");
            return Ok(None);
        };

        if job.settings.original_dimensions.is_none() {
            match self.probe(id, &job.source).await {
                Ok(dimensions) => job.settings.original_dimensions = Some(dimensions),
                // The reencode stage reports the real decode failure
                Err(e) => debug!("Could not probe {id}: {e}"),
            }
            if self.state.registry().get(id).is_none() {
                debug!("{} was removed while probing", job.name);
                return Ok(None);
            }
        }

        let stages = plan(&job.settings);
        debug!(
            "Converting {} via {}",
            job.name,
            stages.iter().map(|s| s.stage.name()).collect::<Vec<_>>().join(" → ")
        );

        let mut current = job.source.clone();
        for planned in &stages {
            match self.run_stage(&job.id, planned, &current).await {
                Ok(output) => current = output,
                Err(e) => {
                    // A removed item has nothing to record the failure on
                    return if self.commit_failure(&job, &e) { Err(e) } else { Ok(None) };
                }
            }
        }
        Ok(self.commit_success(&job, current).await)
    }

    /// Moves the item to converting, then captures its settings. Edits from
    /// here on mark the item dirty instead of reaching this run.
    fn start(&self, id: &ItemId) -> ConverterResult<Option<Job>> {
        let started = self.state.dispatch(Action::StartConversion(id.clone()));
        let registry = self.state.registry();
        let Some(item) = registry.get(id) else {
            return Ok(None);
        };
        if !started {
            return Err(ConverterError::Busy(format!("{} is already converting", item.name())));
        }
        Ok(Some(Job {
            id: id.clone(),
            name: item.name().to_string(),
            mime: item.source.mime.clone(),
            source: ImageBlob::new(Arc::clone(&item.source.bytes), item.source_format),
            settings: PipelineSettings {
                target_format: item.target_format,
                resize: item.resize_settings,
                options: item.options,
                original_dimensions: item.original_dimensions,
            },
        }))
    }

    async fn run_stage(
        &self,
        id: &ItemId,
        planned: &PlannedStage,
        input: &ImageBlob,
    ) -> ConverterResult<ImageBlob> {
        let band = planned.band;
        let report = |sub: u8| {
            self.state.dispatch(Action::UpdateProgress {
                id: id.clone(),
                progress: band.map(sub),
            });
        };

        match planned.stage {
            Stage::ScalePreset(request) | Stage::Resize(request) => {
                self.codec.resize(input, request, &report).await
            }
            Stage::Reencode { format, preset } => {
                self.codec.reencode(input, format, preset, &report).await
            }
        }
    }

    async fn commit_success(&self, job: &Job, artifact: Artifact) -> Option<Artifact> {
        let committed = self.state.dispatch(Action::CompleteConversion {
            id: job.id.clone(),
            artifact: artifact.clone(),
        });
        if !committed {
            debug!("{} was removed during conversion; result dropped", job.name);
            return None;
        }

        info!(
            "{} converted ({} → {} bytes)",
            job.name,
            job.source.size(),
            artifact.size()
        );
        self.state.record_history(HistoryRecord {
            id: job.id.clone(),
            name: job.name.clone(),
            from: job.mime.clone(),
            to: job.settings.target_format,
            size_in: job.source.size() as u64,
            size_out: artifact.size() as u64,
            date: Utc::now().timestamp_millis(),
        })
        .await;
        Some(artifact)
    }

    /// Records the failure on the item. False when the item is gone.
    fn commit_failure(&self, job: &Job, error: &ConverterError) -> bool {
        let message = error.item_message();
        warn!("Conversion failed for {}: {}", job.name, message);
        let committed = self.state.dispatch(Action::FailConversion {
            id: job.id.clone(),
            error: message.clone(),
        });
        if committed {
            self.state
                .notify(Notification::error(format!("Failed to convert {}: {message}", job.name)));
        }
        committed
    }
}
