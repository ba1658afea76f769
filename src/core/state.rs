//! Shared converter state.
//!
//! [`AppState`] is cheap to clone; every clone points at the same registry,
//! history, store and event sink. Locks are never held across an `.await`.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::core::config::ConverterConfig;
use crate::core::item::{ItemId, ItemStatus, StatusKind};
use crate::core::progress::{ConverterEvent, EventSink, Notification};
use crate::core::registry::{Action, Registry};
use crate::core::types::{
    Dimensions, OptionsPatch, PartialDimensions, ResizeMode, ResizePatch, ResizePreset,
    ResizeSettings, SourceFile,
};
use crate::history::{HISTORY_KEY, HistoryLog, HistoryRecord, KeyValueStore, RENAME_KEY};
use crate::processing::geometry;
use crate::utils::{ConverterError, ConverterResult, ImageFormat, validate_source};

/// Outcome of offering a set of files for ingestion.
#[derive(Debug, Default)]
pub struct IngestReport {
    pub added: Vec<ItemId>,
    pub rejected: Vec<ConverterError>,
}

#[derive(Clone)]
pub struct AppState {
    registry: Arc<Mutex<Registry>>,
    history: Arc<Mutex<HistoryLog>>,
    /// Serializes history writes so a newer snapshot is never overwritten
    history_writer: Arc<tokio::sync::Mutex<()>>,
    rename_pattern: Arc<Mutex<Option<String>>>,
    store: Arc<dyn KeyValueStore>,
    events: Arc<dyn EventSink>,
    converting: Arc<AtomicBool>,
    global_progress: Arc<AtomicU8>,
    config: Arc<ConverterConfig>,
}

impl AppState {
    /// Creates the state and loads history and rename pattern from `store`.
    ///
    /// Unreadable persisted data is logged and ignored so a damaged store
    /// never prevents startup.
    pub fn new(
        config: ConverterConfig,
        store: Arc<dyn KeyValueStore>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        let history = HistoryLog::load(store.as_ref(), config.history_limit).unwrap_or_else(|e| {
            warn!("Failed to load history: {e}");
            HistoryLog::new(config.history_limit)
        });
        let rename_pattern = match store.get(RENAME_KEY) {
            Ok(Some(Value::String(pattern))) => Some(pattern),
            Ok(_) => None,
            Err(e) => {
                warn!("Failed to load rename pattern: {e}");
                None
            }
        };
        debug!("State ready ({} history entries)", history.len());

        Self {
            registry: Arc::new(Mutex::new(Registry::new(config.item_defaults()))),
            history: Arc::new(Mutex::new(history)),
            history_writer: Arc::new(tokio::sync::Mutex::new(())),
            rename_pattern: Arc::new(Mutex::new(rename_pattern)),
            store,
            events,
            converting: Arc::new(AtomicBool::new(false)),
            global_progress: Arc::new(AtomicU8::new(0)),
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Locks the registry. Drop the guard before awaiting.
    pub fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn history(&self) -> Vec<HistoryRecord> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .records()
            .cloned()
            .collect()
    }

    pub fn rename_pattern(&self) -> Option<String> {
        self.rename_pattern
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_converting(&self) -> bool {
        self.converting.load(Ordering::SeqCst)
    }

    pub fn global_progress(&self) -> u8 {
        self.global_progress.load(Ordering::SeqCst)
    }

    // ── Events ────────────────────────────────────────────────────────────────────────

    pub fn emit(&self, event: ConverterEvent) {
        self.events.emit(event);
    }

    pub fn notify(&self, notification: Notification) {
        debug!("Notify {:?}: {}", notification.level, notification.message);
        self.emit(ConverterEvent::Notification(notification));
    }

    /// Applies an action and reports the resulting status or progress change.
    pub fn dispatch(&self, action: Action) -> bool {
        let touched = match &action {
            Action::SetGlobalResizeSettings(_) => None,
            Action::SetTargetFormat { id, .. }
            | Action::UpdateResizeSettings { id, .. }
            | Action::SetOptions { id, .. }
            | Action::SetOriginalDimensions { id, .. }
            | Action::StartConversion(id)
            | Action::UpdateProgress { id, .. }
            | Action::CompleteConversion { id, .. }
            | Action::FailConversion { id, .. }
            | Action::Retry(id) => Some(id.clone()),
        };

        let mut registry = self.registry();
        let before = touched
            .as_ref()
            .and_then(|id| registry.get(id))
            .map(|item| (item.status_kind(), item.progress()));
        let applied = registry.apply(action);
        let after = touched.as_ref().and_then(|id| registry.get(id)).map(|item| {
            (item.status_kind(), item.progress(), item.error().map(str::to_string))
        });
        drop(registry);

        if let (Some(id), Some((kind, progress)), Some((new_kind, new_progress, error))) =
            (touched, before, after)
        {
            if kind != new_kind {
                self.emit(ConverterEvent::ItemStatus { id: id.clone(), status: new_kind, error });
            }
            if new_progress != progress && new_kind == StatusKind::Converting {
                self.emit(ConverterEvent::ItemProgress { id, progress: new_progress });
            }
        }
        applied
    }

    // ── Ingestion and removal ─────────────────────────────────────────────────────────

    /// Validates each file; valid ones become pending items, invalid ones are
    /// reported individually and do not block the rest.
    pub fn add_files(&self, files: impl IntoIterator<Item = SourceFile>) -> IngestReport {
        let mut report = IngestReport::default();
        for file in files {
            match validate_source(&file) {
                Ok(format) => {
                    if !format.is_decodable() {
                        warn!("{} cannot be decoded by this build", file.name);
                        self.notify(Notification::info(format!(
                            "{}: {} decoding is unavailable in this build; conversion will fail",
                            file.name,
                            format.as_str().to_uppercase()
                        )));
                    }
                    let id = self.registry().insert(file, format);
                    report.added.push(id);
                }
                Err(e) => {
                    warn!("Rejected input: {e}");
                    self.notify(Notification::error(e.to_string()));
                    report.rejected.push(e);
                }
            }
        }
        if !report.added.is_empty() {
            info!("Added {} file(s)", report.added.len());
            self.notify(Notification::success(format!("{} file(s) added", report.added.len())));
        }
        report
    }

    /// Removes one item, releasing its preview. Safe while it is converting.
    pub fn remove(&self, id: &ItemId) -> bool {
        self.registry().remove(id)
    }

    pub fn clear(&self) -> usize {
        let removed = self.registry().clear();
        info!("Cleared {removed} item(s)");
        self.notify(Notification::info("All files were removed"));
        removed
    }

    // ── Settings edits ────────────────────────────────────────────────────────────────

    pub fn set_target_format(&self, id: &ItemId, format: ImageFormat) -> ConverterResult<()> {
        self.require(id, Action::SetTargetFormat { id: id.clone(), format })?;
        if format.is_degraded() {
            self.notify(Notification::info(
                "TIFF/ICO output is limited; PNG is used internally",
            ));
        }
        Ok(())
    }

    pub fn update_resize(&self, id: &ItemId, patch: ResizePatch) -> ConverterResult<()> {
        self.require(id, Action::UpdateResizeSettings { id: id.clone(), patch })
    }

    pub fn set_options(&self, id: &ItemId, patch: OptionsPatch) -> ConverterResult<()> {
        self.require(id, Action::SetOptions { id: id.clone(), patch })
    }

    /// Sets a new explicit target for one item and enables resize.
    ///
    /// With the aspect lock on, a single axis derives the other from the
    /// original size. Returns the size that was applied.
    pub fn set_resize_target(
        &self,
        id: &ItemId,
        target: PartialDimensions,
    ) -> ConverterResult<Dimensions> {
        let (original, settings) = {
            let registry = self.registry();
            let item = registry
                .get(id)
                .ok_or_else(|| ConverterError::ItemNotFound(id.clone()))?;
            (item.original_dimensions, item.resize_settings)
        };
        let original = original.ok_or(ConverterError::MissingDimensions)?;

        let dimensions = if settings.maintain_aspect_ratio {
            geometry::aspect_preserve(original, target)
        } else {
            Dimensions::new(
                target.width.or(settings.width).unwrap_or(original.width),
                target.height.or(settings.height).unwrap_or(original.height),
            )
        };
        if !geometry::validate(dimensions.into()) {
            return Err(ConverterError::invalid_dimensions(format!(
                "{}×{} is outside {}..={}",
                dimensions.width,
                dimensions.height,
                geometry::MIN_DIMENSION,
                geometry::MAX_DIMENSION
            )));
        }

        self.update_resize(
            id,
            ResizePatch {
                width: Some(dimensions.width),
                height: Some(dimensions.height),
                enabled: Some(true),
                ..Default::default()
            },
        )?;
        self.notify(Notification::success("Resize settings applied"));
        Ok(dimensions)
    }

    pub fn disable_resize(&self, id: &ItemId) -> ConverterResult<()> {
        self.update_resize(id, ResizePatch { enabled: Some(false), ..Default::default() })
    }

    /// Replaces every item's resize settings. Returns how many items changed.
    pub fn set_global_resize(&self, settings: ResizeSettings) -> usize {
        let count = self.registry().len();
        if self.dispatch(Action::SetGlobalResizeSettings(settings)) {
            info!("Global resize applied to {count} item(s)");
            self.notify(Notification::success(format!("Resize applied to {count} file(s)")));
        }
        count
    }

    pub fn apply_resize_preset(&self, preset: ResizePreset, mode: ResizeMode) -> usize {
        self.set_global_resize(preset.settings(mode))
    }

    pub fn retry(&self, id: &ItemId) -> bool {
        self.dispatch(Action::Retry(id.clone()))
    }

    pub fn set_rename_pattern(&self, pattern: Option<String>) -> ConverterResult<()> {
        let pattern = pattern.filter(|p| !p.trim().is_empty());
        let value = pattern.clone().map(Value::String).unwrap_or(Value::Null);
        *self.rename_pattern.lock().unwrap_or_else(PoisonError::into_inner) = pattern;
        self.store.set(RENAME_KEY, value)
    }

    // ── Batch run flags and commits (used by the batch processor) ─────────────────────

    /// Raises the converting flag. `false` if a run already holds it.
    pub(crate) fn try_begin_run(&self) -> bool {
        let acquired = self
            .converting
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        if acquired {
            self.global_progress.store(0, Ordering::SeqCst);
        }
        acquired
    }

    pub(crate) fn end_run(&self) {
        self.converting.store(false, Ordering::SeqCst);
    }

    /// Stores global progress; it never moves backwards within a run.
    pub(crate) fn set_global_progress(&self, progress: u8) {
        self.global_progress.fetch_max(progress.min(100), Ordering::SeqCst);
    }

    /// Appends a record and persists the log. Persistence failures are logged.
    ///
    /// The store write runs on the blocking pool with the history lock
    /// released.
    pub(crate) async fn record_history(&self, record: HistoryRecord) {
        let _writer = self.history_writer.lock().await;
        let snapshot = {
            let mut history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
            history.push(record);
            history.to_value()
        };
        if let Err(e) = self.write_history(snapshot).await {
            warn!("Failed to persist history: {e}");
        }
    }

    async fn write_history(&self, snapshot: ConverterResult<Value>) -> ConverterResult<()> {
        let value = snapshot?;
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || store.set(HISTORY_KEY, value)).await?
    }

    /// Dispatches an edit that must name an existing item.
    fn require(&self, id: &ItemId, action: Action) -> ConverterResult<()> {
        if self.dispatch(action) {
            Ok(())
        } else {
            Err(ConverterError::ItemNotFound(id.clone()))
        }
    }

    /// Status of an item, if it still exists.
    pub fn status(&self, id: &ItemId) -> Option<ItemStatus> {
        self.registry().get(id).map(|item| item.status.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::progress::{MemorySink, NotificationLevel};
    use crate::core::types::ImageBlob;
    use crate::history::{HISTORY_KEY, MemoryStore};

    fn state() -> (AppState, MemorySink, Arc<MemoryStore>) {
        let sink = MemorySink::new();
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(ConverterConfig::default(), store.clone(), Arc::new(sink.clone()));
        (state, sink, store)
    }

    fn png(name: &str) -> SourceFile {
        SourceFile::new(name, "image/png", vec![1, 2, 3])
    }

    #[test]
    fn ingestion_rejects_per_file() {
        let (state, sink, _) = state();
        let report = state.add_files(vec![
            png("a.png"),
            SourceFile::new("b.gif", "image/gif", vec![1]),
            png("c.png"),
        ]);
        assert_eq!(report.added.len(), 2);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(state.registry().len(), 2);

        let notes = sink.notifications();
        assert_eq!(notes[0].level, NotificationLevel::Error);
        assert!(notes[0].message.contains("b.gif"));
        assert_eq!(notes[1].message, "2 file(s) added");
    }

    #[test]
    fn avif_is_accepted_and_flagged_when_undecodable() {
        let (state, sink, _) = state();
        let report = state.add_files(vec![SourceFile::new("photo.avif", "image/avif", vec![1])]);
        assert_eq!(report.added.len(), 1);
        assert!(report.rejected.is_empty());

        let warned = sink
            .notifications()
            .iter()
            .any(|n| n.level == NotificationLevel::Info && n.message.starts_with("photo.avif: AVIF"));
        assert_eq!(warned, !ImageFormat::AVIF.is_decodable());
    }

    #[test]
    fn new_items_use_configured_defaults() {
        let config = ConverterConfig {
            default_format: ImageFormat::AVIF,
            ..Default::default()
        };
        let state = AppState::new(config, Arc::new(MemoryStore::new()), Arc::new(MemorySink::new()));
        let id = state.add_files(vec![png("a.png")]).added.remove(0);
        assert_eq!(state.registry().get(&id).unwrap().target_format, ImageFormat::AVIF);
    }

    #[test]
    fn degraded_format_emits_info() {
        let (state, sink, _) = state();
        let id = state.add_files(vec![png("a.png")]).added.remove(0);
        state.set_target_format(&id, ImageFormat::ICO).unwrap();
        let last = sink.notifications().pop().unwrap();
        assert_eq!(last.level, NotificationLevel::Info);
        assert!(last.message.contains("PNG"));
    }

    #[test]
    fn edits_on_missing_items_report_not_found() {
        let (state, _, _) = state();
        let ghost = ItemId::from("ghost");
        assert_eq!(
            state.set_target_format(&ghost, ImageFormat::PNG),
            Err(ConverterError::ItemNotFound(ghost.clone()))
        );
        assert!(!state.retry(&ghost));
    }

    #[test]
    fn resize_target_needs_original_dimensions() {
        let (state, _, _) = state();
        let id = state.add_files(vec![png("a.png")]).added.remove(0);
        assert_eq!(
            state.set_resize_target(&id, PartialDimensions::width(960)),
            Err(ConverterError::MissingDimensions)
        );
    }

    #[test]
    fn resize_target_derives_the_locked_axis() {
        let (state, _, _) = state();
        let id = state.add_files(vec![png("a.png")]).added.remove(0);
        state.dispatch(Action::SetOriginalDimensions {
            id: id.clone(),
            dimensions: Dimensions::new(1920, 1080),
        });

        let applied = state.set_resize_target(&id, PartialDimensions::width(960)).unwrap();
        assert_eq!(applied, Dimensions::new(960, 540));
        let settings = state.registry().get(&id).unwrap().resize_settings;
        assert!(settings.enabled);
        assert_eq!(settings.target().complete(), Some(applied));

        assert!(matches!(
            state.set_resize_target(&id, PartialDimensions::width(15_000)),
            Err(ConverterError::InvalidDimensions(_))
        ));
    }

    #[test]
    fn unlocked_resize_target_keeps_other_axis() {
        let (state, _, _) = state();
        let id = state.add_files(vec![png("a.png")]).added.remove(0);
        state.dispatch(Action::SetOriginalDimensions {
            id: id.clone(),
            dimensions: Dimensions::new(1920, 1080),
        });
        state
            .update_resize(&id, ResizePatch { maintain_aspect_ratio: Some(false), ..Default::default() })
            .unwrap();
        let applied = state.set_resize_target(&id, PartialDimensions::width(500)).unwrap();
        assert_eq!(applied, Dimensions::new(500, 1080));
    }

    #[test]
    fn global_preset_resets_completed_items() {
        let (state, sink, _) = state();
        let id = state.add_files(vec![png("a.png")]).added.remove(0);
        state.dispatch(Action::StartConversion(id.clone()));
        state.dispatch(Action::CompleteConversion {
            id: id.clone(),
            artifact: ImageBlob::new(vec![9], ImageFormat::WebP),
        });

        let preset = ResizePreset::find("HD").unwrap();
        assert_eq!(state.apply_resize_preset(preset, ResizeMode::Fit), 1);
        let registry = state.registry();
        let item = registry.get(&id).unwrap();
        assert_eq!(item.status_kind(), StatusKind::Pending);
        assert!(item.stale_artifact.is_some());
        assert_eq!(item.resize_settings.target().complete(), Some(Dimensions::new(1920, 1080)));
        drop(registry);
        assert_eq!(sink.notifications().pop().unwrap().message, "Resize applied to 1 file(s)");
    }

    #[test]
    fn dispatch_reports_status_and_progress() {
        let (state, sink, _) = state();
        let id = state.add_files(vec![png("a.png")]).added.remove(0);
        state.dispatch(Action::StartConversion(id.clone()));
        state.dispatch(Action::UpdateProgress { id: id.clone(), progress: 40 });
        state.dispatch(Action::UpdateProgress { id: id.clone(), progress: 20 });
        state.dispatch(Action::FailConversion { id: id.clone(), error: "boom".into() });

        assert_eq!(sink.progress_of(&id), vec![40]);
        let statuses: Vec<_> = sink
            .events()
            .into_iter()
            .filter_map(|e| match e {
                ConverterEvent::ItemStatus { status, error, .. } => Some((status, error)),
                _ => None,
            })
            .collect();
        assert_eq!(
            statuses,
            vec![
                (StatusKind::Converting, None),
                (StatusKind::Error, Some("boom".to_string())),
            ]
        );
    }

    #[test]
    fn rename_pattern_round_trips_through_store() {
        let (state, _, store) = state();
        state.set_rename_pattern(Some("photo-{n}".into())).unwrap();
        assert_eq!(store.get(RENAME_KEY).unwrap(), Some(Value::String("photo-{n}".into())));

        let reloaded = AppState::new(ConverterConfig::default(), store.clone(), Arc::new(MemorySink::new()));
        assert_eq!(reloaded.rename_pattern().as_deref(), Some("photo-{n}"));

        state.set_rename_pattern(Some("  ".into())).unwrap();
        assert_eq!(state.rename_pattern(), None);
        assert_eq!(store.get(RENAME_KEY).unwrap(), Some(Value::Null));
    }

    #[test]
    fn history_is_loaded_at_startup() {
        let store = Arc::new(MemoryStore::new());
        store
            .set(
                HISTORY_KEY,
                serde_json::json!([{
                    "id": "abc", "name": "a.png", "from": "image/png", "to": "webp",
                    "sizeIn": 10, "sizeOut": 5, "date": 1
                }]),
            )
            .unwrap();
        let state = AppState::new(ConverterConfig::default(), store, Arc::new(MemorySink::new()));
        assert_eq!(state.history().len(), 1);
        assert_eq!(state.history()[0].name, "a.png");
    }

    /// Store that records whether the history lock was free during each write.
    struct LockCheckingStore {
        state: std::sync::OnceLock<AppState>,
        history_free: Mutex<Vec<bool>>,
        inner: MemoryStore,
    }

    impl KeyValueStore for LockCheckingStore {
        fn get(&self, key: &str) -> ConverterResult<Option<Value>> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: Value) -> ConverterResult<()> {
            if let Some(state) = self.state.get() {
                let free = state.history.try_lock().is_ok();
                self.history_free.lock().unwrap().push(free);
            }
            self.inner.set(key, value)
        }
    }

    fn record(id: &str, date: i64) -> HistoryRecord {
        HistoryRecord {
            id: ItemId::from(id),
            name: format!("{id}.png"),
            from: "image/png".into(),
            to: ImageFormat::WebP,
            size_in: 10,
            size_out: 5,
            date,
        }
    }

    #[tokio::test]
    async fn history_is_written_with_the_lock_released() {
        let store = Arc::new(LockCheckingStore {
            state: std::sync::OnceLock::new(),
            history_free: Mutex::new(Vec::new()),
            inner: MemoryStore::new(),
        });
        let state = AppState::new(ConverterConfig::default(), store.clone(), Arc::new(MemorySink::new()));
        assert!(store.state.set(state.clone()).is_ok());

        state.record_history(record("a", 1)).await;
        state.record_history(record("b", 2)).await;

        assert_eq!(*store.history_free.lock().unwrap(), vec![true, true]);
        let saved = store.inner.get(HISTORY_KEY).unwrap().unwrap();
        assert_eq!(saved[0]["id"], "b");
        assert_eq!(saved.as_array().unwrap().len(), 2);
    }

    #[test]
    fn only_one_run_holds_the_flag() {
        let (state, _, _) = state();
        assert!(state.try_begin_run());
        assert!(!state.try_begin_run());
        state.set_global_progress(60);
        state.set_global_progress(30);
        assert_eq!(state.global_progress(), 60);
        state.end_run();
        assert!(!state.is_converting());
    }
}
