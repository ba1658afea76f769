//! Item registry: the single mutable collection of items.
//!
//! User edits and engine lifecycle transitions both go through
//! [`Registry::apply`] with an [`Action`]. Every action is total: naming an
//! id that is no longer present is a no-op, which is what lets an item be
//! removed while its conversion is still running.

use tracing::debug;

use crate::core::item::{Item, ItemId, ItemStatus};
use crate::core::preview::PreviewPool;
use crate::core::types::{
    Artifact, ConversionOptions, Dimensions, OptionsPatch, ResizePatch, ResizeSettings, SourceFile,
};
use crate::utils::ImageFormat;

/// Settings seeded into every newly inserted item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemDefaults {
    pub target_format: ImageFormat,
    pub options: ConversionOptions,
}

impl Default for ItemDefaults {
    fn default() -> Self {
        Self {
            target_format: ImageFormat::WebP,
            options: ConversionOptions::default(),
        }
    }
}

/// Update vocabulary shared by the UI and the batch engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SetTargetFormat { id: ItemId, format: ImageFormat },
    UpdateResizeSettings { id: ItemId, patch: ResizePatch },
    /// Replaces the resize settings of every item
    SetGlobalResizeSettings(ResizeSettings),
    SetOptions { id: ItemId, patch: OptionsPatch },
    /// Ignored once dimensions are known
    SetOriginalDimensions { id: ItemId, dimensions: Dimensions },
    StartConversion(ItemId),
    UpdateProgress { id: ItemId, progress: u8 },
    CompleteConversion { id: ItemId, artifact: Artifact },
    FailConversion { id: ItemId, error: String },
    /// Moves an errored item back to pending
    Retry(ItemId),
}

#[derive(Debug, Default)]
pub struct Registry {
    items: Vec<Item>,
    previews: PreviewPool,
    defaults: ItemDefaults,
}

impl Registry {
    pub fn new(defaults: ItemDefaults) -> Self {
        Self {
            items: Vec::new(),
            previews: PreviewPool::new(),
            defaults,
        }
    }

    /// Inserts a validated source, opening its preview handle.
    pub fn insert(&mut self, source: SourceFile, source_format: ImageFormat) -> ItemId {
        let mut id = ItemId::generate();
        while self.get(&id).is_some() {
            id = ItemId::generate();
        }
        let preview = self.previews.open(&source);
        debug!("Inserted {} as {} ({} bytes)", source.name, id, source.size());
        self.items.push(Item::new(
            id.clone(),
            source,
            source_format,
            preview,
            self.defaults.target_format,
            self.defaults.options,
        ));
        id
    }

    /// Removes an item and releases its preview. Returns whether it existed.
    pub fn remove(&mut self, id: &ItemId) -> bool {
        match self.items.iter().position(|item| &item.id == id) {
            Some(idx) => {
                // Dropping the item revokes its preview handle
                let item = self.items.remove(idx);
                debug!("Removed {} ({})", item.id, item.name());
                true
            }
            None => false,
        }
    }

    /// Removes every item, releasing all previews. Returns how many were removed.
    pub fn clear(&mut self) -> usize {
        let count = self.items.len();
        self.items.clear();
        count
    }

    pub fn get(&self, id: &ItemId) -> Option<&Item> {
        self.items.iter().find(|item| &item.id == id)
    }

    fn get_mut(&mut self, id: &ItemId) -> Option<&mut Item> {
        self.items.iter_mut().find(|item| &item.id == id)
    }

    /// Items in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn previews(&self) -> &PreviewPool {
        &self.previews
    }

    pub fn pending_ids(&self) -> Vec<ItemId> {
        self.items
            .iter()
            .filter(|item| item.is_pending())
            .map(|item| item.id.clone())
            .collect()
    }

    pub fn completed(&self) -> impl Iterator<Item = &Item> {
        self.items.iter().filter(|item| item.artifact().is_some())
    }

    /// Applies an action. Returns `false` when it touched nothing, either
    /// because the id is gone or because the transition does not apply.
    pub fn apply(&mut self, action: Action) -> bool {
        match action {
            Action::SetTargetFormat { id, format } => self.edit(&id, |item| {
                item.target_format = format;
            }),
            Action::UpdateResizeSettings { id, patch } => self.edit(&id, |item| {
                patch.apply(&mut item.resize_settings);
            }),
            Action::SetGlobalResizeSettings(settings) => {
                for item in &mut self.items {
                    item.resize_settings = settings;
                    require_reconversion(item);
                }
                !self.items.is_empty()
            }
            Action::SetOptions { id, patch } => self.edit(&id, |item| {
                patch.apply(&mut item.options);
            }),
            Action::SetOriginalDimensions { id, dimensions } => match self.get_mut(&id) {
                Some(item) if item.original_dimensions.is_none() => {
                    item.original_dimensions = Some(dimensions);
                    true
                }
                _ => false,
            },
            // A second start for a converting item is refused
            Action::StartConversion(id) => match self.get_mut(&id) {
                Some(item) if !matches!(item.status, ItemStatus::Converting { .. }) => {
                    item.status = ItemStatus::Converting { progress: 0 };
                    item.stale_artifact = None;
                    item.dirty = false;
                    true
                }
                _ => false,
            },
            Action::UpdateProgress { id, progress } => match self.get_mut(&id) {
                Some(Item { status: ItemStatus::Converting { progress: current }, .. }) => {
                    *current = (*current).max(progress.min(100));
                    true
                }
                _ => false,
            },
            Action::CompleteConversion { id, artifact } => match self.converting_mut(&id) {
                Some(item) if item.dirty => {
                    debug!("{} changed during conversion; back to pending", item.id);
                    item.dirty = false;
                    item.stale_artifact = Some(artifact);
                    item.status = ItemStatus::Pending;
                    true
                }
                Some(item) => {
                    item.status = ItemStatus::Completed(artifact);
                    true
                }
                None => false,
            },
            Action::FailConversion { id, error } => match self.converting_mut(&id) {
                Some(item) if item.dirty => {
                    item.dirty = false;
                    item.status = ItemStatus::Pending;
                    true
                }
                Some(item) => {
                    item.status = ItemStatus::Error(error);
                    true
                }
                None => false,
            },
            Action::Retry(id) => match self.get_mut(&id) {
                Some(item) if matches!(item.status, ItemStatus::Error(_)) => {
                    item.status = ItemStatus::Pending;
                    true
                }
                _ => false,
            },
        }
    }

    fn converting_mut(&mut self, id: &ItemId) -> Option<&mut Item> {
        self.get_mut(id)
            .filter(|item| matches!(item.status, ItemStatus::Converting { .. }))
    }

    /// Applies a settings edit and marks the item as needing a fresh conversion.
    fn edit(&mut self, id: &ItemId, f: impl FnOnce(&mut Item)) -> bool {
        match self.get_mut(id) {
            Some(item) => {
                f(item);
                require_reconversion(item);
                true
            }
            None => false,
        }
    }
}

fn require_reconversion(item: &mut Item) {
    let status = std::mem::replace(&mut item.status, ItemStatus::Pending);
    item.status = match status {
        ItemStatus::Completed(artifact) => {
            item.stale_artifact = Some(artifact);
            ItemStatus::Pending
        }
        // The in-flight pipeline keeps the settings it captured at start
        converting @ ItemStatus::Converting { .. } => {
            item.dirty = true;
            converting
        }
        ItemStatus::Pending | ItemStatus::Error(_) => ItemStatus::Pending,
    };
}
