//! Item record: one submitted image and its conversion lifecycle.

use std::fmt;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::preview::PreviewHandle;
use crate::core::types::{Artifact, ConversionOptions, Dimensions, ResizeSettings, SourceFile};
use crate::utils::ImageFormat;

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_LEN: usize = 9;

/// Opaque item identifier, stable for the item's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Random 9-character base-36 id
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let id = (0..ID_LEN)
            .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
            .collect();
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Lifecycle state. Artifact and error live inside the variants that own them.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemStatus {
    Pending,
    Converting { progress: u8 },
    Completed(Artifact),
    Error(String),
}

/// Data-free view of [`ItemStatus`] for events and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    Pending,
    Converting,
    Completed,
    Error,
}

impl ItemStatus {
    pub fn kind(&self) -> StatusKind {
        match self {
            Self::Pending => StatusKind::Pending,
            Self::Converting { .. } => StatusKind::Converting,
            Self::Completed(_) => StatusKind::Completed,
            Self::Error(_) => StatusKind::Error,
        }
    }
}

/// One user-submitted image awaiting, undergoing or done with conversion.
#[derive(Debug)]
pub struct Item {
    pub id: ItemId,
    pub source: SourceFile,
    pub source_format: ImageFormat,
    pub target_format: ImageFormat,
    pub resize_settings: ResizeSettings,
    pub options: ConversionOptions,
    pub original_dimensions: Option<Dimensions>,
    pub status: ItemStatus,
    /// Artifact of a conversion whose settings have since changed; dropped
    /// when the next conversion starts.
    pub stale_artifact: Option<Artifact>,
    /// Settings were edited while a pipeline was in flight
    pub(crate) dirty: bool,
    preview: PreviewHandle,
}

impl Item {
    pub(crate) fn new(
        id: ItemId,
        source: SourceFile,
        source_format: ImageFormat,
        preview: PreviewHandle,
        target_format: ImageFormat,
        options: ConversionOptions,
    ) -> Self {
        Self {
            id,
            source,
            source_format,
            target_format,
            resize_settings: ResizeSettings::default(),
            options,
            original_dimensions: None,
            status: ItemStatus::Pending,
            stale_artifact: None,
            dirty: false,
            preview,
        }
    }

    pub fn name(&self) -> &str {
        &self.source.name
    }

    pub fn preview(&self) -> &PreviewHandle {
        &self.preview
    }

    pub fn status_kind(&self) -> StatusKind {
        self.status.kind()
    }

    /// 0..=100; only meaningful while converting, 100 once completed
    pub fn progress(&self) -> u8 {
        match &self.status {
            ItemStatus::Converting { progress } => *progress,
            ItemStatus::Completed(_) => 100,
            _ => 0,
        }
    }

    pub fn artifact(&self) -> Option<&Artifact> {
        match &self.status {
            ItemStatus::Completed(artifact) => Some(artifact),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.status {
            ItemStatus::Error(msg) => Some(msg),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.status, ItemStatus::Pending)
    }

    /// Whether the item's size-dependent settings can be edited yet
    pub fn can_resize(&self) -> bool {
        self.original_dimensions.is_some()
    }

    /// `<base>-convertido.<ext>` for a single-file download
    pub fn download_name(&self) -> Option<String> {
        let artifact = self.artifact()?;
        Some(crate::export::download_name(self.name(), artifact.format))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_base36() {
        let id = ItemId::generate();
        assert_eq!(id.as_str().len(), ID_LEN);
        assert!(id.as_str().bytes().all(|b| ID_ALPHABET.contains(&b)));
        assert_ne!(ItemId::generate(), ItemId::generate());
    }

    #[test]
    fn status_kinds() {
        assert_eq!(ItemStatus::Pending.kind(), StatusKind::Pending);
        assert_eq!(ItemStatus::Converting { progress: 3 }.kind(), StatusKind::Converting);
        assert_eq!(ItemStatus::Error("x".into()).kind(), StatusKind::Error);
        assert_eq!(serde_json::to_value(StatusKind::Completed).unwrap(), "completed");
    }
}
