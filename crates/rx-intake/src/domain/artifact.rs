//! # Artifact Records
//!
//! Metadata attached to each persisted image and the per-step outcome of the
//! persistence pipeline.

use crate::domain::entities::{artifact_stem, IntakeRecord, ReceiptId, StoredImage};
use std::collections::BTreeMap;

/// Metadata stored with one image of a finalized intake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactMetadata {
    pub receipt_id: ReceiptId,
    pub phone: String,
    pub pickup_time: String,
    /// 1-based index of this image.
    pub index: u32,
    /// Number of images in the intake.
    pub total: usize,
}

impl ArtifactMetadata {
    /// One metadata block per image, in receipt order.
    pub fn for_record(record: &IntakeRecord) -> Vec<(StoredImage, ArtifactMetadata)> {
        let total = record.images.len();
        record
            .images
            .iter()
            .map(|image| {
                (
                    image.clone(),
                    ArtifactMetadata {
                        receipt_id: record.receipt_id,
                        phone: record.phone.clone(),
                        pickup_time: record.pickup_time.clone(),
                        index: image.index,
                        total,
                    },
                )
            })
            .collect()
    }

    pub fn stem(&self) -> String {
        artifact_stem(&self.receipt_id, self.index)
    }

    /// Remote object name: `<receipt_id>_<index>.jpg`.
    pub fn object_name(&self) -> String {
        format!("{}.jpg", self.stem())
    }

    /// Remote object properties.
    pub fn properties(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("reception_id".to_string(), self.receipt_id.to_string()),
            ("phone".to_string(), self.phone.clone()),
            ("pickup_time".to_string(), self.pickup_time.clone()),
        ])
    }

    /// Header printed on the document, top to bottom.
    pub fn header_lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("受付番号: {}", self.receipt_id),
            format!("電話番号: {}", self.phone),
            format!("受取日時: {}", self.pickup_time),
        ];
        if self.total > 1 {
            lines.push(format!("画像: {}/{}", self.index, self.total));
        }
        lines
    }
}

/// Result of one pipeline step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Done,
    /// Not configured, or not attempted because a prerequisite failed.
    Skipped,
    Failed(String),
}

impl StepOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, StepOutcome::Failed(_))
    }
}

/// Per-image pipeline outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactReport {
    pub index: u32,
    pub local: StepOutcome,
    pub upload: StepOutcome,
    pub render: StepOutcome,
    pub print: StepOutcome,
}

impl ArtifactReport {
    pub fn has_failure(&self) -> bool {
        !self.failed_steps().is_empty()
    }

    /// Labels of the steps that failed, in pipeline order.
    pub fn failed_steps(&self) -> Vec<&'static str> {
        [
            ("local_check", &self.local),
            ("upload", &self.upload),
            ("render", &self.render),
            ("print", &self.print),
        ]
        .into_iter()
        .filter(|(_, outcome)| outcome.is_failed())
        .map(|(step, _)| step)
        .collect()
    }
}

/// Outcome of finalizing one intake.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FinalizationReport {
    pub artifacts: Vec<ArtifactReport>,
}

impl FinalizationReport {
    /// Number of images with at least one failed step.
    pub fn failed_artifacts(&self) -> usize {
        self.artifacts.iter().filter(|a| a.has_failure()).count()
    }

    pub fn is_clean(&self) -> bool {
        self.failed_artifacts() == 0
    }
}
