//! Artifact persistence: local check, upload, render, print.
//!
//! Every step is attempted independently and reported, so one failing
//! collaborator never stops the others or the remaining images.

use crate::domain::artifact::{ArtifactMetadata, ArtifactReport, FinalizationReport, StepOutcome};
use crate::domain::entities::{IntakeRecord, StoredImage};
use crate::domain::errors::CollaboratorError;
use crate::ports::outbound::{
    DocumentHeader, DocumentRenderer, ImageStore, ObjectStorage, PrintSpooler, UploadRequest,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Remote upload destination.
#[derive(Clone)]
pub struct UploadTarget {
    pub storage: Arc<dyn ObjectStorage>,
    pub parent_folder: String,
}

/// Printer destination.
#[derive(Clone)]
pub struct PrintTarget {
    pub spooler: Arc<dyn PrintSpooler>,
    pub printer: String,
}

/// Persists the images of a finalized intake.
#[derive(Clone)]
pub struct ArtifactPipeline {
    images: Arc<dyn ImageStore>,
    renderer: Arc<dyn DocumentRenderer>,
    upload: Option<UploadTarget>,
    print: Option<PrintTarget>,
}

impl ArtifactPipeline {
    pub fn new(
        images: Arc<dyn ImageStore>,
        renderer: Arc<dyn DocumentRenderer>,
        upload: Option<UploadTarget>,
        print: Option<PrintTarget>,
    ) -> Self {
        Self {
            images,
            renderer,
            upload,
            print,
        }
    }

    /// Run every image of `record` through the pipeline, in receipt order.
    pub async fn finalize(&self, record: &IntakeRecord) -> FinalizationReport {
        let mut artifacts = Vec::with_capacity(record.images.len());
        for (image, metadata) in ArtifactMetadata::for_record(record) {
            artifacts.push(self.persist(&image, &metadata).await);
        }

        let report = FinalizationReport { artifacts };
        if report.is_clean() {
            info!(
                receipt_id = %record.receipt_id,
                images = record.images.len(),
                "[rx-intake] ✅ artifacts persisted"
            );
        } else {
            warn!(
                receipt_id = %record.receipt_id,
                images = record.images.len(),
                failed = report.failed_artifacts(),
                "[rx-intake] artifacts persisted with failures"
            );
        }
        report
    }

    /// Persist one image.
    pub async fn persist(&self, image: &StoredImage, metadata: &ArtifactMetadata) -> ArtifactReport {
        let mut report = ArtifactReport {
            index: metadata.index,
            local: StepOutcome::Skipped,
            upload: StepOutcome::Skipped,
            render: StepOutcome::Skipped,
            print: StepOutcome::Skipped,
        };

        if !self.images.exists(&image.path).await {
            let err = CollaboratorError::MissingLocalFile {
                path: image.path.clone(),
            };
            report.local = failed(metadata, err);
            return report;
        }
        report.local = StepOutcome::Done;

        if let Some(target) = &self.upload {
            report.upload = match self.upload(target, image, metadata).await {
                Ok(object_id) => {
                    debug!(
                        receipt_id = %metadata.receipt_id,
                        index = metadata.index,
                        object_id = %object_id,
                        "[rx-intake] uploaded"
                    );
                    StepOutcome::Done
                }
                Err(err) => failed(metadata, err),
            };
        }

        let document = self.images.document_path(&metadata.stem());
        let header = DocumentHeader {
            lines: metadata.header_lines(),
        };
        report.render = match self.renderer.render(&image.path, &header, &document).await {
            Ok(()) => StepOutcome::Done,
            Err(err) => failed(metadata, err),
        };

        if let (Some(target), StepOutcome::Done) = (&self.print, &report.render) {
            report.print = match target.spooler.print(&document, &target.printer).await {
                Ok(()) => StepOutcome::Done,
                Err(err) => failed(metadata, err),
            };
        }

        report
    }

    async fn upload(
        &self,
        target: &UploadTarget,
        image: &StoredImage,
        metadata: &ArtifactMetadata,
    ) -> Result<String, CollaboratorError> {
        let bytes = self.images.load(&image.path).await?;
        let name = metadata.object_name();
        let properties = metadata.properties();
        target
            .storage
            .upload(UploadRequest {
                bytes: &bytes,
                name: &name,
                parent_folder: &target.parent_folder,
                properties: &properties,
            })
            .await
    }
}

fn failed(metadata: &ArtifactMetadata, err: CollaboratorError) -> StepOutcome {
    warn!(
        receipt_id = %metadata.receipt_id,
        index = metadata.index,
        step = err.step(),
        "[rx-intake] artifact step failed: {}",
        err
    );
    StepOutcome::Failed(err.to_string())
}
