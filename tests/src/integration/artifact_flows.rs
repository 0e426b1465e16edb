//! # Artifact Flows
//!
//! The intake service over a real artifact directory: JPEG files, rendered
//! PDFs and restart behaviour.

#[cfg(test)]
mod tests {
    use rx_intake::test_utils::{
        test_now, FakeMessagingClient, RecordingSpooler, RecordingStorage,
    };
    use rx_intake::{
        EventOutcome, InMemorySessionStore, InboundEvent, IntakeApi, IntakeConfig,
        IntakeDependencies, IntakeService, LocalImageStore, ManualClock, PdfDocumentRenderer,
        PrintTarget, UploadTarget,
    };
    use std::path::Path;
    use std::sync::Arc;

    struct Fixture {
        service: IntakeService,
        messaging: Arc<FakeMessagingClient>,
        storage: Arc<RecordingStorage>,
        spooler: Arc<RecordingSpooler>,
    }

    fn fixture(dir: &Path) -> Fixture {
        let messaging = Arc::new(FakeMessagingClient::new());
        let storage = Arc::new(RecordingStorage::new());
        let spooler = Arc::new(RecordingSpooler::new());
        let deps = IntakeDependencies {
            sessions: Arc::new(InMemorySessionStore::new()),
            clock: Arc::new(ManualClock::new(test_now())),
            messaging: messaging.clone(),
            images: Arc::new(LocalImageStore::new(dir)),
            renderer: Arc::new(PdfDocumentRenderer::default()),
            upload: Some(UploadTarget {
                storage: storage.clone(),
                parent_folder: "drive-folder".into(),
            }),
            print: Some(PrintTarget {
                spooler: spooler.clone(),
                printer: "counter".into(),
            }),
        };
        Fixture {
            service: IntakeService::new(deps, IntakeConfig::default()),
            messaging,
            storage,
            spooler,
        }
    }

    async fn complete_intake(
        service: &IntakeService,
        user: &str,
        images: &[&str],
    ) -> EventOutcome {
        service.handle_event(InboundEvent::text(user, "同意")).await;
        for image in images {
            service.handle_event(InboundEvent::image(user, *image)).await;
        }
        service
            .handle_event(InboundEvent::text(user, "09012345678"))
            .await;
        service
            .handle_event(InboundEvent::text(user, "6月14日 15時"))
            .await
    }

    fn sorted_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_intake_writes_images_and_documents() {
        let dir = tempfile::tempdir().unwrap();
        let f = fixture(dir.path());

        let outcome = complete_intake(&f.service, "U1", &["m1", "m2"]).await;

        assert_eq!(
            outcome.finalized.map(|id| id.to_string()).as_deref(),
            Some("202406140001")
        );
        assert!(outcome.report.as_ref().unwrap().is_clean());
        assert_eq!(
            sorted_names(dir.path()),
            vec![
                "202406140001_1.jpg",
                "202406140001_1.pdf",
                "202406140001_2.jpg",
                "202406140001_2.pdf",
            ]
        );

        let pdf = std::fs::read(dir.path().join("202406140001_1.pdf")).unwrap();
        assert!(pdf.starts_with(b"%PDF-"));
        assert!(pdf.ends_with(b"%%EOF\n"));

        let uploads = f.storage.uploads();
        assert_eq!(uploads.len(), 2);
        assert_eq!(uploads[0].parent_folder, "drive-folder");
        assert_eq!(uploads[0].properties["pickup_time"], "6月14日 15時");

        let printed = f.spooler.printed();
        assert_eq!(printed[0].0, dir.path().join("202406140001_1.pdf"));
        assert_eq!(printed[0].1, "counter");
    }

    #[tokio::test]
    async fn test_restart_resumes_numbering_from_files() {
        let dir = tempfile::tempdir().unwrap();

        let first = fixture(dir.path());
        complete_intake(&first.service, "U1", &["m1"]).await;
        complete_intake(&first.service, "U2", &["m2"]).await;
        drop(first);

        let restarted = fixture(dir.path());
        let outcome = complete_intake(&restarted.service, "U3", &["m3"]).await;

        assert_eq!(
            outcome.finalized.map(|id| id.to_string()).as_deref(),
            Some("202406140003")
        );
    }

    #[tokio::test]
    async fn test_unrenderable_image_degrades_gracefully() {
        let dir = tempfile::tempdir().unwrap();
        let f = fixture(dir.path());
        f.messaging.set_content("broken", b"definitely not a jpeg".to_vec());

        let outcome = complete_intake(&f.service, "U1", &["broken"]).await;

        let report = outcome.report.clone().unwrap();
        assert_eq!(report.failed_artifacts(), 1);
        assert!(report.artifacts[0].render.is_failed());
        assert!(f.spooler.printed().is_empty());
        assert_eq!(f.storage.uploads().len(), 1);
        assert!(outcome.reply_text().contains("失敗しました"));
        assert_eq!(sorted_names(dir.path()), vec!["202406140001_1.jpg"]);
    }

    #[tokio::test]
    async fn test_truncated_image_does_not_stop_later_images() {
        let dir = tempfile::tempdir().unwrap();
        let f = fixture(dir.path());
        f.messaging
            .set_content("trunc", vec![0xFF, 0xD8, 0xFF, 0xFF]);

        let outcome = complete_intake(&f.service, "U1", &["trunc", "good"]).await;

        assert_eq!(
            outcome.finalized.map(|id| id.to_string()).as_deref(),
            Some("202406140001")
        );
        let report = outcome.report.clone().unwrap();
        assert!(report.artifacts[0].render.is_failed());
        assert!(!report.artifacts[1].has_failure());
        assert!(outcome.reply_text().contains("失敗しました"));
        assert_eq!(f.service.active_sessions(), 0);
        assert_eq!(
            sorted_names(dir.path()),
            vec![
                "202406140001_1.jpg",
                "202406140001_2.jpg",
                "202406140001_2.pdf",
            ]
        );
        assert_eq!(f.spooler.printed().len(), 1);
    }

    #[tokio::test]
    async fn test_deleted_image_is_reported_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let f = fixture(dir.path());

        f.service.handle_event(InboundEvent::text("U1", "同意")).await;
        f.service.handle_event(InboundEvent::image("U1", "m1")).await;
        f.service.handle_event(InboundEvent::image("U1", "m2")).await;
        std::fs::remove_file(dir.path().join("202406140001_1.jpg")).unwrap();
        f.service
            .handle_event(InboundEvent::text("U1", "09012345678"))
            .await;
        let outcome = f
            .service
            .handle_event(InboundEvent::text("U1", "6月14日 15時"))
            .await;

        let report = outcome.report.unwrap();
        assert_eq!(report.artifacts[0].failed_steps(), vec!["local_check"]);
        assert!(!report.artifacts[1].has_failure());
        assert_eq!(f.storage.uploads().len(), 1);
        assert_eq!(f.spooler.printed().len(), 1);
    }
}
