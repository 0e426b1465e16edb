//! # Webhook Flows
//!
//! Signed deliveries through the HTTP router, the dispatcher and the intake
//! service, with replies captured by the messaging fake.

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use axum::http::StatusCode;
    use rx_intake::{ConversationPolicy, IntakeConfig, PreConsentImagePolicy};

    // =========================================================================
    // AUTHENTICATION
    // =========================================================================

    #[tokio::test]
    async fn test_bad_signature_rejects_whole_delivery() {
        let app = WebhookApp::new();
        let body = payload(&[
            text_event("U1", "rt1", "同意"),
            image_event("U1", "rt2", "img-1"),
        ]);

        let tampered = body.replace("同意", "同意する");
        let signature = rx_gateway::sign(body.as_bytes(), CHANNEL_SECRET.as_bytes());
        let status = app.send(request("/callback", &tampered, Some(signature))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!app.harness.has_session("U1"));
        assert!(app.harness.messaging.replies().is_empty());
        assert!(app.harness.messaging.fetched().is_empty());
    }

    #[tokio::test]
    async fn test_signature_under_other_secret_is_rejected() {
        let app = WebhookApp::new();
        let body = payload(&[text_event("U1", "rt1", "同意")]);
        let signature = rx_gateway::sign(body.as_bytes(), b"someone-else");

        let status = app.send(request("/webhook", &body, Some(signature))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!app.harness.has_session("U1"));
    }

    #[tokio::test]
    async fn test_unsigned_delivery_is_rejected() {
        let app = WebhookApp::new();
        let status = app
            .send(request("/callback", &payload(&[follow_event("U1", "rt")]), None))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!app.harness.has_session("U1"));
    }

    // =========================================================================
    // CONVERSATION
    // =========================================================================

    #[tokio::test]
    async fn test_full_intake_over_http() {
        let app = WebhookApp::new();

        assert_eq!(app.deliver(&[follow_event("U1", "rt0")]).await, StatusCode::OK);
        assert!(app.reply_texts("rt0")[0].contains("『同意』と返信してください"));

        app.deliver(&[text_event("U1", "rt1", "同意")]).await;
        assert!(app.reply_texts("rt1")[0].contains("ご同意ありがとうございます"));

        app.deliver(&[image_event("U1", "rt2", "img-1")]).await;
        assert!(app.reply_texts("rt2")[0].contains("1枚目"));

        app.deliver(&[text_event("U1", "rt3", "09012345678")]).await;
        assert!(app.reply_texts("rt3")[0].contains("受け取り希望日時"));

        app.deliver(&[text_event("U1", "rt4", "6月14日 15時")]).await;
        let summary = &app.reply_texts("rt4")[0];
        assert!(summary.contains("受付番号：202406140001"));
        assert!(summary.contains("画像枚数：1枚"));
        assert!(summary.contains("電話番号：09012345678"));
        assert!(summary.contains("受け取り日時：6月14日 15時"));
        assert!(!summary.contains("失敗"));

        assert!(!app.harness.has_session("U1"));
        assert_eq!(app.harness.messaging.fetched(), vec!["img-1"]);
        assert_eq!(app.harness.storage.uploads().len(), 1);
        assert_eq!(app.harness.spooler.printed().len(), 1);
    }

    #[tokio::test]
    async fn test_whole_conversation_in_one_delivery() {
        let app = WebhookApp::new();
        let status = app
            .deliver(&[
                text_event("U1", "rt1", "同意"),
                image_event("U1", "rt2", "img-1"),
                image_event("U1", "rt3", "img-2"),
                text_event("U1", "rt4", "09012345678"),
                text_event("U1", "rt5", "明日 10時"),
            ])
            .await;

        assert_eq!(status, StatusCode::OK);
        assert!(app.reply_texts("rt3")[0].contains("2枚目"));
        let summary = &app.reply_texts("rt5")[0];
        assert!(summary.contains("画像枚数：2枚"));
        assert_eq!(
            app.harness.images.file_names(),
            vec!["202406140001_1.jpg", "202406140001_2.jpg"]
        );
    }

    #[tokio::test]
    async fn test_unknown_user_hello_starts_over() {
        let app = WebhookApp::new();
        app.deliver(&[text_event("U9", "rt", "hello")]).await;

        assert!(app.reply_texts("rt")[0].contains("受付を始めるには"));
        assert!(!app.harness.has_session("U9"));
    }

    #[tokio::test]
    async fn test_image_without_consent_auto_consents_by_default() {
        let app = WebhookApp::new();
        app.deliver(&[image_event("U1", "rt", "img-1")]).await;

        assert!(app.reply_texts("rt")[0].contains("1枚目"));
        assert!(app.harness.has_session("U1"));
    }

    #[tokio::test]
    async fn test_image_without_consent_rejected_when_configured() {
        let app = WebhookApp::with_config(IntakeConfig {
            policy: ConversationPolicy::new(PreConsentImagePolicy::Reject),
            ..IntakeConfig::default()
        });
        app.deliver(&[image_event("U1", "rt", "img-1")]).await;

        assert!(app.reply_texts("rt")[0].contains("同意が必要です"));
        assert!(app.harness.messaging.fetched().is_empty());
        assert!(!app.harness.has_session("U1"));
    }

    #[tokio::test]
    async fn test_unsupported_events_are_ignored() {
        let app = WebhookApp::new();
        let status = app.deliver(&[sticker_event("U1", "rt")]).await;

        assert_eq!(status, StatusCode::OK);
        assert!(app.harness.messaging.replies().is_empty());
        assert!(!app.harness.has_session("U1"));
    }

    #[tokio::test]
    async fn test_redelivered_event_is_processed_once() {
        let app = WebhookApp::new();
        let consent = text_event("U1", "rt1", "同意");
        let image = image_event("U1", "rt2", "img-1");

        app.deliver(&[consent.clone(), image.clone()]).await;
        app.deliver(&[redelivered(image)]).await;

        assert_eq!(app.harness.messaging.fetched(), vec!["img-1"]);
        assert_eq!(app.harness.images.file_names().len(), 1);
        assert_eq!(app.harness.messaging.replies().len(), 2);
    }

    #[tokio::test]
    async fn test_reply_failure_does_not_fail_delivery() {
        let app = WebhookApp::new();
        app.harness.messaging.set_fail_replies(true);

        let status = app.deliver(&[text_event("U1", "rt1", "同意")]).await;

        assert_eq!(status, StatusCode::OK);
        assert!(app.harness.has_session("U1"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_deliveries_for_two_users() {
        let app = std::sync::Arc::new(WebhookApp::new());
        app.harness
            .messaging
            .set_fetch_delay(std::time::Duration::from_millis(5));
        for user in ["UA", "UB"] {
            app.deliver(&[text_event(user, &format!("{user}-c"), "同意")]).await;
        }

        let mut handles = Vec::new();
        for (user, image) in [("UA", "a-1"), ("UB", "b-1"), ("UA", "a-2"), ("UB", "b-2")] {
            let app = app.clone();
            handles.push(tokio::spawn(async move {
                app.deliver(&[image_event(user, &format!("{user}-{image}"), image)])
                    .await
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap(), StatusCode::OK);
        }

        for user in ["UA", "UB"] {
            app.deliver(&[text_event(user, &format!("{user}-p"), "09000000000")]).await;
            app.deliver(&[text_event(user, &format!("{user}-t"), "今日 18時")]).await;
        }

        let a = &app.reply_texts("UA-t")[0];
        let b = &app.reply_texts("UB-t")[0];
        assert!(a.contains("画像枚数：2枚"));
        assert!(b.contains("画像枚数：2枚"));

        let uploads = app.harness.storage.uploads();
        assert_eq!(uploads.len(), 4);
        let receipts: std::collections::HashSet<_> = uploads
            .iter()
            .map(|u| u.properties["reception_id"].clone())
            .collect();
        assert_eq!(receipts.len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_image_deliveries_for_one_user() {
        let app = std::sync::Arc::new(WebhookApp::new());
        app.harness
            .messaging
            .set_fetch_delay(std::time::Duration::from_millis(10));
        app.deliver(&[text_event("U1", "rt-c", "同意")]).await;

        let handles: Vec<_> = (1..=6)
            .map(|n| {
                let app = app.clone();
                tokio::spawn(async move {
                    app.deliver(&[image_event("U1", &format!("rt-{n}"), &format!("img-{n}"))])
                        .await
                })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.await.unwrap(), StatusCode::OK);
        }

        app.deliver(&[text_event("U1", "rt-p", "09012345678")]).await;
        app.deliver(&[text_event("U1", "rt-t", "6月14日 15時")]).await;

        let summary = &app.reply_texts("rt-t")[0];
        assert!(summary.contains("受付番号：202406140001"));
        assert!(summary.contains("画像枚数：6枚"));

        let uploads = app.harness.storage.uploads();
        let names: Vec<_> = uploads.iter().map(|u| u.name.clone()).collect();
        let expected: Vec<_> = (1..=6).map(|n| format!("202406140001_{n}.jpg")).collect();
        assert_eq!(names, expected);
    }
}
