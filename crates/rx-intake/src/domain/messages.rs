//! # Message Catalog
//!
//! Renders [`ReplyKind`]s and finalization summaries into outbound chat
//! messages. Store-specific strings (store name, privacy policy, guide image)
//! come from configuration.

use crate::domain::artifact::FinalizationReport;
use crate::domain::conversation::ReplyKind;
use crate::domain::entities::{IntakeRecord, OutboundMessage};

/// Store-specific texts shown to users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageCatalog {
    pub store_name: String,
    pub privacy_policy_url: String,
    /// Reference image sent together with the consent acknowledgment.
    pub guide_image_url: Option<String>,
}

/// Intake guide picture shown after consent unless overridden.
pub const DEFAULT_GUIDE_IMAGE_URL: &str =
    "https://drive.google.com/uc?id=1gXkCnQHz9S7Dwiu0g-3VlvBGvACTiiwa";

impl Default for MessageCatalog {
    fn default() -> Self {
        Self {
            store_name: "いずみ薬局 テスト店".to_string(),
            privacy_policy_url: "http://izumi-group.com/privacy/".to_string(),
            guide_image_url: Some(DEFAULT_GUIDE_IMAGE_URL.to_string()),
        }
    }
}

impl MessageCatalog {
    pub fn render(&self, reply: ReplyKind) -> Vec<OutboundMessage> {
        match reply {
            ReplyKind::Welcome => vec![OutboundMessage::text(self.welcome())],
            ReplyKind::ConsentAccepted => {
                let mut messages = vec![OutboundMessage::text(
                    "✅ ご同意ありがとうございます。\n処方箋の受付方法は以下の画像をご覧ください：",
                )];
                if let Some(url) = &self.guide_image_url {
                    messages.push(OutboundMessage::image(url.clone()));
                }
                messages
            }
            ReplyKind::ConsentRequired => vec![OutboundMessage::text(
                "ご利用には同意が必要です。「同意」と送信してください。",
            )],
            ReplyKind::StartOver => vec![OutboundMessage::text(
                "受付を始めるには、処方箋の写真を送信するか「同意」と送信してください。",
            )],
            ReplyKind::SendImageFirst => vec![OutboundMessage::text(
                "📸 先に処方箋の画像を送信してください。",
            )],
            ReplyKind::ImageReceived { count } => vec![OutboundMessage::text(format!(
                "📸 処方箋画像を受け取りました（{count}枚目）。\n\
                 複数ある場合は続けて送信してください。\n\
                 すべて送信したら、電話番号を入力してください。"
            ))],
            ReplyKind::ImageReceivedPhoneNext { count } => {
                vec![OutboundMessage::text(format!(
                    "📸 処方箋画像を受け取りました（{count}枚目）。\n電話番号を入力してください。"
                ))]
            }
            ReplyKind::AskPhone => vec![OutboundMessage::text("📞 電話番号を入力してください。")],
            ReplyKind::AskPickupTime => vec![OutboundMessage::text(
                "📞 電話番号を確認しました。\n次に受け取り希望日時を入力してください（例：6月14日 15時）。",
            )],
            ReplyKind::ImagesClosed => vec![OutboundMessage::text(
                "画像の受付は終了しています。受け取り希望日時を入力してください（例：6月14日 15時）。",
            )],
            ReplyKind::ImageFailed => vec![OutboundMessage::text(
                "⚠️ 画像を保存できませんでした。お手数ですが、もう一度送信してください。",
            )],
            ReplyKind::SystemError => vec![OutboundMessage::text(
                "⚠️ システムエラーが発生しました。しばらくしてからもう一度お試しください。",
            )],
        }
    }

    fn welcome(&self) -> String {
        format!(
            "{}では、LINEにて処方箋の受付を行っています。\n\
             個人情報は印刷および管理のために使用されます。\n\
             同意される方は『同意』と返信してください。\n\
             弊社プライバシーポリシー\n{}",
            self.store_name, self.privacy_policy_url
        )
    }

    /// Final confirmation sent after the pipeline ran.
    pub fn summary(&self, record: &IntakeRecord, report: &FinalizationReport) -> OutboundMessage {
        let mut text = format!(
            "✅ ありがとうございます！以下の内容で受付しました：\n\
             📄 受付内容：\n\
             受付番号：{}\n\
             画像枚数：{}枚\n\
             電話番号：{}\n\
             受け取り日時：{}",
            record.receipt_id,
            record.images.len(),
            record.phone,
            record.pickup_time
        );

        let failed = report.failed_artifacts();
        if failed > 0 {
            text.push_str(&format!(
                "\n\n⚠️ {failed}枚の画像で保存または印刷に失敗しました。店頭にてスタッフが確認いたします。"
            ));
        }
        OutboundMessage::Text { text }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::artifact::{ArtifactReport, StepOutcome};
    use crate::domain::entities::{ReceiptId, StoredImage, UserId};
    use chrono::NaiveDate;
    use std::path::PathBuf;

    fn record(images: usize) -> IntakeRecord {
        IntakeRecord {
            user_id: UserId::from("U1"),
            receipt_id: ReceiptId::new(NaiveDate::from_ymd_opt(2024, 6, 14).unwrap(), 1),
            images: (1..=images as u32)
                .map(|index| StoredImage {
                    index,
                    path: PathBuf::from(format!("/tmp/202406140001_{index}.jpg")),
                    message_id: format!("m{index}"),
                    size_bytes: 3,
                })
                .collect(),
            phone: "09012345678".into(),
            pickup_time: "6月14日 15時".into(),
        }
    }

    fn report(print: StepOutcome) -> FinalizationReport {
        FinalizationReport {
            artifacts: vec![ArtifactReport {
                index: 1,
                local: StepOutcome::Done,
                upload: StepOutcome::Skipped,
                render: StepOutcome::Done,
                print,
            }],
        }
    }

    #[test]
    fn test_welcome_includes_store_and_policy() {
        let catalog = MessageCatalog::default();
        let text = catalog.render(ReplyKind::Welcome)[0]
            .as_text()
            .unwrap()
            .to_string();
        assert!(text.starts_with("いずみ薬局 テスト店では"));
        assert!(text.ends_with("http://izumi-group.com/privacy/"));
    }

    #[test]
    fn test_consent_reply_includes_guide_image_when_configured() {
        let mut catalog = MessageCatalog::default();
        assert_eq!(
            catalog.render(ReplyKind::ConsentAccepted)[1],
            OutboundMessage::image(DEFAULT_GUIDE_IMAGE_URL)
        );

        catalog.guide_image_url = None;
        assert_eq!(catalog.render(ReplyKind::ConsentAccepted).len(), 1);

        catalog.guide_image_url = Some("https://example.com/guide.jpg".into());
        let messages = catalog.render(ReplyKind::ConsentAccepted);
        assert_eq!(messages.len(), 2);
        assert_eq!(
            messages[1],
            OutboundMessage::image("https://example.com/guide.jpg")
        );
    }

    #[test]
    fn test_summary_lists_intake_fields() {
        let catalog = MessageCatalog::default();
        let summary = catalog.summary(&record(1), &report(StepOutcome::Skipped));
        let text = summary.as_text().unwrap();
        assert!(text.contains("受付番号：202406140001"));
        assert!(text.contains("画像枚数：1枚"));
        assert!(text.contains("電話番号：09012345678"));
        assert!(text.contains("受け取り日時：6月14日 15時"));
        assert!(!text.contains("⚠️"));
    }

    #[test]
    fn test_summary_notes_failures() {
        let catalog = MessageCatalog::default();
        let summary = catalog.summary(
            &record(1),
            &report(StepOutcome::Failed("offline".into())),
        );
        assert!(summary.as_text().unwrap().contains("⚠️ 1枚の画像"));
    }
}
