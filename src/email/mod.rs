pub mod dispatch;
pub mod resend;

use std::sync::Arc;

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::error::{CardError, Result};

pub use dispatch::{DEFAULT_SENDER, EmailDispatcher};
pub use resend::ResendMailer;

/// JSON body accepted by `/api/send-email`. Every field is optional on the
/// wire so that a missing field is reported as a validation failure rather
/// than a parse failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailBody {
    pub to_email: Option<String>,
    pub to_name: Option<String>,
    pub from_name: Option<String>,
    pub message: Option<String>,
    pub image: Option<String>,
}

/// A send request with all five fields present and non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailRequest {
    pub recipient_email: String,
    pub recipient_name: String,
    pub sender_name: String,
    pub message: String,
    /// Data URI or remote URL of the generated card.
    pub image: String,
}

impl TryFrom<SendEmailBody> for EmailRequest {
    type Error = CardError;

    fn try_from(body: SendEmailBody) -> Result<Self> {
        fn present(value: Option<String>) -> Option<String> {
            value.filter(|value| !value.is_empty())
        }

        match (
            present(body.to_email),
            present(body.to_name),
            present(body.from_name),
            present(body.message),
            present(body.image),
        ) {
            (Some(recipient_email), Some(recipient_name), Some(sender_name), Some(message), Some(image)) => {
                Ok(EmailRequest {
                    recipient_email,
                    recipient_name,
                    sender_name,
                    message,
                    image,
                })
            }
            _ => Err(CardError::Validation("Missing required fields".to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attachment {
    pub filename: String,
    #[serde(serialize_with = "serialize_base64")]
    pub content: Vec<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_id: Option<String>,
}

fn serialize_base64<S: Serializer>(bytes: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&STANDARD.encode(bytes))
}

/// One message handed to the delivery provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundEmail {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
    pub attachments: Vec<Attachment>,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    /// Delivers one message and returns the provider's response payload.
    async fn send(&self, email: &OutboundEmail) -> Result<Value>;
}

#[derive(Clone)]
pub enum MailerHandle {
    Configured(Arc<dyn Mailer>),
    Unconfigured,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full_body() -> SendEmailBody {
        serde_json::from_value(json!({
            "toEmail": "a@b.com",
            "toName": "Alice",
            "fromName": "Bob",
            "message": "Hi\nThere",
            "image": "data:image/png;base64,AAAA"
        }))
        .unwrap()
    }

    #[test]
    fn complete_body_validates() {
        let request = EmailRequest::try_from(full_body()).unwrap();
        assert_eq!(request.recipient_email, "a@b.com");
        assert_eq!(request.recipient_name, "Alice");
        assert_eq!(request.sender_name, "Bob");
        assert_eq!(request.message, "Hi\nThere");
    }

    #[test]
    fn absent_or_empty_fields_are_missing() {
        let mut body = full_body();
        body.image = None;
        assert!(matches!(EmailRequest::try_from(body), Err(CardError::Validation(_))));

        let mut body = full_body();
        body.message = Some(String::new());
        assert!(matches!(EmailRequest::try_from(body), Err(CardError::Validation(_))));
    }

    #[test]
    fn attachment_content_serializes_as_base64() {
        let attachment = Attachment {
            filename: "card.png".into(),
            content: vec![0, 0, 0],
            content_id: Some("card-image".into()),
        };
        assert_eq!(
            serde_json::to_value(&attachment).unwrap(),
            json!({ "filename": "card.png", "content": "AAAA", "content_id": "card-image" })
        );
    }
}
