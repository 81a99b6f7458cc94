use std::sync::Arc;

use serde_json::Value;
use tracing::{error, info};

use crate::email::{EmailRequest, Mailer, MailerHandle, OutboundEmail, SendEmailBody};
use crate::error::{CardError, Result};
use crate::template::{CardContent, CardTemplate};

pub const DEFAULT_SENDER: &str = "Happy New Year <gift@terrypmw.com>";

/// Validates a send request, renders the card and hands it to the mailer.
/// Shared by both transport adapters; holds no per-request state.
#[derive(Clone)]
pub struct EmailDispatcher {
    mailer: MailerHandle,
    template: Arc<CardTemplate>,
    sender: String,
}

impl EmailDispatcher {
    pub fn new(mailer: MailerHandle, sender: &str) -> Self {
        Self {
            mailer,
            template: Arc::new(CardTemplate::bundled().clone()),
            sender: sender.to_string(),
        }
    }

    pub fn with_template(mut self, template: CardTemplate) -> Self {
        self.template = Arc::new(template);
        self
    }

    /// Handles a raw JSON request body.
    pub async fn dispatch(&self, body: &[u8]) -> Result<Value> {
        self.mailer()?;
        let body: SendEmailBody = serde_json::from_slice(body)
            .map_err(|err| CardError::Validation(format!("Invalid request body: {err}")))?;
        self.send(body).await
    }

    pub async fn send(&self, body: SendEmailBody) -> Result<Value> {
        let mailer = self.mailer()?;
        let request = EmailRequest::try_from(body)?;
        let email = self.compose(&request)?;

        match mailer.send(&email).await {
            Ok(payload) => {
                info!(to = %request.recipient_email, "card email sent");
                Ok(payload)
            }
            Err(err) => {
                error!(to = %request.recipient_email, error = %err, "card email failed");
                Err(err)
            }
        }
    }

    pub fn compose(&self, request: &EmailRequest) -> Result<OutboundEmail> {
        let rendered = self.template.render(&CardContent {
            recipient_name: &request.recipient_name,
            sender_name: &request.sender_name,
            message: &request.message,
            image_source: &request.image,
        })?;

        Ok(OutboundEmail {
            from: self.sender.clone(),
            to: vec![request.recipient_email.clone()],
            subject: format!("A Vintage Greeting Card from {}", request.sender_name),
            html: rendered.html,
            attachments: rendered.attachments,
        })
    }

    fn mailer(&self) -> Result<&Arc<dyn Mailer>> {
        match &self.mailer {
            MailerHandle::Configured(mailer) => Ok(mailer),
            MailerHandle::Unconfigured => Err(CardError::Configuration(
                "Missing RESEND_API_KEY".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;

    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<OutboundEmail>>,
        fail_with: Option<String>,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, email: &OutboundEmail) -> Result<Value> {
            self.sent.lock().unwrap().push(email.clone());
            match &self.fail_with {
                Some(message) => Err(CardError::Provider(message.clone())),
                None => Ok(json!({ "id": "email_123" })),
            }
        }
    }

    fn scenario_body() -> Vec<u8> {
        serde_json::to_vec(&json!({
            "toEmail": "a@b.com",
            "toName": "Alice",
            "fromName": "Bob",
            "message": "Hi\nThere",
            "image": "data:image/png;base64,AAAA"
        }))
        .unwrap()
    }

    fn dispatcher(mailer: Arc<RecordingMailer>) -> EmailDispatcher {
        EmailDispatcher::new(MailerHandle::Configured(mailer), DEFAULT_SENDER)
    }

    #[tokio::test]
    async fn sends_rendered_card() {
        let mailer = Arc::new(RecordingMailer::default());
        let payload = dispatcher(mailer.clone())
            .dispatch(&scenario_body())
            .await
            .unwrap();
        assert_eq!(payload, json!({ "id": "email_123" }));

        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        let email = &sent[0];
        assert_eq!(email.from, DEFAULT_SENDER);
        assert_eq!(email.to, vec!["a@b.com".to_string()]);
        assert_eq!(email.subject, "A Vintage Greeting Card from Bob");
        assert!(email.html.contains("Hi<br/>There"));
        assert!(email.html.contains("cid:card-image"));
        assert!(email.html.contains("Dear Alice,"));
        assert_eq!(email.attachments.len(), 1);
        assert_eq!(email.attachments[0].filename, "card.png");
    }

    #[tokio::test]
    async fn missing_field_never_reaches_provider() {
        let mailer = Arc::new(RecordingMailer::default());
        let body = serde_json::to_vec(&json!({
            "toEmail": "a@b.com",
            "toName": "Alice",
            "fromName": "Bob",
            "message": "Hi"
        }))
        .unwrap();
        let err = dispatcher(mailer.clone()).dispatch(&body).await.unwrap_err();
        assert!(matches!(err, CardError::Validation(ref message) if message == "Missing required fields"));
        assert!(mailer.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unconfigured_mailer_is_a_configuration_error() {
        let dispatcher = EmailDispatcher::new(MailerHandle::Unconfigured, DEFAULT_SENDER);
        let err = dispatcher.dispatch(&scenario_body()).await.unwrap_err();
        assert!(matches!(err, CardError::Configuration(_)));
        assert_eq!(err.to_string(), "Missing RESEND_API_KEY");
    }

    #[tokio::test]
    async fn malformed_json_is_rejected() {
        let mailer = Arc::new(RecordingMailer::default());
        let err = dispatcher(mailer).dispatch(b"{not json").await.unwrap_err();
        assert!(matches!(err, CardError::Validation(_)));
    }

    #[tokio::test]
    async fn provider_failure_is_attempted_once() {
        let mailer = Arc::new(RecordingMailer {
            fail_with: Some("domain not verified".into()),
            ..Default::default()
        });
        let err = dispatcher(mailer.clone())
            .dispatch(&scenario_body())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "domain not verified");
        assert_eq!(mailer.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn custom_template_is_used() {
        let mailer = Arc::new(RecordingMailer::default());
        let template = CardTemplate::parse(
            "<h1>[Recipient Name]</h1><!-- IMAGE_START --><!-- IMAGE_END --><!-- MESSAGE_START --><!-- MESSAGE_END -->",
        );
        dispatcher(mailer.clone())
            .with_template(template)
            .dispatch(&scenario_body())
            .await
            .unwrap();
        let sent = mailer.sent.lock().unwrap();
        assert!(sent[0].html.starts_with("<h1>Alice</h1>"));
        assert!(sent[0].html.contains("Hi<br/>There"));
    }

    #[test]
    fn remote_image_has_no_attachment() {
        let dispatcher = EmailDispatcher::new(MailerHandle::Unconfigured, DEFAULT_SENDER);
        let email = dispatcher
            .compose(&EmailRequest {
                recipient_email: "a@b.com".into(),
                recipient_name: "Alice".into(),
                sender_name: "Bob".into(),
                message: "Hello".into(),
                image: "https://cdn.example.com/poster.png".into(),
            })
            .unwrap();
        assert!(email.attachments.is_empty());
        assert!(email.html.contains(r#"src="https://cdn.example.com/poster.png""#));
    }
}
