//! Card studio: the user-facing flow of picking a photo, generating the
//! poster, saving it, downloading it and mailing it.
//!
//! A [`CardStudio`] owns the session state the page works with. Every action
//! takes `&mut self`, so at most one external call is outstanding per studio.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tracing::{info, warn};

use crate::email::{EmailDispatcher, SendEmailBody};
use crate::error::{CardError, Result};
use crate::generation::{PosterGenerator, SourceImage};
use crate::persistence::{CardStore, GeneratedCard};

pub const DEFAULT_SENDER_NAME: &str = "A Friend";

/// Sends a card email on the studio's behalf.
#[async_trait]
pub trait EmailGateway: Send + Sync {
    async fn send(&self, body: &SendEmailBody) -> Result<Value>;
}

#[async_trait]
impl EmailGateway for EmailDispatcher {
    async fn send(&self, body: &SendEmailBody) -> Result<Value> {
        EmailDispatcher::send(self, body.clone()).await
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardForm {
    pub sender_name: String,
    pub recipient_name: String,
    pub recipient_email: String,
    pub message: String,
}

/// Transient feedback shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Warning(String),
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOutcome {
    pub image_url: String,
    pub saved: bool,
    pub warning: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub file_name: String,
    /// Data URI or remote URL of the poster.
    pub source: String,
}

pub struct CardStudio {
    generator: Arc<dyn PosterGenerator>,
    store: CardStore,
    gateway: Arc<dyn EmailGateway>,
    selected: Option<SourceImage>,
    result: Option<String>,
    error: Option<String>,
    notices: Vec<Notice>,
    pub form: CardForm,
}

impl CardStudio {
    pub fn new(
        generator: Arc<dyn PosterGenerator>,
        store: CardStore,
        gateway: Arc<dyn EmailGateway>,
    ) -> Self {
        Self {
            generator,
            store,
            gateway,
            selected: None,
            result: None,
            error: None,
            notices: Vec::new(),
            form: CardForm::default(),
        }
    }

    pub fn select_image(&mut self, image: SourceImage) {
        self.selected = Some(image);
        self.error = None;
    }

    pub fn clear(&mut self) {
        self.selected = None;
        self.result = None;
        self.error = None;
    }

    pub fn selected_image(&self) -> Option<&SourceImage> {
        self.selected.as_ref()
    }

    pub fn result_url(&self) -> Option<&str> {
        self.result.as_deref()
    }

    /// Inline error from the last generation attempt.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Generates the poster for the selected photo, then records the card.
    /// A failed save is reported as a warning and does not undo the result.
    pub async fn generate(&mut self) -> Result<GenerationOutcome> {
        let Some(image) = self.selected.clone() else {
            return Err(CardError::Validation("Please select an image first".to_string()));
        };
        self.error = None;

        let image_url = match self.generator.generate(&image).await {
            Ok(url) => url,
            Err(err) => {
                let message = err.to_string();
                self.error = Some(if message.is_empty() {
                    "Failed to generate poster. Please try again.".to_string()
                } else {
                    message
                });
                return Err(err);
            }
        };
        self.result = Some(image_url.clone());

        let card = GeneratedCard::new(
            image.bytes,
            image_url.clone(),
            &self.form.sender_name,
            &self.form.recipient_name,
            &self.form.message,
        );
        let warning = match self.store.insert(&card).await {
            Ok(_) => {
                info!("card saved to gallery");
                self.notices.push(Notice::Success("Saved to Gallery!".to_string()));
                None
            }
            Err(err) => {
                warn!(error = %err, "failed to save card");
                let warning = match err {
                    CardError::StoreUnreachable(_) => "Database connection error".to_string(),
                    err => format!("Saving failed: {err}"),
                };
                self.notices.push(Notice::Warning(warning.clone()));
                Some(warning)
            }
        };

        Ok(GenerationOutcome {
            image_url,
            saved: warning.is_none(),
            warning,
        })
    }

    pub fn download(&self) -> Option<Download> {
        self.result.as_ref().map(|source| Download {
            file_name: format!("retro-poster-{}.png", Utc::now().timestamp_millis()),
            source: source.clone(),
        })
    }

    /// Mails the current poster to the recipient in the form.
    pub async fn send_email(&mut self) -> Result<Value> {
        let Some(image) = self.result.clone() else {
            return Err(self.reject("请先生成贺卡 (Please generate a poster first)"));
        };
        if self.form.recipient_email.is_empty() || self.form.recipient_name.is_empty() {
            return Err(self.reject("请填写收件人信息 (Please fill in recipient details)"));
        }

        let sender_name = if self.form.sender_name.is_empty() {
            DEFAULT_SENDER_NAME.to_string()
        } else {
            self.form.sender_name.clone()
        };
        let body = SendEmailBody {
            to_email: Some(self.form.recipient_email.clone()),
            to_name: Some(self.form.recipient_name.clone()),
            from_name: Some(sender_name),
            message: Some(self.form.message.clone()),
            image: Some(image),
        };

        match self.gateway.send(&body).await {
            Ok(payload) => {
                self.notices.push(Notice::Success(
                    "邮件发送成功! (Email sent successfully!)".to_string(),
                ));
                Ok(payload)
            }
            Err(err) => {
                self.notices.push(Notice::Error(err.to_string()));
                Err(err)
            }
        }
    }

    fn reject(&mut self, message: &str) -> CardError {
        self.notices.push(Notice::Error(message.to_string()));
        CardError::Validation(message.to_string())
    }
}
