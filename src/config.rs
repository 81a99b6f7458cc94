use std::env;
use std::sync::Arc;

use tracing::warn;

use crate::email::{DEFAULT_SENDER, EmailDispatcher, MailerHandle, ResendMailer};
use crate::generation::{GeminiGenerator, GeneratorKind, PosterGenerator, SeedreamGenerator};
use crate::persistence::CardStore;
use crate::transport::DispatchMode;
use crate::web_pages::StudioServices;

const DEFAULT_PORT: u16 = 3001;

/// Process settings read from the environment (and `.env`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub port: u16,
    pub dispatch_mode: Option<String>,
    pub resend_api_key: Option<String>,
    pub resend_api_url: Option<String>,
    pub mail_from: Option<String>,
    pub generator: Option<String>,
    pub seedream_api_key: Option<String>,
    pub seedream_endpoint_id: Option<String>,
    pub seedream_api_url: Option<String>,
    pub gemini_api_key: Option<String>,
    pub gemini_model: Option<String>,
    pub supabase_url: Option<String>,
    pub supabase_anon_key: Option<String>,
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(non_empty_var)
    }

    /// Builds the config from any key lookup; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        Self {
            port: get("PORT")
                .and_then(|value| value.trim().parse::<u16>().ok())
                .unwrap_or(DEFAULT_PORT),
            dispatch_mode: get("DISPATCH_MODE"),
            resend_api_key: get("RESEND_API_KEY"),
            resend_api_url: get("RESEND_API_URL"),
            mail_from: get("MAIL_FROM"),
            generator: get("CARD_GENERATOR"),
            seedream_api_key: get("SEEDREAM_API_KEY"),
            seedream_endpoint_id: get("SEEDREAM_ENDPOINT_ID"),
            seedream_api_url: get("SEEDREAM_API_URL"),
            gemini_api_key: get("GEMINI_API_KEY"),
            gemini_model: get("GEMINI_MODEL"),
            supabase_url: get("SUPABASE_URL"),
            supabase_anon_key: get("SUPABASE_ANON_KEY"),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }

    pub fn dispatch_mode(&self) -> DispatchMode {
        DispatchMode::parse(self.dispatch_mode.as_deref())
    }

    pub fn generator_kind(&self) -> GeneratorKind {
        GeneratorKind::parse(self.generator.as_deref())
    }

    pub fn mailer(&self) -> MailerHandle {
        match self.resend_api_key.as_deref() {
            Some(key) => {
                let mut mailer = ResendMailer::new(key);
                if let Some(url) = self.resend_api_url.as_deref() {
                    mailer = mailer.with_endpoint(url);
                }
                MailerHandle::Configured(Arc::new(mailer))
            }
            None => {
                warn!("RESEND_API_KEY is missing; /api/send-email will answer 500");
                MailerHandle::Unconfigured
            }
        }
    }

    pub fn dispatcher(&self) -> EmailDispatcher {
        EmailDispatcher::new(
            self.mailer(),
            self.mail_from.as_deref().unwrap_or(DEFAULT_SENDER),
        )
    }

    pub fn poster_generator(&self) -> Arc<dyn PosterGenerator> {
        match self.generator_kind() {
            GeneratorKind::Seedream => {
                if self.seedream_api_key.is_none() || self.seedream_endpoint_id.is_none() {
                    warn!("SEEDREAM_API_KEY or SEEDREAM_ENDPOINT_ID is missing; generation will fail");
                }
                let mut generator = SeedreamGenerator::new(
                    self.seedream_api_key.as_deref(),
                    self.seedream_endpoint_id.as_deref(),
                );
                if let Some(url) = self.seedream_api_url.as_deref() {
                    generator = generator.with_endpoint(url);
                }
                Arc::new(generator)
            }
            GeneratorKind::Gemini => {
                if self.gemini_api_key.is_none() {
                    warn!("GEMINI_API_KEY is missing; generation will fail");
                }
                Arc::new(GeminiGenerator::new(
                    self.gemini_api_key.as_deref(),
                    self.gemini_model.as_deref(),
                ))
            }
        }
    }

    pub fn card_store(&self) -> CardStore {
        CardStore::from_settings(
            self.supabase_url.as_deref(),
            self.supabase_anon_key.as_deref(),
        )
    }

    pub fn studio_services(&self) -> StudioServices {
        StudioServices {
            generator: self.poster_generator(),
            store: self.card_store(),
            dispatcher: self.dispatcher(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(pairs: &[(&str, &str)]) -> AppConfig {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        AppConfig::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config(&[]);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.bind_address(), "0.0.0.0:3001");
        assert_eq!(config.dispatch_mode(), DispatchMode::Standalone);
        assert_eq!(config.generator_kind(), GeneratorKind::Seedream);
        assert!(matches!(config.mailer(), MailerHandle::Unconfigured));
        assert!(!config.card_store().is_available());
    }

    #[test]
    fn blank_values_are_unset() {
        let config = config(&[("RESEND_API_KEY", "   "), ("PORT", "not-a-port")]);
        assert_eq!(config.resend_api_key, None);
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn values_are_read() {
        let config = config(&[
            ("PORT", "8080"),
            ("DISPATCH_MODE", "hosted"),
            ("RESEND_API_KEY", "re_123"),
            ("CARD_GENERATOR", "gemini"),
            ("SUPABASE_URL", "https://abc.supabase.co"),
            ("SUPABASE_ANON_KEY", "anon"),
        ]);
        assert_eq!(config.port, 8080);
        assert_eq!(config.dispatch_mode(), DispatchMode::Hosted);
        assert_eq!(config.generator_kind(), GeneratorKind::Gemini);
        assert!(matches!(config.mailer(), MailerHandle::Configured(_)));
        assert!(config.card_store().is_available());
    }
}
