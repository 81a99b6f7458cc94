use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::error::{CardError, Result};

/// Style tag stored with every card.
pub const CARD_STYLE: &str = "1920s";

const CARDS_TABLE: &str = "cards";

/// A successfully generated card. Never updated once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedCard {
    pub original_image: Vec<u8>,
    pub result_image_url: String,
    pub sender_name: Option<String>,
    pub recipient_name: Option<String>,
    pub message: Option<String>,
    pub style: &'static str,
}

impl GeneratedCard {
    /// Empty form fields are recorded as absent.
    pub fn new(
        original_image: Vec<u8>,
        result_image_url: String,
        sender_name: &str,
        recipient_name: &str,
        message: &str,
    ) -> Self {
        fn non_empty(value: &str) -> Option<String> {
            (!value.is_empty()).then(|| value.to_string())
        }

        Self {
            original_image,
            result_image_url,
            sender_name: non_empty(sender_name),
            recipient_name: non_empty(recipient_name),
            message: non_empty(message),
            style: CARD_STYLE,
        }
    }

    fn row(&self) -> CardRow<'_> {
        CardRow {
            sender_name: self.sender_name.as_deref(),
            recipient_name: self.recipient_name.as_deref(),
            message: self.message.as_deref(),
            image_url: &self.result_image_url,
            style: self.style,
        }
    }
}

#[derive(Debug, Serialize)]
struct CardRow<'a> {
    sender_name: Option<&'a str>,
    recipient_name: Option<&'a str>,
    message: Option<&'a str>,
    image_url: &'a str,
    style: &'a str,
}

/// Supabase table access over its PostgREST interface.
#[derive(Clone, Debug)]
pub struct SupabaseStore {
    client: Client,
    table_url: Url,
    anon_key: String,
}

impl SupabaseStore {
    pub fn new(project_url: &str, anon_key: &str) -> Result<Self> {
        let base = format!("{}/", project_url.trim().trim_end_matches('/'));
        let table_url = Url::parse(&base)
            .and_then(|base| base.join(&format!("rest/v1/{CARDS_TABLE}")))
            .map_err(|err| {
                CardError::Configuration(format!("invalid SUPABASE_URL {project_url}: {err}"))
            })?;
        Ok(Self {
            client: Client::new(),
            table_url,
            anon_key: anon_key.to_string(),
        })
    }

    pub fn table_url(&self) -> &Url {
        &self.table_url
    }

    async fn insert(&self, card: &GeneratedCard) -> Result<Value> {
        let response = self
            .client
            .post(self.table_url.clone())
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
            .header("Prefer", "return=representation")
            .json(&[card.row()])
            .send()
            .await
            .map_err(|err| CardError::StoreUnreachable(err.to_string()))?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(CardError::Persistence(postgrest_error_message(&text)
                .unwrap_or_else(|| format!("insert failed with status {}", status.as_u16()))));
        }
        debug!(%status, "card row inserted");
        Ok(serde_json::from_str(&text).unwrap_or(Value::Null))
    }
}

fn postgrest_error_message(body: &str) -> Option<String> {
    serde_json::from_str::<Value>(body)
        .ok()?
        .get("message")?
        .as_str()
        .map(str::to_string)
}

/// Handle to the card table, injected wherever persistence is needed.
#[derive(Clone, Debug)]
pub enum CardStore {
    Supabase(SupabaseStore),
    Unavailable,
}

impl CardStore {
    /// Both settings are required; anything else leaves the store unavailable.
    pub fn from_settings(url: Option<&str>, anon_key: Option<&str>) -> Self {
        match (url, anon_key) {
            (Some(url), Some(key)) => match SupabaseStore::new(url, key) {
                Ok(store) => CardStore::Supabase(store),
                Err(err) => {
                    warn!(error = %err, "card store disabled");
                    CardStore::Unavailable
                }
            },
            _ => {
                warn!("Missing Supabase settings (SUPABASE_URL, SUPABASE_ANON_KEY); cards will not be saved");
                CardStore::Unavailable
            }
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, CardStore::Supabase(_))
    }

    /// Records one card. Returns the inserted rows as reported by the store.
    pub async fn insert(&self, card: &GeneratedCard) -> Result<Value> {
        match self {
            CardStore::Supabase(store) => store.insert(card).await,
            CardStore::Unavailable => Err(CardError::Persistence(
                "card store is not configured".to_string(),
            )),
        }
    }
}
