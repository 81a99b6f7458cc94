use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{error, info, warn};

use crate::error::{CardError, Result};
use crate::generation::{PosterGenerator, SourceImage};

const GEMINI_API_ROOT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const GEMINI_MODEL: &str = "gemini-2.5-flash-image";

pub const GEMINI_PROMPT: &str = "
You are an expert AI artist specializing in 1930s vintage oil-painted poster styles.
Transform the provided input image into a stunning 1930s vintage travel poster.

Style Guidelines:
- **Technique**: Digital oil painting with visible brushstrokes and canvas texture.
- **Era**: 1930s Art Deco and vintage travel poster aesthetic.
- **Colors**: Use a limited, harmonious palette with warm earth tones (ochre, sepia, terracotta), deep reds, muted blues/teals, and cream/off-white backgrounds. Avoid neon or overly digital-looking colors.
- **Lighting**: High contrast with dramatic shadows and warm highlights.
- **Details**: Simplify complex details into bold shapes and planes of color. Remove visual noise.
- **Composition**: Dynamic but balanced.
- **Output**: The result should look like a scanned high-quality vintage poster found in an archive.

Do not add any new text unless it is artistically necessary or replaces existing text in a vintage style.
";

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    parts: Option<Vec<Part>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    text: Option<String>,
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Alternate backend: Gemini `generateContent` with a text + inline image
/// prompt, reading the image back from the response parts.
#[derive(Clone, Debug)]
pub struct GeminiGenerator {
    client: Client,
    api_key: Option<String>,
    model: String,
    api_root: String,
}

impl GeminiGenerator {
    pub fn new(api_key: Option<&str>, model: Option<&str>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.map(str::to_string),
            model: model.unwrap_or(GEMINI_MODEL).to_string(),
            api_root: GEMINI_API_ROOT.to_string(),
        }
    }
}

#[async_trait]
impl PosterGenerator for GeminiGenerator {
    async fn generate(&self, image: &SourceImage) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| CardError::Configuration("Gemini API Key is missing.".to_string()))?;

        let response = self
            .client
            .post(format!("{}/models/{}:generateContent", self.api_root, self.model))
            .header("x-goog-api-key", api_key)
            .json(&request_body(image))
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if !status.is_success() {
            let message = error_message(status, &text);
            error!(%status, %message, "Gemini API error");
            return Err(CardError::Provider(message));
        }

        let payload: GenerateContentResponse = serde_json::from_str(&text)?;
        let image_ref = extract_image(payload)?;
        info!(model = %self.model, "poster generated");
        Ok(image_ref)
    }
}

fn request_body(image: &SourceImage) -> Value {
    json!({
        "contents": [
            {
                "role": "user",
                "parts": [
                    { "text": GEMINI_PROMPT },
                    {
                        "inlineData": {
                            "mimeType": image.mime_type,
                            "data": STANDARD.encode(&image.bytes),
                        }
                    }
                ]
            }
        ]
    })
}

fn error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error)
        .and_then(|error| error.message)
        .unwrap_or_else(|| format!("API Request failed with status {}", status.as_u16()))
}

fn extract_image(payload: GenerateContentResponse) -> Result<String> {
    let parts = payload
        .candidates
        .and_then(|candidates| candidates.into_iter().next())
        .and_then(|candidate| candidate.content)
        .and_then(|content| content.parts)
        .ok_or_else(|| CardError::Provider("No content generated.".to_string()))?;

    if let Some(inline) = parts.iter().find_map(|part| part.inline_data.as_ref()) {
        return Ok(format!("data:{};base64,{}", inline.mime_type, inline.data));
    }
    if let Some(text) = parts.iter().find_map(|part| part.text.as_deref()) {
        warn!(%text, "model returned text instead of image");
        return Err(CardError::Provider(format!("Model returned text: {text}")));
    }
    Err(CardError::Provider("No image generated.".to_string()))
}
