use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, error, info};

use crate::error::{CardError, Result};
use crate::generation::{PosterGenerator, SourceImage};
use crate::image_processing::get_dimensions;
use crate::resolution::{Resolution, select_resolution};

pub const SEEDREAM_API_URL: &str = "https://ark.cn-beijing.volces.com/api/v3/images/generations";

pub const SEEDREAM_PROMPT: &str = "
艺术风格：
- 模仿vintage comic book和老式动画的手绘质感
- 使用有限的配色方案：米黄色、红色、黑色为主
- 添加纸张老化效果：褶皱、斑点、泛黄
- 使用半调网点（halftone dots）模拟旧印刷效果

视觉特征：
- 粗黑色描边线条
- 卡通化的人物轮廓，简化细节
- 夸张的表情和动作
- 扁平化配色，避免过多渐变

纹理质感：
- 纸张纹理：vintage paper texture
- 印刷瑕疵：轻微的墨点和不均匀
- 边缘磨损效果
- 复古海报的颗粒感

整体氛围：
- 1930-1940年代的怀旧感
- 温暖、欢快的色调
- 手工印刷的质朴感
- 保持原照片的主体构图

重要：保持图像清晰度，适合打印在贺卡上
";

#[derive(Debug, Deserialize)]
struct ImageGenerationResponse {
    data: Option<Vec<GeneratedImage>>,
}

#[derive(Debug, Deserialize)]
struct GeneratedImage {
    b64_json: Option<String>,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Image-to-image generation through the Volcengine Ark (Seedream)
/// images-generations endpoint.
#[derive(Clone, Debug)]
pub struct SeedreamGenerator {
    client: Client,
    api_key: Option<String>,
    model: Option<String>,
    endpoint: String,
}

impl SeedreamGenerator {
    /// `model` is the Ark endpoint id (`ep-...`).
    pub fn new(api_key: Option<&str>, model: Option<&str>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.map(str::to_string),
            model: model.map(str::to_string),
            endpoint: SEEDREAM_API_URL.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }

    fn credentials(&self) -> Result<(&str, &str)> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            CardError::Configuration("Seedream API Key (Access Key) is missing.".to_string())
        })?;
        let model = self.model.as_deref().ok_or_else(|| {
            CardError::Configuration(
                "Seedream Endpoint ID is missing. Please configure SEEDREAM_ENDPOINT_ID.".to_string(),
            )
        })?;
        Ok((api_key, model))
    }
}

#[async_trait]
impl PosterGenerator for SeedreamGenerator {
    async fn generate(&self, image: &SourceImage) -> Result<String> {
        let (api_key, model) = self.credentials()?;

        let dimensions = get_dimensions(&image.bytes, &image.mime_type)?;
        let size = select_resolution(dimensions.width, dimensions.height);
        debug!(
            width = dimensions.width.get(),
            height = dimensions.height.get(),
            %size,
            "selected generation size"
        );

        let body = request_body(model, &image.to_data_uri(), size);
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if !status.is_success() {
            let message = error_message(status, &text);
            error!(%status, %message, "Seedream API error");
            return Err(CardError::Provider(message));
        }

        let payload: ImageGenerationResponse = serde_json::from_str(&text)?;
        let image_ref = first_image(payload)?;
        info!(%size, inline = image_ref.starts_with("data:"), "poster generated");
        Ok(image_ref)
    }
}

fn request_body(model: &str, image_data_uri: &str, size: Resolution) -> Value {
    json!({
        "model": model,
        "prompt": SEEDREAM_PROMPT,
        "image": image_data_uri,
        "size": size.as_str(),
        "encoding_format": "base64",
        "watermark": false,
    })
}

fn error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error)
        .and_then(|error| error.message)
        .unwrap_or_else(|| format!("API Request failed with status {}", status.as_u16()))
}

fn first_image(payload: ImageGenerationResponse) -> Result<String> {
    let first = payload.data.and_then(|images| images.into_iter().next());
    match first {
        Some(GeneratedImage {
            b64_json: Some(b64), ..
        }) => Ok(format!("data:image/png;base64,{b64}")),
        Some(GeneratedImage { url: Some(url), .. }) => Ok(url),
        _ => Err(CardError::Provider(
            "No image data received from Seedream API".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> ImageGenerationResponse {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn request_carries_fixed_generation_options() {
        let body = request_body("ep-20250101-abc", "data:image/png;base64,AAAA", Resolution::Landscape);
        assert_eq!(body["model"], "ep-20250101-abc");
        assert_eq!(body["image"], "data:image/png;base64,AAAA");
        assert_eq!(body["size"], "2560x1440");
        assert_eq!(body["encoding_format"], "base64");
        assert_eq!(body["watermark"], false);
        assert_eq!(body["prompt"], SEEDREAM_PROMPT);
    }

    #[test]
    fn inline_payload_wins_over_url() {
        let payload = parse(r#"{"data":[{"b64_json":"QUJD","url":"https://x/y.png"}]}"#);
        assert_eq!(first_image(payload).unwrap(), "data:image/png;base64,QUJD");
    }

    #[test]
    fn url_is_used_without_inline_payload() {
        let payload = parse(r#"{"model":"m","data":[{"url":"https://x/y.png","size":"2048x2048"}]}"#);
        assert_eq!(first_image(payload).unwrap(), "https://x/y.png");
    }

    #[test]
    fn empty_output_is_a_provider_error() {
        for raw in [r#"{"data":[]}"#, r#"{}"#, r#"{"data":[{}]}"#] {
            assert!(matches!(first_image(parse(raw)), Err(CardError::Provider(_))));
        }
    }

    #[test]
    fn upstream_message_is_surfaced() {
        let body = r#"{"error":{"code":"InvalidParameter","message":"The parameter `size` is invalid"}}"#;
        assert_eq!(
            error_message(StatusCode::BAD_REQUEST, body),
            "The parameter `size` is invalid"
        );
        assert_eq!(
            error_message(StatusCode::UNAUTHORIZED, "not json"),
            "API Request failed with status 401"
        );
    }

    #[tokio::test]
    async fn missing_endpoint_id_fails_before_io() {
        let generator = SeedreamGenerator::new(Some("ak"), None).with_endpoint("http://127.0.0.1:1/unreachable");
        let image = SourceImage::new(vec![0x89, 0x50], "a.png", Some("image/png")).unwrap();
        let err = generator.generate(&image).await.unwrap_err();
        assert!(matches!(err, CardError::Configuration(_)));
    }

    #[tokio::test]
    async fn missing_api_key_fails_before_io() {
        let generator = SeedreamGenerator::new(None, Some("ep-1"));
        let image = SourceImage::new(vec![0x89, 0x50], "a.png", Some("image/png")).unwrap();
        assert!(matches!(
            generator.generate(&image).await,
            Err(CardError::Configuration(_))
        ));
    }
}
