//! Vintage-poster generation backends.

pub mod gemini;
pub mod seedream;

use async_trait::async_trait;

use crate::error::{CardError, Result};
use crate::image_processing::{detect_mime_type, encode_data_uri};

pub use gemini::GeminiGenerator;
pub use seedream::SeedreamGenerator;

/// Photo uploaded by the user, as handed to a generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub file_name: String,
}

impl SourceImage {
    /// The type sniffed from the magic bytes wins. The declared content type
    /// is used only when the bytes are not recognized and it names an image.
    pub fn new(bytes: Vec<u8>, file_name: &str, declared_mime: Option<&str>) -> Result<Self> {
        if bytes.is_empty() {
            return Err(CardError::Validation("uploaded file is empty".to_string()));
        }
        match declared_mime {
            Some(mime) if !mime.starts_with("image/") && mime != "application/octet-stream" => {
                return Err(CardError::Validation(format!("unsupported file type: {mime}")));
            }
            _ => {}
        }
        let mime_type = match (detect_mime_type(&bytes), declared_mime) {
            (Some(detected), _) => detected.to_string(),
            (None, Some(mime)) if mime.starts_with("image/") => mime.to_string(),
            _ => return Err(CardError::Validation("unsupported file type".to_string())),
        };
        Ok(Self {
            bytes,
            mime_type,
            file_name: file_name.to_string(),
        })
    }

    pub fn to_data_uri(&self) -> String {
        encode_data_uri(&self.bytes, &self.mime_type)
    }
}

#[async_trait]
pub trait PosterGenerator: Send + Sync {
    /// Returns a displayable image reference: a data URI or a remote URL.
    async fn generate(&self, image: &SourceImage) -> Result<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorKind {
    Seedream,
    Gemini,
}

impl GeneratorKind {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|value| value.trim().to_ascii_lowercase()).as_deref() {
            Some("gemini") => GeneratorKind::Gemini,
            _ => GeneratorKind::Seedream,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declared_image_type_applies_to_unknown_bytes() {
        let image = SourceImage::new(vec![1, 2, 3], "a.heic", Some("image/heic")).unwrap();
        assert_eq!(image.mime_type, "image/heic");
    }

    #[test]
    fn sniffed_type_overrides_declared_image_type() {
        let png = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];
        let image = SourceImage::new(png.to_vec(), "photo.jpg", Some("image/jpeg")).unwrap();
        assert_eq!(image.mime_type, "image/png");
    }

    #[test]
    fn octet_stream_is_sniffed() {
        let png = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];
        let image = SourceImage::new(png.to_vec(), "upload", Some("application/octet-stream")).unwrap();
        assert_eq!(image.mime_type, "image/png");
        assert!(image.to_data_uri().starts_with("data:image/png;base64,"));
    }

    #[test]
    fn non_image_upload_is_rejected() {
        assert!(matches!(
            SourceImage::new(b"%PDF-1.7".to_vec(), "doc.pdf", Some("application/pdf")),
            Err(CardError::Validation(_))
        ));
        assert!(matches!(
            SourceImage::new(Vec::new(), "empty.png", Some("image/png")),
            Err(CardError::Validation(_))
        ));
    }

    #[test]
    fn generator_kind_defaults_to_seedream() {
        assert_eq!(GeneratorKind::parse(None), GeneratorKind::Seedream);
        assert_eq!(GeneratorKind::parse(Some(" Gemini ")), GeneratorKind::Gemini);
        assert_eq!(GeneratorKind::parse(Some("other")), GeneratorKind::Seedream);
    }
}
