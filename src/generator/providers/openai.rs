//! OpenAI image generation backend (gpt-image-1, dall-e-3).

use crate::error::{ImagenxError, Result};
use crate::generator::contract::ImageGenerator;
use crate::generator::types::ImageOutput;
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const GENERATIONS_URL: &str = "https://api.openai.com/v1/images/generations";

/// Sizes accepted by the OpenAI images endpoint. `1K` is an alias for
/// `1024x1024`.
const SUPPORTED_SIZES: &[&str] = &["1K", "1024x1024", "1536x1024", "1024x1536"];

/// Registry constructor for the `openai` provider.
pub(crate) fn construct(model: &str, api_key: &str) -> Result<Arc<dyn ImageGenerator>> {
    Ok(Arc::new(OpenAiImageGenerator::new(model, api_key)?))
}

/// Backend for OpenAI image models.
///
/// Does not implement `image_to_image`; the edits endpoint uses
/// multipart uploads outside this gateway's reference-image shape.
#[derive(Debug)]
pub struct OpenAiImageGenerator {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAiImageGenerator {
    /// Creates a credential-bound instance. Builds a client handle only;
    /// no network I/O happens here.
    pub fn new(model: &str, api_key: &str) -> Result<Self> {
        if model.is_empty() {
            return Err(ImagenxError::Configuration("model must not be empty".into()));
        }
        if api_key.is_empty() {
            return Err(ImagenxError::Configuration(
                "api_key must not be empty".into(),
            ));
        }
        Ok(Self {
            client: reqwest::Client::new(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }

    /// Maps the gateway size grammar to an OpenAI size string.
    fn resolve_size(size: &str) -> &str {
        match size {
            "1K" => "1024x1024",
            other => other,
        }
    }
}

#[async_trait]
impl ImageGenerator for OpenAiImageGenerator {
    fn provider(&self) -> &'static str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn supported_sizes(&self) -> &'static [&'static str] {
        SUPPORTED_SIZES
    }

    async fn text_to_image(&self, prompt: &str, size: &str) -> Result<Vec<ImageOutput>> {
        self.check_size(size)?;
        let body = OpenAiImageRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            n: 1,
            size: Self::resolve_size(size).to_string(),
        };

        let response = self
            .client
            .post(GENERATIONS_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ImagenxError::remote(
                "openai",
                format!("{}: {}", status.as_u16(), text),
            ));
        }

        let openai: OpenAiImageResponse = response.json().await?;
        let mut outputs = Vec::with_capacity(openai.data.len());
        for item in openai.data {
            if let Some(b64) = item.b64_json {
                let bytes = base64::engine::general_purpose::STANDARD
                    .decode(&b64)
                    .map_err(|e| ImagenxError::Decode(e.to_string()))?;
                outputs.push(ImageOutput::Bytes(bytes));
            } else if let Some(url) = item.url {
                outputs.push(ImageOutput::Url(url));
            } else {
                return Err(ImagenxError::Decode(
                    "OpenAI response item contained no image data".into(),
                ));
            }
        }
        Ok(outputs)
    }
}

#[derive(Debug, Serialize)]
struct OpenAiImageRequest {
    model: String,
    prompt: String,
    n: u32,
    size: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiImageResponse {
    data: Vec<OpenAiImageData>,
}

#[derive(Debug, Deserialize)]
struct OpenAiImageData {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    b64_json: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_empty_arguments() {
        assert!(OpenAiImageGenerator::new("", "sk-test").is_err());
        assert!(OpenAiImageGenerator::new("gpt-image-1", "").is_err());
    }

    #[test]
    fn test_resolve_size_maps_tag() {
        assert_eq!(OpenAiImageGenerator::resolve_size("1K"), "1024x1024");
        assert_eq!(OpenAiImageGenerator::resolve_size("1536x1024"), "1536x1024");
    }

    #[test]
    fn test_check_size_rejects_unlisted_tag() {
        let generator = OpenAiImageGenerator::new("gpt-image-1", "sk-test").unwrap();
        let err = generator.check_size("4K").unwrap_err();
        assert!(matches!(
            err,
            ImagenxError::UnsupportedSize { provider, size } if provider == "openai" && size == "4K"
        ));
    }

    #[tokio::test]
    async fn test_image_to_image_not_supported() {
        let generator = OpenAiImageGenerator::new("gpt-image-1", "sk-test").unwrap();
        let err = generator
            .image_to_image("prompt", &["ref.png".into()], "1K")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ImagenxError::CapabilityNotSupported { provider, .. } if provider == "openai"
        ));
    }

    #[test]
    fn test_response_deserialization() {
        let json = r#"{"data": [{"url": "https://example.com/img.png"}, {"b64_json": "AQID"}]}"#;
        let resp: OpenAiImageResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.data.len(), 2);
        assert_eq!(resp.data[0].url.as_deref(), Some("https://example.com/img.png"));
        assert_eq!(resp.data[1].b64_json.as_deref(), Some("AQID"));
    }
}
