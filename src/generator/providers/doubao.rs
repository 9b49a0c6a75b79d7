//! Doubao (Volcengine Ark Seedream) image generation backend.

use crate::error::{ImagenxError, Result};
use crate::generator::contract::ImageGenerator;
use crate::generator::types::ImageOutput;
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const ARK_BASE_URL: &str = "https://ark.cn-beijing.volces.com/api/v3";

/// Sizes accepted by the Seedream image endpoint.
const SUPPORTED_SIZES: &[&str] = &[
    "1K",
    "2K",
    "4K",
    "2048x2048",
    "2304x1728",
    "1728x2304",
    "2560x1440",
    "1440x2560",
    "2496x1664",
    "1664x2496",
    "3024x1296",
];

/// Registry constructor for the `doubao` provider.
pub(crate) fn construct(model: &str, api_key: &str) -> Result<Arc<dyn ImageGenerator>> {
    Ok(Arc::new(DoubaoImageGenerator::new(model, api_key)?))
}

/// Backend for Doubao Seedream models served by the Volcengine Ark API.
#[derive(Debug)]
pub struct DoubaoImageGenerator {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl DoubaoImageGenerator {
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
            base_url: ARK_BASE_URL.to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }

    async fn generate(&self, body: &ArkImageRequest) -> Result<Vec<ImageOutput>> {
        let response = self
            .client
            .post(format!("{}/images/generations", self.base_url))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ImagenxError::remote(
                "doubao",
                format!("{}: {}", status.as_u16(), text),
            ));
        }

        let ark: ArkImageResponse = response.json().await?;
        let mut outputs = Vec::with_capacity(ark.data.len());
        for item in ark.data {
            if let Some(b64) = item.b64_json {
                let bytes = base64::engine::general_purpose::STANDARD
                    .decode(&b64)
                    .map_err(|e| ImagenxError::Decode(e.to_string()))?;
                outputs.push(ImageOutput::Bytes(bytes));
            } else if let Some(url) = item.url {
                outputs.push(ImageOutput::Url(url));
            } else {
                return Err(ImagenxError::Decode(
                    "Ark response item contained no image data".into(),
                ));
            }
        }
        Ok(outputs)
    }
}

/// Turns a reference image (path or URL) into a form the Ark API accepts:
/// URLs and data URLs pass through, local files are embedded as data URLs.
fn reference_to_ark_image(reference: &str) -> Result<String> {
    if reference.starts_with("http://")
        || reference.starts_with("https://")
        || reference.starts_with("data:")
    {
        return Ok(reference.to_string());
    }

    let data = std::fs::read(reference)?;
    let mime = image::guess_format(&data)
        .map(|f| f.to_mime_type())
        .unwrap_or("image/png");
    Ok(format!(
        "data:{};base64,{}",
        mime,
        base64::engine::general_purpose::STANDARD.encode(data)
    ))
}

#[async_trait]
impl ImageGenerator for DoubaoImageGenerator {
    fn provider(&self) -> &'static str {
        "doubao"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn supported_sizes(&self) -> &'static [&'static str] {
        SUPPORTED_SIZES
    }

    async fn text_to_image(&self, prompt: &str, size: &str) -> Result<Vec<ImageOutput>> {
        self.check_size(size)?;
        let body = ArkImageRequest::new(&self.model, prompt, size);
        self.generate(&body).await
    }

    async fn image_to_image(
        &self,
        prompt: &str,
        images: &[String],
        size: &str,
    ) -> Result<Vec<ImageOutput>> {
        self.check_size(size)?;
        if images.is_empty() {
            return Err(ImagenxError::InvalidRequest(
                "image_to_image requires at least one reference image".into(),
            ));
        }
        let references = images
            .iter()
            .map(|r| reference_to_ark_image(r))
            .collect::<Result<Vec<_>>>()?;
        let body = ArkImageRequest::new(&self.model, prompt, size).with_images(references);
        self.generate(&body).await
    }
}

#[derive(Debug, Serialize)]
struct ArkImageRequest {
    model: String,
    prompt: String,
    size: String,
    sequential_image_generation: &'static str,
    response_format: &'static str,
    stream: bool,
    watermark: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<Vec<String>>,
}

impl ArkImageRequest {
    fn new(model: &str, prompt: &str, size: &str) -> Self {
        Self {
            model: model.to_string(),
            prompt: prompt.to_string(),
            size: size.to_string(),
            sequential_image_generation: "auto",
            response_format: "b64_json",
            stream: false,
            watermark: false,
            image: None,
        }
    }

    fn with_images(mut self, images: Vec<String>) -> Self {
        self.image = Some(images);
        self
    }
}

#[derive(Debug, Deserialize)]
struct ArkImageResponse {
    data: Vec<ArkImageData>,
}

#[derive(Debug, Deserialize)]
struct ArkImageData {
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
        assert!(matches!(
            DoubaoImageGenerator::new("", "key").unwrap_err(),
            ImagenxError::Configuration(_)
        ));
        assert!(matches!(
            DoubaoImageGenerator::new("doubao-seedream-4-0-250828", "").unwrap_err(),
            ImagenxError::Configuration(_)
        ));
    }

    #[test]
    fn test_supported_sizes_include_tags_and_dimensions() {
        let generator = DoubaoImageGenerator::new("doubao-seedream-4-0-250828", "key").unwrap();
        assert!(generator.check_size("2K").is_ok());
        assert!(generator.check_size("2304x1728").is_ok());
    }

    #[test]
    fn test_check_size_rejects_unlisted_dimensions() {
        let generator = DoubaoImageGenerator::new("doubao-seedream-4-0-250828", "key").unwrap();
        let err = generator.check_size("9999x9999").unwrap_err();
        assert!(matches!(
            err,
            ImagenxError::UnsupportedSize { size, .. } if size == "9999x9999"
        ));
    }

    #[test]
    fn test_request_serialization() {
        let body = ArkImageRequest::new("doubao-seedream-4-0-250828", "a cat on a beach", "2K");
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["model"], "doubao-seedream-4-0-250828");
        assert_eq!(json["prompt"], "a cat on a beach");
        assert_eq!(json["size"], "2K");
        assert_eq!(json["sequential_image_generation"], "auto");
        assert_eq!(json["response_format"], "b64_json");
        assert_eq!(json["stream"], false);
        assert_eq!(json["watermark"], false);
        assert!(json.get("image").is_none());
    }

    #[test]
    fn test_request_serialization_with_images() {
        let body = ArkImageRequest::new("m", "p", "2K")
            .with_images(vec!["https://example.com/ref.png".into()]);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["image"][0], "https://example.com/ref.png");
    }

    #[test]
    fn test_response_deserialization_b64() {
        let json = r#"{"data": [{"b64_json": "AQID"}, {"b64_json": "BAUG"}]}"#;
        let resp: ArkImageResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.data.len(), 2);
        assert_eq!(resp.data[0].b64_json.as_deref(), Some("AQID"));
        assert!(resp.data[0].url.is_none());
    }

    #[test]
    fn test_response_deserialization_url() {
        let json = r#"{"data": [{"url": "https://ark.example/img.png"}]}"#;
        let resp: ArkImageResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.data[0].url.as_deref(), Some("https://ark.example/img.png"));
    }

    #[test]
    fn test_reference_passthrough_for_urls() {
        assert_eq!(
            reference_to_ark_image("https://example.com/a.png").unwrap(),
            "https://example.com/a.png"
        );
        assert_eq!(
            reference_to_ark_image("data:image/png;base64,AQID").unwrap(),
            "data:image/png;base64,AQID"
        );
    }

    #[test]
    fn test_reference_missing_file_is_io_error() {
        let err = reference_to_ark_image("/definitely/not/here.png").unwrap_err();
        assert!(matches!(err, ImagenxError::Io(_)));
    }
}
