//! MCP (Model Context Protocol) tool server.
//!
//! Exposes provider-backed image generation and the local post-processing
//! operations as tools over JSON-RPC 2.0 on stdio. Every tool failure maps
//! to a JSON-RPC error scoped to that request; the server itself never dies
//! on a bad call.

use crate::dispatch::Dispatcher;
use crate::generator::ImageOutput;
use crate::ops::{self, OutputFormat};
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::io::{self, BufRead, Write};
use std::path::Path;

/// JSON-RPC 2.0 request.
#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    jsonrpc: String,
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Value,
}

/// JSON-RPC 2.0 response.
#[derive(Debug, Serialize)]
struct JsonRpcResponse {
    jsonrpc: &'static str,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

/// JSON-RPC 2.0 error.
#[derive(Debug, Serialize)]
struct JsonRpcError {
    code: i32,
    message: String,
}

impl JsonRpcResponse {
    fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    fn error(id: Value, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
            }),
        }
    }

    /// Wraps a JSON payload in the MCP text-content envelope.
    fn content(id: Value, payload: &Value) -> Self {
        let content = json!([{
            "type": "text",
            "text": serde_json::to_string_pretty(payload).unwrap_or_default()
        }]);
        Self::success(id, json!({ "content": content }))
    }
}

/// MCP tool definition.
#[derive(Debug, Serialize)]
struct Tool {
    name: &'static str,
    description: &'static str,
    #[serde(rename = "inputSchema")]
    input_schema: Value,
}

#[derive(Debug, Deserialize)]
struct TextToImageParams {
    prompt: String,
    size: String,
}

#[derive(Debug, Deserialize)]
struct ImageToImageParams {
    prompt: String,
    images: Vec<String>,
    size: String,
}

#[derive(Debug, Deserialize)]
struct DownloadImageParams {
    url: String,
    path: String,
}

#[derive(Debug, Deserialize)]
struct CropImageParams {
    input: String,
    output: String,
    x: u32,
    y: u32,
    width: u32,
    height: u32,
}

#[derive(Debug, Deserialize)]
struct ResizeImageParams {
    input: String,
    output: String,
    width: u32,
    height: u32,
}

#[derive(Debug, Deserialize)]
struct ConvertImageParams {
    input: String,
    output: String,
}

#[derive(Debug, Deserialize)]
struct AdjustImageParams {
    input: String,
    output: String,
    #[serde(default)]
    brightness: Option<i32>,
    #[serde(default)]
    contrast: Option<f32>,
    #[serde(default)]
    saturation: Option<f32>,
}

/// Rejects output paths containing directory traversal components.
fn validate_output_path(path: &str) -> std::result::Result<(), String> {
    let path = Path::new(path);
    for component in path.components() {
        if matches!(component, std::path::Component::ParentDir) {
            return Err("Path must not contain '..' components".into());
        }
    }
    Ok(())
}

/// MCP server for the image gateway.
pub struct McpServer {
    dispatcher: Dispatcher,
    headers: HashMap<String, String>,
    http: reqwest::Client,
    initialized: bool,
}

impl McpServer {
    /// Creates a server over `dispatcher` with no transport headers
    /// (stdio deployments configure via environment).
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self::with_headers(dispatcher, HashMap::new())
    }

    /// Creates a server with transport-supplied request headers, as an HTTP
    /// transport would provide per connection.
    pub fn with_headers(dispatcher: Dispatcher, headers: HashMap<String, String>) -> Self {
        Self {
            dispatcher,
            headers,
            http: reqwest::Client::new(),
            initialized: false,
        }
    }

    /// Runs the server, reading JSON-RPC messages from stdin and writing
    /// responses to stdout.
    pub async fn run(&mut self) -> io::Result<()> {
        let stdin = io::stdin();
        let mut stdout = io::stdout();

        for line in stdin.lock().lines() {
            let line = line?;
            if line.is_empty() {
                continue;
            }

            if let Some(response) = self.handle_message(&line).await {
                let json = serde_json::to_string(&response).unwrap_or_else(|e| {
                    json!({"jsonrpc": "2.0", "id": null, "error": {"code": -32603, "message": e.to_string()}})
                        .to_string()
                });
                writeln!(stdout, "{}", json)?;
                stdout.flush()?;
            }
        }

        Ok(())
    }

    async fn handle_message(&mut self, message: &str) -> Option<JsonRpcResponse> {
        let request: JsonRpcRequest = match serde_json::from_str(message) {
            Ok(r) => r,
            Err(e) => {
                return Some(JsonRpcResponse::error(
                    Value::Null,
                    -32700,
                    format!("Parse error: {}", e),
                ));
            }
        };

        if request.jsonrpc != "2.0" {
            return Some(JsonRpcResponse::error(
                request.id.unwrap_or(Value::Null),
                -32600,
                "Invalid JSON-RPC version",
            ));
        }

        let id = request.id.clone().unwrap_or(Value::Null);

        match request.method.as_str() {
            "initialize" => Some(self.handle_initialize(id)),
            "initialized" => None,
            "tools/list" => Some(self.handle_tools_list(id)),
            "tools/call" => Some(self.handle_tools_call(id, &request.params).await),
            "ping" => Some(JsonRpcResponse::success(id, json!({}))),
            _ => Some(JsonRpcResponse::error(
                id,
                -32601,
                format!("Method not found: {}", request.method),
            )),
        }
    }

    fn handle_initialize(&mut self, id: Value) -> JsonRpcResponse {
        self.initialized = true;
        JsonRpcResponse::success(
            id,
            json!({
                "protocolVersion": "2024-11-05",
                "capabilities": {
                    "tools": {}
                },
                "serverInfo": {
                    "name": "imagenx",
                    "version": env!("CARGO_PKG_VERSION")
                }
            }),
        )
    }

    fn handle_tools_list(&self, id: Value) -> JsonRpcResponse {
        let path_prop = |desc: &str| json!({ "type": "string", "description": desc });

        let tools = vec![
            Tool {
                name: "text_to_image",
                description: "Generate images from a text prompt via the configured provider. \
                              Size is a resolution tag (1K/2K/4K) or WIDTHxHEIGHT from the \
                              provider's supported list.",
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "prompt": { "type": "string", "description": "Text description of the image" },
                        "size": { "type": "string", "description": "Resolution tag (1K/2K/4K) or WIDTHxHEIGHT" }
                    },
                    "required": ["prompt", "size"]
                }),
            },
            Tool {
                name: "image_to_image",
                description: "Generate images guided by reference images (local paths or URLs). \
                              Not all providers support this.",
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "prompt": { "type": "string", "description": "Text description of the result" },
                        "images": {
                            "type": "array",
                            "items": { "type": "string" },
                            "description": "Reference image paths or URLs"
                        },
                        "size": { "type": "string", "description": "Resolution tag (1K/2K/4K) or WIDTHxHEIGHT" }
                    },
                    "required": ["prompt", "images", "size"]
                }),
            },
            Tool {
                name: "download_image",
                description: "Download a generated image URL and save it to a local path. \
                              Refuses to overwrite existing files.",
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "url": path_prop("Image URL"),
                        "path": path_prop("Destination file path")
                    },
                    "required": ["url", "path"]
                }),
            },
            Tool {
                name: "crop_image",
                description: "Crop a local image to the given region.",
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "input": path_prop("Source image path"),
                        "output": path_prop("Destination image path"),
                        "x": { "type": "integer", "minimum": 0 },
                        "y": { "type": "integer", "minimum": 0 },
                        "width": { "type": "integer", "minimum": 1 },
                        "height": { "type": "integer", "minimum": 1 }
                    },
                    "required": ["input", "output", "x", "y", "width", "height"]
                }),
            },
            Tool {
                name: "resize_image",
                description: "Resize a local image to exact pixel dimensions.",
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "input": path_prop("Source image path"),
                        "output": path_prop("Destination image path"),
                        "width": { "type": "integer", "minimum": 1 },
                        "height": { "type": "integer", "minimum": 1 }
                    },
                    "required": ["input", "output", "width", "height"]
                }),
            },
            Tool {
                name: "convert_image",
                description: "Re-encode a local image; the target format comes from the output \
                              file extension (png, jpg, webp).",
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "input": path_prop("Source image path"),
                        "output": path_prop("Destination image path; extension selects the format")
                    },
                    "required": ["input", "output"]
                }),
            },
            Tool {
                name: "adjust_image",
                description: "Adjust brightness (-255..255), contrast (percentage delta), and \
                              saturation (multiplier, 1.0 = unchanged) of a local image.",
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "input": path_prop("Source image path"),
                        "output": path_prop("Destination image path"),
                        "brightness": { "type": "integer", "minimum": -255, "maximum": 255 },
                        "contrast": { "type": "number" },
                        "saturation": { "type": "number", "minimum": 0 }
                    },
                    "required": ["input", "output"]
                }),
            },
            Tool {
                name: "list_providers",
                description: "List registered provider tokens and whether the model identifier \
                              and API key are configured for this request.",
                input_schema: json!({
                    "type": "object",
                    "properties": {},
                    "required": []
                }),
            },
        ];

        JsonRpcResponse::success(id, json!({ "tools": tools }))
    }

    async fn handle_tools_call(&self, id: Value, params: &Value) -> JsonRpcResponse {
        let tool_name = params.get("name").and_then(|v| v.as_str()).unwrap_or("");
        let arguments = params.get("arguments").cloned().unwrap_or(json!({}));

        match tool_name {
            "text_to_image" => self.text_to_image(id, arguments).await,
            "image_to_image" => self.image_to_image(id, arguments).await,
            "download_image" => self.download_image(id, arguments).await,
            "crop_image" => self.crop_image(id, arguments),
            "resize_image" => self.resize_image(id, arguments),
            "convert_image" => self.convert_image(id, arguments),
            "adjust_image" => self.adjust_image(id, arguments),
            "list_providers" => self.list_providers(id),
            _ => JsonRpcResponse::error(id, -32602, format!("Unknown tool: {}", tool_name)),
        }
    }

    fn outputs_payload(outputs: Vec<ImageOutput>) -> Value {
        let entries: Vec<Value> = outputs
            .into_iter()
            .map(|output| match output {
                ImageOutput::Url(url) => json!({ "url": url }),
                ImageOutput::Bytes(data) => {
                    let mime = image::guess_format(&data)
                        .map(|f| f.to_mime_type())
                        .unwrap_or("application/octet-stream");
                    json!({
                        "base64": base64::engine::general_purpose::STANDARD.encode(&data),
                        "mime_type": mime,
                        "size_bytes": data.len()
                    })
                }
            })
            .collect();
        json!({ "images": entries })
    }

    async fn text_to_image(&self, id: Value, arguments: Value) -> JsonRpcResponse {
        let params: TextToImageParams = match serde_json::from_value(arguments) {
            Ok(p) => p,
            Err(e) => {
                return JsonRpcResponse::error(id, -32602, format!("Invalid parameters: {}", e));
            }
        };

        match self
            .dispatcher
            .text_to_image(&self.headers, &params.prompt, &params.size)
            .await
        {
            Ok(outputs) => JsonRpcResponse::content(id, &Self::outputs_payload(outputs)),
            Err(e) => JsonRpcResponse::error(id, -32603, e.to_string()),
        }
    }

    async fn image_to_image(&self, id: Value, arguments: Value) -> JsonRpcResponse {
        let params: ImageToImageParams = match serde_json::from_value(arguments) {
            Ok(p) => p,
            Err(e) => {
                return JsonRpcResponse::error(id, -32602, format!("Invalid parameters: {}", e));
            }
        };

        match self
            .dispatcher
            .image_to_image(&self.headers, &params.prompt, &params.images, &params.size)
            .await
        {
            Ok(outputs) => JsonRpcResponse::content(id, &Self::outputs_payload(outputs)),
            Err(e) => JsonRpcResponse::error(id, -32603, e.to_string()),
        }
    }

    async fn download_image(&self, id: Value, arguments: Value) -> JsonRpcResponse {
        let params: DownloadImageParams = match serde_json::from_value(arguments) {
            Ok(p) => p,
            Err(e) => {
                return JsonRpcResponse::error(id, -32602, format!("Invalid parameters: {}", e));
            }
        };

        if let Err(msg) = validate_output_path(&params.path) {
            return JsonRpcResponse::error(id, -32602, msg);
        }
        if Path::new(&params.path).exists() {
            return JsonRpcResponse::error(
                id,
                -32602,
                format!("Path {} already exists", params.path),
            );
        }

        let response = match self.http.get(&params.url).send().await {
            Ok(r) => r,
            Err(e) => return JsonRpcResponse::error(id, -32603, e.to_string()),
        };
        if !response.status().is_success() {
            return JsonRpcResponse::error(
                id,
                -32603,
                format!("Download failed with status {}", response.status().as_u16()),
            );
        }
        let bytes = match response.bytes().await {
            Ok(b) => b,
            Err(e) => return JsonRpcResponse::error(id, -32603, e.to_string()),
        };
        if let Err(e) = std::fs::write(&params.path, &bytes) {
            return JsonRpcResponse::error(id, -32603, e.to_string());
        }

        JsonRpcResponse::content(
            id,
            &json!({ "saved_to": params.path, "size_bytes": bytes.len() }),
        )
    }

    /// Shared read-op-write shell for the local post-processing tools.
    fn file_op(
        id: Value,
        input: &str,
        output: &str,
        op: impl FnOnce(&[u8]) -> crate::Result<Vec<u8>>,
    ) -> JsonRpcResponse {
        if let Err(msg) = validate_output_path(output) {
            return JsonRpcResponse::error(id, -32602, msg);
        }

        let data = match std::fs::read(input) {
            Ok(d) => d,
            Err(e) => {
                return JsonRpcResponse::error(id, -32603, format!("Failed to read {input}: {e}"));
            }
        };

        let result = match op(&data) {
            Ok(r) => r,
            Err(e) => return JsonRpcResponse::error(id, -32603, e.to_string()),
        };

        if let Err(e) = std::fs::write(output, &result) {
            return JsonRpcResponse::error(id, -32603, format!("Failed to write {output}: {e}"));
        }

        JsonRpcResponse::content(
            id,
            &json!({ "output": output, "size_bytes": result.len() }),
        )
    }

    fn crop_image(&self, id: Value, arguments: Value) -> JsonRpcResponse {
        let params: CropImageParams = match serde_json::from_value(arguments) {
            Ok(p) => p,
            Err(e) => {
                return JsonRpcResponse::error(id, -32602, format!("Invalid parameters: {}", e));
            }
        };
        Self::file_op(id, &params.input, &params.output, |data| {
            ops::crop(data, params.x, params.y, params.width, params.height)
        })
    }

    fn resize_image(&self, id: Value, arguments: Value) -> JsonRpcResponse {
        let params: ResizeImageParams = match serde_json::from_value(arguments) {
            Ok(p) => p,
            Err(e) => {
                return JsonRpcResponse::error(id, -32602, format!("Invalid parameters: {}", e));
            }
        };
        Self::file_op(id, &params.input, &params.output, |data| {
            ops::resize(data, params.width, params.height)
        })
    }

    fn convert_image(&self, id: Value, arguments: Value) -> JsonRpcResponse {
        let params: ConvertImageParams = match serde_json::from_value(arguments) {
            Ok(p) => p,
            Err(e) => {
                return JsonRpcResponse::error(id, -32602, format!("Invalid parameters: {}", e));
            }
        };

        let format = Path::new(&params.output)
            .extension()
            .and_then(|e| e.to_str())
            .and_then(OutputFormat::from_extension);
        let format = match format {
            Some(f) => f,
            None => {
                return JsonRpcResponse::error(
                    id,
                    -32602,
                    "Output extension must be png, jpg, or webp",
                );
            }
        };

        Self::file_op(id, &params.input, &params.output, |data| {
            ops::convert(data, format)
        })
    }

    fn adjust_image(&self, id: Value, arguments: Value) -> JsonRpcResponse {
        let params: AdjustImageParams = match serde_json::from_value(arguments) {
            Ok(p) => p,
            Err(e) => {
                return JsonRpcResponse::error(id, -32602, format!("Invalid parameters: {}", e));
            }
        };
        Self::file_op(id, &params.input, &params.output, |data| {
            ops::adjust(
                data,
                params.brightness.unwrap_or(0),
                params.contrast.unwrap_or(0.0),
                params.saturation.unwrap_or(1.0),
            )
        })
    }

    fn list_providers(&self, id: Value) -> JsonRpcResponse {
        let env = crate::config::process_env();
        let payload = json!({
            "providers": self.dispatcher.factory().registry().providers(),
            "model_configured": crate::config::resolve(&self.headers, &env).is_ok(),
        });
        JsonRpcResponse::content(id, &payload)
    }
}
