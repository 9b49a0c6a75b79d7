//! CLI for Imagenx - provider-routed AI image generation.

use clap::{Args, Parser, Subcommand};
use imagenx::{Dispatcher, ImageOutput, ProviderRegistry};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "imagenx")]
#[command(about = "Generate images via AI APIs (Doubao Seedream, OpenAI)")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate images from a text prompt
    Image(ImageArgs),

    /// List registered provider tokens
    Providers,

    /// Run as MCP server (for AI agent integration)
    Mcp,
}

#[derive(Args)]
struct ImageArgs {
    /// The text prompt describing the image
    prompt: String,

    /// Resolution tag (1K/2K/4K) or WIDTHxHEIGHT
    #[arg(short, long, default_value = "2K")]
    size: String,

    /// Reference images for image-to-image (paths or URLs)
    #[arg(short, long)]
    images: Vec<String>,

    /// Output file path; with multiple results an index is appended
    #[arg(short, long, default_value = "imagenx.png")]
    output: PathBuf,

    /// provider:model identifier, overriding IMAGENX_MODEL
    #[arg(short, long)]
    model: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Image(args) => {
            generate_image(args, cli.json).await?;
        }
        Commands::Providers => {
            list_providers(cli.json)?;
        }
        Commands::Mcp => {
            run_mcp_server().await?;
        }
    }

    Ok(())
}

/// Output path for result `index`: the configured path as-is for a single
/// result, `stem-<index>.<ext>` otherwise.
fn output_path(base: &PathBuf, index: usize, total: usize) -> PathBuf {
    if total == 1 {
        return base.clone();
    }
    let stem = base
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("imagenx");
    let ext = base.extension().and_then(|e| e.to_str()).unwrap_or("png");
    base.with_file_name(format!("{stem}-{index}.{ext}"))
}

async fn generate_image(args: ImageArgs, json_output: bool) -> anyhow::Result<()> {
    let mut headers = HashMap::new();
    if let Some(model) = args.model {
        headers.insert("imagenx_model".to_string(), model);
    }

    let dispatcher = Dispatcher::new();
    let outputs = if args.images.is_empty() {
        dispatcher
            .text_to_image(&headers, &args.prompt, &args.size)
            .await?
    } else {
        dispatcher
            .image_to_image(&headers, &args.prompt, &args.images, &args.size)
            .await?
    };

    let http = reqwest::Client::new();
    let total = outputs.len();
    let mut saved = Vec::with_capacity(total);

    for (index, output) in outputs.into_iter().enumerate() {
        let path = output_path(&args.output, index, total);
        let bytes = match output {
            ImageOutput::Bytes(data) => data,
            ImageOutput::Url(url) => {
                let response = http.get(&url).send().await?.error_for_status()?;
                response.bytes().await?.to_vec()
            }
        };
        std::fs::write(&path, &bytes)?;
        saved.push((path, bytes.len()));
    }

    if json_output {
        let result = serde_json::json!({
            "type": "image",
            "success": true,
            "outputs": saved
                .iter()
                .map(|(path, size)| serde_json::json!({
                    "output": path.display().to_string(),
                    "size_bytes": size,
                }))
                .collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        for (path, size) in &saved {
            println!("Generated image: {} ({} bytes)", path.display(), size);
        }
    }

    Ok(())
}

fn list_providers(json_output: bool) -> anyhow::Result<()> {
    let providers = ProviderRegistry::builtin().providers();

    if json_output {
        println!("{}", serde_json::to_string_pretty(&providers)?);
    } else {
        println!("Registered providers:\n");
        for provider in &providers {
            println!("  {}", provider);
        }
        println!("\nSelect one via IMAGENX_MODEL=<provider>:<model> (or --model).");
    }

    Ok(())
}

async fn run_mcp_server() -> anyhow::Result<()> {
    eprintln!("[imagenx-mcp] Starting MCP server...");
    let mut server = imagenx::mcp::McpServer::new(Dispatcher::new());
    server.run().await?;
    Ok(())
}
