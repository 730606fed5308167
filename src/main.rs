use clap::{Parser, Subcommand};
use frame_slicer::imaging::RustBackend;
use frame_slicer::pipeline::{self, ExportRequest, SuggestRequest};
use frame_slicer::upload::HttpUploader;
use frame_slicer::{config, output};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "frame-slicer")]
#[command(about = "Cut design frames into compressed, uploaded image slices")]
#[command(long_about = "\
Cut design frames into compressed, uploaded image slices

A request is a JSON file describing one frame: its logical size, optional
header/footer bands, its direct children (for auto-slicing) or caller-drawn
slices, and the exported image as base64.

  {
    \"frameName\": \"Summer Sale\",
    \"frameWidth\": 600, \"frameHeight\": 2400,
    \"headerHeight\": 80, \"footerHeight\": 120,
    \"pixelRatio\": 2,
    \"account\": \"ACME Corp\",
    \"children\": [{\"y\": 80, \"width\": 600, \"height\": 700}],
    \"imageData\": \"data:image/png;base64,...\"
  }

Slices are uploaded as {batch}-slice-1, {batch}-slice-2, ... in order.

Set RUST_LOG=info to log each slice as it is uploaded.
Run 'frame-slicer gen-config' to generate a documented slicer.toml.")]
#[command(version)]
struct Cli {
    /// Config file (missing file = stock defaults)
    #[arg(long, default_value = "slicer.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

/// Shared flags for commands that read a request.
#[derive(clap::Args, Clone)]
struct RequestArgs {
    /// Request JSON file
    request: PathBuf,

    /// Print the result as JSON instead of a summary
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Propose slices for a frame without exporting anything
    Suggest(RequestArgs),
    /// Slice, compress, and upload a frame
    Export {
        #[command(flatten)]
        args: RequestArgs,

        /// Also write the batch JSON to this file
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print a stock slicer.toml with all options documented
    GenConfig,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Suggest(args) => {
            let config = config::load_config(&cli.config)?;
            let request: SuggestRequest = read_request(&args.request)?;
            let response = pipeline::suggest(&request, &config);
            if args.json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                output::print_suggest_output(&response);
            }
        }
        Command::Export {
            args,
            output: batch_path,
        } => {
            let config = config::load_config(&cli.config)?;
            init_thread_pool(&config.processing);
            let request: ExportRequest = read_request(&args.request)?;

            let backend = RustBackend::new();
            let uploader = HttpUploader::from_config(&config.upload)?;
            let batch = pipeline::export(&request, &config, &backend, &uploader).await?;

            let json = serde_json::to_string_pretty(&batch)?;
            if let Some(path) = &batch_path {
                std::fs::write(path, &json)?;
            }
            if args.json {
                println!("{}", json);
            } else {
                let frame_width = request.frame.params(&config).frame_width;
                output::print_batch_output(&batch, frame_width);
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn read_request<T: serde::de::DeserializeOwned>(
    path: &Path,
) -> Result<T, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores. Users can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
