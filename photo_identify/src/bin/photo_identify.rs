//! Photo identify server binary.
//!
use std::{net::SocketAddr, path::PathBuf};

use anyhow::Result;
use clap::Parser;
use env_logger::TimestampPrecision;
use photo_identify::{
    build_app,
    config::{Settings, DEFAULT_LABELS_URL, DEFAULT_MAX_UPLOAD_BYTES},
    nn::Vgg16Model,
    AppState,
};

#[derive(Parser, Debug)]
#[clap(author, version)]
struct Args {
    /// Address to serve the upload page on
    #[clap(long, default_value = "127.0.0.1:8000")]
    server_address: SocketAddr,

    /// Project root, the model is read from `<root>/prediction/models/vgg16.onnx`
    #[clap(long, default_value = ".")]
    project_root: PathBuf,

    /// Model file to use instead of the one below the project root
    #[clap(long)]
    model_path: Option<PathBuf>,

    /// URL to download the model from if the model file does not exist
    #[clap(long)]
    model_url: Option<String>,

    /// ImageNet class index file, downloaded if it does not exist
    #[clap(long)]
    labels_path: Option<PathBuf>,

    /// URL of the ImageNet class index
    #[clap(long, default_value = DEFAULT_LABELS_URL)]
    labels_url: String,

    /// Maximum size of a request body in bytes
    #[clap(long, default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    max_upload_bytes: usize,
}

impl From<Args> for Settings {
    fn from(args: Args) -> Self {
        Self {
            server_address: args.server_address,
            project_root: args.project_root,
            model_path: args.model_path,
            model_url: args.model_url,
            labels_path: args.labels_path,
            labels_url: args.labels_url,
            max_upload_bytes: args.max_upload_bytes,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let settings: Settings = Args::parse().into();

    // Setup logger
    env_logger::builder()
        .format_timestamp(Some(TimestampPrecision::Millis))
        .init();

    // Load the model once, all requests share it
    let model = Vgg16Model::from_settings(&settings).await?;
    let app = build_app(AppState::new(model), settings.max_upload_bytes);

    // Serve HTTP server
    log::info!("Serving on http://{}", settings.server_address);
    axum::Server::bind(&settings.server_address)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}
