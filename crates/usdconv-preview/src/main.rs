//! `usd-preview`: convert an asset platform item to a glTF preview.

use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use plugin_usd_converter::{ConversionProcessor, OutputFormat};
use usdconv_asset::{PreviewJob, build_store};
use usdconv_core::error::AppError;
use usdconv_core::init_logging;

mod settings;

use settings::Settings;

/// Fetch a USD item by id, convert it with headless Blender, and print the
/// path of the generated preview.
#[derive(Debug, Parser)]
#[command(name = "usd-preview", version, about, long_about = None)]
struct Cli {
    /// Identifier of the source item in the asset store
    #[arg(long = "item-id", alias = "item_id")]
    item_id: String,

    /// Output format: GLB, GLTF_EMBEDDED, or GLTF
    #[arg(long, default_value = "GLB")]
    format: String,

    /// Path to a configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl Cli {
    async fn execute(&self) -> Result<PathBuf, AppError> {
        let format: OutputFormat = self.format.parse()?;

        let settings = Settings::load(self.config.as_deref())?;
        init_logging(&settings.logging);

        let store = build_store(&settings.asset_store).await?;
        let processor = ConversionProcessor::new(settings.converter)?;
        let job = PreviewJob::new(store, processor, &settings.asset_store);

        let result = job.run(&self.item_id, format).await?;
        if let Some(preview) = &result.published {
            info!(preview_id = %preview.id, remote = %preview.filename, "Preview published");
        }
        Ok(result.output_path)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    match cli.execute().await {
        Ok(path) => println!("{}", path.display()),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
