//! `usd-to-gltf`: convert USD assets to glTF through headless Blender.
//!
//! Prints the output path on success. Inside Blender (`--blender-mode 1`)
//! it prints the conversion script instead.

use clap::Parser;

mod cli;
mod settings;

use cli::Cli;
use plugin_usd_converter::ConversionHandoff;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    match cli.execute().await {
        Ok(ConversionHandoff::Converted(outcome)) => {
            println!("{}", outcome.output_path.display());
        }
        Ok(ConversionHandoff::Script(script)) => {
            print!("{}", script.content());
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
