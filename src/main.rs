// rcross - A desktop crosshair overlay for Wayland
// Displays a crosshair image in a borderless, always-on-top transparent window

mod image_loader;
mod overlay;
mod wayland;

use std::env;
use std::path::PathBuf;
use std::process;

use anyhow::Result;
use log::info;

use crate::image_loader::SourceImage;

/// The crosshair image is always read from the working directory.
const CROSSHAIR_FILE: &str = "crosshair.png";

fn main() -> Result<()> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let path = match env::current_dir() {
        Ok(dir) => dir.join(CROSSHAIR_FILE),
        Err(_) => PathBuf::from(CROSSHAIR_FILE),
    };

    // Image load failure is the only fatal startup error: report and exit 1
    let image = match SourceImage::load(&path) {
        Ok(image) => image,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    info!(
        "Starting rcross with image: {:?} ({}x{} pixels)",
        path, image.width, image.height
    );

    wayland::run(image)
}
