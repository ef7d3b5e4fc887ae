#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")] // hide console window on Windows in release

use anyhow::{anyhow, bail, Context};
use clap::Parser;
use eframe::egui;
use skymap_tools::app::MapViewerApp;
use skymap_tools::image_output::save_png;
use skymap_tools::render::{render_mollview, Norm};
use skymap_tools::{logging, read_map, ToolsConfig};
use std::path::PathBuf;

/// Display a HEALPix map in a Mollweide projection
#[derive(Parser, Debug)]
#[command(name = "vis-map", version, about)]
struct Args {
    /// HEALPix FITS map to display
    #[arg(short, long)]
    map: Option<PathBuf>,

    /// Write the rendered map to this PNG instead of opening a window
    #[arg(long, value_name = "PNG")]
    save: Option<PathBuf>,

    /// Linear colour scale instead of logarithmic
    #[arg(long)]
    linear: bool,

    /// Lower bound of the colour scale
    #[arg(long)]
    min: Option<f64>,

    /// Upper bound of the colour scale
    #[arg(long)]
    max: Option<f64>,

    /// Do not draw the coordinate grid
    #[arg(long)]
    no_graticule: bool,

    /// Image width in pixels
    #[arg(long)]
    width: Option<u32>,

    /// Configuration file (defaults to the user config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init(args.verbose);

    let config = ToolsConfig::resolve(args.config.as_deref())?;

    let mut params = config.render.to_params();
    if args.linear {
        params.norm = Norm::Linear;
        params.min = None;
    }
    if let Some(min) = args.min {
        params.min = Some(min);
    }
    if args.max.is_some() {
        params.max = args.max;
    }
    if args.no_graticule {
        params.graticule = None;
    }
    if let Some(width) = args.width {
        params.width = width;
    }

    let map = match &args.map {
        Some(path) => {
            let map = read_map(path).map_err(|e| {
                let message = e.user_message();
                anyhow::Error::new(e).context(message)
            })?;
            Some((path.clone(), map))
        }
        None => None,
    };

    if let Some(output) = &args.save {
        let Some((path, map)) = &map else {
            bail!("--save needs a map to render; pass one with --map");
        };
        let rendered = render_mollview(map, &params)
            .with_context(|| format!("Failed to render {}", path.display()))?;
        save_png(&rendered.image, output)?;
        tracing::info!(output = %output.display(), "Saved rendered map");
        return Ok(());
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([
            config.viewer.window_width,
            config.viewer.window_height,
        ]),
        ..Default::default()
    };
    eframe::run_native(
        "HEALPix Map Viewer",
        options,
        Box::new(move |_cc| Ok(Box::new(MapViewerApp::new(map, params)))),
    )
    .map_err(|e| anyhow!("Viewer failed: {e}"))
}
