// Library interface for the sky map tools

pub mod app;
pub mod colormap;
pub mod config;
pub mod error;
pub mod fits;
pub mod healpix;
pub mod image_output;
pub mod listing;
pub mod logging;
pub mod map;
pub mod projection;
pub mod render;
pub mod utils;

// Synthetic maps for tests, benches and the sample generator
pub mod test_fixtures;

// Re-export commonly used types
pub use config::ToolsConfig;
pub use error::{ConfigError, ListError, MapError, RenderError, Result, SkymapError};
pub use map::{read_map, write_map, HealpixMap};
