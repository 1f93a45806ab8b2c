use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "lensd",
    author,
    version,
    about = "Headless host for the gravitational lensing renderer"
)]
pub struct Cli {
    /// Configuration file; defaults to `lensd.toml` in the config directory.
    #[arg(long, global = true, value_name = "PATH", env = "LENSD_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Read JSON requests from stdin, one per line, and answer on stdout.
    Serve(ServeArgs),
    /// Render a single frame with the configured camera and write it as PNG.
    Still(StillArgs),
    /// Report whether a compute-capable GPU is available.
    Probe,
}

#[derive(Parser, Debug, Default)]
pub struct ServeArgs {
    /// Write every frame the host is notified about as a PNG into this directory.
    #[arg(long, value_name = "DIR")]
    pub export_dir: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct StillArgs {
    /// Output resolution (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_surface_size)]
    pub size: (u32, u32),

    /// Destination PNG file.
    #[arg(long, short, value_name = "PATH")]
    pub output: PathBuf,

    /// Equirectangular background image (any format `image` decodes).
    #[arg(long, value_name = "IMAGE")]
    pub background: Option<PathBuf>,
}

pub fn parse() -> Cli {
    Cli::parse()
}

/// Parses `WxH` (`x`, `X` or `×` between the two) into a non-zero extent.
pub fn parse_surface_size(value: &str) -> Result<(u32, u32), String> {
    let Some((width, height)) = value.trim().split_once(['x', 'X', '×']) else {
        return Err(format!("'{value}' is not WxH, e.g. 1280x720"));
    };
    Ok((dimension("width", width)?, dimension("height", height)?))
}

fn dimension(axis: &str, text: &str) -> Result<u32, String> {
    match text.trim().parse::<u32>() {
        Ok(0) => Err(format!("{axis} must be greater than zero")),
        Ok(pixels) => Ok(pixels),
        Err(err) => Err(format!("invalid {axis} '{}': {err}", text.trim())),
    }
}
