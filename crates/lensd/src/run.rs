use std::fs;
use std::io::{self, BufRead, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use lensing::bridge::RenderArgs;
use lensing::{
    BackendFactory, Bridge, RenderBackend, Request, Response, TextureRegistry, WgpuFactory,
};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, ServeArgs, StillArgs};
use crate::config::LensdConfig;
use crate::host::{self, HeadlessRegistry};
use crate::paths::AppPaths;

pub fn run(cli: Cli) -> Result<()> {
    initialise_tracing();

    let config = load_config(cli.config.as_deref())?;
    let factory = WgpuFactory::new(config.renderer_settings());

    match cli.command.unwrap_or(Command::Serve(ServeArgs::default())) {
        Command::Serve(args) => {
            let registry = HeadlessRegistry::new(args.export_dir);
            let mut bridge = Bridge::new(factory, registry);
            let stdin = io::stdin();
            let stdout = io::stdout();
            let handled = serve(&mut bridge, stdin.lock(), stdout.lock())?;
            tracing::info!(requests = handled, "input closed; shutting down");
            bridge.dispose_all();
            Ok(())
        }
        Command::Still(args) => render_still(factory, &config, &args),
        Command::Probe => {
            let available = factory.probe();
            println!("{}", if available { "available" } else { "unavailable" });
            Ok(())
        }
    }
}

fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn load_config(explicit: Option<&Path>) -> Result<LensdConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let paths = AppPaths::discover()?;
            let path = paths.config_file();
            if !path.exists() {
                tracing::debug!(path = %path.display(), "no config file; using defaults");
                return Ok(LensdConfig::default());
            }
            path
        }
    };
    let contents = fs::read_to_string(&path)
        .with_context(|| format!("failed to read config at {}", path.display()))?;
    let config = LensdConfig::from_toml_str(&contents)
        .with_context(|| format!("failed to load config at {}", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded config");
    Ok(config)
}

/// Answers one JSON request per input line until EOF. Blank lines are
/// skipped; returns the number of requests answered.
pub fn serve<F, R>(
    bridge: &mut Bridge<F, R>,
    input: impl BufRead,
    mut output: impl Write,
) -> Result<usize>
where
    F: BackendFactory,
    R: TextureRegistry<<F::Backend as RenderBackend>::Surface>,
{
    let mut handled = 0;
    for line in input.lines() {
        let line = line.context("failed to read request")?;
        if line.trim().is_empty() {
            continue;
        }
        let response = match Request::decode(&line) {
            Ok(request) => bridge.handle(request),
            Err(err) => {
                tracing::debug!(code = %err.code, message = %err.message, "rejected request");
                Response::Error(err)
            }
        };
        serde_json::to_writer(&mut output, &response).context("failed to encode response")?;
        output.write_all(b"\n").context("failed to write response")?;
        output.flush().context("failed to flush response")?;
        handled += 1;
    }
    Ok(handled)
}

fn render_still(factory: WgpuFactory, config: &LensdConfig, args: &StillArgs) -> Result<()> {
    let (width, height) = args.size;
    let mut bridge = Bridge::new(factory, HeadlessRegistry::new(None));

    let handle = bridge.create(i64::from(width), i64::from(height))?;
    if let Some(path) = args.background.as_deref() {
        let (rgba, bg_width, bg_height) = host::load_rgba(path)?;
        bridge.set_background(handle, i64::from(bg_width), i64::from(bg_height), &rgba)?;
    }

    let camera = &config.camera;
    let render = RenderArgs {
        handle,
        pos: camera.pos,
        target: camera.target,
        up: camera.up,
        fov_y: camera.fov_y,
        r_s: camera.r_s,
        cube_half_size: camera.cube_half_size,
        max_steps: i64::from(camera.max_steps),
        d_lambda: camera.d_lambda,
        width: i64::from(width),
        height: i64::from(height),
    };
    bridge.render(&render)?;

    let Some(surface) = bridge.registry().latest_frame(handle) else {
        bail!("renderer produced no frame at {width}x{height}");
    };
    host::save_surface_png(&surface, &args.output)?;
    tracing::info!(path = %args.output.display(), width, height, "wrote still frame");

    bridge.dispose(handle);
    Ok(())
}
