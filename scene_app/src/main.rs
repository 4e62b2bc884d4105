//! Lit container scene
//!
//! Usage: `scene_app [--config <file.toml>] [--headless] [--frames <n>]`
//!
//! Asset paths in the configuration are relative to the working directory, so
//! run from the `scene_app` directory to pick up `resources/`.

mod scene;

use render_engine::config::BackendKind;
use render_engine::foundation::logging;
use render_engine::prelude::*;
use thiserror::Error;

const DEFAULT_CONFIG: &str = "config/scene.toml";

/// Command-line problems
#[derive(Error, Debug, PartialEq, Eq)]
enum CliError {
    #[error("Unknown argument: {0}")]
    UnknownArgument(String),
    #[error("Missing value for {0}")]
    MissingValue(&'static str),
    #[error("Invalid frame count: {0}")]
    InvalidFrames(String),
}

#[derive(Debug, Default, PartialEq, Eq)]
struct CliOptions {
    config: Option<String>,
    headless: bool,
    frames: Option<u32>,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<CliOptions, CliError> {
    let mut options = CliOptions::default();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--headless" => options.headless = true,
            "--config" => options.config = Some(args.next().ok_or(CliError::MissingValue("--config"))?),
            "--frames" => {
                let value = args.next().ok_or(CliError::MissingValue("--frames"))?;
                let frames = value.parse().map_err(|_| CliError::InvalidFrames(value))?;
                options.frames = Some(frames);
            }
            _ => return Err(CliError::UnknownArgument(arg)),
        }
    }
    Ok(options)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let options = parse_args(std::env::args().skip(1))?;

    let mut config =
        ApplicationConfig::load_or_default(options.config.as_deref().unwrap_or(DEFAULT_CONFIG));
    if options.headless {
        config.renderer.backend = BackendKind::Headless;
    }
    if let Some(frames) = options.frames {
        config.headless.frames = frames;
    }
    logging::init(&config.logging.level);

    log::info!("Starting scene ({:?} backend)", config.renderer.backend);
    let mut driver = FrameDriver::from_config(&config)?;
    log::info!("Device: {}", driver.device().name());

    scene::build(&mut driver, &config.assets, config.renderer.uniform_lookup);

    let frames = driver.run();
    log::info!(
        "Rendered {} frame(s), last frame at {:.2}s, {} device error(s)",
        frames,
        driver.timer().last_time(),
        driver.device_errors()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_flags_are_parsed() {
        let options = parse_args(args(&["--headless", "--frames", "10", "--config", "a.toml"])).unwrap();
        assert_eq!(
            options,
            CliOptions { config: Some("a.toml".to_string()), headless: true, frames: Some(10) }
        );
        assert_eq!(parse_args(args(&[])).unwrap(), CliOptions::default());
    }

    #[test]
    fn test_bad_arguments_are_reported() {
        assert_eq!(parse_args(args(&["--fast"])), Err(CliError::UnknownArgument("--fast".to_string())));
        assert_eq!(parse_args(args(&["--frames"])), Err(CliError::MissingValue("--frames")));
        assert_eq!(
            parse_args(args(&["--frames", "x"])),
            Err(CliError::InvalidFrames("x".to_string()))
        );
    }
}
