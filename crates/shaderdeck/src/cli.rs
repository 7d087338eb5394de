use std::path::PathBuf;

use clap::Parser;

/// Fallback shader path used when no argument is given.
pub const DEFAULT_SHADER_PATH: &str = "shaders/demo.frag";

#[derive(Parser, Debug)]
#[command(
    name = "shaderdeck",
    author,
    version,
    about = "Live-reloading fragment shader runner"
)]
pub struct Cli {
    /// Fragment shader file, or a directory to cycle through with [ and ].
    #[arg(value_name = "PATH")]
    pub shader: Option<PathBuf>,

    /// Initial window size (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_surface_size)]
    pub size: Option<(u32, u32)>,

    /// Optional FPS cap; omit to render every vsync tick.
    #[arg(long, value_name = "FPS")]
    pub fps: Option<f32>,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_surface_size(value: &str) -> Result<(u32, u32), String> {
    let trimmed = value.trim();
    let (w, h) = trimmed
        .split_once(['x', 'X'])
        .ok_or_else(|| "expected WIDTHxHEIGHT (e.g. 1280x720)".to_string())?;
    let width = w
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("invalid width in '{trimmed}'"))?;
    let height = h
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("invalid height in '{trimmed}'"))?;
    if width == 0 || height == 0 {
        return Err("window dimensions must be greater than zero".to_string());
    }
    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_surface_size() {
        assert_eq!(parse_surface_size("1280x720").unwrap(), (1280, 720));
        assert_eq!(parse_surface_size(" 640X480 ").unwrap(), (640, 480));
    }

    #[test]
    fn rejects_malformed_sizes() {
        assert!(parse_surface_size("1280").is_err());
        assert!(parse_surface_size("axb").is_err());
        assert!(parse_surface_size("0x720").is_err());
    }
}
