use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "myxo",
    author,
    version,
    about = "GPU-resident slime mold simulation",
    arg_required_else_help = false
)]
pub struct Cli {
    /// Window size (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size)]
    pub size: Option<(u32, u32)>,

    /// Agent grid size (e.g. `256x256`); one potential agent per cell.
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size)]
    pub grid: Option<(u32, u32)>,

    /// Fraction of grid cells seeded with a live agent (0.0-1.0).
    #[arg(long, value_name = "FRACTION", conflicts_with = "agents")]
    pub density: Option<f32>,

    /// Exact number of live agents to seed instead of a fraction.
    #[arg(long, value_name = "COUNT")]
    pub agents: Option<u32>,

    /// Cap the frame rate instead of following vsync (0=uncapped).
    #[arg(long, value_name = "FPS")]
    pub fps: Option<f32>,

    /// Start with the simulation paused (space resumes).
    #[arg(long)]
    pub paused: bool,

    /// Disable vsync and present as fast as the surface allows.
    #[arg(long)]
    pub no_vsync: bool,

    /// Settings file overriding the built-in defaults.
    #[arg(long, value_name = "FILE", env = "MYXO_SETTINGS")]
    pub settings: Option<PathBuf>,
}

pub fn parse() -> Cli {
    Cli::parse()
}

fn parse_size(spec: &str) -> Result<(u32, u32), String> {
    let trimmed = spec.trim();
    let (width, height) = trimmed
        .split_once(['x', 'X'])
        .ok_or_else(|| "expected WxH format, e.g. 1280x720".to_string())?;

    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| "invalid width in size specification".to_string())?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| "invalid height in size specification".to_string())?;

    if width == 0 || height == 0 {
        return Err("dimensions must be greater than zero".to_string());
    }

    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_parses_both_separators() {
        assert_eq!(parse_size("1280x720"), Ok((1280, 720)));
        assert_eq!(parse_size(" 640X480 "), Ok((640, 480)));
    }

    #[test]
    fn size_rejects_garbage() {
        assert!(parse_size("1280").is_err());
        assert!(parse_size("0x720").is_err());
        assert!(parse_size("axb").is_err());
    }

    #[test]
    fn cli_accepts_typical_invocation() {
        let cli = Cli::parse_from([
            "myxo",
            "--size",
            "800x600",
            "--grid",
            "128x128",
            "--density",
            "0.5",
            "--paused",
            "--no-vsync",
        ]);
        assert_eq!(cli.size, Some((800, 600)));
        assert_eq!(cli.grid, Some((128, 128)));
        assert_eq!(cli.density, Some(0.5));
        assert!(cli.paused);
        assert!(cli.no_vsync);
    }
}
