use anyhow::{Context, Result};
use renderer::RendererConfig;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::settings::Settings;

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

pub fn run(cli: Cli) -> Result<()> {
    let settings = match cli.settings.as_deref() {
        Some(path) => Settings::load(path)
            .with_context(|| format!("failed to load settings from {}", path.display()))?,
        None => Settings::default(),
    };

    let config = build_config(&cli, &settings);
    tracing::info!(
        surface = format!("{}x{}", config.surface_size.0, config.surface_size.1),
        grid = format!("{}x{}", config.grid_size.0, config.grid_size.1),
        density = config.seed_fraction,
        vsync = config.vsync,
        "starting simulation"
    );

    renderer::run(config).context("renderer terminated with an error")
}

/// File settings form the base; explicit CLI flags win.
fn build_config(cli: &Cli, settings: &Settings) -> RendererConfig {
    let mut controls = settings.initial_controls();
    controls.paused = cli.paused;

    let fps = match cli.fps {
        Some(fps) if fps > 0.0 => Some(fps),
        Some(_) => None,
        None => settings.window.fps,
    };

    let grid_size = cli
        .grid
        .unwrap_or((settings.simulation.grid_width, settings.simulation.grid_height));
    let seed_fraction = match (cli.density, cli.agents) {
        (Some(density), _) => density,
        (None, Some(agents)) => {
            let cells = (grid_size.0 as u64 * grid_size.1 as u64).max(1) as f32;
            (agents as f32 / cells).min(1.0)
        }
        (None, None) => settings.simulation.density,
    };

    RendererConfig {
        window_title: settings.window.title.clone(),
        surface_size: cli
            .size
            .unwrap_or((settings.window.width, settings.window.height)),
        grid_size,
        seed_fraction,
        initial_controls: controls,
        vsync: settings.window.vsync && !cli.no_vsync,
        target_fps: fps,
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn cli_flags_override_file_settings() {
        let cli = Cli::parse_from(["myxo", "--size", "800x600", "--density", "0.4", "--no-vsync"]);
        let settings = Settings::from_toml_str(
            "[window]\nwidth = 1920\nheight = 1080\n[simulation]\ndensity = 0.1\n",
        )
        .unwrap();

        let config = build_config(&cli, &settings);
        assert_eq!(config.surface_size, (800, 600));
        assert_eq!(config.seed_fraction, 0.4);
        assert!(!config.vsync);
    }

    #[test]
    fn file_settings_apply_when_no_flags_given() {
        let cli = Cli::parse_from(["myxo"]);
        let settings = Settings::from_toml_str(
            "[window]\nwidth = 1024\nheight = 768\nfps = 30.0\n[simulation]\ngrid_width = 64\ngrid_height = 64\n",
        )
        .unwrap();

        let config = build_config(&cli, &settings);
        assert_eq!(config.surface_size, (1024, 768));
        assert_eq!(config.grid_size, (64, 64));
        assert_eq!(config.target_fps, Some(30.0));
        assert!(config.vsync);
        assert!(!config.initial_controls.paused);
    }

    #[test]
    fn agent_count_converts_to_a_fraction_of_the_grid() {
        let cli = Cli::parse_from(["myxo", "--grid", "100x100", "--agents", "2500"]);
        let config = build_config(&cli, &Settings::default());
        assert_eq!(config.seed_fraction, 0.25);

        let cli = Cli::parse_from(["myxo", "--grid", "10x10", "--agents", "500"]);
        let config = build_config(&cli, &Settings::default());
        assert_eq!(config.seed_fraction, 1.0);

        // Cell count may exceed u32 as a product of two valid dimensions.
        let cli = Cli::parse_from(["myxo", "--grid", "65536x65537", "--agents", "1000"]);
        let config = build_config(&cli, &Settings::default());
        assert!(config.seed_fraction > 0.0 && config.seed_fraction < 1e-5);
    }

    #[test]
    fn zero_fps_means_uncapped() {
        let cli = Cli::parse_from(["myxo", "--fps", "0"]);
        let config = build_config(&cli, &Settings::default());
        assert_eq!(config.target_fps, None);
    }

    #[test]
    fn paused_flag_reaches_initial_controls() {
        let cli = Cli::parse_from(["myxo", "--paused"]);
        let config = build_config(&cli, &Settings::default());
        assert!(config.initial_controls.paused);
    }
}
