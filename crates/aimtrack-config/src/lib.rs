mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const APP_DIR: &str = "aimtrack";
const CONFIG_FILE: &str = "config.toml";

/// Returns the per-user config directory, creating it if needed.
pub fn config_dir() -> Result<PathBuf> {
    let dir = dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
        .join(APP_DIR);
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Returns the default config file path: `<config dir>/aimtrack/config.toml`.
pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE))
}

/// Load config from the default location, or return defaults if there is none.
pub fn load_config() -> Result<AppConfig> {
    load_config_from(&config_path()?)
}

/// Load config from an explicit path. A missing file yields defaults.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        info!(?path, "No config found, using defaults");
        return Ok(AppConfig::default());
    }

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let mut config: AppConfig =
        toml::from_str(&contents).with_context(|| format!("parsing {}", path.display()))?;
    config.sanitize();
    info!(?path, "Loaded config");
    Ok(config)
}

/// Save config to the default location.
pub fn save_config(config: &AppConfig) -> Result<()> {
    save_config_to(config, &config_path()?)
}

/// Save config to an explicit path.
pub fn save_config_to(config: &AppConfig, path: &Path) -> Result<()> {
    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents).with_context(|| format!("writing {}", path.display()))?;
    info!(?path, "Saved config");
    Ok(())
}

impl AppConfig {
    /// Pull slider-backed values back inside their bounds.
    ///
    /// Hand-edited files may carry values the sliders could never produce.
    pub fn sanitize(&mut self) {
        let defaults = AppConfig::default();
        repair_range(
            &mut self.orientation.sensitivity_range,
            defaults.orientation.sensitivity_range,
            "sensitivity_range",
        );
        repair_range(
            &mut self.orientation.stability_sensitivity_range,
            defaults.orientation.stability_sensitivity_range,
            "stability_sensitivity_range",
        );
        repair_range(
            &mut self.board.square_size_range,
            defaults.board.square_size_range,
            "square_size_range",
        );

        let o = &mut self.orientation;
        let sensitivity = o.sensitivity_range.clamp(o.sensitivity);
        let stability = o.stability_sensitivity_range.clamp(o.stability_sensitivity);
        if sensitivity != o.sensitivity || stability != o.stability_sensitivity {
            warn!(
                sensitivity = o.sensitivity,
                stability_sensitivity = o.stability_sensitivity,
                "Sensitivity out of range, clamped"
            );
        }
        o.sensitivity = sensitivity;
        o.stability_sensitivity = stability;

        let b = &mut self.board;
        b.square_size = b.square_size_range.clamp(b.square_size);
        b.trail_length = b.trail_length.max(2);

        let v = &mut self.view;
        if v.frame_rate_hz == 0 {
            v.frame_rate_hz = defaults.view.frame_rate_hz;
        }
        if !(v.zoom_step > 0.0 && v.zoom_step < 1.0) {
            warn!(zoom_step = v.zoom_step, "Zoom step outside (0, 1), using default");
            v.zoom_step = defaults.view.zoom_step;
        }
        if !(v.hit_radius.is_finite() && v.hit_radius > 0.0) {
            warn!(hit_radius = v.hit_radius, "Invalid hit radius, using default");
            v.hit_radius = defaults.view.hit_radius;
        }
        if self.feed.send_interval_ms == 0 {
            self.feed.send_interval_ms = defaults.feed.send_interval_ms;
        }
    }
}

fn repair_range(range: &mut SliderRange, default: SliderRange, name: &str) {
    if !range.is_valid() {
        warn!(name, min = range.min, max = range.max, "Invalid slider range, using default");
        *range = default;
    }
}
