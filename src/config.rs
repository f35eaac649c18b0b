//! Host configuration parsed from environment variables.
//!
//! Every value falls back to its default when unset or unparseable. The zoom
//! range is the only cross-field constraint and is checked after parsing.

use std::str::FromStr;
use std::time::Duration;

use canvas::camera::ZoomLimits;
use canvas::config::EngineConfig;
use tracing::info;

use crate::error::HostError;

pub const DEFAULT_CAMERA_SAVE_DEBOUNCE_MS: u64 = 1000;
pub const DEFAULT_PERSIST_QUEUE_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HostConfig {
    pub engine: EngineConfig,
    /// Quiet window before a camera change is written.
    pub camera_save_debounce_ms: u64,
    /// Bound of the item persistence queue.
    pub persist_queue_capacity: usize,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            camera_save_debounce_ms: DEFAULT_CAMERA_SAVE_DEBOUNCE_MS,
            persist_queue_capacity: DEFAULT_PERSIST_QUEUE_CAPACITY,
        }
    }
}

impl HostConfig {
    /// Build config from environment variables.
    ///
    /// Optional:
    /// - `ARTBOARD_MIN_ZOOM` / `ARTBOARD_MAX_ZOOM`: default 0.25 / 3.0
    /// - `ARTBOARD_CULL_PADDING`: world units, default 200
    /// - `ARTBOARD_HISTORY_LIMIT`: default 50
    /// - `ARTBOARD_WHEEL_ZOOM_STEP`: default 1.05
    /// - `ARTBOARD_MIN_DRAW_SIZE`: default 4
    /// - `CAMERA_SAVE_DEBOUNCE_MS`: default 1000
    /// - `PERSIST_QUEUE_CAPACITY`: default 256
    ///
    /// # Errors
    ///
    /// Returns `HostError::Config` when the zoom range or wheel step is unusable.
    pub fn from_env() -> Result<Self, HostError> {
        let defaults = EngineConfig::default();
        let zoom = ZoomLimits {
            min: env_parse("ARTBOARD_MIN_ZOOM", defaults.zoom.min),
            max: env_parse("ARTBOARD_MAX_ZOOM", defaults.zoom.max),
        };
        validate_zoom(zoom)?;

        let wheel_zoom_step = env_parse("ARTBOARD_WHEEL_ZOOM_STEP", defaults.wheel_zoom_step);
        if !wheel_zoom_step.is_finite() || wheel_zoom_step <= 1.0 {
            return Err(HostError::Config(format!("ARTBOARD_WHEEL_ZOOM_STEP must be > 1, got {wheel_zoom_step}")));
        }

        let engine = EngineConfig {
            zoom,
            cull_padding: env_parse("ARTBOARD_CULL_PADDING", defaults.cull_padding).max(0.0),
            history_limit: env_parse("ARTBOARD_HISTORY_LIMIT", defaults.history_limit).max(1),
            wheel_zoom_step,
            min_draw_size: env_parse("ARTBOARD_MIN_DRAW_SIZE", defaults.min_draw_size).max(0.0),
        };
        let config = Self {
            engine,
            camera_save_debounce_ms: env_parse("CAMERA_SAVE_DEBOUNCE_MS", DEFAULT_CAMERA_SAVE_DEBOUNCE_MS),
            persist_queue_capacity: env_parse("PERSIST_QUEUE_CAPACITY", DEFAULT_PERSIST_QUEUE_CAPACITY).max(1),
        };

        info!(
            min_zoom = config.engine.zoom.min,
            max_zoom = config.engine.zoom.max,
            cull_padding = config.engine.cull_padding,
            history_limit = config.engine.history_limit,
            camera_save_debounce_ms = config.camera_save_debounce_ms,
            persist_queue_capacity = config.persist_queue_capacity,
            "host config loaded"
        );
        Ok(config)
    }

    #[must_use]
    pub fn camera_save_debounce(&self) -> Duration {
        Duration::from_millis(self.camera_save_debounce_ms)
    }
}

fn validate_zoom(zoom: ZoomLimits) -> Result<(), HostError> {
    if !zoom.min.is_finite() || !zoom.max.is_finite() || zoom.min <= 0.0 || zoom.min > zoom.max {
        return Err(HostError::Config(format!("zoom range [{}, {}] is invalid", zoom.min, zoom.max)));
    }
    Ok(())
}

pub(crate) fn env_parse<T: FromStr + Copy>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
