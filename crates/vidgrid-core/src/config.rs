//! Engine configuration.
//!
//! Built programmatically (`EngineConfig::default().with_max_active(12)`),
//! from JSON, or from `VIDGRID_*` environment variables. Every path ends in
//! [`EngineConfig::validate`]; an invalid config is rejected before it
//! reaches a running engine.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::viewport::DEFAULT_VISIBLE_ROW_ESTIMATE;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Hard cap on concurrently live decoders. Zero admits nothing.
    pub max_active_resources: usize,
    /// Scroll-ahead rows on each side of the viewport.
    pub buffer_rows: usize,
    /// Width of the looped preview for long items.
    pub preview_window_seconds: f64,
    /// Items longer than this loop a preview window instead of playing through.
    pub long_item_threshold_seconds: f64,
    /// Automatic retries after the first failed load.
    pub retry_attempts: u32,
    pub retry_base_delay_ms: u64,
    pub sweep_interval_ms: u64,
    /// Soft cap on cached thumbnails.
    pub thumbnail_capacity: usize,
    /// Rows assumed visible before the host reports a layout.
    pub initial_visible_rows: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_active_resources: 30,
            buffer_rows: 2,
            preview_window_seconds: 5.0,
            long_item_threshold_seconds: 30.0,
            retry_attempts: 3,
            retry_base_delay_ms: 500,
            sweep_interval_ms: 2_000,
            thumbnail_capacity: 512,
            initial_visible_rows: DEFAULT_VISIBLE_ROW_ESTIMATE,
        }
    }
}

impl EngineConfig {
    pub fn with_max_active(mut self, n: usize) -> Self {
        self.max_active_resources = n;
        self
    }

    pub fn with_buffer_rows(mut self, rows: usize) -> Self {
        self.buffer_rows = rows;
        self
    }

    pub fn with_preview_window(mut self, seconds: f64) -> Self {
        self.preview_window_seconds = seconds;
        self
    }

    pub fn with_long_item_threshold(mut self, seconds: f64) -> Self {
        self.long_item_threshold_seconds = seconds;
        self
    }

    pub fn with_retry(mut self, attempts: u32, base_delay_ms: u64) -> Self {
        self.retry_attempts = attempts;
        self.retry_base_delay_ms = base_delay_ms;
        self
    }

    pub fn with_sweep_interval_ms(mut self, ms: u64) -> Self {
        self.sweep_interval_ms = ms;
        self
    }

    pub fn with_thumbnail_capacity(mut self, n: usize) -> Self {
        self.thumbnail_capacity = n;
        self
    }

    pub fn with_initial_visible_rows(mut self, rows: usize) -> Self {
        self.initial_visible_rows = rows;
        self
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let w = self.preview_window_seconds;
        if !w.is_finite() || w <= 0.0 {
            return Err(ConfigError::invalid(
                "preview_window_seconds",
                format!("must be a positive number of seconds, got {w}"),
            ));
        }
        let t = self.long_item_threshold_seconds;
        if !t.is_finite() || t < 0.0 {
            return Err(ConfigError::invalid(
                "long_item_threshold_seconds",
                format!("must be zero or more seconds, got {t}"),
            ));
        }
        if self.sweep_interval_ms == 0 {
            return Err(ConfigError::invalid("sweep_interval_ms", "must be at least 1 ms"));
        }
        if self.initial_visible_rows == 0 {
            return Err(ConfigError::invalid("initial_visible_rows", "must be at least 1"));
        }
        Ok(())
    }

    /// Parses and validates a JSON document. Missing fields take defaults;
    /// a negative `max_active_resources` fails to parse.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads overrides from environment variables on top of the defaults.
    ///
    /// - `VIDGRID_MAX_ACTIVE`
    /// - `VIDGRID_BUFFER_ROWS`
    /// - `VIDGRID_PREVIEW_WINDOW_SECS`
    /// - `VIDGRID_LONG_ITEM_SECS`
    /// - `VIDGRID_RETRY_ATTEMPTS`
    /// - `VIDGRID_RETRY_BASE_MS`
    /// - `VIDGRID_SWEEP_INTERVAL_MS`
    /// - `VIDGRID_THUMBNAIL_CAPACITY`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut c = Self::default();
        read_var(&lookup, "VIDGRID_MAX_ACTIVE", &mut c.max_active_resources)?;
        read_var(&lookup, "VIDGRID_BUFFER_ROWS", &mut c.buffer_rows)?;
        read_var(&lookup, "VIDGRID_PREVIEW_WINDOW_SECS", &mut c.preview_window_seconds)?;
        read_var(&lookup, "VIDGRID_LONG_ITEM_SECS", &mut c.long_item_threshold_seconds)?;
        read_var(&lookup, "VIDGRID_RETRY_ATTEMPTS", &mut c.retry_attempts)?;
        read_var(&lookup, "VIDGRID_RETRY_BASE_MS", &mut c.retry_base_delay_ms)?;
        read_var(&lookup, "VIDGRID_SWEEP_INTERVAL_MS", &mut c.sweep_interval_ms)?;
        read_var(&lookup, "VIDGRID_THUMBNAIL_CAPACITY", &mut c.thumbnail_capacity)?;
        c.validate()?;
        Ok(c)
    }
}

fn read_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    slot: &mut T,
) -> Result<(), ConfigError> {
    if let Some(value) = lookup(var) {
        let parsed: Result<T, _> = value.trim().parse();
        *slot = parsed.map_err(|_| ConfigError::Env { var, value })?;
    }
    Ok(())
}
