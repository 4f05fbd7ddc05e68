#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

use crate::core::renderer::{DEFAULT_BACKGROUND, DEFAULT_SCALE, DEFAULT_TIMEOUT};
use crate::domain::ports::ConfigProvider;
use crate::templates::DEFAULT_TEMPLATE_ID;
use crate::utils::error::{CertError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_positive_number, validate_range,
    validate_url, Validate,
};
use std::time::Duration;

pub const DEFAULT_LINK_BASE_URL: &str = "https://educate4pt0.org";

/// Settings after layering defaults, the TOML file and command-line flags.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorSettings {
    /// Label for the batch in logs, from `[generator] name`.
    pub batch_name: Option<String>,
    pub template_id: String,
    pub output_path: String,
    pub report_path: Option<String>,
    pub scale: f32,
    pub settle_delay: Duration,
    pub render_timeout: Duration,
    pub background: [u8; 3],
    pub link_base_url: String,
    pub monitor: bool,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            batch_name: None,
            template_id: DEFAULT_TEMPLATE_ID.to_string(),
            output_path: "./output".to_string(),
            report_path: None,
            scale: DEFAULT_SCALE,
            settle_delay: Duration::ZERO,
            render_timeout: DEFAULT_TIMEOUT,
            background: DEFAULT_BACKGROUND,
            link_base_url: DEFAULT_LINK_BASE_URL.to_string(),
            monitor: false,
        }
    }
}

impl ConfigProvider for GeneratorSettings {
    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn scale(&self) -> f32 {
        self.scale
    }

    fn settle_delay(&self) -> Duration {
        self.settle_delay
    }

    fn render_timeout(&self) -> Duration {
        self.render_timeout
    }

    fn background(&self) -> [u8; 3] {
        self.background
    }
}

impl Validate for GeneratorSettings {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("generator.template", &self.template_id)?;
        validate_path("output.path", &self.output_path)?;
        if let Some(report) = &self.report_path {
            validate_path("output.report", report)?;
        }
        validate_range("render.scale", self.scale, 0.25, 8.0)?;
        validate_url("links.base_url", &self.link_base_url)?;

        validate_positive_number("render.timeout_ms", self.render_timeout.as_millis() as u64, 1)?;

        // 等待時間也計入逾時
        if self.settle_delay >= self.render_timeout {
            return Err(CertError::ConfigValidationError {
                field: "render.settle_delay_ms".to_string(),
                message: format!(
                    "settle delay {:?} must be shorter than the render timeout {:?}",
                    self.settle_delay, self.render_timeout
                ),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let settings = GeneratorSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.scale(), 2.0);
        assert_eq!(settings.background(), [255, 255, 255]);
    }

    #[test]
    fn out_of_range_scale_is_rejected() {
        let settings = GeneratorSettings {
            scale: 20.0,
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let settings = GeneratorSettings {
            render_timeout: Duration::ZERO,
            ..Default::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(CertError::InvalidConfigValueError { field, .. }) if field == "render.timeout_ms"
        ));
    }
}
