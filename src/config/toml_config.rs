use crate::config::GeneratorSettings;
use crate::utils::error::{CertError, Result};
use crate::utils::validation::{parse_hex_color, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub generator: GeneratorSection,
    pub render: RenderSection,
    pub output: OutputSection,
    pub links: LinksSection,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorSection {
    pub name: Option<String>,
    pub template: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSection {
    pub scale: Option<f32>,
    pub settle_delay_ms: Option<u64>,
    pub timeout_ms: Option<u64>,
    pub background: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    pub path: Option<String>,
    pub report: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LinksSection {
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(CertError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| CertError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${CERTGEN_OUTPUT})
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| {
            CertError::ConfigValidationError {
                field: "toml_parsing".to_string(),
                message: e.to_string(),
            }
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// Layers file values over the built-in defaults.
    pub fn to_settings(&self) -> Result<GeneratorSettings> {
        let mut settings = GeneratorSettings::default();

        settings.batch_name = self.generator.name.clone();
        if let Some(template) = &self.generator.template {
            settings.template_id = template.clone();
        }
        if let Some(scale) = self.render.scale {
            settings.scale = scale;
        }
        if let Some(ms) = self.render.settle_delay_ms {
            settings.settle_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = self.render.timeout_ms {
            settings.render_timeout = Duration::from_millis(ms);
        }
        if let Some(color) = &self.render.background {
            settings.background = parse_hex_color("render.background", color)?;
        }
        if let Some(path) = &self.output.path {
            settings.output_path = path.clone();
        }
        if let Some(report) = &self.output.report {
            settings.report_path = Some(report.clone());
        }
        if let Some(base_url) = &self.links.base_url {
            settings.link_base_url = base_url.clone();
        }
        settings.monitor = self.monitoring_enabled();

        Ok(settings)
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.to_settings()?.validate()
    }
}
