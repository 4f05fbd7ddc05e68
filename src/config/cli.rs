use crate::config::toml_config::TomlConfig;
use crate::config::GeneratorSettings;
use crate::utils::error::Result;
use crate::utils::validation::parse_hex_color;
use clap::{Args, Parser, Subcommand};
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(name = "certgen")]
#[command(about = "Bulk certificate generation from CSV recipient lists")]
pub struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Log CPU and memory usage per phase
    #[arg(long, global = true)]
    pub monitor: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Render every row of a CSV file and package the images into a ZIP archive
    Generate(GenerateArgs),
    /// Render a single certificate from key=value parameters
    Render(RenderArgs),
    /// Write the CSV skeleton for a template
    CsvTemplate(CsvTemplateArgs),
    /// List available templates and their parameters
    Templates,
    /// Print shareable certificate links for one parameter set or a CSV file
    Links(LinksArgs),
}

#[derive(Debug, Args)]
pub struct RenderOverrides {
    /// Template identifier (unknown ids fall back to the default template)
    #[arg(short, long)]
    pub template: Option<String>,

    /// Directory the output is written to
    #[arg(short, long)]
    pub output_dir: Option<String>,

    /// Supersampling factor
    #[arg(long)]
    pub scale: Option<f32>,

    /// Wait after the document loads before capturing
    #[arg(long)]
    pub settle_delay_ms: Option<u64>,

    /// Upper bound on settle delay plus capture, per certificate
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Opaque background color, e.g. #ffffff
    #[arg(long)]
    pub background: Option<String>,
}

impl RenderOverrides {
    pub fn apply(&self, settings: &mut GeneratorSettings) -> Result<()> {
        if let Some(template) = &self.template {
            settings.template_id = template.clone();
        }
        if let Some(dir) = &self.output_dir {
            settings.output_path = dir.clone();
        }
        if let Some(scale) = self.scale {
            settings.scale = scale;
        }
        if let Some(ms) = self.settle_delay_ms {
            settings.settle_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = self.timeout_ms {
            settings.render_timeout = Duration::from_millis(ms);
        }
        if let Some(color) = &self.background {
            settings.background = parse_hex_color("--background", color)?;
        }
        Ok(())
    }
}

#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// CSV file with a header row and one recipient per line
    pub input: String,

    #[command(flatten)]
    pub render: RenderOverrides,

    /// Write the batch report as JSON to this path
    #[arg(long)]
    pub report: Option<String>,
}

#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Template parameter, repeatable: -p achieverName="Ada Lovelace"
    #[arg(short = 'p', long = "param", value_parser = parse_key_value)]
    pub params: Vec<(String, String)>,

    #[command(flatten)]
    pub render: RenderOverrides,
}

#[derive(Debug, Args)]
pub struct CsvTemplateArgs {
    #[arg(short, long)]
    pub template: Option<String>,

    /// Output file; prints to stdout when omitted
    #[arg(short, long)]
    pub output: Option<String>,
}

#[derive(Debug, Args)]
pub struct LinksArgs {
    /// CSV file; one link per row
    pub input: Option<String>,

    /// Template parameter for a single link, repeatable
    #[arg(short = 'p', long = "param", value_parser = parse_key_value)]
    pub params: Vec<(String, String)>,

    #[arg(short, long)]
    pub template: Option<String>,

    /// Site serving the certificate page
    #[arg(long)]
    pub base_url: Option<String>,
}

pub fn parse_key_value(s: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", s))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing key in '{}'", s));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

impl Cli {
    /// Defaults, then the config file, then global flags.
    pub fn base_settings(&self) -> Result<GeneratorSettings> {
        let mut settings = match &self.config {
            Some(path) => TomlConfig::from_file(path)?.to_settings()?,
            None => GeneratorSettings::default(),
        };
        if self.monitor {
            settings.monitor = true;
        }
        Ok(settings)
    }
}
