pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod templates;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::Cli;

pub use adapters::LocalStorage;
pub use config::GeneratorSettings;
pub use core::{
    batch::{BatchOrchestrator, CancellationFlag},
    engine::CertificateEngine,
    renderer::{RenderSettings, SurfaceRenderer},
};
pub use templates::{TemplateRegistry, DEFAULT_TEMPLATE_ID};
pub use utils::error::{CertError, Result};
