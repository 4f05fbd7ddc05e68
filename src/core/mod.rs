pub mod archive;
pub mod batch;
pub mod engine;
pub mod links;
pub mod parser;
pub mod renderer;

pub use crate::domain::model::{Archive, BatchOutcome, BatchReport, BoundRecord, Progress, RenderResult};
pub use crate::domain::ports::{CertificateRenderer, ConfigProvider, ProgressObserver, Storage};
pub use crate::utils::error::Result;
