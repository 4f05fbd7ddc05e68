use crate::core::archive::{self, entry_name};
use crate::core::batch::{BatchOrchestrator, CancellationFlag};
use crate::core::parser;
use crate::domain::model::BatchOutcome;
use crate::domain::ports::{CertificateRenderer, ProgressObserver, Storage};
use crate::templates::{Parameters, TemplateRegistry};
use crate::utils::error::{CertError, Result};
use crate::utils::monitor::SystemMonitor;
use std::sync::Arc;

/// 整個批次流程：解析 → 渲染 → 打包 → 寫出
pub struct CertificateEngine<S: Storage, R: CertificateRenderer> {
    storage: S,
    orchestrator: BatchOrchestrator<R>,
    registry: Arc<TemplateRegistry>,
    monitor: SystemMonitor,
}

impl<S: Storage, R: CertificateRenderer> CertificateEngine<S, R> {
    pub fn new(storage: S, renderer: R, registry: Arc<TemplateRegistry>) -> Self {
        Self::new_with_monitoring(storage, renderer, registry, false)
    }

    pub fn new_with_monitoring(
        storage: S,
        renderer: R,
        registry: Arc<TemplateRegistry>,
        monitor_enabled: bool,
    ) -> Self {
        Self {
            storage,
            orchestrator: BatchOrchestrator::new(renderer),
            registry,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationFlag) -> Self {
        self.orchestrator = self.orchestrator.with_cancellation(cancel);
        self
    }

    pub fn cancellation(&self) -> &CancellationFlag {
        self.orchestrator.cancellation()
    }

    pub fn renderer(&self) -> &R {
        self.orchestrator.renderer()
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Runs one batch. Parse and packaging errors abort; render errors are
    /// recorded in the report. No archive is written when nothing succeeded.
    pub async fn run(
        &self,
        csv_text: &str,
        template_id: &str,
        observer: &dyn ProgressObserver,
    ) -> Result<BatchOutcome> {
        tracing::info!("🚀 Starting certificate batch");
        self.monitor.log_stats("Start");

        let template = self.registry.resolve(template_id);
        let template_id = template.id().to_string();

        let records = parser::parse(csv_text, template.schema())?;
        self.monitor.log_stats("Parse");

        let report = self.orchestrator.run(records, &template_id, observer).await;
        self.monitor.log_stats("Render");

        if !report.has_successes() {
            tracing::warn!("⚠️ No certificate rendered successfully, skipping archive");
            self.monitor.log_final_stats();
            return Ok(BatchOutcome {
                report,
                archive_path: None,
            });
        }

        let archive = archive::pack(&report.results, &template_id, chrono::Local::now().date_naive())?;
        self.monitor.log_stats("Package");

        let archive_path = self
            .storage
            .write_file(&archive.file_name, &archive.bytes)
            .await?;
        tracing::info!("📁 Archive saved to: {}", archive_path);

        self.monitor.log_final_stats();
        Ok(BatchOutcome {
            report,
            archive_path: Some(archive_path),
        })
    }

    /// Renders one certificate and writes it as `<name>_certificate.png`.
    ///
    /// Required parameters without a default must be present.
    pub async fn render_one(&self, template_id: &str, parameters: &Parameters) -> Result<String> {
        let template = self.registry.resolve(template_id);
        for def in &template.schema().definitions {
            let supplied = parameters.get(&def.key).is_some_and(|v| !v.trim().is_empty());
            if def.required && def.default_value.is_none() && !supplied {
                return Err(CertError::ParameterError {
                    key: def.key.clone(),
                    reason: "required parameter is missing".to_string(),
                });
            }
        }
        for key in parameters.keys() {
            if template.schema().get(key).is_none() {
                tracing::warn!("⚠️ Parameter '{}' is not used by template '{}'", key, template.id());
            }
        }

        let display_name = template
            .schema()
            .identity_key
            .as_deref()
            .and_then(|key| parameters.get(key))
            .filter(|v| !v.trim().is_empty())
            .map(|v| v.trim().to_string())
            .unwrap_or_else(|| "certificate".to_string());

        let image = self
            .orchestrator
            .renderer()
            .render(template.id(), parameters)
            .await?;

        let path = self
            .storage
            .write_file(&entry_name(&display_name), &image)
            .await?;
        tracing::info!("🖼️ Certificate for {} saved to: {}", display_name, path);
        Ok(path)
    }
}
