use crate::domain::model::{BatchReport, BoundRecord, Progress, RenderResult};
use crate::domain::ports::{CertificateRenderer, ProgressObserver};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared flag for abandoning a batch between records.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// 依序渲染每一筆記錄，單筆失敗不影響其他記錄
pub struct BatchOrchestrator<R: CertificateRenderer> {
    renderer: R,
    cancel: CancellationFlag,
}

impl<R: CertificateRenderer> BatchOrchestrator<R> {
    pub fn new(renderer: R) -> Self {
        Self {
            renderer,
            cancel: CancellationFlag::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation(&self) -> &CancellationFlag {
        &self.cancel
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub async fn run(
        &self,
        records: Vec<BoundRecord>,
        template_id: &str,
        observer: &dyn ProgressObserver,
    ) -> BatchReport {
        let total = records.len();
        let mut results = Vec::with_capacity(total);
        let mut cancelled = false;

        tracing::info!("🖨️ Rendering {} certificates with template '{}'", total, template_id);

        for record in records {
            if self.cancel.is_cancelled() {
                tracing::warn!(
                    "🛑 Batch cancelled after {} of {} records",
                    results.len(),
                    total
                );
                cancelled = true;
                break;
            }

            let BoundRecord {
                id,
                display_name,
                parameters,
                ..
            } = record;

            let result = match self.renderer.render(template_id, &parameters).await {
                Ok(image) => {
                    tracing::debug!("✅ Rendered record {} ({} bytes)", id, image.len());
                    RenderResult::Success {
                        id,
                        display_name,
                        image,
                    }
                }
                Err(reason) => {
                    tracing::warn!("❌ Record {} ({}) failed: {}", id, display_name, reason);
                    RenderResult::Failure {
                        id,
                        display_name,
                        reason,
                    }
                }
            };

            results.push(result);
            observer.on_progress(&Progress {
                completed: results.len(),
                total,
                current_display_name: results
                    .last()
                    .map(|r| r.display_name().to_string())
                    .unwrap_or_default(),
            });
        }

        let report = BatchReport::new(template_id, total, results, cancelled);
        tracing::info!(
            "📊 Batch finished: {} succeeded, {} failed, {} skipped",
            report.succeeded,
            report.failed,
            report.skipped
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{ChannelObserver, NoopObserver};
    use crate::templates::Parameters;
    use crate::utils::error::RenderError;
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    /// Fails for any record whose name is listed; tracks overlapping calls.
    struct ScriptedRenderer {
        fail_names: Vec<&'static str>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedRenderer {
        fn failing(fail_names: Vec<&'static str>) -> Self {
            Self {
                fail_names,
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CertificateRenderer for ScriptedRenderer {
        async fn render(
            &self,
            _template_id: &str,
            parameters: &Parameters,
        ) -> Result<Vec<u8>, RenderError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            let name = parameters.get("achieverName").cloned().unwrap_or_default();
            self.calls.lock().unwrap().push(name.clone());
            tokio::task::yield_now().await;

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            if self.fail_names.contains(&name.as_str()) {
                Err(RenderError::LoadFailed("scripted failure".to_string()))
            } else {
                Ok(name.into_bytes())
            }
        }
    }

    fn records(names: &[&str]) -> Vec<BoundRecord> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| BoundRecord {
                id: i + 1,
                display_name: name.to_string(),
                parameters: BTreeMap::from([("achieverName".to_string(), name.to_string())]),
                warnings: vec![],
            })
            .collect()
    }

    #[tokio::test]
    async fn failure_in_the_middle_does_not_stop_the_batch() {
        let orchestrator = BatchOrchestrator::new(ScriptedRenderer::failing(vec!["Grace"]));
        let report = orchestrator
            .run(records(&["Ada", "Grace", "Alan"]), "educate4pt0", &NoopObserver)
            .await;

        assert_eq!(report.total, 3);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, 1);
        assert!(report.results[0].is_success());
        assert!(!report.results[1].is_success());
        assert!(report.results[2].is_success());
        assert_eq!(
            report.results.iter().map(|r| r.id()).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[tokio::test]
    async fn renders_sequentially_in_input_order() {
        let orchestrator = BatchOrchestrator::new(ScriptedRenderer::failing(vec![]));
        orchestrator
            .run(records(&["c", "a", "b"]), "educate4pt0", &NoopObserver)
            .await;

        let renderer = orchestrator.renderer();
        assert_eq!(renderer.max_in_flight.load(Ordering::SeqCst), 1);
        assert_eq!(*renderer.calls.lock().unwrap(), vec!["c", "a", "b"]);
    }

    #[tokio::test]
    async fn progress_is_reported_after_each_record() {
        let orchestrator = BatchOrchestrator::new(ScriptedRenderer::failing(vec!["Grace"]));
        let (observer, mut rx) = ChannelObserver::channel();

        orchestrator
            .run(records(&["Ada", "Grace"]), "educate4pt0", &observer)
            .await;

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!((first.completed, first.total), (1, 2));
        assert_eq!(first.current_display_name, "Ada");
        assert_eq!((second.completed, second.current_display_name.as_str()), (2, "Grace"));
    }

    #[tokio::test]
    async fn cancellation_stops_between_records() {
        let orchestrator = BatchOrchestrator::new(ScriptedRenderer::failing(vec![]));
        let cancel = orchestrator.cancellation().clone();
        let observer = move |p: &Progress| {
            if p.completed == 1 {
                cancel.cancel();
            }
        };

        let report = orchestrator
            .run(records(&["Ada", "Grace", "Alan"]), "educate4pt0", &observer)
            .await;

        assert!(report.cancelled);
        assert_eq!(report.results.len(), 1);
        assert_eq!(report.skipped, 2);
    }
}
