use crate::domain::model::Progress;
use crate::templates::Parameters;
use crate::utils::error::{RenderError, Result};
use async_trait::async_trait;
use std::time::Duration;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<String>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn output_path(&self) -> &str;
    fn scale(&self) -> f32;
    fn settle_delay(&self) -> Duration;
    fn render_timeout(&self) -> Duration;
    fn background(&self) -> [u8; 3];
}

/// Produces one PNG per call. Implementations must release every resource
/// they allocate before returning.
#[async_trait]
pub trait CertificateRenderer: Send + Sync {
    async fn render(
        &self,
        template_id: &str,
        parameters: &Parameters,
    ) -> std::result::Result<Vec<u8>, RenderError>;
}

/// 進度通知，每完成一筆記錄呼叫一次，不得阻塞批次
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, progress: &Progress);
}

impl<F> ProgressObserver for F
where
    F: Fn(&Progress) + Send + Sync,
{
    fn on_progress(&self, progress: &Progress) {
        self(progress)
    }
}

/// Forwards progress into an unbounded channel, for callers that prefer a stream.
pub struct ChannelObserver {
    sender: tokio::sync::mpsc::UnboundedSender<Progress>,
}

impl ChannelObserver {
    pub fn channel() -> (Self, tokio::sync::mpsc::UnboundedReceiver<Progress>) {
        let (sender, receiver) = tokio::sync::mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl ProgressObserver for ChannelObserver {
    fn on_progress(&self, progress: &Progress) {
        // 接收端關閉時直接丟棄
        let _ = self.sender.send(progress.clone());
    }
}

pub struct NoopObserver;

impl ProgressObserver for NoopObserver {
    fn on_progress(&self, _progress: &Progress) {}
}
