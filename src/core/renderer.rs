use crate::domain::ports::{CertificateRenderer, ConfigProvider};
use crate::templates::{ParameterSchema, Parameters, TemplateRegistry};
use crate::utils::error::RenderError;
use crate::utils::sanitize::escape_markup;
use async_trait::async_trait;
use resvg::{tiny_skia, usvg};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_SCALE: f32 = 2.0;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_BACKGROUND: [u8; 3] = [255, 255, 255];

#[derive(Debug, Clone, PartialEq)]
pub struct RenderSettings {
    /// Supersampling factor applied to the document's pixel size.
    pub scale: f32,
    /// Extra wait after the document is loaded, before capture.
    pub settle_delay: Duration,
    /// Upper bound on settle delay plus capture.
    pub timeout: Duration,
    pub background: [u8; 3],
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            scale: DEFAULT_SCALE,
            settle_delay: Duration::ZERO,
            timeout: DEFAULT_TIMEOUT,
            background: DEFAULT_BACKGROUND,
        }
    }
}

impl RenderSettings {
    pub fn from_config<C: ConfigProvider>(config: &C) -> Self {
        Self {
            scale: config.scale(),
            settle_delay: config.settle_delay(),
            timeout: config.render_timeout(),
            background: config.background(),
        }
    }
}

/// Counts render surfaces so leaks show up in logs and tests.
#[derive(Debug, Clone, Default)]
pub struct SurfaceTracker {
    live: Arc<AtomicUsize>,
    created: Arc<AtomicUsize>,
}

impl SurfaceTracker {
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

/// 隔離的離屏渲染表面，只屬於單一次 render 呼叫，Drop 時釋放
struct RenderSurface {
    pixmap: tiny_skia::Pixmap,
    document: Option<usvg::Tree>,
    tracker: SurfaceTracker,
}

impl RenderSurface {
    fn create(
        width: u32,
        height: u32,
        scale: f32,
        tracker: &SurfaceTracker,
    ) -> Result<Self, RenderError> {
        let w = (width as f32 * scale).round() as u32;
        let h = (height as f32 * scale).round() as u32;
        let pixmap = tiny_skia::Pixmap::new(w, h).ok_or_else(|| {
            RenderError::LoadFailed(format!("cannot allocate a {}x{} surface", w, h))
        })?;

        tracker.live.fetch_add(1, Ordering::SeqCst);
        tracker.created.fetch_add(1, Ordering::SeqCst);
        tracing::debug!("Created {}x{} render surface", w, h);

        Ok(Self {
            pixmap,
            document: None,
            tracker: tracker.clone(),
        })
    }

    /// Parses the markup into the surface. Returning is the readiness signal.
    fn load(&mut self, markup: &str, options: &usvg::Options<'static>) -> Result<(), RenderError> {
        let tree = usvg::Tree::from_str(markup, options)
            .map_err(|e| RenderError::LoadFailed(e.to_string()))?;

        let size = tree.size();
        if size.width() <= 0.0 || size.height() <= 0.0 {
            return Err(RenderError::LoadFailed("document has no drawable area".to_string()));
        }

        self.document = Some(tree);
        Ok(())
    }

    /// Rasterizes the whole document in one pass. Runs on a blocking thread.
    fn capture(&mut self, background: [u8; 3]) -> Result<Vec<u8>, RenderError> {
        let tree = self
            .document
            .as_ref()
            .ok_or_else(|| RenderError::CaptureFailed("no document loaded".to_string()))?;

        let [r, g, b] = background;
        self.pixmap.fill(tiny_skia::Color::from_rgba8(r, g, b, 255));

        // 依表面大小縮放，輸出尺寸只由模板決定
        let size = tree.size();
        let transform = tiny_skia::Transform::from_scale(
            self.pixmap.width() as f32 / size.width(),
            self.pixmap.height() as f32 / size.height(),
        );
        resvg::render(tree, transform, &mut self.pixmap.as_mut());

        let png = self
            .pixmap
            .encode_png()
            .map_err(|e| RenderError::CaptureFailed(e.to_string()))?;
        if png.is_empty() {
            return Err(RenderError::CaptureFailed("encoder returned no data".to_string()));
        }
        Ok(png)
    }
}

impl Drop for RenderSurface {
    fn drop(&mut self) {
        self.tracker.live.fetch_sub(1, Ordering::SeqCst);
        tracing::debug!(
            "Disposed {}x{} render surface",
            self.pixmap.width(),
            self.pixmap.height()
        );
    }
}

/// Escapes supplied values and fills schema defaults for absent or blank keys.
pub fn bind_parameters(schema: &ParameterSchema, parameters: &Parameters) -> Parameters {
    let mut bound: Parameters = parameters
        .iter()
        .map(|(k, v)| (k.clone(), escape_markup(v)))
        .filter(|(_, v)| !v.is_empty())
        .collect();

    for def in &schema.definitions {
        if bound.contains_key(&def.key) {
            continue;
        }
        if let Some(default) = &def.default_value {
            bound.insert(def.key.clone(), escape_markup(default));
        }
    }

    bound
}

/// Rasterizes templates through an owned off-screen surface per call.
pub struct SurfaceRenderer {
    registry: Arc<TemplateRegistry>,
    settings: RenderSettings,
    options: usvg::Options<'static>,
    tracker: SurfaceTracker,
}

impl SurfaceRenderer {
    pub fn new(registry: Arc<TemplateRegistry>, settings: RenderSettings) -> Self {
        let mut options = usvg::Options::default();
        options.fontdb_mut().load_system_fonts();
        tracing::debug!("Loaded {} font faces", options.fontdb.len());

        Self {
            registry,
            settings,
            options,
            tracker: SurfaceTracker::default(),
        }
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    pub fn tracker(&self) -> &SurfaceTracker {
        &self.tracker
    }
}

#[async_trait]
impl CertificateRenderer for SurfaceRenderer {
    async fn render(
        &self,
        template_id: &str,
        parameters: &Parameters,
    ) -> Result<Vec<u8>, RenderError> {
        let template = self.registry.resolve(template_id);
        let bound = bind_parameters(template.schema(), parameters);
        let document = template.render(&bound);

        let mut surface = RenderSurface::create(
            document.width,
            document.height,
            self.settings.scale,
            &self.tracker,
        )?;
        surface.load(&document.markup, &self.options)?;

        let deadline = tokio::time::Instant::now() + self.settings.timeout;
        let timed_out = || {
            RenderError::CaptureFailed(format!("timed out after {:?}", self.settings.timeout))
        };

        let settle = self.settings.settle_delay;
        if !settle.is_zero()
            && tokio::time::timeout_at(deadline, tokio::time::sleep(settle))
                .await
                .is_err()
        {
            drop(surface);
            return Err(timed_out());
        }

        // 表面移入 blocking 執行緒，在閉包結束時釋放
        let background = self.settings.background;
        let mut capture = tokio::task::spawn_blocking(move || {
            let result = surface.capture(background);
            drop(surface);
            result
        });

        match tokio::time::timeout_at(deadline, &mut capture).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(RenderError::CaptureFailed(join_error.to_string())),
            Err(_) => {
                // Rasterization cannot be interrupted; wait for it so the
                // surface is gone before this call returns.
                tracing::warn!(
                    "⏱️ Capture exceeded {:?}, waiting for the surface to be released",
                    self.settings.timeout
                );
                let _ = capture.await;
                Err(timed_out())
            }
        }
    }
}
