use anyhow::Result;
use certgen::domain::model::{Progress, RenderResult};
use certgen::domain::ports::{NoopObserver, Storage};
use certgen::core::renderer::bind_parameters;
use certgen::templates::{
    CertificateTemplate, Educate4pt0Template, ParameterDefinition, ParameterKind, ParameterSchema, Parameters,
    VisualDocument,
};
use certgen::utils::error::{CertError, ParseError, RenderError};
use certgen::{
    CertificateEngine, LocalStorage, RenderSettings, SurfaceRenderer, TemplateRegistry,
};
use std::collections::HashMap;
use std::io::Read;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Mutex;

#[derive(Clone, Default)]
struct MockStorage {
    files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MockStorage {
    async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
        let files = self.files.lock().await;
        files.get(path).cloned()
    }

    async fn names(&self) -> Vec<String> {
        let files = self.files.lock().await;
        files.keys().cloned().collect()
    }
}

impl Storage for MockStorage {
    async fn read_file(&self, path: &str) -> certgen::Result<Vec<u8>> {
        let files = self.files.lock().await;
        files.get(path).cloned().ok_or_else(|| {
            CertError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("File not found: {}", path),
            ))
        })
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> certgen::Result<String> {
        let mut files = self.files.lock().await;
        files.insert(path.to_string(), data.to_vec());
        Ok(path.to_string())
    }
}

/// Emits broken markup for any achiever named "BROKEN".
struct FragileTemplate {
    schema: ParameterSchema,
}

impl FragileTemplate {
    fn new() -> Self {
        Self {
            schema: ParameterSchema::new(vec![ParameterDefinition::new(
                "achieverName",
                "Name",
                ParameterKind::Text,
            )
            .required()])
            .with_identity("achieverName"),
        }
    }
}

impl CertificateTemplate for FragileTemplate {
    fn id(&self) -> &str {
        "fragile"
    }
    fn display_name(&self) -> &str {
        "Fragile"
    }
    fn description(&self) -> &str {
        "Fails to load for one specific name"
    }
    fn schema(&self) -> &ParameterSchema {
        &self.schema
    }
    fn render(&self, params: &Parameters) -> VisualDocument {
        let name = params.get("achieverName").map(String::as_str).unwrap_or("");
        let markup = if name == "BROKEN" {
            "<svg xmlns=\"http://www.w3.org/2000/svg\"><rect".to_string()
        } else {
            format!(
                r##"<svg xmlns="http://www.w3.org/2000/svg" width="120" height="80"><rect width="120" height="80" fill="#336699"/><text x="10" y="40">{}</text></svg>"##,
                name
            )
        };
        VisualDocument {
            width: 120,
            height: 80,
            markup,
        }
    }
}

fn registry() -> Arc<TemplateRegistry> {
    Arc::new(TemplateRegistry::builtin().register(Arc::new(FragileTemplate::new())))
}

fn fast_settings() -> RenderSettings {
    RenderSettings {
        scale: 1.0,
        ..RenderSettings::default()
    }
}

const STUDENTS: &str = "\
achieverName,courseName,completionDate,certifierName
Ada Lovelace,Analytical Engines,2026-10-01,Ms. Smith
Grace Hopper,COBOL Basics,2026-10-02,Ms. Smith
Alan Turing,Computability,2026-10-03,Mr. Jones
";

#[tokio::test]
async fn test_end_to_end_batch_writes_archive() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let output_path = temp_dir.path().to_str().unwrap().to_string();

    let registry = registry();
    let renderer = SurfaceRenderer::new(registry.clone(), RenderSettings::default());
    let engine = CertificateEngine::new(LocalStorage::new(output_path.clone()), renderer, registry);

    let progress = StdMutex::new(Vec::new());
    let observer = |p: &Progress| progress.lock().unwrap().push(p.clone());

    let outcome = engine.run(STUDENTS, "educate4pt0", &observer).await?;

    assert_eq!(outcome.report.succeeded, 3);
    assert_eq!(outcome.report.failed, 0);
    assert_eq!(progress.lock().unwrap().len(), 3);
    assert_eq!(engine.renderer().tracker().created(), 3);
    assert_eq!(engine.renderer().tracker().live(), 0);

    let archive_path = outcome.archive_path.expect("archive should be written");
    let file_name = std::path::Path::new(&archive_path)
        .file_name()
        .unwrap()
        .to_string_lossy()
        .into_owned();
    assert!(file_name.starts_with("certificates_educate4pt0_"));
    assert!(file_name.ends_with(".zip"));

    let zip_data = std::fs::read(&archive_path)?;
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(zip_data))?;
    assert_eq!(archive.len(), 3);

    let mut png = Vec::new();
    archive
        .by_name("Ada_Lovelace_certificate.png")?
        .read_to_end(&mut png)?;
    let image = image::load_from_memory(&png)?;
    // 1123x794 document at 2x supersampling
    assert_eq!((image.width(), image.height()), (2246, 1588));

    // opaque background in the corner
    let corner = image.to_rgba8().get_pixel(0, 0).0;
    assert_eq!(corner[3], 255);

    Ok(())
}

#[tokio::test]
async fn test_failing_record_does_not_abort_batch() -> Result<()> {
    let registry = registry();
    let renderer = SurfaceRenderer::new(registry.clone(), fast_settings());
    let storage = MockStorage::default();
    let engine = CertificateEngine::new(storage.clone(), renderer, registry);

    let csv = "achieverName\nAda\nBROKEN\nAlan\n";
    let outcome = engine.run(csv, "fragile", &NoopObserver).await?;
    let report = &outcome.report;

    assert_eq!(report.results.len(), 3);
    assert!(report.results[0].is_success());
    assert!(matches!(
        &report.results[1],
        RenderResult::Failure {
            id: 2,
            reason: RenderError::LoadFailed(_),
            ..
        }
    ));
    assert!(report.results[2].is_success());
    assert_eq!(engine.renderer().tracker().live(), 0);

    let archive_name = outcome.archive_path.unwrap();
    let zip_data = storage.get_file(&archive_name).await.unwrap();
    let archive = zip::ZipArchive::new(std::io::Cursor::new(zip_data))?;
    let mut names: Vec<&str> = archive.file_names().collect();
    names.sort();
    assert_eq!(names, vec!["Ada_certificate.png", "Alan_certificate.png"]);

    Ok(())
}

#[tokio::test]
async fn test_timeout_is_a_capture_failure() -> Result<()> {
    let registry = registry();
    let settings = RenderSettings {
        scale: 1.0,
        settle_delay: Duration::from_millis(300),
        timeout: Duration::from_millis(50),
        ..RenderSettings::default()
    };
    let renderer = SurfaceRenderer::new(registry.clone(), settings);
    let storage = MockStorage::default();
    let engine = CertificateEngine::new(storage.clone(), renderer, registry);

    let outcome = engine.run("achieverName\nAda\nAlan\n", "fragile", &NoopObserver).await?;

    assert_eq!(outcome.report.failed, 2);
    for result in &outcome.report.results {
        match result {
            RenderResult::Failure { reason, .. } => {
                assert!(matches!(reason, RenderError::CaptureFailed(m) if m.contains("timed out")));
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }
    assert!(outcome.archive_path.is_none());
    assert!(storage.names().await.is_empty());
    assert_eq!(engine.renderer().tracker().live(), 0);

    Ok(())
}

#[tokio::test]
async fn test_parse_errors_prevent_rendering() {
    let registry = registry();
    let renderer = SurfaceRenderer::new(registry.clone(), fast_settings());
    let storage = MockStorage::default();
    let engine = CertificateEngine::new(storage.clone(), renderer, registry);

    let result = engine
        .run("achieverName,completionDate\nAda,2026-10-01\n", "educate4pt0", &NoopObserver)
        .await;

    match result {
        Err(CertError::Parse(ParseError::MissingColumns(cols))) => {
            assert_eq!(cols, vec!["courseName", "certifierName"]);
        }
        other => panic!("expected missing columns, got {:?}", other.map(|o| o.report)),
    }
    assert_eq!(engine.renderer().tracker().created(), 0);
    assert!(storage.names().await.is_empty());

    let empty = engine.run("achieverName\n", "fragile", &NoopObserver).await;
    assert!(matches!(empty, Err(CertError::Parse(ParseError::Empty))));
}

#[tokio::test]
async fn test_unknown_template_falls_back_to_default() -> Result<()> {
    let registry = registry();
    let renderer = SurfaceRenderer::new(registry.clone(), fast_settings());
    let storage = MockStorage::default();
    let engine = CertificateEngine::new(storage.clone(), renderer, registry);

    let outcome = engine.run(STUDENTS, "no-such-template", &NoopObserver).await?;

    assert_eq!(outcome.report.template_id, "educate4pt0");
    assert!(outcome
        .archive_path
        .unwrap()
        .starts_with("certificates_educate4pt0_"));
    Ok(())
}

#[tokio::test]
async fn test_markup_characters_in_names_render_safely() -> Result<()> {
    let registry = registry();
    let renderer = SurfaceRenderer::new(registry.clone(), fast_settings());
    let storage = MockStorage::default();
    let engine = CertificateEngine::new(storage.clone(), renderer, registry);

    let csv = "achieverName,courseName,completionDate,certifierName\nO'Brien <3>,Tom & Jerry's \"Cartoons\" 1/2,2026-10-16,Ms. Smith\n";
    let outcome = engine.run(csv, "educate4pt0", &NoopObserver).await?;

    assert_eq!(outcome.report.succeeded, 1);
    let archive_name = outcome.archive_path.unwrap();
    let zip_data = storage.get_file(&archive_name).await.unwrap();
    let archive = zip::ZipArchive::new(std::io::Cursor::new(zip_data))?;
    let names: Vec<&str> = archive.file_names().collect();
    assert_eq!(names, vec!["O_Brien__3__certificate.png"]);

    Ok(())
}

#[test]
fn test_bound_values_reach_markup_escaped() {
    let template = Educate4pt0Template::new();
    let params: Parameters = [
        ("achieverName", "O'Brien <3>"),
        ("courseName", "Tom & Jerry's \"Cartoons\" 1/2"),
        ("certifierName", "</text><script/>"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    let bound = bind_parameters(template.schema(), &params);
    for key in ["achieverName", "courseName", "certifierName"] {
        let value = &bound[key];
        assert!(
            !value.contains(['<', '>', '"', '\'', '/']),
            "{} still has raw markup: {}",
            key,
            value
        );
    }

    let document = template.render(&bound);
    assert!(document.markup.contains("O&#x27;Brien &lt;3&gt;"));
    assert!(document
        .markup
        .contains("Tom &amp; Jerry&#x27;s &quot;Cartoons&quot; 1&#x2F;2"));
    assert!(document.markup.contains("&lt;&#x2F;text&gt;&lt;script&#x2F;&gt;"));
    assert!(!document.markup.contains("O'Brien"));
    assert!(!document.markup.contains("<script"));
}

#[tokio::test]
async fn test_render_one_writes_single_png() -> Result<()> {
    let registry = registry();
    let renderer = SurfaceRenderer::new(registry.clone(), fast_settings());
    let storage = MockStorage::default();
    let engine = CertificateEngine::new(storage.clone(), renderer, registry);

    let params: Parameters = [
        ("achieverName", "Ada Lovelace"),
        ("courseName", "Analytical Engines"),
        ("certifierName", "Ms. Smith"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    let path = engine.render_one("educate4pt0", &params).await?;
    assert_eq!(path, "Ada_Lovelace_certificate.png");

    let png = storage.read_file(&path).await?;
    let image = image::load_from_memory(&png)?;
    assert_eq!((image.width(), image.height()), (1123, 794));
    Ok(())
}

#[tokio::test]
async fn test_render_one_requires_parameters_without_default() {
    let registry = registry();
    let renderer = SurfaceRenderer::new(registry.clone(), fast_settings());
    let storage = MockStorage::default();
    let engine = CertificateEngine::new(storage.clone(), renderer, registry);

    let params: Parameters = [("achieverName".to_string(), "Ada".to_string())]
        .into_iter()
        .collect();

    let result = engine.render_one("educate4pt0", &params).await;
    match result {
        Err(CertError::ParameterError { key, .. }) => assert_eq!(key, "courseName"),
        other => panic!("expected parameter error, got {:?}", other),
    }
    assert_eq!(engine.renderer().tracker().created(), 0);
    assert!(storage.names().await.is_empty());
}
