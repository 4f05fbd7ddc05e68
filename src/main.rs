use certgen::config::cli::{Cli, Command, CsvTemplateArgs, GenerateArgs, LinksArgs, RenderArgs};
use certgen::core::links::{form_link, record_links};
use certgen::core::parser;
use certgen::domain::model::{BatchOutcome, Progress, RenderResult};
use certgen::templates::{csv_template, csv_template_file_name, Parameters};
use certgen::utils::error::{CertError, ErrorSeverity};
use certgen::utils::logger;
use certgen::utils::validation::{validate_file_extensions, validate_url, Validate};
use certgen::{
    CancellationFlag, CertificateEngine, GeneratorSettings, LocalStorage, RenderSettings,
    SurfaceRenderer, TemplateRegistry,
};
use clap::Parser;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting certgen CLI");
    if cli.verbose {
        tracing::debug!("CLI args: {:?}", cli);
    }

    let settings = match cli.base_settings() {
        Ok(settings) => settings,
        Err(e) => exit_with(e),
    };

    let registry = Arc::new(TemplateRegistry::builtin());

    let result = match &cli.command {
        Command::Generate(args) => generate(args, settings, registry).await,
        Command::Render(args) => render(args, settings, registry).await,
        Command::CsvTemplate(args) => write_csv_template(args, &settings, &registry).await,
        Command::Templates => {
            list_templates(&registry);
            Ok(())
        }
        Command::Links(args) => print_links(args, &settings, &registry).await,
    };

    if let Err(e) = result {
        exit_with(e);
    }

    Ok(())
}

fn exit_with(e: CertError) -> ! {
    tracing::error!(
        "❌ certgen failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

    let exit_code = match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}

fn params_map(pairs: &[(String, String)]) -> Parameters {
    pairs.iter().cloned().collect()
}

async fn generate(
    args: &GenerateArgs,
    mut settings: GeneratorSettings,
    registry: Arc<TemplateRegistry>,
) -> Result<(), CertError> {
    args.render.apply(&mut settings)?;
    if let Some(report) = &args.report {
        settings.report_path = Some(report.clone());
    }
    settings.validate()?;
    validate_file_extensions("input", std::slice::from_ref(&args.input), &["csv", "txt"])?;

    if let Some(name) = &settings.batch_name {
        tracing::info!("🏷️ Batch: {}", name);
    }
    tracing::info!("📁 Reading recipients from: {}", args.input);
    let csv_text = tokio::fs::read_to_string(&args.input).await?;

    let renderer = SurfaceRenderer::new(registry.clone(), RenderSettings::from_config(&settings));
    let storage = LocalStorage::new(settings.output_path.clone());
    let cancel = CancellationFlag::new();
    let engine = CertificateEngine::new_with_monitoring(storage, renderer, registry, settings.monitor)
        .with_cancellation(cancel.clone());

    // Ctrl-C 只在記錄之間生效，進行中的渲染會先完成
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("🛑 Cancelling after the current certificate...");
            cancel.cancel();
        }
    });

    let observer = |p: &Progress| {
        println!("[{}/{}] {}", p.completed, p.total, p.current_display_name);
    };

    let outcome = engine.run(&csv_text, &settings.template_id, &observer).await?;
    print_summary(&outcome);

    if let Some(report_path) = &settings.report_path {
        let json = serde_json::to_string_pretty(&outcome.report)?;
        tokio::fs::write(report_path, json).await?;
        println!("📝 Report written to: {}", report_path);
    }

    if outcome.report.cancelled {
        std::process::exit(130);
    }
    if !outcome.report.has_successes() {
        std::process::exit(1);
    }
    Ok(())
}

fn print_summary(outcome: &BatchOutcome) {
    let report = &outcome.report;
    println!();
    println!(
        "✅ {} succeeded, ❌ {} failed, ⏭️ {} skipped (of {})",
        report.succeeded, report.failed, report.skipped, report.total
    );

    for result in report.successes() {
        println!("  ✅ #{} {}", result.id(), result.display_name());
    }
    for result in report.failures() {
        if let RenderResult::Failure {
            id,
            display_name,
            reason,
        } = result
        {
            println!("  ❌ #{} {}: {}", id, display_name, reason);
        }
    }

    match &outcome.archive_path {
        Some(path) => println!("📦 Archive saved to: {}", path),
        None => println!("⚠️ No archive produced"),
    }
}

async fn render(
    args: &RenderArgs,
    mut settings: GeneratorSettings,
    registry: Arc<TemplateRegistry>,
) -> Result<(), CertError> {
    args.render.apply(&mut settings)?;
    settings.validate()?;

    let renderer = SurfaceRenderer::new(registry.clone(), RenderSettings::from_config(&settings));
    let storage = LocalStorage::new(settings.output_path.clone());
    let engine = CertificateEngine::new_with_monitoring(storage, renderer, registry, settings.monitor);

    let path = engine
        .render_one(&settings.template_id, &params_map(&args.params))
        .await?;
    println!("🖼️ Certificate saved to: {}", path);
    Ok(())
}

async fn write_csv_template(
    args: &CsvTemplateArgs,
    settings: &GeneratorSettings,
    registry: &TemplateRegistry,
) -> Result<(), CertError> {
    let template = registry.resolve(args.template.as_deref().unwrap_or(&settings.template_id));
    let csv = csv_template(template.schema());

    match &args.output {
        Some(path) => {
            let path = if std::path::Path::new(path).is_dir() {
                std::path::Path::new(path)
                    .join(csv_template_file_name(template.id()))
                    .to_string_lossy()
                    .into_owned()
            } else {
                path.clone()
            };
            tokio::fs::write(&path, &csv).await?;
            println!("⬇️ CSV template written to: {}", path);
        }
        None => println!("{}", csv),
    }
    Ok(())
}

fn list_templates(registry: &TemplateRegistry) {
    for template in registry.list() {
        println!("{} - {}", template.id(), template.display_name());
        println!("  {}", template.description());
        for def in &template.schema().definitions {
            let marker = if def.required { "*" } else { " " };
            let default = def
                .default_value
                .as_deref()
                .map(|d| format!(" (default: {})", d))
                .unwrap_or_default();
            println!("  {} {:<18} {}{}", marker, def.key, def.label, default);
        }
        println!();
    }
}

async fn print_links(
    args: &LinksArgs,
    settings: &GeneratorSettings,
    registry: &TemplateRegistry,
) -> Result<(), CertError> {
    let base_url = args.base_url.as_deref().unwrap_or(&settings.link_base_url);
    validate_url("--base-url", base_url)?;

    let template = registry.resolve(args.template.as_deref().unwrap_or(&settings.template_id));

    match &args.input {
        Some(input) => {
            let csv_text = tokio::fs::read_to_string(input).await?;
            let records = parser::parse(&csv_text, template.schema())?;
            for link in record_links(base_url, template.id(), &records)? {
                println!("{}: {}", link.display_name, link.url);
            }
        }
        None if args.params.is_empty() => {
            return Err(CertError::MissingConfigError {
                field: "input or --param".to_string(),
            });
        }
        None => {
            let url = form_link(base_url, template.id(), template.schema(), &params_map(&args.params))?;
            println!("{}", url);
        }
    }
    Ok(())
}
