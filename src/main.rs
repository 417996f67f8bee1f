use anyhow::Context;
use clap::Parser;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use invoice_ai::analyzer::{CacheFile, CachedExtractor, GeminiExtractor, InvoiceExtractor};
use invoice_ai::cli::{Cli, Commands};
use invoice_ai::cloud::{CloudSession, GoogleWorkspace};
use invoice_ai::config::Config;
use invoice_ai::session::{
    AnalyzeSummary, FileReport, FileState, FileStatus, MergeOutcome, SessionEvent, SessionReport, SessionState,
};
use invoice_ai::{export, scanner};
use std::path::{Path, PathBuf};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

const DEFAULT_REPORT: &str = "invoice-report.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config = Config::load().context("設定の読み込みに失敗")?;

    match cli.command {
        Commands::Analyze { inputs, merge, output, resume, use_cache, recursive } => {
            println!("🧾 invoice-ai - تحليل الفواتير\n");

            let mut session = match &resume {
                Some(path) => {
                    println!("- استئناف من التقرير: {}", path.display());
                    SessionState::restore(SessionReport::load(path)?, FileReport::load_payload)?
                }
                None => SessionState::new(),
            };
            if merge {
                session.set_merge_mode(true)?;
            }

            if !inputs.is_empty() {
                println!("[1/3] جاري فحص الصور...");
                let images = scanner::collect_images(&inputs, recursive)?;
                println!("✔ تم العثور على {} صورة\n", images.len());
                session.add_files(images)?;
            }

            println!("[2/3] جاري التحليل بالذكاء الاصطناعي...{}", cache_note(use_cache));
            let extractor = build_extractor(&config, use_cache)?;
            let summary = analyze_with_progress(&mut session, extractor.as_ref()).await?;
            print_results(&session, &summary);

            println!("[3/3] جاري حفظ التقرير...");
            let output = output
                .or(resume)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_REPORT));
            session.report().save(&output)?;
            println!("✔ تم حفظ التقرير: {}", output.display());

            println!("\n✅ اكتمل التحليل");
        }

        Commands::Export { input, output } => {
            println!("📄 invoice-ai - تصدير Excel\n");

            let report = SessionReport::load(&input)?;
            let output_dir = output.unwrap_or_else(|| PathBuf::from("."));
            export::export_results(&report.export_entries(), &output_dir)?;

            println!("\n✅ اكتمل التصدير");
        }

        Commands::Upload { input, yes } => {
            println!("☁️  invoice-ai - الحفظ في Google Drive & Sheets\n");

            let report = SessionReport::load(&input)?;
            let mut session = SessionState::restore(report, FileReport::load_payload)?;
            upload_session(&mut session, &config, yes).await?;
        }

        Commands::Run { inputs, merge, output, upload, use_cache, recursive, yes } => {
            println!("🚀 invoice-ai - معالجة كاملة\n");

            println!("[1/3] جاري فحص الصور...");
            let images = scanner::collect_images(&inputs, recursive)?;
            println!("✔ تم العثور على {} صورة\n", images.len());

            let mut session = SessionState::new();
            session.set_merge_mode(merge)?;
            session.add_files(images)?;

            println!("[2/3] جاري التحليل بالذكاء الاصطناعي...{}", cache_note(use_cache));
            let extractor = build_extractor(&config, use_cache)?;
            let summary = analyze_with_progress(&mut session, extractor.as_ref()).await?;
            print_results(&session, &summary);

            println!("[3/3] جاري التصدير...");
            let output_dir = output.unwrap_or_else(|| PathBuf::from("."));
            export::export_results(&session.export_entries(), &output_dir)?;

            if upload {
                println!();
                upload_session(&mut session, &config, yes).await?;
            }

            println!("\n✅ اكتمل");
        }

        Commands::Config { set_api_key, set_client_secret, set_currency, show } => {
            let mut config = config;
            let mut changed = false;

            if let Some(key) = set_api_key {
                config.api_key = Some(key);
                changed = true;
                println!("✔ تم حفظ مفتاح API");
            }
            if let Some(path) = set_client_secret {
                let path = path.canonicalize().unwrap_or(path);
                println!("✔ تم حفظ ملف بيانات اعتماد Google: {}", path.display());
                config.client_secret_path = Some(path);
                changed = true;
            }
            if let Some(currency) = set_currency {
                config.home_currency = currency.trim().to_uppercase();
                changed = true;
                println!("✔ العملة: {}", config.home_currency);
            }
            if changed {
                config.save()?;
            }

            if show || !changed {
                println!("الإعدادات:");
                println!("  الملف: {}", Config::config_path()?.display());
                println!("  النموذج: {}", config.model);
                println!("  العملة: {}", config.home_currency);
                println!("  مجلد Drive: {}", config.drive_folder);
                println!("  جدول البيانات: {}", config.drive_sheet);
                println!(
                    "  مفتاح API: {}",
                    if config.get_api_key().is_ok() { "مضبوط" } else { "غير مضبوط" }
                );
                println!(
                    "  بيانات اعتماد Google: {}",
                    config
                        .client_secret_path
                        .as_ref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| "غير مضبوطة".into())
                );
            }
        }

        Commands::Logout => {
            let token_cache = Config::token_cache_path()?;
            if CloudSession::default().logout(&token_cache)? {
                println!("✔ تم تسجيل الخروج من Google");
            } else {
                println!("لا يوجد حساب Google متصل");
            }
        }

        Commands::Cache { clear, info } => {
            let cache_path = Config::extraction_cache_path()?;

            if info || !clear {
                if cache_path.exists() {
                    let cache = CacheFile::load(&cache_path);
                    println!("معلومات التخزين المؤقت:");
                    println!("  المسار: {}", cache_path.display());
                    println!("  العدد: {}", cache.len());
                    if let Ok(meta) = std::fs::metadata(&cache_path) {
                        println!("  الحجم: {} bytes", meta.len());
                    }
                } else {
                    println!("لا يوجد ملف تخزين مؤقت: {}", cache_path.display());
                }
            }

            if clear {
                match CacheFile::clear(&cache_path) {
                    Ok(true) => println!("✔ تم حذف التخزين المؤقت: {}", cache_path.display()),
                    Ok(false) => println!("لا يوجد ملف تخزين مؤقت"),
                    Err(e) => println!("خطأ في حذف التخزين المؤقت: {}", e),
                }
            }
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn cache_note(use_cache: bool) -> &'static str {
    if use_cache {
        " (التخزين المؤقت مفعل)"
    } else {
        ""
    }
}

fn build_extractor(config: &Config, use_cache: bool) -> anyhow::Result<Box<dyn InvoiceExtractor>> {
    let gemini = GeminiExtractor::from_config(config)?;
    if use_cache {
        let path = Config::extraction_cache_path()?;
        Ok(Box::new(CachedExtractor::open(gemini, path)))
    } else {
        Ok(Box::new(gemini))
    }
}

/// セッションのイベントで進捗バーを更新しながら解析
async fn analyze_with_progress(
    session: &mut SessionState,
    extractor: &dyn InvoiceExtractor,
) -> anyhow::Result<AnalyzeSummary> {
    let total = if session.merge_mode() {
        session.files().len()
    } else {
        session
            .files()
            .iter()
            .filter(|f| matches!(f.state, FileState::Pending | FileState::Failed { .. }))
            .count()
    };

    let bar = ProgressBar::new(total as u64);
    if let Ok(style) = ProgressStyle::with_template("  {bar:30.cyan/blue} {pos}/{len} {msg}") {
        bar.set_style(style);
    }

    let mut events = session.subscribe();
    let progress = {
        let bar = bar.clone();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(SessionEvent::FileStatusChanged { status, .. }) => {
                        if matches!(status, FileStatus::Succeeded | FileStatus::Failed) {
                            bar.inc(1);
                        }
                    }
                    Ok(SessionEvent::BusyChanged(false)) | Err(RecvError::Closed) => break,
                    Ok(_) | Err(RecvError::Lagged(_)) => {}
                }
            }
        })
    };

    let result = session.analyze(extractor).await;
    if matches!(result, Ok(AnalyzeSummary { calls: 0, .. })) || result.is_err() {
        progress.abort();
    } else {
        let _ = progress.await;
    }
    bar.finish_and_clear();

    Ok(result?)
}

fn print_results(session: &SessionState, summary: &AnalyzeSummary) {
    if summary.calls == 0 {
        println!("✔ جميع الملفات محللة مسبقاً\n");
        return;
    }

    for file in session.files() {
        let name = &file.payload.file_name;
        match &file.state {
            FileState::Succeeded { record: Some(record) } => println!(
                "  ✔ {} - {} ({} {})",
                name, record.company_name, record.total, record.currency
            ),
            FileState::Succeeded { record: None } => println!("  ✔ {}", name),
            FileState::Failed { reason } => println!("  ✗ {}: {}", name, reason),
            FileState::Pending | FileState::InProgress => println!("  - {}", name),
        }
    }

    if let Some(MergeOutcome::Ready { record }) = session.combined() {
        println!(
            "  ⇒ فاتورة مجمعة: {} - {} ({} {})",
            record.invoice_number, record.company_name, record.total, record.currency
        );
    }

    println!(
        "✔ تم التحليل: {} ناجح، {} فاشل\n",
        summary.succeeded, summary.failed
    );
}

async fn upload_session(session: &mut SessionState, config: &Config, yes: bool) -> anyhow::Result<()> {
    if !session.has_any_result() {
        println!("لا توجد نتائج للحفظ");
        return Ok(());
    }

    let destination = config.destination();
    let units = if session.merge_mode() { 1 } else { session.export_entries().len() };
    if !yes {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "حفظ {} فاتورة في \"{}\" / \"{}\"؟",
                units, destination.folder, destination.sheet
            ))
            .default(true)
            .interact()?;
        if !confirmed {
            println!("تم الإلغاء");
            return Ok(());
        }
    }

    let secret = config.get_client_secret_path()?;
    let token_cache = Config::token_cache_path()?;
    let cloud = authorize(&secret, &token_cache).await?;
    let store = GoogleWorkspace::new(cloud);

    let report = session.save_to_cloud(&store, &destination).await?;
    for unit in &report.units {
        match &unit.result {
            Ok(link) => println!("  ✔ {} → {}", unit.file_name, link),
            Err(reason) => println!("  ✗ {}: {}", unit.file_name, reason),
        }
    }

    if report.failed() == 0 {
        println!("✔ تم الحفظ بنجاح في Google Drive و Google Sheets");
    } else {
        println!("✗ تم حفظ {} وفشل {}", report.saved(), report.failed());
    }
    Ok(())
}

async fn authorize(secret: &Path, token_cache: &Path) -> anyhow::Result<CloudSession> {
    println!("- جاري الاتصال بحساب Google...");
    let session = CloudSession::authorize(secret, token_cache)
        .await
        .context("Google 認証に失敗")?;
    println!("✔ تم الاتصال بحساب Google");
    Ok(session)
}
