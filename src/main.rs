use anyhow::{Context, Result};
use chrono::Local;
use fundnorm::{
    analytics::{filter::TableFilter, DashboardReport},
    cache::NormalizeCache,
    config::Config,
    export,
};
use std::{env, fs, path::PathBuf, time::Instant};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .with_writer(std::io::stderr)
        .init();
    info!("startup");

    // ─── 2) configuration ────────────────────────────────────────────
    let mut config = Config::load()?;
    if let Some(path) = env::args().nth(1) {
        config.candidates.insert(0, PathBuf::from(path));
    }
    fs::create_dir_all(&config.out_dir)
        .with_context(|| format!("creating {}", config.out_dir.display()))?;

    // ─── 3) normalize ────────────────────────────────────────────────
    let start = Instant::now();
    let cache = NormalizeCache::new();
    let table = cache.get_or_normalize(&config.source(), &config.normalize_options());
    if table.is_synthetic() {
        warn!(origin = ?table.origin(), "serving synthetic dataset");
    }
    info!(
        rows = table.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "normalized"
    );

    // ─── 4) dashboard summaries ──────────────────────────────────────
    let filter = TableFilter::dashboard_default(&table);
    let report = DashboardReport::build(&table, &filter);
    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("serializing report")?
    );

    // ─── 5) exports ──────────────────────────────────────────────────
    let csv_path = config.out_dir.join(export::export_file_name(&Local::now()));
    export::write_csv_file(&table, &csv_path)?;
    let parquet_path = csv_path.with_extension("parquet");
    export::write_parquet(&table, &parquet_path)?;

    info!(
        csv = %csv_path.display(),
        parquet = %parquet_path.display(),
        "done"
    );
    Ok(())
}
