//! Kommandolinje for LiftGraph: analyserer én økt fra CSV (opptaksappen) eller
//! JSON (samme form som `analyze_session_json`).
//!
//! ```bash
//! liftgraph --input BENCH_PRESS_2024-05-01.csv
//! liftgraph --input session.json --format json --metrics
//! liftgraph --input set3.csv --exercise back_squat --profiles profiles.json
//! ```

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};

use liftgraph_core::cli::print_session_report;
use liftgraph_core::storage::load_profile_catalog;
use liftgraph_core::{analyze_request, AnalyzeRequest, Metrics, ProfileCatalog, SensorSample};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(
    name = "liftgraph",
    about = "Rep segmentation, per-rep kinematics and fatigue for IMU strength sessions"
)]
struct Args {
    /// Økt som CSV (én rad per sample) eller JSON-forespørsel
    #[arg(long, short = 'i')]
    input: PathBuf,

    /// Øvelse; ellers gjenkjent fra filnavnet
    #[arg(long, short = 'e')]
    exercise: Option<String>,

    /// Profilkatalog (JSON) som overstyrer innebygde profiler
    #[arg(long)]
    profiles: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Skriv Prometheus-tellere til stderr etter analysen
    #[arg(long)]
    metrics: bool,

    #[arg(long)]
    session_id: Option<String>,

    /// Debug-logging
    #[arg(long, short = 'v')]
    verbose: bool,
}

fn read_csv_samples(path: &Path) -> Result<Vec<SensorSample>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;
    let mut out = Vec::new();
    for (i, row) in rdr.deserialize::<SensorSample>().enumerate() {
        // +2: header + 1-basert
        let s = row.with_context(|| format!("{}: row {}", path.display(), i + 2))?;
        out.push(s);
    }
    Ok(out)
}

fn read_request(args: &Args) -> Result<AnalyzeRequest> {
    let ext = args
        .input
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let mut req = match ext.as_str() {
        "json" => {
            let txt = std::fs::read_to_string(&args.input)
                .with_context(|| format!("reading {}", args.input.display()))?;
            let mut de = serde_json::Deserializer::from_str(&txt);
            serde_path_to_error::deserialize::<_, AnalyzeRequest>(&mut de).map_err(|e| {
                anyhow::anyhow!("{}: parse error at {}: {}", args.input.display(), e.path(), e.inner())
            })?
        }
        "csv" => AnalyzeRequest {
            samples: read_csv_samples(&args.input)?,
            ..Default::default()
        },
        other => bail!("unsupported input format '{}' (expected .csv or .json)", other),
    };

    if args.exercise.is_some() {
        req.exercise = args.exercise.clone();
    }
    if req.source_name.is_none() {
        req.source_name = args
            .input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned());
    }
    if args.session_id.is_some() {
        req.session_id = args.session_id.clone();
    }
    Ok(req)
}

fn main() -> Result<()> {
    let args = Args::parse();

    // log-makroene i biblioteket fanges via tracing-log
    let level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("logger init: {e}"))?;

    let catalog = match &args.profiles {
        Some(p) => load_profile_catalog(p).with_context(|| format!("loading profiles from {}", p.display()))?,
        None => ProfileCatalog::default(),
    };

    let req = read_request(&args)?;
    log::info!(
        "loaded {} samples from {}",
        req.samples.len(),
        args.input.display()
    );

    let metrics = Metrics::new().context("registering metrics")?;
    let analysis = analyze_request(&req, &catalog, Some(&metrics)).context("analysis failed")?;

    match args.format {
        OutputFormat::Text => print_session_report(&analysis).context("writing report")?,
        OutputFormat::Json => {
            let out = serde_json::to_string_pretty(&analysis).context("serializing analysis")?;
            println!("{}", out);
        }
    }

    if args.metrics {
        eprint!("{}", metrics.gather_text());
    }
    Ok(())
}
