use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use response_insight::model::RunConfig;
use response_insight::service::{AnalysisEngine, RunError, TextUnit};

enum Mode {
    Rows,
    Documents,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present (ignore if missing)
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let (mode, input) = match parse_args() {
        Some(args) => args,
        None => {
            eprintln!("Usage: response-insight <rows|documents> <input.jsonl>");
            return ExitCode::FAILURE;
        }
    };

    match run(mode, &input).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Run failed");
            ExitCode::FAILURE
        }
    }
}

fn parse_args() -> Option<(Mode, PathBuf)> {
    let mut args = std::env::args().skip(1);
    let mode = match args.next()?.as_str() {
        "rows" => Mode::Rows,
        "documents" => Mode::Documents,
        _ => return None,
    };
    let input = PathBuf::from(args.next()?);
    Some((mode, input))
}

async fn run(mode: Mode, input: &Path) -> Result<(), RunError> {
    let config = RunConfig::load_default()?;
    let engine = AnalysisEngine::from_config(&config)?;
    let units = read_units(input)?;
    tracing::info!(input = %input.display(), units = units.len(), "Loaded input units");

    let output = match mode {
        Mode::Rows => engine.run_rows(units).await,
        Mode::Documents => engine.run_documents(units).await,
    };

    let out_path = output_path(input);
    let contents = serde_json::to_string_pretty(&output)
        .map_err(|e| RunError::InvalidInput(format!("serializing output: {e}")))?;
    fs::write(&out_path, contents)?;
    tracing::info!(output = %out_path.display(), "Wrote run output");

    println!("{}", output.stats.summary());
    Ok(())
}

/// Read one `{"id": ..., "text": ...}` unit per line
fn read_units(path: &Path) -> Result<Vec<TextUnit>, RunError> {
    let contents = fs::read_to_string(path)?;
    let mut units = Vec::new();
    for (number, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let unit: TextUnit = serde_json::from_str(line).map_err(|e| {
            RunError::InvalidInput(format!("{} line {}: {e}", path.display(), number + 1))
        })?;
        units.push(unit);
    }
    if units.is_empty() {
        return Err(RunError::InvalidInput(format!(
            "{} contains no input units",
            path.display()
        )));
    }
    Ok(units)
}

fn output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "run".to_string());
    input.with_file_name(format!("{stem}_analysis.json"))
}
