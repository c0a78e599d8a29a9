use anyhow::{Context, Result};
use filedigest::logging::init_logger;
use filedigest::models::is_error_placeholder;
use filedigest::{check_hash, DigestConfig, DigestReport, DigestSession, InputError, OutputFormat};
use std::path::{Path, PathBuf};

const CONFIG_ENV: &str = "FILEDIGEST_CONFIG";

fn load_config() -> Result<DigestConfig> {
    match std::env::var_os(CONFIG_ENV) {
        Some(path) => DigestConfig::load(Path::new(&path)),
        None => Ok(DigestConfig::default()),
    }
}

fn print_table(report: &DigestReport) {
    println!("{}", report.path.display());
    let width = report.rows().iter().map(|(name, _)| name.len()).max().unwrap_or(0);
    for (name, value) in report.rows() {
        let marker = if is_error_placeholder(value) { "!" } else { " " };
        println!("{marker} {name:<width$}  {value}");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logger();

    // usage: filedigest <file> [expected-hash]
    let mut args = std::env::args_os().skip(1);
    let path: PathBuf = args.next().map(PathBuf::from).ok_or(InputError::NoFile)?;
    let expected = args.next().map(|s| s.to_string_lossy().into_owned());

    let config = load_config().with_context(|| format!("loading config from ${CONFIG_ENV}"))?;
    let output = config.output;
    let mut session = DigestSession::new(config);
    session.start(&path)?;
    let report = session.finish().await?;

    if report.cancelled {
        log::warn!("digest of {} was cancelled", path.display());
        return Ok(());
    }

    match output {
        OutputFormat::Table => print_table(&report),
        OutputFormat::Json => println!("{}", report.to_json()?),
    }

    if let Some(expected) = expected {
        println!("{}", check_hash(&report.digests, &expected).message());
    }
    Ok(())
}
