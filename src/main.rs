use std::fs;
use std::io;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use comune_geocoder::{
    init_tracing, Gazetteer, KeywordTable, LocalityQuery, OverrideTable, ResolutionReport,
    Resolver, ResolverConfig,
};

/// Resolves free-text Italian locality names from a CRM export to
/// coordinates against a gazetteer file.
#[derive(Debug, Parser)]
#[command(name = "comune-geocoder", version)]
struct Cli {
    /// JSON array of {comune, provincia, lat, lon} reference rows.
    #[arg(long)]
    gazetteer: PathBuf,
    /// CSV with a header and columns: record_id, comune, provincia.
    #[arg(long)]
    input: PathBuf,
    /// Resolved CSV destination; stdout when omitted.
    #[arg(long)]
    output: Option<PathBuf>,
    /// Optional JSON summary report destination.
    #[arg(long)]
    report: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = ResolverConfig::from_env();
    let gazetteer = Gazetteer::load(&cli.gazetteer).context("loading gazetteer")?;
    info!(entries = gazetteer.len(), "gazetteer loaded");

    let queries = read_queries(&cli.input).context("reading query input")?;
    info!(queries = queries.len(), "query batch loaded");

    let resolver = Resolver::new(
        gazetteer,
        OverrideTable::curated(),
        KeywordTable::curated(),
        config,
    );
    let resolved = resolver.resolve_batch(queries);
    let report = ResolutionReport::from_queries(&resolved);

    write_resolved(cli.output.as_deref(), &resolved).context("writing resolved output")?;
    if let Some(path) = &cli.report {
        fs::write(path, serde_json::to_string_pretty(&report)?)
            .with_context(|| format!("writing report to {}", path.display()))?;
    }

    info!(
        total = report.total,
        resolved = report.resolved,
        unresolved = report.unresolved,
        resolved_percent = report.resolved_percent(),
        "resolution finished"
    );
    for breakdown in &report.by_source {
        if breakdown.count > 0 {
            info!(
                source = breakdown.source,
                count = breakdown.count,
                percent = breakdown.percent,
                "strategy breakdown"
            );
        }
    }
    Ok(())
}

fn read_queries(path: &std::path::Path) -> anyhow::Result<Vec<LocalityQuery>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;

    let mut queries = Vec::new();
    for (line, result) in reader.records().enumerate() {
        let record = result?;
        let record_id = record.get(0).unwrap_or_default().trim().to_string();
        if record_id.is_empty() {
            warn!(line = line + 2, "row without record_id skipped");
            continue;
        }
        if record.len() < 3 {
            // Malformed rows degrade to "not specified" fields rather than
            // aborting the batch.
            warn!(
                line = line + 2,
                record_id = %record_id,
                "row missing locality fields; treating them as not specified"
            );
        }
        let comune = record.get(1).unwrap_or_default();
        let provincia = record.get(2).unwrap_or_default();
        queries.push(LocalityQuery::new(record_id, comune, provincia));
    }
    Ok(queries)
}

fn write_resolved(path: Option<&std::path::Path>, resolved: &[LocalityQuery]) -> anyhow::Result<()> {
    let writer: Box<dyn io::Write> = match path {
        Some(path) => Box::new(fs::File::create(path)?),
        None => Box::new(io::stdout()),
    };
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(["record_id", "lat", "lon", "match_source"])?;
    for query in resolved {
        let (lat, lon) = match query.resolved {
            Some(coords) => (coords.lat.to_string(), coords.lon.to_string()),
            None => (String::new(), String::new()),
        };
        csv_writer.write_record([
            query.record_id.as_str(),
            lat.as_str(),
            lon.as_str(),
            query.match_source.as_tag(),
        ])?;
    }
    csv_writer.flush()?;
    Ok(())
}
