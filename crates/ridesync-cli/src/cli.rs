//! Command line handling
//!
//! Usage:
//!   ridesync scan <dir>             List activity files
//!   ridesync extract <dir>          Unpack zip archives in place
//!   ridesync sync [<dir>]           Import activity files
//!
//! Options:
//!   --recursive          Descend into sub directories
//!   --after <instant>    Skip files modified before an RFC 3339 instant
//!   --json               Output in JSON format

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use ridesync_core::config::Config;
use ridesync_core::{
    ArchiveExtractor, DirectoryScanner, FileConnector, MemoryActivityStore, ReportFormat,
    SyncEvent, SyncReport, SyncSource,
};

/// CLI command to execute
#[derive(Debug, Clone, PartialEq)]
pub enum CliCommand {
    Scan { dir: PathBuf },
    Extract { dir: PathBuf },
    Sync { dir: Option<PathBuf> },
}

/// CLI options
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliOptions {
    pub json: bool,
    pub recursive: bool,
    pub after: Option<DateTime<Utc>>,
    pub delete: bool,
    pub extract: bool,
    pub delete_archives: bool,
    pub detect_sport: bool,
    pub weight: Option<f64>,
    pub store: Option<PathBuf>,
    pub report: Option<PathBuf>,
}

/// Parse CLI arguments and return command + options
pub fn parse_args(args: &[String]) -> Result<(CliCommand, CliOptions), String> {
    let mut options = CliOptions::default();
    let mut command: Option<&str> = None;
    let mut dir: Option<PathBuf> = None;

    let mut i = 0;
    while i < args.len() {
        let arg = &args[i];
        match arg.as_str() {
            "--json" => options.json = true,
            "--recursive" | "-r" => options.recursive = true,
            "--delete" => options.delete = true,
            "--extract" => options.extract = true,
            "--delete-archives" => options.delete_archives = true,
            "--detect-sport" => options.detect_sport = true,
            "--after" => options.after = Some(parse_instant(value(args, &mut i, "--after")?)?),
            "--weight" => options.weight = Some(parse_weight(value(args, &mut i, "--weight")?)?),
            "--store" => options.store = Some(PathBuf::from(value(args, &mut i, "--store")?)),
            "--report" => {
                let path = PathBuf::from(value(args, &mut i, "--report")?);
                ReportFormat::for_path(&path).map_err(|e| e.to_string())?;
                options.report = Some(path);
            }
            "scan" | "extract" | "sync" if command.is_none() => command = Some(arg.as_str()),
            _ if arg.starts_with('-') => return Err(format!("Unknown option: {}", arg)),
            _ if command.is_none() => return Err(format!("Unknown command: {}", arg)),
            _ if dir.is_none() => dir = Some(PathBuf::from(arg)),
            _ => return Err(format!("Unexpected argument: {}", arg)),
        }
        i += 1;
    }

    let command = match command {
        Some("scan") => CliCommand::Scan {
            dir: dir.ok_or("scan requires a directory")?,
        },
        Some("extract") => CliCommand::Extract {
            dir: dir.ok_or("extract requires a directory")?,
        },
        Some(_) => CliCommand::Sync { dir },
        None => return Err("No command specified. Use: scan, extract, or sync".to_string()),
    };

    Ok((command, options))
}

fn value<'a>(args: &'a [String], i: &mut usize, flag: &str) -> Result<&'a str, String> {
    *i += 1;
    args.get(*i)
        .map(String::as_str)
        .ok_or_else(|| format!("{} requires a value", flag))
}

fn parse_instant(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|instant| instant.with_timezone(&Utc))
        .map_err(|_| format!("Invalid instant '{}'. Use RFC 3339, e.g. 2024-01-31T08:00:00Z", s))
}

fn parse_weight(s: &str) -> Result<f64, String> {
    match s.parse::<f64>() {
        Ok(weight) if weight > 0.0 && weight.is_finite() => Ok(weight),
        _ => Err(format!("Invalid weight '{}'. Use kilograms, e.g. 72.5", s)),
    }
}

/// Run CLI command
pub async fn run(command: CliCommand, options: CliOptions) -> anyhow::Result<()> {
    match command {
        CliCommand::Scan { dir } => run_scan(&dir, options),
        CliCommand::Extract { dir } => run_extract(&dir, options),
        CliCommand::Sync { dir } => run_sync(dir, options).await,
    }
}

fn run_scan(dir: &Path, options: CliOptions) -> anyhow::Result<()> {
    let files = DirectoryScanner::new(dir)
        .recursive(options.recursive)
        .modified_after(options.after)
        .scan()?;

    if options.json {
        let items: Vec<_> = files
            .iter()
            .map(|file| {
                serde_json::json!({
                    "path": file.path.to_string_lossy(),
                    "type": file.file_type.extension(),
                    "last_modified": file.last_modified.to_rfc3339(),
                })
            })
            .collect();
        println!(
            "{}",
            serde_json::json!({ "total": files.len(), "files": items })
        );
    } else {
        println!("Found {} activity files in {}", files.len(), dir.display());
        for file in &files {
            println!("  [{}] {}", file.file_type, file.path.display());
        }
    }

    Ok(())
}

fn run_extract(dir: &Path, options: CliOptions) -> anyhow::Result<()> {
    let extractor = ArchiveExtractor::new(options.delete);
    let mut archives = Vec::new();
    let files = extractor.extract_in_directory(dir, options.recursive, |extracted| {
        if !options.json {
            println!(
                "  {} -> {} files{}",
                extracted.archive.display(),
                extracted.files.len(),
                if extracted.deleted { " (deleted)" } else { "" }
            );
        }
        archives.push(extracted.archive.clone());
    })?;

    if options.json {
        println!(
            "{}",
            serde_json::json!({
                "archives": archives.iter().map(|p| p.to_string_lossy()).collect::<Vec<_>>(),
                "files": files.iter().map(|p| p.to_string_lossy()).collect::<Vec<_>>(),
            })
        );
    } else {
        println!(
            "Extracted {} files from {} archives",
            files.len(),
            archives.len()
        );
    }

    Ok(())
}

/// Config file values with command line overrides applied
fn effective_config(dir: Option<PathBuf>, options: &CliOptions) -> anyhow::Result<Config> {
    let mut config = Config::load();
    let connector = &mut config.file_connector;

    if let Some(dir) = dir {
        connector.source_directory = dir;
    }
    if connector.source_directory.as_os_str().is_empty() {
        anyhow::bail!("No source directory given and none configured");
    }
    if options.recursive {
        connector.scan_sub_directories = true;
    }
    if options.extract {
        connector.extract_archive_files = true;
    }
    if options.delete_archives {
        connector.delete_archives_after_extract = true;
    }
    if options.detect_sport {
        connector.detect_sport_type_when_unknown = true;
    }
    if options.after.is_some() {
        connector.sync_after = options.after;
    }
    if let Some(weight) = options.weight {
        config.athlete.settings.weight = Some(weight);
    }

    Ok(config)
}

async fn run_sync(dir: Option<PathBuf>, options: CliOptions) -> anyhow::Result<()> {
    let config = effective_config(dir, &options)?;

    let store = match options.store.as_deref() {
        Some(path) if path.exists() => MemoryActivityStore::load_json(path)?,
        _ => MemoryActivityStore::default(),
    };

    let connector = FileConnector::builder()
        .config(config.file_connector)
        .activity_lookup(std::sync::Arc::new(store.clone()))
        .athlete_resolver(std::sync::Arc::new(
            ridesync_core::FixedAthleteSnapshot(config.athlete),
        ))
        .build()?;

    // Ctrl+C asks the run to stop after the file in progress
    let stopper = connector.clone();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nStop requested, finishing current file...");
            if let Err(e) = stopper.request_stop() {
                tracing::warn!("Could not stop sync: {}", e);
            }
        }
    });

    let stream = connector.sync();
    let json = options.json;
    let report = tokio::task::spawn_blocking(move || {
        let mut report = SyncReport::new();
        for event in stream {
            if !json {
                print_event(&event);
            }
            report.record(&event);
        }
        report
    })
    .await?;
    ctrl_c.abort();

    if let Some(path) = options.store.as_deref() {
        let mut store = store;
        for produced in &report.activities {
            store.upsert(produced.activity.clone());
        }
        store.save_json(path)?;
    }

    if let Some(path) = options.report.as_deref() {
        report.write_to(path)?;
        if !json {
            println!("Report written to {}", path.display());
        }
    }

    print_sync_report(&report, json)?;

    if report.end.is_none() || report.end == Some(ridesync_core::RunEnd::Failed) {
        anyhow::bail!("Sync did not complete");
    }
    Ok(())
}

fn print_event(event: &SyncEvent) {
    match event {
        SyncEvent::Started { connector } => println!("Syncing from {} connector...", connector),
        SyncEvent::ActivityProduced {
            is_new, activity, ..
        } => println!(
            "  {} {} ({}, {})",
            if *is_new { "+" } else { "~" },
            activity.name(),
            activity.activity.sport,
            activity.activity.start_time.format("%Y-%m-%d %H:%M")
        ),
        SyncEvent::Error(error) => match &error.source {
            Some(source) => println!("  ! [{}] {}: {}", error.code, source.display(), error.description),
            None => println!("  ! [{}] {}", error.code, error.description),
        },
        SyncEvent::Stopped { .. } => println!("Sync stopped"),
        SyncEvent::Completed { .. } => {}
    }
}

fn print_sync_report(report: &SyncReport, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!();
    match report.end {
        Some(end) => println!("Sync {}:", end),
        None => println!("Sync ended unexpectedly:"),
    }
    println!("  Created: {}", report.created);
    println!("  Updated: {}", report.updated);
    println!("  Failed:  {}", report.failed);
    Ok(())
}

/// Print CLI help
pub fn print_help() {
    println!("ridesync v{}", env!("CARGO_PKG_VERSION"));
    println!("Import GPX, TCX and FIT activity files from a folder");
    println!();
    println!("USAGE:");
    println!("    ridesync <command> [options]");
    println!();
    println!("COMMANDS:");
    println!("    scan <dir>                  List activity files");
    println!("    extract <dir>               Unpack zip archives next to themselves");
    println!("    sync [<dir>]                Import activities (directory from config if omitted)");
    println!();
    println!("OPTIONS:");
    println!("    --recursive, -r             Descend into sub directories");
    println!("    --after <instant>           Skip files modified before an RFC 3339 instant");
    println!("    --delete                    Delete archives after extraction (extract)");
    println!("    --extract                   Extract archives before syncing");
    println!("    --delete-archives           Delete archives extracted during sync");
    println!("    --detect-sport              Guess unknown sports from the activity profile");
    println!("    --weight <kg>               Athlete weight used for power estimation");
    println!("    --store <file.json>         Known activities, updated after the sync");
    println!("    --report <file.json|.csv>   Write a report of the sync");
    println!("    --json                      Output in JSON format");
    println!();
    println!("ENVIRONMENT:");
    println!("    RUST_LOG                    Log filter, e.g. ridesync_core=debug");
    println!();
    println!("EXAMPLES:");
    println!("    ridesync scan ~/activities --recursive");
    println!("    ridesync sync ~/activities --extract --store activities.json");
}
