//! Main entry point for the szi-range CLI application.
//!
//! Opens a local or remote archive, then lists it, prints its manifest or
//! tiles directory, or extracts entries by name.

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::warn;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use szi_range::{ArchiveReader, Cli, HttpRangeSource, LocalFileSource, RangeSource};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_filter()))
        .init();

    // Another provider may already be installed; either way TLS works
    let _ = rustls::crypto::ring::default_provider().install_default();

    // Ctrl-C cancels every in-flight fetch
    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling outstanding requests");
                cancel.cancel();
            }
        }
    });

    if cli.is_http_url() {
        let source = HttpRangeSource::with_options(cli.archive.clone(), cli.http_options())
            .await
            .with_context(|| format!("Couldn't open {}", cli.archive))?;
        let source = Arc::new(source);

        process_archive(source.clone(), &cli, &cancel).await?;

        // Display network transfer statistics for HTTP sources
        if !cli.is_quiet() {
            eprintln!(
                "\nTotal bytes transferred: {}",
                format_size(source.transferred_bytes())
            );
        }
    } else {
        let source = LocalFileSource::new(Path::new(&cli.archive))
            .with_context(|| format!("Couldn't open {}", cli.archive))?;
        process_archive(Arc::new(source), &cli, &cancel).await?;
    }

    Ok(())
}

/// Open the archive and do whatever the flags ask for.
async fn process_archive<R: RangeSource + 'static>(
    source: Arc<R>,
    cli: &Cli,
    cancel: &CancellationToken,
) -> Result<()> {
    let reader = ArchiveReader::open_with(source, cli.open_options(), cancel)
        .await
        .context("Couldn't read archive directory")?;

    if cli.list || cli.list_ranges {
        list_entries(&reader, cli.list_ranges);
    }

    if cli.manifest {
        println!("{}", reader.manifest_entry_name()?);
    }

    if cli.tiles {
        println!("{}", reader.tiles_directory()?);
    }

    if !cli.entries.is_empty() {
        extract_entries(Arc::new(reader), cli, cancel).await?;
    }

    Ok(())
}

/// Print entries in file order, optionally with their byte ranges.
fn list_entries<R: RangeSource>(reader: &ArchiveReader<R>, ranges: bool) {
    let entries = reader.index().in_file_order();

    if ranges {
        println!("{:>14}  {:>14}  {:>12}  Name", "Start", "Max end", "Length");
        println!("{}", "-".repeat(70));
    }

    let mut total = 0u64;
    for (name, entry) in &entries {
        if ranges {
            println!(
                "{:>14}  {:>14}  {:>12}  {}",
                entry.start, entry.max_end, entry.body_length, name
            );
            total += entry.body_length;
        } else {
            println!("{}", name);
        }
    }

    if ranges {
        println!("{}", "-".repeat(70));
        println!("{:>44}  {} entries", total, entries.len());
    }
}

/// Fetch the requested entries concurrently, then write them out in the
/// order they were asked for.
async fn extract_entries<R: RangeSource + 'static>(
    reader: Arc<ArchiveReader<R>>,
    cli: &Cli,
    cancel: &CancellationToken,
) -> Result<()> {
    let mut tasks = JoinSet::new();
    for (i, name) in cli.entries.iter().cloned().enumerate() {
        let reader = reader.clone();
        let cancel = cancel.child_token();
        tasks.spawn(async move {
            let body = reader.fetch_body(&name, &cancel).await;
            (i, name, body)
        });
    }

    let mut bodies = Vec::with_capacity(cli.entries.len());
    while let Some(joined) = tasks.join_next().await {
        let (i, name, body) = joined?;
        let body = body.with_context(|| format!("Couldn't read {name}"))?;
        bodies.push((i, name, body));
    }
    bodies.sort_by_key(|(i, _, _)| *i);

    let mut stdout = tokio::io::stdout();
    for (_, name, body) in bodies {
        if cli.pipe {
            stdout.write_all(&body).await?;
            continue;
        }

        if !is_safe_relative(&name) {
            bail!("Refusing to write {name} outside the extraction directory");
        }
        let output_path = match cli.extract_dir {
            Some(ref dir) => PathBuf::from(dir).join(&name),
            None => PathBuf::from(&name),
        };
        if !cli.is_quiet() {
            println!("  extracting: {}", name);
        }
        write_file(&output_path, &body).await?;
    }
    stdout.flush().await?;

    Ok(())
}

/// Whether an entry name stays below the directory it is extracted into
fn is_safe_relative(name: &str) -> bool {
    Path::new(name)
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

async fn write_file(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let mut file = tokio::fs::File::create(path)
        .await
        .with_context(|| format!("Couldn't create {}", path.display()))?;
    file.write_all(data).await?;
    Ok(())
}

/// Format a byte size into a human-readable string.
fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} bytes", size)
    }
}
