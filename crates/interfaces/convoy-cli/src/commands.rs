use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use camino::Utf8PathBuf;
use convoy_config::{clamp_transfers, DEFAULT_EDITOR_NAME, META_DIR};
use convoy_persistence::{MetaPaths, VersionLedger};
use convoy_session::{bootstrap, Session, SessionOptions, SessionReport};
use convoy_store::build_store;
use humansize::{format_size, DECIMAL};
use indicatif::{ProgressBar, ProgressStyle};

use crate::{ConsolePrompt, StoreArgs};

pub async fn cmd_sync(
    data_dir: Utf8PathBuf,
    store_args: StoreArgs,
    transfers: usize,
    editor_flag: Option<String>,
) -> anyhow::Result<()> {
    println!(":: convoy — shared-folder synchronization");
    println!("   Data folder: {}", data_dir);

    let ledger = VersionLedger::new(MetaPaths::new(data_dir.clone()));
    ledger.paths().ensure()?;

    let editor = resolve_editor(&ledger, editor_flag)?;
    println!("   Editor:      {}", editor);

    let store = build_store(store_args.to_backend()?)
        .await
        .context("Failed to build remote store")?;

    if let Some(seeded) = bootstrap::ensure_remote_initialized(store.as_ref(), &ledger, &editor)
        .await
        .context("Failed to initialize remote location")?
    {
        println!(":: Initialized remote location ({seeded} pre-existing files recorded)");
    }

    let pb = spinner();
    pb.set_message("Scanning data folder...");
    let scanned = {
        let root = data_dir.clone();
        let editor = editor.clone();
        tokio::task::spawn_blocking(move || convoy_scanner::scan(&root, META_DIR, &editor)).await??
    };
    let total_bytes: u64 = scanned
        .iter()
        .map(|record| {
            std::fs::metadata(data_dir.join(&record.path).as_std_path())
                .map(|m| m.len())
                .unwrap_or(0)
        })
        .sum();
    pb.finish_with_message(format!(
        "{} files ({})",
        scanned.len(),
        format_size(total_bytes, DECIMAL)
    ));

    let options = SessionOptions {
        max_transfers: clamp_transfers(transfers),
    };
    let session = Session::new(store, Arc::new(ConsolePrompt), ledger, editor, options);
    let report = session.run().await?;

    print_report(&report);
    Ok(())
}

pub async fn cmd_reset(
    data_dir: Utf8PathBuf,
    store_args: StoreArgs,
    yes: bool,
) -> anyhow::Result<()> {
    println!(":: convoy — reset synchronization metadata");
    println!("   Data folder: {}", data_dir);

    if !yes && !confirm("This removes all convoy metadata locally and on the remote. Continue?")? {
        println!("Aborted.");
        return Ok(());
    }

    let store = build_store(store_args.to_backend()?)
        .await
        .context("Failed to build remote store")?;
    let removed = bootstrap::reset_remote(store.as_ref()).await?;

    let ledger = VersionLedger::new(MetaPaths::new(data_dir));
    bootstrap::reset_local(&ledger)?;

    println!(":: Removed {removed} remote metadata objects and the local {META_DIR} folder");
    println!("   File contents were left untouched.");
    Ok(())
}

fn print_report(report: &SessionReport) {
    println!("\n:: Session complete");
    println!("   Uploaded:         {}", report.pushed);
    println!("   Downloaded:       {}", report.pulled);
    println!("   Deleted locally:  {}", report.local_deleted);
    println!("   Archived remote:  {}", report.remote_archived);
    if report.reverted_remote + report.reverted_local > 0 {
        println!(
            "   Reverted:         {} remote, {} local",
            report.reverted_remote, report.reverted_local
        );
    }
    match &report.log_path {
        Some(path) => println!(
            "   Failures:         {} (see {})",
            report.failures, path
        ),
        None => println!("   Failures:         0"),
    }
}

/// Editor name precedence: explicit flag, then the saved `editor.txt`,
/// then a first-run prompt whose answer is persisted.
fn resolve_editor(ledger: &VersionLedger, flag: Option<String>) -> anyhow::Result<String> {
    if let Some(name) = flag {
        ledger.save_editor(&name)?;
        return Ok(name);
    }
    if let Some(name) = ledger.load_editor() {
        return Ok(name);
    }

    print!("Editor name to record with your changes [{DEFAULT_EDITOR_NAME}]: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let name = line.trim();
    let name = if name.is_empty() {
        DEFAULT_EDITOR_NAME.to_string()
    } else {
        name.to_string()
    };
    ledger.save_editor(&name)?;
    Ok(name)
}

fn confirm(question: &str) -> anyhow::Result<bool> {
    print!("{question} [y/N]: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

fn spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
