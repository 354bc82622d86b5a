//! Index command - load a catalog into the active store

use anyhow::Result;
use colored::Colorize;
use std::path::Path;
use std::time::Instant;

use catalog_rag::{load_documents, Mode, RetrievalGateway};

use super::CommandContext;

pub async fn run(ctx: &CommandContext, catalog: &Path, json: bool) -> Result<()> {
    let documents = load_documents(catalog)?;
    let total = documents.len();

    let gateway = RetrievalGateway::from_settings(&ctx.settings, ctx.force_fallback)?;
    let mode = gateway.initialize().await;

    if !json {
        println!("{} Indexing {} products ({})...", "→".dimmed(), total, mode);
    }

    let start = Instant::now();
    let report = gateway.index(documents).await?;
    let duration_ms = start.elapsed().as_millis();

    if json {
        println!(
            "{}",
            serde_json::json!({
                "status": if report.error.is_none() { "success" } else { "error" },
                "count": total,
                "indexed": report.indexed,
                "skipped": report.skipped,
                "mode": report.mode,
                "error": report.error,
                "duration_ms": duration_ms,
            })
        );
        return Ok(());
    }

    println!();
    match &report.error {
        None => println!(
            "{} Indexed {} products in {:.2}s",
            "✓".green().bold(),
            report.indexed.to_string().cyan(),
            duration_ms as f64 / 1000.0
        ),
        Some(error) => println!("{} Indexing failed: {}", "✗".red().bold(), error),
    }
    if report.skipped > 0 {
        println!(
            "  {} {} products skipped (embedding failed)",
            "→".dimmed(),
            report.skipped
        );
    }

    match report.mode {
        Mode::Vector => println!(
            "  {} Stored in collection '{}'",
            "→".dimmed(),
            ctx.settings.collection_name
        ),
        _ => println!(
            "  {} Vector backend unavailable; keyword index lives only for this process",
            "!".yellow()
        ),
    }

    Ok(())
}
