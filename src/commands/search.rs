//! Search command - ranked products without answer generation

use anyhow::Result;
use colored::Colorize;
use std::path::PathBuf;

use catalog_rag::search::orchestrator::clamp_top_k;
use catalog_rag::Mode;

use super::{truncate, CommandContext};

pub async fn run(
    ctx: &CommandContext,
    query: &str,
    limit: Option<usize>,
    catalog: Option<&PathBuf>,
    json: bool,
) -> Result<()> {
    let limit = clamp_top_k(limit, ctx.settings.default_top_k);
    let gateway = ctx.open_gateway(catalog, json).await?;
    let results = gateway.search(query, limit).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if let Some(reason) = &results.degraded {
        println!("{} Vector search failed: {}", "!".yellow(), reason);
    }

    if results.documents.is_empty() {
        println!("{} No results found for: {}", "→".dimmed(), query.cyan());
        return Ok(());
    }

    println!(
        "{} {} results for: {} ({})",
        "→".dimmed(),
        results.documents.len(),
        query.cyan(),
        results.mode
    );
    println!();

    for (i, doc) in results.documents.iter().enumerate() {
        let score = doc.score();
        let score_str = match results.mode {
            Mode::Fallback => format!("{:.0}%", score * 100.0),
            _ => format!("{:.2}", score),
        };
        let score_colored = if score > 0.8 {
            score_str.green()
        } else if score > 0.5 {
            score_str.yellow()
        } else {
            score_str.dimmed()
        };

        println!(
            "{}. [{}] {}",
            (i + 1).to_string().bold(),
            score_colored,
            doc.name.as_deref().unwrap_or("Unknown").cyan()
        );
        if let Some(description) = &doc.description {
            println!("   {}", truncate(description, 100).dimmed());
        }
        match (&doc.category, doc.price) {
            (Some(category), Some(price)) => println!("   {} | ${:.2}", category, price),
            (Some(category), None) => println!("   {}", category),
            (None, Some(price)) => println!("   ${:.2}", price),
            (None, None) => {}
        }
        println!();
    }

    Ok(())
}
