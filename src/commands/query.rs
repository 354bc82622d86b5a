use anyhow::Result;
use colored::Colorize;
use std::path::PathBuf;

use catalog_rag::search::orchestrator::clamp_top_k;
use catalog_rag::QueryOrchestrator;

use super::CommandContext;

pub async fn run(
    ctx: &CommandContext,
    query: &str,
    top_k: Option<usize>,
    catalog: Option<&PathBuf>,
    json: bool,
) -> Result<()> {
    let top_k = clamp_top_k(top_k, ctx.settings.default_top_k);
    let gateway = ctx.open_gateway(catalog, json).await?;
    let orchestrator = QueryOrchestrator::new(gateway);

    let response = orchestrator.query(query, top_k).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    println!("{}", response.answer);
    println!();
    println!(
        "{} confidence {:.2} | {} products | {}",
        "→".dimmed(),
        response.confidence,
        response.relevant_products.len(),
        response.mode.to_string().cyan()
    );

    Ok(())
}
