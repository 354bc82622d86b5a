use anyhow::Result;
use colored::*;

use catalog_rag::Mode;

use super::CommandContext;

pub async fn run(ctx: &CommandContext, json: bool) -> Result<()> {
    let gateway = ctx.open_gateway(None, true).await?;
    let status = gateway.status().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("{}", "Retrieval Status".bold());
    println!("{}", "=".repeat(50));
    println!();

    let mode = match status.mode {
        Mode::Vector => status.mode.to_string().green(),
        Mode::Fallback => status.mode.to_string().yellow(),
        Mode::Uninitialized => status.mode.to_string().dimmed(),
    };
    println!("   {:<12} {}", "Mode", mode);
    println!("   {:<12} {:?}", "Backend", ctx.settings.backend);

    if let Some(info) = &status.collection {
        println!("   {:<12} {}", "Collection", info.name);
        println!("   {:<12} {}", "Points", info.points_count);
        println!("   {:<12} {}", "Dimension", info.dimension);
    }
    if let Some(count) = status.fallback_documents {
        println!("   {:<12} {}", "Documents", count);
    }
    if let Some(reason) = &status.fallback_reason {
        println!("   {:<12} {}", "Reason", reason.dimmed());
    }

    println!();
    println!("{}", status.message);
    Ok(())
}
