//! CLI subcommands

pub mod index;
pub mod query;
pub mod search;
pub mod status;

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use catalog_rag::{load_documents, Mode, RetrievalGateway, Settings};

/// Options shared by every subcommand
pub struct CommandContext {
    pub settings: Settings,
    pub force_fallback: bool,
}

impl CommandContext {
    pub fn load(config: Option<&Path>, force_fallback: bool) -> Result<Self> {
        let settings = Settings::load(config).context("Failed to load settings")?;
        Ok(Self {
            settings,
            force_fallback,
        })
    }

    /// Build and initialize a gateway, optionally indexing `catalog` into it
    pub async fn open_gateway(
        &self,
        catalog: Option<&PathBuf>,
        json: bool,
    ) -> Result<Arc<RetrievalGateway>> {
        let gateway = RetrievalGateway::from_settings(&self.settings, self.force_fallback)
            .context("Failed to configure retrieval")?;
        let mode = gateway.initialize().await;

        if let Some(path) = catalog {
            let documents = load_documents(path)?;
            let report = gateway.index(documents).await?;
            if !json {
                println!(
                    "{} Indexed {} products from {} ({})",
                    "→".dimmed(),
                    report.indexed,
                    path.display(),
                    report.mode
                );
            }
        } else if mode == Mode::Fallback && !json {
            println!(
                "{} Keyword fallback is in-memory; pass {} to load products",
                "!".yellow(),
                "--catalog".cyan()
            );
        }

        Ok(Arc::new(gateway))
    }
}

/// Truncate for display (char-aware for Unicode)
pub fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        format!("{}...", s.chars().take(max_chars).collect::<String>())
    } else {
        s.to_string()
    }
}
