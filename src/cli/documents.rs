use std::path::PathBuf;

use clap::Parser;
use reqpub::discover_documents;
use tracing::instrument;

use super::{build::load_config, terminal::Colorize};

#[derive(Debug, Parser)]
pub struct Documents {
    /// The project root containing the requirements directory
    #[arg(short, long, default_value = ".")]
    root: PathBuf,

    /// Configuration file [default: <ROOT>/reqs.toml]
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl Documents {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self) -> anyhow::Result<()> {
        let config = load_config(&self.root, self.config.as_deref(), None);
        let reqs_dir = self.root.join(config.reqs_dir());

        let (documents, source) = match config.documents() {
            Some(documents) => (documents.clone(), "configured"),
            None => (discover_documents(&reqs_dir), "discovered"),
        };

        if documents.is_empty() {
            println!(
                "{}",
                format!("No documents found in {}", reqs_dir.display()).dim()
            );
            return Ok(());
        }

        println!("{} document(s) {source}:", documents.len());
        for (dir, prefix) in &documents {
            println!("  {} {dir}", format!("{prefix:<8}").info());
        }
        Ok(())
    }
}
