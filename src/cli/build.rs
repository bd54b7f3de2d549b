use std::path::{Path, PathBuf};

use clap::Parser;
use reqpub::{
    ActionError, Config, Outcome, TargetError, TargetGraph, register_targets,
    targets::{DEPS_TARGET, PUBLISH_TARGET, PublishSummary, VALIDATE_TARGET, ValidationSummary},
};
use tracing::instrument;

use super::terminal::{Colorize, banner};

/// Configuration file looked up in the project root.
pub const DEFAULT_CONFIG: &str = "reqs.toml";

#[derive(Debug, Parser)]
pub struct Build {
    /// The project root containing the requirements directory
    #[arg(short, long, default_value = ".")]
    root: PathBuf,

    /// Configuration file [default: <ROOT>/reqs.toml]
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured project name
    #[arg(long)]
    project_name: Option<String>,

    /// Targets to build, in order
    #[arg(required = true, value_parser = [DEPS_TARGET, VALIDATE_TARGET, PUBLISH_TARGET])]
    targets: Vec<String>,
}

impl Build {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self) -> anyhow::Result<()> {
        let config = load_config(&self.root, self.config.as_deref(), self.project_name);

        let mut graph = TargetGraph::new();
        register_targets(&mut graph, &self.root, &config);

        let mut failed = Vec::new();
        for target in &self.targets {
            match graph.build(target) {
                Ok(Some(outcome)) => print_outcome(&outcome),
                Ok(None) => println!("{}", format!("{target} is up to date").dim()),
                Err(error) => {
                    print_failure(&error);
                    failed.push(target.as_str());
                }
            }
        }

        if failed.is_empty() {
            Ok(())
        } else {
            anyhow::bail!("{} target(s) failed: {}", failed.len(), failed.join(", "))
        }
    }
}

/// Loads the project configuration, applying command-line overrides.
pub fn load_config(root: &Path, path: Option<&Path>, project_name: Option<String>) -> Config {
    let path = path.map_or_else(|| root.join(DEFAULT_CONFIG), Path::to_path_buf);
    let config = Config::load_or_default(&path);
    match project_name {
        Some(name) => config.with_project_name(name),
        None => config,
    }
}

fn print_outcome(outcome: &Outcome) {
    match outcome {
        Outcome::Installed { packages } => {
            println!(
                "{}",
                format!(
                    "✅ Requirements management dependencies installed: {}",
                    packages.join(", ")
                )
                .success()
            );
        }
        Outcome::Validated(summary) => print_validation(summary),
        Outcome::Published(summary) => print_publication(summary),
    }
}

fn print_validation(summary: &ValidationSummary) {
    banner(&format!("{} Requirements Validation", summary.display_name));
    if !summary.report.is_empty() {
        println!("{}", summary.report.trim_end());
    }
    for warning in &summary.warnings {
        println!("  {}", warning.warning());
    }
    println!("\n{summary}");
    println!(
        "\n{}",
        "✅ Validation passed (warnings are informational).".success()
    );
}

#[allow(clippy::cast_precision_loss)]
fn print_publication(summary: &PublishSummary) {
    banner(&format!("{} Requirements Publishing", summary.display_name));
    println!("  Post-processed {} HTML file(s)", summary.processed);
    if summary.template_removed {
        println!("{}", "  Removed template/ directory (using CDN)".dim());
    }
    println!(
        "\n{}",
        format!("Requirements published to: {}", summary.output_dir.display()).success()
    );
    for file in &summary.files {
        println!(
            "  {} ({:.1} KB)",
            file.path.display(),
            file.bytes as f64 / 1024.0
        );
    }
}

fn print_failure(error: &TargetError) {
    eprintln!("\n{}", format!("❌ {error}").warning());
    if let TargetError::Failed {
        source: ActionError::Validation(errors),
        ..
    } = error
    {
        for line in errors {
            eprintln!("  {line}");
        }
    }
}
