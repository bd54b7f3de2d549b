use std::path::PathBuf;

mod build;
mod documents;
mod terminal;

use build::Build;
use clap::ArgAction;
use documents::Documents;
use terminal::Colorize;
use tracing::instrument;

#[derive(Debug, clap::Parser)]
#[command(
    version,
    about,
    args_conflicts_with_subcommands = true,
    subcommand_negates_reqs = true
)]
pub struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(flatten)]
    postprocess: Postprocess,

    #[command(subcommand)]
    command: Option<Command>,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);

        match self.command {
            Some(command) => command.run(),
            None => self.postprocess.run(),
        }
    }

    fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let level = match verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[derive(Debug, clap::Parser)]
pub enum Command {
    /// Run requirements build targets (reqs-deps, reqs-validate, reqs-publish)
    Build(Build),

    /// List the requirements documents that targets operate on
    ///
    /// Uses the configured documents, or discovers them from
    /// `.doorstop.yml` files when none are configured.
    Documents(Documents),
}

impl Command {
    fn run(self) -> anyhow::Result<()> {
        match self {
            Self::Build(command) => command.run(),
            Self::Documents(command) => command.run(),
        }
    }
}

// Standalone mode: post-process an existing Doorstop export.
#[derive(Debug, clap::Args)]
pub struct Postprocess {
    /// Directory containing Doorstop HTML output
    ///
    /// A directory named `build` or `documents` is read as a subcommand;
    /// pass it as `./build` or `./documents` instead.
    #[arg(required = true)]
    output_dir: Option<PathBuf>,

    /// Project name for branding (e.g. "ControlNav")
    #[arg(long, default_value = "")]
    project_name: String,
}

impl Postprocess {
    #[instrument]
    fn run(self) -> anyhow::Result<()> {
        let Some(output_dir) = self.output_dir else {
            anyhow::bail!("an output directory is required");
        };

        let report = reqpub::postprocess_directory(&output_dir, &self.project_name)?;

        for path in report.processed_paths() {
            let relative = path.strip_prefix(&output_dir).unwrap_or(path);
            println!("  Processed: {}", relative.display());
        }
        for (path, error) in report.failures() {
            eprintln!(
                "{}",
                format!("  Failed: {}: {error}", path.display()).warning()
            );
        }

        if report.is_success() {
            println!("{}", format!("  {report}").success());
            Ok(())
        } else {
            println!("  {report}");
            anyhow::bail!(
                "{} file(s) could not be post-processed",
                report.failures().len()
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn bare_directory_selects_postprocessing() {
        let cli = Cli::try_parse_from(["reqpub", "out", "--project-name", "Acme"]).unwrap();

        assert!(cli.command.is_none());
        assert_eq!(cli.postprocess.output_dir, Some(PathBuf::from("out")));
        assert_eq!(cli.postprocess.project_name, "Acme");
    }

    #[test]
    fn output_directory_is_required() {
        assert!(Cli::try_parse_from(["reqpub"]).is_err());
    }

    #[test]
    fn subcommand_does_not_need_output_directory() {
        let cli = Cli::try_parse_from(["reqpub", "build", "reqs-publish"]).unwrap();

        assert!(matches!(cli.command, Some(Command::Build(_))));
        assert!(cli.postprocess.output_dir.is_none());
    }

    #[test]
    fn dotted_path_reaches_a_directory_named_like_a_subcommand() {
        let cli = Cli::try_parse_from(["reqpub", "./build"]).unwrap();

        assert!(cli.command.is_none());
        assert_eq!(cli.postprocess.output_dir, Some(PathBuf::from("./build")));
    }

    #[test]
    fn postprocess_run_rewrites_files() {
        let tmp = tempfile::tempdir().unwrap();
        let page = tmp.path().join("index.html");
        std::fs::write(&page, "<html><body><h1>Doorstop index</h1></body></html>").unwrap();

        Postprocess {
            output_dir: Some(tmp.path().to_path_buf()),
            project_name: "Acme".to_string(),
        }
        .run()
        .unwrap();

        let html = std::fs::read_to_string(page).unwrap();
        assert!(html.contains("<h1>Acme Requirements</h1>"));
    }

    #[test]
    fn postprocess_run_fails_on_missing_directory() {
        let tmp = tempfile::tempdir().unwrap();

        let error = Postprocess {
            output_dir: Some(tmp.path().join("missing")),
            project_name: String::new(),
        }
        .run()
        .unwrap_err();

        assert!(error.to_string().starts_with("Directory not found:"));
    }
}
