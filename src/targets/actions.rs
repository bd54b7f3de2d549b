//! The three Doorstop build actions.
//!
//! Each action is a small struct holding the shared [`TargetContext`] and the
//! tool runner, delegating to a stateless function.

use std::{
    ffi::{OsStr, OsString},
    fmt, fs, io,
    path::{Path, PathBuf},
    rc::Rc,
};

use walkdir::WalkDir;

use crate::{
    domain::{Config, Transformer},
    storage::{Documents, discover_documents, postprocess_directory_with},
    targets::{Action, ActionError, Outcome, runner::ToolRunner},
};

/// Everything the actions capture from one build invocation.
#[derive(Debug, Clone)]
pub struct TargetContext {
    project_root: PathBuf,
    config: Config,
    transformer: Transformer,
}

impl TargetContext {
    /// Bundles the project root and configuration for the actions.
    #[must_use]
    pub fn new(project_root: &Path, config: Config) -> Self {
        Self {
            project_root: project_root.to_path_buf(),
            transformer: Transformer::for_project(config.project_name()),
            config,
        }
    }

    /// The project root; tools run from here.
    #[must_use]
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// The configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Absolute path of the requirements directory.
    #[must_use]
    pub fn reqs_dir(&self) -> PathBuf {
        self.project_root.join(self.config.reqs_dir())
    }

    /// Directory Doorstop publishes into.
    #[must_use]
    pub fn output_dir(&self) -> PathBuf {
        self.reqs_dir().join("output")
    }

    /// The configured documents, or freshly discovered ones.
    #[must_use]
    pub fn documents(&self) -> Documents {
        self.config
            .documents()
            .cloned()
            .unwrap_or_else(|| discover_documents(&self.reqs_dir()))
    }

    fn display_name(&self) -> &str {
        match self.config.project_name() {
            "" => "Doorstop",
            name => name,
        }
    }
}

/// Installs the requirements tooling with pip.
pub struct InstallDeps {
    context: Rc<TargetContext>,
    runner: Rc<dyn ToolRunner>,
}

impl InstallDeps {
    /// Creates the action.
    #[must_use]
    pub fn new(context: Rc<TargetContext>, runner: Rc<dyn ToolRunner>) -> Self {
        Self { context, runner }
    }
}

impl Action for InstallDeps {
    fn run(&self) -> Result<Outcome, ActionError> {
        install_deps(&self.context, self.runner.as_ref())
            .map(|packages| Outcome::Installed { packages })
    }
}

/// Runs `<python> -m pip install <deps>`.
///
/// # Errors
///
/// Returns an error if pip cannot be started or exits unsuccessfully.
pub fn install_deps(
    context: &TargetContext,
    runner: &dyn ToolRunner,
) -> Result<Vec<String>, ActionError> {
    let config = context.config();
    let mut args: Vec<OsString> = vec!["-m".into(), "pip".into(), "install".into()];
    args.extend(config.deps().iter().map(OsString::from));

    tracing::info!("Installing requirements management dependencies");
    runner
        .run(context.project_root(), config.python(), &args)?
        .ensure_success(config.python())?;

    Ok(config.deps().to_vec())
}

/// Validates the requirements tree with Doorstop.
pub struct Validate {
    context: Rc<TargetContext>,
    runner: Rc<dyn ToolRunner>,
}

impl Validate {
    /// Creates the action.
    #[must_use]
    pub fn new(context: Rc<TargetContext>, runner: Rc<dyn ToolRunner>) -> Self {
        Self { context, runner }
    }
}

impl Action for Validate {
    fn run(&self) -> Result<Outcome, ActionError> {
        validate(&self.context, self.runner.as_ref()).map(Outcome::Validated)
    }
}

/// Result of a successful validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationSummary {
    /// Project name, or `Doorstop` when unbranded.
    pub display_name: String,

    /// Item count per document prefix, in document directory order.
    pub counts: Vec<(String, usize)>,

    /// Warning lines reported by Doorstop.
    pub warnings: Vec<String>,

    /// Doorstop's standard output.
    pub report: String,
}

impl ValidationSummary {
    /// Total number of items across all documents.
    #[must_use]
    pub fn total(&self) -> usize {
        self.counts.iter().map(|(_, count)| count).sum()
    }
}

impl fmt::Display for ValidationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Item counts: ")?;
        for (prefix, count) in &self.counts {
            write!(f, "{prefix}={count}, ")?;
        }
        write!(f, "Total={}", self.total())
    }
}

/// Runs Doorstop's validation and counts the items in each document.
///
/// # Errors
///
/// Fails if the requirements directory is missing, Doorstop cannot be started,
/// Doorstop reports `ERROR` lines, or Doorstop exits unsuccessfully.
pub fn validate(
    context: &TargetContext,
    runner: &dyn ToolRunner,
) -> Result<ValidationSummary, ActionError> {
    let reqs_dir = context.reqs_dir();
    if !reqs_dir.is_dir() {
        return Err(ActionError::MissingReqsDir(PathBuf::from(
            context.config().reqs_dir(),
        )));
    }

    let doorstop = context.config().doorstop();
    let output = runner.capture(context.project_root(), doorstop, &[])?;

    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    for line in output.stderr.lines() {
        if line.contains("ERROR") {
            errors.push(line.to_string());
        } else if line.contains("WARNING") {
            warnings.push(line.to_string());
        }
    }

    let mut counts = Vec::new();
    for (dir, prefix) in context.documents() {
        let path = reqs_dir.join(&dir);
        if path.is_dir() {
            counts.push((prefix, count_items(&path)?));
        } else {
            tracing::debug!("Document directory {} does not exist", path.display());
        }
    }

    let summary = ValidationSummary {
        display_name: context.display_name().to_string(),
        counts,
        warnings,
        report: output.stdout.clone(),
    };
    tracing::info!("{summary}");

    if !errors.is_empty() {
        return Err(ActionError::Validation(errors));
    }
    output.ensure_success(doorstop)?;
    Ok(summary)
}

/// Counts Doorstop item files (`*.yml`, excluding dot-files) in a document
/// directory.
fn count_items(dir: &Path) -> Result<usize, ActionError> {
    let entries = fs::read_dir(dir).map_err(|e| ActionError::io(dir, e))?;
    let mut count = 0;
    for entry in entries {
        let name = entry.map_err(|e| ActionError::io(dir, e))?.file_name();
        let name = name.to_string_lossy();
        if name.ends_with(".yml") && !name.starts_with('.') {
            count += 1;
        }
    }
    Ok(count)
}

/// Publishes the requirements as post-processed HTML.
pub struct Publish {
    context: Rc<TargetContext>,
    runner: Rc<dyn ToolRunner>,
}

impl Publish {
    /// Creates the action.
    #[must_use]
    pub fn new(context: Rc<TargetContext>, runner: Rc<dyn ToolRunner>) -> Self {
        Self { context, runner }
    }
}

impl Action for Publish {
    fn run(&self) -> Result<Outcome, ActionError> {
        publish(&self.context, self.runner.as_ref()).map(Outcome::Published)
    }
}

/// A file left in the publish output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedFile {
    /// Path relative to the output directory.
    pub path: PathBuf,

    /// Size in bytes.
    pub bytes: u64,
}

/// Result of a successful publish.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishSummary {
    /// Project name, or `Doorstop` when unbranded.
    pub display_name: String,

    /// Where the HTML was published.
    pub output_dir: PathBuf,

    /// Number of HTML files post-processed.
    pub processed: usize,

    /// Whether Doorstop's bundled `template/` directory was removed.
    pub template_removed: bool,

    /// Published `.html` and `.csv` files, sorted.
    pub files: Vec<PublishedFile>,
}

/// Exports HTML with Doorstop, then post-processes it in place.
///
/// The output directory is recreated from scratch. After post-processing the
/// bundled `template/` directory is deleted, since pages now load their
/// assets from the CDN.
///
/// # Errors
///
/// Fails if the output directory cannot be recreated, Doorstop cannot be
/// started or exits unsuccessfully, the export is missing, or any page fails
/// to post-process. Cleanup still happens in the last case.
pub fn publish(
    context: &TargetContext,
    runner: &dyn ToolRunner,
) -> Result<PublishSummary, ActionError> {
    let output_dir = context.output_dir();
    if output_dir.exists() {
        fs::remove_dir_all(&output_dir).map_err(|e| ActionError::io(&output_dir, e))?;
    }
    fs::create_dir_all(&output_dir).map_err(|e| ActionError::io(&output_dir, e))?;

    let doorstop = context.config().doorstop();
    let args = [
        OsString::from("publish"),
        OsString::from("all"),
        output_dir.clone().into_os_string(),
    ];
    runner
        .run(context.project_root(), doorstop, &args)?
        .ensure_success(doorstop)?;

    tracing::info!("Post-processing HTML files");
    let report = postprocess_directory_with(&output_dir, &context.transformer)?;

    let template_dir = output_dir.join("template");
    let template_removed = template_dir.is_dir();
    if template_removed {
        fs::remove_dir_all(&template_dir).map_err(|e| ActionError::io(&template_dir, e))?;
        tracing::info!("Removed template/ directory (using CDN)");
    }

    if !report.is_success() {
        return Err(ActionError::Postprocess(report.failures().len()));
    }

    Ok(PublishSummary {
        display_name: context.display_name().to_string(),
        files: published_files(&output_dir),
        output_dir,
        processed: report.processed(),
        template_removed,
    })
}

fn published_files(output_dir: &Path) -> Vec<PublishedFile> {
    WalkDir::new(output_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            let extension = entry.path().extension();
            extension == Some(OsStr::new("html")) || extension == Some(OsStr::new("csv"))
        })
        .map(|entry| PublishedFile {
            path: entry
                .path()
                .strip_prefix(output_dir)
                .unwrap_or(entry.path())
                .to_path_buf(),
            bytes: entry.metadata().map_or(0, |m| m.len()),
        })
        .collect()
}

impl ActionError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
