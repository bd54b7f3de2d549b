use std::{
    collections::BTreeMap,
    io,
    path::{Path, PathBuf},
    rc::Rc,
};

mod actions;
mod graph;
/// Launching external tools.
pub mod runner;

pub use actions::{
    InstallDeps, Publish, PublishSummary, PublishedFile, TargetContext, Validate,
    ValidationSummary, install_deps, publish, validate,
};
pub use graph::{BuildEnvironment, TargetError, TargetGraph, TargetHandle};
use runner::{SystemRunner, ToolRunner};

use crate::{domain::Config, storage::WalkError};

/// Installs the requirements tooling.
pub const DEPS_TARGET: &str = "reqs-deps";

/// Validates the requirements tree.
pub const VALIDATE_TARGET: &str = "reqs-validate";

/// Publishes and post-processes HTML.
pub const PUBLISH_TARGET: &str = "reqs-publish";

/// A build action with a fixed signature.
pub trait Action {
    /// Runs the action to completion.
    ///
    /// # Errors
    ///
    /// Returns an error if the action fails; the target fails with it.
    fn run(&self) -> Result<Outcome, ActionError>;
}

/// What a successful action produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Dependencies were installed.
    Installed {
        /// The packages that were installed.
        packages: Vec<String>,
    },

    /// The requirements tree passed validation.
    Validated(ValidationSummary),

    /// HTML was published and post-processed.
    Published(PublishSummary),
}

/// Failure of a build action.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    /// An external tool could not be started.
    #[error("failed to start `{program}`: {source}")]
    Launch {
        /// The program that was invoked.
        program: String,
        /// Why it could not be started.
        #[source]
        source: io::Error,
    },

    /// An external tool exited unsuccessfully.
    #[error("`{program}` exited with {status}")]
    ToolFailed {
        /// The program that was invoked.
        program: String,
        /// Its exit status.
        status: String,
    },

    /// The requirements directory does not exist.
    #[error("{}/ directory not found", .0.display())]
    MissingReqsDir(PathBuf),

    /// Doorstop reported errors.
    #[error("validation failed with {} error(s)", .0.len())]
    Validation(Vec<String>),

    /// The exported HTML directory is missing.
    #[error(transparent)]
    Export(#[from] WalkError),

    /// Some exported pages could not be post-processed.
    #[error("failed to post-process {0} HTML file(s)")]
    Postprocess(usize),

    /// A filesystem operation failed.
    #[error("{}: {source}", path.display())]
    Io {
        /// The path being operated on.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: io::Error,
    },
}

/// Registers the `reqs-deps`, `reqs-validate` and `reqs-publish` targets.
///
/// Tools are launched as child processes. See
/// [`register_targets_with_runner`].
pub fn register_targets<E: BuildEnvironment>(
    env: &mut E,
    project_root: &Path,
    config: &Config,
) -> BTreeMap<&'static str, E::Handle> {
    register_targets_with_runner(env, project_root, config, Rc::new(SystemRunner))
}

/// Registers the three requirements targets, launching tools through
/// `runner`.
///
/// All targets are always-build: their results depend on the state of the
/// requirements tree and the installed tools, not on declared files.
/// Documents are resolved each time an action runs, so discovery sees the
/// tree as it is at that moment.
pub fn register_targets_with_runner<E: BuildEnvironment>(
    env: &mut E,
    project_root: &Path,
    config: &Config,
    runner: Rc<dyn ToolRunner>,
) -> BTreeMap<&'static str, E::Handle> {
    let context = Rc::new(TargetContext::new(project_root, config.clone()));

    let actions: [(&'static str, Box<dyn Action>); 3] = [
        (
            DEPS_TARGET,
            Box::new(InstallDeps::new(context.clone(), runner.clone())),
        ),
        (
            VALIDATE_TARGET,
            Box::new(Validate::new(context.clone(), runner.clone())),
        ),
        (PUBLISH_TARGET, Box::new(Publish::new(context, runner))),
    ];

    actions
        .into_iter()
        .map(|(name, action)| {
            let handle = env.command(name, action);
            env.always_build(&handle);
            (name, handle)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, ffi::OsString, fs};

    use tempfile::TempDir;

    use super::{runner::ToolOutput, *};

    const EXPORTED_INDEX: &str = "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\" />\n<link rel=\"stylesheet\" href=\"template/bootstrap.min.css\" />\n<title>Doorstop index</title>\n</head>\n<body>\n<main>\n<H1>Doorstop index</H1>\n</main>\n</body>\n</html>\n";

    /// Records invocations and mimics Doorstop's side effects.
    #[derive(Default)]
    struct FakeRunner {
        calls: RefCell<Vec<Vec<OsString>>>,
        stderr: String,
        fail: bool,
        broken_page: bool,
    }

    impl FakeRunner {
        fn output(&self) -> ToolOutput {
            ToolOutput {
                success: !self.fail,
                status: (if self.fail { "exit status: 1" } else { "exit status: 0" }).to_string(),
                stdout: "building tree...\n".to_string(),
                stderr: self.stderr.clone(),
            }
        }

        fn record(&self, program: &str, args: &[OsString]) {
            let mut call = vec![OsString::from(program)];
            call.extend(args.iter().cloned());
            self.calls.borrow_mut().push(call);
        }
    }

    impl ToolRunner for FakeRunner {
        fn run(
            &self,
            _dir: &Path,
            program: &str,
            args: &[OsString],
        ) -> Result<ToolOutput, ActionError> {
            self.record(program, args);
            if !self.fail && args.first().is_some_and(|arg| arg == "publish") {
                let out = PathBuf::from(&args[2]);
                fs::create_dir_all(out.join("documents")).unwrap();
                fs::create_dir_all(out.join("template")).unwrap();
                fs::write(out.join("index.html"), EXPORTED_INDEX).unwrap();
                fs::write(out.join("documents/REQ.html"), EXPORTED_INDEX).unwrap();
                fs::write(out.join("documents/REQ.csv"), "uid,text\n").unwrap();
                fs::write(out.join("template/bootstrap.min.css"), "body{}").unwrap();
                if self.broken_page {
                    fs::write(out.join("documents/UI.html"), [0xff, 0xfe, 0x00]).unwrap();
                }
            }
            Ok(self.output())
        }

        fn capture(
            &self,
            _dir: &Path,
            program: &str,
            args: &[OsString],
        ) -> Result<ToolOutput, ActionError> {
            self.record(program, args);
            Ok(self.output())
        }
    }

    fn project() -> TempDir {
        let tmp = TempDir::new().unwrap();
        add_documents(tmp.path());
        tmp
    }

    fn add_documents(root: &Path) {
        let reqs = root.join("reqs");
        for (dir, prefix, items) in [("req", "REQ", 3), ("ui", "UI", 2)] {
            let doc = reqs.join(dir);
            fs::create_dir_all(&doc).unwrap();
            fs::write(doc.join(".doorstop.yml"), format!("settings:\n  prefix: {prefix}\n"))
                .unwrap();
            for i in 1..=items {
                fs::write(doc.join(format!("{prefix}00{i}.yml")), "text: x\n").unwrap();
            }
            fs::write(doc.join("notes.md"), "not an item").unwrap();
        }
    }

    fn graph_with(root: &Path, config: &Config, runner: FakeRunner) -> (TargetGraph, Rc<FakeRunner>) {
        let runner = Rc::new(runner);
        let mut graph = TargetGraph::new();
        register_targets_with_runner(&mut graph, root, config, runner.clone());
        (graph, runner)
    }

    #[test]
    fn registers_three_always_build_targets() {
        let tmp = project();
        let mut graph = TargetGraph::new();
        let handles = register_targets(&mut graph, tmp.path(), &Config::default());

        assert_eq!(
            handles.keys().copied().collect::<Vec<_>>(),
            [DEPS_TARGET, PUBLISH_TARGET, VALIDATE_TARGET]
        );
        assert_eq!(handles[PUBLISH_TARGET].name(), "reqs-publish");
        for name in [DEPS_TARGET, VALIDATE_TARGET, PUBLISH_TARGET] {
            assert!(graph.is_always_build(name), "{name}");
        }
    }

    #[test]
    fn deps_invokes_pip() {
        let tmp = project();
        let (mut graph, runner) = graph_with(tmp.path(), &Config::default(), FakeRunner::default());

        let outcome = graph.build(DEPS_TARGET).unwrap().unwrap();

        assert_eq!(
            outcome,
            Outcome::Installed {
                packages: vec!["doorstop".to_string()]
            }
        );
        assert_eq!(
            runner.calls.borrow()[0],
            ["python3", "-m", "pip", "install", "doorstop"]
        );
    }

    #[test]
    fn validate_counts_discovered_items() {
        let tmp = project();
        let runner = FakeRunner {
            stderr: "WARNING: REQ002: no links\n".to_string(),
            ..FakeRunner::default()
        };
        let (mut graph, runner) = graph_with(tmp.path(), &Config::new("Acme"), runner);

        let Some(Outcome::Validated(summary)) = graph.build(VALIDATE_TARGET).unwrap() else {
            panic!("expected a validation summary");
        };

        assert_eq!(summary.display_name, "Acme");
        assert_eq!(
            summary.counts,
            [("REQ".to_string(), 3), ("UI".to_string(), 2)]
        );
        assert_eq!(summary.total(), 5);
        assert_eq!(summary.warnings, ["WARNING: REQ002: no links"]);
        assert_eq!(summary.to_string(), "Item counts: REQ=3, UI=2, Total=5");
        assert_eq!(runner.calls.borrow()[0], ["doorstop"]);
    }

    #[test]
    fn validate_uses_explicit_documents() {
        let tmp = project();
        let config = Config::default().with_documents(BTreeMap::from([(
            "ui".to_string(),
            "UI".to_string(),
        )]));
        let (mut graph, _) = graph_with(tmp.path(), &config, FakeRunner::default());

        let Some(Outcome::Validated(summary)) = graph.build(VALIDATE_TARGET).unwrap() else {
            panic!("expected a validation summary");
        };
        assert_eq!(summary.counts, [("UI".to_string(), 2)]);
        assert_eq!(summary.display_name, "Doorstop");
    }

    #[test]
    fn validate_fails_on_reported_errors() {
        let tmp = project();
        let runner = FakeRunner {
            stderr: "ERROR: REQ001: suspect link\n".to_string(),
            ..FakeRunner::default()
        };
        let (mut graph, _) = graph_with(tmp.path(), &Config::default(), runner);

        let errors = match graph.build(VALIDATE_TARGET) {
            Err(TargetError::Failed {
                source: ActionError::Validation(errors),
                ..
            }) => errors,
            other => panic!("expected validation failure, got {other:?}"),
        };
        assert_eq!(errors, ["ERROR: REQ001: suspect link"]);
    }

    #[test]
    fn validate_fails_on_tool_failure() {
        let tmp = project();
        let runner = FakeRunner {
            fail: true,
            ..FakeRunner::default()
        };
        let (mut graph, _) = graph_with(tmp.path(), &Config::default(), runner);

        let error = graph.build(VALIDATE_TARGET).unwrap_err();
        assert!(matches!(
            error,
            TargetError::Failed {
                source: ActionError::ToolFailed { .. },
                ..
            }
        ));
    }

    #[test]
    fn validate_requires_reqs_dir() {
        let tmp = TempDir::new().unwrap();
        let (mut graph, runner) = graph_with(tmp.path(), &Config::default(), FakeRunner::default());

        let error = graph.build(VALIDATE_TARGET).unwrap_err();
        assert_eq!(error.to_string(), "target `reqs-validate` failed: reqs/ directory not found");
        assert!(runner.calls.borrow().is_empty());
    }

    #[test]
    fn publish_exports_and_postprocesses() {
        let tmp = project();
        let stale = tmp.path().join("reqs/output/stale.html");
        fs::create_dir_all(stale.parent().unwrap()).unwrap();
        fs::write(&stale, "old").unwrap();
        let (mut graph, runner) = graph_with(tmp.path(), &Config::new("Acme"), FakeRunner::default());

        let Some(Outcome::Published(summary)) = graph.build(PUBLISH_TARGET).unwrap() else {
            panic!("expected a publish summary");
        };

        let output = tmp.path().join("reqs/output");
        assert_eq!(summary.output_dir, output);
        assert_eq!(summary.processed, 2);
        assert!(summary.template_removed);
        assert!(!output.join("template").exists());
        assert!(!stale.exists());
        assert_eq!(
            summary
                .files
                .iter()
                .map(|f| f.path.clone())
                .collect::<Vec<_>>(),
            [
                PathBuf::from("documents/REQ.csv"),
                PathBuf::from("documents/REQ.html"),
                PathBuf::from("index.html"),
            ]
        );

        let index = fs::read_to_string(output.join("index.html")).unwrap();
        assert!(index.contains("<title>Acme Requirements</title>"));
        assert!(index.contains("cdn.jsdelivr.net"));
        assert!(!index.contains("template/bootstrap.min.css"));

        let calls = runner.calls.borrow();
        assert_eq!(calls[0][..3], ["doorstop", "publish", "all"]);
    }

    #[test]
    fn publish_fails_after_cleanup_when_a_page_cannot_be_processed() {
        let tmp = project();
        let runner = FakeRunner {
            broken_page: true,
            ..FakeRunner::default()
        };
        let (mut graph, _) = graph_with(tmp.path(), &Config::new("Acme"), runner);

        let error = graph.build(PUBLISH_TARGET).unwrap_err();

        assert!(matches!(
            error,
            TargetError::Failed {
                source: ActionError::Postprocess(1),
                ..
            }
        ));
        let output = tmp.path().join("reqs/output");
        assert!(!output.join("template").exists());
        let index = fs::read_to_string(output.join("index.html")).unwrap();
        assert!(index.contains("<title>Acme Requirements</title>"));
    }

    #[cfg(unix)]
    #[test]
    fn publish_passes_non_utf8_output_path_unchanged() {
        use std::os::unix::ffi::OsStrExt;

        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join(std::ffi::OsStr::from_bytes(b"project-\xff"));
        add_documents(&root);
        let (mut graph, runner) = graph_with(&root, &Config::default(), FakeRunner::default());

        let Some(Outcome::Published(summary)) = graph.build(PUBLISH_TARGET).unwrap() else {
            panic!("expected a publish summary");
        };

        let output = root.join("reqs/output");
        assert_eq!(summary.output_dir, output);
        assert_eq!(summary.processed, 2);
        assert_eq!(runner.calls.borrow()[0][3], output.into_os_string());
    }

    #[test]
    fn publish_stops_when_export_fails() {
        let tmp = project();
        let runner = FakeRunner {
            fail: true,
            ..FakeRunner::default()
        };
        let (mut graph, _) = graph_with(tmp.path(), &Config::default(), runner);

        let error = graph.build(PUBLISH_TARGET).unwrap_err();
        assert!(matches!(
            error,
            TargetError::Failed {
                source: ActionError::ToolFailed { .. },
                ..
            }
        ));
        let output = tmp.path().join("reqs/output");
        assert_eq!(fs::read_dir(output).unwrap().count(), 0);
    }

    #[test]
    fn deps_failure_does_not_block_other_targets() {
        let tmp = project();
        let runner = FakeRunner {
            fail: true,
            ..FakeRunner::default()
        };
        let (mut graph, _) = graph_with(tmp.path(), &Config::default(), runner);

        assert!(graph.build(DEPS_TARGET).is_err());
        assert!(matches!(
            graph.build(VALIDATE_TARGET),
            Err(TargetError::Failed {
                source: ActionError::ToolFailed { .. },
                ..
            })
        ));
    }
}
