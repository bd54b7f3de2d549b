use std::collections::{BTreeMap, BTreeSet};

use crate::targets::{Action, ActionError, Outcome};

/// A build system that targets can be registered with.
pub trait BuildEnvironment {
    /// Reference to a registered target.
    type Handle;

    /// Registers `action` under the target `name`.
    fn command(&mut self, name: &str, action: Box<dyn Action>) -> Self::Handle;

    /// Marks a target as always out of date, so it runs every time it is
    /// requested.
    fn always_build(&mut self, handle: &Self::Handle);
}

/// Failure to build a target.
#[derive(Debug, thiserror::Error)]
pub enum TargetError {
    /// No target with this name is registered.
    #[error("unknown target `{0}`")]
    Unknown(String),

    /// The target's action failed.
    #[error("target `{target}` failed: {source}")]
    Failed {
        /// Name of the failing target.
        target: String,
        /// Why the action failed.
        #[source]
        source: ActionError,
    },
}

/// Handle to a target registered in a [`TargetGraph`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetHandle(String);

impl TargetHandle {
    /// The target's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }
}

struct Target {
    action: Box<dyn Action>,
    always_build: bool,
}

/// A minimal in-process build environment.
///
/// Targets marked [`always_build`](BuildEnvironment::always_build) run on
/// every request; other targets run at most once per graph.
#[derive(Default)]
pub struct TargetGraph {
    targets: BTreeMap<String, Target>,
    built: BTreeSet<String>,
}

impl TargetGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `name` is registered and marked always-build.
    #[must_use]
    pub fn is_always_build(&self, name: &str) -> bool {
        self.targets.get(name).is_some_and(|t| t.always_build)
    }

    /// Builds a target.
    ///
    /// Returns `None` if the target was already built and is not
    /// always-build.
    ///
    /// # Errors
    ///
    /// Returns an error if the target is unknown or its action fails.
    pub fn build(&mut self, name: &str) -> Result<Option<Outcome>, TargetError> {
        let target = self
            .targets
            .get(name)
            .ok_or_else(|| TargetError::Unknown(name.to_string()))?;

        if !target.always_build && self.built.contains(name) {
            tracing::debug!("Target `{name}` is up to date");
            return Ok(None);
        }

        tracing::info!("Building target `{name}`");
        let outcome = target.action.run().map_err(|source| TargetError::Failed {
            target: name.to_string(),
            source,
        })?;
        self.built.insert(name.to_string());
        Ok(Some(outcome))
    }
}

impl BuildEnvironment for TargetGraph {
    type Handle = TargetHandle;

    fn command(&mut self, name: &str, action: Box<dyn Action>) -> TargetHandle {
        let target = Target {
            action,
            always_build: false,
        };
        if self.targets.insert(name.to_string(), target).is_some() {
            tracing::warn!("Target `{name}` was registered twice; keeping the latest");
        }
        TargetHandle(name.to_string())
    }

    fn always_build(&mut self, handle: &TargetHandle) {
        if let Some(target) = self.targets.get_mut(handle.name()) {
            target.always_build = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::Cell, rc::Rc};

    use super::*;

    struct Counting(Rc<Cell<usize>>);

    impl Action for Counting {
        fn run(&self) -> Result<Outcome, ActionError> {
            self.0.set(self.0.get() + 1);
            Ok(Outcome::Installed {
                packages: Vec::new(),
            })
        }
    }

    struct Failing;

    impl Action for Failing {
        fn run(&self) -> Result<Outcome, ActionError> {
            Err(ActionError::ToolFailed {
                program: "doorstop".to_string(),
                status: "exit status: 1".to_string(),
            })
        }
    }

    #[test]
    fn always_build_targets_rerun() {
        let runs = Rc::new(Cell::new(0));
        let mut graph = TargetGraph::new();
        let handle = graph.command("t", Box::new(Counting(runs.clone())));
        graph.always_build(&handle);

        assert!(graph.build("t").unwrap().is_some());
        assert!(graph.build("t").unwrap().is_some());
        assert_eq!(runs.get(), 2);
        assert!(graph.is_always_build("t"));
    }

    #[test]
    fn other_targets_run_once() {
        let runs = Rc::new(Cell::new(0));
        let mut graph = TargetGraph::new();
        graph.command("t", Box::new(Counting(runs.clone())));

        assert!(graph.build("t").unwrap().is_some());
        assert!(graph.build("t").unwrap().is_none());
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn unknown_target_is_an_error() {
        let mut graph = TargetGraph::new();
        let error = graph.build("missing").unwrap_err();
        assert!(matches!(error, TargetError::Unknown(name) if name == "missing"));
    }

    #[test]
    fn failure_is_scoped_to_its_target() {
        let runs = Rc::new(Cell::new(0));
        let mut graph = TargetGraph::new();
        graph.command("bad", Box::new(Failing));
        graph.command("good", Box::new(Counting(runs.clone())));

        let error = graph.build("bad").unwrap_err();
        assert_eq!(
            error.to_string(),
            "target `bad` failed: `doorstop` exited with exit status: 1"
        );
        assert!(graph.build("good").is_ok());
        assert_eq!(runs.get(), 1);
    }
}
