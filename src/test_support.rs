use crate::agenda::BuildTarget;
use crate::context::BuildContext;
use crate::driver::{
    BackendRun, CompilerDriver, DirectBuild, DistributedBackend, GraphExport, LocalExecutor,
};
use crate::error::{MeldError, Result};
use crate::graph::{ActionFile, ActionGraph, Environment, GraphItem, Task, Tool, Variable};
use crate::manifest::Manifest;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, Mutex, MutexGuard};
use tempfile::TempDir;

static CWD_LOCK: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

pub(crate) struct DirGuard {
    original: PathBuf,
    _lock: MutexGuard<'static, ()>,
}

impl DirGuard {
    pub(crate) fn new(new_dir: &Path) -> Self {
        // Changing the process current working directory is global and not thread-safe.
        // Lock it so tests don't race even if a #[serial] annotation is missed.
        let lock = CWD_LOCK.lock().unwrap_or_else(|poison| poison.into_inner());
        let original = std::env::current_dir().unwrap();
        std::env::set_current_dir(new_dir).unwrap();
        Self {
            original,
            _lock: lock,
        }
    }
}

impl Drop for DirGuard {
    fn drop(&mut self) {
        let _ = std::env::set_current_dir(&self.original);
    }
}

/// A temp build root with the `.meld` layout created.
pub(crate) fn create_test_context() -> (TempDir, BuildContext) {
    let temp_dir = TempDir::new().unwrap();
    let ctx = BuildContext::at(temp_dir.path());
    ctx.ensure_dirs().unwrap();
    (temp_dir, ctx)
}

// ============================================================================
// Graph builders
// ============================================================================

pub(crate) fn env(pairs: &[(&str, &str)]) -> Environment {
    Environment::new(pairs.iter().map(|(n, v)| Variable::new(*n, *v)).collect())
}

/// An action file under a fixed `PATH=/bin` environment.
pub(crate) fn action_file(tools: Vec<Tool>, tasks: Vec<Task>) -> ActionFile {
    ActionFile {
        origin: PathBuf::new(),
        environment: env(&[("PATH", "/bin")]),
        tools,
        tasks,
    }
}

/// A graph item with the given files and no declared outputs.
pub(crate) fn graph_item(target: BuildTarget, files: Vec<ActionFile>) -> GraphItem {
    GraphItem {
        target,
        manifest: Manifest::default(),
        graph: ActionGraph::new(files),
    }
}

pub(crate) fn target(name: &str) -> BuildTarget {
    BuildTarget::new(name, "Win64", "Development")
}

/// Create every file in `paths`, with parent directories.
pub(crate) fn touch_all(paths: &[PathBuf]) {
    for path in paths {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, b"built").unwrap();
    }
}

// ============================================================================
// Compiler driver fake
// ============================================================================

/// One call a [`FakeDriver`] received, identified by target caption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DriverCall {
    GenerateGraph(String),
    BuildDirect(String),
    QueryManifest(String),
    PostBuild(String),
}

/// In-memory compiler driver.
///
/// Graph exports and manifests are registered per target name. A successful
/// direct build creates the files its manifest declares.
#[derive(Default)]
pub(crate) struct FakeDriver {
    calls: RefCell<Vec<DriverCall>>,
    exports: HashMap<String, GraphExport>,
    manifests: HashMap<String, Manifest>,
    direct_exit_codes: HashMap<String, i32>,
    failing_graphs: Vec<String>,
}

impl FakeDriver {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Declare the graph and manifest exported for `target`.
    pub(crate) fn with_graph(
        mut self,
        target: &str,
        files: Vec<ActionFile>,
        manifest: Manifest,
    ) -> Self {
        self.manifests.insert(target.to_string(), manifest.clone());
        self.exports.insert(
            target.to_string(),
            GraphExport {
                graph: ActionGraph::new(files),
                manifest,
            },
        );
        self
    }

    /// Declare the manifest reported for `target` by direct builds and queries.
    pub(crate) fn with_manifest(mut self, target: &str, manifest: Manifest) -> Self {
        self.manifests.insert(target.to_string(), manifest);
        self
    }

    pub(crate) fn with_direct_exit_code(mut self, target: &str, exit_code: i32) -> Self {
        self.direct_exit_codes.insert(target.to_string(), exit_code);
        self
    }

    /// Make graph generation for `target` fail as if the driver crashed.
    pub(crate) fn with_failing_graph(mut self, target: &str) -> Self {
        self.failing_graphs.push(target.to_string());
        self
    }

    pub(crate) fn calls(&self) -> Vec<DriverCall> {
        self.calls.borrow().clone()
    }

    /// Position of the first call equal to `call`.
    pub(crate) fn position(&self, call: &DriverCall) -> Option<usize> {
        self.calls.borrow().iter().position(|c| c == call)
    }

    pub(crate) fn post_build_count(&self) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| matches!(c, DriverCall::PostBuild(_)))
            .count()
    }

    fn manifest_for(&self, target: &BuildTarget) -> Manifest {
        self.manifests.get(&target.name).cloned().unwrap_or_default()
    }
}

impl CompilerDriver for FakeDriver {
    fn generate_graph(&self, target: &BuildTarget) -> Result<GraphExport> {
        self.calls
            .borrow_mut()
            .push(DriverCall::GenerateGraph(target.caption()));
        if self.failing_graphs.contains(&target.name) {
            return Err(MeldError::DriverError(format!(
                "graph export for {} failed",
                target
            )));
        }
        Ok(self.exports.get(&target.name).cloned().unwrap_or_default())
    }

    fn build_direct(&self, target: &BuildTarget) -> Result<DirectBuild> {
        self.calls
            .borrow_mut()
            .push(DriverCall::BuildDirect(target.caption()));
        let manifest = self.manifest_for(target);
        let exit_code = self
            .direct_exit_codes
            .get(&target.name)
            .copied()
            .unwrap_or(0);
        if exit_code == 0 {
            touch_all(&manifest.build_products);
        }
        Ok(DirectBuild {
            exit_code,
            manifest,
        })
    }

    fn query_manifest(&self, target: &BuildTarget) -> Result<Manifest> {
        self.calls
            .borrow_mut()
            .push(DriverCall::QueryManifest(target.caption()));
        Ok(self.manifest_for(target))
    }

    fn post_build(&self, target: &BuildTarget) -> Result<()> {
        self.calls
            .borrow_mut()
            .push(DriverCall::PostBuild(target.caption()));
        Ok(())
    }
}

// ============================================================================
// Backend fakes
// ============================================================================

/// Distributed backend replaying a queue of `(exit code, output)` responses.
///
/// Once the queue is empty every run succeeds. A successful run creates
/// the `produces` files. Each call records whether all `watched` files
/// existed at that moment.
pub(crate) struct ScriptedBackend {
    responses: RefCell<VecDeque<(i32, String)>>,
    produces: Vec<PathBuf>,
    watched: Vec<PathBuf>,
    observed: RefCell<Vec<bool>>,
    available: bool,
}

impl ScriptedBackend {
    pub(crate) fn new<I>(responses: I) -> Self
    where
        I: IntoIterator<Item = (i32, &'static str)>,
    {
        Self {
            responses: RefCell::new(
                responses
                    .into_iter()
                    .map(|(code, out)| (code, out.to_string()))
                    .collect(),
            ),
            produces: Vec::new(),
            watched: Vec::new(),
            observed: RefCell::new(Vec::new()),
            available: true,
        }
    }

    /// A backend whose every run succeeds.
    pub(crate) fn succeeding() -> Self {
        Self::new(Vec::<(i32, &'static str)>::new())
    }

    pub(crate) fn producing(mut self, paths: Vec<PathBuf>) -> Self {
        self.produces = paths;
        self
    }

    pub(crate) fn watching(mut self, paths: Vec<PathBuf>) -> Self {
        self.watched = paths;
        self
    }

    pub(crate) fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    pub(crate) fn call_count(&self) -> usize {
        self.observed.borrow().len()
    }

    /// For each call, whether every watched file existed when it started.
    pub(crate) fn observed(&self) -> Vec<bool> {
        self.observed.borrow().clone()
    }
}

impl DistributedBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn run(&self, graph_file: &Path, _stop_on_errors: bool) -> Result<BackendRun> {
        assert!(graph_file.is_file(), "graph file must be written before the backend runs");
        self.observed
            .borrow_mut()
            .push(self.watched.iter().all(|p| p.exists()));

        let (exit_code, output) = self
            .responses
            .borrow_mut()
            .pop_front()
            .unwrap_or((0, "------Project: Env_0".to_string()));
        if exit_code == 0 {
            touch_all(&self.produces);
        }
        Ok(BackendRun {
            exit_code,
            output,
            log_path: None,
        })
    }
}

/// Local executor returning a fixed exit code.
pub(crate) struct FakeLocalExecutor {
    exit_code: i32,
    produces: Vec<PathBuf>,
    available: bool,
    calls: Cell<usize>,
}

impl FakeLocalExecutor {
    pub(crate) fn new(exit_code: i32) -> Self {
        Self {
            exit_code,
            produces: Vec::new(),
            available: true,
            calls: Cell::new(0),
        }
    }

    pub(crate) fn producing(mut self, paths: Vec<PathBuf>) -> Self {
        self.produces = paths;
        self
    }

    pub(crate) fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.get()
    }
}

impl LocalExecutor for FakeLocalExecutor {
    fn is_available(&self) -> bool {
        self.available
    }

    fn run(&self, graph_file: &Path) -> Result<i32> {
        assert!(graph_file.is_file(), "graph file must be written before the executor runs");
        self.calls.set(self.calls.get() + 1);
        if self.exit_code == 0 {
            touch_all(&self.produces);
        }
        Ok(self.exit_code)
    }
}
