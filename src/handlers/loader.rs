//! Unit loading with reload-on-change.
//!
//! # Responsibilities
//! - Compile a unit and run its top-level statements once per version
//! - Detect source changes on every load when hot reload is on
//! - Fall back to the last good version when a reload fails
//!
//! # Design Decisions
//! - The cache is keyed by file path and holds `Arc`s, so an invocation keeps
//!   using the version it started with even if a reload lands meanwhile
//! - A failed first load is an error; a failed reload is only a warning

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use rhai::{Engine, FnAccess, AST};
use thiserror::Error;

use crate::observability::metrics;

/// Why a unit could not be loaded.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Compile(String),

    #[error("top-level statements failed: {0}")]
    Evaluate(String),
}

/// One compiled version of a unit.
#[derive(Debug)]
pub struct HandlerUnit {
    /// Path relative to the handler root, e.g. `users/list.rhai`.
    pub id: String,
    pub path: PathBuf,
    pub ast: AST,
    source: String,
    routines: BTreeSet<String>,
}

impl HandlerUnit {
    /// True when the unit defines a public function with this name.
    pub fn exposes(&self, routine: &str) -> bool {
        self.routines.contains(routine)
    }

    pub fn routines(&self) -> impl Iterator<Item = &str> {
        self.routines.iter().map(String::as_str)
    }
}

/// Compiles units on demand and caches the latest good version of each.
pub struct UnitLoader {
    engine: Arc<Engine>,
    units: DashMap<PathBuf, Arc<HandlerUnit>>,
}

impl UnitLoader {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self {
            engine,
            units: DashMap::new(),
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Number of cached units.
    pub fn cached(&self) -> usize {
        self.units.len()
    }

    /// Return the current version of the unit at `path`.
    ///
    /// With `hot_reload` off a cached unit is returned without touching the
    /// file. With it on, the file is re-read and recompiled when its content
    /// differs from the cached version.
    pub fn load(&self, path: &Path, id: &str, hot_reload: bool) -> Result<Arc<HandlerUnit>, LoadError> {
        let cached = self.units.get(path).map(|entry| Arc::clone(entry.value()));

        if let Some(unit) = &cached {
            if !hot_reload {
                return Ok(Arc::clone(unit));
            }
        }

        let source = match fs::read_to_string(path) {
            Ok(source) => source,
            Err(source) => {
                let err = LoadError::Read {
                    path: path.display().to_string(),
                    source,
                };
                return self.fall_back(cached, id, err);
            }
        };

        if let Some(unit) = &cached {
            if unit.source == source {
                metrics::record_unit_load("reused");
                return Ok(Arc::clone(unit));
            }
        }

        match self.compile(path, id, source) {
            Ok(unit) => {
                let unit = Arc::new(unit);
                self.units.insert(path.to_path_buf(), Arc::clone(&unit));
                metrics::record_unit_load("compiled");
                tracing::debug!(
                    unit = %id,
                    reload = cached.is_some(),
                    routines = unit.routines.len(),
                    "Unit loaded"
                );
                Ok(unit)
            }
            Err(err) => self.fall_back(cached, id, err),
        }
    }

    fn fall_back(
        &self,
        cached: Option<Arc<HandlerUnit>>,
        id: &str,
        err: LoadError,
    ) -> Result<Arc<HandlerUnit>, LoadError> {
        metrics::record_unit_load("failed");
        match cached {
            Some(previous) => {
                tracing::warn!(
                    unit = %id,
                    error = %err,
                    "Reload failed, using previously loaded version"
                );
                Ok(previous)
            }
            None => Err(err),
        }
    }

    fn compile(&self, path: &Path, id: &str, source: String) -> Result<HandlerUnit, LoadError> {
        let mut ast = self
            .engine
            .compile(&source)
            .map_err(|e| LoadError::Compile(e.to_string()))?;
        ast.set_source(id);

        self.engine
            .run_ast(&ast)
            .map_err(|e| LoadError::Evaluate(e.to_string()))?;

        let routines = ast
            .iter_functions()
            .filter(|f| !matches!(f.access, FnAccess::Private))
            .map(|f| f.name.to_string())
            .collect();

        Ok(HandlerUnit {
            id: id.to_string(),
            path: path.to_path_buf(),
            ast,
            source,
            routines,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::engine::handler_engine;
    use tempfile::TempDir;

    fn loader() -> UnitLoader {
        UnitLoader::new(Arc::new(handler_engine()))
    }

    fn write(dir: &TempDir, name: &str, source: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, source).unwrap();
        path
    }

    #[test]
    fn test_public_routines_only() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "a.rhai",
            "fn handle_request(req) { 1 }\nfn list(req) { 2 }\nprivate fn helper() { 3 }\n",
        );
        let unit = loader().load(&path, "a.rhai", true).unwrap();

        assert!(unit.exposes("handle_request"));
        assert!(unit.exposes("list"));
        assert!(!unit.exposes("helper"));
        assert_eq!(unit.routines().collect::<Vec<_>>(), vec!["handle_request", "list"]);
    }

    #[test]
    fn test_unchanged_source_reuses_unit() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "a.rhai", "fn f(r) { 1 }");
        let loader = loader();

        let first = loader.load(&path, "a.rhai", true).unwrap();
        let second = loader.load(&path, "a.rhai", true).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_changed_source_recompiles() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "a.rhai", "fn f(r) { 1 }");
        let loader = loader();
        loader.load(&path, "a.rhai", true).unwrap();

        write(&dir, "a.rhai", "fn f(r) { 1 }\nfn g(r) { 2 }");
        let unit = loader.load(&path, "a.rhai", true).unwrap();
        assert!(unit.exposes("g"));
        assert_eq!(loader.cached(), 1);
    }

    #[test]
    fn test_failed_reload_keeps_previous_version() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "a.rhai", "fn f(r) { 1 }");
        let loader = loader();
        loader.load(&path, "a.rhai", true).unwrap();

        write(&dir, "a.rhai", "fn f(r) { 1 ");
        let unit = loader.load(&path, "a.rhai", true).unwrap();
        assert!(unit.exposes("f"));

        fs::remove_file(&path).unwrap();
        assert!(loader.load(&path, "a.rhai", true).is_ok());
    }

    #[test]
    fn test_first_load_failure_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "bad.rhai", "fn f(r) {");
        let err = loader().load(&path, "bad.rhai", true).unwrap_err();
        assert!(matches!(err, LoadError::Compile(_)));

        let path = write(&dir, "throws.rhai", "throw \"boom\";\nfn f(r) { 1 }");
        let err = loader().load(&path, "throws.rhai", true).unwrap_err();
        assert!(matches!(err, LoadError::Evaluate(_)));
    }

    #[test]
    fn test_reload_disabled_pins_first_version() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "a.rhai", "fn f(r) { 1 }");
        let loader = loader();
        loader.load(&path, "a.rhai", false).unwrap();

        write(&dir, "a.rhai", "fn g(r) { 2 }");
        let unit = loader.load(&path, "a.rhai", false).unwrap();
        assert!(unit.exposes("f"));
        assert!(!unit.exposes("g"));
    }
}
