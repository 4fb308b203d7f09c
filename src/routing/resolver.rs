//! Path → routine resolution.
//!
//! # Responsibilities
//! - Reject traversal before touching the filesystem
//! - Try the single-handler convention, then module + function
//! - Load (or reload) the chosen unit through the loader
//!
//! # Design Decisions
//! - A unit at the exact path decides the outcome on its own: it either
//!   defines `handle_request` or the request fails with a configuration
//!   error. Convention 2 is only tried when no such unit exists.
//! - Resolution is recomputed for every request; only compiled units are cached

use std::sync::Arc;

use serde::Serialize;

use crate::config::HandlerConfig;
use crate::error::DispatchError;
use crate::handlers::{HandlerUnit, UnitLoader};
use crate::routing::path::{has_traversal, is_identifier, is_routable_segment, segments, UnitLocation};

/// Routine a single-handler unit must define.
pub const ENTRY_ROUTINE: &str = "handle_request";

/// Which convention produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum InvocationStyle {
    SingleHandler,
    ModuleFunction,
}

impl InvocationStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SingleHandler => "single-handler",
            Self::ModuleFunction => "module-function",
        }
    }
}

/// What to load and what to call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerDescriptor {
    pub unit: String,
    pub routine: String,
    pub style: InvocationStyle,
}

/// A descriptor plus the loaded unit it points at.
pub struct Resolution {
    pub descriptor: HandlerDescriptor,
    pub unit: Arc<HandlerUnit>,
}

/// Resolves request paths against the handler root.
pub struct Resolver<'a> {
    config: &'a HandlerConfig,
    loader: &'a UnitLoader,
}

impl<'a> Resolver<'a> {
    pub fn new(config: &'a HandlerConfig, loader: &'a UnitLoader) -> Self {
        Self { config, loader }
    }

    /// Resolve a decoded URL path.
    pub fn resolve(&self, path: &str) -> Result<Resolution, DispatchError> {
        if has_traversal(path) {
            return Err(DispatchError::Traversal(path.to_string()));
        }

        let segments = segments(path);
        let not_found = || DispatchError::NotFound(path.to_string());
        if segments.is_empty() || !segments.iter().all(|s| is_routable_segment(s)) {
            return Err(not_found());
        }

        let single = self.locate(&segments);
        if self.is_unit(&single) {
            let unit = self.load(&single)?;
            if !unit.exposes(ENTRY_ROUTINE) {
                return Err(DispatchError::MissingEntrypoint { unit: single.id });
            }
            return Ok(Resolution {
                descriptor: HandlerDescriptor {
                    unit: single.id,
                    routine: ENTRY_ROUTINE.to_string(),
                    style: InvocationStyle::SingleHandler,
                },
                unit,
            });
        }

        let Some((routine, module)) = segments.split_last() else {
            return Err(not_found());
        };
        if module.is_empty() || !is_identifier(routine) {
            return Err(not_found());
        }

        let location = self.locate(module);
        if !self.is_unit(&location) {
            return Err(not_found());
        }
        let unit = self.load(&location)?;
        if !unit.exposes(routine) {
            return Err(not_found());
        }

        Ok(Resolution {
            descriptor: HandlerDescriptor {
                unit: location.id,
                routine: routine.to_string(),
                style: InvocationStyle::ModuleFunction,
            },
            unit,
        })
    }

    fn locate(&self, segments: &[&str]) -> UnitLocation {
        UnitLocation::from_segments(&self.config.root, segments, &self.config.extension)
    }

    fn is_unit(&self, location: &UnitLocation) -> bool {
        !self.config.is_entry_unit(&location.id) && location.file.is_file()
    }

    fn load(&self, location: &UnitLocation) -> Result<Arc<HandlerUnit>, DispatchError> {
        self.loader
            .load(&location.file, &location.id, self.config.hot_reload)
            .map_err(|err| DispatchError::UnitLoad {
                unit: location.id.clone(),
                detail: err.to_string(),
            })
    }
}
