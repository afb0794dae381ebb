use std::collections::HashSet;

use thiserror::Error;

use crate::bundle_system::registry::BundleSet;
use crate::bundle_system::traits::Bundle;

/// Configuration errors detected while collecting and ordering bundles
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DependencyError {
    /// Two bundles were supplied under the same name
    #[error("trying to register two bundles with the same name \"{0}\"")]
    DuplicateBundle(String),

    #[error("bundle name must not be empty")]
    EmptyName,

    /// A bundle lists its own name among its dependencies
    #[error("\"{0}\" can not depend on itself")]
    SelfDependency(String),

    /// Dependency cycle detected; `path` is the chain that closes the cycle
    #[error("\"{bundle}\" has a circular dependency: {}", .path.join(" -> "))]
    CircularDependency { bundle: String, path: Vec<String> },

    /// A bundle depends on a name that was never supplied
    #[error("\"{bundle}\" has unresolved dependency \"{dependency}\"")]
    UnresolvedDependency { bundle: String, dependency: String },
}

/// Computes a registration order in which every bundle follows its dependencies.
///
/// Depth-first walk over the bundle set. `active` is the current recursion
/// path and only serves cycle detection; `resolved` is the append-only result.
/// The outer loop follows the order in which bundles were supplied, so the
/// result is deterministic, but only the dependency partial order is a contract.
pub struct DependencyResolver<'a> {
    bundles: &'a BundleSet,
    resolved: Vec<String>,
    seen: HashSet<String>,
    active: Vec<String>,
}

impl<'a> DependencyResolver<'a> {
    /// Resolve the whole set, or report the first configuration error found.
    pub fn resolve(bundles: &'a BundleSet) -> Result<Vec<String>, DependencyError> {
        let mut resolver = Self {
            bundles,
            resolved: Vec::with_capacity(bundles.len()),
            seen: HashSet::with_capacity(bundles.len()),
            active: Vec::new(),
        };

        for bundle in bundles.iter() {
            resolver.visit(bundle.as_ref())?;
        }

        Ok(resolver.resolved)
    }

    fn visit(&mut self, bundle: &dyn Bundle) -> Result<(), DependencyError> {
        let name = bundle.name();

        if let Some(start) = self.active.iter().position(|active| active == name) {
            let mut path = self.active[start..].to_vec();
            path.push(name.to_string());
            return Err(DependencyError::CircularDependency {
                bundle: name.to_string(),
                path,
            });
        }

        // Everything reachable from a resolved bundle is resolved too.
        if self.seen.contains(name) {
            return Ok(());
        }

        self.active.push(name.to_string());

        for dependency in bundle.depends_on() {
            if dependency == name {
                return Err(DependencyError::SelfDependency(name.to_string()));
            }

            let Some(next) = self.bundles.get(&dependency) else {
                return Err(DependencyError::UnresolvedDependency {
                    bundle: name.to_string(),
                    dependency,
                });
            };

            self.visit(next.as_ref())?;
        }

        self.active.pop();

        if self.seen.insert(name.to_string()) {
            self.resolved.push(name.to_string());
        }

        Ok(())
    }
}
