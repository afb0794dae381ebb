use std::collections::HashSet;

use crate::container::error::ContainerError;
use crate::kernel::constants::DEFAULT_SCOPES;

/// Ordered scope hierarchy, outermost first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scopes(Vec<String>);

impl Scopes {
    /// Validate a scope hierarchy: at least one scope, no empty or repeated names.
    pub fn new<I, S>(names: I) -> Result<Self, ContainerError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(ContainerError::InvalidScopes("at least one scope is required".to_string()));
        }

        let mut seen = HashSet::with_capacity(names.len());
        for name in &names {
            if name.is_empty() {
                return Err(ContainerError::InvalidScopes("scope name must not be empty".to_string()));
            }
            if !seen.insert(name.as_str()) {
                return Err(ContainerError::InvalidScopes(format!("scope \"{}\" is declared twice", name)));
            }
        }

        Ok(Self(names))
    }

    /// The outermost scope; the application container lives here.
    pub fn root(&self) -> &str {
        &self.0[0]
    }

    pub fn contains(&self, scope: &str) -> bool {
        self.0.iter().any(|s| s == scope)
    }

    /// Position in the hierarchy, 0 being the root.
    pub fn depth(&self, scope: &str) -> Option<usize> {
        self.0.iter().position(|s| s == scope)
    }

    pub fn sub_scope(&self, scope: &str) -> Option<&str> {
        self.depth(scope)
            .and_then(|depth| self.0.get(depth + 1))
            .map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.0.iter().map(String::as_str)
    }
}

impl Default for Scopes {
    fn default() -> Self {
        Self(DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect())
    }
}
