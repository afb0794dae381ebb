use std::fmt;

use crate::container::ContainerBuilder;
use crate::kernel::error::Result;

/// Core trait that all bundles must implement
pub trait Bundle: Send + Sync {
    /// Unique, non-empty name of the bundle
    fn name(&self) -> &str;

    /// Names of the bundles that must be registered before this one.
    fn depends_on(&self) -> Vec<String> {
        Vec::new()
    }

    /// Declares this bundle's definitions and contributions.
    ///
    /// Called exactly once, after every bundle listed in [`Bundle::depends_on`]
    /// has been built. Definitions declared by earlier bundles are visible
    /// through the container once it is built, they are not resolved here.
    fn build(&self, builder: &mut ContainerBuilder) -> Result<()>;
}

type BuildFn = dyn Fn(&mut ContainerBuilder) -> Result<()> + Send + Sync;

/// A bundle backed by a closure.
///
/// Handy for tests and small programs that do not need a dedicated type.
pub struct FnBundle {
    name: String,
    dependencies: Vec<String>,
    build: Box<BuildFn>,
}

impl FnBundle {
    pub fn new<F>(name: impl Into<String>, build: F) -> Self
    where
        F: Fn(&mut ContainerBuilder) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            dependencies: Vec::new(),
            build: Box::new(build),
        }
    }

    /// A bundle whose build step declares nothing.
    pub fn noop(name: impl Into<String>) -> Self {
        Self::new(name, |_| Ok(()))
    }

    pub fn with_dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = dependencies.into_iter().map(Into::into).collect();
        self
    }
}

impl Bundle for FnBundle {
    fn name(&self) -> &str {
        &self.name
    }

    fn depends_on(&self) -> Vec<String> {
        self.dependencies.clone()
    }

    fn build(&self, builder: &mut ContainerBuilder) -> Result<()> {
        (self.build)(builder)
    }
}

impl fmt::Debug for FnBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnBundle")
            .field("name", &self.name)
            .field("dependencies", &self.dependencies)
            .finish_non_exhaustive()
    }
}
