use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::cli::CliCommand;
use crate::container::resolver::Resolver;
use crate::kernel::error::Result;

/// A resolved value, shared by everyone who resolves the same definition.
pub(crate) type Instance = Arc<dyn Any + Send + Sync>;

pub(crate) type Factory = Arc<dyn Fn(&Resolver<'_>) -> Result<Instance> + Send + Sync>;

pub(crate) type Closer = Arc<dyn Fn(&Instance) -> Result<()> + Send + Sync>;

pub(crate) type CommandFactory = Arc<dyn Fn(&Resolver<'_>) -> Result<Arc<dyn CliCommand>> + Send + Sync>;

/// A named factory declared into the container.
#[derive(Clone)]
pub struct Definition {
    pub(crate) name: String,
    pub(crate) scope: String,
    pub(crate) type_name: &'static str,
    pub(crate) factory: Factory,
    pub(crate) closer: Option<Closer>,
}

impl Definition {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Type produced by the factory
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn has_closer(&self) -> bool {
        self.closer.is_some()
    }
}

impl fmt::Debug for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Definition")
            .field("name", &self.name)
            .field("scope", &self.scope)
            .field("type_name", &self.type_name)
            .field("has_closer", &self.closer.is_some())
            .finish()
    }
}
