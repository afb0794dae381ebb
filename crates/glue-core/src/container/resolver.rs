use std::any::type_name;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use clap::Arg;

use crate::cli::{CliCommand, PreRunner};
use crate::container::definition::{CommandFactory, Definition, Instance};
use crate::container::error::ContainerError;
use crate::container::scope::Scopes;
use crate::context::ExecutionContext;
use crate::kernel::error::{Error, Result};

/// Everything a builder hands over, shared by a container and its sub-containers.
pub(crate) struct Shared {
    pub(crate) definitions: HashMap<String, Definition>,
    pub(crate) scopes: Scopes,
    pub(crate) commands: Vec<CommandFactory>,
    pub(crate) persistent_flags: Vec<Arg>,
    pub(crate) pre_runners: Vec<Arc<dyn PreRunner>>,
    pub(crate) context: ExecutionContext,
}

#[derive(Default)]
struct Instances {
    resolved: HashMap<String, Instance>,
    // one slot per name, held while its factory runs
    building: HashMap<String, Arc<Mutex<()>>>,
    // resolution order, closers run in reverse
    order: Vec<String>,
    closed: bool,
}

struct Inner {
    shared: Arc<Shared>,
    scope: String,
    parent: Option<Container>,
    instances: Mutex<Instances>,
}

/// A built container. Cheap to clone; clones share resolved instances.
#[derive(Clone)]
pub struct Container {
    inner: Arc<Inner>,
}

impl Container {
    pub(crate) fn new(shared: Shared) -> Self {
        let scope = shared.scopes.root().to_string();
        Self {
            inner: Arc::new(Inner {
                shared: Arc::new(shared),
                scope,
                parent: None,
                instances: Mutex::new(Instances::default()),
            }),
        }
    }

    pub fn scope(&self) -> &str {
        &self.inner.scope
    }

    pub fn scopes(&self) -> &Scopes {
        &self.inner.shared.scopes
    }

    /// Execution context the container was built for
    pub fn context(&self) -> &ExecutionContext {
        &self.inner.shared.context
    }

    pub fn has(&self, name: &str) -> bool {
        self.inner.shared.definitions.contains_key(name)
    }

    pub fn is_resolved(&self, name: &str) -> bool {
        self.lock().resolved.contains_key(name)
    }

    /// Resolve a definition by name, building it on first use.
    pub fn resolve<T>(&self, name: &str) -> Result<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        Resolver::new(self).resolve(name)
    }

    /// Resolve every contributed sub-command, in contribution order.
    pub fn commands(&self) -> Result<Vec<Arc<dyn CliCommand>>> {
        Resolver::new(self).commands()
    }

    pub fn persistent_flags(&self) -> &[Arg] {
        &self.inner.shared.persistent_flags
    }

    pub fn pre_runners(&self) -> &[Arc<dyn PreRunner>] {
        &self.inner.shared.pre_runners
    }

    /// Create a container for the next scope down the hierarchy.
    ///
    /// Definitions of the new scope get fresh instances in the child; outer
    /// definitions are still resolved (and cached) by the ancestors. A child
    /// must be closed on its own.
    pub fn sub_container(&self) -> Result<Container> {
        let Some(scope) = self.scopes().sub_scope(self.scope()) else {
            return Err(ContainerError::NoSubScope(self.scope().to_string()).into());
        };

        Ok(Container {
            inner: Arc::new(Inner {
                shared: self.inner.shared.clone(),
                scope: scope.to_string(),
                parent: Some(self.clone()),
                instances: Mutex::new(Instances::default()),
            }),
        })
    }

    /// Release resolved instances in reverse resolution order.
    ///
    /// Every closer runs even if an earlier one fails; the first failure is
    /// returned. Closing twice is a no-op.
    pub fn close(&self) -> Result<()> {
        let (order, resolved) = {
            let mut instances = self.lock();
            if instances.closed {
                return Ok(());
            }
            instances.closed = true;
            (
                std::mem::take(&mut instances.order),
                std::mem::take(&mut instances.resolved),
            )
        };

        let mut first_error: Option<Error> = None;
        for name in order.iter().rev() {
            let Some(definition) = self.inner.shared.definitions.get(name) else {
                continue;
            };
            let (Some(closer), Some(instance)) = (&definition.closer, resolved.get(name)) else {
                continue;
            };

            log::debug!("Closing '{}'", name);
            if let Err(e) = closer(instance) {
                log::warn!("Failed to close '{}': {}", name, e);
                if first_error.is_none() {
                    first_error = Some(
                        ContainerError::CloseFailed {
                            name: name.clone(),
                            message: e.to_string(),
                        }
                        .into(),
                    );
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    fn lock(&self) -> MutexGuard<'_, Instances> {
        self.inner
            .instances
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn resolve_instance(&self, name: &str, path: &[String]) -> Result<Instance> {
        let Some(definition) = self.inner.shared.definitions.get(name) else {
            return Err(ContainerError::NotFound(name.to_string()).into());
        };

        let scopes = self.scopes();
        let wanted = scopes.depth(&definition.scope);
        let current = scopes.depth(self.scope());
        if wanted > current {
            return Err(ContainerError::ScopeMismatch {
                name: name.to_string(),
                scope: definition.scope.clone(),
                current: self.scope().to_string(),
            }
            .into());
        }
        if wanted < current {
            return match &self.inner.parent {
                Some(parent) => parent.resolve_instance(name, path),
                None => Err(ContainerError::ScopeMismatch {
                    name: name.to_string(),
                    scope: definition.scope.clone(),
                    current: self.scope().to_string(),
                }
                .into()),
            };
        }

        if path.iter().any(|p| p == name) {
            let mut cycle = path.to_vec();
            cycle.push(name.to_string());
            return Err(ContainerError::CircularResolution(cycle).into());
        }

        let slot = {
            let mut instances = self.lock();
            if let Some(instance) = instances.cached(name)? {
                return Ok(instance);
            }
            instances.building.entry(name.to_string()).or_default().clone()
        };

        // Concurrent resolvers of one name queue on its slot; only the first
        // runs the factory. The instances lock is not held meanwhile, since
        // the factory may resolve other definitions.
        let _building = slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(instance) = self.lock().cached(name)? {
            return Ok(instance);
        }

        let mut next_path = path.to_vec();
        next_path.push(name.to_string());
        let resolver = Resolver {
            container: self,
            path: next_path,
        };
        let instance = (definition.factory)(&resolver)?;
        log::trace!("Resolved '{}' ({})", name, definition.type_name);

        let mut instances = self.lock();
        if instances.closed {
            drop(instances);
            // Closed while the factory ran: nobody else will release it.
            if let Some(closer) = &definition.closer {
                if let Err(e) = closer(&instance) {
                    log::warn!("Failed to close '{}': {}", name, e);
                }
            }
            return Err(ContainerError::Closed.into());
        }
        instances.resolved.insert(name.to_string(), instance.clone());
        instances.order.push(name.to_string());
        Ok(instance)
    }
}

impl Instances {
    fn cached(&self, name: &str) -> Result<Option<Instance>> {
        if self.closed {
            return Err(ContainerError::Closed.into());
        }
        Ok(self.resolved.get(name).cloned())
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let instances = self.lock();
        f.debug_struct("Container")
            .field("scope", &self.inner.scope)
            .field("resolved", &instances.order)
            .field("closed", &instances.closed)
            .finish()
    }
}

/// Handle passed to factories while a definition is being resolved.
pub struct Resolver<'a> {
    container: &'a Container,
    path: Vec<String>,
}

impl<'a> Resolver<'a> {
    fn new(container: &'a Container) -> Self {
        Self {
            container,
            path: Vec::new(),
        }
    }

    pub fn resolve<T>(&self, name: &str) -> Result<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        let instance = self.container.resolve_instance(name, &self.path)?;
        instance.downcast::<T>().map_err(|_| {
            Error::from(ContainerError::WrongType {
                name: name.to_string(),
                expected: type_name::<T>(),
            })
        })
    }

    pub fn commands(&self) -> Result<Vec<Arc<dyn CliCommand>>> {
        self.container
            .inner
            .shared
            .commands
            .iter()
            .map(|factory| factory(self))
            .collect()
    }

    pub fn persistent_flags(&self) -> &[Arg] {
        self.container.persistent_flags()
    }

    pub fn pre_runners(&self) -> &[Arc<dyn PreRunner>] {
        self.container.pre_runners()
    }

    pub fn context(&self) -> &ExecutionContext {
        self.container.context()
    }

    pub fn container(&self) -> &Container {
        self.container
    }
}
