use std::any::type_name;
use std::collections::HashMap;
use std::sync::Arc;

use clap::Arg;

use crate::cli::{CliCommand, PreRunner};
use crate::container::definition::{Closer, CommandFactory, Definition, Instance};
use crate::container::error::ContainerError;
use crate::container::resolver::{Container, Resolver, Shared};
use crate::container::scope::Scopes;
use crate::context::ExecutionContext;
use crate::kernel::error::Result;

/// Write-only handle handed to bundles during registration.
///
/// Declarations are append-only: a bundle can add definitions and
/// contributions but can never remove or replace another bundle's.
pub struct ContainerBuilder {
    scopes: Scopes,
    definitions: Vec<Definition>,
    index: HashMap<String, usize>,
    commands: Vec<CommandFactory>,
    persistent_flags: Vec<Arg>,
    pre_runners: Vec<Arc<dyn PreRunner>>,
}

impl ContainerBuilder {
    pub fn new(scopes: Scopes) -> Self {
        Self {
            scopes,
            definitions: Vec::new(),
            index: HashMap::new(),
            commands: Vec::new(),
            persistent_flags: Vec::new(),
            pre_runners: Vec::new(),
        }
    }

    pub fn scopes(&self) -> &Scopes {
        &self.scopes
    }

    /// Declare a named factory in the root scope.
    ///
    /// The factory runs at most once per container, on first resolution.
    pub fn provide<T, F>(&mut self, name: impl Into<String>, factory: F) -> Result<()>
    where
        T: Send + Sync + 'static,
        F: Fn(&Resolver<'_>) -> Result<T> + Send + Sync + 'static,
    {
        let scope = self.scopes.root().to_string();
        self.declare(scope, name.into(), factory, None)
    }

    /// Declare a named factory in a specific scope.
    ///
    /// The scope is validated when the container is built.
    pub fn provide_in<T, F>(&mut self, scope: &str, name: impl Into<String>, factory: F) -> Result<()>
    where
        T: Send + Sync + 'static,
        F: Fn(&Resolver<'_>) -> Result<T> + Send + Sync + 'static,
    {
        self.declare(scope.to_string(), name.into(), factory, None)
    }

    /// Declare a root scoped factory whose value must be released when the container closes.
    pub fn provide_with_close<T, F, C>(&mut self, name: impl Into<String>, factory: F, close: C) -> Result<()>
    where
        T: Send + Sync + 'static,
        F: Fn(&Resolver<'_>) -> Result<T> + Send + Sync + 'static,
        C: Fn(&T) -> Result<()> + Send + Sync + 'static,
    {
        let name = name.into();
        let closer_name = name.clone();
        let closer: Closer = Arc::new(move |instance: &Instance| match (**instance).downcast_ref::<T>() {
            Some(value) => close(value),
            None => Err(ContainerError::WrongType {
                name: closer_name.clone(),
                expected: type_name::<T>(),
            }
            .into()),
        });
        let scope = self.scopes.root().to_string();
        self.declare(scope, name, factory, Some(closer))
    }

    fn declare<T, F>(
        &mut self,
        scope: String,
        name: String,
        factory: F,
        closer: Option<Closer>,
    ) -> Result<()>
    where
        T: Send + Sync + 'static,
        F: Fn(&Resolver<'_>) -> Result<T> + Send + Sync + 'static,
    {
        if self.index.contains_key(&name) {
            return Err(ContainerError::DuplicateDefinition(name).into());
        }

        log::trace!("Declaring definition '{}' in scope '{}'", name, scope);
        let definition = Definition {
            name: name.clone(),
            scope,
            type_name: type_name::<T>(),
            factory: Arc::new(move |resolver: &Resolver<'_>| {
                factory(resolver).map(|value| Arc::new(value) as Instance)
            }),
            closer,
        };
        self.index.insert(name, self.definitions.len());
        self.definitions.push(definition);
        Ok(())
    }

    pub fn has_definition(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn definition(&self, name: &str) -> Option<&Definition> {
        self.index.get(name).map(|&i| &self.definitions[i])
    }

    /// Definition names in declaration order
    pub fn definition_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.definitions.iter().map(|d| d.name.as_str())
    }

    /// Contribute a sub-command of the root command.
    pub fn add_command<C>(&mut self, command: C)
    where
        C: CliCommand + 'static,
    {
        let command: Arc<dyn CliCommand> = Arc::new(command);
        self.commands.push(Arc::new(
            move |_: &Resolver<'_>| -> Result<Arc<dyn CliCommand>> { Ok(command.clone()) },
        ));
    }

    /// Contribute a sub-command built from container definitions.
    ///
    /// The factory runs when the root command is assembled, so it may resolve
    /// definitions declared by any bundle.
    pub fn add_command_with<F>(&mut self, factory: F)
    where
        F: Fn(&Resolver<'_>) -> Result<Arc<dyn CliCommand>> + Send + Sync + 'static,
    {
        self.commands.push(Arc::new(factory));
    }

    /// Contribute a flag available to the root command and every sub-command.
    pub fn add_persistent_flag(&mut self, flag: Arg) {
        self.persistent_flags.push(flag);
    }

    /// Contribute a hook that runs before any sub-command body.
    pub fn add_pre_runner<P>(&mut self, pre_runner: P)
    where
        P: PreRunner + 'static,
    {
        self.pre_runners.push(Arc::new(pre_runner));
    }

    pub fn command_count(&self) -> usize {
        self.commands.len()
    }

    pub fn persistent_flag_count(&self) -> usize {
        self.persistent_flags.len()
    }

    pub fn pre_runner_count(&self) -> usize {
        self.pre_runners.len()
    }

    /// Build a root scoped container bound to `context`.
    ///
    /// The builder is left untouched so a later execution can build again.
    pub fn build(&self, context: &ExecutionContext) -> Result<Container> {
        for definition in &self.definitions {
            if !self.scopes.contains(&definition.scope) {
                return Err(ContainerError::UnknownScope {
                    scope: definition.scope.clone(),
                    definition: definition.name.clone(),
                }
                .into());
            }
        }

        let definitions = self
            .definitions
            .iter()
            .map(|d| (d.name.clone(), d.clone()))
            .collect();

        log::debug!(
            "Building container: {} definition(s), {} command(s), {} persistent flag(s), {} pre-runner(s)",
            self.definitions.len(),
            self.commands.len(),
            self.persistent_flags.len(),
            self.pre_runners.len()
        );

        Ok(Container::new(Shared {
            definitions,
            scopes: self.scopes.clone(),
            commands: self.commands.clone(),
            persistent_flags: self.persistent_flags.clone(),
            pre_runners: self.pre_runners.clone(),
            context: context.clone(),
        }))
    }
}
