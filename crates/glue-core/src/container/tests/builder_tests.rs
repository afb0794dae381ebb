#![cfg(test)]

use std::sync::Arc;

use async_trait::async_trait;
use clap::{Arg, ArgMatches, Command};

use crate::cli::{CliCommand, PreRunnerFn};
use crate::container::{ContainerBuilder, ContainerError, Scopes};
use crate::context::ExecutionContext;
use crate::kernel::error::{Error, Result};

struct Named(&'static str);

#[async_trait]
impl CliCommand for Named {
    fn command(&self) -> Command {
        Command::new(self.0)
    }

    async fn run(&self, _ctx: &ExecutionContext, _matches: &ArgMatches) -> Result<()> {
        Ok(())
    }
}

#[test]
fn test_provide_declares_in_root_scope() {
    let mut builder = ContainerBuilder::new(Scopes::default());
    builder.provide("answer", |_| Ok(42u32)).unwrap();

    let definition = builder.definition("answer").unwrap();
    assert_eq!(definition.name(), "answer");
    assert_eq!(definition.scope(), "app");
    assert!(definition.type_name().contains("u32"));
    assert!(!definition.has_closer());
}

#[test]
fn test_duplicate_definition_is_rejected() {
    let mut builder = ContainerBuilder::new(Scopes::default());
    builder.provide("dup", |_| Ok(1u8)).unwrap();
    let err = builder.provide("dup", |_| Ok(2u8)).unwrap_err();
    assert!(matches!(
        err,
        Error::Container(ContainerError::DuplicateDefinition(ref name)) if name == "dup"
    ));
    assert_eq!(builder.definition_names().collect::<Vec<_>>(), vec!["dup"]);
}

#[test]
fn test_unknown_scope_fails_at_build() {
    let mut builder = ContainerBuilder::new(Scopes::default());
    builder.provide_in("tenant", "tenant.id", |_| Ok(7u64)).unwrap();

    let err = builder.build(&ExecutionContext::background()).unwrap_err();
    assert!(matches!(
        err,
        Error::Container(ContainerError::UnknownScope { ref scope, ref definition })
            if scope == "tenant" && definition == "tenant.id"
    ));
}

#[test]
fn test_contributions_are_counted() {
    let mut builder = ContainerBuilder::new(Scopes::default());
    builder.add_command(Named("one"));
    builder.add_command_with(|_| Ok(Arc::new(Named("two")) as Arc<dyn CliCommand>));
    builder.add_persistent_flag(Arg::new("verbose").long("verbose"));
    builder.add_pre_runner(PreRunnerFn::new(|_: &ExecutionContext, _: &ArgMatches| Ok(())));

    assert_eq!(builder.command_count(), 2);
    assert_eq!(builder.persistent_flag_count(), 1);
    assert_eq!(builder.pre_runner_count(), 1);

    let container = builder.build(&ExecutionContext::background()).unwrap();
    let names: Vec<String> = container
        .commands()
        .unwrap()
        .iter()
        .map(|c| c.command().get_name().to_string())
        .collect();
    assert_eq!(names, vec!["one", "two"]);
    assert_eq!(container.persistent_flags()[0].get_id(), "verbose");
    assert_eq!(container.pre_runners().len(), 1);
}

#[test]
fn test_build_can_run_twice() {
    let mut builder = ContainerBuilder::new(Scopes::default());
    builder.provide("counter", |_| Ok(String::from("fresh"))).unwrap();

    let first = builder.build(&ExecutionContext::background()).unwrap();
    first.resolve::<String>("counter").unwrap();
    first.close().unwrap();

    let second = builder.build(&ExecutionContext::background()).unwrap();
    assert!(!second.is_resolved("counter"));
    assert_eq!(second.resolve::<String>("counter").unwrap().as_str(), "fresh");
}
