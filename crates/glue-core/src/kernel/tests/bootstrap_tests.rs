#![cfg(test)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use clap::{ArgMatches, Command};

use crate::bundle_system::{Bundle, DependencyError, FnBundle};
use crate::cli::{CliCommand, PreRunnerFn};
use crate::container::ContainerError;
use crate::context::{ExecutionContext, Output, SharedState};
use crate::kernel::bootstrap::*;
use crate::kernel::constants::{CONTEXT_DEFINITION, STATE_DEFINITION};
use crate::kernel::error::{Error, KernelLifecyclePhase, Result};
use crate::kernel::options::AppOption;

type Journal = Arc<Mutex<Vec<String>>>;

/// Prints a line, then blocks until the execution is cancelled.
struct Blocking;

#[async_trait]
impl CliCommand for Blocking {
    fn command(&self) -> Command {
        Command::new("block")
    }

    async fn run(&self, ctx: &ExecutionContext, _matches: &ArgMatches) -> Result<()> {
        ctx.output().write_line("waiting")?;
        ctx.cancelled().await;
        ctx.output().write_line("cancelled")?;
        Ok(())
    }
}

struct Failing(&'static str);

#[async_trait]
impl CliCommand for Failing {
    fn command(&self) -> Command {
        Command::new("fail")
    }

    async fn run(&self, _ctx: &ExecutionContext, _matches: &ArgMatches) -> Result<()> {
        Err(Error::from(self.0))
    }
}

struct Panicking;

#[async_trait]
impl CliCommand for Panicking {
    fn command(&self) -> Command {
        Command::new("panic")
    }

    async fn run(&self, _ctx: &ExecutionContext, _matches: &ArgMatches) -> Result<()> {
        panic!("kaboom");
    }
}

/// Uses a closable resource resolved from the container.
struct UsesResource {
    resource: Arc<String>,
}

#[async_trait]
impl CliCommand for UsesResource {
    fn command(&self) -> Command {
        Command::new("use")
    }

    async fn run(&self, ctx: &ExecutionContext, _matches: &ArgMatches) -> Result<()> {
        ctx.output().write_line(&self.resource)?;
        Ok(())
    }
}

fn commands_bundle() -> Arc<dyn Bundle> {
    Arc::new(FnBundle::new("commands", |b| {
        b.add_command(Blocking);
        b.add_command(Failing("command failed"));
        b.add_command(Panicking);
        Ok(())
    }))
}

fn resource_bundle(closed: &Journal, close_fails: bool) -> Arc<dyn Bundle> {
    let closed = closed.clone();
    Arc::new(FnBundle::new("resource", move |b| {
        let closed = closed.clone();
        b.provide_with_close(
            "resource",
            |_| Ok(String::from("resource ready")),
            move |value: &String| {
                closed.lock().unwrap().push(value.clone());
                if close_fails {
                    Err(Error::from("close refused"))
                } else {
                    Ok(())
                }
            },
        )?;
        b.add_command_with(|r| {
            let resource = r.resolve::<String>("resource")?;
            Ok(Arc::new(UsesResource { resource }) as Arc<dyn CliCommand>)
        });
        b.add_command(Failing("command failed"));
        Ok(())
    }))
}

fn application(argv: &[&str], mut options: Vec<AppOption>) -> (Application, Output) {
    let output = Output::buffer();
    options.push(AppOption::args(argv.iter().copied()));
    options.push(AppOption::output(output.clone()));
    let app = Application::new(options).expect("application should construct");
    (app, output)
}

async fn wait_for_state(app: &Application, state: LifecycleState) {
    for _ in 0..200 {
        if app.lifecycle() == state {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("application never reached {:?}, still {:?}", state, app.lifecycle());
}

#[tokio::test]
async fn test_version_command_prints_version() {
    let (app, output) = application(&["app", "version"], vec![AppOption::version("1.2.3")]);
    assert_eq!(app.lifecycle(), LifecycleState::Constructed);

    app.execute().await.unwrap();

    assert_eq!(output.contents(), "1.2.3\n");
    assert_eq!(app.lifecycle(), LifecycleState::Completed);
    assert!(app.container().is_none());
    assert!(app.context().is_none());
}

#[tokio::test]
async fn test_version_command_without_version_prints_nothing() {
    let (app, output) = application(&["app", "version"], Vec::new());
    app.execute().await.unwrap();
    assert_eq!(output.contents(), "");
}

#[tokio::test]
async fn test_version_does_not_depend_on_option_order() {
    let (app, output) = application(
        &["app", "version"],
        vec![
            AppOption::version("3.0.0"),
            AppOption::context(ExecutionContext::background()),
        ],
    );
    app.execute().await.unwrap();
    assert_eq!(output.contents(), "3.0.0\n");
}

#[tokio::test]
async fn test_no_arguments_prints_help() {
    let (app, output) = application(&["/usr/bin/tool"], Vec::new());
    assert_eq!(app.root_name(), "tool");

    app.execute().await.unwrap();

    let help = output.contents();
    assert!(help.contains("tool [command]"), "help was: {}", help);
    assert!(help.contains("version"));
}

#[test]
fn test_bundle_build_error_is_returned_unchanged() {
    let err = Application::new([
        AppOption::args(["app"]),
        AppOption::bundle(FnBundle::new("broken", |_| Err(Error::from("bad bundle")))),
    ])
    .err()
    .expect("construction must fail");
    assert!(matches!(err, Error::Other(ref msg) if msg == "bad bundle"), "got {:?}", err);
}

#[test]
fn test_duplicate_bundle_fails_before_any_build() {
    let builds = Arc::new(AtomicUsize::new(0));
    let make = |builds: &Arc<AtomicUsize>| {
        let builds = builds.clone();
        FnBundle::new("twin", move |_| {
            builds.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    };

    let err = Application::new([
        AppOption::args(["app"]),
        AppOption::bundle(make(&builds)),
        AppOption::bundle(make(&builds)),
    ])
    .err()
    .expect("construction must fail");

    assert!(matches!(
        err,
        Error::Dependency(DependencyError::DuplicateBundle(ref name)) if name == "twin"
    ));
    assert_eq!(
        err.to_string(),
        "Dependency resolution failed: trying to register two bundles with the same name \"twin\""
    );
    assert_eq!(builds.load(Ordering::SeqCst), 0);
}

#[test]
fn test_nil_context_fails_construction() {
    let err = Application::new([AppOption::context_opt(None)])
        .err()
        .expect("construction must fail");
    assert!(matches!(err, Error::NilContext));
}

#[test]
fn test_bundles_register_in_dependency_order() {
    let (app, _output) = application(
        &["app"],
        vec![AppOption::bundles(vec![
            Arc::new(FnBundle::noop("b").with_dependencies(["c"])) as Arc<dyn Bundle>,
            Arc::new(FnBundle::noop("a")),
            Arc::new(FnBundle::noop("c").with_dependencies(["a"])),
        ])],
    );
    assert_eq!(app.bundle_order(), ["a", "c", "b"]);
}

#[tokio::test]
async fn test_stop_cancels_running_command() {
    let (app, output) = application(&["app", "block"], vec![AppOption::bundles([commands_bundle()])]);
    let app = Arc::new(app);

    // nothing to stop yet
    app.stop();
    assert_eq!(app.lifecycle(), LifecycleState::Constructed);

    let running = {
        let app = app.clone();
        tokio::spawn(async move { app.execute().await })
    };

    wait_for_state(&app, LifecycleState::Running).await;
    let ctx = app.context().expect("context exists while running");
    assert!(!ctx.is_cancelled());

    let handle = app.stop_handle();
    handle.stop();
    handle.stop();
    assert!(ctx.is_cancelled());

    tokio::time::timeout(Duration::from_secs(5), running)
        .await
        .expect("execution should end after stop")
        .unwrap()
        .unwrap();

    assert_eq!(output.contents(), "waiting\ncancelled\n");
    assert_eq!(app.lifecycle(), LifecycleState::Completed);

    app.stop();
    assert_eq!(app.lifecycle(), LifecycleState::Completed);
}

#[tokio::test]
async fn test_cancelling_base_context_cancels_execution() {
    let base = ExecutionContext::background();
    let (app, output) = application(
        &["app", "block"],
        vec![
            AppOption::context(base.clone()),
            AppOption::bundles([commands_bundle()]),
        ],
    );
    let app = Arc::new(app);

    let running = {
        let app = app.clone();
        tokio::spawn(async move { app.execute().await })
    };
    wait_for_state(&app, LifecycleState::Running).await;
    base.cancel();

    tokio::time::timeout(Duration::from_secs(5), running)
        .await
        .expect("execution should end after cancellation")
        .unwrap()
        .unwrap();
    assert!(output.contents().ends_with("cancelled\n"));
}

#[tokio::test]
async fn test_context_values_reach_commands() {
    let seen = Arc::new(Mutex::new(None));
    let slot = seen.clone();
    let bundle = FnBundle::new("reader", move |b| {
        let slot = slot.clone();
        b.add_pre_runner(PreRunnerFn::new(move |ctx: &ExecutionContext, _: &ArgMatches| {
            *slot.lock().unwrap() = ctx.value::<String>("request_id")?.map(|v| v.to_string());
            Ok(())
        }));
        Ok(())
    });

    let base = ExecutionContext::background().with_value("request_id", String::from("r-42"));
    let (app, _output) = application(
        &["app", "version"],
        vec![AppOption::context(base), AppOption::bundle(bundle)],
    );
    app.execute().await.unwrap();

    assert_eq!(seen.lock().unwrap().as_deref(), Some("r-42"));
}

#[tokio::test]
async fn test_pre_runner_sees_app_path_and_invocation() {
    let seen: Journal = Arc::default();
    let journal = seen.clone();
    let bundle = FnBundle::new("inspector", move |b| {
        let journal = journal.clone();
        b.add_pre_runner(PreRunnerFn::new(move |ctx: &ExecutionContext, _: &ArgMatches| {
            let state = ctx.state();
            let path = state.app_path().ok_or("app path missing")?;
            assert!(path.is_absolute(), "{} is not absolute", path.display());
            let invocation = state.invocation().ok_or("invocation missing")?;
            journal.lock().unwrap().push(invocation.command.join(" "));
            Ok(())
        }));
        Ok(())
    });

    let (app, _output) = application(&["bin/app", "version"], vec![AppOption::bundle(bundle)]);
    app.execute().await.unwrap();

    assert_eq!(*seen.lock().unwrap(), vec!["app version"]);
    assert!(app.shared_state().app_path().unwrap().ends_with("bin"));
}

#[tokio::test]
async fn test_container_is_closed_after_run() {
    let closed = Journal::default();
    let (app, output) = application(&["app", "use"], vec![AppOption::bundles([resource_bundle(&closed, false)])]);

    app.execute().await.unwrap();

    assert_eq!(output.contents(), "resource ready\n");
    assert_eq!(*closed.lock().unwrap(), vec!["resource ready"]);
    assert_eq!(app.lifecycle(), LifecycleState::Completed);
}

#[tokio::test]
async fn test_close_error_is_surfaced_after_successful_run() {
    let closed = Journal::default();
    let (app, _output) = application(&["app", "use"], vec![AppOption::bundles([resource_bundle(&closed, true)])]);

    let err = app.execute().await.unwrap_err();

    match err {
        Error::KernelLifecycleError { phase, source: Some(source), .. } => {
            assert_eq!(phase, KernelLifecyclePhase::Teardown);
            assert!(matches!(
                *source,
                Error::Container(ContainerError::CloseFailed { ref name, .. }) if name == "resource"
            ));
        }
        other => panic!("expected a teardown error, got {:?}", other),
    }
    assert_eq!(app.lifecycle(), LifecycleState::Failed);
}

#[tokio::test]
async fn test_command_error_wins_over_close_error() {
    let closed = Journal::default();
    let (app, _output) = application(&["app", "fail"], vec![AppOption::bundles([resource_bundle(&closed, true)])]);

    let err = app.execute().await.unwrap_err();

    assert!(matches!(err, Error::Other(ref msg) if msg == "command failed"), "got {:?}", err);
    // the resource was resolved to assemble the root command, so it was closed too
    assert_eq!(closed.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_panicking_command_is_reported() {
    let (app, _output) = application(&["app", "panic"], vec![AppOption::bundles([commands_bundle()])]);

    let err = app.execute().await.unwrap_err();

    assert!(matches!(err, Error::CommandPanicked(ref msg) if msg == "kaboom"), "got {:?}", err);
    assert_eq!(app.lifecycle(), LifecycleState::Failed);
    assert!(app.container().is_none());
}

#[tokio::test]
async fn test_unknown_command_fails_execution() {
    let (app, _output) = application(&["app", "nope"], Vec::new());
    let err = app.execute().await.unwrap_err();
    assert!(err.to_string().contains("nope"), "got {}", err);
}

#[tokio::test]
async fn test_init_then_run() {
    let (app, output) = application(&["app", "version"], vec![AppOption::version("0.9.0")]);

    let err = app.run().await.unwrap_err();
    assert!(matches!(
        err,
        Error::KernelLifecycleError { phase: KernelLifecyclePhase::Run, .. }
    ));

    app.init().await.unwrap();
    assert_eq!(app.lifecycle(), LifecycleState::Initialized);
    assert!(matches!(
        app.init().await.unwrap_err(),
        Error::KernelLifecycleError { phase: KernelLifecyclePhase::Init, .. }
    ));

    let container = app.container().expect("container is built by init");
    let state = container.resolve::<SharedState>(STATE_DEFINITION).unwrap();
    state.set_value("probe", 5u8);
    assert_eq!(app.shared_state().fill::<u8>("probe").unwrap(), 5);
    let ctx = container.resolve::<ExecutionContext>(CONTEXT_DEFINITION).unwrap();
    assert!(!ctx.is_cancelled());

    app.run().await.unwrap();
    assert_eq!(output.contents(), "0.9.0\n");
    assert!(ctx.is_cancelled());
    assert!(container.is_closed());
}

#[tokio::test]
async fn test_execute_can_repeat() {
    let (app, output) = application(&["app", "version"], vec![AppOption::version("1.0.0")]);
    app.execute().await.unwrap();
    app.execute().await.unwrap();
    assert_eq!(output.contents(), "1.0.0\n1.0.0\n");
}

#[tokio::test]
async fn test_custom_scopes() {
    let (app, _output) = application(&["app"], vec![AppOption::scopes(["process", "job"])]);
    app.init().await.unwrap();
    let container = app.container().unwrap();
    assert_eq!(container.scope(), "process");
    assert_eq!(container.sub_container().unwrap().scope(), "job");
}

#[tokio::test]
async fn test_container_build_failure_is_an_init_error() {
    let bundle = FnBundle::new("tenant", |b| b.provide_in("tenant", "tenant.id", |_| Ok(1u32)));
    let (app, output) = application(&["app", "version"], vec![AppOption::bundle(bundle)]);

    let err = app.execute().await.unwrap_err();

    match err {
        Error::KernelLifecycleError { phase, source: Some(source), .. } => {
            assert_eq!(phase, KernelLifecyclePhase::Init);
            assert!(matches!(*source, Error::Container(ContainerError::UnknownScope { .. })));
        }
        other => panic!("expected an init error, got {:?}", other),
    }
    assert_eq!(app.lifecycle(), LifecycleState::Failed);
    assert!(app.context().is_none());
    assert_eq!(output.contents(), "");
}

#[tokio::test]
async fn test_dropped_execution_is_torn_down() {
    let (app, output) = application(&["app", "block"], vec![AppOption::bundles([commands_bundle()])]);
    let app = Arc::new(app);

    let (ctx, container) = tokio::select! {
        result = app.execute() => panic!("execution ended early: {:?}", result),
        observed = async {
            wait_for_state(&app, LifecycleState::Running).await;
            (app.context().unwrap(), app.container().unwrap())
        } => observed,
    };

    assert!(ctx.is_cancelled());
    assert!(container.is_closed());
    assert_eq!(app.lifecycle(), LifecycleState::Failed);
    assert!(app.context().is_none());
    assert!(app.container().is_none());

    // the application recovers for the next execution
    let running = {
        let app = app.clone();
        tokio::spawn(async move { app.execute().await })
    };
    wait_for_state(&app, LifecycleState::Running).await;
    app.stop();
    tokio::time::timeout(Duration::from_secs(5), running)
        .await
        .expect("execution should end after stop")
        .unwrap()
        .unwrap();
    assert_eq!(output.contents().matches("waiting").count(), 2);
    assert_eq!(app.lifecycle(), LifecycleState::Completed);
}

#[tokio::test]
async fn test_concurrent_execute_waits_for_the_first() {
    let (app, output) = application(&["app", "block"], vec![AppOption::bundles([commands_bundle()])]);
    let app = Arc::new(app);

    let first = {
        let app = app.clone();
        tokio::spawn(async move { app.execute().await })
    };
    wait_for_state(&app, LifecycleState::Running).await;

    let second = {
        let app = app.clone();
        tokio::spawn(async move { app.execute().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!second.is_finished());
    assert_eq!(output.contents(), "waiting\n");

    app.stop();
    tokio::time::timeout(Duration::from_secs(5), first)
        .await
        .expect("first execution should end after stop")
        .unwrap()
        .unwrap();

    wait_for_state(&app, LifecycleState::Running).await;
    app.stop();
    tokio::time::timeout(Duration::from_secs(5), second)
        .await
        .expect("second execution should end after stop")
        .unwrap()
        .unwrap();
    assert_eq!(output.contents(), "waiting\ncancelled\nwaiting\ncancelled\n");
}
