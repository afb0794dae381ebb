use std::any::Any;
use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::task::JoinHandle;

use crate::cli::RootCommand;
use crate::container::{Container, ContainerBuilder, Scopes};
use crate::context::{ExecutionContext, SharedState};
use crate::kernel::constants::{self, ROOT_COMMAND_DEFINITION};
use crate::kernel::error::{Error, KernelLifecyclePhase, Result};
use crate::kernel::initializer;
use crate::kernel::options::{AppOption, Settings};
use crate::kernel::signal;

/// Where an application is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecycleState {
    /// Options applied, bundles registered, nothing running
    #[default]
    Constructed,
    /// Context derived and container built
    Initialized,
    /// Root command executing
    Running,
    /// Cancellation fired while initialized or running
    Stopped,
    /// Last run finished successfully
    Completed,
    /// Last run finished with an error
    Failed,
}

/// State of the current execution, reachable from a [`StopHandle`] without the run lock.
#[derive(Default)]
struct Session {
    context: Option<ExecutionContext>,
    container: Option<Container>,
    state: LifecycleState,
}

/// Cloneable trigger that cancels the application's current execution.
///
/// Stopping is idempotent and does nothing when no execution is in progress.
#[derive(Clone)]
pub struct StopHandle {
    session: Arc<Mutex<Session>>,
}

impl StopHandle {
    pub fn stop(&self) {
        let mut session = lock_session(&self.session);
        let Some(ctx) = session.context.clone() else {
            return;
        };
        if !ctx.is_cancelled() {
            log::info!("Stopping {} execution", constants::APP_NAME);
        }
        ctx.cancel();
        if matches!(session.state, LifecycleState::Initialized | LifecycleState::Running) {
            session.state = LifecycleState::Stopped;
        }
    }
}

/// An assembled application: bundles registered, ready to execute.
pub struct Application {
    base: ExecutionContext,
    args: Vec<OsString>,
    root_name: String,
    bundle_order: Vec<String>,
    builder: ContainerBuilder,
    // Held for the whole of init/run/execute so executions never overlap.
    run_lock: tokio::sync::Mutex<()>,
    session: Arc<Mutex<Session>>,
}

impl Application {
    /// Apply `options` in order, declare the built-ins and register every bundle.
    ///
    /// Any configuration or bundle registration error aborts construction.
    pub fn new<I>(options: I) -> Result<Self>
    where
        I: IntoIterator<Item = AppOption>,
    {
        let mut settings = Settings::default();
        for option in options {
            option.apply(&mut settings)?;
        }

        let scopes = match settings.scopes {
            Some(scopes) => Scopes::new(scopes)?,
            None => Scopes::default(),
        };
        let args = settings
            .args
            .unwrap_or_else(|| std::env::args_os().collect());
        let root_name = RootCommand::name_from_args(&args);

        let mut base = settings.context;
        if let Some(output) = settings.output {
            base = base.with_output(output);
        }
        if let Some(version) = settings.version {
            base.state().set_version(version);
        }

        let mut builder = ContainerBuilder::new(scopes);
        let bundle_order = initializer::initialize(&mut builder, &root_name, &settings.bundles)?;
        log::info!(
            "{} application '{}' constructed with {} bundle(s)",
            constants::APP_NAME,
            root_name,
            bundle_order.len()
        );

        Ok(Application {
            base,
            args,
            root_name,
            bundle_order,
            builder,
            run_lock: tokio::sync::Mutex::new(()),
            session: Arc::new(Mutex::new(Session::default())),
        })
    }

    /// Initialize, run the root command and tear down, cancelling on SIGINT/SIGTERM.
    ///
    /// A second call on the same instance waits for the first to finish.
    pub async fn execute(&self) -> Result<()> {
        let _guard = self.run_lock.lock().await;

        let ctx = self.derive_context()?;
        let mut teardown = Teardown::new(&self.session);
        teardown.listener = Some(signal::spawn_listener(self.stop_handle()));
        let result = match self.build_container(&ctx) {
            Ok(()) => self.run_locked().await,
            Err(e) => Err(e),
        };
        teardown.disarm();
        result
    }

    /// Resolve the app path, derive the execution context and build the container.
    pub async fn init(&self) -> Result<()> {
        let _guard = self.run_lock.lock().await;
        self.init_locked()
    }

    /// Run the root command of an initialized application, then tear down.
    pub async fn run(&self) -> Result<()> {
        let _guard = self.run_lock.lock().await;
        self.run_locked().await
    }

    /// Cancel the current execution, if any.
    pub fn stop(&self) {
        self.stop_handle().stop();
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            session: self.session.clone(),
        }
    }

    /// Container of the current execution; `None` outside init..run.
    pub fn container(&self) -> Option<Container> {
        lock_session(&self.session).container.clone()
    }

    /// Execution context of the current execution; `None` outside init..run.
    pub fn context(&self) -> Option<ExecutionContext> {
        lock_session(&self.session).context.clone()
    }

    pub fn lifecycle(&self) -> LifecycleState {
        lock_session(&self.session).state
    }

    pub fn base_context(&self) -> &ExecutionContext {
        &self.base
    }

    pub fn shared_state(&self) -> &SharedState {
        self.base.state()
    }

    /// Order in which bundles were registered
    pub fn bundle_order(&self) -> &[String] {
        &self.bundle_order
    }

    pub fn root_name(&self) -> &str {
        &self.root_name
    }

    fn init_locked(&self) -> Result<()> {
        let ctx = self.derive_context()?;
        self.build_container(&ctx)
    }

    /// Resolve the app path and derive the cancellable context of the next execution.
    fn derive_context(&self) -> Result<ExecutionContext> {
        if lock_session(&self.session).context.is_some() {
            return Err(Error::lifecycle(
                KernelLifecyclePhase::Init,
                "Application already initialized",
            ));
        }

        let app_path = resolve_app_path(&self.args).map_err(|e| Error::KernelLifecycleError {
            phase: KernelLifecyclePhase::Init,
            message: "unable to resolve app path".to_string(),
            source: Some(Box::new(Error::Io(e))),
        })?;

        let ctx = self.base.with_cancel();
        ctx.state().set_app_path(&app_path);
        log::debug!("Application path: {}", app_path.display());

        lock_session(&self.session).context = Some(ctx.clone());
        Ok(ctx)
    }

    fn build_container(&self, ctx: &ExecutionContext) -> Result<()> {
        let built = self.builder.build(ctx);

        let mut session = lock_session(&self.session);
        match built {
            Ok(container) => {
                session.container = Some(container);
                session.state = LifecycleState::Initialized;
                Ok(())
            }
            Err(e) => {
                ctx.cancel();
                session.context = None;
                session.state = LifecycleState::Failed;
                Err(Error::KernelLifecycleError {
                    phase: KernelLifecyclePhase::Init,
                    message: "unable to build container".to_string(),
                    source: Some(Box::new(e)),
                })
            }
        }
    }

    async fn run_locked(&self) -> Result<()> {
        let (ctx, container) = {
            let mut session = lock_session(&self.session);
            let ready = matches!(session.state, LifecycleState::Initialized | LifecycleState::Stopped);
            match (session.context.clone(), session.container.clone()) {
                (Some(ctx), Some(container)) if ready => {
                    if session.state == LifecycleState::Initialized {
                        session.state = LifecycleState::Running;
                    }
                    (ctx, container)
                }
                _ => {
                    return Err(Error::lifecycle(
                        KernelLifecyclePhase::Run,
                        "Application is not initialized",
                    ));
                }
            }
        };

        let mut teardown = Teardown::new(&self.session);
        let outcome = self.run_root(&ctx, &container).await;
        teardown.disarm();

        // Cancellation first, then the container, whatever the outcome.
        ctx.cancel();
        let closed = container.close();

        let result = match (outcome, closed) {
            (Ok(()), Ok(())) => Ok(()),
            (Ok(()), Err(e)) => Err(Error::KernelLifecycleError {
                phase: KernelLifecyclePhase::Teardown,
                message: "unable to close container".to_string(),
                source: Some(Box::new(e)),
            }),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(close_err)) => {
                log::warn!("Ignoring container close error after failed run: {}", close_err);
                Err(e)
            }
        };

        let mut session = lock_session(&self.session);
        session.context = None;
        session.container = None;
        session.state = if result.is_ok() {
            LifecycleState::Completed
        } else {
            LifecycleState::Failed
        };
        result
    }

    async fn run_root(&self, ctx: &ExecutionContext, container: &Container) -> Result<()> {
        let root = container.resolve::<RootCommand>(ROOT_COMMAND_DEFINITION)?;
        let ctx = ctx.clone();
        let args = self.args.clone();

        // A separate task so a panicking command still gets a teardown.
        match tokio::spawn(async move { root.execute(&ctx, args).await }).await {
            Ok(result) => result,
            Err(e) if e.is_panic() => Err(Error::CommandPanicked(panic_message(e.into_panic()))),
            Err(e) => Err(Error::Other(format!("command task failed: {}", e))),
        }
    }
}

/// Tears the session down when an execution future is dropped before it finishes.
///
/// Cancels the context, closes the container and marks the run `Failed`. The
/// signal listener, if any, is aborted either way.
struct Teardown<'a> {
    session: &'a Mutex<Session>,
    listener: Option<JoinHandle<()>>,
    armed: bool,
}

impl<'a> Teardown<'a> {
    fn new(session: &'a Mutex<Session>) -> Self {
        Self {
            session,
            listener: None,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for Teardown<'_> {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
        if !self.armed {
            return;
        }

        let (ctx, container) = {
            let mut session = lock_session(self.session);
            session.state = LifecycleState::Failed;
            (session.context.take(), session.container.take())
        };
        log::warn!("Execution abandoned before completion, tearing down");
        if let Some(ctx) = ctx {
            ctx.cancel();
        }
        if let Some(container) = container {
            if let Err(e) = container.close() {
                log::warn!("Ignoring container close error after abandoned run: {}", e);
            }
        }
    }
}

fn lock_session(session: &Mutex<Session>) -> MutexGuard<'_, Session> {
    session.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Absolute directory of the program named by `argv[0]`.
fn resolve_app_path(args: &[OsString]) -> std::io::Result<PathBuf> {
    let program = match args.first() {
        Some(arg0) => PathBuf::from(arg0),
        None => std::env::current_exe()?,
    };
    let dir = match program.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::path::absolute(dir)
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
