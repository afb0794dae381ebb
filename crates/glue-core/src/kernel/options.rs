use std::ffi::OsString;
use std::fmt;
use std::sync::Arc;

use crate::bundle_system::{Bundle, BundleSet};
use crate::context::{ExecutionContext, Output};
use crate::kernel::error::{Error, Result};

/// Configuration accepted by [`Application::new`](crate::kernel::Application::new).
///
/// Options are applied in the order given; the first invalid one aborts construction.
pub enum AppOption {
    /// Base execution context; `None` is rejected with [`Error::NilContext`].
    Context(Option<ExecutionContext>),
    /// Bundles to register; names must be unique across every `Bundles` option.
    Bundles(Vec<Arc<dyn Bundle>>),
    /// Container scope hierarchy, outermost first.
    Scopes(Vec<String>),
    /// Stored as the application version in shared state.
    Version(String),
    /// Replaces `std::env::args_os()`, program name first.
    Args(Vec<OsString>),
    /// Replaces stdout as the sink for command output.
    Output(Output),
}

impl AppOption {
    pub fn context(ctx: ExecutionContext) -> Self {
        AppOption::Context(Some(ctx))
    }

    pub fn context_opt(ctx: Option<ExecutionContext>) -> Self {
        AppOption::Context(ctx)
    }

    pub fn bundle<B>(bundle: B) -> Self
    where
        B: Bundle + 'static,
    {
        AppOption::Bundles(vec![Arc::new(bundle)])
    }

    pub fn bundles<I>(bundles: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn Bundle>>,
    {
        AppOption::Bundles(bundles.into_iter().collect())
    }

    pub fn scopes<I, S>(scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AppOption::Scopes(scopes.into_iter().map(Into::into).collect())
    }

    pub fn version(version: impl Into<String>) -> Self {
        AppOption::Version(version.into())
    }

    pub fn args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        AppOption::Args(args.into_iter().map(Into::into).collect())
    }

    pub fn output(output: Output) -> Self {
        AppOption::Output(output)
    }

    pub(crate) fn apply(self, settings: &mut Settings) -> Result<()> {
        match self {
            AppOption::Context(None) => return Err(Error::NilContext),
            AppOption::Context(Some(ctx)) => settings.context = ctx,
            AppOption::Bundles(bundles) => settings.bundles.extend(bundles)?,
            AppOption::Scopes(scopes) => settings.scopes = Some(scopes),
            AppOption::Version(version) => settings.version = Some(version),
            AppOption::Args(args) => settings.args = Some(args),
            AppOption::Output(output) => settings.output = Some(output),
        }
        Ok(())
    }
}

impl fmt::Debug for AppOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppOption::Context(ctx) => f.debug_tuple("Context").field(&ctx.is_some()).finish(),
            AppOption::Bundles(bundles) => {
                let names: Vec<&str> = bundles.iter().map(|b| b.name()).collect();
                f.debug_tuple("Bundles").field(&names).finish()
            }
            AppOption::Scopes(scopes) => f.debug_tuple("Scopes").field(scopes).finish(),
            AppOption::Version(version) => f.debug_tuple("Version").field(version).finish(),
            AppOption::Args(args) => f.debug_tuple("Args").field(args).finish(),
            AppOption::Output(output) => f.debug_tuple("Output").field(output).finish(),
        }
    }
}

/// Accumulated result of applying every option.
#[derive(Default)]
pub(crate) struct Settings {
    pub(crate) context: ExecutionContext,
    pub(crate) bundles: BundleSet,
    pub(crate) scopes: Option<Vec<String>>,
    pub(crate) version: Option<String>,
    pub(crate) args: Option<Vec<OsString>>,
    pub(crate) output: Option<Output>,
}
