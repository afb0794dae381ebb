use std::any::{Any, type_name};
use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::context::error::StateError;
use crate::context::output::Output;
use crate::context::state::SharedState;

struct ValueNode {
    key: String,
    value: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
    parent: Option<Arc<ValueNode>>,
}

/// Cancelable, value-carrying handle threaded through one application run.
///
/// Cloning is cheap and every clone observes the same cancellation. Adding a
/// value never mutates an existing context: [`ExecutionContext::with_value`]
/// returns a new context whose chain points back to the old one.
#[derive(Clone)]
pub struct ExecutionContext {
    token: CancellationToken,
    state: SharedState,
    output: Output,
    values: Option<Arc<ValueNode>>,
}

impl ExecutionContext {
    /// Root context with fresh shared state, writing to stdout.
    pub fn background() -> Self {
        Self::new(SharedState::new())
    }

    pub fn new(state: SharedState) -> Self {
        Self {
            token: CancellationToken::new(),
            state,
            output: Output::stdout(),
            values: None,
        }
    }

    /// Derive a context with its own cancellation.
    ///
    /// Cancelling the parent cancels the child; cancelling the child leaves
    /// the parent untouched.
    pub fn with_cancel(&self) -> Self {
        Self {
            token: self.token.child_token(),
            ..self.clone()
        }
    }

    pub fn with_output(&self, output: Output) -> Self {
        Self {
            output,
            ..self.clone()
        }
    }

    pub fn with_state(&self, state: SharedState) -> Self {
        Self {
            state,
            ..self.clone()
        }
    }

    pub fn with_value<T>(&self, key: impl Into<String>, value: T) -> Self
    where
        T: Send + Sync + 'static,
    {
        let node = ValueNode {
            key: key.into(),
            value: Arc::new(value),
            type_name: type_name::<T>(),
            parent: self.values.clone(),
        };
        Self {
            values: Some(Arc::new(node)),
            ..self.clone()
        }
    }

    /// Look up the most recent value stored under `key` along the chain.
    pub fn value<T>(&self, key: &str) -> Result<Option<Arc<T>>, StateError>
    where
        T: Send + Sync + 'static,
    {
        let mut node = self.values.as_ref();
        while let Some(current) = node {
            if current.key == key {
                return current
                    .value
                    .clone()
                    .downcast::<T>()
                    .map(Some)
                    .map_err(|_| StateError::WrongType {
                        key: key.to_string(),
                        expected: type_name::<T>(),
                        actual: current.type_name,
                    });
            }
            node = current.parent.as_ref();
        }
        Ok(None)
    }

    /// Fire cancellation. Safe to call any number of times.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Completes once the context is cancelled.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }

    pub fn output(&self) -> &Output {
        &self.output
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::background()
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys = Vec::new();
        let mut node = self.values.as_ref();
        while let Some(current) = node {
            keys.push(current.key.as_str());
            node = current.parent.as_ref();
        }
        f.debug_struct("ExecutionContext")
            .field("cancelled", &self.is_cancelled())
            .field("state", &self.state)
            .field("output", &self.output)
            .field("values", &keys)
            .finish()
    }
}
