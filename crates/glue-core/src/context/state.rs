use std::any::{Any, type_name};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::context::error::StateError;

/// The command currently being executed, as recorded before any pre-run hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Command path from the root, e.g. `["app", "db", "migrate"]`
    pub command: Vec<String>,
    /// Positional arguments of the innermost command, flags excluded
    pub args: Vec<String>,
}

impl Invocation {
    /// Name of the innermost invoked command
    pub fn command_name(&self) -> Option<&str> {
        self.command.last().map(String::as_str)
    }
}

struct StoredValue {
    value: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

#[derive(Default)]
struct StateInner {
    version: Option<String>,
    app_path: Option<PathBuf>,
    invocation: Option<Invocation>,
    values: HashMap<String, StoredValue>,
}

/// Process-wide state shared by the application, its bundles and commands.
///
/// Clones share the same storage. Every read and write takes the lock once,
/// so each key is read or written atomically.
#[derive(Clone, Default)]
pub struct SharedState {
    inner: Arc<RwLock<StateInner>>,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn version(&self) -> Option<String> {
        self.read().version.clone()
    }

    pub fn set_version(&self, version: impl Into<String>) {
        self.write().version = Some(version.into());
    }

    /// Absolute directory of the running binary, set when the application initializes.
    pub fn app_path(&self) -> Option<PathBuf> {
        self.read().app_path.clone()
    }

    pub fn set_app_path(&self, path: impl AsRef<Path>) {
        self.write().app_path = Some(path.as_ref().to_path_buf());
    }

    /// Last parsed command and arguments
    pub fn invocation(&self) -> Option<Invocation> {
        self.read().invocation.clone()
    }

    pub fn set_invocation(&self, invocation: Invocation) {
        self.write().invocation = Some(invocation);
    }

    /// Store a bundle-defined value, replacing any previous value under `key`.
    pub fn set_value<T>(&self, key: impl Into<String>, value: T)
    where
        T: Send + Sync + 'static,
    {
        self.write().values.insert(
            key.into(),
            StoredValue {
                value: Arc::new(value),
                type_name: type_name::<T>(),
            },
        );
    }

    /// Read a bundle-defined value.
    ///
    /// `Ok(None)` when nothing is stored under `key`; `WrongType` when the
    /// stored value is not a `T`.
    pub fn get_value<T>(&self, key: &str) -> Result<Option<Arc<T>>, StateError>
    where
        T: Send + Sync + 'static,
    {
        let inner = self.read();
        let Some(stored) = inner.values.get(key) else {
            return Ok(None);
        };

        stored
            .value
            .clone()
            .downcast::<T>()
            .map(Some)
            .map_err(|_| StateError::WrongType {
                key: key.to_string(),
                expected: type_name::<T>(),
                actual: stored.type_name,
            })
    }

    /// Copy a stored value out, failing if it is missing or of another type.
    pub fn fill<T>(&self, key: &str) -> Result<T, StateError>
    where
        T: Clone + Send + Sync + 'static,
    {
        match self.get_value::<T>(key)? {
            Some(value) => Ok(T::clone(&value)),
            None => Err(StateError::Missing(key.to_string())),
        }
    }

    pub fn contains_value(&self, key: &str) -> bool {
        self.read().values.contains_key(key)
    }

    fn read(&self) -> RwLockReadGuard<'_, StateInner> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, StateInner> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl fmt::Debug for SharedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.read();
        let mut keys: Vec<&String> = inner.values.keys().collect();
        keys.sort();
        f.debug_struct("SharedState")
            .field("version", &inner.version)
            .field("app_path", &inner.app_path)
            .field("invocation", &inner.invocation)
            .field("values", &keys)
            .finish()
    }
}
