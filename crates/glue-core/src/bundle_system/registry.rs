use std::collections::HashMap;
use std::sync::Arc;

use crate::bundle_system::dependency::{DependencyError, DependencyResolver};
use crate::bundle_system::traits::Bundle;
use crate::container::ContainerBuilder;
use crate::kernel::error::Result;

/// Set of bundles supplied to an application, keyed by unique name.
///
/// Keeps the order in which bundles were supplied so that resolution is
/// reproducible between runs.
#[derive(Default)]
pub struct BundleSet {
    order: Vec<String>,
    bundles: HashMap<String, Arc<dyn Bundle>>,
}

impl BundleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a bundle, rejecting empty and duplicate names.
    pub fn insert(&mut self, bundle: Arc<dyn Bundle>) -> std::result::Result<(), DependencyError> {
        let name = bundle.name().to_string();
        if name.is_empty() {
            return Err(DependencyError::EmptyName);
        }
        if self.bundles.contains_key(&name) {
            return Err(DependencyError::DuplicateBundle(name));
        }

        self.order.push(name.clone());
        self.bundles.insert(name, bundle);
        Ok(())
    }

    pub fn extend<I>(&mut self, bundles: I) -> std::result::Result<(), DependencyError>
    where
        I: IntoIterator<Item = Arc<dyn Bundle>>,
    {
        for bundle in bundles {
            self.insert(bundle)?;
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Bundle>> {
        self.bundles.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bundles.contains_key(name)
    }

    /// Bundle names in the order they were supplied
    pub fn names(&self) -> &[String] {
        &self.order
    }

    /// Iterate bundles in the order they were supplied
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Bundle>> + '_ {
        self.order.iter().filter_map(|name| self.bundles.get(name))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Compute the registration order without building anything.
    pub fn resolve_order(&self) -> std::result::Result<Vec<String>, DependencyError> {
        DependencyResolver::resolve(self)
    }

    /// Resolve the order, then build every bundle into `builder`, one at a time.
    ///
    /// The first failing `build` aborts registration and its error is returned
    /// unchanged. Returns the order that was used.
    pub fn register_all(&self, builder: &mut ContainerBuilder) -> Result<Vec<String>> {
        let order = self.resolve_order()?;
        log::debug!("Bundle registration order: {:?}", order);

        for name in &order {
            let Some(bundle) = self.bundles.get(name) else {
                continue;
            };
            log::debug!("Registering bundle: {}", name);
            if let Err(e) = bundle.build(builder) {
                log::error!("Bundle '{}' failed to register: {}", name, e);
                return Err(e);
            }
        }

        log::info!("Registered {} bundle(s)", order.len());
        Ok(order)
    }
}
