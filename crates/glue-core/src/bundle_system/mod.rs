//! # Glue Core Bundle System
//!
//! Bundles are independently authored feature modules. Each bundle has a unique
//! name, an optional list of bundles it must be registered after, and a `build`
//! step that declares definitions and CLI contributions into the
//! [`ContainerBuilder`](crate::container::ContainerBuilder).
//!
//! ## Key Components & Submodules:
//!
//! - **`traits`**: the [`Bundle`] trait and the closure-backed [`FnBundle`].
//! - **`dependency`**: [`DependencyResolver`], a depth-first topological sort
//!   with explicit cycle detection, and the [`DependencyError`] it reports.
//! - **`registry`**: [`BundleSet`], the insertion-ordered set of bundles that
//!   rejects duplicates and registers bundles strictly in resolved order.
pub mod dependency;
pub mod registry;
pub mod traits;

pub use dependency::{DependencyError, DependencyResolver};
pub use registry::BundleSet;
pub use traits::{Bundle, FnBundle};
