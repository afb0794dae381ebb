//! # Glue Core Container
//!
//! A small dependency container of named, lazily resolved factories.
//!
//! Bundles only ever see a [`ContainerBuilder`]: they may declare definitions
//! and contribute commands, persistent flags and pre-run hooks, but nothing can
//! be removed once declared. The application builds a [`Container`] from the
//! builder at the start of each execution and closes it when the run ends.
//!
//! Contributions that the root command aggregates are explicit lists on the
//! builder instead of tags on definitions.
pub mod builder;
pub mod definition;
pub mod error;
pub mod resolver;
pub mod scope;

pub use builder::ContainerBuilder;
pub use error::ContainerError;
pub use resolver::{Container, Resolver};
pub use scope::Scopes;

#[cfg(test)]
mod tests;
