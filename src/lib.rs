//! repograph - dependency graph resolution for Maven-style artifact repositories
//!
//! Starting from a root `groupId:artifactId:version`, repograph loads project
//! models, expands their dependencies into a directed graph and settles it:
//! nearest-wins version mediation, relocation collapse, exclusion and
//! dependency-management propagation, cycle detection and orphan cleanup.
//!
//! # Architecture Overview
//!
//! The graph is an arena of nodes keyed by the coordinate's full key plus a flat
//! edge list. Edges are never deleted to express a decision; they are disabled
//! with a [`DisabledType`](graph::DisabledType) so the reason stays inspectable.
//! Resolution runs in passes driven by [`GraphResolver`](resolver::GraphResolver):
//!
//! 1. **resolve-nodes** - load models for pending nodes concurrently, expand them one by one
//! 2. **mediate-conflicts** - keep the nearest version of each artifact
//! 3. **cleanup-orphans** - drop nodes no longer reachable from the root
//!
//! Passes repeat until nothing is pending. Every step is reported to
//! [`GraphListener`](events::GraphListener)s through an asynchronous
//! [`EventBus`](events::EventBus).
//!
//! # Core Modules
//!
//! - [`coordinate`] - Artifact coordinates and the full/management key codec
//! - [`model`] - Project models and the loaders that produce them
//! - [`graph`] - Nodes, edges, reachability, cleanup and rendering
//! - [`resolver`] - Expansion, collapse, mediation and the pass driver
//! - [`events`] - Phase and resolution events, the listener trait and the bus
//! - [`config`] - Resolver configuration (`~/.repograph/config.toml`)
//! - [`core`] - Error types and user-facing error formatting
//! - [`cli`] - The `repograph` command-line interface
//! - [`utils`] - Terminal progress reporting
//!
//! # Example
//!
//! ```rust,no_run
//! use repograph_cli::config::ResolverConfig;
//! use repograph_cli::model::FileModelLoader;
//! use repograph_cli::resolver::{Cancellation, GraphBuilder, GraphResolver};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let builder = GraphBuilder::new(FileModelLoader::new("./repo"), ResolverConfig::default());
//! let resolved = GraphResolver::new(builder)
//!     .resolve(&"com.example:app:1.0".parse()?, &Cancellation::new())
//!     .await?;
//! println!("{}", repograph_cli::graph::render_tree(&resolved.graph));
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod coordinate;
pub mod core;
pub mod events;
pub mod graph;
pub mod model;
pub mod resolver;
pub mod utils;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
