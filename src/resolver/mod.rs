//! Dependency graph resolution.
//!
//! Turns a root `groupId:artifactId:version` into a complete [`Graph`](crate::graph::Graph)
//! by loading project models and expanding them node by node.
//!
//! # Pieces
//!
//! - [`GraphBuilder`] creates graphs and resolves single nodes: load the model
//!   through the [`ModelLoader`](crate::model::ModelLoader), then hand it to
//!   [`add_node_from_model`]
//! - [`add_node_from_model`] expands one model: relocation, dependency
//!   management, scope filtering, exclusions, optional and cycle edges
//! - [`collapse_nodes`] merges a relocated node into its target
//! - [`mediate_conflicts`] flags the farther of two versions of one artifact
//! - [`GraphResolver`] runs the loop: resolve pending nodes, mediate, clean up,
//!   repeat until nothing is pending
//!
//! # Example
//!
//! ```rust,no_run
//! use repograph_cli::config::ResolverConfig;
//! use repograph_cli::coordinate::VersionedReference;
//! use repograph_cli::model::FileModelLoader;
//! use repograph_cli::resolver::{Cancellation, GraphBuilder, GraphResolver};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let loader = FileModelLoader::new("/srv/repository");
//! let resolver = GraphResolver::new(GraphBuilder::new(loader, ResolverConfig::default()));
//!
//! let root: VersionedReference = "com.example:app:1.0".parse()?;
//! let resolved = resolver.resolve(&root, &Cancellation::new()).await?;
//! println!("{} nodes", resolved.graph.node_count());
//! # Ok(())
//! # }
//! ```
//!
//! # Concurrency
//!
//! Model loads of one pass run concurrently. Graph mutation does not: the
//! resolver owns `&mut Graph` for the whole loop and applies expansions one at
//! a time in pending order, so results do not depend on load timing.

mod builder;
mod collapse;
mod driver;
mod expansion;
mod mediation;

pub use builder::GraphBuilder;
pub use collapse::collapse_nodes;
pub use driver::{Cancellation, FailedNode, GraphResolver, Resolved, ResolutionSummary};
pub use expansion::{Expansion, add_node_from_model};
pub use mediation::{ConflictOmission, mark_conflicts, mediate_conflicts};
