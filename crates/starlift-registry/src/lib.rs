//! # starlift-registry — Instance Directory & Platform Tree
//!
//! Two closely related views of the cluster:
//!
//! - **Directory** (`directory.rs`): which instances exist, their display
//!   names, and their connection status. Fed by the socket layer as
//!   connections come and go.
//!
//! - **Tree** (`tree.rs`): the live instance/platform tree for one force,
//!   built on demand by fanning `InstanceListPlatformsRequest` out to every
//!   connected instance in parallel.
//!
//! Tree building is deliberately failure-absorbing: an instance that does
//! not answer in time appears in the snapshot as disconnected with an
//! empty platform list, and a cluster where nothing answers still yields
//! an (empty) snapshot. Callers rely on instance presence for
//! disambiguation, so instances are never silently omitted.

pub mod directory;
pub mod tree;

pub use directory::{ConnectionStatus, InstanceDirectory, InstanceInfo};
pub use tree::{TreeBuilder, TreeInstance, TreeSnapshot};
