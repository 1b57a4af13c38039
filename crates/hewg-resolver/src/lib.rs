//! Dependency resolution.
//!
//! The resolver selects installed package instances for the current
//! package's declared dependencies, materializes the dependency graph, and
//! derives the two sets every build consumes: include directories for
//! compilation and link inputs for the final artifact.
//!
//! The graph is held as an index arena ([`PackageGraph`]); cycle detection
//! runs over package *names* regardless of version, because two versions of
//! one package recursively requiring each other is just as unbuildable as a
//! direct self-dependency.

mod graph;
mod resolve;

use thiserror::Error;

use hewg_package::{IdentityError, PackageIdentifier, StoreError};

pub use graph::{EdgeKind, NodeId, PackageGraph, PackageNode};
pub use resolve::{Resolution, Resolver, RootPackage};

#[derive(Debug, Error)]
pub enum ResolveError {
    /// No installed package satisfies a dependency request.
    #[error("unresolved dependency <{request}>")]
    UnresolvedDependency { request: String },

    /// The name graph rooted at the current package contains a cycle.
    #[error("dependency cycle detected: {}", chain.join(" -> "))]
    DependencyCycle { chain: Vec<String> },

    /// Two different versions of one package line would both be linked.
    #[error("version conflict in link set for <{line}>: {first} vs {second}")]
    VersionConflict {
        line: String,
        first: String,
        second: String,
    },

    /// An installed package instance has no manifest on disk.
    #[error("missing package manifest for <{ident}>")]
    MissingPackageManifest { ident: PackageIdentifier },

    /// Executables cannot appear as dependencies.
    #[error("package <{ident}> is an executable and cannot be depended upon")]
    ExecutableDependency { ident: PackageIdentifier },

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
