//! Selection, graph construction and derived sets.

use std::path::PathBuf;

use indexmap::IndexSet;
use rustc_hash::FxHashMap;

use hewg_package::{
    DependencyIdentifier, DependencyKind, PackageCacheDB, PackageIdentifier, PackageInfo,
    PackageStore, PackageType, TargetTriplet,
};

use crate::{EdgeKind, NodeId, PackageGraph, ResolveError};

/// The current package, before it is installed anywhere.
#[derive(Debug, Clone)]
pub struct RootPackage {
    pub ident: PackageIdentifier,
    pub package_type: PackageType,
    pub internal: Vec<DependencyIdentifier>,
    pub external: Vec<DependencyIdentifier>,
}

/// Everything a build consumes from resolution.
#[derive(Debug)]
pub struct Resolution {
    pub graph: PackageGraph,
    /// `-I` directories for every reachable package, discovery order.
    pub include_dirs: Vec<PathBuf>,
    /// Static archives the final executable must link, discovery order.
    pub archives: Vec<PathBuf>,
    /// The position-independent variants of [`Self::archives`].
    pub pie_archives: Vec<PathBuf>,
    /// Shared-library packages linked as `-l<name>`.
    pub shared_libraries: Vec<String>,
    /// Non-fatal findings, e.g. include-path conflicts.
    pub warnings: Vec<String>,
}

impl Resolution {
    /// Human-readable summary of the derived facts: the graph with its
    /// tagged edges, the link set and the include set.
    pub fn report(&self) -> Vec<String> {
        let mut lines = Vec::new();

        for (_, node) in self.graph.iter() {
            let edges: Vec<String> = node
                .edges
                .iter()
                .map(|(kind, to)| {
                    let tag = match kind {
                        EdgeKind::Internal => "internal",
                        EdgeKind::External => "external",
                    };
                    format!("{tag} {}", self.graph.node(*to).ident)
                })
                .collect();

            let mut line = format!("package {} ({})", node.ident, node.package_type);
            if !edges.is_empty() {
                line.push_str(&format!(" -> {}", edges.join(", ")));
            }
            lines.push(line);
        }

        for archive in &self.archives {
            lines.push(format!("link {}", archive.display()));
        }
        for library in &self.shared_libraries {
            lines.push(format!("link -l{library}"));
        }
        for dir in &self.include_dirs {
            lines.push(format!("include {}", dir.display()));
        }

        lines
    }
}

pub struct Resolver<'a> {
    db: &'a PackageCacheDB,
    store: &'a PackageStore,
    build_target: &'a TargetTriplet,
}

impl<'a> Resolver<'a> {
    pub fn new(
        db: &'a PackageCacheDB,
        store: &'a PackageStore,
        build_target: &'a TargetTriplet,
    ) -> Self {
        Self {
            db,
            store,
            build_target,
        }
    }

    /// Phase 1: pick the installed instance satisfying one request.
    pub fn select(&self, dep: &DependencyIdentifier) -> Result<PackageIdentifier, ResolveError> {
        let candidates = self
            .db
            .iter()
            .filter(|installed| dep.admits(installed, self.build_target))
            .filter(|installed| match dep.kind() {
                DependencyKind::Exact => installed.version() == dep.version(),
                DependencyKind::ThisOrBetter => installed.version() >= dep.version(),
            });

        candidates
            .max_by(|a, b| a.version().cmp(b.version()))
            .cloned()
            .ok_or_else(|| ResolveError::UnresolvedDependency {
                request: dep.to_string(),
            })
    }

    /// Phases 2–4: build the graph and derive the include and link sets.
    pub fn resolve(&self, root: &RootPackage) -> Result<Resolution, ResolveError> {
        let mut graph = PackageGraph::new();
        let root_id = graph.add_node(root.ident.clone(), root.package_type);
        debug_assert_eq!(root_id, NodeId::ROOT);

        let root_deps = tagged(&root.internal, &root.external);
        let mut name_stack = vec![root.ident.name().to_string()];
        self.expand(&mut graph, root_id, &root_deps, &mut name_stack)?;

        let (include_dirs, warnings) = self.include_set(&graph);
        let (archives, pie_archives, shared_libraries) = self.link_set(&graph)?;

        Ok(Resolution {
            graph,
            include_dirs,
            archives,
            pie_archives,
            shared_libraries,
            warnings,
        })
    }

    fn expand(
        &self,
        graph: &mut PackageGraph,
        from: NodeId,
        deps: &[(EdgeKind, DependencyIdentifier)],
        name_stack: &mut Vec<String>,
    ) -> Result<(), ResolveError> {
        for (kind, dep) in deps {
            let selected = self.select(dep)?;

            // cycles are a property of names, not versions
            if let Some(pos) = name_stack.iter().position(|n| n == selected.name()) {
                let mut chain: Vec<String> = name_stack[pos..].to_vec();
                chain.push(selected.name().to_string());
                return Err(ResolveError::DependencyCycle { chain });
            }

            if let Some(existing) = graph.lookup(&selected) {
                graph.add_edge(from, *kind, existing);
                continue;
            }

            let info = self.load_info(&selected)?;
            if info.package_type == PackageType::Executable {
                return Err(ResolveError::ExecutableDependency { ident: selected });
            }

            let node = graph.add_node(selected.clone(), info.package_type);
            graph.add_edge(from, *kind, node);

            let child_internal: Vec<_> = info.internal_dependencies.into_iter().collect();
            let child_external: Vec<_> = info.external_dependencies.into_iter().collect();
            let child_deps = tagged(&child_internal, &child_external);

            name_stack.push(selected.name().to_string());
            self.expand(graph, node, &child_deps, name_stack)?;
            name_stack.pop();
        }

        Ok(())
    }

    fn load_info(&self, ident: &PackageIdentifier) -> Result<PackageInfo, ResolveError> {
        let path = self.store.manifest_path(ident);
        PackageInfo::load(&path).map_err(|err| {
            if let hewg_package::StoreError::Io { source, .. } = &err {
                if source.kind() == std::io::ErrorKind::NotFound {
                    return ResolveError::MissingPackageManifest {
                        ident: ident.clone(),
                    };
                }
            }
            ResolveError::Store(err)
        })
    }

    /// Phase 3a: every reachable node contributes its public header root.
    fn include_set(&self, graph: &PackageGraph) -> (Vec<PathBuf>, Vec<String>) {
        let mut dirs = IndexSet::new();
        let mut lines: FxHashMap<String, Vec<&PackageIdentifier>> = FxHashMap::default();

        for (id, node) in graph.iter() {
            if id == NodeId::ROOT {
                continue;
            }
            dirs.insert(self.store.include_dir(&node.ident));
            lines
                .entry(line_key(&node.ident))
                .or_default()
                .push(&node.ident);
        }

        // two versions of one line mean two disagreeing header paths
        let mut warnings = Vec::new();
        for (line, idents) in lines {
            if idents.len() > 1 {
                let versions: Vec<String> =
                    idents.iter().map(|i| i.version().to_string()).collect();
                warnings.push(format!(
                    "include path conflict for <{line}>: versions {} all contribute headers",
                    versions.join(", ")
                ));
            }
        }
        warnings.sort();

        (dirs.into_iter().collect(), warnings)
    }

    /// Phase 3b: walk internal edges from the root. Static libraries
    /// contribute their archives and keep the chain going; shared libraries
    /// contribute a `-l` and stop; headers contribute nothing. External
    /// edges short-circuit: whatever lies behind them was already linked by
    /// that dependency's own prior link.
    fn link_set(
        &self,
        graph: &PackageGraph,
    ) -> Result<(Vec<PathBuf>, Vec<PathBuf>, Vec<String>), ResolveError> {
        let mut static_nodes: IndexSet<NodeId> = IndexSet::new();
        let mut shared: IndexSet<String> = IndexSet::new();

        let mut stack = vec![NodeId::ROOT];
        while let Some(id) = stack.pop() {
            for &(kind, child_id) in &graph.node(id).edges {
                if kind != EdgeKind::Internal {
                    continue;
                }

                let child = graph.node(child_id);
                match child.package_type {
                    PackageType::StaticLibrary => {
                        if static_nodes.insert(child_id) {
                            stack.push(child_id);
                        }
                    }
                    PackageType::SharedLibrary => {
                        shared.insert(child.ident.name().to_string());
                    }
                    PackageType::Headers => {}
                    PackageType::Executable => {
                        return Err(ResolveError::ExecutableDependency {
                            ident: child.ident.clone(),
                        });
                    }
                }
            }
        }

        // no package line may be linked at two versions
        let mut seen: FxHashMap<String, &PackageIdentifier> = FxHashMap::default();
        for &id in &static_nodes {
            let ident = &graph.node(id).ident;
            if let Some(previous) = seen.insert(line_key(ident), ident) {
                if previous.version() != ident.version() {
                    return Err(ResolveError::VersionConflict {
                        line: line_key(ident),
                        first: previous.version().to_string(),
                        second: ident.version().to_string(),
                    });
                }
            }
        }

        let mut archives = Vec::new();
        let mut pie_archives = Vec::new();
        for &id in &static_nodes {
            let ident = &graph.node(id).ident;
            let dir = self.store.package_dir(ident);
            archives.push(dir.join(format!("lib{}.a", ident.name())));
            pie_archives.push(dir.join(format!("lib{}-PIE.a", ident.name())));
        }

        Ok((archives, pie_archives, shared.into_iter().collect()))
    }
}

fn tagged(
    internal: &[DependencyIdentifier],
    external: &[DependencyIdentifier],
) -> Vec<(EdgeKind, DependencyIdentifier)> {
    internal
        .iter()
        .map(|d| (EdgeKind::Internal, d.clone()))
        .chain(external.iter().map(|d| (EdgeKind::External, d.clone())))
        .collect()
}

fn line_key(ident: &PackageIdentifier) -> String {
    format!("{}.{}:{}", ident.org(), ident.name(), ident.target())
}
