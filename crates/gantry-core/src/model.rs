//! Core value types for the dependency graph

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Platform a target is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Ios,
    Macos,
    Tvos,
    Watchos,
}

/// What a target produces when built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Product {
    App,
    Framework,
    StaticFramework,
    StaticLibrary,
    DynamicLibrary,
    Bundle,
    UnitTests,
    UiTests,
}

impl Product {
    /// Whether the product is a test bundle of any kind.
    pub fn is_tests(&self) -> bool {
        matches!(self, Product::UnitTests | Product::UiTests)
    }
}

/// A single buildable/testable unit within a project.
///
/// Dependency edges are not stored here; `Graph::dependencies` is the single
/// source of truth for the adjacency.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Target {
    pub name: String,
    pub product: Product,
    pub platform: Platform,
    pub bundle_id: String,
    /// Source files, compiled into the product. Contents participate in the
    /// target's content hash.
    pub sources: Vec<PathBuf>,
    /// Resource files copied into the product.
    pub resources: Vec<PathBuf>,
    /// Build settings. Ordered so serialization is deterministic.
    pub settings: BTreeMap<String, String>,
    /// Marks the target for removal by the tree-shaking mapper.
    #[serde(default)]
    pub prune: bool,
}

/// Whether a project is part of the workspace or pulled in as an external
/// dependency (e.g. a package checkout).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectKind {
    Local,
    External,
}

/// A project, identified by its filesystem path. Target values live in
/// `Graph::targets`, keyed by this path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Project {
    pub path: PathBuf,
    pub name: String,
    pub kind: ProjectKind,
    pub schemes: Vec<Scheme>,
}

/// The workspace: an ordered list of project paths plus workspace-level
/// schemes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Workspace {
    pub path: PathBuf,
    pub name: String,
    pub projects: Vec<PathBuf>,
    pub schemes: Vec<Scheme>,
}

/// Stable identity of a target: `(project path, target name)`. Used as a
/// set/map key throughout mapping, independent of the mutable `Target` value
/// it currently points to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TargetReference {
    pub project_path: PathBuf,
    pub name: String,
}

impl TargetReference {
    pub fn new(project_path: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        TargetReference {
            project_path: project_path.into(),
            name: name.into(),
        }
    }
}

/// A target participating in a scheme's test action.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TestableTarget {
    pub target: TargetReference,
    #[serde(default)]
    pub skipped: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BuildAction {
    pub targets: Vec<TargetReference>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TestAction {
    pub targets: Vec<TestableTarget>,
    pub code_coverage_targets: Vec<TargetReference>,
}

/// Named grouping of build/test actions. Identity (the name) is preserved by
/// mappers; a scheme is dropped only when all its actions end up empty.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Scheme {
    pub name: String,
    pub build_action: Option<BuildAction>,
    pub test_action: Option<TestAction>,
}

/// A target materialized together with its owning project. Ordered by
/// `(path, target name)` through field order, so sets and maps of graph
/// targets iterate deterministically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GraphTarget {
    pub path: PathBuf,
    pub target: Target,
    pub project: Project,
}

impl GraphTarget {
    pub fn reference(&self) -> TargetReference {
        TargetReference::new(&self.path, &self.target.name)
    }
}

/// A node in the dependency adjacency: either a target reference or a
/// precompiled/external artifact.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum GraphDependency {
    Target { name: String, path: PathBuf },
    Framework { path: PathBuf },
    Xcframework { path: PathBuf },
    Library { path: PathBuf },
    Bundle { path: PathBuf },
    Package { product: String },
    Sdk { name: String },
}

impl GraphDependency {
    pub fn target(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        GraphDependency::Target {
            name: name.into(),
            path: path.into(),
        }
    }

    /// The `(name, path)` pair when this dependency is a target node.
    pub fn as_target(&self) -> Option<(&str, &Path)> {
        match self {
            GraphDependency::Target { name, path } => Some((name.as_str(), path.as_path())),
            _ => None,
        }
    }

    pub fn is_target(&self) -> bool {
        matches!(self, GraphDependency::Target { .. })
    }
}
