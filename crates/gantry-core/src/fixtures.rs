//! Graph builders for tests
//!
//! Shared by downstream crates through the `fixtures` feature.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::graph::Graph;
use crate::model::{
    BuildAction, GraphDependency, Platform, Product, Project, ProjectKind, Scheme, Target,
    TargetReference, TestAction, TestableTarget, Workspace,
};

/// A framework target with no sources and default settings.
pub fn target(name: &str) -> Target {
    Target {
        name: name.to_string(),
        product: Product::Framework,
        platform: Platform::Ios,
        bundle_id: format!("io.gantry.{}", name),
        sources: Vec::new(),
        resources: Vec::new(),
        settings: BTreeMap::new(),
        prune: false,
    }
}

pub fn app_target(name: &str) -> Target {
    Target {
        product: Product::App,
        ..target(name)
    }
}

pub fn unit_tests_target(name: &str) -> Target {
    Target {
        product: Product::UnitTests,
        ..target(name)
    }
}

pub fn ui_tests_target(name: &str) -> Target {
    Target {
        product: Product::UiTests,
        ..target(name)
    }
}

/// A local project at `path`, named after the last path component.
pub fn project(path: &str) -> Project {
    let path = PathBuf::from(path);
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Project".to_string());
    Project {
        path,
        name,
        kind: ProjectKind::Local,
        schemes: Vec::new(),
    }
}

pub fn external_project(path: &str) -> Project {
    Project {
        kind: ProjectKind::External,
        ..project(path)
    }
}

pub fn workspace(path: &str) -> Workspace {
    Workspace {
        path: PathBuf::from(path),
        name: "Workspace".to_string(),
        projects: Vec::new(),
        schemes: Vec::new(),
    }
}

pub fn build_action(targets: &[(&str, &str)]) -> BuildAction {
    BuildAction {
        targets: targets
            .iter()
            .map(|(path, name)| TargetReference::new(*path, *name))
            .collect(),
    }
}

pub fn test_action(targets: &[(&str, &str)]) -> TestAction {
    TestAction {
        targets: targets
            .iter()
            .map(|(path, name)| TestableTarget {
                target: TargetReference::new(*path, *name),
                skipped: false,
            })
            .collect(),
        code_coverage_targets: Vec::new(),
    }
}

pub fn scheme(name: &str) -> Scheme {
    Scheme {
        name: name.to_string(),
        build_action: None,
        test_action: None,
    }
}

/// Assembles graphs for tests: projects register themselves in the
/// workspace, and dependency edges create their adjacency entries.
pub struct GraphBuilder {
    graph: Graph,
}

impl GraphBuilder {
    pub fn new(name: &str) -> Self {
        GraphBuilder {
            graph: Graph::new(name, workspace("/workspace")),
        }
    }

    pub fn project(mut self, project: Project, targets: Vec<Target>) -> Self {
        let path = project.path.clone();
        self.graph.workspace.projects.push(path.clone());
        self.graph.projects.insert(path.clone(), project);
        let entry = self.graph.targets.entry(path).or_default();
        for target in targets {
            entry.insert(target.name.clone(), target);
        }
        self
    }

    /// A target-to-target dependency edge.
    pub fn dependency(self, from: (&str, &str), to: (&str, &str)) -> Self {
        self.edge(
            GraphDependency::target(from.1, from.0),
            GraphDependency::target(to.1, to.0),
        )
    }

    pub fn edge(mut self, from: GraphDependency, to: GraphDependency) -> Self {
        self.graph.dependencies.entry(from).or_default().insert(to);
        self
    }

    pub fn workspace_scheme(mut self, scheme: Scheme) -> Self {
        self.graph.workspace.schemes.push(scheme);
        self
    }

    pub fn build(self) -> Graph {
        self.graph
    }
}
