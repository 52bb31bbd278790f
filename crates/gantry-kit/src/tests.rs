//! Unit tests for gantry-kit

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use gantry_core::fixtures;
use gantry_core::{
    Graph, GraphDependency, GraphMapping, MissingTargetsError, Scheme, Target, TargetReference,
};

use crate::focus::FocusTargetsGraphMapper;
use crate::pipeline::focus_mapper_pipeline;
use crate::tree_shake::TreeShakePrunedTargetsGraphMapper;

fn pruned(name: &str) -> Target {
    Target {
        prune: true,
        ..fixtures::target(name)
    }
}

/// Two projects: /p1 keeps B, /p2 is fully pruned.
fn partially_pruned_graph() -> Graph {
    fixtures::GraphBuilder::new("pruned")
        .project(
            fixtures::project("/p1"),
            vec![pruned("A"), fixtures::target("B")],
        )
        .project(fixtures::project("/p2"), vec![pruned("C"), pruned("D")])
        .dependency(("/p1", "B"), ("/p2", "C"))
        .dependency(("/p1", "A"), ("/p1", "B"))
        .workspace_scheme(Scheme {
            build_action: Some(fixtures::build_action(&[("/p1", "A"), ("/p1", "B")])),
            ..fixtures::scheme("S1")
        })
        .workspace_scheme(Scheme {
            build_action: Some(fixtures::build_action(&[("/p2", "C")])),
            test_action: Some(fixtures::test_action(&[("/p2", "D")])),
            ..fixtures::scheme("S2")
        })
        .build()
}

#[tokio::test]
async fn test_tree_shake_fast_path_returns_graph_unchanged() {
    let graph = fixtures::GraphBuilder::new("untouched")
        .project(
            fixtures::project("/p"),
            vec![fixtures::target("A"), fixtures::target("B")],
        )
        .dependency(("/p", "A"), ("/p", "B"))
        .build();
    let mapper = TreeShakePrunedTargetsGraphMapper::new();

    let (mapped, side_effects) = mapper.map(graph.clone()).await.unwrap();

    assert_eq!(mapped, graph);
    assert!(side_effects.is_empty());
}

#[tokio::test]
async fn test_tree_shake_is_idempotent() {
    let mapper = TreeShakePrunedTargetsGraphMapper::new();

    let (once, _) = mapper.map(partially_pruned_graph()).await.unwrap();
    let (twice, _) = mapper.map(once.clone()).await.unwrap();

    assert_eq!(once, twice);
}

#[tokio::test]
async fn test_tree_shake_output_is_a_subset_with_no_empty_projects() {
    let input = partially_pruned_graph();
    let mapper = TreeShakePrunedTargetsGraphMapper::new();

    let (mapped, _) = mapper.map(input.clone()).await.unwrap();

    for (path, targets) in &mapped.targets {
        let input_targets = input.targets.get(path).unwrap();
        for name in targets.keys() {
            assert!(input_targets.contains_key(name));
        }
    }
    for path in mapped.projects.keys() {
        assert!(!mapped.targets.get(path).unwrap().is_empty());
    }
    assert!(mapped.target_count() < input.target_count());
}

#[tokio::test]
async fn test_tree_shake_removes_fully_pruned_projects() {
    let mapper = TreeShakePrunedTargetsGraphMapper::new();

    let (mapped, _) = mapper.map(partially_pruned_graph()).await.unwrap();

    assert!(!mapped.projects.contains_key(Path::new("/p2")));
    assert!(!mapped.workspace.projects.contains(&PathBuf::from("/p2")));
    assert!(mapped.projects.contains_key(Path::new("/p1")));
}

#[tokio::test]
async fn test_tree_shake_filters_surviving_schemes_and_drops_empty_ones() {
    let mapper = TreeShakePrunedTargetsGraphMapper::new();

    let (mapped, _) = mapper.map(partially_pruned_graph()).await.unwrap();

    assert_eq!(mapped.workspace.schemes.len(), 1);
    let scheme = &mapped.workspace.schemes[0];
    assert_eq!(scheme.name, "S1");
    assert_eq!(
        scheme.build_action.as_ref().unwrap().targets,
        vec![TargetReference::new("/p1", "B")]
    );
}

#[tokio::test]
async fn test_tree_shake_drops_edges_into_the_pruned_subgraph() {
    let mapper = TreeShakePrunedTargetsGraphMapper::new();

    let (mapped, _) = mapper.map(partially_pruned_graph()).await.unwrap();

    let b_node = GraphDependency::target("B", "/p1");
    assert!(mapped.dependencies_of(&b_node).is_empty());
    assert!(
        !mapped
            .dependencies
            .contains_key(&GraphDependency::target("A", "/p1"))
    );
}

#[tokio::test]
async fn test_tree_shake_filters_project_schemes() {
    let mut project = fixtures::project("/p");
    project.schemes = vec![
        Scheme {
            build_action: Some(fixtures::build_action(&[("/p", "A"), ("/p", "B")])),
            ..fixtures::scheme("Partial")
        },
        Scheme {
            build_action: Some(fixtures::build_action(&[("/p", "A")])),
            ..fixtures::scheme("Gone")
        },
    ];
    let graph = fixtures::GraphBuilder::new("schemes")
        .project(project, vec![pruned("A"), fixtures::target("B")])
        .build();
    let mapper = TreeShakePrunedTargetsGraphMapper::new();

    let (mapped, _) = mapper.map(graph).await.unwrap();

    let project = mapped.projects.get(Path::new("/p")).unwrap();
    assert_eq!(project.schemes.len(), 1);
    assert_eq!(project.schemes[0].name, "Partial");
    assert_eq!(
        project.schemes[0].build_action.as_ref().unwrap().targets,
        vec![TargetReference::new("/p", "B")]
    );
}

fn focus_graph() -> Graph {
    fixtures::GraphBuilder::new("focus")
        .project(
            fixtures::project("/p"),
            vec![
                fixtures::app_target("App"),
                fixtures::target("Core"),
                fixtures::unit_tests_target("CoreTests"),
                fixtures::target("Extra"),
            ],
        )
        .dependency(("/p", "App"), ("/p", "Core"))
        .dependency(("/p", "CoreTests"), ("/p", "Core"))
        .build()
}

#[tokio::test]
async fn test_focus_marks_targets_outside_the_closure() {
    let mapper =
        FocusTargetsGraphMapper::new(BTreeSet::from(["Core".to_string()]));

    let (mapped, _) = mapper.map(focus_graph()).await.unwrap();

    let project = Path::new("/p");
    assert!(!mapped.target(project, "Core").unwrap().prune);
    assert!(!mapped.target(project, "CoreTests").unwrap().prune);
    assert!(mapped.target(project, "App").unwrap().prune);
    assert!(mapped.target(project, "Extra").unwrap().prune);
}

#[tokio::test]
async fn test_focus_with_no_names_keeps_everything_reachable() {
    let mapper = FocusTargetsGraphMapper::new(BTreeSet::new());

    let (mapped, _) = mapper.map(focus_graph()).await.unwrap();

    for (_, targets) in &mapped.targets {
        for target in targets.values() {
            assert!(!target.prune, "{} should not be pruned", target.name);
        }
    }
}

#[tokio::test]
async fn test_focus_rejects_unknown_targets() {
    let mapper = FocusTargetsGraphMapper::new(BTreeSet::from(["Ghost".to_string()]));

    let error = mapper.map(focus_graph()).await.unwrap_err();
    let missing = error.downcast_ref::<MissingTargetsError>().unwrap();

    assert_eq!(missing.missing, vec!["Ghost".to_string()]);
    assert_eq!(
        missing.available,
        vec![
            "App".to_string(),
            "Core".to_string(),
            "CoreTests".to_string(),
            "Extra".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_focus_pipeline_prunes_and_shakes() {
    let pipeline = focus_mapper_pipeline(BTreeSet::from(["Core".to_string()]));

    let (mapped, side_effects) = pipeline.map(focus_graph()).await.unwrap();

    assert!(side_effects.is_empty());
    let project = Path::new("/p");
    assert!(mapped.target(project, "Core").is_some());
    assert!(mapped.target(project, "CoreTests").is_some());
    assert!(mapped.target(project, "App").is_none());
    assert!(mapped.target(project, "Extra").is_none());
}
