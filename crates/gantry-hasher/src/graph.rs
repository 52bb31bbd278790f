//! Content hashing over the dependency graph
//!
//! A target's hash covers its own declaration and file contents plus the
//! hashes of its transitive dependencies, so any change below a target
//! invalidates everything above it. Hashes are pure functions of graph state
//! and file content; nothing else may influence them.

use std::collections::BTreeMap;

use gantry_core::{Graph, GraphDependency, GraphTarget, GraphTraverser, TargetReference};

use crate::content::{ContentHasher, HashError};

enum HashState {
    InProgress,
    Done(String),
}

/// Computes a stable digest per target, bottom-up over the dependency DAG.
///
/// Evaluation is memoized so diamond-shaped graphs hash each target once.
/// The in-progress marker makes termination on (disallowed) cycles explicit
/// instead of overflowing the stack.
pub struct GraphContentHasher {
    content_hasher: ContentHasher,
}

impl GraphContentHasher {
    pub fn new(content_hasher: ContentHasher) -> Self {
        GraphContentHasher { content_hasher }
    }

    /// Hashes for every target accepted by `include`. Dependencies of an
    /// included target always contribute their content to its digest, whether
    /// or not they pass the filter themselves; the filter only restricts
    /// which targets appear in the result.
    pub fn content_hashes<F>(
        &self,
        graph: &Graph,
        include: F,
        additional_strings: &[String],
    ) -> Result<BTreeMap<GraphTarget, String>, HashError>
    where
        F: Fn(&GraphTarget) -> bool,
    {
        let traverser = GraphTraverser::new(graph);
        let mut state: BTreeMap<TargetReference, HashState> = BTreeMap::new();
        let mut hashes = BTreeMap::new();

        for target in traverser.all_targets() {
            if !include(&target) {
                continue;
            }
            let hash = self.target_hash(&traverser, &target, &mut state, additional_strings)?;
            hashes.insert(target, hash);
        }
        tracing::debug!("Computed content hashes for {} targets", hashes.len());
        Ok(hashes)
    }

    fn target_hash(
        &self,
        traverser: &GraphTraverser<'_>,
        target: &GraphTarget,
        state: &mut BTreeMap<TargetReference, HashState>,
        additional_strings: &[String],
    ) -> Result<String, HashError> {
        let reference = target.reference();
        match state.get(&reference) {
            Some(HashState::Done(hash)) => return Ok(hash.clone()),
            Some(HashState::InProgress) => {
                return Err(HashError::DependencyCycle { reference });
            }
            None => {}
        }
        state.insert(reference.clone(), HashState::InProgress);

        let mut parts: Vec<String> = vec![
            target.target.name.clone(),
            format!("{:?}", target.target.product),
            format!("{:?}", target.target.platform),
            target.target.bundle_id.clone(),
        ];

        let mut sources = target.target.sources.clone();
        sources.sort();
        for source in &sources {
            parts.push(self.content_hasher.hash_file(source)?);
        }

        let mut resources = target.target.resources.clone();
        resources.sort();
        for resource in &resources {
            parts.push(self.content_hasher.hash_file(resource)?);
        }

        parts.push(settings_digest(&target.target.settings)?);

        // Dependencies hashed before the dependent: target dependencies
        // recurse, precompiled/external ones contribute their identity.
        for dependency in traverser.graph().dependencies_of(&GraphDependency::target(
            &target.target.name,
            &target.path,
        )) {
            match dependency.as_target() {
                Some((name, path)) => {
                    if let Some(dependency_target) = traverser.target(path, name) {
                        parts.push(self.target_hash(
                            traverser,
                            &dependency_target,
                            state,
                            additional_strings,
                        )?);
                    }
                }
                None => parts.push(dependency_identity(&dependency)),
            }
        }

        parts.extend(additional_strings.iter().cloned());

        let digest = self.content_hasher.hash_parts(&parts);
        state.insert(reference, HashState::Done(digest.clone()));
        Ok(digest)
    }
}

fn settings_digest(settings: &BTreeMap<String, String>) -> Result<String, HashError> {
    // BTreeMap serializes keys in order, so the JSON is deterministic.
    Ok(serde_json::to_string(settings)?)
}

fn dependency_identity(dependency: &GraphDependency) -> String {
    match dependency {
        GraphDependency::Target { name, path } => {
            format!("target:{}:{}", path.display(), name)
        }
        GraphDependency::Framework { path } => format!("framework:{}", path.display()),
        GraphDependency::Xcframework { path } => format!("xcframework:{}", path.display()),
        GraphDependency::Library { path } => format!("library:{}", path.display()),
        GraphDependency::Bundle { path } => format!("bundle:{}", path.display()),
        GraphDependency::Package { product } => format!("package:{}", product),
        GraphDependency::Sdk { name } => format!("sdk:{}", name),
    }
}
