//! Depth-first traversal of builder trees

use std::sync::Arc;

use crate::domain_model::model_part::ModelPartRef;
use crate::navigable_path::NavigablePath;
use crate::results::builders::{FetchBuilder, ResultBuilder};

type ChildBuilders = Vec<(ModelPartRef, Arc<FetchBuilder>)>;

fn direct_children(
    visit: impl FnOnce(&mut dyn FnMut(&ModelPartRef, &Arc<FetchBuilder>)),
) -> ChildBuilders {
    let mut children = Vec::new();
    visit(&mut |part, child| children.push((part.clone(), child.clone())));
    children
}

/// Path a child builder addresses. Explicit builders carry no path: they sit
/// at the parent's path when they delegate for the parent's own part.
fn child_path(
    parent_path: &NavigablePath,
    parent_part: Option<&ModelPartRef>,
    part: &ModelPartRef,
    child: &FetchBuilder,
) -> NavigablePath {
    match child.fetch_path() {
        Some(path) => path.clone(),
        None if parent_part == Some(part) => parent_path.clone(),
        None => parent_path.append(part.name()),
    }
}

fn walk(
    path: &NavigablePath,
    builder: &FetchBuilder,
    depth: usize,
    visitor: &mut dyn FnMut(&NavigablePath, &ModelPartRef, &FetchBuilder, usize),
) {
    let children = direct_children(|v| builder.visit_fetch_builders(v));
    for (part, child) in children {
        let path = child_path(path, Some(builder.model_part()), &part, &child);
        visitor(&path, &part, &child, depth);
        walk(&path, &child, depth + 1, visitor);
    }
}

/// Visit every fetch builder below `root`, parents before children, with the
/// path each one addresses and its depth (0 for the root's direct children).
pub fn walk_fetch_builders(
    root: &ResultBuilder,
    visitor: &mut dyn FnMut(&NavigablePath, &ModelPartRef, &FetchBuilder, usize),
) {
    let Some(root_path) = root.navigable_path() else {
        return;
    };
    let children = direct_children(|v| root.visit_fetch_builders(v));
    for (part, child) in children {
        let path = child_path(root_path, None, &part, &child);
        visitor(&path, &part, &child, 0);
        walk(&path, &child, 1, visitor);
    }
}

/// Paths of all fetch builders below `root`, in traversal order.
pub fn collect_fetch_paths(root: &ResultBuilder) -> Vec<String> {
    let mut paths = Vec::new();
    walk_fetch_builders(root, &mut |path, _, _, _| paths.push(path.full_path()));
    paths
}
