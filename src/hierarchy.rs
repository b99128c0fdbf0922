//! Acyclic parent-child forests shared by departments, asset classes and
//! assets.
//!
//! The algorithms here only read through a [`NodeSource`], so the store can
//! run them against an open transaction and commit the write only after the
//! checks pass.

use std::collections::{HashSet, VecDeque};

use crate::error::{Error, Result};
use crate::types::{TreeKind, TreeNode, TreeView};

/// Upper bound on tree depth while building views.
pub const MAX_TREE_DEPTH: usize = 1024;

/// Read access to the rows of a forest.
pub trait NodeSource {
    fn node(&self, kind: TreeKind, id: i64) -> Result<Option<TreeNode>>;

    /// Direct children ordered by id.
    fn children(&self, kind: TreeKind, id: i64) -> Result<Vec<TreeNode>>;

    /// Parentless nodes of one scope ordered by id.
    fn roots(&self, kind: TreeKind, scope_id: i64) -> Result<Vec<TreeNode>>;
}

pub fn get_node<S: NodeSource + ?Sized>(src: &S, kind: TreeKind, id: i64) -> Result<TreeNode> {
    src.node(kind, id)?.ok_or_else(|| Error::node_not_found(kind))
}

/// Returns the chain from `id` up to its root, `id` first.
///
/// A revisited id or a dangling parent reference means the persisted forest
/// is corrupt and yields [`Error::HierarchyCorrupted`].
pub fn ancestor_chain<S: NodeSource + ?Sized>(
    src: &S,
    kind: TreeKind,
    id: i64,
) -> Result<Vec<TreeNode>> {
    let mut chain = vec![get_node(src, kind, id)?];
    let mut seen = HashSet::from([id]);

    while let Some(parent_id) = chain.last().and_then(|n| n.parent_id) {
        if !seen.insert(parent_id) {
            tracing::error!(%kind, id = parent_id, "cycle found in ancestor chain");
            return Err(Error::HierarchyCorrupted {
                kind,
                id: parent_id,
            });
        }
        match src.node(kind, parent_id)? {
            Some(parent) => chain.push(parent),
            None => {
                tracing::error!(%kind, id = parent_id, "dangling parent reference");
                return Err(Error::HierarchyCorrupted {
                    kind,
                    id: parent_id,
                });
            }
        }
    }

    Ok(chain)
}

/// Validates moving `node_id` under `new_parent` and returns the node.
///
/// `None` detaches the node and always passes. Otherwise the parent must
/// exist and be active, must not be the node or one of its descendants, and
/// must share the node's scope.
pub fn check_reparent<S: NodeSource + ?Sized>(
    src: &S,
    kind: TreeKind,
    node_id: i64,
    new_parent: Option<i64>,
) -> Result<TreeNode> {
    let node = get_node(src, kind, node_id)?;
    let Some(parent_id) = new_parent else {
        return Ok(node);
    };

    let parent = src
        .node(kind, parent_id)?
        .filter(|p| p.active)
        .ok_or_else(|| Error::parent_not_found(kind))?;

    let chain = ancestor_chain(src, kind, parent_id)?;
    if chain.iter().any(|n| n.id == node_id) {
        tracing::debug!(%kind, node_id, parent_id, "reparent rejected: cycle");
        return Err(Error::ParentCannotBeSuccessor);
    }

    if parent.scope_id != node.scope_id {
        tracing::debug!(%kind, node_id, parent_id, "reparent rejected: cross scope");
        return Err(Error::CrossScope(kind));
    }

    Ok(node)
}

/// All nodes below `id`, breadth first, excluding `id` itself.
pub fn descendants<S: NodeSource + ?Sized>(
    src: &S,
    kind: TreeKind,
    id: i64,
) -> Result<Vec<TreeNode>> {
    let mut out = Vec::new();
    let mut seen = HashSet::from([id]);
    let mut queue = VecDeque::from([id]);

    while let Some(current) = queue.pop_front() {
        for child in src.children(kind, current)? {
            if !seen.insert(child.id) {
                return Err(Error::HierarchyCorrupted { kind, id: child.id });
            }
            queue.push_back(child.id);
            out.push(child);
        }
    }

    Ok(out)
}

/// Refuses deletion of a node that still has children or references.
pub fn delete_guard<S: NodeSource + ?Sized>(
    src: &S,
    kind: TreeKind,
    id: i64,
    references: u64,
) -> Result<()> {
    get_node(src, kind, id)?;
    if !src.children(kind, id)?.is_empty() {
        return Err(Error::HasChildren(kind));
    }
    if references > 0 {
        return Err(Error::HasReferences(kind));
    }
    Ok(())
}

/// Builds the nested view rooted at `root`.
pub fn build_tree<S: NodeSource + ?Sized>(src: &S, kind: TreeKind, root: i64) -> Result<TreeView> {
    let node = get_node(src, kind, root)?;
    let mut visited = HashSet::new();
    expand(src, kind, node, &mut visited, 0)
}

/// Builds the views of every root in one scope.
pub fn build_forest<S: NodeSource + ?Sized>(
    src: &S,
    kind: TreeKind,
    scope_id: i64,
) -> Result<Vec<TreeView>> {
    let mut visited = HashSet::new();
    src.roots(kind, scope_id)?
        .into_iter()
        .map(|root| expand(src, kind, root, &mut visited, 0))
        .collect()
}

fn expand<S: NodeSource + ?Sized>(
    src: &S,
    kind: TreeKind,
    node: TreeNode,
    visited: &mut HashSet<i64>,
    depth: usize,
) -> Result<TreeView> {
    if depth > MAX_TREE_DEPTH || !visited.insert(node.id) {
        tracing::error!(%kind, id = node.id, depth, "revisited node while building tree");
        return Err(Error::HierarchyCorrupted { kind, id: node.id });
    }

    let children = src
        .children(kind, node.id)?
        .into_iter()
        .map(|child| expand(src, kind, child, visited, depth + 1))
        .collect::<Result<Vec<_>>>()?;

    Ok(TreeView { node, children })
}
