use std::fmt;

use serde::{Deserialize, Serialize};

/// The forests kept acyclic by the hierarchy module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeKind {
    /// Scoped by entity.
    Department,
    /// Scoped by department.
    AssetClass,
    /// Scoped by department.
    Asset,
}

impl TreeKind {
    pub(crate) const fn table(self) -> &'static str {
        match self {
            TreeKind::Department => "departments",
            TreeKind::AssetClass => "asset_classes",
            TreeKind::Asset => "assets",
        }
    }

    pub(crate) const fn scope_column(self) -> &'static str {
        match self {
            TreeKind::Department => "entity_id",
            TreeKind::AssetClass | TreeKind::Asset => "department_id",
        }
    }
}

impl fmt::Display for TreeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TreeKind::Department => "department",
            TreeKind::AssetClass => "asset class",
            TreeKind::Asset => "asset",
        };
        f.write_str(name)
    }
}

/// The tree-relevant projection of a Department, AssetClass or Asset row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    pub id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<i64>,
    pub scope_id: i64,
    /// False for expired assets, which are not valid reparent targets.
    pub active: bool,
}

/// Nested presentation of a subtree.
#[derive(Debug, Clone, Serialize)]
pub struct TreeView {
    #[serde(flatten)]
    pub node: TreeNode,
    pub children: Vec<TreeView>,
}

impl TreeView {
    /// Number of nodes in this subtree, root included.
    #[must_use]
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(TreeView::node_count).sum::<usize>()
    }

    /// Drops inactive nodes. Active nodes below a dropped node move up to
    /// the dropped node's place.
    #[must_use]
    pub fn into_active(self) -> Vec<TreeView> {
        let children: Vec<TreeView> = self
            .children
            .into_iter()
            .flat_map(TreeView::into_active)
            .collect();

        if self.node.active {
            vec![TreeView {
                node: self.node,
                children,
            }]
        } else {
            children
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(id: i64, active: bool, children: Vec<TreeView>) -> TreeView {
        TreeView {
            node: TreeNode {
                id,
                name: format!("n{id}"),
                parent_id: None,
                scope_id: 1,
                active,
            },
            children,
        }
    }

    #[test]
    fn test_into_active_lifts_live_children() {
        let tree = view(
            1,
            true,
            vec![view(2, false, vec![view(3, true, vec![]), view(4, false, vec![])])],
        );
        assert_eq!(tree.node_count(), 4);

        let active = tree.into_active();
        assert_eq!(active.len(), 1);
        let ids: Vec<i64> = active[0].children.iter().map(|c| c.node.id).collect();
        assert_eq!(ids, vec![3]);
        assert_eq!(active[0].node_count(), 2);

        assert!(view(9, false, vec![]).into_active().is_empty());
    }
}
