mod models;
mod roles;
mod tree;
mod updates;

pub use models::*;
pub use roles::RoleFlags;
pub use tree::{TreeKind, TreeNode, TreeView};
pub use updates::{AssetUpdate, NewAsset, NewTask, NewUser};
