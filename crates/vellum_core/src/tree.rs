//! Per-window split layout and tab strips.
//!
//! Each window owns one tree of Branch and Leaf nodes: a Branch is a
//! horizontal or vertical divider with sized children, a Leaf is a tab
//! strip of open documents. The tree is kept minimal - no Branch ever
//! survives with fewer than two children, and a Leaf emptied by a close or
//! move collapses into its parent (the root leaf is the exception: a
//! window with nothing open keeps a single empty leaf).
//!
//! Trees are orthogonal to the sync protocol: they describe *where*
//! documents are displayed, never what they contain.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{AuthorityError, Result};

/// Identity of a top-level window.
pub type WindowId = u64;

/// Stable identifier of a tree node, for addressing layout mutations.
pub type NodeId = u64;

/// Orientation of a Branch divider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "lowercase")]
pub enum SplitDirection {
    /// Children sit side by side.
    Horizontal,
    /// Children are stacked.
    Vertical,
}

/// A tab strip entry. Many OpenDocuments across different leaves may
/// reference the same underlying document; content lives in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct OpenDocument {
    /// Path of the underlying document.
    pub path: PathBuf,
    /// Pinned tabs resist "close others" / "close all".
    #[serde(default)]
    pub pinned: bool,
    /// Optional display icon name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl OpenDocument {
    /// An unpinned tab for `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            pinned: false,
            icon: None,
        }
    }

    /// Builder: mark the tab pinned.
    pub fn pinned(mut self) -> Self {
        self.pinned = true;
        self
    }
}

/// A node of the layout tree. Serializes to the persisted JSON shape:
/// `{type:'branch', id, direction, nodes, sizes}` or
/// `{type:'leaf', id, open_files, active_file}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TreeNode {
    /// A divider with sized children.
    Branch {
        /// Stable node id.
        id: NodeId,
        /// Split orientation.
        direction: SplitDirection,
        /// Ordered children; always at least two.
        nodes: Vec<TreeNode>,
        /// Relative sizes, one per child, all positive. Conventionally they
        /// sum to 100 but are not required to.
        sizes: Vec<f64>,
    },
    /// A tab strip.
    Leaf {
        /// Stable node id.
        id: NodeId,
        /// Ordered tabs.
        open_files: Vec<OpenDocument>,
        /// Path of the active tab, if any.
        active_file: Option<PathBuf>,
    },
}

impl TreeNode {
    /// The node's stable id.
    pub fn id(&self) -> NodeId {
        match self {
            TreeNode::Branch { id, .. } | TreeNode::Leaf { id, .. } => *id,
        }
    }

    /// True for Leaf nodes.
    pub fn is_leaf(&self) -> bool {
        matches!(self, TreeNode::Leaf { .. })
    }

    fn empty_leaf(id: NodeId) -> Self {
        TreeNode::Leaf {
            id,
            open_files: Vec::new(),
            active_file: None,
        }
    }
}

/// Outcome of a tab removal: whether a leaf collapsed as a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TabRemoval {
    /// The leaf that was deleted by the removal, if any.
    pub deleted_leaf: Option<NodeId>,
}

/// The split layout of one window.
#[derive(Debug, Clone)]
pub struct DocumentTree {
    window: WindowId,
    root: TreeNode,
    next_id: NodeId,
}

impl DocumentTree {
    /// A fresh tree: a single empty leaf.
    pub fn new(window: WindowId) -> Self {
        Self {
            window,
            root: TreeNode::empty_leaf(1),
            next_id: 2,
        }
    }

    /// Restore a tree from its persisted JSON shape.
    ///
    /// The restored tree is validated; malformed layouts (size/child arity,
    /// unary branches, empty non-root leaves, duplicate ids) are rejected
    /// with [`AuthorityError::InvalidLayout`].
    pub fn from_json(window: WindowId, json: &str) -> Result<Self> {
        let root: TreeNode = serde_json::from_str(json)?;
        let mut max_id = 0;
        validate_node(&root, true, &mut Vec::new(), &mut max_id)?;
        Ok(Self {
            window,
            root,
            next_id: max_id + 1,
        })
    }

    /// The persisted JSON shape of the whole tree.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.root)?)
    }

    /// The owning window.
    pub fn window(&self) -> WindowId {
        self.window
    }

    /// The root node.
    pub fn root(&self) -> &TreeNode {
        &self.root
    }

    fn alloc_id(&mut self) -> NodeId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn find(&self, id: NodeId) -> Option<&TreeNode> {
        find_node(&self.root, id)
    }

    fn find_mut(&mut self, id: NodeId) -> Option<&mut TreeNode> {
        find_node_mut(&mut self.root, id)
    }

    fn leaf_mut(&mut self, id: NodeId) -> Result<(&mut Vec<OpenDocument>, &mut Option<PathBuf>)> {
        match self.find_mut(id) {
            Some(TreeNode::Leaf {
                open_files,
                active_file,
                ..
            }) => Ok((open_files, active_file)),
            Some(TreeNode::Branch { .. }) => Err(AuthorityError::InvalidLayout(format!(
                "node {id} is a branch, not a leaf"
            ))),
            None => Err(AuthorityError::UnknownNode(id)),
        }
    }

    /// Replace leaf `leaf_id` with a Branch holding it and a new sibling
    /// leaf of equal size. The original tab strip stays with the original
    /// leaf; the new leaf starts with a copy of the active tab so it is
    /// populated immediately.
    ///
    /// Splitting an empty leaf is rejected: both resulting leaves would be
    /// empty, and an empty leaf is only valid as the root of a fresh
    /// window.
    ///
    /// Returns the new branch id and the two leaf ids (original first).
    pub fn split_leaf(
        &mut self,
        leaf_id: NodeId,
        direction: SplitDirection,
    ) -> Result<(NodeId, [NodeId; 2])> {
        match self.find(leaf_id) {
            Some(TreeNode::Leaf { open_files, .. }) => {
                if open_files.is_empty() {
                    return Err(AuthorityError::InvalidLayout(format!(
                        "cannot split empty leaf {leaf_id}"
                    )));
                }
            }
            Some(TreeNode::Branch { .. }) => {
                return Err(AuthorityError::InvalidLayout(format!(
                    "cannot split branch {leaf_id}"
                )));
            }
            None => return Err(AuthorityError::UnknownNode(leaf_id)),
        }

        let branch_id = self.alloc_id();
        let new_leaf_id = self.alloc_id();
        split_in(&mut self.root, leaf_id, direction, branch_id, new_leaf_id);
        log::debug!(
            "[Tree] window {} split leaf {leaf_id} -> branch {branch_id} + leaf {new_leaf_id}",
            self.window
        );
        Ok((branch_id, [leaf_id, new_leaf_id]))
    }

    /// Remove a leaf. Its parent Branch collapses if left unary; closing
    /// the last remaining leaf resets the window to a fresh empty leaf.
    ///
    /// Returns the id of the replacement root leaf if one was created.
    pub fn close_leaf(&mut self, leaf_id: NodeId) -> Result<Option<NodeId>> {
        match self.find(leaf_id) {
            Some(node) if node.is_leaf() => {}
            Some(_) => {
                return Err(AuthorityError::InvalidLayout(format!(
                    "cannot close branch {leaf_id} as a leaf"
                )));
            }
            None => return Err(AuthorityError::UnknownNode(leaf_id)),
        }

        if self.root.id() == leaf_id {
            let fresh = self.alloc_id();
            self.root = TreeNode::empty_leaf(fresh);
            return Ok(Some(fresh));
        }
        remove_leaf_in(&mut self.root, leaf_id);
        log::debug!("[Tree] window {} closed leaf {leaf_id}", self.window);
        Ok(None)
    }

    /// Relocate a tab between (or within) tab strips, making it the active
    /// tab of the target. A source leaf emptied by the move collapses just
    /// like `close_leaf`.
    pub fn move_tab(
        &mut self,
        from_leaf: NodeId,
        to_leaf: NodeId,
        path: &Path,
        index: usize,
    ) -> Result<TabRemoval> {
        // Validate the target up front so a bad destination cannot strand
        // the tab after removal.
        self.leaf_mut(to_leaf)?;

        let (open_files, active_file) = self.leaf_mut(from_leaf)?;
        let pos = open_files
            .iter()
            .position(|d| d.path == path)
            .ok_or_else(|| {
                AuthorityError::InvalidLayout(format!(
                    "'{}' is not open in leaf {from_leaf}",
                    path.display()
                ))
            })?;
        let doc = open_files.remove(pos);
        if active_file.as_deref() == Some(path) {
            *active_file = open_files
                .get(pos.min(open_files.len().saturating_sub(1)))
                .map(|d| d.path.clone());
        }

        let (target_files, target_active) = self.leaf_mut(to_leaf)?;
        let idx = index.min(target_files.len());
        *target_active = Some(doc.path.clone());
        target_files.insert(idx, doc);

        let deleted = if from_leaf != to_leaf {
            self.collapse_if_empty(from_leaf)
        } else {
            None
        };
        Ok(TabRemoval {
            deleted_leaf: deleted,
        })
    }

    /// Replace a Branch's child sizes.
    ///
    /// Rejected with [`AuthorityError::InvalidLayout`] unless there is one
    /// positive size per child; the layout is untouched on rejection.
    pub fn resize(&mut self, branch_id: NodeId, new_sizes: Vec<f64>) -> Result<()> {
        match self.find_mut(branch_id) {
            Some(TreeNode::Branch { nodes, sizes, .. }) => {
                if new_sizes.len() != nodes.len() {
                    return Err(AuthorityError::InvalidLayout(format!(
                        "{} sizes for {} children",
                        new_sizes.len(),
                        nodes.len()
                    )));
                }
                if new_sizes.iter().any(|s| *s <= 0.0 || !s.is_finite()) {
                    return Err(AuthorityError::InvalidLayout(
                        "sizes must be positive".to_string(),
                    ));
                }
                *sizes = new_sizes;
                Ok(())
            }
            Some(TreeNode::Leaf { .. }) => Err(AuthorityError::InvalidLayout(format!(
                "node {branch_id} is a leaf, not a branch"
            ))),
            None => Err(AuthorityError::UnknownNode(branch_id)),
        }
    }

    /// Open a document in a leaf (or focus it if already open there).
    pub fn open_in_leaf(&mut self, leaf_id: NodeId, doc: OpenDocument) -> Result<()> {
        let (open_files, active_file) = self.leaf_mut(leaf_id)?;
        if !open_files.iter().any(|d| d.path == doc.path) {
            open_files.push(doc.clone());
        }
        *active_file = Some(doc.path);
        Ok(())
    }

    /// Close one tab. If other tabs remain, the neighbor becomes active
    /// (the leaf is repopulated atomically); an emptied non-root leaf
    /// collapses.
    pub fn close_tab(&mut self, leaf_id: NodeId, path: &Path) -> Result<TabRemoval> {
        let (open_files, active_file) = self.leaf_mut(leaf_id)?;
        let pos = open_files
            .iter()
            .position(|d| d.path == path)
            .ok_or_else(|| {
                AuthorityError::InvalidLayout(format!(
                    "'{}' is not open in leaf {leaf_id}",
                    path.display()
                ))
            })?;
        open_files.remove(pos);
        if active_file.as_deref() == Some(path) {
            *active_file = open_files
                .get(pos.min(open_files.len().saturating_sub(1)))
                .map(|d| d.path.clone());
        }
        Ok(TabRemoval {
            deleted_leaf: self.collapse_if_empty(leaf_id),
        })
    }

    /// Close every unpinned tab in a leaf except `keep`, which must be
    /// open there. Returns the paths of the closed tabs.
    pub fn close_other_tabs(&mut self, leaf_id: NodeId, keep: &Path) -> Result<Vec<PathBuf>> {
        let (open_files, active_file) = self.leaf_mut(leaf_id)?;
        if !open_files.iter().any(|d| d.path == keep) {
            return Err(AuthorityError::InvalidLayout(format!(
                "'{}' is not open in leaf {leaf_id}",
                keep.display()
            )));
        }
        let mut removed = Vec::new();
        open_files.retain(|d| {
            if d.pinned || d.path == keep {
                true
            } else {
                removed.push(d.path.clone());
                false
            }
        });
        if !open_files.iter().any(|d| Some(d.path.as_path()) == active_file.as_deref()) {
            *active_file = Some(keep.to_path_buf());
        }
        Ok(removed)
    }

    /// Close every unpinned tab in a leaf. The leaf survives if pinned tabs
    /// remain; otherwise it collapses like `close_tab` would. Returns the
    /// paths of the closed tabs alongside the collapse outcome.
    pub fn close_all_tabs(&mut self, leaf_id: NodeId) -> Result<(Vec<PathBuf>, TabRemoval)> {
        let (open_files, active_file) = self.leaf_mut(leaf_id)?;
        let mut removed = Vec::new();
        open_files.retain(|d| {
            if d.pinned {
                true
            } else {
                removed.push(d.path.clone());
                false
            }
        });
        *active_file = open_files.first().map(|d| d.path.clone());
        let removal = TabRemoval {
            deleted_leaf: self.collapse_if_empty(leaf_id),
        };
        Ok((removed, removal))
    }

    /// Make `path` the active tab of a leaf.
    pub fn set_active(&mut self, leaf_id: NodeId, path: &Path) -> Result<()> {
        let (open_files, active_file) = self.leaf_mut(leaf_id)?;
        if !open_files.iter().any(|d| d.path == path) {
            return Err(AuthorityError::InvalidLayout(format!(
                "'{}' is not open in leaf {leaf_id}",
                path.display()
            )));
        }
        *active_file = Some(path.to_path_buf());
        Ok(())
    }

    /// Sort a leaf's tabs: pinned first, then by file name.
    pub fn sort_tabs(&mut self, leaf_id: NodeId) -> Result<()> {
        let (open_files, _) = self.leaf_mut(leaf_id)?;
        open_files.sort_by(|a, b| {
            b.pinned
                .cmp(&a.pinned)
                .then_with(|| a.path.file_name().cmp(&b.path.file_name()))
        });
        Ok(())
    }

    /// The active tab of a leaf.
    pub fn active_in(&self, leaf_id: NodeId) -> Result<Option<PathBuf>> {
        match self.find(leaf_id) {
            Some(TreeNode::Leaf { active_file, .. }) => Ok(active_file.clone()),
            Some(TreeNode::Branch { .. }) => Err(AuthorityError::InvalidLayout(format!(
                "node {leaf_id} is a branch, not a leaf"
            ))),
            None => Err(AuthorityError::UnknownNode(leaf_id)),
        }
    }

    /// Ids of every leaf, in document order.
    pub fn leaf_ids(&self) -> Vec<NodeId> {
        let mut ids = Vec::new();
        collect_leaves(&self.root, &mut ids);
        ids
    }

    /// Ids of leaves whose tab strip contains `path`.
    pub fn leaves_showing(&self, path: &Path) -> Vec<NodeId> {
        let mut out = Vec::new();
        collect_leaves_showing(&self.root, path, &mut out);
        out
    }

    /// Every distinct path open somewhere in this window.
    pub fn open_paths(&self) -> Vec<PathBuf> {
        let mut out = Vec::new();
        collect_paths(&self.root, &mut out);
        out.dedup();
        out
    }

    /// Check the structural invariants (used by tests and after restore).
    pub fn validate(&self) -> Result<()> {
        let mut max_id = 0;
        validate_node(&self.root, true, &mut Vec::new(), &mut max_id)
    }

    fn collapse_if_empty(&mut self, leaf_id: NodeId) -> Option<NodeId> {
        let empty = matches!(
            self.find(leaf_id),
            Some(TreeNode::Leaf { open_files, .. }) if open_files.is_empty()
        );
        if !empty || self.root.id() == leaf_id {
            return None;
        }
        remove_leaf_in(&mut self.root, leaf_id);
        log::debug!(
            "[Tree] window {} collapsed empty leaf {leaf_id}",
            self.window
        );
        Some(leaf_id)
    }
}

fn find_node(node: &TreeNode, id: NodeId) -> Option<&TreeNode> {
    if node.id() == id {
        return Some(node);
    }
    match node {
        TreeNode::Branch { nodes, .. } => nodes.iter().find_map(|c| find_node(c, id)),
        TreeNode::Leaf { .. } => None,
    }
}

fn find_node_mut(node: &mut TreeNode, id: NodeId) -> Option<&mut TreeNode> {
    if node.id() == id {
        return Some(node);
    }
    match node {
        TreeNode::Branch { nodes, .. } => nodes.iter_mut().find_map(|c| find_node_mut(c, id)),
        TreeNode::Leaf { .. } => None,
    }
}

fn split_in(
    node: &mut TreeNode,
    target: NodeId,
    direction: SplitDirection,
    branch_id: NodeId,
    new_leaf_id: NodeId,
) -> bool {
    if node.id() == target && node.is_leaf() {
        let original = std::mem::replace(node, TreeNode::empty_leaf(0));
        let seeded = match &original {
            TreeNode::Leaf { active_file, open_files, .. } => active_file
                .as_ref()
                .and_then(|p| open_files.iter().find(|d| &d.path == p))
                .cloned(),
            TreeNode::Branch { .. } => None,
        };
        let new_leaf = TreeNode::Leaf {
            id: new_leaf_id,
            active_file: seeded.as_ref().map(|d| d.path.clone()),
            open_files: seeded.into_iter().collect(),
        };
        *node = TreeNode::Branch {
            id: branch_id,
            direction,
            nodes: vec![original, new_leaf],
            sizes: vec![50.0, 50.0],
        };
        return true;
    }
    match node {
        TreeNode::Branch { nodes, .. } => nodes
            .iter_mut()
            .any(|c| split_in(c, target, direction, branch_id, new_leaf_id)),
        TreeNode::Leaf { .. } => false,
    }
}

/// Remove the leaf with id `target` from the subtree. A Branch left with a
/// single child is replaced by that child, so no unary branch survives.
fn remove_leaf_in(node: &mut TreeNode, target: NodeId) -> bool {
    let TreeNode::Branch { nodes, sizes, .. } = &mut *node else {
        return false;
    };
    if let Some(pos) = nodes
        .iter()
        .position(|c| c.is_leaf() && c.id() == target)
    {
        nodes.remove(pos);
        sizes.remove(pos);
    } else if !nodes.iter_mut().any(|c| remove_leaf_in(c, target)) {
        return false;
    }
    // A recursive removal may also have collapsed a child branch into a
    // leaf; only this branch's own arity matters here.
    if nodes.len() == 1
        && let Some(only) = nodes.pop()
    {
        *node = only;
    }
    true
}

fn collect_leaves(node: &TreeNode, out: &mut Vec<NodeId>) {
    match node {
        TreeNode::Leaf { id, .. } => out.push(*id),
        TreeNode::Branch { nodes, .. } => {
            for child in nodes {
                collect_leaves(child, out);
            }
        }
    }
}

fn collect_leaves_showing(node: &TreeNode, path: &Path, out: &mut Vec<NodeId>) {
    match node {
        TreeNode::Leaf { id, open_files, .. } => {
            if open_files.iter().any(|d| d.path == path) {
                out.push(*id);
            }
        }
        TreeNode::Branch { nodes, .. } => {
            for child in nodes {
                collect_leaves_showing(child, path, out);
            }
        }
    }
}

fn collect_paths(node: &TreeNode, out: &mut Vec<PathBuf>) {
    match node {
        TreeNode::Leaf { open_files, .. } => {
            for doc in open_files {
                if !out.contains(&doc.path) {
                    out.push(doc.path.clone());
                }
            }
        }
        TreeNode::Branch { nodes, .. } => {
            for child in nodes {
                collect_paths(child, out);
            }
        }
    }
}

fn validate_node(
    node: &TreeNode,
    is_root: bool,
    seen: &mut Vec<NodeId>,
    max_id: &mut NodeId,
) -> Result<()> {
    let id = node.id();
    if seen.contains(&id) {
        return Err(AuthorityError::InvalidLayout(format!("duplicate node id {id}")));
    }
    seen.push(id);
    *max_id = (*max_id).max(id);

    match node {
        TreeNode::Leaf { open_files, active_file, .. } => {
            if open_files.is_empty() && !is_root {
                return Err(AuthorityError::InvalidLayout(format!(
                    "leaf {id} is empty"
                )));
            }
            if let Some(active) = active_file
                && !open_files.iter().any(|d| &d.path == active)
            {
                return Err(AuthorityError::InvalidLayout(format!(
                    "leaf {id} active file is not among its tabs"
                )));
            }
            Ok(())
        }
        TreeNode::Branch { nodes, sizes, .. } => {
            if nodes.len() < 2 {
                return Err(AuthorityError::InvalidLayout(format!(
                    "branch {id} has {} children",
                    nodes.len()
                )));
            }
            if sizes.len() != nodes.len() {
                return Err(AuthorityError::InvalidLayout(format!(
                    "branch {id} has {} sizes for {} children",
                    sizes.len(),
                    nodes.len()
                )));
            }
            if sizes.iter().any(|s| *s <= 0.0 || !s.is_finite()) {
                return Err(AuthorityError::InvalidLayout(format!(
                    "branch {id} has a non-positive size"
                )));
            }
            for child in nodes {
                validate_node(child, false, seen, max_id)?;
            }
            Ok(())
        }
    }
}
