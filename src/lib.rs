//! Reconciles immutable widget-description trees against a single live,
//! mutable native widget tree, applying only the minimal mutations needed to
//! bring the two in sync.
//!
//! The renderer (external) produces a fresh [`Description`] tree per render
//! pass; the caller hands the engine the live root, the tree the live root
//! was built from, and the new tree. The engine is generic over [`Toolkit`],
//! the capability surface of the native GUI library, and ships a
//! [`HeadlessToolkit`] so the diff and apply logic can be exercised without
//! a display server.

mod diff_engine;
mod errors;
mod patcher;
mod toolkit;
mod transcode;
mod types;

pub use diff_engine::{diff_classes, patch};
pub use errors::ReconcileError;
pub use toolkit::{HeadlessToolkit, Mutation, Toolkit, WidgetId};
pub use transcode::{Filter, FilterChain, SourceInput, StreamKind, StreamSelector, TranscodeJob};
pub use types::{
    AttributeAssignment, BOX_CLASS, ClassDelta, Description, LeafNode, NodeEdit, PackedChild,
    PackedListNode, Packing, PatchOutcome, SCROLLER_CLASS, ScrollerNode, VIEWPORT_CLASS,
};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::patcher::Patcher;

/// Knobs for behavior the engine deliberately leaves to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcilerOptions {
    /// Re-apply packing parameters on a kept slot when they changed between
    /// the prior and new description. Packing is otherwise consumed only at
    /// insertion time.
    pub reapply_packing: bool,
    /// Remove live children that neither description list accounts for.
    /// Such widgets mean the caller supplied a prior tree that does not
    /// match the live tree; with this off they are left in place.
    pub prune_stray: bool,
}

impl Default for ReconcilerOptions {
    fn default() -> Self {
        ReconcilerOptions {
            reapply_packing: true,
            prune_stray: true,
        }
    }
}

/// The reconciliation engine. Stateless apart from its options: every call
/// receives the live tree and both description trees, and nothing is
/// retained between calls.
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    options: ReconcilerOptions,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ReconcilerOptions) -> Self {
        Reconciler { options }
    }

    pub fn options(&self) -> &ReconcilerOptions {
        &self.options
    }

    /// First render: build the native tree for `tree` and mark it visible.
    /// The caller owns the returned root and keeps it alive across
    /// subsequent [`reconcile`](Self::reconcile) calls.
    pub fn create<T: Toolkit>(
        &self,
        toolkit: &mut T,
        tree: &Description,
    ) -> Result<WidgetId, ReconcileError> {
        Patcher::new(toolkit, &self.options).build_tree(tree)
    }

    /// Incremental update: mutate the live tree rooted at `live_root`,
    /// assumed to correspond to `old`, until it corresponds to `new`.
    ///
    /// Returns the root widget id after the pass. It differs from
    /// `live_root` only when the root patch was a replace; the previous root
    /// is then no longer managed by the engine and is the caller's to
    /// discard. A pass runs to completion or fails; on failure the live
    /// tree may be left partially updated.
    pub fn reconcile<T: Toolkit>(
        &self,
        toolkit: &mut T,
        live_root: WidgetId,
        old: &Description,
        new: &Description,
    ) -> Result<WidgetId, ReconcileError> {
        let mut patcher = Patcher::new(toolkit, &self.options);
        match patch(old, new) {
            PatchOutcome::Keep => {
                debug!("reconcile: trees are equal, nothing to do");
                Ok(live_root)
            }
            PatchOutcome::Modify(edit) => {
                debug!("reconcile: patching {live_root} in place");
                patcher.modify(live_root, &edit, old, new)?;
                Ok(live_root)
            }
            PatchOutcome::Replace => {
                debug!("reconcile: root kind changed, rebuilding the tree");
                patcher.build_tree(new)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn label(text: &str) -> Description {
        Description::Leaf(LeafNode {
            class: "Label".to_string(),
            attributes: vec![AttributeAssignment::Property {
                key: "text".to_string(),
                value: json!(text),
            }],
        })
    }

    fn column(children: Vec<Description>) -> Description {
        Description::PackedList(PackedListNode {
            attributes: vec![AttributeAssignment::Property {
                key: "orientation".to_string(),
                value: json!("vertical"),
            }],
            children: children
                .into_iter()
                .map(|node| PackedChild {
                    node,
                    packing: Packing::default(),
                })
                .collect(),
        })
    }

    #[test]
    fn create_builds_and_shows_the_whole_tree() {
        let mut toolkit = HeadlessToolkit::new();
        let tree = column(vec![label("a"), label("b")]);
        let root = Reconciler::new().create(&mut toolkit, &tree).unwrap();

        assert_eq!(toolkit.class_of(root), Some(BOX_CLASS));
        assert_eq!(
            toolkit.property(root, "orientation"),
            Some(&json!("vertical"))
        );
        let children = toolkit.children(root).unwrap();
        assert_eq!(children.len(), 2);
        assert_eq!(toolkit.is_visible(root), Some(true));
        assert_eq!(toolkit.is_visible(children[1]), Some(true));
    }

    #[test]
    fn reconciling_identical_trees_performs_zero_mutations() {
        let mut toolkit = HeadlessToolkit::new();
        let reconciler = Reconciler::new();
        let tree = column(vec![label("a"), label("b"), label("c")]);
        let root = reconciler.create(&mut toolkit, &tree).unwrap();

        toolkit.clear_journal();
        let kept = reconciler
            .reconcile(&mut toolkit, root, &tree, &tree)
            .unwrap();
        assert_eq!(kept, root);
        assert!(toolkit.journal().is_empty());
    }

    #[test]
    fn root_kind_change_returns_a_fresh_root() {
        let mut toolkit = HeadlessToolkit::new();
        let reconciler = Reconciler::new();
        let old = label("a");
        let new = column(vec![label("a")]);

        let root = reconciler.create(&mut toolkit, &old).unwrap();
        let fresh = reconciler.reconcile(&mut toolkit, root, &old, &new).unwrap();
        assert_ne!(fresh, root);
        assert_eq!(toolkit.class_of(fresh), Some(BOX_CLASS));
        // The previous root is the caller's to discard.
        assert!(toolkit.contains(root));
    }

    #[test]
    fn default_options_prune_and_reapply() {
        let options = ReconcilerOptions::default();
        assert!(options.reapply_packing);
        assert!(options.prune_stray);
    }
}
