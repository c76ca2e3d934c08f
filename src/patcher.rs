//! Applies patch outcomes to the live widget tree through the toolkit
//! capability. The patcher owns all toolkit traffic; every decision it
//! executes was computed by the pure diff in `diff_engine`.

use log::{debug, warn};

use crate::ReconcilerOptions;
use crate::diff_engine::{SlotClass, classify_slot, collect_classes, collect_properties, patch};
use crate::errors::ReconcileError;
use crate::toolkit::{Toolkit, WidgetId};
use crate::types::{
    AttributeAssignment, BOX_CLASS, Description, NodeEdit, PackedChild, Packing, PatchOutcome,
    SCROLLER_CLASS, VIEWPORT_CLASS,
};

pub(crate) struct Patcher<'a, T: Toolkit> {
    toolkit: &'a mut T,
    options: &'a ReconcilerOptions,
}

impl<'a, T: Toolkit> Patcher<'a, T> {
    pub(crate) fn new(toolkit: &'a mut T, options: &'a ReconcilerOptions) -> Self {
        Patcher { toolkit, options }
    }

    /// Build a native widget tree from scratch and mark it visible. Used for
    /// the first render and for a root-level replace.
    pub(crate) fn build_tree(&mut self, tree: &Description) -> Result<WidgetId, ReconcileError> {
        let root = self.create(tree)?;
        self.toolkit.show_all(root)?;
        Ok(root)
    }

    /// Construct the native widget for one description, recursively building
    /// container children. Packing parameters are consumed here, at
    /// insertion time.
    pub(crate) fn create(&mut self, description: &Description) -> Result<WidgetId, ReconcileError> {
        match description {
            Description::Leaf(leaf) => {
                let id = self.toolkit.construct(&leaf.class)?;
                self.apply_attributes(id, &leaf.attributes)?;
                Ok(id)
            }
            Description::PackedList(list) => {
                let id = self.toolkit.construct(BOX_CLASS)?;
                self.apply_attributes(id, &list.attributes)?;
                for packed in &list.children {
                    let child = self.create(&packed.node)?;
                    self.toolkit.append_child(id, child, Some(packed.packing))?;
                }
                Ok(id)
            }
            Description::Scroller(scroller) => {
                let id = self.toolkit.construct(SCROLLER_CLASS)?;
                self.apply_attributes(id, &scroller.attributes)?;
                let viewport = self.toolkit.construct(VIEWPORT_CLASS)?;
                self.toolkit.append_child(id, viewport, None)?;
                let child = self.create(&scroller.child)?;
                self.toolkit.append_child(viewport, child, None)?;
                Ok(id)
            }
        }
    }

    /// Initial attribute application: every property, then the union of all
    /// declared style tags.
    fn apply_attributes(
        &mut self,
        id: WidgetId,
        attributes: &[AttributeAssignment],
    ) -> Result<(), ReconcileError> {
        for (key, value) in &collect_properties(attributes) {
            self.toolkit.set_property(id, key, value)?;
        }
        for tag in &collect_classes(attributes) {
            self.toolkit.add_style_class(id, tag)?;
        }
        Ok(())
    }

    /// Execute a Modify outcome: cast-check the live widget, re-apply the
    /// new property list, apply the tag delta, then recurse into container
    /// contents.
    pub(crate) fn modify(
        &mut self,
        id: WidgetId,
        edit: &NodeEdit,
        old: &Description,
        new: &Description,
    ) -> Result<(), ReconcileError> {
        self.toolkit.expect_class(id, new.native_class())?;
        for (key, value) in &edit.properties {
            self.toolkit.set_property(id, key, value)?;
        }
        for tag in &edit.classes.removed {
            self.toolkit.remove_style_class(id, tag)?;
        }
        for tag in &edit.classes.added {
            self.toolkit.add_style_class(id, tag)?;
        }
        match (old, new) {
            (Description::Leaf(_), Description::Leaf(_)) => Ok(()),
            (Description::PackedList(old_list), Description::PackedList(new_list)) => {
                self.reconcile_children(id, &old_list.children, &new_list.children)
            }
            (Description::Scroller(old_scroller), Description::Scroller(new_scroller)) => {
                self.patch_scroller(id, &old_scroller.child, &new_scroller.child)
            }
            _ => unreachable!("Modify is only produced for descriptions of matching kind"),
        }
    }

    /// The core child-list walk. `old` and `new` are the prior and new
    /// description lists; the live child list is snapshotted once up front
    /// and never re-queried. Walks logical slots `0..max` of the three
    /// sequences, keeping physical bookkeeping so that after the pass the
    /// container holds exactly the new list's children, in order.
    fn reconcile_children(
        &mut self,
        parent: WidgetId,
        old: &[PackedChild],
        new: &[PackedChild],
    ) -> Result<(), ReconcileError> {
        let live = self.toolkit.children(parent)?;
        let slots = live.len().max(old.len()).max(new.len());
        debug!(
            "reconciling {parent}: {} live, {} prior, {} new",
            live.len(),
            old.len(),
            new.len()
        );

        // `position` is the physical index the current logical slot occupies
        // (removals do not advance it), `count` the container's current
        // child count.
        let mut position = 0usize;
        let mut count = live.len();
        for index in 0..slots {
            let Some(slot) = classify_slot(index < live.len(), index < old.len(), index < new.len())
            else {
                break;
            };
            match slot {
                SlotClass::Patch => {
                    let prior = &old[index];
                    let next = &new[index];
                    match patch(&prior.node, &next.node) {
                        PatchOutcome::Keep => {
                            self.reapply_packing(parent, position, prior, next)?;
                        }
                        PatchOutcome::Modify(edit) => {
                            self.modify(live[index], &edit, &prior.node, &next.node)?;
                            self.reapply_packing(parent, position, prior, next)?;
                        }
                        PatchOutcome::Replace => {
                            self.toolkit.remove_child(parent, position)?;
                            count -= 1;
                            let built = self.create(&next.node)?;
                            self.insert_at(parent, built, position, count, Some(next.packing))?;
                            count += 1;
                        }
                    }
                    position += 1;
                }
                SlotClass::Rebuild => {
                    // No prior description for this live widget; rebuild the
                    // slot from the new description.
                    self.toolkit.remove_child(parent, position)?;
                    count -= 1;
                    let built = self.create(&new[index].node)?;
                    self.insert_at(parent, built, position, count, Some(new[index].packing))?;
                    count += 1;
                    position += 1;
                }
                SlotClass::Append => {
                    let built = self.create(&new[index].node)?;
                    self.toolkit
                        .append_child(parent, built, Some(new[index].packing))?;
                    self.toolkit.show_all(built)?;
                    count += 1;
                    position += 1;
                }
                SlotClass::Remove => {
                    self.toolkit.remove_child(parent, position)?;
                    count -= 1;
                }
                SlotClass::AlreadyAbsent => {}
                SlotClass::Stray => {
                    if self.options.prune_stray {
                        warn!(
                            "pruning stray child of {parent} at slot {index}: \
                             live tree does not match the prior description"
                        );
                        self.toolkit.remove_child(parent, position)?;
                        count -= 1;
                    } else {
                        position += 1;
                    }
                }
            }
        }
        Ok(())
    }

    /// Insert a freshly built widget at `position`. Composed from the
    /// toolkit's append and reposition capabilities; `count` is the child
    /// count before the append.
    fn insert_at(
        &mut self,
        parent: WidgetId,
        child: WidgetId,
        position: usize,
        count: usize,
        packing: Option<Packing>,
    ) -> Result<(), ReconcileError> {
        self.toolkit.append_child(parent, child, packing)?;
        if position != count {
            self.toolkit.reposition_child(parent, count, position)?;
        }
        self.toolkit.show_all(child)?;
        Ok(())
    }

    fn reapply_packing(
        &mut self,
        parent: WidgetId,
        position: usize,
        prior: &PackedChild,
        next: &PackedChild,
    ) -> Result<(), ReconcileError> {
        if self.options.reapply_packing && prior.packing != next.packing {
            self.toolkit.set_packing(parent, position, next.packing)?;
        }
        Ok(())
    }

    /// Patch the sole child of a scroller. The wrapper must hold exactly one
    /// viewport, and the viewport exactly one child; anything else is a
    /// structural invariant violation.
    fn patch_scroller(
        &mut self,
        scroller: WidgetId,
        old: &Description,
        new: &Description,
    ) -> Result<(), ReconcileError> {
        let viewports = self.toolkit.children(scroller)?;
        if viewports.len() != 1 {
            return Err(ReconcileError::structure(format!(
                "scroller {scroller} holds {} children, expected exactly one viewport",
                viewports.len()
            )));
        }
        let viewport = viewports[0];
        self.toolkit.expect_class(viewport, VIEWPORT_CLASS)?;
        let contents = self.toolkit.children(viewport)?;
        if contents.len() != 1 {
            return Err(ReconcileError::structure(format!(
                "viewport {viewport} holds {} children, expected exactly one",
                contents.len()
            )));
        }
        match patch(old, new) {
            PatchOutcome::Keep => Ok(()),
            PatchOutcome::Modify(edit) => self.modify(contents[0], &edit, old, new),
            PatchOutcome::Replace => {
                self.toolkit.remove_child(viewport, 0)?;
                let built = self.create(new)?;
                self.toolkit.append_child(viewport, built, None)?;
                self.toolkit.show_all(built)?;
                Ok(())
            }
        }
    }
}
