//! The native toolkit capability surface consumed by the engine, plus a
//! headless in-memory implementation used by the test suite and by
//! downstream renderer tests that have no display server.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::{IndexMap, IndexSet};
use log::trace;
use once_cell::sync::Lazy;
use phf::phf_map;
use serde_json::Value;

use crate::errors::ReconcileError;
use crate::types::Packing;

/// Opaque handle to one live native widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WidgetId(u64);

impl fmt::Display for WidgetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "widget#{}", self.0)
    }
}

/// Global id generator (lock-free, atomic).
static ID_COUNTER: Lazy<AtomicU64> = Lazy::new(|| AtomicU64::new(1));

fn next_widget_id() -> WidgetId {
    WidgetId(ID_COUNTER.fetch_add(1, Ordering::SeqCst))
}

/// Everything the engine asks of the native toolkit. All calls are blocking
/// and must run on the toolkit's UI thread; the engine itself introduces no
/// threads and performs no I/O.
pub trait Toolkit {
    /// Construct a widget of the given native class.
    fn construct(&mut self, class: &str) -> Result<WidgetId, ReconcileError>;

    /// Set a native property on an existing widget.
    fn set_property(&mut self, widget: WidgetId, key: &str, value: &Value)
    -> Result<(), ReconcileError>;

    /// Add a style tag to a widget.
    fn add_style_class(&mut self, widget: WidgetId, tag: &str) -> Result<(), ReconcileError>;

    /// Remove a style tag from a widget.
    fn remove_style_class(&mut self, widget: WidgetId, tag: &str) -> Result<(), ReconcileError>;

    /// A container's current children, in order.
    fn children(&self, widget: WidgetId) -> Result<Vec<WidgetId>, ReconcileError>;

    /// Append `child` as the last child of `parent`. Packing parameters are
    /// supplied only when the parent is a packed list.
    fn append_child(
        &mut self,
        parent: WidgetId,
        child: WidgetId,
        packing: Option<Packing>,
    ) -> Result<(), ReconcileError>;

    /// Move the child at `from` to position `to`, shifting the others.
    fn reposition_child(
        &mut self,
        parent: WidgetId,
        from: usize,
        to: usize,
    ) -> Result<(), ReconcileError>;

    /// Remove the child at `index` and destroy it together with its subtree.
    fn remove_child(&mut self, parent: WidgetId, index: usize) -> Result<(), ReconcileError>;

    /// Re-apply the packing parameters of the child at `index`.
    fn set_packing(
        &mut self,
        parent: WidgetId,
        index: usize,
        packing: Packing,
    ) -> Result<(), ReconcileError>;

    /// The cast capability: fail unless the live widget's concrete class is
    /// `class`.
    fn expect_class(&self, widget: WidgetId, class: &str) -> Result<(), ReconcileError>;

    /// Mark a widget and its whole subtree visible.
    fn show_all(&mut self, widget: WidgetId) -> Result<(), ReconcileError>;
}

/// Child-bearing behavior of a native class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChildPolicy {
    Leaf,
    Container,
}

// Compile-time class table (zero allocation). Constructing anything outside
// this set is a toolkit failure.
static NATIVE_CLASSES: phf::Map<&'static str, ChildPolicy> = phf_map! {
    "Label" => ChildPolicy::Leaf,
    "Image" => ChildPolicy::Leaf,
    "Button" => ChildPolicy::Leaf,
    "TextView" => ChildPolicy::Leaf,
    "DrawingArea" => ChildPolicy::Leaf,
    "Separator" => ChildPolicy::Leaf,
    "Box" => ChildPolicy::Container,
    "Frame" => ChildPolicy::Container,
    "EventBox" => ChildPolicy::Container,
    "ScrolledWindow" => ChildPolicy::Container,
    "Viewport" => ChildPolicy::Container,
};

/// One record in the headless toolkit's mutation journal. Read-only calls
/// (`children`, `expect_class`) are not journaled.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Construct { widget: WidgetId, class: String },
    SetProperty { widget: WidgetId, key: String, value: Value },
    AddClass { widget: WidgetId, tag: String },
    RemoveClass { widget: WidgetId, tag: String },
    AppendChild { parent: WidgetId, child: WidgetId },
    RepositionChild { parent: WidgetId, from: usize, to: usize },
    RemoveChild { parent: WidgetId, child: WidgetId },
    SetPacking { parent: WidgetId, index: usize, packing: Packing },
    ShowAll { widget: WidgetId },
}

#[derive(Debug)]
struct ChildSlot {
    widget: WidgetId,
    packing: Option<Packing>,
}

#[derive(Debug)]
struct LiveWidget {
    class: &'static str,
    policy: ChildPolicy,
    properties: IndexMap<String, Value>,
    style_classes: IndexSet<String>,
    children: Vec<ChildSlot>,
    visible: bool,
}

/// In-memory stand-in for the native toolkit: arena-style indexed storage
/// with per-class child policies and a journal of every mutation. Widgets
/// are destroyed exactly when their owning slot is removed.
#[derive(Debug, Default)]
pub struct HeadlessToolkit {
    widgets: HashMap<WidgetId, LiveWidget>,
    journal: Vec<Mutation>,
}

impl HeadlessToolkit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every mutation performed since construction or the last
    /// [`clear_journal`](Self::clear_journal).
    pub fn journal(&self) -> &[Mutation] {
        &self.journal
    }

    pub fn clear_journal(&mut self) {
        self.journal.clear();
    }

    /// Number of widgets currently alive in the arena.
    pub fn widget_count(&self) -> usize {
        self.widgets.len()
    }

    /// Whether the widget is still alive (i.e. has not been destroyed).
    pub fn contains(&self, widget: WidgetId) -> bool {
        self.widgets.contains_key(&widget)
    }

    pub fn class_of(&self, widget: WidgetId) -> Option<&str> {
        self.widgets.get(&widget).map(|w| w.class)
    }

    pub fn property(&self, widget: WidgetId, key: &str) -> Option<&Value> {
        self.widgets.get(&widget)?.properties.get(key)
    }

    pub fn style_classes(&self, widget: WidgetId) -> Option<&IndexSet<String>> {
        self.widgets.get(&widget).map(|w| &w.style_classes)
    }

    pub fn packing_of(&self, parent: WidgetId, index: usize) -> Option<Packing> {
        self.widgets.get(&parent)?.children.get(index)?.packing
    }

    pub fn is_visible(&self, widget: WidgetId) -> Option<bool> {
        self.widgets.get(&widget).map(|w| w.visible)
    }

    fn widget(&self, id: WidgetId) -> Result<&LiveWidget, ReconcileError> {
        self.widgets
            .get(&id)
            .ok_or_else(|| ReconcileError::toolkit(format!("unknown {id}")))
    }

    fn widget_mut(&mut self, id: WidgetId) -> Result<&mut LiveWidget, ReconcileError> {
        self.widgets
            .get_mut(&id)
            .ok_or_else(|| ReconcileError::toolkit(format!("unknown {id}")))
    }

    fn container_mut(&mut self, id: WidgetId) -> Result<&mut LiveWidget, ReconcileError> {
        let widget = self.widget_mut(id)?;
        if widget.policy != ChildPolicy::Container {
            return Err(ReconcileError::toolkit(format!(
                "class '{}' cannot hold children",
                widget.class
            )));
        }
        Ok(widget)
    }

    fn destroy_subtree(&mut self, id: WidgetId) {
        if let Some(widget) = self.widgets.remove(&id) {
            for slot in widget.children {
                self.destroy_subtree(slot.widget);
            }
        }
    }

    fn record(&mut self, mutation: Mutation) {
        trace!("headless toolkit: {mutation:?}");
        self.journal.push(mutation);
    }
}

impl Toolkit for HeadlessToolkit {
    fn construct(&mut self, class: &str) -> Result<WidgetId, ReconcileError> {
        let Some((&class, &policy)) = NATIVE_CLASSES.get_entry(class) else {
            return Err(ReconcileError::toolkit(format!(
                "cannot construct unknown native class '{class}'"
            )));
        };
        let id = next_widget_id();
        self.widgets.insert(
            id,
            LiveWidget {
                class,
                policy,
                properties: IndexMap::new(),
                style_classes: IndexSet::new(),
                children: Vec::new(),
                visible: false,
            },
        );
        self.record(Mutation::Construct {
            widget: id,
            class: class.to_string(),
        });
        Ok(id)
    }

    fn set_property(
        &mut self,
        widget: WidgetId,
        key: &str,
        value: &Value,
    ) -> Result<(), ReconcileError> {
        self.widget_mut(widget)?
            .properties
            .insert(key.to_string(), value.clone());
        self.record(Mutation::SetProperty {
            widget,
            key: key.to_string(),
            value: value.clone(),
        });
        Ok(())
    }

    fn add_style_class(&mut self, widget: WidgetId, tag: &str) -> Result<(), ReconcileError> {
        self.widget_mut(widget)?.style_classes.insert(tag.to_string());
        self.record(Mutation::AddClass {
            widget,
            tag: tag.to_string(),
        });
        Ok(())
    }

    fn remove_style_class(&mut self, widget: WidgetId, tag: &str) -> Result<(), ReconcileError> {
        self.widget_mut(widget)?.style_classes.shift_remove(tag);
        self.record(Mutation::RemoveClass {
            widget,
            tag: tag.to_string(),
        });
        Ok(())
    }

    fn children(&self, widget: WidgetId) -> Result<Vec<WidgetId>, ReconcileError> {
        Ok(self
            .widget(widget)?
            .children
            .iter()
            .map(|slot| slot.widget)
            .collect())
    }

    fn append_child(
        &mut self,
        parent: WidgetId,
        child: WidgetId,
        packing: Option<Packing>,
    ) -> Result<(), ReconcileError> {
        if !self.contains(child) {
            return Err(ReconcileError::toolkit(format!("unknown {child}")));
        }
        self.container_mut(parent)?
            .children
            .push(ChildSlot { widget: child, packing });
        self.record(Mutation::AppendChild { parent, child });
        Ok(())
    }

    fn reposition_child(
        &mut self,
        parent: WidgetId,
        from: usize,
        to: usize,
    ) -> Result<(), ReconcileError> {
        let container = self.container_mut(parent)?;
        let count = container.children.len();
        if from >= count || to >= count {
            return Err(ReconcileError::toolkit(format!(
                "reposition {from} -> {to} out of bounds for {count} children of {parent}"
            )));
        }
        let slot = container.children.remove(from);
        container.children.insert(to, slot);
        self.record(Mutation::RepositionChild { parent, from, to });
        Ok(())
    }

    fn remove_child(&mut self, parent: WidgetId, index: usize) -> Result<(), ReconcileError> {
        let container = self.container_mut(parent)?;
        if index >= container.children.len() {
            return Err(ReconcileError::toolkit(format!(
                "remove at {index} out of bounds for {} children of {parent}",
                container.children.len()
            )));
        }
        let slot = container.children.remove(index);
        self.destroy_subtree(slot.widget);
        self.record(Mutation::RemoveChild {
            parent,
            child: slot.widget,
        });
        Ok(())
    }

    fn set_packing(
        &mut self,
        parent: WidgetId,
        index: usize,
        packing: Packing,
    ) -> Result<(), ReconcileError> {
        let container = self.container_mut(parent)?;
        let count = container.children.len();
        let Some(slot) = container.children.get_mut(index) else {
            return Err(ReconcileError::toolkit(format!(
                "set_packing at {index} out of bounds for {count} children of {parent}"
            )));
        };
        slot.packing = Some(packing);
        self.record(Mutation::SetPacking {
            parent,
            index,
            packing,
        });
        Ok(())
    }

    fn expect_class(&self, widget: WidgetId, class: &str) -> Result<(), ReconcileError> {
        let actual = self.widget(widget)?.class;
        if actual != class {
            return Err(ReconcileError::toolkit(format!(
                "{widget} is a {actual}, expected {class}"
            )));
        }
        Ok(())
    }

    fn show_all(&mut self, widget: WidgetId) -> Result<(), ReconcileError> {
        let mut pending = vec![widget];
        while let Some(id) = pending.pop() {
            let live = self.widget_mut(id)?;
            live.visible = true;
            pending.extend(live.children.iter().map(|slot| slot.widget));
        }
        self.record(Mutation::ShowAll { widget });
        Ok(())
    }
}
