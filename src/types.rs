//! Description tree data model: immutable node descriptions, packing
//! parameters and the patch outcome values the diff engine produces.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Native class a packed-list container is realized as.
pub const BOX_CLASS: &str = "Box";
/// Native class of the scrollable-singleton wrapper.
pub const SCROLLER_CLASS: &str = "ScrolledWindow";
/// Native class of the intermediate viewport layer inside a scroller.
pub const VIEWPORT_CLASS: &str = "Viewport";

/// One attribute of a described widget: a native property assignment, or a
/// set of style tags. Tag sets carry membership-only semantics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeAssignment {
    Property { key: String, value: Value },
    Classes(IndexSet<String>),
}

/// Packing parameters for a child of a packed-list container. Consumed when
/// the child's widget is inserted into its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Packing {
    pub expand: bool,
    pub fill: bool,
    pub padding: u32,
}

/// A child description together with its packing parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackedChild {
    pub node: Description,
    pub packing: Packing,
}

/// Non-container node: a native widget class plus its attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeafNode {
    pub class: String,
    pub attributes: Vec<AttributeAssignment>,
}

/// Ordered container whose children carry packing parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackedListNode {
    pub attributes: Vec<AttributeAssignment>,
    pub children: Vec<PackedChild>,
}

/// Scrollable container structurally constrained to exactly one child,
/// realized as a scroll frame wrapping a viewport wrapping the child.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrollerNode {
    pub attributes: Vec<AttributeAssignment>,
    pub child: Box<Description>,
}

/// Immutable description of one desired UI node. The concrete kind is erased
/// at the point of comparison and re-discovered by matching; no description
/// is mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Description {
    Leaf(LeafNode),
    PackedList(PackedListNode),
    Scroller(ScrollerNode),
}

impl Description {
    /// Whether two descriptions are of the same kind. Leaves additionally
    /// require the same native class; content is not consulted.
    pub fn same_kind(&self, other: &Description) -> bool {
        match (self, other) {
            (Description::Leaf(a), Description::Leaf(b)) => a.class == b.class,
            (Description::PackedList(_), Description::PackedList(_)) => true,
            (Description::Scroller(_), Description::Scroller(_)) => true,
            _ => false,
        }
    }

    /// The native toolkit class this description is realized as.
    pub fn native_class(&self) -> &str {
        match self {
            Description::Leaf(leaf) => &leaf.class,
            Description::PackedList(_) => BOX_CLASS,
            Description::Scroller(_) => SCROLLER_CLASS,
        }
    }

    pub(crate) fn attributes(&self) -> &[AttributeAssignment] {
        match self {
            Description::Leaf(leaf) => &leaf.attributes,
            Description::PackedList(list) => &list.attributes,
            Description::Scroller(scroller) => &scroller.attributes,
        }
    }
}

/// Result of comparing two descriptions. A plain value; executing it against
/// the live tree is a separate step, so the diff itself never touches the
/// toolkit.
#[derive(Debug, Clone, PartialEq)]
pub enum PatchOutcome {
    /// The descriptions are equal; no mutation.
    Keep,
    /// Same kind, different content; mutate the existing widget in place.
    Modify(NodeEdit),
    /// Different kind; a freshly built widget takes the existing one's place.
    Replace,
}

/// In-place mutation of an existing widget: the full property list from the
/// new description, re-applied without per-property diffing, plus the style
/// tag delta.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodeEdit {
    pub properties: IndexMap<String, Value>,
    pub classes: ClassDelta,
}

/// Style tags to add to and remove from a live widget.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClassDelta {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

impl ClassDelta {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}
