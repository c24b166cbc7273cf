//! The item tree: the compiler's intermediate representation of schema content.
//!
//! Every global definition becomes the root of a tree of items. Groups hold ordered children;
//! references, values and wildcards are leaves. Items are addressed by [`ItemId`] handles into an
//! [`ItemTree`] arena, so structural edits (replacing a reference by an inline copy, splitting a
//! group out into a definition of its own) are index updates.

use std::collections::HashMap;
use std::fmt::{self, Write};
use std::num::{NonZeroU32, NonZeroUsize};

use dt_xsd::{ComponentId, SchemaSet};

use crate::customs::AnyHandling;
use crate::plan::ClassId;
use crate::values::ScalarType;

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(NonZeroU32);

impl ItemId {
    fn from_index(index: usize) -> Self {
        let size = NonZeroUsize::new(index + 1).expect("index + 1 is never zero");
        let id: NonZeroU32 = size.try_into().expect("ID did not fit into 32-bit integer");
        Self(id)
    }

    pub fn index(self) -> usize {
        let size: NonZeroUsize = self
            .0
            .try_into()
            .expect("Could not convert item reference to usize index");
        usize::from(size) - 1
    }
}

impl fmt::Debug for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "<Item #{}>", self.0)
    }
}

/// Occurrence of a component in instance documents. Only the topmost item of a component
/// records it; see [`ItemTree::occurrence`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Occurrence {
    pub optional: bool,
    pub collection: bool,
    pub nillable: bool,
}

/// What a group contributes to the XML representation, computed bottom-up by classification.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ContentFlags {
    /// Everything below may be absent (vacuously true for empty content)
    pub all_optional: bool,
    pub attribute_present: bool,
    pub element_present: bool,
    /// Character data or other content that is neither attribute nor child element
    pub content_present: bool,
}

impl Default for ContentFlags {
    fn default() -> Self {
        Self {
            all_optional: true,
            attribute_present: false,
            element_present: false,
            content_present: false,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct GroupItem {
    pub(crate) children: Vec<ItemId>,
    /// The group stands for an enumerated simple type
    pub enumeration: bool,
    /// The group's content is merged into the enclosing class instead of getting its own
    pub inline: bool,
    /// Name of the class generated for a non-inline group. Inline groups have none and belong
    /// to the class of their nearest non-inline ancestor.
    pub class_name: Option<String>,
    pub class: Option<ClassId>,
    pub flags: ContentFlags,
}

impl GroupItem {
    pub fn children(&self) -> &[ItemId] {
        &self.children
    }
}

/// The root of the tree built for one global definition.
#[derive(Clone, Debug, Default)]
pub struct DefinitionItem {
    pub group: GroupItem,
    /// Number of reference items pointing here
    pub reference_count: usize,
    /// Structural reasons (derivation base, element type, abstract, ...) rule out inlining
    pub inline_blocked: bool,
}

#[derive(Clone, Debug)]
pub enum ItemKind {
    Group(GroupItem),
    Definition(DefinitionItem),
    Reference { definition: ItemId },
    Value { scalar: ScalarType },
    Any { handling: AnyHandling },
}

impl ItemKind {
    pub fn label(&self) -> &'static str {
        match self {
            ItemKind::Group(_) => "group",
            ItemKind::Definition(_) => "definition",
            ItemKind::Reference { .. } => "reference",
            ItemKind::Value { .. } => "value",
            ItemKind::Any { .. } => "any",
        }
    }
}

#[derive(Clone, Debug)]
pub struct Item {
    /// The schema component this item was built from
    pub component: ComponentId,
    pub(crate) parent: Option<ItemId>,
    /// `Some` on the topmost item of a component only
    pub(crate) occurrence: Option<Occurrence>,
    /// The component has no XML name of its own (compositors, derivations, ...)
    pub implicit: bool,
    /// Base name assigned by the naming pass; `None` means the name is inherited from the
    /// parent
    pub name: Option<String>,
    pub kind: ItemKind,
}

impl Item {
    pub fn parent(&self) -> Option<ItemId> {
        self.parent
    }

    /// The group part of group and definition items.
    pub fn group(&self) -> Option<&GroupItem> {
        match &self.kind {
            ItemKind::Group(group) => Some(group),
            ItemKind::Definition(definition) => Some(&definition.group),
            _ => None,
        }
    }

    pub fn group_mut(&mut self) -> Option<&mut GroupItem> {
        match &mut self.kind {
            ItemKind::Group(group) => Some(group),
            ItemKind::Definition(definition) => Some(&mut definition.group),
            _ => None,
        }
    }

    pub fn definition(&self) -> Option<&DefinitionItem> {
        match &self.kind {
            ItemKind::Definition(definition) => Some(definition),
            _ => None,
        }
    }

    pub fn definition_mut(&mut self) -> Option<&mut DefinitionItem> {
        match &mut self.kind {
            ItemKind::Definition(definition) => Some(definition),
            _ => None,
        }
    }

    pub fn children(&self) -> &[ItemId] {
        self.group().map(GroupItem::children).unwrap_or_default()
    }

    pub fn is_inline(&self) -> bool {
        self.group().is_some_and(|group| group.inline)
    }
}

/// Arena of all items, plus the table of topmost items per component.
#[derive(Debug, Default)]
pub struct ItemTree {
    items: Vec<Item>,
    topmost: HashMap<ComponentId, ItemId>,
    definitions: Vec<ItemId>,
}

impl ItemTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Retrieves an item by reference. This function panics if the reference does not belong
    /// to this tree.
    pub fn get(&self, id: ItemId) -> &Item {
        self.items
            .get(id.index())
            .expect("Invalid item reference (out-of-bounds)")
    }

    pub fn get_mut(&mut self, id: ItemId) -> &mut Item {
        self.items
            .get_mut(id.index())
            .expect("Invalid item reference (out-of-bounds)")
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// All definition roots in creation order.
    pub fn definitions(&self) -> &[ItemId] {
        &self.definitions
    }

    pub fn children(&self, id: ItemId) -> &[ItemId] {
        self.get(id).children()
    }

    pub fn group(&self, id: ItemId) -> Option<&GroupItem> {
        self.get(id).group()
    }

    pub fn group_mut(&mut self, id: ItemId) -> Option<&mut GroupItem> {
        self.get_mut(id).group_mut()
    }

    pub fn definition(&self, id: ItemId) -> Option<&DefinitionItem> {
        self.get(id).definition()
    }

    pub fn definition_mut(&mut self, id: ItemId) -> Option<&mut DefinitionItem> {
        self.get_mut(id).definition_mut()
    }

    /// The definition a reference item points to.
    pub fn reference_target(&self, id: ItemId) -> Option<ItemId> {
        match self.get(id).kind {
            ItemKind::Reference { definition } => Some(definition),
            _ => None,
        }
    }

    /// Creates an item as the last child of `parent`. The first item created for a component
    /// becomes its topmost item and records `occurrence`.
    pub(crate) fn create(
        &mut self,
        parent: Option<ItemId>,
        component: ComponentId,
        implicit: bool,
        kind: ItemKind,
        occurrence: Occurrence,
    ) -> ItemId {
        let id = self.push(component, implicit, kind);
        if !self.topmost.contains_key(&component) {
            self.topmost.insert(component, id);
            self.get_mut(id).occurrence = Some(occurrence);
        }
        if let Some(parent) = parent {
            self.append_child(parent, id);
        }
        id
    }

    /// Creates a parentless item that is not the topmost item of its component.
    pub(crate) fn create_detached(
        &mut self,
        component: ComponentId,
        implicit: bool,
        kind: ItemKind,
    ) -> ItemId {
        self.push(component, implicit, kind)
    }

    fn push(&mut self, component: ComponentId, implicit: bool, kind: ItemKind) -> ItemId {
        let id = ItemId::from_index(self.items.len());
        if matches!(kind, ItemKind::Definition(_)) {
            self.definitions.push(id);
        }
        if let ItemKind::Reference { definition } = kind {
            if let Some(definition) = self.definition_mut(definition) {
                definition.reference_count += 1;
            }
        }
        self.items.push(Item {
            component,
            parent: None,
            occurrence: None,
            implicit,
            name: None,
            kind,
        });
        id
    }

    fn append_child(&mut self, parent: ItemId, child: ItemId) {
        let group = self
            .group_mut(parent)
            .expect("Children can only be added to group items");
        group.children.push(child);
        self.get_mut(child).parent = Some(parent);
    }

    pub fn is_topmost(&self, id: ItemId) -> bool {
        self.topmost.get(&self.get(id).component) == Some(&id)
    }

    /// The effective occurrence of an item. Only the topmost item of a component records
    /// occurrence flags; every other item (inline copies included) resolves them through it.
    /// An item nested directly in another item of the same component shares its parent's
    /// occurrence, which is then already accounted for, and reports none of its own.
    pub fn occurrence(&self, id: ItemId) -> Occurrence {
        let item = self.get(id);
        if let Some(parent) = item.parent {
            if self.get(parent).component == item.component {
                return Occurrence::default();
            }
        }
        self.topmost
            .get(&item.component)
            .and_then(|topmost| self.get(*topmost).occurrence)
            .unwrap_or_default()
    }

    /// Puts `new` in the place of `old` in its parent's children. `new` takes over the topmost
    /// role if `old` held it for the same component.
    pub(crate) fn replace(&mut self, old: ItemId, new: ItemId) {
        let parent = self.get(old).parent;
        if let Some(parent) = parent {
            if let Some(group) = self.group_mut(parent) {
                if let Some(slot) = group.children.iter_mut().find(|child| **child == old) {
                    *slot = new;
                }
            }
        }
        self.get_mut(new).parent = parent;
        self.get_mut(old).parent = None;

        let component = self.get(old).component;
        if self.is_topmost(old) && self.get(new).component == component {
            self.topmost.insert(component, new);
            let occurrence = self.get_mut(old).occurrence.take();
            self.get_mut(new).occurrence = occurrence;
        }
    }

    /// Moves all children of `from` to the end of `to`.
    pub(crate) fn adopt_children(&mut self, from: ItemId, to: ItemId) {
        let children = self
            .group_mut(from)
            .map(|group| std::mem::take(&mut group.children))
            .unwrap_or_default();
        for child in children {
            self.append_child(to, child);
        }
    }

    pub(crate) fn remove_child(&mut self, parent: ItemId, child: ItemId) {
        if let Some(group) = self.group_mut(parent) {
            group.children.retain(|existing| *existing != child);
        }
        self.get_mut(child).parent = None;
    }

    /// Copies the subtree rooted at `source` as the last child of `parent`. Copies are never
    /// topmost; a copied definition root becomes a plain group.
    pub(crate) fn deep_copy(&mut self, source: ItemId, parent: ItemId) -> ItemId {
        let original = self.get(source);
        let children = original.children().to_vec();
        let kind = match &original.kind {
            ItemKind::Definition(definition) => ItemKind::Group(GroupItem {
                children: Vec::new(),
                ..definition.group.clone()
            }),
            ItemKind::Group(group) => ItemKind::Group(GroupItem {
                children: Vec::new(),
                ..group.clone()
            }),
            other => other.clone(),
        };
        let (component, implicit, name) = (
            original.component,
            original.implicit,
            original.name.clone(),
        );
        let copy = self.push(component, implicit, kind);
        self.get_mut(copy).name = name;
        self.append_child(parent, copy);
        for child in children {
            self.deep_copy(child, copy);
        }
        copy
    }

    /// The subtree rooted at `id`, in pre-order.
    pub fn subtree(&self, id: ItemId) -> Vec<ItemId> {
        let mut result = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            result.push(current);
            stack.extend(self.children(current).iter().rev());
        }
        result
    }

    /// An indented dump of the subtree rooted at `id`, for diagnostics.
    pub fn describe(&self, id: ItemId, schema: &SchemaSet) -> String {
        let mut out = String::new();
        self.describe_into(&mut out, id, schema, 0);
        out
    }

    fn describe_into(&self, out: &mut String, id: ItemId, schema: &SchemaSet, depth: usize) {
        let item = self.get(id);
        let occurrence = self.occurrence(id);
        let _ = write!(
            out,
            "{:indent$}{} {}",
            "",
            item.kind.label(),
            schema.describe(item.component),
            indent = depth * 2
        );
        if let Some(name) = &item.name {
            let _ = write!(out, " name={name}");
        }
        match &item.kind {
            ItemKind::Reference { definition } => {
                let target = self.get(*definition).component;
                let _ = write!(out, " -> {}", schema.describe(target));
            }
            ItemKind::Value { scalar } => {
                let _ = write!(out, " ({scalar})");
            }
            ItemKind::Any { handling } => {
                let _ = write!(out, " ({handling:?})");
            }
            ItemKind::Group(_) | ItemKind::Definition(_) => {}
        }
        if let Some(group) = item.group() {
            if group.inline {
                out.push_str(" inline");
            }
            if group.enumeration {
                out.push_str(" enumeration");
            }
            if let Some(class_name) = &group.class_name {
                let _ = write!(out, " class={class_name}");
            }
        }
        if let Some(definition) = item.definition() {
            let _ = write!(out, " refs={}", definition.reference_count);
        }
        if occurrence.optional {
            out.push_str(" optional");
        }
        if occurrence.collection {
            out.push_str(" collection");
        }
        out.push('\n');
        for child in item.children() {
            self.describe_into(out, *child, schema, depth + 1);
        }
    }
}
