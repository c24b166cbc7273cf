//! Base and class name assignment over the item trees.
//!
//! Items named by an element or attribute keep that name. Other items only get a name where
//! they sit next to siblings and need one to be told apart; a single child inherits the name of
//! its parent. Inline element groups with several children pass their name on as a lead-in
//! prefix, so the content of an inlined `<address>` becomes `addressStreet`, `addressCity`.

use dt_xsd::{ComponentKind, SchemaSet};

use crate::customs::ResolvedCustoms;
use crate::item::{ItemId, ItemKind, ItemTree};
use crate::names::NameConverter;

pub struct NameAssigner<'a> {
    schema: &'a SchemaSet,
    customs: &'a ResolvedCustoms,
    converter: &'a dyn NameConverter,
    tree: &'a mut ItemTree,
}

impl<'a> NameAssigner<'a> {
    pub fn new(
        schema: &'a SchemaSet,
        customs: &'a ResolvedCustoms,
        converter: &'a dyn NameConverter,
        tree: &'a mut ItemTree,
    ) -> Self {
        Self {
            schema,
            customs,
            converter,
            tree,
        }
    }

    pub fn run(mut self) {
        for definition in self.tree.definitions().to_vec() {
            self.name_definition(definition);
        }
    }

    fn name_definition(&mut self, definition: ItemId) {
        let item = self.tree.get(definition);
        let component = item.component;
        let xml_name = self
            .schema
            .get(component)
            .name
            .clone()
            .unwrap_or_else(|| self.schema.get(component).kind.tag_name().to_string());
        if item.name.is_none() {
            let name = self
                .customs
                .get(component)
                .and_then(|custom| custom.base_name.clone())
                .unwrap_or_else(|| self.converter.to_base_name(&xml_name));
            self.tree.get_mut(definition).name = Some(name);
        }

        let class_name = match self.tree.group(definition) {
            Some(group) if group.inline => None,
            Some(group) => Some(group.class_name.clone().unwrap_or_else(|| {
                self.customs
                    .get(component)
                    .and_then(|custom| {
                        custom
                            .existing_type
                            .clone()
                            .or_else(|| custom.class_name.clone())
                    })
                    .unwrap_or_else(|| self.converter.to_class_name(&xml_name))
            })),
            None => None,
        };
        if let (Some(group), Some(class_name)) = (self.tree.group_mut(definition), &class_name) {
            group.class_name = Some(class_name.clone());
        }
        let scope = class_name.unwrap_or_default();
        self.name_children(definition, None, &scope);
    }

    fn name_children(&mut self, group: ItemId, prefix: Option<String>, class: &str) {
        let children = self.tree.children(group).to_vec();
        // a single child keeps its own name; the prefix only leads in where content branches
        if let [child] = children[..] {
            let name = self.explicit_name(group, child);
            self.tree.get_mut(child).name = name;
            self.descend(child, prefix, class);
            return;
        }
        for child in children {
            // a sequence goes by the name of its first child
            let name = self
                .explicit_name(group, child)
                .or_else(|| self.derived_name(child))
                .or_else(|| self.first_explicit_name(child))
                .map(|name| self.lead_in(prefix.as_deref(), &name));
            let adopt = name.is_none();
            self.tree.get_mut(child).name = name;
            self.descend(child, prefix.clone(), class);
            if adopt {
                let adopted = self
                    .first_descendant_name(child)
                    .unwrap_or_else(|| self.converter.to_base_name("sequence"));
                self.tree.get_mut(child).name = Some(adopted);
            }
        }
    }

    fn descend(&mut self, child: ItemId, prefix: Option<String>, class: &str) {
        let item = self.tree.get(child);
        match &item.kind {
            ItemKind::Group(group) if !group.inline => {
                let class_name = group.class_name.clone().unwrap_or_else(|| {
                    let own = self
                        .customs
                        .get(item.component)
                        .and_then(|custom| custom.class_name.clone());
                    own.unwrap_or_else(|| {
                        let name = self.effective_name(child).unwrap_or_default();
                        format!("{class}{}", self.converter.to_class_name(&name))
                    })
                });
                if let Some(group) = self.tree.group_mut(child) {
                    group.class_name = Some(class_name.clone());
                }
                self.name_children(child, None, &class_name);
            }
            ItemKind::Group(_) => {
                let count = item.children().len();
                let named_element = self.schema.get(item.component).kind
                    == ComponentKind::Element
                    && item.name.is_some();
                let prefix = if named_element && (count > 1 || (count == 1 && prefix.is_none())) {
                    item.name.clone()
                } else {
                    prefix
                };
                self.name_children(child, prefix, class);
            }
            ItemKind::Reference { definition } => {
                let definition = *definition;
                let target = self.tree.get(definition);
                // definitions split out of a shared class are named after their use
                if target.name.is_none() && !self.schema.is_global(target.component) {
                    let name = self.effective_name(child).unwrap_or_default();
                    let class_name = format!("{class}{}", self.converter.to_class_name(&name));
                    let target = self.tree.get_mut(definition);
                    target.name = Some(name);
                    if let Some(group) = target.group_mut() {
                        group.class_name = Some(class_name);
                    }
                }
            }
            _ => {}
        }
    }

    /// The base name an item has of its own: that of the element or attribute it stands for,
    /// or a customized one. Items sharing their parent's component have none.
    fn explicit_name(&self, parent: ItemId, child: ItemId) -> Option<String> {
        let item = self.tree.get(child);
        if self.tree.get(parent).component == item.component {
            return None;
        }
        if let Some(name) = self
            .customs
            .get(item.component)
            .and_then(|custom| custom.base_name.clone())
        {
            return Some(name);
        }
        let component = self.schema.get(item.component);
        if !component.kind.is_element_or_attribute() {
            return None;
        }
        let xml_name = component
            .name
            .as_deref()
            .or(component.reference.as_ref().map(|name| name.local_name.as_str()))?;
        Some(self.converter.to_base_name(xml_name))
    }

    /// A fallback name for an item that needs one. Sequences get `None`: they take the name
    /// of their first child once that is known.
    fn derived_name(&self, child: ItemId) -> Option<String> {
        let item = self.tree.get(child);
        let component = self.schema.get(item.component);
        let xml_name = match &item.kind {
            ItemKind::Reference { definition } if self.is_split_sequence(*definition) => {
                return None
            }
            ItemKind::Reference { definition } => {
                let target = self.schema.get(self.tree.get(*definition).component);
                target
                    .name
                    .clone()
                    .unwrap_or_else(|| target.kind.tag_name().to_string())
            }
            ItemKind::Group(group) if group.enumeration => "Enumeration".to_string(),
            ItemKind::Group(_) if component.reference.is_some() => component
                .reference
                .as_ref()
                .map(|name| name.local_name.clone())
                .unwrap_or_default(),
            ItemKind::Group(_) if component.kind.is_derivation() => component
                .type_name
                .as_ref()
                .map(|name| name.local_name.clone())
                .unwrap_or_else(|| component.kind.tag_name().to_string()),
            ItemKind::Group(_) if component.kind == ComponentKind::Sequence => return None,
            ItemKind::Value { scalar } => scalar.schema_name.clone(),
            _ => component.kind.tag_name().to_string(),
        };
        Some(self.converter.to_base_name(&xml_name))
    }

    fn lead_in(&self, prefix: Option<&str>, name: &str) -> String {
        match prefix {
            Some(prefix) => self.converter.lead_in(prefix, name),
            None => name.to_string(),
        }
    }

    /// A definition split out of a shared class for an anonymous sequence.
    fn is_split_sequence(&self, definition: ItemId) -> bool {
        let component = self.tree.get(definition).component;
        !self.schema.is_global(component)
            && self.schema.get(component).kind == ComponentKind::Sequence
    }

    /// The first element or attribute name below `group`, looking through references to split
    /// out sequences.
    fn first_explicit_name(&self, group: ItemId) -> Option<String> {
        let root = match self.tree.get(group).kind {
            ItemKind::Reference { definition } if self.is_split_sequence(definition) => definition,
            _ => group,
        };
        self.tree
            .subtree(root)
            .into_iter()
            .skip(1)
            .find_map(|item| {
                let parent = self.tree.get(item).parent()?;
                self.explicit_name(parent, item)
            })
    }

    fn first_descendant_name(&self, group: ItemId) -> Option<String> {
        self.tree
            .subtree(group)
            .into_iter()
            .skip(1)
            .find_map(|item| self.tree.get(item).name.clone())
    }

    /// The name of the item itself or of its nearest named ancestor.
    fn effective_name(&self, item: ItemId) -> Option<String> {
        effective_name(&*self.tree, item).map(str::to_string)
    }
}

/// The name of `item` or of its nearest named ancestor.
pub fn effective_name(tree: &ItemTree, item: ItemId) -> Option<&str> {
    std::iter::successors(Some(item), |id| tree.get(*id).parent())
        .find_map(|id| tree.get(id).name.as_deref())
}
