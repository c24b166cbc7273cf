//! The classification tree of a generated class: inline groups become parent nodes, everything
//! that ends up as a property becomes a leaf.

use std::collections::HashSet;

use dt_xsd::{ComponentId, ComponentKind, SchemaSet};

use crate::customs::{AnyHandling, ResolvedCustoms};
use crate::error::CodegenError;
use crate::item::{ContentFlags, ItemId, ItemKind, ItemTree};
use crate::names::{NameConverter, NameSet};
use crate::naming::effective_name;
use crate::plan::ClassId;
use crate::problems::Problems;
use crate::values::ScalarType;

/// Which part of the XML representation a leaf binds.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LeafKind {
    Attribute,
    Element,
    /// Character content of the enclosing element
    Content,
    Wildcard,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LeafValue {
    Scalar(ScalarType),
    Class(ClassId),
    /// Presence of otherwise empty content
    Flag,
    /// Untyped document content of a wildcard
    Dom,
    /// Wildcard content bound to other generated classes
    Mapped,
    /// Content that is skipped when reading and never written
    Ignored,
}

/// Accessor names derived from a property's base name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Property {
    pub base_name: String,
    pub field_name: String,
    pub getter: String,
    pub setter: String,
}

impl Property {
    fn new(base_name: String, converter: &dyn NameConverter) -> Self {
        let field_name = converter.to_field_name(&base_name);
        Self {
            getter: field_name.clone(),
            setter: format!("set_{field_name}"),
            field_name,
            base_name,
        }
    }
}

#[derive(Clone, Debug)]
pub struct LeafNode {
    pub item: ItemId,
    pub kind: LeafKind,
    pub value: LeafValue,
    pub optional: bool,
    pub collection: bool,
    pub nillable: bool,
    pub documentation: Option<String>,
    /// `None` for ignored leaves
    pub property: Option<Property>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SelectorKind {
    Choice,
    Union,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectorConstant {
    pub name: String,
    pub value: usize,
    /// Index of the alternative among the parent node's children
    pub child: usize,
}

/// An integer field recording which alternative of a choice or union is present.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selector {
    pub kind: SelectorKind,
    pub property: Property,
    pub constants: Vec<SelectorConstant>,
}

#[derive(Clone, Debug)]
pub struct ParentNode {
    pub item: ItemId,
    pub name: Option<String>,
    pub compositor: ComponentKind,
    pub optional: bool,
    pub collection: bool,
    pub flags: ContentFlags,
    pub selector: Option<Selector>,
    pub documentation: Option<String>,
    pub children: Vec<DataNode>,
}

impl ParentNode {
    /// All children are ignored (and there is at least one).
    pub fn is_ignored(&self) -> bool {
        !self.children.is_empty() && self.children.iter().all(DataNode::is_ignored)
    }

    /// Leaves below this node, depth first.
    pub fn leaves(&self) -> Vec<&LeafNode> {
        let mut leaves = Vec::new();
        for child in &self.children {
            match child {
                DataNode::Leaf(leaf) => leaves.push(leaf),
                DataNode::Parent(parent) => leaves.extend(parent.leaves()),
            }
        }
        leaves
    }

    pub fn selectors(&self) -> Vec<&Selector> {
        let mut selectors = self.selector.iter().collect::<Vec<_>>();
        for child in &self.children {
            if let DataNode::Parent(parent) = child {
                selectors.extend(parent.selectors());
            }
        }
        selectors
    }
}

#[derive(Clone, Debug)]
pub enum DataNode {
    Parent(ParentNode),
    Leaf(LeafNode),
}

impl DataNode {
    pub fn is_ignored(&self) -> bool {
        match self {
            DataNode::Parent(parent) => parent.is_ignored(),
            DataNode::Leaf(leaf) => leaf.value == LeafValue::Ignored,
        }
    }
}

/// Computes the content flags of every group, bottom-up.
pub fn classify(schema: &SchemaSet, tree: &mut ItemTree) {
    let mut classifier = Classifier {
        schema,
        tree,
        done: HashSet::new(),
        visiting: HashSet::new(),
    };
    for definition in classifier.tree.definitions().to_vec() {
        classifier.definition_flags(definition);
    }
}

struct Classifier<'a> {
    schema: &'a SchemaSet,
    tree: &'a mut ItemTree,
    done: HashSet<ItemId>,
    visiting: HashSet<ItemId>,
}

impl Classifier<'_> {
    fn definition_flags(&mut self, definition: ItemId) -> ContentFlags {
        if self.done.contains(&definition) {
            return self
                .tree
                .group(definition)
                .map(|group| group.flags)
                .unwrap_or_default();
        }
        if !self.visiting.insert(definition) {
            // recursive content: nothing more is known than what the other path finds
            return ContentFlags::default();
        }
        let flags = self.group_flags(definition);
        self.visiting.remove(&definition);
        self.done.insert(definition);
        flags
    }

    /// Combines the contributions of a group's children and records the result.
    fn group_flags(&mut self, group: ItemId) -> ContentFlags {
        let mut flags = ContentFlags::default();
        for child in self.tree.children(group).to_vec() {
            let contribution = self.contribution(group, child);
            flags.all_optional &= contribution.all_optional;
            flags.attribute_present |= contribution.attribute_present;
            flags.element_present |= contribution.element_present;
            flags.content_present |= contribution.content_present;
        }
        if let Some(group) = self.tree.group_mut(group) {
            group.flags = flags;
        }
        flags
    }

    /// What `item` contributes to the flags of its parent.
    fn contribution(&mut self, parent: ItemId, item: ItemId) -> ContentFlags {
        let component = self.tree.get(item).component;
        let kind = self.schema.get(component).kind;
        let optional = self.tree.occurrence(item).optional;
        let inner = if self.tree.group(item).is_some() {
            self.group_flags(item)
        } else if let Some(definition) = self.tree.reference_target(item) {
            self.definition_flags(definition)
        } else if matches!(self.tree.get(item).kind, ItemKind::Value { .. }) {
            ContentFlags {
                all_optional: false,
                content_present: true,
                ..ContentFlags::default()
            }
        } else {
            ContentFlags::default()
        };

        let boundary = (kind.is_element_or_attribute()
            && self.tree.get(parent).component != component)
            || kind.is_wildcard();
        if boundary {
            // presence below an element or attribute is that element's business
            return ContentFlags {
                all_optional: optional,
                attribute_present: matches!(
                    kind,
                    ComponentKind::Attribute | ComponentKind::AnyAttribute
                ),
                element_present: matches!(kind, ComponentKind::Element | ComponentKind::Any),
                content_present: false,
            };
        }
        if matches!(kind, ComponentKind::Choice | ComponentKind::All) {
            return ContentFlags {
                all_optional: optional,
                ..inner
            };
        }
        ContentFlags {
            all_optional: optional || inner.all_optional,
            ..inner
        }
    }
}

#[derive(Copy, Clone, Default)]
struct Inherited {
    optional: bool,
    collection: bool,
}

/// Names handed out within one class.
#[derive(Default)]
struct ClassScope {
    properties: NameSet,
    constants: NameSet,
}

/// Builds the classification tree of a class from its root group.
pub struct DataBuilder<'a> {
    schema: &'a SchemaSet,
    customs: &'a ResolvedCustoms,
    converter: &'a dyn NameConverter,
    tree: &'a ItemTree,
    problems: &'a mut Problems,
}

impl<'a> DataBuilder<'a> {
    pub fn new(
        schema: &'a SchemaSet,
        customs: &'a ResolvedCustoms,
        converter: &'a dyn NameConverter,
        tree: &'a ItemTree,
        problems: &'a mut Problems,
    ) -> Self {
        Self {
            schema,
            customs,
            converter,
            tree,
            problems,
        }
    }

    pub fn build_class(&mut self, root: ItemId) -> Result<ParentNode, CodegenError> {
        let mut scope = ClassScope::default();
        let mut ancestors = Vec::new();
        self.build_parent(root, &mut scope, Inherited::default(), &mut ancestors, true)
    }

    fn build_parent(
        &mut self,
        group: ItemId,
        scope: &mut ClassScope,
        inherited: Inherited,
        ancestors: &mut Vec<ComponentId>,
        root: bool,
    ) -> Result<ParentNode, CodegenError> {
        let tree = self.tree;
        let item = tree.get(group);
        let Some(group_item) = item.group() else {
            return Err(CodegenError::ExpectedGroup {
                item: group,
                found: item.kind.label(),
            });
        };
        let component = item.component;
        let compositor = self.schema.get(component).kind;
        let occurrence = if root {
            Default::default()
        } else {
            self.tree.occurrence(group)
        };
        let own = Inherited {
            optional: inherited.optional || occurrence.optional,
            collection: inherited.collection || occurrence.collection,
        };
        let alternatives = matches!(compositor, ComponentKind::Choice | ComponentKind::Union);
        let for_children = Inherited {
            optional: own.optional || alternatives,
            ..own
        };

        let selector_kind = match compositor {
            ComponentKind::Choice if self.customs.settings.check_choices => {
                Some(SelectorKind::Choice)
            }
            ComponentKind::Union if self.customs.settings.check_unions => Some(SelectorKind::Union),
            _ => None,
        };
        let nested_in_same = ancestors.contains(&component);

        ancestors.push(component);
        let mut children = Vec::new();
        for child in group_item.children() {
            children.push(self.build_child(*child, scope, for_children, ancestors)?);
        }
        ancestors.pop();

        let name = effective_name(tree, group).map(str::to_string);
        let selector = selector_kind
            .filter(|_| !nested_in_same)
            .filter(|_| children.iter().filter(|child| !child.is_ignored()).count() > 1)
            .map(|kind| self.selector(kind, name.as_deref(), &children, scope));

        Ok(ParentNode {
            item: group,
            name,
            compositor,
            optional: own.optional,
            collection: own.collection,
            flags: group_item.flags,
            selector,
            documentation: self.schema.get(component).documentation_text(),
            children,
        })
    }

    fn build_child(
        &mut self,
        child: ItemId,
        scope: &mut ClassScope,
        inherited: Inherited,
        ancestors: &mut Vec<ComponentId>,
    ) -> Result<DataNode, CodegenError> {
        let tree = self.tree;
        let item = tree.get(child);
        let value = match &item.kind {
            ItemKind::Group(group) if group.inline && !group.children().is_empty() => {
                return Ok(DataNode::Parent(self.build_parent(
                    child, scope, inherited, ancestors, false,
                )?));
            }
            ItemKind::Group(group) if group.inline => {
                if self.tree.occurrence(child).optional {
                    LeafValue::Flag
                } else {
                    LeafValue::Ignored
                }
            }
            ItemKind::Group(group) => LeafValue::Class(
                group
                    .class
                    .ok_or(CodegenError::UnresolvedReference { item: child })?,
            ),
            ItemKind::Reference { definition } => LeafValue::Class(
                self.tree
                    .group(*definition)
                    .and_then(|group| group.class)
                    .ok_or(CodegenError::UnresolvedReference { item: child })?,
            ),
            ItemKind::Value { scalar } => LeafValue::Scalar(scalar.clone()),
            ItemKind::Any { handling } => match handling {
                AnyHandling::Discard => LeafValue::Ignored,
                AnyHandling::Dom => LeafValue::Dom,
                AnyHandling::Mapped => LeafValue::Mapped,
            },
            ItemKind::Definition(_) => return Err(CodegenError::NestedDefinition { item: child }),
        };
        Ok(DataNode::Leaf(self.leaf(child, value, scope, inherited)))
    }

    fn leaf(
        &mut self,
        child: ItemId,
        value: LeafValue,
        scope: &mut ClassScope,
        inherited: Inherited,
    ) -> LeafNode {
        let tree = self.tree;
        let item = tree.get(child);
        let occurrence = self.tree.occurrence(child);
        let optional = inherited.optional || occurrence.optional;
        let collection = inherited.collection || occurrence.collection;
        let property = (value != LeafValue::Ignored).then(|| {
            let name = effective_name(tree, child).unwrap_or("value");
            let name = if collection {
                self.converter.pluralize(&self.converter.depluralize(name))
            } else {
                name.to_string()
            };
            Property::new(self.property_name(child, &name, scope), self.converter)
        });
        LeafNode {
            item: child,
            kind: self.leaf_kind(child),
            value,
            optional,
            collection,
            nillable: occurrence.nillable,
            documentation: self.schema.get(item.component).documentation_text(),
            property,
        }
    }

    /// Reserves a property name in the class. Derived names are made unique silently; a
    /// collision of a customized name is an error, one of an element or attribute name a
    /// warning.
    fn property_name(&mut self, item: ItemId, name: &str, scope: &mut ClassScope) -> String {
        let unique = scope.properties.add(name);
        if unique == name {
            return unique;
        }
        let tree = self.tree;
        let Some(named) = std::iter::successors(Some(item), |id| tree.get(*id).parent())
            .find(|id| tree.get(*id).name.is_some())
        else {
            return unique;
        };
        let component = tree.get(named).component;
        let customized = self
            .customs
            .get(component)
            .is_some_and(|custom| custom.base_name.is_some());
        if customized {
            self.problems.error(
                Some(component),
                format!(
                    "{}: customized name '{name}' is already used in its class, using '{unique}'",
                    self.schema.describe(component)
                ),
            );
        } else if self.schema.get(component).kind.is_element_or_attribute() {
            self.problems.warning(
                Some(component),
                format!(
                    "{}: name '{name}' is already used in its class, using '{unique}'",
                    self.schema.describe(component)
                ),
            );
        }
        unique
    }

    fn leaf_kind(&self, item: ItemId) -> LeafKind {
        let mut current = Some(item);
        while let Some(id) = current {
            let node = self.tree.get(id);
            match self.schema.get(node.component).kind {
                ComponentKind::Attribute => return LeafKind::Attribute,
                ComponentKind::Element => return LeafKind::Element,
                ComponentKind::Any | ComponentKind::AnyAttribute => return LeafKind::Wildcard,
                _ => {}
            }
            let class_root = node.group().is_some_and(|group| group.class.is_some());
            current = node.parent().filter(|_| !class_root);
        }
        LeafKind::Content
    }

    fn selector(
        &mut self,
        kind: SelectorKind,
        name: Option<&str>,
        children: &[DataNode],
        scope: &mut ClassScope,
    ) -> Selector {
        let suffix = match kind {
            SelectorKind::Choice => "Choice",
            SelectorKind::Union => "Form",
        };
        let constants = children
            .iter()
            .enumerate()
            .filter(|(_, child)| !child.is_ignored())
            .enumerate()
            .map(|(value, (index, child))| {
                let child_name = match child {
                    DataNode::Parent(parent) => parent.name.clone(),
                    DataNode::Leaf(leaf) => effective_name(self.tree, leaf.item).map(str::to_string),
                }
                .unwrap_or_else(|| "value".to_string());
                let constant = self
                    .converter
                    .to_constant_name(&format!("{child_name}_{suffix}"));
                SelectorConstant {
                    name: scope.constants.add(&constant),
                    value,
                    child: index,
                }
            })
            .collect();
        let base_name = scope
            .properties
            .add(&self.converter.lead_in(name.unwrap_or("choice"), "select"));
        Selector {
            kind,
            property: Property::new(base_name, self.converter),
            constants,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::customs::Customizations;

    fn root_node(text: &str, class: &str) -> (ParentNode, ContentFlags) {
        let mut schema = SchemaSet::parse(text).unwrap();
        let plan = crate::compile(&mut schema, &Customizations::default()).unwrap();
        let class = plan.find(class).unwrap();
        (class.data.clone().unwrap(), class.flags)
    }

    #[test]
    fn choices_absorb_optionality() {
        let (_, flags) = root_node(
            r#"
            <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
              <xs:complexType name="T">
                <xs:sequence>
                  <xs:choice>
                    <xs:element name="a" type="xs:string"/>
                    <xs:element name="b" type="xs:string"/>
                  </xs:choice>
                  <xs:element name="c" type="xs:string" minOccurs="0"/>
                </xs:sequence>
              </xs:complexType>
            </xs:schema>"#,
            "T",
        );
        // a required choice is present even though each alternative may be absent
        assert!(!flags.all_optional);
        assert!(flags.element_present);
        assert!(!flags.attribute_present);
    }

    #[test]
    fn optional_content_is_all_optional() {
        let (_, flags) = root_node(
            r#"
            <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
              <xs:complexType name="T">
                <xs:sequence>
                  <xs:element name="x" type="xs:string" minOccurs="0"/>
                  <xs:element name="y" type="xs:string" minOccurs="0"/>
                </xs:sequence>
                <xs:attribute name="z" type="xs:int"/>
              </xs:complexType>
            </xs:schema>"#,
            "T",
        );
        assert!(flags.all_optional);
        assert!(flags.attribute_present && flags.element_present);
    }

    #[test]
    fn discarded_wildcards_are_ignored_leaves() {
        let (data, _) = root_node(
            r#"
            <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
              <xs:complexType name="T">
                <xs:sequence>
                  <xs:element name="x" type="xs:string"/>
                  <xs:any minOccurs="0"/>
                  <xs:element name="y" type="xs:string"/>
                </xs:sequence>
              </xs:complexType>
            </xs:schema>"#,
            "T",
        );
        let leaves = data.leaves();
        assert_eq!(leaves.len(), 3);
        assert_eq!(leaves[1].value, LeafValue::Ignored);
        assert_eq!(leaves[1].kind, LeafKind::Wildcard);
        assert!(leaves[1].property.is_none());
        assert_eq!(leaves[2].property.as_ref().unwrap().setter, "set_y");
    }

    #[test]
    fn ignored_alternatives_do_not_count_for_selectors() {
        let (data, _) = root_node(
            r#"
            <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
              <xs:complexType name="T">
                <xs:sequence>
                  <xs:choice>
                    <xs:element name="a" type="xs:string"/>
                    <xs:any/>
                  </xs:choice>
                  <xs:element name="b" type="xs:string"/>
                </xs:sequence>
              </xs:complexType>
            </xs:schema>"#,
            "T",
        );
        assert!(data.selectors().is_empty());
    }
}
