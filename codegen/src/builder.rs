//! Construction of item trees from schema components.

use dt_xsd::{
    ComponentId, ComponentKind, ComponentSlots, QName, SchemaSet, SymbolSpace, TypeRef,
};

use crate::customs::ResolvedCustoms;
use crate::item::{DefinitionItem, GroupItem, ItemId, ItemKind, ItemTree, Occurrence};
use crate::problems::Problems;
use crate::values::ScalarType;

/// Builds one definition item tree per live global component.
///
/// Definitions are memoized per component and registered before their content is expanded, so
/// recursive structures reuse the definition that is still being built.
pub struct TreeBuilder<'a> {
    schema: &'a SchemaSet,
    customs: &'a ResolvedCustoms,
    tree: &'a mut ItemTree,
    problems: &'a mut Problems,
    definitions: ComponentSlots<ItemId>,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(
        schema: &'a SchemaSet,
        customs: &'a ResolvedCustoms,
        tree: &'a mut ItemTree,
        problems: &'a mut Problems,
    ) -> Self {
        Self {
            schema,
            customs,
            tree,
            problems,
            definitions: ComponentSlots::new(),
        }
    }

    /// Builds all definitions and returns the definition item of each global component.
    pub fn build_all(mut self) -> ComponentSlots<ItemId> {
        for global in self.schema.global_components() {
            if SymbolSpace::of(self.schema.get(global).kind).is_some() {
                self.build_definition(global);
            }
        }
        tracing::debug!(
            definitions = self.tree.definitions().len(),
            items = self.tree.len(),
            "built item trees"
        );
        self.definitions
    }

    fn build_definition(&mut self, component: ComponentId) -> ItemId {
        if let Some(definition) = self.definitions.get(component) {
            return *definition;
        }
        let declaration = self.schema.get(component);
        let definition = DefinitionItem {
            inline_blocked: declaration.abstract_
                || self.customs.existing_type(component).is_some(),
            ..DefinitionItem::default()
        };
        let occurrence = Occurrence {
            nillable: declaration.nillable,
            ..Occurrence::default()
        };
        let item = self.tree.create(
            None,
            component,
            !declaration.kind.is_element_or_attribute(),
            ItemKind::Definition(definition),
            occurrence,
        );
        let _ = self.definitions.attach(component, item);
        self.expand_content(item, component);
        tracing::trace!(component = %self.schema.describe(component), ?item, "built definition");
        item
    }

    /// Adds the content of `component` to the existing `group`.
    fn expand_content(&mut self, group: ItemId, component: ComponentId) {
        let schema = self.schema;
        let declaration = schema.get(component);
        match declaration.kind {
            ComponentKind::Element | ComponentKind::Attribute => {
                self.expand_declaration(group, component)
            }
            ComponentKind::ComplexType => {
                for child in declaration.children() {
                    match schema.get(*child).kind {
                        ComponentKind::SimpleContent | ComponentKind::ComplexContent => {
                            self.expand_content(group, *child)
                        }
                        _ => self.add_particle(group, *child),
                    }
                }
            }
            ComponentKind::SimpleContent | ComponentKind::ComplexContent => {
                for child in declaration.children() {
                    self.expand_content(group, *child);
                }
            }
            ComponentKind::Extension => {
                self.add_base(group, component);
                for child in declaration.children() {
                    self.add_particle(group, *child);
                }
            }
            ComponentKind::Restriction => self.expand_restriction(group, component),
            ComponentKind::SimpleType => self.expand_simple_type(group, component),
            ComponentKind::Union => self.expand_union(group, component),
            _ => {
                for child in declaration.children() {
                    self.add_particle(group, *child);
                }
            }
        }
    }

    /// Adds the item for a particle, attribute or other nested component to `group`.
    fn add_particle(&mut self, group: ItemId, component: ComponentId) {
        let schema = self.schema;
        let declaration = schema.get(component);
        if declaration.is_prohibited() {
            return;
        }
        let implicit = !declaration.kind.is_element_or_attribute();
        match declaration.kind {
            ComponentKind::Element
            | ComponentKind::Attribute
            | ComponentKind::Group
            | ComponentKind::AttributeGroup
                if declaration.reference.is_some() =>
            {
                let Some(target) = schema.resolve_reference(component) else {
                    self.problems.error(
                        Some(component),
                        format!("{}: unresolved reference", schema.describe(component)),
                    );
                    return;
                };
                let definition = self.build_definition(target);
                let mut occurrence = occurrence_of(schema, component);
                occurrence.nillable |= schema.get(target).nillable;
                self.add_reference(group, component, definition, occurrence);
            }
            ComponentKind::Element | ComponentKind::Attribute => {
                let global_type = declaration
                    .type_name
                    .as_ref()
                    .filter(|_| {
                        !declaration
                            .children()
                            .iter()
                            .any(|child| schema.get(*child).kind.is_type_definition())
                    })
                    .and_then(|name| schema.resolve_type(name));
                let occurrence = occurrence_of(schema, component);
                if let Some(TypeRef::Global(type_definition)) = global_type {
                    let definition = self.build_definition(type_definition);
                    self.add_reference(group, component, definition, occurrence);
                } else {
                    let item = self.add_group(group, component, false, occurrence);
                    self.expand_declaration(item, component);
                }
            }
            ComponentKind::Sequence
            | ComponentKind::Choice
            | ComponentKind::All
            | ComponentKind::Union => {
                let item = self.add_group(group, component, implicit, occurrence_of(schema, component));
                self.expand_content(item, component);
            }
            ComponentKind::SimpleType => {
                let item = self.add_group(group, component, implicit, Occurrence::default());
                self.expand_simple_type(item, component);
            }
            ComponentKind::List => self.add_list(group, component),
            ComponentKind::Any | ComponentKind::AnyAttribute => {
                let handling = self.customs.settings.any_handling;
                self.tree.create(
                    Some(group),
                    component,
                    implicit,
                    ItemKind::Any { handling },
                    occurrence_of(schema, component),
                );
            }
            _ => {}
        }
    }

    /// Content of an element or attribute declaration: its inline type, or its named type.
    fn expand_declaration(&mut self, group: ItemId, component: ComponentId) {
        let schema = self.schema;
        let declaration = schema.get(component);
        if let Some(inline_type) = declaration
            .children()
            .iter()
            .copied()
            .find(|child| schema.get(*child).kind.is_type_definition())
        {
            self.expand_content(group, inline_type);
            return;
        }
        let Some(type_name) = declaration.type_name.as_ref() else {
            let default_type = match declaration.kind {
                ComponentKind::Attribute => "anySimpleType",
                _ => "anyType",
            };
            self.add_builtin(group, component, &QName::with_namespace(XS, default_type));
            return;
        };
        match schema.resolve_type(type_name) {
            Some(TypeRef::Builtin(name)) => self.add_builtin(group, component, &name),
            Some(TypeRef::Global(type_definition)) => {
                let definition = self.build_definition(type_definition);
                if declaration.kind == ComponentKind::Element
                    && schema.is_global(component)
                    && schema.get(type_definition).kind == ComponentKind::ComplexType
                {
                    self.block_inline(definition);
                }
                self.add_reference(group, component, definition, Occurrence::default());
            }
            None => self.problems.error(
                Some(component),
                format!(
                    "{}: unresolved type '{type_name}'",
                    schema.describe(component)
                ),
            ),
        }
    }

    /// The base type of an extension, which its own content then extends.
    fn add_base(&mut self, group: ItemId, component: ComponentId) {
        let schema = self.schema;
        let Some(base) = schema.get(component).type_name.as_ref() else {
            return;
        };
        match schema.resolve_type(base) {
            Some(TypeRef::Builtin(name)) if name.local_name == "anyType" => {}
            Some(TypeRef::Builtin(name)) => self.add_builtin(group, component, &name),
            Some(TypeRef::Global(type_definition)) => {
                let definition = self.build_definition(type_definition);
                if schema.get(type_definition).kind == ComponentKind::ComplexType {
                    self.block_inline(definition);
                }
                self.add_reference(group, component, definition, Occurrence::default());
            }
            None => self.problems.error(
                Some(component),
                format!("{}: unresolved base type '{base}'", schema.describe(component)),
            ),
        }
    }

    /// A restriction of a complex type replaces the base content model, which the base type
    /// already describes in full; only restrictions of `anyType` are expanded.
    fn expand_restriction(&mut self, group: ItemId, component: ComponentId) {
        let schema = self.schema;
        let restriction = schema.get(component);
        let Some(base) = restriction.type_name.as_ref() else {
            // simple type restriction with an inline base type
            for child in restriction.children() {
                if schema.get(*child).kind == ComponentKind::SimpleType {
                    self.expand_simple_type(group, *child);
                }
            }
            return;
        };
        match schema.resolve_type(base) {
            Some(TypeRef::Builtin(name)) if name.local_name == "anyType" => {
                for child in restriction.children() {
                    self.add_particle(group, *child);
                }
            }
            Some(TypeRef::Builtin(name)) => self.add_builtin(group, component, &name),
            Some(TypeRef::Global(type_definition)) => {
                let definition = self.build_definition(type_definition);
                if schema.get(type_definition).kind == ComponentKind::ComplexType {
                    self.block_inline(definition);
                }
                self.add_reference(group, component, definition, Occurrence::default());
            }
            None => self.problems.error(
                Some(component),
                format!("{}: unresolved base type '{base}'", schema.describe(component)),
            ),
        }
    }

    fn expand_simple_type(&mut self, group: ItemId, component: ComponentId) {
        let schema = self.schema;
        if !schema.enumeration_values(component).is_empty() {
            if self.tree.get(group).component == component {
                if let Some(group) = self.tree.group_mut(group) {
                    group.enumeration = true;
                }
            } else {
                let item = self.add_group(group, component, true, Occurrence::default());
                if let Some(item) = self.tree.group_mut(item) {
                    item.enumeration = true;
                }
            }
            return;
        }
        for child in schema.get(component).children() {
            match schema.get(*child).kind {
                ComponentKind::Restriction => self.expand_restriction(group, *child),
                _ => self.add_particle(group, *child),
            }
        }
    }

    fn expand_union(&mut self, group: ItemId, component: ComponentId) {
        let schema = self.schema;
        let union = schema.get(component);
        for member in &union.member_types {
            match schema.resolve_type(member) {
                Some(TypeRef::Builtin(name)) => self.add_builtin(group, component, &name),
                Some(TypeRef::Global(type_definition)) => {
                    let definition = self.build_definition(type_definition);
                    self.add_reference(group, component, definition, Occurrence::default());
                }
                None => self.problems.error(
                    Some(component),
                    format!("{}: unresolved member type '{member}'", schema.describe(component)),
                ),
            }
        }
        for child in union.children() {
            self.add_particle(group, *child);
        }
    }

    /// A list becomes a single item carrying the collection flag.
    fn add_list(&mut self, group: ItemId, component: ComponentId) {
        let schema = self.schema;
        let list = schema.get(component);
        let occurrence = occurrence_of(schema, component);
        if let Some(item_type) = list.type_name.as_ref() {
            match schema.resolve_type(item_type) {
                Some(TypeRef::Builtin(name)) => {
                    self.tree.create(
                        Some(group),
                        component,
                        true,
                        ItemKind::Value {
                            scalar: ScalarType::for_builtin(&name),
                        },
                        occurrence,
                    );
                }
                Some(TypeRef::Global(type_definition)) => {
                    let definition = self.build_definition(type_definition);
                    self.add_reference(group, component, definition, occurrence);
                }
                None => self.problems.error(
                    Some(component),
                    format!("{}: unresolved item type '{item_type}'", schema.describe(component)),
                ),
            }
        } else {
            let item = self.add_group(group, component, true, occurrence);
            for child in list.children() {
                if schema.get(*child).kind == ComponentKind::SimpleType {
                    self.expand_simple_type(item, *child);
                }
            }
        }
    }

    fn add_group(
        &mut self,
        parent: ItemId,
        component: ComponentId,
        implicit: bool,
        occurrence: Occurrence,
    ) -> ItemId {
        self.tree.create(
            Some(parent),
            component,
            implicit,
            ItemKind::Group(GroupItem::default()),
            occurrence,
        )
    }

    fn add_builtin(&mut self, group: ItemId, component: ComponentId, name: &QName) {
        let implicit = !self.schema.get(component).kind.is_element_or_attribute();
        let kind = if name.local_name == "anyType" {
            ItemKind::Any {
                handling: self.customs.settings.any_handling,
            }
        } else {
            ItemKind::Value {
                scalar: ScalarType::for_builtin(name),
            }
        };
        self.tree
            .create(Some(group), component, implicit, kind, Occurrence::default());
    }

    fn add_reference(
        &mut self,
        group: ItemId,
        component: ComponentId,
        definition: ItemId,
        occurrence: Occurrence,
    ) {
        let implicit = !self.schema.get(component).kind.is_element_or_attribute();
        let item = self.tree.create(
            Some(group),
            component,
            implicit,
            ItemKind::Reference { definition },
            occurrence,
        );
        let target = self.schema.get(self.tree.get(definition).component);
        if self.tree.occurrence(item).collection && target.kind != ComponentKind::SimpleType {
            self.block_inline(definition);
        }
    }

    fn block_inline(&mut self, definition: ItemId) {
        if let Some(definition) = self.tree.definition_mut(definition) {
            definition.inline_blocked = true;
        }
    }
}

const XS: &str = dt_xsd::builtins::XS_NAMESPACE;

fn occurrence_of(schema: &SchemaSet, component: ComponentId) -> Occurrence {
    let declaration = schema.get(component);
    Occurrence {
        optional: declaration.is_optional(),
        collection: declaration.is_repeated(),
        nillable: declaration.nillable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::customs::Customizations;

    fn build(text: &str) -> (SchemaSet, ItemTree, ComponentSlots<ItemId>) {
        let schema = SchemaSet::parse(text).unwrap();
        let customs =
            ResolvedCustoms::resolve(&Customizations::default(), &schema, &mut Problems::new());
        let mut tree = ItemTree::new();
        let mut problems = Problems::new();
        let definitions = TreeBuilder::new(&schema, &customs, &mut tree, &mut problems).build_all();
        assert!(problems.is_empty());
        (schema, tree, definitions)
    }

    fn global(schema: &SchemaSet, name: &str) -> ComponentId {
        schema
            .global_components()
            .into_iter()
            .find(|id| schema.get(*id).name.as_deref() == Some(name))
            .unwrap()
    }

    fn labels(tree: &ItemTree, ids: &[ItemId]) -> Vec<&'static str> {
        ids.iter().map(|id| tree.get(*id).kind.label()).collect()
    }

    const ORDER: &str = r#"
        <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
          <xs:element name="order" type="Order"/>
          <xs:complexType name="Order">
            <xs:sequence>
              <xs:element name="item" type="xs:string" maxOccurs="unbounded"/>
              <xs:element name="size">
                <xs:simpleType>
                  <xs:restriction base="xs:string">
                    <xs:enumeration value="small"/>
                    <xs:enumeration value="large"/>
                  </xs:restriction>
                </xs:simpleType>
              </xs:element>
            </xs:sequence>
            <xs:attribute name="id" type="xs:int"/>
            <xs:attribute name="legacy" type="xs:int" use="prohibited"/>
          </xs:complexType>
        </xs:schema>"#;

    #[test]
    fn builds_definitions_for_globals() {
        let (schema, tree, definitions) = build(ORDER);
        let order = *definitions.get(global(&schema, "order")).unwrap();
        let order_type = *definitions.get(global(&schema, "Order")).unwrap();
        assert_eq!(tree.definitions(), [order, order_type]);

        // element with a named type: a reference to the type's definition
        let [reference] = tree.children(order) else {
            panic!("expected one child")
        };
        assert_eq!(tree.reference_target(*reference), Some(order_type));
        let definition = tree.definition(order_type).unwrap();
        assert_eq!(definition.reference_count, 1);
        assert!(definition.inline_blocked);

        // the prohibited attribute is dropped
        assert_eq!(labels(&tree, tree.children(order_type)), ["group", "group"]);
        let sequence = tree.children(order_type)[0];
        let [item, size] = tree.children(sequence) else {
            panic!("expected two particles")
        };
        assert!(tree.occurrence(*item).collection);
        assert_eq!(labels(&tree, tree.children(*item)), ["value"]);
        let [enumeration] = tree.children(*size) else {
            panic!("expected the inline simple type")
        };
        assert!(tree.group(*enumeration).unwrap().enumeration);
    }

    #[test]
    fn recursion_reuses_the_definition_in_progress() {
        let (schema, tree, definitions) = build(
            r#"
            <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
              <xs:complexType name="Node">
                <xs:sequence>
                  <xs:element name="child" type="Node" minOccurs="0" maxOccurs="unbounded"/>
                </xs:sequence>
              </xs:complexType>
            </xs:schema>"#,
        );
        let node = *definitions.get(global(&schema, "Node")).unwrap();
        let sequence = tree.children(node)[0];
        let child = tree.children(sequence)[0];
        assert_eq!(tree.reference_target(child), Some(node));
        assert_eq!(tree.definition(node).unwrap().reference_count, 1);
        // repeated structural reference
        assert!(tree.definition(node).unwrap().inline_blocked);
    }

    #[test]
    fn building_twice_returns_the_cached_definition() {
        let schema = SchemaSet::parse(ORDER).unwrap();
        let customs =
            ResolvedCustoms::resolve(&Customizations::default(), &schema, &mut Problems::new());
        let mut tree = ItemTree::new();
        let mut problems = Problems::new();
        let mut builder = TreeBuilder::new(&schema, &customs, &mut tree, &mut problems);
        let order_type = global(&schema, "Order");
        let first = builder.build_definition(order_type);
        let items = builder.tree.len();
        let second = builder.build_definition(order_type);
        assert_eq!(first, second);
        assert_eq!(builder.tree.len(), items);

        // building everything afterwards reuses it too
        let definitions = builder.build_all();
        assert_eq!(definitions.get(order_type), Some(&first));
        assert_eq!(tree.definitions().len(), 2);
    }

    #[test]
    fn derivations_reference_their_base() {
        let (schema, tree, definitions) = build(
            r#"
            <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
              <xs:complexType name="Base">
                <xs:attribute name="id" type="xs:ID"/>
              </xs:complexType>
              <xs:complexType name="Derived">
                <xs:complexContent>
                  <xs:extension base="Base">
                    <xs:sequence>
                      <xs:element name="extra" type="xs:string"/>
                    </xs:sequence>
                  </xs:extension>
                </xs:complexContent>
              </xs:complexType>
              <xs:simpleType name="Code">
                <xs:union memberTypes="xs:int xs:string"/>
              </xs:simpleType>
              <xs:complexType name="Priced">
                <xs:simpleContent>
                  <xs:extension base="xs:decimal">
                    <xs:attribute name="currency" type="xs:string"/>
                  </xs:extension>
                </xs:simpleContent>
              </xs:complexType>
            </xs:schema>"#,
        );
        let base = *definitions.get(global(&schema, "Base")).unwrap();
        let derived = *definitions.get(global(&schema, "Derived")).unwrap();
        assert_eq!(labels(&tree, tree.children(derived)), ["reference", "group"]);
        assert_eq!(tree.reference_target(tree.children(derived)[0]), Some(base));
        assert!(tree.definition(base).unwrap().inline_blocked);

        let code = *definitions.get(global(&schema, "Code")).unwrap();
        let [union] = tree.children(code) else {
            panic!("expected the union group")
        };
        assert_eq!(labels(&tree, tree.children(*union)), ["value", "value"]);

        let priced = *definitions.get(global(&schema, "Priced")).unwrap();
        assert_eq!(labels(&tree, tree.children(priced)), ["value", "group"]);
    }
}
