//! Inlining decisions.
//!
//! Every definition and every nested group gets a complexity score: 0 (no content), 1 (a single
//! value-like item) or 2 (more than that; the score is clamped). Definitions that are simple
//! enough are inlined, which replaces each reference to them by a copy of their content. Nested
//! groups are inlined into their enclosing class unless presence or choice semantics need an
//! object of their own.

use std::collections::HashMap;

use dt_xsd::{ComponentKind, SchemaSet};

use crate::customs::{AnyHandling, ComponentAction, ResolvedCustoms};
use crate::error::CodegenError;
use crate::item::{DefinitionItem, GroupItem, ItemId, ItemKind, ItemTree};
use crate::problems::Problems;

const MAX_COMPLEXITY: u8 = 2;

#[derive(Debug, Default, Clone, Copy)]
struct DefinitionState {
    done: bool,
    self_referencing: bool,
    complexity: u8,
}

pub struct InlineEngine<'a> {
    schema: &'a SchemaSet,
    customs: &'a ResolvedCustoms,
    tree: &'a mut ItemTree,
    problems: &'a mut Problems,
    states: HashMap<ItemId, DefinitionState>,
    /// Definitions whose complexity is being computed, outermost first
    visiting: Vec<ItemId>,
}

impl<'a> InlineEngine<'a> {
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
            states: HashMap::new(),
            visiting: Vec::new(),
        }
    }

    pub fn run(mut self) -> Result<(), CodegenError> {
        for definition in self.tree.definitions().to_vec() {
            self.check_definition(definition)?;
        }
        self.convert_shared_groups();
        for definition in self.tree.definitions().to_vec() {
            self.compact(definition);
        }
        let inline = self
            .tree
            .definitions()
            .iter()
            .filter(|definition| self.tree.get(**definition).is_inline())
            .count();
        tracing::debug!(
            definitions = self.tree.definitions().len(),
            inline,
            "made inlining decisions"
        );
        Ok(())
    }

    /// Decides whether `definition` is inlined, computing its complexity first if needed.
    fn check_definition(&mut self, definition: ItemId) -> Result<bool, CodegenError> {
        if let Some(position) = self.visiting.iter().position(|open| *open == definition) {
            for open in &self.visiting[position..] {
                self.states.entry(*open).or_default().self_referencing = true;
            }
            return Ok(false);
        }
        if self.states.get(&definition).is_some_and(|state| state.done) {
            return Ok(self.tree.get(definition).is_inline());
        }

        self.visiting.push(definition);
        let complexity = self.group_complexity(definition)?;
        self.visiting.pop();

        let state = self.states.entry(definition).or_default();
        state.done = true;
        state.complexity = complexity;
        let self_referencing = state.self_referencing;

        let inline = self.decide(definition, complexity, self_referencing)?;
        if let Some(group) = self.tree.group_mut(definition) {
            group.inline = inline;
        }
        if inline {
            self.release_references(definition);
        }
        tracing::trace!(
            component = %self.schema.describe(self.tree.get(definition).component),
            complexity,
            self_referencing,
            inline,
            "checked definition"
        );
        Ok(inline)
    }

    fn decide(
        &mut self,
        definition: ItemId,
        complexity: u8,
        self_referencing: bool,
    ) -> Result<bool, CodegenError> {
        let root = self.is_document_root(definition) && !self.binds_directly(definition);
        let item = self.tree.get(definition);
        let component = item.component;
        let Some(DefinitionItem {
            group,
            reference_count,
            inline_blocked,
        }) = item.definition()
        else {
            return Err(CodegenError::ExpectedGroup {
                item: definition,
                found: item.kind.label(),
            });
        };
        let blocked = *inline_blocked || self_referencing || group.enumeration || root;
        let action = self.customs.action(component);
        Ok(match action {
            Some(ComponentAction::Inline) => {
                if blocked {
                    self.problems.error(
                        Some(component),
                        format!(
                            "{}: cannot be inlined, keeping a class for it",
                            self.schema.describe(component)
                        ),
                    );
                }
                !blocked
            }
            Some(ComponentAction::Separate) => false,
            _ if blocked => false,
            _ => {
                let prefer_inline = action == Some(ComponentAction::PreferInline)
                    || self.customs.settings.prefer_inline;
                complexity == 0
                    || (complexity == 1 && self.is_simple(definition))
                    || (*reference_count == 1 && prefer_inline)
            }
        })
    }

    fn is_document_root(&self, definition: ItemId) -> bool {
        let component = self.tree.get(definition).component;
        self.schema.get(component).kind == ComponentKind::Element && self.schema.is_global(component)
    }

    /// Whether a global element leads through its own inline groups straight to one class
    /// reference or value. Only then can it be inlined and still be bound as a document root;
    /// any nested element, attribute or class of its own needs a class for the element.
    fn binds_directly(&self, definition: ItemId) -> bool {
        let element = self.tree.get(definition).component;
        let mut current = definition;
        loop {
            let [only] = self.tree.children(current) else {
                return self.tree.children(current).is_empty();
            };
            let item = self.tree.get(*only);
            if item.component != element
                && self.schema.get(item.component).kind.is_element_or_attribute()
            {
                return false;
            }
            match &item.kind {
                ItemKind::Group(group) if group.inline => current = *only,
                ItemKind::Group(_) | ItemKind::Definition(_) => return false,
                ItemKind::Reference { .. } | ItemKind::Value { .. } | ItemKind::Any { .. } => {
                    return true
                }
            }
        }
    }

    /// An inlined definition is only used through copies of its content, so the references it
    /// holds itself no longer count.
    fn release_references(&mut self, definition: ItemId) {
        for item in self.tree.subtree(definition) {
            if let Some(target) = self.tree.reference_target(item) {
                if let Some(target) = self.tree.definition_mut(target) {
                    target.reference_count = target.reference_count.saturating_sub(1);
                }
            }
        }
    }

    /// No enumeration and no repetition anywhere below `group`.
    fn is_simple(&self, group: ItemId) -> bool {
        self.tree.subtree(group).into_iter().all(|item| {
            !self.tree.occurrence(item).collection
                && !self
                    .tree
                    .group(item)
                    .is_some_and(|group| group.enumeration)
        })
    }

    /// Computes the complexity of a group, inlining references and deciding nested groups on
    /// the way.
    fn group_complexity(&mut self, group: ItemId) -> Result<u8, CodegenError> {
        if self
            .tree
            .group(group)
            .is_some_and(|group| group.enumeration)
        {
            return Ok(1);
        }
        let mut total = 0u8;
        let mut index = 0;
        while let Some(child) = self.tree.children(group).get(index).copied() {
            let contribution = match self.tree.get(child).kind {
                ItemKind::Reference { definition } => {
                    if self.check_definition(definition)? {
                        self.inline_reference(child, definition);
                        // look at the replacement in the same position
                        continue;
                    }
                    1
                }
                ItemKind::Value { .. } => 1,
                ItemKind::Any { handling } => u8::from(handling != AnyHandling::Discard),
                ItemKind::Group(_) => {
                    let nested = self.group_complexity(child)?;
                    let inline = self.nested_inline(group, child, nested);
                    if let Some(child) = self.tree.group_mut(child) {
                        child.inline = inline;
                    }
                    if !inline || (nested == 0 && self.tree.occurrence(child).optional) {
                        1
                    } else {
                        nested
                    }
                }
                ItemKind::Definition(_) => {
                    return Err(CodegenError::NestedDefinition { item: child })
                }
            };
            let repeat = u8::from(self.tree.occurrence(child).collection);
            total = (total + contribution + repeat).min(MAX_COMPLEXITY);
            index += 1;
        }
        Ok(total)
    }

    /// Whether a nested group can be merged into its parent.
    fn nested_inline(&self, parent: ItemId, group: ItemId, complexity: u8) -> bool {
        let component = self.tree.get(group).component;
        if self
            .tree
            .group(group)
            .is_some_and(|group| group.enumeration)
            || self.customs.has_action(component, ComponentAction::Separate)
        {
            return false;
        }
        if self.customs.has_action(component, ComponentAction::PushInline) {
            return true;
        }
        let occurrence = self.tree.occurrence(group);
        if occurrence.optional || occurrence.collection {
            // presence (or repetition) of anything beyond a single value needs an object
            if complexity > 1 || (complexity == 1 && !self.single_chain_inlinable(group)) {
                return false;
            }
        }
        let parent_kind = self.schema.get(self.tree.get(parent).component).kind;
        if parent_kind == ComponentKind::Choice && complexity > 1 {
            return self.always_present_lead(group);
        }
        true
    }

    /// Follows the chain of single children below an optional or repeated group. The group can
    /// be inlined unless the chain passes another optional or repeated group, or ends at a
    /// value named by a different element or attribute.
    fn single_chain_inlinable(&self, group: ItemId) -> bool {
        let origin = self.tree.get(group).component;
        let mut current = group;
        loop {
            let [child] = self.tree.children(current) else {
                return true;
            };
            let child = *child;
            match self.tree.get(child).kind {
                ItemKind::Group(_) => {
                    let occurrence = self.tree.occurrence(child);
                    if occurrence.optional || occurrence.collection {
                        return false;
                    }
                    current = child;
                }
                ItemKind::Value { .. } => {
                    let component = self.tree.get(child).component;
                    return component == origin
                        || !self.schema.get(component).kind.is_element_or_attribute();
                }
                _ => return true,
            }
        }
    }

    /// Whether the first required item below `group` is an element (or kept wildcard content),
    /// so that the alternative's presence shows in the document.
    fn always_present_lead(&self, group: ItemId) -> bool {
        let mut current = group;
        loop {
            let Some(first) = self
                .tree
                .children(current)
                .iter()
                .copied()
                .find(|child| !self.tree.occurrence(*child).optional)
            else {
                return false;
            };
            let item = self.tree.get(first);
            let is_element = self.schema.get(item.component).kind == ComponentKind::Element;
            match item.kind {
                ItemKind::Reference { .. } | ItemKind::Value { .. } => return is_element,
                ItemKind::Any { handling } => return handling != AnyHandling::Discard,
                ItemKind::Group(_) if is_element => return true,
                ItemKind::Group(_) => current = first,
                ItemKind::Definition(_) => return false,
            }
        }
    }

    /// Replaces a reference by a group holding a copy of the definition's content.
    fn inline_reference(&mut self, reference: ItemId, definition: ItemId) {
        let item = self.tree.get(reference);
        let (component, implicit, name) = (item.component, item.implicit, item.name.clone());
        let enumeration = self
            .tree
            .group(definition)
            .is_some_and(|group| group.enumeration);
        let group = self.tree.create_detached(
            component,
            implicit,
            ItemKind::Group(GroupItem {
                enumeration,
                ..GroupItem::default()
            }),
        );
        self.tree.get_mut(group).name = name;
        self.tree.replace(reference, group);
        for child in self.tree.children(definition).to_vec() {
            self.tree.deep_copy(child, group);
        }
        if let Some(definition) = self.tree.definition_mut(definition) {
            definition.reference_count = definition.reference_count.saturating_sub(1);
        }
        tracing::trace!(?reference, ?group, "inlined reference");
    }

    /// Definitions that get a class and are used more than once must not carry their nested
    /// classes along: each outermost nested non-inline group becomes a definition of its own.
    fn convert_shared_groups(&mut self) {
        let mut index = 0;
        while let Some(definition) = self.tree.definitions().get(index).copied() {
            index += 1;
            let shared = self
                .tree
                .definition(definition)
                .is_some_and(|item| !item.group.inline && item.reference_count > 1);
            if shared {
                self.split_nested(definition);
            }
        }
    }

    fn split_nested(&mut self, group: ItemId) {
        for child in self.tree.children(group).to_vec() {
            match self.tree.get(child).kind {
                ItemKind::Group(ref nested) if !nested.inline => self.split_out(child),
                ItemKind::Group(_) => self.split_nested(child),
                _ => {}
            }
        }
    }

    fn split_out(&mut self, group: ItemId) {
        let item = self.tree.get(group);
        let (component, implicit, name) = (item.component, item.implicit, item.name.clone());
        let enumeration = item.group().is_some_and(|group| group.enumeration);
        let definition = self.tree.create_detached(
            component,
            implicit,
            ItemKind::Definition(DefinitionItem {
                group: GroupItem {
                    enumeration,
                    ..GroupItem::default()
                },
                reference_count: 0,
                inline_blocked: true,
            }),
        );
        self.tree.adopt_children(group, definition);
        let reference = self
            .tree
            .create_detached(component, implicit, ItemKind::Reference { definition });
        self.tree.get_mut(reference).name = name;
        self.tree.replace(group, reference);
        self.states.insert(
            definition,
            DefinitionState {
                done: true,
                ..DefinitionState::default()
            },
        );
        tracing::debug!(
            component = %self.schema.describe(component),
            ?definition,
            "split shared nested group into a definition"
        );
    }

    /// Collapses chains of a group whose only child is an inline group of the same component.
    fn compact(&mut self, group: ItemId) {
        for child in self.tree.children(group).to_vec() {
            if self.tree.group(child).is_some() {
                self.compact(child);
            }
        }
        loop {
            let [only] = self.tree.children(group) else {
                break;
            };
            let only = *only;
            let collapsible = self.tree.get(only).component == self.tree.get(group).component
                && matches!(self.tree.get(only).kind, ItemKind::Group(ref nested) if nested.inline);
            if !collapsible {
                break;
            }
            let enumeration = self.tree.group(only).is_some_and(|nested| nested.enumeration);
            self.tree.adopt_children(only, group);
            self.tree.remove_child(group, only);
            if let Some(group) = self.tree.group_mut(group) {
                group.enumeration |= enumeration;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::TreeBuilder;
    use crate::customs::Customizations;
    use crate::names::DefaultNameConverter;
    use crate::naming::NameAssigner;
    use dt_xsd::{ComponentId, ComponentSlots};

    struct Compiled {
        schema: SchemaSet,
        customs: ResolvedCustoms,
        tree: ItemTree,
        definitions: ComponentSlots<ItemId>,
        problems: Problems,
    }

    impl Compiled {
        fn definition(&self, name: &str) -> ItemId {
            let component = self
                .schema
                .global_components()
                .into_iter()
                .find(|id| self.schema.get(*id).name.as_deref() == Some(name))
                .unwrap();
            *self.definitions.get(component).unwrap()
        }

        fn is_inline(&self, name: &str) -> bool {
            self.tree.get(self.definition(name)).is_inline()
        }

        fn component(&self, item: ItemId) -> ComponentId {
            self.tree.get(item).component
        }
    }

    fn compile(text: &str, customs: &str) -> Compiled {
        let schema = SchemaSet::parse(text).unwrap();
        let mut problems = Problems::new();
        let customs = ResolvedCustoms::resolve(
            &Customizations::from_toml(customs).unwrap(),
            &schema,
            &mut problems,
        );
        let mut tree = ItemTree::new();
        let definitions = TreeBuilder::new(&schema, &customs, &mut tree, &mut problems).build_all();
        InlineEngine::new(&schema, &customs, &mut tree, &mut problems)
            .run()
            .unwrap();
        Compiled {
            schema,
            customs,
            tree,
            definitions,
            problems,
        }
    }

    #[test]
    fn element_types_keep_their_class() {
        let compiled = compile(
            r#"
            <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
              <xs:element name="E" type="T"/>
              <xs:complexType name="T">
                <xs:sequence>
                  <xs:element name="item" type="xs:string" maxOccurs="unbounded"/>
                </xs:sequence>
                <xs:attribute name="a" type="xs:int"/>
                <xs:attribute name="b" type="xs:string"/>
              </xs:complexType>
            </xs:schema>"#,
            "",
        );
        assert!(compiled.is_inline("E"));
        assert!(!compiled.is_inline("T"));

        let t = compiled.definition("T");
        let children = compiled.tree.children(t);
        assert_eq!(children.len(), 3);
        assert!(children
            .iter()
            .all(|child| compiled.tree.get(*child).is_inline()));
    }

    #[test]
    fn simple_definitions_are_inlined_everywhere() {
        let compiled = compile(
            r#"
            <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
              <xs:simpleType name="Code">
                <xs:restriction base="xs:string"/>
              </xs:simpleType>
              <xs:complexType name="Pair">
                <xs:sequence>
                  <xs:element name="first" type="Code"/>
                  <xs:element name="second" type="Code" minOccurs="0"/>
                </xs:sequence>
              </xs:complexType>
            </xs:schema>"#,
            "",
        );
        assert!(compiled.is_inline("Code"));
        assert!(!compiled.is_inline("Pair"));
        assert_eq!(
            compiled
                .tree
                .definition(compiled.definition("Code"))
                .unwrap()
                .reference_count,
            0
        );

        let pair = compiled.definition("Pair");
        let sequence = compiled.tree.children(pair)[0];
        let [first, second] = compiled.tree.children(sequence) else {
            panic!("expected two elements")
        };
        for element in [*first, *second] {
            assert_eq!(compiled.tree.get(element).kind.label(), "group");
            assert_eq!(compiled.tree.children(element).len(), 1);
        }
        assert!(compiled.tree.occurrence(*second).optional);
        assert!(compiled.tree.is_topmost(*second));
    }

    #[test]
    fn recursive_definitions_are_never_inlined() {
        let compiled = compile(
            r#"
            <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
              <xs:complexType name="Node">
                <xs:sequence>
                  <xs:element name="next" type="Node" minOccurs="0"/>
                </xs:sequence>
              </xs:complexType>
            </xs:schema>"#,
            r#"
            [[component]]
            kind = "complexType"
            name = "Node"
            action = "inline"
            "#,
        );
        assert!(!compiled.is_inline("Node"));
        assert_eq!(compiled.problems.len(), 1);
        assert!(compiled.problems.has_errors());
    }

    #[test]
    fn optional_structures_get_a_class() {
        let compiled = compile(
            r#"
            <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
              <xs:complexType name="T">
                <xs:sequence>
                  <xs:sequence minOccurs="0">
                    <xs:element name="x" type="xs:string"/>
                    <xs:element name="y" type="xs:string"/>
                  </xs:sequence>
                  <xs:element name="z" type="xs:string"/>
                </xs:sequence>
              </xs:complexType>
            </xs:schema>"#,
            "",
        );
        let t = compiled.definition("T");
        let outer = compiled.tree.children(t)[0];
        assert!(compiled.tree.get(outer).is_inline());
        let [inner, z] = compiled.tree.children(outer) else {
            panic!("expected two particles")
        };
        assert!(!compiled.tree.get(*inner).is_inline());
        assert!(compiled.tree.get(*z).is_inline());
    }

    #[test]
    fn choice_alternatives_need_a_leading_element() {
        let compiled = compile(
            r#"
            <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
              <xs:complexType name="T">
                <xs:choice>
                  <xs:sequence>
                    <xs:element name="a" type="xs:string"/>
                    <xs:element name="b" type="xs:string"/>
                  </xs:sequence>
                  <xs:sequence>
                    <xs:element name="c" type="xs:string" minOccurs="0"/>
                    <xs:element name="d" type="xs:string" minOccurs="0"/>
                  </xs:sequence>
                </xs:choice>
              </xs:complexType>
            </xs:schema>"#,
            "",
        );
        let t = compiled.definition("T");
        let choice = compiled.tree.children(t)[0];
        let [led, unled] = compiled.tree.children(choice) else {
            panic!("expected two alternatives")
        };
        assert!(compiled.tree.get(*led).is_inline());
        assert!(!compiled.tree.get(*unled).is_inline());
    }

    #[test]
    fn shared_definitions_split_out_nested_classes() {
        let compiled = compile(
            r#"
            <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
              <xs:complexType name="Shared">
                <xs:sequence>
                  <xs:sequence minOccurs="0">
                    <xs:element name="x" type="xs:string"/>
                    <xs:element name="y" type="xs:string"/>
                  </xs:sequence>
                  <xs:element name="z" type="xs:string"/>
                </xs:sequence>
              </xs:complexType>
              <xs:complexType name="User">
                <xs:sequence>
                  <xs:element name="one" type="Shared"/>
                  <xs:element name="two" type="Shared"/>
                </xs:sequence>
              </xs:complexType>
            </xs:schema>"#,
            "",
        );
        let shared = compiled.definition("Shared");
        assert!(!compiled.is_inline("Shared"));
        assert_eq!(
            compiled.tree.definition(shared).unwrap().reference_count,
            2
        );
        // Shared, User and the split out optional sequence
        assert_eq!(compiled.tree.definitions().len(), 3);
        let split = compiled.tree.definitions()[2];
        let outer = compiled.tree.children(shared)[0];
        let reference = compiled.tree.children(outer)[0];
        assert_eq!(compiled.tree.reference_target(reference), Some(split));
        assert!(compiled.tree.occurrence(reference).optional);
        assert_eq!(compiled.component(split), compiled.component(reference));
        assert_eq!(compiled.tree.children(split).len(), 2);

        // the split out sequence is still named after its first element
        let mut compiled = compiled;
        NameAssigner::new(
            &compiled.schema,
            &compiled.customs,
            &DefaultNameConverter,
            &mut compiled.tree,
        )
        .run();
        assert_eq!(compiled.tree.get(reference).name.as_deref(), Some("x"));
        assert_eq!(
            compiled.tree.group(split).unwrap().class_name.as_deref(),
            Some("SharedX")
        );
    }

    #[test]
    fn mutually_recursive_definitions_are_never_inlined() {
        let compiled = compile(
            r#"
            <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
              <xs:complexType name="A">
                <xs:sequence>
                  <xs:element name="b" type="B" minOccurs="0"/>
                </xs:sequence>
              </xs:complexType>
              <xs:complexType name="B">
                <xs:sequence>
                  <xs:element name="a" type="A" minOccurs="0"/>
                </xs:sequence>
              </xs:complexType>
            </xs:schema>"#,
            r#"
            [[component]]
            kind = "complexType"
            name = "B"
            action = "inline"
            "#,
        );
        assert!(!compiled.is_inline("A"));
        assert!(!compiled.is_inline("B"));
        assert_eq!(compiled.problems.len(), 1);
        assert!(compiled.problems.has_errors());
    }

    #[test]
    fn complexity_is_clamped() {
        let schema = SchemaSet::parse(
            r#"
            <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
              <xs:complexType name="Lists">
                <xs:sequence>
                  <xs:element name="a" type="xs:string" maxOccurs="unbounded"/>
                  <xs:element name="b" type="xs:string" maxOccurs="unbounded"/>
                  <xs:element name="c" type="xs:string" maxOccurs="unbounded"/>
                </xs:sequence>
              </xs:complexType>
              <xs:complexType name="Empty"/>
            </xs:schema>"#,
        )
        .unwrap();
        let mut problems = Problems::new();
        let customs = ResolvedCustoms::resolve(&Customizations::default(), &schema, &mut problems);
        let mut tree = ItemTree::new();
        TreeBuilder::new(&schema, &customs, &mut tree, &mut problems).build_all();
        let [lists, empty] = tree.definitions()[..] else {
            panic!("expected two definitions")
        };
        let mut engine = InlineEngine::new(&schema, &customs, &mut tree, &mut problems);
        assert_eq!(engine.group_complexity(lists).unwrap(), MAX_COMPLEXITY);
        assert_eq!(engine.group_complexity(empty).unwrap(), 0);
    }

    #[test]
    fn root_elements_with_nested_classes_keep_their_own() {
        let compiled = compile(
            r#"
            <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
              <xs:element name="E">
                <xs:complexType>
                  <xs:sequence minOccurs="0">
                    <xs:element name="x" type="xs:string"/>
                    <xs:element name="y" type="xs:string"/>
                  </xs:sequence>
                </xs:complexType>
              </xs:element>
            </xs:schema>"#,
            "",
        );
        assert!(!compiled.is_inline("E"));
        let [sequence] = compiled.tree.children(compiled.definition("E")) else {
            panic!("expected the sequence")
        };
        assert!(!compiled.tree.get(*sequence).is_inline());
        assert!(compiled.problems.is_empty());
    }

    #[test]
    fn inlined_element_references_do_not_count() {
        let compiled = compile(
            r#"
            <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
              <xs:element name="E" type="T"/>
              <xs:complexType name="T">
                <xs:sequence>
                  <xs:sequence minOccurs="0">
                    <xs:element name="x" type="xs:string"/>
                    <xs:element name="y" type="xs:string"/>
                  </xs:sequence>
                  <xs:element name="z" type="xs:string"/>
                </xs:sequence>
              </xs:complexType>
              <xs:complexType name="Holder">
                <xs:sequence>
                  <xs:element ref="E"/>
                  <xs:element name="k" type="xs:string"/>
                </xs:sequence>
              </xs:complexType>
            </xs:schema>"#,
            "",
        );
        assert!(compiled.is_inline("E"));
        let t = compiled.definition("T");
        // only the copy in Holder is left
        assert_eq!(compiled.tree.definition(t).unwrap().reference_count, 1);
        // so nothing is split out of T
        assert_eq!(compiled.tree.definitions().len(), 3);
    }

    #[test]
    fn compaction_collapses_same_component_chains() {
        let compiled = compile(
            r#"
            <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
              <xs:element name="wrapper">
                <xs:complexType>
                  <xs:sequence>
                    <xs:element name="p" type="Point"/>
                    <xs:element name="q" type="Point"/>
                  </xs:sequence>
                </xs:complexType>
              </xs:element>
              <xs:complexType name="Point">
                <xs:attribute name="x" type="xs:int"/>
              </xs:complexType>
            </xs:schema>"#,
            "",
        );
        assert!(compiled.is_inline("Point"));
        let wrapper = compiled.definition("wrapper");
        let sequence = compiled.tree.children(wrapper)[0];
        let p = compiled.tree.children(sequence)[0];
        // reference replaced by a group holding the attribute
        let [x] = compiled.tree.children(p) else {
            panic!("expected the copied attribute")
        };
        assert_eq!(
            compiled.schema.get(compiled.component(*x)).name.as_deref(),
            Some("x")
        );
    }
}
