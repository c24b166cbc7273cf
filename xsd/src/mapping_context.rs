use roxmltree::Node;

use super::{
    builtins::XS_NAMESPACE,
    component::{AttributeUse, Component, ComponentId, ComponentKind, MaxOccurs, ProcessContents},
    components::SchemaSet,
    error::XsdError,
    values::attribute_value,
    xstypes::{AnyURI, QName, Sequence},
};

/// Maps the XML representation of one `<schema>` document onto components of a [`SchemaSet`].
pub(super) struct MappingContext<'s> {
    set: &'s mut SchemaSet,
    target_namespace: Option<AnyURI>,
}

impl<'s> MappingContext<'s> {
    pub(super) fn new(set: &'s mut SchemaSet) -> Self {
        Self {
            set,
            target_namespace: None,
        }
    }

    pub(super) fn map_schema(&mut self, schema: Node) -> Result<ComponentId, XsdError> {
        if !is_xs_element(schema, "schema") {
            return Err(XsdError::UnexpectedRoot(schema.tag_name().name().to_string()));
        }

        // {target namespace}
        //   The ·actual value· of the targetNamespace [attribute] of the <schema> element
        //   information item if present, otherwise ·absent·.
        self.target_namespace = attribute_value::<String>(schema, "targetNamespace")?;

        let mut component = Component::new(ComponentKind::Schema);
        component.target_namespace = self.target_namespace.clone();
        component.documentation = documentation(schema);
        let schema_ref = self.set.create(None, component);

        for child in schema.children().filter(Node::is_element) {
            if let Some(global) = self.map_component(child, schema_ref)? {
                self.set.register(global)?;
            }
        }
        tracing::debug!(
            target_namespace = ?self.target_namespace,
            globals = self.set.get(schema_ref).children().len(),
            "mapped schema document"
        );
        Ok(schema_ref)
    }

    /// Maps `node` and its descendants. Returns `None` for information items that have no
    /// component counterpart (annotations, imports, facets other than enumeration, ...).
    fn map_component(
        &mut self,
        node: Node,
        parent: ComponentId,
    ) -> Result<Option<ComponentId>, XsdError> {
        if node.tag_name().namespace() != Some(XS_NAMESPACE) {
            return Ok(None);
        }
        let Some(kind) = ComponentKind::from_tag_name(node.tag_name().name()) else {
            return Ok(None);
        };

        let mut component = Component::new(kind);
        component.target_namespace = self.target_namespace.clone();
        component.name = attribute_value::<String>(node, "name")?;
        component.reference = attribute_value::<QName>(node, "ref")?;
        component.type_name = match kind {
            ComponentKind::Extension | ComponentKind::Restriction => {
                attribute_value::<QName>(node, "base")?
            }
            ComponentKind::List => attribute_value::<QName>(node, "itemType")?,
            _ => attribute_value::<QName>(node, "type")?,
        };
        component.member_types =
            attribute_value::<Vec<QName>>(node, "memberTypes")?.unwrap_or_default();

        // {min occurs}
        //   The ·actual value· of the minOccurs [attribute], if present, otherwise 1.
        component.min_occurs = attribute_value::<u64>(node, "minOccurs")?.unwrap_or(1);
        // {max occurs}
        //   unbounded, if the maxOccurs [attribute] equals unbounded, otherwise the ·actual value·
        //   of the maxOccurs [attribute], if present, otherwise 1.
        component.max_occurs =
            attribute_value::<MaxOccurs>(node, "maxOccurs")?.unwrap_or(MaxOccurs::Count(1));

        component.use_ = match node.attribute("use") {
            None | Some("optional") => AttributeUse::Optional,
            Some("required") => AttributeUse::Required,
            Some("prohibited") => AttributeUse::Prohibited,
            Some(other) => return Err(invalid_value(node, "use", other)),
        };
        component.process_contents = match node.attribute("processContents") {
            None | Some("strict") => ProcessContents::Strict,
            Some("lax") => ProcessContents::Lax,
            Some("skip") => ProcessContents::Skip,
            Some(other) => return Err(invalid_value(node, "processContents", other)),
        };
        component.nillable = attribute_value::<bool>(node, "nillable")?.unwrap_or(false);
        component.abstract_ = attribute_value::<bool>(node, "abstract")?.unwrap_or(false);
        component.mixed = attribute_value::<bool>(node, "mixed")?.unwrap_or(false);
        component.value = attribute_value::<String>(node, "value")?;
        component.documentation = documentation(node);

        if kind == ComponentKind::Enumeration && component.value.is_none() {
            return Err(XsdError::MissingAttribute {
                element: kind.tag_name().to_string(),
                attribute: "value".to_string(),
            });
        }

        let id = self.set.create(Some(parent), component);
        for child in node.children().filter(Node::is_element) {
            self.map_component(child, id)?;
        }
        Ok(Some(id))
    }
}

fn is_xs_element(node: Node, name: &str) -> bool {
    node.tag_name().namespace() == Some(XS_NAMESPACE) && node.tag_name().name() == name
}

fn invalid_value(node: Node, attribute: &str, value: &str) -> XsdError {
    XsdError::InvalidAttributeValue {
        element: node.tag_name().name().to_string(),
        attribute: attribute.to_string(),
        value: value.to_string(),
    }
}

/// The text of the `<documentation>` children of the `<annotation>` of `node`.
fn documentation(node: Node) -> Sequence<String> {
    node.children()
        .filter(|child| is_xs_element(*child, "annotation"))
        .flat_map(|annotation| annotation.children())
        .filter(|child| is_xs_element(*child, "documentation"))
        .map(content_to_text)
        .map(|text| text.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|text| !text.is_empty())
        .collect()
}

/// Concatenated text content of a node, markup dropped.
fn content_to_text(node: Node) -> String {
    let mut text = String::new();
    for descendant in node.descendants() {
        if let Some(fragment) = descendant.text().filter(|_| descendant.is_text()) {
            text.push_str(fragment);
        }
    }
    text
}

impl SchemaSet {
    /// Maps a parsed schema document into this set and returns its `<schema>` component.
    pub fn read_document(
        &mut self,
        document: &roxmltree::Document,
    ) -> Result<ComponentId, XsdError> {
        MappingContext::new(self).map_schema(document.root_element())
    }

    /// Parses `text` as a schema document and maps it into this set.
    pub fn read_str(&mut self, text: &str) -> Result<ComponentId, XsdError> {
        let document = roxmltree::Document::parse(text)?;
        self.read_document(&document)
    }

    /// Builds a set from a single schema document.
    pub fn parse(text: &str) -> Result<Self, XsdError> {
        let mut set = Self::new();
        set.read_str(text)?;
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{SymbolSpace, TypeRef};

    const SCHEMA: &str = r#"
        <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                   xmlns:tns="urn:example:orders"
                   targetNamespace="urn:example:orders">
          <xs:annotation><xs:documentation>Orders</xs:documentation></xs:annotation>
          <xs:element name="order" type="tns:OrderType"/>
          <xs:complexType name="OrderType">
            <xs:annotation>
              <xs:documentation>
                A purchase   order.
              </xs:documentation>
            </xs:annotation>
            <xs:sequence>
              <xs:element name="item" type="xs:string" maxOccurs="unbounded"/>
              <xs:element ref="tns:note" minOccurs="0"/>
            </xs:sequence>
            <xs:attribute name="id" type="xs:int" use="required"/>
          </xs:complexType>
          <xs:element name="note" type="xs:string"/>
          <xs:simpleType name="Color">
            <xs:restriction base="xs:string">
              <xs:enumeration value="red"/>
              <xs:length value="3"/>
              <xs:enumeration value="green"/>
            </xs:restriction>
          </xs:simpleType>
        </xs:schema>
    "#;

    fn qname(local: &str) -> QName {
        QName::with_namespace("urn:example:orders", local)
    }

    #[test]
    fn maps_globals_in_document_order() {
        let set = SchemaSet::parse(SCHEMA).unwrap();
        let kinds = set
            .global_components()
            .into_iter()
            .map(|id| set.get(id).kind)
            .collect::<Vec<_>>();
        assert_eq!(
            kinds,
            [
                ComponentKind::Element,
                ComponentKind::ComplexType,
                ComponentKind::Element,
                ComponentKind::SimpleType
            ]
        );
        assert_eq!(
            set.get(set.schemas()[0]).documentation,
            vec!["Orders".to_string()]
        );
    }

    #[test]
    fn resolves_types_and_references() {
        let set = SchemaSet::parse(SCHEMA).unwrap();
        let order_type = set
            .lookup(SymbolSpace::TypeDefinition, &qname("OrderType"))
            .unwrap();
        assert_eq!(
            set.get(order_type).documentation,
            vec!["A purchase order.".to_string()]
        );

        let order = set.lookup(SymbolSpace::Element, &qname("order")).unwrap();
        let type_name = set.get(order).type_name.clone().unwrap();
        assert_eq!(set.resolve_type(&type_name), Some(TypeRef::Global(order_type)));

        let sequence = set.get(order_type).children()[0];
        let [item, note_ref] = set.get(sequence).children() else {
            panic!("expected two particles");
        };
        let item = set.get(*item);
        assert!(item.is_repeated());
        assert!(matches!(
            set.resolve_type(item.type_name.as_ref().unwrap()),
            Some(TypeRef::Builtin(_))
        ));
        assert!(set.get(*note_ref).is_optional());
        assert_eq!(
            set.resolve_reference(*note_ref),
            set.lookup(SymbolSpace::Element, &qname("note"))
        );

        let id_attribute = set.get(order_type).children()[1];
        assert!(!set.get(id_attribute).is_optional());
    }

    #[test]
    fn collects_enumeration_values_only() {
        let set = SchemaSet::parse(SCHEMA).unwrap();
        let color = set
            .lookup(SymbolSpace::TypeDefinition, &qname("Color"))
            .unwrap();
        assert_eq!(set.enumeration_values(color), ["red", "green"]);
    }

    #[test]
    fn detach_unregisters_globals() {
        let mut set = SchemaSet::parse(SCHEMA).unwrap();
        let note = set.lookup(SymbolSpace::Element, &qname("note")).unwrap();
        assert!(set.detach(note));
        assert!(!set.detach(note));
        assert!(!set.is_live(note));
        assert_eq!(set.lookup(SymbolSpace::Element, &qname("note")), None);
        assert_eq!(set.global_components().len(), 3);
    }

    #[test]
    fn rejects_duplicates_and_bad_values() {
        let duplicate = r#"
            <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
              <xs:element name="a"/>
              <xs:element name="a"/>
            </xs:schema>"#;
        assert!(matches!(
            SchemaSet::parse(duplicate),
            Err(XsdError::DuplicateComponent { .. })
        ));

        let bad_occurs = r#"
            <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
              <xs:complexType name="T">
                <xs:sequence maxOccurs="many"/>
              </xs:complexType>
            </xs:schema>"#;
        assert!(matches!(
            SchemaSet::parse(bad_occurs),
            Err(XsdError::InvalidAttributeValue { attribute, .. }) if attribute == "maxOccurs"
        ));

        let not_a_schema = r#"<root/>"#;
        assert!(matches!(
            SchemaSet::parse(not_a_schema),
            Err(XsdError::UnexpectedRoot(_))
        ));
    }

    #[test]
    fn unresolved_prefix_is_an_error() {
        let text = r#"
            <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
              <xs:element name="a" type="missing:T"/>
            </xs:schema>"#;
        assert!(matches!(
            SchemaSet::parse(text),
            Err(XsdError::NamePrefixNotResolved(prefix)) if prefix == "missing"
        ));
    }
}
