use std::fmt;
use std::num::{NonZeroU32, NonZeroUsize};

use super::xstypes::{AnyURI, NCName, QName, Sequence};

/// A reference to a [`Component`] stored in a [`SchemaSet`](crate::SchemaSet).
///
/// Ids are never reused within one set, so an id stays valid (though possibly detached) for the
/// lifetime of the set.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(NonZeroU32);

impl ComponentId {
    pub(crate) fn from_index(index: usize) -> Self {
        // We use the size for the ID, which is non-zero after the push
        let size = NonZeroUsize::new(index + 1).expect("index + 1 is never zero");
        let id: NonZeroU32 = size.try_into().expect("ID did not fit into 32-bit integer");
        Self(id)
    }

    pub fn index(self) -> usize {
        let size: NonZeroUsize = self
            .0
            .try_into()
            .expect("Could not convert component reference to usize index");
        usize::from(size) - 1
    }
}

impl fmt::Debug for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "<Component #{}>", self.0)
    }
}

/// The kind tag of a schema component, one per XSD construct that the class-plan compiler
/// distinguishes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    Schema,
    Element,
    Attribute,
    Group,
    AttributeGroup,
    Sequence,
    Choice,
    All,
    ComplexType,
    SimpleType,
    SimpleContent,
    ComplexContent,
    Extension,
    Restriction,
    Union,
    List,
    Enumeration,
    Any,
    AnyAttribute,
}

impl ComponentKind {
    pub fn from_tag_name(name: &str) -> Option<Self> {
        Some(match name {
            "schema" => Self::Schema,
            "element" => Self::Element,
            "attribute" => Self::Attribute,
            "group" => Self::Group,
            "attributeGroup" => Self::AttributeGroup,
            "sequence" => Self::Sequence,
            "choice" => Self::Choice,
            "all" => Self::All,
            "complexType" => Self::ComplexType,
            "simpleType" => Self::SimpleType,
            "simpleContent" => Self::SimpleContent,
            "complexContent" => Self::ComplexContent,
            "extension" => Self::Extension,
            "restriction" => Self::Restriction,
            "union" => Self::Union,
            "list" => Self::List,
            "enumeration" => Self::Enumeration,
            "any" => Self::Any,
            "anyAttribute" => Self::AnyAttribute,
            _ => return None,
        })
    }

    pub const fn tag_name(self) -> &'static str {
        match self {
            Self::Schema => "schema",
            Self::Element => "element",
            Self::Attribute => "attribute",
            Self::Group => "group",
            Self::AttributeGroup => "attributeGroup",
            Self::Sequence => "sequence",
            Self::Choice => "choice",
            Self::All => "all",
            Self::ComplexType => "complexType",
            Self::SimpleType => "simpleType",
            Self::SimpleContent => "simpleContent",
            Self::ComplexContent => "complexContent",
            Self::Extension => "extension",
            Self::Restriction => "restriction",
            Self::Union => "union",
            Self::List => "list",
            Self::Enumeration => "enumeration",
            Self::Any => "any",
            Self::AnyAttribute => "anyAttribute",
        }
    }

    /// `sequence`, `choice` or `all`
    pub const fn is_compositor(self) -> bool {
        matches!(self, Self::Sequence | Self::Choice | Self::All)
    }

    /// Components that carry an XML name of their own when used in an instance document.
    pub const fn is_element_or_attribute(self) -> bool {
        matches!(self, Self::Element | Self::Attribute)
    }

    pub const fn is_type_definition(self) -> bool {
        matches!(self, Self::ComplexType | Self::SimpleType)
    }

    pub const fn is_derivation(self) -> bool {
        matches!(self, Self::Extension | Self::Restriction)
    }

    pub const fn is_wildcard(self) -> bool {
        matches!(self, Self::Any | Self::AnyAttribute)
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag_name())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MaxOccurs {
    Unbounded,
    Count(u64),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AttributeUse {
    Optional,
    Required,
    Prohibited,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ProcessContents {
    Skip,
    Strict,
    Lax,
}

/// One node of the schema object model.
///
/// All components share this one shape; which properties are meaningful depends on the
/// [`kind`](Self::kind). Children are kept in document order.
#[derive(Clone, Debug)]
pub struct Component {
    pub kind: ComponentKind,
    pub(crate) parent: Option<ComponentId>,
    pub(crate) children: Sequence<ComponentId>,
    /// The `name` attribute
    pub name: Option<NCName>,
    /// The `targetNamespace` of the schema document this component was read from
    pub target_namespace: Option<AnyURI>,
    /// The `ref` attribute of element, attribute, group and attributeGroup references
    pub reference: Option<QName>,
    /// The `type` attribute, the `base` of a derivation, or the `itemType` of a list
    pub type_name: Option<QName>,
    /// The `memberTypes` of a union
    pub member_types: Sequence<QName>,
    pub min_occurs: u64,
    pub max_occurs: MaxOccurs,
    pub use_: AttributeUse,
    pub nillable: bool,
    pub abstract_: bool,
    pub mixed: bool,
    /// The `value` of a facet
    pub value: Option<String>,
    pub process_contents: ProcessContents,
    /// Text of the `<documentation>` children of this component's `<annotation>`
    pub documentation: Sequence<String>,
    pub(crate) detached: bool,
}

impl Component {
    pub fn new(kind: ComponentKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Sequence::new(),
            name: None,
            target_namespace: None,
            reference: None,
            type_name: None,
            member_types: Sequence::new(),
            min_occurs: 1,
            max_occurs: MaxOccurs::Count(1),
            use_: AttributeUse::Optional,
            nillable: false,
            abstract_: false,
            mixed: false,
            value: None,
            process_contents: ProcessContents::Strict,
            documentation: Sequence::new(),
            detached: false,
        }
    }

    pub fn parent(&self) -> Option<ComponentId> {
        self.parent
    }

    pub fn children(&self) -> &[ComponentId] {
        &self.children
    }

    /// Whether this component may be absent in an instance: `minOccurs="0"` on particles, or
    /// an attribute that is not `use="required"`.
    pub fn is_optional(&self) -> bool {
        match self.kind {
            ComponentKind::Attribute | ComponentKind::AnyAttribute => {
                self.use_ != AttributeUse::Required
            }
            _ => self.min_occurs == 0,
        }
    }

    /// Whether this component may occur more than once.
    pub fn is_repeated(&self) -> bool {
        match self.kind {
            ComponentKind::List => true,
            _ => !matches!(self.max_occurs, MaxOccurs::Count(0 | 1)),
        }
    }

    /// `use="prohibited"` attributes and `maxOccurs="0"` particles never appear in instances.
    pub fn is_prohibited(&self) -> bool {
        self.use_ == AttributeUse::Prohibited || self.max_occurs == MaxOccurs::Count(0)
    }

    /// The qualified name this component is registered under, if it is named.
    pub fn qualified_name(&self) -> Option<QName> {
        self.name
            .as_ref()
            .map(|name| QName::with_optional_namespace(self.target_namespace.as_ref(), name))
    }

    pub fn documentation_text(&self) -> Option<String> {
        if self.documentation.is_empty() {
            None
        } else {
            Some(self.documentation.join("\n"))
        }
    }
}
