use std::collections::HashMap;
use std::fmt;

use super::builtins;
use super::component::{Component, ComponentId, ComponentKind};
use super::error::XsdError;
use super::xstypes::QName;

/// The symbol spaces in which global components are registered (pt. 1, §3.17.6.2). Simple and
/// complex type definitions share one space.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SymbolSpace {
    TypeDefinition,
    Element,
    Attribute,
    Group,
    AttributeGroup,
}

impl SymbolSpace {
    pub fn of(kind: ComponentKind) -> Option<Self> {
        match kind {
            ComponentKind::ComplexType | ComponentKind::SimpleType => Some(Self::TypeDefinition),
            ComponentKind::Element => Some(Self::Element),
            ComponentKind::Attribute => Some(Self::Attribute),
            ComponentKind::Group => Some(Self::Group),
            ComponentKind::AttributeGroup => Some(Self::AttributeGroup),
            _ => None,
        }
    }

    const fn display_name(self) -> &'static str {
        match self {
            Self::TypeDefinition => "type definition",
            Self::Element => "element declaration",
            Self::Attribute => "attribute declaration",
            Self::Group => "model group definition",
            Self::AttributeGroup => "attribute group definition",
        }
    }
}

type LookupTable = HashMap<QName, ComponentId>;

#[derive(Default)]
struct LookupTables {
    type_definitions: LookupTable,
    element_declarations: LookupTable,
    attribute_declarations: LookupTable,
    model_group_definitions: LookupTable,
    attribute_group_definitions: LookupTable,
}

impl LookupTables {
    fn table(&self, space: SymbolSpace) -> &LookupTable {
        match space {
            SymbolSpace::TypeDefinition => &self.type_definitions,
            SymbolSpace::Element => &self.element_declarations,
            SymbolSpace::Attribute => &self.attribute_declarations,
            SymbolSpace::Group => &self.model_group_definitions,
            SymbolSpace::AttributeGroup => &self.attribute_group_definitions,
        }
    }

    fn table_mut(&mut self, space: SymbolSpace) -> &mut LookupTable {
        match space {
            SymbolSpace::TypeDefinition => &mut self.type_definitions,
            SymbolSpace::Element => &mut self.element_declarations,
            SymbolSpace::Attribute => &mut self.attribute_declarations,
            SymbolSpace::Group => &mut self.model_group_definitions,
            SymbolSpace::AttributeGroup => &mut self.attribute_group_definitions,
        }
    }
}

/// The result of resolving a `type`, `base`, `itemType` or member type name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeRef {
    /// One of the built-in type definitions, by name
    Builtin(QName),
    /// A global simple or complex type definition
    Global(ComponentId),
}

/// An arena holding every component read from one or more schema documents.
///
/// This is the (already validated) schema object model the class-plan compiler works on. It is
/// mutated in place only through [`detach`](Self::detach).
#[derive(Default)]
pub struct SchemaSet {
    components: Vec<Component>,
    schemas: Vec<ComponentId>,
    lookup_tables: LookupTables,
}

impl SchemaSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Retrieves a component by reference. This function panics if the reference does not
    /// belong to this set.
    pub fn get(&self, id: ComponentId) -> &Component {
        self.components
            .get(id.index())
            .expect("Invalid component reference (out-of-bounds)")
    }

    /// Mutable access for in-place normalization. Panics like [`get`](Self::get).
    pub fn get_mut(&mut self, id: ComponentId) -> &mut Component {
        self.components
            .get_mut(id.index())
            .expect("Invalid component reference (out-of-bounds)")
    }

    /// Number of components ever created in this set, detached ones included.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Ids of all components ever created, detached ones included.
    pub fn ids(&self) -> impl Iterator<Item = ComponentId> {
        (0..self.components.len()).map(ComponentId::from_index)
    }

    /// The `<schema>` root components, in reading order.
    pub fn schemas(&self) -> &[ComponentId] {
        &self.schemas
    }

    /// Adds `component` as the last child of `parent` (or as a new schema root).
    pub(crate) fn create(
        &mut self,
        parent: Option<ComponentId>,
        mut component: Component,
    ) -> ComponentId {
        let id = ComponentId::from_index(self.components.len());
        component.parent = parent;
        let is_schema = component.kind == ComponentKind::Schema;
        self.components.push(component);
        match parent {
            Some(parent) => self.get_mut(parent).children.push(id),
            None if is_schema => self.schemas.push(id),
            None => {}
        }
        id
    }

    /// Registers a global component in its symbol space.
    pub(crate) fn register(&mut self, id: ComponentId) -> Result<(), XsdError> {
        let component = self.get(id);
        let (Some(space), Some(name)) =
            (SymbolSpace::of(component.kind), component.qualified_name())
        else {
            return Ok(());
        };
        let table = self.lookup_tables.table_mut(space);
        if table.contains_key(&name) {
            return Err(XsdError::DuplicateComponent {
                kind: space.display_name(),
                name,
            });
        }
        table.insert(name, id);
        Ok(())
    }

    /// Looks up a live global component by its qualified name.
    pub fn lookup(&self, space: SymbolSpace, name: &QName) -> Option<ComponentId> {
        self.lookup_tables.table(space).get(name).copied()
    }

    /// Resolves a type name to a built-in or a global type definition.
    pub fn resolve_type(&self, name: &QName) -> Option<TypeRef> {
        if builtins::is_builtin_name(name) {
            Some(TypeRef::Builtin(name.clone()))
        } else {
            self.lookup(SymbolSpace::TypeDefinition, name)
                .map(TypeRef::Global)
        }
    }

    /// Resolves the `ref` attribute of an element, attribute, group or attribute group
    /// reference.
    pub fn resolve_reference(&self, id: ComponentId) -> Option<ComponentId> {
        let component = self.get(id);
        let space = SymbolSpace::of(component.kind)?;
        component
            .reference
            .as_ref()
            .and_then(|name| self.lookup(space, name))
    }

    /// Whether the component is a direct child of a `<schema>`.
    pub fn is_global(&self, id: ComponentId) -> bool {
        self.get(id)
            .parent
            .is_some_and(|parent| self.get(parent).kind == ComponentKind::Schema)
    }

    /// The live global components of all schemas, in document order.
    pub fn global_components(&self) -> Vec<ComponentId> {
        self.schemas
            .iter()
            .flat_map(|schema| self.get(*schema).children.iter().copied())
            .filter(|id| !self.get(*id).detached)
            .collect()
    }

    /// Detaches a component from its parent and its symbol space. Returns `false` if it was
    /// already detached.
    pub fn detach(&mut self, id: ComponentId) -> bool {
        if self.get(id).detached {
            return false;
        }
        if self.is_global(id) {
            let component = self.get(id);
            if let (Some(space), Some(name)) =
                (SymbolSpace::of(component.kind), component.qualified_name())
            {
                let table = self.lookup_tables.table_mut(space);
                if table.get(&name) == Some(&id) {
                    table.remove(&name);
                }
            }
        }
        if let Some(parent) = self.get(id).parent {
            self.get_mut(parent).children.retain(|child| *child != id);
        }
        tracing::trace!(?id, "detached component");
        self.get_mut(id).detached = true;
        true
    }

    /// Whether neither the component nor any of its ancestors has been detached.
    pub fn is_live(&self, id: ComponentId) -> bool {
        let mut current = Some(id);
        while let Some(id) = current {
            let component = self.get(id);
            if component.detached {
                return false;
            }
            current = component.parent;
        }
        true
    }

    /// Iterates the component's ancestors, innermost first.
    pub fn ancestors(&self, id: ComponentId) -> impl Iterator<Item = ComponentId> + '_ {
        std::iter::successors(self.get(id).parent, |id| self.get(*id).parent)
    }

    /// The values of the enumeration facets of a simple type or restriction, in document
    /// order. Empty if the type is not an enumeration.
    pub fn enumeration_values(&self, id: ComponentId) -> Vec<String> {
        let component = self.get(id);
        let restriction = match component.kind {
            ComponentKind::Restriction => Some(id),
            ComponentKind::SimpleType => component
                .children
                .iter()
                .copied()
                .find(|child| self.get(*child).kind == ComponentKind::Restriction),
            _ => None,
        };
        restriction
            .map(|restriction| {
                self.get(restriction)
                    .children
                    .iter()
                    .map(|facet| self.get(*facet))
                    .filter(|facet| facet.kind == ComponentKind::Enumeration)
                    .filter_map(|facet| facet.value.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// A short human readable designation, used in diagnostics.
    pub fn describe(&self, id: ComponentId) -> String {
        ComponentDisplay { set: self, id }.to_string()
    }
}

struct ComponentDisplay<'a> {
    set: &'a SchemaSet,
    id: ComponentId,
}

impl fmt::Display for ComponentDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let component = self.set.get(self.id);
        write!(f, "{}", component.kind)?;
        if let Some(name) = component.name.as_ref() {
            write!(f, " '{name}'")?;
        } else if let Some(reference) = component.reference.as_ref() {
            write!(f, " ref='{}'", reference.local_name)?;
        }
        if let Some(global) = self
            .set
            .ancestors(self.id)
            .find(|ancestor| self.set.is_global(*ancestor))
        {
            let global = self.set.get(global);
            if let Some(name) = global.name.as_ref() {
                write!(f, " (in {} '{name}')", global.kind)?;
            }
        }
        Ok(())
    }
}
