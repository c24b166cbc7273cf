//! The class-generation plan: every class to generate (or reuse), where it lives, and the
//! classification tree of its content.

use std::fmt;

use dt_xsd::{ComponentId, ComponentKind, QName, SchemaSet};

use crate::customs::{CollectionStyle, ResolvedCustoms};
use crate::data::{DataBuilder, DataNode, LeafNode, LeafValue, ParentNode};
use crate::error::CodegenError;
use crate::item::{ContentFlags, ItemId, ItemKind, ItemTree};
use crate::names::{NameConverter, NameSet};
use crate::packages::{PackageMapper, PackageSet};
use crate::problems::Problems;
use crate::values::ScalarType;

/// Index of a class in [`ClassPlan::classes`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(pub(crate) usize);

impl ClassId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Where a class lives. `generated` is false for customized existing types, which are only
/// referenced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassHandle {
    pub name: String,
    pub package: String,
    pub generated: bool,
}

impl ClassHandle {
    pub fn full_name(&self) -> String {
        if self.package.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.package, self.name)
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnumValue {
    pub constant: String,
    pub value: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClassKind {
    Structure,
    Enumeration(Vec<EnumValue>),
}

#[derive(Clone, Debug)]
pub struct GeneratedClass {
    pub handle: ClassHandle,
    /// The definition or nested group item the class is built from
    pub item: ItemId,
    pub component: ComponentId,
    pub kind: ClassKind,
    pub flags: ContentFlags,
    pub documentation: Option<String>,
    /// Content tree; `None` for existing types
    pub data: Option<ParentNode>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BindingTarget {
    Class(ClassId),
    Value(ScalarType),
    Wildcard,
    Empty,
}

/// What a global element maps to when it is the document root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RootBinding {
    pub element: QName,
    pub target: BindingTarget,
}

#[derive(Debug)]
pub struct ClassPlan {
    pub items: ItemTree,
    pub classes: Vec<GeneratedClass>,
    pub roots: Vec<RootBinding>,
    pub problems: Problems,
    pub collection_style: CollectionStyle,
}

impl ClassPlan {
    pub fn class(&self, id: ClassId) -> &GeneratedClass {
        &self.classes[id.index()]
    }

    /// Classes that are generated, in creation order.
    pub fn generated(&self) -> impl Iterator<Item = (ClassId, &GeneratedClass)> {
        self.classes
            .iter()
            .enumerate()
            .filter(|(_, class)| class.handle.generated)
            .map(|(index, class)| (ClassId(index), class))
    }

    /// Finds a class by its simple name.
    pub fn find(&self, name: &str) -> Option<&GeneratedClass> {
        self.classes.iter().find(|class| class.handle.name == name)
    }

    pub fn root(&self, local_name: &str) -> Option<&RootBinding> {
        self.roots
            .iter()
            .find(|root| root.element.local_name == local_name)
    }

    /// The type a leaf is declared with, for diagnostics and listings.
    pub fn value_label(&self, value: &LeafValue) -> String {
        match value {
            LeafValue::Scalar(scalar) => scalar.to_string(),
            LeafValue::Class(id) => self.class(*id).handle.full_name(),
            LeafValue::Flag => "bool".to_string(),
            LeafValue::Dom => "dom".to_string(),
            LeafValue::Mapped => "mapped".to_string(),
            LeafValue::Ignored => "ignored".to_string(),
        }
    }
}

/// Places classes into packages and builds their content trees.
pub struct PlanBuilder<'a> {
    schema: &'a SchemaSet,
    customs: &'a ResolvedCustoms,
    converter: &'a dyn NameConverter,
    tree: ItemTree,
    problems: Problems,
}

impl<'a> PlanBuilder<'a> {
    pub fn new(
        schema: &'a SchemaSet,
        customs: &'a ResolvedCustoms,
        converter: &'a dyn NameConverter,
        tree: ItemTree,
        problems: Problems,
    ) -> Self {
        Self {
            schema,
            customs,
            converter,
            tree,
            problems,
        }
    }

    pub fn build(mut self) -> Result<ClassPlan, CodegenError> {
        let mut classes = self.place_classes()?;
        for class in classes.iter_mut().filter(|class| class.handle.generated) {
            let mut builder = DataBuilder::new(
                self.schema,
                self.customs,
                self.converter,
                &self.tree,
                &mut self.problems,
            );
            class.data = Some(builder.build_class(class.item)?);
        }
        let roots = self.root_bindings();
        tracing::info!(
            classes = classes.len(),
            roots = roots.len(),
            problems = self.problems.len(),
            "built class plan"
        );
        Ok(ClassPlan {
            items: self.tree,
            classes,
            roots,
            problems: self.problems,
            collection_style: self.customs.settings.repeated_type,
        })
    }

    /// Creates a class for every non-inline definition and every non-inline group nested in
    /// one. Inline definitions are never generated on their own; those of global elements stay
    /// in use as document roots and must not hold anything that needs a class.
    fn place_classes(&mut self) -> Result<Vec<GeneratedClass>, CodegenError> {
        let settings = &self.customs.settings;
        let mut mapper = PackageMapper::new(settings);
        let mut packages = PackageSet::new();
        let mut classes = Vec::new();

        for definition in self.tree.definitions().to_vec() {
            if self.tree.get(definition).is_inline() {
                let component = self.tree.get(definition).component;
                if self.schema.get(component).kind == ComponentKind::Element
                    && self.schema.is_global(component)
                {
                    if let Some(item) = self.tree.subtree(definition).into_iter().find(|item| {
                        matches!(self.tree.get(*item).kind, ItemKind::Group(ref group) if !group.inline)
                    }) {
                        return Err(CodegenError::UnplacedGroup { item });
                    }
                }
                continue;
            }
            for item in self.tree.subtree(definition) {
                let Some(group) = self.tree.group(item) else {
                    continue;
                };
                if group.inline {
                    continue;
                }
                let component = self.tree.get(item).component;
                let flags = group.flags;
                let existing = (item == definition)
                    .then(|| self.customs.existing_type(component))
                    .flatten();
                let handle = match existing {
                    Some(existing) => ClassHandle {
                        name: existing.to_string(),
                        package: String::new(),
                        generated: false,
                    },
                    None => {
                        let package = if settings.package.is_empty() {
                            mapper.package_for(
                                self.schema.get(component).target_namespace.as_deref(),
                            )
                        } else {
                            settings.package.clone()
                        };
                        let requested = group.class_name.as_deref().unwrap_or("Anonymous");
                        ClassHandle {
                            name: packages.allocate(&package, requested),
                            package,
                            generated: true,
                        }
                    }
                };
                let kind = if group.enumeration {
                    ClassKind::Enumeration(self.enum_values(component))
                } else {
                    ClassKind::Structure
                };
                let id = ClassId(classes.len());
                if let Some(group) = self.tree.group_mut(item) {
                    group.class = Some(id);
                }
                tracing::debug!(class = %handle.full_name(), ?item, "placed class");
                classes.push(GeneratedClass {
                    handle,
                    item,
                    component,
                    kind,
                    flags,
                    documentation: self.schema.get(component).documentation_text(),
                    data: None,
                });
            }
        }
        tracing::debug!(
            packages = ?packages.packages().collect::<Vec<_>>(),
            "placed classes"
        );
        Ok(classes)
    }

    fn enum_values(&self, component: ComponentId) -> Vec<EnumValue> {
        let mut constants = NameSet::new();
        self.schema
            .enumeration_values(component)
            .into_iter()
            .map(|value| {
                let base = self.converter.to_base_name(&value);
                EnumValue {
                    constant: constants.add(&self.converter.to_constant_name(&base)),
                    value,
                }
            })
            .collect()
    }

    fn root_bindings(&mut self) -> Vec<RootBinding> {
        let mut roots = Vec::new();
        for definition in self.tree.definitions().to_vec() {
            let component = self.tree.get(definition).component;
            let declaration = self.schema.get(component);
            if declaration.kind != ComponentKind::Element || !self.schema.is_global(component) {
                continue;
            }
            let Some(element) = declaration.qualified_name() else {
                continue;
            };
            let target = self.binding_target(definition);
            if target == BindingTarget::Empty && !self.tree.children(definition).is_empty() {
                self.problems.warning(
                    Some(component),
                    format!(
                        "{} is inlined with structured content and cannot be a document root",
                        self.schema.describe(component)
                    ),
                );
            }
            roots.push(RootBinding { element, target });
        }
        roots
    }

    /// Follows single-child chains from an element definition to the class or value it binds.
    fn binding_target(&self, definition: ItemId) -> BindingTarget {
        let mut current = definition;
        loop {
            let item = self.tree.get(current);
            if let Some(class) = item.group().and_then(|group| group.class) {
                return BindingTarget::Class(class);
            }
            match &item.kind {
                ItemKind::Reference { definition } => {
                    return self
                        .tree
                        .group(*definition)
                        .and_then(|group| group.class)
                        .map_or(BindingTarget::Empty, BindingTarget::Class);
                }
                ItemKind::Value { scalar } => return BindingTarget::Value(scalar.clone()),
                ItemKind::Any { .. } => return BindingTarget::Wildcard,
                ItemKind::Group(_) | ItemKind::Definition(_) => match item.children() {
                    [only] => current = *only,
                    _ => return BindingTarget::Empty,
                },
            }
        }
    }
}

impl fmt::Display for ClassPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (_, class) in self.generated() {
            match &class.kind {
                ClassKind::Enumeration(values) => {
                    writeln!(f, "enum {}", class.handle.full_name())?;
                    for value in values {
                        writeln!(f, "  {} = {:?}", value.constant, value.value)?;
                    }
                }
                ClassKind::Structure => {
                    writeln!(f, "class {}", class.handle.full_name())?;
                    if let Some(data) = &class.data {
                        for child in &data.children {
                            self.fmt_node(f, child, 1)?;
                        }
                        for selector in data.selectors() {
                            let constants = selector
                                .constants
                                .iter()
                                .map(|constant| format!("{}={}", constant.name, constant.value))
                                .collect::<Vec<_>>();
                            writeln!(
                                f,
                                "  selector {}: {}",
                                selector.property.field_name,
                                constants.join(", ")
                            )?;
                        }
                    }
                }
            }
        }
        for root in &self.roots {
            let target = match &root.target {
                BindingTarget::Class(id) => self.class(*id).handle.full_name(),
                BindingTarget::Value(scalar) => scalar.to_string(),
                BindingTarget::Wildcard => "any".to_string(),
                BindingTarget::Empty => "empty".to_string(),
            };
            writeln!(f, "root {} -> {target}", root.element.local_name)?;
        }
        for problem in self.problems.iter() {
            writeln!(f, "{problem}")?;
        }
        Ok(())
    }
}

impl ClassPlan {
    fn fmt_node(&self, f: &mut fmt::Formatter<'_>, node: &DataNode, depth: usize) -> fmt::Result {
        let indent = "  ".repeat(depth);
        match node {
            DataNode::Parent(parent) => {
                write!(f, "{indent}{}", parent.compositor)?;
                if let Some(name) = &parent.name {
                    write!(f, " {name}")?;
                }
                writeln!(f, "{}", modifiers(parent.optional, parent.collection, false))?;
                for child in &parent.children {
                    self.fmt_node(f, child, depth + 1)?;
                }
                Ok(())
            }
            DataNode::Leaf(leaf) => self.fmt_leaf(f, leaf, &indent),
        }
    }

    fn fmt_leaf(&self, f: &mut fmt::Formatter<'_>, leaf: &LeafNode, indent: &str) -> fmt::Result {
        let name = leaf
            .property
            .as_ref()
            .map_or("-", |property| property.field_name.as_str());
        writeln!(
            f,
            "{indent}{name}: {}{}",
            self.value_label(&leaf.value),
            modifiers(leaf.optional, leaf.collection, leaf.nillable)
        )
    }
}

fn modifiers(optional: bool, collection: bool, nillable: bool) -> String {
    let mut modifiers = Vec::new();
    if optional {
        modifiers.push("optional");
    }
    if collection {
        modifiers.push("collection");
    }
    if nillable {
        modifiers.push("nillable");
    }
    if modifiers.is_empty() {
        String::new()
    } else {
        format!(" [{}]", modifiers.join(", "))
    }
}
