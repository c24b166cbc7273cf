//! Customizations: user settings that steer the compiler, read from a TOML file.
//!
//! ```toml
//! [global]
//! repeated-type = "list"
//! prefer-inline = true
//!
//! [global.lead-rewrites]
//! "http://legacy.example.org/" = "org.example.legacy/"
//!
//! [[component]]
//! kind = "complexType"
//! name = "Address"
//! action = "separate"
//! class-name = "PostalAddress"
//!
//! [[component]]
//! kind = "element"
//! name = "order"
//! path = "shipTo/street"
//! base-name = "streetLine"
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};

use dt_xsd::{ComponentId, ComponentKind, SchemaSet};

use crate::error::CustomsError;
use crate::problems::Problems;

/// How repeated values are represented in the generated code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CollectionStyle {
    /// Boxed slices
    Array,
    /// Growable vectors
    #[default]
    List,
    /// Growable vectors with an element type constraint
    TypedList,
}

/// What to do with wildcard (`<any>`, `<anyAttribute>`) content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnyHandling {
    /// Ignore wildcard content entirely
    #[default]
    Discard,
    /// Keep wildcard content as untyped document nodes
    Dom,
    /// Keep wildcard content as instances of other generated classes
    Mapped,
}

/// Per-component actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComponentAction {
    /// Detach the component from the schema before compilation
    Remove,
    /// Never inline: always generate a class
    Separate,
    /// Always inline (reported as a problem where that is impossible)
    Inline,
    /// Inline a definition if it is used exactly once
    PreferInline,
    /// Inline a nested group even where it would otherwise get a class of its own
    PushInline,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct GlobalSettings {
    pub repeated_type: CollectionStyle,
    pub any_handling: AnyHandling,
    pub prefer_inline: bool,
    /// Add a selector to choices with more than one alternative
    pub check_choices: bool,
    /// Add a selector to unions with more than one member
    pub check_unions: bool,
    /// Generate every global definition, not only the ones reachable from global elements
    pub generate_all: bool,
    /// Fixed package for every class; derived from the target namespace if empty
    pub package: String,
    pub no_namespace_package: String,
    /// Host name prefixes dropped when deriving packages
    pub strip_prefixes: Vec<String>,
    /// Namespace URI leads replaced before deriving packages; the longest match wins
    pub lead_rewrites: BTreeMap<String, String>,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            repeated_type: CollectionStyle::default(),
            any_handling: AnyHandling::default(),
            prefer_inline: false,
            check_choices: true,
            check_unions: true,
            generate_all: true,
            package: String::new(),
            no_namespace_package: "nonamespace".to_string(),
            strip_prefixes: vec!["www.".to_string()],
            lead_rewrites: BTreeMap::new(),
        }
    }
}

/// Customization of one component, selected by global kind, name and an optional path of
/// local element or attribute names below it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ComponentCustom {
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub action: Option<ComponentAction>,
    #[serde(default)]
    pub class_name: Option<String>,
    #[serde(default)]
    pub base_name: Option<String>,
    /// Bind the definition to a type that already exists instead of generating one
    #[serde(default)]
    pub existing_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customizations {
    #[serde(default)]
    pub global: GlobalSettings,
    #[serde(default, rename = "component")]
    pub components: Vec<ComponentCustom>,
}

impl Customizations {
    pub fn from_toml(text: &str) -> Result<Self, CustomsError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, CustomsError> {
        let text = std::fs::read_to_string(path).map_err(|source| CustomsError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&text)
    }
}

/// Customizations with their selectors resolved against a schema set.
#[derive(Debug, Clone, Default)]
pub struct ResolvedCustoms {
    pub settings: GlobalSettings,
    components: HashMap<ComponentId, ComponentCustom>,
}

impl ResolvedCustoms {
    pub fn resolve(customs: &Customizations, schema: &SchemaSet, problems: &mut Problems) -> Self {
        let mut components = HashMap::new();
        for custom in &customs.components {
            let Some(id) = select(custom, schema) else {
                problems.warning(
                    None,
                    format!(
                        "customization for {} '{}'{} matches no component",
                        custom.kind,
                        custom.name,
                        custom
                            .path
                            .as_ref()
                            .map(|path| format!(" at '{path}'"))
                            .unwrap_or_default()
                    ),
                );
                continue;
            };
            if custom.existing_type.is_some() && custom.class_name.is_some() {
                problems.error(
                    Some(id),
                    format!(
                        "{}: 'existing-type' and 'class-name' cannot be combined",
                        schema.describe(id)
                    ),
                );
                continue;
            }
            if components.insert(id, custom.clone()).is_some() {
                problems.warning(
                    Some(id),
                    format!("{}: customized more than once", schema.describe(id)),
                );
            }
        }
        tracing::debug!(count = components.len(), "resolved component customizations");
        Self {
            settings: customs.global.clone(),
            components,
        }
    }

    pub fn get(&self, id: ComponentId) -> Option<&ComponentCustom> {
        self.components.get(&id)
    }

    pub fn action(&self, id: ComponentId) -> Option<ComponentAction> {
        self.get(id).and_then(|custom| custom.action)
    }

    pub fn has_action(&self, id: ComponentId, action: ComponentAction) -> bool {
        self.action(id) == Some(action)
    }

    pub fn existing_type(&self, id: ComponentId) -> Option<&str> {
        self.get(id).and_then(|custom| custom.existing_type.as_deref())
    }

    /// Components customized with `action`.
    pub fn with_action(&self, action: ComponentAction) -> Vec<ComponentId> {
        let mut ids = self
            .components
            .iter()
            .filter(|(_, custom)| custom.action == Some(action))
            .map(|(id, _)| *id)
            .collect::<Vec<_>>();
        ids.sort();
        ids
    }
}

fn select(custom: &ComponentCustom, schema: &SchemaSet) -> Option<ComponentId> {
    let kind = ComponentKind::from_tag_name(&custom.kind)?;
    let global = schema.global_components().into_iter().find(|id| {
        let component = schema.get(*id);
        component.kind == kind && component.name.as_deref() == Some(custom.name.as_str())
    })?;
    let Some(path) = custom.path.as_deref() else {
        return Some(global);
    };
    path.split('/')
        .filter(|step| !step.is_empty())
        .try_fold(global, |current, step| find_local(schema, current, step))
}

/// The first element or attribute named `name` below `id`, in document order.
fn find_local(schema: &SchemaSet, id: ComponentId, name: &str) -> Option<ComponentId> {
    for child in schema.get(id).children() {
        let component = schema.get(*child);
        if component.kind.is_element_or_attribute() && component.name.as_deref() == Some(name) {
            return Some(*child);
        }
        if let Some(found) = find_local(schema, *child, name) {
            return Some(found);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problems::Severity;

    const SCHEMA: &str = r#"
        <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
          <xs:element name="order">
            <xs:complexType>
              <xs:sequence>
                <xs:element name="shipTo">
                  <xs:complexType>
                    <xs:attribute name="street" type="xs:string"/>
                  </xs:complexType>
                </xs:element>
              </xs:sequence>
            </xs:complexType>
          </xs:element>
          <xs:complexType name="Address"/>
        </xs:schema>"#;

    #[test]
    fn parses_defaults_and_overrides() {
        let customs = Customizations::from_toml("").unwrap();
        assert_eq!(customs.global, GlobalSettings::default());
        assert!(customs.global.check_choices);
        assert_eq!(customs.global.no_namespace_package, "nonamespace");

        let customs = Customizations::from_toml(
            r#"
            [global]
            repeated-type = "typed-list"
            any-handling = "dom"
            prefer-inline = true

            [[component]]
            kind = "complexType"
            name = "Address"
            action = "push-inline"
            "#,
        )
        .unwrap();
        assert_eq!(customs.global.repeated_type, CollectionStyle::TypedList);
        assert_eq!(customs.global.any_handling, AnyHandling::Dom);
        assert!(customs.global.prefer_inline);
        assert_eq!(
            customs.components[0].action,
            Some(ComponentAction::PushInline)
        );

        assert!(Customizations::from_toml("[global]\nrepeated-type = \"set\"").is_err());
    }

    #[test]
    fn resolves_paths_and_reports_misses() {
        let schema = SchemaSet::parse(SCHEMA).unwrap();
        let customs = Customizations::from_toml(
            r#"
            [[component]]
            kind = "element"
            name = "order"
            path = "shipTo/street"
            base-name = "line"

            [[component]]
            kind = "complexType"
            name = "Missing"
            action = "remove"

            [[component]]
            kind = "complexType"
            name = "Address"
            class-name = "PostalAddress"
            existing-type = "crate::Address"
            "#,
        )
        .unwrap();
        let mut problems = Problems::new();
        let resolved = ResolvedCustoms::resolve(&customs, &schema, &mut problems);

        let street = resolved
            .components
            .iter()
            .find(|(_, custom)| custom.base_name.as_deref() == Some("line"))
            .map(|(id, _)| *id)
            .unwrap();
        assert_eq!(schema.get(street).name.as_deref(), Some("street"));
        assert_eq!(schema.get(street).kind, ComponentKind::Attribute);

        let severities = problems.iter().map(|p| p.severity).collect::<Vec<_>>();
        assert_eq!(severities, [Severity::Warning, Severity::Error]);
        assert_eq!(resolved.components.len(), 1);
    }
}
