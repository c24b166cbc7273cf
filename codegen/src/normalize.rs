//! In-place cleanup of the schema set before item trees are built.
//!
//! Removing a component can leave references dangling or compositors empty, and removing those
//! can expose more of the same, so removal customizations and normalization are repeated until a
//! pass changes nothing.

use std::collections::HashSet;

use dt_xsd::{ComponentId, ComponentKind, SchemaSet, TypeRef};

use crate::customs::{ComponentAction, ResolvedCustoms};
use crate::problems::Problems;

/// Runs removals and normalization to a fixed point. Returns the number of passes.
pub fn normalize(schema: &mut SchemaSet, customs: &ResolvedCustoms, problems: &mut Problems) -> usize {
    let mut passes = 0;
    loop {
        passes += 1;
        let mut changed = apply_removals(schema, customs);
        changed |= normalize_pass(schema, problems);
        if !customs.settings.generate_all {
            changed |= prune_unreachable(schema);
        }
        if !changed {
            break;
        }
    }
    tracing::debug!(passes, "normalized schema");
    passes
}

fn apply_removals(schema: &mut SchemaSet, customs: &ResolvedCustoms) -> bool {
    let mut changed = false;
    for id in customs.with_action(ComponentAction::Remove) {
        if schema.detach(id) {
            tracing::debug!(component = %schema.describe(id), "removed by customization");
            changed = true;
        }
    }
    changed
}

fn live_components(schema: &SchemaSet) -> Vec<ComponentId> {
    schema
        .ids()
        .filter(|id| schema.is_live(*id))
        .collect()
}

fn normalize_pass(schema: &mut SchemaSet, problems: &mut Problems) -> bool {
    let mut changed = false;
    for id in live_components(schema) {
        if !schema.is_live(id) {
            continue;
        }
        let component = schema.get(id);
        let kind = component.kind;
        // prohibited uses and empty compositors never show in instances
        let vanished = component.is_prohibited()
            || (kind.is_compositor() && component.children().is_empty());
        let dangling = if component.reference.is_some() {
            schema.resolve_reference(id).is_none()
        } else if kind.is_element_or_attribute() {
            component
                .type_name
                .as_ref()
                .is_some_and(|name| schema.resolve_type(name).is_none())
        } else {
            false
        };
        if vanished || dangling {
            if vanished {
                tracing::trace!(component = %schema.describe(id), "dropped");
            } else {
                problems.warning(
                    Some(id),
                    format!("{}: removed, its reference cannot be resolved", schema.describe(id)),
                );
            }
            schema.detach(id);
            changed = true;
            continue;
        }

        if kind == ComponentKind::Union {
            let before = schema.get(id).member_types.len();
            let members = schema
                .get(id)
                .member_types
                .iter()
                .filter(|name| schema.resolve_type(name).is_some())
                .cloned()
                .collect::<Vec<_>>();
            if members.len() != before {
                schema.get_mut(id).member_types = members;
                changed = true;
            }
        }
    }
    changed
}

/// Detaches global definitions that no global element uses, directly or indirectly.
fn prune_unreachable(schema: &mut SchemaSet) -> bool {
    let globals = schema.global_components();
    let mut reachable = HashSet::new();
    let mut stack = globals
        .iter()
        .copied()
        .filter(|id| schema.get(*id).kind == ComponentKind::Element)
        .collect::<Vec<_>>();
    while let Some(id) = stack.pop() {
        if !reachable.insert(id) {
            continue;
        }
        let component = schema.get(id);
        stack.extend(component.children().iter().copied());
        stack.extend(schema.resolve_reference(id));
        let type_names = component
            .type_name
            .iter()
            .chain(component.member_types.iter());
        for name in type_names {
            if let Some(TypeRef::Global(type_definition)) = schema.resolve_type(name) {
                stack.push(type_definition);
            }
        }
    }
    let unreachable = globals
        .into_iter()
        .filter(|id| !reachable.contains(id))
        .collect::<Vec<_>>();
    for id in &unreachable {
        tracing::debug!(component = %schema.describe(*id), "pruned unreachable definition");
        schema.detach(*id);
    }
    !unreachable.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::customs::Customizations;
    use dt_xsd::{QName, SymbolSpace};

    const SCHEMA: &str = r#"
        <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
          <xs:element name="root" type="Root"/>
          <xs:complexType name="Root">
            <xs:sequence>
              <xs:choice>
                <xs:element ref="legacy"/>
              </xs:choice>
              <xs:element name="kept" type="xs:string"/>
            </xs:sequence>
          </xs:complexType>
          <xs:element name="legacy" type="xs:string"/>
          <xs:complexType name="Unused"/>
        </xs:schema>"#;

    fn resolve(schema: &SchemaSet, toml: &str) -> ResolvedCustoms {
        let customs = Customizations::from_toml(toml).unwrap();
        ResolvedCustoms::resolve(&customs, schema, &mut Problems::new())
    }

    #[test]
    fn removal_cascades_to_a_fixed_point() {
        let mut schema = SchemaSet::parse(SCHEMA).unwrap();
        let customs = resolve(
            &schema,
            r#"
            [[component]]
            kind = "element"
            name = "legacy"
            action = "remove"
            "#,
        );
        let mut problems = Problems::new();
        let passes = normalize(&mut schema, &customs, &mut problems);
        assert!(passes >= 2);

        let root_type = schema
            .lookup(SymbolSpace::TypeDefinition, &QName::unqualified_name("Root"))
            .unwrap();
        let sequence = schema.get(root_type).children()[0];
        // the reference went first, then the choice it left empty
        let remaining = schema.get(sequence).children();
        assert_eq!(remaining.len(), 1);
        assert_eq!(schema.get(remaining[0]).name.as_deref(), Some("kept"));
        // only the dangling reference is reported
        assert_eq!(problems.len(), 1);
    }

    #[test]
    fn prohibited_components_are_dropped_silently() {
        let mut schema = SchemaSet::parse(
            r#"
            <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
              <xs:complexType name="T">
                <xs:sequence>
                  <xs:element name="gone" type="xs:string" minOccurs="0" maxOccurs="0"/>
                </xs:sequence>
                <xs:attribute name="legacy" type="xs:int" use="prohibited"/>
                <xs:attribute name="id" type="xs:int"/>
              </xs:complexType>
            </xs:schema>"#,
        )
        .unwrap();
        let customs = resolve(&schema, "");
        let mut problems = Problems::new();
        normalize(&mut schema, &customs, &mut problems);
        assert!(problems.is_empty());

        let t = schema
            .lookup(SymbolSpace::TypeDefinition, &QName::unqualified_name("T"))
            .unwrap();
        // the sequence went along with its only particle
        let [id] = schema.get(t).children() else {
            panic!("expected the remaining attribute")
        };
        assert_eq!(schema.get(*id).name.as_deref(), Some("id"));
    }

    #[test]
    fn prunes_unreachable_definitions_when_asked() {
        let mut schema = SchemaSet::parse(SCHEMA).unwrap();
        let customs = resolve(&schema, "[global]\ngenerate-all = false");
        normalize(&mut schema, &customs, &mut Problems::new());
        assert!(schema
            .lookup(SymbolSpace::TypeDefinition, &QName::unqualified_name("Unused"))
            .is_none());
        assert!(schema
            .lookup(SymbolSpace::TypeDefinition, &QName::unqualified_name("Root"))
            .is_some());

        let mut schema = SchemaSet::parse(SCHEMA).unwrap();
        let customs = resolve(&schema, "");
        assert_eq!(normalize(&mut schema, &customs, &mut Problems::new()), 1);
        assert_eq!(schema.global_components().len(), 4);
    }
}
