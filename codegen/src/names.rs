//! Name conversion from XML names to identifiers, and per-scope uniqueness.

use std::collections::HashSet;

use heck::{ToLowerCamelCase, ToPascalCase, ToShoutySnakeCase, ToSnakeCase};

/// Converts XML names into the identifier forms used by the generated code.
///
/// Base names are the language-neutral form every other name is derived from: a property's
/// field, accessor and selector constant names all start out from its base name.
pub trait NameConverter {
    /// `purchase-order` → `purchaseOrder`
    fn to_base_name(&self, xml_name: &str) -> String;
    /// `purchase-order` → `PurchaseOrder`
    fn to_class_name(&self, xml_name: &str) -> String;
    /// `purchaseOrder` → `purchase_order`
    fn to_field_name(&self, base_name: &str) -> String;
    /// `purchaseOrder` → `PURCHASE_ORDER`
    fn to_constant_name(&self, base_name: &str) -> String;
    fn pluralize(&self, base_name: &str) -> String;
    fn depluralize(&self, base_name: &str) -> String;

    /// Joins a lead-in prefix (already in base form) with a name.
    fn lead_in(&self, prefix: &str, base_name: &str) -> String {
        self.to_base_name(&format!("{prefix}_{base_name}"))
    }
}

#[derive(Debug, Default, Copy, Clone)]
pub struct DefaultNameConverter;

/// Replaces characters that cannot appear in identifiers and keeps the result a valid
/// identifier start.
fn sanitize(name: String, fallback: &str) -> String {
    let name = name.replace(|c: char| !c.is_ascii_alphanumeric() && c != '_', "");
    match name.chars().next() {
        None => fallback.to_string(),
        Some(first) if first.is_ascii_digit() => format!("_{name}"),
        Some(_) => name,
    }
}

impl NameConverter for DefaultNameConverter {
    fn to_base_name(&self, xml_name: &str) -> String {
        sanitize(xml_name.to_lower_camel_case(), "value")
    }

    fn to_class_name(&self, xml_name: &str) -> String {
        sanitize(xml_name.to_pascal_case(), "Value")
    }

    fn to_field_name(&self, base_name: &str) -> String {
        sanitize(base_name.to_snake_case(), "value")
    }

    fn to_constant_name(&self, base_name: &str) -> String {
        sanitize(base_name.to_shouty_snake_case(), "VALUE")
    }

    fn pluralize(&self, base_name: &str) -> String {
        let lower = base_name.to_ascii_lowercase();
        if lower.ends_with(['s', 'x', 'z'])
            || lower.ends_with("ch")
            || lower.ends_with("sh")
        {
            format!("{base_name}es")
        } else if lower.ends_with('y')
            && !["ay", "ey", "iy", "oy", "uy"]
                .iter()
                .any(|suffix| lower.ends_with(suffix))
        {
            format!("{}ies", &base_name[..base_name.len() - 1])
        } else {
            format!("{base_name}s")
        }
    }

    fn depluralize(&self, base_name: &str) -> String {
        let lower = base_name.to_ascii_lowercase();
        let strip = |suffix: usize| base_name[..base_name.len() - suffix].to_string();
        if lower.ends_with("ies") && base_name.len() > 3 {
            format!("{}y", strip(3))
        } else if ["sses", "xes", "zes", "ches", "shes"]
            .iter()
            .any(|suffix| lower.ends_with(suffix))
        {
            strip(2)
        } else if lower.ends_with('s') && !lower.ends_with("ss") && base_name.len() > 1 {
            strip(1)
        } else {
            base_name.to_string()
        }
    }
}

/// A set of names that have been handed out within one scope (a class, a package). Colliding
/// requests get a numeric suffix.
#[derive(Debug, Default, Clone)]
pub struct NameSet {
    used: HashSet<String>,
}

impl NameSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.used.contains(name)
    }

    /// Reserves `name`, or the first free `name1`, `name2`, ... and returns what was reserved.
    pub fn add(&mut self, name: &str) -> String {
        if self.used.insert(name.to_string()) {
            return name.to_string();
        }
        let unique = (1..)
            .map(|suffix| format!("{name}{suffix}"))
            .find(|candidate| !self.used.contains(candidate))
            .unwrap_or_default();
        self.used.insert(unique.clone());
        unique
    }
}
