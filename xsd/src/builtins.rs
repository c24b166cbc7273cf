use std::collections::HashSet;

use lazy_static::lazy_static;

use super::xstypes::QName;

// XML Schema namespace (pt. 1, §1.3.1)
pub const XS_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

/// Local names of the built-in type definitions (pt. 2, §3 and §4.1.6), including the special
/// `anyType`, `anySimpleType` and `anyAtomicType` definitions.
pub const BUILTIN_TYPE_NAMES: &[&str] = &[
    "anyType",
    "anySimpleType",
    "anyAtomicType",
    "error",
    "string",
    "boolean",
    "decimal",
    "float",
    "double",
    "duration",
    "dateTime",
    "time",
    "date",
    "gYearMonth",
    "gYear",
    "gMonthDay",
    "gDay",
    "gMonth",
    "hexBinary",
    "base64Binary",
    "anyURI",
    "QName",
    "NOTATION",
    "normalizedString",
    "token",
    "language",
    "NMTOKEN",
    "NMTOKENS",
    "Name",
    "NCName",
    "ID",
    "IDREF",
    "IDREFS",
    "ENTITY",
    "ENTITIES",
    "integer",
    "nonPositiveInteger",
    "negativeInteger",
    "long",
    "int",
    "short",
    "byte",
    "nonNegativeInteger",
    "unsignedLong",
    "unsignedInt",
    "unsignedShort",
    "unsignedByte",
    "positiveInteger",
    "yearMonthDuration",
    "dayTimeDuration",
    "dateTimeStamp",
];

lazy_static! {
    static ref BUILTIN_TYPES: HashSet<&'static str> = BUILTIN_TYPE_NAMES.iter().copied().collect();

    /// The `xs:anyType` qualified name
    pub static ref XS_ANY_TYPE_NAME: QName = QName::with_namespace(XS_NAMESPACE, "anyType");
}

/// Whether `name` refers to one of the built-in type definitions.
pub fn is_builtin_name(name: &QName) -> bool {
    name.namespace_name.as_deref() == Some(XS_NAMESPACE)
        && BUILTIN_TYPES.contains(name.local_name.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_builtin_names_only_in_xs_namespace() {
        assert!(is_builtin_name(&QName::with_namespace(XS_NAMESPACE, "int")));
        assert!(is_builtin_name(&XS_ANY_TYPE_NAME));
        assert!(!is_builtin_name(&QName::with_namespace(
            "urn:example",
            "int"
        )));
        assert!(!is_builtin_name(&QName::unqualified_name("string")));
        assert!(!is_builtin_name(&QName::with_namespace(XS_NAMESPACE, "float64")));
    }
}
