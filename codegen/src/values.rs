//! Mapping of built-in schema types onto the scalar types used for value properties.

use std::fmt;

use dt_xsd::{builtins::XS_NAMESPACE, QName};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BuiltinSource {
    /// A type of the target language itself
    RustPrimitive,
    /// A type provided by the runtime helper library
    HelperType,
}

/// The scalar a simple value is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScalarType {
    /// Local name of the built-in schema type the value was declared with
    pub schema_name: String,
    pub source: BuiltinSource,
    /// Name of the bound type (e.g. `i32`, `Decimal`)
    pub target: &'static str,
}

impl ScalarType {
    /// The scalar for a built-in type. Names that are not built-in fall back to `anySimpleType`.
    pub fn for_builtin(name: &QName) -> Self {
        if name.namespace_name.as_deref() != Some(XS_NAMESPACE) {
            tracing::warn!(%name, "not a built-in type name");
            return Self::for_local_name("anySimpleType");
        }
        Self::for_local_name(&name.local_name)
    }

    pub fn for_local_name(local_name: &str) -> Self {
        let (source, target) = builtin_source_name(local_name);
        Self {
            schema_name: local_name.to_string(),
            source,
            target,
        }
    }

    /// Whether absence can only be represented by wrapping the value.
    pub fn is_primitive(&self) -> bool {
        self.source == BuiltinSource::RustPrimitive && self.target != "String"
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.source {
            BuiltinSource::RustPrimitive => f.write_str(self.target),
            BuiltinSource::HelperType => write!(f, "xs::{}", self.target),
        }
    }
}

fn builtin_source_name(local_name: &str) -> (BuiltinSource, &'static str) {
    use BuiltinSource::*;
    match local_name {
        "boolean" => (RustPrimitive, "bool"),
        "double" => (RustPrimitive, "f64"),
        "float" => (RustPrimitive, "f32"),
        "long" => (RustPrimitive, "i64"),
        "int" => (RustPrimitive, "i32"),
        "short" => (RustPrimitive, "i16"),
        "byte" => (RustPrimitive, "i8"),
        "unsignedLong" => (RustPrimitive, "u64"),
        "unsignedInt" => (RustPrimitive, "u32"),
        "unsignedShort" => (RustPrimitive, "u16"),
        "unsignedByte" => (RustPrimitive, "u8"),
        "string" => (RustPrimitive, "String"),
        "anyType" => (HelperType, "AnyType"),
        "anyAtomicType" => (HelperType, "AnyAtomicType"),
        "error" => (HelperType, "Error"),
        "decimal" => (HelperType, "Decimal"),
        "dateTime" => (HelperType, "DateTime"),
        "duration" => (HelperType, "Duration"),
        "time" => (HelperType, "Time"),
        "date" => (HelperType, "Date"),
        "gMonth" => (HelperType, "GMonth"),
        "gMonthDay" => (HelperType, "GMonthDay"),
        "gDay" => (HelperType, "GDay"),
        "gYear" => (HelperType, "GYear"),
        "gYearMonth" => (HelperType, "GYearMonth"),
        "hexBinary" => (HelperType, "HexBinary"),
        "base64Binary" => (HelperType, "Base64Binary"),
        "anyURI" => (HelperType, "AnyURI"),
        "QName" => (HelperType, "QName"),
        "NOTATION" => (HelperType, "Notation"),
        "normalizedString" => (HelperType, "NormalizedString"),
        "token" => (HelperType, "Token"),
        "language" => (HelperType, "Language"),
        "NMTOKEN" => (HelperType, "NmToken"),
        "NMTOKENS" => (HelperType, "NmTokens"),
        "Name" => (HelperType, "Name"),
        "NCName" => (HelperType, "NcName"),
        "ID" => (HelperType, "Id"),
        "IDREF" => (HelperType, "IdRef"),
        "IDREFS" => (HelperType, "IdRefs"),
        "ENTITY" => (HelperType, "Entity"),
        "ENTITIES" => (HelperType, "Entities"),
        "integer" => (HelperType, "Integer"),
        "nonPositiveInteger" => (HelperType, "NonPositiveInteger"),
        "negativeInteger" => (HelperType, "NegativeInteger"),
        "nonNegativeInteger" => (HelperType, "NonNegativeInteger"),
        "positiveInteger" => (HelperType, "PositiveInteger"),
        "yearMonthDuration" => (HelperType, "YearMonthDuration"),
        "dayTimeDuration" => (HelperType, "DayTimeDuration"),
        "dateTimeStamp" => (HelperType, "DateTimeStamp"),
        _ => (HelperType, "AnySimpleType"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_builtins() {
        let int = ScalarType::for_builtin(&QName::with_namespace(XS_NAMESPACE, "int"));
        assert_eq!(int.target, "i32");
        assert!(int.is_primitive());
        assert_eq!(int.to_string(), "i32");

        let string = ScalarType::for_local_name("string");
        assert!(!string.is_primitive());

        let date = ScalarType::for_local_name("date");
        assert_eq!(date.source, BuiltinSource::HelperType);
        assert_eq!(date.to_string(), "xs::Date");
    }

    #[test]
    fn unknown_names_fall_back_to_any_simple_type() {
        let other = ScalarType::for_builtin(&QName::with_namespace("urn:x", "int"));
        assert_eq!(other.target, "AnySimpleType");
        assert_eq!(other.schema_name, "anySimpleType");
    }
}
