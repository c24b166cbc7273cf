use crate::{component::MaxOccurs, error::XsdError, xstypes::QName};
use roxmltree::Node;

pub trait ActualValue<'a>: Sized {
    fn convert(src: &'a str, parent: Node) -> Result<Self, XsdError>;
}

fn invalid(src: &str, attribute: &str, parent: Node) -> XsdError {
    XsdError::InvalidAttributeValue {
        element: parent.tag_name().name().to_string(),
        attribute: attribute.to_string(),
        value: src.to_string(),
    }
}

impl<'a> ActualValue<'a> for &'a str {
    fn convert(src: &'a str, _parent: Node) -> Result<Self, XsdError> {
        Ok(src)
    }
}

impl ActualValue<'_> for String {
    fn convert(src: &'_ str, _parent: Node) -> Result<Self, XsdError> {
        Ok(src.to_string())
    }
}

impl ActualValue<'_> for QName {
    fn convert(src: &'_ str, parent: Node) -> Result<Self, XsdError> {
        QName::parse(src.trim(), parent)
    }
}

impl<'a, T: ActualValue<'a>> ActualValue<'a> for Vec<T> {
    fn convert(src: &'a str, parent: Node) -> Result<Self, XsdError> {
        // NOTE: This assumes a list with whiteSpace="collapse"
        src.split_ascii_whitespace()
            .map(|a| ActualValue::convert(a, parent))
            .collect()
    }
}

impl ActualValue<'_> for bool {
    fn convert(src: &str, parent: Node) -> Result<Self, XsdError> {
        match src.trim() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            _ => Err(invalid(src, "boolean", parent)),
        }
    }
}

impl ActualValue<'_> for u64 {
    fn convert(src: &str, parent: Node) -> Result<Self, XsdError> {
        src.trim()
            .parse()
            .map_err(|_| invalid(src, "nonNegativeInteger", parent))
    }
}

impl ActualValue<'_> for MaxOccurs {
    fn convert(src: &str, parent: Node) -> Result<Self, XsdError> {
        // unbounded, if the maxOccurs [attribute] equals unbounded, otherwise the ·actual value·
        // of the maxOccurs [attribute]
        if src.trim() == "unbounded" {
            Ok(MaxOccurs::Unbounded)
        } else {
            u64::convert(src, parent).map(MaxOccurs::Count)
        }
    }
}

/// Reads the attribute `name` of `node` and converts it to its ·actual value·.
pub fn attribute_value<T>(node: Node, name: &str) -> Result<Option<T>, XsdError>
where
    T: for<'x> ActualValue<'x>,
{
    node.attribute(name)
        .map(|value| {
            T::convert(value, node).map_err(|err| match err {
                XsdError::InvalidAttributeValue { element, value, .. } => {
                    XsdError::InvalidAttributeValue {
                        element,
                        attribute: name.to_string(),
                        value,
                    }
                }
                other => other,
            })
        })
        .transpose()
}
