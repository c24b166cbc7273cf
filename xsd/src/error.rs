use thiserror::Error;

use crate::xstypes::QName;

#[derive(Debug, Error)]
pub enum XsdError {
    #[error("Failed to resolve prefix {0:?} to a namespace URI")]
    NamePrefixNotResolved(String),

    #[error("Invalid value {value:?} for attribute {attribute:?} on <{element}>")]
    InvalidAttributeValue {
        element: String,
        attribute: String,
        value: String,
    },

    #[error("Missing required attribute {attribute:?} on <{element}>")]
    MissingAttribute { element: String, attribute: String },

    #[error("Expected a <schema> root element, found <{0}>")]
    UnexpectedRoot(String),

    #[error("Duplicate {kind} component: {name}")]
    DuplicateComponent { kind: &'static str, name: QName },

    #[error(transparent)]
    Xml(#[from] roxmltree::Error),
}
