//! The validated XML Schema object model consumed by the class-plan compiler.
//!
//! Components of every read schema document live in one [`SchemaSet`] arena and are addressed by
//! [`ComponentId`]. The model keeps the document structure (kind tag, names, references,
//! occurrence and children in document order) rather than the fully resolved component graph;
//! references are resolved on demand through the set's symbol spaces.

pub mod builtins;
pub mod component;
pub mod components;
pub mod error;
pub mod slots;
pub mod xstypes;

mod mapping_context;
mod values;

pub use component::{
    AttributeUse, Component, ComponentId, ComponentKind, MaxOccurs, ProcessContents,
};
pub use components::{SchemaSet, SymbolSpace, TypeRef};
pub use error::XsdError;
pub use slots::ComponentSlots;
pub use xstypes::QName;
