use thiserror::Error;

use crate::item::ItemId;

/// Unrecoverable failures: the item tree is not in the shape the pass requires, which means an
/// earlier pass is broken. Compilation aborts on these.
#[derive(Debug, Error)]
pub enum CodegenError {
    #[error("{item:?}: expected a group item, found {found}")]
    ExpectedGroup { item: ItemId, found: &'static str },

    #[error("{item:?}: a definition item can only be a tree root")]
    NestedDefinition { item: ItemId },

    #[error("{item:?}: reference to a definition that was never assigned a class")]
    UnresolvedReference { item: ItemId },

    #[error("{item:?}: group needs a class but sits in an inlined document root")]
    UnplacedGroup { item: ItemId },
}

/// Failures while loading a customization file.
#[derive(Debug, Error)]
pub enum CustomsError {
    #[error("failed to read customizations from {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid customizations")]
    Parse(#[from] toml::de::Error),
}
