#[cfg(feature = "generator-rust")]
mod rust;

use std::fmt::Write;

use clap::ValueEnum;
use thiserror::Error;

use dt_codegen::ClassPlan;
use dt_xsd::SchemaSet;

#[derive(Debug, Error)]
pub enum GenerateError {
    #[cfg(feature = "generator-rust")]
    #[error("existing type '{0}' is not a valid Rust path")]
    ExistingType(String, #[source] syn::Error),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Generator {
    /// Listing of the classes, their properties and the document roots
    Plan,
    /// The item trees the plan was built from
    Items,
    #[cfg(feature = "generator-rust")]
    Rust,
}

impl Generator {
    pub fn generate(&self, schema: &SchemaSet, plan: &ClassPlan) -> Result<String, GenerateError> {
        match *self {
            Self::Plan => Ok(plan.to_string()),
            Self::Items => Ok(describe_items(schema, plan)),
            #[cfg(feature = "generator-rust")]
            Self::Rust => rust::generate(plan),
        }
    }
}

fn describe_items(schema: &SchemaSet, plan: &ClassPlan) -> String {
    let mut output = String::new();
    for definition in plan.items.definitions() {
        let _ = writeln!(output, "{}", plan.items.describe(*definition, schema));
    }
    output
}
