//! Compiles a validated XML Schema component model into a class-generation plan.
//!
//! The pipeline works on an [`ItemTree`](item::ItemTree) built from the schema: every global
//! definition becomes a tree of items, simple definitions are inlined into their users, the
//! remaining definitions and nested structures get classes, and the content of each class is
//! classified into properties. Problems found along the way are collected in the plan rather
//! than aborting compilation; only a broken item tree is an error.

pub mod builder;
pub mod customs;
pub mod data;
pub mod error;
pub mod inline;
pub mod item;
pub mod names;
pub mod naming;
pub mod normalize;
pub mod packages;
pub mod plan;
pub mod problems;
pub mod values;

use dt_xsd::SchemaSet;

pub use customs::Customizations;
pub use error::{CodegenError, CustomsError};
pub use names::{DefaultNameConverter, NameConverter};
pub use plan::ClassPlan;

use builder::TreeBuilder;
use customs::ResolvedCustoms;
use inline::InlineEngine;
use item::ItemTree;
use naming::NameAssigner;
use plan::PlanBuilder;
use problems::Problems;

/// Compiles `schema` with the default name converter. The schema set is normalized in place.
pub fn compile(
    schema: &mut SchemaSet,
    customs: &Customizations,
) -> Result<ClassPlan, CodegenError> {
    compile_with(schema, customs, &DefaultNameConverter)
}

pub fn compile_with(
    schema: &mut SchemaSet,
    customs: &Customizations,
    converter: &dyn NameConverter,
) -> Result<ClassPlan, CodegenError> {
    let mut problems = Problems::new();
    let resolved = ResolvedCustoms::resolve(customs, schema, &mut problems);
    normalize::normalize(schema, &resolved, &mut problems);

    let schema = &*schema;
    let mut tree = ItemTree::new();
    TreeBuilder::new(schema, &resolved, &mut tree, &mut problems).build_all();
    InlineEngine::new(schema, &resolved, &mut tree, &mut problems).run()?;
    NameAssigner::new(schema, &resolved, converter, &mut tree).run();
    data::classify(schema, &mut tree);
    PlanBuilder::new(schema, &resolved, converter, tree, problems).build()
}
