use std::collections::BTreeMap;

use check_keyword::CheckKeyword;
use heck::{ToPascalCase, ToSnakeCase};
use quote::format_ident;
use syn::{parse_quote, Field, FieldMutability, Ident, ImplItem, Item, Type};

use dt_codegen::customs::CollectionStyle;
use dt_codegen::data::{LeafNode, LeafValue, ParentNode};
use dt_codegen::plan::{BindingTarget, ClassId, ClassKind, EnumValue, GeneratedClass};
use dt_codegen::values::{BuiltinSource, ScalarType};
use dt_codegen::ClassPlan;

use super::GenerateError;

/// One Rust module per package segment.
#[derive(Default)]
struct Module {
    items: Vec<Item>,
    children: BTreeMap<String, Module>,
}

impl Module {
    fn at(&mut self, path: &[String]) -> &mut Module {
        path.iter().fold(self, |module, segment| {
            module.children.entry(segment.clone()).or_default()
        })
    }

    fn into_items(self) -> Vec<Item> {
        let mut items = self.items;
        for (name, child) in self.children {
            let ident = name_to_ident(&name);
            let content = child.into_items();
            items.push(parse_quote! {
                pub mod #ident {
                    #(#content)*
                }
            });
        }
        items
    }
}

struct RustEmitter<'a> {
    plan: &'a ClassPlan,
}

impl RustEmitter<'_> {
    fn class_items(
        &self,
        class: &GeneratedClass,
        module: &[String],
    ) -> Result<Vec<Item>, GenerateError> {
        let name = name_to_ident(&class.handle.name);
        let docs = class.documentation.iter();
        match (&class.kind, &class.data) {
            (ClassKind::Enumeration(values), _) => Ok(enumeration(&name, docs, values)),
            (ClassKind::Structure, Some(data)) => self.structure(&name, docs, data, module),
            (ClassKind::Structure, None) => Ok(Vec::new()),
        }
    }

    fn structure<'d>(
        &self,
        name: &Ident,
        docs: impl Iterator<Item = &'d String>,
        data: &ParentNode,
        module: &[String],
    ) -> Result<Vec<Item>, GenerateError> {
        let mut fields = Vec::new();
        for leaf in data.leaves() {
            let Some(property) = &leaf.property else {
                continue;
            };
            let ty = self.leaf_type(leaf, module)?;
            fields.push(field(
                &property.field_name,
                leaf.documentation.as_deref(),
                ty,
            ));
        }

        let mut constants: Vec<ImplItem> = Vec::new();
        for selector in data.selectors() {
            fields.push(field(
                &selector.property.field_name,
                Some("Index of the alternative that is present"),
                parse_quote!(usize),
            ));
            for constant in &selector.constants {
                let ident = name_to_ident(&constant.name);
                let value = constant.value;
                constants.push(parse_quote!(pub const #ident: usize = #value;));
            }
        }

        let mut items: Vec<Item> = vec![parse_quote! {
            #(#[doc = #docs])*
            #[derive(Debug, Clone)]
            pub struct #name {
                #(#fields),*
            }
        }];
        if !constants.is_empty() {
            items.push(parse_quote! {
                impl #name {
                    #(#constants)*
                }
            });
        }
        Ok(items)
    }

    fn leaf_type(&self, leaf: &LeafNode, module: &[String]) -> Result<Type, GenerateError> {
        let base: Type = match &leaf.value {
            LeafValue::Scalar(scalar) => scalar_type(scalar),
            LeafValue::Class(id) => {
                let path = self.class_path(module, *id)?;
                let target = self.plan.class(*id);
                // structures may contain themselves
                if !leaf.collection
                    && target.handle.generated
                    && target.kind == ClassKind::Structure
                {
                    parse_quote!(Box<#path>)
                } else {
                    parse_quote!(#path)
                }
            }
            LeafValue::Flag => return Ok(parse_quote!(bool)),
            LeafValue::Dom | LeafValue::Mapped => parse_quote!(xs::AnyType),
            LeafValue::Ignored => parse_quote!(()),
        };
        Ok(if leaf.collection {
            match self.plan.collection_style {
                CollectionStyle::Array => parse_quote!(Box<[#base]>),
                CollectionStyle::List | CollectionStyle::TypedList => parse_quote!(Vec<#base>),
            }
        } else if leaf.optional || leaf.nillable {
            parse_quote!(Option<#base>)
        } else {
            base
        })
    }

    /// The path of a class as seen from the module of another.
    fn class_path(&self, from: &[String], id: ClassId) -> Result<syn::Path, GenerateError> {
        let handle = &self.plan.class(id).handle;
        if !handle.generated {
            return syn::parse_str(&handle.name)
                .map_err(|error| GenerateError::ExistingType(handle.name.clone(), error));
        }
        let name = name_to_ident(&handle.name);
        let target = package_segments(&handle.package);
        if target == from {
            return Ok(parse_quote!(#name));
        }
        let supers = from.iter().map(|_| format_ident!("super"));
        let segments = target.iter().map(|segment| name_to_ident(segment));
        Ok(parse_quote!(#(#supers::)* #(#segments::)* #name))
    }
}

fn field(name: &str, documentation: Option<&str>, ty: Type) -> Field {
    Field {
        attrs: documentation
            .into_iter()
            .map(|doc| parse_quote!(#[doc = #doc]))
            .collect(),
        vis: parse_quote!(pub),
        mutability: FieldMutability::None,
        ident: Some(name_to_ident(name)),
        colon_token: Some(Default::default()),
        ty,
    }
}

fn enumeration<'d>(
    name: &Ident,
    docs: impl Iterator<Item = &'d String>,
    values: &[EnumValue],
) -> Vec<Item> {
    let variants = values
        .iter()
        .map(|value| string_variant_to_ident(&value.constant.to_lowercase()))
        .collect::<Vec<_>>();
    let literals = values.iter().map(|value| value.value.as_str()).collect::<Vec<_>>();
    vec![
        parse_quote! {
            #(#[doc = #docs])*
            #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
            pub enum #name {
                #(
                    #[doc = #literals]
                    #variants
                ),*
            }
        },
        parse_quote! {
            impl #name {
                pub fn as_str(&self) -> &'static str {
                    match self {
                        #(Self::#variants => #literals,)*
                    }
                }

                pub fn from_literal(value: &str) -> Option<Self> {
                    match value {
                        #(#literals => Some(Self::#variants),)*
                        _ => None,
                    }
                }
            }
        },
    ]
}

fn scalar_type(scalar: &ScalarType) -> Type {
    let name = format_ident!("{}", scalar.target);
    match scalar.source {
        BuiltinSource::RustPrimitive => parse_quote!(#name),
        BuiltinSource::HelperType => parse_quote!(xs::#name),
    }
}

fn package_segments(package: &str) -> Vec<String> {
    package
        .split('.')
        .filter(|segment| !segment.is_empty())
        .map(|segment| segment.to_snake_case())
        .collect()
}

fn name_to_ident(name: &str) -> Ident {
    if ["crate", "self", "super", "Self"].contains(&name) {
        // These are keywords that are not allowed as raw identifiers
        format_ident!("{}_", name)
    } else if name.is_keyword() {
        format_ident!("r#{}", name)
    } else {
        format_ident!("{}", name)
    }
}

fn string_variant_to_ident(variant: &str) -> Ident {
    let Some(first_char) = variant.chars().next() else {
        return format_ident!("Empty");
    };
    let sanitized_name = variant.replace(|c: char| !c.is_ascii_alphanumeric(), "_");
    if !first_char.is_ascii_alphabetic() {
        format_ident!("_{}", sanitized_name.to_pascal_case())
    } else {
        name_to_ident(&sanitized_name.to_pascal_case())
    }
}

pub fn generate(plan: &ClassPlan) -> Result<String, GenerateError> {
    let emitter = RustEmitter { plan };
    let mut root = Module::default();
    for (_, class) in plan.generated() {
        let module = package_segments(&class.handle.package);
        let items = emitter.class_items(class, &module)?;
        root.at(&module).items.extend(items);
    }

    let doc_comment = concat!(
        "Generated by ",
        env!("CARGO_PKG_NAME"),
        " ",
        env!("CARGO_PKG_VERSION")
    );
    let mut attrs = vec![
        parse_quote!(#![doc = #doc_comment]),
        parse_quote!(#![doc = ""]),
        parse_quote!(#![doc = "Helper types of non-primitive XSD built-ins are expected in scope as `xs`."]),
    ];
    for binding in &plan.roots {
        let target = match &binding.target {
            BindingTarget::Class(id) => plan.class(*id).handle.full_name(),
            BindingTarget::Value(scalar) => scalar.to_string(),
            BindingTarget::Wildcard => "any content".to_string(),
            BindingTarget::Empty => "empty content".to_string(),
        };
        let line = format!("Document root `{}` binds `{target}`.", binding.element.local_name);
        attrs.push(parse_quote!(#![doc = #line]));
    }
    attrs.push(parse_quote!(#![allow(dead_code, unused_imports)]));

    let root = syn::File {
        shebang: None,
        attrs,
        items: root.into_items(),
    };
    Ok(prettyplease::unparse(&root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dt_codegen::Customizations;
    use dt_xsd::SchemaSet;

    fn generate_from(documents: &[&str], customs: &str) -> String {
        let mut schema = SchemaSet::new();
        for document in documents {
            schema.read_str(document).unwrap();
        }
        let customs = Customizations::from_toml(customs).unwrap();
        let plan = dt_codegen::compile(&mut schema, &customs).unwrap();
        generate(&plan).unwrap()
    }

    #[test]
    fn structures_get_typed_fields() {
        let output = generate_from(
            &[r#"
            <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
              <xs:element name="E" type="T"/>
              <xs:complexType name="T">
                <xs:sequence>
                  <xs:element name="item" type="xs:string" maxOccurs="unbounded"/>
                  <xs:element name="type" type="xs:date"/>
                </xs:sequence>
                <xs:attribute name="a" type="xs:int"/>
              </xs:complexType>
            </xs:schema>"#],
            "",
        );
        assert!(output.contains("pub mod nonamespace {"));
        assert!(output.contains("pub struct T {"));
        assert!(output.contains("pub items: Vec<String>,"));
        assert!(output.contains("pub r#type: xs::Date,"));
        assert!(output.contains("pub a: Option<i32>,"));
        assert!(output.contains("Document root `E` binds `nonamespace.T`."));
    }

    #[test]
    fn collection_style_and_recursion() {
        let output = generate_from(
            &[r#"
            <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
              <xs:complexType name="Node">
                <xs:sequence>
                  <xs:element name="parent" type="Node" minOccurs="0"/>
                  <xs:element name="branch" type="Node" maxOccurs="unbounded"/>
                </xs:sequence>
              </xs:complexType>
            </xs:schema>"#],
            r#"
            [global]
            repeated-type = "array"
            "#,
        );
        assert!(output.contains("pub parent: Option<Box<Node>>,"));
        assert!(output.contains("pub branches: Box<[Node]>,"));
    }

    #[test]
    fn enumerations_and_selectors() {
        let output = generate_from(
            &[r#"
            <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
              <xs:simpleType name="Color">
                <xs:restriction base="xs:string">
                  <xs:enumeration value="dark-red"/>
                  <xs:enumeration value="2nd"/>
                </xs:restriction>
              </xs:simpleType>
              <xs:complexType name="Payment">
                <xs:choice>
                  <xs:element name="card" type="xs:string"/>
                  <xs:element name="account" type="Color"/>
                </xs:choice>
              </xs:complexType>
            </xs:schema>"#],
            "",
        );
        assert!(output.contains("pub enum Color {"));
        assert!(output.contains("\"dark-red\" => Some(Self::DarkRed),"));
        assert!(output.contains("=> \"2nd\","));
        assert!(output.contains("pub account: Option<Color>,"));
        assert!(output.contains("pub payment_select: usize,"));
        assert!(output.contains("pub const ACCOUNT_CHOICE: usize = 1usize;"));
    }

    #[test]
    fn classes_in_other_packages_use_relative_paths() {
        let output = generate_from(
            &[
                r#"
                <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                           targetNamespace="urn:b">
                  <xs:complexType name="Inner">
                    <xs:attribute name="x" type="xs:int"/>
                    <xs:attribute name="y" type="xs:int"/>
                  </xs:complexType>
                </xs:schema>"#,
                r#"
                <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                           xmlns:b="urn:b" targetNamespace="urn:a">
                  <xs:complexType name="Outer">
                    <xs:sequence>
                      <xs:element name="inner" type="b:Inner"/>
                    </xs:sequence>
                    <xs:attribute name="id" type="xs:string"/>
                  </xs:complexType>
                </xs:schema>"#,
            ],
            "",
        );
        assert!(output.contains("pub inner: Box<super::b::Inner>,"));
    }
}
