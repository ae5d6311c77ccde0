//! Renders the code model as Rust source.

use indexmap::IndexMap;
use proc_macro2::{Literal, TokenStream};
use quote::quote;
use syn::{parse_quote, Item};
use thiserror::Error;

use crate::{
    code::{Access, Class, Enum, File, Function, TaggedUnion},
    naming::ident,
};

#[derive(Debug, Error)]
pub enum PrintError {
    #[error("invalid type `{text}`: {source}")]
    Type { text: String, source: syn::Error },
    #[error("invalid body of function {function}: {source}")]
    Body { function: String, source: syn::Error },
}

#[derive(Clone, Debug)]
pub struct PrintOptions {
    /// Emit the inner `doc` and `allow` attributes. They must be left out for output that is
    /// pulled in with `include!`.
    pub module_attributes: bool,
}

impl Default for PrintOptions {
    fn default() -> Self {
        Self {
            module_attributes: true,
        }
    }
}

fn parse_type(text: &str) -> Result<syn::Type, PrintError> {
    syn::parse_str(text).map_err(|source| PrintError::Type {
        text: text.to_string(),
        source,
    })
}

fn doc_attribute(documentation: Option<&str>) -> Option<TokenStream> {
    documentation.map(|text| {
        let text = format!(" {text}");
        quote!(#[doc = #text])
    })
}

struct Printer {
    output_items: Vec<Item>,
    /// Items of namespaced classes, one module per namespace.
    modules: IndexMap<String, Vec<Item>>,
}

impl Printer {
    fn print_class(&mut self, class: &Class) -> Result<(), PrintError> {
        let mut items = Vec::new();
        for enumeration in &class.enums {
            items.push(print_enum(enumeration));
        }
        for union in &class.unions {
            items.push(print_union(union)?);
        }
        items.push(print_struct(class)?);

        let name = ident(&class.name);
        let inherent = class
            .functions
            .iter()
            .filter(|function| function.implements.is_none())
            .map(|function| print_function(function, true))
            .collect::<Result<Vec<_>, _>>()?;
        if !inherent.is_empty() {
            items.push(parse_quote! {
                impl #name {
                    #(#inherent)*
                }
            });
        }

        for base in &class.base_classes {
            let path: syn::Path = syn::parse_str(base).map_err(|source| PrintError::Type {
                text: base.clone(),
                source,
            })?;
            let functions = class
                .functions
                .iter()
                .filter(|function| function.implements.as_deref() == Some(base.as_str()))
                .map(|function| print_function(function, false))
                .collect::<Result<Vec<_>, _>>()?;
            items.push(parse_quote! {
                impl #path for #name {
                    #(#functions)*
                }
            });
        }

        match &class.namespace {
            Some(namespace) => self.modules.entry(namespace.clone()).or_default().extend(items),
            None => self.output_items.extend(items),
        }
        Ok(())
    }

    fn into_items(mut self) -> Vec<Item> {
        for (namespace, items) in self.modules {
            let namespace = ident(&namespace);
            self.output_items.push(parse_quote! {
                pub mod #namespace {
                    use super::*;
                    #(#items)*
                }
            });
        }
        self.output_items
    }
}

fn print_struct(class: &Class) -> Result<Item, PrintError> {
    let name = ident(&class.name);
    let doc = doc_attribute(class.documentation.as_deref());
    let fields = class
        .members
        .iter()
        .map(|member| {
            let name = ident(&member.name);
            let type_ = parse_type(&member.type_)?;
            let doc = doc_attribute(member.documentation.as_deref());
            Ok(quote!(#doc #name: #type_))
        })
        .collect::<Result<Vec<_>, PrintError>>()?;
    Ok(parse_quote! {
        #doc
        #[derive(Debug, Clone, Default, PartialEq)]
        pub struct #name {
            #(#fields,)*
        }
    })
}

fn print_enum(enumeration: &Enum) -> Item {
    let name = ident(&enumeration.name);
    let doc = doc_attribute(enumeration.documentation.as_deref());
    let invalid = ident(Enum::INVALID);
    let variants = enumeration.variants();
    // Flags only get explicit bits while they fit the discriminant
    let flags = enumeration.combinable && variants.len() < 63;

    let variants = variants.iter().enumerate().map(|(index, (variant, _))| {
        let variant = ident(variant);
        if flags {
            let index = Literal::usize_unsuffixed(index);
            quote!(#variant = 1 << #index)
        } else {
            quote!(#variant)
        }
    });
    let invalid = if flags {
        quote!(#invalid = 0)
    } else {
        quote!(#invalid)
    };
    parse_quote! {
        #doc
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub enum #name {
            #[default]
            #invalid,
            #(#variants,)*
        }
    }
}

fn print_union(union: &TaggedUnion) -> Result<Item, PrintError> {
    let name = ident(&union.name);
    let doc = doc_attribute(union.documentation.as_deref());
    let variants = union
        .variants
        .iter()
        .map(|variant| {
            let name = ident(&variant.name);
            let type_ = parse_type(&variant.type_)?;
            Ok(quote!(#name(#type_)))
        })
        .collect::<Result<Vec<_>, PrintError>>()?;
    Ok(parse_quote! {
        #doc
        #[derive(Debug, Clone, PartialEq)]
        pub enum #name {
            #(#variants,)*
        }
    })
}

fn print_function(function: &Function, inherent: bool) -> Result<TokenStream, PrintError> {
    let name = ident(&function.name);
    let doc = doc_attribute(function.documentation.as_deref());
    let visibility = (inherent && function.access == Access::Public).then(|| quote!(pub));
    let receiver = if function.is_static {
        None
    } else if function.is_const {
        Some(quote!(&self,))
    } else {
        Some(quote!(&mut self,))
    };
    let arguments = function
        .arguments
        .iter()
        .map(|argument| {
            let name = ident(&argument.name);
            let type_ = parse_type(&argument.type_)?;
            Ok(quote!(#name: #type_))
        })
        .collect::<Result<Vec<_>, PrintError>>()?;
    let return_type = function
        .return_type
        .as_deref()
        .map(parse_type)
        .transpose()?
        .map(|type_| quote!(-> #type_));
    let body: syn::Block =
        syn::parse_str(&format!("{{ {} }}", function.body)).map_err(|source| PrintError::Body {
            function: function.name.clone(),
            source,
        })?;

    Ok(quote! {
        #doc
        #visibility fn #name(#receiver #(#arguments),*) #return_type #body
    })
}

/// Renders `file` as formatted Rust source.
pub fn render_file(file: &File, options: &PrintOptions) -> Result<String, PrintError> {
    let mut printer = Printer {
        output_items: Vec::new(),
        modules: IndexMap::new(),
    };
    for class in &file.classes {
        printer.print_class(class)?;
    }

    let mut attrs = Vec::new();
    if options.module_attributes {
        let doc_comment = concat!(
            "Generated by ",
            env!("CARGO_PKG_NAME"),
            " ",
            env!("CARGO_PKG_VERSION")
        );
        attrs.push(parse_quote!(#![doc = #doc_comment]));
        if let Some(documentation) = &file.documentation {
            let documentation = format!(" {documentation}");
            attrs.push(parse_quote!(#![doc = ""]));
            attrs.push(parse_quote!(#![doc = #documentation]));
        }
        attrs.push(parse_quote!(#![allow(dead_code, unused_imports)]));
    }

    let root = syn::File {
        shebang: None,
        attrs,
        items: printer.into_items(),
    };
    Ok(prettyplease::unparse(&root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::{Argument, MemberVariable, UnionVariant};

    fn note() -> File {
        let mut class = Class::new("Note");
        class.documentation = Some("A note.".into());
        class.members.push(MemberVariable {
            name: "type".into(),
            type_: "Option<NoteType>".into(),
            documentation: None,
        });
        class.enums.push(Enum {
            name: "NoteType".into(),
            values: vec!["memo".into(), "letter".into()],
            combinable: false,
            documentation: None,
        });
        class.functions.push(Function {
            return_type: Some("Option<&NoteType>".into()),
            body: "self.r#type.as_ref()".into(),
            is_const: true,
            ..Function::new("type")
        });
        class.functions.push(Function {
            arguments: vec![Argument::new("value", "Option<NoteType>")],
            body: "self.r#type = value;".into(),
            ..Function::new("set_type")
        });
        File {
            name: "note".into(),
            documentation: None,
            classes: vec![class],
        }
    }

    #[test]
    fn renders_classes() {
        let source = render_file(&note(), &PrintOptions::default()).unwrap();
        assert!(source.starts_with("//!Generated by sb-generator"));
        assert!(source.contains("#![allow(dead_code, unused_imports)]"));
        assert!(source.contains("/// A note.\n#[derive(Debug, Clone, Default, PartialEq)]\npub struct Note {"));
        assert!(source.contains("    r#type: Option<NoteType>,"));
        assert!(source.contains("    #[default]\n    Invalid,\n    Memo,\n    Letter,"));
        assert!(source.contains("    pub fn r#type(&self) -> Option<&NoteType> {"));
        assert!(source.contains("    pub fn set_type(&mut self, value: Option<NoteType>) {"));
        syn::parse_file(&source).unwrap();
    }

    #[test]
    fn include_mode_has_no_inner_attributes() {
        let options = PrintOptions {
            module_attributes: false,
        };
        let source = render_file(&note(), &options).unwrap();
        assert!(!source.contains("#![") && !source.contains("//!"));
    }

    #[test]
    fn flags_get_bits_and_unions_wrap_types() {
        let mut class = Class::new("Cell");
        class.enums.push(Enum {
            name: "CellFlags".into(),
            values: vec!["bold".into(), "italic".into()],
            combinable: true,
            documentation: None,
        });
        class.unions.push(TaggedUnion {
            name: "CellChoice".into(),
            variants: vec![
                UnionVariant {
                    name: "Text".into(),
                    type_: "String".into(),
                },
                UnionVariant {
                    name: "Cell".into(),
                    type_: "Box<Cell>".into(),
                },
            ],
            documentation: None,
        });
        let file = File {
            classes: vec![class],
            ..File::default()
        };
        let source = render_file(&file, &PrintOptions::default()).unwrap();
        assert!(source.contains("Invalid = 0,\n    Bold = 1 << 0,\n    Italic = 1 << 1,"));
        assert!(source.contains("    Text(String),\n    Cell(Box<Cell>),"));
    }

    #[test]
    fn namespaced_classes_share_one_module() {
        let mut file = note();
        let mut memo = Class::new("Memo");
        memo.members.push(MemberVariable {
            name: "note".into(),
            type_: "Note".into(),
            documentation: None,
        });
        file.classes.push(memo);
        for class in &mut file.classes {
            class.namespace = Some("notes".into());
        }

        let source = render_file(&file, &PrintOptions::default()).unwrap();
        assert_eq!(source.matches("pub mod notes {").count(), 1);
        assert!(source.contains("    pub struct Memo {\n        note: Note,"));
        syn::parse_file(&source).unwrap();
    }

    #[test]
    fn broken_bodies_are_reported() {
        let mut file = note();
        file.classes[0].functions[0].body = "match {".into();
        let error = render_file(&file, &PrintOptions::default()).unwrap_err();
        assert!(matches!(error, PrintError::Body { ref function, .. } if function == "type"));
    }
}
