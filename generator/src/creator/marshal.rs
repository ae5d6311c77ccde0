//! Structural marshal/demarshal bodies.
//!
//! Bodies are produced as token streams and stored as source text in the code model. Generated
//! code refers to the runtime crate through fully qualified paths only and lets type inference
//! pick the `Scalar`/`Element` implementation from the member it reads or assigns.

use proc_macro2::TokenStream;
use quote::quote;

use crate::naming::ident;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Cardinality {
    One,
    Optional,
    List,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Whitespace {
    Replace,
    Collapse,
}

/// How a single value of a slot is converted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Value {
    Scalar { whitespace: Option<Whitespace> },
    /// Converted by the class's `<prefix>_from_string`/`<prefix>_to_string` functions.
    Enum { prefix: String, combinable: bool },
    Class,
}

#[derive(Clone, Debug)]
pub(crate) struct ChoiceVariant {
    pub name: String,
    pub tag: String,
    pub value: Value,
}

#[derive(Clone, Debug)]
pub(crate) enum SlotKind {
    Attribute { tag: String, value: Value },
    /// Text content of the element itself.
    Text { value: Value },
    Child { tag: String, value: Value },
    Choice {
        union: String,
        variants: Vec<ChoiceVariant>,
    },
}

/// A member variable together with everything needed to read and write it.
#[derive(Clone, Debug)]
pub(crate) struct Slot {
    pub member: String,
    /// Singular name used by the `add_` mutator of list members.
    pub item: String,
    pub cardinality: Cardinality,
    pub value_type: String,
    /// Set when `value_type` is `Box<boxed>`.
    pub boxed: Option<String>,
    pub kind: SlotKind,
}

pub(crate) struct BodyGenerator<'a> {
    pub runtime: &'a syn::Path,
    pub tag: &'a str,
    pub slots: &'a [Slot],
}

impl BodyGenerator<'_> {
    fn to_literal(&self, value: &Value, item: TokenStream) -> TokenStream {
        let rt = self.runtime;
        match value {
            Value::Scalar { .. } | Value::Class => quote! { #rt::Scalar::to_literal(#item) },
            Value::Enum {
                prefix,
                combinable: false,
            } => {
                let to_string = ident(&format!("{prefix}_to_string"));
                quote! { Self::#to_string(*#item).to_string() }
            }
            Value::Enum {
                prefix,
                combinable: true,
            } => {
                let to_string = ident(&format!("{prefix}_to_string"));
                quote! {
                    #item.iter().map(|flag| Self::#to_string(*flag)).collect::<Vec<_>>().join(" ")
                }
            }
        }
    }

    /// Converts the `&str` expression `literal`.
    fn from_literal(&self, value: &Value, literal: TokenStream) -> TokenStream {
        let rt = self.runtime;
        match value {
            Value::Scalar { whitespace: None } | Value::Class => {
                quote! { #rt::Scalar::from_literal(#literal)? }
            }
            Value::Scalar {
                whitespace: Some(whitespace),
            } => {
                let whitespace = whitespace_tokens(rt, *whitespace);
                quote! { #rt::Scalar::from_literal(&#rt::normalized_value(#literal, #whitespace))? }
            }
            Value::Enum {
                prefix,
                combinable: false,
            } => {
                let from_string = ident(&format!("{prefix}_from_string"));
                let whitespace = whitespace_tokens(rt, Whitespace::Collapse);
                quote! { Self::#from_string(&#rt::normalized_value(#literal, #whitespace)) }
            }
            Value::Enum {
                prefix,
                combinable: true,
            } => {
                let from_string = ident(&format!("{prefix}_from_string"));
                quote! {
                    (#literal).split_whitespace().map(Self::#from_string).collect::<Vec<_>>()
                }
            }
        }
    }

    /// Statements writing one child element holding `item`.
    fn write_child(&self, tag: &str, value: &Value, item: TokenStream) -> TokenStream {
        let rt = self.runtime;
        match value {
            Value::Class => quote! { #rt::Element::marshal(#item, writer)?; },
            _ => {
                let literal = self.to_literal(value, item);
                quote! { writer.text_element(#tag, &#literal)?; }
            }
        }
    }

    /// Wraps `statements`, which use `value`, according to the slot's cardinality.
    fn for_each(slot: &Slot, statements: TokenStream) -> TokenStream {
        let member = ident(&slot.member);
        match slot.cardinality {
            Cardinality::One => quote! {
                let value = &self.#member;
                #statements
            },
            Cardinality::Optional => quote! {
                if let Some(value) = &self.#member {
                    #statements
                }
            },
            Cardinality::List => quote! {
                for value in &self.#member {
                    #statements
                }
            },
        }
    }

    /// Whether every member is a collection, in which case nothing is written for an instance
    /// whose collections are all empty.
    fn is_list_shaped(&self) -> bool {
        !self.slots.is_empty()
            && self.slots.iter().all(|slot| {
                slot.cardinality == Cardinality::List
                    && matches!(slot.kind, SlotKind::Child { .. } | SlotKind::Choice { .. })
            })
    }

    pub fn marshal(&self) -> String {
        let tag = self.tag;
        let mut statements = Vec::new();

        if self.is_list_shaped() {
            let condition = self
                .slots
                .iter()
                .map(|slot| {
                    let member = ident(&slot.member);
                    quote!(self.#member.is_empty())
                })
                .reduce(|all, next| quote!(#all && #next));
            statements.push(quote! {
                if #condition {
                    return Ok(());
                }
            });
        }

        let attributes: Vec<_> = self
            .slots
            .iter()
            .filter_map(|slot| match &slot.kind {
                SlotKind::Attribute { tag, value } => {
                    let literal = self.to_literal(value, quote!(value));
                    Some(Self::for_each(
                        slot,
                        quote! { attributes.push((#tag, #literal)); },
                    ))
                }
                _ => None,
            })
            .collect();
        if attributes.is_empty() {
            statements.push(quote! { writer.start_element(#tag, &[])?; });
        } else {
            statements.push(quote! {
                let mut attributes: Vec<(&str, String)> = Vec::new();
                #({ #attributes })*
                writer.start_element(#tag, &attributes)?;
            });
        }

        for slot in self.slots {
            let statement = match &slot.kind {
                SlotKind::Attribute { .. } => continue,
                SlotKind::Text { value } => {
                    let literal = self.to_literal(value, quote!(value));
                    Self::for_each(slot, quote! { writer.text(&#literal)?; })
                }
                SlotKind::Child { tag, value } => {
                    Self::for_each(slot, self.write_child(tag, value, quote!(value)))
                }
                SlotKind::Choice { union, variants } => {
                    let union = ident(union);
                    let arms = variants.iter().map(|variant| {
                        let name = ident(&variant.name);
                        let write = self.write_child(&variant.tag, &variant.value, quote!(value));
                        quote! { #union::#name(value) => { #write } }
                    });
                    Self::for_each(slot, quote! { match value { #(#arms)* } })
                }
            };
            statements.push(quote! { { #statement } });
        }

        statements.push(quote! { writer.end_element(#tag) });
        quote!(#(#statements)*).to_string()
    }

    fn assign(slot: &Slot, expression: TokenStream) -> TokenStream {
        let member = ident(&slot.member);
        match slot.cardinality {
            Cardinality::One => quote! { result.#member = #expression },
            Cardinality::Optional => quote! { result.#member = Some(#expression) },
            Cardinality::List => quote! { result.#member.push(#expression) },
        }
    }

    pub fn demarshal(&self) -> String {
        let rt = self.runtime;
        let tag = self.tag;

        let mut attribute_arms = Vec::new();
        let mut child_arms = Vec::new();
        let mut text = None;
        for slot in self.slots {
            match &slot.kind {
                SlotKind::Attribute { tag, value } => {
                    let expression = self.from_literal(value, quote!(attribute.value()));
                    let assign = Self::assign(slot, expression);
                    attribute_arms.push(quote! { #tag => #assign, });
                }
                SlotKind::Text { value } => {
                    let expression = self.from_literal(value, quote!(&#rt::text_content(node)));
                    text = Some(Self::assign(slot, expression));
                }
                SlotKind::Child { tag, value } => {
                    let expression = self.child_value(value);
                    let assign = Self::assign(slot, expression);
                    child_arms.push(quote! { #tag => #assign, });
                }
                SlotKind::Choice { union, variants } => {
                    let union = ident(union);
                    for variant in variants {
                        let name = ident(&variant.name);
                        let expression = self.child_value(&variant.value);
                        let assign = Self::assign(slot, quote!(#union::#name(#expression)));
                        let tag = &variant.tag;
                        child_arms.push(quote! { #tag => #assign, });
                    }
                }
            }
        }

        let binding = if self.slots.is_empty() {
            quote!(let result = Self::default();)
        } else {
            quote!(let mut result = Self::default();)
        };
        let text = text.map(|assign| quote!(#assign;));
        quote! {
            #rt::expect_element(node, #tag)?;
            #binding
            for attribute in node.attributes() {
                match attribute.name() {
                    #(#attribute_arms)*
                    other => #rt::unknown_attribute(node, other),
                }
            }
            #text
            for child in node.children().filter(|child| child.is_element()) {
                match child.tag_name().name() {
                    #(#child_arms)*
                    _ => #rt::unknown_element(node, child),
                }
            }
            Ok(result)
        }
        .to_string()
    }

    fn child_value(&self, value: &Value) -> TokenStream {
        let rt = self.runtime;
        match value {
            Value::Class => quote! { #rt::Element::demarshal(child)? },
            _ => self.from_literal(value, quote!(&#rt::text_content(child))),
        }
    }
}

fn whitespace_tokens(rt: &syn::Path, whitespace: Whitespace) -> TokenStream {
    match whitespace {
        Whitespace::Replace => quote!(#rt::Whitespace::Replace),
        Whitespace::Collapse => quote!(#rt::Whitespace::Collapse),
    }
}
