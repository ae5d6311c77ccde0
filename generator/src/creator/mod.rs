//! Turns a [`Document`] into the code model.
//!
//! Every element that is not text-only becomes a class. Classes are created depth-first, so a
//! class always comes after the classes its members refer to, except along a cycle, where the
//! member closing the cycle is boxed.

mod marshal;

use std::collections::{HashMap, HashSet};

use heck::ToPascalCase;
use indexmap::IndexMap;
use quote::quote;
use sb_schema::{DataType, Document, Element, Facet, Identifier, Relation};
use tracing::{debug, warn};

use crate::{
    code::{Argument, Class, Enum, File, Function, MemberVariable, Name, TaggedUnion, UnionVariant},
    naming::{self, ident},
    ConflictPolicy, GeneratorError, GeneratorOptions,
};
use marshal::{BodyGenerator, Cardinality, ChoiceVariant, Slot, SlotKind, Value, Whitespace};

pub struct Creator<'a> {
    document: &'a Document,
    options: &'a GeneratorOptions,
    runtime: syn::Path,
    classes: IndexMap<Name, Class>,
    /// Element each class name was created for.
    processed: HashMap<Name, Identifier>,
    in_progress: Vec<Identifier>,
    /// Every type name of the file: the classes of all elements, reserved up front, and the enums
    /// and unions handed out so far.
    type_names: HashSet<Name>,
    namespace: Option<String>,
}

impl<'a> Creator<'a> {
    pub fn new(document: &'a Document, options: &'a GeneratorOptions) -> Result<Self, GeneratorError> {
        let runtime = syn::parse_str(&options.runtime_crate)
            .map_err(|_| GeneratorError::RuntimePath(options.runtime_crate.clone()))?;
        let type_names = document
            .elements
            .values()
            .filter(|element| !element.is_text_only())
            .map(|element| naming::class_name(&element.name))
            .collect();
        Ok(Self {
            document,
            options,
            runtime,
            classes: IndexMap::new(),
            processed: HashMap::new(),
            in_progress: Vec::new(),
            type_names,
            namespace: options.namespace.as_deref().map(naming::member_name),
        })
    }

    /// Creates the classes of every root and everything reachable from them.
    pub fn create_file(mut self) -> Result<File, GeneratorError> {
        let document = self.document;
        for root in &document.roots {
            self.create_class(root)?;
        }
        let name = document
            .start_element()
            .map(|element| element.name.clone())
            .unwrap_or_else(|| "schema".to_string());
        Ok(File {
            documentation: Some(format!("Bindings for the `{name}` schema.")),
            name,
            classes: self.classes.into_values().collect(),
        })
    }

    pub fn classes(&self) -> impl Iterator<Item = &Class> {
        self.classes.values()
    }

    /// Creates the class for the element `identifier` and returns its name.
    ///
    /// Asking again for an element that already has a class returns the existing name. `None`
    /// means the document has no such element.
    pub fn create_class(&mut self, identifier: &str) -> Result<Option<Name>, GeneratorError> {
        let document = self.document;
        let Some(element) = document.element(identifier) else {
            warn!("No element {identifier:?} in the document");
            return Ok(None);
        };
        let name = naming::class_name(&element.name);

        if self.in_progress.iter().any(|id| id == identifier) {
            return Ok(Some(name));
        }
        if let Some(previous) = self.processed.get(&name) {
            if previous == identifier {
                return Ok(Some(name));
            }
            match self.options.conflict_policy {
                ConflictPolicy::Replace => {
                    warn!("Class {name} for {identifier:?} replaces the one for {previous:?}");
                    if let Some(replaced) = self.classes.get(&name) {
                        for enumeration in &replaced.enums {
                            self.type_names.remove(&enumeration.name);
                        }
                        for union in &replaced.unions {
                            self.type_names.remove(&union.name);
                        }
                    }
                }
                ConflictPolicy::Keep => {
                    debug!("Keeping class {name} for {previous:?}, skipping {identifier:?}");
                    return Ok(Some(name));
                }
                ConflictPolicy::Error => {
                    return Err(GeneratorError::Conflict {
                        class: name,
                        first: previous.clone(),
                        second: identifier.to_string(),
                    })
                }
            }
        }

        debug!("Creating class {name} for {identifier:?}");
        self.processed.insert(name.clone(), identifier.to_string());
        self.in_progress.push(identifier.to_string());
        let class = self.build_class(element, name.clone());
        self.in_progress.pop();
        self.classes.insert(name.clone(), class?);
        Ok(Some(name))
    }

    fn build_class(&mut self, element: &'a Element, name: Name) -> Result<Class, GeneratorError> {
        let mut builder = ClassBuilder::new(name, &element.name);
        builder.class.namespace.clone_from(&self.namespace);

        let mut element_slots = Vec::new();
        let mut groups = HashSet::new();
        for relation in &element.element_relations {
            match &relation.choice {
                Some(group) if groups.insert(group.as_str()) => {
                    if let Some(slot) = self.choice_slot(&mut builder, element, group)? {
                        element_slots.push(slot);
                    }
                }
                Some(_) => {}
                None => {
                    if let Some(slot) = self.child_slot(&mut builder, relation)? {
                        element_slots.push(slot);
                    }
                }
            }
        }

        let mut slots = Vec::new();
        for relation in &element.attribute_relations {
            let Some(attribute) = self.document.attribute(&relation.target) else {
                warn!("Dropping unknown attribute {:?}", relation.target);
                continue;
            };
            let base = naming::member_name(&attribute.name);
            let member = if builder.is_taken(&base) {
                builder.unique(&format!("{base}_attr"))
            } else {
                builder.unique(&base)
            };
            let (value, value_type) = builder.scalar(
                &mut self.type_names,
                attribute.data_type,
                attribute.facet.as_ref(),
                &member,
            );
            slots.push(Slot {
                item: member.clone(),
                member,
                cardinality: if relation.is_optional() {
                    Cardinality::Optional
                } else {
                    Cardinality::One
                },
                value_type,
                boxed: None,
                kind: SlotKind::Attribute {
                    tag: attribute.name.clone(),
                    value,
                },
            });
        }

        if element.text {
            let member = if builder.is_taken("value") {
                builder.unique("value_text")
            } else {
                builder.unique("value")
            };
            let (value, value_type) = builder.scalar(
                &mut self.type_names,
                element.data_type,
                element.facet.as_ref(),
                &member,
            );
            slots.push(Slot {
                item: member.clone(),
                member,
                cardinality: Cardinality::One,
                value_type,
                boxed: None,
                kind: SlotKind::Text { value },
            });
        }
        slots.append(&mut element_slots);

        let is_root = self.document.roots.iter().any(|root| *root == element.identifier);
        Ok(builder.finish(
            slots,
            &self.runtime,
            &self.options.runtime_crate,
            is_root && self.options.root_functions,
        ))
    }

    /// Type of one value of the element `target`: a scalar for text-only elements, a class
    /// otherwise. The class is boxed when it is still being created further up.
    fn child_value(
        &mut self,
        builder: &mut ClassBuilder,
        target: &'a Element,
        prefix: &str,
        boxable: bool,
    ) -> Result<Option<(Value, String, Option<Name>)>, GeneratorError> {
        if target.is_text_only() {
            let (value, value_type) = builder.scalar(
                &mut self.type_names,
                target.data_type,
                target.facet.as_ref(),
                prefix,
            );
            return Ok(Some((value, value_type, None)));
        }
        let Some(class) = self.create_class(&target.identifier)? else {
            return Ok(None);
        };
        let cyclic = self.in_progress.iter().any(|id| *id == target.identifier);
        if cyclic && boxable {
            Ok(Some((Value::Class, format!("Box<{class}>"), Some(class))))
        } else {
            Ok(Some((Value::Class, class, None)))
        }
    }

    fn child_slot(
        &mut self,
        builder: &mut ClassBuilder,
        relation: &Relation,
    ) -> Result<Option<Slot>, GeneratorError> {
        let document = self.document;
        let Some(target) = document.element(&relation.target) else {
            warn!("Dropping unknown element {:?}", relation.target);
            return Ok(None);
        };
        let item = naming::member_name(&target.name);
        let member = if relation.is_list() {
            builder.unique(&format!("{item}_list"))
        } else {
            builder.unique(&item)
        };
        let list = relation.is_list();
        let Some((value, value_type, boxed)) = self.child_value(builder, target, &member, !list)? else {
            return Ok(None);
        };
        let cardinality = if list {
            Cardinality::List
        } else if relation.is_optional() || boxed.is_some() {
            Cardinality::Optional
        } else {
            Cardinality::One
        };
        Ok(Some(Slot {
            member,
            item,
            cardinality,
            value_type,
            boxed,
            kind: SlotKind::Child {
                tag: target.name.clone(),
                value,
            },
        }))
    }

    /// One member holding whichever alternative of the choice `group` is present.
    fn choice_slot(
        &mut self,
        builder: &mut ClassBuilder,
        element: &'a Element,
        group: &str,
    ) -> Result<Option<Slot>, GeneratorError> {
        let document = self.document;
        let relations: Vec<_> = element
            .element_relations
            .iter()
            .filter(|relation| relation.choice.as_deref() == Some(group))
            .collect();
        let list = relations.iter().any(|relation| relation.is_list());
        let union_name = unique_type_name(
            &mut self.type_names,
            format!("{}Choice", builder.class.name),
        );

        let mut variants = Vec::new();
        let mut union_variants = Vec::new();
        for relation in relations {
            let Some(target) = document.element(&relation.target) else {
                warn!("Dropping unknown alternative {:?}", relation.target);
                continue;
            };
            let prefix = naming::member_name(&target.name);
            let Some((value, value_type, _)) = self.child_value(builder, target, &prefix, true)? else {
                continue;
            };
            let name = naming::class_name(&target.name);
            let name = if union_variants.iter().any(|v: &UnionVariant| v.name == name) {
                format!("Alternative{}", union_variants.len())
            } else {
                name
            };
            union_variants.push(UnionVariant {
                name: name.clone(),
                type_: value_type,
            });
            variants.push(ChoiceVariant {
                name,
                tag: target.name.clone(),
                value,
            });
        }
        if variants.is_empty() {
            return Ok(None);
        }

        builder.class.unions.push(TaggedUnion {
            name: union_name.clone(),
            variants: union_variants,
            documentation: Some(format!("Alternatives of `{group}`.")),
        });
        let member = builder.unique(if list { "choice_list" } else { "choice" });
        Ok(Some(Slot {
            member,
            item: "choice".to_string(),
            cardinality: if list {
                Cardinality::List
            } else {
                Cardinality::Optional
            },
            value_type: union_name.clone(),
            boxed: None,
            kind: SlotKind::Choice {
                union: union_name,
                variants,
            },
        }))
    }
}

/// Class under construction together with the names already handed out in it.
struct ClassBuilder {
    class: Class,
    tag: String,
    taken: HashSet<String>,
    conversions: Vec<Function>,
}

impl ClassBuilder {
    fn new(name: Name, tag: &str) -> Self {
        let mut class = Class::new(name);
        class.documentation = Some(format!("Binding for the `<{tag}>` element."));
        Self {
            class,
            tag: tag.to_string(),
            taken: HashSet::new(),
            conversions: Vec::new(),
        }
    }

    fn is_taken(&self, name: &str) -> bool {
        self.taken.contains(name)
    }

    /// Reserves `base`, or `base` with the smallest free numeric suffix.
    fn unique(&mut self, base: &str) -> String {
        let mut name = base.to_string();
        let mut counter = 2;
        while self.taken.contains(&name) {
            name = format!("{base}{counter}");
            counter += 1;
        }
        self.taken.insert(name.clone());
        name
    }

    /// Value and type of a scalar. Enumerations get their own enum, named after the class and
    /// `prefix`, along with the conversion functions.
    fn scalar(
        &mut self,
        type_names: &mut HashSet<Name>,
        data_type: Option<DataType>,
        facet: Option<&Facet>,
        prefix: &str,
    ) -> (Value, String) {
        let Some(facet) = facet.filter(|facet| !facet.is_empty()) else {
            let data_type = data_type.unwrap_or_default();
            return (
                Value::Scalar {
                    whitespace: whitespace(data_type),
                },
                rust_type(data_type).to_string(),
            );
        };

        let name = unique_type_name(
            type_names,
            format!("{}{}", self.class.name, prefix.to_pascal_case()),
        );
        let enumeration = Enum {
            name: name.clone(),
            values: facet.values.clone(),
            combinable: facet.combinable,
            documentation: Some(format!("Values of `{prefix}`.")),
        };
        self.conversions.extend(conversions(&enumeration, prefix));
        self.class.enums.push(enumeration);

        let value = Value::Enum {
            prefix: prefix.to_string(),
            combinable: facet.combinable,
        };
        if facet.combinable {
            (value, format!("Vec<{name}>"))
        } else {
            (value, name)
        }
    }

    fn finish(
        mut self,
        slots: Vec<Slot>,
        runtime: &syn::Path,
        rt: &str,
        root_functions: bool,
    ) -> Class {
        for slot in &slots {
            self.class.members.push(MemberVariable {
                name: slot.member.clone(),
                type_: member_type(slot),
                documentation: None,
            });
        }
        for slot in &slots {
            self.class.functions.extend(accessors(slot));
        }
        self.class.functions.append(&mut self.conversions);

        if root_functions {
            self.class.functions.extend(root_functions_for(runtime, rt));
        }

        let generator = BodyGenerator {
            runtime,
            tag: &self.tag,
            slots: &slots,
        };
        let implements = format!("{rt}::Element");
        self.class.functions.push(Function {
            arguments: vec![Argument::new("writer", format!("&mut {rt}::Writer"))],
            return_type: Some(format!("Result<(), {rt}::Error>")),
            body: generator.marshal(),
            is_const: true,
            implements: Some(implements.clone()),
            ..Function::new("marshal")
        });
        self.class.functions.push(Function {
            arguments: vec![Argument::new("node", format!("{rt}::Node<'_, '_>"))],
            return_type: Some(format!("Result<Self, {rt}::Error>")),
            body: generator.demarshal(),
            is_static: true,
            implements: Some(implements.clone()),
            ..Function::new("demarshal")
        });
        self.class.base_classes.push(implements);
        self.class
    }
}

/// Reserves `base`, or `base` with the smallest free numeric suffix, as a type name.
fn unique_type_name(type_names: &mut HashSet<Name>, base: String) -> Name {
    let mut name = base.clone();
    let mut counter = 2;
    while !type_names.insert(name.clone()) {
        name = format!("{base}{counter}");
        counter += 1;
    }
    name
}

fn whitespace(data_type: DataType) -> Option<Whitespace> {
    match data_type {
        DataType::String => None,
        DataType::NormalizedString => Some(Whitespace::Replace),
        DataType::Token | DataType::Date | DataType::DateTime => Some(Whitespace::Collapse),
        // Trimmed by the scalar conversion itself
        DataType::Integer | DataType::Int | DataType::Decimal | DataType::Boolean => None,
    }
}

fn rust_type(data_type: DataType) -> &'static str {
    match data_type {
        DataType::String
        | DataType::NormalizedString
        | DataType::Token
        | DataType::Date
        | DataType::DateTime => "String",
        DataType::Integer => "i64",
        DataType::Int => "i32",
        DataType::Decimal => "f64",
        DataType::Boolean => "bool",
    }
}

fn member_type(slot: &Slot) -> String {
    match slot.cardinality {
        Cardinality::One => slot.value_type.clone(),
        Cardinality::Optional => format!("Option<{}>", slot.value_type),
        Cardinality::List => format!("Vec<{}>", slot.value_type),
    }
}

/// Borrowed form of `value_type` returned by getters, and whether it is reached via `as_deref`.
fn borrowed(slot: &Slot) -> (String, bool) {
    let value_type = slot.value_type.as_str();
    if value_type == "String" {
        ("&str".to_string(), true)
    } else if let Some(inner) = value_type.strip_prefix("Vec<").and_then(|t| t.strip_suffix('>')) {
        (format!("&[{inner}]"), true)
    } else if let Some(inner) = &slot.boxed {
        (format!("&{inner}"), true)
    } else {
        (format!("&{value_type}"), false)
    }
}

fn accessors(slot: &Slot) -> Vec<Function> {
    let member = ident(&slot.member);
    let value_type = &slot.value_type;
    let mut functions = Vec::new();

    let (return_type, body) = match slot.cardinality {
        Cardinality::One => (borrowed(slot).0, quote!(&self.#member)),
        Cardinality::Optional => match borrowed(slot) {
            (borrowed, true) => (format!("Option<{borrowed}>"), quote!(self.#member.as_deref())),
            (borrowed, false) => (format!("Option<{borrowed}>"), quote!(self.#member.as_ref())),
        },
        Cardinality::List => (format!("&[{value_type}]"), quote!(&self.#member)),
    };
    functions.push(Function {
        return_type: Some(return_type),
        body: body.to_string(),
        is_const: true,
        ..Function::new(slot.member.clone())
    });

    let setter = format!("set_{}", slot.member);
    functions.push(match (slot.cardinality, &slot.boxed) {
        (Cardinality::One, _) => Function {
            arguments: vec![Argument::new("value", value_type.clone())],
            body: quote!(self.#member = value;).to_string(),
            ..Function::new(setter)
        },
        (Cardinality::Optional, Some(inner)) => Function {
            arguments: vec![Argument::new("value", format!("Option<{inner}>"))],
            body: quote!(self.#member = value.map(Box::new);).to_string(),
            ..Function::new(setter)
        },
        (Cardinality::Optional, None) => Function {
            arguments: vec![Argument::new("value", format!("Option<{value_type}>"))],
            body: quote!(self.#member = value;).to_string(),
            ..Function::new(setter)
        },
        (Cardinality::List, _) => Function {
            arguments: vec![Argument::new("values", format!("Vec<{value_type}>"))],
            body: quote!(self.#member = values;).to_string(),
            ..Function::new(setter)
        },
    });

    if slot.cardinality == Cardinality::List {
        functions.push(Function {
            arguments: vec![Argument::new("value", value_type.clone())],
            body: quote!(self.#member.push(value);).to_string(),
            ..Function::new(format!("add_{}", slot.item))
        });
    }
    functions
}

/// `<prefix>_from_string` and `<prefix>_to_string`. Unknown values map to the invalid variant,
/// which in turn is written as an empty string.
fn conversions(enumeration: &Enum, prefix: &str) -> [Function; 2] {
    let name = ident(&enumeration.name);
    let invalid = ident(Enum::INVALID);
    let variants = enumeration.variants();
    let from_arms = variants.iter().map(|(variant, value)| {
        let variant = ident(variant);
        quote!(#value => #name::#variant,)
    });
    let to_arms = variants.iter().map(|(variant, value)| {
        let variant = ident(variant);
        quote!(#name::#variant => #value,)
    });

    [
        Function {
            arguments: vec![Argument::new("value", "&str")],
            return_type: Some(enumeration.name.clone()),
            body: quote! {
                match value {
                    #(#from_arms)*
                    _ => #name::#invalid,
                }
            }
            .to_string(),
            is_static: true,
            ..Function::new(format!("{prefix}_from_string"))
        },
        Function {
            arguments: vec![Argument::new("value", enumeration.name.clone())],
            return_type: Some("&'static str".to_string()),
            body: quote! {
                match value {
                    #(#to_arms)*
                    #name::#invalid => "",
                }
            }
            .to_string(),
            is_static: true,
            ..Function::new(format!("{prefix}_to_string"))
        },
    ]
}

fn root_functions_for(runtime: &syn::Path, rt: &str) -> Vec<Function> {
    vec![
        Function {
            arguments: vec![Argument::new("text", "&str")],
            return_type: Some(format!("Result<Self, {rt}::Error>")),
            body: quote!(#runtime::from_str(text)).to_string(),
            is_static: true,
            documentation: Some("Reads an instance document from `text`.".to_string()),
            ..Function::new("parse_string")
        },
        Function {
            arguments: vec![Argument::new("path", "&std::path::Path")],
            return_type: Some(format!("Result<Self, {rt}::Error>")),
            body: quote!(#runtime::from_file(path)).to_string(),
            is_static: true,
            ..Function::new("parse_file")
        },
        Function {
            return_type: Some(format!("Result<String, {rt}::Error>")),
            body: quote!(#runtime::to_string(self)).to_string(),
            is_const: true,
            ..Function::new("write_string")
        },
        Function {
            arguments: vec![Argument::new("path", "&std::path::Path")],
            return_type: Some(format!("Result<(), {rt}::Error>")),
            body: quote!(#runtime::to_file(self, path)).to_string(),
            is_const: true,
            documentation: Some("Writes the document, including the XML declaration.".to_string()),
            ..Function::new("write_file")
        },
    ]
}
