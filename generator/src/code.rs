//! Language independent model of the generated code: classes with member variables, functions,
//! enumerations and tagged unions. Function bodies are kept as literal source text.

use crate::naming;

pub type Name = String;

/// One generated source file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct File {
    pub name: Name,
    pub documentation: Option<String>,
    pub classes: Vec<Class>,
}

impl File {
    pub fn class(&self, name: &str) -> Option<&Class> {
        self.classes.iter().find(|c| c.name == name)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Class {
    pub name: Name,
    pub namespace: Option<String>,
    pub documentation: Option<String>,
    /// Traits the class implements. Functions name the one they belong to via
    /// [`Function::implements`].
    pub base_classes: Vec<String>,
    pub members: Vec<MemberVariable>,
    pub functions: Vec<Function>,
    pub enums: Vec<Enum>,
    pub unions: Vec<TaggedUnion>,
}

impl Class {
    pub fn new(name: impl Into<Name>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn member(&self, name: &str) -> Option<&MemberVariable> {
        self.members.iter().find(|m| m.name == name)
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn has_member(&self, name: &str) -> bool {
        self.member(name).is_some()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MemberVariable {
    pub name: Name,
    pub type_: String,
    pub documentation: Option<String>,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Access {
    #[default]
    Public,
    Private,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Argument {
    pub name: Name,
    pub type_: String,
}

impl Argument {
    pub fn new(name: impl Into<Name>, type_: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_: type_.into(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Function {
    pub name: Name,
    pub return_type: Option<String>,
    pub arguments: Vec<Argument>,
    pub body: String,
    pub access: Access,
    /// Takes no receiver.
    pub is_static: bool,
    /// Takes `&self` rather than `&mut self`.
    pub is_const: bool,
    /// The base class this function is part of, if any.
    pub implements: Option<String>,
    pub documentation: Option<String>,
}

impl Function {
    pub fn new(name: impl Into<Name>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Enum {
    pub name: Name,
    /// Lexical values in declaration order.
    pub values: Vec<String>,
    /// Values are bit flags and may be combined.
    pub combinable: bool,
    pub documentation: Option<String>,
}

impl Enum {
    /// Variant used for values outside of the enumeration.
    pub const INVALID: &'static str = "Invalid";

    /// Variant names paired with the values they stand for, in declaration order.
    pub fn variants(&self) -> Vec<(String, &str)> {
        let mut taken = vec![Self::INVALID.to_string()];
        let mut variants = Vec::with_capacity(self.values.len());
        for value in &self.values {
            let base = naming::variant_name(value);
            let mut name = base.clone();
            let mut counter = 1;
            while taken.contains(&name) {
                name = if counter == 1 && base == Self::INVALID {
                    format!("{base}Value")
                } else {
                    format!("{base}{counter}")
                };
                counter += 1;
            }
            taken.push(name.clone());
            variants.push((name, value.as_str()));
        }
        variants
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TaggedUnion {
    pub name: Name,
    pub variants: Vec<UnionVariant>,
    pub documentation: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct UnionVariant {
    pub name: Name,
    pub type_: String,
}
