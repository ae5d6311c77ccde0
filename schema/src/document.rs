//! The canonical, dialect independent schema model.

use std::fmt;

use indexmap::IndexMap;

use crate::{
    error::SchemaError,
    shared::{DataType, Facet},
};

pub type Identifier = String;

/// Upper occurrence bound of a relation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MaxOccurs {
    Unbounded,
    Count(u64),
}

impl MaxOccurs {
    /// Value used for [`MaxOccurs::Unbounded`] in integer representations.
    pub const UNBOUNDED_SENTINEL: i64 = -1;

    pub fn from_sentinel(value: i64) -> Self {
        match u64::try_from(value) {
            Ok(count) => Self::Count(count),
            Err(_) => Self::Unbounded,
        }
    }

    pub fn to_sentinel(self) -> i64 {
        match self {
            Self::Unbounded => Self::UNBOUNDED_SENTINEL,
            Self::Count(count) => i64::try_from(count).unwrap_or(i64::MAX),
        }
    }

    pub fn is_unbounded(self) -> bool {
        self == Self::Unbounded
    }

    pub fn max(self, other: Self) -> Self {
        match (self, other) {
            (Self::Count(a), Self::Count(b)) => Self::Count(a.max(b)),
            _ => Self::Unbounded,
        }
    }
}

impl fmt::Display for MaxOccurs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unbounded => write!(f, "unbounded"),
            Self::Count(count) => write!(f, "{count}"),
        }
    }
}

/// Occurrence bounds of a relation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Occurs {
    pub min: u64,
    pub max: MaxOccurs,
}

impl Occurs {
    pub const fn new(min: u64, max: MaxOccurs) -> Self {
        Self { min, max }
    }

    /// Bounds that accept everything either of `self` and `other` accepts, when both end up in
    /// the same slot.
    pub fn widen(self, other: Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: MaxOccurs::Unbounded,
        }
    }

    pub fn is_list(&self) -> bool {
        self.max != MaxOccurs::Count(1) && self.max != MaxOccurs::Count(0)
    }

    pub fn is_optional(&self) -> bool {
        self.min == 0 && !self.is_list()
    }
}

impl Default for Occurs {
    fn default() -> Self {
        Self::new(1, MaxOccurs::Count(1))
    }
}

impl fmt::Display for Occurs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.min, self.max)
    }
}

/// An edge from an element to another entity of the same [`Document`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Relation {
    pub target: Identifier,
    pub occurs: Occurs,
    /// The `+`-joined identifiers of all alternatives sharing this relation's slot.
    pub choice: Option<String>,
}

impl Relation {
    pub fn new(target: impl Into<Identifier>, occurs: Occurs) -> Self {
        Self {
            target: target.into(),
            occurs,
            choice: None,
        }
    }

    pub fn is_list(&self) -> bool {
        self.occurs.is_list()
    }

    pub fn is_optional(&self) -> bool {
        self.occurs.is_optional()
    }

    /// The alternatives of this relation's choice group.
    pub fn choice_members(&self) -> impl Iterator<Item = &str> {
        self.choice.iter().flat_map(|choice| choice.split('+'))
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Element {
    /// Unique within the document. Usually the name, `<name>#<n>` for a later element of the
    /// same name with different content.
    pub identifier: Identifier,
    /// The tag name in instance documents.
    pub name: String,
    pub text: bool,
    pub data_type: Option<DataType>,
    pub facet: Option<Facet>,
    pub element_relations: Vec<Relation>,
    pub attribute_relations: Vec<Relation>,
}

impl Element {
    /// Whether the element carries nothing but (possibly typed) text.
    pub fn is_text_only(&self) -> bool {
        self.text && self.element_relations.is_empty() && self.attribute_relations.is_empty()
    }

    pub fn has_enumeration(&self) -> bool {
        self.facet.as_ref().is_some_and(|facet| !facet.is_empty())
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Attribute {
    pub identifier: Identifier,
    pub name: String,
    pub data_type: Option<DataType>,
    pub facet: Option<Facet>,
}

impl Attribute {
    pub fn has_enumeration(&self) -> bool {
        self.facet.as_ref().is_some_and(|facet| !facet.is_empty())
    }
}

/// A flat collection of elements and attributes connected by relations.
///
/// Entities are kept in the order they were first reached from the roots, parents before their
/// children.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Document {
    /// Identifiers of the elements that may appear as the document element of an instance.
    pub roots: Vec<Identifier>,
    pub elements: IndexMap<Identifier, Element>,
    pub attributes: IndexMap<Identifier, Attribute>,
}

impl Document {
    /// The first root element, or `None` if the grammar has no root at all.
    pub fn start_element(&self) -> Option<&Element> {
        self.roots.first().and_then(|id| self.elements.get(id))
    }

    pub fn element(&self, identifier: &str) -> Option<&Element> {
        self.elements.get(identifier)
    }

    pub fn attribute(&self, identifier: &str) -> Option<&Attribute> {
        self.attributes.get(identifier)
    }

    pub fn root_elements(&self) -> impl Iterator<Item = &Element> {
        self.roots.iter().filter_map(|id| self.elements.get(id))
    }

    /// Checks that every relation points at an entity of this document.
    pub fn validate(&self) -> Result<(), SchemaError> {
        for element in self.elements.values() {
            for relation in &element.element_relations {
                if !self.elements.contains_key(&relation.target) {
                    return Err(dangling(element, relation));
                }
            }
            for relation in &element.attribute_relations {
                if !self.attributes.contains_key(&relation.target) {
                    return Err(dangling(element, relation));
                }
            }
        }
        for root in &self.roots {
            if !self.elements.contains_key(root) {
                return Err(SchemaError::DanglingRelation {
                    from: String::new(),
                    target: root.clone(),
                });
            }
        }
        Ok(())
    }
}

fn dangling(element: &Element, relation: &Relation) -> SchemaError {
    SchemaError::DanglingRelation {
        from: element.identifier.clone(),
        target: relation.target.clone(),
    }
}
