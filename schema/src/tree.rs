//! The pattern tree produced by the grammar front-ends.
//!
//! Nodes are created while parsing, mutated in place while references are substituted, and only
//! read afterwards, when the canonical [`Document`](crate::Document) is built from them.

use crate::{
    pattern::Pattern,
    shared::{DataType, Facet},
};

/// An element pattern. Also used as the body of a definition and as the synthetic wrapper around
/// the `start` pattern, in which case the name is the definition name or empty.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Element {
    pub name: String,
    pub has_text: bool,
    pub is_empty: bool,
    pub elements: Vec<Element>,
    pub attributes: Vec<Attribute>,
    pub references: Vec<Reference>,
    /// Occurrence of this element relative to its parent.
    pub pattern: Pattern,
    pub data_type: Option<DataType>,
    pub facet: Option<Facet>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// The unnamed wrapper collecting the content of `start`.
    pub fn start() -> Self {
        Self::default()
    }

    pub fn with_pattern(mut self, pattern: Pattern) -> Self {
        self.pattern = pattern;
        self
    }

    pub fn facet_mut(&mut self) -> &mut Facet {
        self.facet.get_or_insert_with(Facet::default)
    }

    pub fn element(&self, name: &str) -> Option<&Element> {
        self.elements.iter().find(|e| e.name == name)
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Whether `self` and `other` describe the same element, wherever each of them occurs. Only
    /// the occurrence pattern relative to the parent may differ.
    pub fn same_content(&self, other: &Element) -> bool {
        self.name == other.name
            && self.has_text == other.has_text
            && self.is_empty == other.is_empty
            && self.data_type == other.data_type
            && self.facet == other.facet
            && self.attributes == other.attributes
            && self.references == other.references
            && self.elements == other.elements
    }

    /// References that are still waiting to be substituted.
    pub fn unresolved_references(&self) -> impl Iterator<Item = &Reference> {
        self.references.iter().filter(|r| !r.substituted)
    }

    /// Walks this element and all of its descendants, depth-first.
    pub fn walk(&self, f: &mut impl FnMut(&Element)) {
        f(self);
        for child in &self.elements {
            child.walk(f);
        }
    }
}

/// An attribute pattern.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Attribute {
    pub name: String,
    pattern: Pattern,
    pub data_type: Option<DataType>,
    pub facet: Option<Facet>,
    /// Name of a definition describing the attribute's value (`<attribute><ref/></attribute>`),
    /// folded into `data_type`/`facet` by the resolver.
    pub value_reference: Option<String>,
}

impl Attribute {
    pub fn new(name: impl Into<String>, pattern: Pattern) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.for_attribute(),
            ..Self::default()
        }
    }

    /// The attribute's occurrence pattern, which never carries `choice`.
    pub fn pattern(&self) -> Pattern {
        self.pattern
    }

    pub fn merge_pattern(&mut self, pattern: Pattern) {
        self.pattern = self.pattern.merged(pattern).for_attribute();
    }

    pub fn is_required(&self) -> bool {
        self.pattern.to_occurs().min > 0
    }
}

/// A use-site pointer to a named definition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reference {
    pub name: String,
    /// Cardinality at the use site, merged into the inlined content.
    pub pattern: Pattern,
    pub substituted: bool,
}

impl Reference {
    pub fn new(name: impl Into<String>, pattern: Pattern) -> Self {
        Self {
            name: name.into(),
            pattern,
            substituted: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_pattern_never_carries_choice() {
        let mut attribute = Attribute::new("lang", Pattern::new().with_choice());
        assert!(!attribute.pattern().choice);
        assert!(!attribute.is_required());

        let mut required = Attribute::new("id", Pattern::new());
        assert!(required.is_required());
        required.merge_pattern(Pattern::new().with_choice());
        assert!(!required.pattern().choice);
        assert!(!required.is_required());

        attribute.merge_pattern(Pattern::new().with_zero_or_more());
        assert!(attribute.pattern().zero_or_more);
    }

    #[test]
    fn content_ignores_the_occurrence_pattern() {
        let mut title = Element::new("title");
        title.has_text = true;
        let optional = title.clone().with_pattern(Pattern::new().with_optional());
        assert!(title.same_content(&optional));

        let mut localized = title.clone();
        localized.attributes.push(Attribute::new("lang", Pattern::new()));
        assert!(!title.same_content(&localized));
    }

    #[test]
    fn walk_visits_descendants_in_order() {
        let mut book = Element::new("book");
        let mut chapter = Element::new("chapter");
        chapter.elements.push(Element::new("title"));
        book.elements.push(chapter);
        book.elements.push(Element::new("author"));

        let mut names = Vec::new();
        book.walk(&mut |e| names.push(e.name.clone()));
        assert_eq!(names, ["book", "chapter", "title", "author"]);
    }
}
