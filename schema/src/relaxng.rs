//! Front-end for RelaxNG grammars in XML syntax.

use roxmltree::Node;
use tracing::{debug, trace, warn};

use crate::{
    definitions::DefinitionTable,
    error::{required_attribute, SchemaError},
    pattern::Pattern,
    shared::DataType,
    tree::{Attribute, Element, Reference},
};

pub const RELAXNG_NAMESPACE: &str = "http://relaxng.org/ns/structure/1.0";

/// The closed set of grammar constructs the parser knows about.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GrammarNode {
    Grammar,
    Start,
    Define,
    Div,
    Include,
    Element,
    Attribute,
    Ref,
    ParentRef,
    Text,
    Empty,
    Optional,
    ZeroOrMore,
    OneOrMore,
    Choice,
    Group,
    Interleave,
    Mixed,
    List,
    Data,
    Value,
    Name,
    NotAllowed,
    /// An annotation from a foreign namespace, e.g. `a:documentation`.
    Foreign,
    Unknown(String),
}

impl GrammarNode {
    pub fn classify(node: Node) -> Self {
        match node.tag_name().namespace() {
            Some(namespace) if namespace != RELAXNG_NAMESPACE => return Self::Foreign,
            _ => {}
        }
        match node.tag_name().name() {
            "grammar" => Self::Grammar,
            "start" => Self::Start,
            "define" => Self::Define,
            "div" => Self::Div,
            "include" => Self::Include,
            "element" => Self::Element,
            "attribute" => Self::Attribute,
            "ref" => Self::Ref,
            "parentRef" => Self::ParentRef,
            "text" => Self::Text,
            "empty" => Self::Empty,
            "optional" => Self::Optional,
            "zeroOrMore" => Self::ZeroOrMore,
            "oneOrMore" => Self::OneOrMore,
            "choice" => Self::Choice,
            "group" => Self::Group,
            "interleave" => Self::Interleave,
            "mixed" => Self::Mixed,
            "list" => Self::List,
            "data" => Self::Data,
            "value" => Self::Value,
            "name" => Self::Name,
            "notAllowed" => Self::NotAllowed,
            other => Self::Unknown(other.to_string()),
        }
    }
}

/// Recursive-descent walker turning a RelaxNG document into a pattern tree.
///
/// Every `define` encountered is added to the borrowed [`DefinitionTable`].
pub struct GrammarParser<'d> {
    definitions: &'d mut DefinitionTable,
    /// Number of `choice` patterns seen so far.
    choices: u32,
}

impl<'d> GrammarParser<'d> {
    pub fn new(definitions: &'d mut DefinitionTable) -> Self {
        Self {
            definitions,
            choices: 0,
        }
    }

    /// Parses a `grammar` or a bare `element` pattern and returns the start wrapper.
    pub fn parse(&mut self, root: Node) -> Result<Element, SchemaError> {
        match GrammarNode::classify(root) {
            GrammarNode::Grammar => {
                let mut start = None;
                self.parse_grammar_content(root, &mut start)?;
                start.ok_or(SchemaError::MissingStart)
            }
            GrammarNode::Element => {
                let mut start = Element::start();
                self.parse_pattern(root, Pattern::new(), &mut start)?;
                Ok(start)
            }
            _ => Err(SchemaError::UnsupportedRoot(
                root.tag_name().name().to_string(),
            )),
        }
    }

    fn parse_grammar_content(
        &mut self,
        grammar: Node,
        start: &mut Option<Element>,
    ) -> Result<(), SchemaError> {
        for child in grammar.children().filter(Node::is_element) {
            match GrammarNode::classify(child) {
                GrammarNode::Start => {
                    // Multiple `start`s (via `combine`) are merged into one wrapper
                    let start = start.get_or_insert_with(Element::start);
                    self.parse_children(child, Pattern::new(), start)?;
                }
                GrammarNode::Define => self.parse_define(child)?,
                GrammarNode::Div => self.parse_grammar_content(child, start)?,
                GrammarNode::Foreign => {}
                GrammarNode::Include => {
                    warn!(
                        "Skipping <include href={:?}>, external grammars are not supported",
                        child.attribute("href").unwrap_or_default()
                    );
                }
                other => warn!("Skipping unexpected {other:?} at grammar level"),
            }
        }
        Ok(())
    }

    fn parse_define(&mut self, define: Node) -> Result<(), SchemaError> {
        let name = required_attribute(define, "name")?;
        let mut body = Element::new(name);
        self.parse_children(define, Pattern::new(), &mut body)?;
        debug!(
            "Parsed definition {name:?} ({} elements, {} attributes, {} references)",
            body.elements.len(),
            body.attributes.len(),
            body.references.len()
        );
        self.definitions.add(name, body);
        Ok(())
    }

    fn parse_children(
        &mut self,
        node: Node,
        pattern: Pattern,
        target: &mut Element,
    ) -> Result<(), SchemaError> {
        for child in node.children().filter(Node::is_element) {
            self.parse_pattern(child, pattern, target)?;
        }
        Ok(())
    }

    /// Parses one pattern node into `target`. `pattern` accumulates the modifiers seen since the
    /// last element boundary.
    fn parse_pattern(
        &mut self,
        node: Node,
        pattern: Pattern,
        target: &mut Element,
    ) -> Result<(), SchemaError> {
        match GrammarNode::classify(node) {
            GrammarNode::Element => {
                let element = self.parse_element(node, pattern)?;
                target.elements.push(element);
            }
            GrammarNode::Attribute => {
                let attribute = self.parse_attribute(node, pattern)?;
                target.attributes.push(attribute);
            }
            GrammarNode::Ref => {
                let name = required_attribute(node, "name")?;
                target.references.push(Reference::new(name, pattern));
            }
            GrammarNode::Text => target.has_text = true,
            GrammarNode::Empty => target.is_empty = true,
            GrammarNode::Optional => self.parse_children(node, pattern.with_optional(), target)?,
            GrammarNode::ZeroOrMore => {
                self.parse_children(node, pattern.with_zero_or_more(), target)?
            }
            GrammarNode::OneOrMore => {
                self.parse_children(node, pattern.with_one_or_more(), target)?
            }
            GrammarNode::Choice => {
                self.choices += 1;
                self.parse_children(node, pattern.in_choice(self.choices), target)?
            }
            GrammarNode::Group | GrammarNode::Interleave => {
                self.parse_children(node, pattern, target)?
            }
            GrammarNode::Mixed => {
                target.has_text = true;
                self.parse_children(node, pattern, target)?;
            }
            GrammarNode::List => {
                self.parse_children(node, pattern, target)?;
                match target.facet.as_mut() {
                    Some(facet) => facet.combinable = true,
                    // A list of plain data is kept as text
                    None => target.has_text = true,
                }
            }
            GrammarNode::Data => {
                let data_type = required_attribute(node, "type")?;
                target.has_text = true;
                target.data_type = Some(DataType::from_xsd_name(local_name(data_type)));
            }
            GrammarNode::Value => {
                target.has_text = true;
                let value = node.text().unwrap_or_default().trim();
                target.facet_mut().push(value);
            }
            // Consumed by `element_name()`
            GrammarNode::Name | GrammarNode::Foreign => {}
            GrammarNode::Grammar
            | GrammarNode::Start
            | GrammarNode::Define
            | GrammarNode::Div
            | GrammarNode::Include
            | GrammarNode::ParentRef
            | GrammarNode::NotAllowed => {
                warn!(
                    "Skipping unsupported <{}> inside {:?}",
                    node.tag_name().name(),
                    target.name
                );
            }
            GrammarNode::Unknown(tag) => {
                warn!("Skipping unknown pattern <{tag}> inside {:?}", target.name);
            }
        }
        Ok(())
    }

    fn parse_element(&mut self, node: Node, pattern: Pattern) -> Result<Element, SchemaError> {
        let name = element_name(node)?;
        trace!("element {name:?} with {pattern:?}");
        let mut element = Element::new(name).with_pattern(pattern);
        // Cardinality is local to the element: its content starts from an empty pattern
        self.parse_children(node, Pattern::new(), &mut element)?;
        Ok(element)
    }

    fn parse_attribute(&mut self, node: Node, pattern: Pattern) -> Result<Attribute, SchemaError> {
        let name = element_name(node)?;
        let mut attribute = Attribute::new(name, pattern);

        // The value is parsed like element content, then folded into the attribute
        let mut content = Element::new(attribute.name.as_str());
        self.parse_children(node, Pattern::new(), &mut content)?;

        if !content.elements.is_empty() || !content.attributes.is_empty() {
            warn!(
                "Ignoring nested elements/attributes in attribute {:?}",
                attribute.name
            );
        }
        match content.references.as_slice() {
            [] => {}
            [reference] => attribute.value_reference = Some(reference.name.clone()),
            [first, ..] => {
                warn!(
                    "Attribute {:?} refers to several definitions, only {:?} is used",
                    attribute.name, first.name
                );
                attribute.value_reference = Some(first.name.clone());
            }
        }
        attribute.data_type = content.data_type;
        attribute.facet = content.facet.filter(|facet| !facet.is_empty());
        Ok(attribute)
    }
}

/// Name of an `element` or `attribute`: either its `name` attribute or a `<name>` child.
fn element_name(node: Node) -> Result<String, SchemaError> {
    if let Some(name) = node.attribute("name") {
        return Ok(local_name(name.trim()).to_string());
    }
    node.children()
        .find(|c| GrammarNode::classify(*c) == GrammarNode::Name)
        .and_then(|c| c.text())
        .map(|name| local_name(name.trim()).to_string())
        .ok_or_else(|| SchemaError::missing_name(node))
}

/// Strips a namespace prefix from a QName.
pub(crate) fn local_name(qname: &str) -> &str {
    qname.rsplit_once(':').map_or(qname, |(_, local)| local)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(grammar: &str) -> (Element, DefinitionTable) {
        let document = roxmltree::Document::parse(grammar).unwrap();
        let mut definitions = DefinitionTable::new();
        let start = GrammarParser::new(&mut definitions)
            .parse(document.root_element())
            .unwrap();
        (start, definitions)
    }

    #[test]
    fn parses_bare_element_pattern() {
        let (start, definitions) = parse(
            r#"<element name="book" xmlns="http://relaxng.org/ns/structure/1.0">
                <attribute name="isbn"><text/></attribute>
                <element name="title"><text/></element>
                <zeroOrMore><element name="author"><text/></element></zeroOrMore>
            </element>"#,
        );
        assert!(definitions.is_empty());
        let book = start.element("book").unwrap();
        assert!(book.pattern.is_empty());
        assert!(book.attribute("isbn").unwrap().is_required());
        assert!(book.element("title").unwrap().has_text);
        let author = book.element("author").unwrap();
        assert!(author.pattern.zero_or_more);
        assert!(author.has_text);
    }

    #[test]
    fn element_boundary_resets_pattern() {
        let (start, _) = parse(
            r#"<element name="a" xmlns="http://relaxng.org/ns/structure/1.0">
                <optional>
                    <element name="b">
                        <element name="c"><text/></element>
                    </element>
                </optional>
            </element>"#,
        );
        let b = start.element("a").unwrap().element("b").unwrap();
        assert!(b.pattern.optional);
        assert!(b.element("c").unwrap().pattern.is_empty());
    }

    #[test]
    fn modifiers_accumulate_until_element() {
        let (start, _) = parse(
            r#"<element name="a" xmlns="http://relaxng.org/ns/structure/1.0">
                <optional><zeroOrMore><choice>
                    <element name="b"><empty/></element>
                    <ref name="c"/>
                </choice></zeroOrMore></optional>
            </element>"#,
        );
        let a = start.element("a").unwrap();
        let b = a.element("b").unwrap();
        assert!(b.pattern.optional && b.pattern.zero_or_more && b.pattern.choice);
        assert!(b.is_empty);
        let reference = &a.references[0];
        assert_eq!(reference.name, "c");
        assert_eq!(reference.pattern, b.pattern);
        assert!(!reference.substituted);
    }

    #[test]
    fn separate_choices_get_their_own_groups() {
        let (start, _) = parse(
            r#"<element name="r" xmlns="http://relaxng.org/ns/structure/1.0">
                <choice><element name="a"><empty/></element><element name="b"><empty/></element></choice>
                <choice><element name="c"><empty/></element><element name="d"><empty/></element></choice>
            </element>"#,
        );
        let r = start.element("r").unwrap();
        let group = |name: &str| r.element(name).unwrap().pattern.choice_group;
        assert!(group("a").is_some());
        assert_eq!(group("a"), group("b"));
        assert_eq!(group("c"), group("d"));
        assert_ne!(group("a"), group("c"));
    }

    #[test]
    fn populates_definition_table() {
        let (start, definitions) = parse(
            r#"<grammar xmlns="http://relaxng.org/ns/structure/1.0"
                        xmlns:a="http://relaxng.org/ns/compatibility/annotations/1.0">
                <a:documentation>Books</a:documentation>
                <start><ref name="book"/></start>
                <define name="book">
                    <element name="book"><ref name="inline"/></element>
                </define>
                <div>
                    <define name="inline"><element name="em"><text/></element></define>
                </div>
                <define name="inline" combine="choice"><element name="strong"><text/></element></define>
            </grammar>"#,
        );
        assert!(start.name.is_empty());
        assert_eq!(start.references[0].name, "book");
        assert_eq!(definitions.len(), 2);
        assert_eq!(definitions.get("inline").map(<[_]>::len), Some(2));
        let book = &definitions.get("book").unwrap()[0];
        assert_eq!(book.name, "book");
        assert_eq!(book.elements[0].name, "book");
    }

    #[test]
    fn reads_enumerations_and_datatypes() {
        let (start, _) = parse(
            r#"<element xmlns="http://relaxng.org/ns/structure/1.0">
                <name>item</name>
                <attribute name="kind">
                    <choice><value>hardcover</value><value>paperback</value></choice>
                </attribute>
                <optional><attribute name="flags"><list><oneOrMore><choice>
                    <value>new</value><value>used</value>
                </choice></oneOrMore></list></attribute></optional>
                <element name="count"><data type="xsd:int"/></element>
            </element>"#,
        );
        let item = start.element("item").unwrap();
        let kind = item.attribute("kind").unwrap();
        let facet = kind.facet.as_ref().unwrap();
        assert_eq!(facet.values, vec!["hardcover", "paperback"]);
        assert!(!facet.combinable);
        assert!(kind.is_required());

        let flags = item.attribute("flags").unwrap();
        assert!(flags.facet.as_ref().unwrap().combinable);
        assert!(!flags.is_required());

        assert_eq!(item.element("count").unwrap().data_type, Some(DataType::Int));
    }

    #[test]
    fn unknown_tags_are_skipped() {
        let (start, _) = parse(
            r#"<element name="a" xmlns="http://relaxng.org/ns/structure/1.0">
                <anyName/>
                <element name="b"><text/></element>
            </element>"#,
        );
        assert_eq!(start.element("a").unwrap().elements.len(), 1);
    }

    #[test]
    fn grammar_without_start_is_an_error() {
        let document = roxmltree::Document::parse(
            r#"<grammar xmlns="http://relaxng.org/ns/structure/1.0">
                <define name="a"><element name="a"><text/></element></define>
            </grammar>"#,
        )
        .unwrap();
        let mut definitions = DefinitionTable::new();
        let result = GrammarParser::new(&mut definitions).parse(document.root_element());
        assert!(matches!(result, Err(SchemaError::MissingStart)));
    }

    #[test]
    fn missing_name_reports_position() {
        let document = roxmltree::Document::parse(
            "<element name=\"a\" xmlns=\"http://relaxng.org/ns/structure/1.0\">\n  <element><text/></element>\n</element>",
        )
        .unwrap();
        let mut definitions = DefinitionTable::new();
        let error = GrammarParser::new(&mut definitions)
            .parse(document.root_element())
            .unwrap_err();
        assert!(matches!(error, SchemaError::MissingName { row: 2, col: 3, .. }));
    }
}
