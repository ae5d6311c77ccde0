//! Front-end for XML Schema documents and the type section of WSDL documents.
//!
//! Only the structural subset needed for binding generation is mapped: element declarations,
//! complex types, model groups, attribute declarations and simple types with enumeration facets.
//! Everything is normalized into the same pattern tree the RelaxNG front-end produces.

use std::collections::{HashMap, HashSet};

use roxmltree::Node;
use tracing::{debug, warn};

use crate::{
    definitions::DefinitionTable,
    error::{required_attribute, SchemaError},
    pattern::Pattern,
    relaxng::local_name,
    shared::{DataType, Facet},
    tree::{Attribute, Element, Reference},
};

pub const XS_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

const TYPE_PREFIX: &str = "type:";
const GROUP_PREFIX: &str = "group:";
const ATTRIBUTE_GROUP_PREFIX: &str = "attributeGroup:";

/// A simple type resolved to its scalar representation.
#[derive(Clone, Debug, Default)]
struct SimpleType {
    data_type: DataType,
    facet: Option<Facet>,
}

/// Maps XSD (and WSDL `types`) documents into the pattern tree.
///
/// Global element declarations become definitions named after the element and are all start
/// candidates; named complex types, groups and attribute groups become definitions under the
/// `type:`, `group:` and `attributeGroup:` prefixes, which cannot collide with XML names.
pub struct XsdParser<'d, 'a, 'input> {
    definitions: &'d mut DefinitionTable,
    simple_type_nodes: HashMap<String, Node<'a, 'input>>,
    simple_types: HashMap<String, SimpleType>,
    resolving: HashSet<String>,
    start: Element,
    choices: u32,
}

impl<'d, 'a, 'input: 'a> XsdParser<'d, 'a, 'input> {
    pub fn new(definitions: &'d mut DefinitionTable) -> Self {
        Self {
            definitions,
            simple_type_nodes: HashMap::new(),
            simple_types: HashMap::new(),
            resolving: HashSet::new(),
            start: Element::start(),
            choices: 0,
        }
    }

    /// Parses one `schema` element and returns the start wrapper referencing its global elements.
    pub fn parse(mut self, schema: Node<'a, 'input>) -> Result<Element, SchemaError> {
        self.parse_schema(schema)?;
        Ok(self.start)
    }

    /// Parses every `types/schema` section of a WSDL `definitions` element into one table.
    pub fn parse_wsdl(mut self, definitions: Node<'a, 'input>) -> Result<Element, SchemaError> {
        let schemas = definitions
            .children()
            .filter(|c| c.tag_name().name() == "types")
            .flat_map(|types| types.children())
            .filter(|c| c.tag_name().name() == "schema");
        for schema in schemas {
            self.parse_schema(schema)?;
        }
        Ok(self.start)
    }

    fn parse_schema(&mut self, schema: Node<'a, 'input>) -> Result<(), SchemaError> {
        // Simple types are collected first, they are resolved eagerly at their use sites
        for simple_type in schema
            .children()
            .filter(|c| c.tag_name().name() == "simpleType")
        {
            let name = required_attribute(simple_type, "name")?;
            self.simple_type_nodes.insert(name.to_string(), simple_type);
        }

        for child in schema.children().filter(Node::is_element) {
            match child.tag_name().name() {
                "element" => {
                    let name = required_attribute(child, "name")?;
                    let element = self.parse_element_declaration(child, Pattern::new())?;
                    let mut body = Element::new(name);
                    body.elements.push(element);
                    self.definitions.add(name, body);
                    self.start
                        .references
                        .push(Reference::new(name, Pattern::new()));
                }
                "complexType" => {
                    let name = required_attribute(child, "name")?;
                    let mut body = Element::new(format!("{TYPE_PREFIX}{name}"));
                    self.parse_complex_type(child, &mut body)?;
                    self.definitions.add(body.name.clone(), body);
                }
                "group" => {
                    let name = required_attribute(child, "name")?;
                    let mut body = Element::new(format!("{GROUP_PREFIX}{name}"));
                    for particle in child.children().filter(Node::is_element) {
                        self.parse_particle(particle, Pattern::new(), &mut body)?;
                    }
                    self.definitions.add(body.name.clone(), body);
                }
                "attributeGroup" => {
                    let name = required_attribute(child, "name")?;
                    let mut body = Element::new(format!("{ATTRIBUTE_GROUP_PREFIX}{name}"));
                    self.parse_attributes(child, &mut body)?;
                    self.definitions.add(body.name.clone(), body);
                }
                "simpleType" | "annotation" => {}
                "import" | "include" | "redefine" | "override" => {
                    warn!(
                        "Skipping <{}> of {:?}, external schemas are not supported",
                        child.tag_name().name(),
                        child.attribute("schemaLocation").unwrap_or_default()
                    );
                }
                other => debug!("Ignoring top-level <{other}>"),
            }
        }
        Ok(())
    }

    /// Maps a particle (`element`, model group or group reference) into `target`.
    fn parse_particle(
        &mut self,
        node: Node<'a, 'input>,
        pattern: Pattern,
        target: &mut Element,
    ) -> Result<(), SchemaError> {
        match node.tag_name().name() {
            "element" => {
                let pattern = pattern.merged(occurs_pattern(node)?);
                if let Some(reference) = node.attribute("ref") {
                    let name = local_name(reference);
                    target.references.push(Reference::new(name, pattern));
                } else {
                    let element = self.parse_element_declaration(node, pattern)?;
                    target.elements.push(element);
                }
            }
            "sequence" | "all" => {
                let pattern = pattern.merged(occurs_pattern(node)?);
                for child in node.children().filter(Node::is_element) {
                    self.parse_particle(child, pattern, target)?;
                }
            }
            "choice" => {
                self.choices += 1;
                let pattern = pattern.merged(occurs_pattern(node)?).in_choice(self.choices);
                for child in node.children().filter(Node::is_element) {
                    self.parse_particle(child, pattern, target)?;
                }
            }
            "group" => {
                let pattern = pattern.merged(occurs_pattern(node)?);
                let reference = required_attribute(node, "ref")?;
                let name = format!("{GROUP_PREFIX}{}", local_name(reference));
                target.references.push(Reference::new(name, pattern));
            }
            "annotation" => {}
            "any" => warn!("Skipping wildcard <any> in {:?}", target.name),
            other => warn!("Skipping unknown particle <{other}> in {:?}", target.name),
        }
        Ok(())
    }

    fn parse_element_declaration(
        &mut self,
        node: Node<'a, 'input>,
        pattern: Pattern,
    ) -> Result<Element, SchemaError> {
        let name = required_attribute(node, "name")?;
        let mut element = Element::new(name).with_pattern(pattern);

        if let Some(type_name) = node.attribute("type") {
            if let Some(simple_type) = self.simple_type_by_name(node, type_name)? {
                element.has_text = true;
                element.data_type = Some(simple_type.data_type);
                element.facet = simple_type.facet;
            } else {
                let name = format!("{TYPE_PREFIX}{}", local_name(type_name));
                element.references.push(Reference::new(name, Pattern::new()));
            }
        } else if let Some(complex_type) = child_named(node, "complexType") {
            self.parse_complex_type(complex_type, &mut element)?;
        } else if let Some(simple_type) = child_named(node, "simpleType") {
            let simple_type = self.simple_type(simple_type)?;
            element.has_text = true;
            element.data_type = Some(simple_type.data_type);
            element.facet = simple_type.facet;
        } else {
            // xs:anyType
            element.has_text = true;
        }
        Ok(element)
    }

    fn parse_complex_type(
        &mut self,
        node: Node<'a, 'input>,
        target: &mut Element,
    ) -> Result<(), SchemaError> {
        if node.attribute("mixed") == Some("true") {
            target.has_text = true;
        }
        for child in node.children().filter(Node::is_element) {
            match child.tag_name().name() {
                "sequence" | "choice" | "all" | "group" => {
                    self.parse_particle(child, Pattern::new(), target)?
                }
                "simpleContent" => {
                    for derivation in child.children().filter(Node::is_element) {
                        if !matches!(derivation.tag_name().name(), "extension" | "restriction") {
                            continue;
                        }
                        target.has_text = true;
                        if let Some(base) = derivation.attribute("base") {
                            match self.simple_type_by_name(derivation, base)? {
                                Some(simple_type) => {
                                    target.data_type = Some(simple_type.data_type);
                                    target.facet = simple_type.facet;
                                }
                                None => {
                                    let name = format!("{TYPE_PREFIX}{}", local_name(base));
                                    target.references.push(Reference::new(name, Pattern::new()));
                                }
                            }
                        }
                        if let Some(facet) = enumeration_facet(derivation) {
                            target.facet = Some(facet);
                        }
                        self.parse_attributes(derivation, target)?;
                    }
                }
                "complexContent" => {
                    if child.attribute("mixed") == Some("true") {
                        target.has_text = true;
                    }
                    for derivation in child.children().filter(Node::is_element) {
                        match derivation.tag_name().name() {
                            "extension" => {
                                let base = required_attribute(derivation, "base")?;
                                if local_name(base) != "anyType" {
                                    let name = format!("{TYPE_PREFIX}{}", local_name(base));
                                    target.references.push(Reference::new(name, Pattern::new()));
                                }
                                self.parse_complex_type(derivation, target)?;
                            }
                            // A restriction restates the content it keeps
                            "restriction" => self.parse_complex_type(derivation, target)?,
                            _ => {}
                        }
                    }
                }
                "attribute" | "attributeGroup" | "anyAttribute" => {}
                "annotation" => {}
                other => warn!("Skipping <{other}> in complex type {:?}", target.name),
            }
        }
        self.parse_attributes(node, target)
    }

    /// Maps the `attribute`/`attributeGroup` children of `node` into `target`.
    fn parse_attributes(
        &mut self,
        node: Node<'a, 'input>,
        target: &mut Element,
    ) -> Result<(), SchemaError> {
        for child in node.children().filter(Node::is_element) {
            match child.tag_name().name() {
                "attribute" => {
                    if let Some(attribute) = self.parse_attribute_declaration(child)? {
                        target.attributes.push(attribute);
                    }
                }
                "attributeGroup" => {
                    let reference = required_attribute(child, "ref")?;
                    let name = format!("{ATTRIBUTE_GROUP_PREFIX}{}", local_name(reference));
                    target.references.push(Reference::new(name, Pattern::new()));
                }
                "anyAttribute" => debug!("Ignoring <anyAttribute> in {:?}", target.name),
                _ => {}
            }
        }
        Ok(())
    }

    fn parse_attribute_declaration(
        &mut self,
        node: Node<'a, 'input>,
    ) -> Result<Option<Attribute>, SchemaError> {
        let pattern = match node.attribute("use") {
            Some("required") => Pattern::new(),
            Some("prohibited") => return Ok(None),
            _ => Pattern::new().with_optional(),
        };
        let name = match (node.attribute("name"), node.attribute("ref")) {
            (Some(name), _) => name,
            (None, Some(reference)) => local_name(reference),
            (None, None) => return Err(SchemaError::missing_name(node)),
        };
        let mut attribute = Attribute::new(name, pattern);

        let simple_type = if let Some(type_name) = node.attribute("type") {
            self.simple_type_by_name(node, type_name)?
        } else if let Some(simple_type) = child_named(node, "simpleType") {
            Some(self.simple_type(simple_type)?)
        } else {
            None
        };
        if let Some(simple_type) = simple_type {
            attribute.data_type = Some(simple_type.data_type);
            attribute.facet = simple_type.facet;
        }
        Ok(Some(attribute))
    }

    /// Resolves a `type`/`base` QName to a simple type. Returns `None` for complex types.
    fn simple_type_by_name(
        &mut self,
        context: Node<'a, 'input>,
        qname: &str,
    ) -> Result<Option<SimpleType>, SchemaError> {
        let local = local_name(qname);
        if is_builtin(context, qname) {
            if local == "anyType" {
                return Ok(None);
            }
            return Ok(Some(SimpleType {
                data_type: DataType::from_xsd_name(local),
                facet: None,
            }));
        }
        if let Some(simple_type) = self.simple_types.get(local) {
            return Ok(Some(simple_type.clone()));
        }
        let Some(node) = self.simple_type_nodes.get(local).copied() else {
            return Ok(None);
        };
        if !self.resolving.insert(local.to_string()) {
            warn!("Simple type {local:?} is derived from itself, treating it as string");
            return Ok(Some(SimpleType::default()));
        }
        let simple_type = self.simple_type(node)?;
        self.resolving.remove(local);
        self.simple_types
            .insert(local.to_string(), simple_type.clone());
        Ok(Some(simple_type))
    }

    fn simple_type(&mut self, node: Node<'a, 'input>) -> Result<SimpleType, SchemaError> {
        for child in node.children().filter(Node::is_element) {
            match child.tag_name().name() {
                "restriction" => {
                    let mut simple_type = match child.attribute("base") {
                        Some(base) => self.simple_type_by_name(child, base)?.unwrap_or_default(),
                        None => match child_named(child, "simpleType") {
                            Some(inline) => self.simple_type(inline)?,
                            None => SimpleType::default(),
                        },
                    };
                    if let Some(facet) = enumeration_facet(child) {
                        simple_type.facet = Some(facet);
                    }
                    return Ok(simple_type);
                }
                "list" => {
                    let item = match child.attribute("itemType") {
                        Some(item) => self.simple_type_by_name(child, item)?.unwrap_or_default(),
                        None => match child_named(child, "simpleType") {
                            Some(inline) => self.simple_type(inline)?,
                            None => SimpleType::default(),
                        },
                    };
                    let facet = item.facet.map(|facet| Facet {
                        combinable: true,
                        ..facet
                    });
                    return Ok(SimpleType {
                        data_type: DataType::String,
                        facet,
                    });
                }
                "union" => {
                    debug!("Union simple types are mapped to string");
                    return Ok(SimpleType::default());
                }
                _ => {}
            }
        }
        Ok(SimpleType::default())
    }
}

fn child_named<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|c| c.tag_name().name() == name)
}

/// Whether `qname` names a type from the XML Schema namespace.
fn is_builtin(context: Node, qname: &str) -> bool {
    match qname.split_once(':') {
        Some((prefix, _)) => context.lookup_namespace_uri(Some(prefix)) == Some(XS_NAMESPACE),
        None => context.lookup_namespace_uri(None) == Some(XS_NAMESPACE),
    }
}

fn enumeration_facet(restriction: Node) -> Option<Facet> {
    let mut facet = Facet::default();
    for enumeration in restriction
        .children()
        .filter(|c| c.tag_name().name() == "enumeration")
    {
        if let Some(value) = enumeration.attribute("value") {
            facet.push(value);
        }
    }
    (!facet.is_empty()).then_some(facet)
}

/// Maps `minOccurs`/`maxOccurs` to a pattern.
fn occurs_pattern(node: Node) -> Result<Pattern, SchemaError> {
    let min_occurs = match node.attribute("minOccurs") {
        Some(value) => value
            .trim()
            .parse::<u64>()
            .map_err(|_| SchemaError::invalid_occurs(node, value))?,
        None => 1,
    };
    let unbounded = match node.attribute("maxOccurs") {
        Some(value) if value.trim() == "unbounded" => true,
        Some(value) => {
            value
                .trim()
                .parse::<u64>()
                .map_err(|_| SchemaError::invalid_occurs(node, value))?
                > 1
        }
        None => false,
    };

    let pattern = Pattern::new();
    Ok(match (min_occurs, unbounded) {
        (0, false) => pattern.with_optional(),
        (0, true) => pattern.with_zero_or_more(),
        (_, true) => pattern.with_one_or_more(),
        (_, false) => pattern,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOOK_XSD: &str = r#"<?xml version="1.0"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" xmlns:tns="urn:books" targetNamespace="urn:books">
  <xs:simpleType name="Binding">
    <xs:restriction base="xs:string">
      <xs:enumeration value="hardcover"/>
      <xs:enumeration value="paperback"/>
    </xs:restriction>
  </xs:simpleType>
  <xs:element name="book" type="tns:BookType"/>
  <xs:complexType name="BookType">
    <xs:sequence>
      <xs:element name="title" type="xs:string"/>
      <xs:element name="author" type="xs:string" minOccurs="0" maxOccurs="unbounded"/>
      <xs:element name="pages" type="xs:int" minOccurs="0"/>
    </xs:sequence>
    <xs:attribute name="isbn" type="xs:string" use="required"/>
    <xs:attribute name="binding" type="tns:Binding"/>
  </xs:complexType>
</xs:schema>"#;

    #[test]
    fn maps_global_elements_and_types() {
        let document = roxmltree::Document::parse(BOOK_XSD).unwrap();
        let mut definitions = DefinitionTable::new();
        let start = XsdParser::new(&mut definitions)
            .parse(document.root_element())
            .unwrap();

        assert_eq!(start.references.len(), 1);
        assert_eq!(start.references[0].name, "book");

        let book = &definitions.get("book").unwrap()[0].elements[0];
        assert_eq!(book.references[0].name, "type:BookType");

        let book_type = &definitions.get("type:BookType").unwrap()[0];
        let author = book_type.element("author").unwrap();
        assert!(author.pattern.zero_or_more);
        assert!(author.has_text);
        let pages = book_type.element("pages").unwrap();
        assert!(pages.pattern.optional);
        assert_eq!(pages.data_type, Some(DataType::Int));

        assert!(book_type.attribute("isbn").unwrap().is_required());
        let binding = book_type.attribute("binding").unwrap();
        assert!(!binding.is_required());
        assert_eq!(
            binding.facet.as_ref().unwrap().values,
            vec!["hardcover", "paperback"]
        );
    }

    #[test]
    fn choice_marks_particles() {
        let document = roxmltree::Document::parse(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                <xs:element name="shape">
                  <xs:complexType><xs:sequence>
                    <xs:choice maxOccurs="unbounded">
                      <xs:element name="circle" type="xs:decimal"/>
                      <xs:element name="square" type="xs:decimal"/>
                    </xs:choice>
                    <xs:choice>
                      <xs:element name="red" type="xs:string"/>
                      <xs:element name="blue" type="xs:string"/>
                    </xs:choice>
                  </xs:sequence></xs:complexType>
                </xs:element>
            </xs:schema>"#,
        )
        .unwrap();
        let mut definitions = DefinitionTable::new();
        XsdParser::new(&mut definitions)
            .parse(document.root_element())
            .unwrap();
        let shape = &definitions.get("shape").unwrap()[0].elements[0];
        for name in ["circle", "square"] {
            let pattern = shape.element(name).unwrap().pattern;
            assert!(pattern.choice && pattern.one_or_more, "{name}: {pattern:?}");
        }
        let group = |name: &str| shape.element(name).unwrap().pattern.choice_group;
        assert_eq!(group("circle"), group("square"));
        assert_eq!(group("red"), group("blue"));
        assert_ne!(group("circle"), group("red"));
        assert!(!shape.element("red").unwrap().pattern.one_or_more);
    }

    #[test]
    fn invalid_occurs_is_an_input_error() {
        let document = roxmltree::Document::parse(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                <xs:element name="a"><xs:complexType><xs:sequence>
                  <xs:element name="b" type="xs:string" maxOccurs="many"/>
                </xs:sequence></xs:complexType></xs:element>
            </xs:schema>"#,
        )
        .unwrap();
        let mut definitions = DefinitionTable::new();
        let result = XsdParser::new(&mut definitions).parse(document.root_element());
        assert!(matches!(
            result,
            Err(SchemaError::InvalidOccurs { row: 3, .. })
        ));
    }

    #[test]
    fn wsdl_types_share_one_table() {
        let document = roxmltree::Document::parse(
            r#"<wsdl:definitions xmlns:wsdl="http://schemas.xmlsoap.org/wsdl/"
                                 xmlns:xs="http://www.w3.org/2001/XMLSchema">
                <wsdl:types>
                  <xs:schema><xs:element name="request" type="xs:string"/></xs:schema>
                  <xs:schema><xs:element name="response" type="xs:int"/></xs:schema>
                </wsdl:types>
            </wsdl:definitions>"#,
        )
        .unwrap();
        let mut definitions = DefinitionTable::new();
        let start = XsdParser::new(&mut definitions)
            .parse_wsdl(document.root_element())
            .unwrap();
        let names: Vec<_> = start.references.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["request", "response"]);
        assert!(definitions.contains("request") && definitions.contains("response"));
    }
}
