//! Schema model for the binding generator.
//!
//! A grammar (RelaxNG in XML syntax, XML Schema or the type section of a WSDL document) is parsed
//! into a pattern tree and a [`DefinitionTable`], references are inlined by the [`Resolver`] and
//! the result is flattened into a canonical [`Document`] of elements, attributes and relations.

pub mod builder;
pub mod definitions;
pub mod document;
pub mod error;
pub mod pattern;
pub mod relaxng;
pub mod resolver;
pub mod shared;
pub mod tree;
pub mod xsd;

use std::{fmt, str::FromStr};

use roxmltree::Node;
use tracing::debug;

pub use builder::{build_document, DocumentBuilder};
pub use definitions::DefinitionTable;
pub use document::{Attribute, Document, Element, Identifier, MaxOccurs, Occurs, Relation};
pub use error::SchemaError;
pub use pattern::Pattern;
pub use resolver::Resolver;
pub use shared::{DataType, Facet};

/// The grammar languages understood by the front-ends.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Dialect {
    RelaxNg,
    Xsd,
    Wsdl,
}

impl Dialect {
    /// Guesses the dialect from the document element.
    pub fn detect(root: Node) -> Option<Self> {
        match root.tag_name().name() {
            "grammar" | "element" => Some(Self::RelaxNg),
            "schema" => Some(Self::Xsd),
            "definitions" => Some(Self::Wsdl),
            _ => None,
        }
    }
}

impl FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "relaxng" | "rng" => Ok(Self::RelaxNg),
            "xsd" => Ok(Self::Xsd),
            "wsdl" => Ok(Self::Wsdl),
            other => Err(format!("unknown schema dialect {other:?}")),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RelaxNg => write!(f, "relaxng"),
            Self::Xsd => write!(f, "xsd"),
            Self::Wsdl => write!(f, "wsdl"),
        }
    }
}

/// A parsed grammar: the start wrapper and every named definition.
#[derive(Clone, Debug)]
pub struct Grammar {
    pub start: tree::Element,
    pub definitions: DefinitionTable,
}

impl Grammar {
    /// Inlines all references. Running it again is a no-op.
    pub fn resolve(&mut self) {
        Resolver::new(&mut self.definitions).substitute(&mut self.start);
    }

    pub fn build_document(&self) -> Result<Document, SchemaError> {
        let document = build_document(&self.start, &self.definitions);
        document.validate()?;
        debug!(
            "Built document with {} elements and {} attributes",
            document.elements.len(),
            document.attributes.len()
        );
        Ok(document)
    }
}

/// Parses a grammar document. Without an explicit `dialect` it is detected from `root`.
pub fn parse_grammar(root: Node, dialect: Option<Dialect>) -> Result<Grammar, SchemaError> {
    let dialect = match dialect.or_else(|| Dialect::detect(root)) {
        Some(dialect) => dialect,
        None => return Err(SchemaError::UnsupportedRoot(root.tag_name().name().to_string())),
    };
    debug!("Parsing {dialect} grammar");

    let mut definitions = DefinitionTable::new();
    let start = match dialect {
        Dialect::RelaxNg => relaxng::GrammarParser::new(&mut definitions).parse(root)?,
        Dialect::Xsd => xsd::XsdParser::new(&mut definitions).parse(root)?,
        Dialect::Wsdl => xsd::XsdParser::new(&mut definitions).parse_wsdl(root)?,
    };
    Ok(Grammar { start, definitions })
}

/// Runs the whole front half of the pipeline: parse, resolve and build the [`Document`].
pub fn read_schema(
    document: &roxmltree::Document,
    dialect: Option<Dialect>,
) -> Result<Document, SchemaError> {
    let mut grammar = parse_grammar(document.root_element(), dialect)?;
    grammar.resolve();
    grammar.build_document()
}
