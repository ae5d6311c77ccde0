//! Runtime support linked by generated bindings.
//!
//! Generated classes implement [`Element`]; everything else in this crate is a helper their
//! `marshal`/`demarshal` bodies call into.

pub mod meta;
pub mod scalar;
pub mod writer;

use std::{fs, path::Path};

use tracing::debug;

pub use meta::{normalized_value, Error, Whitespace};
pub use roxmltree::Node;
pub use scalar::Scalar;
pub use writer::Writer;

/// A type bound to one element of a schema.
pub trait Element: Sized {
    /// Writes this value, including its own tag.
    fn marshal(&self, writer: &mut Writer) -> Result<(), Error>;

    /// Reads a value from `node`, which must be the element this type is bound to.
    fn demarshal(node: Node<'_, '_>) -> Result<Self, Error>;
}

impl<T: Element> Element for Box<T> {
    fn marshal(&self, writer: &mut Writer) -> Result<(), Error> {
        (**self).marshal(writer)
    }

    fn demarshal(node: Node<'_, '_>) -> Result<Self, Error> {
        T::demarshal(node).map(Box::new)
    }
}

pub fn to_string<T: Element>(value: &T) -> Result<String, Error> {
    let mut writer = Writer::new();
    value.marshal(&mut writer)?;
    Ok(writer.into_string())
}

pub fn from_str<T: Element>(text: &str) -> Result<T, Error> {
    let document = roxmltree::Document::parse(text)?;
    T::demarshal(document.root_element())
}

pub fn to_file<T: Element>(value: &T, path: impl AsRef<Path>) -> Result<(), Error> {
    let mut writer = Writer::new();
    writer.write_declaration()?;
    value.marshal(&mut writer)?;
    fs::write(path, writer.into_string())?;
    Ok(())
}

pub fn from_file<T: Element>(path: impl AsRef<Path>) -> Result<T, Error> {
    let text = fs::read_to_string(path)?;
    from_str(&text)
}

/// Concatenated text children of `node`.
pub fn text_content(node: Node) -> String {
    node.children()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect()
}

/// Fails unless `node` is an element named `tag`.
pub fn expect_element(node: Node, tag: &str) -> Result<(), Error> {
    if node.is_element() && node.tag_name().name() == tag {
        Ok(())
    } else {
        Err(Error::UnexpectedElement {
            expected: tag.to_string(),
            found: node.tag_name().name().to_string(),
        })
    }
}

pub fn unknown_attribute(node: Node, attribute: &str) {
    debug!(
        "Ignoring unknown attribute {attribute:?} on <{}>",
        node.tag_name().name()
    );
}

pub fn unknown_element(node: Node, child: Node) {
    debug!(
        "Ignoring unknown element <{}> in <{}>",
        child.tag_name().name(),
        node.tag_name().name()
    );
}
