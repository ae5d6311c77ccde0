use roxmltree::Node;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("malformed schema document: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("{row}:{col}: <{tag}> has no name")]
    MissingName { tag: String, row: u32, col: u32 },
    #[error("{row}:{col}: <{tag}> is missing the {attribute:?} attribute")]
    MissingAttribute {
        tag: String,
        attribute: &'static str,
        row: u32,
        col: u32,
    },
    #[error("{row}:{col}: invalid occurrence bound {value:?}")]
    InvalidOccurs { value: String, row: u32, col: u32 },
    #[error("the grammar does not define a start pattern")]
    MissingStart,
    #[error("unsupported schema document root <{0}>")]
    UnsupportedRoot(String),
    #[error("relation from {from:?} points to unknown target {target:?}")]
    DanglingRelation { from: String, target: String },
}

impl SchemaError {
    pub(crate) fn missing_name(node: Node) -> Self {
        let (row, col) = position(node);
        Self::MissingName {
            tag: node.tag_name().name().to_string(),
            row,
            col,
        }
    }

    pub(crate) fn missing_attribute(node: Node, attribute: &'static str) -> Self {
        let (row, col) = position(node);
        Self::MissingAttribute {
            tag: node.tag_name().name().to_string(),
            attribute,
            row,
            col,
        }
    }

    pub(crate) fn invalid_occurs(node: Node, value: &str) -> Self {
        let (row, col) = position(node);
        Self::InvalidOccurs {
            value: value.to_string(),
            row,
            col,
        }
    }
}

/// Line and column of the start of `node` in its source text.
pub(crate) fn position(node: Node) -> (u32, u32) {
    let pos = node.document().text_pos_at(node.range().start);
    (pos.row, pos.col)
}

pub(crate) fn required_attribute<'a>(
    node: Node<'a, '_>,
    attribute: &'static str,
) -> Result<&'a str, SchemaError> {
    node.attribute(attribute)
        .ok_or_else(|| SchemaError::missing_attribute(node, attribute))
}
