use tracing::debug;

/// Scalar type of a text-only element or an attribute value.
///
/// The names follow the XML Schema datatype library, which is also the library RelaxNG grammars
/// refer to via `<data type="..."/>`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum DataType {
    #[default]
    String,
    NormalizedString,
    Token,
    Integer,
    Int,
    Decimal,
    Boolean,
    Date,
    DateTime,
}

impl DataType {
    /// Maps a datatype name (without prefix) to a [`DataType`]. Unknown names are treated as
    /// strings, which keeps every value representable.
    pub fn from_xsd_name(name: &str) -> Self {
        match name {
            "string" | "anySimpleType" | "anyURI" | "QName" | "ID" | "IDREF" => Self::String,
            "normalizedString" => Self::NormalizedString,
            "token" | "NMTOKEN" | "Name" | "NCName" | "language" => Self::Token,
            "integer" | "long" | "nonNegativeInteger" | "positiveInteger"
            | "nonPositiveInteger" | "negativeInteger" | "unsignedLong" | "unsignedInt" => {
                Self::Integer
            }
            "int" | "short" | "byte" | "unsignedShort" | "unsignedByte" => Self::Int,
            "decimal" | "double" | "float" => Self::Decimal,
            "boolean" => Self::Boolean,
            "date" => Self::Date,
            "dateTime" | "dateTimeStamp" => Self::DateTime,
            other => {
                debug!("Unknown datatype {other:?}, falling back to string");
                Self::String
            }
        }
    }

    /// Whether values of this type are whitespace-collapsed before conversion.
    pub fn collapses_whitespace(&self) -> bool {
        !matches!(self, Self::String | Self::NormalizedString)
    }
}

/// Facet enumeration: the closed set of values allowed for a scalar.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Facet {
    pub values: Vec<String>,
    /// Values may be combined, i.e. the scalar is a whitespace separated list of facet values.
    pub combinable: bool,
}

impl Facet {
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            values: values.into_iter().map(Into::into).collect(),
            combinable: false,
        }
    }

    pub fn push(&mut self, value: impl Into<String>) {
        let value = value.into();
        if !self.values.contains(&value) {
            self.values.push(value);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
