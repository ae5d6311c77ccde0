use crate::meta::{normalized_value, Error, Whitespace};

/// Conversion between a value and its lexical form in attributes and text content.
pub trait Scalar: Sized {
    fn to_literal(&self) -> String;
    fn from_literal(literal: &str) -> Result<Self, Error>;
}

impl Scalar for String {
    fn to_literal(&self) -> String {
        self.clone()
    }

    fn from_literal(literal: &str) -> Result<Self, Error> {
        Ok(literal.to_string())
    }
}

impl Scalar for bool {
    fn to_literal(&self) -> String {
        self.to_string()
    }

    fn from_literal(literal: &str) -> Result<Self, Error> {
        match normalized_value(literal, Whitespace::Collapse).as_ref() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            _ => Err(Error::InvalidValue {
                value: literal.to_string(),
                type_name: "boolean",
            }),
        }
    }
}

macro_rules! numeric_scalar {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(
            impl Scalar for $ty {
                fn to_literal(&self) -> String {
                    self.to_string()
                }

                fn from_literal(literal: &str) -> Result<Self, Error> {
                    literal.trim().parse().map_err(|_| Error::InvalidValue {
                        value: literal.to_string(),
                        type_name: $name,
                    })
                }
            }
        )*
    };
}

numeric_scalar! {
    i32 => "int",
    i64 => "integer",
    f64 => "decimal",
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_ignore_surrounding_whitespace() {
        assert_eq!(i32::from_literal(" 42\n").unwrap(), 42);
        assert_eq!(i64::from_literal("-7").unwrap(), -7);
        assert_eq!(f64::from_literal("2.5").unwrap(), 2.5);
        assert_eq!(2.5f64.to_literal(), "2.5");
    }

    #[test]
    fn booleans_accept_both_lexical_forms() {
        assert!(bool::from_literal("1").unwrap());
        assert!(!bool::from_literal(" false ").unwrap());
        assert_eq!(true.to_literal(), "true");
    }

    #[test]
    fn invalid_literals_are_errors() {
        let error = i32::from_literal("many").unwrap_err();
        assert_eq!(error.to_string(), r#"value "many" is not a valid int"#);
        assert!(bool::from_literal("yes").is_err());
    }

    #[test]
    fn strings_are_kept_verbatim() {
        assert_eq!(String::from_literal("  a b ").unwrap(), "  a b ");
    }
}
