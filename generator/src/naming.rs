use check_keyword::CheckKeyword;
use heck::{ToPascalCase, ToSnakeCase};
use proc_macro2::{Ident, Span};

/// Type names of the prelude that generated code relies on and classes must not shadow.
const RESERVED_TYPE_NAMES: &[&str] = &["Box", "Default", "Option", "Result", "Self", "String", "Vec"];

pub fn ident(name: &str) -> Ident {
    if ["crate", "self", "super", "Self"].contains(&name) {
        // These are keywords that are not allowed as raw identifiers
        Ident::new(&format!("{}_", name), Span::call_site())
    } else if name.is_keyword() {
        Ident::new_raw(name, Span::call_site())
    } else {
        Ident::new(name, Span::call_site())
    }
}

fn sanitize(name: &str) -> String {
    name.replace(|c: char| !c.is_alphanumeric(), "_")
}

/// Name of the class generated for the element `name`.
pub fn class_name(name: &str) -> String {
    let pascal = sanitize(name).to_pascal_case();
    match pascal.chars().next() {
        None => "Unnamed".to_string(),
        Some(first) if !first.is_alphabetic() => format!("_{pascal}"),
        Some(_) if RESERVED_TYPE_NAMES.contains(&pascal.as_str()) => format!("{pascal}Type"),
        Some(_) => pascal,
    }
}

/// Name of a member variable or function derived from an element or attribute name.
pub fn member_name(name: &str) -> String {
    let snake = sanitize(name).to_snake_case();
    match snake.chars().next() {
        None => "unnamed".to_string(),
        Some(first) if !first.is_alphabetic() => format!("_{snake}"),
        Some(_) => snake,
    }
}

/// Name of the enum variant for an enumeration value.
pub fn variant_name(value: &str) -> String {
    if value.is_empty() {
        return "Empty".to_string();
    }
    let sanitized = sanitize(value);
    // TODO: Improve this for version-like values such as 1.0 and 1_0, which currently collide
    match value.chars().next() {
        Some(first) if !first.is_alphabetic() => format!("_{}", sanitized.to_pascal_case()),
        _ => sanitized.to_pascal_case(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_names_are_pascal_case() {
        assert_eq!(class_name("book"), "Book");
        assert_eq!(class_name("table-of-contents"), "TableOfContents");
        assert_eq!(class_name("xmlHTTPRequest"), "XmlHttpRequest");
        assert_eq!(class_name("3d"), "_3d");
    }

    #[test]
    fn class_names_avoid_prelude_types() {
        assert_eq!(class_name("string"), "StringType");
        assert_eq!(class_name("option"), "OptionType");
    }

    #[test]
    fn member_names_are_snake_case() {
        assert_eq!(member_name("authorList"), "author_list");
        assert_eq!(member_name("first-name"), "first_name");
        assert_eq!(member_name("ISBN"), "isbn");
        assert_eq!(member_name(""), "unnamed");
    }

    #[test]
    fn variant_names() {
        assert_eq!(variant_name("hardcover"), "Hardcover");
        assert_eq!(variant_name("in-progress"), "InProgress");
        assert_eq!(variant_name(""), "Empty");
        assert_eq!(variant_name("2x"), "_2x");
    }

    #[test]
    fn keywords_are_escaped() {
        assert_eq!(ident("type").to_string(), "r#type");
        assert_eq!(ident("self").to_string(), "self_");
        assert_eq!(ident("Self").to_string(), "Self_");
        assert_eq!(ident("title").to_string(), "title");
    }
}
