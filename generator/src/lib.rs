//! Generates marshalling classes from RelaxNG, XSD and WSDL grammars.
//!
//! The schema is read into a [`Document`] by `sb-schema`, turned into the [`code`] model by the
//! [`Creator`] and rendered as Rust source by the [`printer`]. Generated code depends on
//! `sb-builtins` at runtime.

pub mod code;
pub mod creator;
pub mod naming;
pub mod printer;

use std::{fs, io, path::PathBuf};

use clap::ValueEnum;
use sb_schema::{Dialect, Document, SchemaError};
use thiserror::Error;
use tracing::info;

pub use creator::Creator;
pub use printer::{PrintError, PrintOptions};

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("class {class} is generated for both {first:?} and {second:?}")]
    Conflict {
        class: String,
        first: String,
        second: String,
    },
    #[error("{0:?} is not a valid runtime crate path")]
    RuntimePath(String),
    #[error(transparent)]
    Print(#[from] PrintError),
    #[error("failed to access {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("failed to fetch schema: {0}")]
    Fetch(#[from] reqwest::Error),
}

/// What to do when two different elements map to the same class name.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ConflictPolicy {
    /// The class generated last wins.
    #[default]
    Replace,
    /// The class generated first wins.
    Keep,
    /// Generation fails.
    Error,
}

#[derive(Clone, Debug)]
pub struct GeneratorOptions {
    pub conflict_policy: ConflictPolicy,
    /// Give root classes `parse_string`, `parse_file`, `write_string` and `write_file`.
    pub root_functions: bool,
    /// Path of the runtime support crate as seen from the generated code.
    pub runtime_crate: String,
    /// Module wrapping every generated type.
    pub namespace: Option<String>,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            conflict_policy: ConflictPolicy::default(),
            root_functions: true,
            runtime_crate: "sb_builtins".to_string(),
            namespace: None,
        }
    }
}

/// Parses schema `text` into a [`Document`].
pub fn read_document(
    text: &str,
    dialect: Option<Dialect>,
    allow_dtd: bool,
) -> Result<Document, GeneratorError> {
    let options = roxmltree::ParsingOptions {
        allow_dtd,
        ..roxmltree::ParsingOptions::default()
    };
    let xml = roxmltree::Document::parse_with_options(text, options).map_err(SchemaError::from)?;
    Ok(sb_schema::read_schema(&xml, dialect)?)
}

pub fn generate(document: &Document, options: &GeneratorOptions) -> Result<code::File, GeneratorError> {
    Creator::new(document, options)?.create_file()
}

pub fn render(file: &code::File, options: &PrintOptions) -> Result<String, GeneratorError> {
    Ok(printer::render_file(file, options)?)
}

/// Runs the whole pipeline on schema `text`. Meant for build scripts.
pub fn generate_source(
    text: &str,
    dialect: Option<Dialect>,
    options: &GeneratorOptions,
    print_options: &PrintOptions,
) -> Result<String, GeneratorError> {
    let document = read_document(text, dialect, false)?;
    let file = generate(&document, options)?;
    info!("Generated {} classes for {:?}", file.classes.len(), file.name);
    render(&file, print_options)
}

/// Reads a schema from a file or an `http(s)` URL.
pub fn load_input(source: &str) -> Result<String, GeneratorError> {
    if source.starts_with("http://") || source.starts_with("https://") {
        info!("Fetching {source}");
        Ok(reqwest::blocking::get(source)?.error_for_status()?.text()?)
    } else {
        fs::read_to_string(source).map_err(|source_error| GeneratorError::Io {
            path: PathBuf::from(source),
            source: source_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOOK: &str = r#"<element name="book" xmlns="http://relaxng.org/ns/structure/1.0">
        <attribute name="isbn"><text/></attribute>
        <element name="title"><text/></element>
        <zeroOrMore><element name="author"><text/></element></zeroOrMore>
    </element>"#;

    #[test]
    fn generates_book_source() {
        let source = generate_source(
            BOOK,
            None,
            &GeneratorOptions::default(),
            &PrintOptions::default(),
        )
        .unwrap();
        syn::parse_file(&source).unwrap();
        assert!(source.contains("pub struct Book {"));
        assert!(source.contains("    author_list: Vec<String>,"));
        assert!(source.contains("impl sb_builtins::Element for Book {"));
        assert!(source.contains("pub fn add_author(&mut self, value: String) {"));
        assert!(source.contains("pub fn parse_string(text: &str) -> Result<Self, sb_builtins::Error> {"));
    }

    #[test]
    fn runtime_crate_is_configurable() {
        let options = GeneratorOptions {
            runtime_crate: "crate::runtime".into(),
            root_functions: false,
            ..GeneratorOptions::default()
        };
        let source = generate_source(BOOK, None, &options, &PrintOptions::default()).unwrap();
        assert!(source.contains("impl crate::runtime::Element for Book {"));
        assert!(!source.contains("parse_string"));

        let invalid = GeneratorOptions {
            runtime_crate: "not a path".into(),
            ..GeneratorOptions::default()
        };
        assert!(matches!(
            generate_source(BOOK, None, &invalid, &PrintOptions::default()),
            Err(GeneratorError::RuntimePath(_))
        ));
    }

    #[test]
    fn types_can_be_wrapped_in_a_module() {
        let options = GeneratorOptions {
            namespace: Some("books".into()),
            ..GeneratorOptions::default()
        };
        let source = generate_source(BOOK, None, &options, &PrintOptions::default()).unwrap();
        syn::parse_file(&source).unwrap();
        assert!(source.contains("pub mod books {\n    use super::*;"));
        assert!(source.contains("    pub struct Book {"));
    }

    #[test]
    fn schema_errors_pass_through() {
        let error = read_document("<element", None, false).unwrap_err();
        assert!(matches!(error, GeneratorError::Schema(SchemaError::Xml(_))));
        let error = read_document("<html/>", None, false).unwrap_err();
        assert!(matches!(
            error,
            GeneratorError::Schema(SchemaError::UnsupportedRoot(ref root)) if root == "html"
        ));
    }

    #[test]
    fn dtd_requires_opt_in() {
        let text = r#"<!DOCTYPE element []>
            <element name="a" xmlns="http://relaxng.org/ns/structure/1.0"><text/></element>"#;
        assert!(read_document(text, None, false).is_err());
        assert!(read_document(text, None, true).is_ok());
    }

    #[test]
    fn missing_files_name_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.rng");
        let error = load_input(path.to_str().unwrap()).unwrap_err();
        assert!(matches!(error, GeneratorError::Io { path: ref p, .. } if *p == path));
    }
}
