mod cli;

use std::{
    fs,
    path::{Path, PathBuf},
    process::ExitCode,
};

use clap::Parser;
use heck::ToSnakeCase;
use sb_generator::{GeneratorError, GeneratorOptions, PrintOptions};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// File the bindings for the schema with start element `name` are written to.
fn output_path(directory: &Path, name: &str) -> PathBuf {
    let stem = name.to_snake_case();
    if stem.is_empty() {
        directory.join("schema.rs")
    } else {
        directory.join(format!("{stem}.rs"))
    }
}

fn run(cli: cli::Cli) -> Result<(), GeneratorError> {
    let text = sb_generator::load_input(&cli.input)?;
    let document = sb_generator::read_document(&text, cli.dialect.dialect(), cli.allow_dtd)?;
    let options = GeneratorOptions {
        conflict_policy: cli.on_conflict,
        namespace: cli.module,
        ..GeneratorOptions::default()
    };
    let file = sb_generator::generate(&document, &options)?;
    let source = sb_generator::render(&file, &PrintOptions::default())?;

    match cli.directory {
        Some(directory) => {
            let path = output_path(&directory, &file.name);
            fs::create_dir_all(&directory)
                .and_then(|()| fs::write(&path, source))
                .map_err(|source| GeneratorError::Io {
                    path: path.clone(),
                    source,
                })?;
            info!("Wrote {} classes to {}", file.classes.len(), path.display());
        }
        None => print!("{source}"),
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = cli::Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_is_named_after_the_start_element() {
        let directory = Path::new("out");
        assert_eq!(output_path(directory, "BookStore"), directory.join("book_store.rs"));
        assert_eq!(output_path(directory, "purchase-order"), directory.join("purchase_order.rs"));
        assert_eq!(output_path(directory, ""), directory.join("schema.rs"));
    }

    #[test]
    fn writes_into_the_directory() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("note.rng");
        fs::write(
            &input,
            r#"<element name="note" xmlns="http://relaxng.org/ns/structure/1.0">
                <attribute name="to"/><text/>
            </element>"#,
        )
        .unwrap();
        let output = dir.path().join("generated");
        let cli = cli::Cli::parse_from([
            "sb-generator",
            "--directory",
            output.to_str().unwrap(),
            input.to_str().unwrap(),
        ]);
        run(cli).unwrap();
        let source = fs::read_to_string(output.join("note.rs")).unwrap();
        assert!(source.contains("pub struct Note {"));
    }

    #[test]
    fn conflicts_can_fail_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("clash.rng");
        fs::write(
            &input,
            r#"<element name="root" xmlns="http://relaxng.org/ns/structure/1.0">
                <element name="item"><attribute name="a"/></element>
                <element name="Item"><attribute name="b"/></element>
            </element>"#,
        )
        .unwrap();
        let cli = cli::Cli::parse_from([
            "sb-generator",
            "--on-conflict",
            "error",
            input.to_str().unwrap(),
        ]);
        assert!(matches!(run(cli), Err(GeneratorError::Conflict { .. })));
    }
}
