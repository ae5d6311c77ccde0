use std::{env, error::Error, fs, path::PathBuf};

use sb_generator::{GeneratorOptions, PrintOptions};

const GRAMMARS: &[&str] = &["book.rng", "outline.rng", "catalog.xsd", "playlist.rng"];

fn main() -> Result<(), Box<dyn Error>> {
    let out_dir = PathBuf::from(env::var("OUT_DIR")?);
    let options = GeneratorOptions::default();
    // The output is pulled in with `include!`, which rejects inner attributes
    let print_options = PrintOptions {
        module_attributes: false,
    };

    for grammar in GRAMMARS {
        let path = PathBuf::from("grammars").join(grammar);
        println!("cargo:rerun-if-changed={}", path.display());

        let text = fs::read_to_string(&path)?;
        let source = sb_generator::generate_source(&text, None, &options, &print_options)?;
        let stem = grammar.split('.').next().unwrap_or(grammar);
        fs::write(out_dir.join(format!("{stem}.rs")), source)?;
    }
    Ok(())
}
