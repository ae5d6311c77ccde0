use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use sb_generator::ConflictPolicy;
use sb_schema::Dialect;

#[derive(Copy, Clone, Debug, Default, ValueEnum)]
pub enum DialectArg {
    /// Detect from the document element
    #[default]
    Auto,
    #[value(name = "relaxng")]
    RelaxNg,
    Xsd,
    Wsdl,
}

impl DialectArg {
    pub fn dialect(self) -> Option<Dialect> {
        match self {
            Self::Auto => None,
            Self::RelaxNg => Some(Dialect::RelaxNg),
            Self::Xsd => Some(Dialect::Xsd),
            Self::Wsdl => Some(Dialect::Wsdl),
        }
    }
}

#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    /// The schema file or URL
    pub input: String,

    /// Write `<schema>.rs` into this directory instead of printing to stdout
    #[arg(short, long)]
    pub directory: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t)]
    pub dialect: DialectArg,

    /// Wrap the generated types in `pub mod <MODULE>`
    #[arg(short, long)]
    pub module: Option<String>,

    /// What to do when two elements map to the same class name
    #[arg(long, value_enum, default_value_t)]
    pub on_conflict: ConflictPolicy,

    /// Allow a XML Document Type Definition (DTD) to occur
    #[arg(long)]
    pub allow_dtd: bool,

    /// Log progress and decisions to stderr
    #[arg(short, long)]
    pub verbose: bool,
}
