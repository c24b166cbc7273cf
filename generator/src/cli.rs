use std::path::PathBuf;

use clap::Parser;

use crate::generators::Generator;

#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    /// Schema files or URLs, read in order into one schema set
    #[arg(required = true)]
    pub inputs: Vec<String>,

    /// TOML file with global settings and per-component customizations
    #[arg(long, short)]
    pub customs: Option<PathBuf>,

    /// What to print
    #[arg(long, short, value_enum, default_value_t = Generator::Plan)]
    pub format: Generator,

    /// Write the output to a file instead of stdout
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Allow a XML Document Type Definition (DTD) to occur
    #[arg(long)]
    pub allow_dtd: bool,
}
