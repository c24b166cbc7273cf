mod cli;
mod generators;

use std::process::ExitCode;

use clap::Parser;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use dt_codegen::{CodegenError, Customizations, CustomsError};
use dt_xsd::{SchemaSet, XsdError};

#[derive(Debug, Error)]
enum Error {
    #[error("failed to read {0}")]
    Read(String, #[source] std::io::Error),

    #[error("failed to fetch {0}")]
    Fetch(String, #[source] reqwest::Error),

    #[error("{0} is not well-formed XML")]
    Xml(String, #[source] roxmltree::Error),

    #[error("{0} is not a usable schema")]
    Schema(String, #[source] XsdError),

    #[error(transparent)]
    Customs(#[from] CustomsError),

    #[error(transparent)]
    Codegen(#[from] CodegenError),

    #[error(transparent)]
    Generate(#[from] generators::GenerateError),

    #[error("failed to write the output")]
    Write(#[source] std::io::Error),
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = cli::Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(error) => {
            let mut message = error.to_string();
            let mut source = std::error::Error::source(&error);
            while let Some(cause) = source {
                message.push_str(&format!(": {cause}"));
                source = cause.source();
            }
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: cli::Cli) -> Result<ExitCode, Error> {
    let mut schema = SchemaSet::new();
    for input in &cli.inputs {
        let text = read_input(input)?;
        let options = roxmltree::ParsingOptions {
            allow_dtd: cli.allow_dtd,
            ..Default::default()
        };
        let document = roxmltree::Document::parse_with_options(&text, options)
            .map_err(|error| Error::Xml(input.clone(), error))?;
        schema
            .read_document(&document)
            .map_err(|error| Error::Schema(input.clone(), error))?;
        tracing::info!(input, "read schema document");
    }

    let customs = match cli.customs.as_deref() {
        Some(path) => Customizations::load(path)?,
        None => Customizations::default(),
    };
    let plan = dt_codegen::compile(&mut schema, &customs)?;
    let output = cli.format.generate(&schema, &plan)?;

    match cli.output.as_deref() {
        Some(path) => std::fs::write(path, output).map_err(Error::Write)?,
        None => print!("{output}"),
    }

    for problem in plan.problems.iter() {
        eprintln!("{problem}");
    }
    if plan.problems.has_errors() {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

/// Reads a schema from a local file or an http(s) URL.
fn read_input(input: &str) -> Result<String, Error> {
    if input.starts_with("http://") || input.starts_with("https://") {
        reqwest::blocking::get(input)
            .and_then(|response| response.error_for_status())
            .and_then(|response| response.text())
            .map_err(|error| Error::Fetch(input.to_string(), error))
    } else {
        std::fs::read_to_string(input).map_err(|error| Error::Read(input.to_string(), error))
    }
}
