use clap::{Parser, Subcommand, ValueHint};
use std::path::PathBuf;

#[derive(Parser)]
#[command(about, version, name = "rdf-algebra")]
/// Queries and validates RDF files
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Evaluate a SPARQL SELECT or ASK query over RDF files
    Query {
        /// Files to load into the queried dataset
        ///
        /// If no file is given, stdin is read.
        #[arg(short, long, num_args = 0.., value_hint = ValueHint::FilePath)]
        data: Vec<PathBuf>,
        /// The format of the data
        ///
        /// It can be an extension like "nt" or a MIME type like "application/n-triples".
        ///
        /// By default the format is guessed from the file extensions.
        #[arg(long, required_unless_present = "data")]
        format: Option<String>,
        /// The SPARQL query
        #[arg(short, long, required_unless_present = "query_file")]
        query: Option<String>,
        /// File to read the SPARQL query from
        #[arg(long, conflicts_with = "query", value_hint = ValueHint::FilePath)]
        query_file: Option<PathBuf>,
        /// Base IRI of the query
        #[arg(long, value_hint = ValueHint::Url)]
        query_base: Option<String>,
        /// The format of the results
        ///
        /// It can be an extension like "tsv" or a MIME type like "application/sparql-results+json".
        #[arg(long, default_value = "tsv")]
        results_format: String,
        /// Aborts the evaluation after the given number of seconds
        #[arg(long)]
        timeout: Option<u64>,
    },
    /// Validate RDF files against SHACL shapes
    ///
    /// The validation report is written to stdout as Turtle.
    /// The process exits with a non-zero status if the data does not conform.
    Validate {
        /// Files that contain the data graph
        #[arg(short, long, required = true, num_args = 1.., value_hint = ValueHint::FilePath)]
        data: Vec<PathBuf>,
        /// Files that contain the shapes graph
        #[arg(short, long, required = true, num_args = 1.., value_hint = ValueHint::FilePath)]
        shapes: Vec<PathBuf>,
        /// The format of the data and shapes files
        ///
        /// By default the format is guessed from the file extensions.
        #[arg(long)]
        format: Option<String>,
    },
}
