use crate::cli::{Args, Command};
use anyhow::{bail, Context};
use clap::Parser;
use rdf_algebra::io::{RdfFormat, RdfSerializer};
use rdf_algebra::sparql::{Query, QueryOptions, QueryResultsFormat};
use rdf_algebra::store::Store;
use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::{stdin, stdout, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod cli;

pub fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let matches = Args::parse();
    match matches.command {
        Command::Query {
            data,
            format,
            query,
            query_file,
            query_base,
            results_format,
            timeout,
        } => {
            let format = format.as_deref().map(rdf_format_from_name).transpose()?;
            let store = Store::new();
            if data.is_empty() {
                let Some(format) = format else {
                    bail!("The --format option must be set when reading from stdin")
                };
                store
                    .load_from_reader(format, stdin().lock())
                    .context("Failed to load stdin")?;
            } else {
                load_files(&store, &data, format)?;
            }

            let query = if let Some(query) = query {
                query
            } else if let Some(query_file) = query_file {
                fs::read_to_string(&query_file).with_context(|| {
                    format!("Not able to read query file {}", query_file.display())
                })?
            } else {
                bail!("The --query or --query-file option must be set")
            };
            let query = Query::parse(&query, query_base.as_deref())?;

            let results_format = query_results_format_from_name(&results_format)?;
            let mut options = QueryOptions::default();
            if let Some(timeout) = timeout {
                options = options.with_timeout(Duration::from_secs(timeout));
            }

            let results = store.query_opt(&query, options)?;
            results.write(stdout().lock(), results_format)?.flush()?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Validate {
            data,
            shapes,
            format,
        } => {
            let format = format.as_deref().map(rdf_format_from_name).transpose()?;
            let data_store = Store::new();
            load_files(&data_store, &data, format)?;
            let shapes_store = Store::new();
            load_files(&shapes_store, &shapes, format)?;

            let report = data_store.validate(&shapes_store)?;
            info!(
                conforms = report.conforms(),
                results = report.results().len(),
                "Validation finished"
            );

            let mut serializer = RdfSerializer::from_format(RdfFormat::Turtle)
                .with_prefix("sh", "http://www.w3.org/ns/shacl#")?
                .for_writer(stdout().lock());
            for triple in report.to_triples() {
                serializer.serialize_triple(&triple)?;
            }
            serializer.finish()?.flush()?;

            Ok(if report.conforms() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}

fn load_files(store: &Store, files: &[PathBuf], format: Option<RdfFormat>) -> anyhow::Result<()> {
    for file in files {
        let format = if let Some(format) = format {
            format
        } else {
            rdf_format_from_path(file)?
        };
        let reader = BufReader::new(
            File::open(file).with_context(|| format!("Not able to open {}", file.display()))?,
        );
        let count = store
            .load_from_reader(format, reader)
            .with_context(|| format!("Failed to load {}", file.display()))?;
        debug!(file = %file.display(), count, "Loaded file");
    }
    Ok(())
}

fn format_from_path<T>(
    path: &Path,
    from_extension: impl FnOnce(&str) -> anyhow::Result<T>,
) -> anyhow::Result<T> {
    if let Some(ext) = path.extension().and_then(OsStr::to_str) {
        from_extension(ext).map_err(|e| {
            e.context(format!(
                "Not able to guess the file format from file name extension '{ext}'"
            ))
        })
    } else {
        bail!(
            "The path {} has no extension to guess a file format from",
            path.display()
        )
    }
}

fn rdf_format_from_path(path: &Path) -> anyhow::Result<RdfFormat> {
    format_from_path(path, |ext| {
        RdfFormat::from_extension(ext)
            .with_context(|| format!("The file extension '{ext}' is unknown"))
    })
}

fn rdf_format_from_name(name: &str) -> anyhow::Result<RdfFormat> {
    if let Some(t) = RdfFormat::from_extension(name) {
        return Ok(t);
    }
    if let Some(t) = RdfFormat::from_media_type(name) {
        return Ok(t);
    }
    bail!("The file format '{name}' is unknown")
}

fn query_results_format_from_name(name: &str) -> anyhow::Result<QueryResultsFormat> {
    if let Some(t) = QueryResultsFormat::from_extension(name) {
        return Ok(t);
    }
    if let Some(t) = QueryResultsFormat::from_media_type(name) {
        return Ok(t);
    }
    bail!("The query results format '{name}' is unknown")
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use assert_cmd::Command;
    use assert_fs::prelude::*;
    use assert_fs::NamedTempFile;
    use predicates::prelude::*;

    const DATA: &str = "@prefix ex: <http://example.com/> .
ex:alice a ex:Person ; ex:name \"Alice\" ; ex:age 30 .
ex:bob a ex:Person ; ex:age 12 .
";

    const SHAPES: &str = "@prefix ex: <http://example.com/> .
@prefix sh: <http://www.w3.org/ns/shacl#> .
ex:PersonShape a sh:NodeShape ;
    sh:targetClass ex:Person ;
    sh:property [ sh:path ex:name ; sh:minCount 1 ] .
";

    fn cli_command() -> Command {
        let mut command = Command::new(env!("CARGO"));
        command.arg("run").arg("--bin").arg("rdf-algebra");
        command.arg("--");
        command
    }

    fn turtle_file(name: &str, content: &str) -> Result<NamedTempFile> {
        let file = NamedTempFile::new(name)?;
        file.write_str(content)?;
        Ok(file)
    }

    #[test]
    fn cli_help() {
        cli_command()
            .assert()
            .failure()
            .stdout("")
            .stderr(predicate::str::contains(
                "Command line tool to query and validate RDF files",
            ));
    }

    #[test]
    fn cli_query_select_from_stdin() {
        cli_command()
            .arg("query")
            .arg("--format")
            .arg("nt")
            .arg("--query")
            .arg("SELECT ?o WHERE { ?s ?p ?o }")
            .write_stdin("<http://example.com/s> <http://example.com/p> <http://example.com/o> .\n")
            .assert()
            .stdout("?o\n<http://example.com/o>\n")
            .success();
    }

    #[test]
    fn cli_query_ask_from_file() -> Result<()> {
        let data = turtle_file("data.ttl", DATA)?;
        let query = NamedTempFile::new("query.rq")?;
        query.write_str("PREFIX ex: <http://example.com/> ASK { ex:bob ex:age ?age }")?;
        cli_command()
            .arg("query")
            .arg("--data")
            .arg(data.path())
            .arg("--query-file")
            .arg(query.path())
            .arg("--results-format")
            .arg("json")
            .assert()
            .stdout(predicate::str::contains("\"boolean\":true"))
            .success();
        Ok(())
    }

    #[test]
    fn cli_query_requires_format_for_stdin() {
        cli_command()
            .arg("query")
            .arg("--query")
            .arg("ASK {}")
            .write_stdin("")
            .assert()
            .failure();
    }

    #[test]
    fn cli_query_rejects_unknown_results_format() -> Result<()> {
        let data = turtle_file("data.ttl", DATA)?;
        cli_command()
            .arg("query")
            .arg("--data")
            .arg(data.path())
            .arg("--query")
            .arg("ASK {}")
            .arg("--results-format")
            .arg("foo")
            .assert()
            .failure()
            .stderr(predicate::str::contains("'foo' is unknown"));
        Ok(())
    }

    #[test]
    fn cli_validate_reports_violations() -> Result<()> {
        let data = turtle_file("data.ttl", DATA)?;
        let shapes = turtle_file("shapes.ttl", SHAPES)?;
        cli_command()
            .arg("validate")
            .arg("--data")
            .arg(data.path())
            .arg("--shapes")
            .arg(shapes.path())
            .assert()
            .failure()
            .stdout(predicate::str::contains("sh:ValidationReport"))
            .stdout(predicate::str::contains("<http://example.com/bob>"))
            .stdout(predicate::str::contains("sh:MinCountConstraintComponent"));
        Ok(())
    }

    #[test]
    fn cli_validate_conforming_data() -> Result<()> {
        let data = turtle_file(
            "data.ttl",
            "<http://example.com/alice> a <http://example.com/Person> ; <http://example.com/name> \"Alice\" .",
        )?;
        let shapes = turtle_file("shapes.ttl", SHAPES)?;
        cli_command()
            .arg("validate")
            .arg("--data")
            .arg(data.path())
            .arg("--shapes")
            .arg(shapes.path())
            .assert()
            .success()
            .stdout(predicate::str::contains("sh:ValidationReport"))
            .stdout(predicate::str::contains("sh:result").not());
        Ok(())
    }

    #[test]
    fn rdf_formats_are_guessed_from_extensions() -> Result<()> {
        assert_eq!(rdf_format_from_path(Path::new("a.ttl"))?, RdfFormat::Turtle);
        assert!(rdf_format_from_path(Path::new("a")).is_err());
        assert_eq!(
            query_results_format_from_name("application/sparql-results+json")?,
            QueryResultsFormat::Json
        );
        Ok(())
    }

    #[test]
    fn clap_debug() {
        use clap::CommandFactory;

        Args::command().debug_assert()
    }
}
