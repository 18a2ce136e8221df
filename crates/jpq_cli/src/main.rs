use jpq_core::CompiledPath;
use serde_json::Value;
use std::env;
use std::fs;
use std::io::{self, Read};
use std::process::ExitCode;

const VERSION: &str = env!("CARGO_PKG_VERSION");

const USAGE: &str = "Usage: jpq [OPTIONS] <QUERY> [FILE]";

fn print_help() {
    println!(
        "jpq {VERSION} - JSONPath query tool

{USAGE}

Arguments:
  <QUERY>    JSONPath expression (e.g. '$.store.book[?(@.price<10)].title')
  [FILE]     Input JSON file (reads from stdin if omitted)

Options:
  -c, --compact  Print matches on one line instead of pretty-printing
  -h, --help     Show this help message
  -V, --version  Show version"
    );
}

struct Cli {
    query: String,
    file: Option<String>,
    compact: bool,
}

enum Invocation {
    Help,
    Version,
    Run(Cli),
}

fn parse_args(args: &[String]) -> Result<Invocation, String> {
    let mut positional: Vec<&String> = Vec::new();
    let mut compact = false;

    for arg in args {
        match arg.as_str() {
            "-h" | "--help" => return Ok(Invocation::Help),
            "-V" | "--version" => return Ok(Invocation::Version),
            "-c" | "--compact" => compact = true,
            s if s.starts_with('-') => {
                return Err(format!(
                    "unknown option: {s}\n\n{USAGE}\n\nFor more information, try '--help'"
                ));
            }
            _ => positional.push(arg),
        }
    }

    let mut positional = positional.into_iter();
    let Some(query) = positional.next() else {
        return Err(format!(
            "missing required argument: <QUERY>\n\n{USAGE}\n\nFor more information, try '--help'"
        ));
    };
    let file = positional.next().cloned();

    if positional.next().is_some() {
        return Err(format!(
            "too many arguments\n\n{USAGE}\n\nFor more information, try '--help'"
        ));
    }

    Ok(Invocation::Run(Cli {
        query: query.clone(),
        file,
        compact,
    }))
}

fn read_input(file: Option<&str>) -> Result<String, String> {
    if let Some(path) = file {
        return fs::read_to_string(path).map_err(|e| format!("error reading file '{path}': {e}"));
    }

    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .map_err(|e| format!("error reading stdin: {e}"))?;
    Ok(buffer)
}

fn run_query(cli: &Cli) -> Result<(), String> {
    // compile before touching the input so query errors surface immediately
    let path: CompiledPath =
        jpq_core::compile(&cli.query).map_err(|e| format!("error in query: {e}"))?;

    let input = read_input(cli.file.as_deref())?;

    let json: Value =
        serde_json::from_str(&input).map_err(|e| format!("error parsing JSON: {e}"))?;

    let results = path.query_ref(&json);

    let output = if cli.compact {
        serde_json::to_string(&results)
    } else {
        serde_json::to_string_pretty(&results)
    }
    .map_err(|e| format!("error serializing output: {e}"))?;

    println!("{output}");
    Ok(())
}

fn run() -> Result<(), String> {
    let args: Vec<String> = env::args().skip(1).collect();

    match parse_args(&args)? {
        Invocation::Help => {
            print_help();
            Ok(())
        }
        Invocation::Version => {
            println!("jpq {VERSION}");
            Ok(())
        }
        Invocation::Run(cli) => run_query(&cli),
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("jpq: {e}");
            ExitCode::FAILURE
        }
    }
}
