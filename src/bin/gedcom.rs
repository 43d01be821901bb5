//! Command-line interface for gedcom
//! This binary validates GEDCOM files against a lineage-linked grammar and
//! converts them into inspection formats.
//!
//! Usage:
//!   gedcom validate `<path>` --grammar `<gedg>` [--strict]   - Parse and report
//!   gedcom convert `<path>` --grammar `<gedg>` [--format `<format>`] - Re-emit as ged/json/treeviz
//!   gedcom info `<path>` --grammar `<gedg>`                - Charset and record counts

use clap::{Arg, ArgAction, Command};
use tracing_subscriber::EnvFilter;

use gedcom::gedcom::{formats, GrammarOptions, Store};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let grammar_arg = Arg::new("grammar")
        .long("grammar")
        .short('g')
        .help("Path to the .gedg grammar file")
        .required(true);
    let strict_arg = Arg::new("strict")
        .long("strict")
        .help("Treat unrecognized grammar tokens as errors")
        .action(ArgAction::SetTrue);

    let matches = Command::new("gedcom")
        .version(env!("CARGO_PKG_VERSION"))
        .about("A tool for validating and inspecting GEDCOM files")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("validate")
                .about("Parse a GEDCOM file against a grammar and report the outcome")
                .arg(
                    Arg::new("path")
                        .help("Path to the .ged file")
                        .required(true)
                        .index(1),
                )
                .arg(grammar_arg.clone())
                .arg(strict_arg.clone()),
        )
        .subcommand(
            Command::new("convert")
                .about("Re-emit a GEDCOM file in another format")
                .arg(
                    Arg::new("path")
                        .help("Path to the .ged file")
                        .required(true)
                        .index(1),
                )
                .arg(grammar_arg.clone())
                .arg(strict_arg.clone())
                .arg(
                    Arg::new("format")
                        .long("format")
                        .short('f')
                        .help("Output format ('ged', 'json' or 'treeviz')")
                        .default_value("treeviz"),
                ),
        )
        .subcommand(
            Command::new("info")
                .about("Show charset and record counts")
                .arg(
                    Arg::new("path")
                        .help("Path to the .ged file")
                        .required(true)
                        .index(1),
                )
                .arg(grammar_arg)
                .arg(strict_arg),
        )
        .get_matches();

    match matches.subcommand() {
        Some(("validate", sub)) => {
            let store = load(sub);
            println!(
                "ok: {} records, charset {}",
                store.root().children().len(),
                store.charset()
            );
        }
        Some(("convert", sub)) => {
            let store = load(sub);
            let format = sub.get_one::<String>("format").unwrap();
            handle_convert(&store, format);
        }
        Some(("info", sub)) => {
            let store = load(sub);
            handle_info(&store);
        }
        _ => unreachable!(),
    }
}

/// Load the store from the subcommand's path/grammar/strict arguments,
/// exiting with the error message on failure.
fn load(matches: &clap::ArgMatches) -> Store {
    let path = matches.get_one::<String>("path").unwrap();
    let grammar = matches.get_one::<String>("grammar").unwrap();
    let options = GrammarOptions {
        strict: matches.get_flag("strict"),
    };
    match Store::load_with_options(grammar, path, options) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn handle_convert(store: &Store, format: &str) {
    match format {
        "ged" => {
            let mut stdout = std::io::stdout().lock();
            if let Err(e) = store.write(&mut stdout) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        "json" => println!("{}", formats::to_json(store.root())),
        "treeviz" => print!("{}", formats::to_treeviz_str(store.root())),
        other => {
            eprintln!("Error: unknown format '{}'", other);
            std::process::exit(1);
        }
    }
}

fn handle_info(store: &Store) {
    println!("charset:     {}", store.charset());
    if let Some(header) = store.header() {
        if let Some(source) = header.child_with_tag("SOUR") {
            println!("source:      {}", source.value().unwrap_or_default());
        }
    }
    println!("individuals: {}", store.individuals().len());
    println!("families:    {}", store.families().len());
    println!("sources:     {}", store.sources().len());
    println!("notes:       {}", store.notes().len());
    println!("records:     {}", store.root().children().len());
}
