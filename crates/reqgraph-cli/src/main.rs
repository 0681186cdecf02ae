//! `reqgraph` command-line entry point

use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use reqgraph_core::EngineConfig;
use std::path::PathBuf;

fn doc_arg() -> Arg {
    Arg::new("doc")
        .long("doc")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("Wire document (JSON)")
}

fn out_arg() -> Arg {
    Arg::new("out")
        .long("out")
        .value_parser(value_parser!(PathBuf))
        .help("Write the result here instead of over --doc")
}

fn cli() -> Command {
    Command::new("reqgraph")
        .version(reqgraph_core::VERSION)
        .about("Offline tools for requirements graph documents")
        .subcommand_required(true)
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
        .subcommand(
            Command::new("parse")
                .about("Show the patches a generated reply proposes")
                .arg(
                    Arg::new("reply")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("File holding the reply text"),
                ),
        )
        .subcommand(
            Command::new("apply")
                .about("Apply a generated reply to a document")
                .arg(doc_arg())
                .arg(
                    Arg::new("reply")
                        .long("reply")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("File holding the reply text"),
                )
                .arg(
                    Arg::new("user-text")
                        .long("user-text")
                        .help("User turn text, used to re-grade open items"),
                )
                .arg(out_arg()),
        )
        .subcommand(
            Command::new("recompute")
                .about("Rebuild every dependency edge")
                .arg(doc_arg())
                .arg(out_arg()),
        )
        .subcommand(
            Command::new("view")
                .about("Print the redacted JSON view")
                .arg(doc_arg()),
        )
        .subcommand(
            Command::new("render")
                .about("Print the document as prompt text")
                .arg(doc_arg()),
        )
        .subcommand(
            Command::new("config")
                .about("Print the effective engine configuration")
                .arg(
                    Arg::new("file")
                        .long("file")
                        .value_parser(value_parser!(PathBuf))
                        .help("TOML file to validate and merge over the defaults"),
                ),
        )
}

fn path(args: &ArgMatches, name: &str) -> anyhow::Result<PathBuf> {
    args.get_one::<PathBuf>(name)
        .cloned()
        .with_context(|| format!("missing argument: {name}"))
}

fn output_path(args: &ArgMatches) -> anyhow::Result<PathBuf> {
    match args.get_one::<PathBuf>("out") {
        Some(out) => Ok(out.clone()),
        None => path(args, "doc"),
    }
}

fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();
    reqgraph_cli::init_tracing(matches.get_flag("json-logs"));

    match matches.subcommand() {
        Some(("parse", args)) => {
            let reply_path = path(args, "reply")?;
            let reply = std::fs::read_to_string(&reply_path)
                .with_context(|| format!("reading {}", reply_path.display()))?;
            print!("{}", reqgraph_cli::describe_reply(&reqgraph_delta::parse_delta(&reply)));
        }
        Some(("apply", args)) => {
            let mut document = reqgraph_cli::load_document(&path(args, "doc")?)?;
            let reply_path = path(args, "reply")?;
            let reply = std::fs::read_to_string(&reply_path)
                .with_context(|| format!("reading {}", reply_path.display()))?;
            let user_text = args.get_one::<String>("user-text").map(String::as_str);

            let summary = reqgraph_cli::apply_reply(&mut document, &reply, user_text)?;
            reqgraph_cli::save_document(&output_path(args)?, &document)?;

            print!("{}", reqgraph_cli::format_changes(&summary.diffs, &summary.diagnostics));
            if !summary.assistant_text.is_empty() {
                println!("---\n{}", summary.assistant_text);
            }
        }
        Some(("recompute", args)) => {
            let mut document = reqgraph_cli::load_document(&path(args, "doc")?)?;
            let (diffs, diagnostics) = reqgraph_cli::recompute(&mut document);
            reqgraph_cli::save_document(&output_path(args)?, &document)?;
            print!("{}", reqgraph_cli::format_changes(&diffs, &diagnostics));
        }
        Some(("view", args)) => {
            let document = reqgraph_cli::load_document(&path(args, "doc")?)?;
            println!("{}", reqgraph_cli::view(&document)?);
        }
        Some(("render", args)) => {
            let document = reqgraph_cli::load_document(&path(args, "doc")?)?;
            print!("{}", reqgraph_cli::render(&document));
        }
        Some(("config", args)) => {
            let config = match args.get_one::<PathBuf>("file") {
                Some(file) => EngineConfig::from_file(file)?,
                None => EngineConfig::new(),
            };
            print!("{}", config.to_toml_string()?);
        }
        _ => unreachable!("subcommand is required"),
    }
    Ok(())
}
