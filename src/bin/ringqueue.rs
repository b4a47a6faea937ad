//! Thin operational CLI over the ring queue engine.
//!
//! Carries no on-disk format or protocol of its own; every subcommand is a
//! direct translation of command-line arguments into a call on
//! `ringqueue::Queue`.

use clap::{Arg, ArgMatches, Command};
use ringqueue::Queue;
use std::process::ExitCode;

fn cli() -> ArgMatches {
    Command::new("ringqueue")
        .about("Inspect and drive a file-backed FIFO queue")
        .version("0.1.0")
        .arg(
            Arg::new("path")
                .help("Path to the queue file")
                .required(true)
                .value_parser(clap::builder::NonEmptyStringValueParser::new()),
        )
        .subcommand(
            Command::new("add")
                .about("Append an element read from stdin, or from an argument")
                .arg(Arg::new("bytes").help("Literal bytes to append")),
        )
        .subcommand(Command::new("peek").about("Print the head element without removing it"))
        .subcommand(Command::new("remove").about("Remove the head element"))
        .subcommand(Command::new("size").about("Print the number of live elements"))
        .subcommand(Command::new("clear").about("Discard all elements"))
        .subcommand_required(true)
        .get_matches()
}

fn main() -> ExitCode {
    env_logger::init();
    let args = cli();

    let path = args.get_one::<String>("path").expect("path is required");
    let mut queue = match Queue::open(path) {
        Ok(q) => q,
        Err(err) => {
            eprintln!("failed to open queue at {path}: {err}");
            return ExitCode::FAILURE;
        }
    };

    let result = match args.subcommand() {
        Some(("add", sub)) => run_add(&mut queue, sub),
        Some(("peek", _)) => run_peek(&mut queue),
        Some(("remove", _)) => run_remove(&mut queue),
        Some(("size", _)) => {
            println!("{}", queue.size());
            Ok(())
        }
        Some(("clear", _)) => run_clear(&mut queue),
        _ => unreachable!("clap enforces a subcommand"),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}

fn run_add(queue: &mut Queue<ringqueue::FileBackend>, sub: &ArgMatches) -> Result<(), String> {
    let data: Vec<u8> = match sub.get_one::<String>("bytes") {
        Some(literal) => literal.as_bytes().to_vec(),
        None => {
            use std::io::Read;
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .map_err(|err| format!("failed to read stdin: {err}"))?;
            buf
        }
    };

    match queue.add(&data) {
        Ok(true) => {
            log::info!("added element of {} bytes", data.len());
            Ok(())
        }
        Ok(false) => Err("add failed: a write did not complete".to_string()),
        Err(err) => Err(format!("add failed: {err}")),
    }
}

fn run_peek(queue: &mut Queue<ringqueue::FileBackend>) -> Result<(), String> {
    match queue.peek() {
        Ok(Some(bytes)) => {
            use std::io::Write;
            std::io::stdout()
                .write_all(&bytes)
                .map_err(|err| format!("failed to write stdout: {err}"))?;
            Ok(())
        }
        Ok(None) => {
            println!("(queue is empty)");
            Ok(())
        }
        Err(err) => Err(format!("peek failed: {err}")),
    }
}

fn run_remove(queue: &mut Queue<ringqueue::FileBackend>) -> Result<(), String> {
    match queue.remove() {
        Ok(true) => Ok(()),
        Ok(false) => Err("remove failed: queue is empty or a write did not complete".to_string()),
        Err(err) => Err(format!("remove failed: {err}")),
    }
}

fn run_clear(queue: &mut Queue<ringqueue::FileBackend>) -> Result<(), String> {
    match queue.clear() {
        Ok(true) => Ok(()),
        Ok(false) => Err("clear failed: a write did not complete".to_string()),
        Err(err) => Err(format!("clear failed: {err}")),
    }
}
