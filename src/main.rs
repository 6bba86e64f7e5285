extern crate clap;
#[macro_use] extern crate log;
extern crate fern;
extern crate chrono;
extern crate term_grid;

pub mod assembler;

use clap::{Arg, ArgMatches, App};

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use assembler::codegen::{self, Artifact, Header};
use assembler::lexer::Lexer;

fn main() {
    let args = process_arguments();
    initialize_logging(args.occurrences_of("verbose"));

    debug!("Arguments:\n\tVerbosity: {}\n\tPreprocess Only: {}\n\tFormat: {}\n\tOutfile: {}\n\tInfile: {}",
        verbosity(args.occurrences_of("verbose")),
        args.is_present("preprocess"),
        args.value_of("format").unwrap_or("json"),
        args.value_of("output").unwrap_or("None"),
        args.value_of("INPUT").unwrap()
    );

    let ipath = Path::new(args.value_of("INPUT").unwrap());

    let source = match fs::read_to_string(&ipath) {
        Err(err) => {
            error!("fatal: unable to read input file `{}`: {}", ipath.display(), err);
            std::process::exit(1);
        },
        Ok(source) => source,
    };

    if args.is_present("preprocess") {
        preprocess(&source);
        return;
    }

    let assembly = match assembler::assemble(&source) {
        Err(err) => {
            error!("Stopped assembly of `{}`: {}", ipath.display(), err);
            std::process::exit(1);
        },
        Ok(assembly) => assembly,
    };

    for expr in assembly.expressions.iter() {
        info!("Expr: {} = {}", expr.text, expr.value);
    }
    for label in assembly.labels.iter() {
        info!("Label: {} @ 0x{:02X}", label.name, label.position);
    }
    for sub in assembly.subroutines.iter() {
        info!("Subroutine: {} @ 0x{:02X}", sub.name, sub.base_address + 1);
    }

    if args.is_present("print-debug") {
        println!("{}", codegen::listing(&assembly.instructions));
    }

    let format = args.value_of("format").unwrap_or("json");
    let output = match format {
        "bin" => codegen::binary(&assembly.instructions),
        _ => match Artifact::new(Header::default(), &assembly.instructions).to_json() {
            Err(err) => {
                error!("fatal: unable to serialize output: {}", err);
                std::process::exit(1);
            },
            Ok(json) => json.into_bytes(),
        },
    };

    let opath = if let Some(filename) = args.value_of("output") {
        PathBuf::from(filename)
    } else {
        ipath.with_extension(format)
    };

    let mut ofile = match File::create(&opath) {
        Err(err) => {
            error!("fatal: unable to open output file `{}`: {}", opath.display(), err);
            std::process::exit(1);
        },
        Ok(file) => file,
    };

    if let Err(err) = ofile.write_all(&output) {
        error!("fatal: unable to write to output file `{}`: {}", opath.display(), err);
        std::process::exit(1);
    }
    info!("Output written to {}", opath.display());
}

/// Prints the expanded token stream without parsing it.
fn preprocess(source: &str) {
    let lexed = match Lexer::new(source).tokenize() {
        Err(err) => {
            error!("Stopped preprocessing: {}", err);
            std::process::exit(1);
        },
        Ok(lexed) => lexed,
    };

    let line: Vec<String> = lexed.tokens.iter().map(|t| t.to_string()).collect();
    println!("{}", line.join(" "));

    for (name, tokens) in lexed.subroutines.iter() {
        let body: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();
        println!("@start {}: {}", name, body.join(" "));
    }
    for (name, token) in lexed.definitions.iter() {
        println!("@define {} = {}", name, token);
    }
    for expr in lexed.expressions.iter() {
        println!("@expr {} = {}", expr.text, expr.value);
    }
}

fn process_arguments() -> ArgMatches<'static> {
    App::new(option_env!("CARGO_PKG_NAME").unwrap())
        .version(option_env!("CARGO_PKG_VERSION").unwrap())
        .author(option_env!("CARGO_PKG_AUTHORS").unwrap())
        .about(option_env!("CARGO_PKG_DESCRIPTION").unwrap())
        .arg(Arg::with_name("INPUT")
            .help("Sets the input file to use")
            .required(true)
            .multiple(false)
            .index(1))
        .arg(Arg::with_name("verbose")
            .short("v")
            .multiple(true)
            .takes_value(false)
            .help("Sets the level of verbosity"))
        .arg(Arg::with_name("output")
            .short("o")
            .takes_value(true)
            .help("write output to an outfile"))
        .arg(Arg::with_name("format")
            .short("f")
            .takes_value(true)
            .possible_values(&["json", "bin"])
            .default_value("json")
            .help("output format"))
        .arg(Arg::with_name("preprocess")
            .short("e")
            .takes_value(false)
            .help("preprocess only, printing the expanded token stream"))
        .arg(Arg::with_name("print-debug")
            .short("d")
            .alias("show")
            .alias("s")
            .takes_value(false)
            .help("prints the debug information alongside the assembly to STDOUT"))
        .get_matches()
}

fn verbosity(occurrences: u64) -> log::LevelFilter {
    match occurrences {
        0 => log::LevelFilter::Error,
        1 => log::LevelFilter::Warn,
        2 => log::LevelFilter::Info,
        3 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    }
}

fn initialize_logging(occurrences: u64) {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(verbosity(occurrences))
        .chain(std::io::stderr())
        .apply().ok();
}
