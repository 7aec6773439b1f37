extern crate log;
extern crate error_chain;
extern crate serde;
extern crate serde_yaml;
extern crate tempfile;
extern crate clap;

extern crate judge;
extern crate sandbox;
extern crate scripting;

mod common;
mod config;
mod init;
mod utils;
mod workers;

use std::sync::Arc;

use clap::{App, Arg};

use config::AppConfig;
use judge::compiler::CompilerRegistry;
use judge::queue::Queue;
use scripting::ScriptHost;

error_chain::error_chain! {
    types {
        Error, ErrorKind, ResultExt, Result;
    }

    links {
        InitError(init::Error, init::ErrorKind);
        WorkerError(workers::Error, workers::ErrorKind);
    }
}

/// State shared across the worker thread and (when present) the HTTP front-end: configuration,
/// the compiler registry, the script host, and the task queue.
pub(crate) struct AppContext {
    pub config: Arc<AppConfig>,
    pub compilers: Arc<CompilerRegistry>,
    pub scripts: Arc<ScriptHost>,
    pub queue: Arc<Queue>,
}

fn parse_args<'a>() -> clap::ArgMatches<'a> {
    App::new("wave_judge_driver")
        .version("0.1.0")
        .author("Lancern <msrlancern@126.com>")
        .about("Online judge core judging pipeline")
        .arg(Arg::with_name("config_file")
            .short("c")
            .long("config")
            .value_name("FILE")
            .help("Path to the application configuration file")
            .takes_value(true)
            .required(true))
        .arg(Arg::with_name("log_config_file")
            .short("l")
            .long("log-config")
            .value_name("FILE")
            .help("Path to the log4rs configuration file")
            .takes_value(true)
            .required(true))
        .get_matches()
}

fn run() -> Result<()> {
    let args = parse_args();
    let context = Arc::new(init::init(args)?);

    workers::run(context)?;
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("fatal: {}", e);
        for cause in e.iter().skip(1) {
            eprintln!("  caused by: {}", cause);
        }
        std::process::exit(1);
    }
}
