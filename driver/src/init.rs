//! This module is responsible for the initialization of the application.
//!

use std::path::Path;
use std::sync::Arc;

use clap::ArgMatches;

use judge::compiler::CompilerRegistry;
use judge::queue::Queue;
use scripting::ScriptHost;

use crate::config::AppConfig;
use crate::AppContext;

error_chain::error_chain! {
    types {
        Error, ErrorKind, ResultExt, Result;
    }

    foreign_links {
        LogError(::log4rs::Error);
        IoError(::std::io::Error);
    }

    links {
        ConfigError(crate::config::Error, crate::config::ErrorKind);
    }
}

/// Initialize log facilities. `log_config_file` is the path to the log configuration file.
fn init_log<P: AsRef<Path>>(log_config_file: P) -> Result<()> {
    log4rs::init_file(log_config_file, log4rs::file::Deserializers::default())?;
    Ok(())
}

/// Initialize the application and return its shared `AppContext`.
pub(crate) fn init<'a>(args: ArgMatches<'a>) -> Result<AppContext> {
    let log_config_file_path = args.value_of("log_config_file")
        .expect("failed to get path to log config file");
    init_log(log_config_file_path)?;

    let config_file = args.value_of("config_file")
        .expect("failed to get path to the configuration file");
    let config = AppConfig::from_file(config_file)?;

    log::info!("Creating scratch directory at {}", config.engine.temporary_folder.display());
    std::fs::create_dir_all(&config.engine.temporary_folder)?;

    let compilers = CompilerRegistry::with_defaults();
    let scripts = ScriptHost::new();
    let queue = Queue::new();

    Ok(AppContext {
        config: Arc::new(config),
        compilers: Arc::new(compilers),
        scripts: Arc::new(scripts),
        queue: Arc::new(queue),
    })
}
