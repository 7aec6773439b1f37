//! This module maintains application wide configurations.
//!

use std::path::{Path, PathBuf};

use log::info;
use serde::Deserialize;

error_chain::error_chain! {
    types {
        Error, ErrorKind, ResultExt, Result;
    }

    foreign_links {
        IoError(::std::io::Error);
        SerdeYamlError(::serde_yaml::Error);
    }

    errors {
        InvalidConfigFile {
            description("invalid config file")
        }
    }
}

/// Provide application wide configuration, loaded once at startup from a YAML file.
#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// Judge engine related configuration.
    pub engine: JudgeEngineConfig,

    /// Authentication related configuration, consumed by the HTTP front-end that sits in front of
    /// this crate's queue.
    pub auth: AuthConfig,

    /// Storage connection details, consumed by whatever `judge::repository::Repository`
    /// implementation a deployment wires up.
    pub storage: StorageConfig,
}

/// Provide judge engine related configuration.
#[derive(Debug, Deserialize)]
pub struct JudgeEngineConfig {
    /// Scratch directory under which compiler intermediates and judgee binaries are created.
    /// Each is given a random, collision-resistant name under this directory.
    pub temporary_folder: PathBuf,

    /// Path to the `gcc`/`g++` toolchain used to compile C/C++ submissions.
    pub gcc_path: PathBuf,

    /// Syscall numbers forbidden to judgee processes.
    pub disallowed_syscall: Vec<i32>,

    /// When true, an objective's data points are judged concurrently instead of sequentially.
    pub async_execute: bool,
}

/// Provide authentication and front-end related configuration.
#[derive(Debug, Deserialize)]
pub struct AuthConfig {
    /// Lifetime of an issued access token, in seconds.
    pub token_lifetime: u64,

    /// Side length, in characters, of generated captcha text.
    pub captcha_size: u32,

    /// Directory served as static content by the HTTP front-end.
    pub static_directory: PathBuf,

    /// Name of the cookie carrying the access token.
    pub cookie_name: String,

    /// Name of the HTTP header accepted as an alternative to the cookie.
    pub header_name: String,
}

/// Provide storage connection configuration.
#[derive(Debug, Deserialize)]
pub struct StorageConfig {
    /// Connection string template for the backing document store.
    pub connection_string: String,

    /// Credentials used to authenticate the connection.
    pub username: String,
    pub password: String,
}

impl AppConfig {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(config_file: P) -> Result<AppConfig> {
        let config_file = config_file.as_ref();
        info!("Loading application configuration from {}", config_file.display());

        let content = std::fs::read_to_string(config_file)
            .chain_err(|| Error::from(ErrorKind::InvalidConfigFile))?;
        serde_yaml::from_str(&content)
            .chain_err(|| Error::from(ErrorKind::InvalidConfigFile))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_app_config_yaml() {
        let yaml = r#"
            engine:
                temporary_folder: "/tmp/wave_judge"
                gcc_path: "/usr/bin/gcc"
                disallowed_syscall: [57, 59, 101]
                async_execute: false
            auth:
                token_lifetime: 3600
                captcha_size: 5
                static_directory: "/srv/static"
                cookie_name: "wj_token"
                header_name: "X-Wave-Judge-Token"
            storage:
                connection_string: "mongodb://{host}/wave_judge"
                username: "wave_judge"
                password: "secret"
        "#;
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(PathBuf::from("/tmp/wave_judge"), config.engine.temporary_folder);
        assert_eq!(PathBuf::from("/usr/bin/gcc"), config.engine.gcc_path);
        assert_eq!(vec![57, 59, 101], config.engine.disallowed_syscall);
        assert!(!config.engine.async_execute);

        assert_eq!(3600, config.auth.token_lifetime);
        assert_eq!(5, config.auth.captcha_size);
        assert_eq!("wj_token", config.auth.cookie_name);
        assert_eq!("X-Wave-Judge-Token", config.auth.header_name);

        assert_eq!("wave_judge", config.storage.username);
    }
}
