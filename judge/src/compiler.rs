//! The compiler registry: a mapping from a submission's `LanguageTag` to the function that
//! compiles it. The default registry knows C and C++, both compiled with the system GCC
//! toolchain; callers can extend it with more entries by language tag.
//!

use std::collections::HashMap;
use std::io::Read;
use std::path::PathBuf;

use sandbox::ProcessBuilder;

use super::LanguageTag;
use super::{LANG_C, LANG_CPP};

error_chain! {
    types {
        Error, ErrorKind, ResultExt, Result;
    }

    foreign_links {
        Io(::std::io::Error);
        Sandbox(sandbox::Error);
    }

    errors {
        MissingCompiler(lang: LanguageTag) {
            description("no compiler registered for language tag")
            display("no compiler registered for language tag {}", lang)
        }
    }
}

/// Outcome of a compilation attempt.
#[derive(Clone, Debug)]
pub enum CompileOutcome {
    /// The submission compiled; `binary` is the path to the resulting executable and `exit_code`
    /// is the compiler's own exit code (normally `0`).
    Success { binary: PathBuf, exit_code: i32 },

    /// The submission failed to compile; `log` holds the compiler's combined output and
    /// `exit_code` its exit code, distinguishing e.g. a compiler crash from a plain syntax error.
    Failure { log: String, exit_code: i32 },
}

/// A compile function: takes the submission's source text and a scratch directory to work in,
/// and produces a `CompileOutcome`. The source file is always removed before this function
/// returns, whether compilation succeeded or failed.
pub type CompileFn = Box<dyn Fn(&str, &std::path::Path) -> Result<CompileOutcome> + Send + Sync>;

/// A `LanguageTag -> CompileFn` registry, extensible by language tag.
pub struct CompilerRegistry {
    compilers: HashMap<LanguageTag, CompileFn>,
}

impl CompilerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        CompilerRegistry { compilers: HashMap::new() }
    }

    /// Create the default registry, seeded with C and C++ compiled via the system toolchain.
    pub fn with_defaults() -> Self {
        let mut reg = CompilerRegistry::new();
        reg.register(LANG_C, Box::new(|src, dir| compile_gcc(src, dir, false)));
        reg.register(LANG_CPP, Box::new(|src, dir| compile_gcc(src, dir, true)));
        reg
    }

    /// Register (or replace) the compile function for `lang`.
    pub fn register(&mut self, lang: LanguageTag, compile: CompileFn) {
        self.compilers.insert(lang, compile);
    }

    /// Compile `source` for the given language, using `scratch_dir` for intermediate files.
    pub fn compile(&self, lang: LanguageTag, source: &str, scratch_dir: &std::path::Path)
        -> Result<CompileOutcome> {
        let compile_fn = self.compilers.get(&lang)
            .ok_or_else(|| Error::from(ErrorKind::MissingCompiler(lang)))?;
        compile_fn(source, scratch_dir)
    }
}

impl Default for CompilerRegistry {
    fn default() -> Self {
        CompilerRegistry::with_defaults()
    }
}

/// Compile `source` with the system `gcc`/`g++`, writing it to a randomly named file in
/// `scratch_dir` first. The source file is deleted before this function returns, regardless of
/// outcome.
fn compile_gcc(source: &str, scratch_dir: &std::path::Path, is_cpp: bool) -> Result<CompileOutcome> {
    let (src_path, exe_path) = random_file_pair(scratch_dir, if is_cpp { "cpp" } else { "c" });

    std::fs::write(&src_path, source)?;
    let compile_result = run_gcc(&src_path, &exe_path, is_cpp);
    std::fs::remove_file(&src_path).ok();

    let (exit_code, log) = compile_result?;
    if exit_code == 0 {
        Ok(CompileOutcome::Success { binary: exe_path, exit_code })
    } else {
        Ok(CompileOutcome::Failure { log, exit_code })
    }
}

/// Invoke the compiler, returning its exit code and combined stdout+stderr. A non-`Normal` exit
/// status (e.g. the compiler was killed by a signal) is reported as exit code `-1`.
fn run_gcc(src_path: &std::path::Path, exe_path: &std::path::Path, is_cpp: bool)
    -> Result<(i32, String)> {
    let compiler = if is_cpp { "g++" } else { "gcc" };

    let compiler_path = sandbox_path_for(compiler);
    let mut builder = ProcessBuilder::new(&compiler_path);
    builder.add_arg(src_path.to_string_lossy().as_ref())?;
    builder.add_arg("-o")?;
    builder.add_arg(exe_path.to_string_lossy().as_ref())?;
    builder.add_arg("-O2")?;
    builder.add_arg("-DONLINE_JUDGE")?;
    if is_cpp {
        builder.add_arg("-std=c++17")?;
    } else {
        builder.add_arg("-std=c11")?;
    }
    builder.add_arg("-lm")?;
    builder.inherit_env();

    let log_file = tempfile::tempfile()?;
    let mut log_read = log_file.try_clone()?;
    builder.redirections.stdout = Some(log_file.try_clone()?);
    builder.redirections.stderr = Some(log_file);

    let mut process = builder.start()?;
    process.wait_for_exit()?;

    let mut log = String::new();
    use std::io::{Seek, SeekFrom};
    log_read.seek(SeekFrom::Start(0))?;
    log_read.read_to_string(&mut log)?;

    let exit_code = match process.exit_status() {
        sandbox::ProcessExitStatus::Normal(code) => code,
        _ => -1,
    };
    Ok((exit_code, log))
}

/// Resolve `name` against `PATH`, falling back to the bare name if it cannot be found (letting
/// `execve` itself report the failure).
fn sandbox_path_for(name: &str) -> PathBuf {
    which(name).unwrap_or_else(|| PathBuf::from(name))
}

fn which(name: &str) -> Option<PathBuf> {
    let path_env = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&path_env) {
        let candidate = dir.join(name);
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}

/// Produce a random (source, executable) file path pair inside `dir`.
fn random_file_pair(dir: &std::path::Path, src_ext: &str) -> (PathBuf, PathBuf) {
    use rand::Rng;
    let name: String = rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(16)
        .map(char::from)
        .collect();

    (dir.join(format!("{}.{}", name, src_ext)), dir.join(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_compiler_is_a_typed_error() {
        let reg = CompilerRegistry::new();
        let dir = tempfile::tempdir().unwrap();
        let err = reg.compile(LANG_C, "int main(){return 0;}", dir.path()).unwrap_err();
        match err.0 {
            ErrorKind::MissingCompiler(lang) => assert_eq!(lang, LANG_C),
            _ => panic!("expected MissingCompiler"),
        }
    }

    #[test]
    fn random_file_pair_shares_scratch_dir() {
        let dir = tempfile::tempdir().unwrap();
        let (src, exe) = random_file_pair(dir.path(), "c");
        assert_eq!(src.parent(), Some(dir.path()));
        assert_eq!(exe.parent(), Some(dir.path()));
        assert_eq!(src.file_stem(), exe.file_name());
    }
}
