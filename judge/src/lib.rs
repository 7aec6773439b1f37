//! This crate implements the core judging logic: compiling a submission, running it against an
//! objective's data points inside the sandbox, comparing its output, and deciding how a user's
//! best-known record for a unit should change as a result.
//!

#[macro_use]
extern crate error_chain;
extern crate log;
extern crate libc;
extern crate nix;
extern crate sandbox;
extern crate scripting;

pub mod compiler;
pub mod queue;
pub mod record;
pub mod repository;
pub mod runner;
pub mod template;

use std::time::Duration;

pub use scripting::DataPoint;

error_chain! {
    types {
        Error, ErrorKind, ResultExt, Result;
    }

    links {
        Compiler(compiler::Error, compiler::ErrorKind);
        Template(template::Error, template::ErrorKind);
        Scripting(scripting::Error, scripting::ErrorKind);
    }

    foreign_links {
        Io(::std::io::Error);
        Sandbox(sandbox::Error);
    }
}

/// Identifies a programming language accepted by the compiler registry. A small integer rather
/// than a string so it is cheap to store per-objective and per-submission.
pub type LanguageTag = u8;

/// The C language, compiled with the system `gcc`.
pub const LANG_C: LanguageTag = 0;

/// The C++ language, compiled with the system `g++`.
pub const LANG_CPP: LanguageTag = 1;

/// Judge mode bit flags. `STRICT` and `SPECIAL` are mutually exclusive; their absence means a
/// whitespace-insensitive ("lax") comparison is used. `RANDOM` is independent of the other two and
/// controls where data points come from, not how output is compared.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Default)]
pub struct JudgeMode(u8);

impl JudgeMode {
    pub const STRICT: JudgeMode = JudgeMode(0b001);
    pub const SPECIAL: JudgeMode = JudgeMode(0b010);
    pub const RANDOM: JudgeMode = JudgeMode(0b100);

    pub const fn empty() -> JudgeMode {
        JudgeMode(0)
    }

    pub const fn from_bits(bits: u8) -> JudgeMode {
        JudgeMode(bits)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn contains(self, flag: JudgeMode) -> bool {
        self.0 & flag.0 == flag.0
    }

    pub fn is_strict(self) -> bool {
        self.contains(JudgeMode::STRICT)
    }

    pub fn is_special(self) -> bool {
        self.contains(JudgeMode::SPECIAL)
    }

    pub fn is_random(self) -> bool {
        self.contains(JudgeMode::RANDOM)
    }
}

impl std::ops::BitOr for JudgeMode {
    type Output = JudgeMode;

    fn bitor(self, rhs: JudgeMode) -> JudgeMode {
        JudgeMode(self.0 | rhs.0)
    }
}

/// One objective to be judged: a language-tagged reference to the judgee, the comparison mode,
/// resource limits, and either stored data points or the scripts used to produce them on the fly.
#[derive(Clone, Debug)]
pub struct Objective {
    /// Source code of the submission under judgment.
    pub source: String,

    /// Language the submission is written in.
    pub language: LanguageTag,

    /// Comparison mode for this objective.
    pub mode: JudgeMode,

    /// Default CPU time limit applied to data points that don't specify their own.
    pub time_limit: Duration,

    /// Default memory limit applied to data points that don't specify their own.
    pub memory_limit: usize,

    /// Data points to run the submission against. Ignored entirely when `mode` contains `RANDOM`;
    /// in that case `random_judge_script` is authoritative and is re-run on every judge attempt,
    /// so points stored here (if any) are stale by construction.
    pub points: Vec<DataPoint>,

    /// `RandomJudge` script producing fresh data points. Required when `mode` contains `RANDOM`.
    pub random_judge_script: Option<String>,

    /// `SpecialJudge` script comparing output. Required when `mode` contains `SPECIAL`.
    pub special_judge_script: Option<String>,

    /// How many data points a `RANDOM` objective should generate per judge attempt. Ignored
    /// unless `mode` contains `RANDOM`.
    pub random_point_count: usize,
}

/// A code region used by the template joiner: either a fixed region whose content always appears
/// verbatim, or an editable region that a submitted code fragment fills in.
#[derive(Clone, Debug)]
pub enum Region {
    /// A fixed line of scaffolding code, indented `indent` levels (4 spaces each).
    Fixed { indent: usize, content: String },

    /// An editable line; the submission supplies its content, indented `indent` levels.
    Editable { indent: usize },
}

/// Result codes forming the judge's wire contract. Values are significant and must not be
/// reassigned: negative codes indicate the objective could not be meaningfully judged at all,
/// nonnegative codes are ordinary judging outcomes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ResultCode {
    /// Internal error: something on the judge's own side went wrong.
    IE = -3,

    /// Compile error: the submission did not compile.
    CE = -2,

    /// Wrong answer.
    WA = -1,

    /// Accepted.
    OK = 0,

    /// Runtime error.
    RE = 1,

    /// Time limit exceeded.
    TLE = 2,

    /// Memory limit exceeded.
    MLE = 3,

    /// Security violation: the submission invoked a disallowed syscall.
    SE = 4,
}

/// Outcome of judging a single data point.
#[derive(Clone, Debug)]
pub struct PointResult {
    pub code: ResultCode,

    /// Fractional CPU seconds consumed. Zero when the point was never executed (e.g. `CE`).
    pub exec_time: f64,

    /// Peak resident memory, in bytes. Zero when the point was never executed.
    pub exec_mem: usize,

    /// The disallowed syscall invoked, populated only when `code == SE`.
    pub syscall: Option<i32>,

    /// The signal that killed the judgee, populated only when `code == RE` and termination was
    /// caused by signal delivery.
    pub termsig: Option<i32>,

    /// Compiler diagnostics, populated only when `code == CE`.
    pub compile_log: Option<String>,

    /// The compiler's own exit code, populated only when `code == CE`. Distinguishes e.g. a
    /// compiler crash from a plain syntax-error exit.
    pub compile_exit_code: Option<i32>,

    /// Free-form explanation from a `SpecialJudge` script or a scripting failure, if any.
    pub comment: Option<String>,
}

impl PointResult {
    pub fn compile_error(log: String, exit_code: i32) -> PointResult {
        PointResult {
            code: ResultCode::CE,
            exec_time: 0.0,
            exec_mem: 0,
            syscall: None,
            termsig: None,
            compile_log: Some(log),
            compile_exit_code: Some(exit_code),
            comment: None,
        }
    }

    pub fn internal_error(comment: String) -> PointResult {
        PointResult {
            code: ResultCode::IE,
            exec_time: 0.0,
            exec_mem: 0,
            syscall: None,
            termsig: None,
            compile_log: None,
            compile_exit_code: None,
            comment: Some(comment),
        }
    }
}

/// Outcome of judging an entire objective: the worst code among its points (`CE`/`IE` short
/// circuit the whole run), the number of points that scored `OK`, and the total number of points
/// attempted.
#[derive(Clone, Debug)]
pub struct ObjectiveResult {
    pub code: ResultCode,
    pub passed: usize,
    pub total: usize,
    pub points: Vec<PointResult>,
}

impl ObjectiveResult {
    /// The verdict reported for the whole objective is the code of `Result[0]` when the run was
    /// aborted before any data point ran (`CE`/`IE`), or `OK` only if every point scored `OK`,
    /// or else the code of the first point that did not.
    pub fn overall(&self) -> ResultCode {
        self.code
    }
}
