//! The objective runner: compiles a submission, runs it against an objective's data points inside
//! the sandbox, and compares its output, either literally, by a lax whitespace-insensitive
//! comparison, or by delegating to a `SpecialJudge` script.
//!

use std::path::Path;

use sandbox::{execute, ExecLimits, ExecVerdict, MemorySize};
use scripting::{AuxSlot, DataPoint, ScriptHost};

use super::compiler::{CompileOutcome, CompilerRegistry};
use super::{Objective, ObjectiveResult, PointResult, ResultCode};

error_chain! {
    types {
        Error, ErrorKind, ResultExt, Result;
    }

    links {
        Compiler(super::compiler::Error, super::compiler::ErrorKind);
        Scripting(scripting::Error, scripting::ErrorKind);
    }

    foreign_links {
        Io(::std::io::Error);
        Sandbox(sandbox::Error);
    }
}

/// Runs objectives against a shared compiler registry, script host and syscall blacklist.
pub struct ObjectiveRunner<'a> {
    compilers: &'a CompilerRegistry,
    scripts: &'a ScriptHost,
    disallowed_syscalls: Vec<i32>,

    /// When true, an objective's data points are judged concurrently, one thread per point,
    /// instead of sequentially. Every point still runs to completion in either mode.
    async_execute: bool,
}

impl<'a> ObjectiveRunner<'a> {
    pub fn new(
        compilers: &'a CompilerRegistry,
        scripts: &'a ScriptHost,
        disallowed_syscalls: Vec<i32>,
        async_execute: bool,
    ) -> Self {
        ObjectiveRunner { compilers, scripts, disallowed_syscalls, async_execute }
    }

    /// Compile and judge `objective`, using `scratch_dir` for compiler intermediates.
    pub fn run(&self, objective: &Objective, scratch_dir: &Path) -> Result<ObjectiveResult> {
        let binary = match self.compilers.compile(objective.language, &objective.source, scratch_dir)? {
            CompileOutcome::Failure { log, exit_code } => {
                let expected_total = if objective.mode.is_random() {
                    objective.random_point_count
                } else {
                    objective.points.len()
                };
                return Ok(ObjectiveResult {
                    code: ResultCode::CE,
                    passed: 0,
                    total: expected_total,
                    points: vec![PointResult::compile_error(log, exit_code)],
                });
            },
            CompileOutcome::Success { binary, .. } => binary,
        };

        // The scratch slot lives for exactly one objective run: created here, dropped at the end
        // of this function, regardless of outcome.
        let aux = AuxSlot::new();

        let points = if objective.mode.is_random() {
            self.generate_random_points(objective, &aux)?
        } else {
            objective.points.clone()
        };

        let total = points.len();
        let results = if self.async_execute {
            self.run_points_concurrent(objective, &binary, &points, &aux)?
        } else {
            self.run_points_sequential(objective, &binary, &points, &aux)?
        };

        let (passed, overall) = summarize(&results);
        Ok(ObjectiveResult { code: overall, passed, total, points: results })
    }

    /// Judge every point in order on the calling thread. Every point runs regardless of earlier
    /// verdicts: the end-to-end contract is `Vec<Result>` of length `points.len()`.
    fn run_points_sequential(
        &self,
        objective: &Objective,
        binary: &Path,
        points: &[DataPoint],
        aux: &AuxSlot,
    ) -> Result<Vec<PointResult>> {
        let mut results = Vec::with_capacity(points.len());
        for (index, point) in points.iter().enumerate() {
            results.push(self.run_point(objective, binary, point, index as i64, aux)?);
        }
        Ok(results)
    }

    /// Judge every point concurrently, one scoped thread per point, joining all of them before
    /// returning. Used when `async_execute` is set.
    fn run_points_concurrent(
        &self,
        objective: &Objective,
        binary: &Path,
        points: &[DataPoint],
        aux: &AuxSlot,
    ) -> Result<Vec<PointResult>> {
        let mut results: Vec<Option<PointResult>> = (0..points.len()).map(|_| None).collect();

        std::thread::scope(|scope| -> Result<()> {
            let handles: Vec<_> = points.iter().enumerate()
                .map(|(index, point)| {
                    scope.spawn(move || self.run_point(objective, binary, point, index as i64, aux))
                })
                .collect();

            for (index, handle) in handles.into_iter().enumerate() {
                let point_result = handle.join().expect("judging thread panicked")?;
                results[index] = Some(point_result);
            }
            Ok(())
        })?;

        Ok(results.into_iter().map(|r| r.expect("every point is judged exactly once")).collect())
    }

    fn generate_random_points(&self, objective: &Objective, aux: &AuxSlot) -> Result<Vec<DataPoint>> {
        let script = objective.random_judge_script.as_deref()
            .expect("RANDOM mode objective without a random_judge_script");

        let mut points = Vec::with_capacity(objective.random_point_count);
        for index in 0..objective.random_point_count {
            points.push(self.scripts.invoke_random_judge(script, index as i64, aux)?);
        }
        Ok(points)
    }

    fn run_point(
        &self,
        objective: &Objective,
        binary: &Path,
        point: &DataPoint,
        index: i64,
        aux: &AuxSlot,
    ) -> Result<PointResult> {
        let time_limit = if point.time_limit_secs > 0 {
            std::time::Duration::from_secs(point.time_limit_secs)
        } else {
            objective.time_limit
        };
        let memory_limit = if point.memory_limit_bytes > 0 {
            point.memory_limit_bytes
        } else {
            objective.memory_limit
        };

        let limits = ExecLimits {
            time_limit,
            memory_limit: MemorySize::Bytes(memory_limit),
        };

        let (stdout, exec_result) = execute(binary, &point.stdin, limits, &self.disallowed_syscalls)?;

        let code = match exec_result.verdict {
            ExecVerdict::Ok => {
                match self.compare(objective, point, &stdout, index, aux) {
                    Ok(true) => ResultCode::OK,
                    Ok(false) => ResultCode::WA,
                    Err(e) => {
                        return Ok(PointResult {
                            code: ResultCode::IE,
                            exec_time: exec_result.exec_time,
                            exec_mem: exec_result.exec_mem,
                            syscall: None,
                            termsig: None,
                            compile_log: None,
                            compile_exit_code: None,
                            comment: Some(format!("{}", e)),
                        });
                    }
                }
            },
            ExecVerdict::RuntimeError => ResultCode::RE,
            ExecVerdict::TimeLimitExceeded => ResultCode::TLE,
            ExecVerdict::MemoryLimitExceeded => ResultCode::MLE,
            ExecVerdict::SecurityViolation => ResultCode::SE,
        };

        Ok(PointResult {
            code,
            exec_time: exec_result.exec_time,
            exec_mem: exec_result.exec_mem,
            syscall: exec_result.syscall,
            termsig: exec_result.termsig,
            compile_log: None,
            compile_exit_code: None,
            comment: None,
        })
    }

    /// Compare `got` against the expected output for `point`, per `objective.mode`.
    fn compare(
        &self,
        objective: &Objective,
        point: &DataPoint,
        got: &str,
        index: i64,
        aux: &AuxSlot,
    ) -> Result<bool> {
        if objective.mode.is_special() {
            let script = objective.special_judge_script.as_deref()
                .expect("SPECIAL mode objective without a special_judge_script");
            Ok(self.scripts.invoke_special_judge(script, got, &point.expected_stdout, index, aux)?)
        } else if objective.mode.is_strict() {
            Ok(got == point.expected_stdout)
        } else {
            Ok(lax_eq(got, &point.expected_stdout))
        }
    }
}

/// Fold a fully-judged objective's per-point results into `(passed, overall)`: `passed` is the
/// number of points that scored `OK`, and `overall` is `OK` only when every point did, or else the
/// code of the first point (in index order) that did not. Every point is assumed to have already
/// run; this never short-circuits.
fn summarize(results: &[PointResult]) -> (usize, ResultCode) {
    let passed = results.iter().filter(|r| r.code == ResultCode::OK).count();
    let overall = results.iter()
        .find(|r| r.code != ResultCode::OK)
        .map(|r| r.code)
        .unwrap_or(ResultCode::OK);
    (passed, overall)
}

/// Compare two strings ignoring incidental whitespace: both sides are trimmed of leading/trailing
/// spaces and newlines, split into lines, blank lines are dropped, and the remaining lines are
/// trimmed of spaces (not tabs) before comparison.
fn lax_eq(a: &str, b: &str) -> bool {
    lax_lines(a) == lax_lines(b)
}

fn lax_lines(s: &str) -> Vec<&str> {
    s.trim_matches(|c| c == ' ' || c == '\n')
        .split('\n')
        .map(|line| line.trim_matches(' '))
        .filter(|line| !line.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lax_eq_ignores_surrounding_blank_lines() {
        assert!(lax_eq("  1 2 3  \n\n", "1 2 3\n"));
    }

    #[test]
    fn lax_eq_ignores_interior_blank_lines() {
        assert!(lax_eq("1\n\n2\n", "1\n2"));
    }

    #[test]
    fn lax_eq_does_not_trim_tabs() {
        assert!(!lax_eq("1\t\n", "1\n"));
    }

    #[test]
    fn lax_eq_distinguishes_different_content() {
        assert!(!lax_eq("1 2 3\n", "1 2 4\n"));
    }

    fn point(code: ResultCode) -> PointResult {
        PointResult {
            code,
            exec_time: 0.0,
            exec_mem: 0,
            syscall: None,
            termsig: None,
            compile_log: None,
            compile_exit_code: None,
            comment: None,
        }
    }

    #[test]
    fn summarize_judges_every_point_even_after_an_earlier_failure() {
        // A 3-point submission whose first point already exceeds the time limit still yields
        // three results, not one: nothing short-circuits.
        let results = vec![point(ResultCode::TLE), point(ResultCode::TLE), point(ResultCode::TLE)];
        let (passed, overall) = summarize(&results);
        assert_eq!(results.len(), 3);
        assert_eq!(passed, 0);
        assert_eq!(overall, ResultCode::TLE);
    }

    #[test]
    fn summarize_reports_ok_only_when_every_point_passes() {
        let results = vec![point(ResultCode::OK), point(ResultCode::OK)];
        let (passed, overall) = summarize(&results);
        assert_eq!(passed, 2);
        assert_eq!(overall, ResultCode::OK);
    }

    #[test]
    fn summarize_reports_the_first_failing_codes_position_not_the_last() {
        let results = vec![point(ResultCode::OK), point(ResultCode::WA), point(ResultCode::RE)];
        let (passed, overall) = summarize(&results);
        assert_eq!(passed, 1);
        assert_eq!(overall, ResultCode::WA);
    }
}
