//! This crate embeds the Lua scripting engine used by the judge to run user-supplied judging
//! scripts: random test data generators (`RandomJudge`) and custom output comparators
//! (`SpecialJudge`).
//!

#[macro_use]
extern crate error_chain;

use std::sync::{Arc, Mutex};

use mlua::{Lua, Value as LuaValue, VmState};
use rand::distributions::Alphanumeric;
use rand::Rng;

error_chain! {
    types {
        Error, ErrorKind, ResultExt, Result;
    }

    foreign_links {
        Lua(mlua::Error);
    }

    errors {
        NoResult {
            description("script finished without declaring a result")
            display("script finished without calling Z.expect() or Z.match()")
        }
    }
}

/// A single test data point, either produced by a `RandomJudge` script or read back from stored
/// objective data.
#[derive(Clone, Debug, Default)]
pub struct DataPoint {
    /// Text fed to the program's standard input.
    pub stdin: String,

    /// Text the program's standard output is compared against.
    pub expected_stdout: String,

    /// Per-point CPU time limit, in seconds. Zero means "use the objective's default".
    pub time_limit_secs: u64,

    /// Per-point memory limit, in bytes. Zero means "use the objective's default".
    pub memory_limit_bytes: usize,
}

/// A VM-neutral representation of the single scratch value shared between the `RandomJudge` and
/// `SpecialJudge` scripts invoked while judging one objective.
///
/// The reference implementation shares a single raw Lua value between two independent
/// interpreter states, which only happens to work because the value is always a primitive. Here
/// the value is copied in and out of each VM through this enum instead, which sidesteps that
/// coincidence entirely.
#[derive(Clone, Debug, PartialEq)]
pub enum AuxValue {
    Nil,
    Bool(bool),
    Number(f64),
    Str(String),
}

impl Default for AuxValue {
    fn default() -> Self {
        AuxValue::Nil
    }
}

impl AuxValue {
    fn from_lua(v: LuaValue) -> AuxValue {
        match v {
            LuaValue::Nil => AuxValue::Nil,
            LuaValue::Boolean(b) => AuxValue::Bool(b),
            LuaValue::Integer(i) => AuxValue::Number(i as f64),
            LuaValue::Number(n) => AuxValue::Number(n),
            LuaValue::String(s) => AuxValue::Str(s.to_str().unwrap_or_default().to_owned()),
            _ => AuxValue::Nil,
        }
    }

    fn to_lua<'a>(&self, lua: &'a Lua) -> mlua::Result<LuaValue<'a>> {
        Ok(match self {
            AuxValue::Nil => LuaValue::Nil,
            AuxValue::Bool(b) => LuaValue::Boolean(*b),
            AuxValue::Number(n) => LuaValue::Number(*n),
            AuxValue::Str(s) => LuaValue::String(lua.create_string(s)?),
        })
    }
}

/// Scratch slot shared between a `RandomJudge` and a `SpecialJudge` script during the judging of
/// a single objective.
///
/// The objective runner creates one `AuxSlot` per objective run and drops it once the run
/// completes, which is what actually clears the slot between objectives; there is no global
/// clear-once-per-objective step to remember to call.
#[derive(Default)]
pub struct AuxSlot(Mutex<AuxValue>);

impl AuxSlot {
    pub fn new() -> Self {
        AuxSlot(Mutex::new(AuxValue::Nil))
    }

    pub fn get(&self) -> AuxValue {
        self.0.lock().unwrap().clone()
    }

    pub fn set(&self, value: AuxValue) {
        *self.0.lock().unwrap() = value;
    }
}

/// Hosts the two long-lived Lua interpreters used to run judging scripts: one for `RandomJudge`
/// scripts and one for `SpecialJudge` scripts.
///
/// Both are process-wide singletons, mirroring the two global interpreter states of the reference
/// implementation: judging scripts are small and short-lived, and re-creating a fresh VM for every
/// data point would dominate the cost of judging trivial objectives. A `ScriptHost` is meant to be
/// constructed once and shared behind an `Arc` across worker threads; each invocation takes the
/// relevant VM's lock for its whole duration, so calls from different threads serialize rather
/// than race, at the cost of contention under parallel judging.
pub struct ScriptHost {
    random_judge_vm: Mutex<Lua>,
    special_judge_vm: Mutex<Lua>,
}

impl ScriptHost {
    /// Create a new `ScriptHost`, initializing both interpreter states.
    pub fn new() -> Self {
        ScriptHost {
            random_judge_vm: Mutex::new(Lua::new()),
            special_judge_vm: Mutex::new(Lua::new()),
        }
    }

    /// Run a `RandomJudge` script to produce one `DataPoint`.
    ///
    /// `index` is the 0-based index of the data point being generated within the current
    /// objective, exposed to the script as `Z.index`. The script must call `Z.expect(...)` before
    /// returning; a script that runs to completion without declaring an expected output is
    /// treated as a scripting error (`ok = false`).
    pub fn invoke_random_judge(&self, script: &str, index: i64, aux: &AuxSlot) -> Result<DataPoint> {
        let lua = self.random_judge_vm.lock().unwrap();
        let point = Mutex::new(DataPoint::default());
        let declared = Mutex::new(false);

        lua.scope(|scope| {
            let z = lua.create_table()?;
            z.set("index", index)?;

            let feed = scope.create_function_mut(|_, s: String| {
                point.lock().unwrap().stdin = s;
                Ok(())
            })?;
            z.set("feed", feed)?;

            let expect = scope.create_function_mut(|_, s: String| {
                point.lock().unwrap().expected_stdout = s;
                *declared.lock().unwrap() = true;
                Ok(())
            })?;
            z.set("expect", expect)?;

            let limit = scope.create_function_mut(|_, (time_s, mem_bytes): (f64, i64)| {
                let mut p = point.lock().unwrap();
                p.time_limit_secs = time_s.ceil().max(0.0) as u64;
                p.memory_limit_bytes = mem_bytes.max(0) as usize;
                Ok(())
            })?;
            z.set("limit", limit)?;

            self.install_aux_functions(&lua, scope, &z, aux)?;
            self.install_random_helpers(&lua, scope, &z)?;

            lua.globals().set("Z", z)?;
            lua.load(script).exec()
        })?;

        if !*declared.lock().unwrap() {
            bail!(ErrorKind::NoResult);
        }

        Ok(point.into_inner().unwrap())
    }

    /// Run a `SpecialJudge` script to compare `got` against `expected`.
    ///
    /// `index` is the 0-based index of the data point being checked, exposed read-only as
    /// `Z.index`. The script declares its verdict by calling `Z.match(bool)`, which cancels the
    /// interpreter's execution: a `set_interrupt` hook checks after every `Z.match()` call whether
    /// a verdict has been declared and, if so, aborts the running script with an error the next
    /// time the VM is interrupted, rather than letting a misbehaving script run (or loop) forever
    /// after it has already done its job. A scripting error raised after `Z.match()` was already
    /// called — including the abort triggered by this hook — is therefore ignored and the declared
    /// verdict is honored.
    pub fn invoke_special_judge(
        &self,
        script: &str,
        got: &str,
        expected: &str,
        index: i64,
        aux: &AuxSlot,
    ) -> Result<bool> {
        let lua = self.special_judge_vm.lock().unwrap();
        let verdict: Arc<Mutex<Option<bool>>> = Arc::new(Mutex::new(None));

        let interrupt_verdict = Arc::clone(&verdict);
        lua.set_interrupt(move |_| {
            if interrupt_verdict.lock().unwrap().is_some() {
                Err(mlua::Error::RuntimeError("Z.match() already declared a verdict".to_owned()))
            } else {
                Ok(VmState::Continue)
            }
        });

        let exec_result = lua.scope(|scope| {
            let z = lua.create_table()?;
            z.set("got", got)?;
            z.set("expected", expected)?;
            z.set("index", index)?;

            let matched_verdict = Arc::clone(&verdict);
            let matched = scope.create_function_mut(move |_, ok: bool| {
                *matched_verdict.lock().unwrap() = Some(ok);
                Ok(())
            })?;
            z.set("match", matched)?;

            self.install_aux_functions(&lua, scope, &z, aux)?;

            lua.globals().set("Z", z)?;
            lua.load(script).exec()
        });

        lua.remove_interrupt();

        let declared = *verdict.lock().unwrap();
        match (declared, exec_result) {
            (Some(ok), _) => Ok(ok),
            (None, Err(e)) => Err(Error::from(e)),
            (None, Ok(())) => bail!(ErrorKind::NoResult),
        }
    }

    /// Install `Z.getaux()`/`Z.setaux(v)`, the read/write accessors for the shared scratch slot.
    fn install_aux_functions<'lua, 'scope>(
        &self,
        lua: &'lua Lua,
        scope: &mlua::Scope<'lua, 'scope>,
        z: &mlua::Table<'lua>,
        aux: &'scope AuxSlot,
    ) -> mlua::Result<()> {
        let get_aux = scope.create_function(move |lua, ()| aux.get().to_lua(lua))?;
        z.set("getaux", get_aux)?;

        let set_aux = scope.create_function_mut(move |_, v: LuaValue| {
            aux.set(AuxValue::from_lua(v));
            Ok(())
        })?;
        z.set("setaux", set_aux)?;

        let _ = lua;
        Ok(())
    }

    /// Install helpers available only to `RandomJudge` scripts: `Z.randint(lo, hi)` and
    /// `Z.randstring(len)`.
    fn install_random_helpers<'lua, 'scope>(
        &self,
        _lua: &'lua Lua,
        scope: &mlua::Scope<'lua, 'scope>,
        z: &mlua::Table<'lua>,
    ) -> mlua::Result<()> {
        let randint = scope.create_function(|_, (lo, hi): (i64, i64)| {
            if lo > hi {
                return Err(mlua::Error::RuntimeError(
                    "Z.randint: lower bound exceeds upper bound".to_owned()));
            }
            Ok(rand::thread_rng().gen_range(lo..=hi))
        })?;
        z.set("randint", randint)?;

        let randstring = scope.create_function(|_, len: usize| {
            let s: String = rand::thread_rng()
                .sample_iter(&Alphanumeric)
                .take(len)
                .map(char::from)
                .collect();
            Ok(s)
        })?;
        z.set("randstring", randstring)?;

        Ok(())
    }
}

impl Default for ScriptHost {
    fn default() -> Self {
        ScriptHost::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_judge_feeds_expected_output() {
        let host = ScriptHost::new();
        let aux = AuxSlot::new();
        let point = host
            .invoke_random_judge(
                "Z.feed('hello\\n'); Z.expect('world\\n'); Z.limit(1, 1048576)",
                0,
                &aux,
            )
            .unwrap();

        assert_eq!(point.stdin, "hello\n");
        assert_eq!(point.expected_stdout, "world\n");
        assert_eq!(point.time_limit_secs, 1);
        assert_eq!(point.memory_limit_bytes, 1048576);
    }

    #[test]
    fn random_judge_without_expect_is_an_error() {
        let host = ScriptHost::new();
        let aux = AuxSlot::new();
        assert!(host.invoke_random_judge("Z.feed('hello')", 0, &aux).is_err());
    }

    #[test]
    fn special_judge_declares_match() {
        let host = ScriptHost::new();
        let aux = AuxSlot::new();
        let ok = host
            .invoke_special_judge("Z.match(Z.got == Z.expected)", "42", "42", 0, &aux)
            .unwrap();
        assert!(ok);

        let ok = host
            .invoke_special_judge("Z.match(Z.got == Z.expected)", "41", "42", 0, &aux)
            .unwrap();
        assert!(!ok);
    }

    #[test]
    fn special_judge_error_after_match_is_honored() {
        let host = ScriptHost::new();
        let aux = AuxSlot::new();
        let ok = host
            .invoke_special_judge("Z.match(true); error('boom')", "a", "b", 0, &aux)
            .unwrap();
        assert!(ok);
    }

    #[test]
    fn special_judge_match_cancels_a_runaway_script() {
        let host = ScriptHost::new();
        let aux = AuxSlot::new();
        let ok = host
            .invoke_special_judge("Z.match(true); while true do end", "a", "b", 0, &aux)
            .unwrap();
        assert!(ok);
    }

    #[test]
    fn aux_slot_round_trips_through_lua() {
        let host = ScriptHost::new();
        let aux = AuxSlot::new();
        host
            .invoke_random_judge("Z.setaux(7); Z.feed(''); Z.expect('')", 0, &aux)
            .unwrap();
        assert_eq!(aux.get(), AuxValue::Number(7.0));

        let ok = host
            .invoke_special_judge("Z.match(Z.getaux() == 7)", "", "", 0, &aux)
            .unwrap();
        assert!(ok);
    }
}
