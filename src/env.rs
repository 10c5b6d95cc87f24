use std::{cell::RefCell, ffi::OsStr};

/// Steps the command line driver executes before giving up on a program.
pub const DEFAULT_STEP_LIMIT: u64 = 1_000_000;

#[derive(Clone, Copy)]
struct Env {
    step_limit: u64,
    trace_enabled: bool,
}

thread_local! {
    /// Must only be mutated within `set_env`
    static ENV: RefCell<Option<Env>> = const { RefCell::new(None) };
}

pub fn init() {
    let value = Env {
        step_limit: parse_step_limit(std::env::var("VMIPS_STEP_LIMIT").ok().as_deref()),
        trace_enabled: var_is("VMIPS_TRACE", "1"),
    };
    set_env(value);
}

/// Value of `VMIPS_STEP_LIMIT`, or [`DEFAULT_STEP_LIMIT`].
pub fn step_limit() -> u64 {
    with_env(|env| env.step_limit)
}

/// `VMIPS_TRACE=1` writes the flow trace even without `--trace`.
pub fn is_trace_enabled() -> bool {
    with_env(|env| env.trace_enabled)
}

fn parse_step_limit(value: Option<&str>) -> u64 {
    match value.map(|v| v.trim().parse::<u64>()) {
        Some(Ok(limit)) if limit > 0 => limit,
        Some(_) => {
            log::warn!("ignoring invalid VMIPS_STEP_LIMIT, using {DEFAULT_STEP_LIMIT}");
            DEFAULT_STEP_LIMIT
        }
        None => DEFAULT_STEP_LIMIT,
    }
}

fn set_env(value: Env) {
    ENV.with(|env| {
        let mut env = env.borrow_mut();
        assert!(
            env.is_none(),
            "tried to initialize environment state multiple times"
        );
        *env = Some(value);
    });
}

fn with_env<F, R>(callback: F) -> R
where
    F: Fn(&Env) -> R,
{
    ENV.with(|env| {
        let env = env.borrow();
        let env = env.unwrap_or_else(|| {
            panic!("tried to access environment state before initialization");
        });
        callback(&env)
    })
}

fn var_is(name: impl AsRef<OsStr>, value: impl AsRef<str>) -> bool {
    std::env::var(name.as_ref()).is_ok_and(|v| v == value.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_limit_parsing() {
        assert_eq!(parse_step_limit(None), DEFAULT_STEP_LIMIT);
        assert_eq!(parse_step_limit(Some("250")), 250);
        assert_eq!(parse_step_limit(Some(" 7 ")), 7);
        assert_eq!(parse_step_limit(Some("0")), DEFAULT_STEP_LIMIT);
        assert_eq!(parse_step_limit(Some("lots")), DEFAULT_STEP_LIMIT);
    }

    #[test]
    fn access_after_init() {
        // Each test runs on its own thread, so this is the only initialization here
        init();
        assert!(step_limit() > 0);
    }
}
