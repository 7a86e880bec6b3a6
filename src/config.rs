/*!
Configuration of contexts.

The defaults are read once from the environment:

 - `GLCTX_DEBUG`: verbose logging of the context lifecycle, and backtraces of lock owners in
   contention errors.
 - `GLCTX_LOCK_FAIL_FAST`: ownership locks fail instead of blocking.
 - `GLCTX_OPTIMIZE`: forces the make-current optimization on (`1`, `true`) or off (`0`,
   `false`).

*/
use lazy_static::lazy_static;

use std::env;

lazy_static! {
    static ref ENV_CONFIG: ContextConfig = ContextConfig::from_env();
}

/// Options of a context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextConfig {
    /// Enables verbose diagnostics. Never changes behavior.
    pub debug: bool,

    /// Whether the ownership lock fails instead of waiting when the context is current on
    /// another thread.
    pub fail_fast: bool,

    /// Whether `Context::exec` leaves the context current after running. `None` picks the
    /// default of the backend: enabled, except on systems with several X11-like screens.
    pub optimize_make_current: Option<bool>,
}

impl Default for ContextConfig {
    #[inline]
    fn default() -> ContextConfig {
        ENV_CONFIG.clone()
    }
}

fn env_flag(name: &str) -> Option<bool> {
    let value = env::var(name).ok()?;
    match &value.trim().to_ascii_lowercase()[..] {
        "" | "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl ContextConfig {
    /// Reads the configuration from the environment variables.
    pub fn from_env() -> ContextConfig {
        ContextConfig {
            debug: env_flag("GLCTX_DEBUG").unwrap_or(false),
            fail_fast: env_flag("GLCTX_LOCK_FAIL_FAST").unwrap_or(false),
            optimize_make_current: env_flag("GLCTX_OPTIMIZE"),
        }
    }

    /// Enables or disables verbose diagnostics.
    #[inline]
    pub fn with_debug(mut self, debug: bool) -> ContextConfig {
        self.debug = debug;
        self
    }

    /// Chooses between the fail-fast and blocking lock policies.
    #[inline]
    pub fn with_fail_fast(mut self, fail_fast: bool) -> ContextConfig {
        self.fail_fast = fail_fast;
        self
    }

    /// Forces the make-current optimization on or off.
    #[inline]
    pub fn with_optimize_make_current(mut self, optimize: bool) -> ContextConfig {
        self.optimize_make_current = Some(optimize);
        self
    }

    /// Returns whether the optimization is enabled, given the properties of the backend.
    #[inline]
    pub fn optimize_make_current(&self, multiple_screens: bool) -> bool {
        self.optimize_make_current.unwrap_or(!multiple_screens)
    }
}
