use std::time::Duration;

/// Explicit engine configuration threaded through `Validator`/`Bagger` constructors (§9 "No
/// global singletons"). Replaces the teacher's implicit `Context`; logging stays on the `log`
/// facade rather than living here, since that's how the teacher already wires it.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// If non-zero, the engine yields this long between opening each file — used for UI pacing
    /// (§6.5). Ignored when zero.
    pub slow_motion_delay: Duration,
    /// Skips the §4.E.1 serialization check entirely when set.
    pub disable_serialization_check: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            slow_motion_delay: Duration::ZERO,
            disable_serialization_check: false,
        }
    }
}
