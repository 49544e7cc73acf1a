use std::sync::OnceLock;

fn env_true(key: &str) -> Option<bool> {
    std::env::var(key).ok().map(|val| {
        let trimmed = val.trim();
        !trimmed.is_empty() && !matches!(trimmed, "0" | "false" | "FALSE" | "False")
    })
}

fn bool_from_env(key: &str) -> bool {
    env_true(key).unwrap_or(false)
}

/// Log every frame push and pop at debug level.
pub fn trace_frames() -> bool {
    static TRACE_FRAMES: OnceLock<bool> = OnceLock::new();
    *TRACE_FRAMES.get_or_init(|| bool_from_env("JBPL_TRACE_FRAMES"))
}

/// Dump every lowered file as JSON at debug level.
pub fn dump_lowered() -> bool {
    static DUMP: OnceLock<bool> = OnceLock::new();
    *DUMP.get_or_init(|| bool_from_env("JBPL_DUMP_LOWERED"))
}
