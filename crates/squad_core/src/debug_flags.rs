use std::sync::OnceLock;

/// Debug switches accept `1`, `true`, `yes` or `on` in any case; anything
/// else, including an unset variable, leaves the switch off.
fn flag_value_enabled(value: &str) -> bool {
    let value = value.trim();
    ["1", "true", "yes", "on"].iter().any(|on| value.eq_ignore_ascii_case(on))
}

fn env_flag_enabled(name: &str) -> bool {
    std::env::var(name).is_ok_and(|value| flag_value_enabled(&value))
}

/// Verbose per-unit assignment tracing for tactic updates.
pub fn tactics_debug_enabled() -> bool {
    if !cfg!(debug_assertions) {
        return false;
    }
    static FLAG: OnceLock<bool> = OnceLock::new();
    *FLAG.get_or_init(|| env_flag_enabled("SQUAD_DEBUG_TACTICS"))
}

/// Verbose tracing of plan execution (every dispatched action).
pub fn plans_debug_enabled() -> bool {
    if !cfg!(debug_assertions) {
        return false;
    }
    static FLAG: OnceLock<bool> = OnceLock::new();
    *FLAG.get_or_init(|| env_flag_enabled("SQUAD_DEBUG_PLANS"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_values() {
        for on in ["1", "true", "TRUE", " yes ", "On"] {
            assert!(flag_value_enabled(on), "{on:?} should enable");
        }
        for off in ["", "0", "false", "off", "enabled", "2"] {
            assert!(!flag_value_enabled(off), "{off:?} should not enable");
        }
    }

    #[test]
    fn test_unset_variable_is_off() {
        assert!(!env_flag_enabled("SQUAD_DEBUG_NEVER_SET_BY_ANY_TEST"));
    }
}
