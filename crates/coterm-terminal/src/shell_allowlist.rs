//! Shell binary allow-list enforcement.
//!
//! This is a hard security boundary, not a convenience default: a caller that
//! asks for a shell binary outside the allow-list does not get an error, it
//! silently gets `/bin/zsh` instead. Spoofing a session as if it ran the
//! requested interpreter is explicitly acceptable per the wire contract —
//! `terminal:spawned` still fires, just with the substituted shell's pid.

/// The only shell binaries a `terminal:spawn` frame is allowed to request.
const ALLOWED_SHELLS: &[&str] = &["/bin/zsh", "/bin/bash", "/bin/sh"];

/// The shell substituted in for any request outside the allow-list.
const FALLBACK_SHELL: &str = "/bin/zsh";

/// Resolve a caller-supplied shell path to one on the allow-list.
///
/// Returns the requested path unchanged if it is allowed, otherwise
/// `FALLBACK_SHELL`.
pub fn resolve(requested: &str) -> &'static str {
    match ALLOWED_SHELLS.iter().find(|&&s| s == requested) {
        Some(&allowed) => allowed,
        None => FALLBACK_SHELL,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zsh_passes_through() {
        assert_eq!(resolve("/bin/zsh"), "/bin/zsh");
    }

    #[test]
    fn bash_passes_through() {
        assert_eq!(resolve("/bin/bash"), "/bin/bash");
    }

    #[test]
    fn sh_passes_through() {
        assert_eq!(resolve("/bin/sh"), "/bin/sh");
    }

    #[test]
    fn arbitrary_interpreter_is_replaced() {
        assert_eq!(resolve("/usr/bin/python3"), "/bin/zsh");
    }

    #[test]
    fn lookalike_path_is_replaced() {
        // Not an exact match for any allow-listed entry.
        assert_eq!(resolve("/bin/zsh "), "/bin/zsh");
        assert_eq!(resolve("/usr/local/bin/zsh"), "/bin/zsh");
    }

    #[test]
    fn empty_string_is_replaced() {
        assert_eq!(resolve(""), "/bin/zsh");
    }
}
