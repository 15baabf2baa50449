//! Structural classification of inbound frames by their `type` tag.
//!
//! Classification never looks at session state — it is a pure function of
//! the tag string, so a frame for a session that doesn't exist yet (or
//! anymore) still classifies the same way.

/// The subsystem family an inbound frame belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameClass {
    Terminal,
    Command,
    FileWatch,
    Ping,
    Unknown,
}

/// Classify a frame's `type` tag into one of the five subsystem families.
///
/// Terminal frames are namespaced with a `terminal:` prefix on the wire,
/// which is what disambiguates the terminal subsystem's `terminal:input`
/// from the command subsystem's unqualified `input` tag.
pub fn classify(frame_type: &str) -> FrameClass {
    if frame_type.starts_with("terminal:") {
        return FrameClass::Terminal;
    }
    match frame_type {
        "command" | "cancel" | "input" => FrameClass::Command,
        "start_file_monitoring" | "stop_file_monitoring" => FrameClass::FileWatch,
        "ping" => FrameClass::Ping,
        _ => FrameClass::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_prefix_routes_to_terminal() {
        assert_eq!(classify("terminal:spawn"), FrameClass::Terminal);
        assert_eq!(classify("terminal:input"), FrameClass::Terminal);
        assert_eq!(classify("terminal:replay"), FrameClass::Terminal);
    }

    #[test]
    fn unqualified_input_routes_to_command() {
        // The unqualified `input` tag is the command subsystem's, distinct
        // from `terminal:input` despite the shared base name.
        assert_eq!(classify("input"), FrameClass::Command);
        assert_eq!(classify("command"), FrameClass::Command);
        assert_eq!(classify("cancel"), FrameClass::Command);
    }

    #[test]
    fn file_watch_tags_classify() {
        assert_eq!(classify("start_file_monitoring"), FrameClass::FileWatch);
        assert_eq!(classify("stop_file_monitoring"), FrameClass::FileWatch);
    }

    #[test]
    fn ping_classifies() {
        assert_eq!(classify("ping"), FrameClass::Ping);
    }

    #[test]
    fn unrecognized_tag_is_unknown() {
        assert_eq!(classify("frobnicate"), FrameClass::Unknown);
        assert_eq!(classify(""), FrameClass::Unknown);
    }
}
