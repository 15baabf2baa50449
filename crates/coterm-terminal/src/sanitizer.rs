//! Byte-level sanitization of raw PTY output before it reaches any client.
//!
//! This is a selective filter, not a blanket escape-sequence stripper: SGR
//! color codes, cursor motion, OSC window-title sets, and bracketed-paste
//! markers all pass through untouched, since clients render those. Only three
//! sequence families are neutralized, because each is a vector for acting on
//! the terminal host rather than just drawing into it:
//!
//! - DCS (Device Control String) — can carry Sixel/Tektronix payloads or
//!   terminal-specific control channels.
//! - OSC 52 — the clipboard set/query escape. Left alone, a compromised
//!   program could exfiltrate host clipboard contents to every attached
//!   client, or inject into the host clipboard from replayed output.
//! - Cursor save/restore (`ESC 7`/`ESC 8`, `CSI s`/`CSI u`) — stripped
//!   entirely rather than passed through, since save/restore state is
//!   per-terminal and meaningless (or misleading) once fanned out to
//!   multiple independently-rendering clients.
//!
//! PTY `read()` boundaries are controlled by whatever the child process
//! writes and how the kernel happens to deliver it, not by this filter — a
//! program can split any of the three blocked families across two chunks
//! (e.g. a lone `ESC` as the last byte of one `read()`, the rest of a DCS
//! sequence as the first bytes of the next). A per-chunk-only filter would
//! let each half look clean while the client's reconstructed stream still
//! contains the complete sequence. So this filter keeps a small amount of
//! state per session: an undecided prefix at the tail of one call is carried
//! over and re-examined at the head of the next, instead of being flushed as
//! plain bytes. `sanitize` is deliberately `&mut self` rather than a free
//! function for this reason. Any prefix still undecided when a session ends
//! is simply dropped — it never reached a client and never will.
//!
//! A pending prefix is bounded by [`MAX_CARRY_BYTES`] so a child that opens a
//! DCS/OSC 52 introducer and never terminates it can't grow this filter's
//! memory without bound: past the bound the buffered span is blocked outright
//! and scanning resumes fresh.

const DCS_BLOCKED: &[u8] = b"[DCS blocked]";
const OSC52_BLOCKED: &[u8] = b"[OSC52 blocked]";

const ESC: u8 = 0x1B;
const BEL: u8 = 0x07;

/// Upper bound on how long an unterminated candidate sequence is carried
/// across calls before being blocked outright.
const MAX_CARRY_BYTES: usize = 8192;

/// Outcome of inspecting a byte span starting with `ESC` or the 8-bit DCS
/// introducer `0x90`.
enum Decision {
    /// Definitely one of the three blocked families, `skip` bytes long.
    Complete { skip: usize, replacement: &'static [u8] },
    /// Not enough bytes yet to tell; carry this span into the next call.
    Incomplete,
    /// Definitely not one of the three blocked families — only the
    /// introducer byte itself should be emitted as plain data, since
    /// whatever follows may start its own sequence.
    NotAnEscape,
}

/// Stateful filter applied to every chunk of raw PTY output for one session.
pub struct SanitizerFilter {
    carry: Vec<u8>,
}

impl SanitizerFilter {
    pub fn new() -> Self {
        Self { carry: Vec::new() }
    }

    /// Sanitize one chunk of raw bytes, carrying any undecided trailing
    /// escape prefix forward to the next call. The returned bytes are safe
    /// to buffer and forward immediately — nothing held back here has been
    /// classified as safe yet.
    pub fn sanitize(&mut self, input: &[u8]) -> Vec<u8> {
        let mut buf = std::mem::take(&mut self.carry);
        buf.extend_from_slice(input);

        let mut out = Vec::with_capacity(buf.len());
        let mut i = 0;

        while i < buf.len() {
            let b = buf[i];

            if b == ESC || b == 0x90 {
                match Self::decide(&buf[i..]) {
                    Decision::Complete { skip, replacement } => {
                        out.extend_from_slice(replacement);
                        i += skip;
                        continue;
                    }
                    Decision::Incomplete => {
                        self.carry = buf[i..].to_vec();
                        return out;
                    }
                    Decision::NotAnEscape => {
                        // Only the introducer byte is known-plain; `buf[i+1..]`
                        // is re-examined on its own next iteration.
                    }
                }
            }

            out.push(b);
            i += 1;
        }

        out
    }

    /// Classify the span starting at `s[0]` (always `ESC` or `0x90`).
    fn decide(s: &[u8]) -> Decision {
        if s[0] == 0x90 {
            return Self::scan_terminated_8bit(s, 1, DCS_BLOCKED);
        }

        if s.len() < 2 {
            return Decision::Incomplete;
        }
        match s[1] {
            b'P' => Self::scan_terminated_7bit(s, 2, DCS_BLOCKED),
            b']' => Self::decide_osc(s),
            b'7' | b'8' => Decision::Complete { skip: 2, replacement: b"" },
            b'[' => {
                if s.len() < 3 {
                    Decision::Incomplete
                } else if s[2] == b's' || s[2] == b'u' {
                    Decision::Complete { skip: 3, replacement: b"" }
                } else {
                    Decision::NotAnEscape
                }
            }
            _ => Decision::NotAnEscape,
        }
    }

    /// `s[0..2]` is `ESC ]`. Only the literal `52;` parameter is blocked;
    /// any other OSC (window title, etc.) is left for the normal pass-through
    /// path once enough bytes are in to rule 52 out.
    fn decide_osc(s: &[u8]) -> Decision {
        if s.len() < 3 {
            return Decision::Incomplete;
        }
        if s[2] != b'5' {
            return Decision::NotAnEscape;
        }
        if s.len() < 4 {
            return Decision::Incomplete;
        }
        if s[3] != b'2' {
            return Decision::NotAnEscape;
        }
        if s.len() < 5 {
            return Decision::Incomplete;
        }
        if s[4] != b';' {
            return Decision::NotAnEscape;
        }
        Self::scan_terminated_7bit(s, 5, OSC52_BLOCKED)
    }

    /// Scan for a 7-bit string terminator (`ESC \` or `BEL`) starting at
    /// index `from`. `Incomplete` while unterminated and within the carry
    /// bound; past the bound the buffered span is blocked outright.
    fn scan_terminated_7bit(s: &[u8], from: usize, replacement: &'static [u8]) -> Decision {
        let mut j = from;
        while j < s.len() {
            if s[j] == ESC && j + 1 < s.len() && s[j + 1] == b'\\' {
                return Decision::Complete { skip: j + 2, replacement };
            }
            if s[j] == BEL {
                return Decision::Complete { skip: j + 1, replacement };
            }
            j += 1;
        }
        if s.len() > MAX_CARRY_BYTES {
            Decision::Complete { skip: s.len(), replacement }
        } else {
            Decision::Incomplete
        }
    }

    /// Scan for the 8-bit string terminator (`0x9C`, or `BEL` as a common
    /// relaxed terminator) starting at index `from`.
    fn scan_terminated_8bit(s: &[u8], from: usize, replacement: &'static [u8]) -> Decision {
        let mut j = from;
        while j < s.len() {
            if s[j] == 0x9C || s[j] == BEL {
                return Decision::Complete { skip: j + 1, replacement };
            }
            j += 1;
        }
        if s.len() > MAX_CARRY_BYTES {
            Decision::Complete { skip: s.len(), replacement }
        } else {
            Decision::Incomplete
        }
    }
}

impl Default for SanitizerFilter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sanitize_whole(input: &[u8]) -> Vec<u8> {
        SanitizerFilter::new().sanitize(input)
    }

    #[test]
    fn passes_through_plain_text() {
        let input = b"hello, world\r\n";
        assert_eq!(sanitize_whole(input), input.to_vec());
    }

    #[test]
    fn passes_through_sgr_color_codes() {
        let input = b"\x1b[31mred\x1b[0m";
        assert_eq!(sanitize_whole(input), input.to_vec());
    }

    #[test]
    fn passes_through_cursor_motion() {
        let input = b"\x1b[10;20H";
        assert_eq!(sanitize_whole(input), input.to_vec());
    }

    #[test]
    fn blocks_dcs_terminated_by_st() {
        let input = b"before\x1bPsome-dcs-payload\x1b\\after";
        let out = sanitize_whole(input);
        assert_eq!(out, b"before[DCS blocked]after".to_vec());
    }

    #[test]
    fn blocks_dcs_terminated_by_bel() {
        let input = b"before\x1bPpayload\x07after";
        let out = sanitize_whole(input);
        assert_eq!(out, b"before[DCS blocked]after".to_vec());
    }

    #[test]
    fn blocks_unterminated_dcs_to_end_of_chunk() {
        let input = b"before\x1bPunterminated";
        let out = sanitize_whole(input);
        assert_eq!(out, b"before".to_vec());
    }

    #[test]
    fn blocks_osc52_clipboard_set() {
        let input = b"before\x1b]52;c;YmFzZTY0\x07after";
        let out = sanitize_whole(input);
        assert_eq!(out, b"before[OSC52 blocked]after".to_vec());
    }

    #[test]
    fn passes_through_osc_window_title() {
        let input = b"\x1b]0;my window title\x07";
        assert_eq!(sanitize_whole(input), input.to_vec());
    }

    #[test]
    fn strips_cursor_save_restore_esc_form() {
        let input = b"before\x1b7mid\x1b8after";
        let out = sanitize_whole(input);
        assert_eq!(out, b"beforemidafter".to_vec());
    }

    #[test]
    fn strips_cursor_save_restore_csi_form() {
        let input = b"before\x1b[smid\x1b[uafter";
        let out = sanitize_whole(input);
        assert_eq!(out, b"beforemidafter".to_vec());
    }

    #[test]
    fn is_idempotent() {
        let input = b"before\x1bPpayload\x1b\\after\x1b]52;c;xx\x07tail\x1b7\x1b8";
        let once = sanitize_whole(input);
        let twice = sanitize_whole(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn blocks_8bit_dcs_introducer() {
        let input = [b'a', 0x90, b'x', b'y', 0x9C, b'b'];
        let out = sanitize_whole(&input);
        let mut expected = vec![b'a'];
        expected.extend_from_slice(DCS_BLOCKED);
        expected.push(b'b');
        assert_eq!(out, expected);
    }

    #[test]
    fn trailing_lone_esc_is_carried_not_leaked() {
        let mut filter = SanitizerFilter::new();
        let out = filter.sanitize(b"before\x1b");
        assert_eq!(out, b"before".to_vec());
    }

    #[test]
    fn dcs_split_across_two_chunks_is_still_blocked() {
        let mut filter = SanitizerFilter::new();
        let first = filter.sanitize(b"before\x1b");
        let second = filter.sanitize(b"Psecret\x1b\\after");
        let mut combined = first;
        combined.extend_from_slice(&second);
        assert_eq!(combined, b"before[DCS blocked]after".to_vec());
    }

    #[test]
    fn osc52_split_byte_by_byte_is_still_blocked() {
        let mut filter = SanitizerFilter::new();
        let mut combined = Vec::new();
        for chunk in [
            &b"x"[..],
            &b"\x1b"[..],
            &b"]"[..],
            &b"5"[..],
            &b"2"[..],
            &b";c;YmFzZTY0"[..],
            &b"\x07"[..],
            &b"y"[..],
        ] {
            combined.extend_from_slice(&filter.sanitize(chunk));
        }
        assert_eq!(combined, b"x[OSC52 blocked]y".to_vec());
    }

    #[test]
    fn cursor_restore_split_across_chunks_is_still_stripped() {
        let mut filter = SanitizerFilter::new();
        let mut combined = Vec::new();
        combined.extend_from_slice(&filter.sanitize(b"before\x1b"));
        combined.extend_from_slice(&filter.sanitize(b"7after"));
        assert_eq!(combined, b"beforeafter".to_vec());
    }

    #[test]
    fn unterminated_sequence_past_carry_bound_is_blocked_and_releases_memory() {
        let mut filter = SanitizerFilter::new();
        let mut payload = vec![ESC, b'P'];
        payload.extend(std::iter::repeat(b'x').take(MAX_CARRY_BYTES + 10));
        let out = filter.sanitize(&payload);
        assert_eq!(out, DCS_BLOCKED.to_vec());
        assert!(filter.carry.is_empty());
    }

    #[test]
    fn esc_followed_by_unrelated_byte_passes_through() {
        let input = b"\x1bcreset-sequence";
        assert_eq!(sanitize_whole(input), input.to_vec());
    }
}
