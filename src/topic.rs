//! # MQTT-style Topic Matching
//!
//! Decides whether a subscription pattern matches a published topic. Topics
//! are `/`-separated. Patterns may use the MQTT wildcards:
//!
//! - `+` matches exactly one segment (`sensors/+/temp`)
//! - `#` matches all remaining segments and must be the last token (`sensors/#`)
//!
//! The matcher walks the topic once, keeping a byte cursor into each string.
//! It never allocates.
//! Patterns that misuse wildcards are not rejected anywhere; they just never
//! match.

/// Single-segment wildcard.
pub const SINGLE_LEVEL: u8 = b'+';
/// Multi-segment wildcard, only legal as the final token.
pub const MULTI_LEVEL: u8 = b'#';
/// Segment separator.
pub const SEPARATOR: u8 = b'/';

/// Byte at `pos`, or `0` past the end.
#[inline]
fn byte_at(buf: &[u8], pos: usize) -> u8 {
    buf.get(pos).copied().unwrap_or(0)
}

/// Unread remainder of `buf` starting at `pos` (empty past the end).
#[inline]
fn rest(buf: &[u8], pos: usize) -> &[u8] {
    buf.get(pos..).unwrap_or(&[])
}

/// Returns `true` if `pattern` matches the published `topic`.
///
/// A published topic must be wildcard-free; a topic containing `+` or `#`
/// never matches, not even an identical pattern.
///
/// A trailing `/#` also matches the parent level, so `a/#` matches `a`.
pub fn matches(topic: &str, pattern: &str) -> bool {
    if !is_publishable(topic) {
        return false;
    }
    if topic == pattern {
        return true;
    }

    let topic = topic.as_bytes();
    let pattern = pattern.as_bytes();
    let topic_len = topic.len();
    let pattern_len = pattern.len();

    // A wildcard is only legal as the first character of a segment.
    let mut segment_start = true;
    let mut tp = 0;
    let mut pp = 0;

    while tp < topic_len {
        if segment_start {
            segment_start = false;
            match byte_at(pattern, pp) {
                MULTI_LEVEL => return pp + 1 == pattern_len,
                SINGLE_LEVEL => {
                    while tp < topic_len && topic[tp] != SEPARATOR {
                        tp += 1;
                    }
                    pp += 1;
                    if tp == topic_len && (pp == pattern_len || rest(pattern, pp) == b"/#") {
                        return true;
                    }
                }
                _ => {}
            }
        } else if matches!(byte_at(pattern, pp), SINGLE_LEVEL | MULTI_LEVEL) {
            return false;
        }

        let c = byte_at(topic, tp);
        if c != byte_at(pattern, pp) && rest(pattern, pp) != b"/#" {
            return false;
        }
        if c == SEPARATOR {
            segment_start = true;
        }

        if tp + 1 == topic_len {
            if pp + 1 == pattern_len {
                return true;
            }
            return matches!(rest(pattern, pp + 1), b"/#" | b"#" | b"+");
        }

        pp += 1;
        tp += 1;
    }

    pp == pattern_len
}

/// Returns `true` if `topic` is usable as a published topic, i.e. it contains
/// no wildcard characters.
pub fn is_publishable(topic: &str) -> bool {
    !topic
        .bytes()
        .any(|b| b == SINGLE_LEVEL || b == MULTI_LEVEL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_topics_match() {
        for topic in ["", "a", "a/b", "sensors/kitchen/temp", "/leading", "trailing/"] {
            assert!(matches(topic, topic), "{topic}");
        }
    }

    #[test]
    fn test_single_level_wildcard() {
        assert!(matches("a/b", "a/+"));
        assert!(!matches("a/b/c", "a/+"));
        assert!(matches("a/b", "+/+"));
        assert!(!matches("a/b/c", "a/b/+/+"));
        assert!(matches("sensors/kitchen/temp", "sensors/+/temp"));
        assert!(!matches("sensors/kitchen/humidity", "sensors/+/temp"));
        assert!(matches("a", "+"));
    }

    #[test]
    fn test_multi_level_wildcard() {
        assert!(matches("a/b/c", "a/#"));
        assert!(matches("a", "a/#"));
        assert!(matches("a/b", "#"));
        assert!(matches("x", "#"));
        assert!(!matches("b/c", "a/#"));
    }

    #[test]
    fn test_plus_then_trailing_hash() {
        assert!(matches("a/b", "a/+/#"));
        assert!(matches("a/b/c/d", "a/+/#"));
    }

    #[test]
    fn test_hash_not_final_never_matches() {
        for topic in ["a", "a/b", "a/b/c", "a/x/b", "x/y"] {
            assert!(!matches(topic, "a/#/b"), "{topic}");
            assert!(!matches(topic, "#/b"), "{topic}");
        }
    }

    #[test]
    fn test_wildcard_inside_segment_fails() {
        assert!(!matches("ab/c", "a+/c"));
        assert!(!matches("ab/c", "a#"));
    }

    #[test]
    fn test_wildcards_in_topic_never_match() {
        for pattern in ["a/+", "#", "+/b", "a/#", "a/b", "+/+"] {
            assert!(!matches("a/+", pattern), "{pattern}");
            assert!(!matches("a/#", pattern), "{pattern}");
            assert!(!matches("+/b", pattern), "{pattern}");
        }
    }

    #[test]
    fn test_length_mismatch() {
        assert!(!matches("a/b", "a"));
        assert!(!matches("a", "a/b"));
        assert!(!matches("abc", "ab"));
        assert!(!matches("", "a"));
    }

    #[test]
    fn test_trailing_hash_tolerance_is_checked_during_walk() {
        // the unread `/#` tail tolerates the mismatching byte
        assert!(matches("ab", "a/#"));
    }

    #[test]
    fn test_is_publishable() {
        assert!(is_publishable("sensors/kitchen/temp"));
        assert!(!is_publishable("sensors/+/temp"));
        assert!(!is_publishable("sensors/#"));
    }
}
