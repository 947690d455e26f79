/// Trailing window of at most `max` characters, cut on a char boundary.
pub fn tail_chars(s: &str, max: usize) -> &str {
    if max == 0 {
        return "";
    }
    match s.char_indices().rev().nth(max - 1) {
        Some((idx, _)) => &s[idx..],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tail_chars_shorter_than_window() {
        assert_eq!(tail_chars("abc", 10), "abc");
        assert_eq!(tail_chars("", 10), "");
    }

    #[test]
    fn test_tail_chars_exact_and_truncated() {
        assert_eq!(tail_chars("abcdef", 6), "abcdef");
        assert_eq!(tail_chars("abcdef", 3), "def");
        assert_eq!(tail_chars("abcdef", 0), "");
    }

    #[test]
    fn test_tail_chars_multibyte_boundary() {
        // Bengali text, 3 bytes per char
        let s = "লেখকের গল্প";
        let tail = tail_chars(s, 5);
        assert_eq!(tail.chars().count(), 5);
        assert_eq!(tail, " গল্প");
        // Never panics on a byte that is not a boundary
        assert_eq!(tail_chars("héllo", 4), "éllo");
    }
}
