//! Display width of decoded snapshot characters
//!
//! Snapshots carry characters without a width, so the decoder derives it from
//! the code point ranges the sender's renderer uses: emoji and East Asian wide
//! characters take two columns, combining marks, variation selectors and join
//! controls take none.

const ZERO_WIDTH: &[(u32, u32)] = &[
    (0x0300, 0x036F), // combining diacritical marks
    (0x1AB0, 0x1AFF),
    (0x1DC0, 0x1DFF),
    (0x200B, 0x200D), // zero width space, ZWNJ, ZWJ
    (0x2060, 0x2060), // word joiner
    (0x20D0, 0x20FF),
    (0xFE00, 0xFE0F), // variation selectors
    (0xFE20, 0xFE2F),
    (0xFEFF, 0xFEFF),
    (0xE0100, 0xE01EF),
];

const EMOJI: &[(u32, u32)] = &[
    (0x2600, 0x27BF),   // misc symbols, dingbats
    (0x1F000, 0x1FAFF), // mahjong through symbols & pictographs ext-A
];

const WIDE: &[(u32, u32)] = &[
    (0x1100, 0x115F), // Hangul Jamo
    (0x2E80, 0x9FFF), // CJK radicals through unified ideographs
    (0xAC00, 0xD7AF), // Hangul syllables
    (0xF900, 0xFAFF), // CJK compatibility ideographs
    (0xFE30, 0xFE6F), // CJK compatibility forms
    (0xFF00, 0xFF60), // fullwidth forms
    (0xFFE0, 0xFFE6),
    (0x20000, 0x3FFFD), // CJK extension planes
];

fn in_ranges(cp: u32, ranges: &[(u32, u32)]) -> bool {
    ranges.iter().any(|&(lo, hi)| cp >= lo && cp <= hi)
}

/// Columns occupied by a single code point
pub fn char_display_width(c: char) -> u8 {
    let cp = c as u32;
    if in_ranges(cp, ZERO_WIDTH) {
        0
    } else if in_ranges(cp, EMOJI) || in_ranges(cp, WIDE) {
        2
    } else {
        1
    }
}

/// Columns occupied by a cell's grapheme.
///
/// An empty string is a blank cell and occupies one column.
pub fn str_display_width(s: &str) -> u8 {
    let mut width = None;
    for c in s.chars() {
        let w = char_display_width(c);
        if w == 2 {
            return 2;
        }
        width = Some(width.unwrap_or(0).max(w));
    }
    width.unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_is_narrow() {
        assert_eq!(str_display_width("a"), 1);
        assert_eq!(str_display_width(" "), 1);
    }

    #[test]
    fn test_cjk_and_hangul_are_wide() {
        assert_eq!(str_display_width("中"), 2);
        assert_eq!(str_display_width("한"), 2);
        assert_eq!(str_display_width("Ａ"), 2);
        assert_eq!(char_display_width('\u{20001}'), 2);
    }

    #[test]
    fn test_emoji_is_wide() {
        assert_eq!(str_display_width("😀"), 2);
        assert_eq!(str_display_width("❤\u{FE0F}"), 2);
    }

    #[test]
    fn test_marks_are_zero_width() {
        assert_eq!(str_display_width("\u{0301}"), 0);
        assert_eq!(str_display_width("\u{FE0F}"), 0);
        assert_eq!(str_display_width("\u{200D}"), 0);
    }

    #[test]
    fn test_base_plus_mark_is_narrow() {
        assert_eq!(str_display_width("e\u{0301}"), 1);
    }

    #[test]
    fn test_empty_is_blank() {
        assert_eq!(str_display_width(""), 1);
    }
}
