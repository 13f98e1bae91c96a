//! Output file naming.
//!
//! The source extension is removed with a character-class trim: every
//! trailing `h`, `e`, `i` or `c` (any case) goes, not just a literal
//! `.heic` suffix. The dot stops the trim, but a name without one loses
//! letters that were never an extension (`psychic` becomes `psy.jpg`). This
//! is long-standing behavior users have seen, so it is kept; the tests pin
//! it down.

const SOURCE_EXT_CHARS: &[char] = &['h', 'e', 'i', 'c'];
const TARGET_EXT: &str = "jpg";
const FALLBACK_STEM: &str = "image";

/// Derive the JPEG file name for a HEIC attachment name.
pub fn jpeg_name(source: Option<&str>) -> String {
    let name = source.unwrap_or_default();
    let trimmed =
        name.trim_end_matches(|c: char| SOURCE_EXT_CHARS.contains(&c.to_ascii_lowercase()));
    let stem = trimmed.strip_suffix('.').unwrap_or(trimmed);
    let stem = if stem.is_empty() { FALLBACK_STEM } else { stem };
    format!("{stem}.{TARGET_EXT}")
}
