//! Text cleanup before synthesis.

/// Clean `text` for speech. Returns `None` when nothing speakable remains.
///
/// Markup tags are removed, a few common entities decoded, emoji and UI
/// glyphs dropped, dashes and smart quotes mapped to ASCII and whitespace
/// collapsed.
pub fn sanitize(text: &str) -> Option<String> {
    let without_tags = strip_tags(text);
    let decoded = decode_entities(&without_tags);

    let mut out = String::with_capacity(decoded.len());
    let mut pending_space = false;
    for c in decoded.chars() {
        let mapped = match c {
            '\u{2014}' | '\u{2013}' | '\u{2012}' | '\u{2212}' => Some('-'),
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{2032}' => Some('\''),
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{2033}' => Some('"'),
            '\u{2026}' => Some('.'),
            c if c.is_whitespace() => None,
            c if is_glyph(c) => {
                pending_space = true;
                continue;
            }
            c if c.is_control() => continue,
            c => Some(c),
        };
        match mapped {
            Some(c) => {
                if pending_space && !out.is_empty() {
                    out.push(' ');
                }
                pending_space = false;
                out.push(c);
            }
            None => pending_space = true,
        }
    }

    if out.chars().any(char::is_alphanumeric) {
        Some(out)
    } else {
        None
    }
}

fn strip_tags(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_tag = false;
    for c in text.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                out.push(' ');
            }
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

const ENTITIES: &[(&str, &str)] = &[
    ("&amp;", " and "),
    ("&nbsp;", " "),
    ("&rsquo;", "'"),
    ("&lsquo;", "'"),
    ("&#39;", "'"),
    ("&apos;", "'"),
    ("&ldquo;", "\""),
    ("&rdquo;", "\""),
    ("&quot;", "\""),
    ("&mdash;", "-"),
    ("&ndash;", "-"),
    ("&hellip;", "."),
    ("&lt;", " "),
    ("&gt;", " "),
];

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_owned();
    }
    ENTITIES
        .iter()
        .fold(text.to_owned(), |acc, (entity, replacement)| {
            acc.replace(entity, replacement)
        })
}

/// Emoji, pictographs, arrows, geometric shapes and bullets.
fn is_glyph(c: char) -> bool {
    matches!(
        c as u32,
        0x1F000..=0x1FAFF
            | 0x2190..=0x21FF
            | 0x2300..=0x23FF
            | 0x25A0..=0x25FF
            | 0x2600..=0x27BF
            | 0x2B00..=0x2BFF
            | 0xFE00..=0xFE0F
            | 0x200D
            | 0x2022
            | 0x2023
            | 0x2043
            | 0x00B7
    )
}
