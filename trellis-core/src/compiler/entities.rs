//! HTML entity decoding.
//!
//! Text content gets full decoding against the HTML named character
//! reference table shipped with `html5ever`, plus numeric references;
//! attribute values only decode the handful of entities an HTML
//! serializer emits, with newline references decoded on request.

use std::sync::LazyLock;

use html5ever::data::{C1_REPLACEMENTS, NAMED_ENTITIES};
use regex::{Captures, Regex};

static ENCODED_ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(?:lt|gt|quot|amp|#39);").expect("valid attr regex"));

static ENCODED_ATTR_NEWLINES_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(?:lt|gt|quot|amp|#39|#10|#9);").expect("valid attr regex")
});

/// Decode the character reference at the start of `s` (the text after an
/// `&`) into `out`. Returns the number of bytes consumed, or `None` when
/// `s` does not start with a reference.
fn decode_reference(s: &str, out: &mut String) -> Option<usize> {
    match s.strip_prefix('#') {
        Some(num) => decode_numeric(num, out).map(|used| used + 1),
        None => decode_named(s, out),
    }
}

fn decode_numeric(s: &str, out: &mut String) -> Option<usize> {
    let (digits_at, radix) = match s.as_bytes().first() {
        Some(b'x' | b'X') => (1, 16),
        _ => (0, 10),
    };
    let digits = s[digits_at..]
        .bytes()
        .take_while(|b| (*b as char).is_digit(radix))
        .count();
    if digits == 0 {
        return None;
    }
    let end = digits_at + digits;
    let code = u32::from_str_radix(&s[digits_at..end], radix).unwrap_or(u32::MAX);
    out.push(numeric_char(code));
    Some(if s[end..].starts_with(';') { end + 1 } else { end })
}

fn numeric_char(code: u32) -> char {
    match code {
        0 => '\u{fffd}',
        0x80..=0x9f => C1_REPLACEMENTS[(code - 0x80) as usize]
            .or_else(|| char::from_u32(code))
            .unwrap_or('\u{fffd}'),
        _ => char::from_u32(code).unwrap_or('\u{fffd}'),
    }
}

/// Longest named reference at the start of `s`. Legacy names such as
/// `&amp` also match without their semicolon.
fn decode_named(s: &str, out: &mut String) -> Option<usize> {
    let mut best = None;
    for (i, c) in s.char_indices() {
        let end = i + c.len_utf8();
        match NAMED_ENTITIES.get(&s[..end]) {
            // A prefix of some longer name.
            Some(&(0, _)) => {}
            Some(&codepoints) => best = Some((end, codepoints)),
            None => break,
        }
    }
    let (end, (first, second)) = best?;
    out.extend(
        [first, second]
            .into_iter()
            .filter(|&cp| cp != 0)
            .filter_map(char::from_u32),
    );
    Some(end)
}

/// Decode every character reference in text content, named (the full HTML
/// set) and numeric. Anything that is not a reference is left as written.
pub fn decode_html(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        match decode_reference(after, &mut out) {
            Some(used) => rest = &after[used..],
            None => {
                out.push('&');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Decode an attribute value.
pub fn decode_attr(value: &str, decode_newlines: bool) -> String {
    let re = if decode_newlines {
        &*ENCODED_ATTR_NEWLINES_RE
    } else {
        &*ENCODED_ATTR_RE
    };
    re.replace_all(value, |caps: &Captures<'_>| {
        match &caps[0] {
            "&lt;" => "<",
            "&gt;" => ">",
            "&quot;" => "\"",
            "&amp;" => "&",
            "&#39;" => "'",
            "&#10;" => "\n",
            "&#9;" => "\t",
            other => other,
        }
        .to_string()
    })
    .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_named_and_numeric_references() {
        assert_eq!(decode_html("a &lt; b &amp;&amp; c"), "a < b && c");
        assert_eq!(decode_html("&#65;&#x42;&nbsp;"), "AB\u{a0}");
        assert_eq!(decode_html("&bogus; stays"), "&bogus; stays");
    }

    #[test]
    fn decodes_the_full_named_set() {
        assert_eq!(
            decode_html("&alpha;&hearts;&Omega;&le;&nbsp;x"),
            "\u{3b1}\u{2665}\u{3a9}\u{2264}\u{a0}x"
        );
        assert_eq!(decode_html("&NotNestedGreaterGreater;"), "\u{2aa2}\u{338}");
        assert_eq!(decode_html("&notin; &not"), "\u{2209} \u{ac}");
    }

    #[test]
    fn legacy_names_match_without_semicolon() {
        assert_eq!(decode_html("a &amp b &copy2024"), "a & b \u{a9}2024");
        assert_eq!(decode_html("AT&T"), "AT&T");
        assert_eq!(decode_html("& alone"), "& alone");
    }

    #[test]
    fn numeric_edge_cases() {
        assert_eq!(decode_html("&#0;&#x110000;&#xD800;"), "\u{fffd}\u{fffd}\u{fffd}");
        assert_eq!(decode_html("&#128;&#x99;"), "\u{20ac}\u{2122}");
        assert_eq!(decode_html("&#65 &#x;"), "A &#x;");
        assert_eq!(decode_html("&#99999999999;"), "\u{fffd}");
    }

    #[test]
    fn attributes_only_decode_newlines_on_request() {
        assert_eq!(decode_attr("a&#10;b&quot;", false), "a&#10;b\"");
        assert_eq!(decode_attr("a&#10;b&#9;", true), "a\nb\t");
        assert_eq!(decode_attr("&nbsp;", true), "&nbsp;");
    }
}
