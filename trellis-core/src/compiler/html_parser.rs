//! Streaming HTML tokenizer.
//!
//! Scans the template once and reports tags, text and comments to an
//! [`HtmlSink`]. It keeps its own stack of open tags so that close tags can
//! be matched, but builds no tree.
//!
//! # Tag Matching
//!
//! A close tag is matched against the nearest open tag with the same name
//! (case-insensitively). Open tags above it are closed too and reported as
//! having no matching end tag. A close tag with no open counterpart is
//! dropped, except `</br>` (treated as `<br>`) and `</p>` (treated as
//! `<p></p>`), as browsers do.
//!
//! Offsets are byte offsets into the template.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use super::ast::AstAttr;
use super::diagnostics::Span;
use super::entities::decode_attr;
use super::options::CompilerOptions;
use super::platform::is_non_phrasing_tag;

const UNICODE_LETTERS: &str = r"\x{B7}\x{C0}-\x{D6}\x{D8}-\x{F6}\x{F8}-\x{37D}\x{37F}-\x{1FFF}\x{200C}-\x{200D}\x{203F}-\x{2040}\x{2070}-\x{218F}\x{2C00}-\x{2FEF}\x{3001}-\x{D7FF}\x{F900}-\x{FDCF}\x{FDF0}-\x{FFFD}";

fn qname_capture() -> String {
    let ncname = format!(r"[a-zA-Z_][\-\.0-9_a-zA-Z{UNICODE_LETTERS}]*");
    format!(r"((?:{ncname}:)?{ncname})")
}

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^\s*([^\s"'<>/=]+)(?:\s*(=)\s*(?:"([^"]*)"+|'([^']*)'+|([^\s"'=<>`]+)))?"#,
    )
    .expect("valid attribute regex")
});

static DYNAMIC_ARG_ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^\s*((?:v-[\w-]+:|@|:|#)\[[^=]+?\][^\s"'<>/=]*)(?:\s*(=)\s*(?:"([^"]*)"+|'([^']*)'+|([^\s"'=<>`]+)))?"#,
    )
    .expect("valid dynamic attribute regex")
});

static START_TAG_OPEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("^<{}", qname_capture())).expect("valid start tag regex")
});

static START_TAG_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(/?)>").expect("valid start tag close regex"));

static END_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("^</{}[^>]*>", qname_capture())).expect("valid end tag regex")
});

static DOCTYPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^<!DOCTYPE [^>]+>").expect("valid doctype regex"));

const COMMENT_OPEN: &str = "<!--";
const CONDITIONAL_COMMENT_OPEN: &str = "<![";

/// Elements whose content is raw text, terminated only by their own close
/// tag.
pub fn is_plain_text_element(tag: &str) -> bool {
    matches!(tag.to_ascii_lowercase().as_str(), "script" | "style" | "textarea")
}

fn is_ignore_newline_tag(tag: &str) -> bool {
    matches!(tag, "pre" | "textarea")
}

/// Receiver of tokenizer events.
pub trait HtmlSink {
    fn start(&mut self, tag: &str, attrs: Vec<AstAttr>, unary: bool, start: usize, end: usize);
    fn end(&mut self, tag: &str, start: usize, end: usize);
    /// Text content. Raw text inside `script`, `style` and `textarea`
    /// carries no offsets.
    fn chars(&mut self, text: &str, start: Option<usize>, end: Option<usize>);
    fn comment(&mut self, text: &str, start: usize, end: usize);
    fn warn(&mut self, message: String, span: Span);
}

struct OpenTag {
    tag: String,
    lower: String,
    start: usize,
    end: usize,
}

struct StartTagMatch {
    tag: String,
    attrs: Vec<RawAttr>,
    unary_slash: bool,
    start: usize,
    end: usize,
}

struct RawAttr {
    name: String,
    value: String,
    start: usize,
    end: usize,
}

struct Tokenizer<'a, S: HtmlSink> {
    html: &'a str,
    pos: usize,
    stack: Vec<OpenTag>,
    last_tag: Option<String>,
    options: &'a CompilerOptions,
    sink: &'a mut S,
    raw_end_tags: HashMap<String, Regex>,
}

/// Tokenize `html`, reporting to `sink`.
pub fn parse_html<S: HtmlSink>(html: &str, options: &CompilerOptions, sink: &mut S) {
    let mut tokenizer = Tokenizer {
        html,
        pos: 0,
        stack: Vec::new(),
        last_tag: None,
        options,
        sink,
        raw_end_tags: HashMap::new(),
    };
    tokenizer.run();
}

impl<'a, S: HtmlSink> Tokenizer<'a, S> {
    fn rest(&self) -> &'a str {
        &self.html[self.pos..]
    }

    fn advance(&mut self, n: usize) {
        self.pos += n;
    }

    fn run(&mut self) {
        while self.pos < self.html.len() {
            let last = self.pos;
            let in_raw_text = self
                .last_tag
                .as_deref()
                .is_some_and(is_plain_text_element);

            if in_raw_text {
                self.scan_raw_text();
            } else if self.scan_markup() {
                continue;
            }

            if self.pos == last {
                let rest = self.rest();
                self.sink.chars(rest, Some(self.pos), Some(self.html.len()));
                if self.stack.is_empty() {
                    self.sink.warn(
                        format!("Mal-formatted tag at end of template: \"{rest}\""),
                        Span::at(self.html.len()),
                    );
                }
                break;
            }
        }

        let end = self.pos;
        self.parse_end_tag(None, end, end);
    }

    /// Handle the next markup construct or text run. Returns true when a
    /// tag, comment or doctype was consumed.
    fn scan_markup(&mut self) -> bool {
        let rest = self.rest();
        let text_end = rest.find('<');

        if text_end == Some(0) {
            if rest.starts_with(COMMENT_OPEN) {
                if let Some(comment_end) = rest.find("-->") {
                    if self.options.comments.unwrap_or(false) {
                        let start = self.pos;
                        // `<!-->` and `<!--->` close before the text starts.
                        let text = rest.get(COMMENT_OPEN.len()..comment_end).unwrap_or_default();
                        self.sink.comment(text, start, start + comment_end + 3);
                    }
                    self.advance(comment_end + 3);
                    return true;
                }
            }

            if rest.starts_with(CONDITIONAL_COMMENT_OPEN) {
                if let Some(conditional_end) = rest.find("]>") {
                    self.advance(conditional_end + 2);
                    return true;
                }
            }

            if let Some(m) = DOCTYPE.find(rest) {
                self.advance(m.end());
                return true;
            }

            if let Some(caps) = END_TAG.captures(rest) {
                let start = self.pos;
                let tag = caps[1].to_string();
                self.advance(caps[0].len());
                let end = self.pos;
                self.parse_end_tag(Some(&tag), start, end);
                return true;
            }

            if let Some(tag_match) = self.parse_start_tag() {
                let tag = tag_match.tag.clone();
                self.handle_start_tag(tag_match);
                if is_ignore_newline_tag(&tag) && self.rest().starts_with('\n') {
                    self.advance(1);
                }
                return true;
            }
        }

        // A failed start tag may have consumed input; text is measured from
        // the current position.
        let rest = self.rest();
        let text = match text_end {
            Some(mut end) if end < rest.len() => {
                while end < rest.len() {
                    let tail = &rest[end..];
                    if END_TAG.is_match(tail)
                        || START_TAG_OPEN.is_match(tail)
                        || tail.starts_with(COMMENT_OPEN)
                        || tail.starts_with(CONDITIONAL_COMMENT_OPEN)
                    {
                        break;
                    }
                    match tail[1..].find('<') {
                        Some(next) => end += next + 1,
                        None => break,
                    }
                }
                &rest[..end]
            }
            _ => rest,
        };

        if !text.is_empty() {
            let start = self.pos;
            self.advance(text.len());
            self.sink.chars(text, Some(start), Some(self.pos));
        }
        false
    }

    fn scan_raw_text(&mut self) {
        let stacked = self
            .last_tag
            .as_deref()
            .unwrap_or_default()
            .to_ascii_lowercase();
        let re = self
            .raw_end_tags
            .entry(stacked.clone())
            .or_insert_with(|| {
                Regex::new(&format!(r"(?is)^(.*?)(</{}[^>]*>)", regex::escape(&stacked)))
                    .expect("escaped tag regex")
            })
            .clone();

        let rest = self.rest();
        let mut end_tag_len = 0;
        if let Some(caps) = re.captures(rest) {
            end_tag_len = caps[2].len();
            let mut text = &caps[1];
            if is_ignore_newline_tag(&stacked) && text.starts_with('\n') {
                text = &text[1..];
            }
            self.sink.chars(text, None, None);
            self.advance(caps[0].len());
        }
        let end = self.pos;
        self.parse_end_tag(Some(&stacked), end - end_tag_len, end);
    }

    fn parse_start_tag(&mut self) -> Option<StartTagMatch> {
        let caps = START_TAG_OPEN.captures(self.rest())?;
        let mut tag_match = StartTagMatch {
            tag: caps[1].to_string(),
            attrs: Vec::new(),
            unary_slash: false,
            start: self.pos,
            end: 0,
        };
        self.advance(caps[0].len());

        loop {
            let rest = self.rest();
            if let Some(close) = START_TAG_CLOSE.captures(rest) {
                tag_match.unary_slash = !close[1].is_empty();
                self.advance(close[0].len());
                tag_match.end = self.pos;
                return Some(tag_match);
            }
            let Some(attr) = DYNAMIC_ARG_ATTRIBUTE
                .captures(rest)
                .or_else(|| ATTRIBUTE.captures(rest))
            else {
                return None;
            };
            let whole = &attr[0];
            let leading = whole.len() - whole.trim_start().len();
            let value = attr
                .get(3)
                .or_else(|| attr.get(4))
                .or_else(|| attr.get(5))
                .map_or("", |m| m.as_str());
            let start = self.pos;
            tag_match.attrs.push(RawAttr {
                name: attr[1].to_string(),
                value: value.to_string(),
                start: start + leading,
                end: start + whole.len(),
            });
            self.advance(whole.len());
        }
    }

    fn handle_start_tag(&mut self, tag_match: StartTagMatch) {
        let tag = tag_match.tag;

        if self.options.expect_html.unwrap_or(false) {
            if self.last_tag.as_deref() == Some("p") && is_non_phrasing_tag(&tag) {
                let pos = self.pos;
                self.parse_end_tag(Some("p"), pos, pos);
            }
            if self.options.left_open(&tag) && self.last_tag.as_deref() == Some(tag.as_str()) {
                let pos = self.pos;
                self.parse_end_tag(Some(&tag), pos, pos);
            }
        }

        let unary = self.options.unary(&tag) || tag_match.unary_slash;
        let with_ranges = self.options.output_source_range.unwrap_or(false);

        let attrs = tag_match
            .attrs
            .into_iter()
            .map(|raw| {
                let decode_newlines = if tag == "a" && raw.name == "href" {
                    self.options.should_decode_newlines_for_href
                } else {
                    self.options.should_decode_newlines
                };
                let mut attr = AstAttr::new(raw.name, decode_attr(&raw.value, decode_newlines.unwrap_or(false)));
                if with_ranges {
                    attr.start = Some(raw.start);
                    attr.end = Some(raw.end);
                }
                attr
            })
            .collect();

        if !unary {
            self.stack.push(OpenTag {
                lower: tag.to_ascii_lowercase(),
                tag: tag.clone(),
                start: tag_match.start,
                end: tag_match.end,
            });
            self.last_tag = Some(tag.clone());
        }

        self.sink.start(&tag, attrs, unary, tag_match.start, tag_match.end);
    }

    /// Close `tag_name` (or, with `None`, everything still open).
    fn parse_end_tag(&mut self, tag_name: Option<&str>, start: usize, end: usize) {
        let lower = tag_name.map(str::to_ascii_lowercase);
        let pos = match &lower {
            Some(lower) => self.stack.iter().rposition(|open| &open.lower == lower),
            None => Some(0),
        };

        match pos {
            Some(pos) => {
                for i in (pos..self.stack.len()).rev() {
                    let open = &self.stack[i];
                    if i > pos || tag_name.is_none() {
                        let message = format!("tag <{}> has no matching end tag.", open.tag);
                        let span = Span::new(open.start, open.end);
                        self.sink.warn(message, span);
                    }
                    let open_tag = self.stack[i].tag.clone();
                    self.sink.end(&open_tag, start, end);
                }
                self.stack.truncate(pos);
                self.last_tag = self.stack.last().map(|open| open.tag.clone());
            }
            None => match lower.as_deref() {
                Some("br") => {
                    self.sink.start(tag_name.unwrap_or("br"), Vec::new(), true, start, end);
                }
                Some("p") => {
                    let tag = tag_name.unwrap_or("p");
                    self.sink.start(tag, Vec::new(), false, start, end);
                    self.sink.end(tag, start, end);
                }
                _ => {}
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
        warnings: Vec<String>,
    }

    impl HtmlSink for Recorder {
        fn start(&mut self, tag: &str, attrs: Vec<AstAttr>, unary: bool, _: usize, _: usize) {
            let attrs: Vec<String> = attrs
                .iter()
                .map(|a| format!("{}={}", a.name, a.value))
                .collect();
            let slash = if unary { "/" } else { "" };
            self.events.push(format!("<{tag}{}{slash}>", attrs.iter().map(|a| format!(" {a}")).collect::<String>()));
        }

        fn end(&mut self, tag: &str, _: usize, _: usize) {
            self.events.push(format!("</{tag}>"));
        }

        fn chars(&mut self, text: &str, _: Option<usize>, _: Option<usize>) {
            self.events.push(format!("text({text})"));
        }

        fn comment(&mut self, text: &str, _: usize, _: usize) {
            self.events.push(format!("comment({text})"));
        }

        fn warn(&mut self, message: String, _: Span) {
            self.warnings.push(message);
        }
    }

    fn tokenize(html: &str, options: &CompilerOptions) -> Recorder {
        let mut recorder = Recorder::default();
        parse_html(html, options, &mut recorder);
        recorder
    }

    #[test]
    fn tags_attributes_and_text() {
        let rec = tokenize(r#"<div id="a" :b='c' d=e f>hi <br></div>"#, &CompilerOptions::web());
        assert_eq!(
            rec.events,
            vec!["<div id=a :b=c d=e f=>", "text(hi )", "<br/>", "</div>"]
        );
        assert!(rec.warnings.is_empty());
    }

    #[test]
    fn dynamic_argument_attributes_keep_brackets() {
        let rec = tokenize(r#"<a v-bind:[key]="v" @[ev].stop="h"></a>"#, &CompilerOptions::new());
        assert_eq!(rec.events[0], "<a v-bind:[key]=v @[ev].stop=h>");
    }

    #[test]
    fn mismatched_close_reports_the_skipped_tag() {
        let rec = tokenize("<div><span></div>", &CompilerOptions::new());
        assert_eq!(rec.events, vec!["<div>", "<span>", "</span>", "</div>"]);
        assert_eq!(rec.warnings, vec!["tag <span> has no matching end tag."]);
    }

    #[test]
    fn unclosed_tags_are_closed_at_the_end() {
        let rec = tokenize("<div><p>x", &CompilerOptions::new());
        assert_eq!(rec.events.last().unwrap(), "</div>");
        assert_eq!(rec.warnings.len(), 2);
    }

    #[test]
    fn comments_are_dropped_unless_kept() {
        let rec = tokenize("<div><!-- c --></div>", &CompilerOptions::new());
        assert_eq!(rec.events, vec!["<div>", "</div>"]);

        let keep = CompilerOptions::new().with_comments(true);
        let rec = tokenize("<div><!-- c --></div>", &keep);
        assert_eq!(rec.events[1], "comment( c )");
    }

    #[test]
    fn abruptly_closed_comments_are_empty() {
        let keep = CompilerOptions::new().with_comments(true);
        let rec = tokenize("<div><!--></div>", &keep);
        assert_eq!(rec.events, vec!["<div>", "comment()", "</div>"]);

        let rec = tokenize("<div><!---></div>", &keep);
        assert_eq!(rec.events, vec!["<div>", "comment()", "</div>"]);
    }

    #[test]
    fn doctype_and_conditional_comments_are_skipped() {
        let rec = tokenize("<!DOCTYPE html><![if IE]><div></div>", &CompilerOptions::new());
        assert_eq!(rec.events, vec!["<div>", "</div>"]);
    }

    #[test]
    fn raw_text_elements_end_only_at_their_close_tag() {
        let rec = tokenize("<textarea>\n<b>{{ x }}</b></textarea>", &CompilerOptions::web());
        assert_eq!(
            rec.events,
            vec!["<textarea>", "text(<b>{{ x }}</b>)", "</textarea>"]
        );
    }

    #[test]
    fn stray_br_and_p_close_tags() {
        let rec = tokenize("<div></br></p></div>", &CompilerOptions::new());
        assert_eq!(rec.events, vec!["<div>", "<br/>", "<p>", "</p>", "</div>"]);
    }

    #[test]
    fn paragraph_closes_before_block_element() {
        let rec = tokenize("<div><p>a<div></div></div>", &CompilerOptions::web());
        assert_eq!(
            rec.events,
            vec!["<div>", "<p>", "text(a)", "</p>", "<div>", "</div>", "</div>"]
        );
    }

    #[test]
    fn left_open_tags_close_their_sibling() {
        let rec = tokenize("<ul><li>a<li>b</ul>", &CompilerOptions::web());
        assert_eq!(
            rec.events,
            vec!["<ul>", "<li>", "text(a)", "</li>", "<li>", "text(b)", "</li>", "</ul>"]
        );
        assert_eq!(rec.warnings, vec!["tag <li> has no matching end tag."]);
    }

    #[test]
    fn text_with_a_lone_angle_bracket() {
        let rec = tokenize("<p>a < b</p>", &CompilerOptions::new());
        assert_eq!(rec.events, vec!["<p>", "text(a < b)", "</p>"]);
    }

    #[test]
    fn newline_entities_in_attributes() {
        let options = CompilerOptions {
            should_decode_newlines: Some(true),
            ..CompilerOptions::new()
        };
        let rec = tokenize("<p title=\"a&#10;b\"></p>", &options);
        assert_eq!(rec.events[0], "<p title=a\nb>");
    }

    #[test]
    fn malformed_tag_at_end() {
        let rec = tokenize("<", &CompilerOptions::new());
        assert_eq!(rec.events, vec!["text(<)"]);
        assert_eq!(rec.warnings, vec!["Mal-formatted tag at end of template: \"<\""]);
    }
}
