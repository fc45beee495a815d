//! Filter pipelines.
//!
//! Rewrites `value | a | b(arg)` into `_f("b")(_f("a")(value),arg)`. A `|`
//! only separates filters outside string, template and regex literals,
//! outside brackets, braces and parens, and when it is not part of `||`.

/// Characters after which a `/` is a division rather than a regex literal.
fn is_division_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, b'_' | b')' | b'.' | b'+' | b'-' | b'$' | b']')
}

pub fn parse_filters(exp: &str) -> String {
    let bytes = exp.as_bytes();
    let mut in_single = false;
    let mut in_double = false;
    let mut in_template = false;
    let mut in_regex = false;
    let (mut curly, mut square, mut paren) = (0i32, 0i32, 0i32);
    let mut last_filter_index = 0;
    let mut expression: Option<String> = None;
    let mut filters: Vec<String> = Vec::new();
    let mut prev = 0u8;

    for (i, &c) in bytes.iter().enumerate() {
        let escaped = prev == b'\\';
        if in_single {
            if c == b'\'' && !escaped {
                in_single = false;
            }
        } else if in_double {
            if c == b'"' && !escaped {
                in_double = false;
            }
        } else if in_template {
            if c == b'`' && !escaped {
                in_template = false;
            }
        } else if in_regex {
            if c == b'/' && !escaped {
                in_regex = false;
            }
        } else if c == b'|'
            && bytes.get(i + 1) != Some(&b'|')
            && (i == 0 || bytes[i - 1] != b'|')
            && curly == 0
            && square == 0
            && paren == 0
        {
            match expression {
                None => expression = Some(exp[..i].trim().to_string()),
                Some(_) => filters.push(exp[last_filter_index..i].trim().to_string()),
            }
            last_filter_index = i + 1;
        } else {
            match c {
                b'"' => in_double = true,
                b'\'' => in_single = true,
                b'`' => in_template = true,
                b'(' => paren += 1,
                b')' => paren -= 1,
                b'[' => square += 1,
                b']' => square -= 1,
                b'{' => curly += 1,
                b'}' => curly -= 1,
                _ => {}
            }
            if c == b'/' {
                let before = bytes[..i].iter().rev().find(|&&b| b != b' ');
                if !before.is_some_and(|&b| is_division_char(b)) {
                    in_regex = true;
                }
            }
        }
        prev = c;
    }

    let expression = match expression {
        None => return exp.trim().to_string(),
        Some(expression) => {
            if last_filter_index != 0 {
                filters.push(exp[last_filter_index..].trim().to_string());
            }
            expression
        }
    };

    filters
        .iter()
        .fold(expression, |exp, filter| wrap_filter(&exp, filter))
}

fn wrap_filter(exp: &str, filter: &str) -> String {
    match filter.find('(') {
        None => format!("_f(\"{filter}\")({exp})"),
        Some(i) => {
            let name = &filter[..i];
            let args = &filter[i + 1..];
            let sep = if args == ")" { "" } else { "," };
            format!("_f(\"{name}\")({exp}{sep}{args}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_filters_is_trimmed_identity() {
        assert_eq!(parse_filters("  a + b "), "a + b");
    }

    #[test]
    fn chains_filters_inside_out() {
        assert_eq!(parse_filters("msg | upper | wrap('[', ']')"), "_f(\"wrap\")(_f(\"upper\")(msg),'[', ']')");
        assert_eq!(parse_filters("n | fmt()"), "_f(\"fmt\")(n)");
    }

    #[test]
    fn logical_or_and_nested_pipes_are_not_separators() {
        assert_eq!(parse_filters("a || b"), "a || b");
        assert_eq!(parse_filters("f(a | b)"), "f(a | b)");
        assert_eq!(parse_filters("'a|b' + c"), "'a|b' + c");
        assert_eq!(parse_filters("[a|b]"), "[a|b]");
        assert_eq!(parse_filters("{ k: a|b }"), "{ k: a|b }");
    }

    #[test]
    fn division_is_not_a_regex() {
        assert_eq!(parse_filters("a / 2 | half"), "_f(\"half\")(a / 2)");
    }

    #[test]
    fn regex_literal_hides_pipes() {
        assert_eq!(parse_filters("/a|b/.test(x)"), "/a|b/.test(x)");
    }
}
