//! The permissive devcontainer.json dialect: strict JSON plus `//` and
//! `/* */` comments and trailing commas. This module rewrites such a
//! document to strict JSON so serde_json can do the actual parsing.
//! Comment markers and commas inside string literals are data and are
//! left untouched.

/// Rewrites a permissive-dialect document to strict JSON.
pub fn strip(input: &str) -> String {
    strip_trailing_commas(&strip_comments(input))
}

fn strip_comments(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut in_string = false;
    let mut escaped = false;

    while let Some(c) = chars.next() {
        if in_string {
            output.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                output.push(c);
            }
            '/' => match chars.peek() {
                Some('/') => {
                    // Consume up to, but not including, the newline so
                    // line numbers in parse errors stay meaningful.
                    while let Some(&next) = chars.peek() {
                        if next == '\n' {
                            break;
                        }
                        chars.next();
                    }
                }
                Some('*') => {
                    chars.next();
                    let mut previous = '\0';
                    while let Some(next) = chars.next() {
                        if previous == '*' && next == '/' {
                            break;
                        }
                        if next == '\n' {
                            output.push('\n');
                        }
                        previous = next;
                    }
                    output.push(' ');
                }
                _ => output.push(c),
            },
            _ => output.push(c),
        }
    }

    output
}

fn strip_trailing_commas(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    let mut in_string = false;
    let mut escaped = false;

    for c in input.chars() {
        if in_string {
            output.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                output.push(c);
            }
            '}' | ']' => {
                let content_len = output.trim_end().len();
                if output[..content_len].ends_with(',') {
                    output.truncate(content_len - 1);
                }
                output.push(c);
            }
            _ => output.push(c),
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn parse(input: &str) -> Value {
        serde_json::from_str(&strip(input)).unwrap()
    }

    #[test]
    fn strict_json_passes_through() {
        let input = r#"{"name": "dev", "count": 3}"#;
        assert_eq!(strip(input), input);
    }

    #[test]
    fn line_comments_are_removed() {
        let value = parse("// header\n{\"name\": \"dev\" // trailing\n}");
        assert_eq!(value["name"], "dev");
    }

    #[test]
    fn block_comments_are_removed() {
        let value = parse("{/* a\nmultiline\ncomment */ \"name\": \"dev\"}");
        assert_eq!(value["name"], "dev");
    }

    #[test]
    fn comment_markers_inside_strings_are_data() {
        let value = parse(r#"{"url": "https://example.com/*path*/"}"#);
        assert_eq!(value["url"], "https://example.com/*path*/");
    }

    #[test]
    fn trailing_commas_are_removed() {
        let value = parse("{\"args\": [\"a\", \"b\",], \"env\": {\"K\": \"v\",},}");
        assert_eq!(value["args"], serde_json::json!(["a", "b"]));
        assert_eq!(value["env"]["K"], "v");
    }

    #[test]
    fn commas_inside_strings_are_kept() {
        let value = parse(r#"{"mount": "source=/a,target=/b,"}"#);
        assert_eq!(value["mount"], "source=/a,target=/b,");
    }

    #[test]
    fn escaped_quote_does_not_end_string() {
        let value = parse(r#"{"text": "quote \" // not a comment"}"#);
        assert_eq!(value["text"], "quote \" // not a comment");
    }

    #[test]
    fn trailing_comma_is_semantically_transparent() {
        let with: Value = parse("{\"runArgs\": [\"--gpus\", \"all\",]}");
        let without: Value = parse("{\"runArgs\": [\"--gpus\", \"all\"]}");
        assert_eq!(with, without);
    }
}
