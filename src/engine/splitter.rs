//! Splits a service script into its definition call and its handler code.

/// The call that introduces a service definition.
pub const DEFINITION_MARKER: &str = "service.define(";

/// The two parts of a service script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceSegments<'a> {
    /// The `service.define(...)` call including its trailing `;`, or empty.
    pub definition: &'a str,
    /// Everything after the definition call, or the whole source.
    pub code: &'a str,
}

impl SourceSegments<'_> {
    /// Returns true if the script carries a definition call.
    pub fn has_definition(&self) -> bool {
        !self.definition.is_empty()
    }
}

/// Partitions `source` into its definition segment and code segment.
///
/// A missing or unterminated definition call yields an empty definition and
/// the whole source as code.
pub fn split_source(source: &str) -> SourceSegments<'_> {
    let whole = SourceSegments { definition: "", code: source };

    let Some(start) = source.find(DEFINITION_MARKER) else {
        return whole;
    };
    let args_start = start + DEFINITION_MARKER.len();
    let Some(close) = find_call_end(source, args_start) else {
        tracing::debug!(offset = start, "Definition call is not terminated, treating source as code.");
        return whole;
    };

    let mut end = close + 1;
    let rest = &source[end..];
    let trimmed = rest.trim_start_matches([' ', '\t']);
    if trimmed.starts_with(';') {
        end += rest.len() - trimmed.len() + 1;
    }

    SourceSegments { definition: &source[start..end], code: &source[end..] }
}

/// Scans from just after the opening `(` and returns the byte offset of the
/// `)` that closes the call. Brackets are balanced by kind; string literals
/// and comments are skipped.
fn find_call_end(source: &str, from: usize) -> Option<usize> {
    let bytes = source.as_bytes();
    let mut stack = vec![b')'];
    let mut i = from;

    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => i = skip_quoted(bytes, i, bytes[i])?,
            b'`' => i = skip_until(bytes, i + 1, b"`")?,
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                i = skip_until(bytes, i + 2, b"\n").unwrap_or(bytes.len());
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => i = skip_block_comment(bytes, i + 2)?,
            b'(' => stack.push(b')'),
            b'{' => stack.push(b'}'),
            b'[' => stack.push(b']'),
            c @ (b')' | b'}' | b']') => {
                if stack.pop() != Some(c) {
                    return None;
                }
                if stack.is_empty() {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Returns the offset of the closing quote of a literal opened at `open`.
fn skip_quoted(bytes: &[u8], open: usize, quote: u8) -> Option<usize> {
    let mut i = open + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\n' => return None,
            c if c == quote => return Some(i),
            _ => i += 1,
        }
    }
    None
}

/// Returns the offset of the last byte of the first `needle` at or after
/// `from`.
fn skip_until(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    bytes
        .get(from..)?
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|pos| from + pos + needle.len() - 1)
}

/// Skips a possibly nested block comment whose opening `/*` ends before
/// `from`. Returns the offset of the final `/`.
fn skip_block_comment(bytes: &[u8], from: usize) -> Option<usize> {
    let mut depth = 1;
    let mut i = from;
    while i + 1 < bytes.len() {
        match (bytes[i], bytes[i + 1]) {
            (b'/', b'*') => {
                depth += 1;
                i += 2;
            }
            (b'*', b'/') => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
                i += 2;
            }
            _ => i += 1,
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_without_marker_is_all_code() {
        let source = "let x = 1;\nsetRespData(x);";
        let segments = split_source(source);
        assert_eq!(segments.definition, "");
        assert_eq!(segments.code, source);
        assert!(!segments.has_definition());
    }

    #[test]
    fn test_definition_and_code_are_separated() {
        let source = r#"service.define(#{ path: "/users", method: "GET" });
setRespData(42);"#;
        let segments = split_source(source);
        assert_eq!(segments.definition, r#"service.define(#{ path: "/users", method: "GET" });"#);
        assert_eq!(segments.code, "\nsetRespData(42);");
    }

    #[test]
    fn test_nested_braces_are_balanced() {
        let source = r#"service.define(#{
    path: "/orders",
    method: "POST",
    params: [#{ name: "order", dataType: "MAP" }, #{ name: "tags", dataType: "ARRAY" }]
});
let total = 0;"#;
        let segments = split_source(source);
        assert!(segments.definition.ends_with("});"));
        assert!(segments.definition.contains("\"tags\""));
        assert_eq!(segments.code, "\nlet total = 0;");
    }

    #[test]
    fn test_brackets_inside_strings_and_comments_are_ignored() {
        let source = r#"service.define(#{
    path: "/users/{id}", // closes early? })
    /* not here either: }) */
    method: "GET",
    note: "a \" quoted }) string"
}) ;rest"#;
        let segments = split_source(source);
        assert!(segments.definition.ends_with("}) ;"));
        assert_eq!(segments.code, "rest");
    }

    #[test]
    fn test_semicolon_is_optional() {
        let segments = split_source("service.define(#{ path: \"/a\", method: \"GET\" })\nlet a = 1;");
        assert!(segments.definition.ends_with("})"));
        assert_eq!(segments.code, "\nlet a = 1;");
    }

    #[test]
    fn test_text_before_marker_is_dropped() {
        let segments = split_source("// header\nservice.define(#{ path: \"/a\", method: \"GET\" });x");
        assert!(segments.definition.starts_with(DEFINITION_MARKER));
        assert_eq!(segments.code, "x");
    }

    #[test]
    fn test_unterminated_definition_is_treated_as_absent() {
        let source = "service.define(#{ path: \"/a\", method: \"GET\" }\nlet a = 1;";
        let segments = split_source(source);
        assert_eq!(segments.definition, "");
        assert_eq!(segments.code, source);
    }

    #[test]
    fn test_mismatched_brackets_are_treated_as_absent() {
        let source = "service.define(#{ path: \"/a\" ]);";
        assert_eq!(split_source(source).code, source);
    }
}
