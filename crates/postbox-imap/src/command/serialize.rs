//! Command serialization helpers.

/// How a string argument has to travel on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AstringForm {
    /// Sent as-is.
    Atom,
    /// Needs a quoted string.
    Quoted,
    /// Contains CR, LF, NUL or 8-bit data and must be a literal.
    Literal,
}

/// Classifies a string for astring encoding.
#[must_use]
pub fn astring_form(s: &str) -> AstringForm {
    if s.bytes().any(needs_literal) {
        AstringForm::Literal
    } else if s.is_empty() || s.bytes().any(needs_quoting) {
        AstringForm::Quoted
    } else {
        AstringForm::Atom
    }
}

/// Writes a quoted string, escaping `"` and `\`.
pub fn write_quoted(buf: &mut Vec<u8>, s: &str) {
    buf.push(b'"');
    for b in s.bytes() {
        if b == b'"' || b == b'\\' {
            buf.push(b'\\');
        }
        buf.push(b);
    }
    buf.push(b'"');
}

/// Writes a literal header: `{n}` or, non-synchronizing, `{n+}`, then CRLF.
pub fn write_literal_header(buf: &mut Vec<u8>, len: usize, non_sync: bool) {
    buf.push(b'{');
    buf.extend_from_slice(len.to_string().as_bytes());
    if non_sync {
        buf.push(b'+');
    }
    buf.extend_from_slice(b"}\r\n");
}

/// Returns true if the byte needs quoting.
const fn needs_quoting(b: u8) -> bool {
    matches!(
        b,
        b' ' | b'"' | b'\\' | b'(' | b')' | b'{' | b'%' | b'*' | b']'
    ) || b < 0x20
        || b == 0x7F
}

/// Returns true if the byte cannot appear in a quoted string.
const fn needs_literal(b: u8) -> bool {
    b == b'\r' || b == b'\n' || b == 0 || b > 0x7F
}
