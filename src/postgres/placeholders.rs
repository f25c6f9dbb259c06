use std::borrow::Cow;

/// SQL with named placeholders rewritten to positional `$n`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionalSql<'a> {
    pub sql: Cow<'a, str>,
    /// Parameter names in position order; `names[0]` is `$1`.
    pub names: Vec<String>,
}

#[derive(Clone)]
enum State {
    Normal,
    SingleQuoted,
    DoubleQuoted,
    LineComment,
    BlockComment(u32),
    DollarQuoted(String),
}

/// Rewrite `@name` and `:name` placeholders into `$1`, `$2`, ...
///
/// Each distinct name gets one position and repeats reuse it. Quoted strings,
/// quoted identifiers, comments, dollar-quoted bodies and `::` casts are left
/// alone. Existing `$n` placeholders pass through untouched.
///
/// Returns a borrowed `Cow` when there is nothing to rewrite.
#[must_use]
pub fn rewrite_named(sql: &str) -> PositionalSql<'_> {
    let bytes = sql.as_bytes();
    let mut out: Option<String> = None;
    let mut names: Vec<String> = Vec::new();
    let mut copied = 0;
    let mut state = State::Normal;
    let mut idx = 0;

    while idx < bytes.len() {
        let b = bytes[idx];
        match state {
            State::Normal => match b {
                b'\'' => state = State::SingleQuoted,
                b'"' => state = State::DoubleQuoted,
                b'-' if bytes.get(idx + 1) == Some(&b'-') => state = State::LineComment,
                b'/' if bytes.get(idx + 1) == Some(&b'*') => {
                    state = State::BlockComment(1);
                    idx += 1;
                }
                b'$' => {
                    if let Some((tag, end)) = dollar_quote_tag(bytes, idx) {
                        state = State::DollarQuoted(tag);
                        idx = end;
                    }
                }
                b'@' | b':' if is_placeholder_start(sql, idx) => {
                    let end = ident_end(sql, idx + 1);
                    let name = &sql[idx + 1..end];
                    let position = match names.iter().position(|n| n == name) {
                        Some(existing) => existing + 1,
                        None => {
                            names.push(name.to_owned());
                            names.len()
                        }
                    };
                    let buf = out.get_or_insert_with(|| String::with_capacity(sql.len()));
                    buf.push_str(&sql[copied..idx]);
                    buf.push('$');
                    buf.push_str(&position.to_string());
                    copied = end;
                    idx = end;
                    continue;
                }
                _ => {}
            },
            State::SingleQuoted => {
                if b == b'\'' {
                    if bytes.get(idx + 1) == Some(&b'\'') {
                        idx += 1;
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::DoubleQuoted => {
                if b == b'"' {
                    if bytes.get(idx + 1) == Some(&b'"') {
                        idx += 1;
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::LineComment => {
                if b == b'\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment(depth) => {
                if b == b'/' && bytes.get(idx + 1) == Some(&b'*') {
                    state = State::BlockComment(depth + 1);
                    idx += 1;
                } else if b == b'*' && bytes.get(idx + 1) == Some(&b'/') {
                    state = if depth == 1 {
                        State::Normal
                    } else {
                        State::BlockComment(depth - 1)
                    };
                    idx += 1;
                }
            }
            State::DollarQuoted(ref tag) => {
                if b == b'$' && closes_dollar_quote(bytes, idx, tag) {
                    idx += tag.len() + 1;
                    state = State::Normal;
                }
            }
        }
        idx += 1;
    }

    let sql = match out {
        Some(mut buf) => {
            buf.push_str(&sql[copied..]);
            Cow::Owned(buf)
        }
        None => Cow::Borrowed(sql),
    };
    PositionalSql { sql, names }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn ident_end(sql: &str, start: usize) -> usize {
    sql[start..]
        .char_indices()
        .find(|&(_, c)| !is_ident_char(c))
        .map_or(sql.len(), |(offset, _)| start + offset)
}

fn is_placeholder_start(sql: &str, idx: usize) -> bool {
    if !sql[idx + 1..]
        .chars()
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
    {
        return false;
    }
    // `a::text` casts, and `x@y`-style operators glued to an identifier
    !sql[..idx]
        .chars()
        .next_back()
        .is_some_and(|prev| prev == ':' || is_ident_char(prev))
}

/// `$tag$` or `$$` starting at `start`; returns the tag and the index of the closing `$`.
fn dollar_quote_tag(bytes: &[u8], start: usize) -> Option<(String, usize)> {
    let mut idx = start + 1;
    if bytes.get(idx).is_some_and(u8::is_ascii_digit) {
        return None;
    }
    while idx < bytes.len() && bytes[idx] != b'$' {
        let b = bytes[idx];
        if !(b.is_ascii_alphanumeric() || b == b'_') {
            return None;
        }
        idx += 1;
    }
    if idx < bytes.len() {
        let tag = String::from_utf8(bytes[start + 1..idx].to_vec()).ok()?;
        Some((tag, idx))
    } else {
        None
    }
}

fn closes_dollar_quote(bytes: &[u8], idx: usize, tag: &str) -> bool {
    let end = idx + 1 + tag.len();
    end < bytes.len() && &bytes[idx + 1..end] == tag.as_bytes() && bytes[end] == b'$'
}
