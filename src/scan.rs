//! Cursor and bracket-matching helpers shared by the key and rule parsers.

/// Scanner state: tracks position in the input string.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Cursor<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(input: &'a str) -> Self {
        Cursor { input, pos: 0 }
    }

    // ── Helpers ──────────────────────────────────────────────────────

    pub(crate) fn input(&self) -> &'a str {
        self.input
    }

    pub(crate) fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    pub(crate) fn is_at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    pub(crate) fn peek_char(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    pub(crate) fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.input.len());
    }

    pub(crate) fn starts_with(&self, s: &str) -> bool {
        self.remaining().starts_with(s)
    }

    pub(crate) fn eat_char(&mut self, ch: char) -> bool {
        if self.peek_char() == Some(ch) {
            self.advance(ch.len_utf8());
            true
        } else {
            false
        }
    }

    pub(crate) fn eat_str(&mut self, s: &str) -> bool {
        if self.starts_with(s) {
            self.advance(s.len());
            true
        } else {
            false
        }
    }

    pub(crate) fn skip_ws(&mut self) {
        while let Some(ch) = self.peek_char() {
            if !ch.is_whitespace() {
                break;
            }
            self.advance(ch.len_utf8());
        }
    }

    /// Consume a balanced `open ... close` group starting at the cursor and
    /// return it, delimiters included. `None` leaves the cursor untouched.
    pub(crate) fn take_group(&mut self, open: char, close: char) -> Option<&'a str> {
        let end = closing_index(self.remaining(), open, close)?;
        let group = &self.remaining()[..=end];
        self.advance(end + close.len_utf8());
        Some(group)
    }

    /// Consume everything up to (not including) the first occurrence of
    /// `pattern` that is outside double quotes and at nesting depth zero.
    pub(crate) fn take_until_top_level(&mut self, pattern: &str) -> Option<&'a str> {
        let offset = find_top_level(self.remaining(), pattern)?;
        let taken = &self.remaining()[..offset];
        self.advance(offset);
        Some(taken)
    }
}

// ── Free helpers ────────────────────────────────────────────────────

/// Byte index of the `close` matching the `open` that `s` starts with.
/// Characters inside double quotes are ignored.
pub(crate) fn closing_index(s: &str, open: char, close: char) -> Option<usize> {
    if !s.starts_with(open) {
        return None;
    }
    let mut depth = 0usize;
    let mut in_quotes = false;
    for (i, ch) in s.char_indices() {
        if ch == '"' {
            in_quotes = !in_quotes;
        } else if in_quotes {
            continue;
        } else if ch == open {
            depth += 1;
        } else if ch == close {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

/// Byte offset of the first `pattern` outside quotes, parentheses and
/// brackets.
pub(crate) fn find_top_level(s: &str, pattern: &str) -> Option<usize> {
    let mut depth = 0i32;
    let mut in_quotes = false;
    for (i, ch) in s.char_indices() {
        if in_quotes {
            if ch == '"' {
                in_quotes = false;
            }
            continue;
        }
        if depth == 0 && s[i..].starts_with(pattern) {
            return Some(i);
        }
        match ch {
            '"' => in_quotes = true,
            '(' | '[' => depth += 1,
            ')' | ']' => depth -= 1,
            _ => {}
        }
    }
    None
}

/// Trim and strip `open`/`close` while they wrap the whole string.
/// `((a))` gives `a`; `(a)(b)` is left alone.
pub(crate) fn unwrap_group(s: &str, open: char, close: char) -> &str {
    let mut s = s.trim();
    while let Some(end) = closing_index(s, open, close) {
        if end + close.len_utf8() != s.len() {
            break;
        }
        s = s[open.len_utf8()..end].trim();
    }
    s
}

/// Trim, then strip one pair of surrounding double quotes. The inside is
/// returned as written, spaces included.
pub(crate) fn unquote(s: &str) -> &str {
    let s = s.trim();
    if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

/// Split call arguments on top-level commas. Commas inside quotes,
/// parentheses or brackets do not split. An empty list gives no arguments.
pub(crate) fn split_args(s: &str) -> Vec<&str> {
    let s = s.trim();
    if s.is_empty() {
        return Vec::new();
    }
    let mut args = Vec::new();
    let mut rest = s;
    while let Some(offset) = find_top_level(rest, ",") {
        args.push(rest[..offset].trim());
        rest = &rest[offset + 1..];
    }
    args.push(rest.trim());
    args
}
