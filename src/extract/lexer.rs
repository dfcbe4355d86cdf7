//! A minimal JavaScript lexer.
//!
//! Extractors match import forms with regular expressions. Before they do,
//! the lexer blanks out comments and records where string, template and
//! regex literals are, so that `require('x')` inside a comment or a string
//! is never mistaken for an import. Blanking replaces every byte with a
//! space and keeps newlines, so offsets, lines and columns in the blanked
//! text are the same as in the source.

use std::ops::Range;

use regex::Regex;

/// A string-like literal in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Literal {
    /// Offset of the opening delimiter
    pub start: usize,
    /// Offset just past the closing delimiter (or where scanning stopped)
    pub end: usize,
    /// `'`, `"`, `` ` `` or `/`
    pub delimiter: u8,
    /// Whether the closing delimiter was found
    pub terminated: bool,
}

impl Literal {
    /// Text between the delimiters.
    pub fn contents<'s>(&self, source: &'s str) -> &'s str {
        let end = if self.terminated { self.end - 1 } else { self.end };
        source.get(self.start + 1..end).unwrap_or("")
    }

    pub fn is_string(&self) -> bool {
        matches!(self.delimiter, b'\'' | b'"' | b'`')
    }

    /// A string with no interpolation, i.e. a static specifier.
    pub fn is_static_string(&self, source: &str) -> bool {
        self.is_string()
            && self.terminated
            && !(self.delimiter == b'`' && self.contents(source).contains("${"))
    }
}

/// Source with comments blanked and literals located.
#[derive(Debug, Clone)]
pub struct Lexed {
    code: String,
    literals: Vec<Literal>,
}

impl Lexed {
    /// Lex `source`.
    pub fn new(source: &str) -> Self {
        Lexer::new(source).run()
    }

    /// The source with comments replaced by spaces.
    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn literals(&self) -> &[Literal] {
        &self.literals
    }

    /// Whether `offset` lies outside every literal.
    pub fn is_code(&self, offset: usize) -> bool {
        let idx = self.literals.partition_point(|l| l.start <= offset);
        match idx.checked_sub(1).map(|i| &self.literals[i]) {
            Some(lit) => offset >= lit.end,
            None => true,
        }
    }

    /// The literal whose opening delimiter is at `offset`.
    pub fn literal_at(&self, offset: usize) -> Option<&Literal> {
        self.literals
            .binary_search_by_key(&offset, |l| l.start)
            .ok()
            .map(|i| &self.literals[i])
    }

    /// Spans of capture group 1 of `re` that lie in code.
    ///
    /// `re` runs over the blanked text; matches inside literals are dropped.
    pub fn find_keywords<'s>(&'s self, re: &'s Regex) -> impl Iterator<Item = Range<usize>> + 's {
        re.captures_iter(&self.code)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.range())
            .filter(move |r| self.is_code(r.start))
    }

    /// Byte of the blanked text at `offset`.
    pub fn byte_at(&self, offset: usize) -> Option<u8> {
        self.code.as_bytes().get(offset).copied()
    }

    /// The identifier starting at `offset`, if any.
    pub fn word_at(&self, offset: usize) -> Option<&str> {
        let bytes = self.code.as_bytes();
        let mut end = offset;
        while end < bytes.len() && is_ident_byte(bytes[end]) {
            end += 1;
        }
        (end > offset).then(|| &self.code[offset..end])
    }
}

/// 1-based line and column of byte `offset` in `source`.
pub fn line_col(source: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(source.len());
    let before = source.get(..offset).unwrap_or(source);
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    let column = before[line_start..].chars().count() + 1;
    (line, column)
}

/// Offset of the first non-whitespace byte at or after `offset`.
pub fn skip_whitespace(code: &str, offset: usize) -> usize {
    let bytes = code.as_bytes();
    let mut i = offset;
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

struct Lexer<'a> {
    src: &'a [u8],
    out: Vec<u8>,
    literals: Vec<Literal>,
    pos: usize,
    /// Last significant byte emitted as code, for regex detection
    prev: Option<u8>,
    /// Whether the last token was a word that allows a regex to follow
    prev_keyword: bool,
}

const REGEX_KEYWORDS: &[&str] = &["return", "typeof", "case", "do", "else", "in", "of", "void"];

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Lexer {
            src: source.as_bytes(),
            out: source.as_bytes().to_vec(),
            literals: Vec::new(),
            pos: 0,
            prev: None,
            prev_keyword: false,
        }
    }

    fn run(mut self) -> Lexed {
        while self.pos < self.src.len() {
            let b = self.src[self.pos];
            let next = self.src.get(self.pos + 1).copied();
            match (b, next) {
                (b'/', Some(b'/')) => self.line_comment(),
                (b'/', Some(b'*')) => self.block_comment(),
                (b'\'', _) | (b'"', _) => self.quoted(b),
                (b'`', _) => self.template(),
                (b'/', _) if self.regex_allowed() => self.regex(),
                _ => {
                    if !b.is_ascii_whitespace() {
                        self.track_token(b);
                    }
                    self.pos += 1;
                }
            }
        }

        Lexed {
            code: String::from_utf8_lossy(&self.out).into_owned(),
            literals: self.literals,
        }
    }

    fn track_token(&mut self, b: u8) {
        if is_ident_byte(b) {
            // Only the end of a word decides whether it was a keyword.
            let at_word_end = !self.src.get(self.pos + 1).copied().is_some_and(is_ident_byte);
            if at_word_end {
                let start = self.src[..=self.pos]
                    .iter()
                    .rposition(|c| !is_ident_byte(*c))
                    .map_or(0, |i| i + 1);
                let word = std::str::from_utf8(&self.src[start..=self.pos]).unwrap_or("");
                self.prev_keyword = REGEX_KEYWORDS.contains(&word);
            }
        } else {
            self.prev_keyword = false;
        }
        self.prev = Some(b);
    }

    fn regex_allowed(&self) -> bool {
        match self.prev {
            None => true,
            Some(b')') | Some(b']') | Some(b'}') => false,
            Some(c) if is_ident_byte(c) => self.prev_keyword,
            Some(_) => true,
        }
    }

    fn blank(&mut self, from: usize, to: usize) {
        for i in from..to {
            if self.out[i] != b'\n' {
                self.out[i] = b' ';
            }
        }
    }

    fn line_comment(&mut self) {
        let start = self.pos;
        while self.pos < self.src.len() && self.src[self.pos] != b'\n' {
            self.pos += 1;
        }
        self.blank(start, self.pos);
    }

    fn block_comment(&mut self) {
        let start = self.pos;
        self.pos += 2;
        while self.pos < self.src.len() {
            if self.src[self.pos] == b'*' && self.src.get(self.pos + 1) == Some(&b'/') {
                self.pos += 2;
                self.blank(start, self.pos);
                return;
            }
            self.pos += 1;
        }
        self.blank(start, self.pos);
    }

    fn quoted(&mut self, quote: u8) {
        let start = self.pos;
        self.pos += 1;
        let mut terminated = false;
        while self.pos < self.src.len() {
            match self.src[self.pos] {
                b'\\' => self.pos += 2,
                b'\n' => break,
                c if c == quote => {
                    self.pos += 1;
                    terminated = true;
                    break;
                }
                _ => self.pos += 1,
            }
        }
        self.finish_literal(start, quote, terminated);
    }

    fn template(&mut self) {
        let start = self.pos;
        self.pos += 1;
        let mut terminated = false;
        while self.pos < self.src.len() {
            match self.src[self.pos] {
                b'\\' => self.pos += 2,
                b'`' => {
                    self.pos += 1;
                    terminated = true;
                    break;
                }
                b'$' if self.src.get(self.pos + 1) == Some(&b'{') => {
                    self.pos += 2;
                    let mut depth = 1usize;
                    while self.pos < self.src.len() && depth > 0 {
                        match self.src[self.pos] {
                            b'{' => depth += 1,
                            b'}' => depth -= 1,
                            _ => {}
                        }
                        self.pos += 1;
                    }
                }
                _ => self.pos += 1,
            }
        }
        self.finish_literal(start, b'`', terminated);
    }

    fn regex(&mut self) {
        let start = self.pos;
        self.pos += 1;
        let mut in_class = false;
        let mut terminated = false;
        while self.pos < self.src.len() {
            match self.src[self.pos] {
                b'\\' => self.pos += 2,
                b'\n' => break,
                b'[' => {
                    in_class = true;
                    self.pos += 1;
                }
                b']' => {
                    in_class = false;
                    self.pos += 1;
                }
                b'/' if !in_class => {
                    self.pos += 1;
                    terminated = true;
                    break;
                }
                _ => self.pos += 1,
            }
        }
        self.finish_literal(start, b'/', terminated);
    }

    fn finish_literal(&mut self, start: usize, delimiter: u8, terminated: bool) {
        self.pos = self.pos.min(self.src.len());
        self.literals.push(Literal {
            start,
            end: self.pos,
            delimiter,
            terminated,
        });
        // A literal is an operand: a following `/` is division.
        self.prev = Some(b'"');
        self.prev_keyword = false;
    }
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}
