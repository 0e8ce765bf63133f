//! Byte-stream lexer (spec.md §4.1).
//!
//! A single forward pass over UTF-8 source bytes. Tracks a stack of
//! indentation widths and emits `Newline`/`Indent`/`Dedent` the way CPython's
//! tokenizer does, but only for the supported subset's needs: blank lines and
//! full-line comments are swallowed, and indent/dedent bookkeeping is
//! suspended while inside `()`/`[]`/`{}` (the bracket-depth counter below).

use ruff_text_size::{TextRange, TextSize};

use crate::{
    error::LexError,
    token::{Token, TokenKind},
};

pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(source).run()
}

struct Lexer<'a> {
    src: &'a [u8],
    pos: usize,
    /// True at the start of a logical line, before any non-whitespace byte
    /// has been seen. Indentation is only measured in this state.
    at_line_start: bool,
    /// Depth of unclosed `(`, `[`, `{`. Newlines and indentation are ignored
    /// while this is above zero, matching Python's implicit line joining.
    bracket_depth: u32,
    indents: Vec<usize>,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            src: source.as_bytes(),
            pos: 0,
            at_line_start: true,
            bracket_depth: 0,
            indents: vec![0],
            tokens: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Vec<Token>, LexError> {
        while self.pos < self.src.len() {
            if self.at_line_start && self.bracket_depth == 0 {
                if self.handle_line_start()? {
                    continue;
                }
            }
            self.lex_one()?;
        }
        self.finish()
    }

    fn finish(mut self) -> Result<Vec<Token>, LexError> {
        // Close out any trailing logical line and dedent back to column 0.
        if !matches!(self.tokens.last().map(|t| &t.kind), Some(TokenKind::Newline) | None) {
            self.push(TokenKind::Newline, self.pos, self.pos);
        }
        while self.indents.len() > 1 {
            self.indents.pop();
            self.push(TokenKind::Dedent, self.pos, self.pos);
        }
        self.push(TokenKind::Eof, self.pos, self.pos);
        Ok(self.tokens)
    }

    /// Measures indentation at the start of a logical line. Returns `Ok(true)`
    /// if the caller should loop again (line was blank/comment, or indent
    /// tokens were emitted and the line body starts at `self.pos`).
    fn handle_line_start(&mut self) -> Result<bool, LexError> {
        let line_start = self.pos;
        let mut width = 0usize;
        while let Some(&b) = self.src.get(self.pos) {
            match b {
                b' ' => {
                    width += 1;
                    self.pos += 1;
                }
                b'\t' => {
                    width += 8 - (width % 8);
                    self.pos += 1;
                }
                _ => break,
            }
        }
        match self.src.get(self.pos) {
            None => return Ok(true),
            Some(b'\n') => {
                self.pos += 1;
                return Ok(true);
            }
            Some(b'\r') => {
                self.pos += 1;
                if self.src.get(self.pos) == Some(&b'\n') {
                    self.pos += 1;
                }
                return Ok(true);
            }
            Some(b'#') => {
                self.skip_to_eol();
                return Ok(true);
            }
            _ => {}
        }

        self.at_line_start = false;
        let current = *self.indents.last().expect("indent stack always non-empty");
        if width > current {
            self.indents.push(width);
            self.push(TokenKind::Indent, line_start, self.pos);
        } else if width < current {
            loop {
                let top = *self.indents.last().expect("indent stack always non-empty");
                if width == top {
                    break;
                }
                if width > top || self.indents.len() == 1 {
                    return Err(LexError::BadIndentation {
                        span: self.span(line_start, self.pos),
                    });
                }
                self.indents.pop();
                self.push(TokenKind::Dedent, line_start, self.pos);
            }
        }
        Ok(false)
    }

    fn skip_to_eol(&mut self) {
        while let Some(&b) = self.src.get(self.pos) {
            if b == b'\n' {
                break;
            }
            self.pos += 1;
        }
    }

    fn lex_one(&mut self) -> Result<(), LexError> {
        let Some(&b) = self.src.get(self.pos) else { return Ok(()) };
        match b {
            b' ' | b'\t' => {
                self.pos += 1;
                Ok(())
            }
            b'\\' if self.src.get(self.pos + 1) == Some(&b'\n') => {
                // Explicit line continuation: swallow both bytes, no NEWLINE.
                self.pos += 2;
                Ok(())
            }
            b'\r' | b'\n' => self.lex_newline(),
            b'#' => {
                self.skip_to_eol();
                Ok(())
            }
            b'"' | b'\'' => self.lex_string(b),
            b'0'..=b'9' => self.lex_number(),
            b'_' | b'a'..=b'z' | b'A'..=b'Z' => self.lex_ident_or_keyword(),
            _ if b >= 0x80 => self.lex_unicode_ident_or_error(),
            _ => self.lex_operator(),
        }
    }

    fn lex_newline(&mut self) -> Result<(), LexError> {
        let start = self.pos;
        self.pos += 1;
        if self.src.get(start) == Some(&b'\r') && self.src.get(self.pos) == Some(&b'\n') {
            self.pos += 1;
        }
        if self.bracket_depth == 0 {
            self.push(TokenKind::Newline, start, self.pos);
            self.at_line_start = true;
        }
        Ok(())
    }

    fn lex_string(&mut self, quote: u8) -> Result<(), LexError> {
        let start = self.pos;
        let triple = self.src.get(self.pos + 1) == Some(&quote) && self.src.get(self.pos + 2) == Some(&quote);
        self.pos += if triple { 3 } else { 1 };
        let mut value = String::new();
        loop {
            match self.src.get(self.pos) {
                None => {
                    return Err(LexError::UnterminatedString {
                        span: self.span(start, self.pos),
                    });
                }
                Some(&b) if b == quote => {
                    if triple {
                        if self.src.get(self.pos + 1) == Some(&quote) && self.src.get(self.pos + 2) == Some(&quote) {
                            self.pos += 3;
                            break;
                        }
                        value.push(quote as char);
                        self.pos += 1;
                    } else {
                        self.pos += 1;
                        break;
                    }
                }
                Some(b'\n') if !triple => {
                    return Err(LexError::UnterminatedString {
                        span: self.span(start, self.pos),
                    });
                }
                Some(b'\\') => {
                    self.pos += 1;
                    match self.src.get(self.pos) {
                        Some(b'n') => value.push('\n'),
                        Some(b't') => value.push('\t'),
                        Some(b'\\') => value.push('\\'),
                        Some(b'"') => value.push('"'),
                        Some(b'\'') => value.push('\''),
                        Some(b'0') => value.push('\0'),
                        Some(b'\n') => {}
                        Some(b'x') => {
                            let hi = self.src.get(self.pos + 1).copied();
                            let lo = self.src.get(self.pos + 2).copied();
                            let byte = hex_byte(hi, lo).ok_or_else(|| LexError::UnexpectedCharacter {
                                found: 'x',
                                span: self.span(self.pos, self.pos + 1),
                            })?;
                            value.push(byte as char);
                            self.pos += 2;
                        }
                        Some(&other) => value.push(other as char),
                        None => {
                            return Err(LexError::UnterminatedString {
                                span: self.span(start, self.pos),
                            });
                        }
                    }
                    self.pos += 1;
                }
                Some(&b) => {
                    // Copy raw UTF-8 bytes through; `value` stays valid UTF-8
                    // because we only ever split on ASCII delimiters above.
                    let len = utf8_len(b);
                    let end = (self.pos + len).min(self.src.len());
                    value.push_str(std::str::from_utf8(&self.src[self.pos..end]).unwrap_or("\u{FFFD}"));
                    self.pos = end;
                }
            }
        }
        self.push(TokenKind::Str(value.into_boxed_str()), start, self.pos);
        Ok(())
    }

    fn lex_number(&mut self) -> Result<(), LexError> {
        let start = self.pos;
        if self.src.get(self.pos) == Some(&b'0')
            && matches!(self.src.get(self.pos + 1), Some(b'x' | b'X' | b'o' | b'O' | b'b' | b'B'))
        {
            let radix = match self.src[self.pos + 1] {
                b'x' | b'X' => 16,
                b'o' | b'O' => 8,
                _ => 2,
            };
            self.pos += 2;
            let digits_start = self.pos;
            while matches!(self.src.get(self.pos), Some(b) if (*b as char).is_digit(radix) || *b == b'_') {
                self.pos += 1;
            }
            let text: String = std::str::from_utf8(&self.src[digits_start..self.pos])
                .unwrap_or_default()
                .chars()
                .filter(|c| *c != '_')
                .collect();
            let value = i64::from_str_radix(&text, radix).unwrap_or(0);
            self.push(TokenKind::Int(value), start, self.pos);
            return Ok(());
        }

        while matches!(self.src.get(self.pos), Some(b'0'..=b'9' | b'_')) {
            self.pos += 1;
        }
        let mut is_float = false;
        if self.src.get(self.pos) == Some(&b'.') && matches!(self.src.get(self.pos + 1), Some(b'0'..=b'9')) {
            is_float = true;
            self.pos += 1;
            while matches!(self.src.get(self.pos), Some(b'0'..=b'9' | b'_')) {
                self.pos += 1;
            }
        }
        if matches!(self.src.get(self.pos), Some(b'e' | b'E')) {
            let mut lookahead = self.pos + 1;
            if matches!(self.src.get(lookahead), Some(b'+' | b'-')) {
                lookahead += 1;
            }
            if matches!(self.src.get(lookahead), Some(b'0'..=b'9')) {
                is_float = true;
                self.pos = lookahead;
                while matches!(self.src.get(self.pos), Some(b'0'..=b'9' | b'_')) {
                    self.pos += 1;
                }
            }
        }
        let text: String = std::str::from_utf8(&self.src[start..self.pos])
            .unwrap_or_default()
            .chars()
            .filter(|c| *c != '_')
            .collect();
        if is_float {
            self.push(TokenKind::Float(text.parse().unwrap_or(0.0)), start, self.pos);
        } else {
            self.push(TokenKind::Int(text.parse().unwrap_or(0)), start, self.pos);
        }
        Ok(())
    }

    fn lex_ident_or_keyword(&mut self) -> Result<(), LexError> {
        let start = self.pos;
        while matches!(self.src.get(self.pos), Some(b'_' | b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9')) {
            self.pos += 1;
        }
        let text = std::str::from_utf8(&self.src[start..self.pos]).unwrap_or_default();
        let kind = match text {
            "def" => TokenKind::Def,
            "class" => TokenKind::Class,
            "if" => TokenKind::If,
            "elif" => TokenKind::Elif,
            "else" => TokenKind::Else,
            "for" => TokenKind::For,
            "while" => TokenKind::While,
            "return" => TokenKind::Return,
            "import" => TokenKind::Import,
            "from" => TokenKind::From,
            "as" => TokenKind::As,
            "async" => TokenKind::Async,
            "True" => TokenKind::True,
            "False" => TokenKind::False,
            "None" => TokenKind::None,
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "not" => TokenKind::Not,
            "in" => TokenKind::In,
            "is" => TokenKind::Is,
            "pass" => TokenKind::Pass,
            _ => TokenKind::Ident(text.into()),
        };
        self.push(kind, start, self.pos);
        Ok(())
    }

    /// Any non-ASCII leading byte is rejected: the supported subset only
    /// needs ASCII identifiers, and accepting raw UTF-8 here would require
    /// the same Unicode-identifier tables ruff vendors (out of scope, see
    /// `DESIGN.md`).
    fn lex_unicode_ident_or_error(&mut self) -> Result<(), LexError> {
        let start = self.pos;
        let b = self.src[self.pos];
        let len = utf8_len(b);
        let end = (self.pos + len).min(self.src.len());
        let found = std::str::from_utf8(&self.src[start..end])
            .ok()
            .and_then(|s| s.chars().next())
            .unwrap_or('\u{FFFD}');
        Err(LexError::UnexpectedCharacter {
            found,
            span: self.span(start, end),
        })
    }

    fn lex_operator(&mut self) -> Result<(), LexError> {
        let start = self.pos;
        macro_rules! two {
            ($a:expr, $b:expr, $kind:expr) => {
                if self.src.get(self.pos) == Some(&$a) && self.src.get(self.pos + 1) == Some(&$b) {
                    self.pos += 2;
                    self.push($kind, start, self.pos);
                    return Ok(());
                }
            };
        }
        macro_rules! three {
            ($a:expr, $b:expr, $c:expr, $kind:expr) => {
                if self.src.get(self.pos) == Some(&$a)
                    && self.src.get(self.pos + 1) == Some(&$b)
                    && self.src.get(self.pos + 2) == Some(&$c)
                {
                    self.pos += 3;
                    self.push($kind, start, self.pos);
                    return Ok(());
                }
            };
        }
        three!(b'*', b'*', b'=', TokenKind::DoubleStarEq);
        three!(b'/', b'/', b'=', TokenKind::DoubleSlashEq);
        two!(b'*', b'*', TokenKind::DoubleStar);
        two!(b'/', b'/', TokenKind::DoubleSlash);
        two!(b'<', b'=', TokenKind::LtEq);
        two!(b'>', b'=', TokenKind::GtEq);
        two!(b'=', b'=', TokenKind::EqEq);
        two!(b'!', b'=', TokenKind::NotEq);
        two!(b'<', b'<', TokenKind::LShift);
        two!(b'>', b'>', TokenKind::RShift);
        two!(b'+', b'=', TokenKind::PlusEq);
        two!(b'-', b'=', TokenKind::MinusEq);
        two!(b'*', b'=', TokenKind::StarEq);
        two!(b'/', b'=', TokenKind::SlashEq);
        two!(b'%', b'=', TokenKind::PercentEq);
        two!(b'&', b'=', TokenKind::AmpEq);
        two!(b'|', b'=', TokenKind::PipeEq);
        two!(b'^', b'=', TokenKind::CaretEq);
        two!(b'-', b'>', TokenKind::Arrow);

        let (kind, open_or_close) = match self.src[self.pos] {
            b'+' => (TokenKind::Plus, 0),
            b'-' => (TokenKind::Minus, 0),
            b'*' => (TokenKind::Star, 0),
            b'/' => (TokenKind::Slash, 0),
            b'%' => (TokenKind::Percent, 0),
            b'&' => (TokenKind::Amp, 0),
            b'|' => (TokenKind::Pipe, 0),
            b'^' => (TokenKind::Caret, 0),
            b'~' => (TokenKind::Tilde, 0),
            b'<' => (TokenKind::Lt, 0),
            b'>' => (TokenKind::Gt, 0),
            b'=' => (TokenKind::Eq, 0),
            b':' => (TokenKind::Colon, 0),
            b',' => (TokenKind::Comma, 0),
            b'.' => (TokenKind::Dot, 0),
            b'(' => (TokenKind::LParen, 1),
            b')' => (TokenKind::RParen, -1),
            b'[' => (TokenKind::LBracket, 1),
            b']' => (TokenKind::RBracket, -1),
            b'{' => (TokenKind::LBrace, 1),
            b'}' => (TokenKind::RBrace, -1),
            other => {
                let found = other as char;
                self.pos += 1;
                return Err(LexError::UnexpectedCharacter {
                    found,
                    span: self.span(start, self.pos),
                });
            }
        };
        self.pos += 1;
        if open_or_close > 0 {
            self.bracket_depth += 1;
        } else if open_or_close < 0 {
            self.bracket_depth = self.bracket_depth.saturating_sub(1);
        }
        self.push(kind, start, self.pos);
        Ok(())
    }

    fn span(&self, start: usize, end: usize) -> TextRange {
        TextRange::new(TextSize::try_from(start).unwrap_or_default(), TextSize::try_from(end).unwrap_or_default())
    }

    fn push(&mut self, kind: TokenKind, start: usize, end: usize) {
        let span = self.span(start, end);
        self.tokens.push(Token::new(kind, span));
    }
}

fn utf8_len(first_byte: u8) -> usize {
    if first_byte & 0x80 == 0 {
        1
    } else if first_byte & 0xE0 == 0xC0 {
        2
    } else if first_byte & 0xF0 == 0xE0 {
        3
    } else {
        4
    }
}

fn hex_byte(hi: Option<u8>, lo: Option<u8>) -> Option<u8> {
    let hi = (hi? as char).to_digit(16)?;
    let lo = (lo? as char).to_digit(16)?;
    Some(((hi << 4) | lo) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        tokenize(src).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn indents_and_dedents_balance() {
        let src = "if x:\n    y = 1\n    z = 2\nw = 3\n";
        let toks = kinds(src);
        let indent_count = toks.iter().filter(|k| matches!(k, TokenKind::Indent)).count();
        let dedent_count = toks.iter().filter(|k| matches!(k, TokenKind::Dedent)).count();
        assert_eq!(indent_count, dedent_count);
        assert_eq!(indent_count, 1);
    }

    #[test]
    fn blank_lines_and_comments_are_swallowed() {
        let src = "x = 1\n\n# comment\n\ny = 2\n";
        let toks = kinds(src);
        let newlines = toks.iter().filter(|k| matches!(k, TokenKind::Newline)).count();
        assert_eq!(newlines, 2);
    }

    #[test]
    fn mismatched_dedent_is_an_error() {
        let src = "if x:\n    y = 1\n  z = 2\n";
        assert!(matches!(tokenize(src), Err(LexError::BadIndentation { .. })));
    }

    #[test]
    fn maximal_munch_operators() {
        let toks = kinds("a //= b ** c\n");
        assert!(toks.contains(&TokenKind::DoubleSlashEq));
        assert!(toks.contains(&TokenKind::DoubleStar));
    }

    #[test]
    fn string_escapes() {
        let toks = kinds("\"a\\nb\"\n");
        assert_eq!(toks[0], TokenKind::Str("a\nb".into()));
    }

    #[test]
    fn bracket_depth_suppresses_newlines() {
        let toks = kinds("x = [\n    1,\n    2,\n]\n");
        let newlines = toks.iter().filter(|k| matches!(k, TokenKind::Newline)).count();
        assert_eq!(newlines, 1);
    }
}
