//! Tokenizer for line-mode MARC (NORMARC and similar dialects).
//!
//! Line-mode records look like this:
//!
//! ```text
//! *000     c
//! *0010010463
//! *24510$aI begynnelsen skapte Gud$bdikt og salmer
//! ^
//! ```
//!
//! `*` starts a field line, `$` starts a subfield and a `^` at the start of a
//! line ends the record. A `^` anywhere else is ordinary data.
//!
//! [`LineLexer`] reads one record chunk at a time (everything up to the next
//! terminating `^`) and hands out [`Token`]s from it. Lexical errors are
//! reported as [`Token::Error`]; the lexer then skips the rest of the offending
//! line and carries on.

use crate::error::Result;
use std::io::BufRead;

/// A lexical token of the line-mode format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Three-digit tag starting with `00`
    CtrlTag(String),
    /// Three-digit tag followed by two indicator characters
    Tag(String),
    /// A single subfield code character
    SubFieldCode(String),
    /// Control field value or subfield value, possibly empty
    Value(String),
    /// Record terminator `^`
    Terminator,
    /// No more input
    EndOfStream,
    /// Malformed input
    Error {
        /// What went wrong
        message: String,
        /// Offending text
        text: String,
        /// 1-based line of the offending text
        line: usize,
        /// 1-based column of the offending text
        column: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    AwaitingToken,
    InControlField,
    InDataField,
    InSubfield,
}

/// Streaming tokenizer over a buffered line-mode source.
#[derive(Debug)]
pub struct LineLexer<R> {
    reader: R,
    chunk: Vec<u8>,
    pos: usize,
    state: State,
    line: usize,
    column: usize,
    token_line: usize,
    token_column: usize,
}

impl<R: BufRead> LineLexer<R> {
    /// Create a lexer reading from `reader`.
    pub fn new(reader: R) -> Self {
        LineLexer {
            reader,
            chunk: Vec::new(),
            pos: 0,
            state: State::AwaitingToken,
            line: 1,
            column: 1,
            token_line: 1,
            token_column: 1,
        }
    }

    /// Line and column (1-based) where the last returned token starts.
    #[must_use]
    pub fn position(&self) -> (usize, usize) {
        (self.token_line, self.token_column)
    }

    /// Drop whatever is left of the current record chunk.
    pub fn skip_record(&mut self) {
        self.advance(self.chunk.len());
        self.state = State::AwaitingToken;
    }

    /// Produce the next token.
    ///
    /// # Errors
    ///
    /// Only I/O failures are returned as `Err`; malformed input comes back as
    /// [`Token::Error`].
    pub fn next_token(&mut self) -> Result<Token> {
        loop {
            self.token_line = self.line;
            self.token_column = self.column;

            let line_end = self.line_end();
            let content_end = self.trim_cr(line_end);

            let token = match self.state {
                State::AwaitingToken => match self.chunk.get(self.pos) {
                    None => {
                        if self.fill_chunk()? {
                            continue;
                        }
                        Token::EndOfStream
                    }
                    Some(b'\n' | b'\r') => {
                        self.advance(self.pos + 1);
                        continue;
                    }
                    Some(b'^') => {
                        self.advance(self.pos + 1);
                        Token::Terminator
                    }
                    Some(b'*') => self.lex_tag(content_end, line_end),
                    Some(_) => self.fail("expected '*' or '^' at start of line", line_end),
                },
                State::InControlField => {
                    self.state = State::AwaitingToken;
                    self.lex_text(content_end, line_end, Token::Value)
                }
                State::InDataField => {
                    if self.pos >= content_end {
                        self.advance(line_end);
                        self.state = State::AwaitingToken;
                        continue;
                    }
                    if self.chunk[self.pos] == b'$' {
                        self.lex_subfield_code(content_end, line_end)
                    } else {
                        self.fail("expected '$' before subfield", line_end)
                    }
                }
                State::InSubfield => {
                    self.state = State::InDataField;
                    let end = match memchr::memchr2(b'$', b'\n', &self.chunk[self.pos..]) {
                        Some(i) if self.chunk[self.pos + i] == b'$' => self.pos + i,
                        _ => content_end,
                    };
                    self.lex_text(end, line_end, Token::Value)
                }
            };
            return Ok(token);
        }
    }

    /// `*` followed by a three-digit tag, plus two indicators for data fields.
    fn lex_tag(&mut self, content_end: usize, line_end: usize) -> Token {
        let digits_start = self.pos + 1;
        let digits_end = digits_start + 3;
        if digits_end > content_end
            || !self.chunk[digits_start..digits_end]
                .iter()
                .all(u8::is_ascii_digit)
        {
            return self.fail("non-digit tag", line_end);
        }

        let mut text: String = self.chunk[digits_start..digits_end]
            .iter()
            .map(|&b| char::from(b))
            .collect();

        if text.starts_with("00") {
            self.advance(digits_end);
            self.state = State::InControlField;
            return Token::CtrlTag(text);
        }

        let mut cursor = digits_end;
        for _ in 0..2 {
            if cursor >= content_end {
                text.push(' ');
                continue;
            }
            match first_char(&self.chunk[cursor..content_end]) {
                Some(c) => {
                    text.push(c);
                    cursor += c.len_utf8();
                }
                None => return self.fail("invalid UTF-8 in indicators", line_end),
            }
        }
        self.advance(cursor);
        self.state = State::InDataField;
        Token::Tag(text)
    }

    /// `$` followed by one code character.
    fn lex_subfield_code(&mut self, content_end: usize, line_end: usize) -> Token {
        let code_start = self.pos + 1;
        if code_start >= content_end {
            return self.fail("subfield code missing", line_end);
        }
        match first_char(&self.chunk[code_start..content_end]) {
            Some(code) => {
                self.advance(code_start + code.len_utf8());
                self.state = State::InSubfield;
                Token::SubFieldCode(code.to_string())
            }
            None => self.fail("invalid UTF-8 in subfield code", line_end),
        }
    }

    fn lex_text(&mut self, end: usize, line_end: usize, make: fn(String) -> Token) -> Token {
        match std::str::from_utf8(&self.chunk[self.pos..end]) {
            Ok(text) => {
                let token = make(text.to_owned());
                self.advance(end);
                token
            }
            Err(_) => self.fail("invalid UTF-8", line_end),
        }
    }

    /// Build an error token for the text from the current position to
    /// `line_end`, then skip past it.
    fn fail(&mut self, message: &str, line_end: usize) -> Token {
        let token = Token::Error {
            message: message.to_string(),
            text: String::from_utf8_lossy(&self.chunk[self.pos..line_end]).into_owned(),
            line: self.token_line,
            column: self.token_column,
        };
        self.advance(line_end);
        self.state = State::AwaitingToken;
        token
    }

    /// Read the next record chunk: up to and including a `^` that follows a
    /// line break, or to the end of the stream.
    fn fill_chunk(&mut self) -> Result<bool> {
        self.chunk.clear();
        self.pos = 0;
        loop {
            if self.reader.read_until(b'^', &mut self.chunk)? == 0 {
                break;
            }
            if self.chunk.last() != Some(&b'^') {
                break;
            }
            let caret = self.chunk.len() - 1;
            if caret == 0 || self.chunk[caret - 1] == b'\n' {
                break;
            }
            // Literal caret: the rest of its line cannot hold a terminator.
            if self.reader.read_until(b'\n', &mut self.chunk)? == 0 {
                break;
            }
        }
        Ok(!self.chunk.is_empty())
    }

    fn line_end(&self) -> usize {
        memchr::memchr(b'\n', &self.chunk[self.pos..]).map_or(self.chunk.len(), |i| self.pos + i)
    }

    fn trim_cr(&self, end: usize) -> usize {
        if end > self.pos && self.chunk[end - 1] == b'\r' {
            end - 1
        } else {
            end
        }
    }

    /// Move to `to`, keeping line and column in step.
    fn advance(&mut self, to: usize) {
        for &b in &self.chunk[self.pos..to] {
            if b == b'\n' {
                self.line += 1;
                self.column = 1;
            } else if b & 0xC0 != 0x80 {
                self.column += 1;
            }
        }
        self.pos = to;
    }
}

fn first_char(bytes: &[u8]) -> Option<char> {
    let prefix = &bytes[..bytes.len().min(4)];
    let valid = match std::str::from_utf8(prefix) {
        Ok(text) => text,
        Err(e) => std::str::from_utf8(&prefix[..e.valid_up_to()]).unwrap_or_default(),
    };
    valid.chars().next()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(input: &[u8]) -> Vec<Token> {
        let mut lexer = LineLexer::new(input);
        let mut tokens = Vec::new();
        for _ in 0..1000 {
            let token = lexer.next_token().unwrap();
            let done = token == Token::EndOfStream;
            tokens.push(token);
            if done {
                return tokens;
            }
        }
        panic!("lexer did not reach end of stream: {tokens:?}");
    }

    fn ctrl(tag: &str) -> Token {
        Token::CtrlTag(tag.to_string())
    }

    fn tag(text: &str) -> Token {
        Token::Tag(text.to_string())
    }

    fn code(c: &str) -> Token {
        Token::SubFieldCode(c.to_string())
    }

    fn value(v: &str) -> Token {
        Token::Value(v.to_string())
    }

    fn is_error(token: &Token) -> bool {
        matches!(token, Token::Error { .. })
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(lex(b""), [Token::EndOfStream]);
    }

    #[test]
    fn test_control_tags() {
        assert_eq!(lex(b"*009"), [ctrl("009"), value(""), Token::EndOfStream]);
        assert_eq!(
            lex(b"*000 01307nam0 2200349 I 450"),
            [ctrl("000"), value(" 01307nam0 2200349 I 450"), Token::EndOfStream]
        );
        assert_eq!(lex(b"*000xyz"), [ctrl("000"), value("xyz"), Token::EndOfStream]);
    }

    #[test]
    fn test_data_tags_and_indicators() {
        assert_eq!(lex(b"*100  "), [tag("100  "), Token::EndOfStream]);
        assert_eq!(lex(b"*100_1"), [tag("100_1"), Token::EndOfStream]);
        assert_eq!(lex(b"*24510\n*600  \n^"), [tag("24510"), tag("600  "), Token::Terminator, Token::EndOfStream]);
    }

    #[test]
    fn test_indicators_padded_at_line_end() {
        assert_eq!(lex(b"*245"), [tag("245  "), Token::EndOfStream]);
        assert_eq!(lex(b"*2451\n"), [tag("2451 "), Token::EndOfStream]);
    }

    #[test]
    fn test_subfields() {
        assert_eq!(
            lex("*1001_$aØrjasæter, Tordis$d1927-$jn.".as_bytes()),
            [
                tag("1001_"),
                code("a"),
                value("Ørjasæter, Tordis"),
                code("d"),
                value("1927-"),
                code("j"),
                value("n."),
                Token::EndOfStream,
            ]
        );
    }

    #[test]
    fn test_two_fields_and_terminator() {
        assert_eq!(
            lex(b"*100  $aa\n*101  $ab\n^"),
            [
                tag("100  "),
                code("a"),
                value("a"),
                tag("101  "),
                code("a"),
                value("b"),
                Token::Terminator,
                Token::EndOfStream,
            ]
        );
    }

    #[test]
    fn test_empty_subfield_value() {
        assert_eq!(
            lex(b"*500  $a$bx"),
            [tag("500  "), code("a"), value(""), code("b"), value("x"), Token::EndOfStream]
        );
    }

    #[test]
    fn test_caret_inside_value_is_literal() {
        assert_eq!(
            lex(b"*245  $aA^B\n^\n"),
            [tag("245  "), code("a"), value("A^B"), Token::Terminator, Token::EndOfStream]
        );
        assert_eq!(
            lex(b"*0011^2\n*0033\n^"),
            [ctrl("001"), value("1^2"), ctrl("003"), value("3"), Token::Terminator, Token::EndOfStream]
        );
    }

    #[test]
    fn test_caret_after_line_break_terminates() {
        assert_eq!(
            lex(b"*001a\n^\n*001b\n^\n"),
            [
                ctrl("001"),
                value("a"),
                Token::Terminator,
                ctrl("001"),
                value("b"),
                Token::Terminator,
                Token::EndOfStream,
            ]
        );
    }

    #[test]
    fn test_crlf_line_endings() {
        assert_eq!(
            lex(b"*001abc\r\n*245  $ax\r\n^\r\n"),
            [ctrl("001"), value("abc"), tag("245  "), code("a"), value("x"), Token::Terminator, Token::EndOfStream]
        );
    }

    #[test]
    fn test_non_digit_tag() {
        let tokens = lex(b"*1x0  $aa\n*001b");
        assert!(is_error(&tokens[0]));
        if let Token::Error { message, line, column, .. } = &tokens[0] {
            assert_eq!(message, "non-digit tag");
            assert_eq!((*line, *column), (1, 1));
        }
        // Lexing resumes on the next line
        assert_eq!(tokens[1..], [ctrl("001"), value("b"), Token::EndOfStream]);
    }

    #[test]
    fn test_short_tag() {
        let tokens = lex(b"*24\n");
        assert!(is_error(&tokens[0]));
    }

    #[test]
    fn test_text_outside_field() {
        let tokens = lex(b"abc");
        assert!(is_error(&tokens[0]));
        assert_eq!(tokens[1], Token::EndOfStream);
    }

    #[test]
    fn test_dollar_at_line_end() {
        let tokens = lex(b"*24510$\n^");
        assert_eq!(tokens[0], tag("24510"));
        assert!(is_error(&tokens[1]));
        assert_eq!(tokens[2], Token::Terminator);
    }

    #[test]
    fn test_text_before_first_subfield() {
        let tokens = lex(b"*24510 x$aa\n");
        assert_eq!(tokens[0], tag("24510"));
        assert!(is_error(&tokens[1]));
        assert_eq!(tokens[2], Token::EndOfStream);
    }

    #[test]
    fn test_invalid_utf8() {
        let tokens = lex(b"*245  $a\xff\xfe\n");
        assert_eq!(tokens[..2], [tag("245  "), code("a")]);
        assert!(is_error(&tokens[2]));
    }

    #[test]
    fn test_error_position_tracks_lines() {
        let tokens = lex("*001ø\n*24510$ab\n*1x0".as_bytes());
        let error = tokens.iter().find(|t| is_error(t)).unwrap();
        if let Token::Error { line, column, .. } = error {
            assert_eq!((*line, *column), (3, 1));
        }
    }

    #[test]
    fn test_position_of_tokens() {
        let mut lexer = LineLexer::new(&b"*001x\n*24510$ab"[..]);
        lexer.next_token().unwrap();
        assert_eq!(lexer.position(), (1, 1));
        lexer.next_token().unwrap();
        assert_eq!(lexer.position(), (1, 5));
        lexer.next_token().unwrap();
        assert_eq!(lexer.position(), (2, 1));
        assert_eq!(lexer.next_token().unwrap(), code("a"));
        assert_eq!(lexer.position(), (2, 7));
    }

    #[test]
    fn test_skip_record() {
        let mut lexer = LineLexer::new(&b"*001a\n*1x0\n*0012\n^\n*001b\n^"[..]);
        assert_eq!(lexer.next_token().unwrap(), ctrl("001"));
        lexer.skip_record();
        assert_eq!(lexer.next_token().unwrap(), ctrl("001"));
        assert_eq!(lexer.next_token().unwrap(), value("b"));
    }
}
