//! Context-sensitive lexer.
//!
//! Tokenization runs a fixed chain of recognizers over the cleaned
//! source. Keyword tagging depends on the previous one or two emitted
//! tokens: two-word keywords are folded into single tags (`End Sub`
//! becomes [`TokenKind::SubEnd`]), a `.` at statement start injects an
//! implicit receiver, and a skipped argument slot injects
//! [`TokenKind::ArgSkip`]. Unrecognized input is a hard error rather
//! than a pass-through.

use crate::error::CompileError;
use crate::patterns::{
    clean, operator_kind, IDENTIFIER, KEYWORDS, NEWLINE, NUMBER, OPERATOR, PROC_AHEAD,
    SHORTHAND_TYPES, STRING, WHITESPACE,
};
use crate::span::Span;
use crate::token::{Token, TokenKind};

/// Result of tokenizing a source chunk.
#[derive(Debug, Clone)]
pub struct LexOutput {
    pub tokens: Vec<Token>,
    /// Identifier names referenced anywhere in the source, in first-use
    /// order. Used downstream to keep generated temporaries fresh.
    pub referenced: Vec<String>,
}

/// Tokenize `source`, producing the token stream plus the referenced
/// identifier list. The stream always ends with an [`TokenKind::Eof`]
/// token.
pub fn tokenize(source: &str) -> Result<LexOutput, CompileError> {
    let mut lexer = Lexer::new(source);
    lexer.run()?;
    Ok(LexOutput { tokens: lexer.tokens, referenced: lexer.referenced })
}

struct Lexer {
    source: String,
    offset: usize,
    tokens: Vec<Token>,
    referenced: Vec<String>,
    /// Set when a `_` continuation marker was consumed and the next
    /// newline must not produce a terminator.
    continuation: bool,
}

impl Lexer {
    fn new(source: &str) -> Self {
        Self {
            source: clean(source),
            offset: 0,
            tokens: Vec::new(),
            referenced: Vec::new(),
            continuation: false,
        }
    }

    fn run(&mut self) -> Result<(), CompileError> {
        while self.offset < self.source.len() {
            let consumed = self
                .identifier_token()
                .or_else(|| self.newline_token())
                .or_else(|| self.whitespace_token())
                .or_else(|| self.string_token())
                .or_else(|| self.number_token())
                .or_else(|| self.literal_token());

            match consumed {
                Some(n) if n > 0 => self.offset += n,
                _ => {
                    let span = Span::new(self.offset as u32, self.offset as u32 + 1);
                    return Err(CompileError::Lex {
                        message: format!(
                            "unexpected character {:?}",
                            self.chunk().chars().next().unwrap_or('\0')
                        ),
                        span,
                    });
                }
            }
        }
        let end = self.source.len() as u32;
        self.tokens.push(Token::new(TokenKind::Eof, "", Span::new(end, end)));
        Ok(())
    }

    fn chunk(&self) -> &str {
        &self.source[self.offset..]
    }

    fn prev_kind(&self) -> Option<TokenKind> {
        self.tokens.last().map(|t| t.kind)
    }

    fn prev_prev_kind(&self) -> Option<TokenKind> {
        let n = self.tokens.len();
        if n >= 2 {
            Some(self.tokens[n - 2].kind)
        } else {
            None
        }
    }

    fn push(&mut self, kind: TokenKind, text: impl Into<String>, span: Span) {
        self.continuation = false;
        self.tokens.push(Token::new(kind, text, span));
    }

    fn span_here(&self, len: usize) -> Span {
        Span::new(self.offset as u32, (self.offset + len) as u32)
    }

    fn record_reference(&mut self, name: &str) {
        if !self.referenced.iter().any(|r| r == name) {
            self.referenced.push(name.to_string());
        }
    }

    fn identifier_token(&mut self) -> Option<usize> {
        // Own the matched text up front; the recognizers below mutate
        // `self` while emitting.
        let caps = IDENTIFIER.captures(self.chunk())?;
        let word = caps.get(1)?.as_str().to_string();
        let suffix = caps.get(2).map(|m| m.as_str().to_string());
        let id = word.to_ascii_lowercase();
        let span = self.span_here(word.len());

        if let Some(suffix) = suffix {
            let total = word.len() + suffix.len();
            let mark = Span::new(span.end, span.end + suffix.len() as u32);
            self.record_reference(&word);
            self.push(TokenKind::Identifier, word, span);
            if suffix == ":=" {
                self.push(TokenKind::AssignArg, ":=", mark);
            } else {
                let sigil = suffix.chars().next()?;
                let ty = SHORTHAND_TYPES.get(&sigil).copied()?;
                self.push(TokenKind::As, "As", mark);
                self.push(TokenKind::TypeName, ty, mark);
            }
            return Some(total);
        }

        let prev = self.prev_kind();
        let prevprev = self.prev_prev_kind();

        let kind = if id == "as" {
            TokenKind::As
        } else if id == "new" {
            TokenKind::New
        } else if prev == Some(TokenKind::Dot) {
            TokenKind::Property
        } else if prev == Some(TokenKind::As) {
            if id == "string" {
                TokenKind::StringType
            } else {
                // Unknown type names pass through unchecked.
                TokenKind::TypeName
            }
        } else if prev == Some(TokenKind::New) && prevprev == Some(TokenKind::As) {
            TokenKind::TypeName
        } else if let Some(folded) = self.fold(prev, &id) {
            let head = self.tokens.pop()?;
            let text = format!("{} {}", head.text, word);
            self.push(folded, text, head.span.merge(span));
            return Some(word.len());
        } else if let Some(&keyword) = KEYWORDS.get(id.as_str()) {
            if keyword == TokenKind::Modifier && PROC_AHEAD.is_match(&self.chunk()[word.len()..]) {
                TokenKind::FunctionModifier
            } else {
                keyword
            }
        } else {
            self.record_reference(&word);
            TokenKind::Identifier
        };

        let len = word.len();
        self.push(kind, word, span);
        Some(len)
    }

    /// Second word of a folded two-word keyword, given the pending head
    /// token's tag.
    fn fold(&self, prev: Option<TokenKind>, id: &str) -> Option<TokenKind> {
        match (prev?, id) {
            (TokenKind::End, "sub") => Some(TokenKind::SubEnd),
            (TokenKind::End, "function") => Some(TokenKind::FunctionEnd),
            (TokenKind::End, "if") => Some(TokenKind::IfEnd),
            (TokenKind::End, "select") => Some(TokenKind::SelectEnd),
            (TokenKind::End, "with") => Some(TokenKind::WithEnd),
            (TokenKind::Select, "case") => Some(TokenKind::SelectStart),
            (TokenKind::Case, "else") => Some(TokenKind::DefaultCase),
            (TokenKind::Exit, "do") | (TokenKind::Exit, "for") => Some(TokenKind::Break),
            (TokenKind::Exit, "sub") | (TokenKind::Exit, "function") => Some(TokenKind::Return),
            _ => None,
        }
    }

    fn newline_token(&mut self) -> Option<usize> {
        let len = NEWLINE.find(self.chunk())?.as_str().len();
        if self.continuation {
            self.continuation = false;
            return Some(len);
        }
        match self.prev_kind() {
            // No leading or doubled terminators.
            None | Some(TokenKind::Terminator) => {}
            _ => {
                let span = self.span_here(len);
                self.push(TokenKind::Terminator, "\n", span);
            }
        }
        Some(len)
    }

    fn whitespace_token(&mut self) -> Option<usize> {
        WHITESPACE.find(self.chunk()).map(|m| m.as_str().len())
    }

    fn string_token(&mut self) -> Option<usize> {
        let raw = STRING.find(self.chunk())?.as_str().to_string();
        let len = raw.len();
        let span = self.span_here(len);
        self.push(TokenKind::Str, raw, span);
        Some(len)
    }

    fn number_token(&mut self) -> Option<usize> {
        let raw = NUMBER.find(self.chunk())?.as_str().to_string();
        let len = raw.len();
        let span = self.span_here(len);
        self.push(TokenKind::Number, raw, span);
        Some(len)
    }

    fn literal_token(&mut self) -> Option<usize> {
        let op = OPERATOR.find(self.chunk()).map(|m| m.as_str().to_string());
        if let Some(op) = op {
            let len = op.len();
            let span = self.span_here(len);
            self.push(operator_kind(&op), op, span);
            return Some(len);
        }

        let ch = self.chunk().chars().next()?;
        let span = self.span_here(ch.len_utf8());
        let prev = self.prev_kind();
        match ch {
            ':' => self.push(TokenKind::Terminator, ":", span),
            '(' => self.push(TokenKind::LParen, "(", span),
            ')' => self.push(TokenKind::RParen, ")", span),
            ',' => {
                if matches!(prev, Some(TokenKind::LParen) | Some(TokenKind::Comma)) {
                    self.push(TokenKind::ArgSkip, "", Span::new(span.start, span.start));
                }
                self.push(TokenKind::Comma, ",", span);
            }
            '.' => {
                if matches!(prev, None | Some(TokenKind::Terminator) | Some(TokenKind::With)) {
                    self.push(TokenKind::This, "this", Span::new(span.start, span.start));
                }
                self.push(TokenKind::Dot, ".", span);
            }
            '_' => self.continuation = true,
            _ => return None,
        }
        Some(ch.len_utf8())
    }
}
