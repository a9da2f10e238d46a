//! Token types for the BASIC-family source language.
//!
//! A token is a tag plus the raw text it covers. Tags are closed: the
//! grammar consumes exactly this set of terminals. Two-word keywords
//! (`End Sub`, `Select Case`, `Exit Do`, ...) never appear as pairs in
//! the output stream; the lexer folds them into the single tags below.

use crate::span::Span;

/// A token with its tag, source text, and location.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub span: Span,
}

impl Token {
    /// Create a new token.
    #[inline]
    pub fn new(kind: TokenKind, text: impl Into<String>, span: Span) -> Self {
        Self { kind, text: text.into(), span }
    }
}

/// The tag of a token. Fieldless so it doubles as the terminal symbol
/// set of the grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TokenKind {
    // === Literals and names ===
    /// Identifier: `foo`, `Counter`
    Identifier,
    /// Member name after `.`
    Property,
    /// Integer literal
    Number,
    /// String literal, quotes included
    Str,
    /// `True` / `False`
    Boolean,
    /// `Nothing`
    Nothing,

    // === Types ===
    /// `As`
    As,
    /// A declared type name following `As` (or a shorthand suffix)
    TypeName,
    /// `String` following `As` (fixed-length form allowed)
    StringType,
    /// `New`
    New,

    // === Declarations ===
    /// `Static` / `Private` / `Public` before a variable list
    Modifier,
    /// `Dim` / `ReDim`
    Dim,
    /// `Const`
    Const,
    /// Visibility modifier before `Sub` / `Function`
    FunctionModifier,
    /// `ByVal` / `ByRef` / `Optional`
    ParamModifier,
    /// `ParamArray`
    ParamArray,

    // === Statement structure ===
    /// Newline or `:`
    Terminator,
    /// Implicit receiver synthesized for a leading `.`
    This,
    /// Empty argument slot synthesized for `f(a, , b)`
    ArgSkip,

    // === Keywords ===
    Set,
    Let,
    Step,
    For,
    To,
    Next,
    Case,
    /// Folded `Case Else`
    DefaultCase,
    Do,
    Loop,
    While,
    Until,
    Wend,
    /// `Sub`
    SubStart,
    /// Folded `End Sub`
    SubEnd,
    /// `Function`
    FunctionStart,
    /// Folded `End Function`
    FunctionEnd,
    /// Folded `Select Case`
    SelectStart,
    /// Folded `End Select`
    SelectEnd,
    /// Bare `Select` (awaiting fold)
    Select,
    If,
    /// Folded `End If`
    IfEnd,
    Then,
    ElseIf,
    Else,
    With,
    /// Folded `End With`
    WithEnd,
    /// Folded `Exit Do` / `Exit For`
    Break,
    /// Folded `Exit Sub` / `Exit Function`
    Return,
    /// Bare `End` (awaiting fold)
    End,
    /// Bare `Exit` (awaiting fold)
    Exit,
    Call,

    // === Operators ===
    /// `Mod`
    ModOp,
    /// `<>` `><` `<` `<=` `>` `>=`
    Compare,
    /// `And` `Or` `Xor` `Imp` `Eqv`
    Logical,
    /// `Not`
    Unary,
    /// `:=`
    AssignArg,
    /// `=`
    Eq,
    Amp,
    Plus,
    Minus,
    Star,
    Slash,
    Backslash,
    Caret,
    LParen,
    RParen,
    Comma,
    Dot,

    // === Pseudo-terminals ===
    /// Never lexed; exists only to give unary minus its precedence.
    UnaryMinus,
    /// End of input.
    Eof,
}

impl TokenKind {
    /// Check if this tag closes a folded two-word keyword when the
    /// lexer sees the second word.
    pub fn is_fold_head(&self) -> bool {
        matches!(self, TokenKind::End | TokenKind::Select | TokenKind::Case | TokenKind::Exit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_heads() {
        assert!(TokenKind::End.is_fold_head());
        assert!(TokenKind::Exit.is_fold_head());
        assert!(!TokenKind::Identifier.is_fold_head());
    }
}
