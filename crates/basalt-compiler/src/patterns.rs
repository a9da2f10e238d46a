//! Source patterns: the regexes the lexer matches against, the keyword
//! table, and the built-in type names.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use rustc_hash::FxHashMap;

use crate::token::TokenKind;

/// Identifier with an optional shorthand suffix. The suffix group
/// catches type sigils (`count%`) and the named-argument marker
/// (`bar:=`) in one pass. Identifiers start with a letter; a lone `_`
/// is the line-continuation marker and is handled elsewhere.
pub static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z]\w*)(:=|[%&#$!@])?").unwrap());

/// Horizontal whitespace only. Newlines are terminators and must not
/// be swallowed here.
pub static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[ \t\r]+").unwrap());

pub static NEWLINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\n").unwrap());

/// String literal. The language has no escape sequences; a quote ends
/// the literal and a newline inside one is a lex error by omission.
pub static STRING: Lazy<Regex> = Lazy::new(|| Regex::new(r#"^"([^"\n]*)""#).unwrap());

pub static NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+(\.\d+)?").unwrap());

/// Multi-character operators first so `<=` never lexes as `<` `=`.
pub static OPERATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(:=|<>|><|<=|>=|[<>=&+\-*/\\^])").unwrap());

/// Lookahead for `Public`/`Private`/`Friend`/`Static` used as a
/// procedure modifier: the next word on the line must be `Sub` or
/// `Function`.
pub static PROC_AHEAD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[ \t]+(?i:sub|function)\b").unwrap());

/// Type sigil suffixes on identifiers.
pub static SHORTHAND_TYPES: Lazy<FxHashMap<char, &'static str>> = Lazy::new(|| {
    let mut m = FxHashMap::default();
    m.insert('%', "Integer");
    m.insert('&', "Long");
    m.insert('#', "Double");
    m.insert('$', "String");
    m.insert('!', "Single");
    m.insert('@', "Currency");
    m
});

/// Keyword lookup, keyed by the lowercased identifier text. Words not
/// in this table are plain identifiers.
pub static KEYWORDS: Lazy<FxHashMap<&'static str, TokenKind>> = Lazy::new(|| {
    let mut m = FxHashMap::default();
    m.insert("true", TokenKind::Boolean);
    m.insert("false", TokenKind::Boolean);
    m.insert("nothing", TokenKind::Nothing);
    m.insert("as", TokenKind::As);
    m.insert("new", TokenKind::New);
    m.insert("dim", TokenKind::Dim);
    m.insert("redim", TokenKind::Dim);
    m.insert("const", TokenKind::Const);
    m.insert("static", TokenKind::Modifier);
    m.insert("private", TokenKind::Modifier);
    m.insert("public", TokenKind::Modifier);
    m.insert("friend", TokenKind::Modifier);
    m.insert("byval", TokenKind::ParamModifier);
    m.insert("byref", TokenKind::ParamModifier);
    m.insert("optional", TokenKind::ParamModifier);
    m.insert("paramarray", TokenKind::ParamArray);
    m.insert("set", TokenKind::Set);
    m.insert("let", TokenKind::Let);
    m.insert("step", TokenKind::Step);
    m.insert("for", TokenKind::For);
    m.insert("to", TokenKind::To);
    m.insert("next", TokenKind::Next);
    m.insert("case", TokenKind::Case);
    m.insert("do", TokenKind::Do);
    m.insert("loop", TokenKind::Loop);
    m.insert("while", TokenKind::While);
    m.insert("until", TokenKind::Until);
    m.insert("wend", TokenKind::Wend);
    m.insert("sub", TokenKind::SubStart);
    m.insert("function", TokenKind::FunctionStart);
    m.insert("select", TokenKind::Select);
    m.insert("if", TokenKind::If);
    m.insert("then", TokenKind::Then);
    m.insert("elseif", TokenKind::ElseIf);
    m.insert("else", TokenKind::Else);
    m.insert("with", TokenKind::With);
    m.insert("end", TokenKind::End);
    m.insert("exit", TokenKind::Exit);
    m.insert("call", TokenKind::Call);
    m.insert("mod", TokenKind::ModOp);
    m.insert("and", TokenKind::Logical);
    m.insert("or", TokenKind::Logical);
    m.insert("xor", TokenKind::Logical);
    m.insert("imp", TokenKind::Logical);
    m.insert("eqv", TokenKind::Logical);
    m.insert("not", TokenKind::Unary);
    m
});

/// Tag for a single operator lexeme.
pub fn operator_kind(op: &str) -> TokenKind {
    match op {
        ":=" => TokenKind::AssignArg,
        "<>" | "><" | "<" | ">" | "<=" | ">=" => TokenKind::Compare,
        "=" => TokenKind::Eq,
        "&" => TokenKind::Amp,
        "+" => TokenKind::Plus,
        "-" => TokenKind::Minus,
        "*" => TokenKind::Star,
        "/" => TokenKind::Slash,
        "\\" => TokenKind::Backslash,
        "^" => TokenKind::Caret,
        _ => unreachable!("operator regex matched unknown lexeme"),
    }
}

/// Strip comments and normalize line structure before lexing.
///
/// Removes `'` comments (a `'` inside a string literal does not start
/// one), drops carriage returns, drops blank lines, and trims the
/// ends.
pub fn clean(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    for line in source.replace('\r', "").lines() {
        let mut in_string = false;
        let mut kept = line;
        for (i, ch) in line.char_indices() {
            match ch {
                '"' => in_string = !in_string,
                '\'' if !in_string => {
                    kept = &line[..i];
                    break;
                }
                _ => {}
            }
        }
        out.push_str(kept.trim_end());
        out.push('\n');
    }
    let mut collapsed = String::with_capacity(out.len());
    for line in out.lines() {
        if !line.trim().is_empty() {
            collapsed.push_str(line);
            collapsed.push('\n');
        }
    }
    collapsed.trim_matches('\n').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_strips_comments() {
        assert_eq!(clean("x = 1 ' set x\ny = 2"), "x = 1\ny = 2");
    }

    #[test]
    fn test_clean_keeps_apostrophe_in_string() {
        assert_eq!(clean(r#"s = "it's fine""#), r#"s = "it's fine""#);
    }

    #[test]
    fn test_clean_drops_blank_lines() {
        assert_eq!(clean("a = 1\n\n\n\nb = 2\n\n"), "a = 1\nb = 2");
    }

    #[test]
    fn test_operator_kinds() {
        assert_eq!(operator_kind("<>"), TokenKind::Compare);
        assert_eq!(operator_kind("><"), TokenKind::Compare);
        assert_eq!(operator_kind(":="), TokenKind::AssignArg);
        assert_eq!(operator_kind("\\"), TokenKind::Backslash);
    }

    #[test]
    fn test_whitespace_stops_at_newline() {
        let m = WHITESPACE.find("  \t\nrest").unwrap();
        assert_eq!(m.as_str(), "  \t");
    }
}
