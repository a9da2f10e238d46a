//! Shift-reduce parser.
//!
//! Tables are generated from [`crate::grammar::GRAMMAR`] on first use:
//! canonical LR(1) item sets, with conflicts resolved the way yacc
//! resolves them. Shift/reduce conflicts fall back on operator
//! precedence, equal precedence reduces for left-associative
//! operators, and conflicts with no precedence shift. Reduce/reduce
//! conflicts pick the production declared first.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;

use crate::error::CompileError;
use crate::grammar::{Grammar, Nt, SemVal, Sym, GRAMMAR};
use crate::nodes::Node;
use crate::span::Span;
use crate::token::{Token, TokenKind};

/// An LR(1) item: rule index, dot position, lookahead.
type Item = (u16, u8, TokenKind);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Entry {
    Shift(u32),
    Reduce(u16),
    Accept,
}

struct Tables {
    actions: FxHashMap<(u32, TokenKind), Entry>,
    gotos: FxHashMap<(u32, Nt), u32>,
}

static TABLES: Lazy<Tables> = Lazy::new(|| Tables::build(&GRAMMAR));

/// Parse a token stream (terminated by [`TokenKind::Eof`]) into a
/// [`Node::Root`].
pub fn parse(tokens: &[Token]) -> Result<Node, CompileError> {
    let tables = &*TABLES;
    let grammar = &*GRAMMAR;

    let mut states: Vec<u32> = vec![0];
    let mut values: Vec<(SemVal, Span)> = Vec::new();
    let mut position = 0usize;

    loop {
        let lookahead = match tokens.get(position) {
            Some(token) => token,
            None => {
                let span = tokens.last().map(|t| t.span).unwrap_or_default();
                return Err(CompileError::Syntax {
                    message: "unexpected end of input".to_string(),
                    span,
                });
            }
        };
        let state = *states.last().unwrap_or(&0);

        match tables.actions.get(&(state, lookahead.kind)) {
            Some(Entry::Shift(next)) => {
                states.push(*next);
                values.push((SemVal::Token(lookahead.clone()), lookahead.span));
                position += 1;
            }
            Some(Entry::Reduce(rule_index)) => {
                let rule = &grammar.rules[*rule_index as usize];
                let count = rule.rhs.len();
                let at = values.len() - count;
                let popped: Vec<(SemVal, Span)> = values.split_off(at);
                states.truncate(states.len() - count);

                let span = match (popped.first(), popped.last()) {
                    (Some((_, first)), Some((_, last))) => first.merge(*last),
                    _ => Span::new(lookahead.span.start, lookahead.span.start),
                };
                let value = (rule.action)(popped.into_iter().map(|(v, _)| v).collect(), span);

                let state = *states.last().unwrap_or(&0);
                let next = match tables.gotos.get(&(state, rule.lhs)) {
                    Some(next) => *next,
                    None => unreachable!("missing goto after reduce"),
                };
                states.push(next);
                values.push((value, span));
            }
            Some(Entry::Accept) => {
                return match values.pop() {
                    Some((SemVal::Node(root), _)) => Ok(root),
                    _ => unreachable!("accept with no root on the stack"),
                };
            }
            None => {
                let message = if lookahead.kind == TokenKind::Eof {
                    "unexpected end of input".to_string()
                } else {
                    format!("unexpected token `{}`", lookahead.text)
                };
                return Err(CompileError::Syntax { message, span: lookahead.span });
            }
        }
    }
}

impl Tables {
    fn build(grammar: &Grammar) -> Tables {
        let firsts = Firsts::compute(grammar);
        let mut by_lhs: FxHashMap<Nt, Vec<u16>> = FxHashMap::default();
        for (index, rule) in grammar.rules.iter().enumerate() {
            by_lhs.entry(rule.lhs).or_default().push(index as u16);
        }

        let start: BTreeSet<Item> =
            closure(grammar, &firsts, &by_lhs, [(0, 0, TokenKind::Eof)].into());

        let mut states: Vec<BTreeSet<Item>> = vec![start.clone()];
        let mut indices: FxHashMap<BTreeSet<Item>, u32> = FxHashMap::default();
        indices.insert(start, 0);

        let mut actions: FxHashMap<(u32, TokenKind), Entry> = FxHashMap::default();
        let mut gotos: FxHashMap<(u32, Nt), u32> = FxHashMap::default();

        let mut pending = 0usize;
        while pending < states.len() {
            let state = states[pending].clone();
            let index = pending as u32;
            pending += 1;

            // Transitions, grouped by the symbol after the dot.
            let mut moves: FxHashMap<Sym, BTreeSet<Item>> = FxHashMap::default();
            for &(rule_index, dot, la) in &state {
                let rule = &grammar.rules[rule_index as usize];
                if let Some(&sym) = rule.rhs.get(dot as usize) {
                    moves.entry(sym).or_default().insert((rule_index, dot + 1, la));
                }
            }

            let mut ordered: Vec<(Sym, BTreeSet<Item>)> = moves.into_iter().collect();
            ordered.sort_by_key(|(sym, _)| *sym);

            for (sym, kernel) in ordered {
                let next = closure(grammar, &firsts, &by_lhs, kernel);
                let target = match indices.get(&next) {
                    Some(&target) => target,
                    None => {
                        let target = states.len() as u32;
                        indices.insert(next.clone(), target);
                        states.push(next);
                        target
                    }
                };
                match sym {
                    Sym::T(kind) => {
                        insert_action(grammar, &mut actions, index, kind, Entry::Shift(target));
                    }
                    Sym::N(nt) => {
                        gotos.insert((index, nt), target);
                    }
                }
            }

            // Completed items reduce on their lookahead.
            for &(rule_index, dot, la) in &state {
                let rule = &grammar.rules[rule_index as usize];
                if dot as usize != rule.rhs.len() {
                    continue;
                }
                if rule_index == 0 {
                    if la == TokenKind::Eof {
                        actions.insert((index, TokenKind::Eof), Entry::Accept);
                    }
                    continue;
                }
                insert_action(grammar, &mut actions, index, la, Entry::Reduce(rule_index));
            }
        }

        Tables { actions, gotos }
    }
}

/// Insert an action, resolving conflicts against anything already
/// there.
fn insert_action(
    grammar: &Grammar,
    actions: &mut FxHashMap<(u32, TokenKind), Entry>,
    state: u32,
    kind: TokenKind,
    entry: Entry,
) {
    use crate::grammar::{precedence, Assoc};

    let key = (state, kind);
    let existing = match actions.get(&key) {
        None => {
            actions.insert(key, entry);
            return;
        }
        Some(&existing) => existing,
    };
    if existing == entry {
        return;
    }

    let resolved = match (existing, entry) {
        (Entry::Reduce(a), Entry::Reduce(b)) => Entry::Reduce(a.min(b)),
        (Entry::Shift(target), Entry::Reduce(rule)) | (Entry::Reduce(rule), Entry::Shift(target)) => {
            let rule_prec = grammar.rule_precedence(&grammar.rules[rule as usize]);
            let token_prec = precedence(kind);
            match (rule_prec, token_prec) {
                (Some((rp, assoc)), Some((tp, _))) => {
                    if rp > tp {
                        Entry::Reduce(rule)
                    } else if rp < tp {
                        Entry::Shift(target)
                    } else if assoc == Assoc::Left {
                        Entry::Reduce(rule)
                    } else {
                        Entry::Shift(target)
                    }
                }
                _ => Entry::Shift(target),
            }
        }
        (accept @ Entry::Accept, _) | (_, accept @ Entry::Accept) => accept,
        (shift, _) => shift,
    };
    actions.insert(key, resolved);
}

fn closure(
    grammar: &Grammar,
    firsts: &Firsts,
    by_lhs: &FxHashMap<Nt, Vec<u16>>,
    kernel: BTreeSet<Item>,
) -> BTreeSet<Item> {
    let mut items = kernel;
    let mut queue: Vec<Item> = items.iter().copied().collect();

    while let Some((rule_index, dot, la)) = queue.pop() {
        let rule = &grammar.rules[rule_index as usize];
        let nt = match rule.rhs.get(dot as usize) {
            Some(Sym::N(nt)) => *nt,
            _ => continue,
        };
        let rest = &rule.rhs[dot as usize + 1..];
        let lookaheads = firsts.of_sequence(rest, la);
        for &candidate in by_lhs.get(&nt).into_iter().flatten() {
            for &next_la in &lookaheads {
                let item = (candidate, 0, next_la);
                if items.insert(item) {
                    queue.push(item);
                }
            }
        }
    }

    items
}

struct Firsts {
    sets: FxHashMap<Nt, BTreeSet<TokenKind>>,
    nullable: BTreeSet<Nt>,
}

impl Firsts {
    fn compute(grammar: &Grammar) -> Firsts {
        let mut sets: FxHashMap<Nt, BTreeSet<TokenKind>> = FxHashMap::default();
        let mut nullable: BTreeSet<Nt> = BTreeSet::new();

        loop {
            let mut changed = false;
            for rule in &grammar.rules {
                let mut all_nullable = true;
                for sym in &rule.rhs {
                    match sym {
                        Sym::T(kind) => {
                            if sets.entry(rule.lhs).or_default().insert(*kind) {
                                changed = true;
                            }
                            all_nullable = false;
                        }
                        Sym::N(nt) => {
                            let from: Vec<TokenKind> =
                                sets.get(nt).map(|s| s.iter().copied().collect()).unwrap_or_default();
                            let into = sets.entry(rule.lhs).or_default();
                            for kind in from {
                                if into.insert(kind) {
                                    changed = true;
                                }
                            }
                            if !nullable.contains(nt) {
                                all_nullable = false;
                            }
                        }
                    }
                    if !all_nullable {
                        break;
                    }
                }
                if all_nullable && nullable.insert(rule.lhs) {
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }

        Firsts { sets, nullable }
    }

    /// FIRST of a symbol sequence followed by a lookahead.
    fn of_sequence(&self, symbols: &[Sym], lookahead: TokenKind) -> BTreeSet<TokenKind> {
        let mut result = BTreeSet::new();
        for sym in symbols {
            match sym {
                Sym::T(kind) => {
                    result.insert(*kind);
                    return result;
                }
                Sym::N(nt) => {
                    if let Some(set) = self.sets.get(nt) {
                        result.extend(set.iter().copied());
                    }
                    if !self.nullable.contains(nt) {
                        return result;
                    }
                }
            }
        }
        result.insert(lookahead);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn parse_source(source: &str) -> Result<Node, CompileError> {
        parse(&tokenize(source).unwrap().tokens)
    }

    #[test]
    fn test_empty_program() {
        let root = parse_source("").unwrap();
        match root {
            Node::Root { body, .. } => match *body {
                Node::Block { body, .. } => assert!(body.is_empty()),
                _ => panic!("expected block"),
            },
            _ => panic!("expected root"),
        }
    }

    #[test]
    fn test_assignment_statement() {
        let root = parse_source("x = 5").unwrap();
        match root {
            Node::Root { body, .. } => match *body {
                Node::Block { body, .. } => {
                    assert_eq!(body.len(), 1);
                    assert!(matches!(body[0], Node::Assign { .. }));
                }
                _ => panic!("expected block"),
            },
            _ => panic!("expected root"),
        }
    }

    #[test]
    fn test_operator_precedence() {
        // 1 + 2 * 3 parses as 1 + (2 * 3)
        let root = parse_source("x = 1 + 2 * 3").unwrap();
        let assign = first_statement(root);
        match assign {
            Node::Assign { value, .. } => match *value {
                Node::Op { op, rhs, .. } => {
                    assert_eq!(op, "+");
                    assert!(matches!(rhs.as_deref(), Some(Node::Op { .. })));
                }
                _ => panic!("expected op"),
            },
            _ => panic!("expected assign"),
        }
    }

    #[test]
    fn test_left_associativity() {
        // 1 - 2 - 3 parses as (1 - 2) - 3
        let root = parse_source("x = 1 - 2 - 3").unwrap();
        let assign = first_statement(root);
        match assign {
            Node::Assign { value, .. } => match *value {
                Node::Op { op, lhs, rhs, .. } => {
                    assert_eq!(op, "-");
                    assert!(matches!(*lhs, Node::Op { .. }));
                    assert!(matches!(rhs.as_deref(), Some(Node::Value { .. })));
                }
                _ => panic!("expected op"),
            },
            _ => panic!("expected assign"),
        }
    }

    #[test]
    fn test_unary_minus() {
        let root = parse_source("y = -1").unwrap();
        let assign = first_statement(root);
        match assign {
            Node::Assign { value, .. } => match *value {
                Node::Op { op, rhs, .. } => {
                    assert_eq!(op, "-");
                    assert!(rhs.is_none());
                }
                _ => panic!("expected unary op"),
            },
            _ => panic!("expected assign"),
        }
    }

    #[test]
    fn test_sub_parses_to_code() {
        let root = parse_source("Sub Foo()\nx = 5\nEnd Sub").unwrap();
        let code = first_statement(root);
        assert!(matches!(code, Node::Code { .. }));
    }

    #[test]
    fn test_function_with_return_type() {
        let root = parse_source("Function Area(r As Double) As Double\nArea = r\nEnd Function")
            .unwrap();
        let code = first_statement(root);
        match code {
            Node::Code { return_type, params, .. } => {
                assert_eq!(return_type.unwrap().name, "Double");
                assert_eq!(params.len(), 1);
            }
            _ => panic!("expected code"),
        }
    }

    #[test]
    fn test_if_elseif_else_chain() {
        let source = "If a Then\nx = 1\nElseIf b Then\nx = 2\nElse\nx = 3\nEnd If";
        let root = parse_source(source).unwrap();
        let node = first_statement(root);
        match node {
            Node::If { else_body: Some(else_body), is_chain, .. } => {
                assert!(is_chain);
                assert!(matches!(*else_body, Node::If { else_body: Some(_), .. }));
            }
            _ => panic!("expected chained if"),
        }
    }

    #[test]
    fn test_single_line_if() {
        let root = parse_source("If a Then x = 1 Else x = 2").unwrap();
        assert!(matches!(first_statement(root), Node::If { else_body: Some(_), .. }));
    }

    #[test]
    fn test_do_loop_until() {
        let root = parse_source("Do\nx = x + 1\nLoop Until x > 5").unwrap();
        match first_statement(root) {
            Node::While { condition, post, .. } => {
                assert!(post);
                // Until inverts the condition.
                assert!(matches!(*condition, Node::Op { ref op, rhs: None, .. } if op == "!"));
            }
            _ => panic!("expected while"),
        }
    }

    #[test]
    fn test_for_with_step() {
        let root = parse_source("For i = 1 To 10 Step 2\nx = i\nNext i").unwrap();
        match first_statement(root) {
            Node::For { step, body, .. } => {
                assert!(step.is_some());
                assert!(matches!(*body, Node::Block { .. }));
            }
            _ => panic!("expected for"),
        }
    }

    #[test]
    fn test_select_case_with_default() {
        let source = "Select Case x\nCase 1, 2\ny = 1\nCase Else\ny = 2\nEnd Select";
        let root = parse_source(source).unwrap();
        match first_statement(root) {
            Node::Switch { cases, .. } => {
                assert_eq!(cases.len(), 2);
                match &cases[0] {
                    Node::Case { tests, .. } => assert_eq!(tests.len(), 2),
                    _ => panic!("expected case"),
                }
                match &cases[1] {
                    Node::Case { tests, .. } => assert!(tests.is_empty()),
                    _ => panic!("expected default case"),
                }
            }
            _ => panic!("expected switch"),
        }
    }

    #[test]
    fn test_with_block() {
        let root = parse_source("With obj\n.Width = 5\nEnd With").unwrap();
        assert!(matches!(first_statement(root), Node::With { .. }));
    }

    #[test]
    fn test_call_statement() {
        let root = parse_source("Call Foo(1, bar:=2)").unwrap();
        match first_statement(root) {
            Node::CallExpr { args, .. } => {
                assert_eq!(args.len(), 2);
                assert!(matches!(args[1], Node::NamedArg { .. }));
            }
            _ => panic!("expected call"),
        }
    }

    #[test]
    fn test_bare_invocation() {
        let root = parse_source("MsgBox greeting").unwrap();
        assert!(matches!(first_statement(root), Node::CallExpr { .. }));
    }

    #[test]
    fn test_syntax_error_reports_token() {
        let err = parse_source("If Then").unwrap_err();
        match err {
            CompileError::Syntax { message, .. } => assert!(message.contains("Then")),
            _ => panic!("expected syntax error"),
        }
    }

    #[test]
    fn test_dim_list() {
        let root = parse_source("Dim a, b As Integer, c As New Widget").unwrap();
        match first_statement(root) {
            Node::VarDeclList { decls, modifier, .. } => {
                assert_eq!(decls.len(), 3);
                assert_eq!(modifier, "Dim");
            }
            _ => panic!("expected declaration list"),
        }
    }

    fn first_statement(root: Node) -> Node {
        match root {
            Node::Root { body, .. } => match *body {
                Node::Block { mut body, .. } => body.remove(0),
                _ => panic!("expected block"),
            },
            _ => panic!("expected root"),
        }
    }
}
