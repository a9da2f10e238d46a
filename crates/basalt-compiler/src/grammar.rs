//! The grammar: productions, semantic actions, and operator
//! precedence.
//!
//! Productions are listed in declaration order; the parser generator
//! resolves reduce/reduce conflicts in favor of the earlier rule, so
//! order is part of the grammar's meaning. Operator translation to the
//! target language (`&` to `+`, `\` to `/`, `^` to `**`, `Mod` to `%`)
//! happens in the semantic actions, so the tree only ever carries
//! target-language operators plus the comparison and logical words the
//! generator rewrites late.

use once_cell::sync::Lazy;

use crate::nodes::{Node, TypeRef};
use crate::span::Span;
use crate::token::{Token, TokenKind};

/// Nonterminal symbols. `Start` is the augmented start symbol; `Root`
/// is the entry production.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Nt {
    Start,
    Root,
    Body,
    Line,
    Statement,
    Expression,
    Identifier,
    Property,
    Number,
    String,
    Literal,
    Assign,
    Params,
    ParamList,
    Param,
    ParamArray,
    ParamVariable,
    SimpleAssignable,
    Break,
    Return,
    Code,
    Sub,
    Function,
    Assignable,
    Value,
    Accessor,
    ParenthesizedInvocation,
    Invocation,
    Call,
    ParenthesizedArgs,
    ArgList,
    FirstArg,
    Arg,
    NamedArg,
    This,
    Parenthetical,
    VariableDeclaration,
    ConstDeclaration,
    VariableList,
    ConstList,
    Const,
    Variable,
    New,
    Type,
    StringType,
    For,
    ForClause,
    Wend,
    PostWhile,
    PreWhile,
    WhileBody,
    Switch,
    DefaultSwitchCaseList,
    SwitchCaseList,
    SwitchCase,
    CaseExpressions,
    If,
    IfLine,
    IfBlock,
    IfLineClause,
    IfBlockClause,
    ElseIf,
    With,
    Operation,
}

/// A grammar symbol: terminal or nonterminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Sym {
    T(TokenKind),
    N(Nt),
}

/// A semantic value on the parse stack.
#[derive(Debug, Clone)]
pub enum SemVal {
    Token(Token),
    Node(Node),
    List(Vec<Node>),
    Type(TypeRef),
    Empty,
}

pub type Action = fn(Vec<SemVal>, Span) -> SemVal;

pub struct Rule {
    pub lhs: Nt,
    pub rhs: Vec<Sym>,
    pub action: Action,
    /// Precedence override; otherwise the rightmost terminal decides.
    pub prec: Option<TokenKind>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assoc {
    Left,
    Right,
}

/// Terminal precedence, low to high. Unlisted terminals take part in
/// no precedence-based conflict resolution.
pub fn precedence(kind: TokenKind) -> Option<(u8, Assoc)> {
    use TokenKind as K;
    Some(match kind {
        K::Logical => (1, Assoc::Left),
        K::Unary => (2, Assoc::Left),
        K::Compare | K::Eq => (3, Assoc::Left),
        K::Amp => (4, Assoc::Left),
        K::Plus | K::Minus => (5, Assoc::Left),
        K::ModOp => (6, Assoc::Left),
        K::Backslash => (7, Assoc::Left),
        K::Star | K::Slash => (8, Assoc::Left),
        K::Caret => (9, Assoc::Left),
        K::UnaryMinus => (10, Assoc::Right),
        K::Modifier => (11, Assoc::Right),
        _ => return None,
    })
}

pub struct Grammar {
    pub rules: Vec<Rule>,
}

impl Grammar {
    fn add(&mut self, lhs: Nt, rhs: &[Sym], action: Action) {
        self.rules.push(Rule { lhs, rhs: rhs.to_vec(), action, prec: None });
    }

    fn add_prec(&mut self, lhs: Nt, rhs: &[Sym], prec: TokenKind, action: Action) {
        self.rules.push(Rule { lhs, rhs: rhs.to_vec(), action, prec: Some(prec) });
    }

    /// Effective precedence of a rule: the override if given,
    /// otherwise its rightmost terminal.
    pub fn rule_precedence(&self, rule: &Rule) -> Option<(u8, Assoc)> {
        if let Some(kind) = rule.prec {
            return precedence(kind);
        }
        rule.rhs.iter().rev().find_map(|sym| match sym {
            Sym::T(kind) => precedence(*kind),
            Sym::N(_) => None,
        })
    }
}

// Stack value extractors. The table generator guarantees the stack
// shape matches the production, so a mismatch is unreachable.

fn node(values: &mut [SemVal], index: usize) -> Node {
    match std::mem::replace(&mut values[index], SemVal::Empty) {
        SemVal::Node(node) => node,
        _ => unreachable!("expected node at position {index}"),
    }
}

fn list(values: &mut [SemVal], index: usize) -> Vec<Node> {
    match std::mem::replace(&mut values[index], SemVal::Empty) {
        SemVal::List(list) => list,
        _ => unreachable!("expected list at position {index}"),
    }
}

fn text(values: &mut [SemVal], index: usize) -> String {
    match std::mem::replace(&mut values[index], SemVal::Empty) {
        SemVal::Token(token) => token.text,
        _ => unreachable!("expected token at position {index}"),
    }
}

fn ty(values: &mut [SemVal], index: usize) -> TypeRef {
    match std::mem::replace(&mut values[index], SemVal::Empty) {
        SemVal::Type(ty) => ty,
        _ => unreachable!("expected type at position {index}"),
    }
}

fn bx(node: Node) -> Box<Node> {
    Box::new(node)
}

fn empty_block(span: Span) -> Node {
    Node::Block { body: Vec::new(), span }
}

pub static GRAMMAR: Lazy<Grammar> = Lazy::new(build);

#[allow(clippy::too_many_lines)]
fn build() -> Grammar {
    use Nt as N;
    use Sym::{N as n, T as t};
    use TokenKind as K;

    let mut g = Grammar { rules: Vec::with_capacity(160) };

    g.add(N::Start, &[n(N::Root)], |mut v, _| SemVal::Node(node(&mut v, 0)));

    g.add(N::Root, &[], |_, s| {
        SemVal::Node(Node::Root { body: bx(empty_block(s)), span: s })
    });
    g.add(N::Root, &[n(N::Body)], |mut v, s| {
        SemVal::Node(Node::Root { body: bx(node(&mut v, 0)), span: s })
    });

    g.add(N::Body, &[n(N::Line)], |mut v, s| {
        SemVal::Node(Node::wrap(vec![node(&mut v, 0)], s))
    });
    g.add(N::Body, &[n(N::Body), t(K::Terminator), n(N::Line)], |mut v, s| {
        let block = node(&mut v, 0);
        let line = node(&mut v, 2);
        match block {
            Node::Block { mut body, .. } => {
                body.push(line);
                SemVal::Node(Node::Block { body, span: s })
            }
            _ => unreachable!("body is always a block"),
        }
    });

    g.add(N::Line, &[n(N::Expression)], pass0);
    g.add(N::Line, &[n(N::Statement)], pass0);

    for stmt in [
        N::VariableDeclaration,
        N::ConstDeclaration,
        N::Return,
        N::If,
        N::PostWhile,
        N::PreWhile,
        N::For,
        N::Wend,
        N::Break,
        N::Switch,
        N::Call,
        N::With,
        N::Invocation,
        N::Code,
    ] {
        g.add(N::Statement, &[n(stmt)], pass0);
    }

    g.add(N::Expression, &[n(N::Value)], pass0);
    g.add(N::Expression, &[n(N::Operation)], pass0);
    g.add(N::Expression, &[n(N::Assign)], pass0);
    g.add(N::Expression, &[n(N::Parenthetical)], |mut v, _| {
        SemVal::Node(node(&mut v, 0).into_value())
    });

    g.add(N::Identifier, &[t(K::Identifier)], |mut v, s| {
        SemVal::Node(Node::Ident { name: text(&mut v, 0), span: s })
    });
    g.add(N::Property, &[t(K::Property)], |mut v, s| {
        SemVal::Node(Node::PropName { name: text(&mut v, 0), span: s })
    });
    g.add(N::Number, &[t(K::Number)], |mut v, s| {
        SemVal::Node(Node::NumberLit { value: text(&mut v, 0), span: s })
    });
    g.add(N::String, &[t(K::Str)], |mut v, s| {
        SemVal::Node(Node::StringLit { value: text(&mut v, 0), span: s })
    });

    g.add(N::Literal, &[n(N::String)], pass0);
    g.add(N::Literal, &[n(N::Number)], pass0);
    g.add(N::Literal, &[t(K::ArgSkip)], |_, s| SemVal::Node(Node::UndefinedLit { span: s }));
    g.add(N::Literal, &[t(K::Nothing)], |_, s| SemVal::Node(Node::UndefinedLit { span: s }));
    g.add(N::Literal, &[t(K::Boolean)], |mut v, s| {
        SemVal::Node(Node::BoolLit { value: text(&mut v, 0).to_ascii_lowercase(), span: s })
    });

    g.add(N::Assign, &[n(N::Assignable), t(K::Eq), n(N::Expression)], |mut v, s| {
        SemVal::Node(Node::Assign {
            target: bx(node(&mut v, 0)),
            value: bx(node(&mut v, 2)),
            span: s,
        })
    });
    g.add(N::Assign, &[t(K::Set), n(N::Assignable), t(K::Eq), n(N::Expression)], |mut v, s| {
        SemVal::Node(Node::Assign {
            target: bx(node(&mut v, 1)),
            value: bx(node(&mut v, 3)),
            span: s,
        })
    });
    g.add(
        N::Assign,
        &[t(K::Set), n(N::Assignable), t(K::Eq), t(K::New), n(N::Expression)],
        |mut v, s| {
            SemVal::Node(Node::Assign {
                target: bx(node(&mut v, 1)),
                value: bx(node(&mut v, 4)),
                span: s,
            })
        },
    );
    g.add(N::Assign, &[t(K::Let), n(N::Assignable), t(K::Eq), n(N::Expression)], |mut v, s| {
        SemVal::Node(Node::Assign {
            target: bx(node(&mut v, 1)),
            value: bx(node(&mut v, 3)),
            span: s,
        })
    });

    g.add(N::Params, &[t(K::LParen), n(N::ParamList), t(K::RParen)], |mut v, _| {
        SemVal::List(list(&mut v, 1))
    });
    g.add(
        N::Params,
        &[t(K::LParen), n(N::ParamList), t(K::Comma), n(N::ParamArray), t(K::RParen)],
        |mut v, _| {
            let mut params = list(&mut v, 1);
            params.push(node(&mut v, 3));
            SemVal::List(params)
        },
    );
    g.add(N::Params, &[t(K::LParen), n(N::ParamArray), t(K::RParen)], |mut v, _| {
        SemVal::List(vec![node(&mut v, 1)])
    });
    g.add(
        N::Params,
        &[t(K::LParen), t(K::ParamModifier), n(N::ParamArray), t(K::RParen)],
        |mut v, _| {
            let modifier = text(&mut v, 1);
            SemVal::List(vec![node(&mut v, 2).set_modifier(&modifier)])
        },
    );
    g.add(
        N::Params,
        &[
            t(K::LParen),
            n(N::ParamList),
            t(K::Comma),
            t(K::ParamModifier),
            n(N::ParamArray),
            t(K::RParen),
        ],
        |mut v, _| {
            let mut params = list(&mut v, 1);
            let modifier = text(&mut v, 3);
            params.push(node(&mut v, 4).set_modifier(&modifier));
            SemVal::List(params)
        },
    );

    g.add(N::ParamList, &[], |_, _| SemVal::List(Vec::new()));
    g.add(N::ParamList, &[n(N::Param)], |mut v, _| SemVal::List(vec![node(&mut v, 0)]));
    g.add(N::ParamList, &[n(N::ParamList), t(K::Comma), n(N::Param)], |mut v, _| {
        let mut params = list(&mut v, 0);
        params.push(node(&mut v, 2));
        SemVal::List(params)
    });

    g.add(N::Param, &[n(N::ParamVariable)], pass0);
    g.add(N::Param, &[t(K::ParamModifier), n(N::ParamVariable)], |mut v, _| {
        let modifier = text(&mut v, 0);
        SemVal::Node(node(&mut v, 1).set_modifier(&modifier))
    });

    g.add(
        N::ParamArray,
        &[t(K::ParamArray), n(N::Identifier), t(K::LParen), t(K::RParen)],
        |mut v, s| {
            SemVal::Node(Node::Param {
                name: bx(node(&mut v, 1)),
                ty: TypeRef::variant(),
                default: None,
                modifier: None,
                rest: true,
                span: s,
            })
        },
    );
    g.add(
        N::ParamArray,
        &[t(K::ParamArray), n(N::Identifier), t(K::LParen), t(K::RParen), n(N::Type)],
        |mut v, s| {
            SemVal::Node(Node::Param {
                name: bx(node(&mut v, 1)),
                ty: ty(&mut v, 4),
                default: None,
                modifier: None,
                rest: true,
                span: s,
            })
        },
    );

    g.add(N::ParamVariable, &[n(N::Identifier)], |mut v, s| {
        SemVal::Node(Node::Param {
            name: bx(node(&mut v, 0)),
            ty: TypeRef::variant(),
            default: None,
            modifier: None,
            rest: false,
            span: s,
        })
    });
    g.add(N::ParamVariable, &[n(N::Identifier), n(N::Type)], |mut v, s| {
        SemVal::Node(Node::Param {
            name: bx(node(&mut v, 0)),
            ty: ty(&mut v, 1),
            default: None,
            modifier: None,
            rest: false,
            span: s,
        })
    });
    g.add(
        N::ParamVariable,
        &[n(N::Identifier), n(N::Type), t(K::Eq), n(N::Expression)],
        |mut v, s| {
            SemVal::Node(Node::Param {
                name: bx(node(&mut v, 0)),
                ty: ty(&mut v, 1),
                default: Some(bx(node(&mut v, 3))),
                modifier: None,
                rest: false,
                span: s,
            })
        },
    );

    g.add(N::SimpleAssignable, &[n(N::Identifier)], |mut v, _| {
        SemVal::Node(node(&mut v, 0).into_value())
    });
    g.add(N::SimpleAssignable, &[n(N::Value), n(N::Accessor)], |mut v, _| {
        let value = node(&mut v, 0);
        let access = node(&mut v, 1);
        SemVal::Node(value.add_access(access))
    });
    g.add(N::SimpleAssignable, &[n(N::ParenthesizedInvocation)], |mut v, _| {
        SemVal::Node(node(&mut v, 0).into_value())
    });

    g.add(N::Break, &[t(K::Break)], |_, s| SemVal::Node(Node::Break { span: s }));
    g.add(N::Return, &[t(K::Return)], |_, s| SemVal::Node(Node::Return { span: s }));

    g.add(N::Code, &[n(N::Sub)], pass0);
    g.add(N::Code, &[t(K::FunctionModifier), n(N::Sub)], |mut v, _| {
        let modifier = text(&mut v, 0);
        SemVal::Node(node(&mut v, 1).set_modifier(&modifier))
    });
    g.add(N::Code, &[n(N::Function)], pass0);
    g.add(N::Code, &[t(K::FunctionModifier), n(N::Function)], |mut v, _| {
        let modifier = text(&mut v, 0);
        SemVal::Node(node(&mut v, 1).set_modifier(&modifier))
    });

    g.add(
        N::Sub,
        &[
            t(K::SubStart),
            n(N::Identifier),
            n(N::Params),
            t(K::Terminator),
            n(N::Body),
            t(K::Terminator),
            t(K::SubEnd),
        ],
        |mut v, s| {
            SemVal::Node(Node::Code {
                name: bx(node(&mut v, 1)),
                params: list(&mut v, 2),
                body: bx(node(&mut v, 4)),
                return_type: None,
                modifier: None,
                span: s,
            })
        },
    );

    g.add(
        N::Function,
        &[
            t(K::FunctionStart),
            n(N::Identifier),
            n(N::Params),
            t(K::Terminator),
            n(N::Body),
            t(K::Terminator),
            t(K::FunctionEnd),
        ],
        |mut v, s| {
            SemVal::Node(Node::Code {
                name: bx(node(&mut v, 1)),
                params: list(&mut v, 2),
                body: bx(node(&mut v, 4)),
                return_type: None,
                modifier: None,
                span: s,
            })
        },
    );
    g.add(
        N::Function,
        &[
            t(K::FunctionStart),
            n(N::Identifier),
            n(N::Params),
            n(N::Type),
            t(K::Terminator),
            n(N::Body),
            t(K::Terminator),
            t(K::FunctionEnd),
        ],
        |mut v, s| {
            SemVal::Node(Node::Code {
                name: bx(node(&mut v, 1)),
                params: list(&mut v, 2),
                body: bx(node(&mut v, 5)),
                return_type: Some(ty(&mut v, 3)),
                modifier: None,
                span: s,
            })
        },
    );

    g.add(N::Assignable, &[n(N::SimpleAssignable)], pass0);

    g.add(N::Value, &[n(N::Assignable)], pass0);
    g.add(N::Value, &[n(N::This)], pass0);
    g.add(N::Value, &[n(N::Literal)], |mut v, _| SemVal::Node(node(&mut v, 0).into_value()));

    g.add(N::Accessor, &[t(K::Dot), n(N::Property)], |mut v, s| {
        SemVal::Node(Node::Access { name: bx(node(&mut v, 1)), span: s })
    });

    g.add(N::ParenthesizedInvocation, &[n(N::Value), n(N::ParenthesizedArgs)], |mut v, s| {
        SemVal::Node(Node::CallExpr {
            callee: bx(node(&mut v, 0)),
            args: list(&mut v, 1),
            span: s,
        })
    });

    g.add(N::Invocation, &[n(N::Value), n(N::FirstArg)], |mut v, s| {
        SemVal::Node(Node::CallExpr {
            callee: bx(node(&mut v, 0)),
            args: vec![node(&mut v, 1)],
            span: s,
        })
    });
    g.add(
        N::Invocation,
        &[n(N::Value), n(N::FirstArg), t(K::Comma), n(N::ArgList)],
        |mut v, s| {
            let mut args = vec![node(&mut v, 1)];
            args.extend(list(&mut v, 3));
            SemVal::Node(Node::CallExpr { callee: bx(node(&mut v, 0)), args, span: s })
        },
    );

    g.add(N::Call, &[t(K::Call), n(N::ParenthesizedInvocation)], |mut v, _| {
        SemVal::Node(node(&mut v, 1))
    });

    g.add(N::ParenthesizedArgs, &[t(K::LParen), t(K::RParen)], |_, _| {
        SemVal::List(Vec::new())
    });
    g.add(N::ParenthesizedArgs, &[t(K::LParen), n(N::ArgList), t(K::RParen)], |mut v, _| {
        SemVal::List(list(&mut v, 1))
    });

    g.add(N::ArgList, &[n(N::Arg)], |mut v, _| SemVal::List(vec![node(&mut v, 0)]));
    g.add(N::ArgList, &[n(N::ArgList), t(K::Comma), n(N::Arg)], |mut v, _| {
        let mut args = list(&mut v, 0);
        args.push(node(&mut v, 2));
        SemVal::List(args)
    });

    g.add(N::FirstArg, &[n(N::Value)], pass0);
    g.add(N::FirstArg, &[n(N::NamedArg)], pass0);

    g.add(N::Arg, &[n(N::Expression)], pass0);
    g.add(N::Arg, &[n(N::NamedArg)], pass0);

    g.add(N::NamedArg, &[n(N::Identifier), t(K::AssignArg), n(N::Expression)], |mut v, s| {
        SemVal::Node(Node::NamedArg {
            name: bx(node(&mut v, 0)),
            value: bx(node(&mut v, 2)),
            span: s,
        })
    });

    g.add(N::This, &[t(K::This)], |_, s| {
        SemVal::Node(Node::ThisLit { span: s }.into_value())
    });

    g.add(N::Parenthetical, &[t(K::LParen), n(N::Expression), t(K::RParen)], |mut v, s| {
        SemVal::Node(Node::Parens { body: bx(node(&mut v, 1)), span: s })
    });

    g.add(N::VariableDeclaration, &[t(K::Modifier), n(N::VariableList)], |mut v, s| {
        let modifier = text(&mut v, 0);
        SemVal::Node(Node::VarDeclList { decls: list(&mut v, 1), modifier, span: s })
    });
    g.add(N::VariableDeclaration, &[t(K::Dim), n(N::VariableList)], |mut v, s| {
        let modifier = text(&mut v, 0);
        SemVal::Node(Node::VarDeclList { decls: list(&mut v, 1), modifier, span: s })
    });

    g.add(N::ConstDeclaration, &[t(K::Const), n(N::ConstList)], |mut v, s| {
        SemVal::Node(Node::VarDeclList {
            decls: list(&mut v, 1),
            modifier: "Private".to_string(),
            span: s,
        })
    });
    g.add(N::ConstDeclaration, &[t(K::Modifier), t(K::Const), n(N::ConstList)], |mut v, s| {
        let modifier = text(&mut v, 0);
        SemVal::Node(Node::VarDeclList { decls: list(&mut v, 2), modifier, span: s })
    });

    g.add(N::VariableList, &[n(N::Variable)], |mut v, _| {
        SemVal::List(vec![node(&mut v, 0)])
    });
    g.add(N::VariableList, &[n(N::VariableList), t(K::Comma), n(N::Variable)], |mut v, _| {
        let mut decls = list(&mut v, 0);
        decls.push(node(&mut v, 2));
        SemVal::List(decls)
    });

    g.add(N::ConstList, &[n(N::Const)], |mut v, _| SemVal::List(vec![node(&mut v, 0)]));
    g.add(N::ConstList, &[n(N::ConstList), t(K::Comma), n(N::Const)], |mut v, _| {
        let mut decls = list(&mut v, 0);
        decls.push(node(&mut v, 2));
        SemVal::List(decls)
    });

    g.add(N::Const, &[n(N::Identifier), t(K::Eq), n(N::Expression)], |mut v, s| {
        SemVal::Node(Node::VarDecl {
            name: bx(node(&mut v, 0)),
            ty: TypeRef::variant(),
            init: Some(bx(node(&mut v, 2))),
            span: s,
        })
    });
    g.add(
        N::Const,
        &[n(N::Identifier), n(N::Type), t(K::Eq), n(N::Expression)],
        |mut v, s| {
            SemVal::Node(Node::VarDecl {
                name: bx(node(&mut v, 0)),
                ty: ty(&mut v, 1),
                init: Some(bx(node(&mut v, 3))),
                span: s,
            })
        },
    );

    g.add(N::Variable, &[n(N::Identifier)], |mut v, s| {
        SemVal::Node(Node::VarDecl {
            name: bx(node(&mut v, 0)),
            ty: TypeRef::variant(),
            init: None,
            span: s,
        })
    });
    g.add(N::Variable, &[n(N::Identifier), n(N::Type)], |mut v, s| {
        SemVal::Node(Node::VarDecl {
            name: bx(node(&mut v, 0)),
            ty: ty(&mut v, 1),
            init: None,
            span: s,
        })
    });
    g.add(N::Variable, &[n(N::Identifier), n(N::New)], |mut v, s| {
        SemVal::Node(Node::VarDecl {
            name: bx(node(&mut v, 0)),
            ty: ty(&mut v, 1),
            init: None,
            span: s,
        })
    });

    g.add(N::New, &[t(K::As), t(K::New), t(K::TypeName)], |mut v, _| {
        let mut type_ref = TypeRef::new(text(&mut v, 2));
        type_ref.object = true;
        SemVal::Type(type_ref)
    });

    g.add(N::Type, &[t(K::As), t(K::TypeName)], |mut v, _| {
        SemVal::Type(TypeRef::new(text(&mut v, 1)))
    });
    g.add(N::Type, &[n(N::StringType)], |mut v, _| SemVal::Type(ty(&mut v, 0)));

    g.add(N::StringType, &[t(K::As), t(K::StringType)], |mut v, _| {
        SemVal::Type(TypeRef::new(text(&mut v, 1)))
    });
    g.add(
        N::StringType,
        &[t(K::As), t(K::StringType), t(K::Star), t(K::Number)],
        |mut v, _| {
            let mut type_ref = TypeRef::new(text(&mut v, 1));
            type_ref.size = Some(text(&mut v, 3));
            SemVal::Type(type_ref)
        },
    );

    g.add(
        N::For,
        &[n(N::ForClause), t(K::Terminator), n(N::Body), t(K::Terminator), t(K::Next)],
        |mut v, s| SemVal::Node(for_with_body(node(&mut v, 0), node(&mut v, 2), s)),
    );
    g.add(
        N::For,
        &[
            n(N::ForClause),
            t(K::Terminator),
            n(N::Body),
            t(K::Terminator),
            t(K::Next),
            n(N::Value),
        ],
        |mut v, s| SemVal::Node(for_with_body(node(&mut v, 0), node(&mut v, 2), s)),
    );

    g.add(N::ForClause, &[t(K::For), n(N::Assign), t(K::To), n(N::Value)], |mut v, s| {
        SemVal::Node(Node::For {
            init: bx(node(&mut v, 1)),
            end: bx(node(&mut v, 3)),
            step: None,
            body: bx(empty_block(s)),
            span: s,
        })
    });
    g.add(
        N::ForClause,
        &[t(K::For), n(N::Assign), t(K::To), n(N::Value), t(K::Step), n(N::Value)],
        |mut v, s| {
            SemVal::Node(Node::For {
                init: bx(node(&mut v, 1)),
                end: bx(node(&mut v, 3)),
                step: Some(bx(node(&mut v, 5))),
                body: bx(empty_block(s)),
                span: s,
            })
        },
    );

    g.add(
        N::Wend,
        &[
            t(K::While),
            n(N::Expression),
            t(K::Terminator),
            n(N::Body),
            t(K::Terminator),
            t(K::Wend),
        ],
        |mut v, s| {
            SemVal::Node(Node::While {
                condition: bx(node(&mut v, 1)),
                body: bx(node(&mut v, 3)),
                post: false,
                span: s,
            })
        },
    );

    g.add(
        N::PostWhile,
        &[t(K::Do), t(K::Terminator), n(N::WhileBody), t(K::While), n(N::Expression)],
        |mut v, s| {
            SemVal::Node(Node::While {
                condition: bx(node(&mut v, 4)),
                body: bx(node(&mut v, 2)),
                post: true,
                span: s,
            })
        },
    );
    g.add(
        N::PostWhile,
        &[t(K::Do), t(K::Terminator), n(N::WhileBody), t(K::Until), n(N::Expression)],
        |mut v, s| {
            SemVal::Node(Node::While {
                condition: bx(node(&mut v, 4).invert()),
                body: bx(node(&mut v, 2)),
                post: true,
                span: s,
            })
        },
    );

    g.add(
        N::PreWhile,
        &[t(K::Do), t(K::While), n(N::Expression), t(K::Terminator), n(N::WhileBody)],
        |mut v, s| {
            SemVal::Node(Node::While {
                condition: bx(node(&mut v, 2)),
                body: bx(node(&mut v, 4)),
                post: false,
                span: s,
            })
        },
    );
    g.add(
        N::PreWhile,
        &[t(K::Do), t(K::Until), n(N::Expression), t(K::Terminator), n(N::WhileBody)],
        |mut v, s| {
            SemVal::Node(Node::While {
                condition: bx(node(&mut v, 2).invert()),
                body: bx(node(&mut v, 4)),
                post: false,
                span: s,
            })
        },
    );

    g.add(N::WhileBody, &[n(N::Body), t(K::Terminator), t(K::Loop)], |mut v, _| {
        SemVal::Node(node(&mut v, 0))
    });

    g.add(
        N::Switch,
        &[
            t(K::SelectStart),
            n(N::Expression),
            t(K::Terminator),
            n(N::SwitchCaseList),
            t(K::SelectEnd),
        ],
        |mut v, s| {
            SemVal::Node(Node::Switch {
                subject: bx(node(&mut v, 1)),
                cases: list(&mut v, 3),
                span: s,
            })
        },
    );
    g.add(
        N::Switch,
        &[
            t(K::SelectStart),
            n(N::Expression),
            t(K::Terminator),
            n(N::DefaultSwitchCaseList),
            t(K::SelectEnd),
        ],
        |mut v, s| {
            SemVal::Node(Node::Switch {
                subject: bx(node(&mut v, 1)),
                cases: list(&mut v, 3),
                span: s,
            })
        },
    );

    g.add(
        N::DefaultSwitchCaseList,
        &[
            n(N::SwitchCaseList),
            t(K::DefaultCase),
            t(K::Terminator),
            n(N::Body),
            t(K::Terminator),
        ],
        |mut v, s| {
            let mut cases = list(&mut v, 0);
            cases.push(Node::Case { tests: Vec::new(), body: bx(node(&mut v, 3)), span: s });
            SemVal::List(cases)
        },
    );

    g.add(N::SwitchCaseList, &[n(N::SwitchCase)], |mut v, _| {
        SemVal::List(vec![node(&mut v, 0)])
    });
    g.add(N::SwitchCaseList, &[n(N::SwitchCaseList), n(N::SwitchCase)], |mut v, _| {
        let mut cases = list(&mut v, 0);
        cases.push(node(&mut v, 1));
        SemVal::List(cases)
    });

    g.add(
        N::SwitchCase,
        &[t(K::Case), n(N::CaseExpressions), t(K::Terminator), n(N::Body), t(K::Terminator)],
        |mut v, s| {
            SemVal::Node(Node::Case {
                tests: list(&mut v, 1),
                body: bx(node(&mut v, 3)),
                span: s,
            })
        },
    );

    g.add(N::CaseExpressions, &[n(N::Expression)], |mut v, _| {
        SemVal::List(vec![node(&mut v, 0)])
    });
    g.add(
        N::CaseExpressions,
        &[n(N::CaseExpressions), t(K::Comma), n(N::Expression)],
        |mut v, _| {
            let mut tests = list(&mut v, 0);
            tests.push(node(&mut v, 2));
            SemVal::List(tests)
        },
    );

    g.add(N::If, &[n(N::IfLine)], pass0);
    g.add(N::If, &[n(N::IfBlock)], pass0);

    g.add(N::IfLine, &[t(K::If), n(N::IfLineClause)], |mut v, _| {
        SemVal::Node(node(&mut v, 1))
    });
    g.add(N::IfLine, &[t(K::If), n(N::IfLineClause), t(K::Else), n(N::Line)], |mut v, _| {
        let clause = node(&mut v, 1);
        let alt = node(&mut v, 3);
        SemVal::Node(clause.add_else(alt))
    });

    g.add(N::IfBlock, &[t(K::If), n(N::IfBlockClause), t(K::IfEnd)], |mut v, _| {
        SemVal::Node(node(&mut v, 1))
    });
    g.add(N::IfBlock, &[t(K::If), n(N::IfBlockClause), n(N::ElseIf), t(K::IfEnd)], |mut v, _| {
        let clause = node(&mut v, 1);
        let chain = node(&mut v, 2);
        SemVal::Node(clause.add_else(chain))
    });
    g.add(
        N::IfBlock,
        &[
            t(K::If),
            n(N::IfBlockClause),
            n(N::ElseIf),
            t(K::Else),
            t(K::Terminator),
            n(N::Body),
            t(K::Terminator),
            t(K::IfEnd),
        ],
        |mut v, _| {
            let clause = node(&mut v, 1);
            let chain = node(&mut v, 2);
            let alt = node(&mut v, 5);
            SemVal::Node(clause.add_else(chain).add_else(alt))
        },
    );
    g.add(
        N::IfBlock,
        &[
            t(K::If),
            n(N::IfBlockClause),
            t(K::Else),
            t(K::Terminator),
            n(N::Body),
            t(K::Terminator),
            t(K::IfEnd),
        ],
        |mut v, _| {
            let clause = node(&mut v, 1);
            let alt = node(&mut v, 4);
            SemVal::Node(clause.add_else(alt))
        },
    );

    g.add(N::IfLineClause, &[n(N::Expression), t(K::Then), n(N::Line)], |mut v, s| {
        let body_span = v[2].span_hint().unwrap_or(s);
        SemVal::Node(Node::If {
            condition: bx(node(&mut v, 0)),
            body: bx(Node::wrap(vec![node(&mut v, 2)], body_span)),
            else_body: None,
            is_chain: false,
            span: s,
        })
    });

    g.add(
        N::IfBlockClause,
        &[n(N::Expression), t(K::Then), t(K::Terminator), n(N::Body), t(K::Terminator)],
        |mut v, s| {
            SemVal::Node(Node::If {
                condition: bx(node(&mut v, 0)),
                body: bx(node(&mut v, 3)),
                else_body: None,
                is_chain: false,
                span: s,
            })
        },
    );

    g.add(N::ElseIf, &[t(K::ElseIf), n(N::IfBlockClause)], |mut v, _| {
        SemVal::Node(node(&mut v, 1))
    });
    g.add(N::ElseIf, &[n(N::ElseIf), t(K::ElseIf), n(N::IfBlockClause)], |mut v, _| {
        let chain = node(&mut v, 0);
        let clause = node(&mut v, 2);
        SemVal::Node(chain.add_else(clause))
    });

    g.add(
        N::With,
        &[
            t(K::With),
            n(N::Value),
            t(K::Terminator),
            n(N::Body),
            t(K::Terminator),
            t(K::WithEnd),
        ],
        |mut v, s| {
            SemVal::Node(Node::With {
                object: bx(node(&mut v, 1)),
                body: bx(node(&mut v, 3)),
                span: s,
            })
        },
    );

    binary_op(&mut g, K::Amp, "+");
    binary_op(&mut g, K::Plus, "+");
    binary_op(&mut g, K::Minus, "-");
    binary_op(&mut g, K::ModOp, "%");
    binary_op(&mut g, K::Backslash, "/");
    binary_op(&mut g, K::Star, "*");
    binary_op(&mut g, K::Slash, "/");
    binary_op(&mut g, K::Caret, "**");
    g.add(
        N::Operation,
        &[n(N::Expression), t(K::Compare), n(N::Expression)],
        |mut v, s| {
            SemVal::Node(Node::Op {
                op: text(&mut v, 1),
                lhs: bx(node(&mut v, 0)),
                rhs: Some(bx(node(&mut v, 2))),
                span: s,
            })
        },
    );
    g.add(
        N::Operation,
        &[n(N::Expression), t(K::Logical), n(N::Expression)],
        |mut v, s| {
            SemVal::Node(Node::Op {
                op: text(&mut v, 1),
                lhs: bx(node(&mut v, 0)),
                rhs: Some(bx(node(&mut v, 2))),
                span: s,
            })
        },
    );
    g.add(N::Operation, &[t(K::Unary), n(N::Expression)], |mut v, s| {
        SemVal::Node(Node::Op {
            op: text(&mut v, 0),
            lhs: bx(node(&mut v, 1)),
            rhs: None,
            span: s,
        })
    });
    g.add_prec(
        N::Operation,
        &[t(K::Minus), n(N::Expression)],
        K::UnaryMinus,
        |mut v, s| {
            SemVal::Node(Node::Op {
                op: "-".to_string(),
                lhs: bx(node(&mut v, 1)),
                rhs: None,
                span: s,
            })
        },
    );

    g
}

fn pass0(mut v: Vec<SemVal>, _span: Span) -> SemVal {
    SemVal::Node(node(&mut v, 0))
}

fn for_with_body(clause: Node, body: Node, span: Span) -> Node {
    match clause {
        Node::For { init, end, step, .. } => {
            Node::For { init, end, step, body: Box::new(body), span }
        }
        _ => unreachable!("for clause is always a for node"),
    }
}

fn binary_op(g: &mut Grammar, op: TokenKind, rendered: &'static str) {
    let action: Action = match rendered {
        "+" => |mut v, s| binary("+", &mut v, s),
        "-" => |mut v, s| binary("-", &mut v, s),
        "%" => |mut v, s| binary("%", &mut v, s),
        "/" => |mut v, s| binary("/", &mut v, s),
        "*" => |mut v, s| binary("*", &mut v, s),
        "**" => |mut v, s| binary("**", &mut v, s),
        _ => unreachable!("unmapped binary operator"),
    };
    g.add(Nt::Operation, &[Sym::N(Nt::Expression), Sym::T(op), Sym::N(Nt::Expression)], action);
}

fn binary(op: &str, v: &mut Vec<SemVal>, span: Span) -> SemVal {
    SemVal::Node(Node::Op {
        op: op.to_string(),
        lhs: Box::new(node(v, 0)),
        rhs: Some(Box::new(node(v, 2))),
        span,
    })
}

impl SemVal {
    fn span_hint(&self) -> Option<Span> {
        match self {
            SemVal::Node(node) => Some(node.span()),
            SemVal::Token(token) => Some(token.span),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_precedence_uses_rightmost_terminal() {
        let g = &*GRAMMAR;
        let plus = g
            .rules
            .iter()
            .find(|r| {
                r.lhs == Nt::Operation && r.rhs.contains(&Sym::T(TokenKind::Plus)) && r.rhs.len() == 3
            })
            .unwrap();
        assert_eq!(g.rule_precedence(plus), Some((5, Assoc::Left)));
    }

    #[test]
    fn test_unary_minus_overrides_precedence() {
        let g = &*GRAMMAR;
        let unary = g
            .rules
            .iter()
            .find(|r| r.lhs == Nt::Operation && r.rhs.len() == 2 && r.rhs[0] == Sym::T(TokenKind::Minus))
            .unwrap();
        assert_eq!(g.rule_precedence(unary), Some((10, Assoc::Right)));
    }

    #[test]
    fn test_rules_start_with_augmented_production() {
        let g = &*GRAMMAR;
        assert_eq!(g.rules[0].lhs, Nt::Start);
        assert_eq!(g.rules[0].rhs, vec![Sym::N(Nt::Root)]);
    }
}
