//! AST node types.
//!
//! The tree is one closed enum. Every construct the grammar can
//! produce is a variant here, and the code generator matches on it
//! exhaustively, so adding a construct without handling its output is
//! a compile error.

use crate::span::Span;

/// A declared type, as written after `As`.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeRef {
    pub name: String,
    /// `As New T`
    pub object: bool,
    /// Fixed-length string size: `As String * 8`
    pub size: Option<String>,
}

impl TypeRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), object: false, size: None }
    }

    pub fn variant() -> Self {
        Self::new("Variant")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    // Leaves
    StringLit { value: String, span: Span },
    NumberLit { value: String, span: Span },
    /// Stored lowercased; renders as `true` / `false`.
    BoolLit { value: String, span: Span },
    /// `Nothing` and skipped argument slots.
    UndefinedLit { span: Span },
    /// Implicit receiver of a leading `.` inside `With`.
    ThisLit { span: Span },
    Ident { name: String, span: Span },
    PropName { name: String, span: Span },

    // Values
    /// A base with zero or more property accesses chained onto it.
    Value { base: Box<Node>, props: Vec<Node>, span: Span },
    Access { name: Box<Node>, span: Span },
    Parens { body: Box<Node>, span: Span },
    Op { op: String, lhs: Box<Node>, rhs: Option<Box<Node>>, span: Span },
    Assign { target: Box<Node>, value: Box<Node>, span: Span },
    NamedArg { name: Box<Node>, value: Box<Node>, span: Span },
    CallExpr { callee: Box<Node>, args: Vec<Node>, span: Span },

    // Declarations
    VarDecl { name: Box<Node>, ty: TypeRef, init: Option<Box<Node>>, span: Span },
    VarDeclList { decls: Vec<Node>, modifier: String, span: Span },
    Param {
        name: Box<Node>,
        ty: TypeRef,
        default: Option<Box<Node>>,
        modifier: Option<String>,
        /// `ParamArray`: collects the remaining arguments.
        rest: bool,
        span: Span,
    },
    Code {
        name: Box<Node>,
        params: Vec<Node>,
        body: Box<Node>,
        return_type: Option<TypeRef>,
        modifier: Option<String>,
        span: Span,
    },

    // Statements
    Block { body: Vec<Node>, span: Span },
    If {
        condition: Box<Node>,
        body: Box<Node>,
        else_body: Option<Box<Node>>,
        /// The else slot holds another `If` that later elses chain
        /// into.
        is_chain: bool,
        span: Span,
    },
    While { condition: Box<Node>, body: Box<Node>, post: bool, span: Span },
    For {
        init: Box<Node>,
        end: Box<Node>,
        step: Option<Box<Node>>,
        body: Box<Node>,
        span: Span,
    },
    Switch { subject: Box<Node>, cases: Vec<Node>, span: Span },
    Case { tests: Vec<Node>, body: Box<Node>, span: Span },
    With { object: Box<Node>, body: Box<Node>, span: Span },
    Return { span: Span },
    Break { span: Span },

    Root { body: Box<Node>, span: Span },
}

impl Node {
    pub fn span(&self) -> Span {
        match self {
            Node::StringLit { span, .. }
            | Node::NumberLit { span, .. }
            | Node::BoolLit { span, .. }
            | Node::UndefinedLit { span }
            | Node::ThisLit { span }
            | Node::Ident { span, .. }
            | Node::PropName { span, .. }
            | Node::Value { span, .. }
            | Node::Access { span, .. }
            | Node::Parens { span, .. }
            | Node::Op { span, .. }
            | Node::Assign { span, .. }
            | Node::NamedArg { span, .. }
            | Node::CallExpr { span, .. }
            | Node::VarDecl { span, .. }
            | Node::VarDeclList { span, .. }
            | Node::Param { span, .. }
            | Node::Code { span, .. }
            | Node::Block { span, .. }
            | Node::If { span, .. }
            | Node::While { span, .. }
            | Node::For { span, .. }
            | Node::Switch { span, .. }
            | Node::Case { span, .. }
            | Node::With { span, .. }
            | Node::Return { span }
            | Node::Break { span }
            | Node::Root { span, .. } => *span,
        }
    }

    /// Wrap statements in a block, splicing any nested blocks so the
    /// statement list stays flat.
    pub fn wrap(nodes: Vec<Node>, span: Span) -> Node {
        let mut body = Vec::with_capacity(nodes.len());
        for node in nodes {
            match node {
                Node::Block { body: inner, .. } => body.extend(inner),
                other => body.push(other),
            }
        }
        Node::Block { body, span }
    }

    /// Wrap a value in `Value` unless it already is one.
    pub fn into_value(self) -> Node {
        match self {
            value @ Node::Value { .. } => value,
            base => {
                let span = base.span();
                Node::Value { base: Box::new(base), props: Vec::new(), span }
            }
        }
    }

    /// Chain a property access onto a value.
    pub fn add_access(self, access: Node) -> Node {
        match self {
            Node::Value { base, mut props, span } => {
                let span = span.merge(access.span());
                props.push(access);
                Node::Value { base, props, span }
            }
            other => {
                let span = other.span().merge(access.span());
                Node::Value { base: Box::new(other), props: vec![access], span }
            }
        }
    }

    /// Logical negation, used for `Until` conditions.
    pub fn invert(self) -> Node {
        let span = self.span();
        Node::Op { op: "!".into(), lhs: Box::new(self), rhs: None, span }
    }

    /// Attach an else arm to an `If`, following chains of `ElseIf`
    /// arms down to the last one that has no else yet.
    pub fn add_else(self, else_body: Node) -> Node {
        match self {
            Node::If { condition, body, else_body: existing, is_chain, span } => {
                if is_chain {
                    let chained = match existing {
                        Some(inner) => inner.add_else(else_body),
                        None => else_body,
                    };
                    Node::If {
                        condition,
                        body,
                        else_body: Some(Box::new(chained)),
                        is_chain: true,
                        span,
                    }
                } else {
                    let is_chain = matches!(else_body, Node::If { .. });
                    Node::If {
                        condition,
                        body,
                        else_body: Some(Box::new(else_body)),
                        is_chain,
                        span,
                    }
                }
            }
            other => other,
        }
    }

    /// Attach a visibility or parameter modifier. No-op on nodes that
    /// carry neither.
    pub fn set_modifier(self, value: &str) -> Node {
        match self {
            Node::Code { name, params, body, return_type, span, .. } => Node::Code {
                name,
                params,
                body,
                return_type,
                modifier: Some(value.to_string()),
                span,
            },
            Node::Param { name, ty, default, rest, span, .. } => Node::Param {
                name,
                ty,
                default,
                modifier: Some(value.to_string()),
                rest,
                span,
            },
            other => other,
        }
    }

    /// Identifier name of a value's base, when it has one.
    pub fn base_name(&self) -> Option<&str> {
        match self {
            Node::Value { base, .. } => base.base_name(),
            Node::Ident { name, .. } => Some(name),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str) -> Node {
        Node::Ident { name: name.into(), span: Span::default() }
    }

    fn simple_if(cond: Node) -> Node {
        Node::If {
            condition: Box::new(cond),
            body: Box::new(Node::Block { body: vec![], span: Span::default() }),
            else_body: None,
            is_chain: false,
            span: Span::default(),
        }
    }

    #[test]
    fn test_wrap_flattens_nested_blocks() {
        let inner = Node::wrap(vec![ident("a"), ident("b")], Span::default());
        let outer = Node::wrap(vec![inner, ident("c")], Span::default());
        match outer {
            Node::Block { body, .. } => assert_eq!(body.len(), 3),
            _ => panic!("expected block"),
        }
    }

    #[test]
    fn test_add_else_chains_through_elseif() {
        let chain = simple_if(ident("a")).add_else(simple_if(ident("b")));
        let done = chain.add_else(ident("c"));
        match done {
            Node::If { else_body: Some(inner), is_chain, .. } => {
                assert!(is_chain);
                match *inner {
                    Node::If { else_body: Some(tail), .. } => {
                        assert!(matches!(*tail, Node::Ident { .. }));
                    }
                    _ => panic!("expected nested if"),
                }
            }
            _ => panic!("expected if with else"),
        }
    }

    #[test]
    fn test_add_access_extends_value() {
        let value = ident("obj").into_value().add_access(Node::Access {
            name: Box::new(Node::PropName { name: "Width".into(), span: Span::default() }),
            span: Span::default(),
        });
        match value {
            Node::Value { props, .. } => assert_eq!(props.len(), 1),
            _ => panic!("expected value"),
        }
    }

    #[test]
    fn test_base_name() {
        assert_eq!(ident("x").into_value().base_name(), Some("x"));
        assert_eq!(
            Node::NumberLit { value: "1".into(), span: Span::default() }.into_value().base_name(),
            None
        );
    }
}
