//! Code generation.
//!
//! Walks the tree and emits target source as flat fragment lists.
//! Declarations never emit in place: they register names in the
//! current scope, and each function (and the root program) renders one
//! `var` statement up front with everything the scope collected. An
//! assignment in statement position folds into that `var` statement
//! when it is the first assignment to a still-unassigned local, which
//! is what turns `Dim x` plus `x = 5` into `var x = 5;`.

use rustc_hash::FxHashSet;

use crate::error::CompileError;
use crate::nodes::Node;
use crate::scope::{Scope, VarKind};
use crate::span::Span;

/// Recursion limit for tree walks. Deeply nested expressions fail with
/// a codegen error instead of blowing the stack.
pub const MAX_DEPTH: usize = 512;

/// Runtime helper for calls that use named arguments. Emitted into
/// the program prelude only when at least one call site needs it. The
/// parameter-name list comes from the procedure's declaration, so
/// binding never inspects the function object itself.
const RUNTIME_BINDER: &str = "\
function handleNamedArgs(fn, names, args) {
  var bound = [];
  Object.keys(args).forEach(function (key) {
    var index = /^\\d+$/.test(key) ? Number(key) : names.indexOf(key);
    bound[index] = args[key];
  });
  return fn.apply(null, bound);
}
";

type Fragments = Vec<String>;

/// Generate target source for a parsed program. `referenced` is the
/// identifier list the lexer collected; synthesized temporaries avoid
/// colliding with it.
pub fn generate(root: &Node, referenced: &[String]) -> Result<String, CompileError> {
    let mut ctx = Ctx::new(referenced);
    match root {
        Node::Root { body, .. } => ctx.compile_root(body),
        other => ctx.compile(other).map(|f| f.concat()),
    }
}

struct Ctx {
    scopes: Vec<Scope>,
    referenced: FxHashSet<String>,
    depth: usize,
    uses_binder: bool,
}

impl Ctx {
    fn new(referenced: &[String]) -> Self {
        Self {
            scopes: Vec::new(),
            referenced: referenced.iter().cloned().collect(),
            depth: 0,
            uses_binder: false,
        }
    }

    fn scope_mut(&mut self) -> &mut Scope {
        match self.scopes.last_mut() {
            Some(scope) => scope,
            None => unreachable!("no active scope"),
        }
    }

    /// Look a name up through the scope chain, innermost first.
    fn find_kind(&self, name: &str) -> Option<VarKind> {
        self.scopes.iter().rev().find_map(|s| s.find_local(name).map(|v| v.kind))
    }

    fn find_params(&self, name: &str) -> Option<Vec<String>> {
        self.scopes.iter().rev().find_map(|s| {
            s.find_local(name)
                .filter(|v| v.kind == VarKind::Function)
                .map(|v| v.params.clone())
        })
    }

    /// A fresh name: `prefix1`, `prefix2`, ... skipping everything the
    /// source references or any scope declares.
    fn free_variable(&mut self, prefix: &str) -> String {
        let mut index = 0usize;
        loop {
            index += 1;
            let candidate = format!("{prefix}{index}");
            if !self.referenced.contains(&candidate) && self.find_kind(&candidate).is_none() {
                self.referenced.insert(candidate.clone());
                return candidate;
            }
        }
    }

    fn compile_root(&mut self, body: &Node) -> Result<String, CompileError> {
        self.scopes.push(Scope::new());
        let statements = self.compile_statements(body, true)?;
        let scope = match self.scopes.pop() {
            Some(scope) => scope,
            None => unreachable!("root scope missing"),
        };

        let mut out = String::from("(function () {\n");
        if self.uses_binder {
            out.push_str(RUNTIME_BINDER);
        }
        out.push_str(&render_declarations(&scope));
        out.push_str(&statements.join("\n"));
        out.push_str("\n})();\n");
        Ok(out)
    }

    /// Compile a block's statements, each to one rendered string.
    /// Declaration lists and folded assignments render to nothing and
    /// are dropped. `fold` is true only for function and root bodies;
    /// folding inside a conditional body would hoist the assignment
    /// out of its branch.
    fn compile_statements(&mut self, block: &Node, fold: bool) -> Result<Vec<String>, CompileError> {
        let body: &[Node] = match block {
            Node::Block { body, .. } => body,
            other => std::slice::from_ref(other),
        };

        // Procedure names are visible before their definition, the
        // way function declarations hoist in the target language.
        for statement in body {
            if let Node::Code { name, params, .. } = statement {
                if let (Some(name), Some(params)) = (name.base_name(), param_names(params)) {
                    let name = name.to_string();
                    self.scope_mut().add_function(&name, params);
                }
            }
        }

        let mut rendered = Vec::with_capacity(body.len());
        for statement in body {
            let fragments = match statement {
                Node::Assign { target, value, span } if fold => {
                    self.compile_assign(target, value, *span, true)?
                }
                other => self.compile(other)?,
            };
            if !fragments.is_empty() {
                rendered.push(fragments.concat());
            }
        }
        Ok(rendered)
    }

    fn compile(&mut self, node: &Node) -> Result<Fragments, CompileError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            self.depth -= 1;
            return Err(CompileError::Codegen {
                message: "expression nesting too deep".to_string(),
                span: node.span(),
            });
        }
        let result = self.compile_inner(node);
        self.depth -= 1;
        result
    }

    fn compile_inner(&mut self, node: &Node) -> Result<Fragments, CompileError> {
        Ok(match node {
            Node::StringLit { value, .. }
            | Node::NumberLit { value, .. }
            | Node::BoolLit { value, .. } => vec![value.clone()],
            Node::UndefinedLit { .. } => vec!["undefined".to_string()],
            Node::ThisLit { .. } => vec!["this".to_string()],
            Node::Ident { name, .. } | Node::PropName { name, .. } => vec![name.clone()],

            Node::Value { base, props, .. } => {
                let mut fragments = self.compile(base)?;
                for prop in props {
                    fragments.extend(self.compile(prop)?);
                }
                fragments
            }
            Node::Access { name, .. } => {
                let mut fragments = vec![".".to_string()];
                fragments.extend(self.compile(name)?);
                fragments
            }
            Node::Parens { body, .. } => {
                let mut fragments = vec!["(".to_string()];
                fragments.extend(self.compile(body)?);
                fragments.push(")".to_string());
                fragments
            }
            Node::Op { op, lhs, rhs, span } => self.compile_op(op, lhs, rhs.as_deref(), *span)?,
            Node::Assign { target, value, span } => {
                self.compile_assign(target, value, *span, false)?
            }
            Node::NamedArg { name, value, .. } => {
                let mut fragments = self.compile(name)?;
                fragments.push(":".to_string());
                fragments.extend(self.compile(value)?);
                fragments
            }
            Node::CallExpr { callee, args, span } => self.compile_call(callee, args, *span)?,

            Node::VarDecl { .. } => {
                self.declare(node)?;
                Vec::new()
            }
            Node::VarDeclList { decls, .. } => {
                for decl in decls {
                    self.declare(decl)?;
                }
                Vec::new()
            }
            Node::Param { .. } => self.render_param(node)?,
            Node::Code { .. } => self.compile_code(node)?,

            Node::Block { .. } => {
                let statements = self.compile_statements(node, false)?;
                vec![statements.join("\n")]
            }
            Node::If { .. } => self.compile_if(node)?,
            Node::While { condition, body, post, .. } => {
                let condition = self.compile(condition)?.concat();
                let body = self.compile_statements(body, false)?.join("\n");
                if *post {
                    vec![format!("do{{\n{body}\n}}while ({condition})")]
                } else {
                    vec![format!("while ({condition}){{\n{body}\n}}")]
                }
            }
            Node::For { .. } => self.compile_for(node)?,
            Node::Switch { subject, cases, .. } => {
                let subject = self.compile(subject)?.concat();
                let mut out = format!("switch ({subject}) {{\n");
                for case in cases {
                    out.push_str(&self.compile(case)?.concat());
                }
                out.push('}');
                vec![out]
            }
            Node::Case { tests, body, .. } => {
                let mut lines = Vec::with_capacity(tests.len().max(1));
                for test in tests {
                    lines.push(format!("case {}:", self.compile(test)?.concat()));
                }
                if tests.is_empty() {
                    lines.push("default:".to_string());
                }
                let body = self.compile_statements(body, false)?.join("\n");
                lines.push(body);
                lines.push("break;\n".to_string());
                vec![lines.join("\n")]
            }
            Node::With { object, body, .. } => {
                let object = self.compile(object)?.concat();
                let body = self.compile_statements(body, false)?.join("\n");
                vec![format!("(function () {{\n{body}\n}}).call({object});")]
            }
            Node::Return { .. } => vec!["return ret;".to_string()],
            Node::Break { .. } => vec!["break;".to_string()],

            Node::Root { body, .. } => vec![self.compile_root(body)?],
        })
    }

    fn compile_op(
        &mut self,
        op: &str,
        lhs: &Node,
        rhs: Option<&Node>,
        span: Span,
    ) -> Result<Fragments, CompileError> {
        let rendered = match op {
            "<>" | "><" => "!==".to_string(),
            _ => match op.to_ascii_lowercase().as_str() {
                "or" => "|".to_string(),
                "xor" => "^".to_string(),
                "and" => "&".to_string(),
                "not" => "~".to_string(),
                "imp" | "eqv" => {
                    return Err(CompileError::Codegen {
                        message: format!("operator `{op}` has no target equivalent"),
                        span,
                    });
                }
                _ => op.to_string(),
            },
        };

        let lhs = self.compile(lhs)?;
        let mut fragments = vec!["(".to_string()];
        match rhs {
            Some(rhs) => {
                fragments.extend(lhs);
                fragments.push(rendered);
                fragments.extend(self.compile(rhs)?);
            }
            None => {
                fragments.push(rendered);
                fragments.extend(lhs);
            }
        }
        fragments.push(")".to_string());
        Ok(fragments)
    }

    fn compile_assign(
        &mut self,
        target: &Node,
        value: &Node,
        _span: Span,
        fold: bool,
    ) -> Result<Fragments, CompileError> {
        let value_fragments = self.compile(value)?;

        if let Some(name) = simple_target(target) {
            let name = name.to_string();
            if self.find_kind(&name).is_none() {
                self.scope_mut().add(&name, "Variant", None, VarKind::Variable);
            }

            if fold {
                let foldable = self
                    .scopes
                    .last()
                    .and_then(|s| s.find_local(&name))
                    .map(|v| v.kind == VarKind::Variable && !v.assigned)
                    .unwrap_or(false);
                if foldable {
                    let rendered = value_fragments.concat();
                    self.scope_mut().record_assignment(&name, rendered);
                    return Ok(Vec::new());
                }
            }

            if self.find_kind(&name) == Some(VarKind::Function) {
                let mut fragments = vec!["ret".to_string(), "=".to_string()];
                fragments.extend(value_fragments);
                return Ok(fragments);
            }
        }

        let mut fragments = self.compile(target)?;
        fragments.push("=".to_string());
        fragments.extend(value_fragments);
        Ok(fragments)
    }

    fn compile_call(
        &mut self,
        callee: &Node,
        args: &[Node],
        span: Span,
    ) -> Result<Fragments, CompileError> {
        let has_named = args.iter().any(|a| matches!(a, Node::NamedArg { .. }));

        if !has_named {
            let mut fragments = self.compile(callee)?;
            fragments.push("(".to_string());
            for (index, arg) in args.iter().enumerate() {
                if index > 0 {
                    fragments.push(", ".to_string());
                }
                fragments.extend(self.compile(arg)?);
            }
            fragments.push(")".to_string());
            return Ok(fragments);
        }

        let params = simple_target(callee).and_then(|name| {
            self.find_params(name).map(|params| (name.to_string(), params))
        });
        let (name, params) = match params {
            Some(found) => found,
            None => {
                return Err(CompileError::Codegen {
                    message: "named arguments require a procedure declared in scope".to_string(),
                    span,
                });
            }
        };
        self.uses_binder = true;

        let names = params.iter().map(|p| format!("\"{p}\"")).collect::<Vec<_>>().join(", ");
        let mut entries = Vec::with_capacity(args.len());
        for (index, arg) in args.iter().enumerate() {
            match arg {
                Node::NamedArg { .. } => entries.push(self.compile(arg)?.concat()),
                other => entries.push(format!("{index}:{}", self.compile(other)?.concat())),
            }
        }

        Ok(vec![format!("handleNamedArgs({name}, [{names}], {{{}}})", entries.join(", "))])
    }

    fn compile_code(&mut self, node: &Node) -> Result<Fragments, CompileError> {
        let (name, params, body) = match node {
            Node::Code { name, params, body, .. } => (name, params, body),
            _ => unreachable!("compile_code on a non-code node"),
        };
        let fn_name = match name.base_name() {
            Some(fn_name) => fn_name.to_string(),
            None => unreachable!("procedure name is always an identifier"),
        };
        let param_list = match param_names(params) {
            Some(param_list) => param_list,
            None => unreachable!("parameter names are always identifiers"),
        };
        self.scope_mut().add_function(&fn_name, param_list);

        self.scopes.push(Scope::new());
        self.scope_mut().add("ret", "Variant", None, VarKind::Variable);

        let mut rendered_params = Vec::with_capacity(params.len());
        for param in params {
            self.declare_param(param)?;
            rendered_params.push(self.render_param(param)?.concat());
        }

        let mut statements = self.compile_statements(body, true)?;
        statements.push("return ret;".to_string());

        let scope = match self.scopes.pop() {
            Some(scope) => scope,
            None => unreachable!("function scope missing"),
        };
        let declarations = render_declarations(&scope);

        Ok(vec![format!(
            "function {fn_name}({}) {{\n{declarations}{}\n}}",
            rendered_params.join(", "),
            statements.join("\n"),
        )])
    }

    fn declare_param(&mut self, param: &Node) -> Result<(), CompileError> {
        if let Node::Param { name, ty, default, .. } = param {
            let value = match default {
                Some(default) => Some(self.compile(default)?.concat()),
                None => None,
            };
            if let Some(name) = name.base_name() {
                let name = name.to_string();
                let ty = ty.name.clone();
                self.scope_mut().add(&name, &ty, value, VarKind::Parameter);
            }
        }
        Ok(())
    }

    fn render_param(&mut self, param: &Node) -> Result<Fragments, CompileError> {
        if let Node::Param { name, default, rest, .. } = param {
            let mut fragments = Vec::new();
            if *rest {
                fragments.push("...".to_string());
            }
            fragments.extend(self.compile(name)?);
            if let Some(default) = default {
                fragments.push("=".to_string());
                fragments.extend(self.compile(default)?);
            }
            return Ok(fragments);
        }
        Ok(Vec::new())
    }

    fn declare(&mut self, decl: &Node) -> Result<(), CompileError> {
        if let Node::VarDecl { name, ty, init, .. } = decl {
            let value = match init {
                Some(init) => Some(self.compile(init)?.concat()),
                None => None,
            };
            if let Some(name) = name.base_name() {
                let name = name.to_string();
                let ty = ty.name.clone();
                self.scope_mut().add(&name, &ty, value, VarKind::Variable);
            }
        }
        Ok(())
    }

    fn compile_if(&mut self, node: &Node) -> Result<Fragments, CompileError> {
        let (condition, body, else_body, is_chain) = match node {
            Node::If { condition, body, else_body, is_chain, .. } => {
                (condition, body, else_body, *is_chain)
            }
            _ => unreachable!("compile_if on a non-if node"),
        };

        let condition = self.compile(condition)?.concat();
        let body = self.compile_statements(body, false)?.join("\n");
        let mut out = format!("if ({condition}) {{\n{body}\n}}");

        if let Some(else_body) = else_body {
            out.push_str(" else ");
            if is_chain {
                out.push_str(&self.compile(else_body)?.concat());
            } else {
                let rendered = match else_body.as_ref() {
                    block @ Node::Block { .. } => {
                        self.compile_statements(block, false)?.join("\n")
                    }
                    other => self.compile(other)?.concat(),
                };
                out.push_str(&format!("{{\n{rendered}\n}}"));
            }
        }

        Ok(vec![out])
    }

    fn compile_for(&mut self, node: &Node) -> Result<Fragments, CompileError> {
        let (init, end, step, body, span) = match node {
            Node::For { init, end, step, body, span } => (init, end, step, body, *span),
            _ => unreachable!("compile_for on a non-for node"),
        };
        let counter = match init.as_ref() {
            Node::Assign { target, .. } => target,
            _ => {
                return Err(CompileError::Codegen {
                    message: "malformed loop header".to_string(),
                    span,
                });
            }
        };

        let init = self.compile(init)?.concat();
        let bound = self.free_variable("end");
        self.scope_mut().add(&bound, "Variant", None, VarKind::Variable);
        let end = self.compile(end)?.concat();
        let counter = self.compile(counter)?.concat();
        let step = match step {
            Some(step) => self.compile(step)?.concat(),
            None => "1".to_string(),
        };
        let body = self.compile_statements(body, false)?.join("\n");

        Ok(vec![format!(
            "for ({init}, {bound}={end}; {counter} < {bound}; {counter} += {step}) {{\n{body}\n}}"
        )])
    }
}

/// Name of a plain identifier target: a `Value` with no property
/// accesses whose base is an identifier.
fn simple_target(node: &Node) -> Option<&str> {
    match node {
        Node::Value { base, props, .. } if props.is_empty() => match base.as_ref() {
            Node::Ident { name, .. } => Some(name),
            _ => None,
        },
        Node::Ident { name, .. } => Some(name),
        _ => None,
    }
}

fn param_names(params: &[Node]) -> Option<Vec<String>> {
    params
        .iter()
        .map(|p| match p {
            Node::Param { name, .. } => name.base_name().map(str::to_string),
            _ => None,
        })
        .collect()
}

fn render_declarations(scope: &Scope) -> String {
    let mut parts = Vec::new();
    for variable in scope.declarations() {
        match (&variable.value, variable.assigned) {
            (Some(value), true) => parts.push(format!("{} = {}", variable.name, value)),
            _ => parts.push(variable.name.clone()),
        }
    }
    if parts.is_empty() {
        return String::new();
    }
    format!("var {};\n", parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::parser::parse;

    fn compile(source: &str) -> Result<String, CompileError> {
        let lexed = tokenize(source)?;
        let root = parse(&lexed.tokens)?;
        generate(&root, &lexed.referenced)
    }

    #[test]
    fn test_empty_program() {
        assert_eq!(compile("").unwrap(), "(function () {\n\n})();\n");
    }

    #[test]
    fn test_assignment_folds_into_declaration() {
        let out = compile("Dim x As Integer\nx = 5").unwrap();
        assert!(out.contains("var x = 5;"));
        assert!(!out.contains("x=5"));
    }

    #[test]
    fn test_second_assignment_does_not_fold() {
        let out = compile("x = 5\nx = 6").unwrap();
        assert!(out.contains("var x = 5;"));
        assert!(out.contains("x=6"));
    }

    #[test]
    fn test_operator_rendering() {
        let out = compile("x = a & b").unwrap();
        assert!(out.contains("(a+b)"), "{out}");
        let out = compile("x = (a <> b)").unwrap();
        assert!(out.contains("(a!==b)"), "{out}");
        let out = compile("x = a \\ b").unwrap();
        assert!(out.contains("(a/b)"), "{out}");
        let out = compile("x = a ^ b").unwrap();
        assert!(out.contains("(a**b)"), "{out}");
        let out = compile("x = a Mod b").unwrap();
        assert!(out.contains("(a%b)"), "{out}");
        let out = compile("x = a And b").unwrap();
        assert!(out.contains("(a&b)"), "{out}");
        let out = compile("x = Not a").unwrap();
        assert!(out.contains("(~a)"), "{out}");
    }

    #[test]
    fn test_assignment_reduces_before_trailing_comparison() {
        // `=` sits on the comparison precedence level, left-assoc, so a
        // bare `x = a <> b` folds the assignment before the comparison.
        let out = compile("x = a <> b").unwrap();
        assert!(out.contains("(x=a!==b)"), "{out}");
    }

    #[test]
    fn test_imp_is_rejected() {
        let err = compile("x = a Imp b").unwrap_err();
        assert_eq!(err.kind(), "codegen");
    }

    #[test]
    fn test_free_variable_skips_referenced_names() {
        let out = compile("end1 = 0\nFor i = 1 To 3\nx = i\nNext").unwrap();
        assert!(out.contains("end2="), "{out}");
        assert!(!out.contains("end1=3"), "{out}");
    }

    #[test]
    fn test_function_return_slot() {
        let out = compile("Function Area(r)\nArea = r * r\nEnd Function").unwrap();
        assert!(out.contains("ret=(r*r)"), "{out}");
        assert!(out.contains("return ret;"), "{out}");
        assert!(out.contains("var ret;"), "{out}");
    }

    #[test]
    fn test_named_args_without_declaration_fail() {
        let err = compile("Call Foo(1, bar:=2)").unwrap_err();
        assert_eq!(err.kind(), "codegen");
    }

    #[test]
    fn test_binder_emitted_once_when_used() {
        let source = "Sub Foo(a, bar)\nx = a\nEnd Sub\nCall Foo(1, bar:=2)";
        let out = compile(source).unwrap();
        assert_eq!(out.matches("function handleNamedArgs").count(), 1);
        assert!(out.contains("handleNamedArgs(Foo, [\"a\", \"bar\"], {0:1, bar:2})"), "{out}");
    }

    #[test]
    fn test_binder_not_emitted_for_positional_calls() {
        let out = compile("Sub Foo(a)\nx = a\nEnd Sub\nCall Foo(1)").unwrap();
        assert!(!out.contains("handleNamedArgs"), "{out}");
        assert!(out.contains("Foo(1)"), "{out}");
    }
}
