//! Lexical scope tracking for code generation.
//!
//! Each function body (and the root program) gets a [`Scope`]. A scope
//! records every name declared in it, in declaration order, so the
//! `var` statement at the top of the emitted function lists names in
//! the order the source introduced them.

use rustc_hash::FxHashMap;

/// What a declared name refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Variable,
    Parameter,
    Function,
}

/// A name declared in a scope.
#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    pub ty: String,
    pub kind: VarKind,
    /// Rendered initializer, when one has been attached.
    pub value: Option<String>,
    /// Whether the initializer renders into the `var` statement.
    pub assigned: bool,
    /// Parameter names, for `Function` entries. Drives named-argument
    /// binding at call sites.
    pub params: Vec<String>,
}

#[derive(Debug, Default)]
pub struct Scope {
    variables: Vec<Variable>,
    positions: FxHashMap<String, usize>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `name`. Re-declaring an existing name only updates its
    /// recorded value; kind and position stay as first declared.
    pub fn add(&mut self, name: &str, ty: &str, value: Option<String>, kind: VarKind) {
        if let Some(&index) = self.positions.get(name) {
            self.variables[index].value = value;
            return;
        }
        let assigned = value.is_some();
        self.positions.insert(name.to_string(), self.variables.len());
        self.variables.push(Variable {
            name: name.to_string(),
            ty: ty.to_string(),
            kind,
            value,
            assigned,
            params: Vec::new(),
        });
    }

    /// Declare a function name together with its parameter list.
    pub fn add_function(&mut self, name: &str, params: Vec<String>) {
        if let Some(&index) = self.positions.get(name) {
            self.variables[index].params = params;
            return;
        }
        self.positions.insert(name.to_string(), self.variables.len());
        self.variables.push(Variable {
            name: name.to_string(),
            ty: "Object".to_string(),
            kind: VarKind::Function,
            value: None,
            assigned: false,
            params,
        });
    }

    pub fn find_local(&self, name: &str) -> Option<&Variable> {
        self.positions.get(name).map(|&i| &self.variables[i])
    }

    /// Fold an initializer into the pending declaration for `name`.
    pub fn record_assignment(&mut self, name: &str, value: String) {
        if let Some(&index) = self.positions.get(name) {
            self.variables[index].value = Some(value);
            self.variables[index].assigned = true;
        }
    }

    /// Names that render into the `var` statement, in declaration
    /// order. Parameters and function names are excluded.
    pub fn declarations(&self) -> impl Iterator<Item = &Variable> {
        self.variables.iter().filter(|v| v.kind == VarKind::Variable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_is_idempotent() {
        let mut scope = Scope::new();
        scope.add("x", "Integer", None, VarKind::Variable);
        scope.add("x", "Long", Some("5".into()), VarKind::Parameter);
        let var = scope.find_local("x").unwrap();
        assert_eq!(var.kind, VarKind::Variable);
        assert_eq!(var.ty, "Integer");
        assert_eq!(var.value.as_deref(), Some("5"));
        assert_eq!(scope.declarations().count(), 1);
    }

    #[test]
    fn test_record_assignment_marks_assigned() {
        let mut scope = Scope::new();
        scope.add("x", "Variant", None, VarKind::Variable);
        assert!(!scope.find_local("x").unwrap().assigned);
        scope.record_assignment("x", "5".into());
        let var = scope.find_local("x").unwrap();
        assert!(var.assigned);
        assert_eq!(var.value.as_deref(), Some("5"));
    }

    #[test]
    fn test_declarations_exclude_parameters_and_functions() {
        let mut scope = Scope::new();
        scope.add("ret", "Variant", None, VarKind::Variable);
        scope.add("n", "Integer", None, VarKind::Parameter);
        scope.add_function("Foo", vec!["n".into()]);
        let names: Vec<_> = scope.declarations().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["ret"]);
    }
}
