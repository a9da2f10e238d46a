//! Transpiler from a BASIC-family scripting language to a
//! dynamically-typed C-family target.
//!
//! The pipeline is lex, parse, generate. The lexer is
//! context-sensitive (keyword tagging depends on the previous tokens),
//! the parser is table-driven LR over the grammar in [`grammar`], and
//! the generator walks the tree emulating source semantics with target
//! primitives: the function name doubles as the return slot, `With`
//! blocks become immediately-invoked functions, and named arguments go
//! through a runtime binder emitted on demand.
//!
//! ```
//! let output = basalt_compiler::compile("Dim x As Integer\nx = 5").unwrap();
//! assert!(output.contains("var x = 5;"));
//! ```

pub mod codegen;
pub mod error;
pub mod grammar;
pub mod lexer;
pub mod nodes;
pub mod parser;
pub mod patterns;
pub mod scope;
pub mod span;
pub mod token;

pub use codegen::generate;
pub use error::CompileError;
pub use lexer::{tokenize, LexOutput};
pub use nodes::{Node, TypeRef};
pub use parser::parse;
pub use patterns::clean;
pub use span::{LineIndex, Location, Span};
pub use token::{Token, TokenKind};

/// Compile a source chunk end to end.
pub fn compile(source: &str) -> Result<String, CompileError> {
    let lexed = tokenize(source)?;
    let root = parse(&lexed.tokens)?;
    generate(&root, &lexed.referenced)
}
