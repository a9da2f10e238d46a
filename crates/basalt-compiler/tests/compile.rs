//! End-to-end compilation tests: source in, target source out.

use basalt_compiler::{compile, CompileError};

#[test]
fn test_compiles_empty_program_to_empty_iife() {
    assert_eq!(compile("").unwrap(), "(function () {\n\n})();\n");
}

#[test]
fn test_output_is_deterministic() {
    let source = "Dim a, b\na = 1\nb = a + 2\nMsgBox b";
    let first = compile(source).unwrap();
    for _ in 0..5 {
        assert_eq!(compile(source).unwrap(), first);
    }
}

#[test]
fn test_declarations_hoist_to_one_var_statement() {
    let out = compile("Dim a\nDim b As Long\na = 1").unwrap();
    assert!(out.contains("var a = 1, b;"), "{out}");
}

#[test]
fn test_procedure_modifiers_accepted() {
    for modifier in ["Public", "Private", "Friend", "Static"] {
        let source = format!("{modifier} Sub Foo()\nx = 1\nEnd Sub");
        let out = compile(&source).unwrap();
        assert!(out.contains("function Foo() {"), "{out}");
    }
}

#[test]
fn test_sub_with_declaration_and_assignment() {
    let source = "Sub Foo()\nDim x As Integer\nx = 5\nEnd Sub";
    let out = compile(source).unwrap();
    assert!(out.contains("function Foo() {"), "{out}");
    assert!(out.contains("var ret, x = 5;"), "{out}");
    assert!(out.contains("return ret;"), "{out}");
}

#[test]
fn test_function_name_is_return_slot() {
    let source = "Function Twice(n As Integer) As Integer\nTwice = n * 2\nEnd Function";
    let out = compile(source).unwrap();
    assert!(out.contains("function Twice(n) {"), "{out}");
    assert!(out.contains("ret=(n*2)"), "{out}");
    assert!(out.contains("return ret;"), "{out}");
}

#[test]
fn test_if_else_renders_both_branches() {
    let out = compile("If x > 0 Then y = 1 Else y = -1").unwrap();
    assert!(out.contains("if ((x>0)) {"), "{out}");
    assert!(out.contains("} else {"), "{out}");
    assert!(out.contains("y=(-1)"), "{out}");
}

#[test]
fn test_elseif_chain_stays_flat() {
    let source = "If a Then\nx = 1\nElseIf b Then\nx = 2\nElse\nx = 3\nEnd If";
    let out = compile(source).unwrap();
    assert!(out.contains("} else if (b) {"), "{out}");
    assert!(out.contains("} else {"), "{out}");
}

#[test]
fn test_for_loop_captures_bound_once() {
    let out = compile("For i = 1 To GetLimit()\nMsgBox i\nNext i").unwrap();
    assert!(out.contains("for (i=1, end1=GetLimit(); i < end1; i += 1) {"), "{out}");
}

#[test]
fn test_for_loop_with_step() {
    let out = compile("For i = 1 To 10 Step 2\nMsgBox i\nNext").unwrap();
    assert!(out.contains("for (i=1, end1=10; i < end1; i += 2) {"), "{out}");
}

#[test]
fn test_for_temporary_avoids_source_names() {
    let out = compile("Dim end1\nFor i = 1 To 3\nMsgBox i\nNext").unwrap();
    assert!(out.contains("end2=3"), "{out}");
}

#[test]
fn test_named_arguments_go_through_binder() {
    let source = "Sub Foo(a, bar)\nMsgBox a\nEnd Sub\nCall Foo(1, bar:=2)";
    let out = compile(source).unwrap();
    assert!(out.contains("function handleNamedArgs(fn, names, args)"), "{out}");
    assert!(out.contains("handleNamedArgs(Foo, [\"a\", \"bar\"], {0:1, bar:2})"), "{out}");
}

#[test]
fn test_positional_call_is_direct() {
    let out = compile("Sub Foo(a)\nMsgBox a\nEnd Sub\nCall Foo(3)").unwrap();
    assert!(out.contains("Foo(3)"), "{out}");
    assert!(!out.contains("handleNamedArgs"), "{out}");
}

#[test]
fn test_skipped_argument_becomes_undefined() {
    let out = compile("Sub Foo(a, b)\nMsgBox a\nEnd Sub\nCall Foo(, 2)").unwrap();
    assert!(out.contains("Foo(undefined, 2)"), "{out}");
}

#[test]
fn test_do_loop_until_inverts_and_renders_post() {
    let out = compile("Do\nx = x + 1\nLoop Until x > 5").unwrap();
    assert!(out.contains("do{"), "{out}");
    assert!(out.contains("}while ((!(x>5)))"), "{out}");
}

#[test]
fn test_do_while_renders_pre_test() {
    let out = compile("Do While x < 5\nx = x + 1\nLoop").unwrap();
    assert!(out.contains("while ((x<5)){"), "{out}");
    assert!(!out.contains("do{"), "{out}");
}

#[test]
fn test_wend_loop_renders_pre_test() {
    let out = compile("While x < 5\nx = x + 1\nWend").unwrap();
    assert!(out.contains("while ((x<5)){"), "{out}");
}

#[test]
fn test_select_case_renders_switch() {
    let source = "Select Case x\nCase 1, 2\ny = 1\nCase Else\ny = 2\nEnd Select";
    let out = compile(source).unwrap();
    assert!(out.contains("switch (x) {"), "{out}");
    assert!(out.contains("case 1:\ncase 2:"), "{out}");
    assert!(out.contains("default:"), "{out}");
    assert_eq!(out.matches("break;").count(), 2, "{out}");
}

#[test]
fn test_with_block_becomes_bound_call() {
    let out = compile("With obj\n.Width = 5\nEnd With").unwrap();
    assert!(out.contains("(function () {"), "{out}");
    assert!(out.contains("}).call(obj);"), "{out}");
    assert!(out.contains("this.Width=5"), "{out}");
}

#[test]
fn test_exit_forms_fold_to_break_and_return() {
    let source = "Sub Foo()\nFor i = 1 To 3\nExit For\nNext\nExit Sub\nEnd Sub";
    let out = compile(source).unwrap();
    assert!(out.contains("break;"), "{out}");
    assert!(out.contains("return ret;"), "{out}");
}

#[test]
fn test_const_declaration_initializes_in_var_statement() {
    let out = compile("Const LIMIT = 10\nMsgBox LIMIT").unwrap();
    assert!(out.contains("var LIMIT = 10;"), "{out}");
}

#[test]
fn test_string_concatenation_uses_plus() {
    let out = compile("s = \"a\" & \"b\"").unwrap();
    assert!(out.contains("var s = (\"a\"+\"b\");"), "{out}");
}

#[test]
fn test_shorthand_type_suffix_declares() {
    let out = compile("Dim count%\ncount = 1").unwrap();
    assert!(out.contains("var count = 1;"), "{out}");
}

#[test]
fn test_line_continuation_joins_lines() {
    let out = compile("x = 1 + _\n 2").unwrap();
    assert!(out.contains("var x = (1+2);"), "{out}");
}

#[test]
fn test_comments_are_stripped() {
    let out = compile("x = 1 ' the answer\n' a full comment line\ny = 2").unwrap();
    assert!(out.contains("var x = 1, y = 2;"), "{out}");
}

#[test]
fn test_lex_error_on_unknown_character() {
    let err = compile("x = ;").unwrap_err();
    assert!(matches!(err, CompileError::Lex { .. }));
    assert_eq!(err.kind(), "lex");
}

#[test]
fn test_syntax_error_on_malformed_input() {
    let err = compile("If Then").unwrap_err();
    assert!(matches!(err, CompileError::Syntax { .. }));
    assert_eq!(err.kind(), "syntax");
}

#[test]
fn test_codegen_error_on_unsupported_operator() {
    let err = compile("x = a Eqv b").unwrap_err();
    assert!(matches!(err, CompileError::Codegen { .. }));
    assert_eq!(err.kind(), "codegen");
}

#[test]
fn test_errors_serialize_with_kind_and_span() {
    let err = compile("x = ;").unwrap_err();
    let json = serde_json::to_value(&err).unwrap();
    assert_eq!(json["kind"], "lex");
    assert!(json["span"]["start"].is_number());
}

#[test]
fn test_nothing_becomes_undefined() {
    let out = compile("Set x = Nothing").unwrap();
    assert!(out.contains("var x = undefined;"), "{out}");
}

#[test]
fn test_boolean_literals_lowercase() {
    let out = compile("flag = True").unwrap();
    assert!(out.contains("var flag = true;"), "{out}");
}
