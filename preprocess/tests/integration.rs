//
// Copyright (c) 2025-2026 Jeff Garzik
//
// This file is part of the shadertools-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//

use std::collections::HashMap;
use std::io;

use similar_asserts::assert_eq;

use shadertools_preprocess::{
    preprocess, IncludeHandler, IncludeKind, PpToken, Preprocessor, PreprocessorDefine, Token,
};

/// Serves includes out of a map, for tests.
struct MapIncluder {
    files: HashMap<String, String>,
}

impl MapIncluder {
    fn new(files: &[(&str, &str)]) -> Self {
        Self {
            files: files
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

impl IncludeHandler for MapIncluder {
    fn open(
        &mut self,
        _kind: IncludeKind,
        filename: &str,
        _parent: Option<&str>,
    ) -> io::Result<String> {
        self.files
            .get(filename)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, filename.to_string()))
    }
}

fn pp_text(source: &str) -> String {
    let data = preprocess("test.fx", source, &[], false, None);
    assert!(
        data.errors.is_empty(),
        "unexpected errors: {:?}",
        data.errors
    );
    normalize(&data.output)
}

fn pp_errors(source: &str) -> Vec<String> {
    let data = preprocess("test.fx", source, &[], false, None);
    data.errors.into_iter().map(|e| e.error).collect()
}

/// Platform newline differences are not under test.
fn normalize(s: &str) -> String {
    s.replace("\r\n", "\n")
}

fn tokens(source: &str) -> Vec<PpToken> {
    let mut pp = Preprocessor::new("test.fx", source, &[], false, None);
    let mut out = Vec::new();
    loop {
        let t = pp.next_token();
        if t.token == Token::Eoi {
            break;
        }
        out.push(t);
    }
    out
}

// ----------------------------------------------------------------------
// End-to-end scenarios
// ----------------------------------------------------------------------

#[test]
fn object_macro_expansion() {
    assert_eq!(pp_text("#define A 2\n#define B 3\nA+B\n"), "2 + 3");
}

#[test]
fn function_macro_expansion() {
    assert_eq!(
        pp_text("#define SQ(x) ((x)*(x))\nSQ(1+2)\n"),
        "( ( 1 + 2 ) * ( 1 + 2 ) )"
    );
}

#[test]
fn stringify() {
    assert_eq!(
        pp_text("#define STR(x) #x\nSTR(hello world)\n"),
        "\"hello world\""
    );
}

#[test]
fn concatenate() {
    assert_eq!(pp_text("#define CAT(a,b) a##b\nCAT(foo,bar)\n"), "foobar");
}

#[test]
fn conditional_defined_else() {
    assert_eq!(pp_text("#if defined(X)\nyes\n#else\nno\n#endif\n"), "no");
}

#[test]
fn conditional_arithmetic() {
    assert_eq!(pp_text("#if 1+2*3 == 7\nok\n#endif\n"), "ok");
}

// ----------------------------------------------------------------------
// Macros
// ----------------------------------------------------------------------

#[test]
fn define_then_undef_is_identity() {
    let mut pp = Preprocessor::new("test.fx", "#define X Y\n#undef X\nX\n", &[], false, None);
    let t = pp.next_token();
    assert_eq!(t.token, Token::Identifier);
    assert_eq!(t.text, "X");
    assert_eq!(pp.define_count(), 0);
}

#[test]
fn duplicate_define_is_an_error() {
    let errors = pp_errors("#define A 1\n#define A 2\nA\n");
    assert_eq!(errors, vec!["'A' already defined".to_string()]);
    // the original definition survives
    assert_eq!(pp_text("#define A 1\nA\n"), "1");
}

#[test]
fn empty_definition_expands_to_nothing() {
    assert_eq!(pp_text("#define NOTHING\na NOTHING b\n"), "a b");
}

#[test]
fn function_macro_without_parens_is_untouched() {
    assert_eq!(pp_text("#define F(x) x\nF\n"), "F");
}

#[test]
fn void_parameter_list() {
    assert_eq!(pp_text("#define F() done\nF()\n"), "done");
}

#[test]
fn void_macro_argument_count_mismatch() {
    let errors = pp_errors("#define F() done\nF(1)\n");
    assert_eq!(
        errors,
        vec!["macro 'F' passed 1 arguments, but requires 0".to_string()]
    );
}

#[test]
fn argument_count_mismatch() {
    let errors = pp_errors("#define ADD(a,b) a+b\nADD(1)\n");
    assert_eq!(
        errors,
        vec!["macro 'ADD' passed 1 arguments, but requires 2".to_string()]
    );
}

#[test]
fn arguments_pre_expand_object_macros() {
    assert_eq!(
        pp_text("#define TWO 2\n#define ID(x) x\nID(TWO)\n"),
        "2"
    );
    // ...but stringify sees the original spelling
    assert_eq!(
        pp_text("#define TWO 2\n#define STR(x) #x\nSTR(TWO)\n"),
        "\"TWO\""
    );
}

#[test]
fn stringify_non_parameter_token() {
    assert_eq!(pp_text("#define Q(x) #zzz\nQ(1)\n"), "\"zzz\"");
}

#[test]
fn nested_function_macros() {
    assert_eq!(
        pp_text("#define SQ(x) ((x)*(x))\n#define TWICE(x) SQ(x)\nTWICE(3)\n"),
        "( ( 3 ) * ( 3 ) )"
    );
}

#[test]
fn hashhash_at_replacement_boundary_is_an_error() {
    let errors = pp_errors("#define A ## x\nA\n");
    assert_eq!(
        errors,
        vec!["'##' cannot appear at either end of a macro expansion".to_string()]
    );
    let errors = pp_errors("#define B x ##\nB\n");
    assert_eq!(
        errors,
        vec!["'##' cannot appear at either end of a macro expansion".to_string()]
    );
}

#[test]
fn defined_is_not_a_legal_macro_name() {
    let errors = pp_errors("#define defined 1\n");
    assert_eq!(
        errors,
        vec!["'defined' cannot be used as a macro name".to_string()]
    );
}

#[test]
fn macro_recursion_trips_the_cap() {
    let errors = pp_errors("#define A B\n#define B A\nA\n");
    assert!(errors.contains(&"Recursing macros".to_string()), "{:?}", errors);
}

#[test]
fn unterminated_argument_list() {
    let errors = pp_errors("#define F(x) x\nF(1\n");
    assert_eq!(errors, vec!["Unterminated macro list".to_string()]);
}

// ----------------------------------------------------------------------
// __FILE__ / __LINE__
// ----------------------------------------------------------------------

#[test]
fn file_and_line_macros() {
    assert_eq!(pp_text("__FILE__\n__LINE__\n"), "\"test.fx\" 2");
}

#[test]
fn line_macro_reports_invocation_line() {
    assert_eq!(pp_text("#define L __LINE__\nL\nL\n"), "2 3");
}

#[test]
fn undef_of_line_macro_disables_it() {
    let data = preprocess("test.fx", "#undef __LINE__\n__LINE__\n", &[], false, None);
    assert_eq!(data.errors.len(), 1);
    assert_eq!(data.errors[0].error, "undefining \"__LINE__\"");
    // no longer synthetic: the identifier flows through untouched
    assert_eq!(normalize(&data.output), "__LINE__");
}

#[test]
fn redefine_of_file_macro_reports_and_takes_over() {
    let data = preprocess(
        "test.fx",
        "#define __FILE__ \"fake\"\n__FILE__\n",
        &[],
        false,
        None,
    );
    assert_eq!(data.errors.len(), 1);
    assert_eq!(data.errors[0].error, "'__FILE__' already defined");
    assert_eq!(normalize(&data.output), "\"fake\"");
}

// ----------------------------------------------------------------------
// Conditionals
// ----------------------------------------------------------------------

#[test]
fn ifdef_and_ifndef() {
    assert_eq!(pp_text("#define X 1\n#ifdef X\nyes\n#endif\n"), "yes");
    assert_eq!(pp_text("#ifdef X\nyes\n#else\nno\n#endif\n"), "no");
    assert_eq!(pp_text("#ifndef X\nyes\n#endif\n"), "yes");
}

#[test]
fn elif_chains_choose_one_branch() {
    assert_eq!(
        pp_text("#if 0\na\n#elif 1\nb\n#elif 1\nc\n#else\nd\n#endif\n"),
        "b"
    );
    assert_eq!(pp_text("#if 0\na\n#elif 0\nb\n#else\nc\n#endif\n"), "c");
}

#[test]
fn nested_conditionals_inherit_skipping() {
    assert_eq!(
        pp_text("#if 0\n#if 1\na\n#endif\n#else\nb\n#endif\n"),
        "b"
    );
    assert_eq!(
        pp_text("#if 1\n#if 0\na\n#else\nb\n#endif\n#endif\n"),
        "b"
    );
}

#[test]
fn else_after_else_is_an_error() {
    let errors = pp_errors("#if 0\n#else\n#else\n#endif\n");
    assert_eq!(errors, vec!["#else after #else".to_string()]);
}

#[test]
fn elif_after_else_is_an_error() {
    let errors = pp_errors("#if 0\n#else\n#elif 1\n#endif\n");
    assert_eq!(errors, vec!["#elif after #else".to_string()]);
}

#[test]
fn unmatched_endif_is_an_error() {
    let errors = pp_errors("#endif\n");
    assert_eq!(errors, vec!["Unmatched #endif".to_string()]);
}

#[test]
fn unterminated_if_is_an_error() {
    let data = preprocess("test.fx", "#if 1\nx\n", &[], false, None);
    assert_eq!(normalize(&data.output), "x");
    assert_eq!(data.errors.len(), 1);
    assert_eq!(data.errors[0].error, "Unterminated #if");
}

#[test]
fn skipped_regions_process_no_directives_but_honor_chains() {
    // the #error inside the dead branch must not fire
    assert_eq!(pp_text("#if 0\n#error dead\n#else\nok\n#endif\n"), "ok");
}

// ----------------------------------------------------------------------
// Conditional expressions
// ----------------------------------------------------------------------

#[test]
fn expression_laws_match_naive_evaluation() {
    // each pair: (#if expression, expected truth)
    let cases: &[(&str, bool)] = &[
        ("1+2*3 == 7", true),
        ("(1+2)*3 == 9", true),
        ("(1+2)-3", false),
        ("10-2-3 == 5", true),
        ("1<<4 == 16", true),
        ("256>>4 == 16", true),
        ("~0 == -1", true),
        ("-3+5 == 2", true),
        ("+4 == 4", true),
        ("!0", true),
        ("!1", false),
        ("10%4 == 2", true),
        ("7/2 == 3", true),
        ("1|2 == 3", true), // '==' binds tighter than '|'
        ("(1|2) == 3", true),
        ("1 && 2", true),
        ("0 || 0", false),
        ("1 ^ 1", false),
        ("3 & 2", true),
        ("2 < 1", false),
        ("2 >= 2", true),
        ("0x10 == 16", true),
        ("010 == 8", true),
    ];
    for (expr, expected) in cases {
        let out = pp_text(&format!("#if {}\nT\n#endif\n", expr));
        let got = out == "T";
        assert_eq!(got, *expected, "expression: {}", expr);
    }
}

#[test]
fn undefined_identifiers_evaluate_to_zero() {
    assert_eq!(pp_text("#if WAT\nyes\n#else\nno\n#endif\n"), "no");
    assert_eq!(pp_text("#if WAT == 0\nyes\n#endif\n"), "yes");
}

#[test]
fn macros_expand_inside_expressions() {
    assert_eq!(pp_text("#define N 4\n#if N > 3\nbig\n#endif\n"), "big");
    assert_eq!(
        pp_text("#define N 4\n#if N + 1 == 5\nok\n#endif\n"),
        "ok"
    );
}

#[test]
fn defined_without_parens() {
    assert_eq!(
        pp_text("#define X 1\n#if defined X\nyes\n#endif\n"),
        "yes"
    );
}

#[test]
fn division_by_zero_is_an_error() {
    let errors = pp_errors("#if 1/0\nx\n#endif\n");
    assert!(errors.contains(&"Invalid expression".to_string()), "{:?}", errors);
}

#[test]
fn unmatched_close_paren_is_an_error() {
    let errors = pp_errors("#if 1)\nx\n#endif\n");
    assert!(errors.contains(&"Unmatched ')'".to_string()), "{:?}", errors);
}

#[test]
fn unmatched_open_paren_is_an_error() {
    let errors = pp_errors("#if (1\nx\n#endif\n");
    assert!(errors.contains(&"Unmatched '('".to_string()), "{:?}", errors);
}

#[test]
fn operator_stack_bound_trips() {
    let expr = format!("{}1{}", "(".repeat(65), ")".repeat(65));
    let errors = pp_errors(&format!("#if {}\nx\n#endif\n", expr));
    assert!(
        errors.contains(&"#if expression too complex".to_string()),
        "{:?}",
        errors
    );
}

#[test]
fn output_bound_trips() {
    // 130 operands is more postfix output than the reducer will hold
    let expr = vec!["1"; 130].join("+");
    let errors = pp_errors(&format!("#if {}\nx\n#endif\n", expr));
    assert!(
        errors.contains(&"#if expression too complex".to_string()),
        "{:?}",
        errors
    );
}

// ----------------------------------------------------------------------
// Includes
// ----------------------------------------------------------------------

#[test]
fn local_include_interleaves_inline() {
    let inc = MapIncluder::new(&[("inc.h", "inside\n")]);
    let data = preprocess(
        "test.fx",
        "before\n#include \"inc.h\"\nafter\n",
        &[],
        false,
        Some(Box::new(inc)),
    );
    assert!(data.errors.is_empty());
    assert_eq!(normalize(&data.output), "before inside after");
}

#[test]
fn system_include_reads_raw_filename() {
    let inc = MapIncluder::new(&[("sys/thing.h", "sys_ok\n")]);
    let data = preprocess(
        "test.fx",
        "#include <sys/thing.h>\n",
        &[],
        false,
        Some(Box::new(inc)),
    );
    assert!(data.errors.is_empty());
    assert_eq!(normalize(&data.output), "sys_ok");
}

#[test]
fn include_defines_are_visible_after_pop() {
    let inc = MapIncluder::new(&[("defs.h", "#define FROM_HEADER 42\n")]);
    let data = preprocess(
        "test.fx",
        "#include \"defs.h\"\nFROM_HEADER\n",
        &[],
        false,
        Some(Box::new(inc)),
    );
    assert!(data.errors.is_empty());
    assert_eq!(normalize(&data.output), "42");
}

#[test]
fn missing_include_callback_is_an_error() {
    let errors = pp_errors("#include \"inc.h\"\n");
    assert_eq!(
        errors,
        vec!["Saw #include, but no include callbacks defined".to_string()]
    );
}

#[test]
fn failing_include_callback_is_an_error() {
    let inc = MapIncluder::new(&[]);
    let data = preprocess(
        "test.fx",
        "#include \"missing.h\"\n",
        &[],
        false,
        Some(Box::new(inc)),
    );
    assert_eq!(data.errors.len(), 1);
    assert_eq!(data.errors[0].error, "Include callback failed");
}

#[test]
fn file_macro_tracks_the_include_stack() {
    let inc = MapIncluder::new(&[("inner.h", "__FILE__\n")]);
    let data = preprocess(
        "outer.fx",
        "#include \"inner.h\"\n__FILE__\n",
        &[],
        false,
        Some(Box::new(inc)),
    );
    assert!(data.errors.is_empty());
    assert_eq!(normalize(&data.output), "\"inner.h\" \"outer.fx\"");
}

#[test]
fn malformed_include_is_an_error() {
    let errors = pp_errors("#include bogus\n");
    assert_eq!(errors, vec!["Invalid #include directive".to_string()]);
}

// ----------------------------------------------------------------------
// #line, #error, #pragma
// ----------------------------------------------------------------------

#[test]
fn line_directive_sets_position() {
    let mut pp = Preprocessor::new("test.fx", "#line 50\nX\n", &[], false, None);
    let t = pp.next_token();
    assert_eq!(t.text, "X");
    let (fname, line) = pp.source_position();
    assert_eq!(fname.as_deref(), Some("test.fx"));
    assert_eq!(line, 50);
}

#[test]
fn line_directive_with_filename() {
    let mut pp = Preprocessor::new("test.fx", "#line 10 \"other.h\"\nY\n", &[], false, None);
    let t = pp.next_token();
    assert_eq!(t.text, "Y");
    let (fname, line) = pp.source_position();
    assert_eq!(fname.as_deref(), Some("other.h"));
    assert_eq!(line, 10);
}

#[test]
fn line_directive_requires_integer() {
    let errors = pp_errors("#line nope\nx\n");
    assert_eq!(errors, vec!["Invalid #line directive".to_string()]);
}

#[test]
fn line_directive_rejects_trailing_tokens() {
    let errors = pp_errors("#line 5 \"f.h\" extra\nx\n");
    assert_eq!(errors, vec!["Invalid #line directive".to_string()]);
}

#[test]
fn error_directive_reports_on_its_own_line() {
    let data = preprocess("test.fx", "ok\n#error broken thing\n", &[], false, None);
    assert_eq!(data.errors.len(), 1);
    assert_eq!(data.errors[0].error, "#error broken thing");
    assert_eq!(data.errors[0].line, 2);
    assert_eq!(normalize(&data.output), "ok");
}

#[test]
fn error_message_is_clamped() {
    let long = "x".repeat(400);
    let errors = pp_errors(&format!("#error {}\n", long));
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].len(), 255);
    assert!(errors[0].starts_with("#error "));
}

#[test]
fn pragma_passes_through_with_newline() {
    assert_eq!(pp_text("#pragma once\nx\n"), "#pragma once\nx");
}

// ----------------------------------------------------------------------
// Pump behavior
// ----------------------------------------------------------------------

#[test]
fn newlines_are_swallowed_outside_pragmas() {
    let toks = tokens("a\n\nb\n");
    let kinds: Vec<Token> = toks.iter().map(|t| t.token).collect();
    assert_eq!(kinds, vec![Token::Identifier, Token::Identifier]);
}

#[test]
fn predefined_macros_are_processed_first() {
    let defines = vec![
        PreprocessorDefine {
            identifier: "FOO".to_string(),
            definition: "1".to_string(),
        },
        PreprocessorDefine {
            identifier: "BAR".to_string(),
            definition: "FOO+1".to_string(),
        },
    ];
    let data = preprocess("test.fx", "#if FOO\nBAR\n#endif\n", &defines, false, None);
    assert!(data.errors.is_empty());
    assert_eq!(normalize(&data.output), "1 + 1");
}

#[test]
fn lexemes_reparse_after_concatenation() {
    // concatenated tokens re-lex into a single identifier
    let toks = tokens("#define GLUE(a,b) a##b\nGLUE(xy,9)\n");
    assert_eq!(toks.len(), 1);
    assert_eq!(toks[0].token, Token::Identifier);
    assert_eq!(toks[0].text, "xy9");
}

#[test]
fn incomplete_comment_is_an_error() {
    let errors = pp_errors("x /* no end\n");
    assert_eq!(errors, vec!["Incomplete multiline comment".to_string()]);
}

#[test]
fn bad_chars_reach_the_consumer() {
    let toks = tokens("a @ b\n");
    let kinds: Vec<Token> = toks.iter().map(|t| t.token).collect();
    assert_eq!(
        kinds,
        vec![Token::Identifier, Token::BadChars, Token::Identifier]
    );
}

#[test]
fn asm_comments_mode() {
    let data = preprocess("test.fx", "x ; drop this\ny\n", &[], true, None);
    assert!(data.errors.is_empty());
    assert_eq!(normalize(&data.output), "x y");
}

#[test]
fn error_recovery_resumes_on_next_line() {
    let data = preprocess("test.fx", "#define 1bad x\nstill here\n", &[], false, None);
    assert_eq!(data.errors.len(), 1);
    assert_eq!(data.errors[0].error, "Macro names must be identifiers");
    assert_eq!(normalize(&data.output), "still here");
}

#[test]
fn semicolons_and_braces_reflow_output() {
    let out = pp_text("int x; { int y; }\n");
    assert_eq!(out, "int x ;\n\n{\n    int y ;\n}\n");
}
