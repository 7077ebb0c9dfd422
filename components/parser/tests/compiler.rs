//! Shape checks on the emitted bytecode.

use bytecode::{disassemble, Lit};
use parser::compile_source;

fn listing(src: &str) -> String {
    disassemble(&compile_source(src).unwrap())
}

#[test]
fn script_prologue_and_statement_discipline() {
    let l = listing("1; 2;");
    // The prologue undefined, then each value statement followed by a
    // SWAP_DROP replacing the previous statement's value.
    let first_undef = l.find("PUSH_UNDEFINED").unwrap();
    let first_swap = l.find("SWAP_DROP").unwrap();
    assert!(first_undef < first_swap);
    assert_eq!(l.matches("SWAP_DROP").count(), 2);
}

#[test]
fn var_declarations_are_stack_neutral() {
    let l = listing("7; var a = 5;");
    // The var statement assigns and drops; no SWAP_DROP for it.
    assert_eq!(l.matches("SWAP_DROP").count(), 1);
    assert!(l.contains("SET_VAR"));
    assert!(l.contains("DROP"));
}

#[test]
fn hoisted_function_is_assigned_before_first_statement() {
    let l = listing("f(); function f() { return 1 }");
    let func_lit = l.find("FUNC_LIT").unwrap();
    let call = l.find("CALL").unwrap();
    assert!(func_lit < call, "hoisted assignment must precede the call:\n{}", l);
}

#[test]
fn method_call_duplicates_receiver() {
    let l = listing("o.m(1, 2);");
    let dup = l.find(" DUP").unwrap();
    let get = l.find(" GET\n").unwrap();
    assert!(dup < get);
    assert!(l.contains("CHECK_CALL"));
    assert!(l.contains("CALL 2"));
}

#[test]
fn while_layout_uses_loop_record() {
    let l = listing("while (x) { y; }");
    assert!(l.contains("TRY_PUSH_LOOP"));
    assert!(l.contains("JMP_TRUE"));
    assert!(l.contains("JMP_IF_CONTINUE"));
    assert!(l.contains("TRY_POP"));
}

#[test]
fn try_catch_finally_layout() {
    let l = listing("try { a; } catch (e) { b; } finally { c; }");
    assert!(l.contains("TRY_PUSH_FINALLY"));
    assert!(l.contains("TRY_PUSH_CATCH"));
    assert!(l.contains("ENTER_CATCH"));
    assert!(l.contains("EXIT_CATCH"));
    assert!(l.contains("AFTER_FINALLY"));
    // Both the normal path and each handler pop their records.
    assert!(l.matches("TRY_POP").count() >= 3);
}

#[test]
fn postincrement_preserves_original_via_stash() {
    let l = listing("x++;");
    let stash = l.find("STASH").unwrap();
    let unstash = l.find("UNSTASH").unwrap();
    assert!(stash < unstash);
    assert!(l.contains("PUSH_ONE"));
}

#[test]
fn typeof_identifier_uses_safe_lookup() {
    let l = listing("typeof missing;");
    assert!(l.contains("SAFE_GET_VAR"));
    let l = listing("typeof (1 + 2);");
    assert!(!l.contains("SAFE_GET_VAR"));
}

#[test]
fn zero_and_one_have_dedicated_opcodes() {
    let l = listing("0; 1; 2;");
    assert!(l.contains("PUSH_ZERO"));
    assert!(l.contains("PUSH_ONE"));
    assert!(l.contains("PUSH_LIT 0 ; 2"));
}

#[test]
fn function_literal_records_parameter_names() {
    let bc = compile_source("var f = function (a, b) { var inner; return a + b; };").unwrap();
    let inner = bc
        .lits
        .iter()
        .find_map(|l| match l {
            Lit::Func(f) => Some(f),
            _ => None,
        })
        .expect("function literal in pool");
    assert_eq!(inner.args_cnt, 2);
    assert_eq!(inner.arg_names(), ["a", "b"]);
    assert_eq!(inner.var_names(), ["inner"]);
}

#[test]
fn strict_mode_flag_propagates() {
    let bc = compile_source("'use strict'; var x = 1;").unwrap();
    assert!(bc.strict);
    let bc = compile_source("var f = function () { 'use strict'; };").unwrap();
    assert!(!bc.strict);
    let inner = bc
        .lits
        .iter()
        .find_map(|l| match l {
            Lit::Func(f) => Some(f),
            _ => None,
        })
        .unwrap();
    assert!(inner.strict);
}

#[test]
fn strict_delete_of_identifier_is_rejected() {
    assert!(compile_source("'use strict'; var x; delete x;").is_err());
    assert!(compile_source("var x; delete x;").is_ok());
}

#[test]
fn for_in_carries_value_in_stash() {
    let l = listing("for (var k in o) { k; }");
    assert!(l.contains("NEXT_PROP"));
    assert!(l.contains("STASH"));
    assert!(l.contains("UNSTASH"));
    // The break path clears handle, object, and the preceding value.
    assert!(l.matches("SWAP_DROP").count() >= 3);
}
