//! End-to-end execution through the bare engine, no standard library.

use vm::{ExecError, Interp, Value};

fn eval(src: &str) -> (Interp, Value) {
    let mut interp = Interp::new();
    let v = interp
        .exec(src)
        .unwrap_or_else(|e| panic!("exec failed: {:?} for {:?}", e, src));
    (interp, v)
}

fn eval_number(src: &str) -> f64 {
    let (_i, v) = eval(src);
    v.as_number().unwrap_or_else(|| panic!("not a number: {:?}", v))
}

fn eval_string(src: &str) -> String {
    let (interp, v) = eval(src);
    interp.get_string(&v).expect("string result").to_string()
}

fn eval_bool(src: &str) -> bool {
    let (_i, v) = eval(src);
    v.as_bool().expect("boolean result")
}

#[test]
fn arithmetic_and_precedence() {
    assert_eq!(eval_number("1 + 2 * 3"), 7.0);
    assert_eq!(eval_number("(1 + 2) * 3"), 9.0);
    assert_eq!(eval_number("10 % 3"), 1.0);
    assert_eq!(eval_number("7 / 2"), 3.5);
    assert_eq!(eval_number("1 << 5"), 32.0);
    assert_eq!(eval_number("-8 >> 1"), -4.0);
    assert_eq!(eval_number("-1 >>> 28"), 15.0);
    assert_eq!(eval_number("~5"), -6.0);
    assert_eq!(eval_number("5 | 2"), 7.0);
    assert_eq!(eval_number("5 & 3"), 1.0);
    assert_eq!(eval_number("5 ^ 1"), 4.0);
}

#[test]
fn string_concatenation() {
    assert_eq!(eval_string("'a' + 'b' + 'c'"), "abc");
    assert_eq!(eval_string("'n=' + 42"), "n=42");
    assert_eq!(eval_string("1 + '2'"), "12");
}

#[test]
fn variables_and_scopes() {
    assert_eq!(eval_number("var a = 1, b = 2; a + b"), 3.0);
    assert_eq!(eval_number("var x = 1; function f() { x = 5 } f(); x"), 5.0);
    assert_eq!(
        eval_number("var x = 1; function f() { var x = 5; return x } f(); x"),
        1.0
    );
    // The script value is the last statement's value.
    assert_eq!(eval_number("1; 2; 3"), 3.0);
    // Declarations are stack neutral.
    assert_eq!(eval_number("7; var q = 9;"), 7.0);
}

#[test]
fn functions_closures_and_recursion() {
    assert_eq!(
        eval_number("function add(a, b) { return a + b } add(2, 3)"),
        5.0
    );
    assert_eq!(
        eval_number("function f(n) { return n < 2 ? 1 : n * f(n - 1) } f(5)"),
        120.0
    );
    assert_eq!(
        eval_number(
            "function counter() { var n = 0; return function () { n = n + 1; return n } } \
             var c = counter(); c(); c(); c()"
        ),
        3.0
    );
    // Hoisted declarations are callable before their position.
    assert_eq!(eval_number("var r = f(); function f() { return 4 } r"), 4.0);
    // Missing arguments default to undefined, extras reach `arguments`.
    assert_eq!(
        eval_bool("function f(a, b) { return b === undefined } f(1)"),
        true
    );
    assert_eq!(
        eval_number("function f() { return arguments.length } f(1, 2, 3)"),
        3.0
    );
    assert_eq!(
        eval_number("function f(a) { return arguments[2] } f(1, 2, 7)"),
        7.0
    );
}

#[test]
fn this_binding_and_new() {
    assert_eq!(
        eval_number(
            "function Point(x) { this.x = x } var p = new Point(9); p.x"
        ),
        9.0
    );
    assert_eq!(
        eval_bool(
            "function T() {} var t = new T(); t instanceof T"
        ),
        true
    );
    // A constructor returning an object overrides the allocated one.
    assert_eq!(
        eval_number("function C() { return { x: 1 } } new C().x"),
        1.0
    );
    // Method calls bind the receiver.
    assert_eq!(
        eval_number("var o = { v: 6, m: function () { return this.v } }; o.m()"),
        6.0
    );
}

#[test]
fn control_flow() {
    assert_eq!(eval_number("var n = 0; while (n < 5) n = n + 1; n"), 5.0);
    assert_eq!(
        eval_number("var s = 0; for (var i = 1; i <= 4; i++) s += i; s"),
        10.0
    );
    assert_eq!(eval_number("var n = 0; do { n++ } while (n < 3); n"), 3.0);
    assert_eq!(
        eval_number("var n = 0; for (;;) { n++; if (n == 7) break } n"),
        7.0
    );
    assert_eq!(
        eval_number(
            "var s = 0; for (var i = 0; i < 10; i++) { if (i % 2) continue; s += i } s"
        ),
        20.0
    );
    assert_eq!(
        eval_number("var x = 3; if (x > 2) { x = 10 } else { x = 20 } x"),
        10.0
    );
}

#[test]
fn switch_dispatch_and_fallthrough() {
    assert_eq!(
        eval_string(
            "var out = ''; \
             switch (2) { \
               case 1: out += 'one'; \
               case 2: out += 'two'; \
               case 3: out += 'three'; break; \
               default: out += 'other'; \
             } out"
        ),
        "twothree"
    );
    assert_eq!(
        eval_string(
            "var out = ''; switch (9) { case 1: out = 'one'; break; default: out = 'other' } out"
        ),
        "other"
    );
    // continue binds to the loop, not the enclosing switch.
    assert_eq!(
        eval_string(
            "var s = ''; \
             for (var i = 0; i < 4; i++) { \
               switch (i) { case 1: continue; case 2: s += 'b'; break; default: s += 'd' } \
               s += '.'; \
             } s"
        ),
        "d.b.d."
    );
}

#[test]
fn objects_and_arrays() {
    assert_eq!(eval_number("var o = { a: 1, b: { c: 2 } }; o.b.c"), 2.0);
    assert_eq!(eval_number("var o = {}; o.x = 5; o['x']"), 5.0);
    assert_eq!(eval_number("[10, 20, 30][1]"), 20.0);
    assert_eq!(eval_number("var a = [1]; a[3] = 9; a.length"), 4.0);
    assert_eq!(eval_bool("var a = [1]; a[3] = 9; a[2] === undefined"), true);
    assert_eq!(eval_number("var a = []; a[0] = 1; a.length"), 1.0);
    assert_eq!(eval_bool("var a = [1, 2]; delete a[0]; a[0] === undefined"), true);
    assert_eq!(eval_number("var a = [1, 2]; delete a[0]; a.length"), 2.0);
}

#[test]
fn for_in_enumeration_order() {
    assert_eq!(
        eval_string("var s = ''; for (var k in { a: 1, b: 2, c: 3 }) s += k; s"),
        "abc"
    );
    assert_eq!(
        eval_string("var s = ''; for (var k in [9, 8]) s += k; s"),
        "01"
    );
    // break inside for..in restores the stack correctly.
    assert_eq!(
        eval_string("var s = ''; for (var k in { a: 1, b: 2 }) { s += k; break } s"),
        "a"
    );
    assert_eq!(
        eval_string(
            "var s = ''; for (var k in { a: 1, b: 2, c: 3 }) { if (k == 'b') continue; s += k } s"
        ),
        "ac"
    );
}

#[test]
fn exceptions() {
    assert_eq!(
        eval_number("try { throw { code: 42 } } catch (e) { e.code + 1 } finally {}"),
        43.0
    );
    assert_eq!(
        eval_string("var s = ''; try { s += 'a'; throw 1; s += 'x' } catch (e) { s += 'b' } s"),
        "ab"
    );
    // finally runs on both paths.
    assert_eq!(
        eval_string(
            "var s = ''; \
             try { s += 't' } finally { s += 'f' } \
             try { throw 0 } catch (e) { s += 'c' } finally { s += 'g' } s"
        ),
        "tfcg"
    );
    // Uncaught exceptions surface as an exec error with the value kept.
    let mut interp = Interp::new();
    match interp.exec("throw 'boom'") {
        Err(ExecError::Exception) => {
            let thrown = interp.get_thrown_value().expect("thrown value kept");
            assert_eq!(interp.get_string(&thrown), Some("boom"));
        }
        other => panic!("expected exception, got {:?}", other),
    }
}

#[test]
fn finally_dominates_other_completions() {
    // Return through finally: the finally body still runs.
    assert_eq!(
        eval_string(
            "var s = ''; \
             function f() { try { return 'r' } finally { s += 'f' } } \
             var r = f(); s + r"
        ),
        "fr"
    );
    // A throwing finally replaces the pending exception.
    assert_eq!(
        eval_string(
            "var got = ''; \
             try { try { throw 'first' } finally { throw 'second' } } \
             catch (e) { got = e } got"
        ),
        "second"
    );
    // Return value survives an intervening finally.
    assert_eq!(
        eval_number("function f() { try { return 1 } finally { 2; } } f()"),
        1.0
    );
    // break through finally.
    assert_eq!(
        eval_string(
            "var s = ''; \
             while (true) { try { s += 'a'; break } finally { s += 'f' } } s"
        ),
        "af"
    );
}

#[test]
fn nested_exception_scopes() {
    assert_eq!(
        eval_string(
            "var s = ''; \
             try { \
               try { throw 'inner' } catch (e) { s += '1' + e; throw 'outer' } \
             } catch (e) { s += '2' + e } s"
        ),
        "1inner2outer"
    );
    // The catch binding shadows and unshadows.
    assert_eq!(
        eval_string(
            "var e = 'outer'; try { throw 'caught' } catch (e) { } e"
        ),
        "outer"
    );
}

#[test]
fn equality_and_comparison() {
    assert_eq!(eval_bool("1 == '1'"), true);
    assert_eq!(eval_bool("1 === '1'"), false);
    assert_eq!(eval_bool("null == undefined"), true);
    assert_eq!(eval_bool("null === undefined"), false);
    assert_eq!(eval_bool("NaN == NaN"), false);
    assert_eq!(eval_bool("'abc' === 'ab' + 'c'"), true);
    assert_eq!(eval_bool("'a' < 'b'"), true);
    assert_eq!(eval_bool("2 < 10"), true);
    assert_eq!(eval_bool("'2' < '10'"), false);
    assert_eq!(eval_bool("1 != 2"), true);
    assert_eq!(eval_bool("1 !== 1"), false);
}

#[test]
fn truthiness_and_logic() {
    assert_eq!(eval_number("0 || 5"), 5.0);
    assert_eq!(eval_number("3 || 5"), 3.0);
    assert_eq!(eval_number("0 && 5"), 0.0);
    assert_eq!(eval_number("2 && 5"), 5.0);
    assert_eq!(eval_bool("!''"), true);
    assert_eq!(eval_bool("!!{}"), true);
    assert_eq!(eval_number("false ? 1 : 2"), 2.0);
}

#[test]
fn typeof_and_void_and_delete() {
    assert_eq!(eval_string("typeof 1"), "number");
    assert_eq!(eval_string("typeof 'x'"), "string");
    assert_eq!(eval_string("typeof undefined"), "undefined");
    assert_eq!(eval_string("typeof null"), "object");
    assert_eq!(eval_string("typeof {}"), "object");
    assert_eq!(eval_string("typeof function () {}"), "function");
    assert_eq!(eval_string("typeof not_declared_anywhere"), "undefined");
    assert_eq!(eval_bool("void 7 === undefined"), true);
    assert_eq!(eval_bool("var o = { x: 1 }; delete o.x; o.x === undefined"), true);
    assert_eq!(eval_bool("delete undefined"), false);
}

#[test]
fn increments_and_compound_assignment() {
    assert_eq!(eval_number("var i = 5; i++"), 5.0);
    assert_eq!(eval_number("var i = 5; i++; i"), 6.0);
    assert_eq!(eval_number("var i = 5; ++i"), 6.0);
    assert_eq!(eval_number("var i = 5; i--; i"), 4.0);
    assert_eq!(eval_number("var o = { n: 1 }; o.n++; o.n"), 2.0);
    assert_eq!(eval_number("var a = [7]; a[0]++"), 7.0);
    assert_eq!(eval_number("var x = 4; x += 3; x *= 2; x"), 14.0);
    assert_eq!(eval_string("var s = 'a'; s += 'b'; s"), "ab");
}

#[test]
fn strict_mode_behavior() {
    // Assignment to an undeclared name throws in strict mode.
    let mut interp = Interp::new();
    assert!(matches!(
        interp.exec("'use strict'; phantom = 1;"),
        Err(ExecError::Exception)
    ));
    // ...and creates a global otherwise.
    assert_eq!(eval_number("phantom = 3; phantom"), 3.0);
}

#[test]
fn reference_errors() {
    let mut interp = Interp::new();
    assert!(matches!(interp.exec("no_such_thing"), Err(ExecError::Exception)));
    // But typeof is safe, and catch recovers.
    assert_eq!(
        eval_bool("var caught = false; try { nope } catch (e) { caught = true } caught"),
        true
    );
}

#[test]
fn syntax_errors_are_reported_not_thrown() {
    let mut interp = Interp::new();
    assert!(matches!(interp.exec("var ="), Err(ExecError::Syntax(_))));
    assert!(matches!(interp.exec("with (o) {}"), Err(ExecError::Syntax(_))));
    assert!(matches!(interp.exec("x: while(1){}"), Err(ExecError::Syntax(_))));
}

#[test]
fn host_apply_and_roundtrip() {
    let mut interp = Interp::new();
    interp
        .exec("function mul(a, b) { return a * b }")
        .unwrap();
    let f = interp.get(interp.global(), "mul");
    let r = interp
        .apply(f, Value::Undefined, &[Value::Number(6.0), Value::Number(7.0)])
        .unwrap();
    assert_eq!(r.as_number(), Some(42.0));
}

#[test]
fn native_callbacks_round_trip() {
    fn triple(interp: &mut Interp) -> vm::VmResult<Value> {
        let n = interp.get_double(interp.arg(0));
        Ok(Value::Number(n * 3.0))
    }
    let mut interp = Interp::new();
    let f = interp.mk_cfunction(triple);
    let g = interp.global();
    interp.set(g, "triple", f).unwrap();
    assert_eq!(
        interp.exec("triple(5) + triple(2)").unwrap().as_number(),
        Some(21.0)
    );
}

#[test]
fn interrupt_stops_long_loops() {
    let mut interp = Interp::new();
    interp.interrupt();
    match interp.exec("while (true) {}") {
        Err(ExecError::Exception) => {}
        other => panic!("expected interrupt exception, got {:?}", other),
    }
}

#[test]
fn gc_transparency_under_pressure() {
    // Force frequent collections with a tiny string-buffer threshold.
    let mut opts = vm::Options::default();
    opts.heap.string_gc_threshold = 512;
    let mut interp = Interp::with_options(opts);
    let v = interp
        .exec(
            "var parts = ''; \
             for (var i = 0; i < 200; i++) { parts = parts + 'chunk' + i + ';' } \
             parts.length",
        )
        .unwrap();
    // 'chunk' + index digits + ';' per iteration.
    assert!(v.as_number().unwrap() > 1000.0);
}

#[test]
fn stack_depth_is_bounded() {
    let mut interp = Interp::new();
    match interp.exec("function f() { return f() } f()") {
        Err(ExecError::Exception) => {
            // The exhaustion surfaces as a catchable InternalError value.
            assert!(interp.get_thrown_value().is_some());
        }
        other => panic!("expected stack exhaustion, got {:?}", other),
    }
}

#[test]
fn json_exec_opt() {
    let mut interp = Interp::new();
    let v = interp
        .exec_opt(
            "{\"a\": [1, 2]}",
            vm::ExecOpts {
                is_json: true,
                ..Default::default()
            },
        )
        .unwrap();
    let a = interp.get(v, "a");
    assert_eq!(interp.array_length(a), 2);
}

#[test]
fn compile_to_sink() {
    let mut interp = Interp::new();
    let mut listing = Vec::new();
    interp.compile("1 + 2;", false, &mut listing).unwrap();
    let text = String::from_utf8(listing).unwrap();
    assert!(text.contains("ADD"));

    let mut image = Vec::new();
    interp.compile("1 + 2;", true, &mut image).unwrap();
    assert_eq!(&image[..4], b"PTRL");
}
