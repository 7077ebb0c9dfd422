//! Cross-cutting properties: enumeration order, finally dominance, stack
//! neutrality, equality laws, array-length boundaries, JSON round-trips.

use integration::{engine, eval, eval_bool, eval_number, eval_string};

#[test]
fn enumeration_reports_first_added_order() {
    assert_eq!(
        eval_string(
            "var o = {}; o.z = 1; o.a = 2; o.m = 3; delete o.a; o.b = 4; \
             var s = ''; for (var k in o) s += k; s"
        ),
        "zmb"
    );
}

#[test]
fn finally_supersedes_every_completion() {
    // Exception replaced by a newer exception.
    assert_eq!(
        eval_string(
            "var got=''; try{ try{ throw 'a' } finally { throw 'b' } }catch(e){ got=e } got"
        ),
        "b"
    );
    // Return overridden by a return in finally.
    assert_eq!(
        eval_number("function f(){ try { return 1 } finally { return 2 } } f()"),
        2.0
    );
    // Break canceled by a pending exception being replaced: finally runs
    // even when control leaves via break.
    assert_eq!(
        eval_string(
            "var s=''; while(true){ try{ break } finally { s += 'f' } } s + 'x'"
        ),
        "fx"
    );
}

#[test]
fn stack_neutrality_across_statement_kinds() {
    // A long mixed statement sequence still yields the last value
    // statement's result; any stack imbalance would corrupt this.
    assert_eq!(
        eval_number(
            "1; var a = 2; if (a > 1) { 3; } else { 4; } \
             for (var i = 0; i < 3; i++) { i; } \
             try { 5; } finally {} \
             switch (a) { case 2: 6; break; default: 7; } \
             while (false) {} \
             99"
        ),
        99.0
    );
    // Compound statements inherit the previous statement value.
    assert_eq!(eval_number("42; if (false) { 1; }"), 42.0);
    assert_eq!(eval_number("42; while (false) { 1; }"), 42.0);
    assert_eq!(eval_number("42; try { } finally { }"), 42.0);
}

#[test]
fn string_equality_ignores_storage_kind() {
    // Inline, dictionary, and heap-built strings compare by content.
    assert_eq!(eval_bool("'abc' === 'ab' + 'c'"), true);
    assert_eq!(eval_bool("'length' === 'len' + 'gth'"), true);
    assert_eq!(
        eval_bool("'a long string built once' === 'a long string ' + 'built once'"),
        true
    );
}

#[test]
fn array_length_boundaries() {
    // Shrinking deletes elements past the new length.
    assert_eq!(
        eval_bool("var a=[1,2,3]; a.length=1; a[1] === undefined && a.length === 1"),
        true
    );
    // Growing defines an undefined element at the end, visible to
    // enumeration as a gap.
    assert_eq!(
        eval_string("var a=[1]; a.length=3; var s=''; for (var k in a) s+=k; s"),
        "02"
    );
    // Invalid lengths raise RangeError.
    assert_eq!(
        eval_bool("var a=[]; try { a.length = -1 } catch (e) { e instanceof RangeError }"),
        true
    );
}

#[test]
fn delete_contract() {
    assert_eq!(eval_bool("var o = {a: 1}; delete o.a"), true);
    assert_eq!(eval_bool("delete ({}).missing"), true);
    assert_eq!(
        eval_bool(
            "var o = {}; Object.defineProperty(o, 'p', {value: 1, configurable: false}); \
             delete o.p"
        ),
        false
    );
}

#[test]
fn json_roundtrip_law() {
    let (mut interp, v) = eval("({a: [1, 2.5, 'x'], b: {c: null, d: false}})");
    let text = interp.to_json_or_debug(v, false).unwrap();
    let back = interp.parse_json(&text).unwrap();
    let text2 = interp.to_json_or_debug(back, false).unwrap();
    assert_eq!(text, text2);
}

#[test]
fn number_string_roundtrip_law() {
    assert_eq!(
        eval_bool("Number(String(0.125)) === 0.125 && Number(String(-42)) === -42"),
        true
    );
    assert_eq!(eval_bool("Number(String(123456.789)) === 123456.789"), true);
}

#[test]
fn boolean_coercion_idempotent() {
    assert_eq!(
        eval_bool(
            "Boolean(Boolean(0)) === Boolean(0) && Boolean(Boolean({})) === Boolean({})"
        ),
        true
    );
}

#[test]
fn disassembly_preserves_parameter_names() {
    let mut interp = engine();
    let mut listing = Vec::new();
    interp
        .compile("function dist(dx, dy) { return dx * dx + dy * dy }", false, &mut listing)
        .unwrap();
    let text = String::from_utf8(listing).unwrap();
    assert!(text.contains("dist"), "{}", text);
    assert!(text.contains("args=2"), "{}", text);
    assert!(text.contains("dx dy"), "{}", text);
}

#[test]
fn gc_transparency_with_live_object_graph() {
    let mut opts = vm::Options::default();
    opts.heap.string_gc_threshold = 256;
    let mut interp = vm::Interp::with_options(opts);
    stdlib::install(&mut interp).unwrap();
    let v = interp
        .exec(
            "var keep = []; \
             for (var i = 0; i < 100; i++) { keep.push({tag: 'item-number-' + i}) } \
             keep[99].tag",
        )
        .unwrap();
    assert_eq!(interp.get_string(&v), Some("item-number-99"));
}

#[test]
fn prototype_chains_terminate() {
    let mut interp = engine();
    let v = interp.exec("({})").unwrap();
    let mut cur = v;
    let mut steps = 0;
    while cur.is_object() {
        cur = interp.get_proto(cur);
        steps += 1;
        assert!(steps < 16, "prototype chain does not terminate");
    }
    assert!(cur.is_null());
}
