//! Builtin behavior driven through script execution.

use vm::{Interp, Value};

fn engine() -> Interp {
    let mut interp = Interp::new();
    stdlib::install(&mut interp).expect("stdlib install");
    interp
}

fn eval(src: &str) -> (Interp, Value) {
    let mut interp = engine();
    let v = interp.exec(src).unwrap_or_else(|e| {
        let detail = interp
            .get_thrown_value()
            .map(|t| interp.to_json_or_debug(t, true).unwrap_or_default());
        panic!("exec failed: {:?} thrown={:?} for {:?}", e, detail, src)
    });
    (interp, v)
}

fn eval_number(src: &str) -> f64 {
    let (_interp, v) = eval(src);
    v.as_number().unwrap_or_else(|| panic!("not a number: {:?}", v))
}

fn eval_string(src: &str) -> String {
    let (interp, v) = eval(src);
    interp.get_string(&v).expect("string result").to_string()
}

fn eval_bool(src: &str) -> bool {
    let (_interp, v) = eval(src);
    v.as_bool().expect("boolean result")
}

#[test]
fn object_define_property_and_keys() {
    assert_eq!(eval_string("var o = {a: 1, b: 2}; Object.keys(o).join('-')"), "a-b");
    assert_eq!(
        eval_number("var o = {x: 1}; Object.defineProperty(o, 'y', {value: 2}); o.y"),
        2.0
    );
    // Non-enumerable properties stay out of keys.
    assert_eq!(
        eval_string(
            "var o = {a: 1}; \
             Object.defineProperty(o, 'h', {value: 2, enumerable: false}); \
             Object.keys(o).join('-')"
        ),
        "a"
    );
}

#[test]
fn object_accessors_via_define_property() {
    assert_eq!(
        eval_number(
            "var o = {}; var backing = 7; \
             Object.defineProperty(o, 'x', { \
               get: function () { return backing; }, \
               set: function (v) { backing = v * 2; } }); \
             o.x = 21; o.x"
        ),
        42.0
    );
}

#[test]
fn object_prevent_extensions() {
    assert_eq!(
        eval_bool("var o = {}; Object.preventExtensions(o); o.nope = 1; !('nope' in o) && !Object.isExtensible(o)"),
        true
    );
}

#[test]
fn array_methods() {
    assert_eq!(eval_string("[1, 2, 3].join('+')"), "1+2+3");
    assert_eq!(eval_number("[1, 2, 3].indexOf(2)"), 1.0);
    assert_eq!(eval_number("[4, 5].push(6)"), 3.0);
    assert_eq!(eval_number("var a = [1, 2]; a.pop(); a.length"), 1.0);
    assert_eq!(eval_string("[1, 2, 3, 4].slice(1, 3).join(',')"), "2,3");
    assert_eq!(eval_string("[1].concat([2, 3], 4).join(',')"), "1,2,3,4");
    assert_eq!(eval_string("['a', 'b'].map(function (s) { return s + '!' }).join('')"), "a!b!");
    assert_eq!(eval_number("var n = 0; [1, 2, 3].forEach(function (x) { n += x }); n"), 6.0);
    assert_eq!(eval_bool("Array.isArray([]) && !Array.isArray({})"), true);
    assert_eq!(eval_number("new Array(5).length"), 5.0);
}

#[test]
fn string_methods() {
    assert_eq!(eval_string("'abc'.charAt(1)"), "b");
    assert_eq!(eval_number("'abc'.charCodeAt(0)"), 97.0);
    assert_eq!(eval_number("'hello'.indexOf('ll')"), 2.0);
    assert_eq!(eval_string("'hello'.substring(1, 3)"), "el");
    assert_eq!(eval_string("'hello'.slice(-3)"), "llo");
    assert_eq!(eval_string("'a,b,c'.split(',').join('|')"), "a|b|c");
    assert_eq!(eval_string("'MiXeD'.toLowerCase()"), "mixed");
    assert_eq!(eval_string("'MiXeD'.toUpperCase()"), "MIXED");
    assert_eq!(eval_string("String.fromCharCode(104, 105)"), "hi");
    assert_eq!(eval_number("'abc'.length"), 3.0);
}

#[test]
fn number_and_global_functions() {
    assert_eq!(eval_string("(255).toString(16)"), "ff");
    assert_eq!(eval_string("(3.14159).toFixed(2)"), "3.14");
    assert_eq!(eval_bool("isNaN(NaN) && !isNaN(1)"), true);
    assert_eq!(eval_bool("isFinite(1) && !isFinite(Infinity)"), true);
    assert_eq!(eval_number("parseInt('42')"), 42.0);
    assert_eq!(eval_number("parseInt('0xff')"), 255.0);
    assert_eq!(eval_number("parseInt('12px')"), 12.0);
    assert_eq!(eval_number("parseFloat('3.5rem')"), 3.5);
    assert_eq!(eval_bool("isNaN(parseInt('nope'))"), true);
}

#[test]
fn math_object() {
    assert_eq!(eval_number("Math.abs(-3)"), 3.0);
    assert_eq!(eval_number("Math.floor(2.9)"), 2.0);
    assert_eq!(eval_number("Math.ceil(2.1)"), 3.0);
    assert_eq!(eval_number("Math.round(2.5)"), 3.0);
    assert_eq!(eval_number("Math.pow(2, 10)"), 1024.0);
    assert_eq!(eval_number("Math.min(3, 1, 2)"), 1.0);
    assert_eq!(eval_number("Math.max(3, 1, 2)"), 3.0);
    assert_eq!(eval_bool("Math.random() >= 0 && Math.random() < 1"), true);
}

#[test]
fn json_namespace() {
    assert_eq!(
        eval_string("JSON.stringify({a: [1, 2], b: 'x'})"),
        "{\"a\":[1,2],\"b\":\"x\"}"
    );
    assert_eq!(eval_number("JSON.parse('{\"n\": 41}').n + 1"), 42.0);
    assert_eq!(eval_bool("JSON.parse('[true, false]')[0]"), true);
}

#[test]
fn error_hierarchy() {
    assert_eq!(
        eval_bool("var e = new TypeError('boom'); e instanceof TypeError && e instanceof Error"),
        true
    );
    assert_eq!(eval_bool("new RangeError('') instanceof TypeError"), false);
    assert_eq!(eval_string("new RangeError('r').message"), "r");
    assert_eq!(eval_string("new TypeError('nope').toString()"), "TypeError: nope");
    // Engine-thrown exceptions share the prototypes.
    assert_eq!(
        eval_bool("try { null.x } catch (e) { e instanceof TypeError }"),
        true
    );
    assert_eq!(
        eval_bool("try { missing_binding } catch (e) { e instanceof ReferenceError }"),
        true
    );
}

#[test]
fn regexp_builtin() {
    assert_eq!(eval_bool("/a+b/.test('caab')"), true);
    assert_eq!(eval_bool("/a+b/.test('cccc')"), false);
    assert_eq!(eval_bool("/AB/i.test('xaby')"), true);
    assert_eq!(eval_string("/(\\d+)-(\\d+)/.exec('a 12-34 b').join(',')"), "12-34,12,34");
    assert_eq!(eval_number("/\\d+/.exec('ab 123').index"), 3.0);
    assert_eq!(eval_string("new RegExp('x+').source"), "x+");
    assert_eq!(
        eval_number("var re = /a/g; re.test('aa'); re.lastIndex"),
        1.0
    );
}

#[test]
fn tostring_and_valueof_coercions() {
    assert_eq!(eval_string("'' + {}"), "[object Object]");
    assert_eq!(eval_string("'' + [1, 2]"), "1,2");
    assert_eq!(eval_number("1 + Number('41')"), 42.0);
    assert_eq!(eval_bool("({}).hasOwnProperty('x')"), false);
    assert_eq!(eval_bool("({x: 1}).hasOwnProperty('x')"), true);
}
