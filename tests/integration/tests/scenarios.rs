//! Literal end-to-end scenarios: each program runs through `exec` and the
//! result is compared exactly.

use integration::{eval_bool, eval_number, eval_string};

#[test]
fn scenario_1_map_and_join() {
    assert_eq!(
        eval_string("var a=[1,2,3]; a.map(function(x){return x*x}).join(\",\")"),
        "1,4,9"
    );
}

#[test]
fn scenario_2_recursive_factorial() {
    assert_eq!(eval_number("function f(n){return n<2?1:n*f(n-1)} f(5)"), 120.0);
}

#[test]
fn scenario_3_throw_catch_finally() {
    assert_eq!(
        eval_number("try{throw {code:42}}catch(e){e.code+1}finally{}"),
        43.0
    );
}

#[test]
fn scenario_4_for_in_insertion_order() {
    assert_eq!(
        eval_string("var s=\"\"; for(var k in {a:1,b:2,c:3}) s+=k; s"),
        "abc"
    );
}

#[test]
fn scenario_5_readonly_assignment_is_silent() {
    assert_eq!(
        eval_number(
            "var o={x:1}; Object.defineProperty(o,\"x\",{writable:false}); o.x=2; o.x"
        ),
        1.0
    );
}

#[test]
fn scenario_6_strict_readonly_assignment_throws_type_error() {
    assert_eq!(
        eval_bool(
            "(function(){\"use strict\"; var o={x:1}; \
             Object.defineProperty(o,\"x\",{writable:false}); \
             try{o.x=2}catch(e){return e instanceof TypeError}})()"
        ),
        true
    );
}
