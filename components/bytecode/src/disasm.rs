//! Bcode listings for `--print-bytecode` and ahead-of-time compilation.

use crate::bcode::{read_lit_idx, read_off, Bcode, Lit};
use crate::op::Op;
use std::fmt::Write;

/// Renders a bcode record, then its inner function literals, indented one
/// level per nesting depth.
pub fn disassemble(bcode: &Bcode) -> String {
    let mut out = String::new();
    dis_one(bcode, 0, &mut out);
    out
}

fn dis_one(bcode: &Bcode, depth: usize, out: &mut String) {
    let pad = "  ".repeat(depth);
    let name = bcode.func_name().unwrap_or("<script>");
    let _ = writeln!(
        out,
        "{}; {} args={} strict={}",
        pad, name, bcode.args_cnt, bcode.strict
    );
    if !bcode.names.is_empty() {
        let _ = writeln!(out, "{}; names: {}", pad, bcode.names.join(" "));
    }

    let mut off = 0usize;
    while off < bcode.ops.len() {
        let at = off;
        let op = match Op::from_u8(bcode.ops[off]) {
            Some(op) => op,
            None => {
                let _ = writeln!(out, "{}{:6} ??? {:#04x}", pad, at, bcode.ops[off]);
                off += 1;
                continue;
            }
        };
        off += 1;
        if op.has_lit_operand() {
            let (lit, next) = read_lit_idx(&bcode.ops, off);
            off = next;
            let rendered = match bcode.lits.get(lit.0 as usize) {
                Some(Lit::Number(n)) => format!("{}", n),
                Some(Lit::Str(s)) => format!("{:?}", s),
                Some(Lit::Regexp { source, flags }) => format!("/{}/{}", source, flags),
                Some(Lit::Func(f)) => {
                    format!("<function {}>", f.func_name().unwrap_or("anonymous"))
                }
                None => "<bad lit>".to_string(),
            };
            let _ = writeln!(out, "{}{:6} {} {} ; {}", pad, at, op.name(), lit.0, rendered);
        } else if op.has_off_operand() {
            let (target, next) = read_off(&bcode.ops, off);
            off = next;
            let _ = writeln!(out, "{}{:6} {} -> {}", pad, at, op.name(), target);
        } else if op.has_arity_operand() {
            let arity = bcode.ops[off];
            off += 1;
            let _ = writeln!(out, "{}{:6} {} {}", pad, at, op.name(), arity);
        } else {
            let _ = writeln!(out, "{}{:6} {}", pad, at, op.name());
        }
    }

    for lit in &bcode.lits {
        if let Lit::Func(inner) = lit {
            dis_one(inner, depth + 1, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bcode::BcodeBuilder;

    #[test]
    fn test_listing_shape() {
        let mut b = BcodeBuilder::new();
        let lit = b.string_lit("greeting");
        b.op(Op::PushUndefined);
        b.op_lit(Op::GetVar, lit);
        b.op_arity(Op::Call, 0);
        b.op(Op::SwapDrop);
        let listing = disassemble(&b.build());
        assert!(listing.contains("PUSH_UNDEFINED"));
        assert!(listing.contains("GET_VAR 0 ; \"greeting\""));
        assert!(listing.contains("CALL 0"));
    }
}
