//! Bcode records and the builder the compiler drives.

use crate::op::{Op, WIDE_LIT};
use crate::BcodeOff;
use std::rc::Rc;

/// Index into a bcode's literal pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LitIdx(pub u32);

/// A literal pool entry.
#[derive(Debug, Clone)]
pub enum Lit {
    Number(f64),
    Str(String),
    Regexp {
        source: String,
        flags: String,
    },
    /// An inner function body. The VM turns this into a closure when a
    /// `FuncLit` opcode binds the current scope.
    Func(Rc<Bcode>),
}

/// A line-number delta record: opcodes from `ops_off` onward belong to
/// source line `line`, until the next record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRec {
    pub ops_off: BcodeOff,
    pub line: u32,
}

/// The compiled form of one script or function body.
#[derive(Debug, Default)]
pub struct Bcode {
    /// Opcode byte stream.
    pub ops: Vec<u8>,
    /// Literal pool.
    pub lits: Vec<Lit>,
    /// Name table: entry 0 is the function name (empty for scripts and
    /// anonymous functions), the next `args_cnt` entries are the formal
    /// parameters, the rest are hoisted locals.
    pub names: Vec<String>,
    /// Number of formal parameters.
    pub args_cnt: u8,
    /// Compiled in strict mode.
    pub strict: bool,
    /// Line-number delta records, ascending by offset.
    pub lines: Vec<LineRec>,
}

impl Bcode {
    /// The function name, if any.
    pub fn func_name(&self) -> Option<&str> {
        match self.names.first().map(String::as_str) {
            Some("") | None => None,
            Some(name) => Some(name),
        }
    }

    /// The formal parameter names.
    pub fn arg_names(&self) -> &[String] {
        let cnt = self.args_cnt as usize;
        &self.names[1..1 + cnt]
    }

    /// The hoisted local names (declared `var`s and function declarations).
    pub fn var_names(&self) -> &[String] {
        &self.names[1 + self.args_cnt as usize..]
    }

    /// Source line owning the opcode at `off`, per the delta records.
    pub fn line_at(&self, off: BcodeOff) -> Option<u32> {
        let mut line = None;
        for rec in &self.lines {
            if rec.ops_off > off {
                break;
            }
            line = Some(rec.line);
        }
        line
    }
}

/// A forward-jump operand awaiting its target.
#[derive(Debug, Clone, Copy)]
#[must_use = "unpatched jumps leave a zero target in the stream"]
pub struct Patch(BcodeOff);

/// Append-and-patch emitter for one bcode record.
#[derive(Debug, Default)]
pub struct BcodeBuilder {
    bcode: Bcode,
    last_line: u32,
}

impl BcodeBuilder {
    pub fn new() -> BcodeBuilder {
        let mut b = BcodeBuilder::default();
        // Name slot 0 is reserved for the function name.
        b.bcode.names.push(String::new());
        b
    }

    /// Current offset; the target of a backward jump.
    pub fn here(&self) -> BcodeOff {
        self.bcode.ops.len() as BcodeOff
    }

    /// Emits a plain opcode.
    pub fn op(&mut self, op: Op) {
        self.bcode.ops.push(op as u8);
    }

    /// Emits an opcode with a literal-index operand.
    pub fn op_lit(&mut self, op: Op, lit: LitIdx) {
        self.op(op);
        if lit.0 < WIDE_LIT as u32 {
            self.bcode.ops.push(lit.0 as u8);
        } else {
            self.bcode.ops.push(WIDE_LIT);
            self.bcode.ops.extend_from_slice(&lit.0.to_le_bytes());
        }
    }

    /// Emits an opcode with an arity operand.
    pub fn op_arity(&mut self, op: Op, arity: u8) {
        self.op(op);
        self.bcode.ops.push(arity);
    }

    /// Emits a jump-family opcode with a known (backward) target.
    pub fn op_target(&mut self, op: Op, target: BcodeOff) {
        self.op(op);
        self.bcode.ops.extend_from_slice(&target.to_le_bytes());
    }

    /// Emits a jump-family opcode with a placeholder target to patch later.
    pub fn op_forward(&mut self, op: Op) -> Patch {
        self.op(op);
        let at = self.here();
        self.bcode.ops.extend_from_slice(&0u32.to_le_bytes());
        Patch(at)
    }

    /// Points a pending forward jump at the current offset.
    pub fn patch(&mut self, patch: Patch) {
        let target = self.here().to_le_bytes();
        let at = patch.0 as usize;
        self.bcode.ops[at..at + 4].copy_from_slice(&target);
    }

    /// Interns a literal. Numbers and strings deduplicate by content.
    pub fn add_lit(&mut self, lit: Lit) -> LitIdx {
        match &lit {
            Lit::Number(n) => {
                for (i, l) in self.bcode.lits.iter().enumerate() {
                    if let Lit::Number(m) = l {
                        if m.to_bits() == n.to_bits() {
                            return LitIdx(i as u32);
                        }
                    }
                }
            }
            Lit::Str(s) => {
                for (i, l) in self.bcode.lits.iter().enumerate() {
                    if let Lit::Str(t) = l {
                        if s == t {
                            return LitIdx(i as u32);
                        }
                    }
                }
            }
            _ => {}
        }
        self.bcode.lits.push(lit);
        LitIdx(self.bcode.lits.len() as u32 - 1)
    }

    /// Interns a string literal.
    pub fn string_lit(&mut self, s: &str) -> LitIdx {
        self.add_lit(Lit::Str(s.to_string()))
    }

    /// Appends a hoisted name to the name table.
    pub fn add_name(&mut self, name: &str) {
        self.bcode.names.push(name.to_string());
    }

    /// Sets the function name (name-table slot 0).
    pub fn set_func_name(&mut self, name: &str) {
        self.bcode.names[0] = name.to_string();
    }

    /// Records the formal-parameter count. The builder must already hold
    /// exactly that many names after slot 0.
    pub fn set_args_cnt(&mut self, cnt: u8) {
        self.bcode.args_cnt = cnt;
    }

    pub fn set_strict(&mut self, strict: bool) {
        self.bcode.strict = strict;
    }

    pub fn strict(&self) -> bool {
        self.bcode.strict
    }

    /// Emits a line-advance record when the line actually changed.
    pub fn line_no(&mut self, line: u32) {
        if line != 0 && line != self.last_line {
            self.last_line = line;
            self.bcode.lines.push(LineRec {
                ops_off: self.here(),
                line,
            });
        }
    }

    /// Finishes the record.
    pub fn build(self) -> Bcode {
        self.bcode
    }
}

/// Reads the variable-width literal index at `off`; returns the index and
/// the offset right past it.
pub fn read_lit_idx(ops: &[u8], off: usize) -> (LitIdx, usize) {
    let b = ops[off];
    if b < WIDE_LIT {
        (LitIdx(b as u32), off + 1)
    } else {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(&ops[off + 1..off + 5]);
        (LitIdx(u32::from_le_bytes(buf)), off + 5)
    }
}

/// Reads the fixed-width jump target at `off`.
pub fn read_off(ops: &[u8], off: usize) -> (BcodeOff, usize) {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&ops[off..off + 4]);
    (u32::from_le_bytes(buf), off + 4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_patching() {
        let mut b = BcodeBuilder::new();
        b.op(Op::PushTrue);
        let jump = b.op_forward(Op::JmpFalse);
        b.op(Op::PushZero);
        b.patch(jump);
        b.op(Op::PushOne);
        let bc = b.build();
        // Offset operand points right past PUSH_ZERO.
        let (target, _) = read_off(&bc.ops, 2);
        assert_eq!(target, 7);
        assert_eq!(bc.ops[target as usize], Op::PushOne as u8);
    }

    #[test]
    fn test_lit_dedup_by_content() {
        let mut b = BcodeBuilder::new();
        let a = b.add_lit(Lit::Number(42.0));
        let c = b.string_lit("hello");
        let a2 = b.add_lit(Lit::Number(42.0));
        let c2 = b.string_lit("hello");
        assert_eq!(a, a2);
        assert_eq!(c, c2);
        assert_eq!(b.build().lits.len(), 2);
    }

    #[test]
    fn test_wide_lit_encoding() {
        let mut b = BcodeBuilder::new();
        // Force many distinct literals so the index crosses the escape.
        for i in 0..300 {
            b.string_lit(&format!("lit{}", i));
        }
        let idx = b.string_lit("lit299");
        assert_eq!(idx.0, 299);
        b.op_lit(Op::PushLit, idx);
        let bc = b.build();
        let (got, end) = read_lit_idx(&bc.ops, 1);
        assert_eq!(got, idx);
        assert_eq!(end, 1 + 5);
    }

    #[test]
    fn test_name_table_layout() {
        let mut b = BcodeBuilder::new();
        b.set_func_name("f");
        b.add_name("x");
        b.add_name("y");
        b.set_args_cnt(2);
        b.add_name("local");
        let bc = b.build();
        assert_eq!(bc.func_name(), Some("f"));
        assert_eq!(bc.arg_names(), ["x", "y"]);
        assert_eq!(bc.var_names(), ["local"]);
    }

    #[test]
    fn test_line_records_dedupe() {
        let mut b = BcodeBuilder::new();
        b.line_no(1);
        b.op(Op::PushZero);
        b.line_no(1);
        b.op(Op::PushOne);
        b.line_no(2);
        b.op(Op::Add);
        let bc = b.build();
        assert_eq!(bc.lines.len(), 2);
        assert_eq!(bc.line_at(0), Some(1));
        assert_eq!(bc.line_at(1), Some(1));
        assert_eq!(bc.line_at(2), Some(2));
    }
}
