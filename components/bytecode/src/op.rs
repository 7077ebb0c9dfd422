//! The opcode set.
//!
//! Every opcode documents its stack effect as `( before -- after )`.
//! Operands follow the opcode byte in the stream: literal indices are
//! variable width (one byte below the escape value, else an escape byte
//! followed by a 32-bit index), jump targets are fixed-width 32-bit
//! offsets so they can be patched, and call arities are one byte.

/// Escape byte introducing a wide literal index.
pub const WIDE_LIT: u8 = 0xff;

/// One opcode. The discriminants are the wire encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Op {
    /// `( a -- )`
    Drop = 0,
    /// `( a -- a a )`
    Dup,
    /// `( a b -- a b a b )`
    Dup2,
    /// `( a b -- b a )`
    Swap,
    /// `( a b -- b )`
    SwapDrop,
    /// `( a -- a )` copies the top of stack into the stash register.
    Stash,
    /// `( a -- stash )` replaces the top of stack with the stashed value
    /// and clears the register.
    Unstash,
    /// `( -- undefined )`
    PushUndefined,
    /// `( -- null )`
    PushNull,
    /// `( -- true )`
    PushTrue,
    /// `( -- false )`
    PushFalse,
    /// `( -- 0 )`
    PushZero,
    /// `( -- 1 )`
    PushOne,
    /// `( -- this )`
    PushThis,
    /// `( -- lit )` literal index operand.
    PushLit,

    /// `( a b -- a+b )` with string concatenation.
    Add,
    /// `( a b -- a-b )`
    Sub,
    /// `( a b -- a*b )`
    Mul,
    /// `( a b -- a/b )`
    Div,
    /// `( a b -- a%b )`
    Rem,
    /// `( a b -- a<<b )`
    Lshift,
    /// `( a b -- a>>b )`
    Rshift,
    /// `( a b -- a>>>b )`
    Urshift,
    /// `( a b -- a|b )`
    Or,
    /// `( a b -- a^b )`
    Xor,
    /// `( a b -- a&b )`
    And,
    /// `( a -- !a )`
    LogicalNot,
    /// `( a -- ~a )`
    Not,
    /// `( a -- +a )`
    Pos,
    /// `( a -- -a )`
    Neg,

    /// `( a b -- a==b )`
    Eq,
    /// `( a b -- a===b )`
    EqEq,
    /// `( a b -- a!=b )`
    Ne,
    /// `( a b -- a!==b )`
    NeNe,
    /// `( a b -- a<b )`
    Lt,
    /// `( a b -- a<=b )`
    Le,
    /// `( a b -- a>b )`
    Gt,
    /// `( a b -- a>=b )`
    Ge,
    /// `( a b -- a in b )`
    In,
    /// `( a b -- a instanceof b )`
    Instanceof,
    /// `( a -- typeof a )`
    Typeof,

    /// `( -- value )` literal name operand; throws ReferenceError when the
    /// identifier is not found on the scope chain.
    GetVar,
    /// `( -- value )` like `GetVar` but yields `undefined` instead of
    /// throwing; emitted for `typeof identifier`.
    SafeGetVar,
    /// `( value -- value )` literal name operand; assigns on the scope
    /// chain, creating a global in sloppy mode.
    SetVar,
    /// `( -- ok )` literal name operand; deletes a scope binding.
    DeleteVar,
    /// `( obj name -- value )`
    Get,
    /// `( obj name value -- value )`
    Set,
    /// `( obj name -- ok )`
    Delete,

    /// `( -- obj )`
    CreateObj,
    /// `( -- arr )`
    CreateArr,

    /// `( -- )` unconditional jump, offset operand.
    Jmp,
    /// `( cond -- )` jump when truthy.
    JmpTrue,
    /// `( cond -- )` jump when falsy.
    JmpFalse,
    /// `( cond -- )` jump when truthy, dropping one extra slot on the
    /// taken path; used by `switch` case dispatch.
    JmpTrueDrop,
    /// `( -- )` jump taken only while a `continue` is unwinding; clears
    /// the continuing flag.
    JmpIfContinue,

    /// `( ... callable ... -- ... )` verifies the callable two slots under
    /// the arguments start, pre-building the TypeError that `Call`/`New`
    /// will throw.
    CheckCall,
    /// `( this callable arg1..argN -- result )` arity operand.
    Call,
    /// `( this callable arg1..argN -- constructed )` arity operand.
    New,
    /// `( funclit -- closure )` binds the enclosing scope into a function
    /// literal.
    FuncLit,
    /// `( result -- )` returns from the current function.
    Ret,

    /// `( -- )` opens a catch handler at the offset operand.
    TryPushCatch,
    /// `( -- )` opens a finally handler at the offset operand.
    TryPushFinally,
    /// `( -- )` opens a loop record whose offset is the loop epilogue.
    TryPushLoop,
    /// `( -- )` opens a switch record whose offset is past the statement.
    TryPushSwitch,
    /// `( -- )` closes the most recent handler.
    TryPop,
    /// `( thrown -- )` literal name operand; installs a catch scope frame
    /// binding the thrown value.
    EnterCatch,
    /// `( -- )` leaves the catch scope frame.
    ExitCatch,
    /// `( -- )` resumes whatever completion a finally block suspended.
    AfterFinally,
    /// `( -- )` unwinds to the nearest loop or switch record.
    Break,
    /// `( -- )` like `Break` but arms the continuing flag.
    Continue,
    /// `( err -- )` throws.
    Throw,
    /// `( obj handle -- obj handle' key true )` when another enumerable
    /// property exists, `( obj handle -- false )` otherwise. Drives
    /// `for…in`; the handle is opaque and starts out as `null`.
    NextProp,
}

impl Op {
    /// Decodes an opcode byte.
    pub fn from_u8(byte: u8) -> Option<Op> {
        if byte <= Op::NextProp as u8 {
            // Discriminants are dense and start at zero.
            Some(ALL_OPS[byte as usize])
        } else {
            None
        }
    }

    /// Mnemonic for listings.
    pub fn name(&self) -> &'static str {
        match self {
            Op::Drop => "DROP",
            Op::Dup => "DUP",
            Op::Dup2 => "2DUP",
            Op::Swap => "SWAP",
            Op::SwapDrop => "SWAP_DROP",
            Op::Stash => "STASH",
            Op::Unstash => "UNSTASH",
            Op::PushUndefined => "PUSH_UNDEFINED",
            Op::PushNull => "PUSH_NULL",
            Op::PushTrue => "PUSH_TRUE",
            Op::PushFalse => "PUSH_FALSE",
            Op::PushZero => "PUSH_ZERO",
            Op::PushOne => "PUSH_ONE",
            Op::PushThis => "PUSH_THIS",
            Op::PushLit => "PUSH_LIT",
            Op::Add => "ADD",
            Op::Sub => "SUB",
            Op::Mul => "MUL",
            Op::Div => "DIV",
            Op::Rem => "REM",
            Op::Lshift => "LSHIFT",
            Op::Rshift => "RSHIFT",
            Op::Urshift => "URSHIFT",
            Op::Or => "OR",
            Op::Xor => "XOR",
            Op::And => "AND",
            Op::LogicalNot => "LOGICAL_NOT",
            Op::Not => "NOT",
            Op::Pos => "POS",
            Op::Neg => "NEG",
            Op::Eq => "EQ",
            Op::EqEq => "EQ_EQ",
            Op::Ne => "NE",
            Op::NeNe => "NE_NE",
            Op::Lt => "LT",
            Op::Le => "LE",
            Op::Gt => "GT",
            Op::Ge => "GE",
            Op::In => "IN",
            Op::Instanceof => "INSTANCEOF",
            Op::Typeof => "TYPEOF",
            Op::GetVar => "GET_VAR",
            Op::SafeGetVar => "SAFE_GET_VAR",
            Op::SetVar => "SET_VAR",
            Op::DeleteVar => "DELETE_VAR",
            Op::Get => "GET",
            Op::Set => "SET",
            Op::Delete => "DELETE",
            Op::CreateObj => "CREATE_OBJ",
            Op::CreateArr => "CREATE_ARR",
            Op::Jmp => "JMP",
            Op::JmpTrue => "JMP_TRUE",
            Op::JmpFalse => "JMP_FALSE",
            Op::JmpTrueDrop => "JMP_TRUE_DROP",
            Op::JmpIfContinue => "JMP_IF_CONTINUE",
            Op::CheckCall => "CHECK_CALL",
            Op::Call => "CALL",
            Op::New => "NEW",
            Op::FuncLit => "FUNC_LIT",
            Op::Ret => "RET",
            Op::TryPushCatch => "TRY_PUSH_CATCH",
            Op::TryPushFinally => "TRY_PUSH_FINALLY",
            Op::TryPushLoop => "TRY_PUSH_LOOP",
            Op::TryPushSwitch => "TRY_PUSH_SWITCH",
            Op::TryPop => "TRY_POP",
            Op::EnterCatch => "ENTER_CATCH",
            Op::ExitCatch => "EXIT_CATCH",
            Op::AfterFinally => "AFTER_FINALLY",
            Op::Break => "BREAK",
            Op::Continue => "CONTINUE",
            Op::Throw => "THROW",
            Op::NextProp => "NEXT_PROP",
        }
    }

    /// Whether a literal-index operand follows.
    pub fn has_lit_operand(&self) -> bool {
        matches!(
            self,
            Op::PushLit | Op::GetVar | Op::SafeGetVar | Op::SetVar | Op::DeleteVar | Op::EnterCatch
        )
    }

    /// Whether a jump-target operand follows.
    pub fn has_off_operand(&self) -> bool {
        matches!(
            self,
            Op::Jmp
                | Op::JmpTrue
                | Op::JmpFalse
                | Op::JmpTrueDrop
                | Op::JmpIfContinue
                | Op::TryPushCatch
                | Op::TryPushFinally
                | Op::TryPushLoop
                | Op::TryPushSwitch
        )
    }

    /// Whether an arity operand follows.
    pub fn has_arity_operand(&self) -> bool {
        matches!(self, Op::Call | Op::New)
    }
}

const ALL_OPS: [Op; Op::NextProp as usize + 1] = [
    Op::Drop,
    Op::Dup,
    Op::Dup2,
    Op::Swap,
    Op::SwapDrop,
    Op::Stash,
    Op::Unstash,
    Op::PushUndefined,
    Op::PushNull,
    Op::PushTrue,
    Op::PushFalse,
    Op::PushZero,
    Op::PushOne,
    Op::PushThis,
    Op::PushLit,
    Op::Add,
    Op::Sub,
    Op::Mul,
    Op::Div,
    Op::Rem,
    Op::Lshift,
    Op::Rshift,
    Op::Urshift,
    Op::Or,
    Op::Xor,
    Op::And,
    Op::LogicalNot,
    Op::Not,
    Op::Pos,
    Op::Neg,
    Op::Eq,
    Op::EqEq,
    Op::Ne,
    Op::NeNe,
    Op::Lt,
    Op::Le,
    Op::Gt,
    Op::Ge,
    Op::In,
    Op::Instanceof,
    Op::Typeof,
    Op::GetVar,
    Op::SafeGetVar,
    Op::SetVar,
    Op::DeleteVar,
    Op::Get,
    Op::Set,
    Op::Delete,
    Op::CreateObj,
    Op::CreateArr,
    Op::Jmp,
    Op::JmpTrue,
    Op::JmpFalse,
    Op::JmpTrueDrop,
    Op::JmpIfContinue,
    Op::CheckCall,
    Op::Call,
    Op::New,
    Op::FuncLit,
    Op::Ret,
    Op::TryPushCatch,
    Op::TryPushFinally,
    Op::TryPushLoop,
    Op::TryPushSwitch,
    Op::TryPop,
    Op::EnterCatch,
    Op::ExitCatch,
    Op::AfterFinally,
    Op::Break,
    Op::Continue,
    Op::Throw,
    Op::NextProp,
];
