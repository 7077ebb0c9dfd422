//! AST to bytecode lowering.
//!
//! Each script or function body compiles to its own bcode record whose
//! overall stack diagram is `( -- a )`: the prologue pushes `undefined`,
//! every value-producing statement replaces the previous statement's value
//! with a `SWAP_DROP`, and compound statements (declarations, `if`, loops,
//! `try`, `switch`) are stack neutral. Keeping every statement boundary at
//! the same depth is what makes exception unwinding and `break` correct.

use crate::ast::*;
use crate::parser::Parser;
use bytecode::{Bcode, BcodeBuilder, Lit, LitIdx, Op};
use core_types::{ErrorKind, JsError, SourcePosition};
use std::rc::Rc;

/// Parses and compiles a script.
pub fn compile_source(source: &str) -> Result<Rc<Bcode>, JsError> {
    let program = Parser::new(source)?.parse_program()?;
    compile_program(&program)
}

/// Compiles a parsed script.
pub fn compile_program(program: &Program) -> Result<Rc<Bcode>, JsError> {
    let mut b = BcodeBuilder::new();
    b.set_strict(program.strict);
    compile_body(&mut b, &program.body)?;
    Ok(Rc::new(b.build()))
}

/// Emits the shared body prologue: the initial `undefined`, the hoisted
/// name table, and the hoisted function-declaration assignments.
fn compile_body(b: &mut BcodeBuilder, stmts: &[Stmt]) -> Result<(), JsError> {
    b.op(Op::PushUndefined);

    // Hoist `var` and function declarations of this scope. Function
    // assignments come right after the prologue so that hoisted functions
    // are defined before the first statement runs.
    let mut names = Vec::new();
    let mut funcs = Vec::new();
    hoist(stmts, &mut names, &mut funcs);
    for name in &names {
        b.add_name(name);
    }
    for func in funcs {
        let lit = compile_function(b, func)?;
        let name_lit = b.string_lit(func.name.as_deref().unwrap_or(""));
        b.op_lit(Op::PushLit, lit);
        b.op(Op::FuncLit);
        b.op_lit(Op::SetVar, name_lit);
        b.op(Op::Drop);
    }

    compile_stmts(b, stmts)
}

/// Collects hoisted names of one function scope: `var` declarations and
/// function declarations, without descending into nested functions.
fn hoist<'a>(stmts: &'a [Stmt], names: &mut Vec<String>, funcs: &mut Vec<&'a FuncLit>) {
    let mut add = |name: &str, names: &mut Vec<String>| {
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    };
    for stmt in stmts {
        match &stmt.kind {
            StmtKind::Var(decls) => {
                for (name, _) in decls {
                    add(name, names);
                }
            }
            StmtKind::FuncDecl(func) => {
                if let Some(name) = &func.name {
                    add(name, names);
                }
                funcs.push(func);
            }
            StmtKind::Block(body) => hoist(body, names, funcs),
            StmtKind::If {
                then, otherwise, ..
            } => {
                hoist(then, names, funcs);
                if let Some(body) = otherwise {
                    hoist(body, names, funcs);
                }
            }
            StmtKind::While { body, .. } | StmtKind::DoWhile { body, .. } => {
                hoist(body, names, funcs)
            }
            StmtKind::For { init, body, .. } => {
                if let Some(ForInit::Var(decls)) = init {
                    for (name, _) in decls {
                        add(name, names);
                    }
                }
                hoist(body, names, funcs);
            }
            StmtKind::ForIn {
                var,
                declared,
                body,
                ..
            } => {
                if *declared {
                    add(var, names);
                }
                hoist(body, names, funcs);
            }
            StmtKind::Switch { cases, .. } => {
                for case in cases {
                    hoist(&case.body, names, funcs);
                }
            }
            StmtKind::Try {
                block,
                catch,
                finally,
            } => {
                hoist(block, names, funcs);
                if let Some((_, body)) = catch {
                    hoist(body, names, funcs);
                }
                if let Some(body) = finally {
                    hoist(body, names, funcs);
                }
            }
            _ => {}
        }
    }
}

/// Compiles an inner function into a literal of the enclosing builder.
fn compile_function(b: &mut BcodeBuilder, func: &FuncLit) -> Result<LitIdx, JsError> {
    let mut inner = BcodeBuilder::new();
    inner.set_strict(func.strict);
    inner.line_no(func.line);
    if let Some(name) = &func.name {
        inner.set_func_name(name);
    }
    if func.params.len() > u8::MAX as usize {
        return Err(JsError::at(
            ErrorKind::SyntaxError,
            "too many arguments",
            SourcePosition::line(func.line),
        ));
    }
    for param in &func.params {
        inner.add_name(param);
    }
    inner.set_args_cnt(func.params.len() as u8);

    compile_body(&mut inner, &func.body)?;

    // Implicit return: discard the body value, return undefined.
    inner.op(Op::Drop);
    inner.op(Op::PushUndefined);
    inner.op(Op::Ret);

    Ok(b.add_lit(Lit::Func(Rc::new(inner.build()))))
}

/// Compiles a statement list with the inter-statement `SWAP_DROP`
/// discipline.
fn compile_stmts(b: &mut BcodeBuilder, stmts: &[Stmt]) -> Result<(), JsError> {
    for stmt in stmts {
        let neutral = compile_stmt(b, stmt)?;
        if !neutral {
            b.op(Op::SwapDrop);
        }
    }
    Ok(())
}

/// Compiles one statement; the return value reports stack neutrality.
fn compile_stmt(b: &mut BcodeBuilder, stmt: &Stmt) -> Result<bool, JsError> {
    b.line_no(stmt.line);
    match &stmt.kind {
        StmtKind::Empty | StmtKind::FuncDecl(_) => Ok(true),

        StmtKind::Expr(e) => {
            compile_expr(b, e)?;
            Ok(false)
        }

        StmtKind::Var(decls) => {
            for (name, init) in decls {
                if let Some(init) = init {
                    let lit = b.string_lit(name);
                    compile_expr(b, init)?;
                    b.op_lit(Op::SetVar, lit);
                    b.op(Op::Drop);
                }
            }
            Ok(true)
        }

        StmtKind::Block(body) => {
            compile_stmts(b, body)?;
            Ok(true)
        }

        StmtKind::If {
            cond,
            then,
            otherwise,
        } => {
            compile_expr(b, cond)?;
            let if_false = b.op_forward(Op::JmpFalse);
            compile_stmts(b, then)?;
            match otherwise {
                Some(body) => {
                    let end = b.op_forward(Op::Jmp);
                    b.patch(if_false);
                    compile_stmts(b, body)?;
                    b.patch(end);
                }
                None => b.patch(if_false),
            }
            Ok(true)
        }

        StmtKind::While { cond, body } => {
            let end = b.op_forward(Op::TryPushLoop);
            // Condition lives at the bottom of the loop; fewer jumps in the
            // steady state.
            let to_cond = b.op_forward(Op::Jmp);
            let body_target = b.here();
            compile_stmts(b, body)?;
            let continue_target = b.here();
            b.patch(to_cond);
            compile_expr(b, cond)?;
            b.op_target(Op::JmpTrue, body_target);
            b.patch(end);
            b.op_target(Op::JmpIfContinue, continue_target);
            b.op(Op::TryPop);
            Ok(true)
        }

        StmtKind::DoWhile { body, cond } => {
            let end = b.op_forward(Op::TryPushLoop);
            let body_target = b.here();
            compile_stmts(b, body)?;
            let continue_target = b.here();
            compile_expr(b, cond)?;
            b.op_target(Op::JmpTrue, body_target);
            b.patch(end);
            b.op_target(Op::JmpIfContinue, continue_target);
            b.op(Op::TryPop);
            Ok(true)
        }

        StmtKind::For {
            init,
            cond,
            update,
            body,
        } => {
            match init {
                Some(ForInit::Var(decls)) => {
                    for (name, init) in decls {
                        if let Some(init) = init {
                            let lit = b.string_lit(name);
                            compile_expr(b, init)?;
                            b.op_lit(Op::SetVar, lit);
                            b.op(Op::Drop);
                        }
                    }
                }
                Some(ForInit::Expr(e)) => {
                    compile_expr(b, e)?;
                    b.op(Op::Drop);
                }
                None => {}
            }
            let end = b.op_forward(Op::TryPushLoop);
            let to_cond = b.op_forward(Op::Jmp);
            let body_target = b.here();
            compile_stmts(b, body)?;
            let continue_target = b.here();
            if let Some(update) = update {
                compile_expr(b, update)?;
                b.op(Op::Drop);
            }
            b.patch(to_cond);
            match cond {
                Some(cond) => {
                    compile_expr(b, cond)?;
                    b.op_target(Op::JmpTrue, body_target);
                }
                None => b.op_target(Op::Jmp, body_target),
            }
            b.patch(end);
            b.op_target(Op::JmpIfContinue, continue_target);
            b.op(Op::TryPop);
            Ok(true)
        }

        StmtKind::ForIn {
            var,
            object,
            body,
            ..
        } => {
            let lit = b.string_lit(var);

            // The previous statement value rides in the stash register so
            // the loop steady state is `( prev obj handle )`.
            b.op(Op::Dup);
            compile_expr(b, object)?;
            b.op(Op::Swap);
            b.op(Op::Stash);
            b.op(Op::Drop);
            b.op(Op::PushNull);

            let brend = b.op_forward(Op::TryPushLoop);
            let loop_target = b.here();
            b.op(Op::NextProp);
            let end = b.op_forward(Op::JmpFalse);
            b.op_lit(Op::SetVar, lit);
            b.op(Op::Unstash);
            compile_stmts(b, body)?;
            let continue_target = b.here();
            b.op(Op::Stash);
            b.op(Op::Drop);
            b.op_target(Op::Jmp, loop_target);

            b.patch(end);
            b.op(Op::Unstash);
            let to_pop = b.op_forward(Op::Jmp);

            // Break and continue land here.
            b.patch(brend);
            b.op_target(Op::JmpIfContinue, continue_target);
            b.op(Op::SwapDrop); // drop the iteration handle
            b.op(Op::SwapDrop); // drop the enumerated object
            b.op(Op::SwapDrop); // drop the value preceding the loop

            b.patch(to_pop);
            b.op(Op::TryPop);
            Ok(true)
        }

        StmtKind::Switch {
            discriminant,
            cases,
        } => {
            let end = b.op_forward(Op::TryPushSwitch);
            compile_expr(b, discriminant)?;

            // First pass: the dispatch table.
            let mut case_patches = Vec::new();
            for case in cases {
                if let Some(test) = &case.test {
                    b.op(Op::Dup);
                    compile_expr(b, test)?;
                    b.op(Op::Eq);
                    case_patches.push(b.op_forward(Op::JmpTrueDrop));
                }
            }
            b.op(Op::Drop);
            let to_default = b.op_forward(Op::Jmp);

            // Second pass: bodies in source order, with fallthrough.
            let mut next_patch = case_patches.into_iter();
            let mut has_default = false;
            for case in cases {
                match &case.test {
                    Some(_) => b.patch(next_patch.next().expect("dispatch table out of sync")),
                    None => {
                        has_default = true;
                        b.patch(to_default);
                    }
                }
                compile_stmts(b, &case.body)?;
            }
            if !has_default {
                b.patch(to_default);
            }
            b.patch(end);
            b.op(Op::TryPop);
            Ok(true)
        }

        StmtKind::Try {
            block,
            catch,
            finally,
        } => {
            let finally_patch = finally.as_ref().map(|_| b.op_forward(Op::TryPushFinally));
            let catch_patch = catch.as_ref().map(|_| b.op_forward(Op::TryPushCatch));

            compile_stmts(b, block)?;

            if let Some((name, body)) = catch {
                // Normal completion of the try block: discard the catch
                // handler and skip over the catch code.
                b.op(Op::TryPop);
                let after_catch = b.op_forward(Op::Jmp);

                b.patch(catch_patch.expect("catch handler without patch"));
                b.op(Op::TryPop);
                let name_lit = b.string_lit(name);
                b.op_lit(Op::EnterCatch, name_lit);
                compile_stmts(b, body)?;
                b.op(Op::ExitCatch);

                b.patch(after_catch);
            }

            if let Some(body) = finally {
                b.patch(finally_patch.expect("finally handler without patch"));
                b.op(Op::TryPop);
                compile_stmts(b, body)?;
                b.op(Op::AfterFinally);
            }
            Ok(true)
        }

        StmtKind::Throw(value) => {
            compile_expr(b, value)?;
            b.op(Op::Throw);
            Ok(false)
        }

        StmtKind::Return(value) => {
            match value {
                Some(e) => compile_expr(b, e)?,
                None => b.op(Op::PushUndefined),
            }
            b.op(Op::Ret);
            Ok(false)
        }

        StmtKind::Break => {
            b.op(Op::Break);
            Ok(false)
        }

        StmtKind::Continue => {
            b.op(Op::Continue);
            Ok(false)
        }
    }
}

fn binop_code(op: BinOp) -> Op {
    match op {
        BinOp::Add => Op::Add,
        BinOp::Sub => Op::Sub,
        BinOp::Mul => Op::Mul,
        BinOp::Div => Op::Div,
        BinOp::Rem => Op::Rem,
        BinOp::Lshift => Op::Lshift,
        BinOp::Rshift => Op::Rshift,
        BinOp::Urshift => Op::Urshift,
        BinOp::BitOr => Op::Or,
        BinOp::BitXor => Op::Xor,
        BinOp::BitAnd => Op::And,
        BinOp::Eq => Op::Eq,
        BinOp::Ne => Op::Ne,
        BinOp::StrictEq => Op::EqEq,
        BinOp::StrictNe => Op::NeNe,
        BinOp::Lt => Op::Lt,
        BinOp::Le => Op::Le,
        BinOp::Gt => Op::Gt,
        BinOp::Ge => Op::Ge,
        BinOp::In => Op::In,
        BinOp::Instanceof => Op::Instanceof,
    }
}

fn compile_expr(b: &mut BcodeBuilder, expr: &Expr) -> Result<(), JsError> {
    b.line_no(expr.line);
    match &expr.kind {
        ExprKind::Number(n) => {
            if *n == 0.0 && n.is_sign_positive() {
                b.op(Op::PushZero);
            } else if *n == 1.0 {
                b.op(Op::PushOne);
            } else {
                let lit = b.add_lit(Lit::Number(*n));
                b.op_lit(Op::PushLit, lit);
            }
        }
        ExprKind::Str(s) => {
            let lit = b.string_lit(s);
            b.op_lit(Op::PushLit, lit);
        }
        ExprKind::Regexp { source, flags } => {
            let lit = b.add_lit(Lit::Regexp {
                source: source.clone(),
                flags: flags.clone(),
            });
            b.op_lit(Op::PushLit, lit);
        }
        ExprKind::Bool(v) => b.op(if *v { Op::PushTrue } else { Op::PushFalse }),
        ExprKind::Null => b.op(Op::PushNull),
        ExprKind::This => b.op(Op::PushThis),
        ExprKind::Ident(name) => {
            let lit = b.string_lit(name);
            b.op_lit(Op::GetVar, lit);
        }

        ExprKind::Array(elems) => {
            b.op(Op::CreateArr);
            b.op(Op::PushZero);
            for elem in elems {
                if let Some(elem) = elem {
                    b.op(Op::Dup2);
                    compile_expr(b, elem)?;
                    b.op(Op::Set);
                    b.op(Op::Drop);
                }
                b.op(Op::PushOne);
                b.op(Op::Add);
            }
            b.op(Op::Drop);
        }

        ExprKind::Object(props) => {
            b.op(Op::CreateObj);
            for (key, value) in props {
                b.op(Op::Dup);
                let lit = b.string_lit(&key.as_string());
                b.op_lit(Op::PushLit, lit);
                compile_expr(b, value)?;
                b.op(Op::Set);
                b.op(Op::Drop);
            }
        }

        ExprKind::Function(func) => {
            let lit = compile_function(b, func)?;
            b.op_lit(Op::PushLit, lit);
            b.op(Op::FuncLit);
        }

        ExprKind::Unary { op, operand } => match op {
            UnaryOp::Plus => {
                compile_expr(b, operand)?;
                b.op(Op::Pos);
            }
            UnaryOp::Minus => {
                compile_expr(b, operand)?;
                b.op(Op::Neg);
            }
            UnaryOp::LogicalNot => {
                compile_expr(b, operand)?;
                b.op(Op::LogicalNot);
            }
            UnaryOp::BitNot => {
                compile_expr(b, operand)?;
                b.op(Op::Not);
            }
            UnaryOp::Typeof => {
                // `typeof missing` must not throw a ReferenceError.
                if let ExprKind::Ident(name) = &operand.kind {
                    let lit = b.string_lit(name);
                    b.op_lit(Op::SafeGetVar, lit);
                } else {
                    compile_expr(b, operand)?;
                }
                b.op(Op::Typeof);
            }
            UnaryOp::Void => {
                compile_expr(b, operand)?;
                b.op(Op::Drop);
                b.op(Op::PushUndefined);
            }
            UnaryOp::Delete => compile_delete(b, operand)?,
        },

        ExprKind::Binary { op, lhs, rhs } => {
            compile_expr(b, lhs)?;
            compile_expr(b, rhs)?;
            b.op(binop_code(*op));
        }

        ExprKind::Logical { is_and, lhs, rhs } => {
            compile_expr(b, lhs)?;
            b.op(Op::Dup);
            let short = b.op_forward(if *is_and { Op::JmpFalse } else { Op::JmpTrue });
            b.op(Op::Drop);
            compile_expr(b, rhs)?;
            b.patch(short);
        }

        ExprKind::Cond {
            cond,
            then,
            otherwise,
        } => {
            compile_expr(b, cond)?;
            let to_else = b.op_forward(Op::JmpFalse);
            compile_expr(b, then)?;
            let to_end = b.op_forward(Op::Jmp);
            b.patch(to_else);
            compile_expr(b, otherwise)?;
            b.patch(to_end);
        }

        ExprKind::Assign { op, target, value } => match &target.kind {
            ExprKind::Ident(name) => {
                let lit = b.string_lit(name);
                if let Some(op) = op {
                    b.op_lit(Op::GetVar, lit);
                    compile_expr(b, value)?;
                    b.op(binop_code(*op));
                } else {
                    compile_expr(b, value)?;
                }
                b.op_lit(Op::SetVar, lit);
            }
            ExprKind::Member { object, name } => {
                compile_expr(b, object)?;
                let lit = b.string_lit(name);
                b.op_lit(Op::PushLit, lit);
                if let Some(op) = op {
                    b.op(Op::Dup2);
                    b.op(Op::Get);
                    compile_expr(b, value)?;
                    b.op(binop_code(*op));
                } else {
                    compile_expr(b, value)?;
                }
                b.op(Op::Set);
            }
            ExprKind::Index { object, index } => {
                compile_expr(b, object)?;
                compile_expr(b, index)?;
                if let Some(op) = op {
                    b.op(Op::Dup2);
                    b.op(Op::Get);
                    compile_expr(b, value)?;
                    b.op(binop_code(*op));
                } else {
                    compile_expr(b, value)?;
                }
                b.op(Op::Set);
            }
            _ => {
                return Err(JsError::at(
                    ErrorKind::ReferenceError,
                    "invalid assignment target",
                    SourcePosition::line(target.line),
                ))
            }
        },

        ExprKind::Update {
            is_inc,
            prefix,
            target,
        } => {
            let step = if *is_inc { Op::Add } else { Op::Sub };
            match &target.kind {
                ExprKind::Ident(name) => {
                    let lit = b.string_lit(name);
                    b.op_lit(Op::GetVar, lit);
                    if !prefix {
                        b.op(Op::Stash);
                    }
                    b.op(Op::PushOne);
                    b.op(step);
                    b.op_lit(Op::SetVar, lit);
                }
                ExprKind::Member { object, name } => {
                    compile_expr(b, object)?;
                    let lit = b.string_lit(name);
                    b.op_lit(Op::PushLit, lit);
                    b.op(Op::Dup2);
                    b.op(Op::Get);
                    if !prefix {
                        b.op(Op::Stash);
                    }
                    b.op(Op::PushOne);
                    b.op(step);
                    b.op(Op::Set);
                }
                ExprKind::Index { object, index } => {
                    compile_expr(b, object)?;
                    compile_expr(b, index)?;
                    b.op(Op::Dup2);
                    b.op(Op::Get);
                    if !prefix {
                        b.op(Op::Stash);
                    }
                    b.op(Op::PushOne);
                    b.op(step);
                    b.op(Op::Set);
                }
                _ => {
                    return Err(JsError::at(
                        ErrorKind::ReferenceError,
                        "invalid increment target",
                        SourcePosition::line(target.line),
                    ))
                }
            }
            if !prefix {
                b.op(Op::Unstash);
            }
        }

        ExprKind::Call { callee, args } => {
            compile_callable(b, callee)?;
            b.op(Op::CheckCall);
            for arg in args {
                compile_expr(b, arg)?;
            }
            b.op_arity(Op::Call, args_arity(args, expr.line)?);
        }

        ExprKind::New { callee, args } => {
            compile_callable(b, callee)?;
            b.op(Op::CheckCall);
            for arg in args {
                compile_expr(b, arg)?;
            }
            b.op_arity(Op::New, args_arity(args, expr.line)?);
        }

        ExprKind::Member { object, name } => {
            compile_expr(b, object)?;
            let lit = b.string_lit(name);
            b.op_lit(Op::PushLit, lit);
            b.op(Op::Get);
        }

        ExprKind::Index { object, index } => {
            compile_expr(b, object)?;
            compile_expr(b, index)?;
            b.op(Op::Get);
        }

        ExprKind::Seq(parts) => {
            for (i, part) in parts.iter().enumerate() {
                if i > 0 {
                    b.op(Op::Drop);
                }
                compile_expr(b, part)?;
            }
        }
    }
    Ok(())
}

fn args_arity(args: &[Expr], line: u32) -> Result<u8, JsError> {
    u8::try_from(args.len()).map_err(|_| {
        JsError::at(
            ErrorKind::SyntaxError,
            "too many arguments",
            SourcePosition::line(line),
        )
    })
}

/// Pushes `this` and the callable for a call or `new` expression. Method
/// references duplicate the base object so it becomes `this`; everything
/// else gets `undefined`, which the VM swaps for the global object in
/// sloppy mode.
fn compile_callable(b: &mut BcodeBuilder, callee: &Expr) -> Result<(), JsError> {
    match &callee.kind {
        ExprKind::Member { object, name } => {
            compile_expr(b, object)?;
            b.op(Op::Dup);
            let lit = b.string_lit(name);
            b.op_lit(Op::PushLit, lit);
            b.op(Op::Get);
        }
        ExprKind::Index { object, index } => {
            compile_expr(b, object)?;
            b.op(Op::Dup);
            compile_expr(b, index)?;
            b.op(Op::Get);
        }
        _ => {
            b.op(Op::PushUndefined);
            compile_expr(b, callee)?;
        }
    }
    Ok(())
}

/// `delete` has four shapes: member, scope binding, the `undefined`
/// pseudo-binding, and arbitrary expressions that are evaluated and
/// discarded.
fn compile_delete(b: &mut BcodeBuilder, operand: &Expr) -> Result<(), JsError> {
    match &operand.kind {
        ExprKind::Member { object, name } => {
            compile_expr(b, object)?;
            let lit = b.string_lit(name);
            b.op_lit(Op::PushLit, lit);
            b.op(Op::Delete);
        }
        ExprKind::Index { object, index } => {
            compile_expr(b, object)?;
            compile_expr(b, index)?;
            b.op(Op::Delete);
        }
        ExprKind::Ident(name) if name == "undefined" => b.op(Op::PushFalse),
        ExprKind::Ident(name) => {
            if b.strict() {
                return Err(JsError::at(
                    ErrorKind::SyntaxError,
                    "delete of an unqualified identifier in strict mode",
                    SourcePosition::line(operand.line),
                ));
            }
            let lit = b.string_lit(name);
            b.op_lit(Op::DeleteVar, lit);
        }
        _ => {
            compile_expr(b, operand)?;
            b.op(Op::Drop);
            b.op(Op::PushTrue);
        }
    }
    Ok(())
}
