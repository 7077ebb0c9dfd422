//! Recursive descent parser for the supported language subset.

use crate::ast::*;
use crate::lexer::{Keyword, Lexer, Punct, Tok, Token};
use core_types::{ErrorKind, JsError, SourcePosition};

/// Hard bound on parser recursion; exceeding it reports that the program
/// is too deeply nested rather than overflowing the native stack.
const MAX_DEPTH: usize = 300;

/// The parser. One instance parses one source text.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    cur: Tok,
    peeked: Option<Tok>,
    /// Strict mode of the scope being parsed.
    strict: bool,
    /// Loop nesting, for `break`/`continue` validation.
    loop_depth: usize,
    /// Switch nesting, for `break` validation.
    switch_depth: usize,
    /// Function nesting, for `return` validation.
    func_depth: usize,
    /// Expression nesting guard.
    depth: usize,
    /// `in` is not a relational operator here (for-loop init clause).
    no_in: bool,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Result<Parser<'a>, JsError> {
        let mut lexer = Lexer::new(source);
        let cur = lexer.next_tok()?;
        Ok(Parser {
            lexer,
            cur,
            peeked: None,
            strict: false,
            loop_depth: 0,
            switch_depth: 0,
            func_depth: 0,
            depth: 0,
            no_in: false,
        })
    }

    /// Parses a whole script.
    pub fn parse_program(&mut self) -> Result<Program, JsError> {
        self.strict = self.directive_prologue()?;
        let mut body = Vec::new();
        while self.cur.token != Token::Eof {
            body.push(self.parse_statement()?);
        }
        Ok(Program {
            body,
            strict: self.strict,
        })
    }

    /* Token plumbing {{{ */

    fn advance(&mut self) -> Result<(), JsError> {
        self.cur = match self.peeked.take() {
            Some(t) => t,
            None => self.lexer.next_tok()?,
        };
        Ok(())
    }

    fn peek(&mut self) -> Result<&Tok, JsError> {
        if self.peeked.is_none() {
            self.peeked = Some(self.lexer.next_tok()?);
        }
        Ok(self.peeked.as_ref().unwrap())
    }

    fn err(&self, msg: impl Into<String>) -> JsError {
        JsError::at(
            ErrorKind::SyntaxError,
            msg,
            SourcePosition::line(self.cur.line),
        )
    }

    fn is_punct(&self, p: Punct) -> bool {
        self.cur.token == Token::Punct(p)
    }

    fn is_keyword(&self, k: Keyword) -> bool {
        self.cur.token == Token::Keyword(k)
    }

    fn eat_punct(&mut self, p: Punct) -> Result<bool, JsError> {
        if self.is_punct(p) {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect_punct(&mut self, p: Punct, what: &str) -> Result<(), JsError> {
        if !self.eat_punct(p)? {
            return Err(self.err(format!("expected {}", what)));
        }
        Ok(())
    }

    fn expect_ident(&mut self) -> Result<String, JsError> {
        match &self.cur.token {
            Token::Ident(name) => {
                let name = name.clone();
                self.advance()?;
                Ok(name)
            }
            _ => Err(self.err("expected identifier")),
        }
    }

    /// Automatic semicolon insertion: an explicit `;`, or a `}`/EOF/line
    /// terminator lets the statement end.
    fn expect_semi(&mut self) -> Result<(), JsError> {
        if self.eat_punct(Punct::Semicolon)? {
            return Ok(());
        }
        if self.is_punct(Punct::RBrace)
            || self.cur.token == Token::Eof
            || self.cur.newline_before
        {
            return Ok(());
        }
        Err(self.err("expected ;"))
    }

    fn enter(&mut self) -> Result<(), JsError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(self.err("program nests too deeply"));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    /* }}} */

    /// Consumes leading string-literal statements, reporting whether one of
    /// them was `"use strict"`.
    fn directive_prologue(&mut self) -> Result<bool, JsError> {
        let mut strict = self.strict;
        loop {
            let text = match &self.cur.token {
                Token::Str(s) => s.clone(),
                _ => break,
            };
            // Only a bare string statement is a directive; anything like
            // `"x".length` is an expression.
            let ends = {
                let next = self.peek()?;
                matches!(next.token, Token::Punct(Punct::Semicolon) | Token::Punct(Punct::RBrace) | Token::Eof)
                    || next.newline_before
            };
            if !ends {
                break;
            }
            if text == "use strict" {
                strict = true;
            }
            self.advance()?;
            self.eat_punct(Punct::Semicolon)?;
        }
        Ok(strict)
    }

    /* Statements {{{ */

    fn parse_statement(&mut self) -> Result<Stmt, JsError> {
        self.enter()?;
        let line = self.cur.line;
        let kind = self.parse_statement_kind()?;
        self.leave();
        Ok(Stmt { kind, line })
    }

    fn parse_statement_kind(&mut self) -> Result<StmtKind, JsError> {
        match &self.cur.token {
            Token::Punct(Punct::Semicolon) => {
                self.advance()?;
                Ok(StmtKind::Empty)
            }
            Token::Punct(Punct::LBrace) => {
                self.advance()?;
                let body = self.parse_block_tail()?;
                Ok(StmtKind::Block(body))
            }
            Token::Keyword(Keyword::Var) => {
                self.advance()?;
                let decls = self.parse_var_decls()?;
                self.expect_semi()?;
                Ok(StmtKind::Var(decls))
            }
            Token::Keyword(Keyword::Function) => {
                self.advance()?;
                let func = self.parse_function_rest(true)?;
                Ok(StmtKind::FuncDecl(func))
            }
            Token::Keyword(Keyword::If) => self.parse_if(),
            Token::Keyword(Keyword::While) => self.parse_while(),
            Token::Keyword(Keyword::Do) => self.parse_do_while(),
            Token::Keyword(Keyword::For) => self.parse_for(),
            Token::Keyword(Keyword::Switch) => self.parse_switch(),
            Token::Keyword(Keyword::Try) => self.parse_try(),
            Token::Keyword(Keyword::Throw) => {
                self.advance()?;
                if self.cur.newline_before {
                    return Err(self.err("no line break allowed after throw"));
                }
                let value = self.parse_expression()?;
                self.expect_semi()?;
                Ok(StmtKind::Throw(value))
            }
            Token::Keyword(Keyword::Return) => {
                if self.func_depth == 0 {
                    return Err(self.err("return outside of function"));
                }
                self.advance()?;
                let value = if self.is_punct(Punct::Semicolon)
                    || self.is_punct(Punct::RBrace)
                    || self.cur.token == Token::Eof
                    || self.cur.newline_before
                {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                self.expect_semi()?;
                Ok(StmtKind::Return(value))
            }
            Token::Keyword(Keyword::Break) => {
                if self.loop_depth == 0 && self.switch_depth == 0 {
                    return Err(self.err("break outside of loop or switch"));
                }
                self.advance()?;
                self.reject_label()?;
                self.expect_semi()?;
                Ok(StmtKind::Break)
            }
            Token::Keyword(Keyword::Continue) => {
                if self.loop_depth == 0 {
                    return Err(self.err("continue outside of loop"));
                }
                self.advance()?;
                self.reject_label()?;
                self.expect_semi()?;
                Ok(StmtKind::Continue)
            }
            Token::Keyword(Keyword::With) => Err(self.err("with statements are not supported")),
            Token::Ident(_) => {
                // A label would follow as `name:`, which the subset rejects.
                if self.peek()?.token == Token::Punct(Punct::Colon) {
                    return Err(self.err("labeled statements are not supported"));
                }
                let expr = self.parse_expression()?;
                self.expect_semi()?;
                Ok(StmtKind::Expr(expr))
            }
            _ => {
                let expr = self.parse_expression()?;
                self.expect_semi()?;
                Ok(StmtKind::Expr(expr))
            }
        }
    }

    /// Labels on break/continue are part of the unsupported labeled
    /// statement feature.
    fn reject_label(&mut self) -> Result<(), JsError> {
        if !self.cur.newline_before {
            if let Token::Ident(_) = self.cur.token {
                return Err(self.err("labeled break/continue is not supported"));
            }
        }
        Ok(())
    }

    fn parse_block_tail(&mut self) -> Result<Vec<Stmt>, JsError> {
        let mut body = Vec::new();
        while !self.is_punct(Punct::RBrace) {
            if self.cur.token == Token::Eof {
                return Err(self.err("expected }"));
            }
            body.push(self.parse_statement()?);
        }
        self.advance()?;
        Ok(body)
    }

    fn parse_var_decls(&mut self) -> Result<Vec<(String, Option<Expr>)>, JsError> {
        let mut decls = Vec::new();
        loop {
            let name = self.expect_ident()?;
            let init = if self.eat_punct(Punct::Assign)? {
                Some(self.parse_assignment()?)
            } else {
                None
            };
            decls.push((name, init));
            if !self.eat_punct(Punct::Comma)? {
                break;
            }
        }
        Ok(decls)
    }

    /// A statement in a control-flow slot, normalized to a statement list.
    fn parse_body(&mut self) -> Result<Vec<Stmt>, JsError> {
        if self.is_punct(Punct::LBrace) {
            self.advance()?;
            self.parse_block_tail()
        } else {
            Ok(vec![self.parse_statement()?])
        }
    }

    fn parse_if(&mut self) -> Result<StmtKind, JsError> {
        self.advance()?;
        self.expect_punct(Punct::LParen, "( after if")?;
        let cond = self.parse_expression()?;
        self.expect_punct(Punct::RParen, ") after condition")?;
        let then = self.parse_body()?;
        let otherwise = if self.is_keyword(Keyword::Else) {
            self.advance()?;
            Some(self.parse_body()?)
        } else {
            None
        };
        Ok(StmtKind::If {
            cond,
            then,
            otherwise,
        })
    }

    fn parse_while(&mut self) -> Result<StmtKind, JsError> {
        self.advance()?;
        self.expect_punct(Punct::LParen, "( after while")?;
        let cond = self.parse_expression()?;
        self.expect_punct(Punct::RParen, ") after condition")?;
        self.loop_depth += 1;
        let body = self.parse_body()?;
        self.loop_depth -= 1;
        Ok(StmtKind::While { cond, body })
    }

    fn parse_do_while(&mut self) -> Result<StmtKind, JsError> {
        self.advance()?;
        self.loop_depth += 1;
        let body = self.parse_body()?;
        self.loop_depth -= 1;
        if !self.is_keyword(Keyword::While) {
            return Err(self.err("expected while after do body"));
        }
        self.advance()?;
        self.expect_punct(Punct::LParen, "( after while")?;
        let cond = self.parse_expression()?;
        self.expect_punct(Punct::RParen, ") after condition")?;
        self.eat_punct(Punct::Semicolon)?;
        Ok(StmtKind::DoWhile { body, cond })
    }

    fn parse_for(&mut self) -> Result<StmtKind, JsError> {
        self.advance()?;
        self.expect_punct(Punct::LParen, "( after for")?;

        // The init clause; `in` must not bind as an operator here.
        if self.is_keyword(Keyword::Var) {
            self.advance()?;
            self.no_in = true;
            let decls = self.parse_var_decls();
            self.no_in = false;
            let decls = decls?;
            if self.is_keyword(Keyword::In) {
                self.advance()?;
                if decls.len() != 1 || decls[0].1.is_some() {
                    return Err(self.err("bad for..in loop variable"));
                }
                let var = decls[0].0.clone();
                return self.parse_for_in_tail(var, true);
            }
            self.expect_punct(Punct::Semicolon, "; after for init")?;
            return self.parse_for_tail(Some(ForInit::Var(decls)));
        }

        if self.eat_punct(Punct::Semicolon)? {
            return self.parse_for_tail(None);
        }

        self.no_in = true;
        let init = self.parse_expression();
        self.no_in = false;
        let init = init?;
        if self.is_keyword(Keyword::In) {
            self.advance()?;
            let var = match init.kind {
                ExprKind::Ident(name) => name,
                _ => return Err(self.err("bad for..in loop variable")),
            };
            return self.parse_for_in_tail(var, false);
        }
        self.expect_punct(Punct::Semicolon, "; after for init")?;
        self.parse_for_tail(Some(ForInit::Expr(init)))
    }

    fn parse_for_tail(&mut self, init: Option<ForInit>) -> Result<StmtKind, JsError> {
        let cond = if self.is_punct(Punct::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect_punct(Punct::Semicolon, "; after for condition")?;
        let update = if self.is_punct(Punct::RParen) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect_punct(Punct::RParen, ") after for clauses")?;
        self.loop_depth += 1;
        let body = self.parse_body()?;
        self.loop_depth -= 1;
        Ok(StmtKind::For {
            init,
            cond,
            update,
            body,
        })
    }

    fn parse_for_in_tail(&mut self, var: String, declared: bool) -> Result<StmtKind, JsError> {
        let object = self.parse_expression()?;
        self.expect_punct(Punct::RParen, ") after for..in object")?;
        self.loop_depth += 1;
        let body = self.parse_body()?;
        self.loop_depth -= 1;
        Ok(StmtKind::ForIn {
            var,
            declared,
            object,
            body,
        })
    }

    fn parse_switch(&mut self) -> Result<StmtKind, JsError> {
        self.advance()?;
        self.expect_punct(Punct::LParen, "( after switch")?;
        let discriminant = self.parse_expression()?;
        self.expect_punct(Punct::RParen, ") after discriminant")?;
        self.expect_punct(Punct::LBrace, "{ to open switch body")?;

        self.switch_depth += 1;
        let mut cases = Vec::new();
        let mut seen_default = false;
        while !self.is_punct(Punct::RBrace) {
            let test = if self.is_keyword(Keyword::Case) {
                self.advance()?;
                let test = self.parse_expression()?;
                Some(test)
            } else if self.is_keyword(Keyword::Default) {
                if seen_default {
                    self.switch_depth -= 1;
                    return Err(self.err("duplicate default clause"));
                }
                seen_default = true;
                self.advance()?;
                None
            } else {
                self.switch_depth -= 1;
                return Err(self.err("expected case or default"));
            };
            let colon = self.expect_punct(Punct::Colon, ": after case label");
            if let Err(e) = colon {
                self.switch_depth -= 1;
                return Err(e);
            }
            let mut body = Vec::new();
            while !self.is_punct(Punct::RBrace)
                && !self.is_keyword(Keyword::Case)
                && !self.is_keyword(Keyword::Default)
            {
                match self.parse_statement() {
                    Ok(s) => body.push(s),
                    Err(e) => {
                        self.switch_depth -= 1;
                        return Err(e);
                    }
                }
            }
            cases.push(SwitchCase { test, body });
        }
        self.switch_depth -= 1;
        self.advance()?;
        Ok(StmtKind::Switch {
            discriminant,
            cases,
        })
    }

    fn parse_try(&mut self) -> Result<StmtKind, JsError> {
        self.advance()?;
        self.expect_punct(Punct::LBrace, "{ after try")?;
        let block = self.parse_block_tail()?;

        let catch = if self.is_keyword(Keyword::Catch) {
            self.advance()?;
            self.expect_punct(Punct::LParen, "( after catch")?;
            let name = self.expect_ident()?;
            self.expect_punct(Punct::RParen, ") after catch binding")?;
            self.expect_punct(Punct::LBrace, "{ after catch")?;
            Some((name, self.parse_block_tail()?))
        } else {
            None
        };

        let finally = if self.is_keyword(Keyword::Finally) {
            self.advance()?;
            self.expect_punct(Punct::LBrace, "{ after finally")?;
            Some(self.parse_block_tail()?)
        } else {
            None
        };

        if catch.is_none() && finally.is_none() {
            return Err(self.err("try without catch or finally"));
        }
        Ok(StmtKind::Try {
            block,
            catch,
            finally,
        })
    }

    /// Parses the remainder of a function after the `function` keyword.
    fn parse_function_rest(&mut self, require_name: bool) -> Result<FuncLit, JsError> {
        let line = self.cur.line;
        let name = match &self.cur.token {
            Token::Ident(n) => {
                let n = n.clone();
                self.advance()?;
                Some(n)
            }
            _ if require_name => return Err(self.err("function declaration needs a name")),
            _ => None,
        };
        self.expect_punct(Punct::LParen, "( after function name")?;
        let mut params = Vec::new();
        if !self.is_punct(Punct::RParen) {
            loop {
                params.push(self.expect_ident()?);
                if !self.eat_punct(Punct::Comma)? {
                    break;
                }
            }
        }
        self.expect_punct(Punct::RParen, ") after parameters")?;
        self.expect_punct(Punct::LBrace, "{ to open function body")?;

        let outer_strict = self.strict;
        let outer_loops = std::mem::take(&mut self.loop_depth);
        let outer_switches = std::mem::take(&mut self.switch_depth);
        self.func_depth += 1;
        let strict = self.directive_prologue()?;
        self.strict = strict;
        let body = self.parse_block_tail();
        self.func_depth -= 1;
        self.strict = outer_strict;
        self.loop_depth = outer_loops;
        self.switch_depth = outer_switches;

        Ok(FuncLit {
            name,
            params,
            body: body?,
            strict,
            line,
        })
    }

    /* }}} */

    /* Expressions {{{ */

    fn parse_expression(&mut self) -> Result<Expr, JsError> {
        self.enter()?;
        let line = self.cur.line;
        let first = self.parse_assignment();
        let first = match first {
            Ok(e) => e,
            Err(e) => {
                self.leave();
                return Err(e);
            }
        };
        if !self.is_punct(Punct::Comma) {
            self.leave();
            return Ok(first);
        }
        let mut parts = vec![first];
        while self.eat_punct(Punct::Comma)? {
            parts.push(self.parse_assignment()?);
        }
        self.leave();
        Ok(Expr {
            kind: ExprKind::Seq(parts),
            line,
        })
    }

    fn parse_assignment(&mut self) -> Result<Expr, JsError> {
        self.enter()?;
        let result = self.parse_assignment_inner();
        self.leave();
        result
    }

    fn parse_assignment_inner(&mut self) -> Result<Expr, JsError> {
        let line = self.cur.line;
        let lhs = self.parse_conditional()?;
        let op = match self.cur.token {
            Token::Punct(Punct::Assign) => None,
            Token::Punct(Punct::PlusAssign) => Some(BinOp::Add),
            Token::Punct(Punct::MinusAssign) => Some(BinOp::Sub),
            Token::Punct(Punct::StarAssign) => Some(BinOp::Mul),
            Token::Punct(Punct::SlashAssign) => Some(BinOp::Div),
            Token::Punct(Punct::PercentAssign) => Some(BinOp::Rem),
            Token::Punct(Punct::LshAssign) => Some(BinOp::Lshift),
            Token::Punct(Punct::RshAssign) => Some(BinOp::Rshift),
            Token::Punct(Punct::UrshAssign) => Some(BinOp::Urshift),
            Token::Punct(Punct::AndAssign) => Some(BinOp::BitAnd),
            Token::Punct(Punct::OrAssign) => Some(BinOp::BitOr),
            Token::Punct(Punct::XorAssign) => Some(BinOp::BitXor),
            _ => return Ok(lhs),
        };
        if !is_assign_target(&lhs) {
            return Err(self.err("invalid assignment target"));
        }
        self.advance()?;
        let value = self.parse_assignment()?;
        Ok(Expr {
            kind: ExprKind::Assign {
                op,
                target: Box::new(lhs),
                value: Box::new(value),
            },
            line,
        })
    }

    fn parse_conditional(&mut self) -> Result<Expr, JsError> {
        let line = self.cur.line;
        let cond = self.parse_binary(0)?;
        if !self.eat_punct(Punct::Question)? {
            return Ok(cond);
        }
        let then = self.parse_assignment()?;
        self.expect_punct(Punct::Colon, ": in conditional expression")?;
        let otherwise = self.parse_assignment()?;
        Ok(Expr {
            kind: ExprKind::Cond {
                cond: Box::new(cond),
                then: Box::new(then),
                otherwise: Box::new(otherwise),
            },
            line,
        })
    }

    /// Binary operator precedence climbing, `||` lowest.
    fn parse_binary(&mut self, min_level: u8) -> Result<Expr, JsError> {
        let line = self.cur.line;
        let mut lhs = self.parse_unary()?;
        loop {
            let (level, kind) = match self.cur.token {
                Token::Punct(Punct::PipePipe) => (0, BinKind::Or),
                Token::Punct(Punct::AmpAmp) => (1, BinKind::And),
                Token::Punct(Punct::Pipe) => (2, BinKind::Op(BinOp::BitOr)),
                Token::Punct(Punct::Caret) => (3, BinKind::Op(BinOp::BitXor)),
                Token::Punct(Punct::Amp) => (4, BinKind::Op(BinOp::BitAnd)),
                Token::Punct(Punct::EqEq) => (5, BinKind::Op(BinOp::Eq)),
                Token::Punct(Punct::NotEq) => (5, BinKind::Op(BinOp::Ne)),
                Token::Punct(Punct::EqEqEq) => (5, BinKind::Op(BinOp::StrictEq)),
                Token::Punct(Punct::NotEqEq) => (5, BinKind::Op(BinOp::StrictNe)),
                Token::Punct(Punct::Lt) => (6, BinKind::Op(BinOp::Lt)),
                Token::Punct(Punct::Le) => (6, BinKind::Op(BinOp::Le)),
                Token::Punct(Punct::Gt) => (6, BinKind::Op(BinOp::Gt)),
                Token::Punct(Punct::Ge) => (6, BinKind::Op(BinOp::Ge)),
                Token::Keyword(Keyword::Instanceof) => (6, BinKind::Op(BinOp::Instanceof)),
                Token::Keyword(Keyword::In) if !self.no_in => (6, BinKind::Op(BinOp::In)),
                Token::Punct(Punct::Lsh) => (7, BinKind::Op(BinOp::Lshift)),
                Token::Punct(Punct::Rsh) => (7, BinKind::Op(BinOp::Rshift)),
                Token::Punct(Punct::Ursh) => (7, BinKind::Op(BinOp::Urshift)),
                Token::Punct(Punct::Plus) => (8, BinKind::Op(BinOp::Add)),
                Token::Punct(Punct::Minus) => (8, BinKind::Op(BinOp::Sub)),
                Token::Punct(Punct::Star) => (9, BinKind::Op(BinOp::Mul)),
                Token::Punct(Punct::Slash) => (9, BinKind::Op(BinOp::Div)),
                Token::Punct(Punct::Percent) => (9, BinKind::Op(BinOp::Rem)),
                _ => break,
            };
            if level < min_level {
                break;
            }
            self.advance()?;
            let rhs = self.parse_binary(level + 1)?;
            lhs = Expr {
                kind: match kind {
                    BinKind::Or => ExprKind::Logical {
                        is_and: false,
                        lhs: Box::new(lhs),
                        rhs: Box::new(rhs),
                    },
                    BinKind::And => ExprKind::Logical {
                        is_and: true,
                        lhs: Box::new(lhs),
                        rhs: Box::new(rhs),
                    },
                    BinKind::Op(op) => ExprKind::Binary {
                        op,
                        lhs: Box::new(lhs),
                        rhs: Box::new(rhs),
                    },
                },
                line,
            };
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, JsError> {
        self.enter()?;
        let result = self.parse_unary_inner();
        self.leave();
        result
    }

    fn parse_unary_inner(&mut self) -> Result<Expr, JsError> {
        let line = self.cur.line;
        let op = match self.cur.token {
            Token::Punct(Punct::Plus) => Some(UnaryOp::Plus),
            Token::Punct(Punct::Minus) => Some(UnaryOp::Minus),
            Token::Punct(Punct::Bang) => Some(UnaryOp::LogicalNot),
            Token::Punct(Punct::Tilde) => Some(UnaryOp::BitNot),
            Token::Keyword(Keyword::Typeof) => Some(UnaryOp::Typeof),
            Token::Keyword(Keyword::Void) => Some(UnaryOp::Void),
            Token::Keyword(Keyword::Delete) => Some(UnaryOp::Delete),
            _ => None,
        };
        if let Some(op) = op {
            self.advance()?;
            let operand = self.parse_unary()?;
            return Ok(Expr {
                kind: ExprKind::Unary {
                    op,
                    operand: Box::new(operand),
                },
                line,
            });
        }

        if self.is_punct(Punct::PlusPlus) || self.is_punct(Punct::MinusMinus) {
            let is_inc = self.is_punct(Punct::PlusPlus);
            self.advance()?;
            let target = self.parse_unary()?;
            if !is_assign_target(&target) {
                return Err(self.err("invalid increment target"));
            }
            return Ok(Expr {
                kind: ExprKind::Update {
                    is_inc,
                    prefix: true,
                    target: Box::new(target),
                },
                line,
            });
        }

        let expr = self.parse_member_call(true)?;

        // Postfix ++/-- does not apply across a line break.
        if (self.is_punct(Punct::PlusPlus) || self.is_punct(Punct::MinusMinus))
            && !self.cur.newline_before
        {
            let is_inc = self.is_punct(Punct::PlusPlus);
            if !is_assign_target(&expr) {
                return Err(self.err("invalid increment target"));
            }
            self.advance()?;
            return Ok(Expr {
                kind: ExprKind::Update {
                    is_inc,
                    prefix: false,
                    target: Box::new(expr),
                },
                line,
            });
        }
        Ok(expr)
    }

    fn parse_member_call(&mut self, allow_call: bool) -> Result<Expr, JsError> {
        let line = self.cur.line;
        let mut expr = if self.is_keyword(Keyword::New) {
            self.parse_new()?
        } else {
            self.parse_primary()?
        };
        loop {
            if self.eat_punct(Punct::Dot)? {
                let name = self.expect_member_name()?;
                expr = Expr {
                    kind: ExprKind::Member {
                        object: Box::new(expr),
                        name,
                    },
                    line,
                };
            } else if self.eat_punct(Punct::LBracket)? {
                let index = self.parse_expression()?;
                self.expect_punct(Punct::RBracket, "] after index")?;
                expr = Expr {
                    kind: ExprKind::Index {
                        object: Box::new(expr),
                        index: Box::new(index),
                    },
                    line,
                };
            } else if allow_call && self.is_punct(Punct::LParen) {
                let args = self.parse_args()?;
                expr = Expr {
                    kind: ExprKind::Call {
                        callee: Box::new(expr),
                        args,
                    },
                    line,
                };
            } else {
                break;
            }
        }
        Ok(expr)
    }

    /// Member names may be keywords (`a.delete` is legal enough here).
    fn expect_member_name(&mut self) -> Result<String, JsError> {
        let name = match &self.cur.token {
            Token::Ident(n) => n.clone(),
            Token::Keyword(k) => format!("{:?}", k).to_lowercase(),
            _ => return Err(self.err("expected property name after .")),
        };
        self.advance()?;
        Ok(name)
    }

    fn parse_new(&mut self) -> Result<Expr, JsError> {
        let line = self.cur.line;
        self.advance()?;
        let callee = self.parse_member_call(false)?;
        let args = if self.is_punct(Punct::LParen) {
            self.parse_args()?
        } else {
            Vec::new()
        };
        Ok(Expr {
            kind: ExprKind::New {
                callee: Box::new(callee),
                args,
            },
            line,
        })
    }

    fn parse_args(&mut self) -> Result<Vec<Expr>, JsError> {
        self.expect_punct(Punct::LParen, "( to open arguments")?;
        let mut args = Vec::new();
        if !self.is_punct(Punct::RParen) {
            loop {
                args.push(self.parse_assignment()?);
                if !self.eat_punct(Punct::Comma)? {
                    break;
                }
            }
        }
        self.expect_punct(Punct::RParen, ") after arguments")?;
        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<Expr, JsError> {
        let line = self.cur.line;
        let kind = match &self.cur.token {
            Token::Number(n) => {
                let n = *n;
                self.advance()?;
                ExprKind::Number(n)
            }
            Token::Str(s) => {
                let s = s.clone();
                self.advance()?;
                ExprKind::Str(s)
            }
            Token::Ident(name) => {
                let name = name.clone();
                self.advance()?;
                ExprKind::Ident(name)
            }
            Token::Keyword(Keyword::True) => {
                self.advance()?;
                ExprKind::Bool(true)
            }
            Token::Keyword(Keyword::False) => {
                self.advance()?;
                ExprKind::Bool(false)
            }
            Token::Keyword(Keyword::Null) => {
                self.advance()?;
                ExprKind::Null
            }
            Token::Keyword(Keyword::This) => {
                self.advance()?;
                ExprKind::This
            }
            Token::Keyword(Keyword::Function) => {
                self.advance()?;
                let func = self.parse_function_rest(false)?;
                ExprKind::Function(func)
            }
            Token::Punct(Punct::LParen) => {
                self.advance()?;
                let inner = self.parse_expression()?;
                self.expect_punct(Punct::RParen, ") to close expression")?;
                return Ok(inner);
            }
            Token::Punct(Punct::LBracket) => return self.parse_array_literal(),
            Token::Punct(Punct::LBrace) => return self.parse_object_literal(),
            Token::Punct(Punct::Slash) | Token::Punct(Punct::SlashAssign) => {
                let after_assign = self.is_punct(Punct::SlashAssign);
                debug_assert!(self.peeked.is_none(), "regexp rescan with stale lookahead");
                let (source, flags) = self.lexer.scan_regex(after_assign)?;
                self.advance()?;
                ExprKind::Regexp { source, flags }
            }
            other => return Err(self.err(format!("unexpected token {:?}", other))),
        };
        Ok(Expr { kind, line })
    }

    fn parse_array_literal(&mut self) -> Result<Expr, JsError> {
        let line = self.cur.line;
        self.advance()?;
        let mut elems = Vec::new();
        loop {
            if self.eat_punct(Punct::RBracket)? {
                break;
            }
            if self.eat_punct(Punct::Comma)? {
                elems.push(None); // elision
                continue;
            }
            elems.push(Some(self.parse_assignment()?));
            if !self.eat_punct(Punct::Comma)? {
                self.expect_punct(Punct::RBracket, "] to close array literal")?;
                break;
            }
        }
        Ok(Expr {
            kind: ExprKind::Array(elems),
            line,
        })
    }

    fn parse_object_literal(&mut self) -> Result<Expr, JsError> {
        let line = self.cur.line;
        self.advance()?;
        let mut props = Vec::new();
        loop {
            if self.eat_punct(Punct::RBrace)? {
                break;
            }
            let key = match &self.cur.token {
                Token::Ident(n) => PropKey::Ident(n.clone()),
                Token::Str(s) => PropKey::Str(s.clone()),
                Token::Number(n) => PropKey::Num(*n),
                Token::Keyword(k) => PropKey::Ident(format!("{:?}", k).to_lowercase()),
                _ => return Err(self.err("expected property key")),
            };
            self.advance()?;
            if !self.is_punct(Punct::Colon) {
                // `{ get x() {} }` would land here; accessors in literals
                // are not part of the subset.
                return Err(self.err(
                    "expected : after property key (accessor shorthand is not supported)",
                ));
            }
            self.advance()?;
            let value = self.parse_assignment()?;
            props.push((key, value));
            if !self.eat_punct(Punct::Comma)? {
                self.expect_punct(Punct::RBrace, "} to close object literal")?;
                break;
            }
        }
        Ok(Expr {
            kind: ExprKind::Object(props),
            line,
        })
    }

    /* }}} */
}

enum BinKind {
    Or,
    And,
    Op(BinOp),
}

fn is_assign_target(e: &Expr) -> bool {
    matches!(
        e.kind,
        ExprKind::Ident(_) | ExprKind::Member { .. } | ExprKind::Index { .. }
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> Program {
        Parser::new(src).unwrap().parse_program().unwrap()
    }

    fn parse_err(src: &str) -> JsError {
        Parser::new(src).unwrap().parse_program().unwrap_err()
    }

    #[test]
    fn test_var_and_expression_statements() {
        let p = parse("var a = 1, b; a + b;");
        assert_eq!(p.body.len(), 2);
        match &p.body[0].kind {
            StmtKind::Var(decls) => {
                assert_eq!(decls.len(), 2);
                assert_eq!(decls[0].0, "a");
                assert!(decls[1].1.is_none());
            }
            other => panic!("expected var, got {:?}", other),
        }
    }

    #[test]
    fn test_precedence() {
        let p = parse("x = 1 + 2 * 3 < 4 && 5 | 6;");
        // Shape: x = ((1 + (2*3)) < 4) && (5|6)
        match &p.body[0].kind {
            StmtKind::Expr(Expr {
                kind: ExprKind::Assign { value, .. },
                ..
            }) => match &value.kind {
                ExprKind::Logical { is_and: true, lhs, .. } => {
                    assert!(matches!(lhs.kind, ExprKind::Binary { op: BinOp::Lt, .. }));
                }
                other => panic!("expected &&, got {:?}", other),
            },
            other => panic!("expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_new_and_member_chains() {
        let p = parse("new a.B(1).c(2)[3];");
        match &p.body[0].kind {
            StmtKind::Expr(e) => match &e.kind {
                ExprKind::Index { object, .. } => match &object.kind {
                    ExprKind::Call { callee, .. } => {
                        assert!(matches!(callee.kind, ExprKind::Member { .. }));
                    }
                    other => panic!("expected call, got {:?}", other),
                },
                other => panic!("expected index, got {:?}", other),
            },
            other => panic!("expected expr, got {:?}", other),
        }
    }

    #[test]
    fn test_for_variants() {
        parse("for (var i = 0; i < 3; i++) {}");
        parse("for (;;) { break; }");
        let p = parse("for (var k in obj) {}");
        assert!(matches!(
            p.body[0].kind,
            StmtKind::ForIn { declared: true, .. }
        ));
        let p = parse("for (k in obj) {}");
        assert!(matches!(
            p.body[0].kind,
            StmtKind::ForIn { declared: false, .. }
        ));
    }

    #[test]
    fn test_in_operator_inside_for_parens() {
        // `in` as an operator still works outside the init clause.
        parse("for (var i = 0; ('x' in o); i++) {}");
        let p = parse("x = 'a' in o;");
        match &p.body[0].kind {
            StmtKind::Expr(Expr {
                kind: ExprKind::Assign { value, .. },
                ..
            }) => assert!(matches!(value.kind, ExprKind::Binary { op: BinOp::In, .. })),
            other => panic!("expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_asi() {
        let p = parse("a = 1\nb = 2");
        assert_eq!(p.body.len(), 2);
        // Restricted production: return value must start on the same line.
        let p = parse("function f() { return\n1 }");
        match &p.body[0].kind {
            StmtKind::FuncDecl(f) => {
                assert!(matches!(f.body[0].kind, StmtKind::Return(None)));
            }
            other => panic!("expected function, got {:?}", other),
        }
    }

    #[test]
    fn test_strict_directive() {
        assert!(parse("'use strict'; var x;").strict);
        assert!(!parse("var x; 'use strict';").strict);
        let p = parse("function f() { 'use strict'; }");
        match &p.body[0].kind {
            StmtKind::FuncDecl(f) => assert!(f.strict),
            other => panic!("expected function, got {:?}", other),
        }
    }

    #[test]
    fn test_rejected_features() {
        assert!(parse_err("with (o) {}").message.contains("with"));
        assert!(parse_err("loop: while (1) {}").message.contains("labeled"));
        assert!(parse_err("({ get x() { return 1 } });")
            .message
            .contains("accessor"));
        parse_err("break;");
        parse_err("return 1;");
    }

    #[test]
    fn test_regex_literal_position() {
        let p = parse("x = /ab+c/i;");
        match &p.body[0].kind {
            StmtKind::Expr(Expr {
                kind: ExprKind::Assign { value, .. },
                ..
            }) => match &value.kind {
                ExprKind::Regexp { source, flags } => {
                    assert_eq!(source, "ab+c");
                    assert_eq!(flags, "i");
                }
                other => panic!("expected regexp, got {:?}", other),
            },
            other => panic!("expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_object_and_array_literals() {
        let p = parse("x = { a: 1, 'b c': 2, 3: 4 };");
        match &p.body[0].kind {
            StmtKind::Expr(Expr {
                kind: ExprKind::Assign { value, .. },
                ..
            }) => match &value.kind {
                ExprKind::Object(props) => {
                    assert_eq!(props.len(), 3);
                    assert_eq!(props[2].0.as_string(), "3");
                }
                other => panic!("expected object, got {:?}", other),
            },
            other => panic!("expected assignment, got {:?}", other),
        }
        let p = parse("y = [1, , 3];");
        match &p.body[0].kind {
            StmtKind::Expr(Expr {
                kind: ExprKind::Assign { value, .. },
                ..
            }) => match &value.kind {
                ExprKind::Array(elems) => {
                    assert_eq!(elems.len(), 3);
                    assert!(elems[1].is_none());
                }
                other => panic!("expected array, got {:?}", other),
            },
            other => panic!("expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_deep_nesting_guard() {
        let src = format!("x = {}1{};", "(".repeat(500), ")".repeat(500));
        let err = parse_err(&src);
        assert!(err.message.contains("deeply"));
    }
}
