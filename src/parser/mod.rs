//! Recursive-descent, operator-precedence parser (spec.md §4.1).
//!
//! The statement grammar is plain recursive descent; expressions use a
//! precedence-climbing loop keyed off the same left/right binding power
//! table the teacher's `lua_operator_kind.rs` encodes (`PRIORITY` array),
//! just inlined as a `match` rather than indexed by an `OPR_*` enum, since
//! there's no bytecode-emission code sharing the table with us.

pub mod ast;

use smol_str::SmolStr;
use std::rc::Rc;

use crate::error::Diagnostic;
use crate::lexer::{Lexer, Pos, Token, TokenKind};
use ast::*;

pub struct Parser {
    tokens: Vec<Token>,
    idx: usize,
    file: String,
    errors: Vec<Diagnostic>,
}

/// §6.1: `Parse(source, fileName) -> Result<AST, Diagnostic[]>`.
pub fn parse(source: &[u8], file_name: &str) -> Result<Block, Vec<Diagnostic>> {
    let tokens = Lexer::new(source, file_name).tokenize()?;
    let mut parser = Parser { tokens, idx: 0, file: file_name.to_string(), errors: Vec::new() };
    let block = parser.parse_block();
    parser.expect(TokenKind::Eof, "'<eof>'");
    if parser.errors.is_empty() {
        Ok(block)
    } else {
        Err(parser.errors)
    }
}

impl Parser {
    fn cur(&self) -> &Token {
        &self.tokens[self.idx.min(self.tokens.len() - 1)]
    }

    fn cur_kind(&self) -> &TokenKind {
        &self.cur().kind
    }

    fn cur_pos(&self) -> Pos {
        self.cur().pos
    }

    fn bump(&mut self) -> Token {
        let t = self.tokens[self.idx.min(self.tokens.len() - 1)].clone();
        if self.idx < self.tokens.len() - 1 {
            self.idx += 1;
        }
        t
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(self.cur_kind()) == std::mem::discriminant(kind)
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Pos {
        let pos = self.cur_pos();
        if !self.eat(&kind) {
            self.error(pos, format!("{what} expected near '{}'", token_desc(self.cur_kind())));
        }
        pos
    }

    fn error(&mut self, pos: Pos, msg: impl Into<String>) {
        self.errors.push(Diagnostic::error("PARSE-SYNTAX", msg, &self.file, pos.line, pos.column));
    }

    fn expect_name(&mut self) -> SmolStr {
        let pos = self.cur_pos();
        if let TokenKind::Name(n) = self.cur_kind().clone() {
            self.bump();
            n
        } else {
            self.error(pos, format!("<name> expected near '{}'", token_desc(self.cur_kind())));
            SmolStr::new("")
        }
    }

    fn at_block_end(&self) -> bool {
        matches!(
            self.cur_kind(),
            TokenKind::Eof | TokenKind::End | TokenKind::Else | TokenKind::Elseif | TokenKind::Until
        )
    }

    fn parse_block(&mut self) -> Block {
        let mut stmts = Vec::new();
        while !self.at_block_end() {
            if matches!(self.cur_kind(), TokenKind::Return) {
                stmts.push(self.parse_return());
                break;
            }
            let stmt = self.parse_stmt();
            if !matches!(stmt, Stmt::Empty) {
                stmts.push(stmt);
            }
            if self.idx >= self.tokens.len() - 1 && matches!(self.cur_kind(), TokenKind::Eof) {
                break;
            }
        }
        stmts
    }

    fn parse_return(&mut self) -> Stmt {
        let pos = self.cur_pos();
        self.bump(); // return
        let mut exprs = Vec::new();
        if !self.at_block_end() && !matches!(self.cur_kind(), TokenKind::Semi) {
            exprs.push(self.parse_expr());
            while self.eat(&TokenKind::Comma) {
                exprs.push(self.parse_expr());
            }
        }
        self.eat(&TokenKind::Semi);
        Stmt::Return(exprs, pos)
    }

    fn parse_stmt(&mut self) -> Stmt {
        let pos = self.cur_pos();
        match self.cur_kind().clone() {
            TokenKind::Semi => {
                self.bump();
                Stmt::Empty
            }
            TokenKind::DColon => {
                self.bump();
                let name = self.expect_name();
                self.expect(TokenKind::DColon, "'::'");
                Stmt::Label(name, pos)
            }
            TokenKind::Break => {
                self.bump();
                Stmt::Break(pos)
            }
            TokenKind::Goto => {
                self.bump();
                let name = self.expect_name();
                Stmt::Goto(name, pos)
            }
            TokenKind::Do => {
                self.bump();
                let body = self.parse_block();
                self.expect(TokenKind::End, "'end'");
                Stmt::Do(body)
            }
            TokenKind::While => {
                self.bump();
                let cond = self.parse_expr();
                self.expect(TokenKind::Do, "'do'");
                let body = self.parse_block();
                self.expect(TokenKind::End, "'end'");
                Stmt::While { cond, body, pos }
            }
            TokenKind::Repeat => {
                self.bump();
                let body = self.parse_block();
                self.expect(TokenKind::Until, "'until'");
                let cond = self.parse_expr();
                Stmt::Repeat { body, cond, pos }
            }
            TokenKind::If => self.parse_if(),
            TokenKind::For => self.parse_for(),
            TokenKind::Function => self.parse_function_stat(),
            TokenKind::Local => self.parse_local(),
            _ => self.parse_expr_stat(),
        }
    }

    fn parse_if(&mut self) -> Stmt {
        let pos = self.cur_pos();
        self.bump(); // if
        let mut arms = Vec::new();
        let cond = self.parse_expr();
        self.expect(TokenKind::Then, "'then'");
        let body = self.parse_block();
        arms.push((cond, body));
        while matches!(self.cur_kind(), TokenKind::Elseif) {
            self.bump();
            let cond = self.parse_expr();
            self.expect(TokenKind::Then, "'then'");
            let body = self.parse_block();
            arms.push((cond, body));
        }
        let else_block = if self.eat(&TokenKind::Else) { Some(self.parse_block()) } else { None };
        self.expect(TokenKind::End, "'end'");
        Stmt::If { arms, else_block, pos }
    }

    fn parse_for(&mut self) -> Stmt {
        let pos = self.cur_pos();
        self.bump(); // for
        let first = self.expect_name();
        if matches!(self.cur_kind(), TokenKind::Assign) {
            self.bump();
            let start = self.parse_expr();
            self.expect(TokenKind::Comma, "','");
            let stop = self.parse_expr();
            let step = if self.eat(&TokenKind::Comma) { Some(self.parse_expr()) } else { None };
            self.expect(TokenKind::Do, "'do'");
            let body = self.parse_block();
            self.expect(TokenKind::End, "'end'");
            Stmt::NumericFor { var: first, start, stop, step, body, pos }
        } else {
            let mut names = vec![first];
            while self.eat(&TokenKind::Comma) {
                names.push(self.expect_name());
            }
            self.expect(TokenKind::In, "'in' or '='");
            let mut exprs = vec![self.parse_expr()];
            while self.eat(&TokenKind::Comma) {
                exprs.push(self.parse_expr());
            }
            self.expect(TokenKind::Do, "'do'");
            let body = self.parse_block();
            self.expect(TokenKind::End, "'end'");
            Stmt::GenericFor { names, exprs, body, pos }
        }
    }

    fn parse_function_stat(&mut self) -> Stmt {
        let pos = self.cur_pos();
        self.bump(); // function
        let first = self.expect_name();
        let mut target = Expr::Name(first.clone(), pos);
        let mut name_hint = first.to_string();
        let mut is_method = false;
        loop {
            if self.eat(&TokenKind::Dot) {
                let field = self.expect_name();
                name_hint.push('.');
                name_hint.push_str(&field);
                target = Expr::Index {
                    obj: Box::new(target),
                    key: Box::new(Expr::Str(Rc::from(field.as_bytes()))),
                    pos,
                };
            } else if self.eat(&TokenKind::Colon) {
                let field = self.expect_name();
                name_hint.push(':');
                name_hint.push_str(&field);
                target = Expr::Index {
                    obj: Box::new(target),
                    key: Box::new(Expr::Str(Rc::from(field.as_bytes()))),
                    pos,
                };
                is_method = true;
                break;
            } else {
                break;
            }
        }
        let body = self.parse_function_body(is_method, Some(name_hint));
        Stmt::FunctionDecl { target, body, pos }
    }

    fn parse_function_body(&mut self, is_method: bool, name_hint: Option<String>) -> Rc<FunctionBody> {
        let pos = self.cur_pos();
        self.expect(TokenKind::LParen, "'('");
        let mut params = Vec::new();
        if is_method {
            params.push(SmolStr::new("self"));
        }
        let mut is_vararg = false;
        if !matches!(self.cur_kind(), TokenKind::RParen) {
            loop {
                if matches!(self.cur_kind(), TokenKind::Ellipsis) {
                    self.bump();
                    is_vararg = true;
                    break;
                }
                params.push(self.expect_name());
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, "')'");
        let body = self.parse_block();
        self.expect(TokenKind::End, "'end'");
        Rc::new(FunctionBody { params, is_vararg, body: Rc::new(body), pos, name_hint })
    }

    fn parse_local(&mut self) -> Stmt {
        let pos = self.cur_pos();
        self.bump(); // local
        if matches!(self.cur_kind(), TokenKind::Function) {
            self.bump();
            let name = self.expect_name();
            let body = self.parse_function_body(false, Some(name.to_string()));
            return Stmt::LocalFunction { name, body, pos };
        }
        let mut names = Vec::new();
        loop {
            let name = self.expect_name();
            let attrib = if self.eat(&TokenKind::Lt) {
                let attr_name = self.expect_name();
                self.expect(TokenKind::Gt, "'>'");
                match attr_name.as_str() {
                    "const" => Attrib::Const,
                    "close" => Attrib::Close,
                    other => {
                        self.error(pos, format!("unknown attribute '{other}'"));
                        Attrib::None
                    }
                }
            } else {
                Attrib::None
            };
            names.push((name, attrib));
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        let values = if self.eat(&TokenKind::Assign) {
            let mut v = vec![self.parse_expr()];
            while self.eat(&TokenKind::Comma) {
                v.push(self.parse_expr());
            }
            v
        } else {
            Vec::new()
        };
        Stmt::Local { names, values, pos }
    }

    fn parse_expr_stat(&mut self) -> Stmt {
        let pos = self.cur_pos();
        let first = self.parse_suffixed_expr();
        if matches!(self.cur_kind(), TokenKind::Assign | TokenKind::Comma) {
            let mut targets = vec![first];
            while self.eat(&TokenKind::Comma) {
                targets.push(self.parse_suffixed_expr());
            }
            self.expect(TokenKind::Assign, "'='");
            let mut values = vec![self.parse_expr()];
            while self.eat(&TokenKind::Comma) {
                values.push(self.parse_expr());
            }
            Stmt::Assign { targets, values, pos }
        } else {
            match &first {
                Expr::Call { .. } | Expr::MethodCall { .. } => Stmt::ExprStat(first),
                _ => {
                    self.error(pos, "syntax error (expected statement)");
                    Stmt::Empty
                }
            }
        }
    }

    // ---- expressions ----

    fn parse_expr(&mut self) -> Expr {
        self.parse_binary_expr(0)
    }

    fn parse_binary_expr(&mut self, min_prec: u8) -> Expr {
        let pos = self.cur_pos();
        let mut lhs = if let Some(op) = unary_op(self.cur_kind()) {
            self.bump();
            let operand = self.parse_binary_expr(12); // unary binds tighter than all binops but ^
            Expr::Unary { op, expr: Box::new(operand), pos }
        } else {
            self.parse_simple_expr()
        };

        loop {
            let Some((op, lprec, rprec)) = binary_op(self.cur_kind()) else { break };
            if lprec < min_prec {
                break;
            }
            let pos = self.cur_pos();
            self.bump();
            let rhs = self.parse_binary_expr(rprec);
            lhs = Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs), pos };
        }
        lhs
    }

    fn parse_simple_expr(&mut self) -> Expr {
        let pos = self.cur_pos();
        match self.cur_kind().clone() {
            TokenKind::Nil => { self.bump(); Expr::Nil }
            TokenKind::True => { self.bump(); Expr::True }
            TokenKind::False => { self.bump(); Expr::False }
            TokenKind::Int(i) => { self.bump(); Expr::Int(i) }
            TokenKind::Float(f) => { self.bump(); Expr::Float(f) }
            TokenKind::Str(s) => { self.bump(); Expr::Str(Rc::from(s.as_slice())) }
            TokenKind::Ellipsis => { self.bump(); Expr::Vararg(pos) }
            TokenKind::Function => {
                self.bump();
                Expr::Function(self.parse_function_body(false, None))
            }
            TokenKind::LBrace => self.parse_table(),
            _ => self.parse_suffixed_expr(),
        }
    }

    fn parse_primary_expr(&mut self) -> Expr {
        let pos = self.cur_pos();
        match self.cur_kind().clone() {
            TokenKind::Name(n) => {
                self.bump();
                Expr::Name(n, pos)
            }
            TokenKind::LParen => {
                self.bump();
                let inner = self.parse_expr();
                self.expect(TokenKind::RParen, "')'");
                Expr::Paren(Box::new(inner))
            }
            other => {
                self.error(pos, format!("unexpected symbol near '{}'", token_desc(&other)));
                Expr::Nil
            }
        }
    }

    fn parse_suffixed_expr(&mut self) -> Expr {
        let mut expr = self.parse_primary_expr();
        loop {
            let pos = self.cur_pos();
            match self.cur_kind().clone() {
                TokenKind::Dot => {
                    self.bump();
                    let field = self.expect_name();
                    expr = Expr::Index {
                        obj: Box::new(expr),
                        key: Box::new(Expr::Str(Rc::from(field.as_bytes()))),
                        pos,
                    };
                }
                TokenKind::LBracket => {
                    self.bump();
                    let key = self.parse_expr();
                    self.expect(TokenKind::RBracket, "']'");
                    expr = Expr::Index { obj: Box::new(expr), key: Box::new(key), pos };
                }
                TokenKind::Colon => {
                    self.bump();
                    let method = self.expect_name();
                    let args = self.parse_call_args();
                    expr = Expr::MethodCall { obj: Box::new(expr), method, args, pos };
                }
                TokenKind::LParen | TokenKind::Str(_) | TokenKind::LBrace => {
                    let args = self.parse_call_args();
                    expr = Expr::Call { func: Box::new(expr), args, pos };
                }
                _ => break,
            }
        }
        expr
    }

    fn parse_call_args(&mut self) -> Vec<Expr> {
        match self.cur_kind().clone() {
            TokenKind::Str(s) => {
                self.bump();
                vec![Expr::Str(Rc::from(s.as_slice()))]
            }
            TokenKind::LBrace => vec![self.parse_table()],
            _ => {
                self.expect(TokenKind::LParen, "function arguments");
                let mut args = Vec::new();
                if !matches!(self.cur_kind(), TokenKind::RParen) {
                    args.push(self.parse_expr());
                    while self.eat(&TokenKind::Comma) {
                        args.push(self.parse_expr());
                    }
                }
                self.expect(TokenKind::RParen, "')'");
                args
            }
        }
    }

    fn parse_table(&mut self) -> Expr {
        let pos = self.cur_pos();
        self.expect(TokenKind::LBrace, "'{'");
        let mut fields = Vec::new();
        while !matches!(self.cur_kind(), TokenKind::RBrace) {
            match self.cur_kind().clone() {
                TokenKind::LBracket => {
                    self.bump();
                    let key = self.parse_expr();
                    self.expect(TokenKind::RBracket, "']'");
                    self.expect(TokenKind::Assign, "'='");
                    let value = self.parse_expr();
                    fields.push(Field::Indexed(key, value));
                }
                TokenKind::Name(n) if matches!(self.tokens[(self.idx + 1).min(self.tokens.len() - 1)].kind, TokenKind::Assign) => {
                    self.bump();
                    self.bump(); // =
                    let value = self.parse_expr();
                    fields.push(Field::Named(n, value));
                }
                _ => {
                    fields.push(Field::Positional(self.parse_expr()));
                }
            }
            if !self.eat(&TokenKind::Comma) && !self.eat(&TokenKind::Semi) {
                break;
            }
        }
        self.expect(TokenKind::RBrace, "'}'");
        Expr::Table(fields, pos)
    }
}

fn unary_op(kind: &TokenKind) -> Option<UnOp> {
    match kind {
        TokenKind::Not => Some(UnOp::Not),
        TokenKind::Hash => Some(UnOp::Len),
        TokenKind::Minus => Some(UnOp::Neg),
        TokenKind::Tilde => Some(UnOp::BNot),
        _ => None,
    }
}

/// `(op, left-binding-power, right-binding-power)`. Right-associative
/// operators (`..`, `^`) use `right < left` so the recursive call at the
/// same precedence re-associates to the right, matching spec.md §4.1's
/// precedence table.
fn binary_op(kind: &TokenKind) -> Option<(BinOp, u8, u8)> {
    use BinOp::*;
    Some(match kind {
        TokenKind::Or => (Or, 1, 2),
        TokenKind::And => (And, 2, 3),
        TokenKind::Lt => (Lt, 3, 4),
        TokenKind::Gt => (Gt, 3, 4),
        TokenKind::Le => (Le, 3, 4),
        TokenKind::Ge => (Ge, 3, 4),
        TokenKind::Ne => (Ne, 3, 4),
        TokenKind::Eq => (Eq, 3, 4),
        TokenKind::Pipe => (BOr, 4, 5),
        TokenKind::Tilde => (BXor, 5, 6),
        TokenKind::Amp => (BAnd, 6, 7),
        TokenKind::Shl => (Shl, 7, 8),
        TokenKind::Shr => (Shr, 7, 8),
        TokenKind::Concat => (Concat, 9, 8), // right-assoc
        TokenKind::Plus => (Add, 10, 11),
        TokenKind::Minus => (Sub, 10, 11),
        TokenKind::Star => (Mul, 11, 12),
        TokenKind::Slash => (Div, 11, 12),
        TokenKind::DSlash => (IDiv, 11, 12),
        TokenKind::Percent => (Mod, 11, 12),
        TokenKind::Caret => (Pow, 14, 13), // right-assoc, binds tighter than unary
        _ => return None,
    })
}

fn token_desc(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Name(n) => n.to_string(),
        TokenKind::Str(_) => "<string>".to_string(),
        TokenKind::Int(i) => i.to_string(),
        TokenKind::Float(f) => f.to_string(),
        TokenKind::Eof => "<eof>".to_string(),
        other => format!("{other:?}"),
    }
}
