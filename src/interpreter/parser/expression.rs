use indexmap::IndexMap;

use crate::{ast::{BinaryOp, Expression, FuncDecl, UnaryOp},
            error::ParseError,
            interpreter::{lexer::{Pos, Token},
                          parser::core::Parser,
                          types::{Type, combine_types}}};

/// Binding power of the expression operators, ascending. `Index` covers both
/// `[` and `.`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    /// No binding power; the entry level.
    Lowest,
    /// `or`
    Or,
    /// `and`
    And,
    /// `==` and `!=`
    Equals,
    /// `<`, `>`, `<=`, `>=`
    LessGreater,
    /// `+` and `-`
    Sum,
    /// `*` and `/`
    Product,
    /// Unary `-` and `!`
    Unary,
    /// `x[i]`, `x[a:b]` and `x.key`
    Index,
}

/// Returns the binding power of the token in infix position.
#[must_use]
pub const fn precedence(token: &Token) -> Precedence {
    match token {
        Token::Or => Precedence::Or,
        Token::And => Precedence::And,
        Token::Eq | Token::NotEq => Precedence::Equals,
        Token::Lt | Token::Gt | Token::LtEq | Token::GtEq => Precedence::LessGreater,
        Token::Plus | Token::Minus => Precedence::Sum,
        Token::Asterisk | Token::Slash => Precedence::Product,
        Token::LBracket | Token::Dot => Precedence::Index,
        _ => Precedence::Lowest,
    }
}

/// Parameter acceptance for call arguments. On top of plain acceptance, a
/// generic `[]`/`{}` parameter takes any array/map: built-ins like
/// `has({}, string)` work on every concrete map type.
fn accepts_arg(param: &Type, arg: &Type) -> bool {
    param.accepts(arg) || (param.is_generic() && param.matches(arg))
}

/// Maps a token to its binary operator, or `None` for non-operators.
#[must_use]
pub const fn token_to_binary_op(token: &Token) -> Option<BinaryOp> {
    match token {
        Token::Plus => Some(BinaryOp::Add),
        Token::Minus => Some(BinaryOp::Sub),
        Token::Asterisk => Some(BinaryOp::Mul),
        Token::Slash => Some(BinaryOp::Div),
        Token::Eq => Some(BinaryOp::Eq),
        Token::NotEq => Some(BinaryOp::NotEq),
        Token::Lt => Some(BinaryOp::Lt),
        Token::Gt => Some(BinaryOp::Gt),
        Token::LtEq => Some(BinaryOp::LtEq),
        Token::GtEq => Some(BinaryOp::GtEq),
        Token::And => Some(BinaryOp::And),
        Token::Or => Some(BinaryOp::Or),
        _ => None,
    }
}

impl Parser {
    /// Parses an expression in top-level position: a statement-style call
    /// when the leading identifier names a function, a Pratt expression
    /// otherwise. Used for declaration and assignment right-hand sides,
    /// conditions, return values and grouped expressions.
    pub(super) fn parse_toplevel_expr(&mut self) -> Option<Expression> {
        let starts_call = matches!(self.cur(), Token::Ident(name)
                                   if self.funcs.contains_key(name));
        if starts_call {
            return self.parse_func_call();
        }
        self.parse_expr(Precedence::Lowest)
    }

    /// The Pratt loop: a prefix parse followed by infix extensions while the
    /// next operator binds tighter than `prec`. Returns `None` after a
    /// reported error.
    pub(super) fn parse_expr(&mut self, prec: Precedence) -> Option<Expression> {
        let mut left = match self.cur().clone() {
            Token::Ident(name) => self.lookup_var(&name),
            Token::NumLit(_)
            | Token::StringLit(_)
            | Token::True
            | Token::False
            | Token::LBracket
            | Token::LCurly => self.parse_literal(),
            Token::Minus | Token::Bang => self.parse_unary_expr(),
            Token::LParen => self.parse_grouped_expr(),
            _ => {
                self.unexpected_left_token_error();
                None
            },
        }?;

        while !self.at_expr_end() && prec < precedence(self.cur()) {
            left = match self.cur().clone() {
                Token::LBracket => self.parse_index_or_slice(left, true)?,
                Token::Dot => self.parse_dot_expr(left)?,
                _ => self.parse_binary_expr(left)?,
            };
        }
        Some(left)
    }

    /// Reports the most precise error for a token that cannot start an
    /// expression; in whitespace-sensitive mode a stray space around a
    /// binary operator gets its own message.
    fn unexpected_left_token_error(&mut self) {
        if self.wss() {
            let prev = self.look_at(self.pos.wrapping_sub(1)).clone();
            if token_to_binary_op(self.cur()).is_some() && prev == Token::Whitespace {
                let error = ParseError::UnexpectedWhitespaceBefore { details:
                                                                        self.cur()
                                                                            .format_details(),
                                                                    pos:     self.cur_pos(), };
                self.err(error);
                return;
            }
            if *self.cur() == Token::Whitespace && token_to_binary_op(&prev).is_some() {
                let error = ParseError::UnexpectedWhitespaceAfter { details:
                                                                       prev.format_details(),
                                                                   pos:
                                                                       self.tokens[self.pos - 1]
                                                                           .pos, };
                self.err(error);
                return;
            }
        }
        let error = ParseError::UnexpectedToken { details: self.cur().format_details(),
                                                 pos:     self.cur_pos(), };
        self.err(error);
    }

    /// Resolves an identifier in read position: marks the shared variable
    /// record used and returns it. Function names need parentheses here.
    fn lookup_var(&mut self, name: &str) -> Option<Expression> {
        let pos = self.cur_pos();
        self.advance();
        if let Some(var) = self.scopes.get(name) {
            var.borrow_mut().is_used = true;
            return Some(Expression::Variable { var });
        }
        if self.funcs.contains_key(name) {
            let error = ParseError::UnparenthesizedCall { name: name.to_string(),
                                                         pos };
            self.err(error);
            return None;
        }
        let error = ParseError::UnknownVariable { name: name.to_string(),
                                                 pos };
        self.err(error);
        None
    }

    fn parse_literal(&mut self) -> Option<Expression> {
        match self.cur().clone() {
            Token::NumLit(lit) => {
                let pos = self.cur_pos();
                self.advance();
                match lit.parse::<f64>() {
                    Ok(value) => Some(Expression::NumLiteral { value }),
                    Err(_) => {
                        self.err(ParseError::UnexpectedToken { details: lit, pos });
                        None
                    },
                }
            },
            Token::StringLit(value) => {
                self.advance();
                Some(Expression::StringLiteral { value })
            },
            Token::True => {
                self.advance();
                Some(Expression::BoolLiteral { value: true })
            },
            Token::False => {
                self.advance();
                Some(Expression::BoolLiteral { value: false })
            },
            Token::LBracket => self.parse_array_literal(),
            Token::LCurly => self.parse_map_literal(),
            _ => unreachable!("parse_literal called on a non-literal token"),
        }
    }

    /// Parses `[e1 e2 ...]`. Elements are whitespace-separated; the empty
    /// literal keeps the generic array type until inference settles it.
    fn parse_array_literal(&mut self) -> Option<Expression> {
        self.advance(); // past `[`
        self.advance_if_ws();
        let elements = self.parse_expr_list()?;
        if !self.assert_token(&Token::RBracket) {
            return None;
        }
        self.advance(); // past `]`

        if elements.is_empty() {
            return Some(Expression::ArrayLiteral { elements,
                                                   typ: Type::generic_array(), });
        }
        let types: Vec<Type> = elements.iter().map(Expression::typ).collect();
        Some(Expression::ArrayLiteral { elements,
                                        typ: Type::Array(Box::new(combine_types(&types))), })
    }

    /// Parses `{k1:v1 k2:v2 ...}` preserving insertion order. Duplicate keys
    /// are errors.
    fn parse_map_literal(&mut self) -> Option<Expression> {
        self.push_wss(false);
        let pairs = self.parse_map_pairs();
        self.pop_wss();
        let pairs = pairs?;
        if !self.assert_token(&Token::RCurly) {
            return None;
        }
        self.advance(); // past `}`

        if pairs.is_empty() {
            return Some(Expression::MapLiteral { pairs,
                                                 typ: Type::generic_map(), });
        }
        let types: Vec<Type> = pairs.values().map(Expression::typ).collect();
        Some(Expression::MapLiteral { pairs,
                                      typ: Type::Map(Box::new(combine_types(&types))), })
    }

    fn parse_map_pairs(&mut self) -> Option<IndexMap<String, Expression>> {
        self.advance(); // past `{`
        let mut pairs = IndexMap::new();
        while !self.is_at_eol() && *self.cur() != Token::RCurly {
            let key_pos = self.cur_pos();
            let Token::Ident(key) = self.cur().clone() else {
                let error = ParseError::ExpectedMapKey { found: self.cur().format_details(),
                                                        pos:   key_pos, };
                self.err(error);
                return None;
            };
            if pairs.contains_key(&key) {
                let error = ParseError::DuplicateMapKey { key,
                                                         pos: key_pos, };
                self.err(error);
                return None;
            }
            self.advance(); // past key
            if !self.assert_token(&Token::Colon) {
                return None;
            }
            self.advance(); // past `:`
            let value = self.parse_expr_wss(Precedence::Lowest)?;
            pairs.insert(key, value);
            self.advance_if_ws();
        }
        Some(pairs)
    }

    fn parse_unary_expr(&mut self) -> Option<Expression> {
        let pos = self.cur_pos();
        let op = if *self.cur() == Token::Minus {
            UnaryOp::Minus
        } else {
            UnaryOp::Not
        };
        self.advance(); // past the operator
        if self.prev_is_ws() {
            let error = ParseError::UnexpectedWhitespaceAfter { details: format!("'{op}'"),
                                                               pos };
            self.err(error);
            return None;
        }
        let right = self.parse_expr(Precedence::Unary)?;
        match op {
            UnaryOp::Minus if right.typ() != Type::Num => {
                let error = ParseError::UnaryOperandType { op:       op.to_string(),
                                                          expected: "num",
                                                          found:    right.typ(),
                                                          pos, };
                self.err(error);
            },
            UnaryOp::Not if right.typ() != Type::Bool => {
                let error = ParseError::UnaryOperandType { op:       op.to_string(),
                                                          expected: "bool",
                                                          found:    right.typ(),
                                                          pos, };
                self.err(error);
            },
            _ => {},
        }
        Some(Expression::Unary { op,
                                 right: Box::new(right), })
    }

    fn parse_grouped_expr(&mut self) -> Option<Expression> {
        self.push_wss(false);
        self.advance(); // past `(`
        let expr = self.parse_toplevel_expr();
        let closed = expr.is_some() && self.assert_token(&Token::RParen);
        self.pop_wss();
        // The closing delimiter is consumed in the outer whitespace mode, so
        // a following space can terminate the surrounding expression.
        if closed {
            self.advance(); // past `)`
        }
        if closed { expr } else { None }
    }

    fn parse_binary_expr(&mut self, left: Expression) -> Option<Expression> {
        let pos = self.cur_pos();
        let Some(op) = token_to_binary_op(self.cur()) else {
            self.unexpected_left_token_error();
            return None;
        };
        let typ = if op.is_comparison() {
            Type::Bool
        } else {
            left.typ()
        };
        let prec = precedence(self.cur());
        self.advance(); // past the operator
        let right = self.parse_expr(prec)?;

        let left_type = left.typ();
        let right_type = right.typ();
        if left_type.matches(&right_type) {
            let family: Option<&'static str> = match op {
                BinaryOp::Add
                    if left_type != Type::Num
                       && left_type != Type::String
                       && !matches!(left_type, Type::Array(_)) =>
                {
                    Some("num, string or array")
                },
                BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div if left_type != Type::Num => {
                    Some("num")
                },
                BinaryOp::Lt | BinaryOp::Gt | BinaryOp::LtEq | BinaryOp::GtEq
                    if left_type != Type::Num && left_type != Type::String =>
                {
                    Some("num or string")
                },
                BinaryOp::And | BinaryOp::Or if left_type != Type::Bool => Some("bool"),
                _ => None,
            };
            if let Some(expected) = family {
                let error = ParseError::OperandType { op: op.to_string(),
                                                     expected,
                                                     found: left_type,
                                                     pos };
                self.err(error);
            }
        } else {
            let error = ParseError::MismatchedBinary { op: op.to_string(),
                                                      left: left_type,
                                                      right: right_type,
                                                      pos };
            self.err(error);
        }

        Some(Expression::Binary { op,
                                  typ,
                                  left: Box::new(left),
                                  right: Box::new(right), })
    }

    /// Parses `x[i]` or, when `allow_slice` is set, `x[a:b]` with optional
    /// bounds. Also used for assignment targets.
    pub(super) fn parse_index_or_slice(&mut self,
                                       left: Expression,
                                       allow_slice: bool)
                                       -> Option<Expression> {
        if self.prev_is_ws() {
            let error = ParseError::UnexpectedWhitespaceBefore { details: "'['".to_string(),
                                                                pos:     self.cur_pos(), };
            self.err(error);
            return None;
        }
        let pos = self.cur_pos();
        let left_type = left.typ();
        if !matches!(left_type, Type::Array(_) | Type::Map(_) | Type::String) {
            let error = ParseError::NotIndexable { found: left_type,
                                                  pos };
            self.err(error);
            return None;
        }

        self.push_wss(false);
        self.advance(); // past `[`
        let expr = self.parse_index_or_slice_inner(left, allow_slice, pos);
        self.pop_wss();
        // The closing `]` is consumed in the outer whitespace mode, so a
        // following space can terminate the surrounding expression.
        if expr.is_some() {
            self.advance(); // past `]`
        }
        expr
    }

    fn parse_index_or_slice_inner(&mut self,
                                  left: Expression,
                                  allow_slice: bool,
                                  pos: Pos)
                                  -> Option<Expression> {
        if *self.cur() == Token::Colon && allow_slice {
            self.advance(); // past `:`
            return self.parse_slice(left, None, pos);
        }
        let index = self.parse_toplevel_expr()?;
        if *self.cur() == Token::Colon && allow_slice {
            self.advance(); // past `:`
            return self.parse_slice(left, Some(index), pos);
        }

        if !self.assert_token(&Token::RBracket) {
            return None;
        }
        let left_type = left.typ();
        let index_type = index.typ();
        match &left_type {
            Type::Array(_) | Type::String if index_type != Type::Num => {
                let kind = if left_type == Type::String { "string" } else { "array" };
                let error = ParseError::IndexType { kind,
                                                   expected: "num",
                                                   found: index_type,
                                                   pos };
                self.err(error);
                return None;
            },
            Type::Map(_) if index_type != Type::String => {
                let error = ParseError::IndexType { kind: "map",
                                                   expected: "string",
                                                   found: index_type,
                                                   pos };
                self.err(error);
                return None;
            },
            _ => {},
        }

        let typ = match &left_type {
            Type::String => Type::String,
            other => other.sub().cloned().unwrap_or(Type::Any),
        };
        Some(Expression::Index { left: Box::new(left),
                                 index: Box::new(index),
                                 typ })
    }

    fn parse_slice(&mut self,
                   left: Expression,
                   start: Option<Expression>,
                   pos: Pos)
                   -> Option<Expression> {
        let left_type = left.typ();
        if !matches!(left_type, Type::Array(_) | Type::String) {
            let error = ParseError::NotSliceable { found: left_type,
                                                  pos };
            self.err(error);
            return None;
        }

        let end = if *self.cur() == Token::RBracket {
            None
        } else {
            Some(self.parse_toplevel_expr()?)
        };
        if !self.assert_token(&Token::RBracket) {
            return None;
        }

        let kind = if left_type == Type::String { "string" } else { "array" };
        for bound in start.iter().chain(end.iter()) {
            if bound.typ() != Type::Num {
                let error = ParseError::IndexType { kind,
                                                   expected: "num",
                                                   found: bound.typ(),
                                                   pos };
                self.err(error);
                return None;
            }
        }

        Some(Expression::Slice { left:  Box::new(left),
                                 start: start.map(Box::new),
                                 end:   end.map(Box::new),
                                 typ:   left_type, })
    }

    /// Parses `m.key`. Whitespace directly before or after the dot is
    /// rejected, so `a .b` and `a. b` stay two expressions.
    pub(super) fn parse_dot_expr(&mut self, left: Expression) -> Option<Expression> {
        let pos = self.cur_pos();
        if self.prev_is_ws() {
            let error = ParseError::UnexpectedWhitespaceBefore { details: "'.'".to_string(),
                                                                pos };
            self.err(error);
            return None;
        }
        if matches!(self.look_at(self.pos + 1), Token::Whitespace) {
            let error = ParseError::UnexpectedWhitespaceAfter { details: "'.'".to_string(),
                                                               pos };
            self.err(error);
            return None;
        }
        let left_type = left.typ();
        let Type::Map(sub) = &left_type else {
            let error = ParseError::DotOnNonMap { found: left_type,
                                                 pos };
            self.err(error);
            return None;
        };
        let typ = (**sub).clone();

        self.advance(); // past `.`
        let Token::Ident(key) = self.cur().clone() else {
            let error = ParseError::ExpectedMapKey { found: self.cur().format_details(),
                                                    pos };
            self.err(error);
            return None;
        };
        self.advance(); // past the key

        Some(Expression::Dot { left: Box::new(left),
                               key,
                               typ })
    }

    // --- calls ------------------------------------------------------------

    /// Parses a call with the function name at the cursor: the arguments are
    /// a whitespace-separated expression list running to the end of the
    /// line, a `)` or a `]`.
    pub(super) fn parse_func_call(&mut self) -> Option<Expression> {
        let Token::Ident(name) = self.cur().clone() else {
            unreachable!("parse_func_call called off an identifier")
        };
        let decl = self.funcs
                       .get(&name)
                       .expect("caller checked the function table")
                       .clone();
        self.advance(); // past the function name
        let args = self.parse_expr_list()?;
        self.assert_arg_types(&name, &decl, &args);
        Some(Expression::Call { name, decl, args })
    }

    /// Parses a whitespace-separated expression list, each element in
    /// whitespace-sensitive mode.
    pub(super) fn parse_expr_list(&mut self) -> Option<Vec<Expression>> {
        let mut list = Vec::new();
        while !self.is_at_eol()
              && *self.cur() != Token::RParen
              && *self.cur() != Token::RBracket
        {
            let expr = self.parse_expr_wss(Precedence::Lowest)?;
            list.push(expr);
            self.advance_if_ws();
        }
        Some(list)
    }

    fn parse_expr_wss(&mut self, prec: Precedence) -> Option<Expression> {
        self.push_wss(true);
        let expr = self.parse_expr(prec);
        self.pop_wss();
        expr
    }

    /// Checks a call's arguments against the declaration: arity and
    /// acceptance for fixed parameters, element acceptance for variadics.
    /// Diagnostics cite the 1st/2nd/Nth argument.
    pub(super) fn assert_arg_types(&mut self, name: &str, decl: &FuncDecl, args: &[Expression]) {
        let pos = self.cur_pos();
        if let Some(variadic) = &decl.variadic_param {
            let elem = variadic.borrow().typ.sub().cloned().unwrap_or(Type::Any);
            for arg in args {
                if !accepts_arg(&elem, &arg.typ()) {
                    let error = ParseError::VariadicArgType { name:     name.to_string(),
                                                             expected: elem,
                                                             found:    arg.typ(),
                                                             pos, };
                    self.err(error);
                    return;
                }
            }
            return;
        }

        if args.len() != decl.params.len() {
            let error = ParseError::Arity { name:     name.to_string(),
                                           expected: decl.params.len(),
                                           found:    args.len(),
                                           pos, };
            self.err(error);
            return;
        }
        for (i, (param, arg)) in decl.params.iter().zip(args).enumerate() {
            let expected = param.borrow().typ.clone();
            if !accepts_arg(&expected, &arg.typ()) {
                let error = ParseError::ArgType { name: name.to_string(),
                                                 ordinal: i + 1,
                                                 expected,
                                                 found: arg.typ(),
                                                 pos };
                self.err(error);
            }
        }
    }
}
