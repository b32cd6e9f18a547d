use std::{cell::RefCell, rc::Rc};

use crate::{ast::{Block, EventHandler, Expression, IfBranch, Statement, Var, VarRef},
            error::ParseError,
            interpreter::{lexer::{Pos, Token}, parser::core::Parser, types::Type}};

impl Parser {
    /// Parses one statement. Returns `None` when the statement was invalid
    /// and has been reported; the cursor is then already past the bad line.
    pub(super) fn parse_statement(&mut self, top_level: bool) -> Option<Statement> {
        match self.cur().clone() {
            Token::Func if top_level => self.parse_func_statement(),
            Token::On if top_level => self.parse_event_handler(),
            Token::If => self.parse_if_statement(),
            Token::While => self.parse_while_statement(),
            Token::For => self.parse_for_statement(),
            Token::Return => self.parse_return_statement(),
            Token::Break => self.parse_break_statement(),
            Token::Ident(name) => self.parse_ident_statement(&name),
            other => {
                let error = ParseError::UnexpectedInput { details: other.format_details(),
                                                         pos:     self.cur_pos(), };
                self.err(error);
                self.recover_to_eol();
                None
            },
        }
    }

    /// A statement starting with an identifier is a call when the name is a
    /// known function, a declaration before `:=` or `:`, an assignment
    /// before `=`, `[` or `.`, and unknown otherwise.
    fn parse_ident_statement(&mut self, name: &str) -> Option<Statement> {
        let next_is_assign = *self.peek_after() == Token::Assign;
        if self.funcs.contains_key(name) && !next_is_assign {
            return self.parse_call_statement();
        }
        match self.peek_after().clone() {
            Token::Declare | Token::Colon => self.parse_declaration(),
            Token::Assign => self.parse_assignment(),
            _ if matches!(self.look_at(self.pos + 1), Token::LBracket | Token::Dot) => {
                self.parse_assignment()
            },
            _ => {
                let error = ParseError::UnknownFunction { name: name.to_string(),
                                                         pos:  self.cur_pos(), };
                self.err(error);
                self.recover_to_eol();
                None
            },
        }
    }

    fn peek_after(&self) -> &Token {
        let mut i = self.pos + 1;
        while matches!(self.look_at(i), Token::Whitespace) {
            i += 1;
        }
        self.look_at(i)
    }

    // --- declarations and assignments -------------------------------------

    fn parse_declaration(&mut self) -> Option<Statement> {
        let name_pos = self.cur_pos();
        let Token::Ident(name) = self.cur().clone() else {
            unreachable!("declaration starts at an identifier")
        };
        self.advance(); // past the name

        if *self.cur() == Token::Declare {
            self.advance(); // past `:=`
            let Some(value) = self.parse_toplevel_expr() else {
                self.recover_to_eol();
                return None;
            };
            let typ = value.typ();
            if typ == Type::None {
                let call_name = match &value {
                    Expression::Call { name, .. } => name.clone(),
                    _ => name,
                };
                let error = ParseError::NoReturnValueDecl { name: call_name,
                                                           pos:  self.cur_pos(), };
                self.err(error);
                self.recover_to_eol();
                return None;
            }
            let var = self.declare_var(name, name_pos, typ.infer())?;
            self.assert_end_of_line();
            return Some(Statement::Declaration { var,
                                                 value: Some(value), });
        }

        // `x:T` declares with the zero value of T.
        self.advance(); // past `:`
        let Some(typ) = self.parse_type() else {
            let error = ParseError::InvalidTypeDecl { name,
                                                     pos: name_pos, };
            self.err(error);
            self.recover_to_eol();
            return None;
        };
        let var = self.declare_var(name, name_pos, typ)?;
        self.assert_end_of_line();
        Some(Statement::Declaration { var, value: None })
    }

    fn declare_var(&mut self, name: String, pos: Pos, typ: Type) -> Option<VarRef> {
        if self.funcs.contains_key(&name) {
            self.err(ParseError::FuncNameCollision { name, pos });
            self.recover_to_eol();
            return None;
        }
        if self.scopes.declared_in_innermost(&name) {
            self.err(ParseError::Redeclaration { name, pos });
            self.recover_to_eol();
            return None;
        }
        let var = Rc::new(RefCell::new(Var { name,
                                             typ,
                                             pos,
                                             is_used: false, }));
        self.scopes.declare(var.clone());
        Some(var)
    }

    fn parse_assignment(&mut self) -> Option<Statement> {
        let stmt_pos = self.cur_pos();
        let target = self.parse_assign_target()?;
        if !self.assert_token(&Token::Assign) {
            self.recover_to_eol();
            return None;
        }
        self.advance(); // past `=`
        let Some(value) = self.parse_toplevel_expr() else {
            self.recover_to_eol();
            return None;
        };

        let target_type = target.typ();
        if !target_type.accepts(&value.typ()) {
            let error = ParseError::AssignMismatch { target:   target.to_string(),
                                                    expected: target_type,
                                                    found:    value.typ(),
                                                    pos:      stmt_pos, };
            self.err(error);
        }
        self.assert_end_of_line();
        Some(Statement::Assignment { target, value })
    }

    /// Parses an assignment target: a variable with optional index, slice
    /// and dot segments. Unlike expression reads, the root variable is not
    /// marked used; a write alone does not keep a variable alive.
    fn parse_assign_target(&mut self) -> Option<Expression> {
        let pos = self.cur_pos();
        let Token::Ident(name) = self.cur().clone() else {
            unreachable!("assignment starts at an identifier")
        };
        if self.funcs.contains_key(&name) {
            self.err(ParseError::AssignToFunction { name, pos });
            self.recover_to_eol();
            return None;
        }
        let Some(var) = self.scopes.get(&name) else {
            self.err(ParseError::UnknownVariable { name, pos });
            self.recover_to_eol();
            return None;
        };
        self.advance(); // past the name

        let mut target = Expression::Variable { var: var.clone() };
        loop {
            target = match self.cur().clone() {
                Token::LBracket => match self.parse_index_or_slice(target, true) {
                    Some(target) => target,
                    None => {
                        self.recover_to_eol();
                        return None;
                    },
                },
                Token::Dot => match self.parse_dot_expr(target) {
                    Some(target) => target,
                    None => {
                        self.recover_to_eol();
                        return None;
                    },
                },
                _ => break,
            };
        }

        // Writing through an index, slice or dot reads the root reference,
        // so that counts as a use; a bare write does not.
        if !matches!(target, Expression::Variable { .. }) {
            var.borrow_mut().is_used = true;
        }

        // String writes through an index or slice would mutate a copy;
        // strings are value types.
        let invalid = match &target {
            Expression::Index { left, .. } if left.typ() == Type::String => Some("string index"),
            Expression::Slice { left, .. } if left.typ() == Type::String => Some("string slice"),
            _ => None,
        };
        if let Some(details) = invalid {
            let error = ParseError::InvalidAssignmentTarget { details: details.to_string(),
                                                             pos };
            self.err(error);
            self.recover_to_eol();
            return None;
        }
        Some(target)
    }

    fn parse_call_statement(&mut self) -> Option<Statement> {
        let Some(call) = self.parse_func_call() else {
            self.recover_to_eol();
            return None;
        };
        self.assert_end_of_line();
        Some(Statement::Call { call })
    }

    // --- blocks and control flow ------------------------------------------

    /// Parses statements until a terminator, end of file, or—as every block
    /// is single-entry—the end keyword of the surrounding construct. Scope
    /// frames are managed by the caller. Reports unreachable statements and
    /// empty blocks.
    fn parse_block(&mut self, stop: &[Token]) -> Block {
        let mut statements = Vec::new();
        let mut exits_seen = false;
        let mut unreachable_reported = false;
        loop {
            self.skip_ws_and_nl();
            if *self.cur() == Token::Eof || stop.contains(self.cur()) {
                break;
            }
            let stmt_pos = self.cur_pos();
            if let Some(statement) = self.parse_statement(false) {
                if exits_seen && !unreachable_reported {
                    self.err(ParseError::UnreachableCode { pos: stmt_pos });
                    unreachable_reported = true;
                }
                if statement.exits() {
                    exits_seen = true;
                }
                statements.push(statement);
            }
        }
        if statements.is_empty() && *self.cur() != Token::Eof {
            self.err(ParseError::EmptyBlock { pos: self.cur_pos() });
        }
        Block { statements }
    }

    /// Consumes the `end` that closes a block, or reports its absence.
    fn assert_block_end(&mut self) {
        if *self.cur() == Token::End {
            self.advance();
            self.assert_end_of_line();
            return;
        }
        let error = ParseError::ExpectedToken { expected: "end".to_string(),
                                               found:    self.cur().format_details(),
                                               pos:      self.cur_pos(), };
        self.err(error);
    }

    /// Parses a condition expression and requires it to be a bool.
    fn parse_cond(&mut self) -> Option<Expression> {
        let pos = self.cur_pos();
        let cond = self.parse_toplevel_expr()?;
        if cond.typ() != Type::Bool {
            let error = ParseError::CondType { found: cond.typ(),
                                              pos };
            self.err(error);
        }
        Some(cond)
    }

    fn parse_if_statement(&mut self) -> Option<Statement> {
        self.advance(); // past `if`
        let cond = self.parse_cond();
        self.assert_end_of_line();

        let mut branches = Vec::new();
        self.scopes.push();
        let block = self.parse_block(&[Token::Else, Token::End]);
        self.scopes.pop(&mut self.errors);
        branches.push(IfBranch { cond: cond.unwrap_or(Expression::BoolLiteral { value: false }),
                                 block });

        let mut else_block = None;
        loop {
            match self.cur().clone() {
                Token::Else => {
                    self.advance(); // past `else`
                    if *self.cur() == Token::If {
                        self.advance(); // past `if`
                        let cond = self.parse_cond();
                        self.assert_end_of_line();
                        self.scopes.push();
                        let block = self.parse_block(&[Token::Else, Token::End]);
                        self.scopes.pop(&mut self.errors);
                        let cond = cond.unwrap_or(Expression::BoolLiteral { value: false });
                        branches.push(IfBranch { cond, block });
                    } else {
                        self.assert_end_of_line();
                        self.scopes.push();
                        let block = self.parse_block(&[Token::End]);
                        self.scopes.pop(&mut self.errors);
                        else_block = Some(block);
                    }
                },
                Token::End => {
                    self.advance();
                    self.assert_end_of_line();
                    break;
                },
                _ => {
                    let error = ParseError::ExpectedToken { expected: "end".to_string(),
                                                           found:    self.cur()
                                                                         .format_details(),
                                                           pos:      self.cur_pos(), };
                    self.err(error);
                    break;
                },
            }
        }
        Some(Statement::If { branches, else_block })
    }

    fn parse_while_statement(&mut self) -> Option<Statement> {
        self.advance(); // past `while`
        let cond = self.parse_cond();
        self.assert_end_of_line();

        self.loop_depth += 1;
        self.scopes.push();
        let body = self.parse_block(&[Token::End]);
        self.scopes.pop(&mut self.errors);
        self.loop_depth -= 1;
        self.assert_block_end();

        Some(Statement::While { cond: cond.unwrap_or(Expression::BoolLiteral { value: false }),
                                body })
    }

    fn parse_for_statement(&mut self) -> Option<Statement> {
        self.advance(); // past `for`

        let var_pos = self.cur_pos();
        let Token::Ident(name) = self.cur().clone() else {
            let error = ParseError::ExpectedVariable { found: self.cur().format_details(),
                                                      pos:   var_pos, };
            self.err(error);
            self.recover_to_eol();
            return None;
        };
        self.advance(); // past the loop variable
        if *self.cur() != Token::Declare {
            let error = ParseError::ExpectedToken { expected: ":=".to_string(),
                                                   found:    self.cur().format_details(),
                                                   pos:      self.cur_pos(), };
            self.err(error);
            self.recover_to_eol();
            return None;
        }
        self.advance(); // past `:=`
        if *self.cur() != Token::Range {
            let error = ParseError::ExpectedToken { expected: "range".to_string(),
                                                   found:    self.cur().format_details(),
                                                   pos:      self.cur_pos(), };
            self.err(error);
            self.recover_to_eol();
            return None;
        }
        let range_pos = self.cur_pos();
        self.advance(); // past `range`

        let Some(args) = self.parse_expr_list() else {
            self.recover_to_eol();
            return None;
        };
        let var_typ = self.check_range_args(&args, range_pos);

        self.scopes.push();
        let var = if self.funcs.contains_key(&name) {
            self.err(ParseError::FuncNameCollision { name, pos: var_pos });
            None
        } else {
            let var = Rc::new(RefCell::new(Var { name,
                                                 typ: var_typ,
                                                 pos: var_pos,
                                                 is_used: false, }));
            self.scopes.declare(var.clone());
            Some(var)
        };
        self.assert_end_of_line();

        self.loop_depth += 1;
        let body = self.parse_block(&[Token::End]);
        self.loop_depth -= 1;
        self.assert_block_end();
        self.scopes.pop(&mut self.errors);

        var.map(|var| Statement::For { var, args, body })
    }

    /// Validates the range clause and returns the loop variable's type.
    ///
    /// 1-3 num arguments run a numeric range; a single string, array or map
    /// iterates characters, elements or keys.
    fn check_range_args(&mut self, args: &[Expression], range_pos: Pos) -> Type {
        match args {
            [] => {
                let error = ParseError::UnexpectedToken { details: self.cur().format_details(),
                                                         pos:     self.cur_pos(), };
                self.err(error);
                Type::Num
            },
            [single] => match single.typ() {
                Type::Num => Type::Num,
                Type::String => Type::String,
                Type::Array(sub) => {
                    if *sub == Type::None {
                        Type::Any
                    } else {
                        *sub
                    }
                },
                Type::Map(_) => Type::String,
                found => {
                    let error = ParseError::RangeType { found,
                                                       pos: self.cur_pos(), };
                    self.err(error);
                    Type::Num
                },
            },
            _ if args.len() > 3 => {
                let error = ParseError::RangeArgCount { found: args.len(),
                                                       pos:   range_pos, };
                self.err(error);
                Type::Num
            },
            _ => {
                for (i, arg) in args.iter().enumerate() {
                    if arg.typ() != Type::Num {
                        let error = ParseError::RangeArgType { ordinal: i + 1,
                                                              found:   arg.typ(),
                                                              pos:     range_pos, };
                        self.err(error);
                        break;
                    }
                }
                Type::Num
            },
        }
    }

    fn parse_return_statement(&mut self) -> Option<Statement> {
        let ret_pos = self.cur_pos();
        self.advance(); // past `return`
        let value = if self.is_at_eol() {
            None
        } else {
            match self.parse_toplevel_expr() {
                Some(value) => Some(value),
                None => {
                    self.recover_to_eol();
                    return None;
                },
            }
        };

        match self.current_func.clone() {
            Some((name, Type::None)) => {
                if value.is_some() {
                    self.err(ParseError::ReturnValueInNoneFunc { name, pos: ret_pos });
                }
            },
            Some((name, return_type)) => match &value {
                None => {
                    self.err(ParseError::MissingReturnValue { expected: return_type,
                                                             pos:      ret_pos, });
                },
                Some(value) if !return_type.accepts(&value.typ()) => {
                    let error = ParseError::ReturnTypeMismatch { name,
                                                                expected: return_type,
                                                                found: value.typ(),
                                                                pos: ret_pos, };
                    self.err(error);
                },
                Some(_) => {},
            },
            // Top-level return is legal with any value and halts the program.
            None => {},
        }
        self.assert_end_of_line();
        Some(Statement::Return { value })
    }

    fn parse_break_statement(&mut self) -> Option<Statement> {
        let pos = self.cur_pos();
        self.advance(); // past `break`
        if self.loop_depth == 0 {
            self.err(ParseError::BreakOutsideLoop { pos });
        }
        self.assert_end_of_line();
        Some(Statement::Break)
    }

    // --- functions and event handlers -------------------------------------

    /// Parses a `func` body. The signature was collected and validated by
    /// the pre-pass, so this pass skips past it and fills in the body.
    fn parse_func_statement(&mut self) -> Option<Statement> {
        let func_pos = self.cur_pos();
        self.advance(); // past `func`
        let Token::Ident(name) = self.cur().clone() else {
            self.recover_to_eol();
            return None;
        };
        let decl = self.funcs.get(&name).cloned();
        self.recover_to_eol();

        // A pre-pass failure (or a duplicate name) leaves no declaration to
        // fill; parse the body for its side effects only.
        let decl = match decl {
            Some(decl) if decl.pos == func_pos => decl,
            _ => {
                self.scopes.push();
                let _ = self.parse_block(&[Token::End]);
                self.assert_block_end();
                self.scopes.pop(&mut self.errors);
                return None;
            },
        };

        self.current_func = Some((name, decl.return_type.clone()));
        self.scopes.push();
        for param in &decl.params {
            self.scopes.declare(param.clone());
        }
        if let Some(param) = &decl.variadic_param {
            self.scopes.declare(param.clone());
        }
        let saved_depth = std::mem::replace(&mut self.loop_depth, 0);
        let body = self.parse_block(&[Token::End]);
        self.loop_depth = saved_depth;

        if *self.cur() == Token::End {
            if decl.return_type != Type::None && !body.exits() {
                self.err(ParseError::MissingReturn { pos: self.cur_pos() });
            }
            self.advance();
            self.assert_end_of_line();
        } else {
            let error = ParseError::ExpectedToken { expected: "end".to_string(),
                                                   found:    self.cur().format_details(),
                                                   pos:      self.cur_pos(), };
            self.err(error);
        }
        self.scopes.pop(&mut self.errors);
        self.current_func = None;
        decl.body.replace(body);

        Some(Statement::Func { decl })
    }

    fn parse_event_handler(&mut self) -> Option<Statement> {
        self.advance(); // past `on`
        let Token::Ident(name) = self.cur().clone() else {
            let error = ParseError::UnexpectedToken { details: self.cur().format_details(),
                                                     pos:     self.cur_pos(), };
            self.err(error);
            self.recover_to_eol();
            return None;
        };
        self.advance(); // past the event name
        self.assert_end_of_line();

        self.current_func = Some((name.clone(), Type::None));
        self.scopes.push();
        let body = self.parse_block(&[Token::End]);
        self.assert_block_end();
        self.scopes.pop(&mut self.errors);
        self.current_func = None;

        Some(Statement::Event { handler: EventHandler { name, body } })
    }
}
