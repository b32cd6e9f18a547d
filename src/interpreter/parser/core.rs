use std::{cell::RefCell, collections::HashMap, rc::Rc};

use crate::{ast::{FuncDecl, Program, Statement, Var, VarRef},
            error::ParseError,
            interpreter::{lexer::{Pos, Tok, Token, tokenize},
                          parser::scope::ScopeStack,
                          types::Type}};

/// The statement-level parser and static analyzer.
///
/// The parser owns the eager token vector and indexes into it: the
/// whitespace rules need raw lookback at the previous token, and error
/// recovery skips forward to the next line. It accumulates all diagnostics
/// instead of aborting on the first one and always returns a (possibly
/// partial) [`Program`].
///
/// Whitespace-sensitivity is an explicit stack of flags: when the top flag
/// is set, a whitespace token terminates the current expression, which is
/// what makes `print a b` three tokens rather than one expression. Opening
/// a bracketing construct pushes a new flag; leaving it pops.
pub struct Parser {
    pub(super) tokens:       Vec<Tok>,
    pub(super) pos:          usize,
    wss:                     Vec<bool>,
    pub(super) errors:       Vec<ParseError>,
    /// All known functions: host built-ins plus the signatures collected by
    /// the pre-pass.
    pub(super) funcs:        HashMap<String, Rc<FuncDecl>>,
    pub(super) scopes:       ScopeStack,
    pub(super) loop_depth:   usize,
    /// Name and return type of the function body being parsed, if any.
    pub(super) current_func: Option<(String, Type)>,
}

impl Parser {
    /// Creates a parser over a source string with the given table of
    /// built-in function declarations.
    ///
    /// # Example
    /// ```
    /// use quill::interpreter::{evaluator::builtin, parser::core::Parser};
    ///
    /// let parser = Parser::new("a := 1\nprint a", builtin::declarations());
    /// let (program, errors) = parser.parse();
    /// assert!(errors.is_empty());
    /// assert_eq!(program.to_string(), "a=1\nprint(a)\n");
    /// ```
    #[must_use]
    pub fn new(source: &str, builtins: HashMap<String, Rc<FuncDecl>>) -> Self {
        Self { tokens:       tokenize(source),
               pos:          0,
               wss:          vec![false],
               errors:       Vec::new(),
               funcs:        builtins,
               scopes:       ScopeStack::new(),
               loop_depth:   0,
               current_func: None, }
    }

    /// Runs both parsing passes and returns the program together with every
    /// collected diagnostic. An empty diagnostic list means the program is
    /// ready to evaluate.
    #[must_use]
    pub fn parse(mut self) -> (Program, Vec<ParseError>) {
        self.preparse_func_signatures();
        self.pos = 0;

        let mut statements = Vec::new();
        let mut exits_seen = false;
        let mut unreachable_reported = false;
        loop {
            self.skip_ws_and_nl();
            if *self.cur() == Token::Eof {
                break;
            }
            let stmt_pos = self.cur_pos();
            if let Some(statement) = self.parse_statement(true) {
                let exempt = matches!(statement, Statement::Func { .. } | Statement::Event { .. });
                if exits_seen && !exempt && !unreachable_reported {
                    self.err(ParseError::UnreachableCode { pos: stmt_pos });
                    unreachable_reported = true;
                }
                if statement.exits() {
                    exits_seen = true;
                }
                statements.push(statement);
            }
        }
        self.scopes.pop(&mut self.errors);

        (Program { statements,
                   funcs: self.funcs, },
         self.errors)
    }

    // --- token cursor -----------------------------------------------------

    pub(super) fn cur(&self) -> &Token {
        &self.tokens[self.pos].token
    }

    pub(super) fn cur_pos(&self) -> Pos {
        self.tokens[self.pos].pos
    }

    /// Raw lookup without whitespace skipping; out-of-range reads clamp to
    /// the trailing `EOF`.
    pub(super) fn look_at(&self, i: usize) -> &Token {
        let i = i.min(self.tokens.len() - 1);
        &self.tokens[i].token
    }

    /// Returns `true` if the raw token just before the cursor is whitespace.
    pub(super) fn prev_is_ws(&self) -> bool {
        self.pos > 0 && matches!(self.tokens[self.pos - 1].token, Token::Whitespace)
    }

    pub(super) fn wss(&self) -> bool {
        *self.wss.last().expect("whitespace stack underflow")
    }

    pub(super) fn push_wss(&mut self, wss: bool) {
        self.wss.push(wss);
    }

    pub(super) fn pop_wss(&mut self) {
        self.wss.pop();
    }

    /// Moves the cursor one token forward. Outside whitespace-sensitive
    /// regions the cursor never rests on a whitespace token.
    pub(super) fn advance(&mut self) {
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        if !self.wss() {
            self.skip_ws();
        }
    }

    pub(super) fn advance_if_ws(&mut self) {
        self.skip_ws();
    }

    fn skip_ws(&mut self) {
        while matches!(self.cur(), Token::Whitespace) && self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
    }

    pub(super) fn skip_ws_and_nl(&mut self) {
        while matches!(self.cur(), Token::Whitespace | Token::NewLine | Token::Comment)
              && self.pos < self.tokens.len() - 1
        {
            self.pos += 1;
        }
    }

    /// A comment always runs to the line break, so it counts as end of line.
    pub(super) fn is_at_eol(&self) -> bool {
        matches!(self.cur(), Token::NewLine | Token::Eof | Token::Comment)
    }

    /// An expression ends at end of line, or at whitespace when the current
    /// region is whitespace-sensitive.
    pub(super) fn at_expr_end(&self) -> bool {
        if self.wss() && matches!(self.cur(), Token::Whitespace) {
            return true;
        }
        self.is_at_eol()
    }

    // --- diagnostics and recovery -----------------------------------------

    pub(super) fn err(&mut self, error: ParseError) {
        self.errors.push(error);
    }

    /// Requires the current token to be `expected`; reports and returns
    /// `false` otherwise.
    pub(super) fn assert_token(&mut self, expected: &Token) -> bool {
        if self.cur() == expected {
            return true;
        }
        let error = ParseError::ExpectedToken { expected: expected.literal(),
                                               found:    self.cur().format_details(),
                                               pos:      self.cur_pos(), };
        self.err(error);
        false
    }

    /// Requires the statement to be over; reports trailing junk and skips
    /// the rest of the line.
    pub(super) fn assert_end_of_line(&mut self) {
        self.advance_if_ws();
        if self.is_at_eol() {
            return;
        }
        let error = ParseError::ExpectedEndOfLine { found: self.cur().format_details(),
                                                   pos:   self.cur_pos(), };
        self.err(error);
        self.recover_to_eol();
    }

    /// Skips everything up to and including the next newline.
    pub(super) fn recover_to_eol(&mut self) {
        while !self.is_at_eol() {
            self.pos += 1;
            if self.pos >= self.tokens.len() - 1 {
                self.pos = self.tokens.len() - 1;
                return;
            }
        }
        while matches!(self.cur(), Token::Comment) && self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        if matches!(self.cur(), Token::NewLine) {
            self.pos += 1;
        }
    }

    // --- types ------------------------------------------------------------

    /// Parses a type: `num`, `string`, `bool`, `any`, `[]T`, `{}T`.
    /// Returns `None` without reporting; callers know the context.
    pub(super) fn parse_type(&mut self) -> Option<Type> {
        match self.cur().clone() {
            Token::Num => {
                self.advance();
                Some(Type::Num)
            },
            Token::String => {
                self.advance();
                Some(Type::String)
            },
            Token::Bool => {
                self.advance();
                Some(Type::Bool)
            },
            Token::Any => {
                self.advance();
                Some(Type::Any)
            },
            Token::LBracket => {
                if *self.look_at(self.pos + 1) != Token::RBracket {
                    return None;
                }
                self.advance();
                self.advance();
                Some(Type::Array(Box::new(self.parse_type()?)))
            },
            Token::LCurly => {
                if *self.look_at(self.pos + 1) != Token::RCurly {
                    return None;
                }
                self.advance();
                self.advance();
                Some(Type::Map(Box::new(self.parse_type()?)))
            },
            _ => None,
        }
    }

    // --- function signature pre-pass --------------------------------------

    /// Scans the whole token stream for top-level `func` signatures and
    /// registers them, so that calls may lexically precede declarations.
    /// Bodies are left empty; the main pass fills them in.
    fn preparse_func_signatures(&mut self) {
        let mut at_line_start = true;
        let mut i = 0;
        while i < self.tokens.len() {
            match self.tokens[i].token.clone() {
                Token::NewLine => {
                    at_line_start = true;
                    i += 1;
                },
                Token::Whitespace => i += 1,
                Token::Func if at_line_start => {
                    self.pos = i;
                    self.preparse_signature();
                    self.recover_to_eol();
                    i = self.pos;
                    at_line_start = true;
                },
                _ => {
                    at_line_start = false;
                    i += 1;
                },
            }
        }
    }

    fn preparse_signature(&mut self) {
        let func_pos = self.cur_pos();
        self.advance(); // past `func`

        let name = match self.cur().clone() {
            Token::Ident(name) => name,
            other => {
                let error = ParseError::UnexpectedToken { details: other.format_details(),
                                                         pos:     self.cur_pos(), };
                self.err(error);
                return;
            },
        };
        if self.funcs.contains_key(&name) {
            let error = ParseError::FuncRedeclaration { name,
                                                       pos: func_pos, };
            self.err(error);
            return;
        }
        self.advance(); // past name

        let mut return_type = Type::None;
        if *self.cur() == Token::Colon {
            self.advance();
            match self.parse_type() {
                Some(typ) => return_type = typ,
                None => {
                    let error = ParseError::InvalidTypeDecl { name,
                                                             pos: func_pos, };
                    self.err(error);
                    return;
                },
            }
        }

        let mut params: Vec<VarRef> = Vec::new();
        let mut variadic_param = None;
        while !self.is_at_eol() {
            let param_pos = self.cur_pos();
            let param_name = match self.cur().clone() {
                Token::Ident(param_name) => param_name,
                other => {
                    let error = ParseError::UnexpectedToken { details: other.format_details(),
                                                             pos:     param_pos, };
                    self.err(error);
                    return;
                },
            };
            self.advance(); // past param name
            if !self.assert_token(&Token::Colon) {
                return;
            }
            self.advance(); // past `:`
            let Some(param_type) = self.parse_type() else {
                let error = ParseError::InvalidTypeDecl { name: param_name,
                                                         pos:  param_pos, };
                self.err(error);
                return;
            };

            let variadic = *self.cur() == Token::Ellipsis;
            if variadic {
                self.advance();
            }
            if param_name == name || self.funcs.contains_key(&param_name) {
                let error = ParseError::ParamFuncNameCollision { name: param_name.clone(),
                                                                pos:  param_pos, };
                self.err(error);
            } else if params.iter().any(|p| p.borrow().name == param_name) {
                let error = ParseError::ParamRedeclaration { name: param_name.clone(),
                                                            pos:  param_pos, };
                self.err(error);
            }

            // Params are exempt from the unused-variable check.
            let typ = if variadic {
                Type::Array(Box::new(param_type))
            } else {
                param_type
            };
            let param = Rc::new(RefCell::new(Var { name:    param_name,
                                                   typ,
                                                   pos:     param_pos,
                                                   is_used: true, }));
            if variadic {
                variadic_param = Some(param);
            } else {
                params.push(param);
            }
        }

        if variadic_param.is_some() && !params.is_empty() {
            self.err(ParseError::VariadicNotAlone { pos: func_pos });
            return;
        }

        let decl = FuncDecl { name: name.clone(),
                              params,
                              variadic_param,
                              return_type,
                              body: RefCell::new(crate::ast::Block::default()),
                              pos: func_pos, };
        self.funcs.insert(name, Rc::new(decl));
    }
}
