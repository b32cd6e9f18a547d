use std::{collections::HashMap, rc::Rc};

use crate::{ast::{Block, Expression, FuncDecl, Program, Statement, VarRef},
            error::RuntimeError,
            interpreter::{evaluator::builtin,
                          parser::core::Parser,
                          types::Type,
                          value::Value}};

/// Result type used by the evaluator.
pub type EvalResult<T> = Result<T, RuntimeError>;

/// The output sink supplied by the host.
///
/// All program output flows through a single `print` function: regular
/// `print` calls, the not-yet-implemented notices of the graphics stubs,
/// collected parse errors, and `ERROR:` lines for runtime failures.
pub trait Printer {
    /// Writes one chunk of output. The evaluator includes newlines itself.
    fn print(&mut self, s: &str);
}

impl<F: FnMut(&str)> Printer for F {
    fn print(&mut self, s: &str) {
        self(s);
    }
}

/// Control-flow signal threaded out of statement execution.
///
/// `return` and `break` are plain values handed back up the walker, not
/// host-language panics: the enclosing loop or call unpacks them and
/// resumes normal flow.
pub enum Flow {
    /// Execution fell through normally.
    Normal,
    /// A `break` is looking for the nearest enclosing loop.
    Break,
    /// A `return` is unwinding the current call, with its value.
    Return(Option<Value>),
}

/// The runtime environment: a stack of scope frames over a function table.
///
/// Function calls do not close over their caller's locals. The `floors`
/// stack records where the current function's frames begin; lookups walk
/// from the innermost frame down to that floor and then consult the global
/// frame directly.
pub struct Context<'a> {
    scopes:             Vec<HashMap<String, Value>>,
    floors:             Vec<usize>,
    pub(super) printer: &'a mut dyn Printer,
}

/// Lexes, parses, and evaluates a source string.
///
/// On parse errors the printer receives the collected diagnostics joined
/// with newlines and nothing is evaluated. On a runtime error the printer
/// receives `ERROR: <message>`; output produced before the error is kept.
///
/// # Example
/// ```
/// use quill::interpreter::evaluator::core::run;
///
/// let mut out = String::new();
/// run("a:=1\n print a 2", &mut |s: &str| out.push_str(s));
/// assert_eq!(out, "1 2\n");
/// ```
pub fn run(source: &str, printer: &mut dyn Printer) {
    let (program, errors) = Parser::new(source, builtin::declarations()).parse();
    if !errors.is_empty() {
        let joined = errors.iter()
                           .map(ToString::to_string)
                           .collect::<Vec<_>>()
                           .join("\n");
        printer.print(&joined);
        return;
    }

    let mut context = Context::new(printer);
    if let Err(error) = context.exec_program(&program) {
        context.printer.print(&format!("ERROR: {error}"));
    }
}

impl<'a> Context<'a> {
    /// Creates a fresh environment writing through the given printer.
    pub fn new(printer: &'a mut dyn Printer) -> Self {
        Self { scopes: vec![HashMap::new()],
               floors: Vec::new(),
               printer }
    }

    /// Executes all top-level statements. A top-level `return` halts the
    /// program.
    pub fn exec_program(&mut self, program: &Program) -> EvalResult<()> {
        for statement in &program.statements {
            if let Flow::Return(_) = self.exec_statement(statement)? {
                break;
            }
        }
        Ok(())
    }

    pub(super) fn exec_statement(&mut self, statement: &Statement) -> EvalResult<Flow> {
        match statement {
            Statement::Declaration { var, value } => {
                let var = var.borrow();
                let val = match value {
                    Some(value) => self.eval_expr(value)?,
                    None => Value::zero(&var.typ),
                };
                let val = if var.typ == Type::Any { val.into_any() } else { val };
                self.define(var.name.clone(), val);
                Ok(Flow::Normal)
            },
            Statement::Assignment { target, value } => {
                let value = self.eval_expr(value)?;
                self.assign(target, value)?;
                Ok(Flow::Normal)
            },
            Statement::Call { call } => {
                self.eval_call_expr(call)?;
                Ok(Flow::Normal)
            },
            Statement::If { branches, else_block } => {
                for branch in branches {
                    if self.eval_bool(&branch.cond)? {
                        return self.exec_block(&branch.block);
                    }
                }
                match else_block {
                    Some(block) => self.exec_block(block),
                    None => Ok(Flow::Normal),
                }
            },
            Statement::While { cond, body } => {
                while self.eval_bool(cond)? {
                    match self.exec_block(body)? {
                        Flow::Break => break,
                        ret @ Flow::Return(_) => return Ok(ret),
                        Flow::Normal => {},
                    }
                }
                Ok(Flow::Normal)
            },
            Statement::For { var, args, body } => self.exec_for(var, args, body),
            Statement::Return { value } => {
                let value = match value {
                    Some(value) => Some(self.eval_expr(value)?),
                    None => None,
                };
                Ok(Flow::Return(value))
            },
            Statement::Break => Ok(Flow::Break),
            // Declarations were registered at parse time; event handlers are
            // only fired by embedding hosts.
            Statement::Func { .. } | Statement::Event { .. } => Ok(Flow::Normal),
        }
    }

    fn exec_block(&mut self, block: &Block) -> EvalResult<Flow> {
        self.push_scope();
        let flow = self.exec_statements(&block.statements);
        self.pop_scope();
        flow
    }

    pub(super) fn exec_statements(&mut self, statements: &[Statement]) -> EvalResult<Flow> {
        for statement in statements {
            match self.exec_statement(statement)? {
                Flow::Normal => {},
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    /// Runs one loop iteration with the loop variable freshly bound.
    /// Reassigning the variable inside the body has no effect on iteration.
    fn run_iteration(&mut self, name: &str, value: Value, body: &Block) -> EvalResult<Flow> {
        self.push_scope();
        self.define(name.to_string(), value);
        let flow = self.exec_statements(&body.statements);
        self.pop_scope();
        flow
    }

    fn exec_for(&mut self, var: &VarRef, args: &[Expression], body: &Block) -> EvalResult<Flow> {
        let name = var.borrow().name.clone();

        // The range producer is evaluated exactly once, before iteration.
        if args.len() > 1 {
            let start = self.eval_num(&args[0])?;
            let end = self.eval_num(&args[1])?;
            let step = if args.len() == 3 { self.eval_num(&args[2])? } else { 1.0 };
            return self.numeric_for(&name, start, end, step, body);
        }

        let ranged = self.eval_expr(&args[0])?;
        match ranged {
            Value::Num(end) => self.numeric_for(&name, 0.0, end, 1.0, body),
            Value::Str(s) => {
                for ch in s.chars() {
                    match self.run_iteration(&name, Value::Str(ch.to_string()), body)? {
                        Flow::Break => break,
                        ret @ Flow::Return(_) => return Ok(ret),
                        Flow::Normal => {},
                    }
                }
                Ok(Flow::Normal)
            },
            Value::Array(arr) => {
                // The length is snapshotted once; elements are read live and
                // iteration stops early if the array shrinks.
                let len = arr.borrow().len();
                for i in 0..len {
                    let Some(element) = arr.borrow().get(i).cloned() else {
                        break;
                    };
                    match self.run_iteration(&name, element, body)? {
                        Flow::Break => break,
                        ret @ Flow::Return(_) => return Ok(ret),
                        Flow::Normal => {},
                    }
                }
                Ok(Flow::Normal)
            },
            Value::Map(map) => {
                // Keys are snapshotted once; keys deleted mid-iteration are
                // skipped on their turn.
                let keys: Vec<String> = map.borrow().keys().cloned().collect();
                for key in keys {
                    if !map.borrow().contains_key(&key) {
                        continue;
                    }
                    match self.run_iteration(&name, Value::Str(key), body)? {
                        Flow::Break => break,
                        ret @ Flow::Return(_) => return Ok(ret),
                        Flow::Normal => {},
                    }
                }
                Ok(Flow::Normal)
            },
            _ => unreachable!("range argument type checked statically"),
        }
    }

    fn numeric_for(&mut self,
                   name: &str,
                   start: f64,
                   end: f64,
                   step: f64,
                   body: &Block)
                   -> EvalResult<Flow> {
        if step == 0.0 {
            return Err(RuntimeError::ZeroRangeStep);
        }
        let mut i = start;
        while (step > 0.0 && i < end) || (step < 0.0 && i > end) {
            match self.run_iteration(name, Value::Num(i), body)? {
                Flow::Break => break,
                ret @ Flow::Return(_) => return Ok(ret),
                Flow::Normal => {},
            }
            i += step;
        }
        Ok(Flow::Normal)
    }

    // --- calls ------------------------------------------------------------

    /// Calls a function with already-evaluated argument values: native
    /// dispatch for built-ins, a fresh root frame for user functions.
    pub(super) fn call_func(&mut self,
                            name: &str,
                            decl: &Rc<FuncDecl>,
                            args: Vec<Value>)
                            -> EvalResult<Option<Value>> {
        if builtin::is_builtin(name) {
            return builtin::call(self, name, args);
        }

        self.push_func_scope();
        if let Some(param) = &decl.variadic_param {
            let param = param.borrow();
            self.define(param.name.clone(), Value::array(args));
        } else {
            for (param, value) in decl.params.iter().zip(args) {
                let param = param.borrow();
                let value = if param.typ == Type::Any { value.into_any() } else { value };
                self.define(param.name.clone(), value);
            }
        }
        let flow = self.exec_statements(&decl.body.borrow().statements);
        self.pop_func_scope();

        match flow? {
            Flow::Return(value) => Ok(value),
            _ => Ok(None),
        }
    }

    // --- environment ------------------------------------------------------

    fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    /// Opens the root frame of a function call. Frames below the floor
    /// belong to the caller and are invisible, except for the globals.
    fn push_func_scope(&mut self) {
        self.floors.push(self.scopes.len());
        self.push_scope();
    }

    fn pop_func_scope(&mut self) {
        let floor = self.floors.pop().expect("function scope underflow");
        self.scopes.truncate(floor);
    }

    fn floor(&self) -> usize {
        self.floors.last().copied().unwrap_or(0)
    }

    /// Looks a name up: innermost frame down to the current function's
    /// floor, then the global frame.
    pub(super) fn lookup(&self, name: &str) -> Value {
        let floor = self.floor();
        for scope in self.scopes[floor..].iter().rev() {
            if let Some(value) = scope.get(name) {
                return value.clone();
            }
        }
        self.scopes[0]
            .get(name)
            .cloned()
            .unwrap_or_else(|| unreachable!("variable '{name}' resolved statically"))
    }

    /// Defines a name in the innermost frame.
    pub(super) fn define(&mut self, name: String, value: Value) {
        self.scopes
            .last_mut()
            .expect("scope stack underflow")
            .insert(name, value);
    }

    /// Assigns to the nearest visible frame declaring the name.
    pub(super) fn set(&mut self, name: &str, value: Value) {
        let floor = self.floor();
        for scope in self.scopes[floor..].iter_mut().rev() {
            if let Some(slot) = scope.get_mut(name) {
                *slot = value;
                return;
            }
        }
        if let Some(slot) = self.scopes[0].get_mut(name) {
            *slot = value;
            return;
        }
        unreachable!("assignment target '{name}' resolved statically")
    }
}
