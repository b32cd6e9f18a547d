use std::{cell::RefCell, collections::HashMap, fmt, rc::Rc};

use indexmap::IndexMap;

use crate::interpreter::{lexer::Pos, types::Type};

/// A declared variable.
///
/// The same record is shared by identity between the declaration and every
/// use site: the parser hands out [`VarRef`] clones, so marking a variable
/// used at one site is visible from its declaration. This sharing is what
/// the use-liveness check relies on.
#[derive(Debug)]
pub struct Var {
    /// The variable name.
    pub name:    String,
    /// The declared or inferred type.
    pub typ:     Type,
    /// Where the variable was declared, for diagnostics.
    pub pos:     Pos,
    /// Whether the variable has been read anywhere in its scope.
    pub is_used: bool,
}

/// Shared handle to a [`Var`] record.
pub type VarRef = Rc<RefCell<Var>>;

/// A unary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Arithmetic negation `-`.
    Minus,
    /// Logical not `!`.
    Not,
}

/// A binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `+` on num, string or array.
    Add,
    /// `-` on num.
    Sub,
    /// `*` on num.
    Mul,
    /// `/` on num.
    Div,
    /// `==` on equal types.
    Eq,
    /// `!=` on equal types.
    NotEq,
    /// `<` on num or string.
    Lt,
    /// `>` on num or string.
    Gt,
    /// `<=` on num or string.
    LtEq,
    /// `>=` on num or string.
    GtEq,
    /// `and` on bool, short-circuiting.
    And,
    /// `or` on bool, short-circuiting.
    Or,
}

impl BinaryOp {
    /// Returns `true` for the comparison operators, whose result type is
    /// always `bool`.
    #[must_use]
    pub const fn is_comparison(self) -> bool {
        matches!(self,
                 Self::Eq | Self::NotEq | Self::Lt | Self::Gt | Self::LtEq | Self::GtEq)
    }
}

/// An expression node of the typed AST.
///
/// Every expression carries its resolved [`Type`], either directly or
/// through the nodes it references; the evaluator never re-derives types at
/// runtime.
#[derive(Debug)]
pub enum Expression {
    /// A number literal.
    NumLiteral {
        /// The literal value.
        value: f64,
    },
    /// A string literal.
    StringLiteral {
        /// The literal text without quotes.
        value: String,
    },
    /// A `true` or `false` literal.
    BoolLiteral {
        /// The literal value.
        value: bool,
    },
    /// An array literal `[e1 e2 ...]`.
    ArrayLiteral {
        /// The element expressions in order.
        elements: Vec<Expression>,
        /// The combined array type; `[]` keeps the generic sentinel.
        typ:      Type,
    },
    /// A map literal `{k1:v1 k2:v2 ...}` preserving insertion order.
    MapLiteral {
        /// The key-value pairs in source order.
        pairs: IndexMap<String, Expression>,
        /// The combined map type; `{}` keeps the generic sentinel.
        typ:   Type,
    },
    /// A read of a declared variable. Holds the shared [`Var`] record.
    Variable {
        /// The shared variable record.
        var: VarRef,
    },
    /// A unary operation `-x` or `!x`.
    Unary {
        /// The operator.
        op:    UnaryOp,
        /// The operand.
        right: Box<Expression>,
    },
    /// A binary operation.
    Binary {
        /// The operator.
        op:    BinaryOp,
        /// The result type: `bool` for comparisons, the left type otherwise.
        typ:   Type,
        /// Left operand.
        left:  Box<Expression>,
        /// Right operand.
        right: Box<Expression>,
    },
    /// An index expression `x[i]`.
    Index {
        /// The indexed expression.
        left:  Box<Expression>,
        /// The index expression.
        index: Box<Expression>,
        /// The element type.
        typ:   Type,
    },
    /// A slice expression `x[a:b]`, either bound optional.
    Slice {
        /// The sliced expression.
        left:  Box<Expression>,
        /// The inclusive start bound.
        start: Option<Box<Expression>>,
        /// The exclusive end bound.
        end:   Option<Box<Expression>>,
        /// The result type, same as the left type.
        typ:   Type,
    },
    /// A field access `m.key` on a map.
    Dot {
        /// The map expression.
        left: Box<Expression>,
        /// The key identifier.
        key:  String,
        /// The value type of the map.
        typ:  Type,
    },
    /// A function call, either `name arg arg` or `(name arg arg)`.
    Call {
        /// The called function's name.
        name: String,
        /// The shared declaration, used for arity and type information.
        decl: Rc<FuncDecl>,
        /// The evaluated arguments in order.
        args: Vec<Expression>,
    },
}

impl Expression {
    /// Returns the resolved static type of this expression.
    #[must_use]
    pub fn typ(&self) -> Type {
        match self {
            Self::NumLiteral { .. } => Type::Num,
            Self::StringLiteral { .. } => Type::String,
            Self::BoolLiteral { .. } => Type::Bool,
            Self::ArrayLiteral { typ, .. }
            | Self::MapLiteral { typ, .. }
            | Self::Binary { typ, .. }
            | Self::Index { typ, .. }
            | Self::Slice { typ, .. }
            | Self::Dot { typ, .. } => typ.clone(),
            Self::Variable { var } => var.borrow().typ.clone(),
            Self::Unary { op, .. } => match op {
                UnaryOp::Minus => Type::Num,
                UnaryOp::Not => Type::Bool,
            },
            Self::Call { decl, .. } => decl.return_type.clone(),
        }
    }
}

/// A function declaration: user-defined `func` or built-in.
///
/// Signatures are collected in a pre-pass so calls may appear before the
/// declaration; the body is filled in by the main parsing pass, hence the
/// interior mutability.
#[derive(Debug)]
pub struct FuncDecl {
    /// The function name.
    pub name:           String,
    /// The fixed parameters in order. Empty for variadic functions.
    pub params:         Vec<VarRef>,
    /// The variadic parameter, typed as an array of the element type.
    pub variadic_param: Option<VarRef>,
    /// The declared return type; `none` when the function returns nothing.
    pub return_type:    Type,
    /// The statically checked body. Empty for built-ins.
    pub body:           RefCell<Block>,
    /// Where the declaration starts.
    pub pos:            Pos,
}

/// An event handler declaration `on name ... end`.
///
/// Handlers are parsed and checked like `none`-returning function bodies.
/// The command line runtime never fires them; embedding hosts may.
#[derive(Debug)]
pub struct EventHandler {
    /// The event name, e.g. `mousedown`.
    pub name: String,
    /// The handler body.
    pub body: Block,
}

/// A sequence of statements forming one lexical block.
#[derive(Debug, Default)]
pub struct Block {
    /// The statements in source order.
    pub statements: Vec<Statement>,
}

impl Block {
    /// Returns `true` when control cannot fall through this block: some
    /// contained statement exits unconditionally.
    #[must_use]
    pub fn exits(&self) -> bool {
        self.statements.iter().any(Statement::exits)
    }
}

/// One branch of an `if` statement: a condition and its block.
#[derive(Debug)]
pub struct IfBranch {
    /// The branch condition, always of type `bool`.
    pub cond:  Expression,
    /// The statements executed when the condition holds.
    pub block: Block,
}

/// A statement node of the typed AST.
#[derive(Debug)]
pub enum Statement {
    /// A declaration `x := e` or `x:T` (no initializer).
    Declaration {
        /// The declared variable, shared with all uses.
        var:   VarRef,
        /// The initializer, absent for typed zero-value declarations.
        value: Option<Expression>,
    },
    /// An assignment to a variable, index, slice or dot target.
    Assignment {
        /// The target; a `Variable`, `Index`, `Slice` or `Dot` expression.
        target: Expression,
        /// The assigned value.
        value:  Expression,
    },
    /// A statement-level function call such as `print a b`.
    Call {
        /// The call expression; always [`Expression::Call`].
        call: Expression,
    },
    /// An `if ... else if ... else ... end` statement.
    If {
        /// The `if` and `else if` branches in order.
        branches:   Vec<IfBranch>,
        /// The trailing `else` block, if present.
        else_block: Option<Block>,
    },
    /// A `while cond ... end` loop.
    While {
        /// The loop condition, re-evaluated every iteration.
        cond: Expression,
        /// The loop body.
        body: Block,
    },
    /// A `for x := range ... end` loop.
    For {
        /// The loop variable, freshly bound on each iteration.
        var:  VarRef,
        /// The range arguments: 1-3 nums, or one string, array or map.
        args: Vec<Expression>,
        /// The loop body.
        body: Block,
    },
    /// A `return` statement, with optional value.
    Return {
        /// The returned value, if any.
        value: Option<Expression>,
    },
    /// A `break` statement inside a loop.
    Break,
    /// A function declaration in statement position.
    Func {
        /// The shared declaration, also registered in [`Program::funcs`].
        decl: Rc<FuncDecl>,
    },
    /// An event handler declaration in statement position.
    Event {
        /// The parsed handler.
        handler: EventHandler,
    },
}

impl Statement {
    /// Returns `true` when control cannot fall through this statement.
    ///
    /// `return` and `break` always exit; an `if` exits when it has an `else`
    /// arm and every branch exits. Loops never propagate exits because they
    /// may run zero times.
    #[must_use]
    pub fn exits(&self) -> bool {
        match self {
            Self::Return { .. } | Self::Break => true,
            Self::If { branches,
                       else_block: Some(else_block), } => {
                branches.iter().all(|b| b.block.exits()) && else_block.exits()
            },
            _ => false,
        }
    }
}

/// A fully parsed program: the statement list plus the function table.
///
/// The function table contains the host built-ins and every user-declared
/// function, keyed by name.
#[derive(Debug, Default)]
pub struct Program {
    /// Top-level statements in source order.
    pub statements: Vec<Statement>,
    /// All known functions, built-in and user-declared.
    pub funcs:      HashMap<String, Rc<FuncDecl>>,
}

// Formats an f64 the way the language prints numbers: integers without a
// decimal point, fractionals with the shortest round-tripping digits.
pub(crate) fn format_num(value: f64) -> String {
    format!("{value}")
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Minus => write!(f, "-"),
            Self::Not => write!(f, "!"),
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::LtEq => "<=",
            Self::GtEq => ">=",
            Self::And => "and",
            Self::Or => "or",
        };
        write!(f, "{op}")
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NumLiteral { value } => write!(f, "{}", format_num(*value)),
            Self::StringLiteral { value } => write!(f, "'{value}'"),
            Self::BoolLiteral { value } => write!(f, "{value}"),
            Self::ArrayLiteral { elements, .. } => {
                write!(f, "[")?;
                for (i, e) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{e}")?;
                }
                write!(f, "]")
            },
            Self::MapLiteral { pairs, .. } => {
                write!(f, "{{")?;
                for (i, (key, value)) in pairs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}:{value}")?;
                }
                write!(f, "}}")
            },
            Self::Variable { var } => write!(f, "{}", var.borrow().name),
            Self::Unary { op, right } => write!(f, "({op}{right})"),
            Self::Binary { op, left, right, .. } => write!(f, "({left}{op}{right})"),
            Self::Index { left, index, .. } => write!(f, "{left}[{index}]"),
            Self::Slice { left, start, end, .. } => {
                write!(f, "{left}[")?;
                if let Some(start) = start {
                    write!(f, "{start}")?;
                }
                write!(f, ":")?;
                if let Some(end) = end {
                    write!(f, "{end}")?;
                }
                write!(f, "]")
            },
            Self::Dot { left, key, .. } => write!(f, "{left}.{key}"),
            Self::Call { name, args, .. } => {
                write!(f, "{name}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            },
        }
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for statement in &self.statements {
            writeln!(f, "{statement}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Declaration { var, value } => {
                let var = var.borrow();
                match value {
                    Some(value) => write!(f, "{}={value}", var.name),
                    None => write!(f, "{}={}", var.name, var.typ.zero_string()),
                }
            },
            Self::Assignment { target, value } => write!(f, "{target}={value}"),
            Self::Call { call } => write!(f, "{call}"),
            Self::If { branches, else_block } => {
                for (i, branch) in branches.iter().enumerate() {
                    if i > 0 {
                        write!(f, " else ")?;
                    }
                    write!(f, "if ({}) {{\n{}}}", branch.cond, branch.block)?;
                }
                if let Some(else_block) = else_block {
                    write!(f, " else {{\n{else_block}}}")?;
                }
                Ok(())
            },
            Self::While { cond, body } => write!(f, "while ({cond}) {{\n{body}}}"),
            Self::For { var, args, body } => {
                write!(f, "for {}=range(", var.borrow().name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ") {{\n{body}}}")
            },
            Self::Return { value } => match value {
                Some(value) => write!(f, "return {value}"),
                None => write!(f, "return"),
            },
            Self::Break => write!(f, "break"),
            Self::Func { decl } => {
                write!(f, "func {}", decl.name)?;
                if decl.return_type != Type::None {
                    write!(f, ":{}", decl.return_type)?;
                }
                for param in &decl.params {
                    let param = param.borrow();
                    write!(f, " {}:{}", param.name, param.typ)?;
                }
                if let Some(param) = &decl.variadic_param {
                    let param = param.borrow();
                    let elem = param.typ.sub().cloned().unwrap_or(Type::Any);
                    write!(f, " {}:{elem}...", param.name)?;
                }
                write!(f, " {{\n{}}}", decl.body.borrow())
            },
            Self::Event { handler } => {
                write!(f, "on {} {{\n{}}}", handler.name, handler.body)
            },
        }
    }
}

impl fmt::Display for Program {
    /// Renders the textual AST form used by the `parse` subcommand: one
    /// statement per line, and a single newline for an empty program.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.statements.is_empty() {
            return writeln!(f);
        }
        for statement in &self.statements {
            writeln!(f, "{statement}")?;
        }
        Ok(())
    }
}
