use std::{cell::RefCell, rc::Rc};

use indexmap::IndexMap;

use crate::{ast::{BinaryOp, Expression, UnaryOp},
            error::RuntimeError,
            interpreter::{evaluator::core::{Context, EvalResult},
                          types::Type,
                          value::Value}};

impl Context<'_> {
    /// Evaluates an expression to a value. Arguments and operands evaluate
    /// left to right; `and`/`or` short-circuit.
    pub(super) fn eval_expr(&mut self, expr: &Expression) -> EvalResult<Value> {
        match expr {
            Expression::NumLiteral { value } => Ok(Value::Num(*value)),
            Expression::StringLiteral { value } => Ok(Value::Str(value.clone())),
            Expression::BoolLiteral { value } => Ok(Value::Bool(*value)),
            Expression::ArrayLiteral { elements, .. } => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    values.push(self.eval_expr(element)?);
                }
                Ok(Value::array(values))
            },
            Expression::MapLiteral { pairs, .. } => {
                let mut values = IndexMap::with_capacity(pairs.len());
                for (key, value) in pairs {
                    values.insert(key.clone(), self.eval_expr(value)?);
                }
                Ok(Value::map(values))
            },
            Expression::Variable { var } => Ok(self.lookup(&var.borrow().name)),
            Expression::Unary { op, right } => match op {
                UnaryOp::Minus => Ok(Value::Num(-self.eval_num(right)?)),
                UnaryOp::Not => Ok(Value::Bool(!self.eval_bool(right)?)),
            },
            Expression::Binary { op, left, right, .. } => self.eval_binary(*op, left, right),
            Expression::Index { left, index, .. } => self.eval_index(left, index),
            Expression::Slice { left, start, end, .. } => {
                self.eval_slice(left, start.as_deref(), end.as_deref())
            },
            Expression::Dot { left, key, .. } => {
                let map = self.eval_map(left)?;
                let value = map.borrow().get(key).cloned();
                value.ok_or_else(|| RuntimeError::MissingKey { key: key.clone() })
            },
            Expression::Call { .. } => {
                let value = self.eval_call_expr(expr)?;
                Ok(value.expect("value-returning call checked statically"))
            },
        }
    }

    /// Evaluates a call expression, returning `None` for `none` functions.
    pub(super) fn eval_call_expr(&mut self, call: &Expression) -> EvalResult<Option<Value>> {
        let Expression::Call { name, decl, args } = call else {
            unreachable!("eval_call_expr takes a call expression")
        };
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.eval_expr(arg)?);
        }
        self.call_func(name, decl, values)
    }

    fn eval_binary(&mut self,
                   op: BinaryOp,
                   left: &Expression,
                   right: &Expression)
                   -> EvalResult<Value> {
        // Short-circuiting: the right operand only runs when the left does
        // not already determine the result.
        match op {
            BinaryOp::And => {
                return Ok(Value::Bool(self.eval_bool(left)? && self.eval_bool(right)?));
            },
            BinaryOp::Or => {
                return Ok(Value::Bool(self.eval_bool(left)? || self.eval_bool(right)?));
            },
            _ => {},
        }

        let lhs = self.eval_expr(left)?;
        let rhs = self.eval_expr(right)?;
        let value = match op {
            BinaryOp::Eq => Value::Bool(lhs == rhs),
            BinaryOp::NotEq => Value::Bool(lhs != rhs),
            BinaryOp::Add => match (lhs.unwrap_any(), rhs.unwrap_any()) {
                (Value::Num(a), Value::Num(b)) => Value::Num(a + b),
                (Value::Str(a), Value::Str(b)) => Value::Str(format!("{a}{b}")),
                // Concatenation allocates a fresh array; the operands keep
                // their own storage.
                (Value::Array(a), Value::Array(b)) => {
                    let mut elements = a.borrow().clone();
                    elements.extend(b.borrow().iter().cloned());
                    Value::array(elements)
                },
                _ => unreachable!("'+' operands checked statically"),
            },
            BinaryOp::Sub => Value::Num(as_num(&lhs) - as_num(&rhs)),
            BinaryOp::Mul => Value::Num(as_num(&lhs) * as_num(&rhs)),
            BinaryOp::Div => Value::Num(as_num(&lhs) / as_num(&rhs)),
            BinaryOp::Lt | BinaryOp::Gt | BinaryOp::LtEq | BinaryOp::GtEq => {
                Value::Bool(compare(op, &lhs, &rhs))
            },
            BinaryOp::And | BinaryOp::Or => unreachable!("handled above"),
        };
        Ok(value)
    }

    fn eval_index(&mut self, left: &Expression, index: &Expression) -> EvalResult<Value> {
        match self.eval_expr(left)? {
            Value::Array(arr) => {
                let i = normalize_index(self.eval_num(index)?, arr.borrow().len())?;
                let value = arr.borrow()[i].clone();
                Ok(value)
            },
            Value::Str(s) => {
                let chars: Vec<char> = s.chars().collect();
                let i = normalize_index(self.eval_num(index)?, chars.len())?;
                Ok(Value::Str(chars[i].to_string()))
            },
            Value::Map(map) => {
                let key = self.eval_str(index)?;
                let value = map.borrow().get(&key).cloned();
                value.ok_or(RuntimeError::MissingKey { key })
            },
            _ => unreachable!("indexed type checked statically"),
        }
    }

    fn eval_slice(&mut self,
                  left: &Expression,
                  start: Option<&Expression>,
                  end: Option<&Expression>)
                  -> EvalResult<Value> {
        match self.eval_expr(left)? {
            // Slicing allocates a fresh shallow copy, which is the idiom for
            // unaliasing an array.
            Value::Array(arr) => {
                let len = arr.borrow().len();
                let (from, to) = self.slice_bounds(start, end, len)?;
                let elements = arr.borrow()[from..to].to_vec();
                Ok(Value::array(elements))
            },
            Value::Str(s) => {
                let chars: Vec<char> = s.chars().collect();
                let (from, to) = self.slice_bounds(start, end, chars.len())?;
                Ok(Value::Str(chars[from..to].iter().collect()))
            },
            _ => unreachable!("sliced type checked statically"),
        }
    }

    fn slice_bounds(&mut self,
                    start: Option<&Expression>,
                    end: Option<&Expression>,
                    len: usize)
                    -> EvalResult<(usize, usize)> {
        let from = match start {
            Some(expr) => normalize_slice_bound(self.eval_num(expr)?, len)?,
            None => 0,
        };
        let to = match end {
            Some(expr) => normalize_slice_bound(self.eval_num(expr)?, len)?,
            None => len,
        };
        if from > to {
            return Err(RuntimeError::InvalidSliceRange { start: from as f64,
                                                         end:   to as f64, });
        }
        Ok((from, to))
    }

    // --- assignment targets -----------------------------------------------

    /// Writes a value through an assignment target. Variable targets copy
    /// scalars and alias composites; index, slice and dot targets mutate
    /// through the shared reference.
    pub(super) fn assign(&mut self, target: &Expression, value: Value) -> EvalResult<()> {
        match target {
            Expression::Variable { var } => {
                let var = var.borrow();
                let value = if var.typ == Type::Any { value.into_any() } else { value };
                self.set(&var.name, value);
                Ok(())
            },
            Expression::Index { left, index, .. } => match self.eval_expr(left)? {
                Value::Array(arr) => {
                    let len = arr.borrow().len();
                    let i = normalize_index(self.eval_num(index)?, len)?;
                    arr.borrow_mut()[i] = value;
                    Ok(())
                },
                Value::Map(map) => {
                    let key = self.eval_str(index)?;
                    map.borrow_mut().insert(key, value);
                    Ok(())
                },
                _ => unreachable!("assignment target checked statically"),
            },
            Expression::Dot { left, key, .. } => {
                let map = self.eval_map(left)?;
                map.borrow_mut().insert(key.clone(), value);
                Ok(())
            },
            Expression::Slice { left, start, end, .. } => {
                let Value::Array(arr) = self.eval_expr(left)? else {
                    unreachable!("string slice targets are rejected statically")
                };
                let len = arr.borrow().len();
                let (from, to) = self.slice_bounds(start.as_deref(), end.as_deref(), len)?;
                let Value::Array(src) = value.unwrap_any().clone() else {
                    unreachable!("slice assignment value checked statically")
                };
                // Snapshot first: the source may alias the target.
                let items: Vec<Value> = src.borrow().clone();
                arr.borrow_mut().splice(from..to, items);
                Ok(())
            },
            _ => unreachable!("assignability checked statically"),
        }
    }

    // --- typed accessors --------------------------------------------------

    pub(super) fn eval_num(&mut self, expr: &Expression) -> EvalResult<f64> {
        let value = self.eval_expr(expr)?;
        Ok(as_num(&value))
    }

    pub(super) fn eval_bool(&mut self, expr: &Expression) -> EvalResult<bool> {
        let value = self.eval_expr(expr)?;
        match value.unwrap_any() {
            Value::Bool(b) => Ok(*b),
            _ => unreachable!("bool expression checked statically"),
        }
    }

    pub(super) fn eval_str(&mut self, expr: &Expression) -> EvalResult<String> {
        let value = self.eval_expr(expr)?;
        match value.unwrap_any() {
            Value::Str(s) => Ok(s.clone()),
            _ => unreachable!("string expression checked statically"),
        }
    }

    fn eval_map(&mut self,
                expr: &Expression)
                -> EvalResult<Rc<RefCell<IndexMap<String, Value>>>> {
        let value = self.eval_expr(expr)?;
        match value.unwrap_any() {
            Value::Map(map) => Ok(map.clone()),
            _ => unreachable!("map expression checked statically"),
        }
    }
}

fn as_num(value: &Value) -> f64 {
    match value.unwrap_any() {
        Value::Num(n) => *n,
        _ => unreachable!("num expression checked statically"),
    }
}

fn compare(op: BinaryOp, lhs: &Value, rhs: &Value) -> bool {
    match (lhs.unwrap_any(), rhs.unwrap_any()) {
        (Value::Num(a), Value::Num(b)) => match op {
            BinaryOp::Lt => a < b,
            BinaryOp::Gt => a > b,
            BinaryOp::LtEq => a <= b,
            BinaryOp::GtEq => a >= b,
            _ => unreachable!("comparison operator"),
        },
        (Value::Str(a), Value::Str(b)) => match op {
            BinaryOp::Lt => a < b,
            BinaryOp::Gt => a > b,
            BinaryOp::LtEq => a <= b,
            BinaryOp::GtEq => a >= b,
            _ => unreachable!("comparison operator"),
        },
        _ => unreachable!("comparison operands checked statically"),
    }
}

/// Normalizes an index against a length: whole numbers only, negatives
/// count from the end, and the valid range is `[-len, len-1]`.
fn normalize_index(index: f64, len: usize) -> EvalResult<usize> {
    if index.fract() != 0.0 {
        return Err(RuntimeError::NonIntegerIndex { index });
    }
    let mut i = index as i64;
    if i < 0 {
        i += len as i64;
    }
    if i < 0 || i >= len as i64 {
        return Err(RuntimeError::IndexOutOfBounds { index, len });
    }
    Ok(i as usize)
}

/// Normalizes a slice bound: whole numbers only, negatives count from the
/// end, and the valid range is `[0, len]` after normalization.
fn normalize_slice_bound(bound: f64, len: usize) -> EvalResult<usize> {
    if bound.fract() != 0.0 {
        return Err(RuntimeError::NonIntegerIndex { index: bound });
    }
    let mut b = bound as i64;
    if b < 0 {
        b += len as i64;
    }
    if b < 0 || b > len as i64 {
        return Err(RuntimeError::SliceOutOfBounds { index: bound,
                                                    len });
    }
    Ok(b as usize)
}
