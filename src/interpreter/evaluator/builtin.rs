use std::{cell::RefCell, collections::HashMap, rc::Rc};

use crate::{ast::{Block, FuncDecl, Var, VarRef},
            error::RuntimeError,
            interpreter::{evaluator::core::{Context, EvalResult},
                          lexer::Pos,
                          types::Type,
                          value::Value}};

/// The names of all host-provided functions. Graphics names are declared so
/// programs type check, but their implementations only report themselves as
/// not yet implemented.
pub const BUILTIN_NAMES: &[&str] = &["print", "sprint", "len", "has", "del", "join", "split",
                                     "move", "line", "rect", "circle", "width", "color", "clear"];

/// Returns `true` when a function name dispatches to a native
/// implementation instead of a user-declared body.
#[must_use]
pub fn is_builtin(name: &str) -> bool {
    BUILTIN_NAMES.contains(&name)
}

/// Builds the built-in function table handed to the parser.
///
/// # Example
/// ```
/// use quill::interpreter::evaluator::builtin;
///
/// let decls = builtin::declarations();
/// assert!(decls.contains_key("print"));
/// assert!(decls["len"].return_type == quill::interpreter::types::Type::Num);
/// ```
#[must_use]
pub fn declarations() -> HashMap<String, Rc<FuncDecl>> {
    let mut decls = HashMap::new();

    insert(&mut decls, variadic("print", Type::Any, Type::None));
    insert(&mut decls, variadic("sprint", Type::Any, Type::String));
    insert(&mut decls, fixed("len", &[("a", Type::Any)], Type::Num));
    insert(&mut decls,
           fixed("has",
                 &[("m", Type::generic_map()), ("key", Type::String)],
                 Type::Bool));
    insert(&mut decls,
           fixed("del",
                 &[("m", Type::generic_map()), ("key", Type::String)],
                 Type::None));
    insert(&mut decls,
           fixed("join",
                 &[("arr", Type::generic_array()), ("sep", Type::String)],
                 Type::String));
    insert(&mut decls,
           fixed("split",
                 &[("s", Type::String), ("sep", Type::String)],
                 Type::Array(Box::new(Type::String))));

    // Graphics stubs for the browser canvas runtime.
    insert(&mut decls,
           fixed("move", &[("x", Type::Num), ("y", Type::Num)], Type::None));
    insert(&mut decls,
           fixed("line", &[("x", Type::Num), ("y", Type::Num)], Type::None));
    insert(&mut decls,
           fixed("rect", &[("w", Type::Num), ("h", Type::Num)], Type::None));
    insert(&mut decls, fixed("circle", &[("r", Type::Num)], Type::None));
    insert(&mut decls, fixed("width", &[("w", Type::Num)], Type::None));
    insert(&mut decls, fixed("color", &[("s", Type::String)], Type::None));
    insert(&mut decls, fixed("clear", &[], Type::None));

    decls
}

fn insert(decls: &mut HashMap<String, Rc<FuncDecl>>, decl: FuncDecl) {
    decls.insert(decl.name.clone(), Rc::new(decl));
}

fn param(name: &str, typ: Type) -> VarRef {
    Rc::new(RefCell::new(Var { name:    name.to_string(),
                               typ,
                               pos:     Pos { line: 0, column: 0 },
                               is_used: true, }))
}

fn fixed(name: &str, params: &[(&str, Type)], return_type: Type) -> FuncDecl {
    FuncDecl { name:           name.to_string(),
               params:         params.iter()
                                     .map(|(n, t)| param(n, t.clone()))
                                     .collect(),
               variadic_param: None,
               return_type,
               body:           RefCell::new(Block::default()),
               pos:            Pos { line: 0, column: 0 }, }
}

fn variadic(name: &str, elem: Type, return_type: Type) -> FuncDecl {
    FuncDecl { name:           name.to_string(),
               params:         Vec::new(),
               variadic_param: Some(param("a", Type::Array(Box::new(elem)))),
               return_type,
               body:           RefCell::new(Block::default()),
               pos:            Pos { line: 0, column: 0 }, }
}

/// Dispatches a built-in call with already-evaluated arguments.
///
/// Declared-but-unimplemented names report `'<name>' not yet implemented`
/// through the printer and execution continues.
pub(super) fn call(context: &mut Context,
                   name: &str,
                   args: Vec<Value>)
                   -> EvalResult<Option<Value>> {
    match name {
        "print" => {
            let mut line = join_values(&args, " ");
            line.push('\n');
            context.printer.print(&line);
            Ok(None)
        },
        "sprint" => Ok(Some(Value::Str(join_values(&args, " ")))),
        "len" => len(&args[0]).map(Some),
        "has" => {
            let (map, key) = map_and_key(&args);
            let has = map.borrow().contains_key(&key);
            Ok(Some(Value::Bool(has)))
        },
        "del" => {
            let (map, key) = map_and_key(&args);
            // A later re-insert of the key appends at the end again.
            map.borrow_mut().shift_remove(&key);
            Ok(None)
        },
        "join" => {
            let Value::Array(arr) = args[0].unwrap_any() else {
                unreachable!("'join' array argument checked statically")
            };
            let Value::Str(sep) = args[1].unwrap_any() else {
                unreachable!("'join' separator checked statically")
            };
            let elements = arr.borrow();
            Ok(Some(Value::Str(join_values(&elements[..], sep))))
        },
        "split" => {
            let Value::Str(s) = args[0].unwrap_any() else {
                unreachable!("'split' string argument checked statically")
            };
            let Value::Str(sep) = args[1].unwrap_any() else {
                unreachable!("'split' separator checked statically")
            };
            let parts: Vec<Value> = if sep.is_empty() {
                s.chars().map(|c| Value::Str(c.to_string())).collect()
            } else {
                s.split(sep.as_str())
                 .map(|p| Value::Str(p.to_string()))
                 .collect()
            };
            Ok(Some(Value::array(parts)))
        },
        _ => {
            context.printer.print(&format!("'{name}' not yet implemented\n"));
            Ok(None)
        },
    }
}

fn len(value: &Value) -> EvalResult<Value> {
    let len = match value.unwrap_any() {
        Value::Array(arr) => arr.borrow().len(),
        Value::Map(map) => map.borrow().len(),
        Value::Str(s) => s.chars().count(),
        other => {
            return Err(RuntimeError::LenType { found: other.type_name(), });
        },
    };
    Ok(Value::Num(len as f64))
}

fn join_values(values: &[Value], sep: &str) -> String {
    values.iter()
          .map(ToString::to_string)
          .collect::<Vec<_>>()
          .join(sep)
}

fn map_and_key(args: &[Value]) -> (Rc<RefCell<indexmap::IndexMap<String, Value>>>, String) {
    let Value::Map(map) = args[0].unwrap_any() else {
        unreachable!("map argument checked statically")
    };
    let Value::Str(key) = args[1].unwrap_any() else {
        unreachable!("key argument checked statically")
    };
    (map.clone(), key.clone())
}
