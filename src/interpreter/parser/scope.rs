use indexmap::IndexMap;

use crate::{ast::VarRef, error::ParseError};

/// The lexical scope stack used during parsing.
///
/// Each frame maps names to shared [`VarRef`] records; lookup walks from the
/// innermost frame outward. Declarations always insert into the innermost
/// frame, so shadowing across frames is legal while redeclaration within one
/// frame is not. Frames keep insertion order so that use-liveness
/// diagnostics come out in source order.
#[derive(Debug)]
pub struct ScopeStack {
    frames: Vec<IndexMap<String, VarRef>>,
}

impl ScopeStack {
    /// Creates a stack holding only the global frame.
    #[must_use]
    pub fn new() -> Self {
        Self { frames: vec![IndexMap::new()], }
    }

    /// Opens a new innermost frame.
    pub fn push(&mut self) {
        self.frames.push(IndexMap::new());
    }

    /// Closes the innermost frame, reporting every variable in it that was
    /// never read. The diagnostic points at the original declaration.
    pub fn pop(&mut self, errors: &mut Vec<ParseError>) {
        let frame = self.frames.pop().expect("scope stack underflow");
        for (name, var) in frame {
            if !var.borrow().is_used {
                errors.push(ParseError::UnusedVariable { name,
                                                        pos: var.borrow().pos, });
            }
        }
    }

    /// Inserts a variable into the innermost frame. The caller is expected
    /// to have checked for redeclaration first.
    pub fn declare(&mut self, var: VarRef) {
        let name = var.borrow().name.clone();
        self.frames
            .last_mut()
            .expect("scope stack underflow")
            .insert(name, var);
    }

    /// Returns `true` if the innermost frame already declares `name`.
    #[must_use]
    pub fn declared_in_innermost(&self, name: &str) -> bool {
        self.frames
            .last()
            .is_some_and(|frame| frame.contains_key(name))
    }

    /// Looks up a name, walking from the innermost frame outward.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<VarRef> {
        for frame in self.frames.iter().rev() {
            if let Some(var) = frame.get(name) {
                return Some(var.clone());
            }
        }
        None
    }
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}
