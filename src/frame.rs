//! # Frames and Variable Slots
//!
//! A [`Frame`] is a named mapping from identifier to [`Slot`]; a `Slot` is
//! created uninitialized and holds a [`Value`] once assigned. A bare
//! `HashMap<String, Value>` can't distinguish "never declared" from
//! "declared but not yet assigned", and `DEFVAR` needs that distinction to
//! be observable, so each name maps to a `Slot` that starts empty and is
//! filled in place.
//!
//! [`FrameId`] names the three frame roles (`GF`/`LF`/`TF`); [`FrameSet`] is
//! the engine-owned collection of all three plus the frame stack, exposing
//! exactly the operations the frame/variable opcodes need.

use std::collections::HashMap;

use crate::diagnostics::RuntimeError;
use crate::value::Value;

/// A variable's storage cell: either never assigned, or holding a concrete
/// [`Value`]. Assignment replaces the whole state atomically.
#[derive(Clone, Debug, Default)]
pub struct Slot(Option<Value>);

impl Slot {
    /// A freshly declared, uninitialized slot.
    pub fn new() -> Self {
        Slot(None)
    }

    pub fn is_initialized(&self) -> bool {
        self.0.is_some()
    }

    pub fn get(&self) -> Option<&Value> {
        self.0.as_ref()
    }

    pub fn set(&mut self, value: Value) {
        self.0 = Some(value);
    }
}

/// A named set of variable slots. Order is irrelevant; keys are unique.
#[derive(Clone, Debug, Default)]
pub struct Frame {
    slots: HashMap<String, Slot>,
}

impl Frame {
    pub fn new() -> Self {
        Frame { slots: HashMap::new() }
    }

    /// Declare `name` as an uninitialized slot. Redeclaring an existing
    /// name is a semantic error.
    pub fn declare(&mut self, name: &str) -> Result<(), RuntimeError> {
        if self.slots.contains_key(name) {
            return Err(RuntimeError::SemanticError(format!(
                "variable '{}' already defined in this frame",
                name
            )));
        }
        self.slots.insert(name.to_string(), Slot::new());
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Slot> {
        self.slots.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Slot> {
        self.slots.get_mut(name)
    }

    /// Iterate slots as `(name, slot)` pairs, for `BREAK`'s debug dump.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Slot)> {
        self.slots.iter()
    }
}

/// Which of the three frame roles a `<frame>@<name>` reference names.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameId {
    Global,
    Local,
    Temporary,
}

impl FrameId {
    /// Parse the `GF`/`LF`/`TF` prefix of a variable reference.
    pub fn parse(s: &str) -> Option<FrameId> {
        match s {
            "GF" => Some(FrameId::Global),
            "LF" => Some(FrameId::Local),
            "TF" => Some(FrameId::Temporary),
            _ => None,
        }
    }
}

/// A fully resolved reference to a variable slot: which frame, and which
/// name within it. Opcodes look the slot up through [`FrameSet`] each time
/// they need it rather than holding a borrow across the access, since the
/// destination frame and a source frame may be the same `HashMap`.
#[derive(Clone, Debug)]
pub struct VarRef {
    pub frame: FrameId,
    pub name: String,
}

/// Owns the global frame, the at-most-one temporary frame, and the frame
/// stack (whose top is the local frame). Groups all frame-related engine
/// state into one struct for the three named roles.
#[derive(Default)]
pub struct FrameSet {
    global: Frame,
    temporary: Option<Frame>,
    stack: Vec<Frame>,
}

impl FrameSet {
    pub fn new() -> Self {
        FrameSet {
            global: Frame::new(),
            temporary: None,
            stack: Vec::new(),
        }
    }

    /// Resolve a frame role to the live [`Frame`] it currently names.
    /// `LF` with an empty frame stack, or `TF` with no temporary frame, is
    /// `frame-not-found`.
    pub fn resolve(&self, id: FrameId) -> Result<&Frame, RuntimeError> {
        match id {
            FrameId::Global => Ok(&self.global),
            FrameId::Local => self
                .stack
                .last()
                .ok_or_else(|| RuntimeError::FrameNotFound("no local frame on the frame stack".to_string())),
            FrameId::Temporary => self
                .temporary
                .as_ref()
                .ok_or_else(|| RuntimeError::FrameNotFound("no temporary frame defined".to_string())),
        }
    }

    pub fn resolve_mut(&mut self, id: FrameId) -> Result<&mut Frame, RuntimeError> {
        match id {
            FrameId::Global => Ok(&mut self.global),
            FrameId::Local => self
                .stack
                .last_mut()
                .ok_or_else(|| RuntimeError::FrameNotFound("no local frame on the frame stack".to_string())),
            FrameId::Temporary => self
                .temporary
                .as_mut()
                .ok_or_else(|| RuntimeError::FrameNotFound("no temporary frame defined".to_string())),
        }
    }

    /// `CREATEFRAME`: replace the temporary frame with a fresh empty one.
    pub fn create_frame(&mut self) {
        self.temporary = Some(Frame::new());
    }

    /// `PUSHFRAME`: move the temporary frame onto the frame stack.
    pub fn push_frame(&mut self) -> Result<(), RuntimeError> {
        let frame = self
            .temporary
            .take()
            .ok_or_else(|| RuntimeError::FrameNotFound("no temporary frame to push".to_string()))?;
        self.stack.push(frame);
        Ok(())
    }

    /// `POPFRAME`: move the top of the frame stack into the temporary frame.
    pub fn pop_frame(&mut self) -> Result<(), RuntimeError> {
        let frame = self
            .stack
            .pop()
            .ok_or_else(|| RuntimeError::FrameNotFound("frame stack is empty".to_string()))?;
        self.temporary = Some(frame);
        Ok(())
    }

    pub fn global(&self) -> &Frame {
        &self.global
    }

    pub fn local(&self) -> Option<&Frame> {
        self.stack.last()
    }

    pub fn temporary(&self) -> Option<&Frame> {
        self.temporary.as_ref()
    }
}
