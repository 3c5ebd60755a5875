//! # Operand Resolver
//!
//! The single component that performs all type-mask checking, so that
//! every opcode handler in [`crate::engine`] becomes a thin expression on
//! already-validated [`Value`]s. Centralizing resolution in one place
//! matters because IPPcode23 operands can be either a variable reference
//! or a literal, and the resolver is where that distinction disappears.

use crate::diagnostics::RuntimeError;
use crate::frame::{FrameId, FrameSet, VarRef};
use crate::program::{Instruction, Operand, OperandKind};
use crate::value::{self, Value};

/// A variant tag used in a mask, mirroring [`Value`]'s variants one-to-one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueKind {
    Int,
    String,
    Bool,
    Nil,
    Float,
    Type,
}

impl ValueKind {
    fn of(value: &Value) -> ValueKind {
        match value {
            Value::Int(_) => ValueKind::Int,
            Value::String(_) => ValueKind::String,
            Value::Bool(_) => ValueKind::Bool,
            Value::Nil => ValueKind::Nil,
            Value::Float(_) => ValueKind::Float,
            Value::TypeToken(_) => ValueKind::Type,
        }
    }
}

/// Every variant — the mask to use where an opcode genuinely accepts any
/// type (`EQ`, `MOVE`, `PUSHS`, ...).
pub const ALL_KINDS: [ValueKind; 6] = [
    ValueKind::Int,
    ValueKind::String,
    ValueKind::Bool,
    ValueKind::Nil,
    ValueKind::Float,
    ValueKind::Type,
];

/// A resolved source operand: either a concrete value, or — only reachable
/// when `take_type` is set — the fact that the referenced slot is
/// uninitialized.
#[derive(Clone, Debug)]
pub enum Source {
    Value(Value),
    Uninitialized,
}

impl Source {
    pub fn value(&self) -> Option<&Value> {
        match self {
            Source::Value(v) => Some(v),
            Source::Uninitialized => None,
        }
    }
}

/// Parse a `<frame>@<name>` variable reference.
pub fn parse_var_ref(text: &str) -> Option<VarRef> {
    let (frame_str, name) = text.split_once('@')?;
    let frame = FrameId::parse(frame_str)?;
    Some(VarRef {
        frame,
        name: name.to_string(),
    })
}

fn resolve_literal(operand: &Operand) -> Result<Value, RuntimeError> {
    match operand.kind {
        OperandKind::Nil => Ok(Value::Nil),
        OperandKind::Int => value::parse_int(&operand.text)
            .map(Value::Int)
            .ok_or_else(|| RuntimeError::InvalidStructure(format!("invalid int literal '{}'", operand.text))),
        OperandKind::Bool => Ok(Value::Bool(value::parse_bool(&operand.text))),
        OperandKind::String => Ok(Value::String(value::parse_string(&operand.text))),
        OperandKind::Float => value::parse_float(&operand.text)
            .map(Value::Float)
            .ok_or_else(|| RuntimeError::InvalidStructure(format!("invalid float literal '{}'", operand.text))),
        OperandKind::Type => crate::value::TypeTag::parse(&operand.text)
            .map(Value::TypeToken)
            .ok_or_else(|| RuntimeError::InvalidStructure(format!("invalid type literal '{}'", operand.text))),
        OperandKind::Var | OperandKind::Label => {
            Err(RuntimeError::InvalidType("expected a literal operand".to_string()))
        }
    }
}

fn kind_allowed(mask: &[ValueKind], kind: ValueKind) -> bool {
    mask.contains(&kind)
}

/// Resolve operand 0 as a destination variable reference only (no value
/// read). Used directly by opcodes like `DEFVAR` and by multi-mask opcodes
/// that resolve each source operand individually via [`resolve_one`].
pub fn resolve_dest(frames: &FrameSet, operand: &Operand) -> Result<VarRef, RuntimeError> {
    if operand.kind != OperandKind::Var {
        return Err(RuntimeError::InvalidType("destination operand must be a variable".to_string()));
    }
    let var_ref = parse_var_ref(&operand.text)
        .ok_or_else(|| RuntimeError::InvalidType(format!("malformed variable reference '{}'", operand.text)))?;
    frames.resolve(var_ref.frame)?;
    Ok(var_ref)
}

/// Resolve a single source operand (a literal or a variable reference)
/// against `mask`. Exposed for opcodes whose operands take different masks
/// per position (e.g. `STRI2INT`'s string and index operands), where the
/// uniform-mask [`resolve`] entry point doesn't fit.
pub fn resolve_one(
    frames: &FrameSet,
    operand: &Operand,
    mask: &[ValueKind],
    take_type: bool,
) -> Result<Source, RuntimeError> {
    resolve_source(frames, operand, mask, take_type)
}

/// Resolve one source operand (a literal or a variable reference) against
/// `mask`, optionally allowing an uninitialized variable through under
/// `take_type`.
fn resolve_source(
    frames: &FrameSet,
    operand: &Operand,
    mask: &[ValueKind],
    take_type: bool,
) -> Result<Source, RuntimeError> {
    if operand.kind == OperandKind::Var {
        let var_ref = parse_var_ref(&operand.text)
            .ok_or_else(|| RuntimeError::InvalidType(format!("malformed variable reference '{}'", operand.text)))?;
        let frame = frames.resolve(var_ref.frame)?;
        let slot = frame
            .get(&var_ref.name)
            .ok_or_else(|| RuntimeError::NonexistentVariable(var_ref.name.clone()))?;
        match slot.get() {
            Some(value) => {
                if !kind_allowed(mask, ValueKind::of(value)) {
                    return Err(RuntimeError::InvalidType(format!(
                        "variable '{}' has unexpected type",
                        var_ref.name
                    )));
                }
                Ok(Source::Value(value.clone()))
            }
            None => {
                if take_type {
                    Ok(Source::Uninitialized)
                } else {
                    Err(RuntimeError::MissingValue(format!(
                        "variable '{}' is uninitialized",
                        var_ref.name
                    )))
                }
            }
        }
    } else {
        let value = resolve_literal(operand)?;
        if !kind_allowed(mask, ValueKind::of(&value)) {
            return Err(RuntimeError::InvalidType("literal operand has unexpected type".to_string()));
        }
        Ok(Source::Value(value))
    }
}

/// Resolve `instr`'s operands under a single type mask.
///
/// - `dest`: operand 0 is a destination (`var`-kind required); returns its
///   [`VarRef`] separately from the source list.
/// - `first`: when `dest` is set, operand 0 is *also* resolved as the first
///   source (used by opcodes like `SETCHAR` where the destination is read
///   before being overwritten).
/// - `take_type`: uninitialized variable sources resolve to
///   [`Source::Uninitialized`] instead of raising *missing-value*.
pub fn resolve(
    frames: &FrameSet,
    instr: &Instruction,
    mask: &[ValueKind],
    dest: bool,
    first: bool,
    take_type: bool,
) -> Result<(Option<VarRef>, Vec<Source>), RuntimeError> {
    let dest_ref = if dest {
        let operand0 = &instr.operands[0];
        if operand0.kind != OperandKind::Var {
            return Err(RuntimeError::InvalidType("destination operand must be a variable".to_string()));
        }
        let var_ref = parse_var_ref(&operand0.text)
            .ok_or_else(|| RuntimeError::InvalidType(format!("malformed variable reference '{}'", operand0.text)))?;
        frames.resolve(var_ref.frame)?;
        Some(var_ref)
    } else {
        None
    };

    let start = if dest && !first { 1 } else { 0 };
    let mut sources = Vec::with_capacity(instr.operands.len().saturating_sub(start));
    for operand in &instr.operands[start..] {
        sources.push(resolve_source(frames, operand, mask, take_type)?);
    }

    Ok((dest_ref, sources))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::{Opcode};

    fn instr(opcode: Opcode, operands: Vec<Operand>) -> Instruction {
        Instruction {
            opcode,
            operands,
            order: 1,
            index: 0,
        }
    }

    fn var_operand(text: &str) -> Operand {
        Operand {
            kind: OperandKind::Var,
            text: text.to_string(),
        }
    }

    fn lit_operand(kind: OperandKind, text: &str) -> Operand {
        Operand {
            kind,
            text: text.to_string(),
        }
    }

    #[test]
    fn resolves_literal_source_under_mask() {
        let frames = FrameSet::new();
        let i = instr(Opcode::Write, vec![lit_operand(OperandKind::Int, "5")]);
        let (dest, sources) = resolve(&frames, &i, &[ValueKind::Int], false, false, false).unwrap();
        assert!(dest.is_none());
        assert!(matches!(sources[0], Source::Value(Value::Int(5))));
    }

    #[test]
    fn literal_outside_mask_is_invalid_type() {
        let frames = FrameSet::new();
        let i = instr(Opcode::Write, vec![lit_operand(OperandKind::Int, "5")]);
        let result = resolve(&frames, &i, &[ValueKind::String], false, false, false);
        assert!(matches!(result, Err(RuntimeError::InvalidType(_))));
    }

    #[test]
    fn uninitialized_variable_without_take_type_is_missing_value() {
        let mut frames = FrameSet::new();
        frames
            .resolve_mut(FrameId::Global)
            .unwrap()
            .declare("x")
            .unwrap();
        let i = instr(Opcode::Write, vec![var_operand("GF@x")]);
        let result = resolve(&frames, &i, &[ValueKind::Int], false, false, false);
        assert!(matches!(result, Err(RuntimeError::MissingValue(_))));
    }

    #[test]
    fn uninitialized_variable_with_take_type_resolves_to_uninitialized() {
        let mut frames = FrameSet::new();
        frames
            .resolve_mut(FrameId::Global)
            .unwrap()
            .declare("x")
            .unwrap();
        let i = instr(Opcode::Type, vec![var_operand("GF@y"), var_operand("GF@x")]);
        let (dest, sources) = resolve(&frames, &i, &[ValueKind::Int, ValueKind::String, ValueKind::Bool, ValueKind::Float, ValueKind::Nil, ValueKind::Type], true, false, true).unwrap();
        assert!(dest.is_some());
        assert!(matches!(sources[0], Source::Uninitialized));
    }

    #[test]
    fn dest_must_be_var() {
        let frames = FrameSet::new();
        let i = instr(Opcode::Move, vec![lit_operand(OperandKind::Int, "1"), lit_operand(OperandKind::Int, "2")]);
        let result = resolve(&frames, &i, &[ValueKind::Int], true, false, false);
        assert!(matches!(result, Err(RuntimeError::InvalidType(_))));
    }
}
