//! Logical opcodes: `AND`, `OR`, `NOT`, and their `*S` stack variants.
//! All operands must resolve to `Bool`.

use crate::diagnostics::RuntimeError;
use crate::program::{Instruction, Opcode};
use crate::resolver::{self, ValueKind};
use crate::value::Value;

use super::Engine;

const BOOL_MASK: [ValueKind; 1] = [ValueKind::Bool];

fn store(engine: &mut Engine, dest: crate::frame::VarRef, value: Value) -> Result<(), RuntimeError> {
    engine
        .frames
        .resolve_mut(dest.frame)?
        .get_mut(&dest.name)
        .ok_or_else(|| RuntimeError::NonexistentVariable(dest.name.clone()))?
        .set(value);
    Ok(())
}

pub(super) fn handle_binary(engine: &mut Engine, instr: &Instruction) -> Result<(), RuntimeError> {
    let (dest, sources) = resolver::resolve(&engine.frames, instr, &BOOL_MASK, true, false, false)?;
    let dest = dest.expect("AND/OR always have a destination");
    let (Value::Bool(a), Value::Bool(b)) = (
        sources[0].value().expect("take_type not set"),
        sources[1].value().expect("take_type not set"),
    ) else {
        unreachable!("mask restricts to Bool")
    };
    let result = match instr.opcode {
        Opcode::And => *a && *b,
        Opcode::Or => *a || *b,
        _ => unreachable!(),
    };
    store(engine, dest, Value::Bool(result))
}

pub(super) fn handle_binary_stack(engine: &mut Engine, opcode: Opcode) -> Result<(), RuntimeError> {
    let rhs = engine.data_stack.pop().ok_or_else(|| RuntimeError::MissingValue("data stack underflow".to_string()))?;
    let lhs = engine.data_stack.pop().ok_or_else(|| RuntimeError::MissingValue("data stack underflow".to_string()))?;
    let (Value::Bool(a), Value::Bool(b)) = (lhs, rhs) else {
        return Err(RuntimeError::InvalidType("logical stack operands must be Bool".to_string()));
    };
    let result = match opcode {
        Opcode::Ands => a && b,
        Opcode::Ors => a || b,
        _ => unreachable!(),
    };
    engine.data_stack.push(Value::Bool(result));
    Ok(())
}

pub(super) fn handle_not(engine: &mut Engine, instr: &Instruction) -> Result<(), RuntimeError> {
    let (dest, sources) = resolver::resolve(&engine.frames, instr, &BOOL_MASK, true, false, false)?;
    let dest = dest.expect("NOT always has a destination");
    let Value::Bool(a) = sources[0].value().expect("take_type not set") else {
        unreachable!("mask restricts to Bool")
    };
    store(engine, dest, Value::Bool(!a))
}

pub(super) fn handle_not_stack(engine: &mut Engine) -> Result<(), RuntimeError> {
    let top = engine.data_stack.pop().ok_or_else(|| RuntimeError::MissingValue("data stack underflow".to_string()))?;
    let Value::Bool(a) = top else {
        return Err(RuntimeError::InvalidType("NOTS operand must be Bool".to_string()));
    };
    engine.data_stack.push(Value::Bool(!a));
    Ok(())
}
