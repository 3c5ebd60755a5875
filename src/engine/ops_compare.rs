//! Comparison opcodes: `LT`/`GT`, `EQ`, and their `*S` stack variants.
//! Ordering covers four variants (`Int`, `Float`, `Bool`, `String`);
//! equality is the `Nil`-aware law shared with
//! [`super::ops_control::values_equal`].

use crate::diagnostics::RuntimeError;
use crate::program::{Instruction, Opcode};
use crate::resolver::{self, ValueKind, ALL_KINDS};
use crate::value::Value;

use super::ops_control::values_equal;
use super::Engine;

const ORDER_MASK: [ValueKind; 4] = [ValueKind::Int, ValueKind::Float, ValueKind::Bool, ValueKind::String];

fn less_than(a: &Value, b: &Value) -> Result<bool, RuntimeError> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Ok(x < y),
        (Value::Float(x), Value::Float(y)) => Ok(x < y),
        (Value::Bool(x), Value::Bool(y)) => Ok(!x & y),
        (Value::String(x), Value::String(y)) => Ok(x < y),
        _ => Err(RuntimeError::InvalidType("operands are not orderable".to_string())),
    }
}

fn store(engine: &mut Engine, dest: crate::frame::VarRef, value: Value) -> Result<(), RuntimeError> {
    engine
        .frames
        .resolve_mut(dest.frame)?
        .get_mut(&dest.name)
        .ok_or_else(|| RuntimeError::NonexistentVariable(dest.name.clone()))?
        .set(value);
    Ok(())
}

pub(super) fn handle_order(engine: &mut Engine, instr: &Instruction) -> Result<(), RuntimeError> {
    let (dest, sources) = resolver::resolve(&engine.frames, instr, &ORDER_MASK, true, false, false)?;
    let dest = dest.expect("LT/GT always have a destination");
    let a = sources[0].value().expect("take_type not set");
    let b = sources[1].value().expect("take_type not set");
    let result = match instr.opcode {
        Opcode::Lt => less_than(a, b)?,
        Opcode::Gt => less_than(b, a)?,
        _ => unreachable!(),
    };
    store(engine, dest, Value::Bool(result))
}

pub(super) fn handle_order_stack(engine: &mut Engine, opcode: Opcode) -> Result<(), RuntimeError> {
    let rhs = engine.data_stack.pop().ok_or_else(|| RuntimeError::MissingValue("data stack underflow".to_string()))?;
    let lhs = engine.data_stack.pop().ok_or_else(|| RuntimeError::MissingValue("data stack underflow".to_string()))?;
    let result = match opcode {
        Opcode::Lts => less_than(&lhs, &rhs)?,
        Opcode::Gts => less_than(&rhs, &lhs)?,
        _ => unreachable!(),
    };
    engine.data_stack.push(Value::Bool(result));
    Ok(())
}

pub(super) fn handle_eq(engine: &mut Engine, instr: &Instruction) -> Result<(), RuntimeError> {
    let (dest, sources) = resolver::resolve(&engine.frames, instr, &ALL_KINDS, true, false, false)?;
    let dest = dest.expect("EQ always has a destination");
    let a = sources[0].value().expect("take_type not set");
    let b = sources[1].value().expect("take_type not set");
    let equal = values_equal(a, b)?;
    store(engine, dest, Value::Bool(equal))
}

pub(super) fn handle_eq_stack(engine: &mut Engine) -> Result<(), RuntimeError> {
    let rhs = engine.data_stack.pop().ok_or_else(|| RuntimeError::MissingValue("data stack underflow".to_string()))?;
    let lhs = engine.data_stack.pop().ok_or_else(|| RuntimeError::MissingValue("data stack underflow".to_string()))?;
    let equal = values_equal(&lhs, &rhs)?;
    engine.data_stack.push(Value::Bool(equal));
    Ok(())
}
