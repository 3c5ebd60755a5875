//! Arithmetic opcodes: `ADD`/`SUB`/`MUL`, `IDIV`, `DIV`, and their `*S`
//! stack variants. Each pops two `Value`s and pushes the result; both
//! operands must share one variant (`Int` or `Float`), with no implicit
//! int/float promotion.

use crate::diagnostics::RuntimeError;
use crate::program::{Instruction, Opcode};
use crate::resolver::{self, Source, ValueKind};
use crate::value::Value;

use super::Engine;

const NUMERIC_MASK: [ValueKind; 2] = [ValueKind::Int, ValueKind::Float];

fn same_numeric_pair(a: &Value, b: &Value) -> Result<(), RuntimeError> {
    match (a, b) {
        (Value::Int(_), Value::Int(_)) | (Value::Float(_), Value::Float(_)) => Ok(()),
        _ => Err(RuntimeError::InvalidType("operands must share the same numeric variant".to_string())),
    }
}

fn apply(opcode: Opcode, a: &Value, b: &Value) -> Result<Value, RuntimeError> {
    same_numeric_pair(a, b)?;
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Ok(Value::Int(match opcode {
            Opcode::Add | Opcode::Adds => x.wrapping_add(*y),
            Opcode::Sub | Opcode::Subs => x.wrapping_sub(*y),
            Opcode::Mul | Opcode::Muls => x.wrapping_mul(*y),
            _ => unreachable!(),
        })),
        (Value::Float(x), Value::Float(y)) => Ok(Value::Float(match opcode {
            Opcode::Add | Opcode::Adds => x + y,
            Opcode::Sub | Opcode::Subs => x - y,
            Opcode::Mul | Opcode::Muls => x * y,
            _ => unreachable!(),
        })),
        _ => unreachable!("same_numeric_pair already checked"),
    }
}

/// Floor division matching mathematical floor for any nonzero divisor.
fn floor_div(a: i64, b: i64) -> i64 {
    let q = a / b;
    let r = a % b;
    if r != 0 && (r < 0) != (b < 0) {
        q - 1
    } else {
        q
    }
}

fn resolve_dest_and_pair(engine: &Engine, instr: &Instruction) -> Result<(crate::frame::VarRef, Value, Value), RuntimeError> {
    let (dest, sources) = resolver::resolve(&engine.frames, instr, &NUMERIC_MASK, true, false, false)?;
    let dest = dest.expect("arithmetic opcodes always have a destination");
    let a = sources[0].value().expect("take_type not set").clone();
    let b = sources[1].value().expect("take_type not set").clone();
    Ok((dest, a, b))
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

pub(super) fn handle_arith(engine: &mut Engine, instr: &Instruction) -> Result<(), RuntimeError> {
    let (dest, a, b) = resolve_dest_and_pair(engine, instr)?;
    let result = apply(instr.opcode, &a, &b)?;
    store(engine, dest, result)
}

fn pop_numeric_pair(engine: &mut Engine) -> Result<(Value, Value), RuntimeError> {
    let rhs = engine
        .data_stack
        .pop()
        .ok_or_else(|| RuntimeError::MissingValue("data stack underflow".to_string()))?;
    let lhs = engine
        .data_stack
        .pop()
        .ok_or_else(|| RuntimeError::MissingValue("data stack underflow".to_string()))?;
    if !matches!(lhs, Value::Int(_) | Value::Float(_)) || !matches!(rhs, Value::Int(_) | Value::Float(_)) {
        return Err(RuntimeError::InvalidType("stack operands must be Int or Float".to_string()));
    }
    Ok((lhs, rhs))
}

pub(super) fn handle_arith_stack(engine: &mut Engine, opcode: Opcode) -> Result<(), RuntimeError> {
    let (a, b) = pop_numeric_pair(engine)?;
    let result = apply(opcode, &a, &b)?;
    engine.data_stack.push(result);
    Ok(())
}

pub(super) fn handle_idiv(engine: &mut Engine, instr: &Instruction) -> Result<(), RuntimeError> {
    let (dest, sources) = resolver::resolve(&engine.frames, instr, &[ValueKind::Int], true, false, false)?;
    let dest = dest.expect("IDIV always has a destination");
    let (Source::Value(Value::Int(a)), Source::Value(Value::Int(b))) = (&sources[0], &sources[1]) else {
        unreachable!("mask restricts to Int")
    };
    if *b == 0 {
        return Err(RuntimeError::InvalidValue("division by zero".to_string()));
    }
    store(engine, dest, Value::Int(floor_div(*a, *b)))
}

pub(super) fn handle_idiv_stack(engine: &mut Engine) -> Result<(), RuntimeError> {
    let rhs = engine.data_stack.pop().ok_or_else(|| RuntimeError::MissingValue("data stack underflow".to_string()))?;
    let lhs = engine.data_stack.pop().ok_or_else(|| RuntimeError::MissingValue("data stack underflow".to_string()))?;
    let (Value::Int(a), Value::Int(b)) = (lhs, rhs) else {
        return Err(RuntimeError::InvalidType("IDIVS operands must be Int".to_string()));
    };
    if b == 0 {
        return Err(RuntimeError::InvalidValue("division by zero".to_string()));
    }
    engine.data_stack.push(Value::Int(floor_div(a, b)));
    Ok(())
}

pub(super) fn handle_div(engine: &mut Engine, instr: &Instruction) -> Result<(), RuntimeError> {
    let (dest, sources) = resolver::resolve(&engine.frames, instr, &[ValueKind::Float], true, false, false)?;
    let dest = dest.expect("DIV always has a destination");
    let (Source::Value(Value::Float(a)), Source::Value(Value::Float(b))) = (&sources[0], &sources[1]) else {
        unreachable!("mask restricts to Float")
    };
    if *b == 0.0 {
        return Err(RuntimeError::InvalidValue("division by zero".to_string()));
    }
    store(engine, dest, Value::Float(a / b))
}

pub(super) fn handle_div_stack(engine: &mut Engine) -> Result<(), RuntimeError> {
    let rhs = engine.data_stack.pop().ok_or_else(|| RuntimeError::MissingValue("data stack underflow".to_string()))?;
    let lhs = engine.data_stack.pop().ok_or_else(|| RuntimeError::MissingValue("data stack underflow".to_string()))?;
    let (Value::Float(a), Value::Float(b)) = (lhs, rhs) else {
        return Err(RuntimeError::InvalidType("DIVS operands must be Float".to_string()));
    };
    if b == 0.0 {
        return Err(RuntimeError::InvalidValue("division by zero".to_string()));
    }
    engine.data_stack.push(Value::Float(a / b));
    Ok(())
}
