//! Type-conversion opcodes: `INT2CHAR`, `INT2FLOAT`, `FLOAT2INT`,
//! `STRI2INT`, and their `*S` stack variants. Conversions are explicit and
//! checked — no silent truncation outside the documented
//! float-to-int/char-code rules.

use crate::diagnostics::RuntimeError;
use crate::program::Instruction;
use crate::resolver::{self, Source, ValueKind};
use crate::value::Value;

use super::Engine;

fn store(engine: &mut Engine, dest: crate::frame::VarRef, value: Value) -> Result<(), RuntimeError> {
    engine
        .frames
        .resolve_mut(dest.frame)?
        .get_mut(&dest.name)
        .ok_or_else(|| RuntimeError::NonexistentVariable(dest.name.clone()))?
        .set(value);
    Ok(())
}

fn char_from_code(code: i64) -> Result<String, RuntimeError> {
    let code = u32::try_from(code).map_err(|_| RuntimeError::BadStringOperation(format!("code point {} out of range", code)))?;
    char::from_u32(code)
        .map(|c| c.to_string())
        .ok_or_else(|| RuntimeError::BadStringOperation(format!("code point {} is not a valid scalar value", code)))
}

pub(super) fn handle_int2char(engine: &mut Engine, instr: &Instruction) -> Result<(), RuntimeError> {
    let (dest, sources) = resolver::resolve(&engine.frames, instr, &[ValueKind::Int], true, false, false)?;
    let dest = dest.expect("INT2CHAR always has a destination");
    let Value::Int(code) = sources[0].value().expect("take_type not set") else {
        unreachable!("mask restricts to Int")
    };
    let s = char_from_code(*code)?;
    store(engine, dest, Value::String(s))
}

pub(super) fn handle_int2char_stack(engine: &mut Engine) -> Result<(), RuntimeError> {
    let top = engine.data_stack.pop().ok_or_else(|| RuntimeError::MissingValue("data stack underflow".to_string()))?;
    let Value::Int(code) = top else {
        return Err(RuntimeError::InvalidType("INT2CHARS operand must be Int".to_string()));
    };
    let s = char_from_code(code)?;
    engine.data_stack.push(Value::String(s));
    Ok(())
}

pub(super) fn handle_int2float(engine: &mut Engine, instr: &Instruction) -> Result<(), RuntimeError> {
    let (dest, sources) = resolver::resolve(&engine.frames, instr, &[ValueKind::Int], true, false, false)?;
    let dest = dest.expect("INT2FLOAT always has a destination");
    let Value::Int(i) = sources[0].value().expect("take_type not set") else {
        unreachable!("mask restricts to Int")
    };
    store(engine, dest, Value::Float(*i as f64))
}

pub(super) fn handle_int2float_stack(engine: &mut Engine) -> Result<(), RuntimeError> {
    let top = engine.data_stack.pop().ok_or_else(|| RuntimeError::MissingValue("data stack underflow".to_string()))?;
    let Value::Int(i) = top else {
        return Err(RuntimeError::InvalidType("INT2FLOATS operand must be Int".to_string()));
    };
    engine.data_stack.push(Value::Float(i as f64));
    Ok(())
}

pub(super) fn handle_float2int(engine: &mut Engine, instr: &Instruction) -> Result<(), RuntimeError> {
    let (dest, sources) = resolver::resolve(&engine.frames, instr, &[ValueKind::Float], true, false, false)?;
    let dest = dest.expect("FLOAT2INT always has a destination");
    let Value::Float(f) = sources[0].value().expect("take_type not set") else {
        unreachable!("mask restricts to Float")
    };
    store(engine, dest, Value::Int(*f as i64))
}

pub(super) fn handle_float2int_stack(engine: &mut Engine) -> Result<(), RuntimeError> {
    let top = engine.data_stack.pop().ok_or_else(|| RuntimeError::MissingValue("data stack underflow".to_string()))?;
    let Value::Float(f) = top else {
        return Err(RuntimeError::InvalidType("FLOAT2INTS operand must be Float".to_string()));
    };
    engine.data_stack.push(Value::Int(f as i64));
    Ok(())
}

fn char_at(s: &str, index: i64) -> Result<char, RuntimeError> {
    if index < 0 {
        return Err(RuntimeError::BadStringOperation("negative string index".to_string()));
    }
    s.chars()
        .nth(index as usize)
        .ok_or_else(|| RuntimeError::BadStringOperation(format!("index {} out of bounds", index)))
}

pub(super) fn handle_stri2int(engine: &mut Engine, instr: &Instruction) -> Result<(), RuntimeError> {
    let dest = resolver::resolve_dest(&engine.frames, &instr.operands[0])?;
    let s_source = resolver::resolve_one(&engine.frames, &instr.operands[1], &[ValueKind::String], false)?;
    let i_source = resolver::resolve_one(&engine.frames, &instr.operands[2], &[ValueKind::Int], false)?;
    let (Source::Value(Value::String(s)), Source::Value(Value::Int(i))) = (s_source, i_source) else {
        unreachable!("masks restrict to String and Int respectively")
    };
    let c = char_at(&s, i)?;
    store(engine, dest, Value::Int(c as i64))
}

pub(super) fn handle_stri2int_stack(engine: &mut Engine) -> Result<(), RuntimeError> {
    let index = engine.data_stack.pop().ok_or_else(|| RuntimeError::MissingValue("data stack underflow".to_string()))?;
    let s = engine.data_stack.pop().ok_or_else(|| RuntimeError::MissingValue("data stack underflow".to_string()))?;
    let (Value::String(s), Value::Int(i)) = (s, index) else {
        return Err(RuntimeError::InvalidType("STRI2INTS operands must be String, Int".to_string()));
    };
    let c = char_at(&s, i)?;
    engine.data_stack.push(Value::Int(c as i64));
    Ok(())
}
