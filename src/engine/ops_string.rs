//! String and reflection opcodes: `CONCAT`, `STRLEN`, `GETCHAR`,
//! `SETCHAR`, `TYPE`. `SETCHAR` is the one opcode that resolves its
//! destination operand as a source too (the resolver's `first` flag),
//! and `TYPE` is the one opcode that uses `take_type` to read past an
//! uninitialized slot without error.

use crate::diagnostics::RuntimeError;
use crate::program::Instruction;
use crate::resolver::{self, Source, ValueKind, ALL_KINDS};
use crate::value::Value;

use super::Engine;

const STRING_MASK: [ValueKind; 1] = [ValueKind::String];

fn store(engine: &mut Engine, dest: crate::frame::VarRef, value: Value) -> Result<(), RuntimeError> {
    engine
        .frames
        .resolve_mut(dest.frame)?
        .get_mut(&dest.name)
        .ok_or_else(|| RuntimeError::NonexistentVariable(dest.name.clone()))?
        .set(value);
    Ok(())
}

pub(super) fn handle_concat(engine: &mut Engine, instr: &Instruction) -> Result<(), RuntimeError> {
    let (dest, sources) = resolver::resolve(&engine.frames, instr, &STRING_MASK, true, false, false)?;
    let dest = dest.expect("CONCAT always has a destination");
    let Value::String(a) = sources[0].value().expect("take_type not set") else {
        unreachable!("mask restricts to String")
    };
    let Value::String(b) = sources[1].value().expect("take_type not set") else {
        unreachable!("mask restricts to String")
    };
    store(engine, dest, Value::String(format!("{}{}", a, b)))
}

pub(super) fn handle_strlen(engine: &mut Engine, instr: &Instruction) -> Result<(), RuntimeError> {
    let (dest, sources) = resolver::resolve(&engine.frames, instr, &STRING_MASK, true, false, false)?;
    let dest = dest.expect("STRLEN always has a destination");
    let Value::String(s) = sources[0].value().expect("take_type not set") else {
        unreachable!("mask restricts to String")
    };
    store(engine, dest, Value::Int(s.chars().count() as i64))
}

pub(super) fn handle_getchar(engine: &mut Engine, instr: &Instruction) -> Result<(), RuntimeError> {
    let dest = resolver::resolve_dest(&engine.frames, &instr.operands[0])?;
    let s_source = resolver::resolve_one(&engine.frames, &instr.operands[1], &STRING_MASK, false)?;
    let i_source = resolver::resolve_one(&engine.frames, &instr.operands[2], &[ValueKind::Int], false)?;
    let (Source::Value(Value::String(s)), Source::Value(Value::Int(i))) = (s_source, i_source) else {
        unreachable!("masks restrict to String and Int respectively")
    };
    if i < 0 {
        return Err(RuntimeError::BadStringOperation("negative string index".to_string()));
    }
    let c = s
        .chars()
        .nth(i as usize)
        .ok_or_else(|| RuntimeError::BadStringOperation(format!("index {} out of bounds", i)))?;
    store(engine, dest, Value::String(c.to_string()))
}

pub(super) fn handle_setchar(engine: &mut Engine, instr: &Instruction) -> Result<(), RuntimeError> {
    let dest = resolver::resolve_dest(&engine.frames, &instr.operands[0])?;
    let d_source = resolver::resolve_one(&engine.frames, &instr.operands[0], &STRING_MASK, false)?;
    let i_source = resolver::resolve_one(&engine.frames, &instr.operands[1], &[ValueKind::Int], false)?;
    let c_source = resolver::resolve_one(&engine.frames, &instr.operands[2], &STRING_MASK, false)?;

    let Source::Value(Value::String(original)) = d_source else {
        unreachable!("mask restricts to String")
    };
    let Source::Value(Value::Int(i)) = i_source else {
        unreachable!("mask restricts to Int")
    };
    let Source::Value(Value::String(replacement)) = c_source else {
        unreachable!("mask restricts to String")
    };

    let new_char = replacement
        .chars()
        .next()
        .ok_or_else(|| RuntimeError::BadStringOperation("replacement string is empty".to_string()))?;
    if i < 0 || (i as usize) >= original.chars().count() {
        return Err(RuntimeError::BadStringOperation(format!("index {} out of bounds", i)));
    }

    let mut chars: Vec<char> = original.chars().collect();
    chars[i as usize] = new_char;
    let result: String = chars.into_iter().collect();
    store(engine, dest, Value::String(result))
}

pub(super) fn handle_type(engine: &mut Engine, instr: &Instruction) -> Result<(), RuntimeError> {
    let (dest, sources) = resolver::resolve(&engine.frames, instr, &ALL_KINDS, true, false, true)?;
    let dest = dest.expect("TYPE always has a destination");
    let name = match &sources[0] {
        Source::Value(v) => v.type_name().to_string(),
        Source::Uninitialized => String::new(),
    };
    store(engine, dest, Value::String(name))
}
