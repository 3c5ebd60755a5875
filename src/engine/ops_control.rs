//! Control-transfer opcodes: `LABEL`, `JUMP`, `CALL`, `RETURN`,
//! `JUMPIFEQ(S)`/`JUMPIFNEQ(S)`, `EXIT`. Each handler returns a
//! [`super::Flow`] value that the dispatch loop interprets, rather than
//! mutating the cursor and an "advance" flag directly.

use crate::diagnostics::RuntimeError;
use crate::program::{Instruction, OperandKind, Program};
use crate::resolver::{self, Source, ValueKind, ALL_KINDS};
use crate::value::Value;

use super::{Engine, Flow};

fn label_name(instr: &Instruction, index: usize) -> Result<&str, RuntimeError> {
    let operand = &instr.operands[index];
    if operand.kind != OperandKind::Label {
        return Err(RuntimeError::InvalidType("expected a label operand".to_string()));
    }
    Ok(&operand.text)
}

fn lookup_label(program: &Program, name: &str) -> Result<usize, RuntimeError> {
    program
        .labels
        .get(name)
        .copied()
        .ok_or_else(|| RuntimeError::SemanticError(format!("undefined label '{}'", name)))
}

pub(super) fn handle_jump(program: &Program, instr: &Instruction) -> Result<Flow, RuntimeError> {
    let target = lookup_label(program, label_name(instr, 0)?)?;
    Ok(Flow::Jump(target))
}

pub(super) fn handle_call(engine: &mut Engine, program: &Program, instr: &Instruction) -> Result<Flow, RuntimeError> {
    let target = lookup_label(program, label_name(instr, 0)?)?;
    engine.call_stack.push(engine.pc + 1);
    Ok(Flow::Jump(target))
}

pub(super) fn handle_return(engine: &mut Engine) -> Result<Flow, RuntimeError> {
    let target = engine
        .call_stack
        .pop()
        .ok_or_else(|| RuntimeError::MissingValue("call stack is empty".to_string()))?;
    Ok(Flow::Jump(target))
}

/// Shared equality law for `EQ`/`JUMPIFEQ` and their stack variants:
/// same variant compares by value; exactly one `Nil`
/// makes equality false; two non-matching non-`Nil` variants is
/// *invalid-type*.
pub(crate) fn values_equal(a: &Value, b: &Value) -> Result<bool, RuntimeError> {
    match (a, b) {
        (Value::Nil, Value::Nil) => Ok(true),
        (Value::Nil, _) | (_, Value::Nil) => Ok(false),
        (Value::Int(x), Value::Int(y)) => Ok(x == y),
        (Value::Float(x), Value::Float(y)) => Ok(x == y),
        (Value::Bool(x), Value::Bool(y)) => Ok(x == y),
        (Value::String(x), Value::String(y)) => Ok(x == y),
        (Value::TypeToken(x), Value::TypeToken(y)) => Ok(x.as_str() == y.as_str()),
        _ => Err(RuntimeError::InvalidType("operands are not comparable".to_string())),
    }
}

pub(super) fn handle_jumpifeq(
    engine: &mut Engine,
    program: &Program,
    instr: &Instruction,
    negate: bool,
) -> Result<Flow, RuntimeError> {
    let target = lookup_label(program, label_name(instr, 0)?)?;
    let a = resolver::resolve_one(&engine.frames, &instr.operands[1], &ALL_KINDS, false)?;
    let b = resolver::resolve_one(&engine.frames, &instr.operands[2], &ALL_KINDS, false)?;
    let (Source::Value(a), Source::Value(b)) = (a, b) else {
        unreachable!("take_type not set, sources are always concrete values")
    };
    let equal = values_equal(&a, &b)?;
    let should_jump = if negate { !equal } else { equal };
    Ok(if should_jump { Flow::Jump(target) } else { Flow::Advance })
}

pub(super) fn handle_jumpifeqs(
    engine: &mut Engine,
    program: &Program,
    instr: &Instruction,
    negate: bool,
) -> Result<Flow, RuntimeError> {
    let target = lookup_label(program, label_name(instr, 0)?)?;
    let rhs = engine
        .data_stack
        .pop()
        .ok_or_else(|| RuntimeError::MissingValue("data stack underflow".to_string()))?;
    let lhs = engine
        .data_stack
        .pop()
        .ok_or_else(|| RuntimeError::MissingValue("data stack underflow".to_string()))?;
    let equal = values_equal(&lhs, &rhs)?;
    let should_jump = if negate { !equal } else { equal };
    Ok(if should_jump { Flow::Jump(target) } else { Flow::Advance })
}

pub(super) fn handle_exit(engine: &mut Engine, instr: &Instruction) -> Result<Flow, RuntimeError> {
    let source = resolver::resolve_one(&engine.frames, &instr.operands[0], &[ValueKind::Int], false)?;
    let Source::Value(Value::Int(code)) = source else {
        unreachable!("mask restricts to Int")
    };
    if !(0..=49).contains(&code) {
        return Err(RuntimeError::InvalidValue(format!("exit code {} out of range 0..=49", code)));
    }
    Ok(Flow::Exit(code as i32))
}
