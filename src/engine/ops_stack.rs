//! Data stack opcodes: `PUSHS`, `POPS` (`CLEARS` is trivial enough to stay
//! inline in [`super::dispatch`]). These are the only opcodes that touch
//! the engine's data stack explicitly — every other family routes through
//! [`crate::resolver`] and a destination slot instead.

use crate::diagnostics::RuntimeError;
use crate::program::Instruction;
use crate::resolver::{self, Source, ALL_KINDS};

use super::Engine;

pub(super) fn handle_pushs(engine: &mut Engine, instr: &Instruction) -> Result<(), RuntimeError> {
    let source = resolver::resolve_one(&engine.frames, &instr.operands[0], &ALL_KINDS, false)?;
    let Source::Value(value) = source else {
        unreachable!("take_type not set, source is always a concrete value")
    };
    engine.data_stack.push(value);
    Ok(())
}

pub(super) fn handle_pops(engine: &mut Engine, instr: &Instruction) -> Result<(), RuntimeError> {
    let dest = resolver::resolve_dest(&engine.frames, &instr.operands[0])?;
    let value = engine
        .data_stack
        .pop()
        .ok_or_else(|| RuntimeError::MissingValue("data stack underflow".to_string()))?;
    engine
        .frames
        .resolve_mut(dest.frame)?
        .get_mut(&dest.name)
        .ok_or_else(|| RuntimeError::NonexistentVariable(dest.name.clone()))?
        .set(value);
    Ok(())
}
