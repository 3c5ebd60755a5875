//! Frame/variable opcodes: `CREATEFRAME`, `PUSHFRAME`, `POPFRAME`,
//! `DEFVAR`, `MOVE`. All routed through [`crate::frame::FrameSet`], which
//! tracks the three named frame roles (global, local, temporary).

use crate::diagnostics::RuntimeError;
use crate::program::Instruction;
use crate::resolver::{self, ALL_KINDS};

use super::Engine;

pub(super) fn handle_create_frame(engine: &mut Engine) {
    engine.frames.create_frame();
}

pub(super) fn handle_push_frame(engine: &mut Engine) -> Result<(), RuntimeError> {
    engine.frames.push_frame()
}

pub(super) fn handle_pop_frame(engine: &mut Engine) -> Result<(), RuntimeError> {
    engine.frames.pop_frame()
}

pub(super) fn handle_defvar(engine: &mut Engine, instr: &Instruction) -> Result<(), RuntimeError> {
    let var_ref = resolver::parse_var_ref(&instr.operands[0].text)
        .ok_or_else(|| RuntimeError::InvalidType(format!("malformed variable reference '{}'", instr.operands[0].text)))?;
    engine.frames.resolve_mut(var_ref.frame)?.declare(&var_ref.name)
}

pub(super) fn handle_move(engine: &mut Engine, instr: &Instruction) -> Result<(), RuntimeError> {
    let (dest, sources) = resolver::resolve(&engine.frames, instr, &ALL_KINDS, true, false, false)?;
    let dest = dest.expect("MOVE always resolves a destination");
    let value = sources[0].value().expect("MOVE never sets take_type").clone();
    engine.frames.resolve_mut(dest.frame)?.get_mut(&dest.name)
        .ok_or_else(|| RuntimeError::NonexistentVariable(dest.name.clone()))?
        .set(value);
    Ok(())
}
