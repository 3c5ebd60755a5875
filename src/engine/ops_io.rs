//! I/O opcodes: `READ`, `WRITE`, `DPRINT`, `BREAK`. Each routes through
//! [`crate::io`] for the actual streams; `WRITE`/`DPRINT`/`BREAK` are
//! side-effecting opcodes that produce no destination value.

use crate::diagnostics::RuntimeError;
use crate::frame::Frame;
use crate::program::{Instruction, Program};
use crate::resolver::{self, Source, ValueKind, ALL_KINDS};
use crate::value::{self, Value};

use super::Engine;

pub(super) fn handle_read(engine: &mut Engine, instr: &Instruction) -> Result<(), RuntimeError> {
    let dest = resolver::resolve_dest(&engine.frames, &instr.operands[0])?;
    let type_source = resolver::resolve_one(&engine.frames, &instr.operands[1], &[ValueKind::Type], false)?;
    let Source::Value(Value::TypeToken(tag)) = type_source else {
        unreachable!("mask restricts to Type")
    };

    let line = engine.input.read_line();
    let result = match line {
        None => Value::Nil,
        Some(text) if text.is_empty() => Value::Nil,
        Some(text) => match tag {
            crate::value::TypeTag::Int => value::parse_int(&text).map(Value::Int).unwrap_or(Value::Nil),
            crate::value::TypeTag::Float => value::parse_float(&text).map(Value::Float).unwrap_or(Value::Nil),
            crate::value::TypeTag::Bool => Value::Bool(value::parse_bool(&text)),
            crate::value::TypeTag::String => Value::String(value::parse_string(&text)),
        },
    };

    engine
        .frames
        .resolve_mut(dest.frame)?
        .get_mut(&dest.name)
        .ok_or_else(|| RuntimeError::NonexistentVariable(dest.name.clone()))?
        .set(result);
    Ok(())
}

pub(super) fn handle_write(engine: &mut Engine, instr: &Instruction) -> Result<(), RuntimeError> {
    let (_, sources) = resolver::resolve(&engine.frames, instr, &ALL_KINDS, false, false, false)?;
    let text = sources[0].value().expect("take_type not set").format();
    engine.output.write_stdout(&text)
}

pub(super) fn handle_dprint(engine: &mut Engine, instr: &Instruction) -> Result<(), RuntimeError> {
    let (_, sources) = resolver::resolve(&engine.frames, instr, &ALL_KINDS, false, false, false)?;
    let text = sources[0].value().expect("take_type not set").format();
    engine.output.write_stderr(&text)
}

fn dump_frame(out: &mut String, label: &str, frame: &Frame) {
    out.push_str(label);
    out.push('\n');
    let mut entries: Vec<(&String, &crate::frame::Slot)> = frame.iter().collect();
    entries.sort_by_key(|(name, _)| name.as_str());
    for (name, slot) in entries {
        match slot.get() {
            Some(value) => {
                out.push_str(&format!("  {} {} {}\n", name, value.format(), value.type_name()));
            }
            None => out.push_str(&format!("  {} - uninitialized\n", name)),
        }
    }
}

pub(super) fn handle_break(engine: &mut Engine, program: &Program) -> Result<(), RuntimeError> {
    let order = program.instructions[engine.pc].order;
    let mut out = format!("BREAK at instruction order {}\n", order);
    dump_frame(&mut out, "GF", engine.frames.global());
    if let Some(local) = engine.frames.local() {
        dump_frame(&mut out, "LF", local);
    }
    if let Some(temp) = engine.frames.temporary() {
        dump_frame(&mut out, "TF", temp);
    }
    engine.output.write_stderr(&out)
}
