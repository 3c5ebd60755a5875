//! # Execution Engine
//!
//! The fetch-decode-execute loop: an instruction cursor, a data stack,
//! frame state, and a `match` over [`crate::program::Opcode`] dispatching
//! into per-family handler modules, with three named frame roles managed
//! through [`crate::frame::FrameSet`].
//!
//! Control-flow handlers (`JUMP`/`CALL`/`RETURN`/`JUMPIF*`/`EXIT`) return a
//! [`Flow`] value instead of mutating the cursor and an "advance" flag in
//! place — the "does this instruction override the cursor" decision made
//! explicit in the return type.

mod ops_arith;
mod ops_compare;
mod ops_control;
mod ops_convert;
mod ops_frame;
mod ops_io;
mod ops_logic;
mod ops_stack;
mod ops_string;

use crate::diagnostics::RuntimeError;
use crate::frame::FrameSet;
use crate::io::{InputSource, OutputSink};
use crate::program::{Instruction, Opcode, Program};
use crate::value::Value;

/// What the dispatch loop should do with the cursor after an instruction.
pub(crate) enum Flow {
    Advance,
    Jump(usize),
    Exit(i32),
}

/// All mutable state the opcode handlers operate on, grouped into one
/// struct so the dozens of per-family handler functions take one argument
/// instead of seven.
pub struct Engine {
    pub(crate) frames: FrameSet,
    pub(crate) data_stack: Vec<Value>,
    pub(crate) call_stack: Vec<usize>,
    pub(crate) pc: usize,
    pub(crate) input: InputSource,
    pub(crate) output: OutputSink,
}

impl Engine {
    pub fn new(input: InputSource) -> Engine {
        Engine {
            frames: FrameSet::new(),
            data_stack: Vec::new(),
            call_stack: Vec::new(),
            pc: 0,
            input,
            output: OutputSink::new(),
        }
    }
}

/// Run `program` to completion. Returns the process exit status: `0` on
/// falling off the end of the instruction vector, or `EXIT`'s argument.
pub fn run(program: &Program, input: InputSource) -> Result<i32, RuntimeError> {
    let mut engine = Engine::new(input);
    run_with_engine(&mut engine, program)
}

/// Same as [`run`], but against a caller-supplied [`Engine`] — used by
/// tests that need a non-stdout [`OutputSink`].
pub(crate) fn run_with_engine(engine: &mut Engine, program: &Program) -> Result<i32, RuntimeError> {
    while engine.pc < program.instructions.len() {
        let instr = &program.instructions[engine.pc];
        let flow = dispatch(engine, program, instr)?;
        match flow {
            Flow::Advance => engine.pc += 1,
            Flow::Jump(target) => engine.pc = target,
            Flow::Exit(code) => return Ok(code),
        }
    }
    Ok(0)
}

fn dispatch(engine: &mut Engine, program: &Program, instr: &Instruction) -> Result<Flow, RuntimeError> {
    use Opcode::*;
    match instr.opcode {
        CreateFrame => {
            ops_frame::handle_create_frame(engine);
            Ok(Flow::Advance)
        }
        PushFrame => {
            ops_frame::handle_push_frame(engine)?;
            Ok(Flow::Advance)
        }
        PopFrame => {
            ops_frame::handle_pop_frame(engine)?;
            Ok(Flow::Advance)
        }
        DefVar => {
            ops_frame::handle_defvar(engine, instr)?;
            Ok(Flow::Advance)
        }
        Move => {
            ops_frame::handle_move(engine, instr)?;
            Ok(Flow::Advance)
        }

        Label => Ok(Flow::Advance),
        Jump => ops_control::handle_jump(program, instr),
        Call => ops_control::handle_call(engine, program, instr),
        Return => ops_control::handle_return(engine),
        Jumpifeq => ops_control::handle_jumpifeq(engine, program, instr, false),
        Jumpifneq => ops_control::handle_jumpifeq(engine, program, instr, true),
        Jumpifeqs => ops_control::handle_jumpifeqs(engine, program, instr, false),
        Jumpifneqs => ops_control::handle_jumpifeqs(engine, program, instr, true),
        Exit => ops_control::handle_exit(engine, instr),

        Pushs => {
            ops_stack::handle_pushs(engine, instr)?;
            Ok(Flow::Advance)
        }
        Pops => {
            ops_stack::handle_pops(engine, instr)?;
            Ok(Flow::Advance)
        }
        Clears => {
            engine.data_stack.clear();
            Ok(Flow::Advance)
        }

        Add | Sub | Mul => {
            ops_arith::handle_arith(engine, instr)?;
            Ok(Flow::Advance)
        }
        Adds | Subs | Muls => {
            ops_arith::handle_arith_stack(engine, instr.opcode)?;
            Ok(Flow::Advance)
        }
        Idiv => {
            ops_arith::handle_idiv(engine, instr)?;
            Ok(Flow::Advance)
        }
        Idivs => {
            ops_arith::handle_idiv_stack(engine)?;
            Ok(Flow::Advance)
        }
        Div => {
            ops_arith::handle_div(engine, instr)?;
            Ok(Flow::Advance)
        }
        Divs => {
            ops_arith::handle_div_stack(engine)?;
            Ok(Flow::Advance)
        }

        Lt | Gt => {
            ops_compare::handle_order(engine, instr)?;
            Ok(Flow::Advance)
        }
        Lts | Gts => {
            ops_compare::handle_order_stack(engine, instr.opcode)?;
            Ok(Flow::Advance)
        }
        Eq => {
            ops_compare::handle_eq(engine, instr)?;
            Ok(Flow::Advance)
        }
        Eqs => {
            ops_compare::handle_eq_stack(engine)?;
            Ok(Flow::Advance)
        }

        And | Or => {
            ops_logic::handle_binary(engine, instr)?;
            Ok(Flow::Advance)
        }
        Ands | Ors => {
            ops_logic::handle_binary_stack(engine, instr.opcode)?;
            Ok(Flow::Advance)
        }
        Not => {
            ops_logic::handle_not(engine, instr)?;
            Ok(Flow::Advance)
        }
        Nots => {
            ops_logic::handle_not_stack(engine)?;
            Ok(Flow::Advance)
        }

        Int2Char => {
            ops_convert::handle_int2char(engine, instr)?;
            Ok(Flow::Advance)
        }
        Int2Chars => {
            ops_convert::handle_int2char_stack(engine)?;
            Ok(Flow::Advance)
        }
        Int2Float => {
            ops_convert::handle_int2float(engine, instr)?;
            Ok(Flow::Advance)
        }
        Int2Floats => {
            ops_convert::handle_int2float_stack(engine)?;
            Ok(Flow::Advance)
        }
        Float2Int => {
            ops_convert::handle_float2int(engine, instr)?;
            Ok(Flow::Advance)
        }
        Float2Ints => {
            ops_convert::handle_float2int_stack(engine)?;
            Ok(Flow::Advance)
        }
        Stri2Int => {
            ops_convert::handle_stri2int(engine, instr)?;
            Ok(Flow::Advance)
        }
        Stri2Ints => {
            ops_convert::handle_stri2int_stack(engine)?;
            Ok(Flow::Advance)
        }

        Read => {
            ops_io::handle_read(engine, instr)?;
            Ok(Flow::Advance)
        }
        Write => {
            ops_io::handle_write(engine, instr)?;
            Ok(Flow::Advance)
        }
        Dprint => {
            ops_io::handle_dprint(engine, instr)?;
            Ok(Flow::Advance)
        }
        Break => {
            ops_io::handle_break(engine, program)?;
            Ok(Flow::Advance)
        }

        Concat => {
            ops_string::handle_concat(engine, instr)?;
            Ok(Flow::Advance)
        }
        Strlen => {
            ops_string::handle_strlen(engine, instr)?;
            Ok(Flow::Advance)
        }
        Getchar => {
            ops_string::handle_getchar(engine, instr)?;
            Ok(Flow::Advance)
        }
        Setchar => {
            ops_string::handle_setchar(engine, instr)?;
            Ok(Flow::Advance)
        }
        Type => {
            ops_string::handle_type(engine, instr)?;
            Ok(Flow::Advance)
        }
    }
}

#[cfg(test)]
mod tests;
