use std::collections::HashMap;

use super::*;
use crate::io::{InputSource, OutputSink};
use crate::program::{Instruction, Opcode, Operand, OperandKind, Program};

fn op(kind: OperandKind, text: &str) -> Operand {
    Operand { kind, text: text.to_string() }
}

fn var(text: &str) -> Operand {
    op(OperandKind::Var, text)
}

/// Build a [`Program`] from a bare opcode/operand list, assigning order
/// and index sequentially and collecting the label table directly,
/// rather than round-tripping through the XML parser.
fn build(entries: Vec<(Opcode, Vec<Operand>)>) -> Program {
    let mut instructions = Vec::with_capacity(entries.len());
    let mut labels = HashMap::new();
    for (index, (opcode, operands)) in entries.into_iter().enumerate() {
        if opcode == Opcode::Label {
            labels.insert(operands[0].text.clone(), index);
        }
        instructions.push(Instruction {
            opcode,
            operands,
            order: (index + 1) as u64,
            index,
        });
    }
    Program { instructions, labels }
}

fn engine_with_input(input: &str) -> (Engine, std::rc::Rc<std::cell::RefCell<Vec<u8>>>, std::rc::Rc<std::cell::RefCell<Vec<u8>>>) {
    let (output, out, err) = OutputSink::buffered();
    let engine = Engine {
        frames: crate::frame::FrameSet::new(),
        data_stack: Vec::new(),
        call_stack: Vec::new(),
        pc: 0,
        input: InputSource::from_str(input),
        output,
    };
    (engine, out, err)
}

fn stdout_of(buf: &std::rc::Rc<std::cell::RefCell<Vec<u8>>>) -> String {
    String::from_utf8(buf.borrow().clone()).unwrap()
}

/// Run `xml` through the full pipeline (XML adapter → loader → engine)
/// instead of building a [`Program`] by hand, to exercise the adapter seam.
fn run_xml(xml: &str, input: &str) -> (Result<i32, RuntimeError>, String) {
    let raw = crate::xml::parse(xml).expect("well-formed test fixture");
    let program = crate::program::load(raw).expect("valid test fixture");
    let (mut engine, out, _err) = engine_with_input(input);
    let result = run_with_engine(&mut engine, &program);
    (result, stdout_of(&out))
}

#[test]
fn hello_world_via_xml() {
    let xml = r#"<program language="IPPcode23">
        <instruction order="1" opcode="DEFVAR"><arg1 type="var">GF@x</arg1></instruction>
        <instruction order="2" opcode="MOVE">
            <arg1 type="var">GF@x</arg1>
            <arg2 type="string">Hello\032world</arg2>
        </instruction>
        <instruction order="3" opcode="WRITE"><arg1 type="var">GF@x</arg1></instruction>
    </program>"#;
    let (result, stdout) = run_xml(xml, "");
    assert_eq!(result.unwrap(), 0);
    assert_eq!(stdout, "Hello world");
}

#[test]
fn stack_arithmetic_via_xml() {
    let xml = r#"<program language="IPPcode23">
        <instruction order="1" opcode="DEFVAR"><arg1 type="var">GF@r</arg1></instruction>
        <instruction order="2" opcode="PUSHS"><arg1 type="int">2</arg1></instruction>
        <instruction order="3" opcode="PUSHS"><arg1 type="int">3</arg1></instruction>
        <instruction order="4" opcode="ADDS"></instruction>
        <instruction order="5" opcode="POPS"><arg1 type="var">GF@r</arg1></instruction>
        <instruction order="6" opcode="WRITE"><arg1 type="var">GF@r</arg1></instruction>
    </program>"#;
    let (result, stdout) = run_xml(xml, "");
    assert_eq!(result.unwrap(), 0);
    assert_eq!(stdout, "5");
}

#[test]
fn frame_discipline_via_xml() {
    let xml = r#"<program language="IPPcode23">
        <instruction order="1" opcode="CREATEFRAME"></instruction>
        <instruction order="2" opcode="DEFVAR"><arg1 type="var">TF@a</arg1></instruction>
        <instruction order="3" opcode="PUSHFRAME"></instruction>
        <instruction order="4" opcode="MOVE">
            <arg1 type="var">LF@a</arg1>
            <arg2 type="int">7</arg2>
        </instruction>
        <instruction order="5" opcode="POPFRAME"></instruction>
        <instruction order="6" opcode="WRITE"><arg1 type="var">TF@a</arg1></instruction>
    </program>"#;
    let (result, stdout) = run_xml(xml, "");
    assert_eq!(result.unwrap(), 0);
    assert_eq!(stdout, "7");
}

#[test]
fn call_and_return_via_xml() {
    let xml = r#"<program language="IPPcode23">
        <instruction order="1" opcode="CALL"><arg1 type="label">sub</arg1></instruction>
        <instruction order="2" opcode="WRITE"><arg1 type="string">after</arg1></instruction>
        <instruction order="3" opcode="JUMP"><arg1 type="label">end</arg1></instruction>
        <instruction order="4" opcode="LABEL"><arg1 type="label">sub</arg1></instruction>
        <instruction order="5" opcode="WRITE"><arg1 type="string">in-sub-</arg1></instruction>
        <instruction order="6" opcode="RETURN"></instruction>
        <instruction order="7" opcode="LABEL"><arg1 type="label">end</arg1></instruction>
    </program>"#;
    let (result, stdout) = run_xml(xml, "");
    assert_eq!(result.unwrap(), 0);
    assert_eq!(stdout, "in-sub-after");
}

#[test]
fn division_by_zero_via_xml_is_invalid_value() {
    let xml = r#"<program language="IPPcode23">
        <instruction order="1" opcode="DEFVAR"><arg1 type="var">GF@r</arg1></instruction>
        <instruction order="2" opcode="IDIV">
            <arg1 type="var">GF@r</arg1>
            <arg2 type="int">5</arg2>
            <arg3 type="int">0</arg3>
        </instruction>
    </program>"#;
    let (result, _stdout) = run_xml(xml, "");
    assert_eq!(result.unwrap_err().exit_code(), 57);
}

#[test]
fn escape_decoding_via_xml() {
    let xml = r#"<program language="IPPcode23">
        <instruction order="1" opcode="WRITE"><arg1 type="string">A\010B</arg1></instruction>
    </program>"#;
    let (result, stdout) = run_xml(xml, "");
    assert_eq!(result.unwrap(), 0);
    assert_eq!(stdout, "A\nB");
}

#[test]
fn uninitialized_read_via_xml() {
    let xml = r#"<program language="IPPcode23">
        <instruction order="1" opcode="DEFVAR"><arg1 type="var">GF@x</arg1></instruction>
        <instruction order="2" opcode="WRITE"><arg1 type="var">GF@x</arg1></instruction>
    </program>"#;
    let (result, _stdout) = run_xml(xml, "");
    assert_eq!(result.unwrap_err().exit_code(), 56);
}

#[test]
fn jump_to_missing_label_via_xml() {
    let xml = r#"<program language="IPPcode23">
        <instruction order="1" opcode="JUMP"><arg1 type="label">nowhere</arg1></instruction>
    </program>"#;
    let (result, _stdout) = run_xml(xml, "");
    assert_eq!(result.unwrap_err().exit_code(), 52);
}

#[test]
fn bad_setchar_via_xml() {
    let xml = r#"<program language="IPPcode23">
        <instruction order="1" opcode="DEFVAR"><arg1 type="var">GF@s</arg1></instruction>
        <instruction order="2" opcode="MOVE">
            <arg1 type="var">GF@s</arg1>
            <arg2 type="string">abc</arg2>
        </instruction>
        <instruction order="3" opcode="SETCHAR">
            <arg1 type="var">GF@s</arg1>
            <arg2 type="int">10</arg2>
            <arg3 type="string">z</arg3>
        </instruction>
    </program>"#;
    let (result, _stdout) = run_xml(xml, "");
    assert_eq!(result.unwrap_err().exit_code(), 58);
}

#[test]
fn hello_world() {
    let program = build(vec![
        (Opcode::DefVar, vec![var("GF@x")]),
        (Opcode::Move, vec![var("GF@x"), op(OperandKind::String, "Hello\\032world")]),
        (Opcode::Write, vec![var("GF@x")]),
    ]);
    let (mut engine, out, _err) = engine_with_input("");
    let code = run_with_engine(&mut engine, &program).unwrap();
    assert_eq!(code, 0);
    assert_eq!(stdout_of(&out), "Hello world");
}

#[test]
fn escape_decoding() {
    let program = build(vec![(Opcode::Write, vec![op(OperandKind::String, "A\\010B")])]);
    let (mut engine, out, _err) = engine_with_input("");
    run_with_engine(&mut engine, &program).unwrap();
    assert_eq!(stdout_of(&out), "A\nB");
}

#[test]
fn uninitialized_read_is_missing_value() {
    let program = build(vec![
        (Opcode::DefVar, vec![var("GF@x")]),
        (Opcode::Write, vec![var("GF@x")]),
    ]);
    let (mut engine, _out, _err) = engine_with_input("");
    let err = run_with_engine(&mut engine, &program).unwrap_err();
    assert_eq!(err.exit_code(), 56);
}

#[test]
fn division_by_zero_is_invalid_value() {
    let program = build(vec![
        (Opcode::DefVar, vec![var("GF@r")]),
        (Opcode::Idiv, vec![var("GF@r"), op(OperandKind::Int, "5"), op(OperandKind::Int, "0")]),
    ]);
    let (mut engine, _out, _err) = engine_with_input("");
    let err = run_with_engine(&mut engine, &program).unwrap_err();
    assert_eq!(err.exit_code(), 57);
}

#[test]
fn jump_to_missing_label_is_semantic_error() {
    let program = build(vec![(Opcode::Jump, vec![op(OperandKind::Label, "nowhere")])]);
    let (mut engine, _out, _err) = engine_with_input("");
    let err = run_with_engine(&mut engine, &program).unwrap_err();
    assert_eq!(err.exit_code(), 52);
}

#[test]
fn stack_arithmetic() {
    let program = build(vec![
        (Opcode::DefVar, vec![var("GF@r")]),
        (Opcode::Pushs, vec![op(OperandKind::Int, "2")]),
        (Opcode::Pushs, vec![op(OperandKind::Int, "3")]),
        (Opcode::Adds, vec![]),
        (Opcode::Pops, vec![var("GF@r")]),
        (Opcode::Write, vec![var("GF@r")]),
    ]);
    let (mut engine, out, _err) = engine_with_input("");
    let code = run_with_engine(&mut engine, &program).unwrap();
    assert_eq!(code, 0);
    assert_eq!(stdout_of(&out), "5");
}

#[test]
fn frame_discipline() {
    let program = build(vec![
        (Opcode::CreateFrame, vec![]),
        (Opcode::DefVar, vec![var("TF@a")]),
        (Opcode::PushFrame, vec![]),
        (Opcode::Move, vec![var("LF@a"), op(OperandKind::Int, "7")]),
        (Opcode::PopFrame, vec![]),
        (Opcode::Write, vec![var("TF@a")]),
    ]);
    let (mut engine, out, _err) = engine_with_input("");
    let code = run_with_engine(&mut engine, &program).unwrap();
    assert_eq!(code, 0);
    assert_eq!(stdout_of(&out), "7");
}

#[test]
fn bad_setchar_is_bad_string_operation() {
    let program = build(vec![
        (Opcode::DefVar, vec![var("GF@s")]),
        (Opcode::Move, vec![var("GF@s"), op(OperandKind::String, "abc")]),
        (Opcode::Setchar, vec![var("GF@s"), op(OperandKind::Int, "10"), op(OperandKind::String, "z")]),
    ]);
    let (mut engine, _out, _err) = engine_with_input("");
    let err = run_with_engine(&mut engine, &program).unwrap_err();
    assert_eq!(err.exit_code(), 58);
}

#[test]
fn call_and_return_restore_cursor() {
    let program = build(vec![
        (Opcode::Call, vec![op(OperandKind::Label, "sub")]),
        (Opcode::Write, vec![op(OperandKind::String, "after")]),
        (Opcode::Jump, vec![op(OperandKind::Label, "end")]),
        (Opcode::Label, vec![op(OperandKind::Label, "sub")]),
        (Opcode::Write, vec![op(OperandKind::String, "in-sub-")]),
        (Opcode::Return, vec![]),
        (Opcode::Label, vec![op(OperandKind::Label, "end")]),
    ]);
    let (mut engine, out, _err) = engine_with_input("");
    let code = run_with_engine(&mut engine, &program).unwrap();
    assert_eq!(code, 0);
    assert_eq!(stdout_of(&out), "in-sub-after");
}

#[test]
fn exit_terminates_with_given_status() {
    let program = build(vec![(Opcode::Exit, vec![op(OperandKind::Int, "21")])]);
    let (mut engine, _out, _err) = engine_with_input("");
    let code = run_with_engine(&mut engine, &program).unwrap();
    assert_eq!(code, 21);
}

#[test]
fn exit_out_of_range_is_invalid_value() {
    let program = build(vec![(Opcode::Exit, vec![op(OperandKind::Int, "50")])]);
    let (mut engine, _out, _err) = engine_with_input("");
    let err = run_with_engine(&mut engine, &program).unwrap_err();
    assert_eq!(err.exit_code(), 57);
}

#[test]
fn type_of_uninitialized_variable_is_empty_string() {
    let program = build(vec![
        (Opcode::DefVar, vec![var("GF@x")]),
        (Opcode::DefVar, vec![var("GF@t")]),
        (Opcode::Type, vec![var("GF@t"), var("GF@x")]),
        (Opcode::Write, vec![var("GF@t")]),
    ]);
    let (mut engine, out, _err) = engine_with_input("");
    run_with_engine(&mut engine, &program).unwrap();
    assert_eq!(stdout_of(&out), "");
}

#[test]
fn read_invalid_int_literal_yields_nil() {
    let program = build(vec![
        (Opcode::DefVar, vec![var("GF@x")]),
        (Opcode::Read, vec![var("GF@x"), op(OperandKind::Type, "int")]),
        (Opcode::Write, vec![var("GF@x")]),
    ]);
    let (mut engine, out, _err) = engine_with_input("not-a-number\n");
    run_with_engine(&mut engine, &program).unwrap();
    assert_eq!(stdout_of(&out), "");
}
