//! # Program Structure and Loader
//!
//! This module validates an abstract program tree (built by
//! [`crate::xml`] from an XML document, but itself XML-agnostic) into an
//! [`Instruction`] vector plus a label table. The fixed opcode catalogue
//! and arity classes live here as the `Opcode` enum and [`Opcode::arity`],
//! a `match` over opcode names keyed case-insensitively rather than by a
//! numeric byte.

use std::collections::HashMap;

use crate::diagnostics::RuntimeError;

/// One opcode of the fixed IPPcode23 catalogue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Opcode {
    Move,
    CreateFrame,
    PushFrame,
    PopFrame,
    DefVar,
    Call,
    Return,
    Pushs,
    Pops,
    Clears,
    Add,
    Adds,
    Sub,
    Subs,
    Mul,
    Muls,
    Idiv,
    Idivs,
    Div,
    Divs,
    Lt,
    Lts,
    Gt,
    Gts,
    Eq,
    Eqs,
    And,
    Ands,
    Or,
    Ors,
    Not,
    Nots,
    Int2Char,
    Int2Chars,
    Int2Float,
    Int2Floats,
    Float2Int,
    Float2Ints,
    Stri2Int,
    Stri2Ints,
    Read,
    Write,
    Concat,
    Strlen,
    Getchar,
    Setchar,
    Type,
    Label,
    Jump,
    Jumpifeq,
    Jumpifeqs,
    Jumpifneq,
    Jumpifneqs,
    Exit,
    Dprint,
    Break,
}

impl Opcode {
    /// Parse an opcode name, case-insensitively, from the fixed catalogue.
    pub fn parse(s: &str) -> Option<Opcode> {
        let upper = s.to_ascii_uppercase();
        Some(match upper.as_str() {
            "MOVE" => Opcode::Move,
            "CREATEFRAME" => Opcode::CreateFrame,
            "PUSHFRAME" => Opcode::PushFrame,
            "POPFRAME" => Opcode::PopFrame,
            "DEFVAR" => Opcode::DefVar,
            "CALL" => Opcode::Call,
            "RETURN" => Opcode::Return,
            "PUSHS" => Opcode::Pushs,
            "POPS" => Opcode::Pops,
            "CLEARS" => Opcode::Clears,
            "ADD" => Opcode::Add,
            "ADDS" => Opcode::Adds,
            "SUB" => Opcode::Sub,
            "SUBS" => Opcode::Subs,
            "MUL" => Opcode::Mul,
            "MULS" => Opcode::Muls,
            "IDIV" => Opcode::Idiv,
            "IDIVS" => Opcode::Idivs,
            "DIV" => Opcode::Div,
            "DIVS" => Opcode::Divs,
            "LT" => Opcode::Lt,
            "LTS" => Opcode::Lts,
            "GT" => Opcode::Gt,
            "GTS" => Opcode::Gts,
            "EQ" => Opcode::Eq,
            "EQS" => Opcode::Eqs,
            "AND" => Opcode::And,
            "ANDS" => Opcode::Ands,
            "OR" => Opcode::Or,
            "ORS" => Opcode::Ors,
            "NOT" => Opcode::Not,
            "NOTS" => Opcode::Nots,
            "INT2CHAR" => Opcode::Int2Char,
            "INT2CHARS" => Opcode::Int2Chars,
            "INT2FLOAT" => Opcode::Int2Float,
            "INT2FLOATS" => Opcode::Int2Floats,
            "FLOAT2INT" => Opcode::Float2Int,
            "FLOAT2INTS" => Opcode::Float2Ints,
            "STRI2INT" => Opcode::Stri2Int,
            "STRI2INTS" => Opcode::Stri2Ints,
            "READ" => Opcode::Read,
            "WRITE" => Opcode::Write,
            "CONCAT" => Opcode::Concat,
            "STRLEN" => Opcode::Strlen,
            "GETCHAR" => Opcode::Getchar,
            "SETCHAR" => Opcode::Setchar,
            "TYPE" => Opcode::Type,
            "LABEL" => Opcode::Label,
            "JUMP" => Opcode::Jump,
            "JUMPIFEQ" => Opcode::Jumpifeq,
            "JUMPIFEQS" => Opcode::Jumpifeqs,
            "JUMPIFNEQ" => Opcode::Jumpifneq,
            "JUMPIFNEQS" => Opcode::Jumpifneqs,
            "EXIT" => Opcode::Exit,
            "DPRINT" => Opcode::Dprint,
            "BREAK" => Opcode::Break,
            _ => return None,
        })
    }

    /// The number of operands this opcode requires.
    pub fn arity(&self) -> usize {
        match self {
            Opcode::CreateFrame
            | Opcode::PushFrame
            | Opcode::PopFrame
            | Opcode::Return
            | Opcode::Break
            | Opcode::Clears
            | Opcode::Adds
            | Opcode::Subs
            | Opcode::Muls
            | Opcode::Idivs
            | Opcode::Divs
            | Opcode::Lts
            | Opcode::Gts
            | Opcode::Eqs
            | Opcode::Ands
            | Opcode::Ors
            | Opcode::Nots
            | Opcode::Int2Chars
            | Opcode::Int2Floats
            | Opcode::Float2Ints
            | Opcode::Stri2Ints => 0,

            Opcode::Call
            | Opcode::Label
            | Opcode::Jump
            | Opcode::Pushs
            | Opcode::Pops
            | Opcode::Exit
            | Opcode::Dprint
            | Opcode::Write
            | Opcode::DefVar
            | Opcode::Jumpifeqs
            | Opcode::Jumpifneqs => 1,

            Opcode::Move
            | Opcode::Int2Char
            | Opcode::Strlen
            | Opcode::Type
            | Opcode::Not
            | Opcode::Read
            | Opcode::Int2Float
            | Opcode::Float2Int => 2,

            Opcode::Add
            | Opcode::Sub
            | Opcode::Mul
            | Opcode::Idiv
            | Opcode::Div
            | Opcode::Lt
            | Opcode::Gt
            | Opcode::Eq
            | Opcode::And
            | Opcode::Or
            | Opcode::Stri2Int
            | Opcode::Concat
            | Opcode::Getchar
            | Opcode::Setchar
            | Opcode::Jumpifeq
            | Opcode::Jumpifneq => 3,
        }
    }
}

/// The declared literal kind of an operand (the XML `type` attribute).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperandKind {
    Var,
    Label,
    Nil,
    Int,
    Bool,
    String,
    Type,
    Float,
}

impl OperandKind {
    pub fn parse(s: &str) -> Option<OperandKind> {
        match s {
            "var" => Some(OperandKind::Var),
            "label" => Some(OperandKind::Label),
            "nil" => Some(OperandKind::Nil),
            "int" => Some(OperandKind::Int),
            "bool" => Some(OperandKind::Bool),
            "string" => Some(OperandKind::String),
            "type" => Some(OperandKind::Type),
            "float" => Some(OperandKind::Float),
            _ => None,
        }
    }
}

/// One operand: its declared kind and raw textual payload.
#[derive(Clone, Debug)]
pub struct Operand {
    pub kind: OperandKind,
    pub text: String,
}

/// A fully validated instruction: opcode, ordered operands, and its
/// original `order` attribute (kept for diagnostics only — execution uses
/// `index`, the zero-based position after sorting).
#[derive(Clone, Debug)]
pub struct Instruction {
    pub opcode: Opcode,
    pub operands: Vec<Operand>,
    pub order: u64,
    pub index: usize,
}

/// A validated program: the re-indexed instruction vector plus the label
/// table built from every `LABEL` instruction.
pub struct Program {
    pub instructions: Vec<Instruction>,
    pub labels: HashMap<String, usize>,
}

/// One `<argK>` child as seen by the XML-agnostic loader: its tag name
/// (`arg1`, `arg2`, ...), declared `type` attribute, and text payload.
/// Built by [`crate::xml`] from the real document.
pub struct RawOperand {
    pub tag: String,
    pub type_attr: Option<String>,
    pub text: Option<String>,
}

/// One `<instruction>` element as seen by the loader.
pub struct RawInstruction {
    pub order: Option<String>,
    pub opcode: Option<String>,
    pub tag: String,
    pub operands: Vec<RawOperand>,
}

/// The whole program tree as seen by the loader: root attributes plus the
/// ordered list of instruction elements in document order.
pub struct RawProgram {
    pub language: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub root_attrs: Vec<String>,
    pub instructions: Vec<RawInstruction>,
}

const ALLOWED_ROOT_ATTRS: [&str; 3] = ["name", "description", "language"];

/// Validate a [`RawProgram`] into a [`Program`]. Every
/// failure here is *invalid-structure* (32), except duplicate label
/// definitions, which are *semantic-error* (52).
pub fn load(raw: RawProgram) -> Result<Program, RuntimeError> {
    for attr in &raw.root_attrs {
        if !ALLOWED_ROOT_ATTRS.contains(&attr.as_str()) {
            return Err(RuntimeError::InvalidStructure(format!(
                "unexpected root attribute '{}'",
                attr
            )));
        }
    }
    match &raw.language {
        Some(lang) if lang.eq_ignore_ascii_case("ippcode23") => {}
        Some(lang) => {
            return Err(RuntimeError::InvalidStructure(format!(
                "unsupported language '{}'",
                lang
            )))
        }
        None => return Err(RuntimeError::InvalidStructure("missing language attribute".to_string())),
    }

    let mut seen_orders: HashMap<u64, ()> = HashMap::new();
    let mut parsed: Vec<(u64, Instruction)> = Vec::with_capacity(raw.instructions.len());

    for raw_instr in raw.instructions {
        if raw_instr.tag != "instruction" {
            return Err(RuntimeError::InvalidStructure(format!(
                "unexpected element '{}' at program top level",
                raw_instr.tag
            )));
        }

        let order_str = raw_instr
            .order
            .ok_or_else(|| RuntimeError::InvalidStructure("instruction missing 'order' attribute".to_string()))?;
        let order: u64 = order_str
            .parse()
            .ok()
            .filter(|o| *o >= 1)
            .ok_or_else(|| RuntimeError::InvalidStructure(format!("invalid order '{}'", order_str)))?;
        if seen_orders.insert(order, ()).is_some() {
            return Err(RuntimeError::InvalidStructure(format!("duplicate order '{}'", order)));
        }

        let opcode_str = raw_instr
            .opcode
            .ok_or_else(|| RuntimeError::InvalidStructure("instruction missing 'opcode' attribute".to_string()))?;
        let opcode = Opcode::parse(&opcode_str)
            .ok_or_else(|| RuntimeError::InvalidStructure(format!("unknown opcode '{}'", opcode_str)))?;

        let operands = load_operands(raw_instr.operands, opcode)?;

        parsed.push((
            order,
            Instruction {
                opcode,
                operands,
                order,
                index: 0,
            },
        ));
    }

    parsed.sort_by_key(|(order, _)| *order);

    let mut instructions: Vec<Instruction> = Vec::with_capacity(parsed.len());
    let mut labels: HashMap<String, usize> = HashMap::new();
    for (index, (_, mut instr)) in parsed.into_iter().enumerate() {
        instr.index = index;
        if instr.opcode == Opcode::Label {
            let name = instr.operands[0].text.clone();
            if labels.insert(name.clone(), index).is_some() {
                return Err(RuntimeError::SemanticError(format!("label '{}' redefined", name)));
            }
        }
        instructions.push(instr);
    }

    Ok(Program { instructions, labels })
}

fn load_operands(raw_operands: Vec<RawOperand>, opcode: Opcode) -> Result<Vec<Operand>, RuntimeError> {
    let expected = opcode.arity();
    if raw_operands.len() != expected {
        return Err(RuntimeError::InvalidStructure(format!(
            "opcode expects {} operand(s), found {}",
            expected,
            raw_operands.len()
        )));
    }

    // Order by the numeric suffix of the tag (arg1, arg2, ...), regardless
    // of document order.
    let mut indexed: Vec<(u32, RawOperand)> = Vec::with_capacity(raw_operands.len());
    for raw in raw_operands {
        let suffix = raw
            .tag
            .strip_prefix("arg")
            .and_then(|rest| rest.parse::<u32>().ok())
            .filter(|n| *n >= 1)
            .ok_or_else(|| RuntimeError::InvalidStructure(format!("unexpected operand tag '{}'", raw.tag)))?;
        indexed.push((suffix, raw));
    }
    indexed.sort_by_key(|(suffix, _)| *suffix);

    let expected_suffixes: Vec<u32> = (1..=indexed.len() as u32).collect();
    let actual_suffixes: Vec<u32> = indexed.iter().map(|(s, _)| *s).collect();
    if actual_suffixes != expected_suffixes {
        return Err(RuntimeError::InvalidStructure(
            "operand tags are not a contiguous arg1..argN sequence".to_string(),
        ));
    }

    let mut operands = Vec::with_capacity(indexed.len());
    for (_, raw) in indexed {
        let type_str = raw
            .type_attr
            .ok_or_else(|| RuntimeError::InvalidStructure("operand missing 'type' attribute".to_string()))?;
        let kind = OperandKind::parse(&type_str)
            .ok_or_else(|| RuntimeError::InvalidStructure(format!("unknown operand type '{}'", type_str)))?;
        let text = raw.text.unwrap_or_default();
        if kind == OperandKind::Type && crate::value::TypeTag::parse(&text).is_none() {
            return Err(RuntimeError::InvalidStructure(format!(
                "invalid type literal '{}'",
                text
            )));
        }
        operands.push(Operand { kind, text });
    }

    Ok(operands)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_instr(order: &str, opcode: &str, operands: Vec<(&str, &str, &str)>) -> RawInstruction {
        RawInstruction {
            order: Some(order.to_string()),
            opcode: Some(opcode.to_string()),
            tag: "instruction".to_string(),
            operands: operands
                .into_iter()
                .map(|(tag, ty, text)| RawOperand {
                    tag: tag.to_string(),
                    type_attr: Some(ty.to_string()),
                    text: Some(text.to_string()),
                })
                .collect(),
        }
    }

    fn base_program(instructions: Vec<RawInstruction>) -> RawProgram {
        RawProgram {
            language: Some("IPPcode23".to_string()),
            name: None,
            description: None,
            root_attrs: vec!["language".to_string()],
            instructions,
        }
    }

    #[test]
    fn sorts_by_order_and_reindexes() {
        let raw = base_program(vec![
            raw_instr("2", "WRITE", vec![("arg1", "string", "b")]),
            raw_instr("1", "WRITE", vec![("arg1", "string", "a")]),
        ]);
        let program = load(raw).unwrap();
        assert_eq!(program.instructions[0].operands[0].text, "a");
        assert_eq!(program.instructions[0].index, 0);
        assert_eq!(program.instructions[1].index, 1);
    }

    #[test]
    fn wrong_arity_is_invalid_structure() {
        let raw = base_program(vec![raw_instr("1", "ADD", vec![("arg1", "var", "GF@x")])]);
        assert!(matches!(load(raw), Err(RuntimeError::InvalidStructure(_))));
    }

    #[test]
    fn duplicate_label_is_semantic_error() {
        let raw = base_program(vec![
            raw_instr("1", "LABEL", vec![("arg1", "label", "x")]),
            raw_instr("2", "LABEL", vec![("arg1", "label", "x")]),
        ]);
        assert!(matches!(load(raw), Err(RuntimeError::SemanticError(_))));
    }

    #[test]
    fn non_ippcode23_language_is_invalid_structure() {
        let mut raw = base_program(vec![]);
        raw.language = Some("other".to_string());
        assert!(matches!(load(raw), Err(RuntimeError::InvalidStructure(_))));
    }
}
