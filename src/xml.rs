//! # XML Boundary Adapter
//!
//! Parses an XML document into the abstract [`crate::program::RawProgram`]
//! the loader validates. This is the one module in the crate that depends
//! on `roxmltree`, the sole third-party dependency — confined here so the
//! rest of the interpreter stays format-agnostic and only ever sees
//! [`crate::program::RawProgram`].
//!
//! A malformed XML document (`roxmltree::Error`) is *invalid-xml* (31), a
//! category distinct from *invalid-structure* (32), which the loader raises
//! for a well-formed document that violates the program shape.

use crate::diagnostics::RuntimeError;
use crate::program::{RawInstruction, RawOperand, RawProgram};

/// Parse `xml` into a [`RawProgram`] ready for [`crate::program::load`].
pub fn parse(xml: &str) -> Result<RawProgram, RuntimeError> {
    let doc = roxmltree::Document::parse(xml).map_err(|e| RuntimeError::InvalidXml(e.to_string()))?;
    let root = doc.root_element();

    let root_attrs: Vec<String> = root.attributes().map(|a| a.name().to_string()).collect();
    let language = root.attribute("language").map(|s| s.to_string());
    let name = root.attribute("name").map(|s| s.to_string());
    let description = root.attribute("description").map(|s| s.to_string());

    let mut instructions = Vec::new();
    for child in root.children().filter(|n| n.is_element()) {
        let tag = child.tag_name().name().to_string();
        let order = child.attribute("order").map(|s| s.to_string());
        let opcode = child.attribute("opcode").map(|s| s.to_string());

        let mut operands = Vec::new();
        for arg in child.children().filter(|n| n.is_element()) {
            operands.push(RawOperand {
                tag: arg.tag_name().name().to_string(),
                type_attr: arg.attribute("type").map(|s| s.to_string()),
                text: arg.text().map(|s| s.to_string()),
            });
        }

        instructions.push(RawInstruction {
            order,
            opcode,
            tag,
            operands,
        });
    }

    Ok(RawProgram {
        language,
        name,
        description,
        root_attrs,
        instructions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_program() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
            <program language="IPPcode23">
                <instruction order="1" opcode="WRITE">
                    <arg1 type="string">hello</arg1>
                </instruction>
            </program>"#;
        let raw = parse(xml).unwrap();
        assert_eq!(raw.language.as_deref(), Some("IPPcode23"));
        assert_eq!(raw.instructions.len(), 1);
        assert_eq!(raw.instructions[0].opcode.as_deref(), Some("WRITE"));
        assert_eq!(raw.instructions[0].operands[0].text.as_deref(), Some("hello"));
    }

    #[test]
    fn malformed_xml_is_invalid_xml() {
        let err = parse("<program><unterminated>").unwrap_err();
        assert!(matches!(err, RuntimeError::InvalidXml(_)));
    }

    #[test]
    fn empty_text_operand_becomes_none() {
        let xml = r#"<program language="IPPcode23">
            <instruction order="1" opcode="WRITE"><arg1 type="string"></arg1></instruction>
        </program>"#;
        let raw = parse(xml).unwrap();
        assert_eq!(raw.instructions[0].operands[0].text, None);
    }
}
