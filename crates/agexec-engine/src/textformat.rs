//! The `TextFormat` collaborator (spec §6) — the concrete codec (XML/JSON/
//! YAML) is out of scope; this is the narrow shape the agent loop parses
//! model output through.

use std::collections::HashMap;

use agexec_core::types::ParseErrorKind;

/// Sections parsed out of a model response, keyed by section name.
#[derive(Clone, Debug, Default)]
pub struct ParsedSections(pub HashMap<String, Vec<String>>);

#[derive(Clone, Debug)]
pub struct ParseFailure {
    pub kind: ParseErrorKind,
    pub raw_text: String,
    pub message: String,
}

pub trait TextFormat: Send + Sync {
    fn register_section(&mut self, section: &str);
    fn describe_structure(&self) -> String;
    fn parse(&self, text: &str) -> Result<ParsedSections, ParseFailure>;
    fn format_section(&self, name: &str, body: &str) -> String;
}
