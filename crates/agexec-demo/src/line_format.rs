//! A minimal line-based `TextFormat`: a model reply is either
//! `tool: <name> <rest>` or `answer: <rest>`. Anything else fails to parse.

use std::collections::HashMap;

use agexec_core::types::ParseErrorKind;
use agexec_engine::{ParseFailure, ParsedSections, TextFormat};

#[derive(Default)]
pub struct LineFormat;

impl TextFormat for LineFormat {
    fn register_section(&mut self, _section: &str) {}

    fn describe_structure(&self) -> String {
        "one line, either \"tool: <name> <args>\" or \"answer: <text>\"".to_string()
    }

    fn parse(&self, text: &str) -> Result<ParsedSections, ParseFailure> {
        let line = text.trim();
        let (section, rest) = match line.split_once(':') {
            Some((s, r)) => (s.trim(), r.trim()),
            None => {
                return Err(ParseFailure {
                    kind: ParseErrorKind::Format,
                    raw_text: text.to_string(),
                    message: "expected \"<section>: <content>\"".to_string(),
                })
            }
        };
        match section {
            "tool" | "answer" => {
                let mut sections = HashMap::new();
                sections.insert(section.to_string(), vec![rest.to_string()]);
                Ok(ParsedSections(sections))
            }
            other => Err(ParseFailure {
                kind: ParseErrorKind::Format,
                raw_text: text.to_string(),
                message: format!("unknown section \"{other}\""),
            }),
        }
    }

    fn format_section(&self, name: &str, body: &str) -> String {
        format!("{name}: {body}")
    }
}
