//! Help-text parsing
//!
//! Hammer prints help as free-form sections. Only the `Options:` and
//! `Subcommands:` sections matter here:
//!
//! ```text
//! Subcommands:
//!  activation-key, ak   Manipulate activation keys
//!
//! Options:
//!  -h, --help                    Print help
//!  --organization-id ORG_ID      Organization ID
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::OnceLock;

/// An option or subcommand as declared in help text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelpEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default)]
    pub help: String,
}

/// Structured result for the help of one command
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedHelp {
    pub options: Vec<HelpEntry>,
    pub subcommands: Vec<HelpEntry>,
}

impl ParsedHelp {
    pub fn option_names(&self) -> BTreeSet<String> {
        self.options.iter().map(|o| o.name.clone()).collect()
    }

    /// Subcommand names in declaration order
    pub fn subcommand_names(&self) -> Vec<String> {
        self.subcommands.iter().map(|s| s.name.clone()).collect()
    }
}

/// Turns the help lines of a single command into options and subcommands
pub trait HelpParser {
    fn parse(&self, lines: &[&str]) -> ParsedHelp;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Options,
    Subcommands,
}

fn option_pattern() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^ {1,2}(?:-\w, +)?--(?P<name>[\w-]+)(?:, +--(?P<alias>[\w-]+))?(?:[ =\[]\S.*?)?(?: {2,}(?P<help>\S.*))?$",
        )
        .ok()
    })
    .as_ref()
}

fn subcommand_pattern() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^ {1,2}(?P<name>[\w-]+)(?:, +(?P<alias>[\w-]+))?(?: {2,}(?P<help>\S.*))?$").ok()
    })
    .as_ref()
}

/// Parser for hammer's help layout
#[derive(Debug, Clone, Copy)]
pub struct HammerHelpParser;

impl HammerHelpParser {
    pub fn new() -> Self {
        Self
    }

    fn entry(re: Option<&Regex>, line: &str) -> Option<HelpEntry> {
        let caps = re?.captures(line)?;
        Some(HelpEntry {
            name: caps.name("name")?.as_str().to_string(),
            alias: caps.name("alias").map(|m| m.as_str().to_string()),
            help: caps
                .name("help")
                .map(|m| m.as_str().trim().to_string())
                .unwrap_or_default(),
        })
    }
}

impl Default for HammerHelpParser {
    fn default() -> Self {
        Self::new()
    }
}

impl HelpParser for HammerHelpParser {
    fn parse(&self, lines: &[&str]) -> ParsedHelp {
        let mut parsed = ParsedHelp::default();
        let mut section = None;

        for line in lines {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                section = None;
                continue;
            }
            if trimmed.contains("Subcommands:") {
                section = Some(Section::Subcommands);
                continue;
            }
            if trimmed.contains("Options:") {
                section = Some(Section::Options);
                continue;
            }

            // Lines that don't match are wrapped descriptions
            match section {
                Some(Section::Options) => {
                    if let Some(entry) = Self::entry(option_pattern(), line) {
                        parsed.options.push(entry);
                    }
                }
                Some(Section::Subcommands) => {
                    if let Some(entry) = Self::entry(subcommand_pattern(), line) {
                        parsed.subcommands.push(entry);
                    }
                }
                None => {}
            }
        }

        parsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    const ORG_HELP: &str = "\
Usage:
    hammer organization [OPTIONS] SUBCOMMAND [ARG] ...

Parameters:
 SUBCOMMAND                    Subcommand
 [ARG] ...                     Subcommand arguments

Subcommands:
 add-domain                    Associate a domain
 create                        Create an organization
 list, index                   List all organizations
                               including hidden ones

Options:
 -h, --help                    Print help
 --organization-id ORG_ID      Organization ID
                               deprecated: use --id
 --name, --name-label VALUE    Name
";

    fn parse(text: &str) -> ParsedHelp {
        let lines: Vec<&str> = text.lines().collect();
        HammerHelpParser::new().parse(&lines)
    }

    #[test]
    fn test_parse_sections() {
        let parsed = parse(ORG_HELP);
        assert_eq!(parsed.subcommand_names(), vec!["add-domain", "create", "list"]);
        assert_eq!(parsed.subcommands[2].alias.as_deref(), Some("index"));
        assert_eq!(
            parsed.option_names().into_iter().collect::<Vec<_>>(),
            vec!["help", "name", "organization-id"]
        );
    }

    #[test]
    fn test_lines_outside_sections_are_ignored() {
        let parsed = parse(ORG_HELP);
        assert!(parsed.subcommands.iter().all(|s| s.name != "SUBCOMMAND"));
        assert!(parsed.subcommands.iter().all(|s| s.name != "including"));
    }

    #[test_case(" -h, --help                    Print help", "help" ; "short and long")]
    #[test_case(" --location-id LOCATION_ID     Location", "location-id" ; "with value")]
    #[test_case(" --interactive                 Ask questions", "interactive" ; "flag")]
    #[test_case(" --fields LIST  Fields", "fields" ; "narrow columns")]
    #[test_case(" --organization[-id|-title] VALUE  Organization", "organization" ; "bracketed forms")]
    fn test_option_line(line: &str, expected: &str) {
        let parsed = HammerHelpParser::new().parse(&["Options:", line]);
        assert_eq!(parsed.options.len(), 1, "line {line:?} should parse");
        assert_eq!(parsed.options[0].name, expected);
    }

    #[test]
    fn test_blank_line_closes_section() {
        let parsed = HammerHelpParser::new().parse(&["Options:", " --a  A", "", " --b  B"]);
        assert_eq!(parsed.option_names().into_iter().collect::<Vec<_>>(), vec!["a"]);
    }

    #[test]
    fn test_shipped_patterns_compile() {
        assert!(option_pattern().is_some());
        assert!(subcommand_pattern().is_some());
    }

    #[test]
    fn test_section_header_anywhere_in_line() {
        let parsed = HammerHelpParser::new().parse(&[
            "Global Options: (apply to every command)",
            " --verbose                     Be verbose",
            "",
            "Available Subcommands: (2)",
            " info                          Show details",
            " list, index                   List entries",
        ]);
        assert_eq!(parsed.option_names().into_iter().collect::<Vec<_>>(), vec!["verbose"]);
        assert_eq!(parsed.subcommand_names(), vec!["info", "list"]);
    }
}
