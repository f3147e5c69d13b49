//! Reading rules in bulk: one rule per line, blank lines and `#` comment lines skipped.

use crate::parser::{parse, RuleError};
use crate::rule::Rule;
use anyhow::{bail, Context};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

#[derive(Debug, Clone, Copy)]
pub struct ParseOptions {
    /// Rules longer than this many characters are rejected without being parsed
    pub max_rule_length: usize,

    /// Log invalid rules and continue instead of stopping at the first one
    pub keep_going: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_rule_length: 4096,
            keep_going: false,
        }
    }
}

#[derive(Debug)]
pub struct ParsedRule {
    /// 1-based line number, or argument index for rules given on the command line
    pub line_number: usize,
    pub rule: Rule,
}

#[derive(Debug, Default)]
pub struct ParseSummary {
    pub rules: Vec<ParsedRule>,
    pub failed: usize,
}

pub fn parse_file(file_path: &Path, options: ParseOptions) -> anyhow::Result<ParseSummary> {
    let file = File::open(file_path)?;
    parse_input(BufReader::new(file), options)
}

pub fn parse_input(reader: impl BufRead, options: ParseOptions) -> anyhow::Result<ParseSummary> {
    let mut lines = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read line {}", index + 1))?;
        lines.push(line);
    }

    parse_lines(lines.iter().map(String::as_str), options)
}

/// Parse each non-comment entry of `lines`; entries are numbered from 1
pub fn parse_lines<'a>(
    lines: impl IntoIterator<Item = &'a str>,
    options: ParseOptions,
) -> anyhow::Result<ParseSummary> {
    let mut summary = ParseSummary::default();

    for (index, line) in lines.into_iter().enumerate() {
        let line_number = index + 1;
        let text = line.trim();

        if text.is_empty() || text.starts_with('#') {
            // This is a comment or empty line
            continue;
        }

        match process_line(text, options) {
            Ok(rule) => {
                log::debug!("Line {}: {}", line_number, rule);
                summary.rules.push(ParsedRule {
                    line_number,
                    rule,
                });
            }
            Err(e) if options.keep_going => {
                log::warn!("Skipping invalid rule on line {}: {:#}", line_number, e);
                summary.failed += 1;
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to parse rule on line {}", line_number))
            }
        }
    }

    log::info!(
        "Parsed {} rule(s), {} invalid",
        summary.rules.len(),
        summary.failed
    );

    Ok(summary)
}

fn process_line(text: &str, options: ParseOptions) -> anyhow::Result<Rule> {
    let length = text.chars().count();
    if length > options.max_rule_length {
        bail!(
            "Rule is {} characters long, exceeding the limit of {}",
            length,
            options.max_rule_length
        );
    }

    parse(text).map_err(|e| {
        let diagnostic = diagnostic(text, &e);
        anyhow::Error::new(e).context(diagnostic)
    })
}

/// The rule text with a caret under the position at which parsing failed.
///
/// Tabs before the position are kept so the caret lines up; every other character
/// counts as one column, so wide characters shift the caret left.
pub fn diagnostic(text: &str, error: &RuleError) -> String {
    let indent = text
        .chars()
        .take(error.position())
        .map(|c| if c == '\t' { '\t' } else { ' ' })
        .collect::<String>();
    format!("{}\n{}^", text, indent)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::rule::{Action, Endpoint, Wildcard};

    fn parse(input: &str) -> ParseSummary {
        parse_input(input.as_bytes(), ParseOptions::default()).unwrap()
    }

    #[test]
    fn exhaustive_example() {
        let input = r#"
# Web tier
FROM any TO tag role = web ALLOW tcp (PORT 80 AND PORT 443)
   FROM tag role = web TO tag role = db ALLOW tcp PORT 5432

    # Monitoring
FROM subnet 10.8.0.0/16 TO all vms ALLOW icmp type 8
FROM all vms TO ip 8.8.8.8 BLOCK udp PORT 53
"#;
        let summary = parse(input);

        assert_eq!(summary.failed, 0);
        assert_eq!(
            summary
                .rules
                .iter()
                .map(|r| r.line_number)
                .collect::<Vec<_>>(),
            vec![3, 4, 7, 8]
        );
        assert_eq!(summary.rules[1].rule.to.len(), 1);
        assert_eq!(
            summary.rules[3].rule.from,
            vec![Endpoint::Wildcard(Wildcard::AllVms)]
        );
        assert_eq!(summary.rules[3].rule.action, Action::Block);
    }

    #[test]
    fn quoted_hash_is_not_a_comment() {
        let summary = parse(r##"FROM tag "#1" TO any ALLOW tcp PORT 22"##);
        assert_eq!(
            summary.rules[0].rule.from,
            vec![Endpoint::Tag {
                name: "#1".to_string(),
                value: None
            }]
        );
    }

    #[test]
    #[should_panic(expected = "Failed to parse rule on line 2")]
    fn invalid_rule_reports_line() {
        parse("FROM any TO any ALLOW tcp PORT 80\nFROM any ALLOW tcp PORT 80");
    }

    #[test]
    #[should_panic(expected = "Unexpected token at position 9: expected keyword TO")]
    fn invalid_rule_reports_position() {
        parse("FROM any ALLOW tcp PORT 80");
    }

    #[test]
    #[should_panic(expected = "exceeding the limit of 10")]
    fn rule_too_long() {
        let options = ParseOptions {
            max_rule_length: 10,
            keep_going: false,
        };
        parse_input("FROM any TO any ALLOW tcp PORT 80".as_bytes(), options).unwrap();
    }

    #[test]
    fn keep_going_counts_failures() {
        let options = ParseOptions {
            keep_going: true,
            ..Default::default()
        };
        let summary = parse_lines(
            [
                "FROM any TO any ALLOW tcp PORT 80",
                "FROM any TO any ALLOW tcp PORT 0",
                "FROM tag \"open TO any ALLOW tcp PORT 80",
                "FROM any TO any BLOCK udp PORT 53",
            ],
            options,
        )
        .unwrap();

        assert_eq!(summary.failed, 2);
        assert_eq!(
            summary
                .rules
                .iter()
                .map(|r| r.line_number)
                .collect::<Vec<_>>(),
            vec![1, 4]
        );
    }

    #[test]
    fn diagnostic_points_at_position() {
        let text = "FROM any ALLOW tcp PORT 80";
        let error = crate::parser::parse(text).unwrap_err();
        assert_eq!(
            diagnostic(text, &error),
            "FROM any ALLOW tcp PORT 80\n         ^"
        );
    }

    #[test]
    fn diagnostic_keeps_tabs() {
        let text = "FROM\tany\tALLOW tcp PORT 80";
        let error = crate::parser::parse(text).unwrap_err();
        assert_eq!(error.position(), 9);
        assert_eq!(
            diagnostic(text, &error),
            "FROM\tany\tALLOW tcp PORT 80\n    \t   \t^"
        );
    }
}
