use fwrule::rule_file::ParseOptions;
use clap::{Args, Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[clap(name = "fwrule", about = "Parse firewall rules into their canonical structure")]
pub struct ProgramConfig {
    /// Path to a file containing one rule per line
    #[clap(long, env)]
    pub rules_file: Option<PathBuf>,

    /// Rules to parse, e.g. 'FROM any TO all vms ALLOW tcp PORT 22'
    #[clap(required_unless_present = "rules_file")]
    pub rules: Vec<String>,

    #[clap(flatten)]
    pub parser: ParserConfig,

    /// Output format
    #[clap(long, env, value_enum, ignore_case = true, default_value = "json")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, Args)]
pub struct ParserConfig {
    /// Maximum length of a single rule, in characters
    #[clap(long, env, default_value = "4096")]
    pub max_rule_length: usize,

    /// Report invalid rules and continue with the next one
    #[clap(long, env)]
    pub keep_going: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
#[allow(non_camel_case_types)]
pub enum OutputFormat {
    /// Canonical structure, one JSON document per line
    json,
    /// Canonical structure, pretty-printed JSON
    pretty,
    /// Normalized rule text
    text,
}

impl ProgramConfig {
    pub fn parse() -> Self {
        Parser::parse()
    }
}

impl From<ParserConfig> for ParseOptions {
    fn from(config: ParserConfig) -> Self {
        Self {
            max_rule_length: config.max_rule_length,
            keep_going: config.keep_going,
        }
    }
}
