mod program_config;

use crate::program_config::{OutputFormat, ProgramConfig};
use anyhow::{bail, Context};
use env_logger::Env;
use fwrule::rule_file::{self, ParseOptions, ParseSummary};
use std::io::Write;

fn main() -> anyhow::Result<()> {
    // Parse options
    let config = ProgramConfig::parse();

    // Set up logging
    env_logger::Builder::from_env(Env::default().default_filter_or(if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }))
    .format_timestamp(None)
    .format_module_path(false)
    .init();

    run(config)
}

fn run(config: ProgramConfig) -> anyhow::Result<()> {
    let options = ParseOptions::from(config.parser);
    let mut summaries = Vec::new();

    if let Some(rules_file) = &config.rules_file {
        let summary = rule_file::parse_file(rules_file, options).with_context(|| {
            format!("Failed to parse rules file at '{}'", rules_file.display())
        })?;
        summaries.push(summary);
    }

    if !config.rules.is_empty() {
        let summary = rule_file::parse_lines(config.rules.iter().map(String::as_str), options)
            .context("Failed to parse rules given as arguments")?;
        summaries.push(summary);
    }

    let mut stdout = std::io::stdout().lock();
    for summary in &summaries {
        write_summary(&mut stdout, summary, config.format)?;
    }
    stdout.flush()?;

    let failed = summaries.iter().map(|s| s.failed).sum::<usize>();
    if failed > 0 {
        bail!("{} invalid rule(s)", failed);
    }

    Ok(())
}

fn write_summary(
    out: &mut impl Write,
    summary: &ParseSummary,
    format: OutputFormat,
) -> anyhow::Result<()> {
    for parsed in &summary.rules {
        match format {
            OutputFormat::json => writeln!(out, "{}", serde_json::to_string(&parsed.rule)?)?,
            OutputFormat::pretty => {
                writeln!(out, "{}", serde_json::to_string_pretty(&parsed.rule)?)?
            }
            OutputFormat::text => writeln!(out, "{}", parsed.rule)?,
        }
    }

    Ok(())
}
