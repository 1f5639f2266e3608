use std::io::{self, Write};

use anyhow::Result;

use crate::cli::RulesArgs;
use crate::model::RuleEntry;
use crate::rules::{DEFAULT_RULE, OverlayStrategy, RULES};
use crate::util::write_json_stdout;

pub fn run(args: RulesArgs) -> Result<()> {
    let entries = rule_entries();

    if args.json {
        return write_json_stdout(&entries);
    }

    let mut output = io::BufWriter::new(io::stdout().lock());
    for entry in &entries {
        writeln!(
            output,
            "{}{} {:<10} {:<12} {}",
            entry.index,
            if entry.default { "*" } else { " " },
            entry.name,
            entry.overlay_strategy,
            entry.key_expression
        )?;
    }
    output.flush()?;
    Ok(())
}

fn rule_entries() -> Vec<RuleEntry> {
    RULES
        .iter()
        .enumerate()
        .map(|(index, rule)| RuleEntry {
            index,
            name: rule.name.to_string(),
            key_expression: rule.key_expression.to_string(),
            overlay_strategy: match rule.overlay {
                OverlayStrategy::Prefix => "prefix".to_string(),
                OverlayStrategy::FixedOffset { delimiter, width } => {
                    format!("offset({delimiter},{width})")
                }
            },
            default: rule.name == DEFAULT_RULE,
        })
        .collect()
}
