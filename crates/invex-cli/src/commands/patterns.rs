//! Patterns command - inspect the active extraction rules and service catalog.

use std::fs;
use std::path::PathBuf;

use clap::Args;
use console::style;

use invex_core::invoice::{FieldExtractor, RuleOutcome};
use invex_core::models::pattern::FieldType;
use invex_core::PatternRegistry;

use super::{load_config, load_registry};

/// Arguments for the patterns command.
#[derive(Args)]
pub struct PatternsArgs {
    /// Only show rules for this field (e.g., "code_no")
    #[arg(long, value_parser = parse_field)]
    field: Option<FieldType>,

    /// Evaluate the rules against this text file
    #[arg(long)]
    against: Option<PathBuf>,

    /// Skip the service template listing
    #[arg(long)]
    no_templates: bool,
}

fn parse_field(s: &str) -> Result<FieldType, String> {
    s.parse()
}

pub async fn run(args: PatternsArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let registry = load_registry(&config);

    let fields: Vec<FieldType> = match args.field {
        Some(field) => vec![field],
        None => FieldType::ALL.to_vec(),
    };

    match &args.against {
        Some(path) => {
            let text = fs::read_to_string(path)?;
            explain_rules(&registry, &fields, &text);
        }
        None => list_rules(&registry, &fields),
    }

    if !args.no_templates && args.field.is_none() {
        list_templates(&registry);
    }

    Ok(())
}

fn list_rules(registry: &PatternRegistry, fields: &[FieldType]) {
    for field in fields {
        println!(
            "{} ({})",
            style(field).bold(),
            registry.rules_source(*field)
        );

        for compiled in registry.rules_for(*field) {
            let rule = compiled.rule();
            let marker = if compiled.is_valid() {
                style("✓").green()
            } else {
                style("✗").red()
            };
            println!(
                "  {} [{:>3}] {} (group {}): {}",
                marker,
                rule.priority,
                rule.name,
                rule.capture_index,
                rule.pattern
            );
        }
    }
}

fn explain_rules(registry: &PatternRegistry, fields: &[FieldType], text: &str) {
    let extractor = FieldExtractor::new(registry);

    for field in fields {
        let outcomes = extractor.explain(text, *field);
        let winner = outcomes.iter().find_map(|(_, outcome)| match outcome {
            RuleOutcome::Matched(value) => Some(value.as_str()),
            _ => None,
        });

        match winner {
            Some(value) => println!("{} = {}", style(field).bold(), style(value).green()),
            None => println!("{} = {}", style(field).bold(), style("-").dim()),
        }

        for (name, outcome) in &outcomes {
            match outcome {
                RuleOutcome::Matched(value) => println!("  {} {}: {:?}", style("✓").green(), name, value),
                RuleOutcome::NoMatch => println!("  {} {}", style("·").dim(), name),
                RuleOutcome::RuleError(reason) => {
                    println!("  {} {}: {}", style("✗").red(), name, reason)
                }
            }
        }
    }
}

fn list_templates(registry: &PatternRegistry) {
    println!();
    println!(
        "{} ({})",
        style("Service templates").bold(),
        registry.template_source()
    );

    for template in registry.templates() {
        println!(
            "  {} ~{} min [{:?}]: {}",
            template.name,
            template.estimated_minutes,
            template.service_category,
            template.keywords.join(", ")
        );
    }
}
