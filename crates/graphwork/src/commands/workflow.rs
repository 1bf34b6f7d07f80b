//! Copy-transform command - copy a workbook template and rewrite its range.

use anyhow::{Result, anyhow};
use clap::Args;
use console::{Style, style};
use graphwork_client::{
    CopyTransformWorkflow, RangeTarget, Replace, VerifyPolicy, WorkflowConfig, WorkflowOutcome,
    WorkflowStep,
};
use graphwork_config::RangeSetting;

use super::{Context, print_json};

/// Arguments for the copy-transform command.
#[derive(Args, Debug)]
pub struct CopyTransformArgs {
    /// Folder holding the template (default: [site].source_folder)
    #[arg(long)]
    pub source: Option<String>,

    /// Folder receiving the copy (default: [site].destination_folder)
    #[arg(long)]
    pub destination: Option<String>,

    /// Text to replace in every cell
    #[arg(long, default_value = ".")]
    pub from: String,

    /// Replacement text
    #[arg(long, default_value = "...")]
    pub to: String,
}

/// Run the copy-transform command.
pub async fn run(args: CopyTransformArgs, ctx: &Context) -> Result<()> {
    let site = ctx.config.site_settings()?;
    let source = args
        .source
        .or(site.source_folder)
        .ok_or_else(|| anyhow!("no source folder: pass --source or set [site].source_folder"))?;
    let destination = args.destination.or(site.destination_folder).ok_or_else(|| {
        anyhow!("no destination folder: pass --destination or set [site].destination_folder")
    })?;

    let range = match site.range {
        RangeSetting::Table(name) => RangeTarget::Table(name),
        RangeSetting::Worksheet { sheet, address } => RangeTarget::Worksheet { sheet, address },
    };
    let config = WorkflowConfig::new(site.site_id, range).with_verify(VerifyPolicy::polling(
        site.verify_attempts,
        site.verify_interval,
    ));

    let token = ctx.delegated_token().await?;
    let client = ctx.client(token.audience().clone())?;
    let workflow = CopyTransformWorkflow::new(client, config);
    let rule = Replace::new(args.from, args.to);

    let outcome = match workflow
        .run_copy_transform(&token, &source, &destination, &rule)
        .await
    {
        Ok(outcome) => outcome,
        Err(failure) => {
            let copied = failure
                .last_completed
                .is_some_and(|step| step.index() >= WorkflowStep::Copy.index());
            if copied {
                tracing::warn!(
                    name = failure.state.destination_name.as_deref().unwrap_or("-"),
                    folder = %destination,
                    "copy was created but not fully transformed"
                );
            }
            return Err(failure.into());
        }
    };

    if ctx.json_output {
        return print_json(&outcome);
    }
    print_outcome(&outcome, &destination);
    Ok(())
}

fn print_outcome(outcome: &WorkflowOutcome, destination: &str) {
    let dim = Style::new().dim();
    let cells: usize = outcome.values.iter().map(Vec::len).sum();

    println!();
    println!("{}", style("Workbook Created").bold());
    println!("{}", dim.apply_to("─".repeat(40)));
    println!(
        "  {} {}/{}",
        dim.apply_to("Path:  "),
        destination.trim_end_matches('/'),
        style(&outcome.name).cyan()
    );
    println!("  {} {}", dim.apply_to("Item:  "), outcome.item_id);
    println!(
        "  {} {} rows, {} cells rewritten",
        dim.apply_to("Range: "),
        outcome.values.len(),
        cells
    );
    println!();
}
