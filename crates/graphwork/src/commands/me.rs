//! Me command - profile of the signed-in user.

use anyhow::Result;
use clap::Args;
use console::{Style, style};

use super::{Context, print_json};

/// Arguments for the me command.
#[derive(Args, Debug)]
pub struct MeArgs {}

/// Run the me command.
pub async fn run(_args: MeArgs, ctx: &Context) -> Result<()> {
    let token = ctx.delegated_token().await?;
    let client = ctx.client(token.audience().clone())?;
    let profile = client.users().me(&token).await?;

    if ctx.json_output {
        return print_json(&profile);
    }

    let dim = Style::new().dim();
    let none = || "-".to_string();
    println!();
    println!(
        "{}",
        style(profile.display_name.clone().unwrap_or_else(none)).bold()
    );
    println!("{}", dim.apply_to("─".repeat(40)));
    println!("  {} {}", dim.apply_to("Id:       "), profile.id);
    println!(
        "  {} {}",
        dim.apply_to("Principal:"),
        profile.user_principal_name.unwrap_or_else(none)
    );
    println!(
        "  {} {}",
        dim.apply_to("Mail:     "),
        profile.mail.unwrap_or_else(none)
    );
    if let Some(title) = profile.job_title {
        println!("  {} {}", dim.apply_to("Title:    "), title);
    }
    println!();

    Ok(())
}
