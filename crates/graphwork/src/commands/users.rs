//! Users command - enumerate every user in the tenant through paging.

use anyhow::Result;
use clap::Args;
use console::style;
use futures::StreamExt;
use serde::Serialize;

use super::{Context, print_json};

/// Arguments for the users command.
#[derive(Args, Debug)]
pub struct UsersArgs {
    /// Users requested per page
    #[arg(long, default_value_t = 100)]
    pub page_size: u32,

    /// Print each user, not just the total
    #[arg(short, long)]
    pub list: bool,
}

#[derive(Debug, Serialize)]
struct UsersOutput {
    total: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    users: Vec<UserLine>,
}

#[derive(Debug, Serialize)]
struct UserLine {
    id: Option<String>,
    display_name: Option<String>,
}

/// Run the users command.
///
/// Uses the application flow; listing users needs `User.Read.All` granted to
/// the app registration.
pub async fn run(args: UsersArgs, ctx: &Context) -> Result<()> {
    let credential = ctx.app_credential()?;
    let token = ctx.acquire(&credential).await?;
    let client = ctx.client(token.audience().clone())?;

    let users = client.users();
    let stream = users.list(&token, args.page_size);
    futures::pin_mut!(stream);

    let mut total = 0usize;
    let mut lines = Vec::new();
    while let Some(user) = stream.next().await {
        let user = user?;
        total += 1;
        if args.list {
            let line = UserLine {
                id: user.id().map(str::to_string),
                display_name: user.get_str("displayName").map(str::to_string),
            };
            if !ctx.json_output {
                println!(
                    "{}  {}",
                    style(line.id.as_deref().unwrap_or("-")).dim(),
                    line.display_name.as_deref().unwrap_or("-")
                );
            }
            lines.push(line);
        }
    }

    if ctx.json_output {
        return print_json(&UsersOutput {
            total,
            users: lines,
        });
    }

    println!("Found {} users", style(total).cyan());
    Ok(())
}
