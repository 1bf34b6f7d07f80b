//! Files command - list the files in a site drive folder.

use anyhow::Result;
use clap::Args;
use console::style;
use futures::StreamExt;
use serde::Serialize;

use super::{Context, print_json};

/// Arguments for the files command.
#[derive(Args, Debug)]
pub struct FilesArgs {
    /// Folder path from the drive root (default: [site].source_folder)
    #[arg(long)]
    pub folder: Option<String>,
}

#[derive(Debug, Serialize)]
struct FileLine {
    id: Option<String>,
    name: Option<String>,
}

/// Run the files command.
pub async fn run(args: FilesArgs, ctx: &Context) -> Result<()> {
    let site = ctx.config.site_settings()?;
    let folder = args
        .folder
        .or(site.source_folder)
        .unwrap_or_else(|| "/".to_string());

    let token = ctx.delegated_token().await?;
    let client = ctx.client(token.audience().clone())?;

    let drives = client.drives();
    let stream = drives.site_children(&token, &site.site_id, &folder);
    futures::pin_mut!(stream);

    let mut files = Vec::new();
    while let Some(item) = stream.next().await {
        let item = item?;
        let line = FileLine {
            id: item.id().map(str::to_string),
            name: item.name().map(str::to_string),
        };
        if !ctx.json_output {
            println!("{}", line.name.as_deref().unwrap_or("-"));
        }
        files.push(line);
    }

    if ctx.json_output {
        return print_json(&files);
    }
    if files.is_empty() {
        println!("{}", style(format!("{} is empty", folder)).dim());
    }
    Ok(())
}
