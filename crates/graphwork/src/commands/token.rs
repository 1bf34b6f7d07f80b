//! Token command - acquire a token with one of the credential flows.

use anyhow::Result;
use clap::{Args, ValueEnum};
use console::{Style, style};
use graphwork_auth::{BearerToken, FlowKind};
use serde::Serialize;

use super::{Context, print_json};

/// Arguments for the token command.
#[derive(Args, Debug)]
pub struct TokenArgs {
    /// Credential flow to run
    #[arg(long, value_enum, default_value_t = Flow::Delegated)]
    pub flow: Flow,

    /// Scopes for the delegated flow (overrides [delegated].scopes)
    #[arg(long = "scope", value_name = "SCOPE")]
    pub scopes: Vec<String>,

    /// Print the raw access token
    #[arg(long)]
    pub show_token: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Flow {
    /// Client credentials from [app]
    App,
    /// Interactive sign-in from [delegated]
    Delegated,
    /// Sign in for the API scope, then exchange on-behalf-of
    Exchange,
}

/// Token summary for JSON output.
#[derive(Debug, Serialize)]
struct TokenOutput {
    flow: &'static str,
    audience: String,
    expires_at: String,
    expires_in_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    upstream_audience: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    access_token: Option<String>,
}

/// Run the token command.
pub async fn run(args: TokenArgs, ctx: &Context) -> Result<()> {
    let scopes = (!args.scopes.is_empty()).then_some(args.scopes.as_slice());

    let (flow, token, upstream) = match args.flow {
        Flow::App => {
            let credential = ctx.app_credential()?;
            (FlowKind::Application, ctx.acquire(&credential).await?, None)
        }
        Flow::Delegated => {
            let credential = ctx.delegated_credential(scopes)?;
            (FlowKind::Delegated, ctx.acquire(&credential).await?, None)
        }
        Flow::Exchange => {
            // First hop: a user token for our own API, not for Graph.
            let exchange = ctx
                .config
                .exchange_settings(&graphwork_config::process_env)?;
            let upstream_scopes = [exchange.upstream_scope];
            let upstream_credential =
                ctx.delegated_credential(Some(upstream_scopes.as_slice()))?;
            let upstream = ctx.acquire(&upstream_credential).await?;

            let credential = ctx.exchange_credential(upstream.clone())?;
            let token = ctx.acquire(&credential).await?;
            (FlowKind::DelegatedExchange, token, Some(upstream))
        }
    };

    if ctx.json_output {
        print_json(&TokenOutput {
            flow: flow.as_str(),
            audience: token.audience().to_string(),
            expires_at: token.expires_at().to_rfc3339(),
            expires_in_secs: token.expires_in_secs(),
            upstream_audience: upstream.as_ref().map(|t| t.audience().to_string()),
            access_token: args.show_token.then(|| token.secret().to_string()),
        })?;
        return Ok(());
    }

    let dim = Style::new().dim();
    println!();
    println!("{}", style("Access Token").bold());
    println!("{}", dim.apply_to("─".repeat(40)));
    println!("  {} {}", dim.apply_to("Flow:    "), flow);
    print_token(&token, args.show_token, ctx.verbose);
    if let Some(upstream) = &upstream {
        println!(
            "  {} {} (exchanged)",
            dim.apply_to("Upstream:"),
            style(upstream.audience()).cyan()
        );
    }
    println!();

    Ok(())
}

fn print_token(token: &BearerToken, show: bool, verbose: bool) {
    let dim = Style::new().dim();
    println!("  {} {}", dim.apply_to("Audience:"), style(token.audience()).cyan());
    println!(
        "  {} {}",
        dim.apply_to("Expires: "),
        token.expires_in_display()
    );
    if verbose {
        println!(
            "  {} {}",
            dim.apply_to("Until:   "),
            token.expires_at().to_rfc3339()
        );
    }
    if show {
        println!("  {} {}", dim.apply_to("Token:   "), token.secret());
    }
}
