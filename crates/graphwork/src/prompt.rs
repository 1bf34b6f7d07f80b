//! Console sign-in: print the authorization URL, read back the redirect.

use async_trait::async_trait;
use graphwork_auth::pkce::parse_redirect;
use graphwork_auth::{AuthorizationCode, AuthorizationRequest, InteractivePrompt, PromptError};

/// Sign-in through the user's browser and a pasted redirect URL.
#[derive(Debug, Default)]
pub struct ConsolePrompt {
    /// Try to open the browser automatically.
    pub open_browser: bool,
}

#[async_trait]
impl InteractivePrompt for ConsolePrompt {
    async fn authorize(
        &self,
        request: &AuthorizationRequest,
    ) -> Result<AuthorizationCode, PromptError> {
        eprintln!();
        eprintln!("Open this URL in your browser and sign in:");
        eprintln!();
        eprintln!("  {}", request.url);
        eprintln!();
        eprintln!(
            "You will be redirected to {} (the page may fail to load).",
            request.redirect_uri
        );
        eprintln!("Copy the full address from the browser and paste it here:");
        eprintln!();

        if self.open_browser && open_url(&request.url).is_err() {
            eprintln!("(Could not open browser automatically)");
            eprintln!();
        }

        let input = tokio::task::spawn_blocking(|| {
            use std::io::Write;
            eprint!("redirect> ");
            std::io::stderr().flush()?;
            let mut line = String::new();
            std::io::stdin().read_line(&mut line)?;
            Ok::<_, std::io::Error>(line)
        })
        .await
        .map_err(|e| PromptError::Failed(e.to_string()))?
        .map_err(|e| PromptError::Failed(e.to_string()))?;

        parse_redirect(&input)
    }
}

fn open_url(url: &str) -> std::io::Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(url).status()?;
    }
    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(url).status()?;
    }
    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/C", "start", "", url])
            .status()?;
    }
    Ok(())
}
