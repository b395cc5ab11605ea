//! Auth commands - sign in, inspect and end the session

use anyhow::Result;
use colored::Colorize;

use receipts_core::{Error, LogEvent, SessionState};

use super::{block_on, get_context, get_logger, log_event, log_outcome};
use crate::output;

pub fn login() -> Result<()> {
    let ctx = get_context()?;
    let logger = get_logger();

    let result = block_on(ctx.auth_service.login_url())?;
    log_outcome(&logger, &ctx, "login", "login_started", "login_failed", &result);
    let redirect = result?;

    println!("Open this URL in your browser to sign in:");
    println!();
    println!("  {}", redirect.auth_url.cyan());
    println!();
    println!(
        "{}",
        "Then run 'receipts callback <CODE>' with the code from the redirect.".dimmed()
    );
    Ok(())
}

pub fn callback(code: &str) -> Result<()> {
    let ctx = get_context()?;
    let logger = get_logger();

    let result = block_on(ctx.auth_service.complete_login(code))?;
    log_outcome(&logger, &ctx, "callback", "login_completed", "login_failed", &result);
    let session = result?;

    output::success(&format!("Signed in as {}", session.user.display_name()));
    Ok(())
}

pub fn whoami(json: bool) -> Result<()> {
    let ctx = get_context()?;

    let state = block_on(ctx.auth_service.session())??;
    if json {
        println!("{}", serde_json::to_string_pretty(&state.user())?);
        return Ok(());
    }

    match state {
        SessionState::SignedIn { user } => {
            println!("{}", user.display_name().bold());
            println!("  Email: {}", user.email);
            if let Some(id) = &user.id {
                println!("  ID:    {}", id);
            }
        }
        SessionState::SignedOut => {
            output::warning("Not signed in. Run 'receipts login'.");
        }
    }
    Ok(())
}

pub fn logout() -> Result<()> {
    let ctx = get_context()?;
    let logger = get_logger();

    // Already signed out counts as done
    let event = match block_on(ctx.auth_service.logout())? {
        Ok(()) | Err(Error::Unauthenticated) => LogEvent::new("logout_completed"),
        Err(e) => {
            log_event(
                &logger,
                LogEvent::new("logout_failed")
                    .with_command("logout")
                    .with_gateway(ctx.gateway_name())
                    .with_error(&e),
            );
            return Err(e.into());
        }
    };
    log_event(
        &logger,
        event.with_command("logout").with_gateway(ctx.gateway_name()),
    );
    output::success("Signed out");
    Ok(())
}
