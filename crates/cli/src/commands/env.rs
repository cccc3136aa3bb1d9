//! Sandbox/production selection.
//!
//! The selection is persisted next to the tokens and sent as the
//! `X-Environment` header on every later command.

use clap::Subcommand;
use serde_json::json;
use xyno_core::Environment;

use super::{CliError, Context};

#[derive(Subcommand)]
pub enum EnvAction {
    /// Print the selected environment
    Show,
    /// Select an environment
    Set {
        /// `sandbox` or `production`
        environment: Environment,
    },
    /// Switch to the other environment
    Toggle,
}

/// Run an `env` subcommand. Touches only local storage.
///
/// # Errors
///
/// Returns an error if the selection cannot be persisted.
pub fn run(ctx: &Context, action: EnvAction) -> Result<(), CliError> {
    let state = ctx.client.environment();
    let current = match action {
        EnvAction::Show => state.current(),
        EnvAction::Set { environment } => {
            state.set(environment)?;
            environment
        }
        EnvAction::Toggle => state.toggle()?,
    };

    ctx.emit(&json!({ "environment": current }), |_| {
        println!("{}", current.as_str());
    })
}
