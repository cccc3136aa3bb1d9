//! API key commands.

use clap::Subcommand;
use tracing::info;
use xyno_client::resources::api_keys;
use xyno_core::ApiKeyId;

use super::{CliError, Context, env_label, print_table, yes_no};

#[derive(Subcommand)]
pub enum KeysAction {
    /// List API keys
    List,
    /// Create a key. The full key is printed once and cannot be shown again.
    Create { name: String },
    /// Re-enable a key
    Enable { id: ApiKeyId },
    /// Disable a key without deleting it
    Disable { id: ApiKeyId },
    /// Delete a key
    Delete { id: ApiKeyId },
}

/// Run a `keys` subcommand.
///
/// # Errors
///
/// Returns an error if the API call fails.
pub async fn run(ctx: &Context, action: KeysAction) -> Result<(), CliError> {
    match action {
        KeysAction::List => {
            let page = api_keys::list(&ctx.client).await?;
            ctx.emit(&page, |page| {
                let rows: Vec<Vec<String>> = page
                    .results
                    .iter()
                    .map(|key| {
                        vec![
                            key.id.to_string(),
                            key.name.clone(),
                            format!("{}...", key.prefix),
                            yes_no(key.is_active).to_string(),
                            key.last_used_at
                                .map_or_else(|| "never".to_string(), |at| at.format("%Y-%m-%d").to_string()),
                            env_label(key.environment).to_string(),
                        ]
                    })
                    .collect();
                print_table(&["ID", "NAME", "PREFIX", "ACTIVE", "LAST USED", "ENV"], &rows);
            })
        }
        KeysAction::Create { name } => {
            let key = api_keys::create(&ctx.client, &name).await?;
            info!(key_id = %key.id, "API key created");
            ctx.emit(&key, |key| {
                println!("Created key {} ({})", key.id, key.name);
                if let Some(raw) = &key.raw_key {
                    println!();
                    println!("  {raw}");
                    println!();
                    println!("Copy it now. It will not be shown again.");
                }
            })
        }
        KeysAction::Enable { id } => toggle(ctx, id, true).await,
        KeysAction::Disable { id } => toggle(ctx, id, false).await,
        KeysAction::Delete { id } => {
            api_keys::delete(&ctx.client, id).await?;
            println!("Deleted key {id}");
            Ok(())
        }
    }
}

async fn toggle(ctx: &Context, id: ApiKeyId, active: bool) -> Result<(), CliError> {
    let key = api_keys::set_active(&ctx.client, id, active).await?;
    ctx.emit(&key, |key| {
        let state = if key.is_active { "enabled" } else { "disabled" };
        println!("Key {} {state}", key.name);
    })
}
