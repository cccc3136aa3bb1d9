//! Amazon SES integration commands.
//!
//! # Usage
//!
//! ```bash
//! AWS_ACCESS_KEY_ID=... AWS_SECRET_ACCESS_KEY=... \
//!     xyno integrations create --name Main --region eu-west-1 --sender hello@acme.test
//! xyno integrations verify 2
//! xyno integrations check 2
//! xyno integrations test 2
//! ```

use clap::Subcommand;
use secrecy::SecretString;
use tracing::info;
use xyno_client::resources::integrations::{self, IntegrationCreate};
use xyno_core::{IntegrationId, SesIntegration};

use super::{CliError, Context, env_label, print_table, yes_no};

#[derive(Subcommand)]
pub enum IntegrationsAction {
    /// List integrations in the selected environment
    List,
    /// Add an integration
    Create {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        region: String,
        /// Verified (or to-be-verified) sender address
        #[arg(short, long)]
        sender: String,
        #[arg(long, env = "AWS_ACCESS_KEY_ID", hide_env_values = true)]
        access_key: String,
        #[arg(long, env = "AWS_SECRET_ACCESS_KEY", hide_env_values = true)]
        secret_key: String,
    },
    /// Send the SES verification email to the sender address
    Verify { id: IntegrationId },
    /// Re-check whether the sender address is verified
    Check { id: IntegrationId },
    /// Test the AWS credentials
    Test { id: IntegrationId },
    /// Delete an integration
    Delete { id: IntegrationId },
}

/// Run an `integrations` subcommand.
///
/// # Errors
///
/// Returns an error if the API call fails, or [`CliError::CheckFailed`] when
/// a check reports a negative result.
pub async fn run(ctx: &Context, action: IntegrationsAction) -> Result<(), CliError> {
    match action {
        IntegrationsAction::List => {
            let page = integrations::list(&ctx.client).await?;
            ctx.emit(&page, |page| {
                let rows: Vec<Vec<String>> = page.results.iter().map(integration_row).collect();
                print_table(
                    &["ID", "NAME", "REGION", "SENDER", "VERIFIED", "ACTIVE", "ENV"],
                    &rows,
                );
            })
        }
        IntegrationsAction::Create {
            name,
            region,
            sender,
            access_key,
            secret_key,
        } => {
            let create = IntegrationCreate {
                name,
                region,
                sender_email: sender,
                aws_access_key: access_key,
                aws_secret_key: SecretString::from(secret_key),
            };
            let integration = integrations::create(&ctx.client, &create).await?;
            info!(integration_id = %integration.id, "Integration created");
            ctx.emit(&integration, |i| {
                println!("Created integration {} ({})", i.id, i.name);
                if !i.is_verified {
                    println!("Run `xyno integrations verify {}` to verify {}", i.id, i.sender_email);
                }
            })
        }
        IntegrationsAction::Verify { id } => {
            let detail = integrations::verify_sender(&ctx.client, id).await?;
            ctx.emit(&detail, |d| {
                if d.detail.is_empty() {
                    println!("Verification email sent");
                } else {
                    println!("{}", d.detail);
                }
            })
        }
        IntegrationsAction::Check { id } => {
            let status = integrations::check_verification(&ctx.client, id).await?;
            ctx.emit(&status, |s| {
                if s.is_verified {
                    println!("Sender is verified");
                } else {
                    println!("Sender is not yet verified");
                }
            })
        }
        IntegrationsAction::Test { id } => {
            let result = integrations::test_connection(&ctx.client, id).await?;
            if !result.success {
                let detail = result.detail.unwrap_or_default();
                return Err(CliError::CheckFailed(if detail.is_empty() {
                    "Connection test failed".to_string()
                } else {
                    format!("Connection test failed: {detail}")
                }));
            }
            ctx.emit(&result, |_| println!("Connection successful!"))
        }
        IntegrationsAction::Delete { id } => {
            integrations::delete(&ctx.client, id).await?;
            println!("Deleted integration {id}");
            Ok(())
        }
    }
}

fn integration_row(integration: &SesIntegration) -> Vec<String> {
    vec![
        integration.id.to_string(),
        integration.name.clone(),
        integration.region.clone(),
        integration.sender_email.clone(),
        yes_no(integration.is_verified).to_string(),
        yes_no(integration.is_active).to_string(),
        env_label(integration.environment).to_string(),
    ]
}
