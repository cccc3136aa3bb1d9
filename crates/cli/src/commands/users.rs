//! Team member commands. The API only allows these for admins.

use clap::Subcommand;
use tracing::{info, warn};
use xyno_client::resources::users;
use xyno_core::{Email, InviteRequest, UserId, UserRole};

use super::{CliError, Context, print_table, yes_no};

#[derive(Subcommand)]
pub enum UsersAction {
    /// List team members
    List,
    /// Invite a member by email
    Invite {
        #[arg(short, long)]
        email: Email,
        #[arg(long, default_value = "")]
        first_name: String,
        #[arg(long, default_value = "")]
        last_name: String,
        #[arg(long, default_value = "")]
        phone: String,
        /// `developer` or `admin`
        #[arg(short, long, default_value = "developer")]
        role: UserRole,
    },
    /// Remove a member
    Delete { id: UserId },
}

/// Run a `users` subcommand.
///
/// # Errors
///
/// Returns an error if the API call fails (403 for non-admins).
pub async fn run(ctx: &Context, action: UsersAction) -> Result<(), CliError> {
    match action {
        UsersAction::List => {
            let page = users::list(&ctx.client).await?;
            ctx.emit(&page, |page| {
                let rows: Vec<Vec<String>> = page
                    .results
                    .iter()
                    .map(|member| {
                        vec![
                            member.id.to_string(),
                            member.username.clone(),
                            member.email.clone(),
                            member.role.label().to_string(),
                            member.status.to_string(),
                            yes_no(member.is_active).to_string(),
                        ]
                    })
                    .collect();
                print_table(&["ID", "USERNAME", "EMAIL", "ROLE", "STATUS", "ACTIVE"], &rows);
            })
        }
        UsersAction::Invite {
            email,
            first_name,
            last_name,
            phone,
            role,
        } => {
            let request = InviteRequest {
                first_name,
                last_name,
                email: email.into_inner(),
                phone,
                role,
            };
            let response = users::invite(&ctx.client, &request).await?;
            info!(email = %request.email, role = %role, "Invitation sent");
            if let Some(warning) = &response.warning {
                warn!(warning = %warning, "Invitation created with a warning");
            }
            ctx.emit(&response, |r| {
                if !r.detail.is_empty() {
                    println!("{}", r.detail);
                }
                println!("Invite link: {}", r.invite_url);
            })
        }
        UsersAction::Delete { id } => {
            users::delete(&ctx.client, id).await?;
            println!("Removed user {id}");
            Ok(())
        }
    }
}
