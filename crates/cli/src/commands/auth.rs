//! Sign-in, registration and profile commands.
//!
//! # Usage
//!
//! ```bash
//! xyno login -u ada
//! xyno register -u ada -e ada@example.com -c "Analytical Engines"
//! xyno whoami
//! xyno logout
//! ```

use std::io::{BufRead, Write};

use clap::Args;
use secrecy::SecretString;
use tracing::info;
use xyno_client::resources::auth;
use xyno_client::{AuthSession, Registration};
use xyno_core::User;

use super::{CliError, Context};

#[derive(Args)]
pub struct LoginArgs {
    #[arg(short, long)]
    username: String,

    /// Prompted for when omitted
    #[arg(short, long, env = "XYNO_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

#[derive(Args)]
pub struct RegisterArgs {
    #[arg(short, long)]
    username: String,

    #[arg(short, long)]
    email: String,

    /// Name of the organization the account will own
    #[arg(short, long)]
    company: String,

    /// Prompted for (twice) when omitted
    #[arg(short, long, env = "XYNO_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

/// Prompt on stderr and read one line from stdin.
fn prompt(label: &str) -> Result<SecretString, CliError> {
    eprint!("{label}: ");
    std::io::stderr().flush()?;
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(SecretString::from(line.trim_end_matches(['\r', '\n']).to_string()))
}

fn print_user(user: &User) {
    println!("{} <{}>", user.display_name(), user.email);
    println!("  username: {}", user.username);
    println!("  role:     {}", user.role.label());
    if !user.company_name.is_empty() {
        println!("  company:  {}", user.company_name);
    }
}

/// Sign in and persist the token pair.
///
/// # Errors
///
/// Returns an error for wrong credentials or an unreachable API.
pub async fn login(ctx: &Context, args: LoginArgs) -> Result<(), CliError> {
    let password = match args.password {
        Some(password) => SecretString::from(password),
        None => prompt("Password")?,
    };

    let session = AuthSession::new(ctx.client.clone());
    let user = session.login(&args.username, &password).await?;
    info!(user_id = %user.id, "Signed in");

    ctx.emit(&user, |user| {
        println!(
            "Signed in as {} ({}) in {}",
            user.username,
            user.role.label(),
            ctx.client.environment().current().label()
        );
    })
}

/// Register a new organization and sign in as its admin.
///
/// # Errors
///
/// Returns an error if the passwords differ or the API rejects the sign-up.
pub async fn register(ctx: &Context, args: RegisterArgs) -> Result<(), CliError> {
    let (password, password_confirm) = match args.password {
        Some(password) => (
            SecretString::from(password.clone()),
            SecretString::from(password),
        ),
        None => (prompt("Password")?, prompt("Confirm password")?),
    };

    let registration = Registration {
        username: args.username,
        email: args.email,
        password,
        password_confirm,
        company_name: args.company,
    };

    let session = AuthSession::new(ctx.client.clone());
    let user = match session.register(&registration).await {
        Ok(user) => user,
        Err(e) => {
            let messages = e.all_messages();
            if messages.len() > 1 {
                for message in messages {
                    eprintln!("  {message}");
                }
            }
            return Err(e.into());
        }
    };

    ctx.emit(&user, |user| {
        println!("Account created. Signed in as {}", user.username);
    })
}

/// Forget the stored tokens. Works offline.
///
/// # Errors
///
/// Never fails; the signature matches the other commands.
#[allow(clippy::unnecessary_wraps)]
pub fn logout(ctx: &Context) -> Result<(), CliError> {
    AuthSession::new(ctx.client.clone()).logout();
    println!("Signed out");
    Ok(())
}

/// Show the profile behind the stored token.
///
/// # Errors
///
/// Returns [`CliError::Api`] with a session-expired error when no one is
/// signed in.
pub async fn whoami(ctx: &Context) -> Result<(), CliError> {
    let user = auth::profile(&ctx.client).await?;
    ctx.emit(&user, |user| {
        print_user(user);
        println!(
            "  env:      {}",
            ctx.client.environment().current().label()
        );
    })
}
