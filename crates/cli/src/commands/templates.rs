//! Email template commands.
//!
//! # Usage
//!
//! ```bash
//! xyno templates list
//! xyno templates upload welcome.html --name Welcome --subject "Hi {{name}}"
//! xyno templates defaults 4 --set name=there
//! xyno templates preview 4 --set name=Ada --html
//! xyno templates promote 4
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::Subcommand;
use tracing::info;
use xyno_client::resources::templates;
use xyno_core::placeholder::placeholder_defaults;
use xyno_core::{EmailTemplate, Placeholder, PlaceholderSet, TemplateId, UploadHtml};

use super::{CliError, Context, env_label, parse_pairs, print_table, read_file, yes_no};

#[derive(Subcommand)]
pub enum TemplatesAction {
    /// List templates in the selected environment
    List,
    /// Show one template
    Show {
        id: TemplateId,
        /// Print the HTML body as well
        #[arg(long)]
        html: bool,
    },
    /// Create a template from an HTML file
    Upload {
        file: PathBuf,
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        subject: String,
    },
    /// Set placeholder default values
    Defaults {
        id: TemplateId,
        /// `name=value`, repeatable
        #[arg(long = "set", value_name = "NAME=VALUE", required = true)]
        values: Vec<String>,
    },
    /// Copy a sandbox template into production
    Promote { id: TemplateId },
    /// Delete a template
    Delete { id: TemplateId },
    /// Render subject and body with placeholder values
    Preview {
        id: TemplateId,
        /// `name=value`, repeatable; unset placeholders use their defaults
        #[arg(long = "set", value_name = "NAME=VALUE")]
        values: Vec<String>,
        /// Print the rendered HTML instead of just the subject
        #[arg(long)]
        html: bool,
    },
}

/// Run a `templates` subcommand.
///
/// # Errors
///
/// Returns an error if the API call fails or an argument is invalid.
pub async fn run(ctx: &Context, action: TemplatesAction) -> Result<(), CliError> {
    match action {
        TemplatesAction::List => {
            let page = templates::list(&ctx.client).await?;
            ctx.emit(&page, |page| {
                let rows: Vec<Vec<String>> = page
                    .results
                    .iter()
                    .map(|t| {
                        vec![
                            t.id.to_string(),
                            t.name.clone(),
                            t.subject.clone(),
                            t.placeholders.len().to_string(),
                            yes_no(t.is_active).to_string(),
                            env_label(t.environment).to_string(),
                        ]
                    })
                    .collect();
                print_table(
                    &["ID", "NAME", "SUBJECT", "PLACEHOLDERS", "ACTIVE", "ENV"],
                    &rows,
                );
            })
        }
        TemplatesAction::Show { id, html } => {
            let template = templates::get(&ctx.client, id).await?;
            ctx.emit(&template, |t| print_template(t, html))
        }
        TemplatesAction::Upload {
            file,
            name,
            subject,
        } => {
            let bytes = read_file(&file)?;
            let html_content = String::from_utf8(bytes).map_err(|_| {
                CliError::InvalidArgument(format!("{} is not UTF-8 text", file.display()))
            })?;
            let upload = UploadHtml {
                name,
                subject,
                html_content,
            };
            let template = templates::upload_html(&ctx.client, &upload).await?;
            info!(template_id = %template.id, "Template uploaded");
            ctx.emit(&template, |t| {
                println!("Created template {} ({})", t.id, t.name);
                let names: Vec<&str> = t.placeholders.iter().map(|p| p.name.as_str()).collect();
                if !names.is_empty() {
                    println!("Detected placeholders: {}", names.join(", "));
                }
            })
        }
        TemplatesAction::Defaults { id, values } => {
            let values = parse_pairs(&values)?;
            let template = templates::get(&ctx.client, id).await?;
            let placeholders = apply_defaults(&template, &values)?;
            let updated = templates::update_placeholders(&ctx.client, id, &placeholders).await?;
            ctx.emit(&updated, |t| {
                println!("Updated {} placeholder defaults on {}", values.len(), t.name);
            })
        }
        TemplatesAction::Promote { id } => {
            ctx.require_sandbox()?;
            let promoted = templates::promote(&ctx.client, id).await?;
            info!(template_id = %id, production_id = %promoted.id, "Template promoted");
            ctx.emit(&promoted, |t| {
                println!("Promoted {} to production (id {})", t.name, t.id);
            })
        }
        TemplatesAction::Delete { id } => {
            templates::delete(&ctx.client, id).await?;
            println!("Deleted template {id}");
            Ok(())
        }
        TemplatesAction::Preview { id, values, html } => {
            let template = templates::get(&ctx.client, id).await?;
            let mut context = placeholder_defaults(&template.placeholders);
            context.extend(parse_pairs(&values)?);
            let preview = templates::preview(&ctx.client, id, &context).await?;
            ctx.emit(&preview, |p| {
                println!("Subject: {}", p.subject);
                if html {
                    println!();
                    println!("{}", p.html);
                }
            })
        }
    }
}

/// The template's placeholders with `values` applied as defaults.
///
/// Every name must already exist on the template; the API ignores unknown
/// names, so they are rejected here instead of silently dropped.
fn apply_defaults(
    template: &EmailTemplate,
    values: &BTreeMap<String, String>,
) -> Result<Vec<Placeholder>, CliError> {
    let mut set = PlaceholderSet::from(template.placeholders.clone());
    for (name, value) in values {
        if !set.set_default(name, value.clone()) {
            return Err(CliError::InvalidArgument(format!(
                "Template \"{}\" has no placeholder \"{name}\"",
                template.name
            )));
        }
    }
    Ok(set.into_vec())
}

fn print_template(template: &EmailTemplate, html: bool) {
    println!("{} (id {})", template.name, template.id);
    println!("  subject: {}", template.subject);
    println!("  env:     {}", env_label(template.environment));
    println!("  active:  {}", yes_no(template.is_active));
    println!("  updated: {}", template.updated_at.format("%Y-%m-%d %H:%M"));
    if !template.placeholders.is_empty() {
        println!("  placeholders:");
        for placeholder in &template.placeholders {
            if placeholder.default_value.is_empty() {
                println!("    {}", placeholder.name);
            } else {
                println!("    {} = {}", placeholder.name, placeholder.default_value);
            }
        }
    }
    if html {
        println!();
        println!("{}", template.html_content);
    }
}
