//! Brand component commands.

use std::path::PathBuf;

use clap::Subcommand;
use tracing::info;
use xyno_client::resources::brand_components;
use xyno_core::{BrandCategory, BrandComponentId, BrandComponentInput};

use super::{CliError, Context, print_table, read_file, yes_no};

#[derive(Subcommand)]
pub enum BrandAction {
    /// List components
    List {
        /// `header`, `footer`, `content`, `logo` or `other`
        #[arg(short, long)]
        category: Option<BrandCategory>,
    },
    /// Show one component with its HTML
    Show { id: BrandComponentId },
    /// Add a component from an HTML snippet file
    Create {
        file: PathBuf,
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        category: BrandCategory,
    },
    /// Delete a component
    Delete { id: BrandComponentId },
}

/// Run a `brand` subcommand.
///
/// # Errors
///
/// Returns an error if the API call fails or the file cannot be read.
pub async fn run(ctx: &Context, action: BrandAction) -> Result<(), CliError> {
    match action {
        BrandAction::List { category } => {
            let page = brand_components::list(&ctx.client, category).await?;
            ctx.emit(&page, |page| {
                let rows: Vec<Vec<String>> = page
                    .results
                    .iter()
                    .map(|c| {
                        vec![
                            c.id.to_string(),
                            c.name.clone(),
                            c.category_label().to_string(),
                            yes_no(c.is_active).to_string(),
                        ]
                    })
                    .collect();
                print_table(&["ID", "NAME", "CATEGORY", "ACTIVE"], &rows);
            })
        }
        BrandAction::Show { id } => {
            let component = brand_components::get(&ctx.client, id).await?;
            ctx.emit(&component, |c| {
                println!("{} (id {}, {})", c.name, c.id, c.category_label());
                if !c.thumbnail_url.is_empty() {
                    println!("  thumbnail: {}", c.thumbnail_url);
                }
                println!();
                println!("{}", c.html_content);
            })
        }
        BrandAction::Create {
            file,
            name,
            category,
        } => {
            let html_content = String::from_utf8(read_file(&file)?).map_err(|_| {
                CliError::InvalidArgument(format!("{} is not UTF-8 text", file.display()))
            })?;
            let input = BrandComponentInput {
                name,
                category,
                html_content,
                thumbnail_url: String::new(),
            };
            let component = brand_components::create(&ctx.client, &input).await?;
            info!(component_id = %component.id, "Brand component created");
            ctx.emit(&component, |c| println!("Created component {} ({})", c.id, c.name))
        }
        BrandAction::Delete { id } => {
            brand_components::delete(&ctx.client, id).await?;
            println!("Deleted component {id}");
            Ok(())
        }
    }
}
