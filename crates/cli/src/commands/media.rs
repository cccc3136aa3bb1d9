//! Image uploads.

use std::path::PathBuf;

use clap::Subcommand;
use serde_json::json;
use tracing::info;
use xyno_client::Upload;
use xyno_client::resources::media;

use super::{CliError, Context, file_name, read_file};

#[derive(Subcommand)]
pub enum MediaAction {
    /// Upload a JPEG, PNG, GIF or WebP image (5 MB max) and print its URL
    Upload { file: PathBuf },
}

/// Run a `media` subcommand.
///
/// # Errors
///
/// Returns an error if the file is unreadable, rejected locally, or the
/// upload fails.
pub async fn run(ctx: &Context, action: MediaAction) -> Result<(), CliError> {
    match action {
        MediaAction::Upload { file } => {
            let upload = Upload::file(file_name(&file), read_file(&file)?);
            let url = media::upload(&ctx.client, upload).await?;
            info!(url = %url, "Image uploaded");
            ctx.emit(&json!({ "url": url }), |_| println!("{url}"))
        }
    }
}
