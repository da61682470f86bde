use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::path::Path;
use uuid::Uuid;

use crate::validation::RecipeError;

const RECIPE_IMAGE_DIR: &str = "recipes";

/// Image payload pulled out of a `data:image/<ext>;base64,<data>` string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub extension: String,
    pub bytes: Vec<u8>,
}

pub fn decode_data_url(input: &str) -> Result<DecodedImage, RecipeError> {
    let invalid = |reason: &str| RecipeError::InvalidImage(reason.to_string());

    let rest = input
        .trim()
        .strip_prefix("data:image/")
        .ok_or_else(|| invalid("expected a data:image/<ext>;base64 URL"))?;
    let (extension, data) = rest
        .split_once(";base64,")
        .ok_or_else(|| invalid("expected a base64 payload"))?;

    if extension.is_empty() || !extension.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(invalid("unsupported image extension"));
    }

    let bytes = STANDARD
        .decode(data)
        .map_err(|_| invalid("payload is not valid base64"))?;
    if bytes.is_empty() {
        return Err(invalid("image is empty"));
    }

    Ok(DecodedImage {
        extension: extension.to_ascii_lowercase(),
        bytes,
    })
}

/// Writes the image under `media_root` and returns its media-relative path.
pub async fn save_recipe_image(media_root: &Path, image: &DecodedImage) -> std::io::Result<String> {
    let dir = media_root.join(RECIPE_IMAGE_DIR);
    tokio::fs::create_dir_all(&dir).await?;

    let file_name = format!("{}.{}", Uuid::new_v4(), image.extension);
    tokio::fs::write(dir.join(&file_name), &image.bytes).await?;

    Ok(format!("{RECIPE_IMAGE_DIR}/{file_name}"))
}

/// Deletes a previously saved image; a missing file is only logged.
pub async fn remove_image(media_root: &Path, reference: &str) {
    if let Err(e) = tokio::fs::remove_file(media_root.join(reference)).await {
        tracing::warn!(reference, "could not remove image: {e}");
    }
}

pub fn media_url(reference: &str) -> String {
    format!("/media/{reference}")
}
