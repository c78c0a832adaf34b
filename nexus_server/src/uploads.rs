//! Reading new-item submissions and storing item images.
//!
//! `POST /items/add` accepts either a JSON body or a `multipart/form-data` form with an optional `image` file part.
use std::path::{Path, PathBuf};

use actix_multipart::Multipart;
use actix_web::{
    http::header::{self, HeaderMap},
    web::{self, BytesMut},
};
use futures::{StreamExt, TryStreamExt};
use log::*;
use nexus_common::Price;
use nexus_engine::db_types::{ItemId, NewItem};
use tokio::fs;

use crate::errors::ServerError;

pub const MAX_IMAGE_SIZE: usize = 10 * 1024 * 1024;
const MAX_FIELD_SIZE: usize = 64 * 1024;
const MAX_JSON_SIZE: usize = 256 * 1024;

/// An image file submitted with a new item.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub extension: String,
    pub data: Vec<u8>,
}

/// A new item, as submitted to `POST /items/add`.
#[derive(Debug, Clone)]
pub struct ItemSubmission {
    pub item: NewItem,
    pub image: Option<ImageUpload>,
}

pub fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim_start().to_ascii_lowercase().starts_with("multipart/form-data"))
        .unwrap_or(false)
}

/// Reads a new-item submission from the request body, in whichever format the content type says it is.
pub async fn read_submission(headers: &HeaderMap, payload: web::Payload) -> Result<ItemSubmission, ServerError> {
    if is_multipart(headers) {
        read_multipart(Multipart::new(headers, payload)).await
    } else {
        let item = read_json(payload).await?;
        Ok(ItemSubmission { item, image: None })
    }
}

async fn read_json(mut payload: web::Payload) -> Result<NewItem, ServerError> {
    let mut body = BytesMut::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk.map_err(|e| ServerError::InvalidRequest(format!("Could not read the request body. {e}")))?;
        if body.len() + chunk.len() > MAX_JSON_SIZE {
            return Err(ServerError::InvalidRequest("The request body is too large.".into()));
        }
        body.extend_from_slice(&chunk);
    }
    serde_json::from_slice::<NewItem>(&body).map_err(|e| ServerError::InvalidRequest(format!("Invalid item. {e}")))
}

async fn read_multipart(mut form: Multipart) -> Result<ItemSubmission, ServerError> {
    let mut name = None;
    let mut description = None;
    let mut price = None;
    let mut stock = None;
    let mut image = None;
    while let Some(mut field) = form.try_next().await.map_err(malformed_form)? {
        let field_name = field.name().unwrap_or_default().to_string();
        if field_name == "image" {
            let filename = field.content_disposition().and_then(|cd| cd.get_filename()).map(String::from);
            let data = read_field(&mut field, MAX_IMAGE_SIZE).await?;
            if data.is_empty() {
                trace!("💻️ Ignoring empty image part");
                continue;
            }
            let extension = filename.as_deref().map(sanitize_extension).unwrap_or_default();
            image = Some(ImageUpload { extension, data });
            continue;
        }
        let data = read_field(&mut field, MAX_FIELD_SIZE).await?;
        let value = String::from_utf8(data)
            .map_err(|_| ServerError::InvalidRequest(format!("The '{field_name}' field is not valid text.")))?;
        match field_name.as_str() {
            "name" => name = Some(value),
            "description" => description = Some(value),
            "price" => price = Some(value),
            "stock" => stock = Some(value),
            other => debug!("💻️ Ignoring unexpected form field '{other}'"),
        }
    }
    let price = price
        .ok_or_else(|| ServerError::InvalidRequest("The 'price' field is required.".into()))?
        .trim()
        .parse::<Price>()
        .map_err(|e| ServerError::InvalidRequest(format!("Invalid price. {e}")))?;
    let stock = stock
        .ok_or_else(|| ServerError::InvalidRequest("The 'stock' field is required.".into()))?
        .trim()
        .parse::<i64>()
        .map_err(|e| ServerError::InvalidRequest(format!("Invalid stock level. {e}")))?;
    let item = NewItem::new(name.unwrap_or_default(), description.unwrap_or_default(), price, stock);
    Ok(ItemSubmission { item, image })
}

async fn read_field(field: &mut actix_multipart::Field, limit: usize) -> Result<Vec<u8>, ServerError> {
    let mut data = Vec::new();
    while let Some(chunk) = field.try_next().await.map_err(malformed_form)? {
        if data.len() + chunk.len() > limit {
            return Err(ServerError::InvalidRequest(format!("A form field exceeds the {limit} byte limit.")));
        }
        data.extend_from_slice(&chunk);
    }
    Ok(data)
}

fn malformed_form(e: actix_multipart::MultipartError) -> ServerError {
    ServerError::InvalidRequest(format!("Malformed form data. {e}"))
}

/// Keeps a short, alphanumeric file extension from a client-supplied file name, lowercased and with its leading dot.
/// Anything else yields an empty extension.
pub fn sanitize_extension(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default()
}

/// Writes the image to `{dir}/{item_id}{ext}` and returns the public path it is served under.
pub async fn save_image(dir: &Path, item_id: ItemId, image: &ImageUpload) -> Result<String, ServerError> {
    fs::create_dir_all(dir).await?;
    let file_name = format!("{item_id}{}", image.extension);
    let path: PathBuf = dir.join(&file_name);
    fs::write(&path, &image.data).await?;
    debug!("💻️ Saved {} byte image for item {item_id} to {}", image.data.len(), path.display());
    Ok(format!("/uploads/{file_name}"))
}
