//! Object-storage image entries.
//!
//! Only the object key is stored; the public URL is derived from the configured
//! bucket base URL when a product is read.

use serde::{Deserialize, Serialize};

use storefront_core::{DomainError, DomainResult, Entity, ImageId};

const ALLOWED_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub id: ImageId,
    /// Object key inside the image bucket.
    pub link: String,
}

impl ImageRef {
    /// Build the storage entry for an uploaded file.
    ///
    /// The object key is derived from the image id so uploads with the same
    /// original filename never collide.
    pub fn from_upload(id: ImageId, filename: &str) -> DomainResult<Self> {
        let extension = allowed_extension(filename)?;
        Ok(Self {
            id,
            link: format!("{}.{}", id.as_uuid().simple(), extension),
        })
    }

    pub fn url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self.link)
    }
}

impl Entity for ImageRef {
    type Id = ImageId;
    const NAME: &'static str = "image";

    fn id(&self) -> ImageId {
        self.id
    }
}

/// Lower-cased extension of `filename` if it is an accepted image type.
pub fn allowed_extension(filename: &str) -> DomainResult<String> {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .ok_or_else(|| DomainError::validation(format!("file '{filename}' has no extension")))?;

    if ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        Ok(extension)
    } else {
        Err(DomainError::validation(format!(
            "file extension '{extension}' is not allowed"
        )))
    }
}
