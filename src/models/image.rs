//! Image references, resize targets and stored records.

use std::fmt;
use std::sync::Arc;

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// One entry of the manifest: where a source image can be downloaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageReference {
    #[serde(rename = "Url")]
    pub source_url: String,
}

impl ImageReference {
    pub fn new(source_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
        }
    }

    /// Logical name shared by all resized variants of this image.
    pub fn logical_name(&self) -> Result<String> {
        derive_logical_name(&self.source_url)
    }
}

/// A downloaded and decoded source image.
///
/// Read-only once built; size workers share it through an `Arc`.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub source_url: String,
    pub logical_name: String,
    pub raster: Arc<DynamicImage>,
}

impl DecodedImage {
    pub fn new(
        source_url: impl Into<String>,
        logical_name: impl Into<String>,
        raster: DynamicImage,
    ) -> Self {
        Self {
            source_url: source_url.into(),
            logical_name: logical_name.into(),
            raster: Arc::new(raster),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.raster.width(), self.raster.height())
    }
}

/// Fixed set of output sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeSpec {
    Small,
    Medium,
    Large,
}

impl SizeSpec {
    /// Every size, smallest first.
    pub const ALL: [SizeSpec; 3] = [SizeSpec::Small, SizeSpec::Medium, SizeSpec::Large];

    pub const fn width(self) -> u32 {
        match self {
            SizeSpec::Small => 320,
            SizeSpec::Medium => 384,
            SizeSpec::Large => 640,
        }
    }

    pub const fn height(self) -> u32 {
        match self {
            SizeSpec::Small => 240,
            SizeSpec::Medium => 288,
            SizeSpec::Large => 480,
        }
    }

    pub const fn dimensions(self) -> (u32, u32) {
        (self.width(), self.height())
    }

    /// Look up the size with exactly these dimensions.
    pub fn from_dimensions(width: u32, height: u32) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|size| size.dimensions() == (width, height))
    }
}

impl fmt::Display for SizeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width(), self.height())
    }
}

/// A resized image that has been stored and is reachable at `address`.
///
/// Keyed by `name`; serialized with the field names the listing endpoint
/// exposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredImageRecord {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Url")]
    pub address: String,
}

impl StoredImageRecord {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
        }
    }
}

/// Derive the logical name of a source URL.
///
/// Returns the text after the last `/` and before the last `.` of the URL
/// path, so `http://host/images/b737_3.jpg` yields `b737_3`. Fails when
/// either separator is missing, when the last `.` sits before the last `/`,
/// or when the result would be empty. Percent-encoding in the path is kept
/// as is; storage encodes the name again when building its address.
pub fn derive_logical_name(source_url: &str) -> Result<String> {
    // Query and fragment never take part in the name.
    let path = match url::Url::parse(source_url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => source_url.to_string(),
    };

    let slash = path
        .rfind('/')
        .ok_or_else(|| AppError::name_derivation(source_url, "no '/' in path"))?;
    let dot = path
        .rfind('.')
        .ok_or_else(|| AppError::name_derivation(source_url, "no '.' in path"))?;

    if dot < slash {
        return Err(AppError::name_derivation(
            source_url,
            "no extension after the last '/'",
        ));
    }

    let name = &path[slash + 1..dot];
    if name.is_empty() {
        return Err(AppError::name_derivation(source_url, "empty file name"));
    }

    Ok(name.to_string())
}

/// Storage name for one resized variant: `<logical>_<W>x<H>.jpg`.
pub fn stored_name(logical_name: &str, size: SizeSpec) -> String {
    format!("{}_{}x{}.jpg", logical_name, size.width(), size.height())
}

/// Parse the `WxH` dimensions back out of a stored name.
pub fn size_from_name(name: &str) -> Option<(u32, u32)> {
    let stem = name.strip_suffix(".jpg")?;
    let (_, dims) = stem.rsplit_once('_')?;
    let (width, height) = dims.split_once('x')?;
    Some((width.parse().ok()?, height.parse().ok()?))
}
