//! Manifest document served by the source endpoint.

use serde::{Deserialize, Serialize};

use super::ImageReference;

/// Body of the manifest endpoint: `{"Images":[{"Url":"..."}, ...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(rename = "Images")]
    pub images: Vec<ImageReference>,
}

impl Manifest {
    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}
