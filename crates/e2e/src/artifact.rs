//! Screenshot artifacts

use std::path::{Path, PathBuf};

use image::GenericImageView;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;

use crate::error::{E2eError, E2eResult};

/// A screenshot written for human inspection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenshotArtifact {
    /// File stem, the scenario's screenshot name
    pub name: String,

    pub path: PathBuf,

    pub width: u32,

    pub height: u32,

    /// Hex SHA256 of the PNG bytes
    pub sha256: String,
}

/// Directory that receives one PNG per scenario
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> E2eResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Validate and store a PNG under `file_name`, replacing any earlier one
    pub fn save_screenshot(&self, file_name: &str, png: &[u8]) -> E2eResult<ScreenshotArtifact> {
        let stem = Path::new(file_name)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| E2eError::InvalidConfig(format!("bad screenshot file name: {:?}", file_name)))?;

        // Refuse to write something that is not an image.
        let decoded = image::load_from_memory(png)?;
        let (width, height) = decoded.dimensions();

        let path = self.dir.join(file_name);
        std::fs::write(&path, png)?;

        let sha256 = hex::encode(Sha256::digest(png));
        info!("Screenshot saved: {} ({}x{})", path.display(), width, height);

        Ok(ScreenshotArtifact {
            name: stem,
            path,
            width,
            height,
            sha256,
        })
    }

    /// Stems of all stored screenshots, sorted
    pub fn list_screenshots(&self) -> E2eResult<Vec<String>> {
        let mut names = Vec::new();

        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();

            if path.extension().map(|e| e == "png").unwrap_or(false) {
                if let Some(name) = path.file_stem() {
                    names.push(name.to_string_lossy().to_string());
                }
            }
        }

        names.sort();
        Ok(names)
    }
}
