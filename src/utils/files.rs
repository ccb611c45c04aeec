use std::path::{Path, PathBuf};

use crate::utils::ScanError;

/// Extensions accepted by the batch driver.
const VALID_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "tif", "tiff"];

/// All image files in a directory, sorted by path for a deterministic
/// processing order (front/back pairs are matched in encounter order).
pub fn image_files(directory: &Path) -> Result<Vec<PathBuf>, ScanError> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(directory)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());
        if let Some(ext) = ext {
            if VALID_EXTENSIONS.contains(&ext.as_str()) {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}
