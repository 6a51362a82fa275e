use crate::survey::*;

use serde::Serialize;
use std::fs;
use std::path::PathBuf;

use crate::survey::config_reader::Study;

// Extensions accepted as stimulus images, compared case-insensitively.
const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// One row of a condition file, in the column order the stimulus
/// presentation tooling expects.
#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
pub struct ConditionRow {
    pub product_number: usize,
    pub image_path: String,
    pub total_products: usize,
}

/// Lists the stimulus file names for one group, sorted by name.
pub fn list_stimulus_files(photos_dir: &str, group_key: &str) -> SurveyResult<Vec<String>> {
    let dir: PathBuf = [photos_dir, group_key].iter().collect();
    let dir_display = dir.display().to_string();
    let entries = fs::read_dir(&dir).context(ListingPhotosSnafu {
        path: dir_display.clone(),
    })?;

    let mut files: Vec<String> = Vec::new();
    for entry in entries {
        let entry = entry.context(ListingPhotosSnafu {
            path: dir_display.clone(),
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());
        let name = entry.file_name().to_string_lossy().to_string();
        match ext {
            Some(e) if IMAGE_EXTENSIONS.contains(&e.as_str()) => files.push(name),
            _ => {
                debug!("list_stimulus_files: skipping {:?}", name);
            }
        }
    }
    files.sort();
    Ok(files)
}

/// Writes `conditions_<key>.csv` for every group of the study.
///
/// The image paths are relative to the stimulus directory so that the files
/// can be shipped alongside the photos. Groups with no images are skipped
/// with a warning rather than failing the whole generation.
pub fn write_condition_files(study: &Study) -> SurveyResult<()> {
    for group in study.groups.iter() {
        let files = match list_stimulus_files(&study.photos_dir, &group.key) {
            Result::Ok(f) => f,
            Result::Err(e) => {
                warn!("skipping group {}: {}", group.key, e);
                continue;
            }
        };
        if files.is_empty() {
            warn!(
                "no images found for group {} in {}/{}, skipping",
                group.key, study.photos_dir, group.key
            );
            continue;
        }

        let out_path = format!("conditions_{}.csv", group.key);
        let mut writer = csv::Writer::from_path(&out_path).context(WritingConditionsSnafu {
            path: out_path.clone(),
        })?;
        let total = files.len();
        for (idx, name) in files.iter().enumerate() {
            writer
                .serialize(ConditionRow {
                    product_number: idx + 1,
                    image_path: format!("{}/{}", group.key, name),
                    total_products: total,
                })
                .context(WritingConditionsSnafu {
                    path: out_path.clone(),
                })?;
        }
        writer.flush().context(FlushingConditionsSnafu {
            path: out_path.clone(),
        })?;
        info!("wrote {} ({} products)", out_path, total);
    }
    Ok(())
}
