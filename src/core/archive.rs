use crate::domain::model::{Archive, RenderResult};
use crate::utils::error::PackagingError;
use crate::utils::sanitize::file_safe_name;
use chrono::NaiveDate;
use std::collections::HashSet;
use std::io::Write;
use zip::write::{SimpleFileOptions, ZipWriter};
use zip::CompressionMethod;

pub const ENTRY_SUFFIX: &str = "_certificate.png";

pub fn archive_file_name(template_id: &str, date: NaiveDate) -> String {
    format!(
        "certificates_{}_{}.zip",
        file_safe_name(template_id),
        date.format("%Y-%m-%d")
    )
}

pub fn entry_name(display_name: &str) -> String {
    format!("{}{}", file_safe_name(display_name), ENTRY_SUFFIX)
}

// PNG 已經壓縮過，直接存放
fn entry_options() -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(CompressionMethod::Stored)
}

/// 將成功的證書圖片打包成單一 ZIP，失敗的記錄不會進入壓縮檔
///
/// Names that collide after sanitizing get the record id appended, so no
/// entry is ever overwritten.
pub fn pack(
    results: &[RenderResult],
    template_id: &str,
    date: NaiveDate,
) -> Result<Archive, PackagingError> {
    let successes: Vec<(usize, &str, &[u8])> = results
        .iter()
        .filter_map(|r| match r {
            RenderResult::Success {
                id,
                display_name,
                image,
            } => Some((*id, display_name.as_str(), image.as_slice())),
            RenderResult::Failure { .. } => None,
        })
        .collect();

    if successes.is_empty() {
        return Err(PackagingError::NothingToPack);
    }

    tracing::debug!("Creating ZIP file with {} entries", successes.len());

    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let mut taken = HashSet::new();
    let mut entries = Vec::with_capacity(successes.len());

    for (id, display_name, image) in successes {
        let base = file_safe_name(display_name);
        let mut name = format!("{}{}", base, ENTRY_SUFFIX);
        let mut attempt = 1;
        while taken.contains(&name) {
            name = if attempt == 1 {
                format!("{}_{}{}", base, id, ENTRY_SUFFIX)
            } else {
                format!("{}_{}_{}{}", base, id, attempt, ENTRY_SUFFIX)
            };
            attempt += 1;
        }
        if attempt > 1 {
            tracing::warn!(
                "⚠️ '{}' collides with an earlier entry, stored as {}",
                display_name,
                name
            );
        }

        zip.start_file(name.as_str(), entry_options())?;
        zip.write_all(image).map_err(|source| PackagingError::Entry {
            entry: name.clone(),
            source,
        })?;

        taken.insert(name.clone());
        entries.push(name);
    }

    let cursor = zip.finish()?;
    let bytes = cursor.into_inner();
    let file_name = archive_file_name(template_id, date);

    tracing::info!(
        "📦 Packed {} certificates into {} ({} bytes)",
        entries.len(),
        file_name,
        bytes.len()
    );

    Ok(Archive {
        file_name,
        bytes,
        entries,
    })
}
