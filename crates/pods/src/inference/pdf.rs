//! PDF pages as OCR inputs.
//!
//! Pages are rasterized with poppler (`pdfinfo` for the page count,
//! `pdftoppm` for rendering), which must be on `PATH`.

use std::collections::BTreeSet;
use std::path::Path;

use tokio::process::Command;
use tracing::{debug, info};

use super::image::ImageInput;
use super::InferenceError;

/// Render resolution: twice the 72 dpi PDF user space.
pub const RENDER_DPI: u32 = 144;

/// Whether `path` names a PDF, by extension.
#[must_use]
pub fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

/// Parse a page selection such as `3`, `1-5` or `2,4,7-9` into sorted,
/// deduplicated 1-based page numbers.
///
/// Pages past `total` are dropped and range ends are clamped to it, so
/// `8-20` on a 10-page document selects 8, 9 and 10.
///
/// # Errors
/// Returns [`InferenceError::InvalidPages`] if a part is not a number or a
/// range, or if nothing in the document is selected.
pub fn parse_page_range(spec: &str, total: u32) -> Result<Vec<u32>, InferenceError> {
    let invalid = || InferenceError::InvalidPages(spec.to_string());
    let number = |s: &str| s.trim().parse::<u32>().map_err(|_| invalid());

    let mut pages = BTreeSet::new();
    for part in spec.split(',') {
        let part = part.trim();
        if let Some((start, end)) = part.split_once('-') {
            let start = number(start)?.max(1);
            let end = number(end)?.min(total);
            pages.extend(start..=end);
        } else {
            let page = number(part)?;
            if (1..=total).contains(&page) {
                pages.insert(page);
            }
        }
    }

    if pages.is_empty() {
        return Err(invalid());
    }
    Ok(pages.into_iter().collect())
}

/// Extract the page count from `pdfinfo` output.
#[must_use]
pub fn parse_page_count(pdfinfo: &str) -> Option<u32> {
    pdfinfo
        .lines()
        .find_map(|line| line.strip_prefix("Pages:"))
        .and_then(|n| n.trim().parse().ok())
}

async fn run_poppler(path: &Path, cmd: &mut Command) -> Result<Vec<u8>, InferenceError> {
    let rasterize_err = |message: String| InferenceError::Rasterize {
        path: path.display().to_string(),
        message,
    };
    let output = cmd.output().await.map_err(|e| rasterize_err(e.to_string()))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(rasterize_err(format!("{} ({})", stderr.trim(), output.status)));
    }
    Ok(output.stdout)
}

/// Number of pages in the document.
///
/// # Errors
/// Returns an error if `pdfinfo` fails or reports no page count.
pub async fn page_count(path: &Path) -> Result<u32, InferenceError> {
    let stdout = run_poppler(path, Command::new("pdfinfo").arg(path)).await?;
    parse_page_count(&String::from_utf8_lossy(&stdout)).ok_or_else(|| InferenceError::Rasterize {
        path: path.display().to_string(),
        message: "pdfinfo reported no page count".to_string(),
    })
}

/// Render one 1-based page to a PNG input labelled `page N`.
///
/// # Errors
/// Returns an error if `pdftoppm` fails or produces nothing.
pub async fn render_page(path: &Path, page: u32) -> Result<ImageInput, InferenceError> {
    let page_arg = page.to_string();
    let png = run_poppler(
        path,
        Command::new("pdftoppm")
            .args(["-png", "-singlefile", "-r"])
            .arg(RENDER_DPI.to_string())
            .args(["-f", &page_arg, "-l", &page_arg])
            .arg(path)
            .arg("-"),
    )
    .await?;
    if png.is_empty() {
        return Err(InferenceError::Rasterize {
            path: path.display().to_string(),
            message: format!("page {page} rendered empty"),
        });
    }
    debug!(page, bytes = png.len(), "page rendered");
    Ok(ImageInput::from_bytes(format!("page {page}"), "image/png", &png))
}

/// Render the selected pages of a PDF, or all of them without a selection.
///
/// # Errors
/// Returns an error for an invalid selection or a failed render.
pub async fn load_pages(
    path: &Path,
    selection: Option<&str>,
) -> Result<Vec<ImageInput>, InferenceError> {
    let total = page_count(path).await?;
    let pages = match selection {
        Some(spec) => parse_page_range(spec, total)?,
        None => (1..=total).collect(),
    };
    info!(pdf = %path.display(), total, selected = pages.len(), "rasterizing PDF");

    let mut images = Vec::with_capacity(pages.len());
    for page in pages {
        images.push(render_page(path, page).await?);
    }
    Ok(images)
}
