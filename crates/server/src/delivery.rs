//! Persisting rendered reports and streaming them back as downloads.

use std::io;
use std::path::{Path, PathBuf};

use asset_report::emit::RenderedReport;
use axum::body::Body;
use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};
use uuid::Uuid;

/// Number of images left out of the document.
pub const SKIPPED_IMAGES_HEADER: HeaderName = HeaderName::from_static("x-report-skipped-images");

const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Writes `bytes` to `output_dir/file_name`.
///
/// The bytes go to a uniquely named temporary file first, which is then renamed over the
/// final name, so a reader never sees a partially written report.
pub async fn persist(output_dir: &Path, file_name: &str, bytes: &[u8]) -> io::Result<PathBuf> {
    tokio::fs::create_dir_all(output_dir).await?;

    let final_path = output_dir.join(file_name);
    let temp_path = output_dir.join(format!(".{file_name}.{}.tmp", Uuid::new_v4()));

    if let Err(err) = tokio::fs::write(&temp_path, bytes).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(err);
    }
    if let Err(err) = tokio::fs::rename(&temp_path, &final_path).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(err);
    }

    debug!(path = %final_path.display(), size = bytes.len(), "Report written");
    Ok(final_path)
}

/// Persists the report and answers with the file as an attachment.
pub async fn deliver(
    output_dir: &Path,
    file_name: &str,
    report: RenderedReport,
) -> io::Result<Response> {
    let path = persist(output_dir, file_name, &report.bytes).await?;
    let file = tokio::fs::File::open(&path).await?;
    let body = Body::from_stream(ReaderStream::new(file));

    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{file_name}\""))
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))?;

    let mut response = (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(PDF_CONTENT_TYPE)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response();

    if report.skipped_images > 0 {
        warn!(file_name, skipped = report.skipped_images, "Report rendered without some images");
        response
            .headers_mut()
            .insert(SKIPPED_IMAGES_HEADER, HeaderValue::from(report.skipped_images));
    }

    Ok(response)
}
