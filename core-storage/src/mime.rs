//! Mimetype inference for inventory-backed files
//!
//! Inventories record digests, not media types, so the type is inferred from
//! the file name (or the download-filename hint when one exists).

/// Fallback for names with no recognised extension
pub const DEFAULT_MIMETYPE: &str = "application/octet-stream";

const TEI_MIMETYPE: &str = "application/tei+xml";

/// Infer a mimetype from a file name.
///
/// A name without any `.` (typical for stream ids like `PDF` or `JP2`) is
/// treated as a bare extension.
pub fn infer_mimetype(filename: &str) -> &'static str {
    let lower = filename.to_lowercase();
    if lower.ends_with(".tei.xml") || lower.ends_with(".tei") {
        return TEI_MIMETYPE;
    }

    let extension = lower.rsplit('.').next().unwrap_or("");

    match extension {
        "xml" => "text/xml",
        "txt" | "text" => "text/plain",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "csv" => "text/csv",
        "js" => "application/javascript",
        "json" => "application/json",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        "tar" => "application/x-tar",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "epub" => "application/epub+zip",
        "rdf" => "application/rdf+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "jp2" => "image/jp2",
        "gif" => "image/gif",
        "tif" | "tiff" => "image/tiff",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "dng" => "image/x-adobe-dng",
        "mp3" => "audio/mpeg",
        "wav" => "audio/x-wav",
        "m4a" => "audio/mp4",
        "ogg" => "audio/ogg",
        "flac" => "audio/flac",
        "mp4" => "video/mp4",
        "m4v" => "video/x-m4v",
        "mov" => "video/quicktime",
        "mkv" => "video/x-matroska",
        "webm" => "video/webm",
        "avi" => "video/x-msvideo",
        _ => DEFAULT_MIMETYPE,
    }
}
