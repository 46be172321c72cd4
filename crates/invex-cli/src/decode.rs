//! Document decoding: file bytes to text.
//!
//! Only text-bearing documents are decoded. Images are rejected, PDFs are
//! read through their text layer, and JSON files carry an already decoded
//! document.

use std::fs;
use std::panic;
use std::path::Path;

use tracing::{debug, warn};

use invex_core::DecodedDocument;

pub const IMAGE_DISABLED: &str =
    "Image extraction disabled. Please upload a PDF or text-based document.";

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tif", "tiff", "bmp", "gif", "webp"];

/// Extensions the batch command picks up.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "txt", "text", "pdf", "json", "png", "jpg", "jpeg", "tif", "tiff", "bmp", "gif", "webp",
];

/// Lower-case extension of a path.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

/// Decode a file. Failures are reported inside the document, never raised.
pub fn decode_file(path: &Path) -> DecodedDocument {
    let extension = extension_of(path);
    if IMAGE_EXTENSIONS.contains(&extension.as_str()) {
        return DecodedDocument::failed(IMAGE_DISABLED);
    }

    match fs::read(path) {
        Ok(bytes) => decode_bytes(&bytes, &extension),
        Err(e) => DecodedDocument::failed(format!("Cannot read {}: {}", path.display(), e)),
    }
}

/// Decode raw bytes according to the file extension.
pub fn decode_bytes(bytes: &[u8], extension: &str) -> DecodedDocument {
    match extension {
        "pdf" => decode_pdf(bytes),
        "json" => serde_json::from_slice(bytes)
            .unwrap_or_else(|e| DecodedDocument::failed(format!("Invalid decoded document: {}", e))),
        _ => match String::from_utf8(bytes.to_vec()) {
            Ok(text) => DecodedDocument::from_text(text),
            Err(_) => {
                warn!("Input is not valid UTF-8, decoding lossily");
                DecodedDocument::from_text(String::from_utf8_lossy(bytes).into_owned())
            }
        },
    }
}

fn decode_pdf(bytes: &[u8]) -> DecodedDocument {
    // pdf-extract panics on some malformed content streams
    match panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes)) {
        Ok(Ok(text)) if !text.trim().is_empty() => {
            debug!("Extracted {} characters from PDF text layer", text.len());
            DecodedDocument::from_text(text)
        }
        Ok(Ok(_)) => DecodedDocument::failed("No text layer found in PDF"),
        Ok(Err(e)) => DecodedDocument::failed(format!("PDF text extraction failed: {}", e)),
        Err(_) => DecodedDocument::failed("PDF text extraction failed: malformed document"),
    }
}
