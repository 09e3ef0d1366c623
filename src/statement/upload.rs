//! Validation and naming of uploaded statement files.

use rand::{RngCore, rngs::OsRng};

use crate::Error;

/// The largest statement file that will be accepted, 10 MiB.
pub const MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024;

/// MIME types that are stored as `.csv` files.
pub const CSV_MIME_TYPES: [&str; 7] = [
    "text/csv",
    "application/csv",
    "text/plain",
    "application/vnd.ms-excel",
    "text/x-csv",
    "text/comma-separated-values",
    "text/tab-separated-values",
];

/// The MIME type that is stored as a `.pdf` file.
pub const PDF_MIME_TYPE: &str = "application/pdf";

const ALLOWED_EXTENSIONS: [&str; 2] = ["csv", "pdf"];

/// The number of random bytes in a stored file name suffix.
const SUFFIX_BYTES: usize = 6;

/// The base name used when the client did not send a usable file name.
const FALLBACK_BASE_NAME: &str = "statement";

/// The longest base name kept, in bytes. Leaves room for the suffix and
/// extension within the usual 255 byte file name limit.
const MAX_BASE_NAME_BYTES: usize = 200;

/// A file received from the statement upload form.
#[derive(Debug, Clone)]
pub struct Upload {
    /// The file name as sent by the browser, e.g. "statement.csv".
    pub client_name: String,
    /// The MIME type from the multipart headers, if any.
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl Upload {
    /// The MIME type of the upload without parameters, lower-cased.
    ///
    /// Falls back to sniffing the content if the client did not send a type.
    pub fn mime_type(&self) -> String {
        match self.content_type.as_deref().map(normalize_mime) {
            Some(mime) if !mime.is_empty() => mime,
            _ => sniff_mime(&self.bytes).to_owned(),
        }
    }
}

fn normalize_mime(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Guess a MIME type from the first bytes of a file.
pub fn sniff_mime(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(b"%PDF-") {
        PDF_MIME_TYPE
    } else if std::str::from_utf8(bytes).is_ok() {
        "text/plain"
    } else {
        "application/octet-stream"
    }
}

fn sniff_extension(bytes: &[u8]) -> Option<&'static str> {
    bytes.starts_with(b"%PDF-").then_some("pdf")
}

/// Whether files of type `mime` may be uploaded.
pub fn is_allowed_mime(mime: &str) -> bool {
    mime == PDF_MIME_TYPE || CSV_MIME_TYPES.contains(&mime)
}

/// Check the MIME type and size of an upload.
///
/// # Errors
/// Returns [Error::UnsupportedMediaType] for MIME types other than the CSV
/// and PDF types, and [Error::FileTooLarge] for files over [MAX_UPLOAD_SIZE].
pub fn validate_upload(upload: &Upload) -> Result<String, Error> {
    let mime = upload.mime_type();

    if !is_allowed_mime(&mime) {
        return Err(Error::UnsupportedMediaType(mime));
    }

    if upload.bytes.len() > MAX_UPLOAD_SIZE {
        return Err(Error::FileTooLarge(upload.bytes.len()));
    }

    Ok(mime)
}

/// The client file name without directories and without its last extension,
/// truncated to [MAX_BASE_NAME_BYTES] on a character boundary.
///
/// Returns "statement" if nothing usable is left.
pub fn base_name(client_name: &str) -> String {
    let file_name = client_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();
    let stem = match file_name.rsplit_once('.') {
        Some((stem, _)) => stem,
        None => file_name,
    };
    let stem: String = stem.chars().filter(|c| !c.is_control()).collect();
    let stem = truncate_to_boundary(stem.trim(), MAX_BASE_NAME_BYTES).trim();

    if stem.is_empty() {
        FALLBACK_BASE_NAME.to_owned()
    } else {
        stem.to_owned()
    }
}

fn truncate_to_boundary(text: &str, max_bytes: usize) -> &str {
    let end = text
        .char_indices()
        .map(|(start, c)| start + c.len_utf8())
        .take_while(|end| *end <= max_bytes)
        .last()
        .unwrap_or(0);

    &text[..end]
}

fn client_extension(client_name: &str) -> Option<String> {
    let file_name = client_name.rsplit(['/', '\\']).next()?;
    let (stem, extension) = file_name.rsplit_once('.')?;

    if stem.is_empty() {
        return None;
    }

    Some(extension.trim().to_lowercase())
}

/// Decide the extension of the stored file.
///
/// CSV MIME types give `csv` and the PDF MIME type gives `pdf`. Any other
/// type falls back to the client's extension, or one sniffed from the content.
///
/// # Errors
/// Returns [Error::InvalidFileExtension] unless the result is `csv` or `pdf`.
pub fn resolve_extension(mime: &str, client_name: &str, bytes: &[u8]) -> Result<String, Error> {
    let extension = if CSV_MIME_TYPES.contains(&mime) {
        "csv".to_owned()
    } else if mime == PDF_MIME_TYPE {
        "pdf".to_owned()
    } else {
        client_extension(client_name)
            .filter(|extension| !extension.is_empty())
            .or_else(|| sniff_extension(bytes).map(str::to_owned))
            .unwrap_or_default()
    };

    if ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        Ok(extension)
    } else {
        Err(Error::InvalidFileExtension(extension))
    }
}

/// Build a stored file name of the form `<base>-<12 hex chars>.<extension>`.
///
/// The suffix comes from the operating system's secure random number
/// generator, so two uploads with the same name get different files.
pub fn unique_filename(base: &str, extension: &str) -> String {
    let mut suffix = [0u8; SUFFIX_BYTES];
    OsRng.fill_bytes(&mut suffix);

    format!("{base}-{}.{extension}", hex::encode(suffix))
}
