//! Magic-byte sniffing and download verification.
//!
//! A remote host answering 200 with an HTML error page, or a connection cut
//! short mid-body, must never end up stored as a ready image.

use tracing::warn;

use super::FetchedImage;
use crate::error::FetchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidReason {
    TooSmall,
    UnrecognizedFormat,
}

/// Detect the image format from its leading bytes and return its MIME type.
pub fn sniff_content_type(data: &[u8]) -> Result<&'static str, InvalidReason> {
    if data.len() < 4 {
        return Err(InvalidReason::TooSmall);
    }

    let detected = match data {
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, ..] => {
            Some("image/png")
        }
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => {
            Some("image/webp")
        }
        [_, _, _, _, b'f', b't', b'y', b'p', b'a', b'v', b'i', b'f' | b's', ..] => {
            Some("image/avif")
        }
        [b'G', b'I', b'F', b'8', b'7' | b'9', b'a', ..] => Some("image/gif"),
        [b'B', b'M', ..] => Some("image/bmp"),
        _ => None,
    };

    detected.ok_or_else(|| {
        warn!(
            head = ?&data[..8.min(data.len())],
            "unrecognized image signature"
        );
        InvalidReason::UnrecognizedFormat
    })
}

/// Check a completed download before it is allowed near the store.
///
/// Returns the sniffed content type on success.
pub fn verify_download(
    url: &str,
    fetched: &FetchedImage,
) -> Result<&'static str, FetchError> {
    let actual = fetched.bytes.len() as u64;

    if let Some(expected) = fetched.declared_len
        && expected != actual
    {
        return Err(FetchError::LengthMismatch {
            url: url.to_string(),
            expected,
            actual,
        });
    }

    if actual == 0 {
        return Err(FetchError::Empty {
            url: url.to_string(),
        });
    }

    sniff_content_type(&fetched.bytes).map_err(|_| FetchError::NotAnImage {
        url: url.to_string(),
    })
}
