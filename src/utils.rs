//! Utility functions

use crate::error::{ClientError, Result};

/// Uploads are split on multiples of this many bytes
pub const CHUNK_ALIGNMENT: usize = 256 * 1024;

/// Check that a chunk size is a positive multiple of 256 KiB
pub fn validate_chunk_size(chunk_size: usize) -> Result<()> {
    if chunk_size == 0 || chunk_size % CHUNK_ALIGNMENT != 0 {
        return Err(ClientError::Configuration(format!(
            "Chunk size must be a multiple of {}, found {}",
            CHUNK_ALIGNMENT, chunk_size
        )));
    }
    Ok(())
}

/// Byte ranges `[start, stop)` covering `total` bytes in chunks
pub fn chunk_ranges(total: usize, chunk_size: usize) -> Vec<(usize, usize)> {
    (0..total)
        .step_by(chunk_size.max(1))
        .map(|start| (start, (start + chunk_size).min(total)))
        .collect()
}

/// `Content-Range` header value for one chunk
pub fn content_range(start: usize, stop: usize, total: usize) -> String {
    format!("bytes {}-{}/{}", start, stop.saturating_sub(1), total)
}

/// Format byte size in human-readable form
pub fn format_bytes(bytes: usize) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB", "PB"];

    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}

/// Evenly spaced values from `start` to `stop` inclusive
pub fn linspace(start: f64, stop: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![start],
        _ => (0..count)
            .map(|i| start + (stop - start) * i as f64 / (count - 1) as f64)
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_size_validation() {
        assert!(validate_chunk_size(80 * 256 * 1024).is_ok());
        assert!(validate_chunk_size(256 * 1024).is_ok());
        assert!(validate_chunk_size(0).is_err());
        assert!(validate_chunk_size(1000).is_err());
    }

    #[test]
    fn test_chunk_ranges() {
        assert_eq!(chunk_ranges(10, 4), vec![(0, 4), (4, 8), (8, 10)]);
        assert_eq!(chunk_ranges(8, 4), vec![(0, 4), (4, 8)]);
        assert!(chunk_ranges(0, 4).is_empty());
    }

    #[test]
    fn test_content_range() {
        assert_eq!(content_range(0, 72, 72), "bytes 0-71/72");
        assert_eq!(content_range(262144, 300000, 300000), "bytes 262144-299999/300000");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(20 * 1024 * 1024), "20.00 MB");
    }

    #[test]
    fn test_linspace() {
        assert_eq!(linspace(0.0, 1.0, 3), vec![0.0, 0.5, 1.0]);
        assert_eq!(linspace(2.0, 5.0, 1), vec![2.0]);
        assert!(linspace(0.0, 1.0, 0).is_empty());
    }
}
