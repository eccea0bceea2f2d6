// src/utils/mod.rs
use log::{debug, info};
use std::time::Instant;

pub fn setup_logging(level: log::LevelFilter) -> Result<(), fern::InitError> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}][{}] {}",
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .level_for("hyper", log::LevelFilter::Warn)
        .level_for("reqwest", log::LevelFilter::Warn)
        .level_for("redis", log::LevelFilter::Warn)
        .chain(std::io::stdout())
        .apply()?;
    info!("Logging initialized.");
    Ok(())
}

/// Percent-escapes spaces, the only escaping applied to image URLs before
/// they are used as cache keys.
pub fn escape_spaces(url: &str) -> String {
    url.replace(' ', "%20")
}

/// Lowercase hex MD5 digest of `input`; names downloaded image files.
pub fn md5_hex(input: &str) -> String {
    format!("{:x}", md5::compute(input.as_bytes()))
}

/// Turns a caller-supplied logical name into a single safe path component.
pub fn sanitize_file_stem(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "_".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Logs how long an awaited request took.
pub async fn log_timed_request<T>(label: &str, f: impl std::future::Future<Output = T>) -> T {
    let start = Instant::now();
    let result = f.await;
    debug!("{} completed in {} ms", label, start.elapsed().as_millis());
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_spaces_only_touches_spaces() {
        assert_eq!(
            escape_spaces("https://host/a b/c d.jpg?x=1"),
            "https://host/a%20b/c%20d.jpg?x=1"
        );
    }

    #[test]
    fn test_md5_hex_is_stable() {
        assert_eq!(md5_hex(""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(md5_hex("abc"), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn test_sanitize_file_stem_blocks_traversal() {
        assert_eq!(sanitize_file_stem("../../etc/passwd"), "_.._etc_passwd");
        assert_eq!(sanitize_file_stem("MW 1801"), "MW_1801");
        assert_eq!(sanitize_file_stem("   "), "_");
    }
}
