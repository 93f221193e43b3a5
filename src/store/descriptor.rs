//! Image list descriptor parser
//!
//! The operator edits a plain text file at the store root, one image per
//! line: optional flag keywords followed by the file name, which may be
//! double-quoted when it contains spaces. `#` starts a comment. Entry order
//! matters: it becomes the LUN order on the host.

use std::path::Path;

use tracing::{debug, info, warn};

use crate::error::{AppError, Result};
use crate::gadget::{GadgetParams, ImageEntry};

/// Parse the descriptor file at the store root into gadget parameters.
///
/// Lines naming files that do not exist are dropped with a diagnostic. A
/// missing descriptor file and a descriptor yielding no usable entries are
/// reported as distinct errors.
pub fn parse_descriptor(store_root: &Path, file_name: &str) -> Result<GadgetParams> {
    let path = store_root.join(file_name);
    info!("loading list of images to publish from {}", path.display());

    if !path.is_file() {
        return Err(AppError::DescriptorMissing(path));
    }
    let text = std::fs::read_to_string(&path)?;

    let mut entries = Vec::new();
    for raw in text.lines() {
        let Some(line) = parse_line(raw) else {
            continue;
        };

        let resolved = store_root.join(&line.name);
        if !resolved.is_file() {
            warn!(
                "image file {} does not exist, not publishing it",
                resolved.display()
            );
            continue;
        }

        debug!("image {}: {}", entries.len() + 1, raw.trim());
        entries.push(ImageEntry {
            path: resolved,
            removable: line.removable,
            cdrom: line.cdrom,
            read_only: line.ro,
            nofua: line.nofua,
        });
    }

    if entries.is_empty() {
        return Err(AppError::DescriptorEmpty(path));
    }
    Ok(GadgetParams::from_entries(&entries))
}

/// One directive line, before the named file is checked for existence
struct ParsedLine {
    name: String,
    removable: bool,
    cdrom: bool,
    ro: bool,
    nofua: bool,
}

/// Split a raw line into flags and file name; `None` for blanks, comments
/// and malformed lines.
fn parse_line(raw: &str) -> Option<ParsedLine> {
    let mut line = raw.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    if let Some(pos) = line.find('#') {
        line = line[..pos].trim();
    }
    if line.is_empty() {
        return None;
    }

    let words: Vec<&str> = line.split_whitespace().collect();
    let last = *words.last()?;

    // The file name is the final token, or the quoted span when the final
    // token carries a double quote.
    let name = if last.contains('"') {
        match quoted_span(line) {
            Some(name) => name,
            None => {
                warn!("unterminated quote in descriptor line: {}", raw.trim());
                return None;
            }
        }
    } else {
        last.to_string()
    };
    if name.is_empty() {
        return None;
    }

    Some(ParsedLine {
        name,
        removable: words.iter().any(|w| *w == "removable"),
        cdrom: words.iter().any(|w| *w == "cdrom"),
        ro: words.iter().any(|w| *w == "ro"),
        nofua: words.iter().any(|w| *w == "nofua"),
    })
}

/// Text between the first pair of double quotes on the line
fn quoted_span(line: &str) -> Option<String> {
    let start = line.find('"')?;
    let rest = &line[start + 1..];
    let end = rest.find('"')?;
    Some(rest[..end].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Store root with the given descriptor text and image files present.
    fn store(descriptor: &str, images: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("to-be-mounted.txt"), descriptor).unwrap();
        for image in images {
            std::fs::write(dir.path().join(image), b"image data").unwrap();
        }
        dir
    }

    fn parse(dir: &TempDir) -> Result<GadgetParams> {
        parse_descriptor(dir.path(), "to-be-mounted.txt")
    }

    #[test]
    fn test_sequences_align_in_file_order() {
        let dir = store(
            "cdrom ro first.iso\nremovable second.img\nnofua third.img\n",
            &["first.iso", "second.img", "third.img"],
        );
        let params = parse(&dir).unwrap();

        assert_eq!(params.lun_count(), 3);
        assert_eq!(params.removable.split(',').count(), 3);
        assert_eq!(params.cdrom.split(',').count(), 3);
        assert_eq!(params.ro.split(',').count(), 3);
        assert_eq!(params.nofua.split(',').count(), 3);

        let files: Vec<&str> = params.file.split(',').collect();
        assert!(files[0].ends_with("first.iso"));
        assert!(files[1].ends_with("second.img"));
        assert!(files[2].ends_with("third.img"));
        assert_eq!(params.cdrom, "y,n,n");
        assert_eq!(params.ro, "y,n,n");
        assert_eq!(params.removable, "n,y,n");
        assert_eq!(params.nofua, "n,n,y");
    }

    #[test]
    fn test_quoted_file_name_with_flags() {
        let dir = store("cdrom ro \"My Disc.iso\"\n", &["My Disc.iso"]);
        let params = parse(&dir).unwrap();

        assert!(params.file.ends_with("My Disc.iso"));
        assert_eq!(params.cdrom, "y");
        assert_eq!(params.ro, "y");
        assert_eq!(params.removable, "n");
        assert_eq!(params.nofua, "n");
    }

    #[test]
    fn test_comments_and_blank_lines_are_skipped() {
        let dir = store(
            "# full line comment\n\n   \ncdrom disc.iso # trailing comment\n",
            &["disc.iso"],
        );
        let params = parse(&dir).unwrap();

        assert_eq!(params.lun_count(), 1);
        assert_eq!(params.cdrom, "y");
    }

    #[test]
    fn test_unknown_tokens_are_ignored() {
        let dir = store("cdrom sparkly ro disc.iso\n", &["disc.iso"]);
        let params = parse(&dir).unwrap();

        assert_eq!(params.cdrom, "y");
        assert_eq!(params.ro, "y");
        assert_eq!(params.removable, "n");
    }

    #[test]
    fn test_missing_images_are_dropped_not_fatal() {
        let dir = store("cdrom gone.iso\ncdrom here.iso\n", &["here.iso"]);
        let params = parse(&dir).unwrap();

        assert_eq!(params.lun_count(), 1);
        assert!(params.file.ends_with("here.iso"));
    }

    #[test]
    fn test_only_invalid_lines_is_descriptor_empty() {
        let dir = store("# nothing\ncdrom gone.iso\n", &[]);
        assert!(matches!(parse(&dir), Err(AppError::DescriptorEmpty(_))));
    }

    #[test]
    fn test_missing_file_is_distinct_from_empty() {
        let dir = TempDir::new().unwrap();
        let result = parse_descriptor(dir.path(), "to-be-mounted.txt");
        assert!(matches!(result, Err(AppError::DescriptorMissing(_))));
    }

    #[test]
    fn test_unterminated_quote_drops_the_line() {
        let dir = store("cdrom \"broken.iso\ncdrom fine.iso\n", &["fine.iso"]);
        let params = parse(&dir).unwrap();

        assert_eq!(params.lun_count(), 1);
        assert!(params.file.ends_with("fine.iso"));
    }
}
