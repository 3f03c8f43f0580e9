//! Artifact name generation and validation.
//!
//! Generated names look like `{prefix}{unix_millis}-{uuid}.{ext}` where the
//! prefix depends on the artifact kind (`resized-` for processed outputs).

use resizer_core::ArtifactKind;
use uuid::Uuid;

use crate::traits::{StorageError, StorageResult};

/// Prefix of in-flight files. Such files are never listed or served.
pub const PARTIAL_PREFIX: &str = ".partial-";

const MAX_EXTENSION_LEN: usize = 8;
const MAX_NAME_LEN: usize = 255;

/// Generate a fresh artifact name for `kind` with the given extension.
pub fn generate_name(kind: ArtifactKind, extension: &str) -> StorageResult<String> {
    let extension = normalize_extension(extension)?;
    let millis = chrono::Utc::now().timestamp_millis();
    Ok(format!(
        "{}{}-{}.{}",
        kind.name_prefix(),
        millis,
        Uuid::new_v4(),
        extension
    ))
}

/// Extensions are lowercased and restricted to short ASCII alphanumerics.
pub fn normalize_extension(extension: &str) -> StorageResult<String> {
    let extension = extension.trim().trim_start_matches('.').to_ascii_lowercase();
    if extension.is_empty()
        || extension.len() > MAX_EXTENSION_LEN
        || !extension.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return Err(StorageError::InvalidKey(format!(
            "Invalid artifact extension '{}'",
            extension
        )));
    }
    Ok(extension)
}

/// Whether `name` may address an artifact.
///
/// Rejects path separators, `..`, NUL, hidden and partial files.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_NAME_LEN
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains('\0')
        && !name.contains("..")
        && !name.starts_with('.')
        && !name.starts_with(PARTIAL_PREFIX)
}

/// Whether `name` is a partial file left by a write of a valid artifact name.
pub fn is_partial_name(name: &str) -> bool {
    name.strip_prefix(PARTIAL_PREFIX)
        .is_some_and(is_valid_name)
}

/// Name of the partial file backing an in-flight write of `name`.
pub fn partial_name(name: &str) -> String {
    format!("{}{}", PARTIAL_PREFIX, name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_names() {
        let name = generate_name(ArtifactKind::Processed, "png").unwrap();
        assert!(is_partial_name(&partial_name(&name)));
        assert!(!is_partial_name(&name));
        assert!(!is_partial_name(".partial-../x.png"));
        assert!(!is_partial_name(PARTIAL_PREFIX));
    }

    #[test]
    fn test_generated_names_follow_format() {
        let name = generate_name(ArtifactKind::Processed, "png").unwrap();
        assert!(name.starts_with("resized-"));
        assert!(name.ends_with(".png"));
        assert!(is_valid_name(&name));

        let name = generate_name(ArtifactKind::Uploaded, ".JPG").unwrap();
        assert!(!name.starts_with("resized-"));
        assert!(name.ends_with(".jpg"));
    }

    #[test]
    fn test_generated_names_are_unique() {
        let a = generate_name(ArtifactKind::Processed, "jpeg").unwrap();
        let b = generate_name(ArtifactKind::Processed, "jpeg").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_invalid_extension_rejected() {
        assert!(generate_name(ArtifactKind::Uploaded, "").is_err());
        assert!(generate_name(ArtifactKind::Uploaded, "p/ng").is_err());
        assert!(generate_name(ArtifactKind::Uploaded, "averyverylongext").is_err());
    }

    #[test]
    fn test_name_validation() {
        assert!(is_valid_name("resized-1-abc.png"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("../secret"));
        assert!(!is_valid_name("a/b.png"));
        assert!(!is_valid_name("a\\b.png"));
        assert!(!is_valid_name("a\0.png"));
        assert!(!is_valid_name(".hidden"));
        assert!(!is_valid_name(&partial_name("resized-1-abc.png")));
    }
}
