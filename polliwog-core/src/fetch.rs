//! Content-addressed attachment download
//!
//! An attachment's place in the archive is derived entirely from event
//! fields and the attachment key, so the existence of a file at that place
//! is the idempotency marker: no manifest, no database. Re-running a pass
//! over an already-archived range performs no network calls for it.
//!
//! The on-disk check covers all four accepted extensions because the sniffer
//! may have renamed a mislabeled image after the original download.

use std::path::PathBuf;

use md5::{Digest, Md5};

use crate::client::EventFeed;
use crate::config::ArchiveConfig;
use crate::error::Result;
use crate::template::{expand, TemplateFields};
use crate::types::{Event, MediaKind};

/// Lowercase hex MD5 of an attachment key.
///
/// Stable across runs for the same key; used for the `%keymd5%` placeholder.
pub fn key_digest(key: &str) -> String {
    hex::encode(Md5::digest(key.as_bytes()))
}

/// Expanded directory and filename templates for the archive tree.
#[derive(Debug, Clone)]
pub struct ArchiveLayout {
    dir_template: String,
    file_template: String,
}

impl ArchiveLayout {
    pub fn new(config: &ArchiveConfig) -> Self {
        Self {
            dir_template: config.dir_template.clone(),
            file_template: config.file_template.clone(),
        }
    }

    /// Compute the archive target for one attachment of one event.
    pub fn target(&self, key: &str, event: &Event) -> ArchiveTarget {
        let digest = key_digest(key);
        let (year, month, day) = event.date_parts();
        let fields = TemplateFields {
            child: &event.parent_member_display,
            year,
            month,
            day,
            key_md5: &digest,
            img_key: key,
        };

        ArchiveTarget {
            dir: PathBuf::from(expand(&self.dir_template, &fields)),
            stem: expand(&self.file_template, &fields),
        }
    }
}

/// One attachment's location in the archive: a directory plus an
/// extensionless basename.
#[derive(Debug, Clone)]
pub struct ArchiveTarget {
    pub dir: PathBuf,
    pub stem: String,
}

impl ArchiveTarget {
    /// Full path under this target for a given extension.
    pub fn with_extension(&self, ext: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", self.stem, ext))
    }

    /// Path of the sibling comment file.
    pub fn comment_path(&self) -> PathBuf {
        self.with_extension("txt")
    }

    /// Returns the already-archived file for this target, if any accepted
    /// extension exists on disk.
    pub fn existing(&self) -> Option<PathBuf> {
        MediaKind::EXTENSIONS
            .iter()
            .map(|ext| self.with_extension(ext))
            .find(|path| path.exists())
    }
}

/// Downloads attachments into the archive, one at a time.
pub struct AttachmentFetcher<'a, F> {
    feed: &'a F,
    layout: &'a ArchiveLayout,
}

impl<'a, F: EventFeed> AttachmentFetcher<'a, F> {
    pub fn new(feed: &'a F, layout: &'a ArchiveLayout) -> Self {
        Self { feed, layout }
    }

    /// Fetch one attachment if it is not already archived.
    ///
    /// Returns the written path, or `None` when the file already exists or
    /// the declared content type is outside the four accepted kinds. The
    /// comment sibling is written before the download so it survives a
    /// download failure.
    pub async fn fetch(&self, key: &str, event: &Event) -> Result<Option<PathBuf>> {
        let target = self.layout.target(key, event);

        if let Some(existing) = target.existing() {
            tracing::debug!(path = %existing.display(), "Already archived, skipping");
            return Ok(None);
        }

        tracing::info!(
            stem = %target.stem,
            event_date = %event.event_date,
            "Not archived yet, downloading"
        );

        std::fs::create_dir_all(&target.dir)?;

        if let Some(comment) = event.nonempty_comment() {
            std::fs::write(target.comment_path(), comment)?;
        }

        let attachment = self.feed.attachment(key).await?;

        let Some(kind) = MediaKind::from_content_type(&attachment.content_type) else {
            tracing::info!(
                content_type = %attachment.content_type,
                "Content type excluded, skipping"
            );
            return Ok(None);
        };

        let path = target.with_extension(kind.extension());
        std::fs::write(&path, &attachment.bytes)?;

        Ok(Some(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ArchiveConfig;
    use tempfile::TempDir;

    fn event() -> Event {
        Event {
            event_time: 1546354800,
            event_date: "2019-01-01".to_string(),
            parent_member_display: "Maya".to_string(),
            comment: None,
            attachments: vec!["obj-a".to_string()],
        }
    }

    #[test]
    fn test_key_digest_is_md5_hex() {
        // Well-known MD5 test vector.
        assert_eq!(key_digest("hello"), "5d41402abc4b2a76b9719d911017c592");
    }

    #[test]
    fn test_target_expands_both_templates() {
        let layout = ArchiveLayout::new(&ArchiveConfig {
            dir_template: "/arch/%child%/%YYYY%/%MM%/".to_string(),
            file_template: "%DD%-%keymd5%".to_string(),
        });

        let target = layout.target("obj-a", &event());
        assert_eq!(target.dir, PathBuf::from("/arch/Maya/2019/01/"));
        assert_eq!(target.stem, format!("01-{}", key_digest("obj-a")));
        assert_eq!(
            target.with_extension("jpg"),
            PathBuf::from(format!("/arch/Maya/2019/01/01-{}.jpg", key_digest("obj-a")))
        );
    }

    #[test]
    fn test_existing_checks_all_accepted_extensions() {
        let tmp = TempDir::new().unwrap();
        let target = ArchiveTarget {
            dir: tmp.path().to_path_buf(),
            stem: "photo".to_string(),
        };

        assert!(target.existing().is_none());

        for ext in MediaKind::EXTENSIONS {
            let path = target.with_extension(ext);
            std::fs::write(&path, b"x").unwrap();
            assert_eq!(target.existing(), Some(path.clone()));
            std::fs::remove_file(&path).unwrap();
        }

        // The comment sibling does not count as archived media.
        std::fs::write(target.comment_path(), b"note").unwrap();
        assert!(target.existing().is_none());
    }
}
