//! Table of contents mapping entry names to fetchable byte ranges.

use log::warn;
use std::collections::HashMap;

use super::structures::CentralDirectoryEntry;
use crate::error::{Result, SziError};

/// Where an entry lives in the archive.
///
/// `start` is the offset of the entry's local header. The header's length
/// is unknown until it is fetched, so `max_end` is only an upper bound on
/// where the entry ends: the start of the next entry in file order, or the
/// central directory for the last one. Fetching `start..max_end` always
/// covers header and body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveIndexEntry {
    pub start: u64,
    pub max_end: u64,
    pub body_length: u64,
}

/// Immutable name -> [`ArchiveIndexEntry`] lookup, built once per archive
#[derive(Debug, Clone, Default)]
pub struct ArchiveIndex {
    entries: HashMap<String, ArchiveIndexEntry>,
}

impl ArchiveIndex {
    /// Build the index from decoded directory entries.
    ///
    /// Entries are walked in descending local header offset, each bounded
    /// by the entry after it in the file. If two entries share a name, the
    /// one walked last (the lower offset) wins.
    ///
    /// # Errors
    ///
    /// [`SziError::InvalidEntryOffset`] if an entry claims to start at or
    /// past the central directory.
    pub fn build(
        mut directory: Vec<CentralDirectoryEntry>,
        directory_offset: u64,
    ) -> Result<Self> {
        directory.sort_by(|a, b| b.local_header_offset.cmp(&a.local_header_offset));

        let mut entries = HashMap::with_capacity(directory.len());
        // Entries sharing an offset share a bound
        let mut group_start = directory_offset;
        let mut max_end = directory_offset;

        for entry in directory {
            let start = entry.local_header_offset;
            if start >= directory_offset {
                return Err(SziError::InvalidEntryOffset {
                    filename: entry.filename,
                    offset: start,
                });
            }
            if start < group_start {
                max_end = group_start;
                group_start = start;
            }

            let location = ArchiveIndexEntry {
                start,
                max_end,
                body_length: entry.uncompressed_size,
            };
            if let Some(previous) = entries.insert(entry.filename, location) {
                warn!(
                    "Duplicate entry name; keeping the one at offset {} over {}",
                    start, previous.start
                );
            }
        }

        Ok(Self { entries })
    }

    pub fn get(&self, filename: &str) -> Option<&ArchiveIndexEntry> {
        self.entries.get(filename)
    }

    pub fn contains(&self, filename: &str) -> bool {
        self.entries.contains_key(filename)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArchiveIndexEntry)> {
        self.entries.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    /// Entry names, in no particular order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Entries in the order they appear in the archive
    pub fn in_file_order(&self) -> Vec<(&str, &ArchiveIndexEntry)> {
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort_by_key(|(name, entry)| (entry.start, *name));
        entries
    }

    /// Find the single manifest entry, named `X/X.<suffix>`.
    pub fn find_manifest(&self, suffix: &str) -> Result<&str> {
        let mut matches: Vec<&str> = self
            .names()
            .filter(|name| is_manifest_name(name, suffix))
            .collect();

        match matches.len() {
            0 => Err(SziError::ManifestNotFound),
            1 => Ok(matches[0]),
            _ => {
                matches.sort_unstable();
                Err(SziError::AmbiguousManifest(
                    matches.into_iter().map(str::to_owned).collect(),
                ))
            }
        }
    }
}

/// Whether `name` is one top-level segment repeated as `X/X.<suffix>`
pub fn is_manifest_name(name: &str, suffix: &str) -> bool {
    let Some((dir, file)) = name.split_once('/') else {
        return false;
    };

    file.strip_prefix(dir)
        .and_then(|rest| rest.strip_prefix('.'))
        .is_some_and(|ext| ext == suffix)
}

/// Directory holding the tiles that belong to a manifest `X/X.<suffix>`
pub fn tiles_directory(manifest: &str) -> String {
    let base = manifest.split('/').next().unwrap_or_default();
    format!("{base}/{base}_files/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, offset: u64, size: u64) -> CentralDirectoryEntry {
        CentralDirectoryEntry {
            filename: name.to_string(),
            uncompressed_size: size,
            local_header_offset: offset,
            disk_start: 0,
        }
    }

    #[test]
    fn bounds_each_entry_by_its_successor() {
        let index = ArchiveIndex::build(
            vec![
                entry("b", 100, 40),
                entry("a", 0, 50),
                entry("c", 250, 10),
            ],
            300,
        )
        .unwrap();

        assert_eq!(index.len(), 3);
        assert_eq!(
            index.get("a"),
            Some(&ArchiveIndexEntry {
                start: 0,
                max_end: 100,
                body_length: 50
            })
        );
        assert_eq!(index.get("b").unwrap().max_end, 250);
        assert_eq!(index.get("c").unwrap().max_end, 300);

        let order: Vec<_> = index.in_file_order().iter().map(|(n, _)| *n).collect();
        assert_eq!(order, ["a", "b", "c"]);
    }

    #[test]
    fn empty_directory_builds_empty_index() {
        let index = ArchiveIndex::build(Vec::new(), 0).unwrap();
        assert!(index.is_empty());
        assert_eq!(index.names().count(), 0);
    }

    #[test]
    fn names_cover_every_entry() {
        let index = ArchiveIndex::build(
            vec![entry("x/x.dzi", 0, 5), entry("x/x_files/0/0_0.jpeg", 40, 9)],
            80,
        )
        .unwrap();

        let mut names: Vec<_> = index.names().collect();
        names.sort_unstable();
        assert_eq!(names, ["x/x.dzi", "x/x_files/0/0_0.jpeg"]);
        assert!(names.iter().all(|name| index.contains(name)));
    }

    #[test]
    fn duplicate_names_keep_the_lower_offset() {
        let index =
            ArchiveIndex::build(vec![entry("dup", 0, 5), entry("dup", 60, 7)], 120).unwrap();

        assert_eq!(index.len(), 1);
        assert_eq!(
            index.get("dup"),
            Some(&ArchiveIndexEntry {
                start: 0,
                max_end: 60,
                body_length: 5
            })
        );
    }

    #[test]
    fn shared_offsets_share_a_bound() {
        let index = ArchiveIndex::build(
            vec![entry("x", 0, 5), entry("y", 40, 5), entry("z", 40, 5)],
            90,
        )
        .unwrap();

        assert_eq!(index.get("y").unwrap().max_end, 90);
        assert_eq!(index.get("z").unwrap().max_end, 90);
        assert_eq!(index.get("x").unwrap().max_end, 40);
    }

    #[test]
    fn entries_at_or_past_the_directory_are_rejected() {
        let err = ArchiveIndex::build(vec![entry("a", 0, 5), entry("late", 90, 5)], 90)
            .unwrap_err();
        assert!(matches!(
            err,
            SziError::InvalidEntryOffset { ref filename, offset: 90 } if filename == "late"
        ));
    }

    #[test]
    fn manifest_names() {
        assert!(is_manifest_name("a/a.dzi", "dzi"));
        assert!(is_manifest_name("mixmas/mixmas.manifest", "manifest"));
        assert!(!is_manifest_name("a/b.dzi", "dzi"));
        assert!(!is_manifest_name("a/a.dzi", "xml"));
        assert!(!is_manifest_name("a/a/a.dzi", "dzi"));
        assert!(!is_manifest_name("a.dzi", "dzi"));
        assert!(!is_manifest_name("a/aa.dzi", "dzi"));
    }

    #[test]
    fn finds_exactly_one_manifest() {
        let index = ArchiveIndex::build(
            vec![
                entry("a/a.dzi", 0, 5),
                entry("a/a_files/0/0_0.jpeg", 50, 5),
            ],
            100,
        )
        .unwrap();
        assert_eq!(index.find_manifest("dzi").unwrap(), "a/a.dzi");
        assert!(matches!(
            index.find_manifest("xml"),
            Err(SziError::ManifestNotFound)
        ));

        let index =
            ArchiveIndex::build(vec![entry("a/a.dzi", 0, 5), entry("b/b.dzi", 50, 5)], 100)
                .unwrap();
        assert!(matches!(
            index.find_manifest("dzi"),
            Err(SziError::AmbiguousManifest(names)) if names == ["a/a.dzi", "b/b.dzi"]
        ));
    }

    #[test]
    fn tiles_directory_follows_manifest() {
        assert_eq!(tiles_directory("mixmas/mixmas.dzi"), "mixmas/mixmas_files/");
    }
}
