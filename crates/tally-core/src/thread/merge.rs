//! Merge rules for incoming files

use super::types::{CachedFile, ThreadCache};
use crate::compat::CompatibilityMetadata;
use std::collections::BTreeSet;

fn years_of<'a>(files: impl IntoIterator<Item = &'a CachedFile>) -> BTreeSet<u16> {
    files.into_iter().filter_map(CachedFile::year).collect()
}

impl ThreadCache {
    /// Evict cached files from years the incoming files do not cover
    ///
    /// Applies when the cached and incoming files together span more than
    /// one year and that mix was never assessed as compatible: either the
    /// incoming assessment is missing or incompatible, or the stored one is
    /// incompatible. Files without a year are kept. After eviction the
    /// assessment that will be stored is marked compatible, since the
    /// remaining files no longer mix years.
    ///
    /// Returns the evicted years.
    pub(crate) fn enforce_year_consistency(
        &mut self,
        incoming: &[CachedFile],
        incoming_metadata: Option<&mut CompatibilityMetadata>,
    ) -> BTreeSet<u16> {
        let existing_years = years_of(self.files());
        let new_years = years_of(incoming);
        if existing_years.is_empty() || new_years.is_empty() {
            return BTreeSet::new();
        }
        if existing_years.union(&new_years).count() < 2 {
            return BTreeSet::new();
        }

        let incoming_compatible = incoming_metadata
            .as_ref()
            .is_some_and(|m| m.is_fully_compatible);
        let stored_incompatible = self
            .compatibility_metadata
            .as_ref()
            .is_some_and(|m| !m.is_fully_compatible);
        if incoming_compatible && !stored_incompatible {
            return BTreeSet::new();
        }

        self.retain_files(|file| file.year().is_none_or(|year| new_years.contains(&year)));

        match incoming_metadata {
            Some(metadata) => metadata.is_fully_compatible = true,
            None => {
                if let Some(stored) = self.compatibility_metadata.as_mut() {
                    stored.is_fully_compatible = true;
                }
            }
        }

        existing_years.difference(&new_years).copied().collect()
    }

    /// Merge incoming files into the cache
    pub(crate) fn merge_files(&mut self, incoming: &[CachedFile]) {
        for file in incoming {
            self.upsert_file(file);
        }
    }
}
