//! Accumulation of a paged source's results.
//!
//! Once a source's index has been fetched, each page or chunk stands on its
//! own: a failed request is logged and skipped and the pages already parsed
//! are kept.

use std::fmt::Display;

use roadsigns_core::{PartialDatabase, PartialRecord};
use tracing::{debug, info, warn};

use crate::SourceError;

/// How records for the same (country, code) from different pages combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Combine {
    /// First non-empty value per field wins.
    Fill,
    /// The later record replaces the earlier one.
    Replace,
}

pub(crate) struct Pages {
    source: &'static str,
    combine: Combine,
    db: PartialDatabase,
    fetched: usize,
    failed: usize,
}

impl Pages {
    pub(crate) fn new(source: &'static str, combine: Combine) -> Self {
        Self {
            source,
            combine,
            db: PartialDatabase::new(),
            fetched: 0,
            failed: 0,
        }
    }

    /// Fold one page's outcome in.
    pub(crate) fn add(
        &mut self,
        page: impl Display,
        result: Result<Vec<PartialRecord>, SourceError>,
    ) {
        let records = match result {
            Ok(records) => records,
            Err(err) => {
                warn!(
                    source = self.source,
                    page = %page,
                    error = %err,
                    "page failed, skipping"
                );
                self.failed += 1;
                return;
            }
        };
        self.fetched += 1;
        if records.is_empty() {
            warn!(source = self.source, page = %page, "page had no usable items");
            return;
        }
        debug!(source = self.source, page = %page, records = records.len(), "parsed page");
        for record in records {
            match self.combine {
                Combine::Fill => self.db.push_partial(record),
                Combine::Replace => {
                    self.db.insert(record.country, record.code, record.fields);
                }
            }
        }
    }

    pub(crate) fn finish(self) -> PartialDatabase {
        info!(
            source = self.source,
            pages = self.fetched,
            failed = self.failed,
            signs = self.db.sign_count(),
            "finished paged source"
        );
        self.db
    }
}
