use std::collections::BTreeSet;

use crate::StoryId;

/// Result of comparing a freshly observed set of story ids with a watermark.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delta {
    /// Ids strictly above the watermark, ascending, without duplicates.
    pub new_ids: Vec<StoryId>,
    /// Highest observed id, or the old watermark when nothing was observed.
    pub next_watermark: StoryId,
}

impl Delta {
    pub fn is_empty(&self) -> bool {
        self.new_ids.is_empty()
    }
}

/// Compute which story ids are new relative to `watermark`.
///
/// Feeding `next_watermark` back in with the same ids always yields an empty delta.
pub fn detect<I>(current_ids: I, watermark: StoryId) -> Delta
where
    I: IntoIterator<Item = StoryId>,
{
    let current: BTreeSet<StoryId> = current_ids.into_iter().collect();
    let next_watermark = current.last().copied().unwrap_or(watermark);
    let new_ids = current.into_iter().filter(|id| *id > watermark).collect();
    Delta {
        new_ids,
        next_watermark,
    }
}
