//! Raw activity indices and merged display pages.
//!
//! The user navigates pages: one exercise plus the break that follows it.
//! The engine walks raw indices. [`PageMap`] is the only place that
//! translates between the two.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::model::Activity;

/// Position in the activity sequence, breaks included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawIndex(usize);

impl RawIndex {
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    pub const fn get(self) -> usize {
        self.0
    }

    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for RawIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Position in the break-merged view shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DisplayPage(usize);

impl DisplayPage {
    pub const fn new(page: usize) -> Self {
        Self(page)
    }

    pub const fn get(self) -> usize {
        self.0
    }
}

impl fmt::Display for DisplayPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page {}", self.0)
    }
}

/// One navigable page: an exercise and its optional trailing break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedPage {
    pub exercise: RawIndex,
    pub rest: Option<RawIndex>,
}

#[derive(Debug, Clone, Default)]
pub struct PageMap {
    /// Page of every raw index; breaks share the page of their exercise.
    page_of_raw: Vec<DisplayPage>,
    pages: Vec<MergedPage>,
}

impl PageMap {
    /// Build the merged view. Expects the break-pairing rule to hold
    /// (checked by `ActivitySequence::new`).
    pub(crate) fn build(activities: &[Activity]) -> Self {
        let mut page_of_raw = Vec::with_capacity(activities.len());
        let mut pages: Vec<MergedPage> = Vec::new();

        for (index, activity) in activities.iter().enumerate() {
            let raw = RawIndex::new(index);
            if activity.activity_type.is_break() {
                if let Some(last) = pages.last_mut() {
                    last.rest = Some(raw);
                }
                page_of_raw.push(DisplayPage::new(pages.len().saturating_sub(1)));
            } else {
                page_of_raw.push(DisplayPage::new(pages.len()));
                pages.push(MergedPage {
                    exercise: raw,
                    rest: None,
                });
            }
        }

        Self { page_of_raw, pages }
    }

    /// Page showing the activity at `raw`. Defined for every in-bounds index.
    pub fn page_of(&self, raw: RawIndex) -> Option<DisplayPage> {
        self.page_of_raw.get(raw.get()).copied()
    }

    /// Raw index of the exercise that owns `page`. Never a break.
    pub fn raw_of(&self, page: DisplayPage) -> Option<RawIndex> {
        self.pages.get(page.get()).map(|p| p.exercise)
    }

    pub fn page(&self, page: DisplayPage) -> Option<&MergedPage> {
        self.pages.get(page.get())
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (DisplayPage, &MergedPage)> {
        self.pages
            .iter()
            .enumerate()
            .map(|(i, p)| (DisplayPage::new(i), p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map() -> PageMap {
        PageMap::build(&[
            Activity::exercise("Squats", 10),
            Activity::rest(5),
            Activity::exercise("Push-ups", 20),
            Activity::timeless("Plank"),
            Activity::rest(10),
        ])
    }

    #[test]
    fn breaks_merge_into_preceding_page() {
        let map = map();
        assert_eq!(map.len(), 3);
        assert_eq!(
            map.page(DisplayPage::new(0)),
            Some(&MergedPage {
                exercise: RawIndex::new(0),
                rest: Some(RawIndex::new(1)),
            })
        );
        assert_eq!(map.page(DisplayPage::new(1)).unwrap().rest, None);
        assert_eq!(map.page(DisplayPage::new(2)).unwrap().rest, Some(RawIndex::new(4)));
    }

    #[test]
    fn translation_covers_every_raw_index() {
        let map = map();
        let pages: Vec<usize> = (0..5)
            .map(|i| map.page_of(RawIndex::new(i)).unwrap().get())
            .collect();
        assert_eq!(pages, vec![0, 0, 1, 2, 2]);
        assert_eq!(map.page_of(RawIndex::new(5)), None);
    }

    #[test]
    fn pages_resolve_to_exercises() {
        let map = map();
        assert_eq!(map.raw_of(DisplayPage::new(0)), Some(RawIndex::new(0)));
        assert_eq!(map.raw_of(DisplayPage::new(1)), Some(RawIndex::new(2)));
        assert_eq!(map.raw_of(DisplayPage::new(2)), Some(RawIndex::new(3)));
        assert_eq!(map.raw_of(DisplayPage::new(3)), None);
    }

    #[test]
    fn round_trip_from_page_lands_on_same_page() {
        let map = map();
        for (page, _) in map.iter() {
            let raw = map.raw_of(page).unwrap();
            assert_eq!(map.page_of(raw), Some(page));
        }
    }
}
