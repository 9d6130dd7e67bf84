//! Filtered and sorted view over the collection.
//!
//! The grid lays out view positions, not collection indices. A
//! [`CollectionView`] holds the display order as a list of collection
//! indices plus the reverse map, so the viewport, the reconciler and the slot
//! manager all work in view positions. Items that fail the filter are not in
//! the view at all; they stay in the collection.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::item::{Item, ItemId};
use crate::source::FavoriteOverlay;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    /// Collection order.
    #[default]
    None,
    /// Folder name ascending, items without a folder last; newest first
    /// within a folder.
    Folder,
    /// Newest first.
    Date,
    /// Seeded permutation. The same seed and collection give the same order.
    Shuffle { seed: u64 },
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterCriteria {
    pub folder: Option<String>,
    pub favorites_only: bool,
    /// Keep hidden items in the view.
    pub show_hidden: bool,
    /// Show nothing but hidden items.
    pub hidden_only: bool,
}

impl FilterCriteria {
    pub fn favorites() -> Self {
        Self {
            favorites_only: true,
            ..Self::default()
        }
    }

    pub fn in_folder(folder: impl Into<String>) -> Self {
        Self {
            folder: Some(folder.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Default)]
pub struct CollectionView {
    criteria: FilterCriteria,
    sort: SortMode,
    hidden: HashSet<ItemId>,
    /// Collection index for each view position.
    order: Vec<usize>,
    position_of: HashMap<ItemId, usize>,
}

impl CollectionView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn sort_mode(&self) -> SortMode {
        self.sort
    }

    pub fn is_hidden(&self, id: &ItemId) -> bool {
        self.hidden.contains(id)
    }

    /// The following setters only record the change; call
    /// [`rebuild`](Self::rebuild) to apply it.
    pub fn set_criteria(&mut self, criteria: FilterCriteria) {
        self.criteria = criteria;
    }

    pub fn set_sort_mode(&mut self, sort: SortMode) {
        self.sort = sort;
    }

    pub fn set_hidden(&mut self, ids: impl IntoIterator<Item = ItemId>) {
        self.hidden = ids.into_iter().collect();
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Collection indices in display order.
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Collection index shown at view position `position`.
    pub fn collection_index(&self, position: usize) -> Option<usize> {
        self.order.get(position).copied()
    }

    pub fn position_of(&self, id: &ItemId) -> Option<usize> {
        self.position_of.get(id).copied()
    }

    /// Recomputes the display order of `items`. Without an overlay no item
    /// counts as a favorite.
    pub fn rebuild(&mut self, items: &[Item], favorites: Option<&dyn FavoriteOverlay>) {
        let mut order: Vec<usize> = items
            .iter()
            .enumerate()
            .filter(|(_, item)| self.passes(item, favorites))
            .map(|(i, _)| i)
            .collect();

        match self.sort {
            SortMode::None => {}
            SortMode::Folder => {
                order.sort_by(|&a, &b| {
                    compare_folders(&items[a], &items[b]).then_with(|| newest_first(&items[a], &items[b]))
                });
            }
            SortMode::Date => order.sort_by(|&a, &b| newest_first(&items[a], &items[b])),
            SortMode::Shuffle { seed } => shuffle(&mut order, seed),
        }

        self.position_of = order
            .iter()
            .enumerate()
            .map(|(pos, &i)| (items[i].id.clone(), pos))
            .collect();
        self.order = order;
        log::debug!(
            "view: {} of {} items shown ({:?}, {:?})",
            self.order.len(),
            items.len(),
            self.sort,
            self.criteria
        );
    }

    fn passes(&self, item: &Item, favorites: Option<&dyn FavoriteOverlay>) -> bool {
        if let Some(folder) = &self.criteria.folder
            && item.folder.as_ref() != Some(folder)
        {
            return false;
        }
        if self.criteria.favorites_only && !favorites.is_some_and(|f| f.is_favorite(&item.id)) {
            return false;
        }
        let hidden = self.hidden.contains(&item.id);
        if self.criteria.hidden_only {
            hidden
        } else {
            !hidden || self.criteria.show_hidden
        }
    }
}

fn compare_folders(a: &Item, b: &Item) -> Ordering {
    match (&a.folder, &b.folder) {
        (Some(fa), Some(fb)) => fa.cmp(fb),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

// Unknown modification times sort last.
fn newest_first(a: &Item, b: &Item) -> Ordering {
    b.modified.cmp(&a.modified)
}

fn shuffle(order: &mut [usize], seed: u64) {
    // xorshift64; a zero state would stay zero.
    let mut state = seed | 1;
    for i in (1..order.len()).rev() {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        let j = (state % (i as u64 + 1)) as usize;
        order.swap(i, j);
    }
}
