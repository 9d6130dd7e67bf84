use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Stable, opaque identifier of an item while it is part of the collection.
///
/// Cloning is a reference-count bump; ids are passed around every tick.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(Arc<str>);

impl ItemId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

/// Reference handed to the media loader untouched (a path, a URL, a blob key).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceRef(pub String);

impl SourceRef {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SourceRef {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Still image reference produced by a thumbnail collaborator.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(pub String);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub source: SourceRef,
    /// Duration in seconds, when the collaborator knows it up front.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_hint: Option<f64>,
    /// Folder the item was listed from; used by folder filters and sorting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
    /// Modification time in seconds since the epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<u64>,
}

impl Item {
    pub fn new(id: impl Into<ItemId>, source: impl Into<SourceRef>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            duration_hint: None,
            folder: None,
            modified: None,
        }
    }

    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration_hint = Some(seconds);
        self
    }

    pub fn with_folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = Some(folder.into());
        self
    }

    pub fn with_modified(mut self, modified: u64) -> Self {
        self.modified = Some(modified);
        self
    }

    /// Whether switching from `self` to `other` needs a fresh load: the
    /// loader input or the duration the loop window was built from changed.
    pub fn needs_reload(&self, other: &Item) -> bool {
        self.source != other.source || self.duration_hint != other.duration_hint
    }
}

/// Builds `count` items named `item-0..item-{count}`; handy for demos and tests.
pub fn numbered_items(count: usize) -> Vec<Item> {
    (0..count)
        .map(|i| Item::new(format!("item-{i}"), SourceRef(format!("media/{i}.mp4"))))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_json_uses_plain_strings() {
        let item = Item::new("a", "clips/a.mp4").with_duration(12.5);
        let json = serde_json::to_string(&item).unwrap();
        assert_eq!(
            json,
            r#"{"id":"a","source":"clips/a.mp4","duration_hint":12.5}"#
        );

        let back: Item = serde_json::from_str(r#"{"id":"b","source":"b.webm"}"#).unwrap();
        assert_eq!(back.id, ItemId::new("b"));
        assert_eq!(back.duration_hint, None);
        assert_eq!(back.folder, None);
    }

    #[test]
    fn reload_only_for_media_changes() {
        let a = Item::new("a", "clips/a.mp4").with_duration(12.0);
        assert!(!a.needs_reload(&a.clone().with_folder("clips").with_modified(7)));
        assert!(a.needs_reload(&Item::new("a", "clips/a2.mp4").with_duration(12.0)));
        assert!(a.needs_reload(&Item::new("a", "clips/a.mp4")));
    }

    #[test]
    fn numbered_items_are_unique() {
        let items = numbered_items(3);
        assert_eq!(items[2].id.as_str(), "item-2");
        assert_eq!(items[2].source.as_str(), "media/2.mp4");
    }
}
