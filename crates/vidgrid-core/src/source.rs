//! Collaborator contracts.
//!
//! The engine reads items and thumbnails through these traits and never
//! writes back. Thumbnail generation is asynchronous: the engine hands the
//! collaborator a [`ThumbnailSink`] and keeps going; the reply is picked up
//! on a later tick.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::inbox::Inbox;
use crate::item::{ImageRef, Item, ItemId, SourceRef};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ThumbnailRequest {
    pub id: ItemId,
    pub source: SourceRef,
    /// Seconds into the media the still should be taken from.
    pub timestamp_hint: f64,
    /// Echoed back in the reply; replies with an outdated ticket are dropped.
    pub ticket: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ThumbnailReply {
    pub id: ItemId,
    pub ticket: u64,
    /// `None` when generation failed.
    pub image: Option<ImageRef>,
}

impl ThumbnailRequest {
    pub fn reply(&self, image: Option<ImageRef>) -> ThumbnailReply {
        ThumbnailReply {
            id: self.id.clone(),
            ticket: self.ticket,
            image,
        }
    }
}

pub type ThumbnailSink = Inbox<ThumbnailReply>;

pub trait ItemSource {
    /// The ordered collection.
    fn items(&self) -> Vec<Item>;

    /// Already-generated thumbnail, if any. Must not block.
    fn thumbnail(&self, id: &ItemId) -> Option<ImageRef>;

    /// Starts generating a thumbnail. Must return immediately; the reply goes
    /// to `sink` whenever it is ready, from any thread.
    fn request_thumbnail(&self, request: ThumbnailRequest, sink: ThumbnailSink);
}

/// Read-only favorite lookup used for decoration.
pub trait FavoriteOverlay {
    fn is_favorite(&self, id: &ItemId) -> bool;
}

impl FavoriteOverlay for HashSet<ItemId> {
    fn is_favorite(&self, id: &ItemId) -> bool {
        self.contains(id)
    }
}

/// In-memory source: a fixed list plus known thumbnails. Thumbnail requests
/// for unknown ids are answered with `None` immediately.
#[derive(Clone, Debug, Default)]
pub struct StaticSource {
    pub items: Vec<Item>,
    pub thumbnails: HashMap<ItemId, ImageRef>,
}

impl StaticSource {
    pub fn new(items: Vec<Item>) -> Self {
        Self {
            items,
            thumbnails: HashMap::new(),
        }
    }

    pub fn with_thumbnail(mut self, id: impl Into<ItemId>, image: ImageRef) -> Self {
        self.thumbnails.insert(id.into(), image);
        self
    }
}

impl ItemSource for StaticSource {
    fn items(&self) -> Vec<Item> {
        self.items.clone()
    }

    fn thumbnail(&self, id: &ItemId) -> Option<ImageRef> {
        self.thumbnails.get(id).cloned()
    }

    fn request_thumbnail(&self, request: ThumbnailRequest, sink: ThumbnailSink) {
        let image = self.thumbnails.get(&request.id).cloned();
        sink.push(request.reply(image));
    }
}
