//! Process-wide entity reference cache.
//!
//! Maps `(kind, id)` to the last-known full snapshot of each protocol
//! entity so that further requests (input peers, media fetches, reference
//! repair) can be built without re-resolving anything over the wire.
//!
//! Merge policy: last write wins per key, with one guard — a full user or
//! chat is never overwritten by a *min* stub. Messages are indexed together
//! with their media descriptors, and each descriptor gets an owner locator
//! pointing back at the containing message; the repair protocol depends on
//! that back-pointer. No eviction: entries live until [`EntityCache::clear`]
//! at session teardown.

use std::collections::HashMap;

use tokio::sync::Mutex;
use tracing::debug;

use tether_types::{
    Chat, ChatId, Document, DocumentId, Entity, FileReference, MediaId, Message, MessageId,
    MessageLocator, MessageMedia, Peer, Photo, PhotoId, StickerSet, StickerSetId, User, UserId,
};

// ─── EntityCache ─────────────────────────────────────────────────────────────

#[derive(Default)]
struct CacheInner {
    users:        HashMap<UserId, User>,
    chats:        HashMap<ChatId, Chat>,
    messages:     HashMap<(Peer, MessageId), Message>,
    documents:    HashMap<DocumentId, Document>,
    photos:       HashMap<PhotoId, Photo>,
    sticker_sets: HashMap<StickerSetId, StickerSet>,
}

/// Shared last-known-entity store. All mutation happens in brief synchronous
/// critical sections under one lock.
#[derive(Default)]
pub struct EntityCache {
    inner: Mutex<CacheInner>,
}

impl EntityCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a batch of entity snapshots. Idempotent; each call only touches
    /// the keys present in its own list.
    pub async fn merge(&self, entities: &[Entity]) {
        let mut inner = self.inner.lock().await;
        for entity in entities {
            inner.put(entity);
        }
    }

    pub async fn user(&self, id: UserId) -> Option<User> {
        self.inner.lock().await.users.get(&id).cloned()
    }

    pub async fn chat(&self, id: ChatId) -> Option<Chat> {
        self.inner.lock().await.chats.get(&id).cloned()
    }

    pub async fn message(&self, peer: Peer, id: MessageId) -> Option<Message> {
        self.inner.lock().await.messages.get(&(peer, id)).cloned()
    }

    pub async fn document(&self, id: DocumentId) -> Option<Document> {
        self.inner.lock().await.documents.get(&id).cloned()
    }

    pub async fn photo(&self, id: PhotoId) -> Option<Photo> {
        self.inner.lock().await.photos.get(&id).cloned()
    }

    pub async fn sticker_set(&self, id: StickerSetId) -> Option<StickerSet> {
        self.inner.lock().await.sticker_sets.get(&id).cloned()
    }

    /// Current file reference of a cached media descriptor.
    pub async fn file_reference(&self, media: MediaId) -> Option<FileReference> {
        let inner = self.inner.lock().await;
        match media {
            MediaId::Document(id) => inner.documents.get(&id).map(|d| d.file_reference.clone()),
            MediaId::Photo(id)    => inner.photos.get(&id).map(|p| p.file_reference.clone()),
        }
    }

    /// The message a cached media descriptor was extracted from, if known.
    pub async fn media_owner(&self, media: MediaId) -> Option<MessageLocator> {
        let inner = self.inner.lock().await;
        match media {
            MediaId::Document(id) => inner.documents.get(&id).and_then(|d| d.owner),
            MediaId::Photo(id)    => inner.photos.get(&id).and_then(|p| p.owner),
        }
    }

    /// Drop every entry. Called exactly once, on session teardown.
    pub async fn clear(&self) {
        let mut inner = self.inner.lock().await;
        let n = inner.users.len() + inner.chats.len() + inner.messages.len()
            + inner.documents.len() + inner.photos.len() + inner.sticker_sets.len();
        *inner = CacheInner::default();
        debug!("[cache] cleared ({n} entities)");
    }
}

impl CacheInner {
    fn put(&mut self, entity: &Entity) {
        match entity {
            Entity::User(user)      => self.put_user(user),
            Entity::Chat(chat)      => self.put_chat(chat),
            Entity::Message(msg)    => self.put_message(msg),
            Entity::Document(doc)   => { self.documents.insert(doc.id, doc.clone()); }
            Entity::Photo(photo)    => { self.photos.insert(photo.id, photo.clone()); }
            Entity::StickerSet(set) => { self.sticker_sets.insert(set.id, set.clone()); }
        }
    }

    fn put_user(&mut self, user: &User) {
        if let Some(photo) = &user.photo {
            self.photos.insert(photo.id, photo.clone());
        }

        // Never downgrade a full user to a min stub.
        if let Some(stored) = self.users.get(&user.id) {
            if !stored.min && user.min {
                return;
            }
        }
        self.users.insert(user.id, user.clone());
    }

    fn put_chat(&mut self, chat: &Chat) {
        if let Some(stored) = self.chats.get(&chat.id) {
            if !stored.min && chat.min {
                return;
            }
        }
        self.chats.insert(chat.id, chat.clone());
    }

    fn put_message(&mut self, message: &Message) {
        if let Some(media) = &message.media {
            self.index_media(media, message.locator());
        }
        self.messages.insert((message.peer, message.id), message.clone());
    }

    /// Store the media descriptors carried by a message, stamping each with
    /// the owning message's locator so reference repair can find it again.
    fn index_media(&mut self, media: &MessageMedia, owner: MessageLocator) {
        match media {
            MessageMedia::Document(doc) => {
                let mut doc = doc.clone();
                doc.owner = Some(owner);
                self.documents.insert(doc.id, doc);
            }
            MessageMedia::Photo(photo) => {
                let mut photo = photo.clone();
                photo.owner = Some(owner);
                self.photos.insert(photo.id, photo);
            }
            MessageMedia::WebPage { document, photo, .. } => {
                if let Some(doc) = document {
                    let mut doc = doc.clone();
                    doc.owner = Some(owner);
                    self.documents.insert(doc.id, doc);
                }
                if let Some(photo) = photo {
                    let mut photo = photo.clone();
                    photo.owner = Some(owner);
                    self.photos.insert(photo.id, photo);
                }
            }
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: i64, min: bool, first_name: &str) -> User {
        User {
            id:         UserId(id),
            min,
            first_name: Some(first_name.into()),
            last_name:  None,
            username:   None,
            is_bot:     false,
            is_premium: false,
            photo:      None,
        }
    }

    fn document(id: i64, reference: &[u8]) -> Document {
        Document {
            id:             DocumentId(id),
            file_reference: FileReference(reference.to_vec()),
            mime_type:      "video/mp4".into(),
            size:           1024,
            file_name:      Some("clip.mp4".into()),
            owner:          None,
        }
    }

    fn message_with_document(peer: Peer, id: i32, doc: Document) -> Message {
        Message {
            id:        MessageId(id),
            peer,
            from:      None,
            date:      0,
            out:       false,
            silent:    false,
            text:      String::new(),
            media:     Some(MessageMedia::Document(doc)),
            edit_date: None,
        }
    }

    #[tokio::test]
    async fn full_user_is_not_downgraded_by_min_stub() {
        let cache = EntityCache::new();
        cache.merge(&[Entity::User(user(1, false, "Full"))]).await;
        cache.merge(&[Entity::User(user(1, true, "Stub"))]).await;

        let stored = cache.user(UserId(1)).await.unwrap();
        assert!(!stored.min);
        assert_eq!(stored.first_name.as_deref(), Some("Full"));
    }

    #[tokio::test]
    async fn min_stub_is_upgraded_by_full_user() {
        let cache = EntityCache::new();
        cache.merge(&[Entity::User(user(1, true, "Stub"))]).await;
        cache.merge(&[Entity::User(user(1, false, "Full"))]).await;

        let stored = cache.user(UserId(1)).await.unwrap();
        assert!(!stored.min);
        assert_eq!(stored.first_name.as_deref(), Some("Full"));
    }

    #[tokio::test]
    async fn merge_is_idempotent() {
        let cache = EntityCache::new();
        let snapshot = Entity::User(user(2, false, "Ada"));
        cache.merge(&[snapshot.clone()]).await;
        cache.merge(&[snapshot]).await;
        assert_eq!(cache.user(UserId(2)).await.unwrap().first_name.as_deref(), Some("Ada"));
    }

    #[tokio::test]
    async fn later_full_snapshot_wins() {
        let cache = EntityCache::new();
        cache.merge(&[Entity::User(user(3, false, "Old"))]).await;
        cache.merge(&[Entity::User(user(3, false, "New"))]).await;
        assert_eq!(cache.user(UserId(3)).await.unwrap().first_name.as_deref(), Some("New"));
    }

    #[tokio::test]
    async fn message_merge_indexes_media_with_owner() {
        let cache = EntityCache::new();
        let peer = Peer::Chat(ChatId(10));
        let msg = message_with_document(peer, 5, document(99, b"ref-1"));
        cache.merge(&[Entity::Message(msg)]).await;

        let doc = cache.document(DocumentId(99)).await.unwrap();
        assert_eq!(doc.owner, Some(MessageLocator { peer, id: MessageId(5) }));
        assert_eq!(
            cache.file_reference(MediaId::Document(DocumentId(99))).await,
            Some(FileReference(b"ref-1".to_vec()))
        );
    }

    #[tokio::test]
    async fn refreshed_message_refreshes_the_reference() {
        let cache = EntityCache::new();
        let peer = Peer::Chat(ChatId(10));
        cache
            .merge(&[Entity::Message(message_with_document(peer, 5, document(99, b"stale")))])
            .await;
        cache
            .merge(&[Entity::Message(message_with_document(peer, 5, document(99, b"fresh")))])
            .await;

        assert_eq!(
            cache.file_reference(MediaId::Document(DocumentId(99))).await,
            Some(FileReference(b"fresh".to_vec()))
        );
    }

    #[tokio::test]
    async fn clear_invalidates_every_key() {
        let cache = EntityCache::new();
        cache.merge(&[Entity::User(user(1, false, "A"))]).await;
        cache
            .merge(&[Entity::Message(message_with_document(
                Peer::User(UserId(1)), 2, document(7, b"r"),
            ))])
            .await;
        cache.clear().await;

        assert!(cache.user(UserId(1)).await.is_none());
        assert!(cache.message(Peer::User(UserId(1)), MessageId(2)).await.is_none());
        assert!(cache.document(DocumentId(7)).await.is_none());
    }
}
