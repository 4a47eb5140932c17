//! Destination textures and their replacement discipline

use std::{collections::HashMap, sync::Arc};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::{
    error::{DaguerreError, Result},
    transfer::EventKind,
};

use super::dispatcher::DispatchQueue;

/// Opaque id of a texture owned by a [`TextureStore`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(u64);

impl TextureHandle {
    pub const fn from_raw(id: u64) -> Self {
        Self(id)
    }

    pub const fn id(self) -> u64 {
        self.0
    }
}

/// GPU-side (or stand-in) texture storage. Only called from dispatched tasks.
pub trait TextureStore: Send {
    fn create(&mut self, width: u32, height: u32) -> Result<TextureHandle>;
    fn upload(&mut self, texture: TextureHandle, bytes: &[u8]) -> Result<()>;
    fn destroy(&mut self, texture: TextureHandle);
}

/// The texture currently installed in a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotTexture {
    pub handle: TextureHandle,
    pub width: u32,
    pub height: u32,
}

/// "Current" texture of one kind, swapped under its own lock
#[derive(Debug, Default)]
pub struct TextureSlot {
    current: RwLock<Option<SlotTexture>>,
}

impl TextureSlot {
    pub fn current(&self) -> Option<SlotTexture> {
        *self.current.read()
    }
}

/// Texture store plus the photo and preview slots
pub struct TextureSet {
    store: Mutex<Box<dyn TextureStore>>,
    photo: TextureSlot,
    preview: TextureSlot,
}

impl std::fmt::Debug for TextureSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextureSet")
            .field("photo", &self.photo.current())
            .field("preview", &self.preview.current())
            .finish()
    }
}

impl TextureSet {
    pub fn new(store: Box<dyn TextureStore>) -> Self {
        Self {
            store: Mutex::new(store),
            photo: TextureSlot::default(),
            preview: TextureSlot::default(),
        }
    }

    pub fn slot(&self, kind: EventKind) -> &TextureSlot {
        match kind {
            EventKind::Photo => &self.photo,
            EventKind::Preview => &self.preview,
        }
    }

    /// Put `bytes` into the slot for `kind`.
    ///
    /// Same dimensions update the current texture in place. Otherwise a new
    /// texture is created and filled, installed as current, and the old one
    /// is destroyed by a later task on `queue`.
    pub fn install(
        self: &Arc<Self>,
        kind: EventKind,
        width: u32,
        height: u32,
        bytes: &[u8],
        queue: &DispatchQueue,
    ) -> Result<TextureHandle> {
        let slot = self.slot(kind);
        let mut current = slot.current.write();
        let mut store = self.store.lock();

        if let Some(existing) = *current {
            if existing.width == width && existing.height == height {
                store.upload(existing.handle, bytes)?;
                return Ok(existing.handle);
            }
        }

        let handle = store.create(width, height)?;
        if let Err(e) = store.upload(handle, bytes) {
            store.destroy(handle);
            return Err(e);
        }
        let replaced = current.replace(SlotTexture {
            handle,
            width,
            height,
        });
        drop(store);
        drop(current);

        if let Some(old) = replaced {
            debug!(kind = kind.name(), old = old.handle.id(), new = handle.id(), width, height, "Replaced texture");
            let textures = Arc::clone(self);
            if let Err(e) = queue.enqueue(move || textures.store.lock().destroy(old.handle)) {
                // Nothing left to defer to; the new texture is already current.
                warn!(error = %e, "Destroying replaced texture immediately");
                self.store.lock().destroy(old.handle);
            }
        }
        Ok(handle)
    }

    /// Destroy both current textures
    pub fn clear(&self) {
        for slot in [&self.photo, &self.preview] {
            let mut current = slot.current.write();
            if let Some(texture) = current.take() {
                self.store.lock().destroy(texture.handle);
            }
        }
    }
}

/// Pixels held by [`InMemoryTextureStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredTexture {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

#[derive(Debug, Default)]
struct InMemoryState {
    next_id: u64,
    textures: HashMap<TextureHandle, StoredTexture>,
    created: usize,
    destroyed: usize,
    uploads: usize,
}

/// Texture store backed by byte vectors; clones share state
#[derive(Debug, Clone, Default)]
pub struct InMemoryTextureStore {
    inner: Arc<Mutex<InMemoryState>>,
}

impl InMemoryTextureStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn texture(&self, handle: TextureHandle) -> Option<StoredTexture> {
        self.inner.lock().textures.get(&handle).cloned()
    }

    pub fn contains(&self, handle: TextureHandle) -> bool {
        self.inner.lock().textures.contains_key(&handle)
    }

    pub fn live_count(&self) -> usize {
        self.inner.lock().textures.len()
    }

    pub fn created(&self) -> usize {
        self.inner.lock().created
    }

    pub fn destroyed(&self) -> usize {
        self.inner.lock().destroyed
    }

    pub fn uploads(&self) -> usize {
        self.inner.lock().uploads
    }
}

impl TextureStore for InMemoryTextureStore {
    fn create(&mut self, width: u32, height: u32) -> Result<TextureHandle> {
        if width == 0 || height == 0 {
            return Err(DaguerreError::invalid_parameter(
                "texture",
                format!("cannot create a {}x{} texture", width, height),
            ));
        }
        let mut state = self.inner.lock();
        state.next_id += 1;
        let handle = TextureHandle(state.next_id);
        state.textures.insert(
            handle,
            StoredTexture {
                width,
                height,
                data: Vec::new(),
            },
        );
        state.created += 1;
        Ok(handle)
    }

    fn upload(&mut self, texture: TextureHandle, bytes: &[u8]) -> Result<()> {
        let mut state = self.inner.lock();
        let stored = state.textures.get_mut(&texture).ok_or_else(|| {
            DaguerreError::invalid_parameter("texture", format!("unknown texture {}", texture.0))
        })?;
        stored.data.clear();
        stored.data.extend_from_slice(bytes);
        state.uploads += 1;
        Ok(())
    }

    fn destroy(&mut self, texture: TextureHandle) {
        let mut state = self.inner.lock();
        if state.textures.remove(&texture).is_some() {
            state.destroyed += 1;
        } else {
            warn!(texture = texture.0, "Destroying unknown texture");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::MainThreadDispatcher;

    #[test]
    fn test_same_size_updates_in_place() {
        let store = InMemoryTextureStore::new();
        let set = Arc::new(TextureSet::new(Box::new(store.clone())));
        let dispatcher = MainThreadDispatcher::new();
        let queue = dispatcher.queue();

        let first = set.install(EventKind::Preview, 2, 2, &[1; 16], &queue).unwrap();
        let second = set.install(EventKind::Preview, 2, 2, &[2; 16], &queue).unwrap();
        assert_eq!(first, second);
        assert_eq!(store.created(), 1);
        assert_eq!(store.texture(first).unwrap().data, vec![2; 16]);
        assert_eq!(dispatcher.pending(), 0);
    }

    #[test]
    fn test_resize_defers_destruction() {
        let store = InMemoryTextureStore::new();
        let set = Arc::new(TextureSet::new(Box::new(store.clone())));
        let dispatcher = MainThreadDispatcher::new();
        let queue = dispatcher.queue();

        let old = set.install(EventKind::Photo, 2, 2, &[1; 16], &queue).unwrap();
        let new = set.install(EventKind::Photo, 4, 2, &[1; 32], &queue).unwrap();
        assert_ne!(old, new);

        // Old texture survives until the dispatcher runs.
        assert!(store.contains(old));
        assert_eq!(set.slot(EventKind::Photo).current().unwrap().handle, new);

        dispatcher.run_pending().unwrap();
        assert!(!store.contains(old));
        assert!(store.contains(new));
    }

    #[test]
    fn test_slots_are_independent() {
        let store = InMemoryTextureStore::new();
        let set = Arc::new(TextureSet::new(Box::new(store.clone())));
        let queue = MainThreadDispatcher::new().queue();

        let photo = set.install(EventKind::Photo, 2, 2, &[1; 16], &queue).unwrap();
        let preview = set.install(EventKind::Preview, 2, 2, &[2; 16], &queue).unwrap();
        assert_ne!(photo, preview);

        set.clear();
        assert_eq!(store.live_count(), 0);
        assert!(set.slot(EventKind::Photo).current().is_none());
    }
}
