//! Resource store.
//!
//! Holds the canonical container and image collections. Reads are available
//! to everyone; mutation goes through a [`StoreWriter`] transaction, which
//! only the lifecycle engine and fixture seeding can open. A transaction
//! holds the write lock for its whole lifetime, so a reader never observes a
//! partially applied transition.

use crate::state::{Container, ContainerId, ContainerState, Image, ImageId};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Minimum prefix length accepted when resolving ids by prefix.
const MIN_PREFIX_LEN: usize = 3;

/// Which containers a listing includes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListFilter {
    /// Every container.
    All,
    /// Only running containers.
    #[default]
    Running,
    /// The N most recently created containers, running or not.
    Latest(usize),
}

#[derive(Debug)]
struct Entry {
    seq: u64,
    container: Container,
}

#[derive(Debug, Default)]
struct StoreInner {
    containers: HashMap<ContainerId, Entry>,
    images: Vec<Image>,
    next_seq: u64,
}

impl StoreInner {
    fn resolve_container(&self, reference: &str) -> Option<&Container> {
        if let Some(entry) = self.containers.get(&ContainerId::from_string(reference)) {
            return Some(&entry.container);
        }

        if let Some(entry) = self
            .containers
            .values()
            .find(|e| e.container.has_name(reference))
        {
            return Some(&entry.container);
        }

        if reference.len() >= MIN_PREFIX_LEN {
            let mut matches = self
                .containers
                .values()
                .filter(|e| e.container.id.as_str().starts_with(reference));
            if let (Some(only), None) = (matches.next(), matches.next()) {
                return Some(&only.container);
            }
        }

        None
    }

    fn resolve_image(&self, reference: &str) -> Option<&Image> {
        if let Some(image) = self.images.iter().find(|i| i.id.as_str() == reference) {
            return Some(image);
        }

        if let Some(image) = self.images.iter().find(|i| i.has_tag(reference)) {
            return Some(image);
        }

        if reference.len() >= MIN_PREFIX_LEN {
            let mut matches = self
                .images
                .iter()
                .filter(|i| i.id.as_str().starts_with(reference));
            if let (Some(only), None) = (matches.next(), matches.next()) {
                return Some(only);
            }
        }

        None
    }

    fn sorted_containers(&self) -> Vec<&Entry> {
        let mut entries: Vec<&Entry> = self.containers.values().collect();
        entries.sort_by(|a, b| {
            b.container
                .created
                .cmp(&a.container.created)
                .then(b.seq.cmp(&a.seq))
        });
        entries
    }
}

/// In-memory container and image collections.
#[derive(Debug, Default)]
pub struct ResourceStore {
    inner: RwLock<StoreInner>,
}

impl ResourceStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Opens a write transaction.
    pub(crate) fn write(&self) -> StoreWriter<'_> {
        StoreWriter {
            inner: self.inner.write().unwrap_or_else(PoisonError::into_inner),
        }
    }

    /// Lists containers, most recently created first.
    #[must_use]
    pub fn list_containers(&self, filter: ListFilter) -> Vec<Container> {
        let inner = self.read();
        let sorted = inner.sorted_containers().into_iter().map(|e| &e.container);
        match filter {
            ListFilter::All => sorted.cloned().collect(),
            ListFilter::Running => sorted.filter(|c| c.is_running()).cloned().collect(),
            ListFilter::Latest(n) => sorted.take(n).cloned().collect(),
        }
    }

    /// Lists images, most recently created first.
    #[must_use]
    pub fn list_images(&self) -> Vec<Image> {
        let mut images = self.read().images.clone();
        images.sort_by(|a, b| b.created.cmp(&a.created));
        images
    }

    /// Resolves a container by ID, name or unique ID prefix.
    #[must_use]
    pub fn container(&self, reference: &str) -> Option<Container> {
        self.read().resolve_container(reference).cloned()
    }

    /// Resolves an image by ID, repository tag or unique ID prefix.
    #[must_use]
    pub fn image(&self, reference: &str) -> Option<Image> {
        self.read().resolve_image(reference).cloned()
    }

    /// Returns the number of containers.
    #[must_use]
    pub fn container_count(&self) -> usize {
        self.read().containers.len()
    }

    /// Returns the number of images.
    #[must_use]
    pub fn image_count(&self) -> usize {
        self.read().images.len()
    }
}

/// Exclusive write access to the store.
pub(crate) struct StoreWriter<'a> {
    inner: RwLockWriteGuard<'a, StoreInner>,
}

impl StoreWriter<'_> {
    pub(crate) fn container(&self, reference: &str) -> Option<&Container> {
        self.inner.resolve_container(reference)
    }

    pub(crate) fn image(&self, reference: &str) -> Option<&Image> {
        self.inner.resolve_image(reference)
    }

    pub(crate) fn contains_container(&self, id: &ContainerId) -> bool {
        self.inner.containers.contains_key(id)
    }

    pub(crate) fn insert_container(&mut self, container: Container) {
        let seq = self.inner.next_seq;
        self.inner.next_seq += 1;
        self.inner
            .containers
            .insert(container.id.clone(), Entry { seq, container });
    }

    pub(crate) fn insert_image(&mut self, image: Image) {
        self.inner.images.retain(|i| i.id != image.id);
        self.inner.images.push(image);
    }

    /// Applies `f` to the state of container `id`, returning false if absent.
    pub(crate) fn update_container_state(
        &mut self,
        id: &ContainerId,
        f: impl FnOnce(&mut ContainerState),
    ) -> bool {
        match self.inner.containers.get_mut(id) {
            Some(entry) => {
                f(&mut entry.container.state);
                true
            }
            None => false,
        }
    }

    pub(crate) fn remove_container(&mut self, id: &ContainerId) -> Option<Container> {
        self.inner.containers.remove(id).map(|e| e.container)
    }

    pub(crate) fn remove_image(&mut self, id: &ImageId) -> Option<Image> {
        let pos = self.inner.images.iter().position(|i| i.id == *id)?;
        Some(self.inner.images.remove(pos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ImageConfig;
    use chrono::{Duration, TimeZone, Utc};

    fn container_at(minutes: i64, running: bool) -> Container {
        let t0 = Utc.with_ymd_and_hms(2014, 3, 10, 12, 0, 0).unwrap();
        let created = t0 + Duration::minutes(minutes);
        let mut c = Container::new("busybox", vec!["sh".to_string()], created);
        if running {
            c.state.mark_running(100, created);
        }
        c
    }

    fn image(id: &str, tag: &str) -> Image {
        Image {
            id: ImageId::from_string(id),
            parent_id: None,
            repo_tags: vec![tag.to_string()],
            created: Utc::now(),
            size: 0,
            virtual_size: 0,
            config: ImageConfig::default(),
        }
    }

    #[test]
    fn filters_select_and_order() {
        let store = ResourceStore::new();
        let old = container_at(0, true);
        let mid = container_at(5, false);
        let new = container_at(10, true);
        {
            let mut w = store.write();
            w.insert_container(mid.clone());
            w.insert_container(old.clone());
            w.insert_container(new.clone());
        }

        let all: Vec<_> = store
            .list_containers(ListFilter::All)
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(all, vec![new.id.clone(), mid.id.clone(), old.id.clone()]);

        let running = store.list_containers(ListFilter::Running);
        assert_eq!(running.len(), 2);
        assert!(running.iter().all(Container::is_running));

        let latest = store.list_containers(ListFilter::Latest(2));
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].id, new.id);
        assert_eq!(latest[1].id, mid.id);

        assert!(store.list_containers(ListFilter::Latest(0)).is_empty());
        assert_eq!(store.list_containers(ListFilter::Latest(99)).len(), 3);
    }

    #[test]
    fn equal_creation_times_list_newest_insert_first() {
        let store = ResourceStore::new();
        let a = container_at(0, false);
        let b = container_at(0, false);
        {
            let mut w = store.write();
            w.insert_container(a.clone());
            w.insert_container(b.clone());
        }
        let ids: Vec<_> = store
            .list_containers(ListFilter::All)
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec![b.id, a.id]);
    }

    #[test]
    fn containers_resolve_by_id_name_and_prefix() {
        let store = ResourceStore::new();
        let c = container_at(0, false).with_name("web");
        store.write().insert_container(c.clone());

        assert_eq!(store.container(c.id.as_str()).unwrap().id, c.id);
        assert_eq!(store.container("web").unwrap().id, c.id);
        assert_eq!(store.container("/web").unwrap().id, c.id);
        assert_eq!(store.container(&c.id.as_str()[..5]).unwrap().id, c.id);
        assert!(store.container(&c.id.as_str()[..2]).is_none());
        assert!(store.container("missing").is_none());
    }

    #[test]
    fn ambiguous_image_prefix_does_not_resolve() {
        let store = ResourceStore::new();
        {
            let mut w = store.write();
            w.insert_image(image("abc111", "one:latest"));
            w.insert_image(image("abc222", "two:latest"));
        }
        assert!(store.image("abc").is_none());
        assert_eq!(store.image("abc2").unwrap().id.as_str(), "abc222");
        assert_eq!(store.image("one").unwrap().id.as_str(), "abc111");
    }

    #[test]
    fn removals_report_what_was_removed() {
        let store = ResourceStore::new();
        let c = container_at(0, false);
        {
            let mut w = store.write();
            w.insert_container(c.clone());
            w.insert_image(image("abc111", "one:latest"));
        }
        {
            let mut w = store.write();
            assert!(w.remove_container(&c.id).is_some());
            assert!(w.remove_container(&c.id).is_none());
            assert!(w.remove_image(&ImageId::from_string("abc111")).is_some());
            assert!(!w.update_container_state(&c.id, |_| {}));
        }
        assert_eq!(store.container_count(), 0);
        assert_eq!(store.image_count(), 0);
    }
}
