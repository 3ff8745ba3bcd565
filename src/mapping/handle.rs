use super::index::ClassificationIndex;
use arc_swap::ArcSwap;
use std::sync::Arc;

/// Shared, atomically replaceable reference to the current index.
///
/// Readers take a snapshot with [`IndexHandle::load`] and keep using it for
/// the whole request, even if a reload publishes a new index meanwhile.
#[derive(Debug)]
pub struct IndexHandle {
    current: ArcSwap<ClassificationIndex>,
}

impl IndexHandle {
    pub fn new(index: ClassificationIndex) -> Self {
        Self {
            current: ArcSwap::from_pointee(index),
        }
    }

    pub fn load(&self) -> Arc<ClassificationIndex> {
        self.current.load_full()
    }

    pub fn store(&self, index: Arc<ClassificationIndex>) {
        self.current.store(index);
    }
}
