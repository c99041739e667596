use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use super::fence::{Fence, FenceGuard};
use super::EngineHandle;
use crate::layout::LayoutDescriptor;

/// Engine-resident typed allocation described by a [`LayoutDescriptor`].
///
/// Buffers are reference-counted handles: cloning one aliases the same
/// storage. Writes enqueued on a stream register with the buffer's fence,
/// and [`MemoryBuffer::map`] waits for them before exposing the bytes.
#[derive(Clone)]
pub struct MemoryBuffer {
    inner: Arc<BufferInner>,
}

struct BufferInner {
    layout: LayoutDescriptor,
    engine: EngineHandle,
    len: usize,
    bytes: Mutex<Vec<u8>>,
    writes: Arc<Fence>,
}

impl MemoryBuffer {
    pub(crate) fn new(layout: LayoutDescriptor, engine: EngineHandle, bytes: Vec<u8>) -> Self {
        Self {
            inner: Arc::new(BufferInner {
                layout,
                engine,
                len: bytes.len(),
                bytes: Mutex::new(bytes),
                writes: Fence::new(),
            }),
        }
    }

    pub fn layout(&self) -> &LayoutDescriptor {
        &self.inner.layout
    }

    pub fn engine(&self) -> &EngineHandle {
        &self.inner.engine
    }

    pub fn len_bytes(&self) -> usize {
        self.inner.len
    }

    /// Map the buffer for host access, waiting for pending writes first.
    /// The mapping is released when the returned guard drops.
    pub fn map(&self) -> MappedMemory<'_> {
        self.inner.writes.wait();
        MappedMemory {
            guard: self.inner.bytes.lock(),
        }
    }

    /// Raw pointer to the start of the storage. Does not wait for pending
    /// writes.
    pub fn data_handle(&self) -> *mut u8 {
        self.inner.bytes.lock().as_mut_ptr()
    }

    /// Whether both handles refer to the same storage.
    pub fn same_storage(&self, other: &MemoryBuffer) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn has_pending_writes(&self) -> bool {
        !self.inner.writes.is_idle()
    }

    pub(crate) fn begin_write(&self) -> FenceGuard {
        self.inner.writes.enter()
    }

    /// Direct storage access for kernels running on a stream. Skips the
    /// write fence, since the caller is the pending write.
    pub(crate) fn lock_storage(&self) -> MutexGuard<'_, Vec<u8>> {
        self.inner.bytes.lock()
    }
}

impl fmt::Debug for MemoryBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryBuffer")
            .field("layout", &self.inner.layout)
            .field("engine", &self.inner.engine)
            .field("len", &self.inner.len)
            .finish()
    }
}

/// Host view of a mapped [`MemoryBuffer`]. Unmaps on drop.
pub struct MappedMemory<'a> {
    guard: MutexGuard<'a, Vec<u8>>,
}

impl Deref for MappedMemory<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.guard
    }
}

impl DerefMut for MappedMemory<'_> {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.guard
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{NativeType, ReferenceEngine};
    use crate::shape::Shape;

    fn buffer(dims: &[usize]) -> MemoryBuffer {
        let engine = EngineHandle::new(ReferenceEngine::cpu());
        let layout = LayoutDescriptor::contiguous(&Shape::new(dims), NativeType::U8);
        engine.allocate(&layout).unwrap()
    }

    #[test]
    fn test_map_roundtrip() {
        let buf = buffer(&[4]);
        buf.map().copy_from_slice(&[1, 2, 3, 4]);
        assert_eq!(&*buf.map(), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_clone_aliases() {
        let a = buffer(&[2]);
        let b = a.clone();
        assert!(a.same_storage(&b));
        b.map()[1] = 9;
        assert_eq!(a.map()[1], 9);
        assert!(!a.same_storage(&buffer(&[2])));
    }

    #[test]
    fn test_pending_writes() {
        let buf = buffer(&[1]);
        let guard = buf.begin_write();
        assert!(buf.has_pending_writes());
        drop(guard);
        assert!(!buf.has_pending_writes());
    }

    #[test]
    fn test_data_handle_is_stable() {
        let buf = buffer(&[8]);
        assert_eq!(buf.data_handle(), buf.data_handle());
        assert_eq!(buf.len_bytes(), 8);
    }
}
