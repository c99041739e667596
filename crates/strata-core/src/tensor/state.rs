use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::backend::Backend;
use crate::dtype::DType;
use crate::engine::MemoryBuffer;
use crate::shape::Shape;

/// Everything shallow copies of a tensor share.
///
/// `is_data_ready` is false while the buffer may still be the target of
/// enqueued work; `is_device_ptr_locked` is set while a raw pointer has
/// been handed out. The state must be unlocked before it is dropped.
pub struct SharedTensorState {
    shape: Shape,
    dtype: DType,
    memory: MemoryBuffer,
    backend: Arc<Backend>,
    is_data_ready: AtomicBool,
    is_device_ptr_locked: AtomicBool,
}

impl SharedTensorState {
    pub(crate) fn new(
        shape: Shape,
        dtype: DType,
        memory: MemoryBuffer,
        backend: Arc<Backend>,
        is_data_ready: bool,
    ) -> Self {
        Self {
            shape,
            dtype,
            memory,
            backend,
            is_data_ready: AtomicBool::new(is_data_ready),
            is_device_ptr_locked: AtomicBool::new(false),
        }
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn memory(&self) -> &MemoryBuffer {
        &self.memory
    }

    pub fn backend(&self) -> &Arc<Backend> {
        &self.backend
    }

    pub fn is_data_ready(&self) -> bool {
        self.is_data_ready.load(Ordering::Acquire)
    }

    pub(crate) fn set_data_ready(&self, ready: bool) {
        self.is_data_ready.store(ready, Ordering::Release);
    }

    pub fn is_device_ptr_locked(&self) -> bool {
        self.is_device_ptr_locked.load(Ordering::Acquire)
    }

    pub(crate) fn set_device_ptr_locked(&self, locked: bool) {
        self.is_device_ptr_locked.store(locked, Ordering::Release);
    }
}

impl Drop for SharedTensorState {
    fn drop(&mut self) {
        if !self.is_device_ptr_locked() {
            return;
        }
        tracing::error!(
            shape = %self.shape,
            dtype = %self.dtype,
            "tensor state dropped while its device pointer is locked"
        );
        if !std::thread::panicking() {
            debug_assert!(
                !self.is_device_ptr_locked(),
                "must unlock device pointer before tensor state is dropped"
            );
        }
    }
}

impl fmt::Debug for SharedTensorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedTensorState")
            .field("shape", &self.shape)
            .field("dtype", &self.dtype)
            .field("memory", &self.memory)
            .field("is_data_ready", &self.is_data_ready())
            .field("is_device_ptr_locked", &self.is_device_ptr_locked())
            .finish()
    }
}
