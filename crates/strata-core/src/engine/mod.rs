//! Compute engine abstraction.
//!
//! An engine owns memory and compiles reformat kernels; a stream orders
//! their execution. Tensors only talk to these traits, so the software
//! [`ReferenceEngine`] can be swapped for a native library binding.

pub mod buffer;
pub mod fence;
pub mod primitive;
pub mod reference;
pub mod reformat;
pub mod stream;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::layout::LayoutDescriptor;
use crate::Result;

pub use buffer::{MappedMemory, MemoryBuffer};
pub use primitive::ReformatPrimitive;
pub use reference::ReferenceEngine;
pub use stream::{ImmediateStream, Stream, Task, WorkerStream};

/// Element type tags understood by engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NativeType {
    F16,
    BF16,
    F32,
    F64,
    S8,
    S16,
    S32,
    S64,
    U8,
    U16,
    U32,
    U64,
    Boolean,
}

impl NativeType {
    pub fn size(&self) -> usize {
        match self {
            NativeType::S8 | NativeType::U8 | NativeType::Boolean => 1,
            NativeType::F16 | NativeType::BF16 | NativeType::S16 | NativeType::U16 => 2,
            NativeType::F32 | NativeType::S32 | NativeType::U32 => 4,
            NativeType::F64 | NativeType::S64 | NativeType::U64 => 8,
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(
            self,
            NativeType::F16 | NativeType::BF16 | NativeType::F32 | NativeType::F64
        )
    }
}

impl fmt::Display for NativeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NativeType::F16 => "f16",
            NativeType::BF16 => "bf16",
            NativeType::F32 => "f32",
            NativeType::F64 => "f64",
            NativeType::S8 => "s8",
            NativeType::S16 => "s16",
            NativeType::S32 => "s32",
            NativeType::S64 => "s64",
            NativeType::U8 => "u8",
            NativeType::U16 => "u16",
            NativeType::U32 => "u32",
            NativeType::U64 => "u64",
            NativeType::Boolean => "boolean",
        };
        f.write_str(name)
    }
}

/// What kind of processor an engine drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    Cpu,
    Accelerator,
}

/// A compiled element-copy plan between two layouts.
pub trait ReformatKernel: Send + Sync + fmt::Debug {
    /// Copy (and convert) every element of `src` into `dst`.
    ///
    /// Both slices are whole buffers; the kernel applies layout offsets.
    fn run(&self, src: &[u8], dst: &mut [u8]);
}

/// A compute context that owns memory and compiles primitives.
pub trait Engine: Send + Sync + fmt::Debug {
    fn kind(&self) -> EngineKind;

    fn index(&self) -> usize {
        0
    }

    fn supports(&self, native_type: NativeType) -> bool;

    /// Zero-initialized storage large enough for `layout`.
    fn allocate_storage(&self, layout: &LayoutDescriptor) -> Result<Vec<u8>>;

    /// Compile a reformat from `src` to `dst`. Dims must agree.
    fn compile_reformat(
        &self,
        src: &LayoutDescriptor,
        dst: &LayoutDescriptor,
    ) -> Result<Arc<dyn ReformatKernel>>;
}

/// Cheap, clonable reference to an engine. Equality is identity.
#[derive(Clone)]
pub struct EngineHandle {
    inner: Arc<dyn Engine>,
}

impl EngineHandle {
    pub fn new(engine: impl Engine + 'static) -> Self {
        Self {
            inner: Arc::new(engine),
        }
    }

    pub fn from_arc(engine: Arc<dyn Engine>) -> Self {
        Self { inner: engine }
    }

    pub fn kind(&self) -> EngineKind {
        self.inner.kind()
    }

    pub fn index(&self) -> usize {
        self.inner.index()
    }

    pub fn engine(&self) -> &dyn Engine {
        self.inner.as_ref()
    }

    /// Allocate a buffer described by `layout` on this engine.
    pub fn allocate(&self, layout: &LayoutDescriptor) -> Result<MemoryBuffer> {
        if !self.inner.supports(layout.native_type()) {
            return Err(crate::StrataError::Engine(format!(
                "{:?} engine cannot hold {} data",
                self.kind(),
                layout.native_type()
            )));
        }
        let storage = self.inner.allocate_storage(layout)?;
        Ok(MemoryBuffer::new(layout.clone(), self.clone(), storage))
    }

    pub fn ptr_eq(&self, other: &EngineHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl PartialEq for EngineHandle {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for EngineHandle {}

impl fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EngineHandle({:?}:{})", self.kind(), self.index())
    }
}
