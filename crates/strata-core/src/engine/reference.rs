//! Software engine used when no native compute library is linked.

use std::sync::Arc;

use super::reformat::CpuReformat;
use super::{Engine, EngineKind, NativeType, ReformatKernel};
use crate::layout::LayoutDescriptor;
use crate::Result;

/// Default element count at which reformats fan out across rayon.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 1 << 16;

/// Host-memory engine. Can also pose as an accelerator so host/device
/// transfer paths run without a GPU.
#[derive(Debug, Clone)]
pub struct ReferenceEngine {
    kind: EngineKind,
    index: usize,
    parallel_threshold: usize,
}

impl ReferenceEngine {
    pub fn cpu() -> Self {
        Self {
            kind: EngineKind::Cpu,
            index: 0,
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
        }
    }

    /// An engine that reports itself as accelerator `index` but keeps its
    /// buffers in host memory.
    pub fn emulated_accelerator(index: usize) -> Self {
        Self {
            kind: EngineKind::Accelerator,
            index,
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
        }
    }

    pub fn with_parallel_threshold(mut self, elements: usize) -> Self {
        self.parallel_threshold = elements.max(1);
        self
    }

    pub fn parallel_threshold(&self) -> usize {
        self.parallel_threshold
    }
}

impl Engine for ReferenceEngine {
    fn kind(&self) -> EngineKind {
        self.kind
    }

    fn index(&self) -> usize {
        self.index
    }

    fn supports(&self, _native_type: NativeType) -> bool {
        true
    }

    fn allocate_storage(&self, layout: &LayoutDescriptor) -> Result<Vec<u8>> {
        Ok(vec![0u8; layout.span_bytes()?])
    }

    fn compile_reformat(
        &self,
        src: &LayoutDescriptor,
        dst: &LayoutDescriptor,
    ) -> Result<Arc<dyn ReformatKernel>> {
        Ok(Arc::new(CpuReformat::compile(src, dst, self.parallel_threshold)?))
    }
}
