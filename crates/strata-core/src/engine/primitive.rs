use std::sync::Arc;

use super::{EngineHandle, EngineKind, MemoryBuffer, ReformatKernel, Stream};
use crate::error::StrataError;
use crate::layout::LayoutDescriptor;
use crate::Result;

/// A compiled copy-with-reformat between two buffer descriptions.
///
/// Construction compiles the plan synchronously; [`execute`](Self::execute)
/// only enqueues it.
#[derive(Debug, Clone)]
pub struct ReformatPrimitive {
    src: LayoutDescriptor,
    dst: LayoutDescriptor,
    kernel: Arc<dyn ReformatKernel>,
}

impl ReformatPrimitive {
    pub fn new(
        src_engine: &EngineHandle,
        src: &LayoutDescriptor,
        dst_engine: &EngineHandle,
        dst: &LayoutDescriptor,
    ) -> Result<Self> {
        // Transfers involving an accelerator are planned by the accelerator.
        let planner = if src_engine.kind() == EngineKind::Cpu {
            dst_engine
        } else {
            src_engine
        };
        let kernel = planner.engine().compile_reformat(src, dst)?;
        tracing::trace!(%src, %dst, "compiled reformat");
        Ok(Self {
            src: src.clone(),
            dst: dst.clone(),
            kernel,
        })
    }

    pub fn src_layout(&self) -> &LayoutDescriptor {
        &self.src
    }

    pub fn dst_layout(&self) -> &LayoutDescriptor {
        &self.dst
    }

    /// Enqueue the copy from `src` into `dst` on `stream`.
    ///
    /// `dst` counts as having a pending write until the task completes, so
    /// mapping it waits for the result.
    pub fn execute(&self, stream: &dyn Stream, src: &MemoryBuffer, dst: &MemoryBuffer) -> Result<()> {
        check_covers(src, &self.src, "source")?;
        check_covers(dst, &self.dst, "destination")?;

        let pending = dst.begin_write();
        let kernel = Arc::clone(&self.kernel);
        let src = src.clone();
        let dst = dst.clone();
        stream.submit(Box::new(move || {
            let _pending = pending;
            if src.same_storage(&dst) {
                let staged = src.lock_storage().clone();
                kernel.run(&staged, &mut dst.lock_storage());
            } else {
                let input = src.lock_storage();
                kernel.run(&input, &mut dst.lock_storage());
            }
        }))
    }
}

fn check_covers(buffer: &MemoryBuffer, layout: &LayoutDescriptor, role: &str) -> Result<()> {
    if buffer.layout().native_type() != layout.native_type() {
        return Err(StrataError::InvalidArgument(format!(
            "{role} buffer holds {} but the primitive expects {}",
            buffer.layout().native_type(),
            layout.native_type()
        )));
    }
    let needed = layout.span_bytes()?;
    if needed > buffer.len_bytes() {
        return Err(StrataError::InvalidArgument(format!(
            "{role} buffer has {} bytes, layout {layout} needs {needed}",
            buffer.len_bytes()
        )));
    }
    Ok(())
}
