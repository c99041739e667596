//! Engine-backed tensors.

mod ops;
mod state;

use std::fmt;
use std::sync::Arc;

use crate::backend::{Backend, BackendType};
use crate::dtype::{DType, Element};
use crate::engine::{EngineKind, MemoryBuffer, ReformatPrimitive};
use crate::error::StrataError;
use crate::format;
use crate::layout::LayoutDescriptor;
use crate::location::Location;
use crate::shape::Shape;
use crate::Result;

pub use ops::{Index, Literal, OpKind, Operand};
pub use state::SharedTensorState;

/// A shaped, typed array living in an engine buffer.
///
/// Cloning is a shallow copy: both values share one [`SharedTensorState`],
/// so an `assign` through either is visible through the other. Use
/// [`Tensor::copy`] for an independent tensor.
///
/// Results of engine work are lazy. The buffer is filled by work enqueued
/// on the backend stream, and reads that need the data wait for it.
#[derive(Clone)]
pub struct Tensor {
    state: Arc<SharedTensorState>,
}

impl Tensor {
    // =========================================================================
    // Constructors
    // =========================================================================

    /// A tensor on the global backend, optionally filled from host bytes.
    pub fn new(
        shape: impl Into<Shape>,
        dtype: DType,
        data: Option<&[u8]>,
        location: Location,
    ) -> Result<Self> {
        Self::new_in(Backend::global(), shape, dtype, data, location)
    }

    /// A tensor on `backend`, optionally filled from host bytes.
    ///
    /// `data` must hold exactly `shape.elements()` elements of `dtype`.
    pub fn new_in(
        backend: &Arc<Backend>,
        shape: impl Into<Shape>,
        dtype: DType,
        data: Option<&[u8]>,
        location: Location,
    ) -> Result<Self> {
        let shape = shape.into();
        if location != Location::Host {
            return Err(StrataError::InvalidArgument(format!(
                "data must be on host, got {location}"
            )));
        }
        let expected = checked_size_in_bytes(&shape, dtype)?;
        if let Some(data) = data {
            if data.len() != expected {
                return Err(StrataError::InvalidArgument(format!(
                    "{shape} {dtype} tensor needs {expected} bytes, got {}",
                    data.len()
                )));
            }
        }

        let layout = LayoutDescriptor::contiguous(&shape, backend.native_type(dtype));
        let memory = backend.engine().allocate(&layout)?;
        if let Some(data) = data {
            memory.map()[..expected].copy_from_slice(data);
        }
        Ok(Self::from_state(SharedTensorState::new(
            shape,
            dtype,
            memory,
            Arc::clone(backend),
            true,
        )))
    }

    /// The empty `[0]` f32 tensor.
    pub fn empty() -> Result<Self> {
        Self::zeros([0], DType::F32)
    }

    pub fn zeros(shape: impl Into<Shape>, dtype: DType) -> Result<Self> {
        Self::new(shape, dtype, None, Location::Host)
    }

    pub fn from_bytes(shape: impl Into<Shape>, dtype: DType, bytes: &[u8]) -> Result<Self> {
        Self::new(shape, dtype, Some(bytes), Location::Host)
    }

    /// A tensor on the global backend holding `data`.
    pub fn from_slice<T: Element>(shape: impl Into<Shape>, data: &[T]) -> Result<Self> {
        Self::from_slice_in(Backend::global(), shape, data)
    }

    pub fn from_slice_in<T: Element>(
        backend: &Arc<Backend>,
        shape: impl Into<Shape>,
        data: &[T],
    ) -> Result<Self> {
        Self::new_in(
            backend,
            shape,
            T::DTYPE,
            Some(bytemuck::cast_slice(data)),
            Location::Host,
        )
    }

    /// Wrap a caller-owned buffer without copying.
    ///
    /// The buffer's dims must be `shape` in engine-native (reversed) order,
    /// its span must cover every element, and its engine type must have a
    /// logical dtype.
    pub fn from_memory(backend: &Arc<Backend>, shape: impl Into<Shape>, memory: MemoryBuffer) -> Result<Self> {
        let shape = shape.into();
        let layout = memory.layout();
        let dtype = backend.logical_type(layout.native_type())?;
        checked_size_in_bytes(&shape, dtype)?;
        let elements = shape.elements();
        let native = LayoutDescriptor::contiguous(&shape, layout.native_type());
        if layout.dims() != native.dims() {
            return Err(StrataError::InvalidArgument(format!(
                "buffer dims {:?} do not match shape {shape} (native dims {:?})",
                layout.dims(),
                native.dims()
            )));
        }
        let span = layout.span_elements()?;
        if span.saturating_sub(layout.offset()) < elements {
            return Err(StrataError::InvalidArgument(format!(
                "buffer layout {layout} spans {span} elements, shape {shape} needs {elements}"
            )));
        }
        Ok(Self::from_state(SharedTensorState::new(
            shape,
            dtype,
            memory,
            Arc::clone(backend),
            true,
        )))
    }

    /// Wrap the destination of enqueued work. Not ready until the stream
    /// has been synchronized.
    pub(crate) fn from_result(backend: &Arc<Backend>, shape: Shape, dtype: DType, memory: MemoryBuffer) -> Self {
        Self::from_state(SharedTensorState::new(
            shape,
            dtype,
            memory,
            Arc::clone(backend),
            false,
        ))
    }

    /// Sparse CSR construction. Engine tensors are always dense.
    pub fn sparse_csr(
        _shape: impl Into<Shape>,
        _values: &Tensor,
        _row_idx: &Tensor,
        _col_idx: &Tensor,
    ) -> Result<Self> {
        Err(StrataError::Unsupported(
            "engine tensors don't support sparse storage".into(),
        ))
    }

    fn from_state(state: SharedTensorState) -> Self {
        Self {
            state: Arc::new(state),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn backend(&self) -> &Arc<Backend> {
        self.state.backend()
    }

    pub fn backend_type(&self) -> BackendType {
        self.backend().backend_type()
    }

    pub fn shape(&self) -> &Shape {
        self.state.shape()
    }

    pub fn dtype(&self) -> DType {
        self.state.dtype()
    }

    pub fn ndim(&self) -> usize {
        self.shape().ndim()
    }

    pub fn elements(&self) -> usize {
        self.shape().elements()
    }

    /// Host for tensors on a CPU engine, device otherwise.
    pub fn location(&self) -> Location {
        match self.memory().engine().kind() {
            EngineKind::Cpu => Location::Host,
            EngineKind::Accelerator => Location::Device,
        }
    }

    pub fn is_sparse(&self) -> bool {
        false
    }

    pub fn size_in_bytes(&self) -> usize {
        self.dtype().storage_bytes(self.elements())
    }

    pub fn memory(&self) -> &MemoryBuffer {
        self.state.memory()
    }

    pub fn state(&self) -> &Arc<SharedTensorState> {
        &self.state
    }

    pub fn shares_state_with(&self, other: &Tensor) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }

    pub fn is_data_ready(&self) -> bool {
        self.state.is_data_ready()
    }

    // =========================================================================
    // Copies and conversion
    // =========================================================================

    pub fn shallow_copy(&self) -> Tensor {
        self.clone()
    }

    /// Independent contiguous copy on the same engine.
    pub fn copy(&self) -> Result<Tensor> {
        self.reformat_into(self.dtype())
    }

    /// A contiguous copy. Strided tensors are rejected.
    pub fn as_contiguous_tensor(&self) -> Result<Tensor> {
        if !self.is_contiguous()? {
            return Err(StrataError::Unsupported(
                "strided tensor currently unsupported".into(),
            ));
        }
        self.copy()
    }

    /// Convert to `dtype`. Always produces a new tensor.
    pub fn astype(&self, dtype: DType) -> Result<Tensor> {
        self.reformat_into(dtype)
    }

    fn reformat_into(&self, dtype: DType) -> Result<Tensor> {
        let backend = self.backend();
        let src = self.memory();
        let dst_layout = LayoutDescriptor::contiguous(self.shape(), backend.native_type(dtype));
        let dst = src.engine().allocate(&dst_layout)?;
        let reformat = ReformatPrimitive::new(src.engine(), src.layout(), dst.engine(), &dst_layout)?;
        reformat.execute(backend.stream(), src, &dst)?;
        tracing::debug!(shape = %self.shape(), from = %self.dtype(), to = %dtype, "enqueued reformat");
        Ok(Tensor::from_result(backend, self.shape().clone(), dtype, dst))
    }

    // =========================================================================
    // Layout
    // =========================================================================

    /// Element strides in declaration (column-major) order.
    pub fn strides(&self) -> Result<Shape> {
        let layout = self.memory().layout();
        let strides = layout.strides().ok_or_else(|| {
            StrataError::InvalidLayout(format!(
                "expected blocked memory format, got {}",
                layout.format().name()
            ))
        })?;
        Ok(strides.iter().rev().copied().collect())
    }

    /// Whether the tensor is dense in column-major order.
    ///
    /// Only the canonical pattern is recognized: the last declared stride
    /// must equal the product of every other dim.
    pub fn is_contiguous(&self) -> Result<bool> {
        let dims = self.shape().dims();
        let Some((_, leading)) = dims.split_last() else {
            return Ok(true);
        };
        let strides = self.strides()?;
        let expected: usize = leading.iter().product();
        Ok(strides.dims().last() == Some(&expected))
    }

    // =========================================================================
    // Host and device access
    // =========================================================================

    /// Raw storage pointer, waiting for pending work on first use.
    pub fn get_or_eval_data_handle(&self) -> Result<*mut u8> {
        if !self.state.is_data_ready() {
            self.backend().synchronize()?;
            self.state.set_data_ready(true);
        }
        Ok(self.memory().data_handle())
    }

    /// Hand out the raw storage pointer and lock it. The tensor must be
    /// [`unlock`](Self::unlock)ed before its state is dropped.
    pub fn device(&self) -> Result<*mut u8> {
        let ptr = self.get_or_eval_data_handle()?;
        self.state.set_device_ptr_locked(true);
        Ok(ptr)
    }

    pub fn unlock(&self) {
        self.state.set_device_ptr_locked(false);
    }

    pub fn is_locked(&self) -> bool {
        self.state.is_device_ptr_locked()
    }

    /// Copy the contents into `out`, which must be exactly
    /// [`size_in_bytes`](Self::size_in_bytes) long.
    pub fn host(&self, out: &mut [u8]) -> Result<()> {
        let expected = self.size_in_bytes();
        if out.len() != expected {
            return Err(StrataError::InvalidArgument(format!(
                "host buffer has {} bytes, tensor needs {expected}",
                out.len()
            )));
        }
        if !self.is_contiguous()? {
            return self.as_contiguous_tensor()?.host(out);
        }
        let layout = self.memory().layout();
        if !layout.is_dense() {
            return self.copy()?.host(out);
        }
        let mapped = self.memory().map();
        let bytes = mapped.get(..expected).ok_or_else(|| {
            StrataError::InvalidLayout(format!(
                "buffer holds {} bytes, {layout} needs {expected}",
                mapped.len()
            ))
        })?;
        out.copy_from_slice(bytes);
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = vec![0u8; self.size_in_bytes()];
        self.host(&mut out)?;
        Ok(out)
    }

    pub fn to_vec<T: Element>(&self) -> Result<Vec<T>> {
        self.expect_dtype(T::DTYPE)?;
        let bytes = self.to_bytes()?;
        Ok(bytemuck::pod_collect_to_vec(&bytes[..]))
    }

    /// Copy the first element into `out`, which must be one element wide.
    pub fn scalar(&self, out: &mut [u8]) -> Result<()> {
        if self.elements() == 0 {
            return Err(StrataError::InvalidArgument(
                "cannot read a scalar from an empty tensor".into(),
            ));
        }
        let size = self.dtype().size();
        if out.len() != size {
            return Err(StrataError::InvalidArgument(format!(
                "scalar buffer has {} bytes, {} needs {size}",
                out.len(),
                self.dtype()
            )));
        }

        let backend = self.backend();
        let memory = self.memory();
        let ones = vec![1usize; memory.layout().ndim()];
        let zeros = vec![0usize; ones.len()];
        let src_layout = memory.layout().submemory(&ones, &zeros)?;
        let dst_layout = LayoutDescriptor::contiguous(&Shape::new(&ones), src_layout.native_type());
        let dst = backend.cpu_engine().allocate(&dst_layout)?;
        let reformat = ReformatPrimitive::new(memory.engine(), &src_layout, dst.engine(), &dst_layout)?;
        reformat.execute(backend.stream(), memory, &dst)?;
        backend.synchronize()?;
        out.copy_from_slice(&dst.map()[..size]);
        Ok(())
    }

    pub fn scalar_value<T: Element>(&self) -> Result<T> {
        self.expect_dtype(T::DTYPE)?;
        let mut out = vec![0u8; std::mem::size_of::<T>()];
        self.scalar(&mut out)?;
        Ok(bytemuck::pod_read_unaligned(&out))
    }

    fn expect_dtype(&self, dtype: DType) -> Result<()> {
        if self.dtype() != dtype {
            return Err(StrataError::InvalidArgument(format!(
                "tensor holds {}, requested {dtype}",
                self.dtype()
            )));
        }
        Ok(())
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    /// Human-readable contents. f16 tensors cannot be rendered.
    pub fn render(&self) -> Result<String> {
        if self.dtype() == DType::F16 {
            return Err(StrataError::not_implemented(OpKind::Render, DType::F16));
        }
        format::render_bytes(&self.to_bytes()?, self.dtype(), self.shape())
    }
}

impl fmt::Display for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.render() {
            Ok(text) => f.write_str(&text),
            Err(e) => write!(f, "<error: {e}>"),
        }
    }
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tensor")
            .field("shape", self.shape())
            .field("dtype", &self.dtype())
            .field("location", &self.location())
            .field("ready", &self.is_data_ready())
            .finish()
    }
}

/// Byte size of a `shape` tensor of `dtype`, rejecting shapes whose size
/// does not fit in `usize`.
fn checked_size_in_bytes(shape: &Shape, dtype: DType) -> Result<usize> {
    shape
        .checked_elements()
        .and_then(|n| dtype.checked_storage_bytes(n))
        .ok_or_else(|| {
            StrataError::InvalidArgument(format!("{shape} {dtype} tensor is too large to address"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BackendConfig, StreamMode};
    use crate::engine::{EngineHandle, ImmediateStream, NativeType, ReferenceEngine};

    fn backend(mode: StreamMode) -> Arc<Backend> {
        Backend::new(BackendConfig::default().with_stream_mode(mode)).unwrap()
    }

    #[test]
    fn test_construct_and_read_back() {
        for mode in [StreamMode::Immediate, StreamMode::Worker] {
            let b = backend(mode);
            let t = Tensor::from_slice_in(&b, [2, 3], &[1i32, 2, 3, 4, 5, 6]).unwrap();
            assert_eq!(t.shape().dims(), &[2, 3]);
            assert_eq!(t.dtype(), DType::I32);
            assert_eq!(t.size_in_bytes(), 24);
            assert_eq!(t.location(), Location::Host);
            assert!(t.is_data_ready());
            assert_eq!(t.to_vec::<i32>().unwrap(), vec![1, 2, 3, 4, 5, 6]);
        }
    }

    #[test]
    fn test_wrong_data_length() {
        let b = backend(StreamMode::Immediate);
        let err = Tensor::new_in(&b, [2], DType::F32, Some(&[0u8; 4][..]), Location::Host).unwrap_err();
        assert!(matches!(err, StrataError::InvalidArgument(_)));
    }

    #[test]
    fn test_device_location_rejected() {
        let b = backend(StreamMode::Immediate);
        let err = Tensor::new_in(&b, [1], DType::F32, None, Location::Device).unwrap_err();
        assert!(err.to_string().contains("data must be on host"));
    }

    #[test]
    fn test_empty_tensor() {
        let t = Tensor::empty().unwrap();
        assert_eq!(t.shape().dims(), &[0]);
        assert_eq!(t.dtype(), DType::F32);
        assert_eq!(t.size_in_bytes(), 0);
        assert_eq!(t.render().unwrap(), "[]");
    }

    #[test]
    fn test_result_is_lazy_until_handle() {
        let b = backend(StreamMode::Worker);
        let t = Tensor::from_slice_in(&b, [4], &[1.0f32, 2.0, 3.0, 4.0]).unwrap();
        let c = t.astype(DType::F64).unwrap();
        assert!(!c.is_data_ready());
        let ptr = c.get_or_eval_data_handle().unwrap();
        assert!(!ptr.is_null());
        assert!(c.is_data_ready());
        assert_eq!(c.to_vec::<f64>().unwrap(), vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_strides_are_column_major() {
        let b = backend(StreamMode::Immediate);
        let t = Tensor::new_in(&b, [2, 3, 4], DType::U8, None, Location::Host).unwrap();
        assert_eq!(t.strides().unwrap().dims(), &[1, 2, 6]);
        assert!(t.is_contiguous().unwrap());
    }

    #[test]
    fn test_scalar_tensor() {
        let b = backend(StreamMode::Immediate);
        let t = Tensor::from_slice_in(&b, Shape::scalar(), &[42u16]).unwrap();
        assert!(t.is_contiguous().unwrap());
        assert_eq!(t.scalar_value::<u16>().unwrap(), 42);
        assert_eq!(t.render().unwrap(), "[42]");
    }

    #[test]
    fn test_scalar_reads_first_element() {
        let b = backend(StreamMode::Worker);
        let t = Tensor::from_slice_in(&b, [3, 2], &[7i64, 1, 2, 3, 4, 5]).unwrap();
        let c = t.copy().unwrap();
        assert_eq!(c.scalar_value::<i64>().unwrap(), 7);
        assert!(c.scalar_value::<i32>().is_err());
    }

    #[test]
    fn test_scalar_of_empty_fails() {
        let b = backend(StreamMode::Immediate);
        let t = Tensor::new_in(&b, [0], DType::F32, None, Location::Host).unwrap();
        let err = t.scalar(&mut [0u8; 4]).unwrap_err();
        assert!(matches!(err, StrataError::InvalidArgument(_)));
    }

    #[test]
    fn test_opaque_memory_has_no_strides() {
        let b = backend(StreamMode::Immediate);
        let layout = LayoutDescriptor::opaque(NativeType::F32, &[3, 2], 7);
        let memory = b.engine().allocate(&layout).unwrap();
        let t = Tensor::from_memory(&b, [2, 3], memory).unwrap();
        let err = t.strides().unwrap_err();
        assert!(matches!(err, StrataError::InvalidLayout(_)));
        assert!(err.to_string().contains("opaque"));
        assert!(t.is_contiguous().is_err());
    }

    #[test]
    fn test_strided_memory_is_not_contiguous() {
        let b = backend(StreamMode::Immediate);
        // Native dims [3, 2] with a padded row pitch of 4.
        let layout = LayoutDescriptor::new(NativeType::S32, &[3, 2], &[4, 1]).unwrap();
        let memory = b.engine().allocate(&layout).unwrap();
        let t = Tensor::from_memory(&b, [2, 3], memory).unwrap();
        assert_eq!(t.strides().unwrap().dims(), &[1, 4]);
        assert!(!t.is_contiguous().unwrap());
        let err = t.as_contiguous_tensor().unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::UnsupportedConfiguration);
        assert!(t.host(&mut [0u8; 24]).is_err());
    }

    #[test]
    fn test_from_memory_validates() {
        let b = backend(StreamMode::Immediate);
        let layout = LayoutDescriptor::contiguous(&Shape::new(&[4]), NativeType::F32);
        let memory = b.engine().allocate(&layout).unwrap();
        assert!(Tensor::from_memory(&b, [2, 2], memory.clone()).is_err());
        assert!(Tensor::from_memory(&b, [5], memory.clone()).is_err());
        assert!(Tensor::from_memory(&b, [4], memory).is_ok());

        let bf16 = LayoutDescriptor::contiguous(&Shape::new(&[4]), NativeType::BF16);
        let memory = b.engine().allocate(&bf16).unwrap();
        let err = Tensor::from_memory(&b, [4], memory).unwrap_err();
        assert_eq!(err, StrataError::UnsupportedNativeType(NativeType::BF16));
    }

    #[test]
    fn test_from_memory_requires_native_dims() {
        let b = backend(StreamMode::Immediate);
        // Native dims [2, 3] describe a declared [3, 2] tensor, not [2, 3].
        let layout = LayoutDescriptor::contiguous(&Shape::new(&[3, 2]), NativeType::F32);
        let memory = b.engine().allocate(&layout).unwrap();
        let err = Tensor::from_memory(&b, [2, 3], memory.clone()).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidArgument);
        assert!(err.to_string().contains("do not match shape"));

        let mut t = Tensor::from_memory(&b, [3, 2], memory).unwrap();
        assert!(t.is_contiguous().unwrap());
        let src = Tensor::from_slice_in(&b, [3, 2], &[1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        t.assign(&src).unwrap();
        assert!(t.equals(&src).unwrap());
    }

    #[test]
    fn test_from_memory_rejects_short_span() {
        let b = backend(StreamMode::Immediate);
        // Zero inner stride: six elements addressed through five slots.
        let layout = LayoutDescriptor::new(NativeType::F32, &[3, 2], &[2, 0]).unwrap();
        let memory = b.engine().allocate(&layout).unwrap();
        let err = Tensor::from_memory(&b, [2, 3], memory).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_overlapping_strides_read_through_copy() {
        let b = backend(StreamMode::Immediate);
        // Declared strides [2, 2] pass the contiguity check but are not dense.
        let layout = LayoutDescriptor::new(NativeType::S32, &[3, 2], &[2, 2]).unwrap();
        let memory = b.engine().allocate(&layout).unwrap();
        let slots = [10i32, 11, 12, 13, 14, 15, 16];
        memory.map()[..28].copy_from_slice(bytemuck::cast_slice(&slots[..]));
        let t = Tensor::from_memory(&b, [2, 3], memory).unwrap();
        assert!(t.is_contiguous().unwrap());
        assert_eq!(t.to_vec::<i32>().unwrap(), vec![10, 12, 12, 14, 14, 16]);
    }

    #[test]
    fn test_oversized_shape_rejected() {
        let b = backend(StreamMode::Immediate);
        let err = Tensor::new_in(&b, [usize::MAX / 2, 4], DType::F32, None, Location::Host).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidArgument);
        assert!(err.to_string().contains("too large"));

        let err = Tensor::new_in(&b, [usize::MAX / 4 + 1], DType::F64, None, Location::Host).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidArgument);

        let layout = LayoutDescriptor::contiguous(&Shape::new(&[4]), NativeType::F32);
        let memory = b.engine().allocate(&layout).unwrap();
        assert!(Tensor::from_memory(&b, [usize::MAX, 2], memory).is_err());
    }

    #[test]
    fn test_device_lock_cycle() {
        let b = backend(StreamMode::Immediate);
        let t = Tensor::from_slice_in(&b, [2], &[1u8, 2]).unwrap();
        let alias = t.shallow_copy();
        let ptr = t.device().unwrap();
        assert!(alias.is_locked());
        assert_eq!(ptr, t.memory().data_handle());
        alias.unlock();
        assert!(!t.is_locked());
    }

    #[test]
    fn test_accelerator_tensor_location() {
        let engine = EngineHandle::new(ReferenceEngine::emulated_accelerator(0));
        let b = Backend::with_engine(BackendConfig::default(), engine, Arc::new(ImmediateStream::new()));
        let t = Tensor::from_slice_in(&b, [3], &[1.5f32, 2.5, 3.5]).unwrap();
        assert_eq!(t.location(), Location::Device);
        assert_eq!(t.scalar_value::<f32>().unwrap(), 1.5);
        assert_eq!(t.copy().unwrap().to_vec::<f32>().unwrap(), vec![1.5, 2.5, 3.5]);
    }

    #[test]
    fn test_sparse_rejected() {
        let b = backend(StreamMode::Immediate);
        let v = Tensor::new_in(&b, [1], DType::F32, None, Location::Host).unwrap();
        let err = Tensor::sparse_csr([2, 2], &v, &v, &v).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::UnsupportedConfiguration);
        assert!(!v.is_sparse());
    }

    #[test]
    fn test_display() {
        let b = backend(StreamMode::Immediate);
        let t = Tensor::from_slice_in(&b, [2, 2], &[1.0f32, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(t.to_string(), "[[1, 3],\n [2, 4]]");
        let h = Tensor::new_in(&b, [1], DType::F16, None, Location::Host).unwrap();
        assert!(h.to_string().starts_with("<error: render is not implemented"));
    }
}
