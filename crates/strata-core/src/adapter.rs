//! Backend-neutral tensor interface.
//!
//! A dispatch layer holds tensors as `Box<dyn TensorAdapter>` and never
//! needs to know which backend produced them. Engine tensors recover their
//! concrete type with [`to_engine_tensor`].

use std::any::Any;
use std::fmt;

use crate::backend::BackendType;
use crate::dtype::DType;
use crate::error::StrataError;
use crate::location::Location;
use crate::shape::Shape;
use crate::tensor::{Index, Literal, OpKind, Operand, Tensor};
use crate::Result;

pub trait TensorAdapter: Send + Sync + fmt::Debug {
    fn backend_type(&self) -> BackendType;

    fn as_any(&self) -> &dyn Any;

    /// Create another tensor on the same backend.
    fn new_with(
        &self,
        shape: &Shape,
        dtype: DType,
        data: Option<&[u8]>,
        location: Location,
    ) -> Result<Box<dyn TensorAdapter>>;

    fn shape(&self) -> &Shape;

    fn dtype(&self) -> DType;

    fn location(&self) -> Location;

    fn is_sparse(&self) -> bool;

    fn copy(&self) -> Result<Box<dyn TensorAdapter>>;

    fn shallow_copy(&self) -> Box<dyn TensorAdapter>;

    fn astype(&self, dtype: DType) -> Result<Box<dyn TensorAdapter>>;

    fn scalar(&self, out: &mut [u8]) -> Result<()>;

    fn device(&self) -> Result<*mut u8>;

    fn unlock(&self);

    fn is_locked(&self) -> bool;

    fn host(&self, out: &mut [u8]) -> Result<()>;

    fn is_contiguous(&self) -> Result<bool>;

    fn strides(&self) -> Result<Shape>;

    fn render(&self) -> Result<String>;

    fn assign(&mut self, other: &dyn TensorAdapter) -> Result<()>;

    fn equals(&self, other: &dyn TensorAdapter) -> Result<bool>;

    fn index(&self, indices: &[Index]) -> Result<Box<dyn TensorAdapter>>;

    fn flatten(&self) -> Result<Box<dyn TensorAdapter>>;

    fn flat(&self, index: &Index) -> Result<Box<dyn TensorAdapter>>;

    /// `op` with another tensor on the right-hand side.
    fn in_place_tensor(&mut self, op: OpKind, rhs: &dyn TensorAdapter) -> Result<()>;

    /// `op` with a host scalar on the right-hand side.
    fn in_place_literal(&mut self, op: OpKind, rhs: Literal) -> Result<()>;
}

/// Recover the engine tensor behind an adapter.
pub fn to_engine_tensor(adapter: &dyn TensorAdapter) -> Result<&Tensor> {
    let backend_type = adapter.backend_type();
    if backend_type != BackendType::Engine {
        return Err(StrataError::InvalidArgument(format!(
            "expected engine-backed tensor, got {backend_type}"
        )));
    }
    adapter.as_any().downcast_ref::<Tensor>().ok_or_else(|| {
        StrataError::InvalidArgument("engine backend type on a foreign tensor".into())
    })
}

impl TensorAdapter for Tensor {
    fn backend_type(&self) -> BackendType {
        Tensor::backend_type(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn new_with(
        &self,
        shape: &Shape,
        dtype: DType,
        data: Option<&[u8]>,
        location: Location,
    ) -> Result<Box<dyn TensorAdapter>> {
        let tensor = Tensor::new_in(self.backend(), shape.clone(), dtype, data, location)?;
        Ok(Box::new(tensor))
    }

    fn shape(&self) -> &Shape {
        Tensor::shape(self)
    }

    fn dtype(&self) -> DType {
        Tensor::dtype(self)
    }

    fn location(&self) -> Location {
        Tensor::location(self)
    }

    fn is_sparse(&self) -> bool {
        Tensor::is_sparse(self)
    }

    fn copy(&self) -> Result<Box<dyn TensorAdapter>> {
        Ok(Box::new(Tensor::copy(self)?))
    }

    fn shallow_copy(&self) -> Box<dyn TensorAdapter> {
        Box::new(Tensor::shallow_copy(self))
    }

    fn astype(&self, dtype: DType) -> Result<Box<dyn TensorAdapter>> {
        Ok(Box::new(Tensor::astype(self, dtype)?))
    }

    fn scalar(&self, out: &mut [u8]) -> Result<()> {
        Tensor::scalar(self, out)
    }

    fn device(&self) -> Result<*mut u8> {
        Tensor::device(self)
    }

    fn unlock(&self) {
        Tensor::unlock(self)
    }

    fn is_locked(&self) -> bool {
        Tensor::is_locked(self)
    }

    fn host(&self, out: &mut [u8]) -> Result<()> {
        Tensor::host(self, out)
    }

    fn is_contiguous(&self) -> Result<bool> {
        Tensor::is_contiguous(self)
    }

    fn strides(&self) -> Result<Shape> {
        Tensor::strides(self)
    }

    fn render(&self) -> Result<String> {
        Tensor::render(self)
    }

    fn assign(&mut self, other: &dyn TensorAdapter) -> Result<()> {
        Tensor::assign(self, to_engine_tensor(other)?)
    }

    fn equals(&self, other: &dyn TensorAdapter) -> Result<bool> {
        Tensor::equals(self, to_engine_tensor(other)?)
    }

    fn index(&self, indices: &[Index]) -> Result<Box<dyn TensorAdapter>> {
        Ok(Box::new(Tensor::index(self, indices)?))
    }

    fn flatten(&self) -> Result<Box<dyn TensorAdapter>> {
        Ok(Box::new(Tensor::flatten(self)?))
    }

    fn flat(&self, index: &Index) -> Result<Box<dyn TensorAdapter>> {
        Ok(Box::new(Tensor::flat(self, index)?))
    }

    fn in_place_tensor(&mut self, op: OpKind, rhs: &dyn TensorAdapter) -> Result<()> {
        self.in_place(op, Operand::Tensor(to_engine_tensor(rhs)?))
    }

    fn in_place_literal(&mut self, op: OpKind, rhs: Literal) -> Result<()> {
        self.in_place(op, Operand::Literal(rhs))
    }
}
