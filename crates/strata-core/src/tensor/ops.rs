//! Assignment, comparison and the operator surface engine tensors reject.

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use super::Tensor;
use crate::dtype::DType;
use crate::engine::ReformatPrimitive;
use crate::error::StrataError;
use crate::Result;

/// Absolute tolerance used when comparing f32 tensors.
pub const F32_EQUAL_TOLERANCE: f32 = 1e-5;

/// Operations named in not-implemented errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    Assign,
    InPlaceAdd,
    InPlaceSubtract,
    InPlaceMultiply,
    InPlaceDivide,
    Index,
    Flatten,
    Flat,
    Render,
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OpKind::Assign => "assign",
            OpKind::InPlaceAdd => "add_assign",
            OpKind::InPlaceSubtract => "sub_assign",
            OpKind::InPlaceMultiply => "mul_assign",
            OpKind::InPlaceDivide => "div_assign",
            OpKind::Index => "index",
            OpKind::Flatten => "flatten",
            OpKind::Flat => "flat",
            OpKind::Render => "render",
        };
        f.write_str(name)
    }
}

/// A host scalar used as the right-hand side of an operator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Literal {
    Bool(bool),
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
}

impl Literal {
    pub fn type_name(&self) -> &'static str {
        match self {
            Literal::Bool(_) => "bool",
            Literal::I8(_) => "i8",
            Literal::U8(_) => "u8",
            Literal::I16(_) => "i16",
            Literal::U16(_) => "u16",
            Literal::I32(_) => "i32",
            Literal::U32(_) => "u32",
            Literal::I64(_) => "i64",
            Literal::U64(_) => "u64",
            Literal::F32(_) => "f32",
            Literal::F64(_) => "f64",
        }
    }
}

/// Right-hand side of an in-place operator.
#[derive(Debug, Clone, Copy)]
pub enum Operand<'a> {
    Tensor(&'a Tensor),
    Literal(Literal),
}

impl Operand<'_> {
    pub fn type_name(&self) -> &'static str {
        match self {
            Operand::Tensor(_) => "tensor",
            Operand::Literal(literal) => literal.type_name(),
        }
    }
}

impl<'a> From<&'a Tensor> for Operand<'a> {
    fn from(tensor: &'a Tensor) -> Self {
        Operand::Tensor(tensor)
    }
}

impl From<Literal> for Operand<'_> {
    fn from(literal: Literal) -> Self {
        Operand::Literal(literal)
    }
}

macro_rules! impl_literal_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Literal {
                fn from(value: $ty) -> Self {
                    Literal::$variant(value)
                }
            }

            impl From<$ty> for Operand<'_> {
                fn from(value: $ty) -> Self {
                    Operand::Literal(Literal::$variant(value))
                }
            }
        )*
    };
}

impl_literal_from!(
    bool => Bool,
    i8 => I8,
    u8 => U8,
    i16 => I16,
    u16 => U16,
    i32 => I32,
    u32 => U32,
    i64 => I64,
    u64 => U64,
    f32 => F32,
    f64 => F64,
);

/// One component of an indexing expression.
#[derive(Debug, Clone)]
pub enum Index {
    At(isize),
    Range(Range<isize>),
    Span,
    Tensor(Tensor),
}

fn reject<T>(op: OpKind, operand: &str) -> Result<T> {
    Err(StrataError::not_implemented(op, operand))
}

impl Tensor {
    // =========================================================================
    // Assignment
    // =========================================================================

    /// Overwrite this tensor's contents with `other`'s, converting type if
    /// needed. Every shallow copy sees the new contents.
    pub fn assign(&mut self, other: &Tensor) -> Result<()> {
        if self.shares_state_with(other) {
            return Ok(());
        }
        if self.shape() != other.shape() {
            return Err(StrataError::ShapeMismatch {
                expected: self.shape().dims().to_vec(),
                got: other.shape().dims().to_vec(),
            });
        }
        // Work pending on another backend's stream is not ordered with ours.
        if !Arc::ptr_eq(self.backend(), other.backend()) {
            other.get_or_eval_data_handle()?;
        }
        let src = other.memory();
        let dst = self.memory();
        let reformat = ReformatPrimitive::new(src.engine(), src.layout(), dst.engine(), dst.layout())?;
        reformat.execute(self.backend().stream(), src, dst)?;
        self.state().set_data_ready(false);
        Ok(())
    }

    /// Fill with a literal value. Not supported by engine tensors.
    pub fn assign_literal(&mut self, value: impl Into<Literal>) -> Result<()> {
        self.in_place(OpKind::Assign, Operand::Literal(value.into()))
    }

    /// Apply `op` with `operand` as the right-hand side.
    ///
    /// Only tensor assignment is supported; every other combination fails
    /// with a not-implemented error naming the operation and operand type.
    pub fn in_place(&mut self, op: OpKind, operand: Operand<'_>) -> Result<()> {
        match (op, operand) {
            (OpKind::Assign, Operand::Tensor(other)) => self.assign(other),
            (op, operand) => reject(op, operand.type_name()),
        }
    }

    pub fn inplace_add<'a>(&mut self, rhs: impl Into<Operand<'a>>) -> Result<()> {
        self.in_place(OpKind::InPlaceAdd, rhs.into())
    }

    pub fn inplace_sub<'a>(&mut self, rhs: impl Into<Operand<'a>>) -> Result<()> {
        self.in_place(OpKind::InPlaceSubtract, rhs.into())
    }

    pub fn inplace_mul<'a>(&mut self, rhs: impl Into<Operand<'a>>) -> Result<()> {
        self.in_place(OpKind::InPlaceMultiply, rhs.into())
    }

    pub fn inplace_div<'a>(&mut self, rhs: impl Into<Operand<'a>>) -> Result<()> {
        self.in_place(OpKind::InPlaceDivide, rhs.into())
    }

    // =========================================================================
    // Comparison
    // =========================================================================

    /// Element-wise equality. f32 tensors compare within
    /// [`F32_EQUAL_TOLERANCE`]; everything else compares bytes exactly.
    pub fn equals(&self, other: &Tensor) -> Result<bool> {
        if self.shares_state_with(other) {
            return Ok(true);
        }
        if self.shape() != other.shape() || self.dtype() != other.dtype() {
            return Ok(false);
        }
        let lhs = self.to_bytes()?;
        let rhs = other.to_bytes()?;
        Ok(match self.dtype() {
            DType::F32 => {
                let lhs: Vec<f32> = bytemuck::pod_collect_to_vec(&lhs[..]);
                let rhs: Vec<f32> = bytemuck::pod_collect_to_vec(&rhs[..]);
                lhs.iter()
                    .zip(&rhs)
                    .all(|(a, b)| (a - b).abs() < F32_EQUAL_TOLERANCE)
            }
            _ => lhs == rhs,
        })
    }

    // =========================================================================
    // Indexing
    // =========================================================================

    pub fn index(&self, _indices: &[Index]) -> Result<Tensor> {
        reject(OpKind::Index, "tensor")
    }

    pub fn flatten(&self) -> Result<Tensor> {
        reject(OpKind::Flatten, "tensor")
    }

    pub fn flat(&self, _index: &Index) -> Result<Tensor> {
        reject(OpKind::Flat, "tensor")
    }
}
