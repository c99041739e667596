//! Text rendering of tensor contents.
//!
//! Data is column-major: the first declared dimension varies fastest. Rank 2
//! prints as a matrix of rows, higher ranks print one slice per index of the
//! last dimension, nested.

use std::fmt::{self, Write};

use crate::dtype::DType;
use crate::error::StrataError;
use crate::shape::Shape;
use crate::tensor::OpKind;
use crate::Result;

/// Element types that know how to print themselves.
pub trait RenderElement: Copy {
    fn write_element(&self, out: &mut dyn Write) -> fmt::Result;
}

macro_rules! impl_render_integer {
    ($($ty:ty),*) => {
        $(
            impl RenderElement for $ty {
                fn write_element(&self, out: &mut dyn Write) -> fmt::Result {
                    write!(out, "{self}")
                }
            }
        )*
    };
}

impl_render_integer!(u8, u16, u32, u64, i16, i32, i64);

impl RenderElement for f32 {
    fn write_element(&self, out: &mut dyn Write) -> fmt::Result {
        out.write_str(&format_general(f64::from(*self)))
    }
}

impl RenderElement for f64 {
    fn write_element(&self, out: &mut dyn Write) -> fmt::Result {
        out.write_str(&format_general(*self))
    }
}

/// Shortest general form with six significant digits: fixed notation for
/// decimal exponents in `[-4, 6)`, scientific otherwise, trailing zeros
/// dropped. `2.5`, `1e-07`, `1.23457e+08`.
pub fn format_general(value: f64) -> String {
    const PRECISION: i32 = 6;
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    // Rounding to the target precision decides the exponent.
    let digits = (PRECISION - 1) as usize;
    let sci = format!("{value:.digits$e}");
    let (mantissa, exp) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };

    if exp < -4 || exp >= PRECISION {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{sign}{:02}", strip_zeros(mantissa), exp.abs())
    } else {
        let decimals = (PRECISION - 1 - exp) as usize;
        strip_zeros(&format!("{value:.decimals$}")).to_string()
    }
}

fn strip_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

/// Nested view of column-major data, ready to print.
#[derive(Debug, Clone, PartialEq)]
pub enum Nested<T> {
    /// Rank 0 or 1: one element per line.
    Column(Vec<T>),
    /// Rank 2, stored column-major.
    Matrix { rows: usize, cols: usize, data: Vec<T> },
    /// Rank 3 and up: one entry per index of the last dimension.
    Slices(Vec<Nested<T>>),
}

impl<T: RenderElement> Nested<T> {
    pub fn build(elements: &[T], dims: &[usize]) -> Result<Self> {
        let expected: usize = dims.iter().product();
        if elements.len() != expected {
            return Err(StrataError::InvalidArgument(format!(
                "cannot render {} elements as {dims:?}",
                elements.len()
            )));
        }
        Ok(Self::build_unchecked(elements, dims))
    }

    fn build_unchecked(elements: &[T], dims: &[usize]) -> Self {
        match dims {
            [] | [_] => Nested::Column(elements.to_vec()),
            [rows, cols] => Nested::Matrix {
                rows: *rows,
                cols: *cols,
                data: elements.to_vec(),
            },
            [inner @ .., last] => {
                let stride: usize = inner.iter().product();
                let slices = (0..*last)
                    .map(|i| Self::build_unchecked(&elements[i * stride..(i + 1) * stride], inner))
                    .collect();
                Nested::Slices(slices)
            }
        }
    }

    /// Print at nesting `depth`; continuation lines of a matrix or slice
    /// list are indented by `depth + 1` spaces.
    pub fn write_to(&self, out: &mut dyn Write, depth: usize) -> fmt::Result {
        out.write_char('[')?;
        match self {
            Nested::Column(values) => {
                for (i, v) in values.iter().enumerate() {
                    if i != 0 {
                        out.write_char(' ')?;
                    }
                    v.write_element(out)?;
                    if i + 1 != values.len() {
                        out.write_str(",\n")?;
                    }
                }
            }
            Nested::Matrix { rows, cols, data } => {
                for row in 0..*rows {
                    if row != 0 {
                        write_indent(out, depth + 1)?;
                    }
                    out.write_char('[')?;
                    for col in 0..*cols {
                        data[col * rows + row].write_element(out)?;
                        if col + 1 != *cols {
                            out.write_str(", ")?;
                        }
                    }
                    out.write_char(']')?;
                    if row + 1 != *rows {
                        out.write_str(",\n")?;
                    }
                }
            }
            Nested::Slices(slices) => {
                for (i, slice) in slices.iter().enumerate() {
                    if i != 0 {
                        write_indent(out, depth + 1)?;
                    }
                    slice.write_to(out, depth + 1)?;
                    if i + 1 != slices.len() {
                        out.write_str(",\n")?;
                    }
                }
            }
        }
        out.write_char(']')
    }
}

fn write_indent(out: &mut dyn Write, n: usize) -> fmt::Result {
    for _ in 0..n {
        out.write_char(' ')?;
    }
    Ok(())
}

impl<T: RenderElement> fmt::Display for Nested<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_to(f, 0)
    }
}

fn render_as<T: RenderElement + bytemuck::Pod>(bytes: &[u8], shape: &Shape) -> Result<String> {
    let values: Vec<T> = bytemuck::pod_collect_to_vec(bytes);
    Ok(Nested::build(&values, shape.dims())?.to_string())
}

/// Render host bytes of `dtype` laid out contiguously for `shape`.
pub fn render_bytes(bytes: &[u8], dtype: DType, shape: &Shape) -> Result<String> {
    let expected = dtype.storage_bytes(shape.elements());
    if bytes.len() != expected {
        return Err(StrataError::InvalidArgument(format!(
            "expected {expected} bytes of {dtype} for {shape}, got {}",
            bytes.len()
        )));
    }
    match dtype {
        DType::F16 => Err(StrataError::not_implemented(OpKind::Render, dtype)),
        DType::F32 => render_as::<f32>(bytes, shape),
        DType::F64 => render_as::<f64>(bytes, shape),
        DType::B8 | DType::U8 => render_as::<u8>(bytes, shape),
        DType::I16 => render_as::<i16>(bytes, shape),
        DType::I32 => render_as::<i32>(bytes, shape),
        DType::I64 => render_as::<i64>(bytes, shape),
        DType::U16 => render_as::<u16>(bytes, shape),
        DType::U32 => render_as::<u32>(bytes, shape),
        DType::U64 => render_as::<u64>(bytes, shape),
    }
}
