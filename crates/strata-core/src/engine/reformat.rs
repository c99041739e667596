//! Reference reformat kernel: strided element copy with type conversion.
//!
//! Conversion rules match what native reorder primitives do:
//! - floats to integers round half to even and saturate, NaN becomes 0
//! - integers narrow with saturation
//! - anything to boolean is `value != 0`

use rayon::prelude::*;
use smallvec::SmallVec;

use super::{NativeType, ReformatKernel};
use crate::error::StrataError;
use crate::layout::{row_major_strides, Dims, LayoutDescriptor};
use crate::Result;

#[derive(Debug, Clone)]
struct Side {
    native_type: NativeType,
    strides: Dims,
    offset: usize,
    dense: bool,
}

impl Side {
    fn of(layout: &LayoutDescriptor) -> Self {
        Self {
            native_type: layout.native_type(),
            strides: layout.physical_strides(),
            offset: layout.offset(),
            dense: layout.is_dense(),
        }
    }
}

/// Compiled copy plan between two layouts with identical dims.
#[derive(Debug, Clone)]
pub struct CpuReformat {
    dims: Dims,
    elements: usize,
    src: Side,
    dst: Side,
    parallel_threshold: usize,
}

impl CpuReformat {
    pub fn compile(
        src: &LayoutDescriptor,
        dst: &LayoutDescriptor,
        parallel_threshold: usize,
    ) -> Result<Self> {
        if src.dims() != dst.dims() {
            return Err(StrataError::InvalidArgument(format!(
                "reformat needs matching dims, got {:?} and {:?}",
                src.dims(),
                dst.dims()
            )));
        }
        // Surface overflow at compile time rather than inside the kernel.
        src.span_bytes()?;
        dst.span_bytes()?;
        Ok(Self {
            dims: SmallVec::from_slice(src.dims()),
            elements: src.elements(),
            src: Side::of(src),
            dst: Side::of(dst),
            parallel_threshold,
        })
    }

    fn is_plain_copy(&self) -> bool {
        self.src.native_type == self.dst.native_type && self.src.dense && self.dst.dense
    }

    /// Copy one outer-axis slab into a dense destination chunk.
    fn copy_slab(&self, src: &[u8], outer: usize, out: &mut [u8]) {
        let inner_dims = &self.dims[1..];
        let inner_dst = row_major_strides(inner_dims);
        let src_base = self.src.offset + outer * self.src.strides[0];
        walk(
            inner_dims,
            (&self.src.strides[1..], src_base),
            (&inner_dst, 0),
            |s, d| self.convert_at(src, s, out, d),
        );
    }

    fn convert_at(&self, src: &[u8], src_elem: usize, dst: &mut [u8], dst_elem: usize) {
        let ss = self.src.native_type.size();
        let ds = self.dst.native_type.size();
        let from = &src[src_elem * ss..(src_elem + 1) * ss];
        let to = &mut dst[dst_elem * ds..(dst_elem + 1) * ds];
        if self.src.native_type == self.dst.native_type {
            to.copy_from_slice(from);
        } else {
            store(self.dst.native_type, load(self.src.native_type, from), to);
        }
    }
}

impl ReformatKernel for CpuReformat {
    fn run(&self, src: &[u8], dst: &mut [u8]) {
        if self.elements == 0 {
            return;
        }
        if self.is_plain_copy() {
            let n = self.elements * self.src.native_type.size();
            dst[..n].copy_from_slice(&src[..n]);
            return;
        }
        if self.dst.dense && self.elements >= self.parallel_threshold && self.dims[0] > 1 {
            let slab = (self.elements / self.dims[0]) * self.dst.native_type.size();
            let total = self.elements * self.dst.native_type.size();
            dst[..total]
                .par_chunks_mut(slab)
                .enumerate()
                .for_each(|(outer, out)| self.copy_slab(src, outer, out));
            return;
        }
        walk(
            &self.dims,
            (&self.src.strides, self.src.offset),
            (&self.dst.strides, self.dst.offset),
            |s, d| self.convert_at(src, s, dst, d),
        );
    }
}

/// Visit every index of `dims` in row-major order, passing the element
/// offsets it maps to under two stride sets.
fn walk(dims: &[usize], a: (&[usize], usize), b: (&[usize], usize), mut visit: impl FnMut(usize, usize)) {
    if dims.iter().any(|&d| d == 0) {
        return;
    }
    let ndim = dims.len();
    let (sa, mut oa) = a;
    let (sb, mut ob) = b;
    let mut index: Dims = SmallVec::from_elem(0, ndim);
    loop {
        visit(oa, ob);
        let mut axis = ndim;
        loop {
            if axis == 0 {
                return;
            }
            axis -= 1;
            index[axis] += 1;
            oa += sa[axis];
            ob += sb[axis];
            if index[axis] < dims[axis] {
                break;
            }
            oa -= sa[axis] * dims[axis];
            ob -= sb[axis] * dims[axis];
            index[axis] = 0;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Value {
    Float(f64),
    Int(i128),
}

fn load(ty: NativeType, bytes: &[u8]) -> Value {
    use bytemuck::pod_read_unaligned as read;
    match ty {
        NativeType::F16 => Value::Float(read::<half::f16>(bytes).to_f64()),
        NativeType::BF16 => Value::Float(read::<half::bf16>(bytes).to_f64()),
        NativeType::F32 => Value::Float(f64::from(read::<f32>(bytes))),
        NativeType::F64 => Value::Float(read::<f64>(bytes)),
        NativeType::S8 => Value::Int(i128::from(read::<i8>(bytes))),
        NativeType::S16 => Value::Int(i128::from(read::<i16>(bytes))),
        NativeType::S32 => Value::Int(i128::from(read::<i32>(bytes))),
        NativeType::S64 => Value::Int(i128::from(read::<i64>(bytes))),
        NativeType::U8 => Value::Int(i128::from(read::<u8>(bytes))),
        NativeType::U16 => Value::Int(i128::from(read::<u16>(bytes))),
        NativeType::U32 => Value::Int(i128::from(read::<u32>(bytes))),
        NativeType::U64 => Value::Int(i128::from(read::<u64>(bytes))),
        NativeType::Boolean => Value::Int(i128::from(bytes[0] != 0)),
    }
}

fn int_range(ty: NativeType) -> (i128, i128) {
    match ty {
        NativeType::S8 => (i128::from(i8::MIN), i128::from(i8::MAX)),
        NativeType::S16 => (i128::from(i16::MIN), i128::from(i16::MAX)),
        NativeType::S32 => (i128::from(i32::MIN), i128::from(i32::MAX)),
        NativeType::S64 => (i128::from(i64::MIN), i128::from(i64::MAX)),
        NativeType::U8 => (0, i128::from(u8::MAX)),
        NativeType::U16 => (0, i128::from(u16::MAX)),
        NativeType::U32 => (0, i128::from(u32::MAX)),
        NativeType::U64 => (0, i128::from(u64::MAX)),
        _ => (0, 1),
    }
}

/// Round half to even, saturate into the target range. NaN maps to 0.
fn float_to_int(value: f64, ty: NativeType) -> i128 {
    if value.is_nan() {
        return 0;
    }
    let (lo, hi) = int_range(ty);
    let rounded = value.round_ties_even();
    if rounded <= lo as f64 {
        lo
    } else if rounded >= hi as f64 {
        hi
    } else {
        rounded as i128
    }
}

fn store(ty: NativeType, value: Value, out: &mut [u8]) {
    use bytemuck::bytes_of;

    if ty == NativeType::Boolean {
        out[0] = match value {
            Value::Float(v) => u8::from(v != 0.0),
            Value::Int(v) => u8::from(v != 0),
        };
        return;
    }

    if ty.is_float() {
        let v = match value {
            Value::Float(v) => v,
            Value::Int(v) => v as f64,
        };
        match ty {
            NativeType::F16 => out.copy_from_slice(bytes_of(&half::f16::from_f64(v))),
            NativeType::BF16 => out.copy_from_slice(bytes_of(&half::bf16::from_f64(v))),
            NativeType::F32 => out.copy_from_slice(bytes_of(&(v as f32))),
            _ => out.copy_from_slice(bytes_of(&v)),
        }
        return;
    }

    let v = match value {
        Value::Float(v) => float_to_int(v, ty),
        Value::Int(v) => {
            let (lo, hi) = int_range(ty);
            v.clamp(lo, hi)
        }
    };
    // `v` is already inside the target range, so these casts are exact.
    match ty {
        NativeType::S8 => out.copy_from_slice(bytes_of(&(v as i8))),
        NativeType::S16 => out.copy_from_slice(bytes_of(&(v as i16))),
        NativeType::S32 => out.copy_from_slice(bytes_of(&(v as i32))),
        NativeType::S64 => out.copy_from_slice(bytes_of(&(v as i64))),
        NativeType::U8 => out.copy_from_slice(bytes_of(&(v as u8))),
        NativeType::U16 => out.copy_from_slice(bytes_of(&(v as u16))),
        NativeType::U32 => out.copy_from_slice(bytes_of(&(v as u32))),
        _ => out.copy_from_slice(bytes_of(&(v as u64))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::Shape;

    fn to_bytes<T: bytemuck::Pod>(values: &[T]) -> Vec<u8> {
        bytemuck::cast_slice(values).to_vec()
    }

    fn run(src: &LayoutDescriptor, dst: &LayoutDescriptor, input: &[u8], threshold: usize) -> Vec<u8> {
        let plan = CpuReformat::compile(src, dst, threshold).unwrap();
        let mut out = vec![0u8; dst.span_bytes().unwrap()];
        plan.run(input, &mut out);
        out
    }

    #[test]
    fn test_plain_copy() {
        let layout = LayoutDescriptor::contiguous(&Shape::new(&[3]), NativeType::S32);
        let out = run(&layout, &layout, &to_bytes(&[1i32, -2, 3]), usize::MAX);
        assert_eq!(bytemuck::pod_collect_to_vec::<u8, i32>(&out), vec![1, -2, 3]);
    }

    #[test]
    fn test_strided_to_dense() {
        // 2 rows of 3 with a padded row pitch of 4.
        let src = LayoutDescriptor::new(NativeType::U8, &[2, 3], &[4, 1]).unwrap();
        let dst = LayoutDescriptor::new(NativeType::U8, &[2, 3], &[3, 1]).unwrap();
        let out = run(&src, &dst, &[1, 2, 3, 99, 4, 5, 6], usize::MAX);
        assert_eq!(out, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_transposing_copy() {
        let src = LayoutDescriptor::new(NativeType::U8, &[2, 3], &[3, 1]).unwrap();
        let dst = LayoutDescriptor::new(NativeType::U8, &[2, 3], &[1, 2]).unwrap();
        let out = run(&src, &dst, &[1, 2, 3, 4, 5, 6], usize::MAX);
        assert_eq!(out, vec![1, 4, 2, 5, 3, 6]);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let src = LayoutDescriptor::new(NativeType::S32, &[4, 5], &[1, 4]).unwrap();
        let dst = LayoutDescriptor::contiguous(&Shape::new(&[5, 4]), NativeType::F64);
        let input: Vec<i32> = (0..20).collect();
        let seq = run(&src, &dst, &to_bytes(&input), usize::MAX);
        let par = run(&src, &dst, &to_bytes(&input), 1);
        assert_eq!(seq, par);
    }

    #[test]
    fn test_float_to_int_rounding_and_saturation() {
        let src = LayoutDescriptor::contiguous(&Shape::new(&[5]), NativeType::F32);
        let dst = LayoutDescriptor::contiguous(&Shape::new(&[5]), NativeType::U8);
        let out = run(&src, &dst, &to_bytes(&[2.5f32, 3.5, -4.0, 300.0, f32::NAN]), usize::MAX);
        assert_eq!(out, vec![2, 4, 0, 255, 0]);
    }

    #[test]
    fn test_int_narrowing_saturates() {
        let src = LayoutDescriptor::contiguous(&Shape::new(&[3]), NativeType::S64);
        let dst = LayoutDescriptor::contiguous(&Shape::new(&[3]), NativeType::S16);
        let out = run(&src, &dst, &to_bytes(&[70_000i64, -70_000, 12]), usize::MAX);
        assert_eq!(bytemuck::pod_collect_to_vec::<u8, i16>(&out), vec![i16::MAX, i16::MIN, 12]);
    }

    #[test]
    fn test_boolean_conversion() {
        let src = LayoutDescriptor::contiguous(&Shape::new(&[3]), NativeType::F64);
        let dst = LayoutDescriptor::contiguous(&Shape::new(&[3]), NativeType::Boolean);
        let out = run(&src, &dst, &to_bytes(&[0.0f64, -0.5, 7.0]), usize::MAX);
        assert_eq!(out, vec![0, 1, 1]);
    }

    #[test]
    fn test_half_conversion() {
        let src = LayoutDescriptor::contiguous(&Shape::new(&[2]), NativeType::F32);
        let dst = LayoutDescriptor::contiguous(&Shape::new(&[2]), NativeType::F16);
        let out = run(&src, &dst, &to_bytes(&[1.5f32, -2.0]), usize::MAX);
        let halves: Vec<half::f16> = bytemuck::pod_collect_to_vec(&out[..]);
        assert_eq!(halves, vec![half::f16::from_f32(1.5), half::f16::from_f32(-2.0)]);
    }

    #[test]
    fn test_offset_source() {
        let full = LayoutDescriptor::contiguous(&Shape::new(&[2, 2]), NativeType::U16);
        let sub = full.submemory(&[1, 1], &[1, 1]).unwrap();
        let dst = LayoutDescriptor::new(NativeType::U16, &[1, 1], &[1, 1]).unwrap();
        let out = run(&sub, &dst, &to_bytes(&[10u16, 20, 30, 40]), usize::MAX);
        assert_eq!(bytemuck::pod_collect_to_vec::<u8, u16>(&out), vec![40]);
    }

    #[test]
    fn test_dims_must_match() {
        let a = LayoutDescriptor::contiguous(&Shape::new(&[2]), NativeType::U8);
        let b = LayoutDescriptor::contiguous(&Shape::new(&[3]), NativeType::U8);
        assert!(CpuReformat::compile(&a, &b, 1).is_err());
    }

    #[test]
    fn test_walk_rank_zero() {
        let mut seen = Vec::new();
        walk(&[], (&[], 3), (&[], 5), |a, b| seen.push((a, b)));
        assert_eq!(seen, vec![(3, 5)]);
    }
}
