//! # strata-core
//!
//! Engine-backed tensor runtime for the strata framework.
//!
//! Provides the `Tensor` type on top of a compute engine:
//! - Typed engine buffers described by layout descriptors
//! - Copy-with-conversion (reformat) primitives on an ordered stream
//! - Lazy results, synchronized on first host access
//! - Shallow and deep copies, raw pointer locking
//! - A software reference engine with immediate or worker-thread streams

pub mod adapter;
pub mod backend;
pub mod config;
pub mod dtype;
pub mod engine;
pub mod error;
pub mod format;
pub mod layout;
pub mod location;
pub mod prelude;
pub mod shape;
pub mod tensor;

pub use adapter::{to_engine_tensor, TensorAdapter};
pub use backend::{Backend, BackendType};
pub use config::{BackendConfig, StreamMode};
pub use dtype::{DType, Element};
pub use error::{ErrorKind, StrataError};
pub use layout::LayoutDescriptor;
pub use location::Location;
pub use shape::Shape;
pub use tensor::{OpKind, Tensor};

pub type Result<T> = std::result::Result<T, StrataError>;
