//! Process-wide engine, stream and type mapping.

use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::config::{BackendConfig, StreamMode};
use crate::dtype::DType;
use crate::engine::{
    EngineHandle, EngineKind, ImmediateStream, NativeType, ReferenceEngine, Stream, WorkerStream,
};
use crate::error::StrataError;
use crate::Result;

/// Which tensor backend family a tensor belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendType {
    /// Engine-backed tensors (this crate).
    Engine,
    /// Tensors from a foreign backend. Used to exercise the rejection
    /// path in [`crate::adapter::to_engine_tensor`].
    Stub,
}

impl fmt::Display for BackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendType::Engine => f.write_str("engine"),
            BackendType::Stub => f.write_str("stub"),
        }
    }
}

static GLOBAL: OnceLock<Arc<Backend>> = OnceLock::new();

/// Owns the engines and the stream every tensor created on it uses.
pub struct Backend {
    config: BackendConfig,
    engine: EngineHandle,
    cpu_engine: EngineHandle,
    stream: Arc<dyn Stream>,
}

impl Backend {
    /// The process-wide backend, built from the environment on first use.
    ///
    /// If a worker stream cannot be started the backend falls back to an
    /// immediate stream.
    pub fn global() -> &'static Arc<Backend> {
        GLOBAL.get_or_init(|| {
            let config = BackendConfig::from_env();
            match Backend::new(config.clone()) {
                Ok(backend) => backend,
                Err(e) => {
                    tracing::warn!(error = %e, "falling back to immediate stream");
                    Backend::new_immediate(config.with_stream_mode(StreamMode::Immediate))
                }
            }
        })
    }

    /// A backend running on the reference CPU engine.
    pub fn new(config: BackendConfig) -> Result<Arc<Self>> {
        let stream: Arc<dyn Stream> = match config.stream_mode {
            StreamMode::Immediate => Arc::new(ImmediateStream::new()),
            StreamMode::Worker => Arc::new(WorkerStream::new()?),
        };
        let engine = EngineHandle::new(
            ReferenceEngine::cpu().with_parallel_threshold(config.parallel_threshold),
        );
        Ok(Self::assemble(config, engine.clone(), engine, stream))
    }

    fn new_immediate(config: BackendConfig) -> Arc<Self> {
        let engine = EngineHandle::new(
            ReferenceEngine::cpu().with_parallel_threshold(config.parallel_threshold),
        );
        Self::assemble(config, engine.clone(), engine, Arc::new(ImmediateStream::new()))
    }

    /// A backend over a caller-supplied engine and stream. Host transfers
    /// go through a separate reference CPU engine unless `engine` is
    /// itself a CPU engine.
    pub fn with_engine(config: BackendConfig, engine: EngineHandle, stream: Arc<dyn Stream>) -> Arc<Self> {
        let cpu_engine = if engine.kind() == EngineKind::Cpu {
            engine.clone()
        } else {
            EngineHandle::new(
                ReferenceEngine::cpu().with_parallel_threshold(config.parallel_threshold),
            )
        };
        Self::assemble(config, engine, cpu_engine, stream)
    }

    fn assemble(
        config: BackendConfig,
        engine: EngineHandle,
        cpu_engine: EngineHandle,
        stream: Arc<dyn Stream>,
    ) -> Arc<Self> {
        tracing::info!(
            engine = ?engine,
            stream_mode = %config.stream_mode,
            parallel_threshold = config.parallel_threshold,
            "strata backend initialized"
        );
        Arc::new(Self {
            config,
            engine,
            cpu_engine,
            stream,
        })
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Engine new tensors are allocated on.
    pub fn engine(&self) -> &EngineHandle {
        &self.engine
    }

    /// Host engine used for scalar reads.
    pub fn cpu_engine(&self) -> &EngineHandle {
        &self.cpu_engine
    }

    pub fn stream(&self) -> &dyn Stream {
        self.stream.as_ref()
    }

    pub fn backend_type(&self) -> BackendType {
        BackendType::Engine
    }

    /// Block until all work enqueued on this backend's stream has run.
    pub fn synchronize(&self) -> Result<()> {
        self.stream.synchronize()
    }

    /// Engine tag for a logical dtype.
    pub fn native_type(&self, dtype: DType) -> NativeType {
        match dtype {
            DType::F16 => NativeType::F16,
            DType::F32 => NativeType::F32,
            DType::F64 => NativeType::F64,
            DType::B8 => NativeType::Boolean,
            DType::I16 => NativeType::S16,
            DType::I32 => NativeType::S32,
            DType::I64 => NativeType::S64,
            DType::U8 => NativeType::U8,
            DType::U16 => NativeType::U16,
            DType::U32 => NativeType::U32,
            DType::U64 => NativeType::U64,
        }
    }

    /// Logical dtype for an engine tag. `bf16` and `s8` have none.
    pub fn logical_type(&self, native: NativeType) -> Result<DType> {
        Ok(match native {
            NativeType::F16 => DType::F16,
            NativeType::F32 => DType::F32,
            NativeType::F64 => DType::F64,
            NativeType::Boolean => DType::B8,
            NativeType::S16 => DType::I16,
            NativeType::S32 => DType::I32,
            NativeType::S64 => DType::I64,
            NativeType::U8 => DType::U8,
            NativeType::U16 => DType::U16,
            NativeType::U32 => DType::U32,
            NativeType::U64 => DType::U64,
            NativeType::BF16 | NativeType::S8 => {
                return Err(StrataError::UnsupportedNativeType(native))
            }
        })
    }
}

impl fmt::Debug for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backend")
            .field("engine", &self.engine)
            .field("cpu_engine", &self.cpu_engine)
            .field("stream", &self.stream)
            .field("config", &self.config)
            .finish()
    }
}
