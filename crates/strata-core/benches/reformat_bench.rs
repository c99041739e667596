//! Benchmark: reference engine reformats, serial walk vs rayon slabs.

use std::sync::Arc;
use std::time::Instant;

use strata_core::{Backend, BackendConfig, DType, StreamMode, Tensor};

fn backend(parallel_threshold: usize) -> Arc<Backend> {
    let config = BackendConfig {
        stream_mode: StreamMode::Immediate,
        parallel_threshold,
    };
    Backend::new(config).unwrap()
}

fn bench_astype(t: &Tensor, dtype: DType, iters: usize) -> f64 {
    let start = Instant::now();
    for _ in 0..iters {
        let out = t.astype(dtype).unwrap();
        out.get_or_eval_data_handle().unwrap();
    }
    start.elapsed().as_secs_f64() / iters as f64
}

fn bench_copy(t: &Tensor, iters: usize) -> f64 {
    let start = Instant::now();
    for _ in 0..iters {
        let out = t.copy().unwrap();
        out.get_or_eval_data_handle().unwrap();
    }
    start.elapsed().as_secs_f64() / iters as f64
}

fn gbps(bytes: usize, secs: f64) -> f64 {
    bytes as f64 / secs / 1e9
}

fn main() {
    println!("=== Strata Reformat Benchmark ===");
    println!("rayon threads: {}\n", rayon::current_num_threads());

    let serial = backend(usize::MAX);
    let parallel = backend(1);

    let sizes: &[(usize, usize)] = &[(64, 64), (256, 256), (1024, 1024), (2048, 2048)];

    println!("{:<12} {:>12} {:>14} {:>14} {:>10}",
        "Size", "Copy (ms)", "f32->f16 (ms)", "f32->f16 par", "Speedup");
    println!("{}", "-".repeat(66));

    for &(rows, cols) in sizes {
        let data: Vec<f32> = (0..rows * cols).map(|i| ((i * 7 + 3) % 13) as f32 * 0.1 - 0.6).collect();
        let iters = if rows >= 1024 { 5 } else { 50 };

        let a = Tensor::from_slice_in(&serial, [rows, cols], &data).unwrap();
        let b = Tensor::from_slice_in(&parallel, [rows, cols], &data).unwrap();

        let copy = bench_copy(&a, iters);
        let conv = bench_astype(&a, DType::F16, iters);
        let conv_par = bench_astype(&b, DType::F16, iters);

        println!("{:<12} {:>12.3} {:>14.3} {:>14.3} {:>9.2}x",
            format!("{rows}x{cols}"),
            copy * 1e3,
            conv * 1e3,
            conv_par * 1e3,
            conv / conv_par);
        println!("{:<12} {:>12.2} GB/s", "", gbps(rows * cols * 4, copy));
    }
}
