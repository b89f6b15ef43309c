// ============================================================
// Layer 5 — Backend Selection
// ============================================================
// The compute device is picked once at startup and then the
// generic pipeline code is monomorphised for that backend.
//
//   gpu  → Autodiff<Wgpu>        (Autodiff<Wgpu<f16>> with fp16)
//   cpu  → Autodiff<NdArray>     (fp16 ignored)
//   auto → gpu when built with the `wgpu` feature, else cpu
//
// Burn backends are types, not values, so a runtime choice has
// to be turned into a call of a generic function. BackendTask is
// that generic function, packaged as a trait.

use anyhow::{bail, Result};
use burn::{
    backend::{ndarray::NdArrayDevice, Autodiff, NdArray},
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Which compute device to run on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceChoice {
    #[default]
    Auto,
    Gpu,
    Cpu,
}

impl FromStr for DeviceChoice {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "gpu"  => Ok(Self::Gpu),
            "cpu"  => Ok(Self::Cpu),
            other  => bail!("unknown device '{other}' (expected auto, gpu or cpu)"),
        }
    }
}

impl fmt::Display for DeviceChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Auto => "auto",
            Self::Gpu  => "gpu",
            Self::Cpu  => "cpu",
        })
    }
}

/// Work that is generic over the training backend.
///
/// Inference-only tasks use `B::InnerBackend`.
pub trait BackendTask {
    type Output;

    fn run<B: AutodiffBackend>(self, device: B::Device) -> Result<Self::Output>;
}

/// Resolve `choice` to a concrete backend and run `task` on it.
pub fn dispatch<T: BackendTask>(choice: DeviceChoice, fp16: bool, task: T) -> Result<T::Output> {
    match choice {
        DeviceChoice::Cpu => run_cpu(fp16, task),
        DeviceChoice::Gpu => run_gpu(fp16, task),
        DeviceChoice::Auto if cfg!(feature = "wgpu") => run_gpu(fp16, task),
        DeviceChoice::Auto => {
            tracing::info!("Built without the `wgpu` feature, falling back to CPU");
            run_cpu(fp16, task)
        }
    }
}

fn run_cpu<T: BackendTask>(fp16: bool, task: T) -> Result<T::Output> {
    if fp16 {
        tracing::warn!("fp16 is only supported on the GPU backend; running in f32 on CPU");
    }
    let device = NdArrayDevice::Cpu;
    println!("Using device: CPU (ndarray)");
    task.run::<Autodiff<NdArray>>(device)
}

#[cfg(feature = "wgpu")]
fn run_gpu<T: BackendTask>(fp16: bool, task: T) -> Result<T::Output> {
    use burn::backend::{wgpu::WgpuDevice, Wgpu};

    let device = WgpuDevice::default();
    if fp16 {
        println!("Using device: GPU {device:?} (f16)");
        task.run::<Autodiff<Wgpu<burn::tensor::f16>>>(device)
    } else {
        println!("Using device: GPU {device:?}");
        task.run::<Autodiff<Wgpu>>(device)
    }
}

#[cfg(not(feature = "wgpu"))]
fn run_gpu<T: BackendTask>(_fp16: bool, _task: T) -> Result<T::Output> {
    bail!("GPU requested but this binary was built without the `wgpu` feature")
}
