use candle_core::Device;
use once_cell::sync::Lazy;

#[cfg(all(feature = "metal", feature = "cuda"))]
compile_error!("feature \"metal\" and feature \"cuda\" cannot be enabled at the same time");

static DEVICE: Lazy<Device> = Lazy::new(init_device);

#[cfg(feature = "metal")]
fn init_device() -> Device {
    tracing::info!("Using Metal");
    Device::new_metal(0).expect("No Metal device found.")
}

#[cfg(feature = "cuda")]
fn init_device() -> Device {
    tracing::info!("Using CUDA");
    Device::new_cuda(0).expect("No CUDA device found.")
}

#[cfg(not(any(feature = "metal", feature = "cuda")))]
fn init_device() -> Device {
    tracing::info!("Using CPU");
    Device::Cpu
}

/// The device all inference runs on, selected once per process by cargo feature.
pub fn device() -> &'static Device {
    &DEVICE
}
