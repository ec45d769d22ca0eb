// gpu/buffer.rs — Device buffer manager.
//
// Every device-resident array in the engine is a flat `array<f32>` storage
// buffer: the source image, a dispatch's filter coefficients, and the
// dispatch output. This module owns their lifecycle:
//
//   allocate(bytes, role) → DeviceBuffer
//   upload(&buf, &[f32])              blocking; returns once the copy landed
//   download(&buf) → Vec<f32>         blocking; staging buffer + map_async
//   release(buf)                      frees device memory immediately
//
// Allocation is checked against the device limits before wgpu sees it, and
// the driver call itself runs inside an OutOfMemory + Validation error
// scope, so an exhausted device surfaces as `AllocationFailure` rather than
// a panic. There is no fallback allocator: the caller aborts the run.
//
// READBACK:
// Storage buffers cannot be mapped directly. `download` copies into a
// MAP_READ staging buffer, submits, then maps it and polls the device until
// the callback fires.

use std::sync::mpsc;

use log::debug;

use crate::error::{Result, StencilError};
use crate::gpu::device::GpuDevice;

/// Size of one sample on the device.
pub const SAMPLE_BYTES: u64 = std::mem::size_of::<f32>() as u64;

/// What a buffer is used for. Decides its wgpu usage flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferRole {
    /// Input image samples; written by upload, read by kernels.
    Source,
    /// One dispatch's filter coefficients.
    Coefficients,
    /// Kernel output; read back by download.
    Output,
}

impl BufferRole {
    fn usage(self) -> wgpu::BufferUsages {
        match self {
            BufferRole::Source | BufferRole::Coefficients => {
                wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST
            }
            BufferRole::Output => wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
        }
    }
}

/// A device-resident `f32` array. Dropping it frees the device memory.
#[derive(Debug)]
pub struct DeviceBuffer {
    buffer: wgpu::Buffer,
    byte_size: u64,
    role: BufferRole,
    label: String,
}

impl DeviceBuffer {
    /// Size in bytes.
    pub fn byte_size(&self) -> u64 {
        self.byte_size
    }

    /// Number of `f32` samples the buffer holds.
    pub fn len(&self) -> usize {
        (self.byte_size / SAMPLE_BYTES) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.byte_size == 0
    }

    pub fn role(&self) -> BufferRole {
        self.role
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub(crate) fn raw(&self) -> &wgpu::Buffer {
        &self.buffer
    }
}

/// Allocates, fills, reads back and frees device buffers.
pub struct BufferManager<'g> {
    gpu: &'g GpuDevice,
}

impl<'g> BufferManager<'g> {
    pub fn new(gpu: &'g GpuDevice) -> Self {
        BufferManager { gpu }
    }

    /// Reserve `byte_size` bytes of device memory.
    ///
    /// # Errors
    /// `AllocationFailure` if the size is zero, not a whole number of
    /// samples, above the device limits, or rejected by the driver.
    pub fn allocate(&self, byte_size: u64, role: BufferRole, label: &str) -> Result<DeviceBuffer> {
        let fail = |reason: String| StencilError::AllocationFailure {
            label: label.to_string(),
            bytes: byte_size,
            reason,
        };
        if byte_size == 0 || byte_size % SAMPLE_BYTES != 0 {
            return Err(fail(format!("size must be a positive multiple of {SAMPLE_BYTES}")));
        }
        let limits = self.gpu.limits();
        let max = limits.max_buffer_size.min(limits.max_storage_buffer_binding_size as u64);
        if byte_size > max {
            return Err(fail(format!("exceeds device limit of {max} bytes")));
        }

        let ((buffer, validation), oom) = self.gpu.scoped(wgpu::ErrorFilter::OutOfMemory, || {
            self.gpu.scoped(wgpu::ErrorFilter::Validation, || {
                self.gpu.device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some(label),
                    size: byte_size,
                    usage: role.usage(),
                    mapped_at_creation: false,
                })
            })
        });
        if let Some(e) = oom.or(validation) {
            buffer.destroy();
            return Err(fail(e.to_string()));
        }

        debug!("allocated {label}: {byte_size} bytes ({role:?})");
        Ok(DeviceBuffer {
            buffer,
            byte_size,
            role,
            label: label.to_string(),
        })
    }

    /// Allocate a buffer sized for `data` and upload it.
    pub fn allocate_init(&self, data: &[f32], role: BufferRole, label: &str) -> Result<DeviceBuffer> {
        let buf = self.allocate(data.len() as u64 * SAMPLE_BYTES, role, label)?;
        self.upload(&buf, data)?;
        Ok(buf)
    }

    /// Copy `data` to the start of `buf` and wait for the copy to complete.
    ///
    /// # Errors
    /// `TransferFailure` if `data` does not fit, the buffer is not an
    /// upload target, or the queue reports a validation error.
    pub fn upload(&self, buf: &DeviceBuffer, data: &[f32]) -> Result<()> {
        let fail = |reason: String| StencilError::TransferFailure {
            label: buf.label.clone(),
            reason,
        };
        let bytes = data.len() as u64 * SAMPLE_BYTES;
        if bytes > buf.byte_size {
            return Err(fail(format!(
                "{bytes} bytes do not fit in a {} byte buffer",
                buf.byte_size
            )));
        }
        if buf.role == BufferRole::Output {
            return Err(fail("output buffers are not upload targets".to_string()));
        }

        let ((), err) = self.gpu.scoped(wgpu::ErrorFilter::Validation, || {
            self.gpu.queue.write_buffer(&buf.buffer, 0, bytemuck::cast_slice(data));
            self.gpu.queue.submit(std::iter::empty());
        });
        self.gpu.wait_idle();
        if let Some(e) = err {
            return Err(fail(e.to_string()));
        }
        debug!("uploaded {bytes} bytes to {}", buf.label);
        Ok(())
    }

    /// Read the whole buffer back to host memory.
    ///
    /// # Errors
    /// `AllocationFailure` if the staging buffer cannot be created;
    /// `TransferFailure` if the copy or the map fails.
    pub fn download(&self, buf: &DeviceBuffer) -> Result<Vec<f32>> {
        let fail = |reason: String| StencilError::TransferFailure {
            label: buf.label.clone(),
            reason,
        };
        if buf.role != BufferRole::Output {
            return Err(fail(format!("{:?} buffers are not readable", buf.role)));
        }

        let staging = self.staging_buffer(buf)?;
        let ((), err) = self.gpu.scoped(wgpu::ErrorFilter::Validation, || {
            let mut encoder = self.gpu.device.create_command_encoder(
                &wgpu::CommandEncoderDescriptor { label: Some("BufferManager::download") },
            );
            encoder.copy_buffer_to_buffer(&buf.buffer, 0, &staging, 0, buf.byte_size);
            self.gpu.queue.submit(std::iter::once(encoder.finish()));
        });
        if let Some(e) = err {
            staging.destroy();
            return Err(fail(e.to_string()));
        }

        let slice = staging.slice(..);
        let (tx, rx) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |r| {
            // The receiver outlives the poll below; a failed send only means
            // the caller already gave up.
            let _ = tx.send(r);
        });
        self.gpu.wait_idle();

        let mapped = rx
            .recv()
            .map_err(|_| fail("map callback never fired".to_string()))?;
        mapped.map_err(|e| fail(e.to_string()))?;

        let out = {
            let view = slice.get_mapped_range();
            bytemuck::cast_slice::<u8, f32>(&view).to_vec()
        };
        staging.unmap();
        staging.destroy();
        debug!("downloaded {} bytes from {}", buf.byte_size, buf.label);
        Ok(out)
    }

    /// Free the buffer's device memory now rather than at drop.
    pub fn release(&self, buf: DeviceBuffer) {
        debug!("released {} ({} bytes)", buf.label, buf.byte_size);
        buf.buffer.destroy();
    }

    fn staging_buffer(&self, buf: &DeviceBuffer) -> Result<wgpu::Buffer> {
        let (staging, err) = self.gpu.scoped(wgpu::ErrorFilter::OutOfMemory, || {
            self.gpu.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("download staging"),
                size: buf.byte_size,
                usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        });
        match err {
            Some(e) => Err(StencilError::AllocationFailure {
                label: format!("{} staging", buf.label),
                bytes: buf.byte_size,
                reason: e.to_string(),
            }),
            None => Ok(staging),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_usages() {
        assert!(BufferRole::Source.usage().contains(wgpu::BufferUsages::COPY_DST));
        assert!(BufferRole::Coefficients.usage().contains(wgpu::BufferUsages::STORAGE));
        assert!(BufferRole::Output.usage().contains(wgpu::BufferUsages::COPY_SRC));
        assert!(!BufferRole::Output.usage().contains(wgpu::BufferUsages::COPY_DST));
    }

    fn run_gpu_test_in_subprocess(test_name: &str) -> String {
        let output = std::process::Command::new("cargo")
            .args(["test", "--lib", "--", test_name, "--exact", "--ignored", "--nocapture"])
            .output()
            .unwrap_or_else(|e| panic!("subprocess failed for {test_name}: {e}"));
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        print!("{stdout}");
        eprint!("{stderr}");
        stdout + &stderr
    }

    #[test]
    #[ignore = "GPU integration: run via outer subprocess wrapper"]
    fn inner_allocation_rules() {
        let gpu = GpuDevice::new().expect("need a GPU adapter");
        let mgr = BufferManager::new(&gpu);
        assert!(matches!(
            mgr.allocate(0, BufferRole::Output, "empty"),
            Err(StencilError::AllocationFailure { .. })
        ));
        assert!(matches!(
            mgr.allocate(u64::MAX - 3, BufferRole::Output, "huge"),
            Err(StencilError::AllocationFailure { .. })
        ));
        let src = mgr.allocate(16, BufferRole::Source, "src").unwrap();
        assert_eq!(src.len(), 4);
        assert!(!src.is_empty());
        assert_eq!(src.role(), BufferRole::Source);
        assert_eq!(src.label(), "src");
        assert!(matches!(
            mgr.upload(&src, &[0.0; 5]),
            Err(StencilError::TransferFailure { .. })
        ));
        assert!(mgr.download(&src).is_err());
        mgr.release(src);
        println!("GPU_TEST_OK");
    }

    #[test]
    #[ignore = "requires a real GPU adapter"]
    fn test_allocation_rules() {
        let out = run_gpu_test_in_subprocess("gpu::buffer::tests::inner_allocation_rules");
        assert!(out.contains("GPU_TEST_OK"), "inner test failed:\n{out}");
    }
}
