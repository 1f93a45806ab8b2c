use anyhow::{bail, Context as AnyhowContext, Result};

use crate::types::{GpuMemoryMode, GpuPowerPreference, RendererSettings};

/// What we learned about the adapter a device was created on.
#[derive(Debug, Clone)]
pub struct AdapterProfile {
    pub name: String,
    pub backend: wgpu::Backend,
    pub device_type: wgpu::DeviceType,
    pub max_texture_dimension: u32,
}

impl AdapterProfile {
    fn from_wgpu(info: &wgpu::AdapterInfo, limits: &wgpu::Limits) -> Self {
        Self {
            name: info.name.clone(),
            backend: info.backend,
            device_type: info.device_type,
            max_texture_dimension: limits.max_texture_dimension_2d,
        }
    }

    pub fn is_software(&self) -> bool {
        matches!(self.device_type, wgpu::DeviceType::Cpu)
    }
}

/// Headless device and queue owned by one renderer.
pub(crate) struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub adapter_profile: AdapterProfile,
}

impl GpuContext {
    pub(crate) fn new(settings: &RendererSettings) -> Result<Self> {
        let instance = create_instance();
        let adapter = request_adapter(&instance, settings)?;

        let adapter_info = adapter.get_info();
        let limits = adapter.limits();
        let adapter_profile = AdapterProfile::from_wgpu(&adapter_info, &limits);
        tracing::debug!(
            name = %adapter_profile.name,
            backend = ?adapter_profile.backend,
            device_type = ?adapter_profile.device_type,
            is_software = adapter_profile.is_software(),
            max_texture_dimension = adapter_profile.max_texture_dimension,
            "selected GPU adapter"
        );

        if !supports_compute(&adapter) {
            bail!(
                "adapter '{}' ({:?}) cannot run compute shaders",
                adapter_profile.name,
                adapter_profile.backend
            );
        }

        let memory_hints = match settings.memory {
            GpuMemoryMode::Balanced => wgpu::MemoryHints::MemoryUsage,
            GpuMemoryMode::Performance => wgpu::MemoryHints::Performance,
        };

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("lensing device"),
            required_features: wgpu::Features::empty(),
            required_limits: limits,
            memory_hints,
            trace: wgpu::Trace::default(),
        }))
        .context("failed to create GPU device")?;

        device.on_uncaptured_error(Box::new(|error: wgpu::Error| {
            tracing::error!(%error, "uncaptured GPU error");
        }));

        Ok(Self {
            device,
            queue,
            adapter_profile,
        })
    }

    pub(crate) fn max_texture_dimension(&self) -> u32 {
        self.adapter_profile.max_texture_dimension
    }

    /// Runs `f` inside out-of-memory and validation error scopes and returns
    /// the first error the device reported for it.
    pub(crate) fn capture_errors<T>(&self, f: impl FnOnce() -> T) -> (T, Option<wgpu::Error>) {
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = f();
        let validation = pollster::block_on(self.device.pop_error_scope());
        let out_of_memory = pollster::block_on(self.device.pop_error_scope());
        (value, out_of_memory.or(validation))
    }
}

/// True when an adapter matching `settings` exists and can run the kernel.
/// No device is created.
pub(crate) fn probe(settings: &RendererSettings) -> bool {
    let instance = create_instance();
    match request_adapter(&instance, settings) {
        Ok(adapter) => supports_compute(&adapter),
        Err(err) => {
            tracing::debug!(error = %err, "GPU probe found no adapter");
            false
        }
    }
}

fn create_instance() -> wgpu::Instance {
    wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        flags: wgpu::InstanceFlags::default(),
        memory_budget_thresholds: wgpu::MemoryBudgetThresholds::default(),
        backend_options: wgpu::BackendOptions::default(),
    })
}

fn request_adapter(instance: &wgpu::Instance, settings: &RendererSettings) -> Result<wgpu::Adapter> {
    let power_preference = match settings.power {
        GpuPowerPreference::Low => wgpu::PowerPreference::LowPower,
        GpuPowerPreference::High => wgpu::PowerPreference::HighPerformance,
    };
    pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference,
        compatible_surface: None,
        force_fallback_adapter: settings.force_fallback_adapter,
    }))
    .context("failed to find a suitable GPU adapter")
}

fn supports_compute(adapter: &wgpu::Adapter) -> bool {
    adapter
        .get_downlevel_capabilities()
        .flags
        .contains(wgpu::DownlevelFlags::COMPUTE_SHADERS)
}
