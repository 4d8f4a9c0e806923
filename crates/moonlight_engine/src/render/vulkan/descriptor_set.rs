//! Descriptor set layouts, per-frame pools and writes

use ash::{vk, Device};

use super::{VulkanError, VulkanResult};
use crate::render::backend::DescriptorAllocator;
use crate::render::{RenderError, RenderResult};

/// Sets each frame pool can hand out between resets
pub const FRAME_POOL_MAX_SETS: u32 = 1000;

/// Builder for descriptor set layouts
#[derive(Default)]
pub struct DescriptorSetLayoutBuilder {
    bindings: Vec<vk::DescriptorSetLayoutBinding>,
}

impl DescriptorSetLayoutBuilder {
    /// Empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a uniform buffer binding
    pub fn add_uniform_buffer(mut self, binding: u32, stage_flags: vk::ShaderStageFlags) -> Self {
        self.bindings.push(
            vk::DescriptorSetLayoutBinding::builder()
                .binding(binding)
                .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                .descriptor_count(1)
                .stage_flags(stage_flags)
                .build(),
        );
        self
    }

    /// Create the layout
    pub fn build(self, device: &Device) -> VulkanResult<DescriptorSetLayout> {
        let layout_info = vk::DescriptorSetLayoutCreateInfo::builder().bindings(&self.bindings);

        let layout = unsafe { device.create_descriptor_set_layout(&layout_info, None) }.map_err(VulkanError::Api)?;

        Ok(DescriptorSetLayout {
            layout,
            device: device.clone(),
        })
    }
}

/// Descriptor set layout with RAII cleanup
pub struct DescriptorSetLayout {
    layout: vk::DescriptorSetLayout,
    device: Device,
}

impl DescriptorSetLayout {
    /// Get the layout handle
    pub fn handle(&self) -> vk::DescriptorSetLayout {
        self.layout
    }
}

impl Drop for DescriptorSetLayout {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_descriptor_set_layout(self.layout, None);
        }
    }
}

/// Descriptor pool owned by one frame slot and reset wholesale
pub struct DescriptorPool {
    pool: vk::DescriptorPool,
    device: Device,
    slot: usize,
}

impl DescriptorPool {
    /// Create a pool for `slot` holding up to `max_sets` uniform-buffer sets
    pub fn new(device: Device, slot: usize, max_sets: u32) -> VulkanResult<Self> {
        let pool_sizes = [vk::DescriptorPoolSize::builder()
            .ty(vk::DescriptorType::UNIFORM_BUFFER)
            .descriptor_count(max_sets)
            .build()];

        let pool_info = vk::DescriptorPoolCreateInfo::builder()
            .max_sets(max_sets)
            .pool_sizes(&pool_sizes);

        let pool = unsafe { device.create_descriptor_pool(&pool_info, None) }.map_err(VulkanError::Api)?;

        Ok(Self { pool, device, slot })
    }

    /// Get the pool handle
    pub fn handle(&self) -> vk::DescriptorPool {
        self.pool
    }
}

impl DescriptorAllocator for DescriptorPool {
    type Layout = vk::DescriptorSetLayout;
    type Set = vk::DescriptorSet;

    fn reset(&mut self) -> RenderResult<()> {
        unsafe {
            self.device
                .reset_descriptor_pool(self.pool, vk::DescriptorPoolResetFlags::empty())
        }
        .map_err(|e| VulkanError::Api(e).into())
    }

    fn allocate(&mut self, layout: vk::DescriptorSetLayout) -> RenderResult<vk::DescriptorSet> {
        let layouts = [layout];
        let alloc_info = vk::DescriptorSetAllocateInfo::builder()
            .descriptor_pool(self.pool)
            .set_layouts(&layouts);

        match unsafe { self.device.allocate_descriptor_sets(&alloc_info) } {
            Ok(sets) => sets
                .first()
                .copied()
                .ok_or_else(|| RenderError::Backend("driver returned no descriptor set".to_string())),
            Err(vk::Result::ERROR_OUT_OF_POOL_MEMORY | vk::Result::ERROR_FRAGMENTED_POOL) => {
                Err(RenderError::PoolExhausted { slot: self.slot })
            }
            Err(e) => Err(VulkanError::Api(e).into()),
        }
    }
}

impl Drop for DescriptorPool {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_descriptor_pool(self.pool, None);
        }
    }
}

/// Point `binding` of `set` at the whole of `buffer`
pub fn write_uniform_buffer(device: &Device, set: vk::DescriptorSet, binding: u32, buffer: vk::Buffer) {
    let buffer_info = [vk::DescriptorBufferInfo {
        buffer,
        offset: 0,
        range: vk::WHOLE_SIZE,
    }];
    let write = vk::WriteDescriptorSet::builder()
        .dst_set(set)
        .dst_binding(binding)
        .dst_array_element(0)
        .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
        .buffer_info(&buffer_info)
        .build();

    unsafe {
        device.update_descriptor_sets(&[write], &[]);
    }
}
