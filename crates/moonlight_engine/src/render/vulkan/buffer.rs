//! GPU buffers backed by dedicated allocations

use std::ffi::c_void;

use ash::{vk, Device};

use super::context::VulkanContext;
use super::{VulkanError, VulkanResult};

/// Buffer plus its memory, optionally persistently mapped
pub struct Buffer {
    device: Device,
    buffer: vk::Buffer,
    memory: vk::DeviceMemory,
    size: vk::DeviceSize,
    properties: vk::MemoryPropertyFlags,
    mapped: Option<*mut c_void>,
}

impl Buffer {
    /// Create a buffer of `size` bytes in memory with `properties`
    pub fn new(
        context: &VulkanContext,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        properties: vk::MemoryPropertyFlags,
    ) -> VulkanResult<Self> {
        if size == 0 {
            return Err(VulkanError::InvalidOperation {
                reason: "zero-sized buffer".to_string(),
            });
        }
        let device = context.device().clone();

        let buffer_info = vk::BufferCreateInfo::builder()
            .size(size)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer = unsafe { device.create_buffer(&buffer_info, None).map_err(VulkanError::Api)? };

        let requirements = unsafe { device.get_buffer_memory_requirements(buffer) };
        let memory = context
            .find_memory_type(requirements.memory_type_bits, properties)
            .and_then(|memory_type_index| {
                let alloc_info = vk::MemoryAllocateInfo::builder()
                    .allocation_size(requirements.size)
                    .memory_type_index(memory_type_index);
                unsafe { device.allocate_memory(&alloc_info, None).map_err(VulkanError::Api) }
            })
            .and_then(|memory| match unsafe { device.bind_buffer_memory(buffer, memory, 0) } {
                Ok(()) => Ok(memory),
                Err(e) => {
                    unsafe { device.free_memory(memory, None) };
                    Err(VulkanError::Api(e))
                }
            });

        let memory = match memory {
            Ok(memory) => memory,
            Err(e) => {
                unsafe { device.destroy_buffer(buffer, None) };
                return Err(e);
            }
        };

        Ok(Self {
            device,
            buffer,
            memory,
            size,
            properties,
            mapped: None,
        })
    }

    /// Map the whole buffer until [`unmap`](Self::unmap) or drop
    pub fn map(&mut self) -> VulkanResult<()> {
        if self.mapped.is_some() {
            return Ok(());
        }
        if !self.properties.contains(vk::MemoryPropertyFlags::HOST_VISIBLE) {
            return Err(VulkanError::InvalidOperation {
                reason: "buffer memory is not host visible".to_string(),
            });
        }
        let ptr = unsafe {
            self.device
                .map_memory(self.memory, 0, vk::WHOLE_SIZE, vk::MemoryMapFlags::empty())
                .map_err(VulkanError::Api)?
        };
        self.mapped = Some(ptr);
        Ok(())
    }

    /// Release the mapping
    pub fn unmap(&mut self) {
        if self.mapped.take().is_some() {
            unsafe { self.device.unmap_memory(self.memory) };
        }
    }

    /// Copy `bytes` to the start of the mapped buffer
    pub fn write_bytes(&mut self, bytes: &[u8]) -> VulkanResult<()> {
        let ptr = self.mapped.ok_or_else(|| VulkanError::InvalidOperation {
            reason: "buffer is not mapped".to_string(),
        })?;
        if bytes.len() as vk::DeviceSize > self.size {
            return Err(VulkanError::InvalidOperation {
                reason: format!("write of {} bytes into a {} byte buffer", bytes.len(), self.size),
            });
        }
        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr.cast::<u8>(), bytes.len());
        }
        Ok(())
    }

    /// Make host writes visible to the device; a no-op for coherent memory
    pub fn flush(&self) -> VulkanResult<()> {
        if self.mapped.is_none() || self.properties.contains(vk::MemoryPropertyFlags::HOST_COHERENT) {
            return Ok(());
        }
        let range = vk::MappedMemoryRange::builder()
            .memory(self.memory)
            .offset(0)
            .size(vk::WHOLE_SIZE)
            .build();
        unsafe { self.device.flush_mapped_memory_ranges(&[range]).map_err(VulkanError::Api) }
    }

    /// Create a host-visible buffer holding `bytes`
    pub fn with_data(context: &VulkanContext, bytes: &[u8], usage: vk::BufferUsageFlags) -> VulkanResult<Self> {
        let mut buffer = Self::new(
            context,
            bytes.len() as vk::DeviceSize,
            usage,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        )?;
        buffer.map()?;
        buffer.write_bytes(bytes)?;
        buffer.unmap();
        Ok(buffer)
    }

    /// Get the buffer handle
    pub fn handle(&self) -> vk::Buffer {
        self.buffer
    }

    /// Size requested at creation
    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        self.unmap();
        unsafe {
            self.device.destroy_buffer(self.buffer, None);
            self.device.free_memory(self.memory, None);
        }
    }
}
