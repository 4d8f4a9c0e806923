//! Shader modules and graphics pipelines

use std::ffi::CStr;
use std::path::Path;

use ash::{vk, Device};

use super::vertex_layout::VulkanVertexLayout;
use super::{VulkanError, VulkanResult};

const ENTRY_POINT: &[u8] = b"main\0";

/// SPIR-V shader module with RAII cleanup
pub struct ShaderModule {
    device: Device,
    module: vk::ShaderModule,
}

impl ShaderModule {
    /// Create a module from SPIR-V bytes
    pub fn from_bytes(device: Device, bytes: &[u8]) -> VulkanResult<Self> {
        let code = ash::util::read_spv(&mut std::io::Cursor::new(bytes))
            .map_err(|e| VulkanError::InitializationFailed(format!("Invalid SPIR-V: {e}")))?;

        let create_info = vk::ShaderModuleCreateInfo::builder().code(&code);

        let module = unsafe { device.create_shader_module(&create_info, None).map_err(VulkanError::Api)? };

        Ok(Self { device, module })
    }

    /// Load a compiled `.spv` file
    pub fn from_file(device: Device, path: impl AsRef<Path>) -> VulkanResult<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| {
            VulkanError::InitializationFailed(format!("Failed to read shader {}: {e}", path.display()))
        })?;
        Self::from_bytes(device, &bytes)
    }

    /// Get the module handle
    pub fn handle(&self) -> vk::ShaderModule {
        self.module
    }
}

impl Drop for ShaderModule {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_shader_module(self.module, None);
        }
    }
}

/// Fixed-function choices that differ between the engine's pipelines
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Bind the engine vertex layout; `false` for vertex-less draws
    pub use_vertex_input: bool,
    /// Standard alpha blending on the color attachment
    pub alpha_blending: bool,
    /// Write depth
    pub depth_write: bool,
    /// Cull mode
    pub cull_mode: vk::CullModeFlags,
    /// Push constant ranges
    pub push_constant_ranges: Vec<vk::PushConstantRange>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            use_vertex_input: true,
            alpha_blending: false,
            depth_write: true,
            cull_mode: vk::CullModeFlags::NONE,
            push_constant_ranges: Vec::new(),
        }
    }
}

impl PipelineConfig {
    /// Enable alpha blending
    pub fn with_alpha_blending(mut self) -> Self {
        self.alpha_blending = true;
        self
    }

    /// Draw without vertex buffers
    pub fn without_vertex_input(mut self) -> Self {
        self.use_vertex_input = false;
        self
    }

    /// Add a push constant range of `size` bytes visible to `stages`
    pub fn with_push_constants(mut self, stages: vk::ShaderStageFlags, size: u32) -> Self {
        self.push_constant_ranges.push(vk::PushConstantRange {
            stage_flags: stages,
            offset: 0,
            size,
        });
        self
    }
}

/// Graphics pipeline and its layout
///
/// Viewport and scissor are dynamic, so pipelines survive swapchain rebuilds.
pub struct GraphicsPipeline {
    device: Device,
    pipeline: vk::Pipeline,
    layout: vk::PipelineLayout,
}

impl GraphicsPipeline {
    /// Build a pipeline from compiled vertex and fragment shaders
    pub fn new(
        device: Device,
        render_pass: vk::RenderPass,
        vertex_shader: &ShaderModule,
        fragment_shader: &ShaderModule,
        set_layouts: &[vk::DescriptorSetLayout],
        config: &PipelineConfig,
    ) -> VulkanResult<Self> {
        let entry = CStr::from_bytes_with_nul(ENTRY_POINT)
            .map_err(|e| VulkanError::InitializationFailed(format!("Invalid entry point: {e}")))?;

        let shader_stages = [
            vk::PipelineShaderStageCreateInfo::builder()
                .stage(vk::ShaderStageFlags::VERTEX)
                .module(vertex_shader.handle())
                .name(entry)
                .build(),
            vk::PipelineShaderStageCreateInfo::builder()
                .stage(vk::ShaderStageFlags::FRAGMENT)
                .module(fragment_shader.handle())
                .name(entry)
                .build(),
        ];

        let bindings = [VulkanVertexLayout::binding_description()];
        let attributes = VulkanVertexLayout::attribute_descriptions();
        let vertex_input = if config.use_vertex_input {
            vk::PipelineVertexInputStateCreateInfo::builder()
                .vertex_binding_descriptions(&bindings)
                .vertex_attribute_descriptions(&attributes)
                .build()
        } else {
            vk::PipelineVertexInputStateCreateInfo::default()
        };

        let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::builder()
            .topology(vk::PrimitiveTopology::TRIANGLE_LIST)
            .primitive_restart_enable(false);

        let viewport_state = vk::PipelineViewportStateCreateInfo::builder()
            .viewport_count(1)
            .scissor_count(1);

        let rasterizer = vk::PipelineRasterizationStateCreateInfo::builder()
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(vk::PolygonMode::FILL)
            .line_width(1.0)
            .cull_mode(config.cull_mode)
            .front_face(vk::FrontFace::CLOCKWISE)
            .depth_bias_enable(false);

        let multisampling = vk::PipelineMultisampleStateCreateInfo::builder()
            .sample_shading_enable(false)
            .rasterization_samples(vk::SampleCountFlags::TYPE_1);

        let depth_stencil = vk::PipelineDepthStencilStateCreateInfo::builder()
            .depth_test_enable(true)
            .depth_write_enable(config.depth_write)
            .depth_compare_op(vk::CompareOp::LESS)
            .depth_bounds_test_enable(false)
            .stencil_test_enable(false);

        let color_blend_attachment = if config.alpha_blending {
            vk::PipelineColorBlendAttachmentState::builder()
                .color_write_mask(vk::ColorComponentFlags::RGBA)
                .blend_enable(true)
                .src_color_blend_factor(vk::BlendFactor::SRC_ALPHA)
                .dst_color_blend_factor(vk::BlendFactor::ONE_MINUS_SRC_ALPHA)
                .color_blend_op(vk::BlendOp::ADD)
                .src_alpha_blend_factor(vk::BlendFactor::ONE)
                .dst_alpha_blend_factor(vk::BlendFactor::ZERO)
                .alpha_blend_op(vk::BlendOp::ADD)
                .build()
        } else {
            vk::PipelineColorBlendAttachmentState::builder()
                .color_write_mask(vk::ColorComponentFlags::RGBA)
                .blend_enable(false)
                .build()
        };

        let color_blend_attachments = [color_blend_attachment];
        let color_blending = vk::PipelineColorBlendStateCreateInfo::builder()
            .logic_op_enable(false)
            .attachments(&color_blend_attachments);

        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state = vk::PipelineDynamicStateCreateInfo::builder().dynamic_states(&dynamic_states);

        let layout_info = vk::PipelineLayoutCreateInfo::builder()
            .set_layouts(set_layouts)
            .push_constant_ranges(&config.push_constant_ranges);
        let layout = unsafe { device.create_pipeline_layout(&layout_info, None).map_err(VulkanError::Api)? };

        let pipeline_info = vk::GraphicsPipelineCreateInfo::builder()
            .stages(&shader_stages)
            .vertex_input_state(&vertex_input)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterizer)
            .multisample_state(&multisampling)
            .depth_stencil_state(&depth_stencil)
            .color_blend_state(&color_blending)
            .dynamic_state(&dynamic_state)
            .layout(layout)
            .render_pass(render_pass)
            .subpass(0);

        let pipelines = unsafe {
            device.create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_info.build()], None)
        };

        let pipeline = match pipelines {
            Ok(pipelines) => pipelines.first().copied(),
            Err((_, err)) => {
                unsafe { device.destroy_pipeline_layout(layout, None) };
                return Err(VulkanError::Api(err));
            }
        };
        let Some(pipeline) = pipeline else {
            unsafe { device.destroy_pipeline_layout(layout, None) };
            return Err(VulkanError::InitializationFailed("Driver returned no pipeline".to_string()));
        };

        Ok(Self {
            device,
            pipeline,
            layout,
        })
    }

    /// Load `<shader_dir>/<vert>.spv` and `<shader_dir>/<frag>.spv` and build a pipeline
    pub fn from_files(
        device: Device,
        render_pass: vk::RenderPass,
        shader_dir: &Path,
        vertex: &str,
        fragment: &str,
        set_layouts: &[vk::DescriptorSetLayout],
        config: &PipelineConfig,
    ) -> VulkanResult<Self> {
        let vertex_shader = ShaderModule::from_file(device.clone(), shader_dir.join(format!("{vertex}.spv")))?;
        let fragment_shader = ShaderModule::from_file(device.clone(), shader_dir.join(format!("{fragment}.spv")))?;
        Self::new(device, render_pass, &vertex_shader, &fragment_shader, set_layouts, config)
    }

    /// Bind the pipeline on `command_buffer`
    pub fn bind(&self, command_buffer: vk::CommandBuffer) {
        unsafe {
            self.device
                .cmd_bind_pipeline(command_buffer, vk::PipelineBindPoint::GRAPHICS, self.pipeline);
        }
    }

    /// Get the pipeline handle
    pub fn handle(&self) -> vk::Pipeline {
        self.pipeline
    }

    /// Get the pipeline layout
    pub fn layout(&self) -> vk::PipelineLayout {
        self.layout
    }
}

impl Drop for GraphicsPipeline {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_pipeline(self.pipeline, None);
            self.device.destroy_pipeline_layout(self.layout, None);
        }
    }
}
