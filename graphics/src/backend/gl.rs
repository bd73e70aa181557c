//! OpenGL backend using glow.
//!
//! # Safety
//!
//! A [`GlBackend`] must only be used while its context is current on the
//! calling thread. The backend is `!Send` so it cannot leave the thread it
//! was created on.

use std::marker::PhantomData;
use std::ptr::NonNull;

use glow::HasContext;

use crate::capabilities::{ApiVersion, CapabilitySet};
use crate::error::GraphicsError;
use crate::mesh::{ComponentType, VertexAttribute};
use crate::resources::MappedBuffer;
use crate::types::{BufferData, BufferDescriptor, BufferUsage, IndexFormat, PrimitiveTopology};

use super::{FenceStatus, GpuBackend, GpuBuffer, GpuFence, GpuProgram, GpuVertexArray};

/// Wait slice for blocking fence waits, in nanoseconds.
const FENCE_WAIT_SLICE_NS: i32 = 100_000_000;

/// OpenGL backend.
pub struct GlBackend {
    gl: glow::Context,
    capabilities: CapabilitySet,
    _not_send: PhantomData<*const ()>,
}

impl GlBackend {
    /// Wrap a glow context and snapshot its capabilities.
    ///
    /// # Safety
    ///
    /// The context must be current on this thread for the whole lifetime of
    /// the backend.
    pub unsafe fn new(gl: glow::Context) -> Self {
        let version = gl.version();
        let capabilities = CapabilitySet::new(
            ApiVersion::new(version.major, version.minor),
            gl.supported_extensions().iter().cloned(),
        );
        log::info!(
            "OpenGL backend: {}.{} {} ({} extensions)",
            version.major,
            version.minor,
            version.vendor_info,
            gl.supported_extensions().len()
        );
        Self {
            gl,
            capabilities,
            _not_send: PhantomData,
        }
    }

    /// Get the glow context.
    pub fn context(&self) -> &glow::Context {
        &self.gl
    }
}

impl std::fmt::Debug for GlBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlBackend")
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Conversions
// ============================================================================

fn gl_buffer(buffer: &GpuBuffer) -> Option<glow::NativeBuffer> {
    match buffer {
        GpuBuffer::Gl(raw) => Some(*raw),
        _ => None,
    }
}

fn gl_vertex_array(vertex_array: &GpuVertexArray) -> Option<glow::NativeVertexArray> {
    match vertex_array {
        GpuVertexArray::Gl(raw) => Some(*raw),
        _ => None,
    }
}

fn gl_program(program: &GpuProgram) -> Option<glow::NativeProgram> {
    match program {
        GpuProgram::Gl(raw) => Some(*raw),
        _ => None,
    }
}

fn gl_fence(fence: &GpuFence) -> Option<glow::NativeFence> {
    match fence {
        GpuFence::Gl(raw) => Some(*raw),
        _ => None,
    }
}

fn foreign(kind: &str, handle: &dyn std::fmt::Debug) -> GraphicsError {
    GraphicsError::InvalidParameter(format!("{kind} {handle:?} does not belong to OpenGL"))
}

fn gl_size(value: u64) -> Result<i32, GraphicsError> {
    i32::try_from(value)
        .map_err(|_| GraphicsError::InvalidParameter(format!("{value} exceeds the GL size range")))
}

fn gl_usage(usage: BufferUsage) -> u32 {
    if usage.contains(BufferUsage::STREAM) {
        glow::STREAM_DRAW
    } else if usage.contains(BufferUsage::STATIC) {
        glow::STATIC_DRAW
    } else {
        glow::DYNAMIC_DRAW
    }
}

fn gl_topology(topology: PrimitiveTopology) -> u32 {
    match topology {
        PrimitiveTopology::PointList => glow::POINTS,
        PrimitiveTopology::LineList => glow::LINES,
        PrimitiveTopology::LineStrip => glow::LINE_STRIP,
        PrimitiveTopology::TriangleList => glow::TRIANGLES,
        PrimitiveTopology::TriangleStrip => glow::TRIANGLE_STRIP,
    }
}

fn gl_index_type(format: IndexFormat) -> u32 {
    match format {
        IndexFormat::Uint16 => glow::UNSIGNED_SHORT,
        IndexFormat::Uint32 => glow::UNSIGNED_INT,
    }
}

// ============================================================================
// GpuBackend
// ============================================================================

// SAFETY (all unsafe blocks below): the context is current on this thread,
// per the contract of `GlBackend::new`, and every handle passed to GL was
// created by this context.
impl GpuBackend for GlBackend {
    fn name(&self) -> &'static str {
        "OpenGL"
    }

    fn capabilities(&self) -> CapabilitySet {
        self.capabilities.clone()
    }

    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<GpuBuffer, GraphicsError> {
        let size = gl_size(descriptor.size)?;
        unsafe {
            let buffer = self
                .gl
                .create_buffer()
                .map_err(GraphicsError::ResourceCreationFailed)?;
            self.gl.bind_buffer(glow::ARRAY_BUFFER, Some(buffer));
            if descriptor.is_persistent() {
                let flags =
                    glow::MAP_WRITE_BIT | glow::MAP_PERSISTENT_BIT | glow::MAP_COHERENT_BIT;
                self.gl
                    .buffer_storage(glow::ARRAY_BUFFER, size, None, flags);
            } else {
                self.gl
                    .buffer_data_size(glow::ARRAY_BUFFER, size, gl_usage(descriptor.usage));
            }
            self.gl.bind_buffer(glow::ARRAY_BUFFER, None);
            Ok(GpuBuffer::Gl(buffer))
        }
    }

    fn destroy_buffer(&self, buffer: &GpuBuffer) {
        if let Some(raw) = gl_buffer(buffer) {
            unsafe { self.gl.delete_buffer(raw) };
        }
    }

    fn buffer_data(
        &self,
        buffer: &GpuBuffer,
        data: BufferData<'_>,
        usage: BufferUsage,
    ) -> Result<(), GraphicsError> {
        let raw = gl_buffer(buffer).ok_or_else(|| foreign("buffer", buffer))?;
        let usage = gl_usage(usage);
        unsafe {
            self.gl.bind_buffer(glow::ARRAY_BUFFER, Some(raw));
            match data {
                BufferData::Uninit(size) => {
                    self.gl
                        .buffer_data_size(glow::ARRAY_BUFFER, gl_size(size)?, usage)
                }
                BufferData::Bytes(bytes) => {
                    self.gl
                        .buffer_data_u8_slice(glow::ARRAY_BUFFER, bytes, usage)
                }
            }
        }
        Ok(())
    }

    fn buffer_sub_data(
        &self,
        buffer: &GpuBuffer,
        offset: u64,
        data: &[u8],
    ) -> Result<(), GraphicsError> {
        let raw = gl_buffer(buffer).ok_or_else(|| foreign("buffer", buffer))?;
        let offset = gl_size(offset)?;
        unsafe {
            self.gl.bind_buffer(glow::ARRAY_BUFFER, Some(raw));
            self.gl
                .buffer_sub_data_u8_slice(glow::ARRAY_BUFFER, offset, data);
        }
        Ok(())
    }

    fn map_persistent(&self, buffer: &GpuBuffer) -> Result<MappedBuffer, GraphicsError> {
        let raw = gl_buffer(buffer).ok_or_else(|| foreign("buffer", buffer))?;
        unsafe {
            self.gl.bind_buffer(glow::ARRAY_BUFFER, Some(raw));
            let size = self
                .gl
                .get_buffer_parameter_i32(glow::ARRAY_BUFFER, glow::BUFFER_SIZE);
            let access = glow::MAP_WRITE_BIT | glow::MAP_PERSISTENT_BIT | glow::MAP_COHERENT_BIT;
            let ptr = self
                .gl
                .map_buffer_range(glow::ARRAY_BUFFER, 0, size, access);
            let ptr = NonNull::new(ptr).ok_or_else(|| {
                GraphicsError::MapFailed(format!(
                    "glMapBufferRange returned null (error 0x{:x})",
                    self.gl.get_error()
                ))
            })?;
            let len = usize::try_from(size)
                .map_err(|_| GraphicsError::MapFailed(format!("invalid buffer size {size}")))?;
            Ok(MappedBuffer::from_raw(ptr, len))
        }
    }

    fn unmap(&self, buffer: &GpuBuffer) {
        if let Some(raw) = gl_buffer(buffer) {
            unsafe {
                self.gl.bind_buffer(glow::ARRAY_BUFFER, Some(raw));
                self.gl.unmap_buffer(glow::ARRAY_BUFFER);
            }
        }
    }

    fn create_vertex_array(&self) -> Result<GpuVertexArray, GraphicsError> {
        unsafe {
            self.gl
                .create_vertex_array()
                .map(GpuVertexArray::Gl)
                .map_err(GraphicsError::ResourceCreationFailed)
        }
    }

    fn destroy_vertex_array(&self, vertex_array: &GpuVertexArray) {
        if let Some(raw) = gl_vertex_array(vertex_array) {
            unsafe { self.gl.delete_vertex_array(raw) };
        }
    }

    fn bind_vertex_array(&self, vertex_array: Option<&GpuVertexArray>) {
        unsafe {
            self.gl
                .bind_vertex_array(vertex_array.and_then(gl_vertex_array))
        };
    }

    fn bind_vertex_buffer(&self, buffer: Option<&GpuBuffer>) {
        unsafe {
            self.gl
                .bind_buffer(glow::ARRAY_BUFFER, buffer.and_then(gl_buffer))
        };
    }

    fn bind_index_buffer(&self, buffer: Option<&GpuBuffer>) {
        unsafe {
            self.gl
                .bind_buffer(glow::ELEMENT_ARRAY_BUFFER, buffer.and_then(gl_buffer))
        };
    }

    fn attribute_location(&self, program: &GpuProgram, name: &str) -> Option<u32> {
        let raw = gl_program(program)?;
        unsafe { self.gl.get_attrib_location(raw, name) }
    }

    fn enable_vertex_attribute(&self, location: u32, attribute: &VertexAttribute, stride: u32) {
        let (Ok(stride), Ok(offset)) = (i32::try_from(stride), i32::try_from(attribute.offset))
        else {
            log::warn!("Vertex attribute {location} is outside the GL offset range");
            return;
        };
        let size = attribute.format.component_count() as i32;
        unsafe {
            self.gl.enable_vertex_attrib_array(location);
            match attribute.format.component_type() {
                ComponentType::Float => self.gl.vertex_attrib_pointer_f32(
                    location,
                    size,
                    glow::FLOAT,
                    false,
                    stride,
                    offset,
                ),
                ComponentType::Unorm8 => self.gl.vertex_attrib_pointer_f32(
                    location,
                    size,
                    glow::UNSIGNED_BYTE,
                    true,
                    stride,
                    offset,
                ),
                ComponentType::Snorm8 => self.gl.vertex_attrib_pointer_f32(
                    location,
                    size,
                    glow::BYTE,
                    true,
                    stride,
                    offset,
                ),
                ComponentType::Int => {
                    self.gl
                        .vertex_attrib_pointer_i32(location, size, glow::INT, stride, offset)
                }
                ComponentType::Uint => self.gl.vertex_attrib_pointer_i32(
                    location,
                    size,
                    glow::UNSIGNED_INT,
                    stride,
                    offset,
                ),
            }
        }
    }

    fn disable_vertex_attribute(&self, location: u32) {
        unsafe { self.gl.disable_vertex_attrib_array(location) };
    }

    fn draw_arrays(&self, topology: PrimitiveTopology, first_vertex: u32, vertex_count: u32) {
        let (Ok(first), Ok(count)) = (i32::try_from(first_vertex), i32::try_from(vertex_count))
        else {
            log::warn!("Draw of {vertex_count} vertices from {first_vertex} exceeds the GL range");
            return;
        };
        unsafe { self.gl.draw_arrays(gl_topology(topology), first, count) };
    }

    fn draw_indexed(
        &self,
        topology: PrimitiveTopology,
        index_count: u32,
        format: IndexFormat,
        byte_offset: u64,
        base_vertex: u32,
    ) {
        let (Ok(count), Ok(offset), Ok(base)) = (
            i32::try_from(index_count),
            i32::try_from(byte_offset),
            i32::try_from(base_vertex),
        ) else {
            log::warn!("Indexed draw of {index_count} indices exceeds the GL range");
            return;
        };
        let mode = gl_topology(topology);
        let index_type = gl_index_type(format);
        unsafe {
            if base == 0 {
                self.gl.draw_elements(mode, count, index_type, offset);
            } else {
                self.gl
                    .draw_elements_base_vertex(mode, count, index_type, offset, base);
            }
        }
    }

    fn insert_fence(&self) -> Result<GpuFence, GraphicsError> {
        unsafe {
            self.gl
                .fence_sync(glow::SYNC_GPU_COMMANDS_COMPLETE, 0)
                .map(GpuFence::Gl)
                .map_err(GraphicsError::ResourceCreationFailed)
        }
    }

    fn poll_fence(&self, fence: &GpuFence) -> Result<FenceStatus, GraphicsError> {
        let raw = gl_fence(fence).ok_or_else(|| foreign("fence", fence))?;
        match unsafe { self.gl.client_wait_sync(raw, 0, 0) } {
            glow::ALREADY_SIGNALED | glow::CONDITION_SATISFIED => Ok(FenceStatus::Signaled),
            glow::TIMEOUT_EXPIRED => Ok(FenceStatus::Unsignaled),
            status => Err(GraphicsError::FenceWaitFailed(format!(
                "glClientWaitSync returned 0x{status:x}"
            ))),
        }
    }

    fn wait_fence(&self, fence: &GpuFence) -> Result<(), GraphicsError> {
        let raw = gl_fence(fence).ok_or_else(|| foreign("fence", fence))?;
        loop {
            let status = unsafe {
                self.gl
                    .client_wait_sync(raw, glow::SYNC_FLUSH_COMMANDS_BIT, FENCE_WAIT_SLICE_NS)
            };
            match status {
                glow::ALREADY_SIGNALED | glow::CONDITION_SATISFIED => return Ok(()),
                glow::TIMEOUT_EXPIRED => continue,
                status => {
                    return Err(GraphicsError::FenceWaitFailed(format!(
                        "glClientWaitSync returned 0x{status:x}"
                    )));
                }
            }
        }
    }

    fn delete_fence(&self, fence: GpuFence) {
        if let Some(raw) = gl_fence(&fence) {
            unsafe { self.gl.delete_sync(raw) };
        }
    }
}
