//! Dummy GPU backend for testing and development.
//!
//! This backend doesn't talk to a driver. It simulates the parts of a GPU the
//! streaming layer depends on, so strategies can be tested without hardware:
//!
//! - Buffer stores live in host memory. Respecifying a store orphans it: draws
//!   already submitted keep the old store alive and read from it.
//! - Persistent buffers can be mapped; writes through the mapping bypass the
//!   simulated driver exactly like coherent mappings do.
//! - Draws are queued and execute lazily, when a later fence is signaled.
//!   Each draw snapshots the bytes it will read at submission; if those bytes
//!   changed before the draw executed, the CPU overwrote data the GPU had not
//!   consumed yet and a *hazard* is counted.
//! - Blocking on an unsignaled fence counts a stall and completes the GPU work
//!   up to that fence.
//!
//! With [`GpuCompletion::Immediate`] (the default) every draw executes at
//! submission and fences are created signaled. With [`GpuCompletion::Manual`]
//! the GPU only progresses when the caller waits on a fence or drives it with
//! [`DummyBackend::advance`] / [`DummyBackend::complete_all`].

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::ops::Range;
use std::ptr::NonNull;
use std::rc::Rc;

use crate::capabilities::{ApiVersion, CapabilitySet};
use crate::error::GraphicsError;
use crate::mesh::VertexAttribute;
use crate::resources::MappedBuffer;
use crate::types::{BufferData, BufferDescriptor, BufferUsage, IndexFormat, PrimitiveTopology};

use super::{FenceStatus, GpuBackend, GpuBuffer, GpuFence, GpuProgram, GpuVertexArray};

type Storage = Rc<[Cell<u8>]>;

fn new_storage(size: usize) -> Storage {
    (0..size).map(|_| Cell::new(0)).collect()
}

fn read_storage(storage: &Storage, range: Range<usize>) -> Vec<u8> {
    storage[range].iter().map(Cell::get).collect()
}

/// When the simulated GPU executes submitted work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GpuCompletion {
    /// Draws execute at submission and fences are born signaled.
    #[default]
    Immediate,
    /// Draws execute only when a fence covering them is signaled.
    Manual,
}

/// Backend operation that can be made to fail once, for error-path tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DummyFailure {
    /// The next `create_buffer` fails.
    CreateBuffer,
    /// The next `create_vertex_array` fails.
    CreateVertexArray,
    /// The next `map_persistent` fails.
    MapBuffer,
    /// The next `wait_fence` reports a driver error.
    FenceWait,
}

/// Counters reported by [`DummyBackend::stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DummyStats {
    /// Draw calls submitted.
    pub draw_calls: u64,
    /// Draw calls that executed on the simulated GPU.
    pub executed_draws: u64,
    /// Blocking waits on fences that were not signaled yet.
    pub fence_waits: u64,
    /// Executed draws whose input bytes changed after submission.
    pub hazards: u64,
    /// `buffer_sub_data` calls that had to drain pending draws first.
    pub implicit_syncs: u64,
    /// `enable_vertex_attribute` calls.
    pub attribute_wirings: u64,
    /// `buffer_data` calls (store respecifications).
    pub buffer_data_calls: u64,
    /// `buffer_sub_data` calls.
    pub buffer_sub_data_calls: u64,
    /// Draws that would have read outside their buffer.
    pub invalid_draws: u64,
    /// Buffer objects alive.
    pub live_buffers: usize,
    /// Vertex array objects alive.
    pub live_vertex_arrays: usize,
    /// Fences alive.
    pub live_fences: usize,
    /// Buffers currently mapped.
    pub mapped_buffers: usize,
}

/// A draw as it was executed by the simulated GPU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutedDraw {
    /// Vertex buffer the draw read from.
    pub buffer: GpuBuffer,
    /// Primitive topology of the draw.
    pub topology: PrimitiveTopology,
    /// First byte read from the buffer.
    pub first_byte: usize,
    /// Bytes the GPU read when executing.
    pub bytes: Vec<u8>,
}

struct BufferSlot {
    storage: Storage,
    persistent: bool,
    mapped: bool,
}

#[derive(Debug, Clone, Copy)]
struct AttributeBinding {
    buffer: u64,
    offset: u32,
    size: u32,
    stride: u32,
}

#[derive(Default)]
struct InputState {
    index_buffer: Option<u64>,
    attributes: BTreeMap<u32, AttributeBinding>,
}

struct PendingDraw {
    buffer: u64,
    topology: PrimitiveTopology,
    storage: Storage,
    range: Range<usize>,
    snapshot: Vec<u8>,
}

#[derive(Default)]
struct State {
    next_id: u64,
    buffers: HashMap<u64, BufferSlot>,
    // Stores of buffers destroyed while still mapped
    retired: Vec<Storage>,
    vertex_arrays: HashMap<u64, InputState>,
    default_input: InputState,
    current_vertex_array: Option<u64>,
    array_buffer: Option<u64>,
    programs: HashMap<u64, Vec<String>>,
    // Live fences and whether they are signaled
    fences: HashMap<u64, bool>,
    // Unsignaled fences in submission order with the draws they cover
    fence_queue: VecDeque<(u64, Vec<PendingDraw>)>,
    unfenced: Vec<PendingDraw>,
    failures: Vec<DummyFailure>,
    executed: Vec<ExecutedDraw>,
    stats: DummyStats,
}

impl State {
    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn take_failure(&mut self, point: DummyFailure) -> bool {
        match self.failures.iter().position(|f| *f == point) {
            Some(index) => {
                self.failures.remove(index);
                true
            }
            None => false,
        }
    }

    fn input(&self) -> &InputState {
        match self.current_vertex_array {
            Some(id) => self.vertex_arrays.get(&id).unwrap_or(&self.default_input),
            None => &self.default_input,
        }
    }

    fn input_mut(&mut self) -> &mut InputState {
        match self.current_vertex_array {
            Some(id) if self.vertex_arrays.contains_key(&id) => {
                self.vertex_arrays.entry(id).or_default()
            }
            _ => &mut self.default_input,
        }
    }

    fn execute(&mut self, draw: PendingDraw, record: bool) {
        let bytes = read_storage(&draw.storage, draw.range.clone());
        if bytes != draw.snapshot {
            log::warn!(
                "DummyBackend: hazard on buffer {} bytes {:?}: contents changed before the draw executed",
                draw.buffer,
                draw.range
            );
            self.stats.hazards += 1;
        }
        self.stats.executed_draws += 1;
        if record {
            self.executed.push(ExecutedDraw {
                buffer: GpuBuffer::Dummy { id: draw.buffer },
                topology: draw.topology,
                first_byte: draw.range.start,
                bytes,
            });
        }
    }

    /// Signal every queued fence up to and including `fence`.
    fn signal_through(&mut self, fence: u64, record: bool) {
        while let Some((id, draws)) = self.fence_queue.pop_front() {
            for draw in draws {
                self.execute(draw, record);
            }
            if let Some(signaled) = self.fences.get_mut(&id) {
                *signaled = true;
            }
            if id == fence {
                break;
            }
        }
    }

    fn complete_all(&mut self, record: bool) {
        if let Some(&(last, _)) = self.fence_queue.back() {
            self.signal_through(last, record);
        }
        for draw in std::mem::take(&mut self.unfenced) {
            self.execute(draw, record);
        }
    }

    fn has_pending_reads(&self, storage: &Storage, range: &Range<usize>) -> bool {
        self.unfenced
            .iter()
            .chain(self.fence_queue.iter().flat_map(|(_, draws)| draws.iter()))
            .any(|draw| {
                Rc::ptr_eq(&draw.storage, storage)
                    && draw.range.start < range.end
                    && range.start < draw.range.end
            })
    }

    /// Byte range of `buffer` read by vertices `first..first + count`, merged
    /// over all enabled attributes.
    fn vertex_reads(&self, first_vertex: u64, vertex_count: u64) -> Vec<(u64, Range<usize>)> {
        let mut reads: Vec<(u64, Range<usize>)> = Vec::new();
        if vertex_count == 0 {
            return reads;
        }
        for binding in self.input().attributes.values() {
            let stride = u64::from(binding.stride);
            let start = first_vertex * stride + u64::from(binding.offset);
            let end = (first_vertex + vertex_count - 1) * stride
                + u64::from(binding.offset)
                + u64::from(binding.size);
            let (start, end) = (start as usize, end as usize);
            match reads.iter_mut().find(|(buffer, _)| *buffer == binding.buffer) {
                Some((_, range)) => {
                    range.start = range.start.min(start);
                    range.end = range.end.max(end);
                }
                None => reads.push((binding.buffer, start..end)),
            }
        }
        reads
    }

    fn submit_draw(
        &mut self,
        topology: PrimitiveTopology,
        reads: Vec<(u64, Range<usize>)>,
        completion: GpuCompletion,
        record: bool,
    ) {
        self.stats.draw_calls += 1;
        for (buffer, range) in reads {
            let Some(slot) = self.buffers.get(&buffer) else {
                log::warn!("DummyBackend: draw reads destroyed buffer {buffer}");
                self.stats.invalid_draws += 1;
                continue;
            };
            if range.end > slot.storage.len() {
                log::warn!(
                    "DummyBackend: draw reads bytes {:?} of buffer {} with {} bytes",
                    range,
                    buffer,
                    slot.storage.len()
                );
                self.stats.invalid_draws += 1;
                continue;
            }
            let draw = PendingDraw {
                buffer,
                topology,
                storage: Rc::clone(&slot.storage),
                snapshot: read_storage(&slot.storage, range.clone()),
                range,
            };
            match completion {
                GpuCompletion::Immediate => self.execute(draw, record),
                GpuCompletion::Manual => self.unfenced.push(draw),
            }
        }
    }
}

/// Dummy GPU backend.
pub struct DummyBackend {
    capabilities: CapabilitySet,
    completion: GpuCompletion,
    record_draws: bool,
    state: RefCell<State>,
}

impl DummyBackend {
    /// Create a new dummy backend reporting a 4.6 context.
    pub fn new() -> Self {
        Self {
            capabilities: CapabilitySet::new(ApiVersion::new(4, 6), Vec::<String>::new()),
            completion: GpuCompletion::default(),
            record_draws: false,
            state: RefCell::new(State::default()),
        }
    }

    /// Report a different context version and extension set.
    pub fn with_capabilities(mut self, capabilities: CapabilitySet) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Set when the simulated GPU executes submitted work.
    pub fn with_completion(mut self, completion: GpuCompletion) -> Self {
        self.completion = completion;
        self
    }

    /// Keep a copy of the bytes every executed draw read.
    ///
    /// See [`take_executed_draws`](Self::take_executed_draws).
    pub fn with_draw_recording(mut self) -> Self {
        self.record_draws = true;
        self
    }

    /// Create a program exposing the given vertex inputs.
    ///
    /// Input `i` is assigned attribute location `i`.
    pub fn create_program(&self, inputs: &[&str]) -> GpuProgram {
        let mut state = self.state.borrow_mut();
        let id = state.allocate_id();
        state
            .programs
            .insert(id, inputs.iter().map(|name| name.to_string()).collect());
        GpuProgram::Dummy { id }
    }

    /// Make the next call of `point` fail.
    pub fn inject_failure(&self, point: DummyFailure) {
        self.state.borrow_mut().failures.push(point);
    }

    /// Signal the `count` oldest unsignaled fences.
    pub fn advance(&self, count: usize) {
        let mut state = self.state.borrow_mut();
        for _ in 0..count {
            let Some(&(oldest, _)) = state.fence_queue.front() else {
                break;
            };
            state.signal_through(oldest, self.record_draws);
        }
    }

    /// Execute all submitted work and signal every fence.
    pub fn complete_all(&self) {
        self.state.borrow_mut().complete_all(self.record_draws);
    }

    /// Number of submitted draws that have not executed yet.
    pub fn pending_draw_count(&self) -> usize {
        let state = self.state.borrow();
        state.unfenced.len()
            + state
                .fence_queue
                .iter()
                .map(|(_, draws)| draws.len())
                .sum::<usize>()
    }

    /// Drain the draws recorded since the last call.
    pub fn take_executed_draws(&self) -> Vec<ExecutedDraw> {
        std::mem::take(&mut self.state.borrow_mut().executed)
    }

    /// Read the current store of a buffer.
    pub fn buffer_contents(&self, buffer: &GpuBuffer) -> Option<Vec<u8>> {
        let state = self.state.borrow();
        let slot = state.buffers.get(&buffer_id(buffer)?)?;
        Some(read_storage(&slot.storage, 0..slot.storage.len()))
    }

    /// Get the current counters.
    pub fn stats(&self) -> DummyStats {
        let state = self.state.borrow();
        DummyStats {
            live_buffers: state.buffers.len(),
            live_vertex_arrays: state.vertex_arrays.len(),
            live_fences: state.fences.len(),
            mapped_buffers: state.buffers.values().filter(|slot| slot.mapped).count(),
            ..state.stats
        }
    }
}

impl Default for DummyBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DummyBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DummyBackend")
            .field("capabilities", &self.capabilities)
            .field("completion", &self.completion)
            .field("stats", &self.stats())
            .finish()
    }
}

fn buffer_id(buffer: &GpuBuffer) -> Option<u64> {
    match buffer {
        GpuBuffer::Dummy { id } => Some(*id),
        #[cfg(feature = "gl-backend")]
        _ => None,
    }
}

fn vertex_array_id(vertex_array: &GpuVertexArray) -> Option<u64> {
    match vertex_array {
        GpuVertexArray::Dummy { id } => Some(*id),
        #[cfg(feature = "gl-backend")]
        _ => None,
    }
}

fn program_id(program: &GpuProgram) -> Option<u64> {
    match program {
        GpuProgram::Dummy { id } => Some(*id),
        #[cfg(feature = "gl-backend")]
        _ => None,
    }
}

fn fence_id(fence: &GpuFence) -> Option<u64> {
    match fence {
        GpuFence::Dummy { id } => Some(*id),
        #[cfg(feature = "gl-backend")]
        _ => None,
    }
}

fn unknown(kind: &str, handle: &dyn std::fmt::Debug) -> GraphicsError {
    GraphicsError::InvalidParameter(format!("unknown {kind} {handle:?}"))
}

impl GpuBackend for DummyBackend {
    fn name(&self) -> &'static str {
        "Dummy Backend"
    }

    fn capabilities(&self) -> CapabilitySet {
        self.capabilities.clone()
    }

    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<GpuBuffer, GraphicsError> {
        let mut state = self.state.borrow_mut();
        if state.take_failure(DummyFailure::CreateBuffer) {
            return Err(GraphicsError::ResourceCreationFailed(format!(
                "injected failure creating buffer {:?}",
                descriptor.label
            )));
        }
        let size = usize::try_from(descriptor.size).map_err(|_| {
            GraphicsError::ResourceCreationFailed(format!(
                "buffer size {} exceeds host memory",
                descriptor.size
            ))
        })?;

        let id = state.allocate_id();
        log::trace!(
            "DummyBackend: creating buffer {} {:?} (size: {})",
            id,
            descriptor.label,
            descriptor.size
        );
        state.buffers.insert(
            id,
            BufferSlot {
                storage: new_storage(size),
                persistent: descriptor.is_persistent(),
                mapped: false,
            },
        );
        Ok(GpuBuffer::Dummy { id })
    }

    fn destroy_buffer(&self, buffer: &GpuBuffer) {
        let Some(id) = buffer_id(buffer) else {
            return;
        };
        let mut state = self.state.borrow_mut();
        match state.buffers.remove(&id) {
            Some(slot) => {
                if slot.mapped {
                    log::warn!("DummyBackend: buffer {id} destroyed while mapped");
                    state.retired.push(slot.storage);
                }
                if state.array_buffer == Some(id) {
                    state.array_buffer = None;
                }
            }
            None => log::warn!("DummyBackend: destroying unknown buffer {id}"),
        }
    }

    fn buffer_data(
        &self,
        buffer: &GpuBuffer,
        data: BufferData<'_>,
        usage: BufferUsage,
    ) -> Result<(), GraphicsError> {
        let id = buffer_id(buffer).ok_or_else(|| unknown("buffer", buffer))?;
        let mut state = self.state.borrow_mut();
        let slot = state
            .buffers
            .get_mut(&id)
            .ok_or_else(|| unknown("buffer", buffer))?;
        if slot.persistent {
            return Err(GraphicsError::InvalidParameter(format!(
                "buffer {id} has immutable storage"
            )));
        }

        log::trace!(
            "DummyBackend: respecifying buffer {} ({} bytes, {:?})",
            id,
            data.size(),
            usage
        );
        slot.storage = match data {
            BufferData::Uninit(size) => new_storage(size as usize),
            BufferData::Bytes(bytes) => bytes.iter().copied().map(Cell::new).collect(),
        };
        state.stats.buffer_data_calls += 1;
        Ok(())
    }

    fn buffer_sub_data(
        &self,
        buffer: &GpuBuffer,
        offset: u64,
        data: &[u8],
    ) -> Result<(), GraphicsError> {
        let id = buffer_id(buffer).ok_or_else(|| unknown("buffer", buffer))?;
        let mut state = self.state.borrow_mut();
        let storage = state
            .buffers
            .get(&id)
            .map(|slot| Rc::clone(&slot.storage))
            .ok_or_else(|| unknown("buffer", buffer))?;

        let start = offset as usize;
        let range = start..start + data.len();
        if range.end > storage.len() {
            return Err(GraphicsError::InvalidParameter(format!(
                "sub-data {:?} exceeds buffer {} of {} bytes",
                range,
                id,
                storage.len()
            )));
        }

        // The driver serializes the upload behind draws still reading it
        if state.has_pending_reads(&storage, &range) {
            log::trace!("DummyBackend: implicit sync on buffer {id}");
            state.stats.implicit_syncs += 1;
            state.complete_all(self.record_draws);
        }

        for (cell, byte) in storage[range].iter().zip(data) {
            cell.set(*byte);
        }
        state.stats.buffer_sub_data_calls += 1;
        Ok(())
    }

    fn map_persistent(&self, buffer: &GpuBuffer) -> Result<MappedBuffer, GraphicsError> {
        let id = buffer_id(buffer).ok_or_else(|| unknown("buffer", buffer))?;
        let mut state = self.state.borrow_mut();
        if state.take_failure(DummyFailure::MapBuffer) {
            return Err(GraphicsError::MapFailed(format!(
                "injected failure mapping buffer {id}"
            )));
        }
        let slot = state
            .buffers
            .get_mut(&id)
            .ok_or_else(|| unknown("buffer", buffer))?;
        if !slot.persistent {
            return Err(GraphicsError::MapFailed(format!(
                "buffer {id} was not created with persistent storage"
            )));
        }
        if slot.mapped {
            return Err(GraphicsError::MapFailed(format!(
                "buffer {id} is already mapped"
            )));
        }

        // Cell<u8> has the same layout as u8 and permits writes through a
        // shared borrow.
        let ptr = NonNull::new(slot.storage.as_ptr() as *mut u8)
            .ok_or_else(|| GraphicsError::MapFailed(format!("buffer {id} has no storage")))?;
        slot.mapped = true;
        // SAFETY: the store stays alive while mapped (destroying a mapped
        // buffer moves it to `retired`), and persistent stores are never
        // respecified.
        Ok(unsafe { MappedBuffer::from_raw(ptr, slot.storage.len()) })
    }

    fn unmap(&self, buffer: &GpuBuffer) {
        let Some(id) = buffer_id(buffer) else {
            return;
        };
        if let Some(slot) = self.state.borrow_mut().buffers.get_mut(&id) {
            slot.mapped = false;
        }
    }

    fn create_vertex_array(&self) -> Result<GpuVertexArray, GraphicsError> {
        let mut state = self.state.borrow_mut();
        if state.take_failure(DummyFailure::CreateVertexArray) {
            return Err(GraphicsError::ResourceCreationFailed(
                "injected failure creating vertex array".to_string(),
            ));
        }
        let id = state.allocate_id();
        state.vertex_arrays.insert(id, InputState::default());
        Ok(GpuVertexArray::Dummy { id })
    }

    fn destroy_vertex_array(&self, vertex_array: &GpuVertexArray) {
        let Some(id) = vertex_array_id(vertex_array) else {
            return;
        };
        let mut state = self.state.borrow_mut();
        state.vertex_arrays.remove(&id);
        if state.current_vertex_array == Some(id) {
            state.current_vertex_array = None;
        }
    }

    fn bind_vertex_array(&self, vertex_array: Option<&GpuVertexArray>) {
        self.state.borrow_mut().current_vertex_array = vertex_array.and_then(vertex_array_id);
    }

    fn bind_vertex_buffer(&self, buffer: Option<&GpuBuffer>) {
        self.state.borrow_mut().array_buffer = buffer.and_then(buffer_id);
    }

    fn bind_index_buffer(&self, buffer: Option<&GpuBuffer>) {
        self.state.borrow_mut().input_mut().index_buffer = buffer.and_then(buffer_id);
    }

    fn attribute_location(&self, program: &GpuProgram, name: &str) -> Option<u32> {
        let state = self.state.borrow();
        let inputs = state.programs.get(&program_id(program)?)?;
        inputs
            .iter()
            .position(|input| input == name)
            .map(|index| index as u32)
    }

    fn enable_vertex_attribute(&self, location: u32, attribute: &VertexAttribute, stride: u32) {
        let mut state = self.state.borrow_mut();
        let Some(buffer) = state.array_buffer else {
            log::warn!("DummyBackend: attribute {location} enabled without a vertex buffer");
            return;
        };
        state.input_mut().attributes.insert(
            location,
            AttributeBinding {
                buffer,
                offset: attribute.offset,
                size: attribute.format.size(),
                stride,
            },
        );
        state.stats.attribute_wirings += 1;
    }

    fn disable_vertex_attribute(&self, location: u32) {
        self.state
            .borrow_mut()
            .input_mut()
            .attributes
            .remove(&location);
    }

    fn draw_arrays(&self, topology: PrimitiveTopology, first_vertex: u32, vertex_count: u32) {
        let mut state = self.state.borrow_mut();
        let reads = state.vertex_reads(u64::from(first_vertex), u64::from(vertex_count));
        state.submit_draw(topology, reads, self.completion, self.record_draws);
    }

    fn draw_indexed(
        &self,
        topology: PrimitiveTopology,
        index_count: u32,
        format: IndexFormat,
        byte_offset: u64,
        base_vertex: u32,
    ) {
        let mut state = self.state.borrow_mut();
        let indices = state
            .input()
            .index_buffer
            .and_then(|id| state.buffers.get(&id))
            .and_then(|slot| {
                let start = byte_offset as usize;
                let end = start + index_count as usize * format.size();
                (end <= slot.storage.len()).then(|| read_storage(&slot.storage, start..end))
            });
        let Some(indices) = indices else {
            log::warn!("DummyBackend: indexed draw without a valid index buffer range");
            state.stats.draw_calls += 1;
            state.stats.invalid_draws += 1;
            return;
        };

        let values: Vec<u64> = match format {
            IndexFormat::Uint16 => indices
                .chunks_exact(2)
                .map(|c| u64::from(u16::from_le_bytes([c[0], c[1]])))
                .collect(),
            IndexFormat::Uint32 => indices
                .chunks_exact(4)
                .map(|c| u64::from(u32::from_le_bytes([c[0], c[1], c[2], c[3]])))
                .collect(),
        };
        let reads = match (values.iter().min(), values.iter().max()) {
            (Some(&min), Some(&max)) => {
                state.vertex_reads(u64::from(base_vertex) + min, max - min + 1)
            }
            _ => Vec::new(),
        };
        state.submit_draw(topology, reads, self.completion, self.record_draws);
    }

    fn insert_fence(&self) -> Result<GpuFence, GraphicsError> {
        let mut state = self.state.borrow_mut();
        let id = state.allocate_id();
        match self.completion {
            GpuCompletion::Immediate => {
                state.fences.insert(id, true);
            }
            GpuCompletion::Manual => {
                let draws = std::mem::take(&mut state.unfenced);
                state.fences.insert(id, false);
                state.fence_queue.push_back((id, draws));
            }
        }
        Ok(GpuFence::Dummy { id })
    }

    fn poll_fence(&self, fence: &GpuFence) -> Result<FenceStatus, GraphicsError> {
        let id = fence_id(fence).ok_or_else(|| unknown("fence", fence))?;
        let state = self.state.borrow();
        match state.fences.get(&id) {
            Some(true) => Ok(FenceStatus::Signaled),
            Some(false) => Ok(FenceStatus::Unsignaled),
            None => Err(GraphicsError::FenceWaitFailed(format!("unknown fence {id}"))),
        }
    }

    fn wait_fence(&self, fence: &GpuFence) -> Result<(), GraphicsError> {
        let id = fence_id(fence).ok_or_else(|| unknown("fence", fence))?;
        let mut state = self.state.borrow_mut();
        if state.take_failure(DummyFailure::FenceWait) {
            return Err(GraphicsError::FenceWaitFailed(format!(
                "injected driver error on fence {id}"
            )));
        }
        match state.fences.get(&id) {
            Some(true) => Ok(()),
            Some(false) => {
                log::trace!("DummyBackend: blocking on fence {id}");
                state.stats.fence_waits += 1;
                state.signal_through(id, self.record_draws);
                Ok(())
            }
            None => Err(GraphicsError::FenceWaitFailed(format!("unknown fence {id}"))),
        }
    }

    fn delete_fence(&self, fence: GpuFence) {
        if let Some(id) = fence_id(&fence) {
            // Work covered by a deleted fence still executes in order
            self.state.borrow_mut().fences.remove(&id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::VertexAttribute;

    fn wire(backend: &DummyBackend, buffer: &GpuBuffer) {
        backend.bind_vertex_buffer(Some(buffer));
        backend.enable_vertex_attribute(0, &VertexAttribute::position2(0), 8);
    }

    #[test]
    fn test_dummy_backend_creation() {
        let backend = DummyBackend::new();
        assert_eq!(backend.name(), "Dummy Backend");
        assert!(backend.capabilities().has_capabilities(4, 4, None));
        assert_eq!(backend.stats(), DummyStats::default());
    }

    #[test]
    fn test_immediate_draws_execute_at_submission() {
        let backend = DummyBackend::new().with_draw_recording();
        let buffer = backend
            .create_buffer(&BufferDescriptor::new(32, BufferUsage::VERTEX))
            .unwrap();
        backend.buffer_sub_data(&buffer, 8, &[1; 8]).unwrap();
        wire(&backend, &buffer);

        backend.draw_arrays(PrimitiveTopology::LineList, 1, 1);
        let draws = backend.take_executed_draws();
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].first_byte, 8);
        assert_eq!(draws[0].bytes, vec![1; 8]);
        assert_eq!(backend.pending_draw_count(), 0);
    }

    #[test]
    fn test_mapped_write_before_execution_is_a_hazard() {
        let backend = DummyBackend::new().with_completion(GpuCompletion::Manual);
        let buffer = backend
            .create_buffer(&BufferDescriptor::new(
                16,
                BufferUsage::VERTEX | BufferUsage::PERSISTENT,
            ))
            .unwrap();
        let mut mapped = backend.map_persistent(&buffer).unwrap();
        wire(&backend, &buffer);

        mapped.write(0, &[7; 8]).unwrap();
        backend.draw_arrays(PrimitiveTopology::PointList, 0, 1);
        let fence = backend.insert_fence().unwrap();
        assert_eq!(backend.poll_fence(&fence).unwrap(), FenceStatus::Unsignaled);

        mapped.write(0, &[9; 8]).unwrap();
        backend.wait_fence(&fence).unwrap();
        let stats = backend.stats();
        assert_eq!(stats.hazards, 1);
        assert_eq!(stats.fence_waits, 1);
        assert_eq!(backend.poll_fence(&fence).unwrap(), FenceStatus::Signaled);

        backend.delete_fence(fence);
        backend.unmap(&buffer);
        backend.destroy_buffer(&buffer);
        assert_eq!(backend.stats().live_fences, 0);
    }

    #[test]
    fn test_orphaning_keeps_old_store_for_pending_draws() {
        let backend = DummyBackend::new()
            .with_completion(GpuCompletion::Manual)
            .with_draw_recording();
        let buffer = backend
            .create_buffer(&BufferDescriptor::new(8, BufferUsage::VERTEX))
            .unwrap();
        wire(&backend, &buffer);

        backend
            .buffer_data(&buffer, BufferData::Bytes(&[1; 8]), BufferUsage::STREAM)
            .unwrap();
        backend.draw_arrays(PrimitiveTopology::PointList, 0, 1);
        backend
            .buffer_data(&buffer, BufferData::Bytes(&[2; 8]), BufferUsage::STREAM)
            .unwrap();
        backend.draw_arrays(PrimitiveTopology::PointList, 0, 1);
        backend.complete_all();

        let draws = backend.take_executed_draws();
        assert_eq!(draws[0].bytes, vec![1; 8]);
        assert_eq!(draws[1].bytes, vec![2; 8]);
        assert_eq!(backend.stats().hazards, 0);
    }

    #[test]
    fn test_sub_data_over_pending_draw_syncs() {
        let backend = DummyBackend::new().with_completion(GpuCompletion::Manual);
        let buffer = backend
            .create_buffer(&BufferDescriptor::new(8, BufferUsage::VERTEX))
            .unwrap();
        wire(&backend, &buffer);
        backend.draw_arrays(PrimitiveTopology::PointList, 0, 1);
        backend.buffer_sub_data(&buffer, 0, &[3; 8]).unwrap();

        let stats = backend.stats();
        assert_eq!(stats.implicit_syncs, 1);
        assert_eq!(stats.hazards, 0);
        assert_eq!(stats.executed_draws, 1);
    }

    #[test]
    fn test_indexed_draw_reads_base_vertex_range() {
        let backend = DummyBackend::new().with_draw_recording();
        let vertices = backend
            .create_buffer(&BufferDescriptor::new(64, BufferUsage::VERTEX))
            .unwrap();
        let indices = backend
            .create_buffer(&BufferDescriptor::new(12, BufferUsage::INDEX))
            .unwrap();
        let pattern: Vec<u8> = [0u16, 1, 2, 0, 2, 3]
            .iter()
            .flat_map(|i| i.to_le_bytes())
            .collect();
        backend.buffer_sub_data(&indices, 0, &pattern).unwrap();
        backend.bind_index_buffer(Some(&indices));
        wire(&backend, &vertices);

        backend.draw_indexed(PrimitiveTopology::TriangleList, 6, IndexFormat::Uint16, 0, 4);
        let draws = backend.take_executed_draws();
        assert_eq!(draws[0].first_byte, 32);
        assert_eq!(draws[0].bytes.len(), 32);
        assert_eq!(backend.stats().invalid_draws, 0);
    }

    #[test]
    fn test_out_of_range_draw_is_invalid() {
        let backend = DummyBackend::new();
        let buffer = backend
            .create_buffer(&BufferDescriptor::new(16, BufferUsage::VERTEX))
            .unwrap();
        wire(&backend, &buffer);
        backend.draw_arrays(PrimitiveTopology::PointList, 1, 2);
        assert_eq!(backend.stats().invalid_draws, 1);
    }

    #[test]
    fn test_persistent_rules() {
        let backend = DummyBackend::new();
        let plain = backend
            .create_buffer(&BufferDescriptor::new(16, BufferUsage::VERTEX))
            .unwrap();
        assert!(matches!(
            backend.map_persistent(&plain),
            Err(GraphicsError::MapFailed(_))
        ));

        let persistent = backend
            .create_buffer(&BufferDescriptor::new(
                16,
                BufferUsage::VERTEX | BufferUsage::PERSISTENT,
            ))
            .unwrap();
        assert!(
            backend
                .buffer_data(&persistent, BufferData::Uninit(32), BufferUsage::STREAM)
                .is_err()
        );
        let _mapped = backend.map_persistent(&persistent).unwrap();
        assert!(backend.map_persistent(&persistent).is_err());
        assert_eq!(backend.stats().mapped_buffers, 1);
    }

    #[test]
    fn test_injected_failures_fire_once() {
        let backend = DummyBackend::new();
        backend.inject_failure(DummyFailure::CreateBuffer);
        let desc = BufferDescriptor::new(16, BufferUsage::VERTEX);
        assert!(matches!(
            backend.create_buffer(&desc),
            Err(GraphicsError::ResourceCreationFailed(_))
        ));
        assert!(backend.create_buffer(&desc).is_ok());

        backend.inject_failure(DummyFailure::FenceWait);
        let fence = backend.insert_fence().unwrap();
        assert!(matches!(
            backend.wait_fence(&fence),
            Err(GraphicsError::FenceWaitFailed(_))
        ));
        assert!(backend.wait_fence(&fence).is_ok());
    }

    #[test]
    fn test_attribute_locations() {
        let backend = DummyBackend::new();
        let program = backend.create_program(&["in_position", "in_color"]);
        assert_eq!(backend.attribute_location(&program, "in_color"), Some(1));
        assert_eq!(backend.attribute_location(&program, "in_normal"), None);
    }

    #[test]
    fn test_vertex_array_captures_wiring() {
        let backend = DummyBackend::new();
        let buffer = backend
            .create_buffer(&BufferDescriptor::new(16, BufferUsage::VERTEX))
            .unwrap();
        let vao = backend.create_vertex_array().unwrap();
        backend.bind_vertex_array(Some(&vao));
        wire(&backend, &buffer);
        backend.bind_vertex_array(None);

        // Default state has no attributes: nothing is read
        backend.draw_arrays(PrimitiveTopology::PointList, 0, 100);
        assert_eq!(backend.stats().invalid_draws, 0);

        backend.bind_vertex_array(Some(&vao));
        backend.draw_arrays(PrimitiveTopology::PointList, 0, 100);
        assert_eq!(backend.stats().invalid_draws, 1);
    }
}
