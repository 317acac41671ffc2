//! Compute dispatch sizing and indirect draw arguments.

use bytemuck::{Pod, Zeroable};

/// Threads per compute workgroup. Must match the `@workgroup_size` declared
/// in `gpu/particle_update.wgsl`.
pub const THREAD_BLOCK_SIZE: u32 = 256;

/// Elapsed time is divided by this before it reaches the update kernel.
pub const TIME_DAMPING: f32 = 5.0;

/// Workgroup count for one update pass over the particle buffer.
///
/// One extra group is dispatched past the ceiling so boundary counts can never
/// underrun; the kernel guards threads past the end of the buffer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DispatchPlan {
    pub total_records: u32,
    pub group_count: u32,
}

impl DispatchPlan {
    pub fn new(total_records: u32) -> Self {
        let group_count = total_records.div_ceil(THREAD_BLOCK_SIZE) + 1;
        Self { total_records, group_count }
    }
}

/// Arguments consumed by the indirect indexed draw: five u32 slots, of which
/// only the first two are live. Field order matches what the GPU expects for
/// an indexed indirect draw.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct DrawArgs {
    pub index_count: u32,
    pub instance_count: u32,
    pub first_index: u32,
    pub base_vertex: u32,
    pub first_instance: u32,
}

impl DrawArgs {
    /// Rebuilt every frame from the template mesh and the live count.
    pub fn for_frame(index_count: u32, instance_count: u32) -> Self {
        Self {
            index_count,
            instance_count,
            first_index: 0,
            base_vertex: 0,
            first_instance: 0,
        }
    }
}

/// Byte size of the indirect args buffer.
pub const DRAW_ARGS_BYTES: u64 = std::mem::size_of::<DrawArgs>() as u64;
