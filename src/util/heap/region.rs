//! The engine-owned view of the region table consumed by the scheduler.
//!
//! The scheduler never walks real heap memory. At collection boundaries it
//! iterates [`RegionData`] snapshots supplied by the engine's region
//! manager, summing live-data and free-memory figures, and tags regions it
//! would like defragmented on the next partial collection.

/// Per-region metadata snapshot.
///
/// `free_memory_and_dark_matter` is the memory-pool figure used for
/// emptiness decisions; `actual_free_memory` and `dark_matter` are the
/// split figures used when estimating the live set.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegionData {
    /// Index of the region in the region table, used to address flag
    /// writes back to the engine.
    pub index: usize,
    /// The region holds objects (it is neither free nor an arraylet leaf).
    pub contains_objects: bool,
    /// The region is free or idle.
    pub is_free_or_idle: bool,
    /// The region is a leaf of a spine-allocated array.
    pub is_arraylet_leaf: bool,
    /// For arraylet leaves: whether the spine is an object (reference)
    /// array, in which case the whole leaf is scan work for the marker.
    pub spine_is_object_array: bool,
    /// Whether the remembered set for this region is accurate. Regions with
    /// overflowed or rebuilding remembered sets cannot be collected by a
    /// partial collection.
    pub remembered_set_accurate: bool,
    /// Compact group the region belongs to.
    pub compact_group: usize,
    pub free_memory_and_dark_matter: usize,
    pub actual_free_memory: usize,
    pub dark_matter: usize,
    pub scannable_bytes: usize,
    pub non_scannable_bytes: usize,
}

/// Read-only heap metadata the engine exposes to the scheduler, plus the
/// single write-back used to tag defragmentation targets.
///
/// Implementations are engine-owned; the scheduler holds a borrow only for
/// the duration of a callback.
pub trait HeapView {
    /// Size of every region in bytes.
    fn region_size(&self) -> usize;

    /// Number of managed regions (the cold area is excluded).
    fn managed_region_count(&self) -> usize;

    /// Number of currently free regions available for allocation.
    fn free_region_count(&self) -> usize;

    /// Total managed heap size in bytes.
    fn total_heap_size(&self) -> usize;

    /// Number of allocation contexts the engine partitions Eden across.
    /// Eden never shrinks below one region per context.
    fn allocation_context_count(&self) -> usize;

    /// Iterate snapshots of all managed regions.
    fn regions(&self) -> Box<dyn Iterator<Item = RegionData> + '_>;

    /// Historic weighted survival rate of the given compact group, in
    /// `[0, 1]`.
    fn weighted_survival_rate(&self, compact_group: usize) -> f64;

    /// Tag `region` as a defragmentation target for the next partial
    /// collection.
    fn set_defragmentation_target(&self, region: usize, target: bool);
}
