//! Adaptive scheduling core for an incremental, region-based, generational
//! garbage collector.
//!
//! The collector this crate serves interleaves two kinds of work: *partial*
//! garbage collections (PGCs) that reclaim the young generation (Eden) plus
//! selected defragmentation targets, and increments of a *global mark phase*
//! (GMP) that concurrently marks the whole heap. The scheduler decides, at
//! each collection checkpoint, which of the two runs next, how large Eden
//! should be, when the next GMP should kick off, and how much scanning an
//! individual GMP increment should perform.
//!
//! The scheduler performs no collection work itself. It observes statistics
//! from each completed increment through the callbacks on
//! [`SchedulingDelegate`], folds them into exponentially-weighted averages,
//! and projects future behavior to minimize a blended cost of pause time and
//! GC CPU overhead. Heap metadata is read through the [`HeapView`] trait and
//! per-increment statistics arrive in [`CycleState`]; both stay owned by the
//! collection engine.
//!
//! All callbacks are invoked by the engine from a single thread at a time
//! (stop-the-world or increment boundaries), so the scheduler keeps plain
//! state and takes `&mut self`. Timestamps are engine-supplied microsecond
//! readings of a hires clock; the scheduler never reads a clock itself.

#[macro_use]
extern crate log;
#[macro_use]
extern crate lazy_static;

pub mod scheduler;
pub mod util;

pub use crate::scheduler::cycle_stats::{
    ConcurrentMarkStats, CopyForwardStats, CycleState, GmpCycleStats, HeapSizingData,
    IncrementStats, MarkCompactReason, MarkStats,
};
pub use crate::scheduler::delegate::SchedulingDelegate;
pub use crate::util::heap::region::{HeapView, RegionData};
pub use crate::util::options::Options;
