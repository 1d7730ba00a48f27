//! # timetable-engine
//!
//! Weekly timetable conflict detection and grid layout for class-group
//! scheduling.
//!
//! Every screen that edits or shows a timetable goes through this crate. The
//! overlap rule lives in one place and both the conflict checks and the grid
//! build on it.
//!
//! ## Modules
//!
//! - [`interval`]: days, clock times, weekly intervals and the overlap rule
//! - [`collection`]: one owner's timetable, refusing overlapping inserts
//! - [`conflict`]: pairwise overlaps and the conflict result model
//! - [`probe`]: the remote conflict probe port and its wire format
//! - [`draft`]: raw form input and its validation state
//! - `detector`: local-then-remote conflict checks (feature `runtime`)
//! - `session`: debounced, last-write-wins draft editing (feature `runtime`)
//! - [`grid`]: grid placement and side-by-side lanes
//! - [`freebusy`]: free gaps within a day
//! - [`alternatives`]: replacement slots for a conflicting candidate
//! - [`registry`]: in-memory class groups answering conflict probes
//! - [`store`]: timetable persistence port
//! - [`config`]: engine settings from defaults, env or JSON
//! - [`error`]: Error types

pub mod alternatives;
pub mod collection;
pub mod config;
pub mod conflict;
#[cfg(feature = "runtime")]
pub mod detector;
pub mod draft;
pub mod error;
pub mod freebusy;
pub mod grid;
pub mod interval;
pub mod probe;
pub mod registry;
#[cfg(feature = "runtime")]
pub mod session;
pub mod store;

pub use alternatives::suggest_alternatives;
pub use collection::TimetableCollection;
pub use config::{EngineConfig, ProbeFailurePolicy};
pub use conflict::{
    check_local, find_conflicts, AffectedUser, AlternativeSlot, ConflictResult, ConflictSource,
    Role,
};
#[cfg(feature = "runtime")]
pub use detector::{ConflictCheck, ConflictDetector};
pub use draft::{Candidate, DraftEntry, DraftField};
pub use error::{Result, TimetableError};
pub use freebusy::{find_first_free_slot, find_free_slots, FreeSlot};
pub use grid::{layout, layout_entries, GridConfig, OverlapMode, PlacedEntry};
pub use interval::{
    duration_minutes, overlaps, parse_time, to_minutes_range, Day, EntryKind, EntryLabel,
    Minutes, OwnerRef, WeeklyInterval,
};
pub use probe::{AsyncConflictProbe, ProbeResponse, ProbeVerdict};
pub use registry::{ClassGroup, ScheduleRegistry};
#[cfg(feature = "runtime")]
pub use session::{ConflictStatus, DraftSession};
pub use store::{InMemoryStore, TimetableStore};
