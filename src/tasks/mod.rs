//! Background Tasks Module
//!
//! Contains background tasks that run periodically while a cache is live.
//!
//! # Tasks
//! - Reclamation: sweeps expired items, enforces size limits, persists state

mod reclamation;

pub use reclamation::{spawn_reclamation_task, ReclamationHandle, SweepReport};
