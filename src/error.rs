/*
 * Error Module
 *
 * Errors raised by the simulation kernel. Storage-layer violations are
 * programmer errors and are surfaced immediately, never clamped or retried.
 */

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimError {
    /// An index or coordinate fell outside the grid extents.
    #[error("voxel index {index} is out of bounds for a grid of {capacity} cells")]
    OutOfBounds { index: i64, capacity: usize },

    /// A configuration value failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),

    /// A field lock was poisoned by a panicking holder.
    #[error("{0} lock poisoned")]
    LockPoisoned(&'static str),

    /// The background simulation thread could not be started.
    #[error("simulation worker: {0}")]
    Worker(String),
}

pub type SimResult<T> = Result<T, SimError>;
