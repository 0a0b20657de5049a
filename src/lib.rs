//! `mmarray` — persistent, memory-mapped, append-oriented typed arrays for
//! single-machine, multi-process time-series, tick, and bar workloads.
//!
//! Layers, leaves first: narrow-integer codecs underlie the narrow-integer
//! adapter; the exclusive writer lock and the mapped array engine underlie
//! the bit-array and time-series overlays; the view adapter windows any of
//! the above read-only. Collaborator surfaces (progress, instance tracking,
//! error sink) are pure bookkeeping the core never consults to make
//! decisions.

pub mod bitarray;
pub mod codec;
pub mod diag;
mod element;
pub mod engine;
pub mod error;
pub mod lock;
pub mod narrow;
pub mod progress;
pub mod timeseries;
pub mod tracker;
pub mod types;
pub mod view;

pub use bitarray::BitArray;
pub use diag::set_verbosity;
pub use element::Element;
pub use engine::{MArray, Mode, OpenOptions};
pub use error::{BoundsMode, Error, ErrorSink, Result};
pub use narrow::{NarrowAdapter, UtilisationStatus};
pub use progress::ProgressSink;
pub use timeseries::{OrderingMode, TimeSeries};
pub use tracker::{InstanceTracker, Token};
pub use types::DataType;
pub use view::{ReadableArray, View};
