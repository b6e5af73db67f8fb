//! Time-domain FID handling: capture records, gating, windowing, padding

pub mod gate;
pub mod padding;
pub mod waveform;
pub mod windowing;

pub use gate::{gate, GateError};
pub use padding::{zero_pad, PadError};
pub use waveform::{CaptureSource, FileSource, SourceError, WaveformSample};
pub use windowing::{apply_window, kaiser_window, normalized_envelope};
