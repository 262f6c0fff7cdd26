//! Form filler driven by tabular data
//!
//! Types one CSV record per form submission into whatever window has focus,
//! using synthetic keyboard input.
//!
//! # Pieces
//!
//! - [`config`]: timing and behavior options, presets, `FF_*` overrides
//! - [`data`]: CSV loading into ordered records
//! - [`input`]: the synthetic input channel and its enigo backend
//! - [`abort`]: Ctrl+C and failsafe-corner detection
//! - [`sequencer`]: the per-record fill / advance / submit loop
//! - [`console`]: operator-facing output

pub mod abort;
pub mod config;
pub mod console;
pub mod data;
pub mod error;
pub mod input;
pub mod logging;
pub mod sequencer;

pub use abort::AbortWatch;
pub use config::{FillerConfig, LogLevel, NavigationMethod, Preset, SubmissionMethod};
pub use data::{DataSet, FieldValue, Record, load_records};
pub use error::{AbortKind, ActionError, ConfigError, DataLoadError, InputError};
pub use input::{EnigoInput, FormKey, InputChannel, ScreenInfo};
pub use sequencer::{Delay, ProgressReporter, RunOutcome, RunReport, Sequencer, ThreadDelay};
