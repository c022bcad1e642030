//! Mosaic Services Layer
//!
//! Platform-facing pieces that sit around the simulation: for now, settings
//! loaded from disk.

pub mod settings;

pub use settings::{DemoSettings, Settings, SettingsError, SimulationSettings};
