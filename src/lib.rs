//! Replot is a small library for driving plots from simulation output. It
//! implements the reactive visualization loop used throughout the climate
//! modelling tutorials: a frame index (or a live simulation) feeds a graph of
//! observable cells, cells feed plot bindings, and bindings redraw a
//! rendering surface whenever anything upstream changes. An animation driver
//! advances the source one frame at a time and captures what the surface
//! shows into an ordered output sequence.
//!
//! Propagation is push-based, eager, and synchronous: setting a cell runs its
//! whole downstream cascade, depth first and in subscription order, before
//! `set` returns. There is no batching, no laziness, and no deduplication of
//! identical updates. Everything runs on one thread; cells are `Rc` handles
//! owned by the session that builds them.
//!
//! The simulation, the stored time series, and the rendering backend are
//! collaborators behind the [`stepper::SimulationStepper`],
//! [`series::TimeSeriesStore`] and [`render::RenderSurface`] traits. Minimal
//! implementations of each are included (a 1D advection solver, a
//! serde-backed series file, and an in-memory canvas) so that the loop can be
//! run and tested end to end.

pub mod binding;
pub mod capture;
pub mod cell;
pub mod derived;
pub mod driver;
pub mod error;
pub mod index;
pub mod render;
pub mod series;
pub mod stepper;

pub use error::{Error, Result};
