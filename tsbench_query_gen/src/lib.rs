//! Deterministic generation of benchmark queries.
//!
//! Queries are built from three pieces:
//!
//! * a [`TimeInterval`](interval::TimeInterval) covering the whole benchmark, out of which every
//!   query draws a random window,
//! * a [`SamplingCore`](sampling::SamplingCore) picking random hosts out of the simulated
//!   population from a seeded generator,
//! * a backend generator implementing the [`devops`] capabilities it can render.
//!
//! Given the same seed and configuration the generated query stream is identical.

pub mod backends;
pub mod devops;
pub mod generate;
pub mod interval;
pub mod sampling;
