//! MintPaint editor core: layered raster canvas, paint tools, selection and
//! undo, driven through a single [`coordinator::DrawingCoordinator`].
//!
//! The crate has no windowing code; a UI shell forwards pointer events in
//! screen space and subscribes to [`events::CoordinatorEvent`]s.

#![allow(clippy::too_many_arguments)]

#[macro_use]
pub mod logger;
pub mod canvas;
pub mod cli;
pub mod components;
pub mod config;
pub mod coordinator;
pub mod events;
pub mod io;
pub mod ops;
pub mod scheduler;
pub mod viewport;
