#![deny(missing_docs)]
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Mandelbrot renderer
//!
//! The Mandelbrot set is the set of points `c` on the complex plane
//! for which the orbit of zero under `z -> z * z + c` stays bounded.
//! For every pixel of an image we find the point it covers, count how
//! many iterations that point's orbit survives before leaving the disk
//! of radius 2, and turn that count into a color.  Points that never
//! leave within the iteration budget are treated as members of the set.
//!
//! The pipeline runs one way only: a `RenderRequest` (a viewport, a
//! raster size and an iteration budget) goes in, a `RenderedImage`
//! comes out, and the result depends on nothing else.  On top of that
//! pipeline sit an interactive `Session`, which turns clicks, wheel
//! notches and drags into new requests and renders them a few rows at a
//! time, and a framework-neutral `handler` that serves PNGs from query
//! strings.  An `EscapeCache` keeps the orbits of one view around so
//! its iteration budget can be raised without recomputing from zero.

extern crate crossbeam;
#[macro_use]
extern crate failure;
extern crate image;
extern crate itertools;
#[macro_use]
extern crate log;
extern crate num;
extern crate num_cpus;
extern crate url;

#[cfg(test)]
extern crate tempfile;

pub mod encode;
pub mod errors;
pub mod escape;
pub mod handler;
pub mod palette;
pub mod planes;
pub mod render;
pub mod session;

pub use encode::{encode_png, encode_png_with_bracket, save_png};
pub use errors::{RenderError, Result};
pub use escape::escape_iterations;
pub use handler::{handle, parse_request, Response, ServerConfig, ServerLimits};
pub use palette::{color, Color};
pub use planes::{pixel_to_point, PlaneMapper, Viewport};
pub use render::{
    escape_map, render, render_threaded, ChunkedRender, EscapeCache, RenderRequest, RenderedImage,
    RowChunks,
};
pub use session::{Interaction, JobStatus, RenderJobs, Session, ViewportState, ZoomConfig};
