// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Drives the plane mapper, the escape-time test and the palette across
//! every pixel of a raster.  Every pixel depends only on the request
//! and its own coordinates, so the raster can be filled in one pass, in
//! parallel bands, or a few rows at a time; the result is the same.

use crossbeam;
use itertools::iproduct;
use num::Complex;
use std::ops::Range;

use errors::{RenderError, Result};
use escape::{escape_time, has_escaped, resume_orbit};
use palette::{color, Color};
use planes::{Pixel, PlaneMapper, Viewport};

/// Everything needed to render an image.  The output is a pure
/// function of these fields.  The only way to build one is through
/// `new`, which rejects anything that can't be rendered.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RenderRequest {
    viewport: Viewport,
    width: u32,
    height: u32,
    max_iterations: u32,
}

impl RenderRequest {
    /// Validates and builds a request.
    pub fn new(
        viewport: Viewport,
        width: u32,
        height: u32,
        max_iterations: u32,
    ) -> Result<RenderRequest> {
        if width == 0 {
            return Err(RenderError::invalid("width must be positive"));
        }
        if height == 0 {
            return Err(RenderError::invalid("height must be positive"));
        }
        if max_iterations == 0 {
            return Err(RenderError::invalid("max_iterations must be positive"));
        }
        if !(viewport.scale > 0.0) || !viewport.scale.is_finite() {
            return Err(RenderError::invalid(format!(
                "scale must be a positive number, got {}",
                viewport.scale
            )));
        }
        if !viewport.x_center.is_finite() || !viewport.y_center.is_finite() {
            return Err(RenderError::invalid("center must be a finite point"));
        }
        Ok(RenderRequest {
            viewport,
            width,
            height,
            max_iterations,
        })
    }

    /// The region of the complex plane to draw.
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Raster width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Raster height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Iteration budget per pixel.
    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    /// A mapper from this request's raster to its viewport.
    pub fn mapper(&self) -> PlaneMapper {
        PlaneMapper::new(self.width as usize, self.height as usize, self.viewport)
    }

    /// The same raster and budget over a different viewport.
    pub fn with_viewport(&self, viewport: Viewport) -> Result<RenderRequest> {
        RenderRequest::new(viewport, self.width, self.height, self.max_iterations)
    }

    /// The same raster and viewport with a different budget.
    pub fn with_max_iterations(&self, max_iterations: u32) -> Result<RenderRequest> {
        RenderRequest::new(self.viewport, self.width, self.height, max_iterations)
    }

    fn len(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// A finished raster of colors in row-major order.  Each render hands
/// back a freshly allocated, independently owned image.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderedImage {
    width: u32,
    height: u32,
    pixels: Vec<Color>,
}

impl RenderedImage {
    /// Raster width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Raster height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// All pixels, row by row.
    pub fn pixels(&self) -> &[Color] {
        &self.pixels
    }

    /// The color at column `x`, row `y`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.pixels[y as usize * self.width as usize + x as usize])
    }

    /// The raster flattened into RGBA bytes, ready for an encoder.
    pub fn to_rgba_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.pixels.len() * 4);
        for pixel in &self.pixels {
            bytes.extend_from_slice(&pixel.to_rgba());
        }
        bytes
    }
}

const BLANK: Color = Color {
    r: 0,
    g: 0,
    b: 0,
    a: 255,
};

/// Fills `band`, which starts at row `first_row` of the raster, with
/// `shade` applied to each pixel's escape time.
fn fill_rows<T, F>(request: &RenderRequest, first_row: usize, band: &mut [T], shade: &F)
where
    F: Fn(u32) -> T,
{
    let mapper = request.mapper();
    let width = request.width as usize;
    let rows = band.len() / width;
    let pixels = iproduct!(first_row..first_row + rows, 0..width);
    for (slot, (row, column)) in band.iter_mut().zip(pixels) {
        let point = mapper.pixel_to_point(&Pixel(column, row));
        *slot = shade(escape_time(point, request.max_iterations));
    }
}

/// Splits the raster into horizontal bands, one per thread, and fills
/// them concurrently.  Bands never overlap, so no locking is needed.
fn render_with<T, F>(request: &RenderRequest, threads: usize, blank: T, shade: F) -> Vec<T>
where
    T: Copy + Send,
    F: Fn(u32) -> T + Sync,
{
    let height = request.height as usize;
    let width = request.width as usize;
    let mut buffer = vec![blank; request.len()];
    let threads = threads.max(1).min(height);

    if threads == 1 {
        fill_rows(request, 0, &mut buffer, &shade);
        return buffer;
    }

    let rows_per_band = (height + threads - 1) / threads;
    let shade = &shade;
    let outcome = crossbeam::scope(|spawner| {
        for (index, band) in buffer.chunks_mut(rows_per_band * width).enumerate() {
            spawner.spawn(move |_| fill_rows(request, index * rows_per_band, band, shade));
        }
    });
    if let Err(panic) = outcome {
        ::std::panic::resume_unwind(panic);
    }
    buffer
}

/// Renders every pixel of the request on the calling thread.
pub fn render(request: &RenderRequest) -> RenderedImage {
    render_threaded(request, 1)
}

/// Renders the request with up to `threads` worker threads.  The image
/// is identical to the one `render` produces.
pub fn render_threaded(request: &RenderRequest, threads: usize) -> RenderedImage {
    debug!(
        "Rendering {}x{} centered on ({}, {}) at scale {} with {} iterations on {} thread(s)",
        request.width,
        request.height,
        request.viewport.x_center,
        request.viewport.y_center,
        request.viewport.scale,
        request.max_iterations,
        threads
    );
    let max_iterations = request.max_iterations;
    let pixels = render_with(request, threads, BLANK, move |i| color(i, max_iterations));
    RenderedImage {
        width: request.width,
        height: request.height,
        pixels,
    }
}

/// The raw escape time of every pixel, row-major.  A value equal to the
/// request's `max_iterations` marks a point that never escaped.
pub fn escape_map(request: &RenderRequest, threads: usize) -> Vec<u32> {
    render_with(request, threads, 0, |i| i)
}

/// Where one pixel's orbit stands.
#[derive(Copy, Clone, Debug, PartialEq)]
struct Orbit {
    z: Complex<f64>,
    iterations: u32,
}

const FRESH: Orbit = Orbit {
    z: Complex { re: 0.0, im: 0.0 },
    iterations: 0,
};

/// Remembers the orbit of every pixel of one viewport and raster, so the
/// iteration budget can be raised later without starting over.  Orbits
/// that escaped are done for good; only the ones still inside the
/// escape radius are carried forward.
#[derive(Clone, Debug)]
pub struct EscapeCache {
    mapper: PlaneMapper,
    width: u32,
    height: u32,
    budget: u32,
    orbits: Vec<Orbit>,
}

impl EscapeCache {
    /// An empty cache for the viewport and raster of `request`.  Nothing
    /// is computed until the first `deepen`.
    pub fn new(request: &RenderRequest) -> EscapeCache {
        EscapeCache {
            mapper: request.mapper(),
            width: request.width,
            height: request.height,
            budget: 0,
            orbits: vec![FRESH; request.len()],
        }
    }

    /// The highest budget computed so far.
    pub fn budget(&self) -> u32 {
        self.budget
    }

    /// True if `request` covers the same viewport and raster, whatever
    /// its iteration budget.
    pub fn covers(&self, request: &RenderRequest) -> bool {
        self.mapper.viewport == request.viewport
            && self.width == request.width
            && self.height == request.height
    }

    /// Escape times at `max_iterations`, on the calling thread.
    pub fn deepen(&mut self, max_iterations: u32) -> Vec<u32> {
        self.deepen_threaded(max_iterations, 1)
    }

    /// Escape times at `max_iterations`, row-major, identical to
    /// `escape_map` at that budget.  Only orbits that were still bounded
    /// at the previous budget are iterated further; asking for a budget
    /// at or below the one already reached does no work at all.
    pub fn deepen_threaded(&mut self, max_iterations: u32, threads: usize) -> Vec<u32> {
        if max_iterations > self.budget {
            debug!(
                "Deepening {}x{} from {} to {} iterations",
                self.width, self.height, self.budget, max_iterations
            );
            self.advance(max_iterations, threads);
            self.budget = max_iterations;
        }
        self.orbits
            .iter()
            .map(|orbit| orbit.iterations.min(max_iterations))
            .collect()
    }

    /// Renders `request`, reusing this cache when it covers the same
    /// view and starting a fresh one when it does not.
    pub fn render(&mut self, request: &RenderRequest, threads: usize) -> RenderedImage {
        if !self.covers(request) {
            *self = EscapeCache::new(request);
        }
        let max_iterations = request.max_iterations;
        let pixels = self
            .deepen_threaded(max_iterations, threads)
            .into_iter()
            .map(|i| color(i, max_iterations))
            .collect();
        RenderedImage {
            width: request.width,
            height: request.height,
            pixels,
        }
    }

    fn advance(&mut self, max_iterations: u32, threads: usize) {
        let width = self.width as usize;
        let height = self.height as usize;
        let mapper = &self.mapper;
        let orbits = &mut self.orbits;
        let threads = threads.max(1).min(height);

        if threads == 1 {
            advance_rows(mapper, 0, orbits, max_iterations);
            return;
        }

        let rows_per_band = (height + threads - 1) / threads;
        let outcome = crossbeam::scope(|spawner| {
            for (index, band) in orbits.chunks_mut(rows_per_band * width).enumerate() {
                spawner.spawn(move |_| advance_rows(mapper, index * rows_per_band, band, max_iterations));
            }
        });
        if let Err(panic) = outcome {
            ::std::panic::resume_unwind(panic);
        }
    }
}

fn advance_rows(mapper: &PlaneMapper, first_row: usize, band: &mut [Orbit], max_iterations: u32) {
    let width = mapper.integral_plane.0;
    let rows = band.len() / width;
    let pixels = iproduct!(first_row..first_row + rows, 0..width);
    for (orbit, (row, column)) in band.iter_mut().zip(pixels) {
        if has_escaped(orbit.z) {
            continue;
        }
        let c = mapper.pixel_to_point(&Pixel(column, row));
        let (z, iterations) = resume_orbit(c, orbit.z, orbit.iterations, max_iterations);
        *orbit = Orbit { z, iterations };
    }
}

/// A horizontal slice of a render: the rows it covers and their pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct RowChunk {
    /// The raster rows in this chunk.
    pub rows: Range<usize>,
    /// Pixels for those rows, row-major.
    pub pixels: Vec<Color>,
}

/// Renders a request a few rows at a time.  Each call to `next` does a
/// bounded amount of work, so a host event loop can interleave other
/// tasks between chunks or drop the iterator to abandon the render.
#[derive(Clone, Debug)]
pub struct RowChunks {
    request: RenderRequest,
    next_row: usize,
    rows_per_chunk: usize,
}

impl RowChunks {
    /// Chunks of at most `rows_per_chunk` rows; zero is treated as one.
    pub fn new(request: RenderRequest, rows_per_chunk: usize) -> RowChunks {
        RowChunks {
            request,
            next_row: 0,
            rows_per_chunk: rows_per_chunk.max(1),
        }
    }

    /// Rows rendered so far.
    pub fn rows_done(&self) -> usize {
        self.next_row
    }
}

impl Iterator for RowChunks {
    type Item = RowChunk;

    fn next(&mut self) -> Option<RowChunk> {
        let height = self.request.height as usize;
        if self.next_row >= height {
            return None;
        }
        let start = self.next_row;
        let end = (start + self.rows_per_chunk).min(height);
        let mut pixels = vec![BLANK; (end - start) * self.request.width as usize];
        let max_iterations = self.request.max_iterations;
        let shade = move |i| color(i, max_iterations);
        fill_rows(&self.request, start, &mut pixels, &shade);
        self.next_row = end;
        trace!("Rendered rows {}..{} of {}", start, end, height);
        Some(RowChunk {
            rows: start..end,
            pixels,
        })
    }
}

/// Accumulates `RowChunks` into a full image.  The partial buffer is
/// never handed out; only a completed render becomes a `RenderedImage`.
#[derive(Debug)]
pub struct ChunkedRender {
    request: RenderRequest,
    chunks: RowChunks,
    pixels: Vec<Color>,
}

impl ChunkedRender {
    /// Starts an incremental render.
    pub fn new(request: RenderRequest, rows_per_chunk: usize) -> ChunkedRender {
        ChunkedRender {
            request,
            chunks: RowChunks::new(request, rows_per_chunk),
            pixels: Vec::with_capacity(request.len()),
        }
    }

    /// The request being rendered.
    pub fn request(&self) -> &RenderRequest {
        &self.request
    }

    /// Renders the next chunk.  Returns false once there is nothing
    /// left to do.
    pub fn step(&mut self) -> bool {
        match self.chunks.next() {
            Some(chunk) => {
                self.pixels.extend(chunk.pixels);
                true
            }
            None => false,
        }
    }

    /// Fraction of rows finished, from 0.0 to 1.0.
    pub fn progress(&self) -> f64 {
        self.chunks.rows_done() as f64 / f64::from(self.request.height)
    }

    /// True once every row has been rendered.
    pub fn is_complete(&self) -> bool {
        self.chunks.rows_done() >= self.request.height as usize
    }

    /// The finished image, or None if rows are still outstanding.
    pub fn into_image(self) -> Option<RenderedImage> {
        if !self.is_complete() {
            return None;
        }
        Some(RenderedImage {
            width: self.request.width,
            height: self.request.height,
            pixels: self.pixels,
        })
    }

    /// Renders whatever is left and returns the image.
    pub fn finish(mut self) -> RenderedImage {
        while self.step() {}
        RenderedImage {
            width: self.request.width,
            height: self.request.height,
            pixels: self.pixels,
        }
    }
}
