// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Interactive exploration.  The state of an explorer is an explicit
//! `ViewportState` value; every user interaction is a pure transition
//! from one state to the next.  Rendering is driven a chunk at a time
//! by the host's event loop through a `Session`, and a newer request
//! always replaces an older one that is still in flight.

use num::{clamp, Complex};
use std::fmt;

use errors::{RenderError, Result};
use planes::{PlaneMapper, Viewport};
use render::{ChunkedRender, RenderRequest, RenderedImage};

/// Tunables for the interactive zoom behaviour.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ZoomConfig {
    /// Multiplier applied to the scale on click; 0.25 zooms in 4x.
    pub zoom_factor: f64,
    /// Multiplier applied to the iteration budget on click.
    pub iter_grow: f64,
    /// Lower bound for a grown iteration budget.
    pub iter_min: u32,
    /// Upper bound for a grown iteration budget.
    pub iter_max: u32,
    /// Scale change per mouse wheel notch.
    pub wheel_factor: f64,
}

impl Default for ZoomConfig {
    fn default() -> ZoomConfig {
        ZoomConfig {
            zoom_factor: 0.25,
            iter_grow: 1.25,
            iter_min: 10,
            iter_max: 2000,
            wheel_factor: 1.2,
        }
    }
}

impl ZoomConfig {
    /// Checks the configuration makes sense before it is used.
    pub fn validate(&self) -> Result<()> {
        if !(self.zoom_factor > 0.0) || !self.zoom_factor.is_finite() {
            return Err(RenderError::invalid("zoom factor must be positive"));
        }
        if !(self.iter_grow > 0.0) || !self.iter_grow.is_finite() {
            return Err(RenderError::invalid("iteration growth must be positive"));
        }
        if !(self.wheel_factor > 0.0) || !self.wheel_factor.is_finite() {
            return Err(RenderError::invalid("wheel factor must be positive"));
        }
        if self.iter_min == 0 || self.iter_min > self.iter_max {
            return Err(RenderError::invalid(format!(
                "iteration bounds {}..{} are empty",
                self.iter_min, self.iter_max
            )));
        }
        Ok(())
    }

    /// The iteration budget after one click: grown, truncated, and held
    /// within `[iter_min, iter_max]`.
    pub fn grow_iterations(&self, current: u32) -> u32 {
        let grown = (f64::from(current) * self.iter_grow).floor();
        clamp(grown, f64::from(self.iter_min), f64::from(self.iter_max)) as u32
    }
}

/// Something the user did to the displayed image.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Interaction {
    /// A click at (`px`, `py`) on the displayed image, in the image's
    /// natural pixel dimensions, which may differ from the requested
    /// raster when the image has been scaled by the host.
    Click {
        /// Column of the click.
        px: f64,
        /// Row of the click.
        py: f64,
        /// Natural width of the displayed image.
        natural_width: u32,
        /// Natural height of the displayed image.
        natural_height: u32,
    },
    /// Mouse wheel over the canvas at (`px`, `py`).  Positive notches
    /// zoom in, negative notches zoom out.
    Wheel {
        /// Column under the cursor.
        px: f64,
        /// Row under the cursor.
        py: f64,
        /// Number of wheel notches.
        notches: i32,
    },
    /// A drag by (`dx`, `dy`) pixels.  The content follows the cursor.
    Pan {
        /// Horizontal drag distance.
        dx: f64,
        /// Vertical drag distance.
        dy: f64,
    },
    /// The canvas changed size.
    Resize {
        /// New raster width.
        width: u32,
        /// New raster height.
        height: u32,
    },
    /// Return to the starting view.
    Reset,
}

/// Computes the request that follows `current` once `event` happens.
/// `home` is the request `Reset` returns to.
pub fn next_request(
    home: &RenderRequest,
    current: &RenderRequest,
    event: &Interaction,
    config: &ZoomConfig,
) -> Result<RenderRequest> {
    let viewport = current.viewport();
    match *event {
        Interaction::Click {
            px,
            py,
            natural_width,
            natural_height,
        } => {
            if natural_width == 0 || natural_height == 0 {
                return Err(RenderError::invalid("natural image size must be positive"));
            }
            let mapper = PlaneMapper::new(natural_width as usize, natural_height as usize, viewport);
            let target = mapper.subpixel_to_point(px, py);
            let zoomed = Viewport::new(target.re, target.im, viewport.scale * config.zoom_factor);
            RenderRequest::new(
                zoomed,
                current.width(),
                current.height(),
                config.grow_iterations(current.max_iterations()),
            )
        }
        Interaction::Wheel { px, py, notches } => {
            let cursor = current.mapper().subpixel_to_point(px, py);
            let scale = viewport.scale / config.wheel_factor.powi(notches);
            let ratio = scale / viewport.scale;
            let center = cursor - (cursor - viewport.center()) * ratio;
            current.with_viewport(Viewport::new(center.re, center.im, scale))
        }
        Interaction::Pan { dx, dy } => {
            let mapper = current.mapper();
            let shift: Complex<f64> =
                mapper.subpixel_to_point(dx, dy) - mapper.subpixel_to_point(0.0, 0.0);
            let center = viewport.center() - shift;
            current.with_viewport(Viewport::new(center.re, center.im, viewport.scale))
        }
        Interaction::Resize { width, height } => {
            RenderRequest::new(viewport, width, height, current.max_iterations())
        }
        Interaction::Reset => Ok(*home),
    }
}

/// The explorer's view: where it started and where it is now.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ViewportState {
    home: RenderRequest,
    current: RenderRequest,
}

impl ViewportState {
    /// A fresh state looking at `home`.
    pub fn new(home: RenderRequest) -> ViewportState {
        ViewportState {
            home,
            current: home,
        }
    }

    /// The request describing what should be on screen.
    pub fn request(&self) -> &RenderRequest {
        &self.current
    }

    /// The state after `event`.  An invalid outcome leaves nothing
    /// changed and is reported to the caller.
    pub fn apply(&self, event: &Interaction, config: &ZoomConfig) -> Result<ViewportState> {
        let current = next_request(&self.home, &self.current, event, config)?;
        Ok(ViewportState {
            home: self.home,
            current,
        })
    }

    /// Click-to-zoom on an image with the given natural size.
    pub fn click(
        &self,
        px: f64,
        py: f64,
        natural: (u32, u32),
        config: &ZoomConfig,
    ) -> Result<ViewportState> {
        self.apply(
            &Interaction::Click {
                px,
                py,
                natural_width: natural.0,
                natural_height: natural.1,
            },
            config,
        )
    }

    /// Wheel zoom about the cursor.
    pub fn wheel(&self, px: f64, py: f64, notches: i32, config: &ZoomConfig) -> Result<ViewportState> {
        self.apply(&Interaction::Wheel { px, py, notches }, config)
    }

    /// Drag the view by a number of pixels.
    pub fn pan(&self, dx: f64, dy: f64, config: &ZoomConfig) -> Result<ViewportState> {
        self.apply(&Interaction::Pan { dx, dy }, config)
    }

    /// Back to the starting view.
    pub fn reset(&self) -> ViewportState {
        ViewportState::new(self.home)
    }
}

/// Where the current render stands.
#[derive(Clone, Debug, PartialEq)]
pub enum JobStatus {
    /// Nothing has been submitted, or the last result was collected.
    Idle,
    /// Rows are still outstanding.
    InProgress {
        /// Generation of the job.
        generation: u64,
        /// Fraction complete.
        progress: f64,
    },
    /// The render finished.
    Complete {
        /// Generation of the job.
        generation: u64,
        /// The finished image.
        image: RenderedImage,
    },
}

/// Holds at most one incremental render.  Submitting a new request
/// abandons whatever was in flight; its partial buffer is dropped and
/// never surfaces.
#[derive(Debug)]
pub struct RenderJobs {
    rows_per_chunk: usize,
    generation: u64,
    active: Option<ChunkedRender>,
}

impl RenderJobs {
    /// Jobs that render `rows_per_chunk` rows per step.
    pub fn new(rows_per_chunk: usize) -> RenderJobs {
        RenderJobs {
            rows_per_chunk,
            generation: 0,
            active: None,
        }
    }

    /// Starts rendering `request`, superseding any unfinished job, and
    /// returns the new job's generation.
    pub fn submit(&mut self, request: RenderRequest) -> u64 {
        if let Some(stale) = self.active.take() {
            debug!(
                "Abandoning render {} at {:.0}%",
                self.generation,
                stale.progress() * 100.0
            );
        }
        self.generation += 1;
        self.active = Some(ChunkedRender::new(request, self.rows_per_chunk));
        self.generation
    }

    /// The generation of the most recent submission.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// True if `generation` is still the newest job.
    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.generation
    }

    /// Does one chunk of work on the current job.
    pub fn step(&mut self) -> JobStatus {
        let generation = self.generation;
        let finished = match self.active {
            None => return JobStatus::Idle,
            Some(ref mut job) => {
                job.step();
                job.is_complete()
            }
        };
        if !finished {
            let progress = self.active.as_ref().map_or(0.0, |job| job.progress());
            return JobStatus::InProgress {
                generation,
                progress,
            };
        }
        match self.active.take().and_then(ChunkedRender::into_image) {
            Some(image) => JobStatus::Complete { generation, image },
            None => JobStatus::Idle,
        }
    }
}

/// An interactive explorer: the view state, the zoom settings, the
/// render in flight, and a one-line status for the user.
#[derive(Debug)]
pub struct Session {
    state: ViewportState,
    config: ZoomConfig,
    jobs: RenderJobs,
    status: String,
}

impl Session {
    /// Starts a session on `home` and queues its first render.
    pub fn new(home: RenderRequest, config: ZoomConfig, rows_per_chunk: usize) -> Result<Session> {
        config.validate()?;
        let mut jobs = RenderJobs::new(rows_per_chunk);
        jobs.submit(home);
        Ok(Session {
            state: ViewportState::new(home),
            config,
            jobs,
            status: "Rendering...".to_string(),
        })
    }

    /// The current view.
    pub fn state(&self) -> &ViewportState {
        &self.state
    }

    /// A line of text describing what the session is doing.
    pub fn status(&self) -> &str {
        &self.status
    }

    /// Applies an interaction.  A valid one replaces the render in
    /// flight; an invalid one leaves the view alone and says why.
    pub fn interact(&mut self, event: &Interaction) -> Result<()> {
        match self.state.apply(event, &self.config) {
            Ok(state) => {
                self.state = state;
                self.jobs.submit(*state.request());
                self.status = "Rendering...".to_string();
                Ok(())
            }
            Err(e) => {
                warn!("Rejected {:?}: {}", event, e);
                self.status = format!("Render failed: {}", e);
                Err(e)
            }
        }
    }

    /// Lets the render make one chunk of progress.  Returns the image
    /// when it is done.
    pub fn pump(&mut self) -> Option<RenderedImage> {
        match self.jobs.step() {
            JobStatus::Idle => None,
            JobStatus::InProgress { progress, .. } => {
                self.status = format!("Rendering... {:.0}%", progress * 100.0);
                None
            }
            JobStatus::Complete { image, .. } => {
                self.status = format!("{}", self.state);
                Some(image)
            }
        }
    }
}

impl fmt::Display for ViewportState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let request = &self.current;
        let viewport = request.viewport();
        write!(
            f,
            "center ({}, {}) scale {:.2e}, {} iterations",
            viewport.x_center,
            viewport.y_center,
            viewport.scale,
            request.max_iterations()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use render::render;

    fn request(x: f64, y: f64, scale: f64, width: u32, height: u32, iterations: u32) -> RenderRequest {
        RenderRequest::new(Viewport::new(x, y, scale), width, height, iterations).unwrap()
    }

    #[test]
    fn click_at_center_zooms_in_place() {
        let state = ViewportState::new(request(0.0, 0.0, 2.0, 101, 101, 100));
        let next = state.click(50.0, 50.0, (101, 101), &ZoomConfig::default()).unwrap();
        assert_eq!(next.request().viewport(), Viewport::new(0.0, 0.0, 0.5));
        assert_eq!(next.request().max_iterations(), 125);
    }

    #[test]
    fn click_near_center_of_even_raster() {
        // With an even raster the middle pixel is half a pixel off center.
        let state = ViewportState::new(request(0.0, 0.0, 2.0, 100, 100, 100));
        let next = state.click(50.0, 50.0, (100, 100), &ZoomConfig::default()).unwrap();
        let viewport = next.request().viewport();
        let pixel = 4.0 / 99.0;
        assert_eq!(viewport.scale, 0.5);
        assert!(viewport.x_center.abs() <= pixel);
        assert!(viewport.y_center.abs() <= pixel);
    }

    #[test]
    fn click_uses_natural_dimensions() {
        // The image was requested at 200x200 but delivered at 101x101.
        let state = ViewportState::new(request(0.0, 0.0, 2.0, 200, 200, 100));
        let next = state.click(100.0, 0.0, (101, 101), &ZoomConfig::default()).unwrap();
        assert_eq!(next.request().viewport().center(), Complex::new(2.0, -2.0));
        assert_eq!(next.request().width(), 200);
    }

    #[test]
    fn click_on_unloaded_image_is_ignored() {
        let home = request(0.0, 0.0, 2.0, 100, 100, 100);
        let state = ViewportState::new(home);
        for &natural in &[(0, 0), (0, 100), (100, 0)] {
            let err = state.click(10.0, 10.0, natural, &ZoomConfig::default()).unwrap_err();
            assert!(err.is_client_error());
        }
        assert_eq!(*state.request(), home);

        let mut session = Session::new(home, ZoomConfig::default(), 100).unwrap();
        let event = Interaction::Click {
            px: 10.0,
            py: 10.0,
            natural_width: 0,
            natural_height: 0,
        };
        assert!(session.interact(&event).is_err());
        assert_eq!(*session.state().request(), home);
        assert!(session.status().contains("natural image size"));
    }

    #[test]
    fn iteration_growth_is_clamped() {
        let config = ZoomConfig::default();
        assert_eq!(config.grow_iterations(4), 10);
        assert_eq!(config.grow_iterations(300), 375);
        assert_eq!(config.grow_iterations(301), 376);
        assert_eq!(config.grow_iterations(1900), 2000);
    }

    #[test]
    fn custom_zoom_settings_apply() {
        let config = ZoomConfig {
            zoom_factor: 0.5,
            iter_grow: 2.0,
            iter_min: 1,
            iter_max: 150,
            ..ZoomConfig::default()
        };
        let state = ViewportState::new(request(0.0, 0.0, 2.0, 101, 101, 100));
        let next = state.click(50.0, 50.0, (101, 101), &config).unwrap();
        assert_eq!(next.request().viewport().scale, 1.0);
        assert_eq!(next.request().max_iterations(), 150);
    }

    #[test]
    fn wheel_keeps_cursor_point_fixed() {
        let config = ZoomConfig::default();
        let state = ViewportState::new(request(-0.5, 0.0, 1.5, 800, 600, 100));
        let (px, py) = (123.0, 456.0);
        let before = state.request().mapper().subpixel_to_point(px, py);
        for &notches in &[1, -1, 3, -2] {
            let next = state.wheel(px, py, notches, &config).unwrap();
            let after = next.request().mapper().subpixel_to_point(px, py);
            assert!((after - before).norm() < 1e-12);
            let expected = 1.5 / 1.2_f64.powi(notches);
            assert!((next.request().viewport().scale - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn wheel_in_then_out_restores_scale() {
        let config = ZoomConfig::default();
        let state = ViewportState::new(request(0.0, 0.0, 1.0, 64, 64, 50));
        let back = state
            .wheel(10.0, 20.0, 1, &config)
            .and_then(|s| s.wheel(10.0, 20.0, -1, &config))
            .unwrap();
        assert!((back.request().viewport().scale - 1.0).abs() < 1e-12);
        assert!(back.request().viewport().center().norm() < 1e-12);
        assert_eq!(back.request().max_iterations(), 50);
    }

    #[test]
    fn pan_moves_content_with_the_cursor() {
        let config = ZoomConfig::default();
        // 5x5 pixels over [-2, 2]: one pixel is one plane unit.
        let state = ViewportState::new(request(0.0, 0.0, 2.0, 5, 5, 50));
        let next = state.pan(1.0, -2.0, &config).unwrap();
        assert_eq!(next.request().viewport(), Viewport::new(-1.0, 2.0, 2.0));
    }

    #[test]
    fn reset_returns_home() {
        let config = ZoomConfig::default();
        let home = request(-0.5, 0.0, 1.5, 80, 60, 100);
        let state = ViewportState::new(home)
            .click(3.0, 4.0, (80, 60), &config)
            .unwrap();
        assert_ne!(*state.request(), home);
        assert_eq!(*state.reset().request(), home);
        assert_eq!(*state.apply(&Interaction::Reset, &config).unwrap().request(), home);
    }

    #[test]
    fn resize_rejects_empty_canvas() {
        let state = ViewportState::new(request(0.0, 0.0, 1.0, 10, 10, 10));
        let event = Interaction::Resize { width: 0, height: 10 };
        assert!(state.apply(&event, &ZoomConfig::default()).is_err());
        let event = Interaction::Resize { width: 20, height: 5 };
        let next = state.apply(&event, &ZoomConfig::default()).unwrap();
        assert_eq!((next.request().width(), next.request().height()), (20, 5));
    }

    #[test]
    fn bad_configs_are_rejected() {
        let mut config = ZoomConfig::default();
        assert!(config.validate().is_ok());
        config.iter_min = 3000;
        assert!(config.validate().is_err());
        let config = ZoomConfig {
            zoom_factor: 0.0,
            ..ZoomConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn newer_submission_supersedes_older() {
        let first = request(-0.5, 0.0, 1.5, 20, 20, 30);
        let second = request(0.0, 0.0, 0.5, 20, 20, 30);
        let mut jobs = RenderJobs::new(5);
        let old = jobs.submit(first);
        match jobs.step() {
            JobStatus::InProgress { generation, .. } => assert_eq!(generation, old),
            other => panic!("unexpected {:?}", other),
        }
        let new = jobs.submit(second);
        assert!(!jobs.is_current(old));
        assert!(jobs.is_current(new));

        let image = loop {
            match jobs.step() {
                JobStatus::Complete { generation, image } => {
                    assert_eq!(generation, new);
                    break image;
                }
                JobStatus::InProgress { generation, .. } => assert_eq!(generation, new),
                JobStatus::Idle => panic!("job vanished"),
            }
        };
        assert_eq!(image, render(&second));
        assert_eq!(jobs.step(), JobStatus::Idle);
    }

    #[test]
    fn session_reports_progress_and_failures() {
        let home = request(-0.5, 0.0, 1.5, 16, 8, 20);
        let mut session = Session::new(home, ZoomConfig::default(), 4).unwrap();
        assert_eq!(session.pump(), None);
        assert_eq!(session.status(), "Rendering... 50%");
        assert_eq!(session.pump(), Some(render(&home)));

        let event = Interaction::Resize { width: 0, height: 0 };
        assert!(session.interact(&event).is_err());
        assert!(session.status().starts_with("Render failed"));
        assert_eq!(*session.state().request(), home);

        session
            .interact(&Interaction::Wheel {
                px: 8.0,
                py: 4.0,
                notches: 2,
            })
            .unwrap();
        let image = loop {
            if let Some(image) = session.pump() {
                break image;
            }
        };
        assert_eq!(image, render(session.state().request()));
        assert!(session.status().contains("20 iterations"));
    }
}
