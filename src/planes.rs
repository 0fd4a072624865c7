// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Contains the PlaneMapper struct, which describes a relationship
//! between a raster with an origin at 0,0 and a viewport on the
//! complex plane described by a center point and a half-width scale.
//! The vertical extent of the viewport follows from the raster's
//! aspect ratio, so pixels are always square in plane units.
use num::Complex;

/// A window onto the complex plane.  `scale` is the half-width of the
/// visible real-axis range; the half-height is derived from whatever
/// raster the viewport is mapped onto.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Viewport {
    /// Real component of the center point.
    pub x_center: f64,
    /// Imaginary component of the center point.
    pub y_center: f64,
    /// Half-width of the visible real-axis range.
    pub scale: f64,
}

impl Viewport {
    /// Constructor.  No validation happens here; a viewport only becomes
    /// meaningful once it is part of a validated `RenderRequest`.
    pub fn new(x_center: f64, y_center: f64, scale: f64) -> Viewport {
        Viewport {
            x_center,
            y_center,
            scale,
        }
    }

    /// The center of the viewport as a complex number.
    pub fn center(&self) -> Complex<f64> {
        Complex::new(self.x_center, self.y_center)
    }
}

impl Default for Viewport {
    /// The classic full view of the set.
    fn default() -> Viewport {
        Viewport::new(-0.5, 0.0, 1.5)
    }
}

/// Describes the width and height of an integral plane that is assumed to start at
/// 0,0 and all values are assumed to be non-negative integers.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct IntegralPlane(pub usize, pub usize);

/// Describes the x, y of a pixel in a raster.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Pixel(pub usize, pub usize);

/// Maps pixels of a raster onto a viewport of the complex plane and
/// back again.  Pixel (0, 0) lands on the minimum corner and pixel
/// (width - 1, height - 1) on the maximum corner.
#[derive(Copy, Clone, Debug)]
pub struct PlaneMapper {
    /// The size of the raster.
    pub integral_plane: IntegralPlane,
    /// The viewport the raster covers.
    pub viewport: Viewport,
    x_min: f64,
    x_max: f64,
    y_min: f64,
    y_max: f64,
}

impl PlaneMapper {
    /// Constructor.  Takes the raster dimensions and the viewport, and
    /// precomputes the bounds of the visible region.
    pub fn new(width: usize, height: usize, viewport: Viewport) -> PlaneMapper {
        let y_scale = if width == 0 {
            viewport.scale
        } else {
            viewport.scale * (height as f64) / (width as f64)
        };
        PlaneMapper {
            integral_plane: IntegralPlane(width, height),
            viewport,
            x_min: viewport.x_center - viewport.scale,
            x_max: viewport.x_center + viewport.scale,
            y_min: viewport.y_center - y_scale,
            y_max: viewport.y_center + y_scale,
        }
    }

    /// The total number of points in the integral grid.  Used to
    /// calculate memory needs.
    pub fn len(&self) -> usize {
        self.integral_plane.0 * self.integral_plane.1
    }

    /// Describes that the integral plane is of a size.
    pub fn is_empty(&self) -> bool {
        self.integral_plane.0 == 0 || self.integral_plane.1 == 0
    }

    /// The minimum and maximum corners of the visible region.
    pub fn bounds(&self) -> (Complex<f64>, Complex<f64>) {
        (
            Complex::new(self.x_min, self.y_min),
            Complex::new(self.x_max, self.y_max),
        )
    }

    /// Given a pixel on the integral cartesian plane, return the point
    /// on the complex plane it samples.
    pub fn pixel_to_point(&self, pixel: &Pixel) -> Complex<f64> {
        self.subpixel_to_point(pixel.0 as f64, pixel.1 as f64)
    }

    /// Same as `pixel_to_point`, but for fractional pixel positions such
    /// as the location of a mouse click on a scaled image.  A raster one
    /// pixel wide (or tall) maps everything to the minimum bound on that
    /// axis.
    pub fn subpixel_to_point(&self, px: f64, py: f64) -> Complex<f64> {
        let (width, height) = (self.integral_plane.0, self.integral_plane.1);
        let x = if width <= 1 {
            self.x_min
        } else {
            self.x_min + (self.x_max - self.x_min) * px / ((width - 1) as f64)
        };
        let y = if height <= 1 {
            self.y_min
        } else {
            self.y_min + (self.y_max - self.y_min) * py / ((height - 1) as f64)
        };
        Complex::new(x, y)
    }

    /// The inverse of `subpixel_to_point`: where on the raster a point
    /// of the complex plane falls, in fractional pixels.  The result may
    /// lie outside the raster.
    pub fn point_to_subpixel(&self, point: &Complex<f64>) -> (f64, f64) {
        let (width, height) = (self.integral_plane.0, self.integral_plane.1);
        let px = if width <= 1 {
            0.0
        } else {
            (point.re - self.x_min) * ((width - 1) as f64) / (self.x_max - self.x_min)
        };
        let py = if height <= 1 {
            0.0
        } else {
            (point.im - self.y_min) * ((height - 1) as f64) / (self.y_max - self.y_min)
        };
        (px, py)
    }

    /// Given a complex number, find the pixel whose sample point lies
    /// nearest to it, or None if it falls outside the raster.
    pub fn point_to_pixel(&self, point: &Complex<f64>) -> Option<Pixel> {
        let (px, py) = self.point_to_subpixel(point);
        let (left, top) = (px.round(), py.round());
        if left < 0.0
            || top < 0.0
            || left >= (self.integral_plane.0 as f64)
            || top >= (self.integral_plane.1 as f64)
        {
            return None;
        }
        Some(Pixel(left as usize, top as usize))
    }

    /// The linear, row-major offset of a pixel from the root of the
    /// image buffer.
    pub fn offset(&self, pixel: &Pixel) -> usize {
        pixel.1 * self.integral_plane.0 + pixel.0
    }
}

/// Maps a (possibly fractional) pixel coordinate on a `width` by
/// `height` raster to a point on the complex plane.
pub fn pixel_to_point(
    px: f64,
    py: f64,
    width: usize,
    height: usize,
    viewport: &Viewport,
) -> Complex<f64> {
    PlaneMapper::new(width, height, *viewport).subpixel_to_point(px, py)
}
