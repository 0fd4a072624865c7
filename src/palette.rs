// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Maps escape times to colors.  The iteration count is normalized
//! against the budget, square-rooted to spread out the low counts
//! where most of the image lives, and fed through three clamped linear
//! ramps: red fades out, blue fades in, and green dips to zero in the
//! middle of the range.

use num::clamp;

/// An 8-bit RGBA color.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Color {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel; always opaque for rendered pixels.
    pub a: u8,
}

impl Color {
    /// An opaque color.
    pub fn rgb(r: u8, g: u8, b: u8) -> Color {
        Color { r, g, b, a: 255 }
    }

    /// The four channels in memory order.
    pub fn to_rgba(&self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

#[inline]
fn channel(ramp: f64) -> u8 {
    (255.0 * clamp(ramp, 0.0, 1.0)).round() as u8
}

/// The color of a pixel whose point took `iterations` steps to escape,
/// out of a budget of `max_iterations`.
pub fn color(iterations: u32, max_iterations: u32) -> Color {
    let norm = if max_iterations == 0 {
        1.0
    } else {
        clamp(f64::from(iterations) / f64::from(max_iterations), 0.0, 1.0)
    };
    let n = norm.sqrt();
    Color::rgb(
        channel(3.0 * (1.0 - n)),
        channel(3.0 * (n - 0.5).abs()),
        channel(3.0 * n),
    )
}
