// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The escape-time test.  A point `c` on the complex plane belongs to
//! the Mandelbrot set if the orbit of zero under `z -> z * z + c`
//! stays bounded.  Once `|z|` exceeds 2 the orbit is guaranteed to
//! diverge, so the number of steps taken before that happens is a
//! useful measure of how far `c` lies from the set.

use num::Complex;

/// The squared escape radius.  Comparing squared magnitudes avoids a
/// square root per step.
pub const ESCAPE_RADIUS_SQR: f64 = 4.0;

/// Iterate the orbit of zero for the point `(x0, y0)` and return the
/// number of steps taken while the orbit stayed within the escape
/// radius, up to `max_iterations`.  A result equal to `max_iterations`
/// means the point did not escape within budget.
pub fn escape_iterations(x0: f64, y0: f64, max_iterations: u32) -> u32 {
    escape_time(Complex::new(x0, y0), max_iterations)
}

/// `escape_iterations` for a point already expressed as a complex number.
#[inline]
pub fn escape_time(c: Complex<f64>, max_iterations: u32) -> u32 {
    resume_orbit(c, Complex::new(0.0, 0.0), 0, max_iterations).1
}

/// Picks up the orbit of `c` at `z`, after `iterations` steps, and runs
/// it until it escapes or reaches `max_iterations` steps.  Returns the
/// last `z` and the step count.  An orbit that has already escaped, or
/// already used up the budget, comes back untouched.
#[inline]
pub fn resume_orbit(
    c: Complex<f64>,
    z: Complex<f64>,
    iterations: u32,
    max_iterations: u32,
) -> (Complex<f64>, u32) {
    let mut z = z;
    let mut iterations = iterations;
    while z.norm_sqr() <= ESCAPE_RADIUS_SQR && iterations < max_iterations {
        z = Complex::new(z.re * z.re - z.im * z.im + c.re, 2.0 * z.re * z.im + c.im);
        iterations += 1;
    }
    (z, iterations)
}

/// True once `z` lies outside the escape radius.
#[inline]
pub fn has_escaped(z: Complex<f64>) -> bool {
    z.norm_sqr() > ESCAPE_RADIUS_SQR
}
