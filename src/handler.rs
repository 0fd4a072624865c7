// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The server-side entry point, independent of any web framework.  A
//! host hands over the query string of an incoming request and gets
//! back a status code, headers and a body it can send as-is.

use num::clamp;
use num_cpus;
use std::borrow::Cow;
use std::str::FromStr;
use url::form_urlencoded;

use encode::{encode_png, encode_png_with_bracket};
use errors::{RenderError, Result};
use planes::Viewport;
use render::{render_threaded, RenderRequest};

/// Hard limits on what a single request may ask for.  Requests outside
/// these ranges are pulled back inside rather than refused.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ServerLimits {
    /// Smallest width or height served.
    pub min_dimension: u32,
    /// Largest width or height served.
    pub max_dimension: u32,
    /// Smallest iteration budget served.
    pub min_iterations: u32,
    /// Largest iteration budget served.
    pub max_iterations: u32,
}

impl Default for ServerLimits {
    fn default() -> ServerLimits {
        ServerLimits {
            min_dimension: 50,
            max_dimension: 2000,
            min_iterations: 10,
            max_iterations: 20_000,
        }
    }
}

/// How the handler renders and packages images.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ServerConfig {
    /// Bounds applied to incoming parameters.
    pub limits: ServerLimits,
    /// Draw the scale bracket on served images.
    pub bracket: bool,
    /// Worker threads per render.
    pub threads: usize,
}

impl Default for ServerConfig {
    fn default() -> ServerConfig {
        ServerConfig {
            limits: ServerLimits::default(),
            bracket: true,
            threads: num_cpus::get(),
        }
    }
}

/// What the host should send back.
#[derive(Clone, Debug, PartialEq)]
pub struct Response {
    /// HTTP status code.
    pub status: u16,
    /// Response headers, in order.
    pub headers: Vec<(String, String)>,
    /// Response body.
    pub body: Vec<u8>,
}

impl Response {
    fn png(body: Vec<u8>) -> Response {
        Response {
            status: 200,
            headers: vec![
                ("Content-Type".to_string(), "image/png".to_string()),
                ("Cache-Control".to_string(), "public, max-age=3600".to_string()),
            ],
            body,
        }
    }

    fn text(status: u16, message: &str) -> Response {
        Response {
            status,
            headers: vec![("Content-Type".to_string(), "text/plain".to_string())],
            body: message.as_bytes().to_vec(),
        }
    }

    /// The value of the first header called `name`, ignoring case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|&&(ref key, _)| key.eq_ignore_ascii_case(name))
            .map(|pair| pair.1.as_str())
    }
}

/// Everything after the first `?`, or the whole string if there is none.
fn query_of(target: &str) -> &str {
    match target.find('?') {
        Some(index) => &target[index + 1..],
        None => target,
    }
}

/// Finds the first value for `name`, parsed as `T`, or `default` if the
/// parameter is absent.
fn param<T: FromStr>(pairs: &[(Cow<str>, Cow<str>)], name: &str, default: T) -> Result<T> {
    match pairs.iter().find(|&&(ref key, _)| key == name) {
        None => Ok(default),
        Some(&(_, ref value)) => T::from_str(value.trim()).map_err(|_| RenderError::BadParameter {
            name: name.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Rejects non-positive values, then pulls the rest into `[low, high]`.
fn bounded(name: &str, value: i64, low: u32, high: u32) -> Result<u32> {
    if value <= 0 {
        return Err(RenderError::invalid(format!(
            "{} must be positive, got {}",
            name, value
        )));
    }
    let kept = clamp(value, i64::from(low), i64::from(high));
    if kept != value {
        warn!("Clamped {} from {} to {}", name, value, kept);
    }
    Ok(kept as u32)
}

/// Turns a query string (or a full request target) into a validated
/// render request.  Missing parameters take the classic full-set view
/// at 800x600 with 300 iterations.
pub fn parse_request(target: &str, limits: &ServerLimits) -> Result<RenderRequest> {
    let pairs: Vec<(Cow<str>, Cow<str>)> = form_urlencoded::parse(query_of(target).as_bytes()).collect();

    let width = param::<i64>(&pairs, "width", 800)?;
    let height = param::<i64>(&pairs, "height", 600)?;
    let max_iter = param::<i64>(&pairs, "max_iter", 300)?;
    let x_center = param::<f64>(&pairs, "x_center", -0.5)?;
    let y_center = param::<f64>(&pairs, "y_center", 0.0)?;
    let scale = param::<f64>(&pairs, "scale", 1.5)?;

    let width = bounded("width", width, limits.min_dimension, limits.max_dimension)?;
    let height = bounded("height", height, limits.min_dimension, limits.max_dimension)?;
    let max_iter = bounded("max_iter", max_iter, limits.min_iterations, limits.max_iterations)?;

    RenderRequest::new(Viewport::new(x_center, y_center, scale), width, height, max_iter)
}

/// Serves one render.  Bad parameters get a 400 with a plain-text
/// explanation and no image; an encoder failure gets a 500.
pub fn handle(target: &str, config: &ServerConfig) -> Response {
    let request = match parse_request(target, &config.limits) {
        Ok(request) => request,
        Err(e) => {
            info!("Rejected render request '{}': {}", target, e);
            return respond(Err(e));
        }
    };

    let image = render_threaded(&request, config.threads);
    let encoded = if config.bracket {
        encode_png_with_bracket(&image, request.viewport().scale)
    } else {
        encode_png(&image)
    };
    respond(encoded)
}

/// Packages the outcome of a render.  Client errors are explained to
/// the client; anything else is logged here and reported only as a
/// generic failure.
fn respond(outcome: Result<Vec<u8>>) -> Response {
    match outcome {
        Ok(body) => Response::png(body),
        Err(ref e) if e.is_client_error() => Response::text(400, &format!("{}", e)),
        Err(e) => {
            error!("Render succeeded but encoding failed: {}", e);
            Response::text(500, "Could not encode image")
        }
    }
}
