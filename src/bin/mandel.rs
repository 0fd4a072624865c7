extern crate clap;
extern crate env_logger;
#[macro_use]
extern crate log;
extern crate mandelview;
extern crate num_cpus;

use clap::{App, Arg, ArgMatches};
use mandelview::{
    handle, render_threaded, save_png, RenderRequest, ServerConfig, Viewport, ViewportState,
    ZoomConfig,
};
use std::fs::File;
use std::io::Write;
use std::str::FromStr;

fn parse_pair<T>(s: &str, separator: char) -> Option<(T, T)>
where
    T: FromStr,
{
    match s.find(separator) {
        None => None,
        Some(index) => match (T::from_str(&s[..index]), T::from_str(&s[index + 1..])) {
            (Ok(l), Ok(r)) => Some((l, r)),
            _ => None,
        },
    }
}

fn validate_pair<T: FromStr>(s: &str, separator: char, err: &str) -> Result<(), String> {
    match parse_pair::<T>(s, separator) {
        Some(_) => Ok(()),
        None => Err(err.to_string()),
    }
}

fn validate_range<T: FromStr + PartialOrd>(
    s: &str,
    low: T,
    high: T,
    isnotanumber_err: &str,
    isnotinrange_err: &str,
) -> Result<(), String> {
    match T::from_str(s) {
        Ok(i) => {
            if i >= low && i <= high {
                Ok(())
            } else {
                Err(isnotinrange_err.to_string())
            }
        }
        Err(_) => Err(isnotanumber_err.to_string()),
    }
}

fn validate_positive(s: &str, err: &str) -> Result<(), String> {
    match f64::from_str(s) {
        Ok(v) if v > 0.0 && v.is_finite() => Ok(()),
        _ => Err(err.to_string()),
    }
}

const OUTPUT: &str = "output";
const SIZE: &str = "size";
const CENTER: &str = "center";
const SCALE: &str = "scale";
const ITERATIONS: &str = "iterations";
const THREADS: &str = "threads";
const CLICK: &str = "click";
const ZOOM_FACTOR: &str = "zoom-factor";
const ITER_GROW: &str = "iter-grow";
const ITER_MIN: &str = "iter-min";
const ITER_MAX: &str = "iter-max";
const BRACKET: &str = "bracket";
const QUERY: &str = "query";
const VERBOSE: &str = "verbose";

fn args<'a>() -> ArgMatches<'a> {
    let max_threads = num_cpus::get();

    App::new("mandel")
        .version("0.1.0")
        .author("Elf M. Sternberg <elf.sternberg@gmail.com>")
        .about("Mandelbrot renderer")
        .arg(
            Arg::with_name(OUTPUT)
                .required(true)
                .long(OUTPUT)
                .short("o")
                .takes_value(true)
                .help("Output PNG file"),
        )
        .arg(
            Arg::with_name(SIZE)
                .long(SIZE)
                .short("s")
                .takes_value(true)
                .default_value("800x600")
                .validator(|s| validate_pair::<u32>(&s, 'x', "Could not parse output image size"))
                .help("Size of output image"),
        )
        .arg(
            Arg::with_name(CENTER)
                .long(CENTER)
                .short("c")
                .takes_value(true)
                .allow_hyphen_values(true)
                .default_value("-0.5,0.0")
                .validator(|s| validate_pair::<f64>(&s, ',', "Could not parse center point"))
                .help("Center of the view on the complex plane, as re,im"),
        )
        .arg(
            Arg::with_name(SCALE)
                .long(SCALE)
                .short("z")
                .takes_value(true)
                .default_value("1.5")
                .validator(|s| validate_positive(&s, "Scale must be a positive number"))
                .help("Half-width of the view along the real axis"),
        )
        .arg(
            Arg::with_name(ITERATIONS)
                .long(ITERATIONS)
                .short("i")
                .takes_value(true)
                .default_value("300")
                .validator(|s| {
                    validate_range(
                        &s,
                        1,
                        200_000,
                        "Could not parse iteration count",
                        "Iteration count must be between 1 and 200000",
                    )
                })
                .help("Maximum iterations per pixel"),
        )
        .arg(
            Arg::with_name(THREADS)
                .long(THREADS)
                .short("t")
                .takes_value(true)
                .default_value("1")
                .validator(move |s| {
                    validate_range(
                        &s,
                        1,
                        max_threads,
                        "Could not parse thread count",
                        &format!("Thread count must be between 1 and {}", max_threads),
                    )
                })
                .help("Number of threads to use in solver"),
        )
        .arg(
            Arg::with_name(CLICK)
                .long(CLICK)
                .takes_value(true)
                .multiple(true)
                .number_of_values(1)
                .validator(|s| validate_pair::<f64>(&s, ',', "Could not parse click position"))
                .help("Click-to-zoom at pixel px,py before rendering; may be repeated"),
        )
        .arg(
            Arg::with_name(ZOOM_FACTOR)
                .long(ZOOM_FACTOR)
                .takes_value(true)
                .default_value("0.25")
                .validator(|s| validate_positive(&s, "Zoom factor must be a positive number"))
                .help("Scale multiplier applied per click"),
        )
        .arg(
            Arg::with_name(ITER_GROW)
                .long(ITER_GROW)
                .takes_value(true)
                .default_value("1.25")
                .validator(|s| validate_positive(&s, "Iteration growth must be a positive number"))
                .help("Iteration multiplier applied per click"),
        )
        .arg(
            Arg::with_name(ITER_MIN)
                .long(ITER_MIN)
                .takes_value(true)
                .default_value("10")
                .validator(|s| {
                    validate_range(
                        &s,
                        1,
                        200_000,
                        "Could not parse iteration minimum",
                        "Iteration minimum must be between 1 and 200000",
                    )
                })
                .help("Lowest iteration count a click can produce"),
        )
        .arg(
            Arg::with_name(ITER_MAX)
                .long(ITER_MAX)
                .takes_value(true)
                .default_value("2000")
                .validator(|s| {
                    validate_range(
                        &s,
                        1,
                        200_000,
                        "Could not parse iteration maximum",
                        "Iteration maximum must be between 1 and 200000",
                    )
                })
                .help("Highest iteration count a click can produce"),
        )
        .arg(
            Arg::with_name(BRACKET)
                .long(BRACKET)
                .short("b")
                .help("Draw the scale bracket and label on the image"),
        )
        .arg(
            Arg::with_name(QUERY)
                .long(QUERY)
                .short("q")
                .takes_value(true)
                .help("Render through the server handler from a query string; view options are ignored"),
        )
        .arg(
            Arg::with_name(VERBOSE)
                .long(VERBOSE)
                .short("v")
                .help("Log each render step"),
        )
        .get_matches()
}

// Every value read below has a default or a validator, so clap has
// already guaranteed it parses.
fn value<T: FromStr>(matches: &ArgMatches, name: &str) -> T {
    match matches.value_of(name).map(T::from_str) {
        Some(Ok(v)) => v,
        _ => fail(&format!("Could not parse {}", name)),
    }
}

fn fail(message: &str) -> ! {
    eprintln!("{}", message);
    std::process::exit(1);
}

fn zoom_config(matches: &ArgMatches) -> ZoomConfig {
    ZoomConfig {
        zoom_factor: value(matches, ZOOM_FACTOR),
        iter_grow: value(matches, ITER_GROW),
        iter_min: value(matches, ITER_MIN),
        iter_max: value(matches, ITER_MAX),
        ..ZoomConfig::default()
    }
}

fn run_query(matches: &ArgMatches, outfile: &str, threads: usize) {
    let config = ServerConfig {
        bracket: matches.is_present(BRACKET),
        threads,
        ..ServerConfig::default()
    };
    let response = handle(matches.value_of(QUERY).unwrap_or(""), &config);
    if response.status != 200 {
        fail(&format!(
            "Render failure ({}): {}",
            response.status,
            String::from_utf8_lossy(&response.body)
        ));
    }
    let written = File::create(outfile).and_then(|mut f| f.write_all(&response.body));
    if let Err(e) = written {
        fail(&format!("Could not write {}: {}", outfile, e));
    }
    info!("Wrote {} bytes to {}", response.body.len(), outfile);
}

fn run_render(matches: &ArgMatches, outfile: &str, threads: usize) {
    let (width, height) = matches
        .value_of(SIZE)
        .and_then(|s| parse_pair::<u32>(s, 'x'))
        .unwrap_or_else(|| fail("Error parsing image dimensions"));
    let (x_center, y_center) = matches
        .value_of(CENTER)
        .and_then(|s| parse_pair::<f64>(s, ','))
        .unwrap_or_else(|| fail("Error parsing center point"));
    let scale: f64 = value(matches, SCALE);
    let iterations: u32 = value(matches, ITERATIONS);

    let request = RenderRequest::new(Viewport::new(x_center, y_center, scale), width, height, iterations)
        .unwrap_or_else(|e| fail(&format!("{}", e)));

    let config = zoom_config(matches);
    if let Err(e) = config.validate() {
        fail(&format!("{}", e));
    }

    let mut state = ViewportState::new(request);
    for click in matches.values_of(CLICK).into_iter().flat_map(|clicks| clicks) {
        let (px, py) = parse_pair::<f64>(click, ',').unwrap_or_else(|| fail("Error parsing click"));
        state = state
            .click(px, py, (width, height), &config)
            .unwrap_or_else(|e| fail(&format!("{}", e)));
        debug!("After click at {},{}: {}", px, py, state);
    }

    let image = render_threaded(state.request(), threads);
    let bracket = if matches.is_present(BRACKET) {
        Some(state.request().viewport().scale)
    } else {
        None
    };
    if let Err(e) = save_png(&image, bracket, outfile) {
        fail(&format!("Render failure: {}", e));
    }
    info!("Wrote {} ({})", outfile, state);
}

fn main() {
    let matches = args();

    let level = if matches.is_present(VERBOSE) { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let outfile = matches.value_of(OUTPUT).unwrap_or_else(|| fail("No output file"));
    let threads: usize = value(&matches, THREADS);

    if matches.is_present(QUERY) {
        run_query(&matches, outfile, threads);
    } else {
        run_render(&matches, outfile, threads);
    }
}
