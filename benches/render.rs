#[macro_use]
extern crate criterion;
extern crate mandelview;

use criterion::Criterion;
use mandelview::{encode_png, render, render_threaded, EscapeCache, RenderRequest, Viewport};

fn classic() -> RenderRequest {
    RenderRequest::new(Viewport::new(-0.5, 0.0, 1.5), 320, 240, 300).unwrap()
}

fn render_single(c: &mut Criterion) {
    let request = classic();
    c.bench_function("render 320x240 single thread", move |b| b.iter(|| render(&request)));
}

fn render_banded(c: &mut Criterion) {
    let request = classic();
    c.bench_function("render 320x240 four threads", move |b| {
        b.iter(|| render_threaded(&request, 4))
    });
}

fn encode(c: &mut Criterion) {
    let image = render(&classic());
    c.bench_function("encode 320x240 png", move |b| b.iter(|| encode_png(&image).unwrap()));
}

fn deepen(c: &mut Criterion) {
    let shallow = classic().with_max_iterations(100).unwrap();
    let mut warm = EscapeCache::new(&shallow);
    warm.deepen(100);
    c.bench_function("deepen 320x240 from 100 to 300", move |b| {
        b.iter_with_setup(|| warm.clone(), |mut cache| cache.deepen(300))
    });
}

criterion_group!(benches, render_single, render_banded, encode, deepen);
criterion_main!(benches);
