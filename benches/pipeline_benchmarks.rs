// benches/pipeline_benchmarks.rs
//
// Benchmarks for the parse-once HTML path and the score aggregator.
// Run with: cargo bench --bench pipeline_benchmarks
//
// The old database_benchmarks.rs measured SQLite read/write throughput;
// this crate has no database layer, so its benchmarking surface is instead
// the two hot paths every audit runs through regardless of which analyzers
// are enabled: building the shared `ParsedDocument`/`SemanticHtml5Index`
// once, and aggregating section scores into the final `AeoScore`.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::collections::BTreeMap;
use std::hint::black_box;

use geo_audit::aggregate::{aggregate, SECTION_WEIGHTS};
use geo_audit::analyzers::{accessibility, llm_formatting, readability, structured_data};
use geo_audit::html::{build_semantic_index, extract_basic_metadata, ParsedDocument};
use geo_audit::probe::{CoreWebVitals, ProbeResult};
use geo_audit::report::{Drawer, MetricCard, Section};

fn sample_html(repeat_paragraphs: usize) -> String {
    let mut body = String::from(
        "<header><nav><a href=\"/a\">About</a><a href=\"/b\">Contact</a></nav></header><main><h1>Benchmark Fixture</h1>",
    );
    for i in 0..repeat_paragraphs {
        body.push_str(&format!(
            "<h2>Section {i}</h2><p>This paragraph exists to give the readability and structured data \
             analyzers enough prose to chew on. It repeats a plausible sentence shape so syllable \
             and sentence counting has real work to do, section {i}.</p>"
        ));
    }
    body.push_str("</main><footer><p>Copyright</p></footer>");
    format!(
        "<!doctype html><html><head><title>Benchmark Fixture Page</title>\
         <meta name=\"description\" content=\"A fixture page used to benchmark the parse-once path.\">\
         <script type=\"application/ld+json\">{{\"@context\":\"https://schema.org\",\"@type\":\"Organization\",\"name\":\"Acme\"}}</script>\
         </head><body>{body}</body></html>"
    )
}

/// Parsing + semantic indexing + metadata extraction: the work every audit
/// pays exactly once, shared across all five analyzers.
fn bench_parse_once(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_once");
    for size in [5usize, 50, 200] {
        let html = sample_html(size);
        group.throughput(Throughput::Bytes(html.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &html, |b, html| {
            b.iter(|| {
                let doc = ParsedDocument::parse(black_box(html));
                let index = build_semantic_index(&doc);
                let metadata = extract_basic_metadata(&doc);
                black_box((doc, index, metadata))
            });
        });
    }
    group.finish();
}

/// The four non-probe-dependent analyzers run back to back over the same
/// parsed document, approximating their combined `spawn_blocking` cost
/// without paying for Tokio's thread-pool dispatch inside the benchmark.
fn bench_analyzers_over_shared_document(c: &mut Criterion) {
    let html = sample_html(50);
    let doc = ParsedDocument::parse(&html);
    let index = build_semantic_index(&doc);
    let metadata = extract_basic_metadata(&doc);
    let probe = ProbeResult {
        performance_score: 90.0,
        core_web_vitals: CoreWebVitals { lcp_ms: 1800.0, inp_ms: 90.0, cls: 0.02 },
        successful: true,
        retry_count: 0,
    };

    c.bench_function("analyzers/structured_data", |b| {
        b.iter(|| black_box(structured_data::analyze(black_box(&doc), black_box(&metadata))));
    });
    c.bench_function("analyzers/llm_formatting", |b| {
        b.iter(|| black_box(llm_formatting::analyze(black_box(&doc), black_box(&index))));
    });
    c.bench_function("analyzers/readability", |b| {
        b.iter(|| black_box(readability::analyze(black_box(&doc))));
    });
    c.bench_function("analyzers/accessibility", |b| {
        b.iter(|| black_box(accessibility::analyze(black_box(&doc), black_box(&index), black_box(&probe))));
    });
}

fn full_section(id: &str, weight: u8, score: i64, max: i64) -> Section {
    let card = MetricCard::new("c", "C", max).score(score).build();
    let drawer = Drawer::new("d", "D", "desc", vec![card]);
    Section::new(id, id, weight, vec![drawer])
}

/// Aggregation over the full, uncapped set of sections vs. one with a
/// missing section (exercising the weight-rescaling path).
fn bench_aggregate(c: &mut Criterion) {
    let mut full = BTreeMap::new();
    for (id, weight) in SECTION_WEIGHTS {
        full.insert(id.to_string(), full_section(id, *weight, 80, 100));
    }
    let mut partial = full.clone();
    partial.remove("readability");

    c.bench_function("aggregate/all_sections", |b| {
        b.iter(|| black_box(aggregate(black_box(&full), &[])));
    });
    c.bench_function("aggregate/missing_section_rescale", |b| {
        b.iter(|| black_box(aggregate(black_box(&partial), &[])));
    });
}

criterion_group!(benches, bench_parse_once, bench_analyzers_over_shared_document, bench_aggregate);
criterion_main!(benches);
