use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use nestlink::compute::spatial::DetectionIndex;
use nestlink::{
    MatchOrder, NestThresholds, SurveyCalendar, compare_site, count_max_consec_detects,
    link_tracks, process_nests,
};
use nestlink_types::bbox::BoundingBox2D;
use nestlink_types::date::ObservationDate;
use nestlink_types::detection::Detection;

/// A colony of `nests` fixed sites surveyed on `dates` dates, with a small
/// deterministic jitter per visit.
fn colony(nests: usize, dates: u32) -> Vec<Detection> {
    let mut detections = Vec::with_capacity(nests * dates as usize);
    for day in 1..=dates {
        let date = ObservationDate::from_ymd(2022, 3, day).unwrap();
        for nest in 0..nests {
            let jitter = ((nest * 7 + day as usize * 13) % 10) as f64 * 0.03;
            let x = (nest % 100) as f64 * 2.0 + jitter;
            let y = (nest / 100) as f64 * 2.0 + jitter;
            detections.push(
                Detection::new("Joule", date, BoundingBox2D::new(x, y, x + 1.0, y + 1.0))
                    .with_label("Great Egret")
                    .with_score(0.5 + jitter)
                    .with_bird_id(detections.len() as u64 + 1),
            );
        }
    }
    detections
}

fn benchmark_index(c: &mut Criterion) {
    let mut group = c.benchmark_group("detection_index");

    for size in [1_000, 10_000] {
        let detections = colony(size / 10, 10);
        let boxes: Vec<_> = detections.iter().map(|d| d.bbox).collect();

        group.bench_with_input(BenchmarkId::new("bulk_load", size), &boxes, |b, boxes| {
            b.iter(|| DetectionIndex::from_boxes(black_box(boxes)))
        });

        let index = DetectionIndex::from_boxes(&boxes);
        group.bench_with_input(BenchmarkId::new("query", size), &boxes, |b, boxes| {
            let mut i = 0;
            b.iter(|| {
                let hits = index.query_overlapping(black_box(&boxes[i % boxes.len()]));
                i += 1;
                hits
            })
        });
    }

    group.finish();
}

fn benchmark_matching(c: &mut Criterion) {
    let mut group = c.benchmark_group("matching");
    group.sample_size(20);

    for nests in [100, 1_000] {
        let detections = colony(nests, 10);
        group.bench_with_input(
            BenchmarkId::new("compare_site", detections.len()),
            &detections,
            |b, detections| b.iter(|| compare_site(black_box(detections), &MatchOrder::Input).unwrap()),
        );
    }

    group.finish();
}

fn benchmark_summary(c: &mut Criterion) {
    let mut group = c.benchmark_group("summary");

    let detections = colony(1_000, 10);
    let tracks = compare_site(&detections, &MatchOrder::Input).unwrap();
    let members = link_tracks(&detections, &tracks);
    let thresholds = NestThresholds::default();

    group.bench_function("process_nests", |b| {
        b.iter(|| process_nests(black_box(&members), &thresholds).unwrap())
    });

    let calendar = SurveyCalendar::new(detections.iter().map(|d| d.date));
    let observed: Vec<_> = calendar
        .dates()
        .iter()
        .copied()
        .enumerate()
        .filter(|(i, _)| i % 3 != 2)
        .map(|(_, date)| date)
        .collect();
    group.bench_function("count_max_consec_detects", |b| {
        b.iter(|| count_max_consec_detects(&calendar, black_box(&observed)).unwrap())
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_index,
    benchmark_matching,
    benchmark_summary
);
criterion_main!(benches);
