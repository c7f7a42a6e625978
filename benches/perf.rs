use criterion::{Criterion, criterion_group, criterion_main};
use serde_json::{Value, json};
use std::hint::black_box;

use footy_ingest::classify::classify;
use footy_ingest::ingest::{IngestRequest, RawTable, ingest_request};
use footy_ingest::normalize::{as_int, extract_text};
use footy_ingest::schema;

const STANDINGS_HEADERS: &[&str] = &[
    "Rk", "Squad", "MP", "W", "D", "L", "GF", "GA", "GD", "Pts", "Pts/MP",
];

fn bench_classify(c: &mut Criterion) {
    c.bench_function("classify_standings_headers", |b| {
        b.iter(|| black_box(classify(black_box(STANDINGS_HEADERS))))
    });
}

fn bench_normalize(c: &mut Criterion) {
    let cells = [
        json!({"text": "Manchester Utd", "href": "/squads/19538871"}),
        json!("{'text': 'Nott\\'ham Forest', 'href': None}"),
        json!("73,297"),
        json!("nan"),
    ];
    c.bench_function("normalize_cells", |b| {
        b.iter(|| {
            for cell in &cells {
                black_box(extract_text(black_box(cell)));
                black_box(as_int(black_box(cell)));
            }
        })
    });
}

fn fixtures_request(n: usize) -> IngestRequest {
    let teams = (0..20).map(|i| format!("Team {i}")).collect::<Vec<_>>();
    let rows = (0..n)
        .map(|i| {
            let home = &teams[i % teams.len()];
            let away = &teams[(i * 7 + 3) % teams.len()];
            let day = 1 + (i / teams.len()) % 28;
            vec![
                json!(format!("2024-09-{day:02}")),
                json!({"text": home}),
                json!(format!("{}–{}", i % 4, i % 3)),
                json!({"text": away}),
                json!("41,500"),
            ]
        })
        .collect::<Vec<Vec<Value>>>();
    IngestRequest {
        league: "Bench League".to_string(),
        season: "2024-2025".to_string(),
        tables: vec![RawTable {
            title: None,
            headers: ["date", "home_team", "score", "away_team", "attendance"]
                .iter()
                .map(|h| h.to_string())
                .collect(),
            rows,
        }],
        ..IngestRequest::default()
    }
}

fn bench_ingest(c: &mut Criterion) {
    let req = fixtures_request(380);
    c.bench_function("ingest_380_fixtures_in_memory", |b| {
        b.iter(|| {
            let mut conn = schema::open_in_memory().unwrap();
            let counts = ingest_request(&mut conn, black_box(&req)).unwrap();
            black_box(counts.fixtures_inserted);
        })
    });
}

criterion_group!(benches, bench_classify, bench_normalize, bench_ingest);
criterion_main!(benches);
