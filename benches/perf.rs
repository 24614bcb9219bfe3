use std::collections::HashMap;

use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use playodds_terminal::render::{ResultsTable, render_result};
use playodds_terminal::rounding::round2;
use playodds_terminal::state::{LeagueInfo, LeagueResult, TeamRecord};
use serde_json::json;

fn sample_result(teams: usize) -> LeagueResult {
    let team_data = (0..teams)
        .map(|i| {
            let odds: HashMap<String, f64> = (0..teams)
                .map(|seed| (seed.to_string(), 1.0 / (1.0 + (i + seed) as f64)))
                .collect();
            TeamRecord {
                name: json!(format!("Team {i}")),
                owner: json!(format!("Owner {i}")),
                wins: json!(i % 14),
                losses: json!(13 - i % 14),
                ties: json!(0),
                average: Some(100.0 + i as f64 * 1.005),
                points_for: Some(1300.0 + i as f64 * 3.335),
                points_against: Some(1250.0 - i as f64 * 2.675),
                expected_wins: Some(7.0 + i as f64 * 0.125),
                logo: format!("https://example.com/logos/{i}.png"),
                odds,
            }
        })
        .collect();
    LeagueResult {
        league_info: LeagueInfo {
            name: "Bench League".to_string(),
            extra: Default::default(),
        },
        team_data,
    }
}

fn bench_render(c: &mut Criterion) {
    let result = sample_result(32);
    c.bench_function("render_result_32_teams", |b| {
        b.iter(|| {
            let mut table = ResultsTable::with_identity_headers();
            let mut subtitle = Vec::new();
            render_result(black_box(&result), &mut table, &mut subtitle);
            black_box(table.rows.len());
        })
    });
}

fn bench_round2(c: &mut Criterion) {
    let values: Vec<f64> = (0..1000).map(|i| i as f64 * 0.005 + 0.001).collect();
    c.bench_function("round2_1000_values", |b| {
        b.iter(|| {
            let sum: f64 = values.iter().map(|v| round2(black_box(*v))).sum();
            black_box(sum);
        })
    });
}

fn bench_to_text(c: &mut Criterion) {
    let result = sample_result(32);
    let mut table = ResultsTable::with_identity_headers();
    render_result(&result, &mut table, &mut Vec::new());
    c.bench_function("results_table_to_text", |b| {
        b.iter(|| black_box(table.to_text().len()))
    });
}

criterion_group!(benches, bench_render, bench_round2, bench_to_text);
criterion_main!(benches);
