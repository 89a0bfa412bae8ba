use chrono::{Datelike, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use polars::prelude::*;
use winter_is_coming::{prepare_weather_frame, DepartmentCode, StationFrame, WeatherKey};

/// Thirty years of raw daily rows for three stations with a seasonal minimum temperature.
fn raw_department() -> DataFrame {
    let mut ids = Vec::new();
    let mut dates = Vec::new();
    let mut tmins = Vec::new();
    for station in [74056001i64, 74281001, 74143001] {
        let mut date = NaiveDate::from_ymd_opt(1991, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2020, 12, 31).unwrap();
        while date <= end {
            let season = (date.ordinal() as f64 / 366.0 * std::f64::consts::TAU).cos();
            ids.push(station);
            dates.push((date.year() * 10_000 + date.month() as i32 * 100 + date.day() as i32) as i64);
            tmins.push(Some(4.0 - 8.0 * season + (station % 7) as f64));
            date = date.succ_opt().unwrap();
        }
    }
    let names: Vec<String> = ids.iter().map(|id| format!("STATION {}", id)).collect();
    let altis: Vec<f64> = ids.iter().map(|id| (id % 1000) as f64).collect();
    df!(
        "station_id" => ids,
        "station_name" => names,
        "alti" => altis,
        "raw_date" => dates,
        "tmin" => tmins
    )
    .unwrap()
}

fn bench_frost(c: &mut Criterion) {
    let raw = raw_department();
    let key = WeatherKey::new(DepartmentCode::new("74"), 1991, 2020, 0.9);

    c.bench_function("prepare_weather_frame", |b| {
        b.iter(|| {
            prepare_weather_frame(black_box(raw.clone()).lazy(), &key, 0.0)
                .collect()
                .unwrap()
        })
    });

    let table = prepare_weather_frame(raw.lazy(), &key, 0.0)
        .collect()
        .unwrap();
    let station = StationFrame::from_table(&table, 74056001).unwrap();

    c.bench_function("mean_frost_days", |b| {
        b.iter(|| black_box(&station).mean_frost_days().unwrap())
    });
    c.bench_function("frost_probability_per_day", |b| {
        b.iter(|| black_box(&station).frost_probability_per_day().unwrap())
    });
}

criterion_group!(benches, bench_frost);
criterion_main!(benches);
