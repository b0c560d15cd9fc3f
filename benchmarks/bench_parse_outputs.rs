use std::fs;
use std::hint::black_box;
use std::path::PathBuf;

use criterion::{criterion_group, criterion_main, Criterion};
use tempfile::TempDir;

use jumanpp_batch::{parse_outputs, parse_outputs_with, ParseOptions, TokenRecord};

const BLOCK: &str = r#"# doc
すもも すもも すもも 名詞 6 普通名詞 1 * 0 * 0 "代表表記:すもも/すもも カテゴリ:植物"
も も も 助詞 9 副助詞 2 * 0 * 0 NIL
もも もも もも 名詞 6 普通名詞 1 * 0 * 0 "代表表記:桃/もも カテゴリ:植物"
@ もも もも もも 名詞 6 普通名詞 1 * 0 * 0 "代表表記:股/もも カテゴリ:動物-部位"
も も も 助詞 9 副助詞 2 * 0 * 0 NIL
もも もも もも 名詞 6 普通名詞 1 * 0 * 0 "代表表記:桃/もも カテゴリ:植物"
の の の 助詞 9 接続助詞 3 * 0 * 0 NIL
うち うち うち 名詞 6 副詞的名詞 9 * 0 * 0 "代表表記:うち/うち"
EOS
"#;

fn write_locations(dir: &TempDir, locations: usize, blocks_per_location: usize) -> Vec<PathBuf> {
    (0..locations)
        .map(|idx| {
            let path = dir.path().join(format!("{}.txt", idx));
            fs::write(&path, BLOCK.repeat(blocks_per_location)).unwrap();
            path
        })
        .collect()
}

fn bench_parse_full_records(c: &mut Criterion) {
    let dir = TempDir::new().unwrap();
    let locations = write_locations(&dir, 4, 2_500);
    c.bench_function("parse_full_records", |b| {
        b.iter(|| {
            let count = parse_outputs(black_box(&locations), ParseOptions::default())
                .map(|s| s.unwrap().tokens.len())
                .sum::<usize>();
            black_box(count);
        });
    });
}

fn bench_parse_surface_projection(c: &mut Criterion) {
    let dir = TempDir::new().unwrap();
    let locations = write_locations(&dir, 4, 2_500);
    c.bench_function("parse_surface_projection", |b| {
        b.iter(|| {
            let options = ParseOptions::default()
                .with_pos_filter(["名詞"])
                .with_alternatives(false);
            let count = parse_outputs_with(black_box(&locations), options, |t: TokenRecord| {
                t.surface
            })
            .map(|s| s.unwrap().tokens.len())
            .sum::<usize>();
            black_box(count);
        });
    });
}

fn bench_parse_token_line(c: &mut Criterion) {
    let line = r#"すもも すもも すもも 名詞 6 普通名詞 1 * 0 * 0 "代表表記:すもも/すもも カテゴリ:植物""#;
    c.bench_function("parse_token_line", |b| {
        b.iter(|| {
            black_box(TokenRecord::parse_line(black_box(line)).unwrap());
        });
    });
}

criterion_group!(
    benches,
    bench_parse_full_records,
    bench_parse_surface_projection,
    bench_parse_token_line
);
criterion_main!(benches);
