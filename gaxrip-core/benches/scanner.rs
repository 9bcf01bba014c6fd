use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use gaxrip_core::{
    builder::{ImageBuilder, SongBuilder},
    gax::GaxDecoder,
    index::PointerIndex,
    pipeline::run,
    progress::NoProgress,
    Image, ScanConfig,
};
use rand::{rngs::StdRng, Rng, SeedableRng};

fn make_rom(len: usize, num_songs: usize) -> Image {
    let mut rng = StdRng::seed_from_u64(0x6A78);
    let mut rom = ImageBuilder::new(len);
    let filler: Vec<u8> = (0..len).map(|_| rng.gen()).collect();
    rom.put_bytes(0, &filler);

    let spacing = len / (num_songs + 1);
    let mut shared = None;
    for i in 0..num_songs {
        let offset = ((i + 1) * spacing) & !3;
        let mut song = SongBuilder::current("\"Track\" © Composer")
            .channels(4)
            .sample(vec![0x80; 256]);
        if let Some(set) = shared {
            song = song.instrument_set(set);
        }
        let written = song.write(&mut rom, offset);
        shared.get_or_insert(written.instrument_set);
        if i % 4 != 0 {
            // inject a reference for most songs, leave the rest as orphans
            rom.put_pointer(i * 4, written.offset);
        }
    }
    rom.build().unwrap()
}

fn bench_scanner(c: &mut Criterion) {
    let mut group = c.benchmark_group("scanner");

    for &len in &[64 * 1024usize, 1024 * 1024, 4 * 1024 * 1024] {
        let image = make_rom(len, 32);
        group.throughput(Throughput::Bytes(image.len() as u64));

        group.bench_with_input(BenchmarkId::new("pointer_index", len), &image, |b, image| {
            b.iter(|| {
                let index = PointerIndex::build(image, &mut NoProgress);
                criterion::black_box(index);
            });
        });

        let config = ScanConfig::default();
        group.bench_with_input(BenchmarkId::new("pipeline", len), &image, |b, image| {
            b.iter(|| {
                let report = run(image, &GaxDecoder, &config, &mut NoProgress);
                criterion::black_box(report)
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_scanner);
criterion_main!(benches);
