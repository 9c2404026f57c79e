use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tabcodec::bitstream::{BitReader, BitSink, BitSource, BitWriter};
use tabcodec::io::run_stream;
use tabcodec::{Datatype, Options, Stage};

const SIZES: [usize; 3] = [1 << 10, 1 << 14, 1 << 18];

/// Slowly drifting signal, the shape differential coding is meant for.
fn gen_signal(samples: usize, seed: u64) -> Vec<i64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut level = 0i64;
    (0..samples)
        .map(|_| {
            level += rng.random_range(-50..=50);
            level
        })
        .collect()
}

fn pack(values: &[i64], bits: u32) -> Vec<u8> {
    let mut w = BitWriter::new(Vec::new());
    for &v in values {
        w.write_signed_bits(v, bits).unwrap();
    }
    w.finish().unwrap()
}

fn gen_csv(rows: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut out = Vec::with_capacity(rows * 24);
    for i in 0..rows {
        let value: f32 = rng.random_range(-1000.0..1000.0);
        out.extend_from_slice(format!("{i},{value:.3},tag\n").as_bytes());
    }
    out
}

fn run(stage: Stage, input: &[u8], opts: &Options) -> Vec<u8> {
    run_stream(stage, input, Vec::new(), opts).unwrap().1
}

fn bench_bit_fields(c: &mut Criterion) {
    let mut g = c.benchmark_group("bit_fields");
    for bits in [8u32, 12, 32, 64] {
        let count = 1 << 16;
        let bytes = pack(&gen_signal(count, u64::from(bits)), bits);
        g.throughput(Throughput::Bytes(bytes.len() as u64));
        g.bench_with_input(BenchmarkId::new("write", bits), &bits, |b, &bits| {
            let values = gen_signal(count, 1);
            b.iter(|| black_box(pack(black_box(&values), bits)));
        });
        g.bench_with_input(BenchmarkId::new("read", bits), &bits, |b, &bits| {
            b.iter(|| {
                let mut r = BitReader::new(black_box(&bytes[..]));
                let mut acc = 0u64;
                while !r.is_end().unwrap() {
                    acc = acc.wrapping_add(r.read_bits(bits).unwrap());
                }
                black_box(acc)
            });
        });
    }
    g.finish();
}

fn bench_read_csv(c: &mut Criterion) {
    let mut g = c.benchmark_group("read_csv");
    let opts = Options {
        column: 2,
        output_datatype: Datatype::Float,
        ..Default::default()
    };
    for rows in SIZES {
        let text = gen_csv(rows, 7);
        g.throughput(Throughput::Bytes(text.len() as u64));
        g.bench_with_input(BenchmarkId::from_parameter(rows), &rows, |b, _| {
            b.iter(|| black_box(run(Stage::ReadCsv, black_box(&text), &opts)));
        });
    }
    g.finish();
}

fn bench_write_csv(c: &mut Criterion) {
    let mut g = c.benchmark_group("write_csv");
    for rows in SIZES {
        let floats: Vec<u8> = gen_signal(rows, 3)
            .iter()
            .flat_map(|&v| (v as f32 / 10.0).to_le_bytes())
            .collect();
        for (name, datatype) in [("float", Datatype::Float), ("int", Datatype::Int)] {
            let opts = Options {
                input_datatype: datatype,
                value_size_bits: 32,
                num_decimal_places: 3,
                ..Default::default()
            };
            g.throughput(Throughput::Elements(rows as u64));
            g.bench_with_input(BenchmarkId::new(name, rows), &rows, |b, _| {
                b.iter(|| black_box(run(Stage::WriteCsv, black_box(&floats), &opts)));
            });
        }
    }
    g.finish();
}

fn bench_differential(c: &mut Criterion) {
    let mut g = c.benchmark_group("differential");
    for phases in [1usize, 4] {
        let opts = Options {
            input_datatype: Datatype::Int,
            output_datatype: Datatype::Int,
            value_size_bits: 16,
            num_phases: phases,
            ..Default::default()
        };
        let raw = pack(&gen_signal(1 << 18, 5), 16);
        let encoded = run(Stage::DiffEncode, &raw, &opts);
        g.throughput(Throughput::Bytes(raw.len() as u64));
        g.bench_with_input(BenchmarkId::new("encode", phases), &phases, |b, _| {
            b.iter(|| black_box(run(Stage::DiffEncode, black_box(&raw), &opts)));
        });
        g.bench_with_input(BenchmarkId::new("decode", phases), &phases, |b, _| {
            b.iter(|| black_box(run(Stage::DiffDecode, black_box(&encoded), &opts)));
        });
    }
    g.finish();
}

fn bench_normalization(c: &mut Criterion) {
    let mut g = c.benchmark_group("normalization");
    let signal = gen_signal(1 << 16, 9);

    let floats: Vec<u8> = signal
        .iter()
        .flat_map(|&v| (v as f32 / 100.0).to_le_bytes())
        .collect();
    let quantize = Options {
        input_datatype: Datatype::Float,
        output_datatype: Datatype::Int,
        value_size_bits: 24,
        normalization_factor: 100.0,
        ..Default::default()
    };
    g.throughput(Throughput::Elements(signal.len() as u64));
    g.bench_function("float_to_int", |b| {
        b.iter(|| black_box(run(Stage::Normalize, black_box(&floats), &quantize)));
    });

    let ints = pack(&signal, 64);
    let coarse = Options {
        input_datatype: Datatype::Int,
        output_datatype: Datatype::Int,
        value_size_bits: 32,
        ignore_bits: 4,
        ..Default::default()
    };
    g.bench_function("int_to_int", |b| {
        b.iter(|| black_box(run(Stage::Normalize, black_box(&ints), &coarse)));
    });
    g.finish();
}

criterion_group!(
    benches,
    bench_bit_fields,
    bench_read_csv,
    bench_write_csv,
    bench_differential,
    bench_normalization
);
criterion_main!(benches);
