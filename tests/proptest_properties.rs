use proptest::prelude::*;
use tabcodec::bitstream::{BitReader, BitSink, BitSource, BitWriter};
use tabcodec::io::run_stream;
use tabcodec::{CodecError, Datatype, Options, Stage};

fn run(stage: Stage, input: &[u8], opts: &Options) -> Result<Vec<u8>, CodecError> {
    run_stream(stage, input, Vec::new(), opts).map(|(_, out)| out)
}

fn pack_signed(values: &[i64], bits: u32) -> Vec<u8> {
    let mut w = BitWriter::new(Vec::new());
    for &v in values {
        w.write_signed_bits(v, bits).unwrap();
    }
    w.finish().unwrap()
}

fn floats(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn unpack_floats(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

proptest! {
    #[test]
    fn prop_bit_fields_roundtrip(
        fields in proptest::collection::vec((1u32..=64, any::<u64>()), 0..64)
    ) {
        let mut w = BitWriter::new(Vec::new());
        for &(bits, value) in &fields {
            w.write_bits(value, bits).unwrap();
        }
        let total: u64 = fields.iter().map(|&(bits, _)| u64::from(bits)).sum();
        let bytes = w.finish().unwrap();
        prop_assert_eq!(bytes.len() as u64, total.div_ceil(8));

        let mut r = BitReader::new(&bytes[..]);
        for &(bits, value) in &fields {
            let mask = if bits == 64 { u64::MAX } else { (1u64 << bits) - 1 };
            prop_assert_eq!(r.read_bits(bits).unwrap(), value & mask);
        }
    }

    #[test]
    fn prop_signed_diff_roundtrip(
        bits in prop::sample::select(vec![8u32, 16, 24, 32, 40, 48, 56, 64]),
        phases in 1usize..=4,
        rounds in 0usize..32,
        seed in any::<Vec<i64>>()
    ) {
        let half = if bits == 64 { i64::MAX } else { (1i64 << (bits - 1)) - 1 };
        let count = rounds * phases;
        let values: Vec<i64> = (0..count)
            .map(|i| seed.get(i).copied().unwrap_or(i as i64) % half)
            .collect();
        let raw = pack_signed(&values, bits);

        let opts = Options {
            input_datatype: Datatype::Int,
            output_datatype: Datatype::Int,
            value_size_bits: bits,
            num_phases: phases,
            ..Default::default()
        };
        let encoded = run(Stage::DiffEncode, &raw, &opts).unwrap();
        prop_assert_eq!(run(Stage::DiffDecode, &encoded, &opts).unwrap(), raw);
    }

    #[test]
    fn prop_unsigned_native_diff_roundtrip(values in proptest::collection::vec(any::<u64>(), 0..64)) {
        let raw: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        let opts = Options {
            input_datatype: Datatype::Uint,
            output_datatype: Datatype::Uint,
            ..Default::default()
        };
        let encoded = run(Stage::DiffEncode, &raw, &opts).unwrap();
        prop_assert_eq!(run(Stage::DiffDecode, &encoded, &opts).unwrap(), raw);
    }

    #[test]
    fn prop_incomplete_round_is_phase_error(
        phases in 2usize..=8,
        extra in 1usize..8,
        rounds in 0usize..8
    ) {
        prop_assume!(extra < phases);
        let values: Vec<i64> = (0..rounds * phases + extra).map(|i| i as i64 + 1).collect();
        let opts = Options {
            input_datatype: Datatype::Int,
            value_size_bits: 16,
            num_phases: phases,
            ..Default::default()
        };
        let err = run(Stage::DiffEncode, &pack_signed(&values, 16), &opts).unwrap_err();
        let is_phase_err =
            matches!(err, CodecError::Phase { phase, num_phases } if phase == extra && num_phases == phases);
        prop_assert!(is_phase_err);
    }

    #[test]
    fn prop_int_normalize_without_ignore_bits_is_lossless(
        values in proptest::collection::vec(any::<i32>(), 0..64)
    ) {
        let wide: Vec<i64> = values.iter().map(|&v| i64::from(v)).collect();
        let raw = pack_signed(&wide, 64);
        let opts = Options {
            input_datatype: Datatype::Int,
            output_datatype: Datatype::Int,
            value_size_bits: 32,
            ..Default::default()
        };
        let narrow = run(Stage::Normalize, &raw, &opts).unwrap();
        prop_assert_eq!(narrow.len(), raw.len() / 2);
        prop_assert_eq!(run(Stage::Denormalize, &narrow, &opts).unwrap(), raw);
    }

    #[test]
    fn prop_int_normalize_clears_only_low_bits(
        values in proptest::collection::vec(-(1i64 << 40)..(1i64 << 40), 1..32),
        ignore in 0u32..16
    ) {
        let opts = Options {
            input_datatype: Datatype::Int,
            output_datatype: Datatype::Int,
            ignore_bits: ignore,
            ..Default::default()
        };
        let narrow = run(Stage::Normalize, &pack_signed(&values, 64), &opts).unwrap();
        let back = run(Stage::Denormalize, &narrow, &opts).unwrap();
        for (chunk, &v) in back.chunks_exact(8).zip(&values) {
            let restored = i64::from_le_bytes(chunk.try_into().unwrap());
            prop_assert!((v - restored).unsigned_abs() < 1u64 << ignore);
            prop_assert_eq!(restored & ((1i64 << ignore) - 1), 0);
        }
    }

    #[test]
    fn prop_float_quantization_error_is_bounded(
        values in proptest::collection::vec(-1000.0f32..1000.0, 0..64),
        factor in prop::sample::select(vec![1.0f32, 10.0, 100.0, 1000.0])
    ) {
        let opts = Options {
            input_datatype: Datatype::Float,
            output_datatype: Datatype::Int,
            value_size_bits: 32,
            normalization_factor: factor,
            ..Default::default()
        };
        let ints = run(Stage::Normalize, &floats(&values), &opts).unwrap();
        let restore = Options {
            input_datatype: Datatype::Int,
            output_datatype: Datatype::Float,
            ..opts
        };
        let back = unpack_floats(&run(Stage::Denormalize, &ints, &restore).unwrap());
        prop_assert_eq!(back.len(), values.len());
        for (&v, &b) in values.iter().zip(&back) {
            // Half a step of rounding plus f32 slack at this magnitude.
            let bound = 0.5 / factor + v.abs() * 1e-6 + 1e-6;
            prop_assert!((v - b).abs() <= bound, "{} -> {} (factor {})", v, b, factor);
        }
    }

    #[test]
    fn prop_integer_csv_roundtrip(values in proptest::collection::vec(any::<i64>(), 0..64), column in 1usize..5) {
        let raw = pack_signed(&values, 64);
        let opts = Options {
            column,
            input_datatype: Datatype::Int,
            output_datatype: Datatype::Int,
            ..Default::default()
        };
        let text = run(Stage::WriteCsv, &raw, &opts).unwrap();
        prop_assert_eq!(text.iter().filter(|&&b| b == b'\n').count(), values.len());
        prop_assert_eq!(run(Stage::ReadCsv, &text, &opts).unwrap(), raw);
    }

    #[test]
    fn prop_read_csv_never_panics(text in proptest::collection::vec(any::<u8>(), 0..512), column in 1usize..4) {
        for datatype in Datatype::ALL {
            let opts = Options {
                column,
                output_datatype: datatype,
                ..Default::default()
            };
            let _ = run(Stage::ReadCsv, &text, &opts);
        }
    }
}
