#![no_main]
use libfuzzer_sys::fuzz_target;
use tabcodec::io::run_stream;
use tabcodec::{Datatype, Options, Stage};

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    // Byte-aligned widths keep trailing zero fields distinct from padding.
    let control = data[0];
    let bits = 8 * (u32::from(control & 0x07) + 1);
    let signed = control & 0x08 != 0;
    let datatype = if signed { Datatype::Int } else { Datatype::Uint };
    let field_bytes = (bits / 8) as usize;
    let phases = usize::from(control >> 4) % 4 + 1;

    let payload = &data[1..];
    let whole = payload.len() / (field_bytes * phases) * field_bytes * phases;
    let raw = &payload[..whole];

    let opts = Options {
        input_datatype: datatype,
        output_datatype: datatype,
        value_size_bits: bits,
        num_phases: phases,
        ..Default::default()
    };

    // Unsigned deltas that overflow the field width are rejected.
    let Ok((_, encoded)) = run_stream(Stage::DiffEncode, raw, Vec::new(), &opts) else {
        assert!(!signed);
        return;
    };
    assert_eq!(encoded.len(), raw.len());
    let (_, decoded) = run_stream(Stage::DiffDecode, &encoded[..], Vec::new(), &opts).unwrap();
    assert_eq!(decoded, raw);
});
