#![no_main]
use libfuzzer_sys::fuzz_target;
use tabcodec::io::run_stream;
use tabcodec::{Datatype, Options, Stage};

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    // First byte picks the column and datatype, the rest is CSV text.
    let control = data[0];
    let opts = Options {
        separator_char: if control & 0x80 != 0 { b';' } else { b',' },
        column: usize::from(control & 0x07) + 1,
        output_datatype: Datatype::ALL[usize::from(control >> 3) & 0x03],
        ..Default::default()
    };

    let text = &data[1..];
    if let Ok((fields, out)) = run_stream(Stage::ReadCsv, text, Vec::new(), &opts) {
        let width = if matches!(opts.output_datatype, Datatype::Uint | Datatype::Int) {
            8
        } else {
            4
        };
        assert_eq!(out.len() as u64, fields * width);
        assert!(fields <= text.len() as u64);
    }
});
