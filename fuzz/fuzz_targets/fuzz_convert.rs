#![no_main]
use libfuzzer_sys::fuzz_target;
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes must fail cleanly, never panic
    let limits = jpgd2bmp::Limits {
        max_pixels: Some(4_000_000),
        max_memory_bytes: Some(64 * 1024 * 1024),
        ..Default::default()
    };
    let request = jpgd2bmp::ConvertRequest::new().with_limits(&limits);
    let mut sink = Cursor::new(Vec::new());
    let result = jpgd2bmp::convert(
        &request,
        jpgd2bmp::BaselineDecoder::new(),
        data,
        &mut sink,
        enough::Unstoppable,
    );

    // A successful conversion always fills the file it declares
    if let Ok(report) = result {
        assert_eq!(
            sink.get_ref().len() as u64,
            u64::from(report.layout.header.file_size)
        );
    }
});
