#![no_main]
use libfuzzer_sys::fuzz_target;
use std::io::Cursor;

// First 8 bytes pick the window, the rest is the JPEG
fuzz_target!(|data: &[u8]| {
    if data.len() < 8 {
        return;
    }
    let (head, jpeg) = data.split_at(8);
    let field = |i: usize| Some(i64::from(i16::from_le_bytes([head[i], head[i + 1]])));
    let overrides = jpgd2bmp::WindowOverrides {
        width: field(0),
        height: field(2),
        x_offset: field(4),
        y_offset: field(6),
    };
    let limits = jpgd2bmp::Limits {
        max_pixels: Some(4_000_000),
        max_memory_bytes: Some(64 * 1024 * 1024),
        ..Default::default()
    };
    let request = jpgd2bmp::ConvertRequest::new()
        .with_overrides(overrides)
        .with_limits(&limits);
    let mut sink = Cursor::new(Vec::new());
    if let Ok(report) = jpgd2bmp::convert(
        &request,
        jpgd2bmp::BaselineDecoder::new(),
        jpeg,
        &mut sink,
        enough::Unstoppable,
    ) {
        let window = report.descriptor.window();
        assert!(window.width <= report.descriptor.native_width);
        assert!(window.height <= report.descriptor.native_height);
        assert_eq!(report.rows_written, window.height);
    }
});
