mod common;

use std::fs::File;
use std::io::{BufReader, BufWriter};

use dotmatrix_core::gameboy::GameBoy;
use dotmatrix_core::ppu::{SCREEN_HEIGHT, SCREEN_WIDTH};

// The completed frame exports cleanly as an RGBA PNG and decodes back
// byte-identical, which is how host screenshot features consume it.
#[test]
fn frame_round_trips_through_png() {
    let mut gb = GameBoy::with_rom(common::spin_rom()).expect("valid rom");
    gb.run_until_frame();

    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("frame.png");

    let file = File::create(&path).expect("create png");
    let mut encoder = png::Encoder::new(
        BufWriter::new(file),
        SCREEN_WIDTH as u32,
        SCREEN_HEIGHT as u32,
    );
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header().expect("png header");
    writer.write_image_data(gb.frame()).expect("png data");
    writer.finish().expect("png finish");

    let decoder = png::Decoder::new(BufReader::new(File::open(&path).expect("open png")));
    let mut reader = decoder.read_info().expect("png info");
    let buffer_size = reader.output_buffer_size().expect("png buffer size");
    let mut buf = vec![0u8; buffer_size];
    let info = reader.next_frame(&mut buf).expect("png frame");

    assert_eq!(info.width, SCREEN_WIDTH as u32);
    assert_eq!(info.height, SCREEN_HEIGHT as u32);
    assert_eq!(&buf[..info.buffer_size()], &gb.frame()[..]);
}
