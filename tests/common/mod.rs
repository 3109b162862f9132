use std::fs;
use std::path::Path;

use yolo_crop::cropping::codec;
use yolo_crop::PixelBuffer;

/// Deterministic RGB test pattern: pixel (x, y) = (x, y, x + y) modulo 256.
pub fn gradient_buffer(width: u32, height: u32) -> PixelBuffer {
    let mut data = Vec::with_capacity((width * height * 3) as usize);
    for y in 0..height {
        for x in 0..width {
            data.push((x % 256) as u8);
            data.push((y % 256) as u8);
            data.push(((x + y) % 256) as u8);
        }
    }
    PixelBuffer::from_raw(width, height, 3, data).expect("build gradient buffer")
}

pub fn write_gradient_png(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    codec::encode(&gradient_buffer(width, height), path).expect("write gradient image");
}

pub fn write_solid_png(path: &Path, width: u32, height: u32, rgb: [u8; 3]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    let mut data = Vec::with_capacity((width * height * 3) as usize);
    for _ in 0..width * height {
        data.extend_from_slice(&rgb);
    }
    let buffer = PixelBuffer::from_raw(width, height, 3, data).expect("build solid buffer");
    codec::encode(&buffer, path).expect("write solid image");
}

pub fn write_gray_png(path: &Path, width: u32, height: u32, value: u8) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    let data = vec![value; (width * height) as usize];
    let buffer = PixelBuffer::from_raw(width, height, 1, data).expect("build gray buffer");
    codec::encode(&buffer, path).expect("write gray image");
}
