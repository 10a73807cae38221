//! Unit tests for the image preparation pipeline

use image::{DynamicImage, ImageFormat, Rgba, RgbImage};
use std::io::Cursor;
use virtual_tryon::config::CompressionSettings;
use virtual_tryon::pipeline::{
    compress_for_upload, contrast, decode, encode_with_ceiling, prepare_for_generation, resize,
    skin, validate_upload, white_balance, EncodeOptions, PipelineConfig, RasterBuffer, ResizeFilter,
    MAX_UPLOAD_BYTES,
};
use virtual_tryon::progress::NoopProgress;
use virtual_tryon::AppError;

fn jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x / 12 % 256) as u8, (y / 16 % 256) as u8, ((x + y) / 28 % 256) as u8])
    });
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Jpeg)
        .unwrap();
    buf
}

/// Deterministic high-entropy raster that compresses badly
fn noise(width: u32, height: u32) -> RasterBuffer {
    let mut state = 0x2545_f491_u32;
    RasterBuffer::from_fn(width, height, |_, _| {
        let mut next = || {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            (state >> 24) as u8
        };
        Rgba([next(), next(), next(), 255])
    })
}

#[test]
fn test_large_jpeg_is_bounded_and_decodable() {
    let input = jpeg(3000, 4000);
    let prepared =
        prepare_for_generation(&input, &PipelineConfig::default(), &NoopProgress).unwrap();

    assert!(prepared.enhanced);
    assert_eq!(prepared.width.max(prepared.height), 800);
    assert_eq!((prepared.width, prepared.height), (600, 800));
    assert!(prepared.byte_size() <= 1200 * 1024);
    assert_eq!(prepared.mime_type, "image/jpeg");

    let decoded = decode(&prepared.bytes).unwrap();
    assert_eq!(decoded.dimensions(), (600, 800));
}

#[test]
fn test_small_image_is_not_resized() {
    for (w, h) in [(1, 1), (640, 480), (800, 800), (300, 799)] {
        assert_eq!(resize::target_dimensions(w, h, 800), None);
        let out = resize::resize_to_fit(RasterBuffer::new(w, h), 800, ResizeFilter::default());
        assert_eq!(out.dimensions(), (w, h));
    }
}

#[test]
fn test_downscale_preserves_aspect() {
    for (w, h) in [(3000, 4000), (4000, 3000), (1920, 1080), (801, 3), (5000, 5000)] {
        let out = resize::resize_to_fit(RasterBuffer::new(w, h), 800, ResizeFilter::Triangle);
        let (ow, oh) = out.dimensions();
        assert!(ow.max(oh) <= 800, "{}x{} -> {}x{}", w, h, ow, oh);

        let scale = 800.0 / f64::from(w.max(h));
        assert!((f64::from(ow) - f64::from(w) * scale).abs() <= 1.0);
        assert!((f64::from(oh) - f64::from(h) * scale).abs() <= 1.0);
    }
}

#[test]
fn test_encode_meets_ceiling_or_floor() {
    let img = noise(200, 200);
    for max_bytes in [64, 4 * 1024, 40 * 1024, 1024 * 1024] {
        let options = EncodeOptions {
            max_bytes,
            ..EncodeOptions::default()
        };
        let encoded = encode_with_ceiling(&img, &options).unwrap();
        let at_floor = (encoded.quality - 0.4).abs() < 1e-6;
        assert!(encoded.bytes.len() <= max_bytes || at_floor, "max_bytes={}", max_bytes);
    }
}

#[test]
fn test_white_balance_equalizes_means() {
    let mut img = RasterBuffer::from_fn(16, 16, |x, y| {
        let jitter = ((x * 3 + y) % 5) as u8;
        Rgba([198 + jitter, 98 + jitter, 48 + jitter, 255])
    });
    white_balance::auto_white_balance(&mut img);

    let [r, g, b] = white_balance::channel_means(&img).unwrap();
    assert!((r - g).abs() < 2.0, "r={} g={}", r, g);
    assert!((g - b).abs() < 2.0, "g={} b={}", g, b);
}

#[test]
fn test_full_range_contrast_is_identity() {
    let img = RasterBuffer::from_fn(100, 1, |x, _| {
        let v = match x {
            0..=4 => 0,
            95..=99 => 255,
            _ => (x * 2) as u8,
        };
        Rgba([v, v, v, 255])
    });
    assert_eq!(contrast::luminance_bounds(&contrast::luminance_histogram(&img)), (0, 255));

    let mut out = img.clone();
    contrast::enhance_contrast(&mut out, 1.0);
    for (a, b) in img.pixels().zip(out.pixels()) {
        for c in 0..3 {
            assert!((i16::from(a.0[c]) - i16::from(b.0[c])).abs() <= 1);
        }
    }
}

#[test]
fn test_skin_smoothing_locality() {
    // Skin-like checkerboard with a non-skin blue stripe in column 4
    let img = RasterBuffer::from_fn(9, 9, |x, y| {
        if x == 4 {
            Rgba([20, 40, 200, 255])
        } else if (x + y) % 2 == 0 {
            Rgba([220, 170, 130, 255])
        } else {
            Rgba([180, 130, 100, 255])
        }
    });
    let out = skin::smooth_skin(&img, 0.3);

    for (x, y, before) in img.enumerate_pixels() {
        let after = out.get_pixel(x, y);
        let border = x == 0 || y == 0 || x == 8 || y == 8;
        let [r, g, b, _] = before.0;

        if border || !skin::is_skin_tone(r, g, b) {
            assert_eq!(before, after, "pixel ({}, {}) changed", x, y);
            continue;
        }

        let mean = skin::neighborhood_mean(&img, x, y);
        for c in 0..3 {
            let original = f64::from(before.0[c]);
            let moved = f64::from(after.0[c]);
            assert!((moved - mean[c]).abs() <= (original - mean[c]).abs() + 0.5);
        }
    }
}

#[test]
fn test_upload_acceptance() {
    assert!(validate_upload("image/png", 1024, MAX_UPLOAD_BYTES).is_ok());
    assert!(matches!(
        validate_upload("text/plain", 10, MAX_UPLOAD_BYTES),
        Err(AppError::UnsupportedFileType(_))
    ));
    assert!(matches!(
        validate_upload("image/jpeg", MAX_UPLOAD_BYTES + 1, MAX_UPLOAD_BYTES),
        Err(AppError::FileTooLarge { .. })
    ));
}

#[test]
fn test_compress_for_upload_bounds_dimensions() {
    let input = jpeg(2560, 1440);
    let settings = CompressionSettings {
        max_dimension: 1280,
        quality: 0.75,
        fallback_quality: 0.6,
        max_encoded_bytes: 1536 * 1024,
    };
    let prepared = compress_for_upload(&input, &settings).unwrap();

    assert_eq!((prepared.width, prepared.height), (1280, 720));
    assert!(!prepared.enhanced);
    assert_eq!(prepared.mime_type, "image/jpeg");
}

#[test]
fn test_compress_falls_back_to_lower_quality() {
    let mut input = Vec::new();
    DynamicImage::ImageRgba8(noise(300, 300))
        .write_to(&mut Cursor::new(&mut input), ImageFormat::Png)
        .unwrap();

    let settings = CompressionSettings {
        max_dimension: 1280,
        quality: 0.75,
        fallback_quality: 0.6,
        max_encoded_bytes: 1,
    };
    let prepared = compress_for_upload(&input, &settings).unwrap();
    assert_eq!(prepared.quality, Some(0.6));
}

#[test]
fn test_undecodable_input_is_rejected() {
    let config = PipelineConfig::default();
    let result = prepare_for_generation(&[0xde, 0xad, 0xbe, 0xef], &config, &NoopProgress);
    assert!(matches!(result, Err(AppError::Decode(_))));
}
