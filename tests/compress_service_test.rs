use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use bytes::Bytes;
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgba};
use image_budget::compressor::{
    CompressConfig, CompressError, CompressHandler, CompressService, EncodeRequest, Encoder,
    FormatChoice, ImageCrateEncoder, ImageSource, OutcomeReport, OutputFormat,
};

fn noisy_png(width: u32, height: u32) -> Vec<u8> {
    let img = ImageBuffer::from_fn(width, height, |x, y| {
        let v = x.wrapping_mul(2_654_435_761) ^ y.wrapping_mul(40_503);
        Rgba([(v % 251) as u8, ((v >> 8) % 241) as u8, ((x + y) % 255) as u8, 255])
    });
    let mut cursor = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(img)
        .write_to(&mut cursor, ImageFormat::Png)
        .expect("failed to encode test image");
    cursor.into_inner()
}

fn temp_file(name: &str, bytes: &[u8]) -> PathBuf {
    let path = std::env::temp_dir().join(format!("image_budget_it_{}_{}", std::process::id(), name));
    std::fs::write(&path, bytes).expect("write temp image failed");
    path
}

#[tokio::test]
async fn real_codec_batch_fits_budget_in_order() {
    let first = temp_file("first.png", &noisy_png(320, 240));
    let second = temp_file("second.png", &noisy_png(96, 96));

    let mut config = CompressConfig::with_target(12 * 1024);
    config.format = FormatChoice::Explicit(OutputFormat::Jpeg);
    config.scale_floor = 0.1;
    let service = CompressService::with_config(config).expect("service init failed");

    let progress = AtomicUsize::new(0);
    let items = service
        .compress_batch(
            vec![
                ImageSource::FilePath(first.to_string_lossy().into_owned()),
                ImageSource::FilePath(second.to_string_lossy().into_owned()),
            ],
            |index, total, _item| {
                assert_eq!(total, 2);
                assert_eq!(progress.fetch_add(1, Ordering::SeqCst), index);
            },
        )
        .await
        .expect("batch should run");

    let _ = std::fs::remove_file(&first);
    let _ = std::fs::remove_file(&second);

    assert_eq!(progress.load(Ordering::SeqCst), 2);
    assert_eq!(items.len(), 2);
    assert!(items[0].source.ends_with("first.png"));
    for item in &items {
        let outcome = item.result.as_ref().expect("item should compress");
        assert!(outcome.success, "{} did not fit: {}", item.source, outcome.final_bytes);
        assert!(outcome.final_bytes <= 12 * 1024);
        assert_eq!(outcome.blob.len() as u64, outcome.final_bytes);
        assert_eq!(
            image::guess_format(&outcome.blob).expect("output should be an image"),
            ImageFormat::Jpeg
        );

        let decoded = image::load_from_memory(&outcome.blob).expect("output should decode");
        assert_eq!((decoded.width(), decoded.height()), (outcome.width, outcome.height));
    }
}

#[tokio::test]
async fn panicking_encoder_fails_only_its_item() {
    struct PanicOnSecond {
        seen: AtomicUsize,
    }

    impl Encoder for PanicOnSecond {
        fn encode(&self, raster: &DynamicImage, request: EncodeRequest) -> Result<Bytes, CompressError> {
            if raster.width() == 33 {
                self.seen.fetch_add(1, Ordering::SeqCst);
                panic!("encoder blew up");
            }
            ImageCrateEncoder.encode(raster, request)
        }
    }

    let handler = CompressHandler::with_encoder(
        CompressConfig::with_target(64 * 1024),
        Arc::new(PanicOnSecond {
            seen: AtomicUsize::new(0),
        }),
    )
    .expect("handler init failed");
    let service = CompressService::from_handler(handler);

    let items = service
        .compress_batch(
            vec![
                ImageSource::Bytes {
                    name: "ok-1".to_string(),
                    bytes: noisy_png(16, 16),
                },
                ImageSource::Bytes {
                    name: "boom".to_string(),
                    bytes: noisy_png(33, 8),
                },
                ImageSource::Bytes {
                    name: "ok-2".to_string(),
                    bytes: noisy_png(20, 12),
                },
            ],
            |_, _, _| {},
        )
        .await
        .expect("batch should run");

    assert!(items[0].result.is_ok());
    let err = items[1].result.as_ref().expect_err("panicked item must fail");
    assert_eq!(err.stage(), "encode");
    assert!(items[2].result.is_ok());

    let report = OutcomeReport::from_item(&items[1], None);
    assert!(!report.ok);
    assert_eq!(report.error_code.as_deref(), Some("encode_failure"));
}

#[tokio::test]
async fn unreachable_budget_still_returns_closest_result() {
    let mut config = CompressConfig::with_target(200);
    config.format = FormatChoice::Explicit(OutputFormat::Png);
    let service = CompressService::with_config(config).expect("service init failed");

    let outcome = service
        .compress_one(ImageSource::Bytes {
            name: "stubborn".to_string(),
            bytes: noisy_png(128, 128),
        })
        .await
        .expect("a best-effort outcome is still an outcome");

    assert!(!outcome.success);
    assert!(outcome.final_bytes > 200);
    assert!(outcome.scale < 1.0);
    assert_eq!(outcome.quality, 100);
    assert_eq!(outcome.format, OutputFormat::Png);
}

#[tokio::test]
async fn zero_target_rejects_batch_before_any_work() {
    let service = CompressService::with_config(CompressConfig::default()).expect("service init failed");
    let calls = AtomicUsize::new(0);

    let result = service
        .compress_batch(
            vec![ImageSource::Bytes {
                name: "a".to_string(),
                bytes: noisy_png(8, 8),
            }],
            |_, _, _| {
                calls.fetch_add(1, Ordering::SeqCst);
            },
        )
        .await;

    assert!(matches!(result, Err(CompressError::InvalidTarget(_))));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}
