use tempfile::TempDir;

use interactive_feedback::attachments::{AttachmentKind, AttachmentLimits, Candidate};
use interactive_feedback::error::{FeedbackError, ValidationError};
use interactive_feedback::session::NoticeLevel;

use crate::session_harness::{PNG, open_session, open_session_with};

#[tokio::test]
async fn text_file_from_disk_carries_path_and_content() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("notes.md");
    std::fs::write(&path, "# Notes\n- fix the build\n").unwrap();
    let session = open_session(tmp.path());

    let attachment = session.add_attachment_path(&path).await.unwrap();
    assert_eq!(attachment.kind, AttachmentKind::TextFile);

    let payload = session.submit().await.unwrap();
    let text = &payload.text_files[0];
    assert_eq!(text.filename, "notes.md");
    assert_eq!(text.path.as_deref(), path.to_str());
    assert_eq!(text.content, "# Notes\n- fix the build\n");
    assert_eq!(
        payload.interactive_feedback,
        "--- Attachments ---\nText file (stored in text_files field): notes.md"
    );
}

#[tokio::test]
async fn sixth_image_is_rejected_with_a_localized_notice() {
    let tmp = TempDir::new().unwrap();
    let session = open_session(tmp.path());
    for i in 0..5 {
        session
            .add_attachment(Candidate::from_bytes(format!("{i}.png"), PNG.to_vec()))
            .unwrap();
    }
    let mut notices = session.subscribe_notices();

    let err = session
        .add_attachment(Candidate::from_bytes("6.png", PNG.to_vec()))
        .unwrap_err();

    assert!(matches!(
        err,
        FeedbackError::Validation(ValidationError::LimitReached { limit: 5, .. })
    ));
    let notice = notices.recv().await.unwrap();
    assert_eq!(notice.level, NoticeLevel::Warning);
    assert_eq!(notice.message, "Maximum number of images reached (5)");
    assert_eq!(session.attachments().len(), 5);
}

#[tokio::test]
async fn configured_limits_apply_to_the_session() {
    let tmp = TempDir::new().unwrap();
    let session = open_session_with(tmp.path(), |options| {
        options.limits = AttachmentLimits {
            max_images: 1,
            ..AttachmentLimits::default()
        };
    });

    session
        .add_attachment(Candidate::from_bytes("a.png", PNG.to_vec()))
        .unwrap();
    assert!(
        session
            .add_attachment(Candidate::from_bytes("b.png", PNG.to_vec()))
            .is_err()
    );
}

#[tokio::test]
async fn removed_attachments_are_left_out_of_the_payload() {
    let tmp = TempDir::new().unwrap();
    let session = open_session(tmp.path());
    let a = session
        .add_attachment(Candidate::from_bytes("a.png", PNG.to_vec()))
        .unwrap();
    session
        .add_attachment(Candidate::from_bytes("b.png", PNG.to_vec()))
        .unwrap();
    let mut notices = session.subscribe_notices();

    assert!(session.remove_attachment(a.id).unwrap().is_some());
    assert!(session.remove_attachment(a.id).unwrap().is_none());
    assert_eq!(
        notices.recv().await.unwrap().message,
        "Attachment removed: a.png"
    );

    let payload = session.submit().await.unwrap();
    let images: Vec<_> = payload.images.iter().map(|i| i.filename.as_str()).collect();
    assert_eq!(images, vec!["b.png"]);
}

#[tokio::test]
async fn pasted_image_is_named_and_encoded_as_data_url() {
    let tmp = TempDir::new().unwrap();
    let session = open_session(tmp.path());

    let pasted = session.add_pasted_image(PNG.to_vec()).unwrap();
    assert_eq!(pasted.filename, "pasted_image_1.png");

    let payload = session.submit().await.unwrap();
    let json = serde_json::to_value(payload.as_ref()).unwrap();
    let data = json["images"][0]["data"].as_str().unwrap();
    assert!(data.starts_with("data:image/png;base64,"));
    assert_eq!(json["images"][0]["mime_type"], "image/png");
}

#[tokio::test]
async fn unreadable_path_is_reported_and_session_continues() {
    let tmp = TempDir::new().unwrap();
    let session = open_session(tmp.path());
    let mut notices = session.subscribe_notices();

    let err = session
        .add_attachment_path(&tmp.path().join("missing.txt"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        FeedbackError::Validation(ValidationError::Unreadable { .. })
    ));
    let notice = notices.recv().await.unwrap();
    assert!(notice.message.starts_with("Could not read file:"));

    session.set_feedback_text("still fine").unwrap();
    assert_eq!(
        session.submit().await.unwrap().interactive_feedback,
        "still fine"
    );
}

#[tokio::test]
async fn binary_blob_is_unsupported() {
    let tmp = TempDir::new().unwrap();
    let session = open_session(tmp.path());
    let err = session
        .add_attachment(Candidate::from_bytes("core.bin", vec![0_u8; 128]))
        .unwrap_err();
    assert!(matches!(
        err,
        FeedbackError::Validation(ValidationError::UnsupportedFormat { .. })
    ));
    assert!(session.attachments().is_empty());
}

#[tokio::test]
async fn gbk_source_file_is_decoded_and_labelled() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("readme_zh.txt");
    let text = "这个文件使用国标编码保存，内容应当被正确识别。\n";
    let (bytes, _, _) = encoding_rs::GBK.encode(text);
    std::fs::write(&path, &bytes).unwrap();
    let session = open_session(tmp.path());

    session.add_attachment_path(&path).await.unwrap();
    let payload = session.submit().await.unwrap();

    let json = serde_json::to_value(payload.as_ref()).unwrap();
    assert_eq!(json["text_files"][0]["encoding"], "gbk");
    assert_eq!(json["text_files"][0]["content"], text);
}

#[tokio::test]
async fn large_screenshot_is_compressed_and_reported() {
    let tmp = TempDir::new().unwrap();
    let noise = image::RgbImage::from_fn(1_100, 300, |x, y| {
        let v = (x.wrapping_mul(2_654_435_761) ^ y.wrapping_mul(40_503))
            .wrapping_mul(2_246_822_519);
        image::Rgb([(v >> 24) as u8, (v >> 16) as u8, (v >> 8) as u8])
    });
    let mut png_data = Vec::new();
    image::DynamicImage::ImageRgb8(noise)
        .write_to(
            &mut std::io::Cursor::new(&mut png_data),
            image::ImageFormat::Png,
        )
        .unwrap();
    let session = open_session(tmp.path());
    let mut notices = session.subscribe_notices();

    let added = session
        .add_attachment(Candidate::from_bytes("noise.png", png_data))
        .unwrap();

    assert_eq!(added.filename, "noise.jpg");
    let notice = notices.recv().await.unwrap();
    assert!(
        notice.message.starts_with("Image added: noise.jpg (compressed "),
        "{}",
        notice.message
    );
    let payload = session.submit().await.unwrap();
    assert_eq!(payload.images[0].mime_type, "image/jpeg");
    assert!(payload.images[0].data_url().starts_with("data:image/jpeg;base64,"));
}
