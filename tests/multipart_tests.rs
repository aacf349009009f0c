// Tests for the streamed multipart upload body

mod common;

use common::decode_multipart;
use futures::StreamExt;
use tempfile::TempDir;
use voice_memo::transcription::multipart::{new_boundary, MultipartUpload};

async fn collect_body(upload: MultipartUpload) -> Vec<u8> {
    let mut body = Vec::new();
    let mut stream = Box::pin(upload.into_stream());
    while let Some(chunk) = stream.next().await {
        body.extend_from_slice(&chunk.unwrap());
    }
    body
}

#[tokio::test]
async fn test_body_matches_declared_length() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("memo.m4a");
    // Larger than one read chunk so the file arrives in several pieces
    let audio: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
    std::fs::write(&path, &audio).unwrap();

    let upload = MultipartUpload::open(&path, "whisper-1", "json", new_boundary())
        .await
        .unwrap();
    let declared = upload.content_length();
    let boundary = upload.boundary().to_string();
    assert_eq!(
        upload.content_type(),
        format!("multipart/form-data; boundary={}", boundary)
    );

    let body = collect_body(upload).await;
    assert_eq!(body.len() as u64, declared);

    let parts = decode_multipart(&body, &boundary);
    assert_eq!(parts.len(), 3);
    assert_eq!(parts[2].data, audio);
}

#[tokio::test]
async fn test_text_parts_precede_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("memo-1.m4a");
    std::fs::write(&path, b"abc").unwrap();

    let upload = MultipartUpload::open(&path, "whisper-large", "verbose_json", "XYZ".to_string())
        .await
        .unwrap();
    let body = String::from_utf8(collect_body(upload).await).unwrap();

    let expected = concat!(
        "--XYZ\r\n",
        "Content-Disposition: form-data; name=\"model\"\r\n",
        "\r\n",
        "whisper-large\r\n",
        "--XYZ\r\n",
        "Content-Disposition: form-data; name=\"response_format\"\r\n",
        "\r\n",
        "verbose_json\r\n",
        "--XYZ\r\n",
        "Content-Disposition: form-data; name=\"file\"; filename=\"memo-1.m4a\"\r\n",
        "Content-Type: audio/mp4\r\n",
        "\r\n",
        "abc\r\n",
        "--XYZ--\r\n",
    );
    assert_eq!(body, expected);
}

#[tokio::test]
async fn test_empty_file_still_produces_valid_body() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("silence.m4a");
    std::fs::write(&path, b"").unwrap();

    let boundary = new_boundary();
    let upload = MultipartUpload::open(&path, "whisper-1", "json", boundary.clone())
        .await
        .unwrap();
    let declared = upload.content_length();

    let body = collect_body(upload).await;
    assert_eq!(body.len() as u64, declared);

    let parts = decode_multipart(&body, &boundary);
    assert!(parts[2].data.is_empty());
}

#[tokio::test]
async fn test_open_fails_for_missing_file() {
    let dir = TempDir::new().unwrap();
    let result =
        MultipartUpload::open(&dir.path().join("gone.m4a"), "whisper-1", "json", new_boundary()).await;
    assert!(result.is_err());
}
