mod common;

use brrtrouter_context::error::MultipartError;
use brrtrouter_context::multipart::MultipartReader;
use common::{context, form_post, get, multipart_body, multipart_post, PartSpec, BOUNDARY};

fn upload_body() -> Vec<u8> {
    multipart_body(&[
        PartSpec {
            name: "title",
            filename: None,
            content_type: None,
            data: b"holiday",
        },
        PartSpec {
            name: "photo",
            filename: Some("beach.png"),
            content_type: Some("image/png"),
            data: b"\x89PNG\r\n\x1a\n",
        },
        PartSpec {
            name: "notes",
            filename: Some("notes.txt"),
            content_type: Some("text/plain"),
            data: b"line one\r\nline two",
        },
        PartSpec {
            name: "empty_file_field",
            filename: Some(""),
            content_type: None,
            data: b"",
        },
    ])
}

#[test]
fn test_param_files_collects_only_file_parts() {
    let (ctx, _) = context("/upload", multipart_post("/upload", upload_body()));
    let files = ctx.param_files().unwrap();
    assert_eq!(files.len(), 2);

    assert_eq!(files[0].form_name(), Some("photo"));
    assert_eq!(files[0].file_name(), Some("beach.png"));
    assert_eq!(files[0].content_type(), Some("image/png"));
    assert_eq!(files[0].data(), b"\x89PNG\r\n\x1a\n");

    assert_eq!(files[1].file_name(), Some("notes.txt"));
    assert_eq!(files[1].data(), b"line one\r\nline two");
}

#[test]
fn test_param_files_second_call_fails() {
    let (ctx, _) = context("/upload", multipart_post("/upload", upload_body()));
    assert_eq!(ctx.param_files().unwrap().len(), 2);
    assert!(matches!(
        ctx.param_files(),
        Err(MultipartError::BodyConsumed)
    ));
}

#[test]
fn test_param_files_on_non_multipart_request() {
    let (ctx, _) = context("/upload", form_post("/upload", "a=b"));
    let result = ctx.param_files();
    assert!(matches!(result, Err(MultipartError::NotMultipart)));

    let (ctx, _) = context("/upload", get("/upload"));
    assert!(ctx.param_files().is_err());
}

#[test]
fn test_multipart_body_not_consumed_by_params() {
    let (ctx, _) = context("/upload/{album}", multipart_post("/upload/7?x=1", upload_body()));
    let params = ctx.params().unwrap();
    assert_eq!(params.get("x"), "1");
    assert_eq!(params.get("album"), "7");
    assert!(!params.contains_key("title"));
    assert_eq!(ctx.param_files().unwrap().len(), 2);
}

#[test]
fn test_reader_yields_all_parts_then_none() {
    let body = upload_body();
    let mut reader = MultipartReader::new(&body[..], BOUNDARY);
    let mut names = Vec::new();
    while let Some(part) = reader.next_part().unwrap() {
        names.push(part.form_name().unwrap_or_default().to_string());
    }
    assert_eq!(names, vec!["title", "photo", "notes", "empty_file_field"]);
    assert!(reader.next_part().unwrap().is_none());
}

#[test]
fn test_reader_as_iterator() {
    let body = upload_body();
    let parts: Result<Vec<_>, _> = MultipartReader::new(&body[..], BOUNDARY).collect();
    let parts = parts.unwrap();
    assert_eq!(parts.len(), 4);
    assert_eq!(parts[0].data(), b"holiday");
    assert!(parts[0].file_name().is_none());
}

#[test]
fn test_file_name_directories_stripped() {
    let body = multipart_body(&[PartSpec {
        name: "doc",
        filename: Some("C:\\Users\\me\\report.pdf"),
        content_type: None,
        data: b"%PDF",
    }]);
    let (ctx, _) = context("/upload", multipart_post("/upload", body));
    let files = ctx.param_files().unwrap();
    assert_eq!(files[0].file_name(), Some("report.pdf"));
}

#[test]
fn test_truncated_stream_is_an_error() {
    let mut body = upload_body();
    body.truncate(body.len() - 40);
    let (ctx, _) = context("/upload", multipart_post("/upload", body));
    assert!(matches!(
        ctx.param_files(),
        Err(MultipartError::Malformed(_))
    ));
}
