#![allow(dead_code)]

use axum::{Router, body::Body, http::Request};
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};
use pdf_tools_backend::config::AppConfig;
use pdf_tools_backend::services::storage::UploadStore;
use pdf_tools_backend::services::tools::PdfProcessor;
use pdf_tools_backend::{AppState, create_app};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

pub const BOUNDARY: &str = "---------------------------123456789012345678901234567";

pub struct TestApp {
    pub app: Router,
    pub upload_dir: PathBuf,
    // Keeps the directory alive for the duration of the test
    pub root: TempDir,
}

pub fn setup_app(processor: Arc<dyn PdfProcessor>) -> TestApp {
    setup_app_with(processor, |_| {})
}

pub fn setup_app_with(
    processor: Arc<dyn PdfProcessor>,
    customize: impl FnOnce(&mut AppConfig),
) -> TestApp {
    let _ = tracing_subscriber::fmt::try_init();

    let root = tempfile::tempdir().unwrap();
    let upload_dir = root.path().join("uploads");
    std::fs::create_dir(&upload_dir).unwrap();

    let mut config = AppConfig::development();
    config.upload_dir = upload_dir.clone();
    customize(&mut config);

    let state = AppState {
        storage: Arc::new(UploadStore::new(upload_dir.clone(), config.max_file_size)),
        processor,
        config,
    };

    TestApp {
        app: create_app(state),
        upload_dir,
        root,
    }
}

pub enum Part<'a> {
    File {
        name: &'a str,
        filename: &'a str,
        bytes: &'a [u8],
    },
    Text {
        name: &'a str,
        value: &'a str,
    },
}

pub fn multipart_request(parts: &[Part<'_>]) -> Request<Body> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::File {
                name,
                filename,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                         Content-Type: application/pdf\r\n\r\n",
                        name, filename
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
            Part::Text { name, value } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"\r\n\r\n{}",
                        name, value
                    )
                    .as_bytes(),
                );
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri("/process")
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

/// A PDF with one page per entry, each showing that entry as text
pub fn text_pdf(pages: &[&str]) -> Vec<u8> {
    let contents = pages
        .iter()
        .map(|text| {
            Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 36.into()]),
                    Operation::new("Td", vec![72.into(), 700.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ],
            }
            .encode()
            .unwrap()
        })
        .collect::<Vec<_>>();
    build_pdf(contents)
}

/// A one-page PDF whose uncompressed content stream is large and highly redundant
pub fn bulky_pdf() -> Vec<u8> {
    let content = "0.5 w 72 72 m 500 700 l S\n".repeat(20_000).into_bytes();
    build_pdf(vec![content])
}

fn build_pdf(page_contents: Vec<Vec<u8>>) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let kids: Vec<Object> = page_contents
        .into_iter()
        .map(|content| {
            let content_id = doc.add_object(Stream::new(dictionary! {}, content));
            doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            })
            .into()
        })
        .collect();
    let count = kids.len() as i64;

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}
