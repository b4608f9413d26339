use crate::config::AppConfig;
use crate::models::Operation;
use crate::services::command::{ToolError, run_tool};
use serde::Serialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use utoipa::ToSchema;

/// Availability of one external binary
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ToolStatus {
    pub name: String,
    pub path: String,
    pub available: bool,
}

/// Trait for PDF transformation backends
#[async_trait::async_trait]
pub trait PdfProcessor: Send + Sync {
    /// Apply `operation` to `input`, writing the result to `output`
    async fn process(&self, operation: Operation, input: &Path, output: &Path)
    -> Result<(), ToolError>;

    /// Report which of the backend's tools can be launched
    async fn health_check(&self) -> Vec<ToolStatus>;
}

/// Processor shelling out to Ghostscript, Poppler and Tesseract
#[derive(Debug, Clone)]
pub struct ExternalToolProcessor {
    ghostscript: PathBuf,
    pdftoppm: PathBuf,
    tesseract: PathBuf,
    language: String,
    dpi: u32,
    pdf_settings: String,
    compatibility_level: String,
    timeout: Duration,
}

impl ExternalToolProcessor {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            ghostscript: config.ghostscript_path.clone(),
            pdftoppm: config.pdftoppm_path(),
            tesseract: config.tesseract_path.clone(),
            language: config.ocr_language.clone(),
            dpi: config.ocr_dpi,
            pdf_settings: config.pdf_settings.clone(),
            compatibility_level: config.compatibility_level.clone(),
            timeout: config.tool_timeout(),
        }
    }

    fn compress_args(&self, input: &Path, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-sDEVICE=pdfwrite".into(),
            format!("-dCompatibilityLevel={}", self.compatibility_level).into(),
            format!("-dPDFSETTINGS={}", self.pdf_settings).into(),
            "-dNOPAUSE".into(),
            "-dQUIET".into(),
            "-dBATCH".into(),
        ];
        args.push(output_file_arg(output));
        args.push(input.as_os_str().to_owned());
        args
    }

    fn rasterize_args(&self, input: &Path, prefix: &Path) -> Vec<OsString> {
        vec![
            "-r".into(),
            self.dpi.to_string().into(),
            "-png".into(),
            input.as_os_str().to_owned(),
            prefix.as_os_str().to_owned(),
        ]
    }

    fn recognize_args(&self, image: &Path, output_base: &Path) -> Vec<OsString> {
        vec![
            image.as_os_str().to_owned(),
            output_base.as_os_str().to_owned(),
            "-l".into(),
            self.language.clone().into(),
            "pdf".into(),
        ]
    }

    fn merge_args(&self, pages: &[PathBuf], output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-sDEVICE=pdfwrite".into(),
            "-dNOPAUSE".into(),
            "-dQUIET".into(),
            "-dBATCH".into(),
        ];
        args.push(output_file_arg(output));
        args.extend(pages.iter().map(|p| p.as_os_str().to_owned()));
        args
    }

    /// Compresses a PDF file using Ghostscript
    pub async fn compress_pdf(&self, input: &Path, output: &Path) -> Result<(), ToolError> {
        run_tool(&self.ghostscript, self.compress_args(input, output), self.timeout).await?;
        Ok(())
    }

    /// Rasterizes every page, turns each image into a searchable single-page
    /// PDF with Tesseract, then merges the pages back in order.
    ///
    /// Intermediates live in a private temporary directory that is removed
    /// when this returns, whether or not it succeeded.
    pub async fn ocr_pdf(&self, input: &Path, output: &Path) -> Result<(), ToolError> {
        let workdir = tempfile::Builder::new().prefix("pdf-ocr-").tempdir()?;

        run_tool(
            &self.pdftoppm,
            self.rasterize_args(input, &workdir.path().join("page")),
            self.timeout,
        )
        .await?;

        let images = collect_page_images(workdir.path()).await?;
        if images.is_empty() {
            return Err(ToolError::NoPages);
        }
        tracing::debug!("Rasterized {} pages from {}", images.len(), input.display());

        let mut page_pdfs = Vec::with_capacity(images.len());
        for (index, image) in images.iter().enumerate() {
            let output_base = workdir.path().join(format!("page_{}_ocr", index + 1));
            run_tool(
                &self.tesseract,
                self.recognize_args(image, &output_base),
                self.timeout,
            )
            .await?;
            page_pdfs.push(output_base.with_extension("pdf"));
        }

        run_tool(&self.ghostscript, self.merge_args(&page_pdfs, output), self.timeout).await?;
        Ok(())
    }

    async fn check_tool(&self, name: &str, program: &Path, version_flag: &str) -> ToolStatus {
        let result = run_tool(program, [version_flag], Duration::from_secs(10)).await;
        // Some tools (older pdftoppm) exit non-zero for their version flag
        let available = matches!(result, Ok(_) | Err(ToolError::Failed { .. }));
        ToolStatus {
            name: name.to_string(),
            path: program.display().to_string(),
            available,
        }
    }
}

#[async_trait::async_trait]
impl PdfProcessor for ExternalToolProcessor {
    async fn process(
        &self,
        operation: Operation,
        input: &Path,
        output: &Path,
    ) -> Result<(), ToolError> {
        match operation {
            Operation::Compress => self.compress_pdf(input, output).await,
            Operation::Ocr => self.ocr_pdf(input, output).await,
        }
    }

    async fn health_check(&self) -> Vec<ToolStatus> {
        vec![
            self.check_tool("ghostscript", &self.ghostscript, "--version").await,
            self.check_tool("pdftoppm", &self.pdftoppm, "-v").await,
            self.check_tool("tesseract", &self.tesseract, "--version").await,
        ]
    }
}

/// Processor that copies the input unchanged, for development without the tools installed
pub struct PassthroughProcessor;

#[async_trait::async_trait]
impl PdfProcessor for PassthroughProcessor {
    async fn process(
        &self,
        operation: Operation,
        input: &Path,
        output: &Path,
    ) -> Result<(), ToolError> {
        tracing::warn!("PassthroughProcessor: Skipping '{}' (development mode)", operation);
        tokio::fs::copy(input, output).await?;
        Ok(())
    }

    async fn health_check(&self) -> Vec<ToolStatus> {
        Vec::new()
    }
}

/// Factory function to create the processor selected by config
pub fn create_processor(config: &AppConfig) -> Box<dyn PdfProcessor> {
    match config.processor_type.to_lowercase().as_str() {
        "external" => Box::new(ExternalToolProcessor::from_config(config)),
        "passthrough" | "noop" => Box::new(PassthroughProcessor),
        other => {
            tracing::warn!("Unknown processor type '{}', using external tools", other);
            Box::new(ExternalToolProcessor::from_config(config))
        }
    }
}

fn output_file_arg(output: &Path) -> OsString {
    let mut arg = OsString::from("-sOutputFile=");
    arg.push(output.as_os_str());
    arg
}

/// Page number of a pdftoppm image named `page-<n>.png` (n may be zero-padded)
fn page_number(file_name: &str) -> Option<u32> {
    file_name
        .strip_prefix("page-")?
        .strip_suffix(".png")?
        .parse()
        .ok()
}

/// Page images in `dir`, ordered by page number
async fn collect_page_images(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut pages = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        if let Some(number) = name.to_str().and_then(page_number) {
            pages.push((number, entry.path()));
        }
    }
    pages.sort_by_key(|(number, _)| *number);
    Ok(pages.into_iter().map(|(_, path)| path).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn processor() -> ExternalToolProcessor {
        ExternalToolProcessor::from_config(&AppConfig::default())
    }

    #[test]
    fn test_compress_args() {
        let args = processor().compress_args(Path::new("in.pdf"), Path::new("out.pdf"));
        let expected: Vec<OsString> = [
            "-sDEVICE=pdfwrite",
            "-dCompatibilityLevel=1.4",
            "-dPDFSETTINGS=/ebook",
            "-dNOPAUSE",
            "-dQUIET",
            "-dBATCH",
            "-sOutputFile=out.pdf",
            "in.pdf",
        ]
        .into_iter()
        .map(OsString::from)
        .collect();
        assert_eq!(args, expected);
    }

    #[test]
    fn test_merge_args_keep_page_order() {
        let pages = vec![PathBuf::from("page_1_ocr.pdf"), PathBuf::from("page_2_ocr.pdf")];
        let args = processor().merge_args(&pages, Path::new("ocr_doc.pdf"));
        assert_eq!(args[4], OsString::from("-sOutputFile=ocr_doc.pdf"));
        assert_eq!(&args[5..], &[OsString::from("page_1_ocr.pdf"), OsString::from("page_2_ocr.pdf")]);
        assert!(!args.iter().any(|a| a.to_string_lossy().starts_with("-dPDFSETTINGS")));
    }

    #[test]
    fn test_recognize_args() {
        let args = processor().recognize_args(Path::new("page-1.png"), Path::new("page_1_ocr"));
        let expected: Vec<OsString> = ["page-1.png", "page_1_ocr", "-l", "eng", "pdf"]
            .into_iter()
            .map(OsString::from)
            .collect();
        assert_eq!(args, expected);
    }

    #[test]
    fn test_page_number() {
        assert_eq!(page_number("page-1.png"), Some(1));
        assert_eq!(page_number("page-012.png"), Some(12));
        assert_eq!(page_number("page-1.pdf"), None);
        assert_eq!(page_number("page_1_ocr.pdf"), None);
        assert_eq!(page_number("other-1.png"), None);
    }

    #[tokio::test]
    async fn test_collect_page_images_orders_numerically() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["page-10.png", "page-2.png", "page-1.png", "notes.txt"] {
            tokio::fs::write(dir.path().join(name), b"x").await.unwrap();
        }

        let images = collect_page_images(dir.path()).await.unwrap();
        let names: Vec<_> = images
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["page-1.png", "page-2.png", "page-10.png"]);
    }

    #[tokio::test]
    async fn test_passthrough_copies_input() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.pdf");
        let output = dir.path().join("compress_in.pdf");
        tokio::fs::write(&input, b"%PDF-1.4 test").await.unwrap();

        PassthroughProcessor
            .process(Operation::Compress, &input, &output)
            .await
            .unwrap();
        assert_eq!(tokio::fs::read(&output).await.unwrap(), b"%PDF-1.4 test");
    }

    #[tokio::test]
    async fn test_missing_ghostscript_fails_compress() {
        let mut config = AppConfig::default();
        config.ghostscript_path = PathBuf::from("/nonexistent/gs");
        let processor = ExternalToolProcessor::from_config(&config);

        let dir = tempfile::tempdir().unwrap();
        let result = processor
            .compress_pdf(&dir.path().join("in.pdf"), &dir.path().join("out.pdf"))
            .await;
        assert!(matches!(result, Err(ToolError::NotFound(_))));

        let status = processor.health_check().await;
        assert_eq!(status.len(), 3);
        assert!(!status[0].available);
    }
}
