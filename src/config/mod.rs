use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Runtime configuration for the upload directory and the external PDF tools
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Directory holding uploads and processed outputs (default: "uploads")
    pub upload_dir: PathBuf,

    /// Maximum upload size in bytes (default: 100 MB)
    pub max_file_size: usize,

    /// Ghostscript binary (default: "/usr/bin/gs")
    pub ghostscript_path: PathBuf,

    /// Tesseract binary (default: "/usr/bin/tesseract")
    pub tesseract_path: PathBuf,

    /// Directory containing the Poppler utilities such as pdftoppm (default: "/usr/bin").
    /// Empty means "look them up on PATH".
    pub poppler_path: PathBuf,

    /// Tesseract language pack (default: "eng")
    pub ocr_language: String,

    /// Rasterization resolution for OCR (default: 200)
    pub ocr_dpi: u32,

    /// Ghostscript -dPDFSETTINGS preset (default: "/ebook")
    pub pdf_settings: String,

    /// Ghostscript -dCompatibilityLevel (default: "1.4")
    pub compatibility_level: String,

    /// Per-invocation time limit for external tools in seconds (default: 300)
    pub tool_timeout_secs: u64,

    /// Processor backend: "external" or "passthrough" (default: "external")
    pub processor_type: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("uploads"),
            max_file_size: 100 * 1024 * 1024, // 100 MB
            ghostscript_path: PathBuf::from("/usr/bin/gs"),
            tesseract_path: PathBuf::from("/usr/bin/tesseract"),
            poppler_path: PathBuf::from("/usr/bin"),
            ocr_language: "eng".to_string(),
            ocr_dpi: 200,
            pdf_settings: "/ebook".to_string(),
            compatibility_level: "1.4".to_string(),
            tool_timeout_secs: 300,
            processor_type: "external".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            upload_dir: env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.upload_dir),

            max_file_size: env::var("MAX_FILE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_file_size),

            ghostscript_path: env::var("GHOSTSCRIPT_PATH")
                .map(PathBuf::from)
                .unwrap_or(default.ghostscript_path),

            tesseract_path: env::var("TESSERACT_PATH")
                .map(PathBuf::from)
                .unwrap_or(default.tesseract_path),

            poppler_path: env::var("POPPLER_PATH")
                .map(PathBuf::from)
                .unwrap_or(default.poppler_path),

            ocr_language: env::var("OCR_LANGUAGE").unwrap_or(default.ocr_language),

            ocr_dpi: env::var("OCR_DPI")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|dpi| *dpi > 0)
                .unwrap_or(default.ocr_dpi),

            pdf_settings: env::var("PDF_SETTINGS").unwrap_or(default.pdf_settings),

            compatibility_level: env::var("PDF_COMPATIBILITY_LEVEL")
                .unwrap_or(default.compatibility_level),

            tool_timeout_secs: env::var("TOOL_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.tool_timeout_secs),

            processor_type: env::var("PDF_PROCESSOR").unwrap_or(default.processor_type),
        }
    }

    /// Create config for development: tools are resolved through PATH
    pub fn development() -> Self {
        Self {
            ghostscript_path: PathBuf::from("gs"),
            tesseract_path: PathBuf::from("tesseract"),
            poppler_path: PathBuf::new(),
            tool_timeout_secs: 60,
            ..Self::default()
        }
    }

    pub fn pdftoppm_path(&self) -> PathBuf {
        if self.poppler_path.as_os_str().is_empty() {
            PathBuf::from("pdftoppm")
        } else {
            self.poppler_path.join("pdftoppm")
        }
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }
}
