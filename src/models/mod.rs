use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// Transformation applied to an uploaded PDF
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Re-encode through Ghostscript with a size-oriented preset
    Compress,
    /// Rasterize, recognize text with Tesseract, and rebuild a searchable PDF
    Ocr,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Compress => "compress",
            Operation::Ocr => "ocr",
        }
    }

    /// Name of the file an operation writes for a given upload
    pub fn output_filename(&self, filename: &str) -> String {
        format!("{}_{}", self.as_str(), filename)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownOperation(pub String);

impl fmt::Display for UnknownOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown operation '{}'", self.0)
    }
}

impl std::error::Error for UnknownOperation {}

impl FromStr for Operation {
    type Err = UnknownOperation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "compress" => Ok(Operation::Compress),
            "ocr" => Ok(Operation::Ocr),
            other => Err(UnknownOperation(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_operation() {
        assert_eq!("compress".parse::<Operation>(), Ok(Operation::Compress));
        assert_eq!("ocr".parse::<Operation>(), Ok(Operation::Ocr));
        assert!("OCR".parse::<Operation>().is_err());
        assert!("rotate".parse::<Operation>().is_err());
        assert!("".parse::<Operation>().is_err());
    }

    #[test]
    fn test_output_filename() {
        assert_eq!(
            Operation::Compress.output_filename("report.pdf"),
            "compress_report.pdf"
        );
        assert_eq!(Operation::Ocr.output_filename("scan.pdf"), "ocr_scan.pdf");
    }
}
