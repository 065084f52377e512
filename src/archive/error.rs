use std::fmt;
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveErrorCode {
    NotFound,
    PermissionDenied,
    ReadFailed,
    WriteFailed,
    UnknownError,
}

impl ArchiveErrorCode {
    pub fn as_code_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::PermissionDenied => "permission_denied",
            Self::ReadFailed => "read_failed",
            Self::WriteFailed => "write_failed",
            Self::UnknownError => "unknown_error",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ArchiveError {
    code: ArchiveErrorCode,
    message: String,
}

impl ArchiveError {
    pub(super) fn new(code: ArchiveErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn code(&self) -> ArchiveErrorCode {
        self.code
    }

    pub fn code_str(&self) -> &'static str {
        self.code.as_code_str()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub(super) fn io(context: &str, err: io::Error) -> Self {
        let code = match err.kind() {
            io::ErrorKind::NotFound => ArchiveErrorCode::NotFound,
            io::ErrorKind::PermissionDenied => ArchiveErrorCode::PermissionDenied,
            _ => ArchiveErrorCode::UnknownError,
        };
        Self::new(code, format!("{context}: {err}"))
    }

    pub(super) fn zip(context: &str, fallback: ArchiveErrorCode, err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(io_err) => Self::io(context, io_err),
            zip::result::ZipError::FileNotFound => {
                Self::new(ArchiveErrorCode::NotFound, format!("{context}: entry not found"))
            }
            other => Self::new(fallback, format!("{context}: {other}")),
        }
    }
}

impl fmt::Display for ArchiveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ArchiveError {}

pub type ArchiveResult<T> = Result<T, ArchiveError>;
