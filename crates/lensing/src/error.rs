use std::fmt;

use serde::Serialize;

use crate::types::RendererHandle;

/// Failure taxonomy surfaced to callers of the renderer and the bridge.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("GPU device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("failed to allocate {what} at {width}x{height}: {reason}")]
    AllocationFailure {
        what: &'static str,
        width: u32,
        height: u32,
        reason: String,
    },
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("renderer {0} has not been created or was disposed")]
    NotInitialized(RendererHandle),
    #[error("GPU dispatch failed: {0}")]
    DispatchFailed(String),
}

impl RenderError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArguments(message.into())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            RenderError::DeviceUnavailable(_) => ErrorCode::NoDevice,
            RenderError::AllocationFailure { .. } => ErrorCode::ResizeFailed,
            RenderError::InvalidArguments(_) => ErrorCode::BadArgs,
            RenderError::NotInitialized(_) => ErrorCode::NoTex,
            RenderError::DispatchFailed(_) => ErrorCode::RenderFailed,
        }
    }
}

/// Machine-readable error category carried across the command boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    NoDevice,
    ResizeFailed,
    BadArgs,
    NoTex,
    RenderFailed,
    NotImplemented,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::NoDevice => "no_device",
            ErrorCode::ResizeFailed => "resize_failed",
            ErrorCode::BadArgs => "bad_args",
            ErrorCode::NoTex => "no_tex",
            ErrorCode::RenderFailed => "render_failed",
            ErrorCode::NotImplemented => "not_implemented",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
