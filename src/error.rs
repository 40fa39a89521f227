//! Session failure kinds.

/// Why a detection session stopped abnormally.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The capture device could not be opened. Nothing was processed.
    #[error("capture device {device} unavailable: {reason}")]
    DeviceUnavailable { device: String, reason: String },

    /// A frame read failed mid-session.
    #[error("frame acquisition failed: {reason}")]
    AcquisitionFailure { reason: String },

    /// The vision pipeline rejected a frame.
    #[error("frame processing failed: {reason}")]
    ProcessingFault { reason: String },
}

impl SessionError {
    pub fn device_unavailable(device: impl Into<String>, err: &anyhow::Error) -> Self {
        Self::DeviceUnavailable {
            device: device.into(),
            reason: format!("{:#}", err),
        }
    }

    pub fn acquisition(err: &anyhow::Error) -> Self {
        Self::AcquisitionFailure {
            reason: format!("{:#}", err),
        }
    }

    pub fn processing(err: &anyhow::Error) -> Self {
        Self::ProcessingFault {
            reason: format!("{:#}", err),
        }
    }

    /// Short kind label for logs and summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            SessionError::DeviceUnavailable { .. } => "device_unavailable",
            SessionError::AcquisitionFailure { .. } => "acquisition_failure",
            SessionError::ProcessingFault { .. } => "processing_fault",
        }
    }
}
