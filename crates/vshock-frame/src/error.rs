/// Errors that can occur while building, encoding or decoding frames.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// A buffer handed to the decoder is not exactly one frame long.
    #[error("invalid frame length ({len} bytes, expected {expected})")]
    InvalidLength { len: usize, expected: usize },

    /// A decoded header field holds a value the format does not allow.
    #[error("invalid header: {field} = {value} (max {max})")]
    InvalidHeader {
        field: &'static str,
        value: u8,
        max: u8,
    },

    /// A value supplied for a frame field does not fit the field.
    #[error("{field} out of range ({value}, max {max})")]
    FieldOutOfRange {
        field: &'static str,
        value: usize,
        max: usize,
    },
}

impl FrameError {
    /// True for malformed input on decode, as opposed to a bad caller-supplied value.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            FrameError::InvalidLength { .. } | FrameError::InvalidHeader { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
