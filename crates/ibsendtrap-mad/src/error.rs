/// Errors that can occur during MAD encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum MadError {
    /// The buffer is shorter than the structure being decoded.
    #[error("truncated {what} ({len} bytes, need {need})")]
    Truncated {
        what: &'static str,
        len: usize,
        need: usize,
    },

    /// The MAD header carries a base version other than 1.
    #[error("unsupported MAD base version {0}")]
    BadBaseVersion(u8),

    /// The data area described by the envelope does not fit in a MAD.
    #[error("data area out of bounds (offset {offset}, size {size}, max {max})")]
    DataOutOfBounds {
        offset: usize,
        size: usize,
        max: usize,
    },
}

pub type Result<T> = std::result::Result<T, MadError>;
