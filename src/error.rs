use thiserror::Error;
use tracing_error::SpanTrace;

use crate::binary::{module::{Module, ModuleHeader}, section::Section};

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid module format at offset {offset:#x}: {reason}")]
    Format { offset: usize, reason: FormatReason },

    #[error("unexpected end of input at offset {offset:#x}")]
    Truncated { offset: usize },

    #[error("failed to read module")]
    Io(#[from] std::io::Error),

    #[error("module exceeds the size limit of {limit} bytes")]
    TooLarge { limit: u64 },

    #[error("decoding was cancelled")]
    Cancelled,
}

impl Error {
    /// Byte offset into the module the error points at, if any.
    pub fn offset(&self) -> Option<usize> {
        match self {
            Error::Format { offset, .. } | Error::Truncated { offset } => Some(*offset),
            _ => None,
        }
    }

    pub fn reason(&self) -> Option<&FormatReason> {
        match self {
            Error::Format { reason, .. } => Some(reason),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatReason {
    #[error("invalid magic number {0:02x?}")]
    Magic(Vec<u8>),

    #[error("invalid section id {0}")]
    SectionId(u32),

    #[error("invalid external kind 0x{0:02x}")]
    ExternalKind(u8),

    #[error("varint overflows 32 bits")]
    VarintOverflow,

    #[error("invalid value type 0x{0:02x}")]
    ValueType(u8),

    #[error("invalid element type 0x{0:02x}")]
    ElemType(u8),

    #[error("invalid mutability flag {0}")]
    Mutability(u32),

    #[error("name is not valid utf-8")]
    Utf8,

    #[error("malformed input ({0})")]
    Malformed(String),
}

/// A failed decode: the error together with whatever was decoded before it.
#[derive(Debug, Error)]
#[error("failed to decode wasm module")]
pub struct DecodeError {
    /// `None` when the failure happened before the header was read.
    pub header: Option<ModuleHeader>,
    pub sections: Vec<Section>,
    #[source]
    pub error: Error,
    pub span_trace: SpanTrace,
}

impl DecodeError {
    pub(crate) fn partial(module: Module, error: Error) -> Self {
        Self {
            header: Some(module.header),
            sections: module.sections,
            error,
            span_trace: SpanTrace::capture(),
        }
    }
}

impl From<Error> for DecodeError {
    fn from(error: Error) -> Self {
        Self {
            header: None,
            sections: vec![],
            error,
            span_trace: SpanTrace::capture(),
        }
    }
}

#[cfg(test)]
mod error_tests {
    use super::{DecodeError, Error, FormatReason};

    #[test]
    fn format_messages() {
        let err = Error::Format { offset: 0x10, reason: FormatReason::SectionId(42) };
        assert_eq!("invalid module format at offset 0x10: invalid section id 42", err.to_string());
        assert_eq!(Some(0x10), err.offset());
        assert_eq!(Some(&FormatReason::SectionId(42)), err.reason());

        let err = Error::Format { offset: 0, reason: FormatReason::Magic(vec![0x7f, 0x45, 0x4c, 0x46]) };
        assert_eq!("invalid module format at offset 0x0: invalid magic number [7f, 45, 4c, 46]", err.to_string());

        let err = Error::Truncated { offset: 0x2a };
        assert_eq!("unexpected end of input at offset 0x2a", err.to_string());
        assert_eq!(None, err.reason());
    }

    #[test]
    fn decode_error_keeps_source() {
        let err = DecodeError::from(Error::Cancelled);
        assert!(err.header.is_none());
        assert!(err.sections.is_empty());

        let chain = format!("{:#}", anyhow::Error::new(err));
        assert_eq!("failed to decode wasm module: decoding was cancelled", chain);
    }
}
