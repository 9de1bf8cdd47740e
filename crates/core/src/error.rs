use thiserror::Error;

/// Structural failures while decoding a payload.
///
/// Malformed scalars, unknown elements and unknown enum tokens are absorbed by
/// the decoders and never show up here.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("payload ended before </{element}> was found (byte offset {offset})")]
    UnexpectedEof { element: String, offset: usize },

    #[error("malformed XML at byte offset {offset}: {source}")]
    Xml {
        offset: usize,
        #[source]
        source: quick_xml::Error,
    },
}

impl DecodeError {
    /// Byte offset into the payload where decoding stopped.
    pub fn offset(&self) -> usize {
        match self {
            DecodeError::UnexpectedEof { offset, .. } | DecodeError::Xml { offset, .. } => *offset,
        }
    }
}
