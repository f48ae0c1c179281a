//! Top-level field boundaries of an encoded message.
//!
//! Used to salvage the well-formed prefix of an input that does not decode as a
//! whole. Key and length handling is delegated to `prost::encoding` so the
//! byte-level rules match what the generated message types accept.

use prost::encoding::{decode_key, skip_field, DecodeContext};
use tracing::trace;

/// Iterator over the encoded bytes of each top-level field, key included.
///
/// Stops at the first field that cannot be delimited: a malformed key, a
/// truncated value, or an unbalanced group.
#[derive(Debug, Clone)]
pub struct FieldSpans<'a> {
    rest: &'a [u8],
}

/// Split `input` into top-level field spans
#[must_use]
pub const fn field_spans(input: &[u8]) -> FieldSpans<'_> {
    FieldSpans { rest: input }
}

impl FieldSpans<'_> {
    /// Length of the next field, or `None` if it cannot be delimited
    fn next_len(&self) -> Option<usize> {
        let mut buf = self.rest;
        let (tag, wire_type) = match decode_key(&mut buf) {
            Ok(key) => key,
            Err(e) => {
                trace!(error = %e, "Malformed field key");
                return None;
            }
        };
        if let Err(e) = skip_field(wire_type, tag, &mut buf, DecodeContext::default()) {
            trace!(tag, error = %e, "Field cannot be delimited");
            return None;
        }
        Some(self.rest.len() - buf.len())
    }
}

impl<'a> Iterator for FieldSpans<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<&'a [u8]> {
        if self.rest.is_empty() {
            return None;
        }
        let Some((span, rest)) = self.next_len().and_then(|len| self.rest.split_at_checked(len))
        else {
            self.rest = &[];
            return None;
        };
        self.rest = rest;
        Some(span)
    }
}
