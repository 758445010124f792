//! Output plumbing shared by the commands

use derive_new::new;
use minus::Pager;
use std::io::{self, Write};

/// `Write` adapter feeding the minus pager
///
/// Graph rows are full of multi-byte glyphs, and a single `write` call may end in the
/// middle of one. Incomplete trailing bytes are held back until the rest arrives.
#[derive(new)]
pub struct PagerWriter {
    pager: Pager,
    #[new(default)]
    pending: Vec<u8>,
}

impl Write for PagerWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);

        let valid = match std::str::from_utf8(&self.pending) {
            Ok(text) => text.len(),
            // `error_len` is `None` when the input merely stops inside a character
            Err(error) if error.error_len().is_none() => error.valid_up_to(),
            Err(error) => {
                self.pending.clear();
                return Err(io::Error::new(io::ErrorKind::InvalidData, error));
            }
        };

        let rest = self.pending.split_off(valid);
        let text = String::from_utf8(std::mem::replace(&mut self.pending, rest))
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        if !text.is_empty() {
            self.pager.push_str(text).map_err(io::Error::other)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let bytes = std::mem::take(&mut self.pending);
        self.pager
            .push_str(String::from_utf8_lossy(&bytes))
            .map_err(io::Error::other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn split_characters_are_held_until_complete() {
        let mut writer = PagerWriter::new(Pager::new());
        let ellipsis = "…".as_bytes();

        writer.write_all(b"row ").unwrap();
        writer.write_all(&ellipsis[..1]).unwrap();
        assert_eq!(writer.pending, ellipsis[..1].to_vec());

        writer.write_all(&ellipsis[1..]).unwrap();
        assert!(writer.pending.is_empty());
    }

    #[test]
    fn invalid_bytes_are_rejected() {
        let mut writer = PagerWriter::new(Pager::new());

        let error = writer.write(&[0xff, b'a']).unwrap_err();

        assert_eq!(error.kind(), io::ErrorKind::InvalidData);
        assert!(writer.pending.is_empty());
    }
}
