/// Longest record we keep accumulating before giving up on it.
pub const MAX_LINE_BYTES: usize = 4096;
/// Splits a byte stream into newline-terminated text records.
///
/// Bytes after the last `\n` stay pending until a later chunk completes them, so a
/// line split across two reads is reassembled instead of being parsed in halves.
pub struct LineIngestor {
    pending: Vec<u8>,
    max_line_bytes: usize,
    // set while discarding the tail of an oversize record
    overflowed: bool,
}
impl Default for LineIngestor {
    fn default() -> Self {
        Self::with_max_line(MAX_LINE_BYTES)
    }
}
impl LineIngestor {
    pub fn with_max_line(max_line_bytes: usize) -> Self {
        Self {
            pending: Vec::new(),
            max_line_bytes: max_line_bytes.max(1),
            overflowed: false,
        }
    }
    /// Feed freshly read bytes; returns every line they complete, trimmed.
    ///
    /// Records that are not valid UTF-8 are dropped.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &byte in bytes {
            if byte == b'\n' {
                if self.overflowed {
                    self.overflowed = false;
                } else if let Some(line) = self.decode_pending() {
                    lines.push(line);
                }
                self.pending.clear();
                continue;
            }
            if self.overflowed {
                continue;
            }
            if self.pending.len() >= self.max_line_bytes {
                log::warn!(
                    "dropping serial record longer than {} bytes",
                    self.max_line_bytes
                );
                self.pending.clear();
                self.overflowed = true;
                continue;
            }
            self.pending.push(byte);
        }
        lines
    }
    /// Forget any partial record, e.g. after a reconnect.
    pub fn reset(&mut self) {
        self.pending.clear();
        self.overflowed = false;
    }
    #[cfg(test)]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
    fn decode_pending(&self) -> Option<String> {
        match std::str::from_utf8(&self.pending) {
            Ok(text) => Some(text.trim().to_owned()),
            Err(err) => {
                log::debug!("dropping undecodable serial record: {err}");
                None
            }
        }
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn splits_complete_lines_and_keeps_partial() {
        let mut ingestor = LineIngestor::default();
        let lines = ingestor.feed(b"1,2\r\n3,4\n5,");
        assert_eq!(lines, vec!["1,2".to_string(), "3,4".to_string()]);
        assert_eq!(ingestor.pending_len(), 2);
        let lines = ingestor.feed(b"6\n");
        assert_eq!(lines, vec!["5,6".to_string()]);
        assert_eq!(ingestor.pending_len(), 0);
    }
    #[test]
    fn drops_invalid_utf8_record_only() {
        let mut ingestor = LineIngestor::default();
        let lines = ingestor.feed(b"1,2\n\xff\xfe,3\n4,5\n");
        assert_eq!(lines, vec!["1,2".to_string(), "4,5".to_string()]);
    }
    #[test]
    fn blank_records_pass_through_as_empty() {
        let mut ingestor = LineIngestor::default();
        assert_eq!(ingestor.feed(b"\r\n"), vec![String::new()]);
    }
    #[test]
    fn oversize_record_is_discarded_until_newline() {
        let mut ingestor = LineIngestor::with_max_line(8);
        let lines = ingestor.feed(b"123456789012");
        assert!(lines.is_empty());
        assert_eq!(ingestor.pending_len(), 0);
        let lines = ingestor.feed(b"345\n7,8\n");
        assert_eq!(lines, vec!["7,8".to_string()]);
    }
    #[test]
    fn reset_discards_partial_line() {
        let mut ingestor = LineIngestor::default();
        ingestor.feed(b"1,2");
        ingestor.reset();
        assert_eq!(ingestor.feed(b"3\n"), vec!["3".to_string()]);
    }
}
