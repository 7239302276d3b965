// Newline framing of the inbound serial byte stream

/// Splits arbitrarily chunked input into complete, trimmed, non-blank lines.
///
/// Anything after the last `\n` is carried over to the next call. Framing works
/// on raw bytes so a multi-byte character split across reads survives intact.
#[derive(Debug, Default)]
pub struct LineFramer {
    carry: Vec<u8>,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.carry.extend_from_slice(chunk);

        let Some(last_newline) = self.carry.iter().rposition(|&b| b == b'\n') else {
            return Vec::new();
        };

        let rest = self.carry.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.carry, rest);

        complete
            .split(|&b| b == b'\n')
            .map(|segment| String::from_utf8_lossy(segment).trim().to_string())
            .filter(|line| !line.is_empty())
            .collect()
    }

    /// Bytes held back waiting for a terminator
    pub fn pending(&self) -> usize {
        self.carry.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_split_across_chunks() {
        let mut framer = LineFramer::new();

        let first = framer.push(b"{\"a\":1}\n{\"b\":2");
        assert_eq!(first, vec![r#"{"a":1}"#.to_string()]);
        assert_eq!(framer.pending(), br#"{"b":2"#.len());

        let second = framer.push(b"}\n");
        assert_eq!(second, vec![r#"{"b":2}"#.to_string()]);
        assert_eq!(framer.pending(), 0);
    }

    #[test]
    fn test_coalesced_lines_and_blanks() {
        let mut framer = LineFramer::new();
        let lines = framer.push(b"one\r\n\n   \ntwo\nthr");
        assert_eq!(lines, vec!["one".to_string(), "two".to_string()]);

        assert!(framer.push(b"ee").is_empty());
        assert_eq!(framer.push(b"\n"), vec!["three".to_string()]);
    }

    #[test]
    fn test_multibyte_split() {
        let mut framer = LineFramer::new();
        let text = "{\"status\":\"温度\"}\n".as_bytes();
        let (head, tail) = text.split_at(13);

        assert!(framer.push(head).is_empty());
        assert_eq!(framer.push(tail), vec!["{\"status\":\"温度\"}".to_string()]);
    }
}
