//! STOMP 1.2 frame codec.
//!
//! A frame on the wire is
//!
//! ```text
//! COMMAND\n
//! name:value\n
//! ...\n
//! \n
//! body\0
//! ```
//!
//! Brokers may send bare EOLs between frames as heart-beats and may split or
//! coalesce frames across WebSocket messages, so decoding goes through a
//! buffering [`FrameDecoder`].

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Connect,
    Stomp,
    Connected,
    Send,
    Subscribe,
    Unsubscribe,
    Disconnect,
    Message,
    Receipt,
    Error,
}

impl Command {
    pub fn as_str(self) -> &'static str {
        match self {
            Command::Connect => "CONNECT",
            Command::Stomp => "STOMP",
            Command::Connected => "CONNECTED",
            Command::Send => "SEND",
            Command::Subscribe => "SUBSCRIBE",
            Command::Unsubscribe => "UNSUBSCRIBE",
            Command::Disconnect => "DISCONNECT",
            Command::Message => "MESSAGE",
            Command::Receipt => "RECEIPT",
            Command::Error => "ERROR",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "CONNECT" => Command::Connect,
            "STOMP" => Command::Stomp,
            "CONNECTED" => Command::Connected,
            "SEND" => Command::Send,
            "SUBSCRIBE" => Command::Subscribe,
            "UNSUBSCRIBE" => Command::Unsubscribe,
            "DISCONNECT" => Command::Disconnect,
            "MESSAGE" => Command::Message,
            "RECEIPT" => Command::Receipt,
            "ERROR" => Command::Error,
            _ => return None,
        })
    }

    /// CONNECT and CONNECTED frames carry their headers verbatim.
    fn escapes_headers(self) -> bool {
        !matches!(
            self,
            Command::Connect | Command::Stomp | Command::Connected
        )
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("unknown STOMP command: {0}")]
    UnknownCommand(String),
    #[error("malformed header line: {0}")]
    MalformedHeader(String),
    #[error("invalid escape sequence in header: {0}")]
    InvalidEscape(String),
    #[error("invalid content-length: {0}")]
    InvalidContentLength(String),
    #[error("frame is not valid UTF-8")]
    InvalidUtf8,
}

/// A single STOMP frame. Header order is preserved; on lookup the first
/// occurrence of a repeated header wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub command: Command,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Frame {
    pub fn new(command: Command) -> Self {
        Self {
            command,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn encode(&self) -> String {
        let escape = self.command.escapes_headers();
        let mut out = String::with_capacity(64 + self.body.len());
        out.push_str(self.command.as_str());
        out.push('\n');
        for (name, value) in &self.headers {
            if escape {
                out.push_str(&escape_header(name));
                out.push(':');
                out.push_str(&escape_header(value));
            } else {
                out.push_str(name);
                out.push(':');
                out.push_str(value);
            }
            out.push('\n');
        }
        if !self.body.is_empty() && self.get("content-length").is_none() {
            out.push_str(&format!("content-length:{}\n", self.body.len()));
        }
        out.push('\n');
        out.push_str(&self.body);
        out.push('\0');
        out
    }
}

fn escape_header(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n"),
            ':' => out.push_str("\\c"),
            other => out.push(other),
        }
    }
    out
}

fn unescape_header(raw: &str) -> Result<String, FrameError> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            Some('c') => out.push(':'),
            _ => return Err(FrameError::InvalidEscape(raw.to_string())),
        }
    }
    Ok(out)
}

/// Incremental decoder over the byte stream of one connection.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Pop the next complete frame, `Ok(None)` if more input is needed.
    ///
    /// A malformed frame is discarded up to its NUL terminator before the
    /// error is returned, so decoding can resume with the following frame.
    pub fn next_frame(&mut self) -> Result<Option<Frame>, FrameError> {
        self.skip_heartbeats();
        if self.buffer.is_empty() {
            return Ok(None);
        }

        let Some((head, body_start)) = self.split_head() else {
            return Ok(None);
        };

        match self.decode_frame(&head, body_start) {
            Ok(Some((frame, consumed))) => {
                self.buffer.drain(..consumed);
                Ok(Some(frame))
            }
            Ok(None) => Ok(None),
            Err(e) => {
                self.discard_frame();
                Err(e)
            }
        }
    }

    fn skip_heartbeats(&mut self) {
        let skip = self
            .buffer
            .iter()
            .take_while(|b| **b == b'\n' || **b == b'\r')
            .count();
        self.buffer.drain(..skip);
    }

    /// Lines up to the blank line ending the header block, and the offset of
    /// the first body byte.
    fn split_head(&self) -> Option<(Vec<String>, usize)> {
        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(pos) = self.buffer[start..].iter().position(|b| *b == b'\n') {
            let end = start + pos;
            let mut line = &self.buffer[start..end];
            if line.last() == Some(&b'\r') {
                line = &line[..line.len() - 1];
            }
            start = end + 1;
            if line.is_empty() {
                return Some((lines, start));
            }
            lines.push(String::from_utf8_lossy(line).into_owned());
        }
        None
    }

    fn decode_frame(
        &self,
        head: &[String],
        body_start: usize,
    ) -> Result<Option<(Frame, usize)>, FrameError> {
        let (command_line, header_lines) = head
            .split_first()
            .ok_or_else(|| FrameError::UnknownCommand(String::new()))?;
        let command = Command::parse(command_line)
            .ok_or_else(|| FrameError::UnknownCommand(command_line.clone()))?;

        let mut frame = Frame::new(command);
        for line in header_lines {
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| FrameError::MalformedHeader(line.clone()))?;
            if command.escapes_headers() {
                frame
                    .headers
                    .push((unescape_header(name)?, unescape_header(value)?));
            } else {
                frame.headers.push((name.to_string(), value.to_string()));
            }
        }

        let body_end = match frame.get("content-length") {
            Some(raw) => {
                let len: usize = raw
                    .trim()
                    .parse()
                    .map_err(|_| FrameError::InvalidContentLength(raw.to_string()))?;
                if self.buffer.len() < body_start + len + 1 {
                    return Ok(None);
                }
                body_start + len
            }
            None => match self.buffer[body_start..].iter().position(|b| *b == 0) {
                Some(pos) => body_start + pos,
                None => return Ok(None),
            },
        };

        frame.body = std::str::from_utf8(&self.buffer[body_start..body_end])
            .map_err(|_| FrameError::InvalidUtf8)?
            .to_string();

        // Skip the NUL terminator
        Ok(Some((frame, body_end + 1)))
    }

    fn discard_frame(&mut self) {
        match self.buffer.iter().position(|b| *b == 0) {
            Some(pos) => {
                self.buffer.drain(..=pos);
            }
            None => self.buffer.clear(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(input: &str) -> Vec<Frame> {
        let mut decoder = FrameDecoder::new();
        decoder.push(input.as_bytes());
        let mut frames = Vec::new();
        while let Some(frame) = decoder.next_frame().unwrap() {
            frames.push(frame);
        }
        frames
    }

    #[test]
    fn test_encode_send() {
        let frame = Frame::new(Command::Send)
            .header("destination", "/app/chat.sendMessage")
            .header("content-type", "application/json")
            .with_body("{}");
        assert_eq!(
            frame.encode(),
            "SEND\ndestination:/app/chat.sendMessage\ncontent-type:application/json\ncontent-length:2\n\n{}\0"
        );
    }

    #[test]
    fn test_connect_headers_are_not_escaped() {
        let frame = Frame::new(Command::Connect).header("Authorization", "Bearer a:b");
        assert_eq!(frame.encode(), "CONNECT\nAuthorization:Bearer a:b\n\n\0");
    }

    #[test]
    fn test_header_escaping() {
        let frame = Frame::new(Command::Message)
            .header("note", "a:b\nc\\d")
            .with_body("x");
        let encoded = frame.encode();
        assert!(encoded.contains("note:a\\cb\\nc\\\\d\n"));

        let decoded = decode_all(&encoded);
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].get("note"), Some("a:b\nc\\d"));
    }

    #[test]
    fn test_decode_message_with_heartbeats() {
        let input = "\n\nMESSAGE\nsubscription:sub-0\ndestination:/topic/x\n\nhello\0\n\
                     RECEIPT\nreceipt-id:r-1\n\n\0\r\n";
        let frames = decode_all(input);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].command, Command::Message);
        assert_eq!(frames[0].get("subscription"), Some("sub-0"));
        assert_eq!(frames[0].body, "hello");
        assert_eq!(frames[1].command, Command::Receipt);
        assert_eq!(frames[1].get("receipt-id"), Some("r-1"));
    }

    #[test]
    fn test_decode_fragmented_frame() {
        let mut decoder = FrameDecoder::new();
        decoder.push(b"MESSAGE\nsubscr");
        assert_eq!(decoder.next_frame().unwrap(), None);
        decoder.push(b"iption:sub-1\n\n{\"a\":");
        assert_eq!(decoder.next_frame().unwrap(), None);
        decoder.push(b"1}\0");
        let frame = decoder.next_frame().unwrap().unwrap();
        assert_eq!(frame.body, "{\"a\":1}");
        assert_eq!(decoder.next_frame().unwrap(), None);
    }

    #[test]
    fn test_content_length_allows_embedded_nul() {
        let frames = decode_all("MESSAGE\ncontent-length:3\n\na\0b\0");
        assert_eq!(frames[0].body, "a\0b");
    }

    #[test]
    fn test_first_repeated_header_wins() {
        let frames = decode_all("MESSAGE\nfoo:1\nfoo:2\n\n\0");
        assert_eq!(frames[0].get("foo"), Some("1"));
    }

    #[test]
    fn test_crlf_line_endings() {
        let frames = decode_all("CONNECTED\r\nversion:1.2\r\n\r\n\0");
        assert_eq!(frames[0].command, Command::Connected);
        assert_eq!(frames[0].get("version"), Some("1.2"));
    }

    #[test]
    fn test_unknown_command_is_skipped() {
        let mut decoder = FrameDecoder::new();
        decoder.push(b"BOGUS\n\n\0MESSAGE\n\nok\0");
        assert_eq!(
            decoder.next_frame(),
            Err(FrameError::UnknownCommand("BOGUS".to_string()))
        );
        let frame = decoder.next_frame().unwrap().unwrap();
        assert_eq!(frame.body, "ok");
    }

    #[test]
    fn test_invalid_escape() {
        let mut decoder = FrameDecoder::new();
        decoder.push(b"MESSAGE\nbad:\\t\n\n\0");
        assert!(matches!(
            decoder.next_frame(),
            Err(FrameError::InvalidEscape(_))
        ));
    }
}
