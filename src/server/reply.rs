//! FTP reply codes and framing (spec.md §4.2/§6), following the teacher
//! crate's `server/controlchan/reply.rs` and `codecs.rs`.

use std::io::Write;

use bytes::BytesMut;
use tokio_util::codec::Encoder;

/// A reply to the FTP client: either a single line, a multi-line block, or
/// nothing (used internally when a handler hands control to the data
/// channel coordinator and the 125/150/226/421/426 reply is sent
/// elsewhere).
#[derive(Debug, Clone)]
pub enum Reply {
    None,
    Single { code: ReplyCode, message: String },
    MultiLine { code: ReplyCode, lines: Vec<String> },
}

impl Reply {
    pub fn new(code: ReplyCode, message: impl Into<String>) -> Self {
        Reply::Single { code, message: message.into() }
    }

    /// `lines` must have at least one element; all but the last are
    /// continuation lines, the last carries the closing code.
    pub fn multiline(code: ReplyCode, lines: Vec<String>) -> Self {
        Reply::MultiLine { code, lines }
    }

    pub fn none() -> Self {
        Reply::None
    }
}

/// The reply codes this crate sends, restricted to the authoritative
/// subset named by spec.md §4.7/§6 plus the handful of RFC 959 codes
/// needed to frame them, following the teacher's `ReplyCode` enum
/// (`server/controlchan/reply.rs`) trimmed to what this crate actually
/// emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ReplyCode {
    DataConnectionAlreadyOpen = 125,
    FileStatusOkay = 150,

    CommandOkay = 200,
    HelpMessage = 214,
    SystemStatus = 211,
    FileStatus = 213,
    SystemType = 215,
    ServiceReady = 220,
    ClosingControlConnection = 221,
    ClosingDataConnection = 226,
    EnteringPassiveMode = 227,
    UserLoggedIn = 230,
    FileActionOkay = 250,
    PathCreated = 257,

    NeedPassword = 331,
    NeedAccount = 332,
    FileActionPending = 350,

    ServiceNotAvailable = 421,
    ConnectionClosed = 426,

    CommandSyntaxError = 500,
    ParameterSyntaxError = 501,
    CommandNotImplemented = 502,
    BadCommandSequence = 503,
    CommandNotImplementedForParameter = 504,
    NotLoggedIn = 530,
    AuthFailed = 430,
    FileError = 550,
}

/// Decoder/Encoder for the control channel: splits on `\n` (tolerating a
/// bare LF as spec.md §4.2/§6 requires) and renders [`Reply`] values per
/// §4.2's multi-line framing rule, following the teacher's `FtpCodec`
/// (`server/controlchan/codecs.rs`).
pub(crate) struct ReplyCodec {
    next_index: usize,
}

impl ReplyCodec {
    pub fn new() -> Self {
        ReplyCodec { next_index: 0 }
    }
}

impl tokio_util::codec::Decoder for ReplyCodec {
    type Item = String;
    type Error = std::io::Error;

    fn decode(&mut self, buf: &mut BytesMut) -> std::io::Result<Option<String>> {
        if let Some(newline_offset) = buf[self.next_index..].iter().position(|b| *b == b'\n') {
            let newline_index = newline_offset + self.next_index;
            let line = buf.split_to(newline_index + 1);
            self.next_index = 0;
            let line = String::from_utf8_lossy(&line).into_owned();
            let line = line.trim_end_matches(['\r', '\n']).to_string();
            Ok(Some(line))
        } else {
            self.next_index = buf.len();
            Ok(None)
        }
    }
}

impl Encoder<Reply> for ReplyCodec {
    type Error = std::io::Error;

    fn encode(&mut self, reply: Reply, buf: &mut BytesMut) -> std::io::Result<()> {
        let mut out = Vec::new();
        match reply {
            Reply::None => return Ok(()),
            Reply::Single { code, message } => {
                write!(out, "{} {}\r\n", code as u32, message)?;
            }
            Reply::MultiLine { code, mut lines } => {
                let last = lines.pop().unwrap_or_default();
                let mut middle = lines.into_iter();
                if let Some(first) = middle.next() {
                    write!(out, "{}-{}\r\n", code as u32, first)?;
                    for line in middle {
                        write!(out, " {}\r\n", line)?;
                    }
                    write!(out, "{} {}\r\n", code as u32, last)?;
                } else {
                    write!(out, "{} {}\r\n", code as u32, last)?;
                }
            }
        }
        buf.extend_from_slice(&out);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn single_line_reply_is_framed_with_crlf() {
        let mut codec = ReplyCodec::new();
        let mut buf = BytesMut::new();
        codec.encode(Reply::new(ReplyCode::CommandOkay, "OK"), &mut buf).unwrap();
        assert_eq!(&buf[..], b"200 OK\r\n");
    }

    #[test]
    fn multiline_reply_indents_continuations() {
        let mut codec = ReplyCodec::new();
        let mut buf = BytesMut::new();
        codec
            .encode(
                Reply::multiline(ReplyCode::SystemStatus, vec!["Features:".into(), "UTF8".into(), "END".into()]),
                &mut buf,
            )
            .unwrap();
        assert_eq!(&buf[..], b"211-Features:\r\n UTF8\r\n211 END\r\n");
    }

    #[test]
    fn decoder_accepts_bare_lf() {
        let mut codec = ReplyCodec::new();
        let mut buf = BytesMut::from(&b"USER anonymous\n"[..]);
        let line = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(line, "USER anonymous");
    }

    #[test]
    fn decoder_strips_trailing_cr() {
        let mut codec = ReplyCodec::new();
        let mut buf = BytesMut::from(&b"PWD\r\n"[..]);
        let line = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(line, "PWD");
    }
}
