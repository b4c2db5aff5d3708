//! The Transfer Engine (spec.md §4.5): chunked push (RETR/LIST/MLSD) and
//! pull (STOR/APPE) over an established data channel, with per-user
//! byte-rate pacing and ASCII-mode decoding, following `ftpd.py`'s `push`
//! and `pull` coroutines.

use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// How a transfer ended, following spec.md §4.5's reply-code mapping:
/// `Completed` ⇒ `226`, `TimedOut` ⇒ `421`, `Failed` ⇒ `426`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    Completed,
    TimedOut,
    Failed,
}

/// Sleeps enough that the elapsed time for one chunk is at least
/// `chunk_size / max_bytes_per_sec` seconds — token-bucket-free per-chunk
/// pacing, following spec.md §4.5. `max_bytes_per_sec == 0` means
/// unlimited: no sleep.
async fn pace(chunk_size: usize, max_bytes_per_sec: u64, started: Instant) {
    if max_bytes_per_sec == 0 {
        return;
    }
    let target = Duration::from_secs_f64(chunk_size as f64 / max_bytes_per_sec as f64);
    let elapsed = started.elapsed();
    if target > elapsed {
        tokio::time::sleep(target - elapsed).await;
    }
}

/// Pushes bytes from `source` to `sink` in `chunk_size` chunks, pacing
/// each write to `max_bytes_per_sec` (0 = unlimited). Used for
/// RETR/LIST/MLSD (spec.md §4.5's "Push (server→client)").
pub async fn push(
    mut sink: impl AsyncWrite + Unpin,
    mut source: impl AsyncRead + Unpin,
    chunk_size: usize,
    max_bytes_per_sec: u64,
    idle_timeout: Duration,
) -> TransferOutcome {
    let mut buf = vec![0u8; chunk_size.max(1)];
    loop {
        let read = match tokio::time::timeout(idle_timeout, source.read(&mut buf)).await {
            Ok(Ok(n)) => n,
            Ok(Err(_)) => return TransferOutcome::Failed,
            Err(_) => return TransferOutcome::TimedOut,
        };
        if read == 0 {
            return TransferOutcome::Completed;
        }
        let started = Instant::now();
        if sink.write_all(&buf[..read]).await.is_err() {
            return TransferOutcome::Failed;
        }
        if sink.flush().await.is_err() {
            return TransferOutcome::Failed;
        }
        pace(chunk_size, max_bytes_per_sec, started).await;
    }
}

/// Accumulates a trailing undecodable byte tail across reads before
/// decoding as UTF-8, following SPEC_FULL.md §4.5's Open Question
/// resolution (spec.md §9: "accumulate a trailing undecodable byte buffer
/// across reads before decoding").
#[derive(Debug, Default)]
struct AsciiDecoder {
    pending: Vec<u8>,
}

impl AsciiDecoder {
    fn feed(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);
        match std::str::from_utf8(&self.pending) {
            Ok(valid) => {
                let owned = valid.to_string();
                self.pending.clear();
                owned
            }
            Err(err) => {
                let valid_up_to = err.valid_up_to();
                let owned = String::from_utf8_lossy(&self.pending[..valid_up_to]).into_owned();
                self.pending.drain(..valid_up_to);
                owned
            }
        }
    }

    /// Flushes whatever undecodable tail remains at end-of-stream, with
    /// lossy replacement rather than silently dropping it.
    fn finish(&mut self) -> String {
        let owned = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        owned
    }
}

/// Pulls bytes from `source` to `sink` in up-to-`chunk_size` reads,
/// decoding as UTF-8 with replacement when `ascii` is set, pacing each
/// write to `max_bytes_per_sec` (0 = unlimited). Used for STOR/APPE
/// (spec.md §4.5's "Pull (client→server)").
pub async fn pull(
    mut source: impl AsyncRead + Unpin,
    mut sink: impl AsyncWrite + Unpin,
    chunk_size: usize,
    max_bytes_per_sec: u64,
    idle_timeout: Duration,
    ascii: bool,
) -> TransferOutcome {
    let mut buf = vec![0u8; chunk_size.max(1)];
    let mut decoder = AsciiDecoder::default();
    loop {
        let read = match tokio::time::timeout(idle_timeout, source.read(&mut buf)).await {
            Ok(Ok(n)) => n,
            Ok(Err(_)) => return TransferOutcome::Failed,
            Err(_) => return TransferOutcome::TimedOut,
        };
        if read == 0 {
            if ascii {
                let tail = decoder.finish();
                if !tail.is_empty() && sink.write_all(tail.as_bytes()).await.is_err() {
                    return TransferOutcome::Failed;
                }
            }
            if sink.flush().await.is_err() {
                return TransferOutcome::Failed;
            }
            return TransferOutcome::Completed;
        }
        let started = Instant::now();
        let wrote = if ascii {
            let text = decoder.feed(&buf[..read]);
            sink.write_all(text.as_bytes()).await
        } else {
            sink.write_all(&buf[..read]).await
        };
        if wrote.is_err() {
            return TransferOutcome::Failed;
        }
        pace(chunk_size, max_bytes_per_sec, started).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn push_copies_all_bytes_and_completes() {
        let data = b"hello world".to_vec();
        let mut out = Vec::new();
        let outcome = push(&mut out, &data[..], 4, 0, Duration::from_secs(1)).await;
        assert_eq!(outcome, TransferOutcome::Completed);
        assert_eq!(out, data);
    }

    #[tokio::test]
    async fn pull_binary_copies_all_bytes_and_completes() {
        let data = b"\x00\x01binary\xff".to_vec();
        let mut out = Vec::new();
        let outcome = pull(&data[..], &mut out, 4, 0, Duration::from_secs(1), false).await;
        assert_eq!(outcome, TransferOutcome::Completed);
        assert_eq!(out, data);
    }

    #[tokio::test]
    async fn pull_ascii_reassembles_multibyte_sequence_split_across_reads() {
        // "café" — the trailing two bytes of 'é' (0xC3 0xA9) straddle a
        // 5-byte chunk boundary; the decoder must not emit a replacement
        // character for the valid split sequence.
        let data = "café".as_bytes().to_vec();
        assert_eq!(data.len(), 5);
        let mut out = Vec::new();
        let outcome = pull(&data[..], &mut out, 4, 0, Duration::from_secs(1), true).await;
        assert_eq!(outcome, TransferOutcome::Completed);
        assert_eq!(String::from_utf8(out).unwrap(), "café");
    }

    #[tokio::test]
    async fn read_timeout_yields_timed_out() {
        struct NeverReady;
        impl AsyncRead for NeverReady {
            fn poll_read(
                self: std::pin::Pin<&mut Self>,
                _cx: &mut std::task::Context<'_>,
                _buf: &mut tokio::io::ReadBuf<'_>,
            ) -> std::task::Poll<std::io::Result<()>> {
                std::task::Poll::Pending
            }
        }
        let mut out = Vec::new();
        let outcome = push(&mut out, NeverReady, 4, 0, Duration::from_millis(20)).await;
        assert_eq!(outcome, TransferOutcome::TimedOut);
    }
}
