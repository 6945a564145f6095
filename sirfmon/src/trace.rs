//! The packet trace: lines shown in the trace panel and mirrored to an
//! optional append-only log file.

use std::{
    fmt::Write as _,
    fs::{File, OpenOptions},
    io::{self, LineWriter, Write},
    mem,
    path::{Path, PathBuf},
};

use sirf::PacketKind;
use tracing::warn;

struct TraceLog {
    path: PathBuf,
    file: LineWriter<File>,
}

#[derive(Default)]
pub struct TraceSink {
    pending: Vec<String>,
    log: Option<TraceLog>,
}

impl TraceSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a line for the trace panel, and writes it to the log file
    /// when one is open.
    pub fn line(&mut self, text: impl Into<String>) {
        let text = text.into();
        if let Some(log) = &mut self.log {
            if let Err(e) = writeln!(log.file, "{text}") {
                warn!("Failed writing trace log {}: {e}", log.path.display());
            }
        }
        self.pending.push(text);
    }

    /// Lines queued since the last call.
    pub fn take(&mut self) -> Vec<String> {
        mem::take(&mut self.pending)
    }

    #[cfg(test)]
    pub fn log_path(&self) -> Option<&Path> {
        self.log.as_ref().map(|l| l.path.as_path())
    }

    pub fn open_log(&mut self, path: &Path) -> io::Result<()> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        self.log = Some(TraceLog {
            path: path.to_path_buf(),
            file: LineWriter::new(file),
        });
        Ok(())
    }

    /// Flushes and closes the log file, returning its path.
    pub fn close_log(&mut self) -> Option<PathBuf> {
        let mut log = self.log.take()?;
        if let Err(e) = log.file.flush() {
            warn!("Failed flushing trace log {}: {e}", log.path.display());
        }
        Some(log.path)
    }
}

fn push_escaped(out: &mut String, bytes: &[u8]) {
    for &b in bytes {
        if b.is_ascii_graphic() || b == b' ' {
            out.push(char::from(b));
        } else {
            let _ = write!(out, "\\x{b:02x}");
        }
    }
}

/// `>>>` line for an outbound message: text if it looks like an NMEA
/// sentence, with `\xNN` for unprintable bytes, hex otherwise.
pub fn outbound_dump(bytes: &[u8]) -> String {
    let mut out = String::from(">>>");
    if bytes.first() == Some(&b'$') {
        push_escaped(&mut out, bytes);
    } else {
        for b in bytes {
            let _ = write!(out, " {b:02x}");
        }
    }
    out
}

/// `>>>` line for a text command to the daemon.
pub fn outbound_text(request: &str) -> String {
    let mut out = String::from(">>>");
    push_escaped(&mut out, request.as_bytes());
    out
}

/// Trace line for an inbound packet that is not SiRF binary.
pub fn inbound_dump(kind: PacketKind, frame: &[u8]) -> String {
    let mut out = String::new();
    match kind {
        PacketKind::Nmea => {
            let _ = write!(out, "NMEA ({}) ", frame.len());
            let mut text = frame;
            while let [rest @ .., b'\r' | b'\n'] = text {
                text = rest;
            }
            push_escaped(&mut out, text);
        },
        PacketKind::Ubx | PacketKind::Sirf => {
            let label = if kind == PacketKind::Ubx { "UBX" } else { "SiRF" };
            let _ = write!(out, "{label} ({}) ", frame.len());
            for b in frame {
                let _ = write!(out, "{b:02x}");
            }
        },
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_dump() {
        assert_eq!(
            outbound_dump(&[0xa0, 0xa2, 0x00, 0x02, 0x84, 0x00, 0x00, 0x84, 0xb0, 0xb3]),
            ">>> a0 a2 00 02 84 00 00 84 b0 b3"
        );
    }

    #[test]
    fn sentence_dump() {
        assert_eq!(
            outbound_dump(b"$PSRF100,0,4800,8,1,0*0F\r\n"),
            ">>>$PSRF100,0,4800,8,1,0*0F\\x0d\\x0a"
        );
    }

    #[test]
    fn daemon_command_dump() {
        assert_eq!(outbound_text("B=9600\r\n"), ">>>B=9600\\x0d\\x0a");
    }

    #[test]
    fn inbound_packets_that_are_not_decoded() {
        assert_eq!(
            inbound_dump(PacketKind::Nmea, b"$GPGGA,1*4B\r\n"),
            "NMEA (13) $GPGGA,1*4B"
        );
        assert_eq!(
            inbound_dump(PacketKind::Ubx, &[0xb5, 0x62, 0x0a, 0x04]),
            "UBX (4) b5620a04"
        );
    }

    #[test]
    fn log_file_mirrors_lines() {
        let path = std::env::temp_dir().join(format!("sirfmon-trace-{}.log", std::process::id()));
        let _ = std::fs::remove_file(&path);

        let mut sink = TraceSink::new();
        sink.line("before");
        sink.open_log(&path).unwrap();
        sink.line("MND 0x02=(49) a0a2");
        assert_eq!(sink.log_path(), Some(path.as_path()));
        assert_eq!(sink.close_log(), Some(path.clone()));
        sink.line("after");

        assert_eq!(sink.take(), ["before", "MND 0x02=(49) a0a2", "after"]);
        assert!(sink.take().is_empty());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "MND 0x02=(49) a0a2\n");
        std::fs::remove_file(&path).unwrap();
    }
}
