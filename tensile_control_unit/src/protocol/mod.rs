//! Line-oriented command channel.
//!
//! ## Outbound formats
//!
//! | Response  | Line                                              |
//! |-----------|---------------------------------------------------|
//! | Ok        | `OK[ <msg>]`                                      |
//! | Error     | `ERROR <code> <description>[: <msg>]`             |
//! | Status    | `STATUS <state> F:<%.2f> P:<%.3f> R:<0/1>`        |
//! | Force     | `FORCE <%.3f>`                                    |
//! | Position  | `POS <%.3f>`                                      |
//! | Config    | `CONFIG SPD:<%.2f> MAXF:<%.1f> MAXE:<%.1f> SR:<ms>`|
//! | Data      | `DATA <ms>,<%.3f>,<%.4f>,<%.3f>,<%.6f>`           |
//! | Identity  | `ID <name> V<version> <vendor>`                   |

pub mod line;

use core::fmt::{self, Write as _};
use std::io::{self, Write};

use tensile_common::consts::{DEVICE_NAME, DEVICE_VENDOR, DEVICE_VERSION, RESPONSE_LINE_CAPACITY};
use tensile_common::tester::error::ErrorCode;
use tensile_common::tester::params::DataPoint;
use tensile_common::tester::state::MachineState;
use tracing::{trace, warn};

pub use self::line::{Line, LineAssembler, parse_line};

// ─── Responses ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Response {
    Ok(Option<&'static str>),
    Error {
        code: ErrorCode,
        message: Option<&'static str>,
    },
    Status {
        state: MachineState,
        force_n: f64,
        position_mm: f64,
        test_active: bool,
    },
    Force(f64),
    Position(f64),
    Config {
        speed_mm_s: f64,
        max_force_n: f64,
        max_extension_mm: f64,
        sample_interval_ms: u32,
    },
    Data(DataPoint),
    Identity,
}

impl Response {
    #[inline]
    pub const fn ok() -> Self {
        Response::Ok(None)
    }

    #[inline]
    pub const fn ok_with(message: &'static str) -> Self {
        Response::Ok(Some(message))
    }

    #[inline]
    pub const fn error(code: ErrorCode) -> Self {
        Response::Error {
            code,
            message: None,
        }
    }

    #[inline]
    pub const fn error_with(code: ErrorCode, message: &'static str) -> Self {
        Response::Error {
            code,
            message: Some(message),
        }
    }

    #[inline]
    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error { .. })
    }

    /// Render into a fixed-capacity line (no terminator). Text past the
    /// capacity is cut.
    pub fn to_line(&self) -> heapless::String<RESPONSE_LINE_CAPACITY> {
        let mut line = heapless::String::new();
        let _ = write!(line, "{self}");
        line
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Ok(None) => f.write_str("OK"),
            Response::Ok(Some(msg)) => write!(f, "OK {msg}"),
            Response::Error { code, message } => {
                write!(f, "ERROR {} {}", code.code(), code.description())?;
                if let Some(msg) = message {
                    write!(f, ": {msg}")?;
                }
                Ok(())
            }
            Response::Status {
                state,
                force_n,
                position_mm,
                test_active,
            } => write!(
                f,
                "STATUS {} F:{force_n:.2} P:{position_mm:.3} R:{}",
                state.name(),
                u8::from(*test_active)
            ),
            Response::Force(force) => write!(f, "FORCE {force:.3}"),
            Response::Position(mm) => write!(f, "POS {mm:.3}"),
            Response::Config {
                speed_mm_s,
                max_force_n,
                max_extension_mm,
                sample_interval_ms,
            } => write!(
                f,
                "CONFIG SPD:{speed_mm_s:.2} MAXF:{max_force_n:.1} MAXE:{max_extension_mm:.1} SR:{sample_interval_ms}"
            ),
            Response::Data(p) => write!(
                f,
                "DATA {},{:.3},{:.4},{:.3},{:.6}",
                p.elapsed_ms, p.force_n, p.extension_mm, p.stress, p.strain
            ),
            Response::Identity => write!(f, "ID {DEVICE_NAME} V{DEVICE_VERSION} {DEVICE_VENDOR}"),
        }
    }
}

// ─── Sinks ──────────────────────────────────────────────────────────

/// Destination for outbound responses.
pub trait ResponseSink {
    fn send(&mut self, response: Response);

    /// Push buffered output to the transport.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl ResponseSink for Vec<Response> {
    fn send(&mut self, response: Response) {
        self.push(response);
    }
}

/// Writes one response per line to an [`io::Write`] transport.
///
/// `send` cannot fail; the first write error is held and returned by the
/// next `flush`.
pub struct LineWriter<W: Write> {
    out: W,
    pending: bool,
    error: Option<io::Error>,
    lines: u64,
}

impl<W: Write> LineWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            pending: false,
            error: None,
            lines: 0,
        }
    }

    /// Lines written so far.
    #[inline]
    pub fn lines(&self) -> u64 {
        self.lines
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ResponseSink for LineWriter<W> {
    fn send(&mut self, response: Response) {
        if self.error.is_some() {
            return;
        }
        let line = response.to_line();
        trace!("-> {line}");
        match writeln!(self.out, "{line}") {
            Ok(()) => {
                self.pending = true;
                self.lines += 1;
            }
            Err(e) => {
                warn!("Response write failed: {e}");
                self.error = Some(e);
            }
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        if let Some(e) = self.error.take() {
            return Err(e);
        }
        if self.pending {
            self.pending = false;
            self.out.flush()?;
        }
        Ok(())
    }
}
