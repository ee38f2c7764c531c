//! Byte-stream command source.
//!
//! A reader thread forwards raw chunks over an mpsc channel; the cycle
//! polls [`ConsoleSource`], which assembles lines and hands out at most
//! one parsed command per poll. Lines starting with `!` are operator
//! console lines for the rig itself and never reach the orchestrator.

use std::collections::VecDeque;
use std::io::Read;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};

use tensile_common::consts::COMMAND_QUEUE_DEPTH;
use tensile_common::tester::command::CommandFrame;
use tracing::{debug, info, warn};

use crate::cycle::CommandSource;
use crate::protocol::{LineAssembler, parse_line};

/// Prefix of operator console lines.
pub const RIG_PREFIX: char = '!';

/// Handler for operator console lines (prefix stripped).
pub trait RigConsole {
    fn execute(&mut self, line: &str);
}

impl<F: FnMut(&str)> RigConsole for F {
    fn execute(&mut self, line: &str) {
        self(line)
    }
}

pub struct ConsoleSource<R: RigConsole> {
    rx: Receiver<Vec<u8>>,
    assembler: LineAssembler,
    queue: VecDeque<CommandFrame>,
    rig: R,
    closed: bool,
    dropped: u64,
}

impl<R: RigConsole> ConsoleSource<R> {
    pub fn new(rx: Receiver<Vec<u8>>, rig: R) -> Self {
        Self {
            rx,
            assembler: LineAssembler::new(),
            queue: VecDeque::new(),
            rig,
            closed: false,
            dropped: 0,
        }
    }

    /// Whether the sending side has gone away.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Commands parsed but not yet handed out.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Commands discarded because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    fn drain_channel(&mut self) {
        loop {
            match self.rx.try_recv() {
                Ok(chunk) => self.ingest(&chunk),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if !self.closed {
                        info!("Command input closed");
                        self.closed = true;
                    }
                    break;
                }
            }
        }
    }

    fn ingest(&mut self, chunk: &[u8]) {
        for line in self.assembler.extend(chunk) {
            match line.strip_prefix(RIG_PREFIX) {
                Some(rig_line) => self.rig.execute(rig_line.trim()),
                None => {
                    let Some(frame) = parse_line(&line) else {
                        continue;
                    };
                    if self.queue.len() >= COMMAND_QUEUE_DEPTH {
                        warn!("Command queue full, dropping {:?}", frame.command);
                        self.dropped += 1;
                        continue;
                    }
                    self.queue.push_back(frame);
                }
            }
        }
    }
}

impl<R: RigConsole> CommandSource for ConsoleSource<R> {
    fn poll(&mut self) -> Option<CommandFrame> {
        if !self.closed {
            self.drain_channel();
        }
        self.queue.pop_front()
    }
}

/// Spawn a thread copying `input` into a chunk channel until EOF.
pub fn spawn_reader<In>(mut input: In) -> std::io::Result<(Receiver<Vec<u8>>, JoinHandle<()>)>
where
    In: Read + Send + 'static,
{
    let (tx, rx): (Sender<Vec<u8>>, Receiver<Vec<u8>>) = mpsc::channel();
    let handle = thread::Builder::new()
        .name("command-reader".to_string())
        .spawn(move || {
            let mut buf = [0u8; 256];
            loop {
                match input.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        if tx.send(buf[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        warn!("Command input read failed: {e}");
                        break;
                    }
                }
            }
            debug!("Command reader exiting");
        })?;
    Ok((rx, handle))
}
