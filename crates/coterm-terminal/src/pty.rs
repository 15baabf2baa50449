//! PTY lifecycle: spawning a child shell behind a pseudo-terminal and
//! bridging its blocking I/O onto async channels.
//!
//! Reading from a PTY master is a blocking syscall, so it happens on a
//! dedicated OS thread rather than a tokio task — the same split the rest of
//! this workspace uses for any blocking I/O source. The reader thread hands
//! raw, unsanitized bytes across a channel; sanitization happens one layer up
//! in `Session`, not here, since `PtyHandle` has no notion of attached
//! clients or what "safe to fan out" means.

use crate::shell_allowlist;
use crate::types::{SpawnConfig, DEFAULT_COLS, DEFAULT_ROWS, MAX_DIM, MIN_DIM};
use portable_pty::{native_pty_system, Child, CommandBuilder, MasterPty, PtySize};
use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Events emitted by a live PTY, delivered onto an async channel by the
/// dedicated reader thread.
#[derive(Debug, Clone)]
pub enum PtyEvent {
    /// Raw, unsanitized output bytes read from the PTY master.
    Data(Vec<u8>),
    /// The child process exited. `signal` is set when termination was via
    /// signal rather than a normal exit code.
    Exit { code: i32, signal: Option<i32> },
}

/// Cheap, clonable write/control side of a live PTY. Independent of the
/// event stream so it can be held by callers (e.g. `Session`'s public
/// methods) while the event stream is owned exclusively by the background
/// task that drains it.
#[derive(Clone)]
pub struct PtyHandle {
    pid: i32,
    master: Arc<Mutex<Box<dyn MasterPty + Send>>>,
    writer: Arc<Mutex<Box<dyn Write + Send>>>,
    alive: Arc<AtomicBool>,
}

/// The event stream side of a live PTY. Not clonable — exactly one task may
/// drain it.
pub struct PtyEventStream {
    events: mpsc::UnboundedReceiver<PtyEvent>,
}

impl PtyEventStream {
    /// Next PTY event. Returns `None` once the reader thread has finished and
    /// dropped its sender, i.e. after the terminal exit event.
    pub async fn recv(&mut self) -> Option<PtyEvent> {
        self.events.recv().await
    }
}

impl PtyHandle {
    /// Spawn a shell behind a new PTY. The shell path is resolved through the
    /// allow-list before the child is spawned, so an out-of-policy request
    /// still succeeds — it just runs a different interpreter than asked for.
    /// Returns the control handle alongside the event stream the caller
    /// should hand to exactly one background task.
    pub fn spawn(config: &SpawnConfig) -> crate::error::Result<(Self, PtyEventStream)> {
        let shell = shell_allowlist::resolve(&config.shell);

        let cols = clamp_dim(config.cols, DEFAULT_COLS);
        let rows = clamp_dim(config.rows, DEFAULT_ROWS);

        let pty_system = native_pty_system();
        let pair = pty_system
            .openpty(PtySize { rows: rows as u16, cols: cols as u16, pixel_width: 0, pixel_height: 0 })
            .map_err(|e| crate::error::TerminalError::PtySpawn(e.to_string()))?;

        let mut cmd = CommandBuilder::new(shell);
        cmd.cwd(&config.cwd);
        // Overlay first, then force TERM/COLORTERM — the caller's env must
        // not be able to override these regardless of key casing or order.
        for (k, v) in &config.env {
            cmd.env(k, v);
        }
        cmd.env("TERM", "xterm-256color");
        cmd.env("COLORTERM", "truecolor");

        let mut child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| crate::error::TerminalError::PtySpawn(e.to_string()))?;
        drop(pair.slave);

        let pid = child.process_id().unwrap_or(0) as i32;

        let writer = pair
            .master
            .take_writer()
            .map_err(|e| crate::error::TerminalError::PtySpawn(e.to_string()))?;
        let mut reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| crate::error::TerminalError::PtySpawn(e.to_string()))?;

        let alive = Arc::new(AtomicBool::new(true));
        let (tx, rx) = mpsc::unbounded_channel();

        let alive_for_thread = Arc::clone(&alive);
        std::thread::spawn(move || {
            let mut buf = [0u8; 8192];
            loop {
                match reader.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        if tx.send(PtyEvent::Data(buf[..n].to_vec())).is_err() {
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }

            alive_for_thread.store(false, Ordering::SeqCst);

            let (code, signal) = match child.wait() {
                Ok(status) => (status.exit_code() as i32, None),
                Err(_) => (-1, None),
            };
            let _ = tx.send(PtyEvent::Exit { code, signal });
        });

        let handle = Self {
            pid,
            master: Arc::new(Mutex::new(pair.master)),
            writer: Arc::new(Mutex::new(writer)),
            alive,
        };
        Ok((handle, PtyEventStream { events: rx }))
    }

    pub fn pid(&self) -> i32 {
        self.pid
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    pub fn write(&self, data: &[u8]) -> crate::error::Result<()> {
        let mut w = self.writer.lock().expect("pty writer mutex poisoned");
        w.write_all(data)?;
        w.flush()?;
        Ok(())
    }

    pub fn resize(&self, cols: u32, rows: u32) -> crate::error::Result<()> {
        if !(MIN_DIM..=MAX_DIM).contains(&cols) || !(MIN_DIM..=MAX_DIM).contains(&rows) {
            return Err(crate::error::TerminalError::ResizeOutOfRange { cols, rows });
        }
        let master = self.master.lock().expect("pty master mutex poisoned");
        master
            .resize(PtySize { rows: rows as u16, cols: cols as u16, pixel_width: 0, pixel_height: 0 })
            .map_err(|e| crate::error::TerminalError::PtySpawn(e.to_string()))?;
        Ok(())
    }

    /// Deliver a POSIX signal from the permitted set directly to the child
    /// process group.
    pub fn signal(&self, sig: crate::types::Signal) -> crate::error::Result<()> {
        if self.pid == 0 {
            return Ok(());
        }
        let rc = unsafe { libc::kill(self.pid, sig.as_libc()) };
        if rc != 0 {
            return Err(crate::error::TerminalError::IoError(std::io::Error::last_os_error()));
        }
        Ok(())
    }
}

fn clamp_dim(requested: u32, default: u32) -> u32 {
    if requested == 0 {
        return default;
    }
    requested.clamp(MIN_DIM, MAX_DIM)
}
