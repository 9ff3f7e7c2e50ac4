//! AT command controller over a raw byte channel.
//!
//! Turns a half-duplex serial/UART-style stream into a line-oriented
//! request/response interface. The modem echoes, delays, and occasionally
//! drops or garbles characters, so the controller accumulates partial lines
//! across reads and filters anything outside 7-bit ASCII.

use crate::clock::SharedClock;
use thiserror::Error;
use tracing::debug;

/// Guard interval after writing a command before reading the reply.
const MODEM_GUARD_MS: u64 = 50;
/// Probe retries while detecting the modem's line mode at connect time.
const CONNECT_RETRIES: u8 = 5;

/// Fatal transport failure on the underlying byte channel.
///
/// Distinct from protocol-level noise (garbled lines, timeouts), which the
/// controller swallows: a channel error means the link itself is gone and
/// propagates to the caller.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("channel closed")]
    Closed,
    #[error("channel I/O failure: {0}")]
    Io(String),
}

/// Raw byte transport underneath an AT modem (UART or serial).
pub trait ByteChannel {
    /// Drain every pending byte. An empty vec means nothing was waiting.
    fn read(&mut self) -> Result<Vec<u8>, ChannelError>;

    /// Write all of `data`.
    fn write(&mut self, data: &[u8]) -> Result<(), ChannelError>;
}

/// Line-buffered AT command controller.
pub struct ModemController<C: ByteChannel> {
    channel: C,
    clock: SharedClock,
    unterminated: String,
    /// Modem echoes commands back.
    pub echo: bool,
    /// Modem terminates lines with LF as well as CR.
    pub verbose: bool,
    /// Modem suppresses result codes entirely.
    pub quiet: bool,
}

impl<C: ByteChannel> std::fmt::Debug for ModemController<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModemController")
            .field("unterminated", &self.unterminated)
            .field("echo", &self.echo)
            .field("verbose", &self.verbose)
            .finish_non_exhaustive()
    }
}

impl<C: ByteChannel> ModemController<C> {
    pub fn new(channel: C, clock: SharedClock) -> Self {
        Self {
            channel,
            clock,
            unterminated: String::new(),
            echo: false,
            verbose: false,
            quiet: false,
        }
    }

    /// Probe the modem with bare `AT` commands until it answers, detecting
    /// echo and verbosity from the shape of the reply. Returns false if the
    /// modem never answered.
    pub fn connect(&mut self) -> Result<bool, ChannelError> {
        for _ in 0..CONNECT_RETRIES {
            if self.probe_mode()? {
                return Ok(true);
            }
            self.clock.sleep(1);
        }
        Ok(false)
    }

    fn probe_mode(&mut self) -> Result<bool, ChannelError> {
        // Flush whatever the modem was saying before the probe.
        let _ = self.channel.read()?;
        self.channel.write(b"AT\r")?;
        self.clock.sleep(1);

        let raw = self.channel.read()?;
        if raw.is_empty() {
            return Ok(false);
        }
        let Ok(output) = std::str::from_utf8(&raw) else {
            debug!("modem probe reply not ascii");
            return Ok(false);
        };

        let lfs = output.matches('\n').count();
        let crs = output.matches('\r').count();
        self.verbose = lfs > 0;
        self.quiet = lfs == 0 && crs == 0;
        self.echo = output.starts_with("AT");
        Ok(true)
    }

    /// Drain the channel and return every complete line received so far.
    ///
    /// Bytes >= 0x80 truncate the read (garbled half-duplex turnaround); the
    /// decodable prefix is appended to the accumulation buffer. Both CR and
    /// LF terminate lines; the trailing partial segment stays buffered.
    pub fn read_lines(&mut self) -> Result<Vec<String>, ChannelError> {
        let raw = self.channel.read()?;
        let clean_len = raw
            .iter()
            .position(|&b| b >= 0x80)
            .unwrap_or(raw.len());
        if let Ok(text) = std::str::from_utf8(&raw[..clean_len]) {
            self.unterminated.push_str(text);
        }

        let normalized = self.unterminated.replace('\n', "\r");
        let mut segments: Vec<&str> = normalized.split('\r').collect();
        if segments.len() <= 1 {
            return Ok(Vec::new());
        }

        let tail = segments.pop().unwrap_or("");
        let lines = segments
            .iter()
            .filter(|s| !s.is_empty())
            .map(|s| (*s).to_string())
            .collect();
        self.unterminated = tail.to_string();
        Ok(lines)
    }

    /// True if undelivered partial data is buffered.
    pub fn more(&self) -> bool {
        !self.unterminated.is_empty()
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    /// Send `AT<suffix>\r`. When `reply` is requested, waits the guard
    /// interval and returns all complete lines received since the last read.
    pub fn command(&mut self, suffix: &str, reply: bool) -> Result<Option<Vec<String>>, ChannelError> {
        let msg = format!("AT{suffix}\r");
        self.channel.write(msg.as_bytes())?;

        if reply {
            self.clock.sleep_ms(MODEM_GUARD_MS);
            return Ok(Some(self.read_lines()?));
        }
        Ok(None)
    }

    /// Write raw ASCII without AT framing (message payloads).
    pub fn write_raw(&mut self, text: &str) -> Result<(), ChannelError> {
        self.channel.write(text.as_bytes())
    }

    /// Poll the channel until `expected` appears in the accumulation buffer
    /// or `timeout_s` elapses. On a hit the modem's literal `READY` prompt
    /// is stripped from the buffer so it cannot be mistaken for data.
    pub fn wait_for_exact_reply(
        &mut self,
        expected: &str,
        timeout_s: u64,
    ) -> Result<bool, ChannelError> {
        let start = self.clock.now();

        while !self.unterminated.contains(expected) {
            let raw = self.channel.read()?;
            if let Ok(text) = std::str::from_utf8(&raw) {
                self.unterminated.push_str(text);
            }
            if self.clock.now() - start > timeout_s {
                break;
            }
            self.clock.sleep_ms(MODEM_GUARD_MS);
        }

        if self.unterminated.contains(expected) {
            self.unterminated = self.unterminated.replace("READY", "");
            Ok(true)
        } else {
            Ok(false)
        }
    }
}
