//! Telnet IAC/subnegotiation protocol state machine. Pure, byte-at-a-time,
//! and never panics: abuse guards return a [`ProtocolViolation`] instead of
//! trusting the remote peer's framing.

use crate::error::ProtocolViolation;

pub const IAC: u8 = 0xFF;
pub const SB: u8 = 0xFA;
pub const SE: u8 = 0xF0;
pub const WILL: u8 = 0xFB;
pub const WONT: u8 = 0xFC;
pub const DO: u8 = 0xFD;
pub const DONT: u8 = 0xFE;

/// GMCP is negotiated as telnet option 201.
pub const OPTION_GMCP: u8 = 201;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Data,
    Iac,
    IacCmd,
    IacSbOption,
    IacSbData,
    IacSbDataIac,
}

/// One decoded unit of telnet protocol activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelnetEvent {
    /// A complete line of input, trailing `\r` stripped.
    Line(String),
    /// A bare `WILL`/`WONT`/`DO`/`DONT`/other IAC command with no option byte.
    Command(u8),
    /// `WILL`/`WONT`/`DO`/`DONT` paired with the option it names.
    Negotiation { command: u8, option: u8 },
    /// A complete `IAC SB <option> ... IAC SE` subnegotiation payload.
    Subnegotiation { option: u8, payload: Vec<u8> },
}

/// Configurable abuse-guard thresholds. Defaults match the documented
/// server defaults (1024 / 32 / 4096).
#[derive(Debug, Clone, Copy)]
pub struct TelnetLimits {
    pub max_line_len: usize,
    pub max_non_printable_per_line: usize,
    pub max_subnegotiation_len: usize,
}

impl Default for TelnetLimits {
    fn default() -> Self {
        Self {
            max_line_len: 1024,
            max_non_printable_per_line: 32,
            max_subnegotiation_len: 4096,
        }
    }
}

fn is_printable_or_allowed(byte: u8) -> bool {
    (0x20..=0x7E).contains(&byte) || byte == 0x09 || byte == 0x0D
}

/// A byte-at-a-time telnet line/option decoder. One instance per session.
pub struct TelnetDecoder {
    state: State,
    limits: TelnetLimits,
    line_buf: Vec<u8>,
    non_printable_count: usize,
    sb_option: u8,
    sb_buf: Vec<u8>,
    pending_cmd: u8,
}

impl TelnetDecoder {
    pub fn new(limits: TelnetLimits) -> Self {
        Self {
            state: State::Data,
            limits,
            line_buf: Vec::new(),
            non_printable_count: 0,
            sb_option: 0,
            sb_buf: Vec::new(),
            pending_cmd: 0,
        }
    }

    fn reset_line(&mut self) {
        self.line_buf.clear();
        self.non_printable_count = 0;
    }

    /// Feed one byte; returns zero or one decoded events (a data byte may
    /// complete a line; an IAC sequence may complete a command/negotiation/
    /// subnegotiation).
    pub fn feed_byte(&mut self, byte: u8) -> Result<Option<TelnetEvent>, ProtocolViolation> {
        match self.state {
            State::Data => self.feed_data(byte),
            State::Iac => self.feed_iac(byte),
            State::IacCmd => self.feed_iac_cmd(byte),
            State::IacSbOption => self.feed_sb_option(byte),
            State::IacSbData => self.feed_sb_data(byte),
            State::IacSbDataIac => self.feed_sb_data_iac(byte),
        }
    }

    fn feed_data(&mut self, byte: u8) -> Result<Option<TelnetEvent>, ProtocolViolation> {
        if byte == IAC {
            self.state = State::Iac;
            return Ok(None);
        }
        if byte == 0x0A {
            let line = String::from_utf8_lossy(&self.line_buf).trim_end_matches('\r').to_string();
            self.reset_line();
            return Ok(Some(TelnetEvent::Line(line)));
        }
        if !is_printable_or_allowed(byte) {
            self.non_printable_count += 1;
            if self.non_printable_count > self.limits.max_non_printable_per_line {
                return Err(ProtocolViolation::TooManyNonPrintable {
                    max: self.limits.max_non_printable_per_line,
                });
            }
        }
        self.line_buf.push(byte);
        if self.line_buf.len() > self.limits.max_line_len {
            return Err(ProtocolViolation::LineTooLong {
                max: self.limits.max_line_len,
            });
        }
        Ok(None)
    }

    fn feed_iac(&mut self, byte: u8) -> Result<Option<TelnetEvent>, ProtocolViolation> {
        match byte {
            IAC => {
                // Escaped literal 0xFF in the data stream.
                self.state = State::Data;
                self.feed_data(0xFF)
            }
            SB => {
                self.state = State::IacSbOption;
                Ok(None)
            }
            WILL | WONT | DO | DONT => {
                self.pending_cmd = byte;
                self.state = State::IacCmd;
                Ok(None)
            }
            other => {
                self.state = State::Data;
                Ok(Some(TelnetEvent::Command(other)))
            }
        }
    }

    fn feed_iac_cmd(&mut self, byte: u8) -> Result<Option<TelnetEvent>, ProtocolViolation> {
        self.state = State::Data;
        Ok(Some(TelnetEvent::Negotiation {
            command: self.pending_cmd,
            option: byte,
        }))
    }

    fn feed_sb_option(&mut self, byte: u8) -> Result<Option<TelnetEvent>, ProtocolViolation> {
        self.sb_option = byte;
        self.sb_buf.clear();
        self.state = State::IacSbData;
        Ok(None)
    }

    fn feed_sb_data(&mut self, byte: u8) -> Result<Option<TelnetEvent>, ProtocolViolation> {
        if byte == IAC {
            self.state = State::IacSbDataIac;
            return Ok(None);
        }
        self.sb_buf.push(byte);
        if self.sb_buf.len() > self.limits.max_subnegotiation_len {
            return Err(ProtocolViolation::SubnegotiationTooLong {
                max: self.limits.max_subnegotiation_len,
            });
        }
        Ok(None)
    }

    fn feed_sb_data_iac(&mut self, byte: u8) -> Result<Option<TelnetEvent>, ProtocolViolation> {
        match byte {
            SE => {
                self.state = State::Data;
                let payload = std::mem::take(&mut self.sb_buf);
                Ok(Some(TelnetEvent::Subnegotiation {
                    option: self.sb_option,
                    payload,
                }))
            }
            IAC => {
                // Escaped literal 0xFF inside the subnegotiation payload.
                self.state = State::IacSbData;
                self.sb_buf.push(0xFF);
                if self.sb_buf.len() > self.limits.max_subnegotiation_len {
                    return Err(ProtocolViolation::SubnegotiationTooLong {
                        max: self.limits.max_subnegotiation_len,
                    });
                }
                Ok(None)
            }
            _ => {
                // Anything else abandons the current subnegotiation.
                self.state = State::Data;
                self.sb_buf.clear();
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_all(decoder: &mut TelnetDecoder, bytes: &[u8]) -> Result<Vec<TelnetEvent>, ProtocolViolation> {
        let mut events = Vec::new();
        for &b in bytes {
            if let Some(event) = decoder.feed_byte(b)? {
                events.push(event);
            }
        }
        Ok(events)
    }

    #[test]
    fn plain_line_decodes() {
        let mut decoder = TelnetDecoder::new(TelnetLimits::default());
        let events = feed_all(&mut decoder, b"look\r\n").unwrap();
        assert_eq!(events, vec![TelnetEvent::Line("look".to_string())]);
    }

    #[test]
    fn escaped_iac_byte_round_trips_into_the_line() {
        // IAC IAC inside data decodes to one literal 0xFF byte in the line.
        let mut decoder = TelnetDecoder::new(TelnetLimits::default());
        let mut bytes = vec![b'a', IAC, IAC, b'b', b'\n'];
        let events = feed_all(&mut decoder, &mut bytes).unwrap();
        match &events[0] {
            TelnetEvent::Line(s) => assert_eq!(s.as_bytes(), &[b'a', 0xFF, b'b']),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn will_option_emits_negotiation() {
        let mut decoder = TelnetDecoder::new(TelnetLimits::default());
        let events = feed_all(&mut decoder, &[IAC, WILL, OPTION_GMCP]).unwrap();
        assert_eq!(
            events,
            vec![TelnetEvent::Negotiation { command: WILL, option: OPTION_GMCP }]
        );
    }

    #[test]
    fn subnegotiation_round_trips_payload() {
        let mut decoder = TelnetDecoder::new(TelnetLimits::default());
        let mut bytes = vec![IAC, SB, OPTION_GMCP];
        bytes.extend_from_slice(b"Core.Hello");
        bytes.extend_from_slice(&[IAC, SE]);
        let events = feed_all(&mut decoder, &mut bytes).unwrap();
        assert_eq!(
            events,
            vec![TelnetEvent::Subnegotiation {
                option: OPTION_GMCP,
                payload: b"Core.Hello".to_vec(),
            }]
        );
    }

    #[test]
    fn subnegotiation_escapes_literal_iac_in_payload() {
        let mut decoder = TelnetDecoder::new(TelnetLimits::default());
        let bytes = vec![IAC, SB, OPTION_GMCP, b'x', IAC, IAC, b'y', IAC, SE];
        let events = feed_all(&mut decoder, &bytes).unwrap();
        assert_eq!(
            events,
            vec![TelnetEvent::Subnegotiation {
                option: OPTION_GMCP,
                payload: vec![b'x', 0xFF, b'y'],
            }]
        );
    }

    #[test]
    fn overlong_line_is_a_protocol_violation() {
        let limits = TelnetLimits { max_line_len: 4, ..TelnetLimits::default() };
        let mut decoder = TelnetDecoder::new(limits);
        let err = feed_all(&mut decoder, b"abcde").unwrap_err();
        assert_eq!(err, ProtocolViolation::LineTooLong { max: 4 });
    }

    #[test]
    fn too_many_non_printables_is_a_protocol_violation() {
        let limits = TelnetLimits { max_non_printable_per_line: 2, ..TelnetLimits::default() };
        let mut decoder = TelnetDecoder::new(limits);
        let err = feed_all(&mut decoder, &[0x01, 0x02, 0x03]).unwrap_err();
        assert_eq!(err, ProtocolViolation::TooManyNonPrintable { max: 2 });
    }

    #[test]
    fn arbitrary_byte_sequences_never_panic() {
        // Not exhaustive, but sweeps every byte value through every state
        // transition at least once without an input that makes sense.
        let mut decoder = TelnetDecoder::new(TelnetLimits::default());
        for b in 0u16..=255 {
            let _ = decoder.feed_byte(b as u8);
        }
    }
}
