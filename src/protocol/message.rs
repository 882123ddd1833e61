//! Packet framing and the message registry
//!
//! The message set is closed: every type the link speaks is a variant of
//! [`Payload`], and encode/decode dispatch through a single match so a new
//! message cannot be added without the compiler pointing at every site that
//! must handle it.

use crate::error::{Error, Result};
use crate::protocol::bytestream::ByteStream;
use std::fmt;

/// 4-byte packet magic, the team number in ASCII
pub const MAGIC: [u8; 4] = *b"5002";

/// Envelope size: magic + type tag + payload length
pub const HEADER_LEN: usize = 7;

/// Goal status byte values on the wire
const GOAL_FOUND: u8 = 0xFF;
const GOAL_NOT_FOUND: u8 = 0x00;

/// Packet type identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    /// Never sent; a zero tag marks an uninitialized buffer
    Invalid = 0,
    /// Status request, reserved and unimplemented
    GetStatus = 1,
    /// Status response, reserved and unimplemented
    Status = 2,
    /// Goal observation request (controller to coprocessor)
    GetGoalDistance = 3,
    /// Goal observation report (coprocessor to controller)
    GoalDistance = 4,
    /// UDP discovery packet, bidirectional
    Discover = 5,
}

impl MessageType {
    /// Parse a tag byte; `None` for anything outside the known set
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(MessageType::Invalid),
            1 => Some(MessageType::GetStatus),
            2 => Some(MessageType::Status),
            3 => Some(MessageType::GetGoalDistance),
            4 => Some(MessageType::GoalDistance),
            5 => Some(MessageType::Discover),
            _ => None,
        }
    }
}

/// Declared identity of a discovery participant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Origin {
    DriverStation = 0,
    RoboRio = 1,
    Jetson = 2,
    Unknown = 0xFF,
}

impl Origin {
    /// Parse an origin byte; unassigned values collapse to `Unknown`
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Origin::DriverStation,
            1 => Origin::RoboRio,
            2 => Origin::Jetson,
            _ => Origin::Unknown,
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Origin::DriverStation => "driver station",
            Origin::RoboRio => "RoboRIO",
            Origin::Jetson => "Jetson",
            Origin::Unknown => "unknown sender",
        };
        f.write_str(name)
    }
}

/// Goal observation as it travels on the wire
///
/// The left/right pairs exist so a stereo estimator can report both edges of
/// the goal; a single-estimate pipeline fills both sides with the same
/// values.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GoalReport {
    pub found: bool,
    pub score: f64,
    pub distance_left: f64,
    pub angle_left: f64,
    pub distance_right: f64,
    pub angle_right: f64,
}

/// The closed set of message payloads
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Discovery announce or reply
    Discover { origin: Origin },
    /// Empty request marker for the goal observation
    GetGoalDistance,
    /// Goal observation report
    GoalDistance(GoalReport),
    /// Sentinel for tags this side does not handle (GetStatus, Status,
    /// Invalid, and anything unassigned); carries the raw tag byte.
    /// Receivers ignore it rather than answering with an error.
    Unknown(u8),
}

impl Payload {
    /// Wire tag for this payload
    pub fn tag(&self) -> u8 {
        match self {
            Payload::Discover { .. } => MessageType::Discover as u8,
            Payload::GetGoalDistance => MessageType::GetGoalDistance as u8,
            Payload::GoalDistance(_) => MessageType::GoalDistance as u8,
            Payload::Unknown(tag) => *tag,
        }
    }

    fn encode_body(&self, body: &mut ByteStream) {
        match self {
            Payload::Discover { origin } => {
                body.put_u8(*origin as u8);
            }
            Payload::GetGoalDistance => {}
            Payload::GoalDistance(report) => {
                body.put_u8(if report.found { GOAL_FOUND } else { GOAL_NOT_FOUND });
                body.put_double(report.score);
                body.put_double(report.distance_left);
                body.put_double(report.angle_left);
                body.put_double(report.distance_right);
                body.put_double(report.angle_right);
            }
            Payload::Unknown(_) => {}
        }
    }

    /// Wrap this payload into a complete packet: header plus body
    pub fn encode(&self) -> Vec<u8> {
        let mut body = ByteStream::new();
        self.encode_body(&mut body);

        let mut out = Vec::with_capacity(HEADER_LEN + body.len());
        out.extend_from_slice(&MAGIC);
        out.push(self.tag());
        out.extend_from_slice(&(body.len() as u16).to_be_bytes());
        out.extend_from_slice(body.as_slice());
        out
    }

    /// Unwrap a packet, dispatching on the type tag
    ///
    /// The declared payload length must fit inside `buf`; a packet that
    /// claims more bytes than are present fails with `Truncated` and nothing
    /// past the buffer end is read. Unrecognized tags decode to
    /// [`Payload::Unknown`].
    pub fn decode(buf: &[u8]) -> Result<Payload> {
        if buf.len() < HEADER_LEN {
            return Err(Error::Truncated {
                needed: HEADER_LEN,
                available: buf.len(),
            });
        }
        if buf[..4] != MAGIC {
            return Err(Error::InvalidPacket("bad magic".to_string()));
        }

        let tag = buf[4];
        let len = u16::from_be_bytes([buf[5], buf[6]]) as usize;
        if buf.len() < HEADER_LEN + len {
            return Err(Error::Truncated {
                needed: HEADER_LEN + len,
                available: buf.len(),
            });
        }
        let mut body = ByteStream::from_slice(&buf[HEADER_LEN..HEADER_LEN + len]);

        match MessageType::from_u8(tag) {
            Some(MessageType::Discover) => Ok(Payload::Discover {
                origin: Origin::from_u8(body.get_u8()?),
            }),
            Some(MessageType::GetGoalDistance) => Ok(Payload::GetGoalDistance),
            Some(MessageType::GoalDistance) => {
                let status = body.get_u8()?;
                Ok(Payload::GoalDistance(GoalReport {
                    found: status != GOAL_NOT_FOUND,
                    score: body.get_double()?,
                    distance_left: body.get_double()?,
                    angle_left: body.get_double()?,
                    distance_right: body.get_double()?,
                    angle_right: body.get_double()?,
                }))
            }
            _ => Ok(Payload::Unknown(tag)),
        }
    }
}

/// Check for the packet magic and a usable type tag
///
/// True iff the first four bytes are the magic and the tag byte is nonzero.
/// Short buffers are invalid.
pub fn is_valid_header(buf: &[u8]) -> bool {
    buf.len() >= 5 && buf[..4] == MAGIC && buf[4] != MessageType::Invalid as u8
}
