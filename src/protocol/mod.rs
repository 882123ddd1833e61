//! Wire protocol: byte stream codec, packet framing, and the message set
//!
//! # Packet format
//!
//! Every packet carries a fixed 7-byte header followed by a typed payload:
//!
//! ```text
//! ┌─────────────┬──────────┬──────────────────┬───────────────────┐
//! │ Magic (4)   │ Type (1) │ Length (2)       │ Payload (variable)│
//! │ '5' '0' '0' │ tag byte │ big-endian u16   │ per-type layout   │
//! │ '2'         │          │ payload bytes    │                   │
//! └─────────────┴──────────┴──────────────────┴───────────────────┘
//! ```
//!
//! All multi-byte integers are network byte order. Numeric report fields
//! travel as length-prefixed decimal text, not binary floats; the robot
//! controller's existing parser expects the text form.
//!
//! Receivers are liberal: a packet with an unrecognized type decodes to a
//! sentinel and is ignored, never answered with an error.

pub mod bytestream;
pub mod message;

pub use bytestream::ByteStream;
pub use message::{is_valid_header, GoalReport, MessageType, Origin, Payload, HEADER_LEN, MAGIC};
