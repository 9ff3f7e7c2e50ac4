//! Link drivers: the satellite SBD link and the short-range radio link.

pub mod radio;
pub mod response;
pub mod satellite;
pub mod session;

pub use radio::{PacketTransceiver, RadioLinkDriver};
pub use response::{RegStatus, ResponseEvent, SessionResult};
pub use satellite::SatelliteLinkDriver;
pub use session::{SbdSession, SessionStatus};
