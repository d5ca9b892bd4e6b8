//! Vehicle side of a mission: the link contract, telemetry handling, the
//! flight-phase state machine and the async session that drives it.

pub mod config;
pub mod error;
pub mod link;
pub mod machine;
pub mod phase;
pub mod session;
pub mod telemetry;

pub use config::{DestinationChoice, MissionConfig};
pub use error::MissionError;
pub use link::{CommandChannel, VehicleCommand, VehicleLink};
pub use machine::FlightMachine;
pub use phase::{transition, Action, FlightPhase, MissionView, Transition};
pub use session::{MissionReport, VehicleSession};
pub use telemetry::{Snapshot, TelemetryEvent, Trigger};
