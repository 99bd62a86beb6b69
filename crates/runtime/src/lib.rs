//! Turn orchestration runtime for the hexfield engine.
//!
//! Wires the decision algorithms to a background worker with cooperative
//! cancellation and progress events, maps factions to human and computer
//! players, and owns the session-fragment serialization and the
//! argument-file classifier at the process boundary.
//!
//! Modules by responsibility:
//! - [`harness`] runs one algorithm invocation per worker and publishes
//!   the best world
//! - [`players`] keeps the faction → player mapping and the turn hand-off
//! - [`session`] round-trips the `players` session fragment
//! - [`sniff`] classifies command-line argument files
//! - [`telemetry`] installs the process-wide tracing subscriber

pub mod error;
pub mod events;
pub mod harness;
pub mod players;
pub mod session;
pub mod sniff;
pub mod telemetry;

pub use error::{Result, RuntimeError};
pub use events::TaskEvent;
pub use harness::TurnHarness;
pub use players::{
    ComputerPlayer, HumanPlayer, Player, PlayerManager, TurnHandoff, init_player_manager,
    teardown_player_manager, with_player_manager,
};
pub use session::{SessionPlayers, read_session, write_session};
pub use sniff::{FileKind, SearchRoots, classify_argument};
