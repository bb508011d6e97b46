//! SmithSNMP Runtime - daemon lifecycle, readiness and transport
//!
//! This crate provides the process-level infrastructure the harness needs to
//! run an SNMP agent under test:
//!
//! - **Process handles**: launching a daemon with captured output, checking
//!   liveness, and stopping it with SIGTERM then SIGKILL
//! - **Readiness**: bounded polling until a daemon answers or holds its port
//! - **Supervisor**: ordered startup and reverse teardown of a process set
//! - **Transport**: a connected UDP socket for readiness and discovery checks
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐
//! │    smith     │  Scenarios, sessions, conformance checks
//! └──────┬───────┘
//!        │ setup / verify_all_alive / teardown
//! ┌──────▼───────┐
//! │ smith-runtime│  This crate
//! │  ┌────────┐  │
//! │  │ Superv │  │  ordered process set
//! │  └────────┘  │
//! │  ┌────────┐  │
//! │  │ Daemon │  │  one child process
//! │  └────────┘  │
//! │  ┌────────┐  │
//! │  │  UDP   │  │  discovery checks
//! │  └────────┘  │
//! └──────────────┘
//! ```
//!
//! The error taxonomy for the whole harness lives here so lifecycle and
//! protocol failures share one type.

pub mod endpoint;
pub mod error;
pub mod process;
pub mod readiness;
pub mod spec;
pub mod supervisor;
pub mod transport;

pub use endpoint::Endpoint;
pub use error::{Error, ErrorStatus, Result};
pub use process::{DaemonProcess, LAUNCH_WINDOW, ProcessState};
pub use readiness::discovery_answered;
pub use spec::{ProcessSpec, Readiness};
pub use supervisor::{
	SupervisorOptions, SupervisorSession, SupervisorState, TeardownFailure, TeardownReport,
};
pub use transport::UdpTransport;
