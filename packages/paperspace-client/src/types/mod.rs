//! Wire entities for the Paperspace API.

pub mod auth;
pub mod event;
pub mod machine;
pub mod network;
pub mod startup_script;
pub mod template;

pub use auth::{AuthSession, Team, TeamInfo, TeamMembership, User};
pub use event::{MachineEvent, MachineEventResponse};
pub use machine::{
    Accelerator, Machine, MachineCreateConfig, MachineUpdateConfig, Reservation, TargetState,
    MACHINE_STATE_OFF, MACHINE_STATE_READY,
};
pub use network::PrivateNetwork;
pub use startup_script::{StartupScript, StartupScriptCreateConfig};
pub use template::{AvailableMachineType, CustomTemplate, TemplateSortKey};
