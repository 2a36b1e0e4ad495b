//! Paperspace REST API client
//!
//! A typed client for the Paperspace Core API that turns its asynchronous
//! mutations into calls that return only once the server has converged.
//!
//! # Usage
//!
//! ```rust,ignore
//! use paperspace_client::{CallContext, ClientConfig, MachineCreateConfig, PaperspaceClient};
//!
//! let config = ClientConfig::from_env()?;
//! let (client, session) = PaperspaceClient::connect(&config).await?;
//!
//! let ctx = CallContext::new();
//! let machine = client
//!     .create_machine(&ctx, &MachineCreateConfig {
//!         name: "build-box".into(),
//!         machine_type: "C4".into(),
//!         template_id: "t0nspur5".into(),
//!         disk_size: 50,
//!         region: "ny2".into(),
//!         start_on_create: true,
//!         ..Default::default()
//!     })
//!     .await?;
//! assert_eq!(machine.state, "ready");
//! ```
//!
//! # Modules
//!
//! - [`transport`] - HTTP seam (`HttpTransport`, `ReqwestTransport`)
//! - [`pagination`] - Cursor pagination and deduplication
//! - [`convergence`] - Bounded fixed-interval polling
//! - [`events`] - Machine event classification and tracking
//! - [`lifecycle`] - Create/update/start/stop/delete protocols
//! - [`lease`] - Per-resource serialization of lifecycle calls
//! - [`testing`] - Scripted transport for tests

pub mod client;
pub mod config;
pub mod context;
pub mod convergence;
pub mod error;
pub mod events;
pub mod lease;
pub mod lifecycle;
pub mod machines;
pub mod pagination;
pub mod private_networks;
pub mod startup_scripts;
pub mod templates;
pub mod testing;
pub mod transport;
pub mod types;

pub use client::PaperspaceClient;
pub use config::{ClientConfig, PollPolicy, PollSettings, DEFAULT_BASE_URL, DEFAULT_HTTP_TIMEOUT};
pub use context::CallContext;
pub use convergence::{converge, poll_until, wait_for_absence, Step};
pub use error::{PaperspaceError, Result};
pub use events::{classify, EventOutcome, TOTAL_EVENTS_KEY};
pub use lease::{ResourceLease, ResourceLocks};
pub use pagination::{dedup_by_key, Page, PAGE_LIMIT};
pub use templates::sort_templates;
pub use transport::{ApiRequest, HttpTransport, RawResponse, ReqwestTransport};
pub use types::*;

// Re-export testing utilities
pub use testing::MockTransport;

// Re-export for cancellable contexts
pub use tokio_util::sync::CancellationToken;
