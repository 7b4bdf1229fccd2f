//! Awsmt State Management
//!
//! Persists what awsmt knows about the MediaTailor objects it manages,
//! keyed by resource address, together with the provider identifier used
//! to read, update and delete each object.
//!
//! - **StateFile**: every managed resource and its last observed attributes
//! - **StateBackend**: storage for the state file with locking
//! - **LockInfo**: who holds the state and for which operation
//!
//! ```ignore
//! use awsmt_state::{create_backend, BackendConfig};
//!
//! let backend = create_backend(&BackendConfig::default())?;
//! let lock = backend.acquire_lock("apply").await?;
//! let mut state = backend.read_state().await?.unwrap_or_default();
//! // ... apply changes ...
//! state.increment_serial();
//! backend.write_state(&state).await?;
//! backend.release_lock(&lock).await?;
//! ```

pub mod backend;
pub mod backends;
pub mod lock;
pub mod state;

pub use backend::{BackendConfig, BackendError, BackendResult, StateBackend};
pub use backends::create_backend;
pub use lock::LockInfo;
pub use state::{ResourceState, StateFile};
