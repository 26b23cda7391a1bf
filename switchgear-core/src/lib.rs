//! Feature-flag evaluation engine.
//!
//! Given a named feature and an actor, decide whether the feature is
//! enabled by consulting six independent gates with short-circuit OR
//! semantics. Operators toggle gates at runtime; application code asks
//! only "is this enabled for this actor?" on the hot path.
//!
//! # Features
//!
//! - **Kill switch** - boolean gate turns a feature fully on or off
//! - **Per-actor enablement** - enable individual users, orgs, devices
//! - **Groups** - named predicates registered process-wide
//! - **Deterministic rollout** - stable percentage of actors, identical
//!   across processes and storage backends
//! - **Percentage of time** - probabilistic enablement per check
//! - **Expressions** - serializable decision trees over actor
//!   properties
//! - **Pluggable storage** - one async adapter trait; in-memory
//!   included, caching and Redis backends in sibling crates
//! - **Instrumentation** - one event per operation to any sink
//!
//! # Quick Start
//!
//! ```
//! use switchgear_core::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> FlagResult<()> {
//! let flags = Switchgear::memory();
//! let search = flags.feature("search");
//!
//! // Kill switch.
//! search.enable().await?;
//! assert!(search.enabled().await?);
//!
//! // Per-actor.
//! search.disable().await?;
//! search.enable_actor(&Actor::new("User;1")).await?;
//! assert!(search.enabled_for(&Actor::new("User;1")).await?);
//! assert!(!search.enabled_for(&Actor::new("User;2")).await?);
//!
//! // Deterministic rollout to 25% of actors.
//! search.enable_percentage_of_actors(25).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Groups
//!
//! ```
//! use switchgear_core::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> FlagResult<()> {
//! registry::register("staff", |actor, _ctx| actor.flag_id().starts_with("staff;"));
//!
//! let flags = Switchgear::memory();
//! flags.feature("beta").enable_group("staff").await?;
//! assert!(flags.enabled_for("beta", &Actor::new("staff;7")).await?);
//! # Ok(())
//! # }
//! ```

pub mod actor;
pub mod adapter;
pub mod engine;
pub mod error;
pub mod expression;
pub mod feature;
pub mod gate;
pub mod gate_values;
pub mod instrument;
pub mod memory;
pub mod registry;
pub mod types;

pub use actor::{Actor, Flaggable, Properties};
pub use adapter::{Adapter, WireValue};
pub use engine::Switchgear;
pub use error::{AdapterError, AdapterResult, FlagError, FlagResult};
pub use expression::Expression;
pub use feature::{Feature, FeatureState};
pub use gate::{DataType, EvalContext, Gate, GateName};
pub use gate_values::{GateValues, RawGateValues};
pub use instrument::{
    Instrumenter, MemoryInstrumenter, NoopInstrumenter, Operation, OperationEvent,
    FEATURE_OPERATION,
};
pub use memory::MemoryAdapter;
pub use registry::{Group, GroupContext, GroupRegistry};
pub use types::{ActorRef, Boolean, GroupRef, PercentageOfActors, PercentageOfTime, Target};

/// Re-export commonly used types.
pub mod prelude {
    pub use crate::actor::{Actor, Flaggable};
    pub use crate::adapter::Adapter;
    pub use crate::engine::Switchgear;
    pub use crate::error::{AdapterError, FlagError, FlagResult};
    pub use crate::expression::Expression;
    pub use crate::feature::{Feature, FeatureState};
    pub use crate::gate::GateName;
    pub use crate::instrument::{Instrumenter, MemoryInstrumenter, NoopInstrumenter};
    pub use crate::memory::MemoryAdapter;
    pub use crate::registry;
    pub use crate::types::Target;
}
