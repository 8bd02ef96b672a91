pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod motion;
pub mod observe;
pub mod signal;
pub mod snap;

pub use config::{AppConfig, EngineConfig, SnapConfig};
pub use domain::{create_domain_runtime, Direction, DomainDescriptor, DomainKind, DomainRuntime};
pub use engine::{
    EngineBuilder, FrameInfo, ManualScheduler, MemoryDriver, Scheduler, ScrollDriver, ScrollEngine,
    ScrollPlugin, SettleInfo, WeakScrollEngine,
};
pub use error::{Error, Result};
pub use motion::{Animator, ExpAnimator};
pub use observe::Subscription;
pub use signal::{Origin, ScrollSignal};
pub use snap::{SnapAlign, SnapResolver, SnapSource, SnapType, StaticSnapSource};
