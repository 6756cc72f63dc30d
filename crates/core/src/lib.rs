pub mod config;
pub mod dispatch;
pub mod gateway;
pub mod lifetime;
pub mod metrics;
pub mod process;
pub mod registry;
pub mod report;
pub mod testing;
pub mod transcript;

pub use config::{
    load_config, load_config_from_str, validate_config, write_blank_config, Config, ConfigError,
    DispatcherConfig, LifetimeConfig, ReportConfig, ServerConfig, WorkerCommand, WorkersConfig,
};
pub use dispatch::{
    create_call_dispatch, shared_context, CallContext, CallDispatcher, CallRunner, CallUnit,
    DispatchError, SharedCallContext,
};
pub use gateway::{IntelligenceGateway, MilestoneUpdate, PipelineIntelligence};
pub use lifetime::{
    LifetimeWatchdog, OsProcessTerminator, ProcessHandle, ProcessTerminator, TerminateError,
    TerminateOutcome,
};
pub use process::{
    DriverError, LaunchError, PipelineDriver, TokioWorkerSpawner, WorkerHandle, WorkerSpawner,
};
pub use registry::{
    MilestoneCondition, MilestoneIntelligence, MilestoneKind, MilestoneRegistry, RegistryError,
};
pub use report::{
    write_report, PipelineReport, PreviousReportProvider, ReportBuilder, ReportError, ReportRoot,
};
pub use transcript::Transcript;
