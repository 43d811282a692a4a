//! Host-side helpers shared by shelf frontends.
//!
//! Settings persistence and concurrent pipeline orchestration live here so
//! the CLI stays a thin layer over argument parsing and output.

pub mod async_util;
pub mod pipelines;
pub mod settings;

pub use async_util::run_with_events;
pub use pipelines::{
    DiscoverError, Pipeline, PipelineEvent, PipelineInput, PipelineReport, discover_pipelines,
    run_pipelines,
};
pub use settings::{
    SettingsError, load_policy, load_policy_from, load_settings_string, save_policy,
    save_policy_to, settings_path,
};
