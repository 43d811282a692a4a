use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;
use shelf_lib::{PipelineEvent, discover_pipelines, run_pipelines};

use super::{effective_policy, log_stats, outcome_json, outcome_line};
use crate::CliError;
use crate::cli_types::PolicyArgs;
use crate::spinner::SpinnerPool;

/// Reconcile every snapshot directory under `dir`, one pipeline each.
pub(crate) fn run_all(
    dir: &Path,
    policy_args: &PolicyArgs,
    json: bool,
    quiet: bool,
) -> Result<(), CliError> {
    let policy = effective_policy(policy_args)?;
    let pipelines = discover_pipelines(dir)?;

    if pipelines.is_empty() {
        log::info!(
            "{}",
            format!("No snapshot directories found in {}", dir.display())
                .if_supports_color(Stdout, |t| t.dimmed()),
        );
        log::info!("Tip: give each source a folder holding installed.yaml and owned.yaml");
        return Ok(());
    }
    let names: Vec<String> = pipelines.iter().map(|p| p.name.clone()).collect();
    if !json {
        log::info!(
            "Reconciling {} sources: {}",
            names.len(),
            names.join(", ").if_supports_color(Stdout, |t| t.cyan()),
        );
    }

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::runtime(format!("Failed to start runtime: {}", e)))?;

    let mut spinners = SpinnerPool::new(quiet || json);
    let mut json_error = None;
    let cancel = Arc::new(AtomicBool::new(false));

    let reports = rt.block_on(run_pipelines(pipelines, &policy, cancel, |event| match event {
        PipelineEvent::Started { pipeline, name } => {
            spinners.claim(pipeline, format!("{}: reading", name));
        }
        PipelineEvent::Outcome { pipeline, outcome } => {
            let name = &names[pipeline];
            if json {
                match outcome_json(&outcome, Some(name)) {
                    Ok(line) => println!("{}", line),
                    Err(e) => {
                        json_error.get_or_insert(e);
                    }
                }
            } else {
                spinners.println(&format!(
                    "{}{}",
                    format!("[{}]", name).if_supports_color(Stdout, |t| t.dimmed()),
                    outcome_line(&outcome),
                ));
                spinners.update(pipeline, format!("{}: {}", name, outcome_line(&outcome).trim()));
            }
        }
        PipelineEvent::Finished { pipeline, .. } => spinners.release(pipeline),
    }));
    spinners.clear_all();

    if let Some(e) = json_error {
        return Err(e);
    }
    if json {
        return Ok(());
    }

    for report in &reports {
        crate::log_blank();
        let status = if report.succeeded() {
            "ok".if_supports_color(Stdout, |t| t.green()).to_string()
        } else {
            "failed".if_supports_color(Stdout, |t| t.red()).to_string()
        };
        log::info!(
            "{} [{}]",
            report.name.if_supports_color(Stdout, |t| t.bold()),
            status
        );
        if let Some(failure) = &report.failure {
            log::warn!("  {}", failure);
        }
        if let Some(stats) = &report.stats {
            log_stats(stats);
        }
    }
    Ok(())
}
