use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use crate::CliError;
use crate::cli_types::PolicyArgs;

fn on_off(value: bool) -> String {
    if value {
        "on".if_supports_color(Stdout, |t| t.green()).to_string()
    } else {
        "off".if_supports_color(Stdout, |t| t.dimmed()).to_string()
    }
}

/// Show the settings file and the policy it yields.
pub(crate) fn run_config_show() -> Result<(), CliError> {
    let path = shelf_lib::settings_path();

    log::info!("{}", "Settings".if_supports_color(Stdout, |t| t.bold()));
    crate::log_blank();
    if path.exists() {
        log::info!(
            "  Settings file: {} {}",
            path.display().if_supports_color(Stdout, |t| t.cyan()),
            "(exists)".if_supports_color(Stdout, |t| t.green()),
        );
    } else {
        log::info!(
            "  Settings file: {} {}",
            path.display().if_supports_color(Stdout, |t| t.cyan()),
            "(not found)".if_supports_color(Stdout, |t| t.dimmed()),
        );
    }
    crate::log_blank();

    let policy = shelf_lib::load_policy()?;
    log::info!("  Default policy:");
    log::info!("    installed_only: {}", on_off(policy.installed_only));
    log::info!("    base_only:      {}", on_off(policy.base_only));
    log::info!("    owned_only:     {}", on_off(policy.owned_only));
    log::info!("    include_hidden: {}", on_off(policy.include_hidden));
    log::info!(
        "    account:        {}",
        policy.account.as_deref().unwrap_or("(any)")
    );

    if let Some(contents) = shelf_lib::load_settings_string() {
        crate::log_blank();
        log::info!("  File contents:");
        for line in contents.lines() {
            log::info!("    {}", line);
        }
    }
    Ok(())
}

pub(crate) fn run_config_path() {
    log::info!("{}", shelf_lib::settings_path().display());
}

/// Save the given flags as the default policy.
pub(crate) fn run_config_set_policy(args: &PolicyArgs) -> Result<(), CliError> {
    let policy = args.apply(Default::default());
    shelf_lib::save_policy(&policy)?;
    log::info!(
        "{} default policy to {}",
        "Saved".if_supports_color(Stdout, |t| t.green()),
        shelf_lib::settings_path().display(),
    );
    Ok(())
}
