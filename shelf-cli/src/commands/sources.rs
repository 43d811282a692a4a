use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use shelf_core::SourceKind;

pub(crate) fn run_sources() {
    log::info!("Supported sources:");
    crate::log_blank();

    for source in SourceKind::all() {
        log::info!(
            "  {} [{}]",
            source.short_name().if_supports_color(Stdout, |t| t.bold()),
            source.display_name().if_supports_color(Stdout, |t| t.cyan()),
        );
        log::info!("    Aliases: {}", source.aliases().join(", "));
        let ids = if source.numeric_ids() {
            "numeric"
        } else {
            "text"
        };
        log::info!("    Identifiers: {}", ids);
    }
}
