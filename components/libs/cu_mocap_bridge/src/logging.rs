use log::LevelFilter;
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};

use crate::error::BridgeResult;

/// Text logger for a bridge process.
/// The bridge logs through the `log` facade, so a host that already installed a logger (the
/// Copper text logger for example) should skip this.
pub fn basic_bridge_setup(level: LevelFilter) -> BridgeResult<()> {
    let config = ConfigBuilder::new()
        .set_target_level(LevelFilter::Error)
        .set_thread_level(LevelFilter::Off)
        .build();
    TermLogger::init(level, config, TerminalMode::Mixed, ColorChoice::Auto)?;
    Ok(())
}
