use crate::app::ShellState;
use bridge_engine::Collaborators;
use shell_config_and_utils::{Config, Paths};

pub fn run(config: &Config, paths: &Paths, reset: bool) -> Result<(), Box<dyn std::error::Error>> {
    let state = ShellState::build(config, paths, Collaborators::new())?;

    if reset {
        state.device.reset();
        eprintln!("Device id reset; sessions bound to the old id will be rejected");
    }

    let info = state.device.device_info(&state.app_version);
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}
