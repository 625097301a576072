use crate::app::ShellState;
use bridge_engine::Collaborators;
use bridge_protocol::NavigationTarget;
use shell_config_and_utils::{Config, Paths};

/// Run one cycle for `route` and print the URL the page would load.
pub async fn run(config: &Config, paths: &Paths, route: &str) -> Result<(), Box<dyn std::error::Error>> {
    let target = NavigationTarget::parse(route)?;
    let state = ShellState::build(config, paths, Collaborators::new())?;

    let outcome = state.engine.run_cycle(target).await;
    let url = outcome.destination.to_url(&state.web_base)?;

    println!("{}", url);
    eprintln!(
        "cycle {} resolved {} via {}",
        outcome.cycle_id,
        outcome.verdict(),
        outcome
            .phases
            .iter()
            .map(|phase| phase.as_str())
            .collect::<Vec<_>>()
            .join(" -> ")
    );
    Ok(())
}
