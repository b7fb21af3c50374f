// ABOUTME: Status command implementation.
// ABOUTME: Prints the live and idle slots with their cnames, units and tags.

use bluegreen::config::Config;
use bluegreen::deploy::DeploymentOrchestrator;
use bluegreen::error::Result;
use bluegreen::hooks::ShellHookRunner;
use bluegreen::output::Output;
use bluegreen::platform::HyperClient;

pub async fn status(config: &Config, output: Output) -> Result<()> {
    let ctx = config.run_context()?;
    let client = HyperClient::new()?;
    let hooks = ShellHookRunner::new(&config.deploy_dir);
    let orchestrator = DeploymentOrchestrator::new(&client, &hooks);

    let report = orchestrator.status(&ctx).await?;

    let tag = |tag: &Option<String>| tag.clone().unwrap_or_else(|| "-".to_string());
    match report.cnames {
        Some(ref cnames) => output.progress(&format!(
            "Live: {} [{}] tag {}",
            report.live,
            cnames,
            tag(&report.live_tag)
        )),
        None => output.progress("Live: none (no slot has cnames)"),
    }
    output.progress(&format!("  units: {}", report.live_topology));
    output.progress(&format!("Idle: {} tag {}", report.idle, tag(&report.idle_tag)));
    output.progress(&format!("  units: {}", report.idle_topology));

    output.report("status", &report);
    if report.serving {
        output.success(&format!("{} is live", report.live));
    } else {
        output.success(&format!("{} has no live slot", report.app));
    }
    Ok(())
}
