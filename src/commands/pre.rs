// ABOUTME: Pre command implementation.
// ABOUTME: Ships a tag to the idle slot through the deploy command.

use bluegreen::config::Config;
use bluegreen::deploy::DeploymentOrchestrator;
use bluegreen::diagnostics::Diagnostics;
use bluegreen::error::Result;
use bluegreen::hooks::ShellHookRunner;
use bluegreen::output::Output;
use bluegreen::platform::HyperClient;

use super::emit_warnings;

pub async fn pre(config: &Config, tag: &str, mut output: Output) -> Result<()> {
    output.start_timer();
    let ctx = config.run_context()?;
    let client = HyperClient::new()?;
    let hooks = ShellHookRunner::new(&config.deploy_dir);
    let command_output = |line: &str| output.progress(line);
    let orchestrator =
        DeploymentOrchestrator::new(&client, &hooks).with_command_output(&command_output);
    let mut diag = Diagnostics::default();

    output.progress(&format!("Deploying {} to the idle slot of {}", tag, ctx.app()));

    let result = orchestrator.pre(&ctx, tag, &mut diag).await;
    emit_warnings(&diag, &output);
    let report = result?;

    output.report("pre", &report);
    output.success(&format!("Deployed {} to {}", report.tag, report.idle));
    Ok(())
}
