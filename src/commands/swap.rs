// ABOUTME: Swap command implementation.
// ABOUTME: Scales the idle slot, moves cnames to it and retires the live slot.

use bluegreen::config::Config;
use bluegreen::deploy::{DeployError, DeploymentOrchestrator};
use bluegreen::diagnostics::Diagnostics;
use bluegreen::error::Result;
use bluegreen::hooks::ShellHookRunner;
use bluegreen::output::Output;
use bluegreen::platform::HyperClient;

use super::emit_warnings;

pub async fn swap(config: &Config, mut output: Output) -> Result<()> {
    output.start_timer();
    let ctx = config.run_context()?;
    let client = HyperClient::new()?;
    let hooks = ShellHookRunner::new(&config.deploy_dir);
    let orchestrator = DeploymentOrchestrator::new(&client, &hooks);
    let mut diag = Diagnostics::default();

    output.progress(&format!("Swapping {}", ctx.app()));

    let result = orchestrator.swap(&ctx, &mut diag).await;
    emit_warnings(&diag, &output);

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            if let DeployError::CnameAttachFailed {
                app,
                detached_from,
                cnames,
            } = &e
            {
                output.warning(&format!(
                    "[{cnames}] is attached to neither {detached_from} nor {app}; \
                     set the cnames on one of them before retrying"
                ));
            }
            return Err(e.into());
        }
    };

    output.progress(&format!("  → Scaled {}: {}", report.live, report.scale_up));
    output.progress(&format!(
        "  → Moved [{}] from {} to {}",
        report.cnames, report.retired, report.live
    ));
    if let Some(ref retire) = report.retire {
        output.progress(&format!("  → Retired {}: {}", report.retired, retire));
    }

    output.report("swap", &report);
    output.success(&format!("{} is live with {}", report.live, report.tag));
    Ok(())
}
