use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::Local;
use clap::Parser;
use console::Style;
use tracing::info;

use humanizer::cli::{Cli, Command, InputArgs};
use humanizer::credits::{self, PlanContext};
use humanizer::ui::{JobProgress, export_file_name, ledger_summary};
use humanizer::{
    HumanizationRequest, HumanizationWorkflow, HumanizeClient, HumanizerConfig, PollingScheduler,
    SchedulerConfig, logging,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => HumanizerConfig::load_from(path)?,
        None => HumanizerConfig::load()?,
    };

    match cli.command {
        Command::Humanize {
            input,
            readability,
            purpose,
            strength,
            output,
            save,
        } => {
            let text = read_input(&input)?;
            let request = HumanizationRequest::new(text)
                .with_readability(readability)
                .with_purpose(purpose)
                .with_strength(strength);
            let export = match (output, save) {
                (Some(path), _) => Some(path),
                (None, true) => Some(PathBuf::from(export_file_name(Local::now().date_naive()))),
                (None, false) => None,
            };
            humanize(&config, request, input.anonymous, export).await
        }
        Command::Estimate { input } => {
            let text = read_input(&input)?;
            estimate(&config, &text, input.anonymous);
            Ok(())
        }
    }
}

fn read_input(input: &InputArgs) -> Result<String> {
    match (&input.text, &input.file) {
        (Some(text), _) => Ok(text.clone()),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        (None, None) => bail!("Please enter some text to humanize (pass TEXT or --file)."),
    }
}

fn plan_for(config: &HumanizerConfig, anonymous: bool) -> Option<PlanContext> {
    if anonymous {
        return None;
    }
    config.plan.as_ref().map(|plan| plan.context())
}

fn estimate(config: &HumanizerConfig, text: &str, anonymous: bool) {
    let plan = plan_for(config, anonymous);
    let cyan = Style::new().cyan();
    println!(
        "{} characters, {} credits (limit {})",
        credits::char_count(text),
        cyan.apply_to(credits::estimate_cost(text)),
        credits::max_chars(plan.as_ref())
    );
    match credits::validate(text, plan.as_ref()) {
        Ok(()) => println!("  {} Ready to submit", Style::new().green().apply_to("✓")),
        Err(err) => println!("  {} {}", Style::new().red().apply_to("✗"), err.message),
    }
    if let Some(plan) = config.plan.as_ref().filter(|_| !anonymous) {
        println!("  {}", ledger_summary(&plan.name, &plan.ledger()));
    }
}

async fn humanize(
    config: &HumanizerConfig,
    request: HumanizationRequest,
    anonymous: bool,
    export: Option<PathBuf>,
) -> Result<()> {
    if config.api_key.is_empty() {
        bail!(
            "No API key configured. Set {} or api_key in {}.",
            humanizer::config::API_KEY_ENV,
            humanizer::config::CONFIG_FILE
        );
    }

    let client = Arc::new(HumanizeClient::new(config)?);
    let scheduler = PollingScheduler::new(SchedulerConfig::from(config));
    let workflow = HumanizationWorkflow::new(client, scheduler);

    let plan = plan_for(config, anonymous);
    let account = config.plan.as_ref().filter(|_| !anonymous);
    let mut ledger = account.map(|p| p.ledger());

    let run = workflow.run(request, plan);
    let cancel = run.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let progress = JobProgress::start();
    match run.finish(|p| progress.update(p)).await {
        Ok(completion) => {
            progress.complete(&completion);
            if let Some(path) = export {
                write_output(&path, &completion.result.output)?;
            }
            if let (Some(plan), Some(ledger), Some(delta)) =
                (account, ledger.as_mut(), completion.ledger_delta)
            {
                ledger.apply(delta);
                progress.print_ledger(&plan.name, ledger);
            }
            Ok(())
        }
        Err(err) => {
            progress.fail(&err);
            info!(kind = %err.kind, status = ?err.status, detail = ?err.detail, "humanization failed");
            std::process::exit(1);
        }
    }
}

fn write_output(path: &Path, output: &str) -> Result<()> {
    std::fs::write(path, output).with_context(|| format!("failed to write {}", path.display()))?;
    println!("Saved to {}", path.display());
    Ok(())
}
