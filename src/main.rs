use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use std::path::PathBuf;

use procure_rs::procure::config::Settings;
use procure_rs::procure::services::Services;
use procure_rs::procure::steps::StepKind;
use procure_rs::procure::workflow::graph::FailurePolicy;
use procure_rs::procure::workflow::pipeline::{self, PipelineOptions};
use procure_rs::procure::workflow::state::StepStatus;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a YAML settings file
    #[arg(short, long, global = true, env = "PROCURE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the procurement workflow end to end
    Run {
        /// Directory holding the supplier proposal PDFs
        #[arg(short, long)]
        proposals: Option<PathBuf>,

        /// Directory the markdown artifacts are written to
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Treat ProposalProcessor as already completed
        #[arg(long)]
        skip_ingestion: bool,

        /// Keep running downstream steps after a failure
        #[arg(long)]
        continue_on_failure: bool,

        /// Add NegotiationEmail and CounterOffer before the contract
        #[arg(long)]
        with_correspondence: bool,

        /// Only ingest the proposal directory into the index
        #[arg(long, conflicts_with = "skip_ingestion")]
        ingest_only: bool,

        /// Pre-mark further steps as completed (repeatable)
        #[arg(long = "mark-completed", value_name = "STEP")]
        mark_completed: Vec<StepKind>,
    },
    /// Print the step chain without running it
    Graph {
        #[arg(long)]
        with_correspondence: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();
    let mut settings =
        Settings::load(args.config.as_deref()).context("failed to load settings")?;

    match args.command {
        Commands::Run {
            proposals,
            output,
            skip_ingestion,
            continue_on_failure,
            with_correspondence,
            ingest_only,
            mark_completed,
        } => {
            if let Some(dir) = proposals {
                settings.proposals_dir = dir;
            }
            if let Some(dir) = output {
                settings.output_dir = dir;
            }
            settings.skip_ingestion |= skip_ingestion;
            settings.include_correspondence |= with_correspondence;
            if continue_on_failure {
                settings.failure_policy = FailurePolicy::Continue;
            }
            settings.validate()?;

            let services = Services::from_settings(&settings).await?;
            let options = PipelineOptions {
                ingest_only,
                ..PipelineOptions::from_settings(&settings)
            };
            if ingest_only {
                settings.skip_ingestion = false;
            }
            let workflow = pipeline::build_workflow(&services, options)?
                .with_failure_policy(settings.failure_policy);

            let mut state = pipeline::initial_state(&settings);
            pipeline::mark_completed(&workflow, &mut state, &mark_completed)?;
            workflow.validate_seed(&state)?;

            println!("Running workflow: {}", workflow.describe());
            let result = workflow.invoke(state).await;
            println!("{}", serde_json::to_string_pretty(&result.state.to_json())?);

            if let Some(node) = &result.halted_at {
                bail!(
                    "workflow halted at {}: {}",
                    node,
                    result.state.error(node).unwrap_or("unknown error")
                );
            }
            let failed: Vec<_> = result
                .trace
                .iter()
                .filter(|r| r.status == StepStatus::Failed)
                .map(|r| r.node.as_str())
                .collect();
            if !failed.is_empty() {
                bail!("workflow finished with failed steps: {}", failed.join(", "));
            }
            println!("Workflow finished in {} steps", result.trace.len());
        }
        Commands::Graph {
            with_correspondence,
        } => {
            let chain = StepKind::chain(with_correspondence || settings.include_correspondence);
            let names: Vec<_> = chain.iter().map(|k| k.name()).collect();
            println!("START -> {} -> END\n", names.join(" -> "));
            for kind in chain {
                let artifact = kind.artifact().unwrap_or("-");
                println!("{:<20} {}", kind.name(), artifact);
            }
        }
    }

    Ok(())
}
