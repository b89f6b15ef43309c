// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses arguments with clap and hands a plain config struct to
// the matching use case:
//
//   1. `train`    — fine-tune (Pipeline A)
//   2. `evaluate` — score a saved model (Pipeline B)
//   3. `predict`  — classify one sentence
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, EvalArgs, PredictArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "sentiment-finetune",
    version,
    about = "Fine-tune a pretrained BERT-style model for binary sentiment, then evaluate it."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Route the subcommand to its use case; no computation here.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)    => run_train(args),
            Commands::Evaluate(args) => run_evaluate(args),
            Commands::Predict(args)  => run_predict(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::finetune_use_case::FinetuneUseCase;

    tracing::info!("Fine-tuning on data in '{}'", args.data_dir.display());
    let summary = FinetuneUseCase::new(args.into()).execute()?;

    match summary.trainer_state {
        Some(state) => println!(
            "Training complete: {} optimizer steps, best checkpoint {}",
            state.global_step,
            state
                .best_checkpoint
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "none".to_string()),
        ),
        None => println!("Training did not complete; saved model is not fine-tuned."),
    }
    Ok(())
}

fn run_evaluate(args: EvalArgs) -> Result<()> {
    use crate::application::evaluate_use_case::EvaluateUseCase;

    tracing::info!("Evaluating model in '{}'", args.model_dir.display());
    EvaluateUseCase::new(args.into()).execute()?;
    Ok(())
}

fn run_predict(args: PredictArgs) -> Result<()> {
    use crate::application::predict_use_case::PredictUseCase;

    let prediction = PredictUseCase::new((&args).into()).predict(&args.text)?;
    println!(
        "{} → {} (logits {:.3}, {:.3})",
        args.text, prediction.label, prediction.logits[0], prediction.logits[1],
    );
    Ok(())
}
