// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to the span_reader library.
//
// Two commands are supported:
//   1. `init` — builds a tokenizer and an untrained checkpoint
//   2. `ask`  — loads the checkpoint and answers questions
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::{bail, Result};
use clap::Parser;
use commands::{AskArgs, Commands, InitArgs};

use span_reader::data::loader::DocumentLoader;
use span_reader::domain::traits::DocumentSource;
use span_reader::infra::checkpoint::{CheckpointLoader, CheckpointManager};
use span_reader::infra::tokenizer_store::{id_space, TokenizerStore};
use span_reader::{ExtractedAnswer, ExtractiveReader, RunOptions};

#[derive(Parser, Debug)]
#[command(
    name = "span-reader",
    version,
    about = "Extractive question answering over a directory of documents."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Dispatch to the matching command. The CLI only routes and prints.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Init(args) => run_init(args),
            Commands::Ask(args)  => run_ask(args),
        }
    }
}

fn run_init(args: InitArgs) -> Result<()> {
    let docs = DocumentLoader::new(&args.docs_dir).load_all()?;
    if docs.is_empty() {
        bail!("No documents found in '{}'", args.docs_dir.display());
    }
    let texts: Vec<String> = docs.into_iter().map(|d| d.content).collect();

    let tokenizer = TokenizerStore::new(&args.checkpoint_dir).load_or_build(&texts, args.vocab_size)?;
    let config    = args.model_config(id_space(&tokenizer));
    CheckpointManager::new(&args.checkpoint_dir).write_untrained(&config)?;

    println!("Untrained checkpoint written to '{}'.", args.checkpoint_dir.display());
    Ok(())
}

fn run_ask(args: AskArgs) -> Result<()> {
    let config = args.reader_config()?;

    let docs = DocumentLoader::new(&args.docs_dir).load_all()?;
    if docs.is_empty() {
        bail!("No documents found in '{}'", args.docs_dir.display());
    }

    let mut reader = ExtractiveReader::new(config, CheckpointLoader::new(&args.checkpoint_dir));
    reader.warm_up()?;

    let documents = vec![docs; args.questions.len()];
    let answers   = reader.run(&args.questions, &documents, &RunOptions::default())?;

    for (question, ranked) in args.questions.iter().zip(&answers) {
        println!("\nQ: {question}");
        for (rank, answer) in ranked.iter().enumerate() {
            println!("  {:>2}. {}", rank + 1, describe(answer));
        }
    }
    Ok(())
}

fn describe(answer: &ExtractedAnswer) -> String {
    let source = answer
        .document
        .as_ref()
        .map(|d| d.id.as_str())
        .unwrap_or("-");
    match (&answer.data, answer.start, answer.end) {
        (Some(text), Some(start), Some(end)) => {
            format!("[{:.4}] {source} {start}..{end}: {text}", answer.probability)
        }
        _ => format!("[{:.4}] {source} (no answer)", answer.probability),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use span_reader::domain::traits::ComputeDevice;
    use span_reader::{ReaderConfig, ScoringPolicy};

    fn ask(argv: &[&str]) -> AskArgs {
        let mut full = vec!["span-reader", "ask"];
        full.extend_from_slice(argv);
        match Cli::try_parse_from(full).unwrap().command {
            Commands::Ask(args) => args,
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_repeated_questions_are_collected() {
        let args = ask(&["--question", "Who?", "--question", "Where?"]);
        assert_eq!(args.questions, vec!["Who?", "Where?"]);
    }

    #[test]
    fn test_ask_requires_a_question() {
        assert!(Cli::try_parse_from(["span-reader", "ask"]).is_err());
    }

    #[test]
    fn test_flags_overlay_defaults() {
        let args = ask(&[
            "--question", "q", "--top-k", "3", "--stride", "64",
            "--policy", "calibrated-sigmoid", "--no-answer", "--device", "cpu",
        ]);
        let config = ReaderConfig::from(&args);
        assert_eq!(config.top_k, Some(3));
        assert_eq!(config.stride, 64);
        assert_eq!(config.max_seq_length, 384);
        assert!(config.no_answer);
        assert_eq!(config.device, ComputeDevice::Cpu);
        assert_eq!(config.policy, ScoringPolicy::calibrated_sigmoid());
    }

    #[test]
    fn test_flags_override_config_file() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("reader.json");
        std::fs::write(
            &path,
            r#"{ "top_k": 4, "stride": 32, "policy": { "kind": "calibrated_sigmoid", "calibration_factor": 0.5 } }"#,
        )
        .unwrap();

        let args = ask(&["--question", "q", "--config", path.to_str().unwrap(), "--top-k", "2"]);
        let config = args.reader_config().unwrap();
        assert_eq!(config.top_k, Some(2));
        assert_eq!(config.stride, 32);
        assert_eq!(config.policy, ScoringPolicy::CalibratedSigmoid { calibration_factor: 0.5 });
    }

    #[test]
    fn test_calibration_factor_selects_sigmoid() {
        let args = ask(&["--question", "q", "--calibration-factor", "0.25"]);
        let config = ReaderConfig::from(&args);
        assert_eq!(config.policy, ScoringPolicy::CalibratedSigmoid { calibration_factor: 0.25 });
    }
}
