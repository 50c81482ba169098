//! CLI definition and command dispatch for the docent.
//!
//! This module defines the command-line interface using `clap` and provides
//! the `run()` function that dispatches commands.
//!
//! ## Configuration Precedence
//!
//! Configuration is resolved with the following precedence (highest to lowest):
//! 1. CLI flags (e.g., `--config`, `--corpus`, `--verbose`)
//! 2. Environment variables (`DOCENT_CONFIG`, `DOCENT_CORPUS`, `OPENAI_API_KEY`)
//! 3. Config file (YAML path from `--config`/`DOCENT_CONFIG`)
//! 4. Built-in defaults

use std::fs;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use futures::StreamExt;

use crate::ui::{ColorMode, MessageType, Style};

use docent_core::{
    classify, detect_stage, rank, run_turn, ArtworkProfile, ConversationTurn, CorpusStore,
    DocentConfig, DocentError, SavedTranscript, Stage, StageKey, TurnRequest, TurnServices,
    Utterance, GREETING,
};
use docent_openai::OpenAiClient;

// ============================================================================
// CLI Definition
// ============================================================================

/// Feldman critique docent – guided four-stage art dialogue
#[derive(Parser, Debug)]
#[command(name = "docent")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true, env = "DOCENT_VERBOSE")]
    pub verbose: bool,

    /// Path to configuration file (YAML)
    #[arg(long, global = true, env = "DOCENT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Path to the corpus JSON file (overrides config)
    #[arg(long, global = true, env = "DOCENT_CORPUS")]
    pub corpus: Option<PathBuf>,

    /// API key for the OpenAI-compatible endpoint
    #[arg(long, global = true, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Color output mode: always, never, or auto (default: auto)
    #[arg(long, global = true, env = "DOCENT_COLOR", default_value = "auto")]
    pub color: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Interactive critique dialogue with streamed replies
    #[command(after_help = r#"EXAMPLES:
    # Start a new dialogue
    docent chat

    # Tell the docent which artwork is being discussed
    docent chat --artwork-title "별이 빛나는 밤" --fact "빈센트 반 고흐, 1889"

    # Resume a saved session and keep saving it
    docent chat --load session.json --save session.json
"#)]
    Chat {
        /// Resume from a saved transcript JSON file
        #[arg(long)]
        load: Option<PathBuf>,

        /// Save the transcript to this JSON file on exit
        #[arg(long)]
        save: Option<PathBuf>,

        /// Session title used when saving
        #[arg(long)]
        title: Option<String>,

        /// Title of the artwork under discussion
        #[arg(long)]
        artwork_title: Option<String>,

        /// A fact about the artwork (repeatable)
        #[arg(long = "fact", value_name = "TEXT")]
        facts: Vec<String>,
    },

    /// Detect the current critique stage from a transcript file
    #[command(after_help = r#"EXAMPLES:
    # Detect the stage of a saved session
    docent stage session.json

    # Machine-readable output
    docent stage session.json --json
"#)]
    Stage {
        /// Transcript JSON file (saved session or plain turn array)
        transcript: PathBuf,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Classify an utterance as question or answer
    #[command(after_help = r#"EXAMPLES:
    docent classify "이게 뭐예요?"
    docent classify "파란 배경에 나무가 있어요"
"#)]
    Classify {
        /// The utterance to classify
        text: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Rank corpus texts against a query (retrieval debugging)
    #[command(after_help = r#"EXAMPLES:
    # Rank the whole corpus
    docent retrieve "붓질이 거칠어요"

    # Restrict to one stage's reference texts
    docent retrieve "색의 대비" --stage analysis --top-k 3
"#)]
    Retrieve {
        /// The query to rank against
        query: String,

        /// Restrict to one stage: description, analysis, interpretation, judgment
        #[arg(long)]
        stage: Option<String>,

        /// Maximum texts to return
        #[arg(long, default_value = "5")]
        top_k: usize,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Manage docent configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show resolved configuration (merged from all sources)
    Show {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

// ============================================================================
// Run function
// ============================================================================

/// Run the CLI application.
///
/// Parses command-line arguments, resolves configuration, and dispatches
/// to the appropriate command handler.
///
/// # Returns
///
/// Returns `ExitCode::SUCCESS` on success, or `ExitCode::FAILURE` on error.
pub fn run() -> ExitCode {
    let cli = Cli::parse();

    // Always show warnings; show debug info only when --verbose is set.
    let log_level = if cli.verbose { "debug" } else { "warn" };
    let filter = format!(
        "docent_core={},docent_openai={},docent_cli={}",
        log_level, log_level, log_level
    );

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let color_mode = ColorMode::from_str(&cli.color).unwrap_or(ColorMode::Auto);
    let style = Style::new(color_mode);

    // Resolve configuration: --config flag > DOCENT_CONFIG env > defaults.
    let mut config = match DocentConfig::load_or_default(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            let hint = match &cli.config {
                Some(path) => format!("Check your config at {}", path.display()),
                None => "Check your DOCENT_CONFIG path".to_string(),
            };
            eprintln!(
                "{}",
                style.error_with_context(
                    "Failed to load configuration",
                    Some(&e.to_string()),
                    Some(&hint),
                )
            );
            return ExitCode::FAILURE;
        }
    };
    if let Some(corpus) = &cli.corpus {
        config.corpus_path = corpus.clone();
    }

    let result = match cli.command {
        Command::Chat {
            ref load,
            ref save,
            ref title,
            ref artwork_title,
            ref facts,
        } => {
            let artwork = ArtworkProfile {
                title: artwork_title.clone(),
                facts: facts.clone(),
            };
            block_on(handle_chat(
                &style,
                &cli,
                &config,
                load.as_deref().map(PathBuf::from),
                save.as_deref().map(PathBuf::from),
                title.clone(),
                artwork,
            ))
        }
        Command::Stage {
            ref transcript,
            json,
        } => handle_stage(&style, transcript, json),
        Command::Classify { ref text, json } => handle_classify(&style, text, json),
        Command::Retrieve {
            ref query,
            ref stage,
            top_k,
            json,
        } => block_on(handle_retrieve(
            &style,
            &cli,
            &config,
            query,
            stage.as_deref(),
            top_k,
            json,
        )),
        Command::Config { ref action } => match action {
            ConfigAction::Show { json } => handle_config_show(&style, &config, *json),
        },
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", style.message(MessageType::Err, &e.to_string()));
            ExitCode::FAILURE
        }
    }
}

/// Run an async handler to completion on a fresh runtime.
fn block_on<F>(future: F) -> Result<(), DocentError>
where
    F: std::future::Future<Output = Result<(), DocentError>>,
{
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(future)
}

/// The API key, or a configuration error telling the user how to set one.
fn require_api_key(cli: &Cli) -> Result<String, DocentError> {
    cli.api_key
        .clone()
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| DocentError::InvalidConfiguration {
            message: "no API key provided".to_string(),
            hint: "Set the OPENAI_API_KEY environment variable or pass --api-key".to_string(),
        })
}

fn build_client(cli: &Cli, config: &DocentConfig) -> Result<OpenAiClient, DocentError> {
    let api_key = require_api_key(cli)?;
    Ok(OpenAiClient::new(
        &config.api_base_url,
        api_key,
        &config.models.completion,
        &config.models.embedding,
    ))
}

// ============================================================================
// Command handlers
// ============================================================================

#[allow(clippy::too_many_arguments)]
async fn handle_chat(
    style: &Style,
    cli: &Cli,
    config: &DocentConfig,
    load: Option<PathBuf>,
    save: Option<PathBuf>,
    title: Option<String>,
    artwork: ArtworkProfile,
) -> Result<(), DocentError> {
    let client = build_client(cli, config)?;
    let corpus = CorpusStore::shared(&config.corpus_path)?;
    let services = TurnServices::new(Arc::new(client.clone()), Arc::new(client));

    let mut transcript: Vec<ConversationTurn> = match &load {
        Some(path) => {
            let saved: SavedTranscript = serde_json::from_str(&fs::read_to_string(path)?)?;
            println!(
                "{}",
                style.message(
                    MessageType::Info,
                    &format!(
                        "Resumed \"{}\" from {} ({} turns)",
                        saved.title,
                        saved.created_at.format("%Y-%m-%d"),
                        saved.messages.len()
                    ),
                )
            );
            saved.messages
        }
        None => Vec::new(),
    };

    if transcript.is_empty() {
        transcript.push(ConversationTurn::assistant(GREETING));
        println!("{} {}", style.speaker("docent>"), GREETING);
    }
    println!(
        "{}",
        style.message(MessageType::Hint, "Type your reply; `quit` to leave.")
    );

    let stdin = std::io::stdin();
    let mut input = String::new();
    loop {
        print!("{} ", style.speaker("you>"));
        std::io::stdout().flush()?;

        input.clear();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }
        let line = input.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "quit" | "exit" | ":q") {
            break;
        }

        transcript.push(ConversationTurn::user(line));
        let request = TurnRequest {
            transcript: transcript.clone(),
            artwork: artwork.clone(),
        };
        let outcome = run_turn(request, &services, &corpus, config).await?;

        if cli.verbose {
            println!(
                "{}",
                style.message_detail(
                    "Turn",
                    &format!(
                        "stage={} classification={} retrieved={}",
                        outcome.debug.stage,
                        utterance_label(outcome.debug.classification),
                        outcome.debug.retrieved.len()
                    ),
                )
            );
        }

        print!("{} ", style.speaker("docent>"));
        std::io::stdout().flush()?;

        let mut reply_text = String::new();
        let mut stream = outcome.reply.into_stream();
        while let Some(item) = stream.next().await {
            match item {
                Ok(chunk) => {
                    print!("{}", chunk);
                    std::io::stdout().flush()?;
                    reply_text.push_str(&chunk);
                }
                Err(e) => {
                    println!();
                    eprintln!("{}", style.message(MessageType::Warn, &e.to_string()));
                    break;
                }
            }
        }
        println!();

        if reply_text.is_empty() {
            // Nothing usable came back; drop the user turn so the next
            // attempt replays it cleanly.
            transcript.pop();
        } else {
            transcript.push(ConversationTurn::assistant(reply_text));
        }
    }

    if let Some(path) = save {
        let title = title
            .or_else(|| session_title(&transcript))
            .unwrap_or_else(|| "도슨트 대화".to_string());
        let saved = SavedTranscript::new(title, transcript);
        fs::write(&path, serde_json::to_string_pretty(&saved)?)?;
        println!(
            "{}",
            style.message(
                MessageType::Ok,
                &format!("Saved transcript to {}", path.display()),
            )
        );
    }

    Ok(())
}

/// Default session title: the first user turn, trimmed to a readable length.
fn session_title(transcript: &[ConversationTurn]) -> Option<String> {
    transcript
        .iter()
        .find(|turn| turn.role == docent_core::Role::User)
        .map(|turn| {
            let text = turn.text();
            let title: String = text.chars().take(40).collect();
            title
        })
        .filter(|title| !title.is_empty())
}

fn handle_stage(style: &Style, path: &PathBuf, json: bool) -> Result<(), DocentError> {
    let raw = fs::read_to_string(path)?;
    let transcript = parse_transcript(&raw)?;
    let stage = detect_stage(&transcript);

    if json {
        println!("{}", serde_json::json!({ "stage": stage }));
    } else {
        println!("  {}", style.key_value("Stage", &stage.to_string()));
        if let Some(label) = stage.marker_label() {
            println!("  {}", style.key_value("Label", &label));
        }
        if stage == Stage::Complete {
            println!(
                "{}",
                style.message(MessageType::Info, "All four stages are complete.")
            );
        }
    }
    Ok(())
}

/// Accept either a saved session or a bare turn array.
fn parse_transcript(raw: &str) -> Result<Vec<ConversationTurn>, DocentError> {
    if let Ok(saved) = serde_json::from_str::<SavedTranscript>(raw) {
        return Ok(saved.messages);
    }
    Ok(serde_json::from_str::<Vec<ConversationTurn>>(raw)?)
}

fn handle_classify(style: &Style, text: &str, json: bool) -> Result<(), DocentError> {
    let classification = classify(text);
    if json {
        println!("{}", serde_json::json!({ "classification": classification }));
    } else {
        println!(
            "  {}",
            style.key_value("Classification", utterance_label(classification))
        );
    }
    Ok(())
}

fn utterance_label(utterance: Utterance) -> &'static str {
    match utterance {
        Utterance::Question => "question",
        Utterance::Answer => "answer",
    }
}

async fn handle_retrieve(
    style: &Style,
    cli: &Cli,
    config: &DocentConfig,
    query: &str,
    stage: Option<&str>,
    top_k: usize,
    json: bool,
) -> Result<(), DocentError> {
    let client = build_client(cli, config)?;
    let corpus = CorpusStore::shared(&config.corpus_path)?;

    let key = stage.map(parse_stage_key).transpose()?;
    let candidates: Vec<&docent_core::CorpusEntry> = match key {
        Some(key) => corpus.entries_for(key),
        None => corpus.entries().iter().collect(),
    };
    if candidates.is_empty() {
        println!("{}", style.message(MessageType::Info, "Corpus is empty."));
        return Ok(());
    }

    use docent_core::EmbeddingService;
    let embedding = client.embed(query).await?;
    let snippets = rank(&embedding, &candidates, top_k);

    if json {
        println!("{}", serde_json::to_string_pretty(&snippets)?);
    } else {
        println!("{}", style.section("RESULTS"));
        println!();
        for (i, snippet) in snippets.iter().enumerate() {
            println!(
                "  {}. {} {} {}",
                i + 1,
                style.score(snippet.score.unwrap_or(0.0)),
                style.stage_tag(&snippet.stage.to_string()),
                snippet.text
            );
        }
    }
    Ok(())
}

fn parse_stage_key(name: &str) -> Result<StageKey, DocentError> {
    match name.to_lowercase().as_str() {
        "description" => Ok(StageKey::Description),
        "analysis" => Ok(StageKey::Analysis),
        "interpretation" => Ok(StageKey::Interpretation),
        "judgment" => Ok(StageKey::Judgment),
        other => Err(DocentError::InvalidConfiguration {
            message: format!("unknown stage '{}'", other),
            hint: "Valid stages: description, analysis, interpretation, judgment".to_string(),
        }),
    }
}

fn handle_config_show(style: &Style, config: &DocentConfig, json: bool) -> Result<(), DocentError> {
    if json {
        println!("{}", serde_json::to_string_pretty(config)?);
    } else {
        println!(
            "{}",
            style.message(MessageType::Info, "Resolved configuration:")
        );
        println!();
        println!("{}", serde_json::to_string_pretty(config)?);
    }
    Ok(())
}
