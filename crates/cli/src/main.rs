mod command;

use std::io::{self, Write};
use std::sync::Arc;

use command::Command;
use rustyline::error::ReadlineError;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use veluria_core::audit::TracingAuditSink;
use veluria_core::config::VeluriaCfg;
use veluria_core::pipeline::{Pipeline, PipelineOutcome, Submission};
use veluria_core::protocol::LoggingNotifier;
use veluria_llm::provider::LlmProvider;

const LOG_PATH: &str = "/tmp/veluria.log";
const DEFAULT_USER: &str = "local";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Tracing goes to a file so it doesn't interleave with the prompt
    if std::env::var("RUST_LOG").is_ok() {
        let file = std::fs::File::create(LOG_PATH)?;
        tracing_subscriber::registry()
            .with(EnvFilter::from_default_env())
            .with(fmt::layer().json().with_target(true).with_writer(file))
            .init();
    }

    let cfg = Arc::new(VeluriaCfg::from_env());

    let llm: Option<Arc<dyn LlmProvider>> = veluria_llm::http::from_env().map(|p| {
        tracing::info!(name = p.name(), "LLM provider initialized");
        Arc::new(p) as _
    });
    let startup_notice = llm
        .is_none()
        .then(|| "note: VELURIA_LLM_MODEL / VELURIA_LLM_API_KEY not set, using keyword extraction only".to_owned());

    let pipeline = Pipeline::build(cfg.clone(), llm, Some(Arc::new(LoggingNotifier)), Arc::new(TracingAuditSink));

    let token = CancellationToken::new();
    spawn_sigint_canceler(token.clone());

    run_repl(&pipeline, &cfg, token, startup_notice).await
}

async fn run_repl(
    pipeline: &Pipeline,
    cfg: &VeluriaCfg,
    token: CancellationToken,
    startup_notice: Option<String>,
) -> anyhow::Result<()> {
    if let Some(notice) = startup_notice {
        println!("{notice}");
    }
    println!("{}", command::HELP);

    let (line_tx, mut line_rx) = mpsc::unbounded_channel::<InputEvent>();
    let (ready_tx, ready_rx) = std::sync::mpsc::channel::<()>();
    spawn_input_thread(line_tx, ready_rx);
    request_next_prompt(&ready_tx);

    let mut user_id = DEFAULT_USER.to_owned();

    loop {
        tokio::select! {
            _ = token.cancelled() => {
                break;
            }
            line = line_rx.recv() => {
                let Some(line) = line else {
                    break;
                };
                match line {
                    InputEvent::Line(line) => {
                        match command::parse(&line) {
                            Command::Empty => {}
                            Command::Quit => break,
                            Command::Help => println!("{}", command::HELP),
                            Command::Invalid(msg) => println!("{msg}"),
                            Command::User(id) => {
                                println!("now acting as user {id}");
                                user_id = id;
                            }
                            Command::State => {
                                let state = pipeline.protocol().get_user_state(&user_id).await;
                                println!("{user_id}: {}", state.as_str());
                            }
                            Command::History => {
                                let history = pipeline.protocol().get_intervention_history(&user_id).await;
                                if history.is_empty() {
                                    println!("no interventions recorded for {user_id}");
                                }
                                for record in &history {
                                    println!("{}", serde_json::to_string(record)?);
                                }
                            }
                            Command::Reset => {
                                let previous = pipeline.protocol().reset_user_state(&user_id).await;
                                pipeline.history().clear(&user_id);
                                println!("{user_id}: {} -> SAFE", previous.as_str());
                            }
                            Command::Manual { intervener_id, outcome, notes } => {
                                let record = pipeline
                                    .protocol()
                                    .record_manual_intervention(&user_id, &intervener_id, &notes, &outcome)
                                    .await;
                                println!(
                                    "{user_id}: {} -> {} (recorded by {intervener_id})",
                                    record.state_before.as_str(),
                                    record.state_after.as_str()
                                );
                            }
                            Command::Config => {
                                for (key, value, desc) in cfg.to_entries() {
                                    println!("  {key:<24} {value:<10} {desc}");
                                }
                            }
                            Command::Submit(text) => {
                                let outcome = pipeline.process(&user_id, &Submission::text(text)).await;
                                print_outcome(&outcome);
                            }
                        }
                        request_next_prompt(&ready_tx);
                    }
                    InputEvent::Interrupted => {
                        token.cancel();
                        break;
                    }
                    InputEvent::Eof => break,
                    InputEvent::Error(err) => {
                        eprintln!("input error: {err}");
                        break;
                    }
                }
            }
        }
    }
    drop(ready_tx);

    println!();
    io::stdout().flush()?;
    Ok(())
}

fn print_outcome(outcome: &PipelineOutcome) {
    let m = &outcome.mapping;
    let s = &outcome.status;
    println!(
        "  symbol {} / {} (valence {:+.2}, arousal {:.2}, {:?})",
        m.primary_symbol,
        m.archetype.as_str(),
        m.valence,
        m.arousal,
        outcome.source
    );
    println!(
        "  risk {:.2} = metaphor {:.2} + lexical {:.2} + biomarker {:.2} -> level {}",
        s.risk_score,
        s.metaphor_risk,
        s.lexical_risk,
        s.biomarker_risk,
        s.level.as_u8()
    );
    if !s.triggers.is_empty() {
        println!("  triggers: {}", s.triggers.join(", "));
    }
    println!("  drift {:.2}", outcome.drift);
    println!(
        "  state {} -> {}",
        outcome.record.state_before.as_str(),
        outcome.record.state_after.as_str()
    );
    if !outcome.record.actions_taken.is_empty() {
        println!("  actions: {}", outcome.record.actions_taken.join(", "));
    }
    if !outcome.record.resources_provided.is_empty() {
        println!("  resources: {}", outcome.record.resources_provided.join(", "));
    }
}

fn request_next_prompt(ready_tx: &std::sync::mpsc::Sender<()>) {
    let _ = ready_tx.send(());
}

fn spawn_input_thread(
    line_tx: mpsc::UnboundedSender<InputEvent>,
    ready_rx: std::sync::mpsc::Receiver<()>,
) {
    std::thread::spawn(move || {
        let mut editor = match rustyline::DefaultEditor::new() {
            Ok(editor) => editor,
            Err(e) => {
                let _ = line_tx.send(InputEvent::Error(e.to_string()));
                return;
            }
        };

        while ready_rx.recv().is_ok() {
            match editor.readline("veluria> ") {
                Ok(line) => {
                    let _ = editor.add_history_entry(line.as_str());
                    if line_tx.send(InputEvent::Line(line)).is_err() {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    let _ = line_tx.send(InputEvent::Interrupted);
                    break;
                }
                Err(ReadlineError::Eof) => {
                    let _ = line_tx.send(InputEvent::Eof);
                    break;
                }
                Err(e) => {
                    let _ = line_tx.send(InputEvent::Error(e.to_string()));
                    break;
                }
            }
        }
    });
}

enum InputEvent {
    Line(String),
    Interrupted,
    Eof,
    Error(String),
}

fn spawn_sigint_canceler(token: CancellationToken) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            if let Ok(mut sigint) =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())
            {
                let _ = sigint.recv().await;
                token.cancel();
            }
        }
        #[cfg(not(unix))]
        {
            if tokio::signal::ctrl_c().await.is_ok() {
                token.cancel();
            }
        }
    });
}
