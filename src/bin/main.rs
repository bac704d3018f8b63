use motivation_coach::{
    agent::{Orchestrator, Turn},
    config::CoachConfig,
    memory::ChatMessage,
    state::{user_id_for, InMemorySessionStore, SessionStore},
    Result,
};
use std::env;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let config = CoachConfig::from_env()?;

    // Initialize tracing; logs go to stderr so the chat stays readable
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let user_id = user_id_for(&env::var("COACH_USER").unwrap_or_else(|_| "local".to_string()));
    let context = env::var("COACH_CONTEXT").unwrap_or_default();

    info!(
        user_id = %user_id,
        model = %config.gemini_model,
        online = config.gemini_api_key.is_some(),
        "Motivation coach starting"
    );

    let orchestrator = Orchestrator::from_config(config)?;
    // user and model message per turn
    let store = InMemorySessionStore::new(orchestrator.config().history_window.max(1) * 2);

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    stdout.write_all("> ".as_bytes()).await?;
    stdout.flush().await?;

    while let Some(line) = lines.next_line().await? {
        let text = line.trim();
        if text.is_empty() {
            stdout.write_all("> ".as_bytes()).await?;
            stdout.flush().await?;
            continue;
        }
        if text == "/salir" {
            break;
        }

        let session = store.load_session(user_id).await?;
        let history = store.load_history(user_id).await?;

        let outcome = orchestrator
            .handle_turn(
                &session,
                Turn {
                    text,
                    context: &context,
                    history: &history,
                },
            )
            .await;

        store.save_session(&outcome.session).await?;
        store.append_message(user_id, ChatMessage::user(text)).await?;
        store
            .append_message(user_id, ChatMessage::model(outcome.reply.as_str()))
            .await?;

        let mut rendered = format!("\n{}\n", outcome.reply);
        if let Some(options) = &outcome.quick_replies {
            for (i, option) in options.iter().enumerate() {
                rendered.push_str(&format!("  [{}] {} -> {}\n", i + 1, option.label, option.value));
            }
        }
        rendered.push_str("\n> ");

        stdout.write_all(rendered.as_bytes()).await?;
        stdout.flush().await?;
    }

    info!("Motivation coach stopped");
    Ok(())
}
