use std::io::Write;

use anyhow::{Context, Result};
use futures::StreamExt;
use serde_json::json;
use sluice_example::{logging::init_logging, settings::Settings};
use sluice_llm::{ChatClient, Message, OpenAICompatibleClient, StreamEvent, Tool};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load().context("Failed to load configuration")?;
    init_logging(&settings.logging);

    let prompt = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    let prompt = if prompt.trim().is_empty() {
        "What time is it in Lisbon right now?".to_string()
    } else {
        prompt
    };

    let client = OpenAICompatibleClient::new(settings.provider.clone())?;
    let (model_id, info) = client.model();
    tracing::info!(
        model = %model_id,
        context_window = ?info.context_window,
        prompt_cache = info.supports_prompt_cache,
        "Client ready"
    );

    let tools = vec![Tool::new(
        "get_current_time",
        "Get the current time in a timezone",
        json!({
            "type": "object",
            "properties": {
                "timezone": {"type": "string", "description": "IANA timezone, e.g. Europe/Lisbon"}
            },
            "required": ["timezone"]
        }),
    )];
    let messages = vec![Message::user(prompt)];

    let policy = settings.retry.policy();
    let mut stream = policy
        .run(|| client.create_message(&settings.system_prompt, &messages, Some(&tools)))
        .await?;

    let mut stdout = std::io::stdout();
    let mut in_reasoning = false;

    while let Some(event) = stream.next().await {
        match event? {
            StreamEvent::Reasoning { text } => {
                if !in_reasoning {
                    println!("[REASONING]");
                    in_reasoning = true;
                }
                print!("{}", text);
                stdout.flush()?;
            }
            StreamEvent::Text { text } => {
                if in_reasoning {
                    println!("\n\n[RESPONSE]");
                    in_reasoning = false;
                }
                print!("{}", text);
                stdout.flush()?;
            }
            StreamEvent::ToolCall { id, name, arguments, .. } => {
                println!("\n[TOOL CALL] {} ({}) {}", name, id, arguments);
            }
            StreamEvent::MalformedToolCall { index, reason, .. } => {
                println!("\n[MALFORMED TOOL CALL #{}] {}", index, reason);
            }
            StreamEvent::Usage {
                input_tokens,
                output_tokens,
                cache_read_tokens,
                cache_write_tokens,
            } => {
                println!(
                    "\n\n[USAGE] in={} out={} cache_read={} cache_write={}",
                    input_tokens, output_tokens, cache_read_tokens, cache_write_tokens
                );
            }
        }
    }

    println!();
    Ok(())
}
