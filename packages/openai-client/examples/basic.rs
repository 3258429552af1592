//! JSON-mode completion against an OpenAI-compatible endpoint

use openai_client::{ChatRequest, Message, OpenAIClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let base_url =
        std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
    let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());
    let client = OpenAIClient::from_env()?.with_base_url(base_url);

    println!("=== Chat Completion ===");
    let response = client
        .chat_completion(
            ChatRequest::new(&model)
                .message(Message::system("You are a helpful assistant."))
                .message(Message::user("What is Rust in one sentence?"))
                .temperature(0.7)
                .max_tokens(100),
        )
        .await?;
    println!("Response: {}", response.content);

    println!("\n=== JSON Mode ===");
    let json = client
        .json_completion(
            &model,
            "Reply with a JSON object with keys `language` and `year`.",
            "Which language introduced the borrow checker, and when was 1.0 released?",
        )
        .await?;
    println!("Raw JSON: {}", json);

    Ok(())
}
