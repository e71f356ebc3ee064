//! `quillpad chat` — Send one message to a running gateway and stream
//! the reply to the terminal.

use std::io::Write;

use futures::StreamExt;
use quillpad_config::AppConfig;
use serde_json::{Value, json};

pub async fn run(
    message: String,
    chat_id: Option<String>,
    model: Option<String>,
    token: Option<String>,
    url: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    let token = token
        .or_else(|| std::env::var("QUILLPAD_TOKEN").ok())
        .ok_or("No bearer token. Pass --token or set QUILLPAD_TOKEN.")?;

    let base = url.unwrap_or_else(|| {
        format!("http://{}:{}", config.gateway.host, config.gateway.port)
    });

    let mut body = json!({
        "messages": [{ "role": "user", "content": message }]
    });
    if let Some(id) = &chat_id {
        body["chatId"] = json!(id);
    }
    if let Some(model) = &model {
        body["model"] = json!(model);
    }

    let client = reqwest::Client::new();
    let response = client
        .post(format!("{base}/v1/chat"))
        .bearer_auth(&token)
        .json(&body)
        .send()
        .await
        .map_err(|e| format!("Gateway unreachable at {base}: {e}"))?;

    if !response.status().is_success() {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        return Err(format!("Gateway returned {status}: {text}").into());
    }

    if let Some(id) = response.headers().get("x-chat-id").and_then(|v| v.to_str().ok()) {
        eprintln!("  chat: {id}");
    }

    // SSE frames arrive as "event: <label>\ndata: <json>\n\n"; chunk
    // boundaries fall anywhere, so buffer until a blank line.
    let mut stream = response.bytes_stream();
    let mut buffer = String::new();
    let mut stdout = std::io::stdout();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| format!("Stream error: {e}"))?;
        buffer.push_str(&String::from_utf8_lossy(&chunk));

        while let Some(pos) = buffer.find("\n\n") {
            let frame = buffer[..pos].to_string();
            buffer.drain(..pos + 2);
            if render_frame(&frame, &mut stdout)? {
                println!();
                return Ok(());
            }
        }
    }

    println!();
    Ok(())
}

/// Print one SSE frame. Returns true when the stream is done.
fn render_frame(frame: &str, stdout: &mut std::io::Stdout) -> Result<bool, Box<dyn std::error::Error>> {
    let mut label = "";
    let mut data = "";
    for line in frame.lines() {
        if let Some(rest) = line.strip_prefix("event: ") {
            label = rest;
        } else if let Some(rest) = line.strip_prefix("data: ") {
            data = rest;
        }
    }

    let event: Value = match serde_json::from_str(data) {
        Ok(v) => v,
        Err(_) => return Ok(false),
    };

    match label {
        "text" => {
            if let Some(chunk) = event["chunk"].as_str() {
                print!("{chunk}");
                stdout.flush()?;
            }
        }
        "tool-call" => {
            let name = event["chunk"]["toolName"].as_str().unwrap_or("?");
            eprintln!("\n  [tool] {name} ...");
        }
        "tool-result" => {
            let name = event["chunk"]["toolName"].as_str().unwrap_or("?");
            let failed = event["chunk"]["is_error"].as_bool().unwrap_or(false);
            if failed {
                eprintln!("  [tool] {name} failed");
            } else {
                eprintln!("  [tool] {name} ok");
            }
        }
        "error" => {
            let message = event["message"].as_str().unwrap_or("unknown error");
            eprintln!("\n  [error] {message}");
        }
        "done" => return Ok(true),
        _ => {}
    }

    Ok(false)
}
