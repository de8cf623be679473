//! Console consultation client — runs the doctor's side of the simulation in
//! a terminal when the gateway binary is started with `--console`. Each typed
//! line is POSTed to a running gateway's /chat, and the reply segments are
//! played through a local avatar session (rodio audio + morph-weight frames).
//!
//! The rendering is textual: once per reply the loop prints the expression
//! and animation the renderer would be driving, then pumps frames until the
//! patient finishes speaking.

use medsim_avatar::{AudioSink, ConsultationSession, RodioSink};
use medsim_core::{expression_preset, ChatResponse, FacialExpression, SimulationConfig};
use std::io::{BufRead, Write};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const FRAME_INTERVAL: Duration = Duration::from_millis(16);

fn gateway_url(config: &SimulationConfig) -> String {
    std::env::var("MEDSIM_GATEWAY_URL")
        .unwrap_or_else(|_| format!("http://127.0.0.1:{}/chat", config.port))
}

pub async fn run(config: Arc<SimulationConfig>) {
    let url = gateway_url(&config);
    info!("console consultation against {}", url);

    let sink: Arc<dyn AudioSink> = match RodioSink::new() {
        Ok(sink) => Arc::new(sink),
        Err(e) => {
            eprintln!("[medsim-gateway] audio device unavailable: {}", e);
            return;
        }
    };
    // Register every target the expression presets drive; the session adds
    // the blink and viseme targets itself.
    let preset_targets = [
        FacialExpression::Smile,
        FacialExpression::Sad,
        FacialExpression::Surprised,
        FacialExpression::Angry,
        FacialExpression::Worried,
        FacialExpression::Pain,
        FacialExpression::FunnyFace,
        FacialExpression::Crazy,
    ]
    .into_iter()
    .flat_map(|e| expression_preset(e).iter().map(|(t, _)| t.to_string()));
    let mut session = ConsultationSession::start(sink, preset_targets);

    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(120))
        .build()
    {
        Ok(c) => c,
        Err(e) => {
            eprintln!("[medsim-gateway] http client build failed: {}", e);
            return;
        }
    };

    // Opening turn: empty message, the patient introduces herself.
    if let Some(reply) = request_turn(&client, &url, None).await {
        play_reply(&mut session, reply).await;
    }

    let stdin = std::io::stdin();
    loop {
        print!("docteur> ");
        let _ = std::io::stdout().flush();
        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                warn!("stdin read failed: {}", e);
                break;
            }
        }
        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        if message == "/quit" {
            break;
        }
        if let Some(reply) = request_turn(&client, &url, Some(message)).await {
            play_reply(&mut session, reply).await;
        }
    }

    session.shutdown();
}

async fn request_turn(
    client: &reqwest::Client,
    url: &str,
    message: Option<&str>,
) -> Option<ChatResponse> {
    let body = match message {
        Some(m) => serde_json::json!({ "message": m }),
        None => serde_json::json!({}),
    };
    // 500 still carries the distress segments, so decode the body either way.
    match client.post(url).json(&body).send().await {
        Ok(resp) => match resp.json::<ChatResponse>().await {
            Ok(reply) => Some(reply),
            Err(e) => {
                warn!("gateway reply not decodable: {}", e);
                None
            }
        },
        Err(e) => {
            warn!("chat request failed: {}", e);
            None
        }
    }
}

/// Feed a reply into the session and pump frames until playback drains.
async fn play_reply(session: &mut ConsultationSession, reply: ChatResponse) {
    for segment in &reply.messages {
        println!(
            "patiente [{:?}/{:?}]> {}",
            segment.facial_expression, segment.animation, segment.text
        );
    }
    session.handle_reply(reply);
    loop {
        session.frame();
        if !session.is_speaking() {
            break;
        }
        tokio::time::sleep(FRAME_INTERVAL).await;
    }
}
