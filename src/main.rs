use std::path::Path;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use uuid::Uuid;

use capmitra::collaborators::{
    CannedResponder, ConsoleOtpTransport, FileSystemRenderer, InMemoryDirectory,
};
use capmitra::config::Config;
use capmitra::flow::{Collaborators, Orchestrator};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let letters_dir =
        std::env::var("CAPMITRA_LETTERS_DIR").unwrap_or_else(|_| "static/letters".to_string());

    let directory = match std::env::var("CAPMITRA_DATA_FILE") {
        Ok(path) => {
            tracing::info!(path, "loading customer dataset");
            InMemoryDirectory::from_json_file(Path::new(&path))?
        }
        Err(_) => {
            tracing::info!("CAPMITRA_DATA_FILE not set, using built-in demo dataset");
            InMemoryDirectory::demo()
        }
    };

    let deps = Collaborators {
        directory: Arc::new(directory),
        otp: Arc::new(ConsoleOtpTransport),
        renderer: Arc::new(FileSystemRenderer::new(&letters_dir)),
        responder: Arc::new(CannedResponder::new()),
    };
    let orchestrator = Orchestrator::new(Config::default(), deps);
    let session = Uuid::new_v4();

    eprintln!("CapMitra v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Letters: {letters_dir}");
    eprintln!("   Type a message and press Enter. /quit to exit.\n");

    let stdin = tokio::io::stdin();
    let reader = BufReader::new(stdin);
    let mut lines = reader.lines();

    // Kick off the conversation before the first user input.
    let opening = orchestrator.handle_turn(session, "").await;
    println!("\n{}\n", opening.message);
    eprint!("> ");

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            eprint!("> ");
            continue;
        }
        if line == "/quit" {
            break;
        }

        let reply = orchestrator.handle_turn(session, line).await;
        println!("\n{}\n", reply.message);
        if let Some(path) = &reply.artifact_path {
            println!("[letter] {path}\n");
        }
        eprint!("> ");
    }

    Ok(())
}
