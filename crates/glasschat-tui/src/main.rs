use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use glasschat_core::{
    Appearance, Config, ConversationStore, FileStore, HttpChatBackend, PayloadField,
};

mod app;
mod handler;
mod logging;
mod theme;
mod tui;
mod ui;

use app::App;
use tui::EventHandler;

#[derive(Parser)]
#[command(name = "glasschat")]
#[command(about = "Terminal chat client for a remote chat-completion endpoint")]
struct Cli {
    /// Chat endpoint URL (overrides config and GLASSCHAT_ENDPOINT)
    #[arg(short, long)]
    endpoint: Option<String>,
    /// JSON field carrying the message: "message" or "prompt"
    #[arg(short, long, value_parser = parse_payload_field)]
    payload_field: Option<PayloadField>,
    /// Print the initial conversation state as JSON and exit
    #[arg(long)]
    dump: bool,
}

fn parse_payload_field(value: &str) -> Result<PayloadField, String> {
    PayloadField::from_str(value).ok_or_else(|| {
        let known: Vec<&str> = PayloadField::all().iter().map(|f| f.as_str()).collect();
        format!("unknown payload field {:?}, expected one of: {}", value, known.join(", "))
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.dump {
        let store = ConversationStore::new();
        println!("{}", serde_json::to_string_pretty(&store.snapshot())?);
        return Ok(());
    }

    let config_dir = Config::config_dir()?;
    let (loaded, load_error) = match Config::load() {
        Ok(config) => (config, None),
        Err(e) => (Config::new(), Some(e)),
    };
    logging::init_logging(&config_dir, loaded.log_level.as_deref())?;
    if let Some(e) = load_error {
        tracing::warn!(error = %e, "Failed to read config, using defaults");
    }

    let mut config = loaded.apply_env();
    config.apply_overrides(cli.endpoint, None);
    if let Some(field) = cli.payload_field {
        config.payload_field = field;
    }

    tracing::info!(
        endpoint = %config.endpoint,
        payload_field = config.payload_field.as_str(),
        "Starting glasschat"
    );

    let backend = HttpChatBackend::new(&config.endpoint, config.payload_field);
    let appearance = Appearance::load(Box::new(FileStore::default_location()));
    let mut app = App::new(Arc::new(backend), appearance, config.endpoint.clone());

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new(app.subscribe());

    let result = run(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    if let Err(e) = &result {
        tracing::error!(error = %e, "Exited with error");
    }
    result
}

async fn run(terminal: &mut tui::Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        app.refresh();
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event).await?,
            None => break,
        }
    }
    Ok(())
}
