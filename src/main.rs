//! Terminal host for a circuit chat session
//!
//! Reads commands from stdin, turns them into session events and prints the
//! view updates the runtime publishes.

use circuit_chat::config::ClientConfig;
use circuit_chat::protocol::{HttpProtocolClient, LoggingClient};
use circuit_chat::renderer::{Document, HistoryView, LoadingSlot, ViewUpdate};
use circuit_chat::runtime::spawn_session;
use circuit_chat::state_machine::Event;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const HELP: &str = "\
Type a question and press enter to send it. Commands:
  A, B, ...        pick a presented option
  :back :reset     step back / start over
  :results         show the current search results
  :fuzzy [text]    suggest a corrected query (:accept / :dismiss)
  :send :clear     send or clear the current input
  :history         saved conversations (:view N, :delete N, :close)
  :save            save the conversation (:title TEXT, :save again to submit)
  :yes :no         answer a confirmation
  :logout :html :help :quit";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ClientConfig::from_env()?;

    // Logs go to stderr so they do not interleave with the conversation
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter.as_str().into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr),
        )
        .init();

    tracing::info!(backend = %config.base_url, "Starting circuit chat session");
    let client = LoggingClient::new(HttpProtocolClient::new(config)?);
    let session = spawn_session(client);
    let mut updates = session.subscribe();
    session.send(Event::Startup).await?;

    println!("{HELP}");
    let mut document = Document::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Ok(update) => {
                    print_update(&update);
                    document.apply(&update);
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Terminal fell behind the session");
                }
                Err(RecvError::Closed) => break,
            },
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match parse_line(&line, &document) {
                    Command::Events(events) => {
                        for event in events {
                            session.send(event).await?;
                        }
                    }
                    Command::PrintHtml => println!("{}", document.to_html()),
                    Command::Help => println!("{HELP}"),
                    Command::Quit => break,
                    Command::Unknown(reason) => println!("! {reason}"),
                }
            }
        }
    }

    tracing::info!("Session closed");
    Ok(())
}

#[derive(Debug)]
enum Command {
    Events(Vec<Event>),
    PrintHtml,
    Help,
    Quit,
    Unknown(String),
}

fn events(list: impl IntoIterator<Item = Event>) -> Command {
    Command::Events(list.into_iter().collect())
}

fn parse_line(line: &str, document: &Document) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::Events(vec![]);
    }

    let Some(command) = line.strip_prefix(':') else {
        // A bare option label picks that option
        let label = format!("{}.", line.to_ascii_uppercase());
        if let Some(index) = document.options.iter().position(|b| b.label == label) {
            return events([Event::OptionSelected { index }]);
        }
        return events([
            Event::InputChanged {
                text: line.to_string(),
            },
            Event::Submit,
        ]);
    };

    let (name, arg) = command
        .split_once(' ')
        .map_or((command, ""), |(n, a)| (n, a.trim()));
    match name {
        "back" => events([Event::BackClicked]),
        "reset" => events([Event::ResetClicked]),
        "results" => events([Event::ShowResultsClicked]),
        "send" => events([Event::Submit]),
        "clear" => events([Event::ClearInput]),
        "fuzzy" if arg.is_empty() => events([Event::FuzzyClicked]),
        "fuzzy" => events([
            Event::InputChanged {
                text: arg.to_string(),
            },
            Event::FuzzyClicked,
        ]),
        "accept" => events([Event::FuzzyAccept]),
        "dismiss" => events([Event::FuzzyDismiss]),
        "history" => events([Event::HistoryOpen]),
        "view" | "delete" => match arg.parse::<i64>() {
            Ok(id) if name == "view" => events([Event::HistoryView { id }]),
            Ok(id) => events([Event::HistoryDelete { id }]),
            Err(_) => Command::Unknown(format!(":{name} needs a conversation id")),
        },
        "close" => {
            if document.history.is_some() {
                events([Event::HistoryClose])
            } else if document.save.is_some() {
                events([Event::SaveClose])
            } else if document.fuzzy.is_some() {
                events([Event::FuzzyDismiss])
            } else {
                Command::Unknown("nothing to close".to_string())
            }
        }
        "save" if document.save.is_some() => events([Event::SaveSubmit]),
        "save" => events([Event::SaveOpen]),
        "title" => events([Event::SaveTitleChanged {
            title: arg.to_string(),
        }]),
        "yes" => events([Event::Confirm { accepted: true }]),
        "no" => events([Event::Confirm { accepted: false }]),
        "logout" => events([Event::LogoutClicked]),
        "html" => Command::PrintHtml,
        "help" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => Command::Unknown(format!("unknown command :{other}, try :help")),
    }
}

fn print_update(update: &ViewUpdate) {
    match update {
        ViewUpdate::AppendBubble(bubble) => {
            println!("{}: {}", bubble.label, bubble.lines.join("\n    "));
        }
        ViewUpdate::Clear => println!("--- conversation cleared ---"),
        ViewUpdate::ShowOptions(buttons) => {
            for button in buttons {
                println!("  {} {}", button.label, button.text);
            }
        }
        ViewUpdate::ShowLoading(LoadingSlot::Chat) => println!("Searching..."),
        ViewUpdate::ShowLoading(LoadingSlot::Fuzzy) => println!("Correcting query..."),
        ViewUpdate::SetInput(text) if !text.is_empty() => println!("input: {text}"),
        ViewUpdate::Alert(text) => println!("! {text}"),
        ViewUpdate::Confirm(text) => println!("? {text} (:yes / :no)"),
        ViewUpdate::ShowFuzzy(view) => {
            println!("  original:   {}", view.original);
            println!("  corrected:  {}", view.corrected);
            if !view.explanation.is_empty() {
                println!("  why:        {}", view.explanation);
            }
            println!("  confidence: {}", view.confidence.as_str());
            println!("  (:accept / :dismiss)");
        }
        ViewUpdate::ShowHistory(view) => match view {
            HistoryView::Loading => println!("Loading saved conversations..."),
            HistoryView::Empty => println!("No saved conversations yet."),
            HistoryView::Failed => println!("! Could not load saved conversations."),
            HistoryView::Records(records) => {
                for r in records {
                    println!(
                        "  [{}] {} ({} messages, updated {})",
                        r.id, r.title, r.message_count, r.updated_at
                    );
                }
                println!("  (:view N / :delete N / :close)");
            }
        },
        ViewUpdate::ShowSave(view) => {
            println!("Save as: {}", view.title);
            if let Some(error) = &view.error {
                println!("! {error}");
            }
            println!("  (:title TEXT / :save / :close)");
        }
        ViewUpdate::SetAuth(Some(username)) => println!("Signed in as {username}"),
        ViewUpdate::SetAuth(None) => println!("Not signed in"),
        ViewUpdate::HideOptions
        | ViewUpdate::RemoveLoading(_)
        | ViewUpdate::SetInput(_)
        | ViewUpdate::ClosePrompt
        | ViewUpdate::CloseModal(_) => {}
    }
}
