use log::{ debug, warn };
use std::error::Error;
use std::sync::Arc;
use tokio::io::{ AsyncBufReadExt, BufReader };
use tokio::sync::broadcast::{ self, error::RecvError };

use crate::controller::{ SessionController, SessionEvent, SUGGESTED_QUESTIONS };
use crate::models::chat::{ ChatMessage, Role };
use crate::models::content::ContentBlock;
use crate::render::render;

const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

enum Command {
    Send(String),
    Ask(usize),
    NewChat,
    History,
    Help,
    Quit,
    Unknown(String),
}

fn parse_command(line: &str) -> Command {
    let trimmed = line.trim();
    let Some(rest) = trimmed.strip_prefix('/') else {
        return Command::Send(line.to_string());
    };
    let mut parts = rest.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some("new"), _) => Command::NewChat,
        (Some("history"), _) => Command::History,
        (Some("help"), _) => Command::Help,
        (Some("quit") | Some("exit"), _) => Command::Quit,
        (Some("ask"), Some(n)) =>
            match n.parse::<usize>() {
                Ok(n) if n >= 1 => Command::Ask(n - 1),
                _ => Command::Unknown(trimmed.to_string()),
            }
        _ => Command::Unknown(trimmed.to_string()),
    }
}

/// Drives `controller` from stdin until EOF or `/quit`.
pub async fn run_repl(controller: Arc<SessionController>) -> Result<(), Box<dyn Error + Send + Sync>> {
    let printer = tokio::spawn(print_events(controller.subscribe()));

    let restored = controller.messages().await;
    if restored.is_empty() {
        print_welcome();
    } else {
        for message in &restored {
            print_message(message, &render_for(message));
        }
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_command(&line) {
            Command::Send(text) => {
                let controller = controller.clone();
                tokio::spawn(async move {
                    let outcome = controller.send(&text).await;
                    debug!("Send finished: {:?}", outcome);
                });
            }
            Command::Ask(index) => {
                let controller = controller.clone();
                tokio::spawn(async move {
                    let outcome = controller.ask(index).await;
                    debug!("Ask finished: {:?}", outcome);
                });
            }
            Command::NewChat => controller.new_chat().await,
            Command::History => {
                for message in controller.messages().await {
                    println!("{DIM}[{}]{RESET} {}", message.role, strip_controls(&message.content));
                }
            }
            Command::Help => print_help(),
            Command::Quit => {
                break;
            }
            Command::Unknown(cmd) => println!("Unknown command: {} (try /help)", cmd),
        }
    }

    printer.abort();
    Ok(())
}

async fn print_events(mut events: broadcast::Receiver<SessionEvent>) {
    loop {
        match events.recv().await {
            Ok(SessionEvent::TypingStarted) => println!("{DIM}Si Maung is typing...{RESET}"),
            Ok(SessionEvent::TypingStopped) => {}
            Ok(SessionEvent::MessageAdded { message, blocks }) => print_message(&message, &blocks),
            Ok(SessionEvent::Error(text)) => println!("{RED}! {}{RESET}", strip_controls(&text)),
            Ok(SessionEvent::SessionReset) => print_welcome(),
            Err(RecvError::Lagged(skipped)) => warn!("Terminal fell behind, {} events skipped", skipped),
            Err(RecvError::Closed) => {
                break;
            }
        }
    }
}

fn render_for(message: &ChatMessage) -> Vec<ContentBlock> {
    match message.role {
        Role::Assistant => render(&message.content),
        Role::User => vec![ContentBlock::text(message.content.clone())],
    }
}

fn print_message(message: &ChatMessage, blocks: &[ContentBlock]) {
    let label = match message.role {
        Role::User => "you",
        Role::Assistant => "si maung",
    };
    println!("{BOLD}{}>{RESET} {}", label, format_blocks(blocks));
}

pub fn format_blocks(blocks: &[ContentBlock]) -> String {
    let mut out = String::new();
    for block in blocks {
        match block {
            ContentBlock::TextRun { text } => out.push_str(&decode_entities(text)),
            ContentBlock::Emphasis { text } => {
                out.push_str(BOLD);
                out.push_str(&decode_entities(text));
                out.push_str(RESET);
            }
            ContentBlock::InlineCode { text } => {
                out.push('`');
                out.push_str(&decode_entities(text));
                out.push('`');
            }
            ContentBlock::CodeBlock { language, code } => {
                out.push_str(&format!("\n{DIM}--- {} ---{RESET}\n", language));
                out.push_str(&decode_entities(code));
                out.push_str(&format!("\n{DIM}---{RESET}\n"));
            }
            ContentBlock::LineBreak => out.push('\n'),
        }
    }
    out
}

// A terminal is not a markup context, so entities are shown as characters.
// Control characters are dropped so backend text cannot emit escape sequences.
fn decode_entities(text: &str) -> String {
    let decoded = text
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    strip_controls(&decoded)
}

fn strip_controls(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}

fn print_welcome() {
    println!("{BOLD}Sampurasun!{RESET} Nepangkeun, abdi Si Maung. Bade naroskeun naon ngeunaan MaungDB?");
    for (i, question) in SUGGESTED_QUESTIONS.iter().enumerate() {
        println!("  /ask {}  {}", i + 1, question);
    }
}

fn print_help() {
    println!("/ask <n>   send a suggested question");
    println!("/new       clear history and start a new chat");
    println!("/history   show the conversation log");
    println!("/quit      exit");
}
