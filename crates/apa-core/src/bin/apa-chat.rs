//! apa-chat – terminal front end for an `apa-server` relay endpoint.
//!
//! Commands:
//! - any text: send it
//! - `/s <n>` while suggestions are shown: send suggestion `n`
//! - `/edit <n> <text>`: replace user message `n`
//! - `/copy <n>`: copy message `n` to the clipboard (OSC 52)
//! - `/quit`
//!
//! Ctrl-C while waiting for a reply cancels the request; at the prompt it
//! exits.

use std::future::Future;
use std::io::{self, Write};
use std::time::Duration;

use apa_core::cancel::{self, CancellationSignal};
use apa_core::render::{self, Span};
use apa_core::{ChatSession, Clipboard, HttpRelayClient, Message, Role};
use base64::Engine;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::warn;

#[derive(Debug, Parser)]
#[command(name = "apa-chat", version, about = "Chat with APA Agent from the terminal")]
struct Args {
    /// Relay endpoint URL.
    #[arg(long, env = "APA_RELAY_URL", default_value = "http://localhost:3000/api/chat")]
    endpoint: String,

    /// Give up on a reply after this many seconds.
    #[arg(long, env = "APA_RELAY_TIMEOUT_SECS", default_value_t = 120)]
    timeout_secs: u64,
}

/// Writes to the terminal clipboard with an OSC 52 escape sequence.
struct Osc52Clipboard;

impl Clipboard for Osc52Clipboard {
    fn write_text(&mut self, text: &str) -> io::Result<()> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(text);
        let mut out = io::stdout().lock();
        write!(out, "\x1b]52;c;{encoded}\x07")?;
        out.flush()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("APA_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let relay =
        HttpRelayClient::with_timeout(args.endpoint, Duration::from_secs(args.timeout_secs))?;
    let mut session = ChatSession::new(relay);

    print_transcript(&session);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut interrupts = spawn_interrupt_watcher();

    loop {
        prompt()?;
        let line = tokio::select! {
            line = lines.next_line() => line?,
            Some(()) = interrupts.recv() => {
                println!();
                // The pending stdin read would block runtime shutdown.
                std::process::exit(130);
            }
        };
        let Some(line) = line else {
            break;
        };
        let line = line.trim_end();

        if line.trim().is_empty() {
            continue;
        }
        if line == "/quit" {
            break;
        }
        if let Some(rest) = line.strip_prefix("/edit ") {
            edit(&mut session, rest);
            continue;
        }
        if let Some(rest) = line.strip_prefix("/copy ") {
            copy(&mut session, rest);
            continue;
        }
        let suggestion = match line.strip_prefix("/s ") {
            Some(rest) => match suggestion_index(rest, session.visible_suggestions().len()) {
                Some(index) => Some(index),
                None => {
                    println!("(tidak ada saran nomor {})", rest.trim());
                    continue;
                }
            },
            None => None,
        };

        let before = session.store().revision();
        let signal = cancel::new_signal();
        println!("{}", apa_core::replies::BUSY_INDICATOR);
        let result = {
            let send = async {
                match suggestion {
                    Some(index) => session.send_suggestion(index, Some(&signal)).await,
                    None => session.send(line, Some(&signal)).await,
                }
            };
            until_done_or_interrupted(send, &signal, &mut interrupts).await
        };

        match result {
            Ok(None) => println!("(dibatalkan)"),
            Ok(Some(_)) => {}
            Err(e) => warn!(error = %e, "message not sent"),
        }
        if session.store().revision() != before {
            print_transcript(&session);
        }
    }

    Ok(())
}

/// One Ctrl-C listener for the whole process; each press is forwarded.
fn spawn_interrupt_watcher() -> mpsc::UnboundedReceiver<()> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if tx.send(()).is_err() {
                break;
            }
        }
    });
    rx
}

/// Drive `send` to completion, tripping `signal` on every interrupt.
async fn until_done_or_interrupted<F: Future>(
    send: F,
    signal: &CancellationSignal,
    interrupts: &mut mpsc::UnboundedReceiver<()>,
) -> F::Output {
    tokio::pin!(send);
    loop {
        tokio::select! {
            output = &mut send => return output,
            Some(()) = interrupts.recv() => cancel::cancel(signal),
        }
    }
}

fn prompt() -> io::Result<()> {
    let mut out = io::stdout().lock();
    write!(out, "> ")?;
    out.flush()
}

/// 1-based suggestion number to index, if that many are visible.
fn suggestion_index(n: &str, visible: usize) -> Option<usize> {
    let n: usize = n.trim().parse().ok()?;
    (1..=visible).contains(&n).then(|| n - 1)
}

fn message_at<C: apa_core::RelayClient>(session: &ChatSession<C>, n: &str) -> Option<Message> {
    let index: usize = n.parse().ok()?;
    session.store().nth(index.checked_sub(1)?).cloned()
}

fn edit(session: &mut ChatSession<HttpRelayClient>, rest: &str) {
    let (n, text) = rest.split_once(' ').unwrap_or((rest, ""));
    let Some(message) = message_at(session, n) else {
        println!("(tidak ada pesan nomor {n})");
        return;
    };
    if !session.start_edit(&message.id) {
        println!("(hanya pesan Anda yang dapat diedit)");
        return;
    }
    session.update_edit(text);
    if session.save_edit() {
        print_transcript(session);
    } else {
        session.cancel_edit();
        println!("(pesan tidak boleh kosong)");
    }
}

fn copy(session: &mut ChatSession<HttpRelayClient>, n: &str) {
    let Some(message) = message_at(session, n.trim()) else {
        println!("(tidak ada pesan nomor {n})");
        return;
    };
    if session.copy_message(&message.id, &mut Osc52Clipboard) {
        println!("(disalin)");
    }
}

fn print_transcript<C: apa_core::RelayClient>(session: &ChatSession<C>) {
    println!();
    for (i, message) in session.messages().iter().enumerate() {
        let who = match message.role {
            Role::User => "Anda",
            Role::Assistant => "APA Agent",
        };
        let time = message
            .timestamp
            .with_timezone(&chrono::Local)
            .format("%H:%M:%S");
        println!("[{}] {who} · {time}", i + 1);
        println!("{}\n", to_ansi(&message.content));
    }

    let suggestions = session.visible_suggestions();
    if !suggestions.is_empty() {
        println!("Saran Topik Diskusi");
        for (i, s) in suggestions.iter().enumerate() {
            println!("  {}. {} {}: {}", i + 1, s.icon.glyph(), s.title, s.prompt);
        }
        println!("Ketik /s <nomor> untuk memilih.\n");
    }
}

/// Terminal rendering of reply markup. Control characters in the reply are
/// dropped so provider text cannot emit escape sequences.
fn to_ansi(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for span in render::parse(text) {
        match span {
            Span::Text(t) => push_clean(&mut out, t),
            Span::Strong(t) => styled(&mut out, "\x1b[1m", t),
            Span::Emphasis(t) => styled(&mut out, "\x1b[3m", t),
            Span::Code(t) => styled(&mut out, "\x1b[36m", t),
            Span::LineBreak => out.push('\n'),
        }
    }
    out
}

fn styled(out: &mut String, style: &str, text: &str) {
    out.push_str(style);
    push_clean(out, text);
    out.push_str("\x1b[0m");
}

fn push_clean(out: &mut String, text: &str) {
    out.extend(text.chars().filter(|c| !c.is_control() || *c == '\t'));
}
