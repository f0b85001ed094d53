use ctrlc::set_handler;
use futures::StreamExt;
use pico_args::Arguments;
use rustyline::{
    Cmd, ConditionalEventHandler, DefaultEditor, Event, EventContext, EventHandler, KeyEvent,
    error::ReadlineError,
};
use std::collections::VecDeque;
use std::io::{self, Write};
use std::thread;
use superpumped::{AiChatRequest, NewNoteRequest};
use tokio::sync::mpsc::{Receiver, Sender};

mod models;

use models::repl::{Command, ServerRequest, ServerResponse, UserRequest, Utf8Buffer};

/// Read a whole plain-text response, turning error statuses into errors.
async fn read_text(response: reqwest::Response) -> Result<String, String> {
    let status = response.status();
    let text = response.text().await.map_err(|err| err.to_string())?;
    if status.is_success() {
        Ok(text)
    } else {
        Err(format!("{status}: {text}"))
    }
}

/// Loop for interacting with the server. Waits for a new request and, for
/// chat, streams the response in chunks until it finishes or an interrupt
/// signal is caught.
async fn client(url: String, mut rx: Receiver<ServerRequest>, tx: Sender<ServerResponse>) {
    let client = reqwest::Client::new();
    let url = url.trim_end_matches('/').to_string();

    while let Some(request) = rx.recv().await {
        let message = match request {
            ServerRequest::Chat(request) => {
                let response = client
                    .post(format!("{url}/api/ai-chat"))
                    .json(&request)
                    .send()
                    .await;
                match response {
                    Ok(response) if response.status().is_success() => {
                        stream_chat(response, &mut rx, &tx).await
                    }
                    Ok(response) => {
                        let err = read_text(response).await.err().unwrap_or_default();
                        ServerResponse::Error(err)
                    }
                    Err(err) => ServerResponse::Error(err.to_string()),
                }
            }
            ServerRequest::Note(request) => {
                let response = client
                    .post(format!("{url}/notes"))
                    .json(&request)
                    .send()
                    .await;
                match response {
                    Ok(response) => finish_text(read_text(response).await, &tx).await,
                    Err(err) => ServerResponse::Error(err.to_string()),
                }
            }
            ServerRequest::Ask(question) => {
                let response = client
                    .get(format!("{url}/"))
                    .query(&[("text", question)])
                    .send()
                    .await;
                match response {
                    Ok(response) => finish_text(read_text(response).await, &tx).await,
                    Err(err) => ServerResponse::Error(err.to_string()),
                }
            }
            // Nothing is streaming, so there's nothing to cancel.
            ServerRequest::Cancel => continue,
        };
        if tx.send(message).await.is_err() {
            break;
        }
    }
}

async fn finish_text(
    result: Result<String, String>,
    tx: &Sender<ServerResponse>,
) -> ServerResponse {
    match result {
        Ok(text) => {
            let _ = tx.send(ServerResponse::Chunk(text)).await;
            ServerResponse::Done
        }
        Err(err) => ServerResponse::Error(err),
    }
}

/// Forward streamed text until the body ends or the user cancels. Returns
/// the final message to send.
async fn stream_chat(
    response: reqwest::Response,
    rx: &mut Receiver<ServerRequest>,
    tx: &Sender<ServerResponse>,
) -> ServerResponse {
    let mut stream = response.bytes_stream();
    let mut buffer = Utf8Buffer::default();
    loop {
        tokio::select! {
            chunk = stream.next() => {
                match chunk {
                    Some(Ok(bytes)) => {
                        let text = buffer.push(&bytes);
                        if text.is_empty() {
                            continue;
                        }
                        if tx.send(ServerResponse::Chunk(text)).await.is_err() {
                            return ServerResponse::Cancelled;
                        }
                    }
                    Some(Err(err)) => return ServerResponse::Error(err.to_string()),
                    None => return ServerResponse::Done,
                }
            }
            Some(ServerRequest::Cancel) = rx.recv() => {
                // Dropping the stream closes the connection.
                return ServerResponse::Cancelled;
            }
        }
    }
}

struct InterruptEventHandler;

impl ConditionalEventHandler for InterruptEventHandler {
    fn handle(
        &self,
        _: &Event,
        _: rustyline::RepeatCount,
        _: bool,
        ctx: &EventContext,
    ) -> Option<rustyline::Cmd> {
        if ctx.line().is_empty() {
            Some(Cmd::EndOfFile)
        } else {
            Some(Cmd::Interrupt)
        }
    }
}

/// User REPL loop. The user can enter chat messages or clear their input
/// using this loop. If a message is sent, a response is read from the
/// server and this REPL is inactive until the response finishes or the
/// stream is interrupted through the other CTRL+C handler.
fn repl(mut rx: Receiver<()>, tx: Sender<UserRequest>) -> Result<(), ReadlineError> {
    let mut rl = DefaultEditor::new()?;
    let interrupt_event_handler = Box::new(InterruptEventHandler);
    rl.bind_sequence(
        KeyEvent::ctrl('c'),
        EventHandler::Conditional(interrupt_event_handler),
    );

    while rx.blocking_recv().is_some() {
        loop {
            match rl.readline(">> ") {
                Ok(input) => {
                    let _ = rl.add_history_entry(input.as_str());
                    if tx.blocking_send(UserRequest::Prompt(input)).is_err() {
                        return Ok(());
                    }
                    break;
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                }
                Err(ReadlineError::Eof) => {
                    std::process::exit(0);
                }
                Err(err) => return Err(err),
            }
        }
    }
    Ok(())
}

/// For catching user interrupts during a response stream. If a response
/// stream is not active, then the interrupt handler from the REPL takes
/// precedence and this doesn't catch the signal.
fn ctrlc_handler(tx: Sender<UserRequest>) -> Result<(), ctrlc::Error> {
    set_handler(move || {
        let _ = tx.blocking_send(UserRequest::Cancel);
    })?;

    thread::park();

    Ok(())
}

/// Recent chat exchanges, bounded by their total character count. The
/// oldest exchanges are dropped first.
struct History {
    limit: usize,
    size: usize,
    exchanges: VecDeque<(String, String)>,
    pending: Option<String>,
    buffer: String,
}

impl History {
    fn new(limit: usize) -> Self {
        Self {
            limit,
            size: 0,
            exchanges: VecDeque::new(),
            pending: None,
            buffer: String::new(),
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.exchanges.len()
    }

    /// Start an exchange and return the conversation so far as context.
    fn start(&mut self, query: String) -> AiChatRequest {
        let context = self
            .exchanges
            .iter()
            .map(|(user, assistant)| format!("User: {user}\nAssistant: {assistant}"))
            .collect::<Vec<String>>()
            .join("\n\n");
        self.pending = Some(query.clone());
        self.buffer.clear();
        AiChatRequest {
            query,
            context: Some(context).filter(|context| !context.is_empty()),
        }
    }

    fn push_chunk(&mut self, content: &str) {
        if self.pending.is_some() {
            self.buffer.push_str(content);
        }
    }

    fn finish(&mut self) {
        let Some(user) = self.pending.take() else {
            return;
        };
        let assistant = std::mem::take(&mut self.buffer);
        self.size += user.chars().count() + assistant.chars().count();
        self.exchanges.push_back((user, assistant));
        while self.size > self.limit {
            let Some((user, assistant)) = self.exchanges.pop_front() else {
                break;
            };
            self.size -= user.chars().count() + assistant.chars().count();
        }
    }

    fn cancel(&mut self) {
        self.pending = None;
        self.buffer.clear();
    }
}

const HELP: &str = "\
Chat with a second brain

USAGE:
  superpumped_client [OPTIONS]

COMMANDS:
  <message>         Chat, using recent messages as context
  /note <text>      Remember a note
  /ask <question>   Answer a question from your notes

OPTIONS:
  --url     Server URL                      [default: http://127.0.0.1:6969]
  --limit   Chat context limit in chars     [default: 8000]

FLAGS:
  -h, --help    Print help information
";

struct Args {
    url: String,
    context_limit: usize,
}

/// Minimal REPL
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut pargs = Arguments::from_env();

    if pargs.contains(["-h", "--help"]) {
        println!("{}", HELP);
        std::process::exit(0);
    }

    let args = Args {
        url: pargs
            .value_from_str("--url")
            .unwrap_or("http://127.0.0.1:6969".into()),
        context_limit: pargs.value_from_str("--limit").unwrap_or(8000),
    };
    let Args { url, context_limit } = args;

    // Channels for all the IPC going on.
    let (start_repl_sender, start_repl_receiver) = tokio::sync::mpsc::channel(1);
    let (user_request_sender, mut user_request_receiver): (
        Sender<UserRequest>,
        Receiver<UserRequest>,
    ) = tokio::sync::mpsc::channel(1);
    let ctrlc_user_request_sender = user_request_sender.clone();
    let (server_request_sender, server_request_receiver): (
        Sender<ServerRequest>,
        Receiver<ServerRequest>,
    ) = tokio::sync::mpsc::channel(1);
    let (server_response_sender, mut server_response_receiver): (
        Sender<ServerResponse>,
        Receiver<ServerResponse>,
    ) = tokio::sync::mpsc::channel(1);

    // Begin background processes.
    thread::spawn(|| repl(start_repl_receiver, user_request_sender));
    tokio::spawn(client(url, server_request_receiver, server_response_sender));
    thread::spawn(|| ctrlc_handler(ctrlc_user_request_sender));

    // Kick-off the user prompt.
    start_repl_sender.send(()).await?;

    // Main loop.
    let mut history = History::new(context_limit);
    loop {
        tokio::select! {
            Some(user_request) = user_request_receiver.recv() => {
                let server_request = match user_request {
                    UserRequest::Prompt(input) => match Command::parse(&input) {
                        Some(Command::Chat(query)) => ServerRequest::Chat(history.start(query)),
                        Some(Command::Note(text)) => {
                            ServerRequest::Note(NewNoteRequest::builder().text(text).build())
                        }
                        Some(Command::Ask(question)) => ServerRequest::Ask(question),
                        None => {
                            start_repl_sender.send(()).await?;
                            continue;
                        }
                    },
                    UserRequest::Cancel => ServerRequest::Cancel,
                };
                server_request_sender.send(server_request).await?;
            }
            Some(server_response) = server_response_receiver.recv() => {
                match server_response {
                    ServerResponse::Chunk(content) => {
                        history.push_chunk(&content);
                        print!("{content}");
                        io::stdout().flush()?;
                    }
                    ServerResponse::Done => {
                        history.finish();
                        println!();
                        start_repl_sender.send(()).await?;
                    }
                    ServerResponse::Cancelled => {
                        history.cancel();
                        println!();
                        start_repl_sender.send(()).await?;
                    }
                    ServerResponse::Error(err) => {
                        history.cancel();
                        println!("Error: {err}");
                        start_repl_sender.send(()).await?;
                    }
                }
            }
        }
    }
}
