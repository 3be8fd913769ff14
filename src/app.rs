//! Interactive training loop.
//!
//! Waits on two sources with `tokio::select!`:
//! 1. User input (stdin lines from a reader thread, Ctrl+C)
//! 2. Session events (socket lifecycle, analysis, camera readiness)

use std::io::BufRead;
use std::path::PathBuf;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::api::{AnalysisClient, ApiError};
use crate::camera::{CameraCapture, CameraError, CaptureSource};
use crate::config::{Config, ConfigError};
use crate::hud;
use crate::identity::{IdentityCache, IdentityError};
use crate::session::{
    Notice, SessionEvent, SessionManager, SessionOptions, SetupError, StopHandle, StopReport,
};

/// A line typed by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserCommand {
    Start,
    Stop,
    Retry,
    Status,
    /// Save the current overlay surface as a PNG.
    Overlay(PathBuf),
    Help,
    Quit,
}

impl UserCommand {
    /// Parse one input line. Blank lines give `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let mut words = line.split_whitespace();
        let Some(word) = words.next() else {
            return Ok(None);
        };
        let command = match word.to_ascii_lowercase().as_str() {
            "start" | "s" => UserCommand::Start,
            "stop" | "x" => UserCommand::Stop,
            "retry" | "r" => UserCommand::Retry,
            "status" => UserCommand::Status,
            "overlay" => match words.next() {
                Some(path) => UserCommand::Overlay(PathBuf::from(path)),
                None => return Err("usage: overlay <path.png>".to_string()),
            },
            "help" | "?" => UserCommand::Help,
            "quit" | "exit" | "q" => UserCommand::Quit,
            other => return Err(format!("unknown command '{}'; type 'help'", other)),
        };
        Ok(Some(command))
    }
}

#[derive(Debug)]
enum Input {
    Command(UserCommand),
    Interrupt,
    /// stdin closed.
    Eof,
}

/// Errors that end the program.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Camera(#[from] CameraError),

    #[error("Failed to install Ctrl+C handler: {0}")]
    Signal(#[from] ctrlc::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Build everything from `config` and run the loop until the user quits.
pub async fn train(config: Config) -> Result<(), AppError> {
    let identity = config
        .identity
        .path
        .clone()
        .map(IdentityCache::new)
        .unwrap_or_else(IdentityCache::at_default_path);
    let token = identity.token()?;
    let api = AnalysisClient::new(&config.server.api_base_url, token)?;
    let capture = CameraCapture::new(config.camera.settings());
    let options = SessionOptions {
        ws_base_url: config.server.ws_base_url.clone(),
        sampler: config.sampler.options(),
    };

    let (manager, events) = SessionManager::new(api, identity, capture, options);
    let (input_tx, inputs) = mpsc::unbounded_channel();
    install_ctrlc_handler(manager.stop_handle(), input_tx.clone())?;
    spawn_stdin_reader(input_tx);

    println!("squat-coach ready. Type 'start' to begin, 'help' for commands.");
    App::new(manager, events, inputs).run().await;
    Ok(())
}

/// Ctrl+C asks any in-flight start to give up, then quits the loop.
fn install_ctrlc_handler(
    stop: StopHandle,
    inputs: UnboundedSender<Input>,
) -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(move || {
        stop.request();
        let _ = inputs.send(Input::Interrupt);
    })
}

fn spawn_stdin_reader(inputs: UnboundedSender<Input>) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            match UserCommand::parse(&line) {
                Ok(Some(command)) => {
                    if inputs.send(Input::Command(command)).is_err() {
                        return;
                    }
                }
                Ok(None) => {}
                Err(msg) => eprintln!("{}", msg),
            }
        }
        let _ = inputs.send(Input::Eof);
    });
}

enum Flow {
    Continue,
    Quit,
}

struct App<C: CaptureSource> {
    manager: SessionManager<C>,
    events: UnboundedReceiver<SessionEvent>,
    inputs: UnboundedReceiver<Input>,
    last_hud: String,
}

impl<C: CaptureSource> App<C> {
    fn new(
        manager: SessionManager<C>,
        events: UnboundedReceiver<SessionEvent>,
        inputs: UnboundedReceiver<Input>,
    ) -> Self {
        Self {
            manager,
            events,
            inputs,
            last_hud: String::new(),
        }
    }

    async fn run(mut self) {
        loop {
            tokio::select! {
                input = self.inputs.recv() => {
                    let flow = match input {
                        Some(input) => self.handle_input(input).await,
                        None => Flow::Quit,
                    };
                    if let Flow::Quit = flow {
                        break;
                    }
                }
                Some(event) = self.events.recv() => {
                    if let Some(notice) = self.manager.handle_event(event) {
                        self.show_notice(notice);
                    }
                }
            }
        }
        self.stop().await;
        log::info!("Bye");
    }

    async fn handle_input(&mut self, input: Input) -> Flow {
        let command = match input {
            Input::Command(command) => command,
            Input::Interrupt | Input::Eof => return Flow::Quit,
        };

        match command {
            UserCommand::Start => return self.start().await,
            UserCommand::Stop => self.stop().await,
            UserCommand::Retry => match self.manager.retry_capture() {
                Ok(()) => println!("Retrying camera..."),
                Err(e) => println!("Cannot retry: {}", e),
            },
            UserCommand::Status => self.show_status(),
            UserCommand::Overlay(path) => match self.manager.overlay().save_png(&path) {
                Ok(()) => println!("Overlay saved to {}", path.display()),
                Err(e) => println!("Could not save overlay: {}", e),
            },
            UserCommand::Help => print_help(),
            UserCommand::Quit => return Flow::Quit,
        }
        Flow::Continue
    }

    /// Run `start_training` while still listening for stop/quit, so a stop
    /// typed mid-start reaches the start chain.
    async fn start(&mut self) -> Flow {
        let stop = self.manager.stop_handle();
        let inputs = &mut self.inputs;
        let start = self.manager.start_training();
        tokio::pin!(start);

        println!("Starting session...");
        let mut flow = Flow::Continue;
        let result = loop {
            tokio::select! {
                result = &mut start => break result,
                Some(input) = inputs.recv() => match input {
                    Input::Command(UserCommand::Stop) => stop.request(),
                    Input::Command(UserCommand::Quit) | Input::Interrupt | Input::Eof => {
                        stop.request();
                        flow = Flow::Quit;
                    }
                    Input::Command(_) => println!("Still starting; type 'stop' to cancel."),
                },
            }
        };

        match result {
            Ok(()) => println!("Session created, connecting..."),
            Err(SetupError::Cancelled) => println!("Start cancelled."),
            Err(e) => println!("Could not start: {}", e),
        }
        flow
    }

    async fn stop(&mut self) {
        let Some(report) = self.manager.stop_training().await else {
            return;
        };
        self.last_hud.clear();
        show_report(&report);
    }

    fn show_notice(&mut self, notice: Notice) {
        match notice {
            Notice::Streaming(resolution) => {
                println!("Camera ready ({}). Streaming, start squatting!", resolution)
            }
            Notice::CaptureFailed(e) => {
                println!("Camera error: {}", e);
                println!("Fix the camera and type 'retry', or 'stop' to end the session.");
            }
            Notice::Snapshot => {
                let rendered = hud::render(self.manager.projection());
                if rendered != self.last_hud {
                    println!("{}", rendered);
                    self.last_hud = rendered;
                }
            }
            Notice::ConnectionLost(reason) => {
                match reason {
                    Some(msg) => println!("Connection lost: {}", msg),
                    None => println!("Connection closed by the server."),
                }
                println!("Frame sending halted. Type 'stop' to end the session.");
            }
        }
    }

    fn show_status(&self) {
        let manager = &self.manager;
        println!("Session:   {}", manager.state());
        match manager.transport_state() {
            Some(state) => println!("Socket:    {}", state),
            None => println!("Socket:    none"),
        }
        println!(
            "Streaming: {}",
            if manager.is_sampling() { "yes" } else { "no" }
        );
        println!("{}", hud::render(manager.projection()));
    }
}

fn show_report(report: &StopReport) {
    match &report.summary {
        Some(summary) => println!("{}", hud::summary_block(summary)),
        None => println!("Session stopped."),
    }
    for failure in &report.failures {
        println!("Warning: {}", failure);
    }
}

fn print_help() {
    println!("Commands:");
    println!("  start            create a session and begin streaming");
    println!("  stop             end the session and show the summary");
    println!("  retry            try the camera again");
    println!("  status           show session state and latest feedback");
    println!("  overlay <path>   save the skeleton overlay as PNG");
    println!("  quit             stop and exit (also Ctrl+C)");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(UserCommand::parse("start"), Ok(Some(UserCommand::Start)));
        assert_eq!(UserCommand::parse("  STOP "), Ok(Some(UserCommand::Stop)));
        assert_eq!(UserCommand::parse("r"), Ok(Some(UserCommand::Retry)));
        assert_eq!(UserCommand::parse("exit"), Ok(Some(UserCommand::Quit)));
        assert_eq!(
            UserCommand::parse("overlay /tmp/pose.png"),
            Ok(Some(UserCommand::Overlay(PathBuf::from("/tmp/pose.png"))))
        );
    }

    #[test]
    fn test_parse_blank_and_unknown() {
        assert_eq!(UserCommand::parse("   "), Ok(None));
        assert!(UserCommand::parse("jump").is_err());
        assert!(UserCommand::parse("overlay").is_err());
    }
}
