mod progress;
mod state;
mod worker;

use std::time::Duration;

use iced::widget::{button, checkbox, column, container, pick_list, progress_bar, row, text, text_input};
use iced::{executor, Alignment, Application, Command, Element, Length, Settings, Subscription, Theme};
use tracing::warn;
use winmigrate_engine::{logging, ChecksumAlgorithm, TransferConfig, TransferControl, TransferOptions};

use state::AppState;
use worker::{TransferOutcome, TransferRequest, WorkerError};

const TICK_INTERVAL: Duration = Duration::from_millis(200);

pub fn main() -> iced::Result {
    let config = TransferConfig::load(None).unwrap_or_else(|e| {
        eprintln!("Warning: {}; using default configuration", e);
        TransferConfig::default()
    });
    if let Err(e) = logging::init_logging(&config.verbosity, config.log_path.as_deref()) {
        eprintln!("Warning: {}", e);
    }
    GuiApp::run(Settings::with_flags(config.transfer_options()))
}

#[derive(Debug, Clone)]
pub enum Message {
    SourcePathChanged(String),
    DestinationPathChanged(String),
    VerifyToggled(bool),
    ChecksumAlgorithmChanged(ChecksumAlgorithm),
    BrowseSourcePressed,
    BrowseDestinationPressed,
    StartPressed,
    PausePressed,
    ResumePressed,
    CancelPressed,
    Tick,
    TransferCompleted(Result<TransferOutcome, WorkerError>),
}

pub struct GuiApp {
    state: AppState,
    options: TransferOptions,
}

impl Application for GuiApp {
    type Executor = executor::Default;
    type Message = Message;
    type Theme = Theme;
    type Flags = TransferOptions;

    fn new(options: TransferOptions) -> (Self, Command<Message>) {
        (
            GuiApp {
                state: AppState::new(),
                options,
            },
            Command::none(),
        )
    }

    fn title(&self) -> String {
        "WinMigrate - File Transfer".to_string()
    }

    fn update(&mut self, message: Message) -> Command<Message> {
        match message {
            Message::SourcePathChanged(path) => {
                self.state.source_path = path;
                self.state.error_message = None;
            }
            Message::DestinationPathChanged(path) => {
                self.state.destination_path = path;
                self.state.error_message = None;
            }
            Message::VerifyToggled(enabled) => {
                self.state.verify_after_copy = enabled;
            }
            Message::ChecksumAlgorithmChanged(algo) => {
                self.state.checksum_algorithm = algo;
            }
            Message::BrowseSourcePressed => {
                if let Some(path) = rfd::FileDialog::new().pick_file() {
                    self.state.source_path = path.display().to_string();
                    self.state.error_message = None;
                }
            }
            Message::BrowseDestinationPressed => {
                if let Some(path) = rfd::FileDialog::new().save_file() {
                    self.state.destination_path = path.display().to_string();
                    self.state.error_message = None;
                }
            }
            Message::StartPressed => {
                let (source, destination) = match self.state.validate_inputs() {
                    Ok(paths) => paths,
                    Err(msg) => {
                        self.state.error_message = Some(msg);
                        return Command::none();
                    }
                };

                let (tx, rx) = crossbeam_channel::unbounded();
                let control = TransferControl::new();
                self.state.begin(control.clone(), rx);

                let request = TransferRequest {
                    source,
                    destination,
                    options: self.options,
                    verify: self
                        .state
                        .verify_after_copy
                        .then_some(self.state.checksum_algorithm),
                };
                return worker::start(request, control, tx);
            }
            Message::PausePressed => self.state.pause(),
            Message::ResumePressed => self.state.resume(),
            Message::CancelPressed => self.state.cancel(),
            Message::Tick => self.state.drain_updates(),
            Message::TransferCompleted(result) => {
                if let Err(e) = &result {
                    warn!(error = %e, "transfer worker failed");
                }
                self.state.finish(result);
            }
        }
        Command::none()
    }

    fn subscription(&self) -> Subscription<Message> {
        if self.state.is_running {
            iced::time::every(TICK_INTERVAL).map(|_| Message::Tick)
        } else {
            Subscription::none()
        }
    }

    fn view(&self) -> Element<Message> {
        let idle = !self.state.is_running;

        let input_section = column![
            text("Source File"),
            row![
                text_input("Enter source path", &self.state.source_path)
                    .on_input(Message::SourcePathChanged)
                    .width(Length::Fill),
                button("Browse...").on_press_maybe(idle.then_some(Message::BrowseSourcePressed)),
            ]
            .spacing(10)
            .align_items(Alignment::Center),
            text("Destination File"),
            row![
                text_input("Enter destination path", &self.state.destination_path)
                    .on_input(Message::DestinationPathChanged)
                    .width(Length::Fill),
                button("Browse...")
                    .on_press_maybe(idle.then_some(Message::BrowseDestinationPressed)),
            ]
            .spacing(10)
            .align_items(Alignment::Center),
        ]
        .spacing(10)
        .padding(10);

        let algo_options = vec![
            ChecksumAlgorithm::Sha256,
            ChecksumAlgorithm::Blake3,
            ChecksumAlgorithm::Md5,
            ChecksumAlgorithm::Crc32,
        ];

        let mut options_column = column![checkbox("Verify after copy", self.state.verify_after_copy)
            .on_toggle(Message::VerifyToggled)]
        .spacing(10)
        .padding(10);

        if self.state.verify_after_copy {
            options_column = options_column.push(pick_list(
                algo_options,
                Some(self.state.checksum_algorithm),
                Message::ChecksumAlgorithmChanged,
            ));
        }

        let controls = row![
            button(if idle { "Start Transfer" } else { "Running..." })
                .on_press_maybe(idle.then_some(Message::StartPressed))
                .padding(10),
            button("Pause")
                .on_press_maybe((!idle && !self.state.is_paused).then_some(Message::PausePressed))
                .padding(10),
            button("Resume")
                .on_press_maybe((!idle && self.state.is_paused).then_some(Message::ResumePressed))
                .padding(10),
            button("Cancel")
                .on_press_maybe((!idle).then_some(Message::CancelPressed))
                .padding(10),
        ]
        .spacing(10);

        let progress_section: Element<Message> = if self.state.is_running {
            let status = match self.state.retry_seconds {
                Some(secs) => format!("Connection problem, retrying in {}s", secs),
                None if self.state.is_paused => "Paused".to_string(),
                None => format!(
                    "{} / {} bytes",
                    self.state.bytes_copied, self.state.total_bytes
                ),
            };
            column![
                progress_bar(0.0..=100.0, self.state.percent()),
                text(format!("Progress: {:.0}%", self.state.percent())),
                text(status),
            ]
            .spacing(10)
            .padding(10)
            .into()
        } else if let Some(status) = &self.state.status_message {
            text(status).into()
        } else {
            text("Ready to transfer").into()
        };

        let error_section: Element<Message> = if let Some(error) = &self.state.error_message {
            container(text(format!("ERROR: {}", error)))
                .padding(10)
                .into()
        } else {
            text("").into()
        };

        column![
            text("WinMigrate - File Transfer").size(24),
            input_section,
            options_column,
            controls,
            progress_section,
            error_section,
        ]
        .spacing(20)
        .padding(20)
        .into()
    }
}
