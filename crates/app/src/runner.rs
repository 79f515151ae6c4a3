use std::path::Path;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::oneshot;
use tracing::{info, warn};

use exam_core::Clock;
use exam_core::model::TestDocument;
use services::session::{AudioCommand, AudioEvent, BaseUrlResolver};
use services::{
    CompletionTrigger, Navigation, SessionError, SessionHandle, SessionService, SubmissionClient,
    SubmissionPayload,
};

use crate::commands::{HELP, Input, InputError};
use crate::config::Config;
use crate::render;

/// Stand-in media backend for a terminal: it has nothing to play, so every
/// command is acknowledged with the event a real player would report.
struct TerminalPlayer;

impl TerminalPlayer {
    fn perform(&self, handle: &SessionHandle, command: AudioCommand) {
        let mut next = Some(command);
        while let Some(command) = next.take() {
            let (generation, event) = match command {
                AudioCommand::Load { generation, url } => {
                    println!("  [audio] {url}");
                    (generation, AudioEvent::Loaded { duration_secs: 0.0 })
                }
                AudioCommand::Play { generation } => (generation, AudioEvent::Played),
                AudioCommand::Pause { generation } => (generation, AudioEvent::Paused),
            };
            next = handle.with(|s| s.media_event(generation, event));
        }
    }
}

enum Flow {
    Continue,
    Quit,
}

struct Runner {
    handle: SessionHandle,
    resolver: BaseUrlResolver,
    player: TerminalPlayer,
}

impl Runner {
    /// Print the unit now on screen and bring up its audio.
    async fn enter(&self) {
        if let Some(command) = self.handle.load_current_audio(&self.resolver).await {
            self.player.perform(&self.handle, command);
        }
        self.show();
    }

    fn show(&self) {
        let text = self.handle.with(|s| s.view().map(|view| render::unit(&view)));
        if let Some(text) = text {
            print!("{text}");
        }
        self.status();
    }

    fn status(&self) {
        let progress = self.handle.with(|s| s.progress());
        println!("{}", render::progress(&progress));
    }

    async fn navigate(
        &self,
        step: impl FnOnce(&mut SessionService) -> Result<Navigation, SessionError>,
    ) {
        match self.handle.with(step) {
            Ok(Navigation::Moved(_)) => self.enter().await,
            Ok(Navigation::Stayed) => println!("(already there)"),
            Ok(Navigation::Finished(_)) => {}
            Err(err) => println!("{err}"),
        }
    }

    fn audio(
        &self,
        command: impl FnOnce(&mut SessionService) -> Result<Option<AudioCommand>, SessionError>,
    ) {
        match self.handle.with(command) {
            Ok(Some(command)) => self.player.perform(&self.handle, command),
            Ok(None) => println!("(audio not available right now)"),
            Err(err) => println!("{err}"),
        }
    }

    async fn dispatch(&self, line: &str) -> Flow {
        let input = match Input::parse(line) {
            Ok(input) => input,
            Err(InputError::Empty) => return Flow::Continue,
            Err(err) => {
                println!("{err}");
                return Flow::Continue;
            }
        };

        match input {
            Input::Next => self.navigate(SessionService::next).await,
            Input::Back => self.navigate(SessionService::back).await,
            Input::Part(index) => self.navigate(|s| s.jump_to_part(index)).await,
            Input::Answer(slot, value) => report(self.handle.with(|s| s.answer(slot, &value))),
            Input::Toggle(slot, value) => {
                match self.handle.with(|s| s.toggle_answer(slot, &value)) {
                    Ok(now) if now.is_empty() => println!("(cleared)"),
                    Ok(now) => println!("> {now}"),
                    Err(err) => println!("{err}"),
                }
            }
            Input::Clear(slot) => report(self.handle.with(|s| s.clear_answer(slot))),
            Input::Play => self.audio(SessionService::play),
            Input::Pause => self.audio(SessionService::pause),
            Input::Show => self.show(),
            Input::Status => self.status(),
            Input::Finish => report(self.handle.with(SessionService::finish).map(|_| ())),
            Input::Help => println!("{HELP}"),
            Input::Quit => return Flow::Quit,
        }
        Flow::Continue
    }
}

fn report(result: Result<(), SessionError>) {
    if let Err(err) = result {
        println!("{err}");
    }
}

/// Run one attempt against `doc` on the terminal until it completes or the
/// learner quits.
///
/// # Errors
///
/// Returns an error for invalid settings, a document that cannot back a
/// session, unreadable stdin, or a failed submission.
pub async fn run(config: &Config, document: &Path, doc: &TestDocument) -> anyhow::Result<()> {
    let settings = config.settings()?;
    let resolver = BaseUrlResolver::new(config.audio_base_url(document)?);
    let client = SubmissionClient::from_env();

    let (done_tx, mut done) = oneshot::channel::<SubmissionPayload>();
    let handle = SessionHandle::start(
        doc,
        settings,
        Clock::default(),
        Box::new(move |payload| {
            let _ = done_tx.send(payload);
        }),
    )?;
    handle.spawn_timer();

    let runner = Runner {
        handle: handle.clone(),
        resolver,
        player: TerminalPlayer,
    };
    println!("{HELP}\n");
    runner.enter().await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let payload = loop {
        tokio::select! {
            payload = &mut done => break payload.ok(),
            line = lines.next_line() => {
                let Some(line) = line? else {
                    info!("input closed, finishing");
                    if let Err(err) = handle.with(SessionService::finish) {
                        warn!(%err, "could not finish on closed input");
                    }
                    break (&mut done).await.ok();
                };
                if let Flow::Quit = runner.dispatch(&line).await {
                    break None;
                }
                if handle.is_complete() {
                    break (&mut done).await.ok();
                }
            }
        }
    };
    handle.teardown();

    match payload {
        Some(payload) => deliver(&client, &payload).await,
        None => {
            println!("left without submitting");
            Ok(())
        }
    }
}

async fn deliver(client: &SubmissionClient, payload: &SubmissionPayload) -> anyhow::Result<()> {
    if payload.trigger == CompletionTrigger::Timeout {
        println!("time is up");
    }
    println!(
        "submitted {} answers after {}s",
        payload.answers.len(),
        payload.time_spent_seconds
    );

    if client.enabled() {
        let receipt = client.submit(payload).await?;
        if let Some(attempt) = receipt.attempt_id {
            println!("attempt {attempt}");
        }
    } else {
        println!("{}", serde_json::to_string_pretty(payload)?);
    }
    Ok(())
}
