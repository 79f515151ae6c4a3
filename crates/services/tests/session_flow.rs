use std::sync::{Arc, Mutex, OnceLock};

use async_trait::async_trait;
use chrono::Duration;
use tokio::sync::{Notify, oneshot};
use url::Url;

use exam_core::model::{AudioRef, SessionSettings, TestDocument};
use exam_core::time::fixed_clock;
use exam_core::{PartKind, Position};
use services::session::{
    AudioCommand, AudioEvent, AudioResolver, AudioStatus, BaseUrlResolver, Tick,
};
use services::{
    AudioError, Completion, CompletionTrigger, Navigation, SessionHandle, SessionService,
    SubmissionPayload,
};

const DOCUMENT: &str = include_str!("fixtures/listening_test.json");

type Sink = Arc<Mutex<Vec<SubmissionPayload>>>;

fn document() -> TestDocument {
    TestDocument::from_json(DOCUMENT).unwrap()
}

fn recording() -> (Sink, services::session::OnComplete) {
    let sink: Sink = Arc::new(Mutex::new(Vec::new()));
    let out = Arc::clone(&sink);
    (sink, Box::new(move |p| out.lock().unwrap().push(p)))
}

#[test]
fn full_walk_through_every_part_shape() {
    let (sink, on_complete) = recording();
    let mut session = SessionService::start_with(
        &document(),
        SessionSettings::default(),
        fixed_clock(),
        on_complete,
    )
    .unwrap();

    let mut numbers = vec![session.current_question_number()];
    session.answer(0, "B").unwrap();
    loop {
        match session.next().unwrap() {
            Navigation::Moved(_) => {
                numbers.push(session.current_question_number());
                let view = session.view().unwrap();
                if view.kind == PartKind::Unsupported {
                    assert!(view.content_unavailable());
                    continue;
                }
                for index in 0..view.questions.len() {
                    session.answer(index, "A").unwrap();
                }
            }
            Navigation::Finished(completion) => {
                assert!(matches!(completion, Completion::Submitted { .. }));
                break;
            }
            Navigation::Stayed => panic!("walk should never stall"),
        }
    }

    assert_eq!(numbers, vec![1, 2, 3, 4, 5, 6, 8, 8, 10]);

    let payloads = sink.lock().unwrap();
    assert_eq!(payloads.len(), 1);
    let payload = &payloads[0];
    assert_eq!(payload.answers.len(), 12);
    assert_eq!(payload.trigger, CompletionTrigger::Manual);

    let json = serde_json::to_value(payload).unwrap();
    assert_eq!(json["testId"], 501);
    assert_eq!(json["answers"]["0:1:-:1"], "B");
    assert_eq!(json["answers"]["1:2:1:0"], "A");
    assert_eq!(json["answers"]["4:5:1:2"], "A");
}

#[test]
fn back_crosses_into_previous_part_at_its_end() {
    let mut session = SessionService::start_with(
        &document(),
        SessionSettings::default(),
        fixed_clock(),
        Box::new(|_| {}),
    )
    .unwrap();

    session.jump_to_part(4).unwrap();
    assert_eq!(session.position(), Position::new(4, Some(0)));
    session.back().unwrap();
    assert_eq!(session.position(), Position::new(3, None));
    session.back().unwrap();
    session.back().unwrap();
    assert_eq!(session.position(), Position::new(1, Some(1)));

    let before = session.position();
    session.next().unwrap();
    session.back().unwrap();
    assert_eq!(session.position(), before);
}

#[test]
fn manual_time_spent_uses_wall_clock() {
    let (sink, on_complete) = recording();
    let mut session = SessionService::start_with(
        &document(),
        SessionSettings::default(),
        fixed_clock(),
        on_complete,
    )
    .unwrap();
    for _ in 0..10 {
        session.tick();
    }
    session.advance_clock(Duration::seconds(12));

    let completion = session.finish().unwrap();
    assert_eq!(
        completion,
        Completion::Submitted {
            trigger: CompletionTrigger::Manual,
            time_spent_secs: 12,
        }
    );
    assert_eq!(sink.lock().unwrap()[0].time_spent_seconds, 12);
}

#[tokio::test(start_paused = true)]
async fn timer_expiry_submits_exactly_once() {
    let (tx, rx) = oneshot::channel();
    let handle = SessionHandle::start(
        &document(),
        SessionSettings::default(),
        fixed_clock(),
        Box::new(move |payload| {
            let _ = tx.send(payload);
        }),
    )
    .unwrap();
    handle.spawn_timer();

    let payload = rx.await.unwrap();
    assert_eq!(payload.time_spent_seconds, 60);
    assert_eq!(payload.trigger, CompletionTrigger::Timeout);
    assert!(handle.is_complete());
    assert_eq!(handle.with(|s| s.tick()), Tick::Stopped);
    assert_eq!(handle.with(|s| s.remaining_secs()), 0);
}

#[tokio::test(start_paused = true)]
async fn timer_catches_up_after_a_stall() {
    let handle = SessionHandle::start(
        &document(),
        SessionSettings::default(),
        fixed_clock(),
        Box::new(|_| {}),
    )
    .unwrap();
    handle.spawn_timer();

    tokio::time::advance(std::time::Duration::from_secs(10)).await;
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;

    assert_eq!(handle.with(|s| s.remaining_secs()), 50);
}

/// A handle whose completion callback tears the same handle down.
fn self_closing_handle() -> (SessionHandle, Sink) {
    let sink: Sink = Arc::new(Mutex::new(Vec::new()));
    let slot: Arc<OnceLock<SessionHandle>> = Arc::new(OnceLock::new());
    let out = Arc::clone(&sink);
    let inner = Arc::clone(&slot);
    let handle = SessionHandle::start(
        &document(),
        SessionSettings::default(),
        fixed_clock(),
        Box::new(move |payload| {
            if let Some(handle) = inner.get() {
                assert!(handle.is_complete());
                handle.teardown();
            }
            out.lock().unwrap().push(payload);
        }),
    )
    .unwrap();
    assert!(slot.set(handle.clone()).is_ok());
    (handle, sink)
}

#[test]
fn completion_callback_can_reenter_the_handle() {
    let (handle, sink) = self_closing_handle();

    let completion = handle.with(|s| s.finish()).unwrap();
    assert!(matches!(completion, Completion::Submitted { .. }));
    assert_eq!(sink.lock().unwrap().len(), 1);
    assert!(!handle.with(|s| s.is_active()));
}

#[tokio::test(start_paused = true)]
async fn timer_completion_callback_can_reenter_the_handle() {
    let (handle, sink) = self_closing_handle();
    handle.spawn_timer();

    tokio::time::sleep(std::time::Duration::from_secs(61)).await;

    let payloads = sink.lock().unwrap();
    assert_eq!(payloads.len(), 1);
    assert_eq!(payloads[0].trigger, CompletionTrigger::Timeout);
    assert!(!handle.with(|s| s.is_active()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_triggers_submit_once() {
    for _ in 0..50 {
        let (sink, on_complete) = recording();
        let handle = SessionHandle::start(
            &document(),
            SessionSettings::default(),
            fixed_clock(),
            on_complete,
        )
        .unwrap();

        let timeout = {
            let handle = handle.clone();
            tokio::spawn(async move { handle.with(|s| s.complete(CompletionTrigger::Timeout)) })
        };
        let manual = {
            let handle = handle.clone();
            tokio::spawn(async move { handle.with(|s| s.complete(CompletionTrigger::Manual)) })
        };
        let outcomes = [
            timeout.await.unwrap().unwrap(),
            manual.await.unwrap().unwrap(),
        ];

        let winners: Vec<_> = outcomes
            .iter()
            .filter_map(|o| match o {
                Completion::Submitted { trigger, .. } => Some(*trigger),
                Completion::AlreadyCompleted => None,
            })
            .collect();
        assert_eq!(winners.len(), 1);

        let payloads = sink.lock().unwrap();
        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0].trigger, winners[0]);
        let expected = match winners[0] {
            CompletionTrigger::Timeout => 60,
            CompletionTrigger::Manual => 0,
        };
        assert_eq!(payloads[0].time_spent_seconds, expected);
    }
}

#[tokio::test(start_paused = true)]
async fn teardown_stops_a_pending_timer() {
    let (sink, on_complete) = recording();
    let handle = SessionHandle::start(
        &document(),
        SessionSettings::default(),
        fixed_clock(),
        on_complete,
    )
    .unwrap();
    handle.spawn_timer();
    tokio::time::sleep(std::time::Duration::from_secs(5)).await;
    handle.teardown();
    tokio::time::sleep(std::time::Duration::from_secs(120)).await;

    assert!(sink.lock().unwrap().is_empty());
    assert!(!handle.is_complete());
    assert!(handle.with(|s| s.remaining_secs()) >= 54);
}

#[tokio::test]
async fn audio_loads_for_the_current_unit() {
    let handle = SessionHandle::start(
        &document(),
        SessionSettings::default(),
        fixed_clock(),
        Box::new(|_| {}),
    )
    .unwrap();
    let resolver = BaseUrlResolver::new(Url::parse("https://cdn.test/audio/").unwrap());

    // Discrete questions carry no audio.
    assert!(handle.load_current_audio(&resolver).await.is_none());

    handle.with(|s| s.jump_to_part(1)).unwrap();
    let cmd = handle.load_current_audio(&resolver).await.unwrap();
    let AudioCommand::Load { generation, url } = cmd else {
        panic!("expected load");
    };
    assert_eq!(url.as_str(), "https://cdn.test/audio/p2/c1.mp3");

    handle.with(|s| s.media_event(generation, AudioEvent::Loaded { duration_secs: 40.0 }));
    let play = handle.with(|s| s.play()).unwrap();
    assert_eq!(play, Some(AudioCommand::Play { generation }));
    assert!(!handle.with(|s| s.audio().is_playing()));
    handle.with(|s| s.media_event(generation, AudioEvent::Played));
    assert!(handle.with(|s| s.audio().is_playing()));
}

struct FailingResolver;

#[async_trait]
impl AudioResolver for FailingResolver {
    async fn resolve(&self, audio_ref: &AudioRef) -> Result<Url, AudioError> {
        Err(AudioError::Unresolved(audio_ref.to_string()))
    }
}

#[tokio::test]
async fn unavailable_audio_does_not_block_the_learner() {
    let handle = SessionHandle::start(
        &document(),
        SessionSettings::default(),
        fixed_clock(),
        Box::new(|_| {}),
    )
    .unwrap();
    handle.with(|s| s.jump_to_part(2)).unwrap();
    assert!(handle.load_current_audio(&FailingResolver).await.is_none());

    handle.with(|s| {
        let view = s.view().unwrap();
        assert!(matches!(view.audio.status, AudioStatus::Unavailable(_)));
        assert!(!view.audio.controls_enabled);
        assert_eq!(s.play().unwrap(), None);

        s.answer(0, "A").unwrap();
        s.answer(1, "mix,bake,serve").unwrap();
        assert!(matches!(s.next().unwrap(), Navigation::Moved(_)));
    });
}

/// Holds every resolution until released.
struct GatedResolver {
    gate: Notify,
}

#[async_trait]
impl AudioResolver for GatedResolver {
    async fn resolve(&self, audio_ref: &AudioRef) -> Result<Url, AudioError> {
        self.gate.notified().await;
        Url::parse("https://cdn.test/")
            .and_then(|base| base.join(audio_ref.as_str()))
            .map_err(|_| AudioError::InvalidUrl(audio_ref.to_string()))
    }
}

#[tokio::test]
async fn completion_during_audio_load_discards_the_result() {
    let (sink, on_complete) = recording();
    let handle = SessionHandle::start(
        &document(),
        SessionSettings::default(),
        fixed_clock(),
        on_complete,
    )
    .unwrap();
    handle.with(|s| s.jump_to_part(1)).unwrap();

    let resolver = Arc::new(GatedResolver {
        gate: Notify::new(),
    });
    let loading = {
        let handle = handle.clone();
        let resolver = Arc::clone(&resolver);
        tokio::spawn(async move { handle.load_current_audio(resolver.as_ref()).await })
    };
    tokio::task::yield_now().await;

    handle.with(|s| s.finish()).unwrap();
    resolver.gate.notify_one();

    assert!(loading.await.unwrap().is_none());
    assert!(handle.with(|s| s.audio().source().is_none()));
    assert_eq!(sink.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn navigation_during_audio_load_discards_the_result() {
    let handle = SessionHandle::start(
        &document(),
        SessionSettings::default(),
        fixed_clock(),
        Box::new(|_| {}),
    )
    .unwrap();
    handle.with(|s| s.jump_to_part(1)).unwrap();

    let resolver = Arc::new(GatedResolver {
        gate: Notify::new(),
    });
    let loading = {
        let handle = handle.clone();
        let resolver = Arc::clone(&resolver);
        tokio::spawn(async move { handle.load_current_audio(resolver.as_ref()).await })
    };
    tokio::task::yield_now().await;

    handle.with(|s| s.next()).unwrap();
    resolver.gate.notify_one();

    assert!(loading.await.unwrap().is_none());
    handle.with(|s| {
        assert_eq!(s.audio().status(), &AudioStatus::Loading);
        assert_eq!(s.audio().audio_ref().map(AudioRef::as_str), Some("p2/c2.mp3"));
    });
}
