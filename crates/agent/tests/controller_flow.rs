//! Integration tests for the wake-to-dispatch controller
//!
//! Every collaborator is scripted: the source yields canned utterances, the
//! recognizer replays transcripts in order, and the planner replays raw plans.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::{broadcast, watch};

use bruno_agent::{ControllerConfig, ControllerState, Phase, PipelineController, PipelineEvent, PlanSource};
use bruno_core::{
    ActionPlanner, DispatchReceipt, Error, Mode, Part, Plan, PlanDispatcher, SampleRate,
    SpeechToText, Utterance,
};
use bruno_pipeline::{PipelineError, UtteranceSource};

/// Canned utterances in order; blocks forever once exhausted
struct ScriptedSource {
    utterances: Mutex<VecDeque<Result<Utterance, PipelineError>>>,
}

impl ScriptedSource {
    fn speech(count: usize) -> Self {
        let utterances = (0..count)
            .map(|_| Ok(Utterance::new(vec![0.2; 16_000], SampleRate::Hz16000, 33)))
            .collect();
        Self {
            utterances: Mutex::new(utterances),
        }
    }
}

#[async_trait]
impl UtteranceSource for ScriptedSource {
    async fn next_utterance(&self) -> Result<Utterance, PipelineError> {
        let next = self.utterances.lock().pop_front();
        match next {
            Some(result) => result,
            None => std::future::pending().await,
        }
    }
}

enum Reply<T> {
    Ok(T),
    Fail(&'static str),
    Hang,
}

struct ScriptedStt {
    transcripts: Mutex<VecDeque<Reply<&'static str>>>,
}

#[async_trait]
impl SpeechToText for ScriptedStt {
    async fn transcribe(&self, _utterance: &Utterance) -> bruno_core::Result<String> {
        let reply = self.transcripts.lock().pop_front();
        match reply {
            Some(Reply::Ok(text)) => Ok(text.to_string()),
            Some(Reply::Fail(reason)) => Err(Error::Stt(reason.to_string())),
            Some(Reply::Hang) | None => std::future::pending().await,
        }
    }

    fn model_name(&self) -> &str {
        "scripted-stt"
    }
}

struct ScriptedPlanner {
    replies: Mutex<VecDeque<Reply<Value>>>,
    commands: Mutex<Vec<String>>,
}

#[async_trait]
impl ActionPlanner for ScriptedPlanner {
    async fn plan(&self, command: &str) -> bruno_core::Result<Value> {
        self.commands.lock().push(command.to_string());
        let reply = self.replies.lock().pop_front();
        match reply {
            Some(Reply::Ok(value)) => Ok(value),
            Some(Reply::Fail(reason)) => Err(Error::Llm(reason.to_string())),
            Some(Reply::Hang) | None => std::future::pending().await,
        }
    }

    fn model_name(&self) -> &str {
        "scripted-planner"
    }
}

#[derive(Default)]
struct RecordingDispatcher {
    sent: Mutex<Vec<Plan>>,
    fail: bool,
}

#[async_trait]
impl PlanDispatcher for RecordingDispatcher {
    async fn send(&self, plan: &Plan) -> bruno_core::Result<DispatchReceipt> {
        self.sent.lock().push(plan.clone());
        if self.fail {
            return Err(Error::Dispatch("actuator offline".to_string()));
        }
        Ok(DispatchReceipt {
            status: 200,
            body: "ok".to_string(),
        })
    }

    fn target(&self) -> &str {
        "recording"
    }
}

struct Harness {
    controller: PipelineController<ScriptedSource>,
    planner: Arc<ScriptedPlanner>,
    dispatcher: Arc<RecordingDispatcher>,
    events: broadcast::Receiver<PipelineEvent>,
}

fn harness(
    transcripts: Vec<Reply<&'static str>>,
    plans: Vec<Reply<Value>>,
    dispatcher: RecordingDispatcher,
) -> Harness {
    let source = ScriptedSource::speech(transcripts.len());
    let stt = Arc::new(ScriptedStt {
        transcripts: Mutex::new(transcripts.into()),
    });
    let planner = Arc::new(ScriptedPlanner {
        replies: Mutex::new(plans.into()),
        commands: Mutex::new(Vec::new()),
    });
    let dispatcher = Arc::new(dispatcher);

    let controller = PipelineController::new(
        source,
        stt,
        planner.clone(),
        dispatcher.clone(),
        ControllerConfig::default(),
    );
    let events = controller.subscribe();

    Harness {
        controller,
        planner,
        dispatcher,
        events,
    }
}

fn wag_plan() -> Value {
    json!({"intent": "EMOTE_OR_ACTION", "effects": [{"part": "tail", "mode": "wag", "hz": 6, "duration_ms": 2000}]})
}

fn drain(events: &mut broadcast::Receiver<PipelineEvent>) -> Vec<PipelineEvent> {
    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    seen
}

async fn steps(controller: &mut PipelineController<ScriptedSource>, count: usize) -> Vec<Phase> {
    let mut phases = Vec::with_capacity(count);
    for _ in 0..count {
        phases.push(controller.step().await.unwrap());
    }
    phases
}

/// Inline command goes straight from wake to planning
#[tokio::test(start_paused = true)]
async fn test_inline_command_cycle() {
    let mut h = harness(
        vec![Reply::Ok("hey bruno, wag your tail!")],
        vec![Reply::Ok(wag_plan())],
        RecordingDispatcher::default(),
    );

    let phases = steps(&mut h.controller, 4).await;
    assert_eq!(phases, vec![Phase::Plan, Phase::Validate, Phase::Dispatch, Phase::ListenWake]);

    assert_eq!(*h.planner.commands.lock(), vec!["wag your tail".to_string()]);
    let sent = h.dispatcher.sent.lock().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].effects[0].part, Part::Tail);
    assert_eq!(sent[0].effects[0].hz, 6.0);

    let events = drain(&mut h.events);
    assert!(events.iter().any(|e| matches!(e, PipelineEvent::WakeDetected { .. })));
    assert!(events.iter().any(|e| matches!(
        e,
        PipelineEvent::Command { text, inline: true, defaulted: false } if text == "wag your tail"
    )));
    assert!(events.iter().any(|e| matches!(e, PipelineEvent::PlanReady { source: PlanSource::Valid, .. })));
    assert!(events.iter().any(|e| matches!(e, PipelineEvent::Dispatched { status: 200, .. })));
}

/// Bare wake phrase waits for a separate command utterance
#[tokio::test(start_paused = true)]
async fn test_wake_then_command() {
    let mut h = harness(
        vec![Reply::Ok("bruno"), Reply::Ok("sit down please")],
        vec![Reply::Ok(wag_plan())],
        RecordingDispatcher::default(),
    );

    assert_eq!(h.controller.step().await.unwrap(), Phase::ListenCommand);
    assert_eq!(h.controller.step().await.unwrap(), Phase::Plan);
    assert_eq!(
        h.controller.state(),
        &ControllerState::Plan {
            command: "sit down please".to_string()
        }
    );
}

/// Single residual word is not enough for an inline command
#[tokio::test(start_paused = true)]
async fn test_one_word_residual_is_not_inline() {
    let mut h = harness(vec![Reply::Ok("hey bruno sit")], vec![], RecordingDispatcher::default());
    assert_eq!(h.controller.step().await.unwrap(), Phase::ListenCommand);
}

/// Wake phrase repeated in the command is stripped
#[tokio::test(start_paused = true)]
async fn test_command_wake_phrase_stripped() {
    let mut h = harness(
        vec![Reply::Ok("hey bruno"), Reply::Ok("Bruno, spin around.")],
        vec![],
        RecordingDispatcher::default(),
    );

    steps(&mut h.controller, 2).await;
    assert_eq!(
        h.controller.state(),
        &ControllerState::Plan {
            command: "spin around".to_string()
        }
    );
}

/// Nothing heard in the command phase falls back to the default command
#[tokio::test(start_paused = true)]
async fn test_empty_command_uses_default() {
    let mut h = harness(
        vec![Reply::Ok("okay bruno"), Reply::Ok("")],
        vec![],
        RecordingDispatcher::default(),
    );

    steps(&mut h.controller, 2).await;
    assert_eq!(
        h.controller.state(),
        &ControllerState::Plan {
            command: "wag your tail".to_string()
        }
    );
    let events = drain(&mut h.events);
    assert!(events
        .iter()
        .any(|e| matches!(e, PipelineEvent::Command { defaulted: true, .. })));
}

/// Text without a wake phrase, empty text and recognizer failures keep listening
#[tokio::test(start_paused = true)]
async fn test_listen_wake_ignores_noise() {
    let mut h = harness(
        vec![
            Reply::Ok("what a nice day"),
            Reply::Ok(""),
            Reply::Fail("decoder crashed"),
            Reply::Hang,
            Reply::Ok("tommy"),
        ],
        vec![],
        RecordingDispatcher::default(),
    );

    let phases = steps(&mut h.controller, 5).await;
    assert_eq!(
        phases,
        vec![
            Phase::ListenWake,
            Phase::ListenWake,
            Phase::ListenWake,
            Phase::ListenWake,
            Phase::ListenCommand
        ]
    );
    assert!(h.controller.wake_state().last_wake.is_some());
}

/// Planner failure skips validation and dispatches the fallback plan
#[tokio::test(start_paused = true)]
async fn test_planner_failure_dispatches_fallback() {
    let mut h = harness(
        vec![Reply::Ok("hey bruno do a backflip")],
        vec![Reply::Fail("connection refused")],
        RecordingDispatcher::default(),
    );

    let phases = steps(&mut h.controller, 3).await;
    assert_eq!(phases, vec![Phase::Plan, Phase::Dispatch, Phase::ListenWake]);
    assert_eq!(*h.dispatcher.sent.lock(), vec![Plan::fallback()]);

    let events = drain(&mut h.events);
    assert!(!events.iter().any(|e| matches!(e, PipelineEvent::StateChanged { to: Phase::Validate, .. })));
    assert!(events
        .iter()
        .any(|e| matches!(e, PipelineEvent::PlanReady { source: PlanSource::PlannerFailed, .. })));
}

/// Planner that never answers is cut off by the planner timeout
#[tokio::test(start_paused = true)]
async fn test_planner_timeout_dispatches_fallback() {
    let mut h = harness(
        vec![Reply::Ok("hey bruno fetch the ball")],
        vec![Reply::Hang],
        RecordingDispatcher::default(),
    );

    steps(&mut h.controller, 2).await;
    assert_eq!(
        h.controller.state(),
        &ControllerState::Dispatch {
            plan: Plan::fallback(),
            source: PlanSource::PlannerFailed
        }
    );
}

/// Out-of-range planner output is repaired before dispatch
#[tokio::test(start_paused = true)]
async fn test_repaired_plan_is_dispatched() {
    let mut h = harness(
        vec![Reply::Ok("hey bruno go crazy")],
        vec![Reply::Ok(json!({"intent": "X", "effects": [{"part": "nose", "mode": "spin", "hz": 999}]}))],
        RecordingDispatcher::default(),
    );

    steps(&mut h.controller, 4).await;
    let sent = h.dispatcher.sent.lock().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].intent, "X");
    assert_eq!(sent[0].effects[0].part, Part::Tail);
    assert_eq!(sent[0].effects[0].mode, Mode::Wag);
    assert_eq!(sent[0].effects[0].hz, 30.0);

    let events = drain(&mut h.events);
    assert!(events
        .iter()
        .any(|e| matches!(e, PipelineEvent::PlanReady { source: PlanSource::Repaired, .. })));
}

/// Empty effects from the planner end in the fixed fallback plan
#[tokio::test(start_paused = true)]
async fn test_unusable_plan_uses_validator_fallback() {
    let mut h = harness(
        vec![Reply::Ok("hey bruno hmm what")],
        vec![Reply::Ok(json!({"effects": []}))],
        RecordingDispatcher::default(),
    );

    steps(&mut h.controller, 4).await;
    assert_eq!(*h.dispatcher.sent.lock(), vec![Plan::fallback()]);
}

/// Dispatch failure is reported and the controller re-arms anyway
#[tokio::test(start_paused = true)]
async fn test_dispatch_failure_is_not_fatal() {
    let mut h = harness(
        vec![Reply::Ok("hey bruno wag your tail")],
        vec![Reply::Ok(wag_plan())],
        RecordingDispatcher {
            fail: true,
            ..RecordingDispatcher::default()
        },
    );

    let phases = steps(&mut h.controller, 4).await;
    assert_eq!(phases.last(), Some(&Phase::ListenWake));

    let events = drain(&mut h.events);
    assert!(events.iter().any(|e| matches!(
        e,
        PipelineEvent::DispatchFailed { reason } if reason.contains("actuator offline")
    )));
}

/// Second wake inside the debounce window is dropped, later one accepted
#[tokio::test(start_paused = true)]
async fn test_wake_debounce() {
    let mut h = harness(
        vec![
            Reply::Ok("hey bruno wag your tail"),
            Reply::Ok("hey bruno wag your tail"),
            Reply::Ok("hey bruno wag your tail"),
        ],
        vec![Reply::Ok(wag_plan()), Reply::Ok(wag_plan())],
        RecordingDispatcher::default(),
    );

    // Full cycle, including the 400ms re-arm pause
    steps(&mut h.controller, 4).await;
    assert_eq!(h.controller.step().await.unwrap(), Phase::ListenWake);

    let events = drain(&mut h.events);
    assert!(events.iter().any(|e| matches!(
        e,
        PipelineEvent::WakeDebounced { since_last, .. } if *since_last < Duration::from_secs(2)
    )));

    tokio::time::advance(Duration::from_secs(2)).await;
    assert_eq!(h.controller.step().await.unwrap(), Phase::Plan);
}

/// Lost capture is the one error that stops the loop
#[tokio::test]
async fn test_capture_loss_is_fatal() {
    let mut h = harness(vec![], vec![], RecordingDispatcher::default());
    h.controller = PipelineController::new(
        ScriptedSource {
            utterances: Mutex::new(VecDeque::from(vec![Err(PipelineError::ChannelClosed)])),
        },
        Arc::new(ScriptedStt {
            transcripts: Mutex::new(VecDeque::new()),
        }),
        h.planner.clone(),
        h.dispatcher.clone(),
        ControllerConfig::default(),
    );

    assert!(h.controller.step().await.is_err());
}

/// Silence never reaches the recognizer
#[tokio::test]
async fn test_empty_utterance_skips_recognizer() {
    let source = ScriptedSource {
        utterances: Mutex::new(VecDeque::from(vec![Ok(Utterance::empty(SampleRate::Hz16000))])),
    };
    // A recognizer call would hang forever
    let stt = Arc::new(ScriptedStt {
        transcripts: Mutex::new(VecDeque::from(vec![Reply::Hang])),
    });
    let mut controller = PipelineController::new(
        source,
        stt,
        Arc::new(ScriptedPlanner {
            replies: Mutex::new(VecDeque::new()),
            commands: Mutex::new(Vec::new()),
        }),
        Arc::new(RecordingDispatcher::default()),
        ControllerConfig::default(),
    );

    let phase = tokio::time::timeout(Duration::from_secs(1), controller.step())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(phase, Phase::ListenWake);
}

/// Shutdown interrupts a controller blocked in capture
#[tokio::test(start_paused = true)]
async fn test_run_stops_on_shutdown() {
    let h = harness(
        vec![Reply::Ok("hey bruno wag your tail")],
        vec![Reply::Ok(wag_plan())],
        RecordingDispatcher::default(),
    );
    let dispatcher = h.dispatcher.clone();
    let mut controller = h.controller;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let task = tokio::spawn(async move {
        let result = controller.run(shutdown_rx).await;
        (result, controller)
    });

    // One full cycle, then the source has nothing left and blocks
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(dispatcher.sent.lock().len(), 1);

    shutdown_tx.send(true).unwrap();
    let (result, controller) = task.await.unwrap();
    assert!(result.is_ok());
    assert_eq!(controller.state().phase(), Phase::ListenWake);
}
