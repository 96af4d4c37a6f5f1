//! End-to-end session scenario over the on-disk store: a full
//! edit/suggest/accept cycle followed by a process restart. A fresh model
//! bootstrapped from the same directory must come back with the accepted
//! document and the selected language.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use core_events::{EVENT_CHANNEL_CAP, Event, InputEvent};
use core_model::{EditorModel, SuggestPolicy};
use core_storage::FsStore;
use core_suggest::{SuggestClient, SuggestionRequest};
use core_surface::{EditorSurface, HeadlessSurface};
use core_text::LanguageId;
use tokio::sync::mpsc;

struct EchoCompletionClient;

#[async_trait]
impl SuggestClient for EchoCompletionClient {
    async fn fetch(&self, request: &SuggestionRequest) -> anyhow::Result<String> {
        Ok(if request.source_text.ends_with("functio") {
            "n add(a, b) { return a + b; }".to_string()
        } else {
            String::new()
        })
    }
}

fn open_model(
    dir: &std::path::Path,
    tx: mpsc::Sender<Event>,
) -> EditorModel<HeadlessSurface> {
    let store = FsStore::open(dir.to_path_buf()).expect("store opens");
    let mut model = EditorModel::new(
        HeadlessSurface::new(),
        Box::new(store),
        Arc::new(EchoCompletionClient),
        tx,
        LanguageId::Javascript,
        SuggestPolicy {
            debounce: Duration::from_millis(10),
            min_chars: 5,
        },
    );
    model.bootstrap();
    model
}

async fn pump_one(model: &mut EditorModel<HeadlessSurface>, rx: &mut mpsc::Receiver<Event>) {
    let event = tokio::time::timeout(Duration::from_millis(500), rx.recv())
        .await
        .expect("an event should arrive within the timeout")
        .expect("channel open");
    model.dispatch(event).expect("dispatch succeeds");
}

#[tokio::test]
async fn accepted_suggestion_survives_restart() {
    let dir = tempfile::tempdir().expect("tempdir");

    // First session: switch to typescript, type, accept the suggestion.
    {
        let (tx, mut rx) = mpsc::channel::<Event>(EVENT_CHANNEL_CAP);
        let mut model = open_model(dir.path(), tx);
        model
            .handle_input(InputEvent::SelectLanguage(LanguageId::Typescript))
            .expect("language switch");
        model
            .handle_input(InputEvent::Edit {
                text: "functio".to_string(),
                cursor: core_text::end_position("functio"),
            })
            .expect("edit");

        pump_one(&mut model, &mut rx).await; // debounce elapsed
        pump_one(&mut model, &mut rx).await; // fetch completion
        assert_eq!(
            model.surface().ghost().expect("ghost rendered").text,
            "n add(a, b) { return a + b; }"
        );

        model.handle_input(InputEvent::Accept).expect("accept");
        assert_eq!(
            model.surface().text(),
            "function add(a, b) { return a + b; }"
        );
        assert!(model.surface().ghost().is_none());
    }

    // Second session over the same directory.
    let (tx, _rx) = mpsc::channel::<Event>(EVENT_CHANNEL_CAP);
    let model = open_model(dir.path(), tx);
    assert_eq!(model.language(), LanguageId::Typescript);
    assert_eq!(
        model.surface().text(),
        "function add(a, b) { return a + b; }"
    );
}

#[tokio::test]
async fn unaccepted_ghost_is_not_persisted() {
    let dir = tempfile::tempdir().expect("tempdir");

    {
        let (tx, mut rx) = mpsc::channel::<Event>(EVENT_CHANNEL_CAP);
        let mut model = open_model(dir.path(), tx);
        model
            .handle_input(InputEvent::Edit {
                text: "functio".to_string(),
                cursor: core_text::end_position("functio"),
            })
            .expect("edit");
        pump_one(&mut model, &mut rx).await;
        pump_one(&mut model, &mut rx).await;
        assert!(model.surface().ghost().is_some());
        // No accept: the ghost stays transient.
    }

    let (tx, _rx) = mpsc::channel::<Event>(EVENT_CHANNEL_CAP);
    let model = open_model(dir.path(), tx);
    assert_eq!(model.surface().text(), "functio");
}
