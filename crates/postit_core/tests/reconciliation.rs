mod common;

use common::{next_notice, note_ids, wait_for_state, ChannelStore, ScriptedStore};
use postit_core::store::{CollectionEvent, NoteCollection, RemoteStore, Snapshot, StoreError};
use postit_core::sync::ListenerError;
use postit_core::{
    ChannelNotifier, ListenerState, ManualClock, NoticeKind, ReconciliationListener, StateStore,
};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;

fn snapshot(children: Vec<(&str, Value)>) -> Snapshot {
    children
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect::<BTreeMap<_, _>>()
        .into()
}

#[tokio::test]
async fn snapshots_replace_the_list_sorted_newest_first() {
    let store = Arc::new(ChannelStore::default());
    let notes = NoteCollection::new(Arc::clone(&store));
    let state = Arc::new(StateStore::new());
    let (notifier, _notices) = ChannelNotifier::channel();

    let mut listener = ReconciliationListener::new();
    listener
        .attach(&notes, Arc::clone(&state), Arc::new(notifier))
        .unwrap();
    assert_eq!(listener.state(), ListenerState::Subscribed);

    let mut rx = state.watch();
    store.emit(CollectionEvent::Snapshot(snapshot(vec![
        ("a", json!({ "id": "a", "content": "first", "createdAt": 100 })),
        ("b", json!({ "id": "b", "content": "second", "createdAt": 200 })),
        ("c", json!({ "id": "c", "createdAt": 300 })),
    ])));
    let seen = wait_for_state(&mut rx, |s| s.notes.len() == 2).await;
    assert_eq!(note_ids(&seen), vec!["b", "a"]);

    store.emit(CollectionEvent::Snapshot(snapshot(vec![(
        "a",
        json!({ "id": "a", "content": "first", "createdAt": 100 }),
    )])));
    let seen = wait_for_state(&mut rx, |s| s.notes.len() == 1).await;
    assert_eq!(note_ids(&seen), vec!["a"]);
}

#[tokio::test]
async fn cancellation_notifies_once_and_keeps_the_list() {
    let store = Arc::new(ChannelStore::default());
    let notes = NoteCollection::new(Arc::clone(&store));
    let state = Arc::new(StateStore::new());
    let (notifier, mut notices) = ChannelNotifier::channel();

    let mut listener = ReconciliationListener::new();
    listener
        .attach(&notes, Arc::clone(&state), Arc::new(notifier))
        .unwrap();

    let mut rx = state.watch();
    store.emit(CollectionEvent::Snapshot(snapshot(vec![(
        "a",
        json!({ "id": "a", "content": "kept", "createdAt": 1 }),
    )])));
    wait_for_state(&mut rx, |s| s.notes.len() == 1).await;

    store.emit(CollectionEvent::Cancelled(StoreError::PermissionDenied(
        "Post-it".to_string(),
    )));
    let notice = next_notice(&mut notices).await;
    assert_eq!(notice.kind, NoticeKind::ListenerFailed);
    assert_eq!(
        notice.message(),
        "An error occurred: permission denied: Post-it"
    );

    // Later snapshots are ignored once the listener is cancelled.
    store.emit(CollectionEvent::Snapshot(Snapshot::default()));
    tokio::task::yield_now().await;
    assert_eq!(state.snapshot().notes.len(), 1);
    assert!(notices.try_recv().is_err());
}

#[tokio::test]
async fn second_attach_is_rejected() {
    let store = Arc::new(ChannelStore::default());
    let notes = NoteCollection::new(store);
    let state = Arc::new(StateStore::new());
    let (notifier, _notices) = ChannelNotifier::channel();
    let notifier = Arc::new(notifier);

    let mut listener = ReconciliationListener::new();
    listener
        .attach(&notes, Arc::clone(&state), notifier.clone())
        .unwrap();
    let err = listener.attach(&notes, state, notifier).unwrap_err();
    assert_eq!(err, ListenerError::AlreadySubscribed);
}

#[tokio::test]
async fn subscribe_failure_is_notified_and_stays_unsubscribed() {
    let store = ScriptedStore::new(Arc::new(ManualClock::new(0)));
    store.fail_subscribe.store(true, Ordering::SeqCst);
    let notes = NoteCollection::new(store);
    let (notifier, mut notices) = ChannelNotifier::channel();

    let mut listener = ReconciliationListener::new();
    let err = listener
        .attach(&notes, Arc::new(StateStore::new()), Arc::new(notifier))
        .unwrap_err();
    assert_eq!(err, ListenerError::Subscribe(StoreError::Disconnected));
    assert_eq!(listener.state(), ListenerState::Unsubscribed);
    assert_eq!(next_notice(&mut notices).await.kind, NoticeKind::ListenerFailed);
}

#[tokio::test]
async fn writes_through_the_collection_reach_the_list() {
    let store = ScriptedStore::new(Arc::new(ManualClock::new(1_000)));
    let notes = NoteCollection::new(Arc::clone(&store));
    let state = Arc::new(StateStore::new());
    let (notifier, _notices) = ChannelNotifier::channel();

    let mut listener = ReconciliationListener::new();
    listener
        .attach(&notes, Arc::clone(&state), Arc::new(notifier))
        .unwrap();

    let id = notes.generate_id().unwrap();
    notes
        .write(&postit_core::Note::new(id.clone(), "hello", 1_000))
        .await
        .unwrap();

    let mut rx = state.watch();
    let seen = wait_for_state(&mut rx, |s| s.notes.len() == 1).await;
    assert_eq!(seen.notes[0].id, id);
    assert_eq!(seen.notes[0].content, "hello");
    assert!(store.push_key().is_some());
}

#[tokio::test]
async fn shutdown_unsubscribes_and_allows_reattach() {
    let store = Arc::new(ChannelStore::default());
    let notes = NoteCollection::new(Arc::clone(&store));
    let state = Arc::new(StateStore::new());
    let (notifier, _notices) = ChannelNotifier::channel();
    let notifier = Arc::new(notifier);

    let mut listener = ReconciliationListener::new();
    listener
        .attach(&notes, Arc::clone(&state), notifier.clone())
        .unwrap();
    listener.shutdown();
    tokio::task::yield_now().await;
    assert_eq!(listener.state(), ListenerState::Unsubscribed);
    assert!(listener.is_finished());

    listener
        .attach(&notes, Arc::clone(&state), notifier)
        .unwrap();
    assert_eq!(listener.state(), ListenerState::Subscribed);

    let mut rx = state.watch();
    store.emit(CollectionEvent::Snapshot(snapshot(vec![(
        "a",
        json!({ "id": "a", "content": "back", "createdAt": 1 }),
    )])));
    let seen = wait_for_state(&mut rx, |s| s.notes.len() == 1).await;
    assert_eq!(note_ids(&seen), vec!["a"]);
}
