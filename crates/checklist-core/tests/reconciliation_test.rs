//! End-to-end tests: events in, persisted document and broadcasts out.

use std::sync::Mutex;

use async_trait::async_trait;
use checklist_core::{
    broadcast, destinations_for, Authority, ChecklistBook, Command, ControlAction,
    DeliveryError, Destination, DispatchConfig, Dispatcher, InboundEvent, Outbound, Outcome,
    Payload, Rejection, ScopeKind, View,
};
use checklist_models::{PrincipalId, ScopeId};
use checklist_persistence::DocumentStore;
use tempfile::tempdir;

fn group() -> ScopeId {
    ScopeId::from(-1001_i64)
}

fn in_group(principal: u64, payload: Payload) -> InboundEvent {
    InboundEvent::new(group(), PrincipalId(principal), ScopeKind::Group, payload)
        .with_display_name(format!("user{}", principal))
}

fn items(book: &ChecklistBook) -> Vec<(String, bool)> {
    book.peek(&group())
        .map(|s| s.items.iter().map(|i| (i.text.clone(), i.done)).collect())
        .unwrap_or_default()
}

#[test]
fn test_scenario_survives_restart() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("checklist.json");
    let dispatcher = Dispatcher::default();
    let member = Authority::member();

    {
        let mut book = ChecklistBook::open(DocumentStore::new(&path));
        let add = |text: &str| in_group(1, Payload::Command(Command::Add(text.to_string())));

        dispatcher.apply(&mut book, add("Buy milk"), member);
        dispatcher.apply(&mut book, add("Walk dog"), member);
        dispatcher.apply(&mut book, in_group(1, Payload::SelectItem { index1: 1 }), member);
        dispatcher.apply(
            &mut book,
            in_group(1, Payload::Command(Command::Remove("2".into()))),
            member,
        );
        dispatcher.apply(
            &mut book,
            in_group(1, Payload::Control(ControlAction::ToggleView)),
            member,
        );
        // Ephemeral, must not survive
        dispatcher.apply(&mut book, in_group(1, Payload::Control(ControlAction::Add)), member);
    }

    let mut book = ChecklistBook::open(DocumentStore::new(&path));
    assert_eq!(items(&book), vec![("Buy milk".to_string(), true)]);
    assert_eq!(
        book.scope(&group()).view_mode,
        checklist_models::ViewMode::Compact
    );

    let out = dispatcher.apply(
        &mut book,
        in_group(
            1,
            Payload::Text {
                text: "not an item".into(),
                reply_to_bot: false,
            },
        ),
        member,
    );
    assert_eq!(out, Outcome::Ignored);
}

#[test]
fn test_denied_edit_is_not_persisted() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("checklist.json");
    let dispatcher = Dispatcher::new(DispatchConfig::new().with_enforce_allowlist(true));

    let mut book = ChecklistBook::open(DocumentStore::new(&path));
    book.add_item(&group(), "Buy milk").unwrap();
    let before = std::fs::read(&path).unwrap();

    let out = dispatcher.apply(
        &mut book,
        in_group(9, Payload::Command(Command::Remove("1".into()))),
        Authority::member(),
    );

    assert_eq!(out, Outcome::Rejected(Rejection::Denied));
    assert_eq!(std::fs::read(&path).unwrap(), before);
}

#[test]
fn test_back_to_back_removes_shift_numbering() {
    let dispatcher = Dispatcher::default();
    let mut book = ChecklistBook::in_memory();
    for text in ["A", "B", "C"] {
        book.add_item(&group(), text).unwrap();
    }
    let remove_two = || in_group(1, Payload::Command(Command::Remove("2".into())));

    let first = dispatcher.apply(&mut book, remove_two(), Authority::member());
    let second = dispatcher.apply(&mut book, remove_two(), Authority::member());
    let third = dispatcher.apply(&mut book, remove_two(), Authority::member());

    assert_eq!(first, Outcome::Removed { index1: 2, text: "B".into() });
    assert_eq!(second, Outcome::Removed { index1: 2, text: "C".into() });
    assert_eq!(third, Outcome::Rejected(Rejection::NotFound { index1: 2 }));
    assert_eq!(items(&book), vec![("A".to_string(), false)]);
}

struct FlakyOutbound {
    unreachable: ScopeId,
    sent: Mutex<Vec<(ScopeId, String)>>,
}

#[async_trait]
impl Outbound for FlakyOutbound {
    async fn deliver(&self, destination: &Destination, view: &View) -> Result<(), DeliveryError> {
        if destination.chat == self.unreachable {
            return Err(DeliveryError::Unreachable("Forbidden: bot can't initiate conversation".into()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((destination.chat.clone(), view.text.clone()));
        Ok(())
    }
}

#[tokio::test]
async fn test_unreachable_companion_still_updates_group() {
    let dispatcher = Dispatcher::default();
    let mut book = ChecklistBook::in_memory();

    dispatcher.apply(&mut book, in_group(42, Payload::Command(Command::Duty)), Authority::member());
    let outcome = dispatcher.apply(
        &mut book,
        in_group(42, Payload::Command(Command::Add("Buy milk".into()))),
        Authority::member(),
    );
    assert!(outcome.mutated_items());

    let state = book.scope(&group()).clone();
    let destinations = destinations_for(&group(), &state, ScopeKind::Group, None);
    assert_eq!(destinations.len(), 2);

    let outbound = FlakyOutbound {
        unreachable: ScopeId::from(42_i64),
        sent: Mutex::new(Vec::new()),
    };
    let view = View::list(&group(), "Checklist", &state);
    let report = broadcast(&outbound, &destinations, &view).await;

    let sent = outbound.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, group());
    assert!(sent[0].1.contains("Buy milk"));
    assert_eq!(report.companion_failures().count(), 1);
}
