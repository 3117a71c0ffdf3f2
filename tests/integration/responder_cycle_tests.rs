//! Integration tests for the find → reply → mark cycle against an
//! in-memory mailbox.
//!
//! Covers exactly-once replies, exclusion after marking, self/chat
//! exclusion, per-candidate failure containment, and the ledger closing the
//! reply-sent-but-marker-failed window. Messages sharing a thread are
//! answered once per thread.

use std::sync::Arc;

use vacation_responder::gmail::{MailStore, INBOX_LABEL};
use vacation_responder::models::report::CandidateOutcome;
use vacation_responder::persistence::sent_reply_repo::SentReplyRepo;
use vacation_responder::responder::Responder;

use super::test_helpers::{
    test_config, test_ledger, test_ledger_with_db, FakeMailStore, FakeMessage,
};

async fn start(store: &Arc<FakeMailStore>) -> Responder {
    start_with_ledger(store, test_ledger().await).await
}

async fn start_with_ledger(store: &Arc<FakeMailStore>, ledger: SentReplyRepo) -> Responder {
    let dyn_store: Arc<dyn MailStore> = Arc::clone(store) as Arc<dyn MailStore>;
    Responder::start(dyn_store, ledger, Arc::new(test_config()))
        .await
        .expect("responder starts")
}

fn in_thread(id: &str, from: &str, subject: &str, thread_id: &str) -> FakeMessage {
    FakeMessage {
        thread_id: thread_id.to_owned(),
        ..FakeMessage::inbound(id, from, subject)
    }
}

// ── Exactly-once reply under normal operation ────────────────

#[tokio::test]
async fn single_candidate_gets_one_reply_and_marker() {
    let store = FakeMailStore::new();
    store.add_message(FakeMessage::inbound("m1", "Alice <alice@example.com>", "Lunch?"));
    let responder = start(&store).await;

    let report = responder.run_cycle(1).await;

    assert_eq!(report.replied(), 1);
    assert_eq!(report.failed(), 0);
    let sent = store.sent();
    assert_eq!(sent.len(), 1, "exactly one outbound reply");
    assert_eq!(sent[0].header("To").as_deref(), Some("alice@example.com"));
    assert_eq!(sent[0].header("Subject").as_deref(), Some("Re: Lunch?"));
    assert_eq!(
        sent[0].header("In-Reply-To").as_deref(),
        Some("<m1@mail.example.com>")
    );
    assert_eq!(sent[0].thread_id.as_deref(), Some("t-m1"));

    let message = store.message("m1").expect("m1 exists");
    assert!(message.labels.contains(&responder.label_id().to_owned()));
    assert!(!message.labels.iter().any(|l| l == INBOX_LABEL));
}

// ── Exclusion after marking ──────────────────────────────────

#[tokio::test]
async fn marked_message_is_not_found_next_cycle() {
    let store = FakeMailStore::new();
    store.add_message(FakeMessage::inbound("m1", "Alice <alice@example.com>", "Hello"));
    let responder = start(&store).await;

    let first = responder.run_cycle(1).await;
    let second = responder.run_cycle(2).await;

    assert_eq!(first.results.len(), 1);
    assert!(second.results.is_empty(), "marked message must be excluded");
    assert_eq!(store.sent().len(), 1);
}

#[tokio::test]
async fn new_mail_after_first_cycle_is_answered_once() {
    let store = FakeMailStore::new();
    store.add_message(FakeMessage::inbound("m1", "Alice <alice@example.com>", "One"));
    let responder = start(&store).await;
    responder.run_cycle(1).await;

    store.add_message(FakeMessage::inbound("m2", "Bob <bob@example.com>", "Two"));
    let report = responder.run_cycle(2).await;

    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].message_id, "m2");
    assert_eq!(store.sent().len(), 2);
}

// ── Self-message and chat exclusion ──────────────────────────

#[tokio::test]
async fn own_messages_are_never_candidates() {
    let store = FakeMailStore::new();
    store.add_message(FakeMessage::outbound("mine", "Note to self"));
    let responder = start(&store).await;

    let report = responder.run_cycle(1).await;

    assert!(report.results.is_empty());
    assert!(store.sent().is_empty());
}

#[tokio::test]
async fn own_unlabeled_inbox_message_is_still_excluded() {
    let store = FakeMailStore::new();
    let mut mine = FakeMessage::outbound("mine", "Sent to myself");
    mine.labels = vec![INBOX_LABEL.to_owned()];
    store.add_message(mine);
    let responder = start(&store).await;

    let report = responder.run_cycle(1).await;

    assert!(report.results.is_empty());
}

#[tokio::test]
async fn chats_are_never_candidates() {
    let store = FakeMailStore::new();
    store.add_message(FakeMessage::chat("c1"));
    let responder = start(&store).await;

    let report = responder.run_cycle(1).await;

    assert!(report.results.is_empty());
    assert!(store.sent().is_empty());
}

#[tokio::test]
async fn messages_with_any_user_label_are_skipped() {
    let store = FakeMailStore::new();
    store.add_user_label("Label_99", "Receipts");
    let mut labeled = FakeMessage::inbound("m1", "Shop <shop@example.com>", "Order");
    labeled.labels.push("Label_99".to_owned());
    store.add_message(labeled);
    let responder = start(&store).await;

    let report = responder.run_cycle(1).await;

    assert!(report.results.is_empty());
}

// ── Malformed sender header ──────────────────────────────────

#[tokio::test]
async fn malformed_from_fails_only_that_candidate() {
    let store = FakeMailStore::new();
    store.add_message(FakeMessage::inbound("bad", "bare@example.com", "No brackets"));
    store.add_message(FakeMessage::inbound("good", "Bob <bob@example.com>", "Fine"));
    let responder = start(&store).await;

    let report = responder.run_cycle(1).await;

    assert_eq!(report.results.len(), 2);
    let bad = report
        .results
        .iter()
        .find(|r| r.message_id == "bad")
        .expect("bad result");
    assert!(
        matches!(&bad.outcome, CandidateOutcome::Failed(reason) if reason.starts_with("malformed header")),
        "got {:?}",
        bad.outcome
    );
    let good = report
        .results
        .iter()
        .find(|r| r.message_id == "good")
        .expect("good result");
    assert_eq!(good.outcome, CandidateOutcome::Replied);
    assert_eq!(store.sent().len(), 1);

    // The malformed message stays eligible and in the inbox.
    let bad_msg = store.message("bad").expect("bad exists");
    assert!(bad_msg.labels.iter().any(|l| l == INBOX_LABEL));
}

#[tokio::test]
async fn missing_from_header_fails_candidate() {
    let store = FakeMailStore::new();
    let mut headless = FakeMessage::inbound("m1", "", "Hi");
    headless.from = None;
    store.add_message(headless);
    let responder = start(&store).await;

    let report = responder.run_cycle(1).await;

    assert_eq!(report.failed(), 1);
    assert!(store.sent().is_empty());
}

#[tokio::test]
async fn send_failure_does_not_stop_other_candidates() {
    let store = FakeMailStore::new();
    store.fail_send_to("down@example.com");
    store.add_message(FakeMessage::inbound("m1", "Down <down@example.com>", "A"));
    store.add_message(FakeMessage::inbound("m2", "Up <up@example.com>", "B"));
    let responder = start(&store).await;

    let report = responder.run_cycle(1).await;

    assert_eq!(report.failed(), 1);
    assert_eq!(report.replied(), 1);
    // Failed send means no marker either.
    let m1 = store.message("m1").expect("m1");
    assert!(!m1.labels.contains(&responder.label_id().to_owned()));
}

// ── Partial failure: reply sent, marker failed ───────────────

#[tokio::test]
async fn marker_failure_does_not_cause_duplicate_reply() {
    let store = FakeMailStore::new();
    store.add_message(FakeMessage::inbound("m1", "Alice <alice@example.com>", "Hello"));
    store.fail_modify("m1", 1);
    let responder = start(&store).await;

    let first = responder.run_cycle(1).await;
    assert_eq!(first.failed(), 1);
    assert_eq!(first.unmarked_replies, 1);
    assert_eq!(store.sent().len(), 1, "reply went out before the marker failed");

    let second = responder.run_cycle(2).await;
    assert_eq!(second.results.len(), 1, "unmarked message is found again");
    assert_eq!(second.results[0].outcome, CandidateOutcome::MarkerRetried);
    assert_eq!(second.unmarked_replies, 0);
    assert_eq!(store.sent().len(), 1, "no second reply");

    let third = responder.run_cycle(3).await;
    assert!(third.results.is_empty());
}

#[tokio::test]
async fn lost_ledger_write_with_failed_marker_is_reported() {
    let store = FakeMailStore::new();
    store.add_message(FakeMessage::inbound("m1", "Alice <alice@example.com>", "Hello"));
    store.fail_modify("m1", 1);
    let (ledger, database) = test_ledger_with_db().await;
    sqlx::query(
        "CREATE TRIGGER reject_sent_reply BEFORE INSERT ON sent_reply \
         BEGIN SELECT RAISE(ABORT, 'disk full'); END;",
    )
    .execute(database.as_ref())
    .await
    .expect("install trigger");
    let responder = start_with_ledger(&store, ledger).await;

    let report = responder.run_cycle(1).await;

    assert_eq!(store.sent().len(), 1);
    assert_eq!(report.unmarked_replies, 0, "nothing reached the ledger");
    assert!(
        matches!(&report.results[0].outcome, CandidateOutcome::Failed(reason) if reason.contains("reply sent but not recorded")),
        "got {:?}",
        report.results[0].outcome
    );
}

#[tokio::test]
async fn lost_ledger_write_with_good_marker_still_replies() {
    let store = FakeMailStore::new();
    store.add_message(FakeMessage::inbound("m1", "Alice <alice@example.com>", "Hello"));
    let (ledger, database) = test_ledger_with_db().await;
    sqlx::query(
        "CREATE TRIGGER reject_sent_reply BEFORE INSERT ON sent_reply \
         BEGIN SELECT RAISE(ABORT, 'disk full'); END;",
    )
    .execute(database.as_ref())
    .await
    .expect("install trigger");
    let responder = start_with_ledger(&store, ledger).await;

    let report = responder.run_cycle(1).await;
    let next = responder.run_cycle(2).await;

    assert_eq!(report.replied(), 1);
    assert!(next.results.is_empty(), "marker alone keeps the message out");
    assert_eq!(store.sent().len(), 1);
}

// ── One reply per thread ─────────────────────────────────────

#[tokio::test]
async fn messages_sharing_a_thread_get_one_reply() {
    let store = FakeMailStore::new();
    store.add_message(in_thread("m1", "Alice <alice@example.com>", "Plans", "t-shared"));
    store.add_message(in_thread("m2", "Alice <alice@example.com>", "Re: Plans", "t-shared"));
    let responder = start(&store).await;

    let report = responder.run_cycle(1).await;

    assert_eq!(report.results.len(), 1);
    assert_eq!(report.replied(), 1);
    assert_eq!(report.results[0].thread_id, "t-shared");
    let sent = store.sent();
    assert_eq!(sent.len(), 1, "one reply for the whole thread");
    assert_eq!(sent[0].thread_id.as_deref(), Some("t-shared"));

    for id in ["m1", "m2"] {
        let message = store.message(id).expect("message exists");
        assert!(message.labels.contains(&responder.label_id().to_owned()), "{id} marked");
        assert!(!message.labels.iter().any(|l| l == INBOX_LABEL), "{id} archived");
    }

    let next = responder.run_cycle(2).await;
    assert!(next.results.is_empty());
}

#[tokio::test]
async fn partially_marked_thread_is_finished_without_second_reply() {
    let store = FakeMailStore::new();
    store.add_message(in_thread("m1", "Alice <alice@example.com>", "Plans", "t-shared"));
    store.add_message(in_thread("m2", "Alice <alice@example.com>", "Re: Plans", "t-shared"));
    store.fail_modify("m2", 1);
    let responder = start(&store).await;

    let first = responder.run_cycle(1).await;
    assert_eq!(first.failed(), 1);

    let second = responder.run_cycle(2).await;
    assert_eq!(second.results.len(), 1);
    assert_eq!(second.results[0].message_id, "m2");
    assert_eq!(second.results[0].outcome, CandidateOutcome::MarkerRetried);
    assert_eq!(store.sent().len(), 1);
}

#[tokio::test]
async fn later_message_in_answered_thread_is_not_answered_again() {
    let store = FakeMailStore::new();
    store.add_message(in_thread("m1", "Alice <alice@example.com>", "Plans", "t-shared"));
    let responder = start(&store).await;
    responder.run_cycle(1).await;

    store.add_message(in_thread("m2", "Alice <alice@example.com>", "Re: Plans", "t-shared"));
    let report = responder.run_cycle(2).await;

    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].outcome, CandidateOutcome::MarkerRetried);
    assert_eq!(store.sent().len(), 1);
    let m2 = store.message("m2").expect("m2");
    assert!(m2.labels.contains(&responder.label_id().to_owned()));
}

#[tokio::test]
async fn distinct_threads_each_get_a_reply() {
    let store = FakeMailStore::new();
    store.add_message(in_thread("m1", "Alice <alice@example.com>", "A", "t-a"));
    store.add_message(in_thread("m2", "Bob <bob@example.com>", "B", "t-b"));
    let responder = start(&store).await;

    let report = responder.run_cycle(1).await;

    assert_eq!(report.replied(), 2);
    assert_eq!(store.sent().len(), 2);
}

// ── Search failure and pagination ────────────────────────────

#[tokio::test]
async fn search_failure_is_reported_not_raised() {
    let store = FakeMailStore::new();
    store.add_message(FakeMessage::inbound("m1", "Alice <alice@example.com>", "Hi"));
    let responder = start(&store).await;
    store.set_fail_list(true);

    let report = responder.run_cycle(1).await;

    assert!(report.search_error.is_some());
    assert!(report.results.is_empty());

    store.set_fail_list(false);
    let report = responder.run_cycle(2).await;
    assert_eq!(report.replied(), 1);
}

#[tokio::test]
async fn candidates_across_pages_are_all_processed() {
    let store = FakeMailStore::new();
    store.set_page_size(2);
    for i in 0..5 {
        store.add_message(FakeMessage::inbound(
            &format!("m{i}"),
            &format!("User {i} <user{i}@example.com>"),
            "Paged",
        ));
    }
    let responder = start(&store).await;

    let report = responder.run_cycle(1).await;

    assert_eq!(report.replied(), 5);
    assert_eq!(store.sent().len(), 5);
}

// ── Subject prefix idempotence ───────────────────────────────

#[tokio::test]
async fn reply_subject_is_not_double_prefixed() {
    let store = FakeMailStore::new();
    store.add_message(FakeMessage::inbound("m1", "Alice <alice@example.com>", "Re: Plans"));
    let responder = start(&store).await;

    responder.run_cycle(1).await;

    let sent = store.sent();
    assert_eq!(sent[0].header("Subject").as_deref(), Some("Re: Plans"));
}
