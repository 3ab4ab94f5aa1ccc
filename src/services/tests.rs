use super::*;
use crate::app::App;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{Duration, Utc};
use kanso_core::config::Config;
use kanso_core::error::KansoError;
use kanso_core::focus::FocusMode;
use kanso_core::friendship::FriendshipStatus;
use kanso_core::notification::NotificationKind;
use kanso_core::task::{
    NewRecurrence, NewTask, RecurrencePattern, RecurrenceUpdate, TaskPriority, TaskStatus,
    TaskUpdate,
};
use kanso_core::timeblock::{NewTimeBlock, TimeBlockUpdate};
use kanso_core::user::User;
use kanso_realtime::local::Delivery;
use kanso_realtime::LocalTransport;
use tokio::sync::mpsc::UnboundedReceiver;

static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Create an app over a temporary on-disk store (unique per call). The
/// transport is returned separately so tests can register receivers.
async fn test_app() -> (App, LocalTransport) {
    let id = TEST_COUNTER.fetch_add(1, Ordering::Relaxed);
    let dir =
        std::env::temp_dir().join(format!("__kanso_svc_test_{}_{}__", std::process::id(), id));
    let _ = std::fs::create_dir_all(&dir);
    let db_path = dir.join("test.db").to_string_lossy().to_string();
    let _ = std::fs::remove_file(&db_path);

    let mut config = Config::default();
    config.store.db_path = db_path;
    config.store.max_connections = 1;

    let transport = LocalTransport::new();
    let app = App::with_transport(config, Arc::new(transport.clone()))
        .await
        .unwrap();
    (app, transport)
}

async fn seed_user(app: &App, name: &str) -> User {
    app.store
        .create_user(name, &format!("{name}@example.com"))
        .await
        .unwrap()
}

/// Bring a user online with one connection and return its receiver.
async fn connect(
    app: &App,
    transport: &LocalTransport,
    user_id: i64,
    connection_id: &str,
) -> UnboundedReceiver<Delivery> {
    let rx = transport.register(connection_id).await;
    app.registry.add_connection(user_id, connection_id).await;
    rx
}

fn new_task(user_id: i64, title: &str) -> NewTask {
    NewTask {
        user_id,
        title: title.to_string(),
        description: None,
        priority: TaskPriority::Medium,
        status: TaskStatus::Todo,
        due_date: None,
        recurrence: None,
    }
}

fn new_block(user_id: i64, title: &str, start_in_hours: i64, end_in_hours: i64) -> NewTimeBlock {
    let now = Utc::now();
    NewTimeBlock {
        user_id,
        title: title.to_string(),
        start_time: now + Duration::hours(start_in_hours),
        end_time: now + Duration::hours(end_in_hours),
        color: Some("#4A6FA5".to_string()),
    }
}

// ---- tasks --------------------------------------------------------------

#[tokio::test]
async fn test_create_forces_todo_status() {
    let (app, _transport) = test_app().await;
    let user = seed_user(&app, "mira").await;

    let mut new = new_task(user.id, "Write report");
    new.status = TaskStatus::Completed;
    let task = app.tasks().create(new).await.unwrap();

    assert_eq!(task.status, TaskStatus::Todo);
    assert!(!task.is_completed);
    assert!(task.completed_at.is_none());
}

#[tokio::test]
async fn test_due_soon_task_sends_reminder() {
    let (app, transport) = test_app().await;
    let user = seed_user(&app, "mira").await;
    let mut rx = connect(&app, &transport, user.id, "conn-1").await;

    let mut new = new_task(user.id, "Water plants");
    new.due_date = Some(Utc::now() + Duration::hours(2));
    app.tasks().create(new).await.unwrap();

    let stored = app.notifications().list(user.id, false, None).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].kind, NotificationKind::TaskReminder);
    assert!(stored[0].message.starts_with("Reminder: 'Water plants' due "));

    // The notification itself lands before the count update.
    let (event, payload) = rx.try_recv().unwrap();
    assert_eq!(event, "NewNotification");
    assert_eq!(payload["kind"], "TASK_REMINDER");
    let (event, payload) = rx.try_recv().unwrap();
    assert_eq!(event, "UnreadCountUpdated");
    assert_eq!(payload["unreadCount"], 1);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_distant_due_date_sends_nothing() {
    let (app, transport) = test_app().await;
    let user = seed_user(&app, "mira").await;
    let mut rx = connect(&app, &transport, user.id, "conn-1").await;

    let mut new = new_task(user.id, "File taxes");
    new.due_date = Some(Utc::now() + Duration::hours(48));
    app.tasks().create(new).await.unwrap();

    assert_eq!(app.notifications().unread_count(user.id).await.unwrap(), 0);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_completing_recurring_task_spawns_successor() {
    let (app, _transport) = test_app().await;
    let user = seed_user(&app, "mira").await;
    let due = Utc::now() + Duration::hours(30);

    let mut new = new_task(user.id, "Weekly review");
    new.due_date = Some(due);
    new.recurrence = Some(NewRecurrence {
        pattern: RecurrencePattern::Daily,
        interval: 1,
        start_date: Utc::now(),
        end_date: None,
    });
    let task = app.tasks().create(new).await.unwrap();

    let update = TaskUpdate {
        status: Some(TaskStatus::Completed),
        ..Default::default()
    };
    let done = app.tasks().update(user.id, task.id, update).await.unwrap();
    assert!(done.is_completed);
    assert!(done.completed_at.is_some());

    let tasks = app.tasks().list(user.id).await.unwrap();
    assert_eq!(tasks.len(), 2);
    let successor = tasks.iter().find(|t| t.id != task.id).unwrap();
    assert_eq!(successor.title, "Weekly review");
    assert!(!successor.is_completed);
    assert_eq!(successor.due_date, Some(due + Duration::days(1)));
    assert!(successor.recurrence.is_some());
}

#[tokio::test]
async fn test_completing_twice_spawns_once() {
    let (app, _transport) = test_app().await;
    let user = seed_user(&app, "mira").await;

    let mut new = new_task(user.id, "Standup notes");
    new.due_date = Some(Utc::now() + Duration::hours(30));
    new.recurrence = Some(NewRecurrence {
        pattern: RecurrencePattern::Daily,
        interval: 1,
        start_date: Utc::now(),
        end_date: None,
    });
    let task = app.tasks().create(new).await.unwrap();

    let complete = TaskUpdate {
        status: Some(TaskStatus::Completed),
        ..Default::default()
    };
    app.tasks()
        .update(user.id, task.id, complete.clone())
        .await
        .unwrap();
    app.tasks().update(user.id, task.id, complete).await.unwrap();

    assert_eq!(app.tasks().list(user.id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_expired_rule_never_blocks_completion() {
    let (app, _transport) = test_app().await;
    let user = seed_user(&app, "mira").await;

    let mut new = new_task(user.id, "Old habit");
    new.due_date = Some(Utc::now() + Duration::hours(30));
    new.recurrence = Some(NewRecurrence {
        pattern: RecurrencePattern::Daily,
        interval: 1,
        start_date: Utc::now() - Duration::days(30),
        end_date: Some(Utc::now() - Duration::days(1)),
    });
    let task = app.tasks().create(new).await.unwrap();

    let update = TaskUpdate {
        status: Some(TaskStatus::Completed),
        ..Default::default()
    };
    let done = app.tasks().update(user.id, task.id, update).await.unwrap();

    assert!(done.is_completed);
    assert_eq!(app.tasks().list(user.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_uncompleting_clears_completion() {
    let (app, _transport) = test_app().await;
    let user = seed_user(&app, "mira").await;
    let task = app.tasks().create(new_task(user.id, "Tidy desk")).await.unwrap();

    app.tasks()
        .update(
            user.id,
            task.id,
            TaskUpdate {
                status: Some(TaskStatus::Completed),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let reopened = app
        .tasks()
        .update(
            user.id,
            task.id,
            TaskUpdate {
                status: Some(TaskStatus::InProgress),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(reopened.status, TaskStatus::InProgress);
    assert!(!reopened.is_completed);
    assert!(reopened.completed_at.is_none());
}

#[tokio::test]
async fn test_update_ignores_empty_title() {
    let (app, _transport) = test_app().await;
    let user = seed_user(&app, "mira").await;
    let task = app.tasks().create(new_task(user.id, "Keep me")).await.unwrap();

    let update = TaskUpdate {
        title: Some("   ".to_string()),
        description: Some("now with notes".to_string()),
        priority: Some(TaskPriority::Urgent),
        ..Default::default()
    };
    let updated = app.tasks().update(user.id, task.id, update).await.unwrap();

    assert_eq!(updated.title, "Keep me");
    assert_eq!(updated.description.as_deref(), Some("now with notes"));
    assert_eq!(updated.priority, TaskPriority::Urgent);
}

#[tokio::test]
async fn test_moving_due_date_reevaluates_reminder() {
    let (app, _transport) = test_app().await;
    let user = seed_user(&app, "mira").await;

    let mut new = new_task(user.id, "Call dentist");
    new.due_date = Some(Utc::now() + Duration::hours(72));
    let task = app.tasks().create(new).await.unwrap();
    assert_eq!(app.notifications().unread_count(user.id).await.unwrap(), 0);

    let update = TaskUpdate {
        due_date: Some(Utc::now() + Duration::hours(3)),
        ..Default::default()
    };
    app.tasks().update(user.id, task.id, update).await.unwrap();

    let stored = app.notifications().list(user.id, true, None).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].kind, NotificationKind::TaskReminder);
}

#[tokio::test]
async fn test_update_can_attach_recurrence() {
    let (app, _transport) = test_app().await;
    let user = seed_user(&app, "mira").await;
    let task = app.tasks().create(new_task(user.id, "Stretch")).await.unwrap();
    assert!(task.recurrence.is_none());

    let update = TaskUpdate {
        recurrence: Some(RecurrenceUpdate {
            pattern: Some(RecurrencePattern::Weekly),
            interval: Some(2),
            ..Default::default()
        }),
        ..Default::default()
    };
    let updated = app.tasks().update(user.id, task.id, update).await.unwrap();

    let rule = updated.recurrence.unwrap();
    assert_eq!(rule.pattern, RecurrencePattern::Weekly);
    assert_eq!(rule.interval, 2);
}

#[tokio::test]
async fn test_update_rejects_bad_interval() {
    let (app, _transport) = test_app().await;
    let user = seed_user(&app, "mira").await;
    let task = app.tasks().create(new_task(user.id, "Stretch")).await.unwrap();

    let update = TaskUpdate {
        recurrence: Some(RecurrenceUpdate {
            pattern: Some(RecurrencePattern::Daily),
            interval: Some(0),
            ..Default::default()
        }),
        ..Default::default()
    };
    let result = app.tasks().update(user.id, task.id, update).await;
    assert!(matches!(result, Err(KansoError::InvalidRange(_))));
}

#[tokio::test]
async fn test_task_access_is_owner_only() {
    let (app, _transport) = test_app().await;
    let mira = seed_user(&app, "mira").await;
    let noor = seed_user(&app, "noor").await;
    let task = app.tasks().create(new_task(mira.id, "Private")).await.unwrap();

    let result = app.tasks().get(noor.id, task.id).await;
    assert!(matches!(result, Err(KansoError::Unauthorized(_))));
    let result = app.tasks().get(mira.id, 9999).await;
    assert!(matches!(result, Err(KansoError::NotFound(_))));
}

#[tokio::test]
async fn test_linking_requires_owning_both_sides() {
    let (app, _transport) = test_app().await;
    let mira = seed_user(&app, "mira").await;
    let noor = seed_user(&app, "noor").await;

    let task = app.tasks().create(new_task(mira.id, "Draft slides")).await.unwrap();
    let theirs = app
        .time_blocks()
        .create(new_block(noor.id, "Gym", 1, 2))
        .await
        .unwrap();
    let mine = app
        .time_blocks()
        .create(new_block(mira.id, "Deep work", 3, 4))
        .await
        .unwrap();

    let result = app
        .tasks()
        .link_time_block(mira.id, task.id, theirs.block.id)
        .await;
    assert!(matches!(result, Err(KansoError::Unauthorized(_))));

    app.tasks()
        .link_time_block(mira.id, task.id, mine.block.id)
        .await
        .unwrap();
    let block = app.time_blocks().get(mira.id, mine.block.id).await.unwrap();
    assert_eq!(block.task_ids, vec![task.id]);

    app.tasks()
        .unlink_time_block(mira.id, task.id, mine.block.id)
        .await
        .unwrap();
    let block = app.time_blocks().get(mira.id, mine.block.id).await.unwrap();
    assert!(block.task_ids.is_empty());
}

// ---- time blocks --------------------------------------------------------

#[tokio::test]
async fn test_overlap_warns_but_saves() {
    let (app, _transport) = test_app().await;
    let user = seed_user(&app, "mira").await;

    let first = app
        .time_blocks()
        .create(new_block(user.id, "Writing", 1, 3))
        .await
        .unwrap();
    assert!(!first.overlaps_existing);

    let second = app
        .time_blocks()
        .create(new_block(user.id, "Meeting", 2, 4))
        .await
        .unwrap();
    assert!(second.overlaps_existing);

    let now = Utc::now();
    let blocks = app
        .time_blocks()
        .list_between(user.id, now, now + Duration::hours(6))
        .await
        .unwrap();
    assert_eq!(blocks.len(), 2);
}

#[tokio::test]
async fn test_update_ignores_own_interval() {
    let (app, _transport) = test_app().await;
    let user = seed_user(&app, "mira").await;
    let saved = app
        .time_blocks()
        .create(new_block(user.id, "Reading", 1, 2))
        .await
        .unwrap();

    // Shrinking inside its own old span must not count as overlap.
    let update = TimeBlockUpdate {
        end_time: Some(saved.block.start_time + Duration::minutes(30)),
        ..Default::default()
    };
    let updated = app
        .time_blocks()
        .update(user.id, saved.block.id, update)
        .await
        .unwrap();
    assert!(!updated.overlaps_existing);
    assert_eq!(
        updated.block.end_time,
        saved.block.start_time + Duration::minutes(30)
    );
}

#[tokio::test]
async fn test_update_rejects_inverted_range() {
    let (app, _transport) = test_app().await;
    let user = seed_user(&app, "mira").await;
    let saved = app
        .time_blocks()
        .create(new_block(user.id, "Reading", 1, 2))
        .await
        .unwrap();

    let update = TimeBlockUpdate {
        end_time: Some(saved.block.start_time - Duration::hours(1)),
        ..Default::default()
    };
    let result = app.time_blocks().update(user.id, saved.block.id, update).await;
    assert!(matches!(result, Err(KansoError::InvalidRange(_))));
}

// ---- friendships --------------------------------------------------------

#[tokio::test]
async fn test_friend_request_notifies_requestee() {
    let (app, transport) = test_app().await;
    let mira = seed_user(&app, "mira").await;
    let noor = seed_user(&app, "noor").await;
    let mut rx = connect(&app, &transport, noor.id, "noor-1").await;

    let friendship = app.friendships().send_request(mira.id, "noor").await.unwrap();
    assert_eq!(friendship.status, FriendshipStatus::Pending);

    let (event, payload) = rx.try_recv().unwrap();
    assert_eq!(event, "NewNotification");
    assert_eq!(payload["kind"], "FRIEND_REQUEST");
    assert_eq!(payload["message"], "You have received a friend request");

    let result = app.friendships().send_request(mira.id, "noor").await;
    assert!(matches!(result, Err(KansoError::Conflict(_))));
}

#[tokio::test]
async fn test_self_and_unknown_requests_fail() {
    let (app, _transport) = test_app().await;
    let mira = seed_user(&app, "mira").await;

    let result = app.friendships().send_request(mira.id, "mira").await;
    assert!(matches!(result, Err(KansoError::Conflict(_))));
    let result = app.friendships().send_request(mira.id, "nobody").await;
    assert!(matches!(result, Err(KansoError::NotFound(_))));
}

#[tokio::test]
async fn test_crossing_requests_become_friends() {
    let (app, transport) = test_app().await;
    let mira = seed_user(&app, "mira").await;
    let noor = seed_user(&app, "noor").await;
    let mut rx = connect(&app, &transport, mira.id, "mira-1").await;

    app.friendships().send_request(mira.id, "noor").await.unwrap();

    // Noor answering with their own request accepts Mira's.
    let friendship = app.friendships().send_request(noor.id, "mira").await.unwrap();
    assert_eq!(friendship.status, FriendshipStatus::Accepted);
    assert!(friendship.accepted_at.is_some());
    assert_eq!(friendship.requester_id, mira.id);

    let (event, payload) = rx.try_recv().unwrap();
    assert_eq!(event, "NewNotification");
    assert_eq!(payload["kind"], "FRIEND_ACCEPTED");
    assert_eq!(payload["message"], "Your friend request has been accepted");

    let friends = app.friendships().friends(mira.id).await.unwrap();
    assert_eq!(friends.len(), 1);
    assert_eq!(friends[0].username, "noor");
    // One row for the pair, not two.
    assert_eq!(app.friendships().list(mira.id, None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_rejected_request_can_be_reopened() {
    let (app, _transport) = test_app().await;
    let mira = seed_user(&app, "mira").await;
    let noor = seed_user(&app, "noor").await;

    let friendship = app.friendships().send_request(mira.id, "noor").await.unwrap();
    app.friendships()
        .respond(friendship.id, noor.id, false)
        .await
        .unwrap();

    let reopened = app.friendships().send_request(mira.id, "noor").await.unwrap();
    assert_eq!(reopened.id, friendship.id);
    assert_eq!(reopened.status, FriendshipStatus::Pending);
    assert!(reopened.requested_at > friendship.requested_at);
    assert_eq!(app.friendships().list(mira.id, None).await.unwrap().len(), 1);

    // Rejection notified nobody; both resends did.
    let stored = app.notifications().list(noor.id, false, None).await.unwrap();
    assert_eq!(stored.len(), 2);
}

#[tokio::test]
async fn test_blocked_pair_gets_generic_refusal() {
    let (app, _transport) = test_app().await;
    let mira = seed_user(&app, "mira").await;
    let noor = seed_user(&app, "noor").await;

    let mut friendship = app.friendships().send_request(mira.id, "noor").await.unwrap();
    friendship.status = FriendshipStatus::Blocked;
    app.store.update_friendship(&friendship).await.unwrap();

    let result = app.friendships().send_request(mira.id, "noor").await;
    match result {
        Err(KansoError::Conflict(msg)) => {
            assert_eq!(msg, "cannot send a friend request at this time")
        }
        other => panic!("expected conflict, got {other:?}"),
    }
}

#[tokio::test]
async fn test_only_requestee_responds_and_only_once() {
    let (app, _transport) = test_app().await;
    let mira = seed_user(&app, "mira").await;
    let noor = seed_user(&app, "noor").await;
    let friendship = app.friendships().send_request(mira.id, "noor").await.unwrap();

    let result = app.friendships().respond(friendship.id, mira.id, true).await;
    assert!(matches!(result, Err(KansoError::Unauthorized(_))));

    app.friendships()
        .respond(friendship.id, noor.id, true)
        .await
        .unwrap();
    let result = app.friendships().respond(friendship.id, noor.id, true).await;
    assert!(matches!(result, Err(KansoError::Conflict(_))));
}

#[tokio::test]
async fn test_either_party_removes_friendship() {
    let (app, _transport) = test_app().await;
    let mira = seed_user(&app, "mira").await;
    let noor = seed_user(&app, "noor").await;
    let outsider = seed_user(&app, "outsider").await;

    let friendship = app.friendships().send_request(mira.id, "noor").await.unwrap();
    let result = app.friendships().remove(friendship.id, outsider.id).await;
    assert!(matches!(result, Err(KansoError::Unauthorized(_))));

    app.friendships().remove(friendship.id, noor.id).await.unwrap();
    let result = app.friendships().remove(friendship.id, mira.id).await;
    assert!(matches!(result, Err(KansoError::NotFound(_))));
}

#[tokio::test]
async fn test_stats_count_both_directions() {
    let (app, _transport) = test_app().await;
    let mira = seed_user(&app, "mira").await;
    seed_user(&app, "noor").await;
    let pia = seed_user(&app, "pia").await;
    seed_user(&app, "sam").await;

    let accepted = app.friendships().send_request(mira.id, "noor").await.unwrap();
    app.friendships()
        .respond(accepted.id, accepted.requestee_id, true)
        .await
        .unwrap();
    app.friendships().send_request(mira.id, "sam").await.unwrap();
    app.friendships().send_request(pia.id, "mira").await.unwrap();

    let stats = app.friendships().stats(mira.id).await.unwrap();
    assert_eq!(stats.total_friends, 1);
    assert_eq!(stats.pending_outgoing, 1);
    assert_eq!(stats.pending_incoming, 1);

    assert_eq!(app.friendships().pending_incoming(mira.id).await.unwrap().len(), 1);
    assert_eq!(app.friendships().pending_outgoing(mira.id).await.unwrap().len(), 1);
}

// ---- notifications ------------------------------------------------------

#[tokio::test]
async fn test_offline_user_gets_no_pushes() {
    let (app, transport) = test_app().await;
    let user = seed_user(&app, "mira").await;
    // Registered with the transport but never added to the registry.
    let mut rx = transport.register("stale-conn").await;

    app.notifications()
        .create(user.id, NotificationKind::System, "hello", None)
        .await
        .unwrap();

    assert_eq!(app.notifications().unread_count(user.id).await.unwrap(), 1);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_mark_read_pushes_fresh_count_once() {
    let (app, transport) = test_app().await;
    let user = seed_user(&app, "mira").await;
    let mut rx = connect(&app, &transport, user.id, "conn-1").await;

    let notification = app
        .notifications()
        .create(user.id, NotificationKind::System, "hello", None)
        .await
        .unwrap();
    let _ = rx.try_recv().unwrap();
    let _ = rx.try_recv().unwrap();

    app.notifications().mark_read(user.id, notification.id).await.unwrap();
    let (event, payload) = rx.try_recv().unwrap();
    assert_eq!(event, "UnreadCountUpdated");
    assert_eq!(payload["unreadCount"], 0);

    // Marking an already-read notification pushes nothing.
    app.notifications().mark_read(user.id, notification.id).await.unwrap();
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_mark_read_is_owner_only() {
    let (app, _transport) = test_app().await;
    let mira = seed_user(&app, "mira").await;
    let noor = seed_user(&app, "noor").await;

    let notification = app
        .notifications()
        .create(mira.id, NotificationKind::System, "hello", None)
        .await
        .unwrap();

    let result = app.notifications().mark_read(noor.id, notification.id).await;
    assert!(matches!(result, Err(KansoError::Unauthorized(_))));
    let result = app.notifications().mark_read(mira.id, 9999).await;
    assert!(matches!(result, Err(KansoError::NotFound(_))));
}

#[tokio::test]
async fn test_mark_all_read_pushes_zero() {
    let (app, transport) = test_app().await;
    let user = seed_user(&app, "mira").await;

    for i in 0..3 {
        app.notifications()
            .create(user.id, NotificationKind::System, &format!("n{i}"), None)
            .await
            .unwrap();
    }
    let mut rx = connect(&app, &transport, user.id, "conn-1").await;

    app.notifications().mark_all_read(user.id).await.unwrap();
    assert_eq!(app.notifications().unread_count(user.id).await.unwrap(), 0);

    // Exactly one count message, no per-item updates.
    let (event, payload) = rx.try_recv().unwrap();
    assert_eq!(event, "UnreadCountUpdated");
    assert_eq!(payload["unreadCount"], 0);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_deleting_unread_refreshes_count() {
    let (app, transport) = test_app().await;
    let user = seed_user(&app, "mira").await;

    let first = app
        .notifications()
        .create(user.id, NotificationKind::System, "a", None)
        .await
        .unwrap();
    app.notifications()
        .create(user.id, NotificationKind::System, "b", None)
        .await
        .unwrap();
    let mut rx = connect(&app, &transport, user.id, "conn-1").await;

    app.notifications().delete(user.id, first.id).await.unwrap();
    let (event, payload) = rx.try_recv().unwrap();
    assert_eq!(event, "UnreadCountUpdated");
    assert_eq!(payload["unreadCount"], 1);
}

#[tokio::test]
async fn test_clear_read_keeps_unread_silently() {
    let (app, transport) = test_app().await;
    let user = seed_user(&app, "mira").await;

    let read = app
        .notifications()
        .create(user.id, NotificationKind::System, "old", None)
        .await
        .unwrap();
    app.notifications().mark_read(user.id, read.id).await.unwrap();
    app.notifications()
        .create(user.id, NotificationKind::System, "new", None)
        .await
        .unwrap();
    let mut rx = connect(&app, &transport, user.id, "conn-1").await;

    app.notifications().clear_all(user.id, true).await.unwrap();

    let stored = app.notifications().list(user.id, false, None).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].message, "new");
    // Unread count did not change, so nothing was pushed.
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_clear_all_resets_count() {
    let (app, transport) = test_app().await;
    let user = seed_user(&app, "mira").await;

    for i in 0..2 {
        app.notifications()
            .create(user.id, NotificationKind::System, &format!("n{i}"), None)
            .await
            .unwrap();
    }
    let mut rx = connect(&app, &transport, user.id, "conn-1").await;

    app.notifications().clear_all(user.id, false).await.unwrap();
    assert!(app.notifications().list(user.id, false, None).await.unwrap().is_empty());

    let (event, payload) = rx.try_recv().unwrap();
    assert_eq!(event, "UnreadCountUpdated");
    assert_eq!(payload["unreadCount"], 0);
}

// ---- focus sessions -----------------------------------------------------

#[tokio::test]
async fn test_one_active_session_per_user() {
    let (app, _transport) = test_app().await;
    let user = seed_user(&app, "mira").await;

    let session = app.focus().start(user.id, FocusMode::DeepWork).await.unwrap();
    let result = app.focus().start(user.id, FocusMode::Pomodoro).await;
    assert!(matches!(result, Err(KansoError::Conflict(_))));

    let ended = app.focus().end(session.id, user.id).await.unwrap();
    assert!(ended.end_time.is_some());
    assert_eq!(ended.duration_minutes, Some(0));

    // With the first session closed a new one may start.
    app.focus().start(user.id, FocusMode::Pomodoro).await.unwrap();
}

#[tokio::test]
async fn test_ending_checks_owner_and_state() {
    let (app, _transport) = test_app().await;
    let mira = seed_user(&app, "mira").await;
    let noor = seed_user(&app, "noor").await;

    let session = app.focus().start(mira.id, FocusMode::Meditation).await.unwrap();
    let result = app.focus().end(session.id, noor.id).await;
    assert!(matches!(result, Err(KansoError::Unauthorized(_))));

    app.focus().end(session.id, mira.id).await.unwrap();
    let result = app.focus().end(session.id, mira.id).await;
    assert!(matches!(result, Err(KansoError::Conflict(_))));

    let result = app.focus().end(9999, mira.id).await;
    assert!(matches!(result, Err(KansoError::NotFound(_))));
}

#[tokio::test]
async fn test_session_events_reach_connections() {
    let (app, transport) = test_app().await;
    let user = seed_user(&app, "mira").await;
    let mut rx = connect(&app, &transport, user.id, "conn-1").await;

    let session = app.focus().start(user.id, FocusMode::DeepWork).await.unwrap();
    let (event, payload) = rx.try_recv().unwrap();
    assert_eq!(event, "SessionStarted");
    assert_eq!(payload["mode"], "DEEP_WORK");
    assert!(payload["endTime"].is_null());

    app.focus().end(session.id, user.id).await.unwrap();
    let (event, payload) = rx.try_recv().unwrap();
    assert_eq!(event, "SessionEnded");
    assert!(!payload["endTime"].is_null());
    assert_eq!(payload["durationMinutes"], 0);
}

#[tokio::test]
async fn test_active_session_lookup() {
    let (app, _transport) = test_app().await;
    let user = seed_user(&app, "mira").await;

    assert!(app.focus().active(user.id).await.unwrap().is_none());
    let session = app.focus().start(user.id, FocusMode::DeepWork).await.unwrap();
    let active = app.focus().active(user.id).await.unwrap().unwrap();
    assert_eq!(active.id, session.id);

    app.focus().end(session.id, user.id).await.unwrap();
    assert!(app.focus().active(user.id).await.unwrap().is_none());
}

// ---- export -------------------------------------------------------------

#[tokio::test]
async fn test_export_merges_all_sources() {
    let (app, _transport) = test_app().await;
    let user = seed_user(&app, "mira").await;
    let now = Utc::now();

    app.time_blocks()
        .create(new_block(user.id, "Morning pages", 1, 2))
        .await
        .unwrap();
    let mut task = new_task(user.id, "Ship release");
    task.due_date = Some(now + Duration::hours(4));
    app.tasks().create(task).await.unwrap();
    let session = app.focus().start(user.id, FocusMode::DeepWork).await.unwrap();
    app.focus().end(session.id, user.id).await.unwrap();

    let events = app
        .export()
        .exportable_events(user.id, now - Duration::hours(1), now + Duration::hours(8))
        .await
        .unwrap();

    let titles: Vec<&str> = events.iter().map(|e| e.title.as_str()).collect();
    assert!(titles.contains(&"Morning pages"));
    assert!(titles.contains(&"Due: Ship release"));
    assert!(titles.contains(&"Focus: DEEP_WORK"));
    assert_eq!(events.len(), 3);

    // The due task renders as a one-hour slot.
    let due_event = events.iter().find(|e| e.title.starts_with("Due:")).unwrap();
    assert_eq!(due_event.end - due_event.start, Duration::hours(1));
}

#[tokio::test]
async fn test_open_sessions_are_not_exported() {
    let (app, _transport) = test_app().await;
    let user = seed_user(&app, "mira").await;
    let now = Utc::now();

    app.focus().start(user.id, FocusMode::Pomodoro).await.unwrap();
    let events = app
        .export()
        .exportable_events(user.id, now - Duration::hours(1), now + Duration::hours(1))
        .await
        .unwrap();
    assert!(events.is_empty());
}

#[tokio::test]
async fn test_completed_tasks_are_not_exported() {
    let (app, _transport) = test_app().await;
    let user = seed_user(&app, "mira").await;
    let now = Utc::now();

    let mut new = new_task(user.id, "Done already");
    new.due_date = Some(now + Duration::hours(4));
    let task = app.tasks().create(new).await.unwrap();
    app.tasks()
        .update(
            user.id,
            task.id,
            TaskUpdate {
                status: Some(TaskStatus::Completed),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let events = app
        .export()
        .exportable_events(user.id, now, now + Duration::hours(8))
        .await
        .unwrap();
    assert!(events.is_empty());
}

#[tokio::test]
async fn test_calendar_file_shape() {
    let (app, _transport) = test_app().await;
    let user = seed_user(&app, "mira").await;
    let now = Utc::now();

    app.time_blocks()
        .create(new_block(user.id, "Planning", 1, 2))
        .await
        .unwrap();

    let file = app
        .export()
        .calendar_file(user.id, now, now + Duration::hours(4))
        .await
        .unwrap();

    assert!(file.file_name.starts_with("productivity-calendar-"));
    assert!(file.file_name.ends_with(".ics"));
    assert_eq!(file.content_type, "text/calendar");
    let text = String::from_utf8(file.bytes).unwrap();
    assert!(text.starts_with("BEGIN:VCALENDAR"));
    assert!(text.contains("SUMMARY:Planning"));
}

#[tokio::test]
async fn test_empty_window_has_nothing_to_export() {
    let (app, _transport) = test_app().await;
    let user = seed_user(&app, "mira").await;
    let now = Utc::now();

    let result = app.export().calendar_file(user.id, now, now + Duration::hours(1)).await;
    assert!(matches!(result, Err(KansoError::NoEvents)));
}
