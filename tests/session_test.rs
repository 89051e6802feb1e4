use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use dailyboard::client::applier::is_temporary_id;
use dailyboard::client::ordering::is_tiered;
use dailyboard::client::{
    CompletionCue, DashboardSession, HABITS_ORDER_KEY, MemoryOrderStore, NoticeLevel, OrderStore,
    RemoteActions, RemoteError,
};
use dailyboard::models::{
    Habit, HabitStatus, HabitWithStats, NewHabitRequest, NewTodoRequest, Priority, Todo,
    TrackHabitRequest, TrackedHabit, UNTITLED_TODO, UpdateHabitRequest, UpdateTodoRequest,
};
use tokio::sync::oneshot;

/// In-memory backend. `fail_next` makes the next mutation fail; fetches
/// always succeed.
#[derive(Default)]
struct FakeRemote {
    habits: Mutex<Vec<HabitWithStats>>,
    todos: Mutex<Vec<Todo>>,
    fail_next: Mutex<Option<RemoteError>>,
    add_gate: Mutex<Option<oneshot::Receiver<()>>>,
    next_id: AtomicUsize,
}

impl FakeRemote {
    fn with_todos(todos: Vec<Todo>) -> Self {
        let remote = Self::default();
        *remote.todos.lock().unwrap() = todos;
        remote
    }

    fn with_habits(habits: Vec<HabitWithStats>) -> Self {
        let remote = Self::default();
        *remote.habits.lock().unwrap() = habits;
        remote
    }

    fn fail_next(&self, err: RemoteError) {
        *self.fail_next.lock().unwrap() = Some(err);
    }

    fn check(&self) -> Result<(), RemoteError> {
        match self.fail_next.lock().unwrap().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Ordered by tier, like the real backend.
    fn todos(&self) -> Vec<Todo> {
        let mut todos = self.todos.lock().unwrap().clone();
        todos.sort_by_key(|t| t.priority.weight());
        todos
    }
}

#[async_trait]
impl RemoteActions for FakeRemote {
    async fn fetch_habits_for_day(&self, _day: NaiveDate) -> Result<Vec<HabitWithStats>, RemoteError> {
        Ok(self.habits.lock().unwrap().clone())
    }

    async fn create_habit(&self, req: &NewHabitRequest) -> Result<Habit, RemoteError> {
        self.check()?;
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        let view = habit(&format!("srv-h{n}"));
        let mut created = view.habit.clone();
        created.title = req.title.clone();
        self.habits.lock().unwrap().push(HabitWithStats {
            habit: created.clone(),
            ..view
        });
        Ok(created)
    }

    async fn update_habit(&self, habit_id: &str, req: &UpdateHabitRequest) -> Result<Habit, RemoteError> {
        self.check()?;
        let mut habits = self.habits.lock().unwrap();
        let habit = habits
            .iter_mut()
            .find(|h| h.id() == habit_id)
            .ok_or_else(|| RemoteError::Rejected("Not Found".to_string()))?;
        req.apply_to(&mut habit.habit);
        Ok(habit.habit.clone())
    }

    async fn track_habit(&self, habit_id: &str, req: &TrackHabitRequest) -> Result<TrackedHabit, RemoteError> {
        self.check()?;
        let mut habits = self.habits.lock().unwrap();
        let habit = habits
            .iter_mut()
            .find(|h| h.id() == habit_id)
            .ok_or_else(|| RemoteError::Rejected("Not Found".to_string()))?;
        habit.status = req.status;
        if let Some(count) = req.completed_count {
            habit.remaining_count = habit.habit.goal_count - count;
        }
        Ok(TrackedHabit {
            habit_id: habit_id.to_string(),
            date: req.date.clone(),
            status: req.status,
            completed_count: req.completed_count.unwrap_or(0),
            updated_at: String::new(),
        })
    }

    async fn delete_habit(&self, habit_id: &str) -> Result<(), RemoteError> {
        self.check()?;
        self.habits.lock().unwrap().retain(|h| h.id() != habit_id);
        Ok(())
    }

    async fn fetch_todos(&self) -> Result<Vec<Todo>, RemoteError> {
        Ok(self.todos())
    }

    async fn add_todo(&self, req: &NewTodoRequest) -> Result<Todo, RemoteError> {
        let gate = self.add_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        self.check()?;
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut created = todo(&format!("srv-{n}"), req.priority.unwrap_or_default());
        created.title = req.title_or_default();
        self.todos.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn update_todo(&self, todo_id: &str, req: &UpdateTodoRequest) -> Result<Todo, RemoteError> {
        self.check()?;
        let mut todos = self.todos.lock().unwrap();
        let todo = todos
            .iter_mut()
            .find(|t| t.id == todo_id)
            .ok_or_else(|| RemoteError::Rejected("Not Found".to_string()))?;
        req.apply_to(todo);
        todo.updated_at = "server".to_string();
        Ok(todo.clone())
    }

    async fn mark_todo_complete(&self, todo_id: &str) -> Result<Todo, RemoteError> {
        let req = UpdateTodoRequest {
            is_completed: Some(true),
            ..Default::default()
        };
        self.update_todo(todo_id, &req).await
    }

    async fn delete_todo(&self, todo_id: &str) -> Result<(), RemoteError> {
        self.check()?;
        self.todos.lock().unwrap().retain(|t| t.id != todo_id);
        Ok(())
    }
}

#[derive(Default)]
struct CountingCue(AtomicUsize);

impl CompletionCue for CountingCue {
    fn play(&self) -> Result<(), String> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn todo(id: &str, priority: Priority) -> Todo {
    Todo {
        id: id.to_string(),
        user_id: "u1".to_string(),
        title: id.to_string(),
        description: None,
        priority,
        is_completed: false,
        created_at: String::new(),
        updated_at: String::new(),
    }
}

fn habit(id: &str) -> HabitWithStats {
    HabitWithStats {
        habit: Habit {
            id: id.to_string(),
            user_id: "u1".to_string(),
            title: id.to_string(),
            environment: None,
            goal_count: 1,
            created_at: String::new(),
        },
        status: HabitStatus::Current,
        remaining_count: 1,
        completed: 0,
        skipped: 0,
        failed: 0,
        total: 0,
        streak: 0,
    }
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
}

fn session(remote: Arc<FakeRemote>) -> (DashboardSession, Arc<MemoryOrderStore>, Arc<CountingCue>) {
    let orders = Arc::new(MemoryOrderStore::new());
    let cue = Arc::new(CountingCue::default());
    let session = DashboardSession::new(remote, orders.clone(), cue.clone(), day());
    (session, orders, cue)
}

fn ids(todos: &[Todo]) -> Vec<String> {
    todos.iter().map(|t| t.id.clone()).collect()
}

#[tokio::test]
async fn test_placeholder_is_replaced_in_place() {
    let remote = Arc::new(FakeRemote::with_todos(vec![
        todo("a", Priority::P1),
        todo("c", Priority::P3),
    ]));
    let (gate_tx, gate_rx) = oneshot::channel();
    *remote.add_gate.lock().unwrap() = Some(gate_rx);

    let (session, _, _) = session(remote.clone());
    session.refresh_todos().await;

    let pending = {
        let session = session.clone();
        tokio::spawn(async move {
            session
                .add_todo(NewTodoRequest {
                    title: "b".to_string(),
                    description: None,
                    priority: Some(Priority::P2),
                })
                .await
        })
    };

    let temp_id = loop {
        let todos = session.todos().await;
        if todos.len() == 3 {
            break todos[1].id.clone();
        }
        tokio::task::yield_now().await;
    };
    assert!(is_temporary_id(&temp_id));

    gate_tx.send(()).unwrap();
    let canonical = pending.await.unwrap().expect("add should succeed");

    let todos = session.todos().await;
    assert_eq!(ids(&todos), vec!["a".to_string(), canonical, "c".to_string()]);
    assert!(todos.iter().all(|t| !is_temporary_id(&t.id)));

    let notices = session.drain_notices().await;
    assert_eq!(notices.last().map(|n| n.level), Some(NoticeLevel::Success));
}

#[tokio::test]
async fn test_failed_add_drops_placeholder() {
    let remote = Arc::new(FakeRemote::with_todos(vec![todo("a", Priority::P1)]));
    remote.fail_next(RemoteError::Rejected("quota".to_string()));
    let (session, _, _) = session(remote.clone());
    session.refresh_todos().await;

    let result = session.add_todo(NewTodoRequest::default()).await;

    assert!(result.is_none());
    assert_eq!(session.todos().await, remote.todos());
    let notices = session.drain_notices().await;
    assert!(notices
        .iter()
        .any(|n| n.level == NoticeLevel::Error && n.message.contains("quota")));
}

#[tokio::test]
async fn test_blank_title_placeholder_matches_backend() {
    let remote = Arc::new(FakeRemote::default());
    let (gate_tx, gate_rx) = oneshot::channel();
    *remote.add_gate.lock().unwrap() = Some(gate_rx);
    let (session, _, _) = session(remote.clone());

    let pending = {
        let session = session.clone();
        tokio::spawn(async move { session.add_todo(NewTodoRequest::default()).await })
    };

    let placeholder = loop {
        let todos = session.todos().await;
        if let Some(t) = todos.first() {
            break t.clone();
        }
        tokio::task::yield_now().await;
    };
    assert_eq!(placeholder.title, UNTITLED_TODO);

    gate_tx.send(()).unwrap();
    assert!(pending.await.unwrap().is_some());

    let todos = session.todos().await;
    assert_eq!(todos.len(), 1);
    assert_eq!(todos[0].title, placeholder.title);
    let notices = session.drain_notices().await;
    assert!(notices.iter().all(|n| n.level != NoticeLevel::Error));
}

#[tokio::test]
async fn test_failed_update_resyncs_to_backend() {
    let remote = Arc::new(FakeRemote::with_todos(vec![
        todo("a", Priority::P1),
        todo("b", Priority::P2),
        todo("c", Priority::P3),
    ]));
    let (session, _, _) = session(remote.clone());
    session.refresh_todos().await;

    remote.fail_next(RemoteError::Rejected("nope".to_string()));
    session
        .update_todo(
            "c",
            UpdateTodoRequest {
                title: Some("optimistic".to_string()),
                priority: Some(Priority::P1),
                ..Default::default()
            },
        )
        .await;

    let todos = session.todos().await;
    assert_eq!(todos, remote.todos());
    assert!(todos.iter().all(|t| t.title != "optimistic"));
}

#[tokio::test]
async fn test_successful_update_takes_canonical_record() {
    let remote = Arc::new(FakeRemote::with_todos(vec![
        todo("a", Priority::P1),
        todo("b", Priority::P2),
        todo("c", Priority::P3),
    ]));
    let (session, _, _) = session(remote.clone());
    session.refresh_todos().await;

    session
        .update_todo(
            "c",
            UpdateTodoRequest {
                priority: Some(Priority::P2),
                ..Default::default()
            },
        )
        .await;

    let todos = session.todos().await;
    assert_eq!(ids(&todos), vec!["a", "b", "c"]);
    assert_eq!(todos[2].priority, Priority::P2);
    assert_eq!(todos[2].updated_at, "server");
}

#[tokio::test]
async fn test_priority_updates_keep_tiers() {
    let initial: Vec<Todo> = (0..9)
        .map(|i| {
            let priority = [Priority::P1, Priority::P2, Priority::P3][i % 3];
            todo(&format!("t{i}"), priority)
        })
        .collect();
    let mut sorted = initial.clone();
    dailyboard::client::ordering::sort_by_priority(&mut sorted);

    let remote = Arc::new(FakeRemote::with_todos(sorted));
    let (session, _, _) = session(remote.clone());
    session.refresh_todos().await;

    let priorities = [Priority::P3, Priority::P1, Priority::P2];
    for step in 0..30usize {
        let id = format!("t{}", (step * 7) % 9);
        if step % 4 == 0 {
            remote.fail_next(RemoteError::Transport("offline".to_string()));
        }
        session
            .update_todo(
                &id,
                UpdateTodoRequest {
                    priority: Some(priorities[step % 3]),
                    ..Default::default()
                },
            )
            .await;
        let todos = session.todos().await;
        assert!(is_tiered(&todos), "step {step}: {:?}", ids(&todos));
        assert_eq!(todos.len(), 9);
    }
}

#[tokio::test]
async fn test_complete_todo_plays_cue_and_reverts_on_network_error() {
    let remote = Arc::new(FakeRemote::with_todos(vec![todo("a", Priority::P1)]));
    let (session, _, cue) = session(remote.clone());
    session.refresh_todos().await;

    remote.fail_next(RemoteError::Transport("connection reset".to_string()));
    session.complete_todo("a").await;

    assert_eq!(cue.0.load(Ordering::SeqCst), 1);
    assert!(!session.todos().await[0].is_completed);
    let notices = session.drain_notices().await;
    assert_eq!(notices[0].level, NoticeLevel::Info);
    assert!(notices.iter().any(|n| n.message.contains("network error")));

    session.complete_todo("a").await;
    assert!(session.todos().await[0].is_completed);
    assert!(remote.todos()[0].is_completed);
}

#[tokio::test]
async fn test_delete_todo() {
    let remote = Arc::new(FakeRemote::with_todos(vec![
        todo("a", Priority::P1),
        todo("b", Priority::P2),
    ]));
    let (session, _, _) = session(remote.clone());
    session.refresh_todos().await;

    remote.fail_next(RemoteError::Rejected("locked".to_string()));
    session.delete_todo("a").await;
    assert_eq!(ids(&session.todos().await), vec!["a", "b"]);

    session.delete_todo("a").await;
    assert_eq!(ids(&session.todos().await), vec!["b"]);
}

#[tokio::test]
async fn test_habits_follow_stored_order() {
    let remote = Arc::new(FakeRemote::with_habits(vec![
        habit("a"),
        habit("b"),
        habit("c"),
    ]));
    let (session, orders, _) = session(remote);
    orders
        .save(HABITS_ORDER_KEY, &["b".to_string(), "a".to_string()])
        .unwrap();

    session.refresh_habits().await;

    let order: Vec<String> = session
        .habits()
        .await
        .iter()
        .map(|h| h.id().to_string())
        .collect();
    assert_eq!(order, vec!["b", "a", "c"]);
}

#[tokio::test]
async fn test_reorder_persists_order() {
    let remote = Arc::new(FakeRemote::with_habits(vec![habit("a"), habit("b")]));
    let (session, orders, _) = session(remote);
    session.refresh_habits().await;

    session
        .reorder_habits(vec!["b".to_string(), "a".to_string()])
        .await
        .unwrap();

    assert_eq!(orders.load(HABITS_ORDER_KEY), vec!["b", "a"]);
    assert_eq!(session.habits().await[0].id(), "b");
}

#[tokio::test]
async fn test_track_habit_reverts_on_failure() {
    let remote = Arc::new(FakeRemote::with_habits(vec![habit("a")]));
    let (session, _, cue) = session(remote.clone());
    session.refresh_habits().await;

    remote.fail_next(RemoteError::Rejected("closed day".to_string()));
    session.track_habit("a", HabitStatus::Completed, None).await;
    assert_eq!(cue.0.load(Ordering::SeqCst), 1);
    assert_eq!(session.habits().await[0].status, HabitStatus::Current);

    session.track_habit("a", HabitStatus::Skipped, None).await;
    assert_eq!(cue.0.load(Ordering::SeqCst), 1);
    assert_eq!(session.habits().await[0].status, HabitStatus::Skipped);
}

#[tokio::test]
async fn test_delete_habit_reverts_on_failure() {
    let remote = Arc::new(FakeRemote::with_habits(vec![habit("a"), habit("b")]));
    let (session, _, _) = session(remote.clone());
    session.refresh_habits().await;

    remote.fail_next(RemoteError::Transport("timeout".to_string()));
    session.delete_habit("a").await;
    assert_eq!(session.habits().await.len(), 2);

    session.delete_habit("a").await;
    assert_eq!(session.habits().await.len(), 1);
}

#[tokio::test]
async fn test_create_habit_respects_plan_limit() {
    let remote = Arc::new(FakeRemote::with_habits(vec![habit("a")]));
    let (session, _, _) = session(remote.clone());
    session.refresh_habits().await;

    let req = NewHabitRequest {
        title: "Stretch".to_string(),
        ..Default::default()
    };
    assert!(session.create_habit(req.clone(), false).await);
    assert_eq!(session.habits().await.len(), 2);

    assert!(!session.create_habit(req.clone(), false).await);
    assert_eq!(remote.habits.lock().unwrap().len(), 2);

    assert!(session.create_habit(req, true).await);
    assert_eq!(session.habits().await.len(), 3);
}

#[tokio::test]
async fn test_update_habit_refreshes_either_way() {
    let remote = Arc::new(FakeRemote::with_habits(vec![habit("a")]));
    let (session, _, _) = session(remote.clone());
    session.refresh_habits().await;

    let req = UpdateHabitRequest {
        title: Some("Morning run".to_string()),
        goal_count: Some(3),
        ..Default::default()
    };
    assert!(session.update_habit("a", req.clone()).await);
    let habits = session.habits().await;
    assert_eq!(habits[0].habit.title, "Morning run");
    assert_eq!(habits[0].habit.goal_count, 3);

    remote.fail_next(RemoteError::Rejected("title must not be blank".to_string()));
    let blank = UpdateHabitRequest {
        title: Some(String::new()),
        ..Default::default()
    };
    assert!(!session.update_habit("a", blank).await);
    assert_eq!(session.habits().await[0].habit.title, "Morning run");
    let notices = session.drain_notices().await;
    assert_eq!(notices.last().map(|n| n.level), Some(NoticeLevel::Error));
}

#[tokio::test]
async fn test_partial_progress_completes_at_goal() {
    let mut start = habit("a");
    start.habit.goal_count = 3;
    start.remaining_count = 3;
    let remote = Arc::new(FakeRemote::with_habits(vec![start]));
    let (session, _, cue) = session(remote.clone());
    session.refresh_habits().await;

    let mut progress = session.open_partial_progress("a").await.unwrap();
    assert_eq!(progress.count(), 0);
    progress.increment();
    session.save_partial_progress("a", progress).await;

    let habits = session.habits().await;
    assert_eq!(habits[0].status, HabitStatus::Current);
    assert_eq!(habits[0].remaining_count, 2);
    assert_eq!(cue.0.load(Ordering::SeqCst), 0);

    let mut progress = session.open_partial_progress("a").await.unwrap();
    assert_eq!(progress.count(), 1);
    progress.increment();
    progress.increment();
    session.save_partial_progress("a", progress).await;

    let habits = session.habits().await;
    assert_eq!(habits[0].status, HabitStatus::Completed);
    assert_eq!(habits[0].remaining_count, 0);
    assert_eq!(cue.0.load(Ordering::SeqCst), 1);
    assert_eq!(remote.habits.lock().unwrap()[0].status, HabitStatus::Completed);

    assert!(session.open_partial_progress("missing").await.is_none());
}
