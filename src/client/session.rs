use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::applier;
use super::order_store::{HABITS_ORDER_KEY, OrderStore, OrderStoreError};
use super::ordering;
use super::remote::{RemoteActions, RemoteError};
use crate::models::{
    HabitStatus, HabitWithStats, NewHabitRequest, NewTodoRequest, PartialProgress, Todo,
    TrackHabitRequest, UpdateHabitRequest, UpdateTodoRequest, habit_limit,
};
use crate::db::stats;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// A transient message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// Audio/visual cue played when something gets completed.
pub trait CompletionCue: Send + Sync {
    fn play(&self) -> Result<(), String>;
}

pub struct LogCue;

impl CompletionCue for LogCue {
    fn play(&self) -> Result<(), String> {
        info!("completion cue");
        Ok(())
    }
}

/// The local, disposable view of the user's lists for one calendar day.
#[derive(Debug, Clone)]
pub struct DashboardState {
    pub day: NaiveDate,
    pub habits: Vec<HabitWithStats>,
    pub todos: Vec<Todo>,
    pub notices: Vec<Notice>,
}

impl DashboardState {
    fn notify(&mut self, level: NoticeLevel, message: impl Into<String>) {
        self.notices.push(Notice {
            level,
            message: message.into(),
        });
    }
}

/// Session-scoped store plus the handlers that mutate it. Every handler
/// edits local state first, then awaits the backend; the lock is never held
/// across that await, so handlers may run concurrently and the last response
/// wins. Any failure replaces the affected list with a fresh fetch.
#[derive(Clone)]
pub struct DashboardSession {
    state: Arc<Mutex<DashboardState>>,
    remote: Arc<dyn RemoteActions>,
    orders: Arc<dyn OrderStore>,
    cue: Arc<dyn CompletionCue>,
}

impl DashboardSession {
    pub fn new(
        remote: Arc<dyn RemoteActions>,
        orders: Arc<dyn OrderStore>,
        cue: Arc<dyn CompletionCue>,
        day: NaiveDate,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(DashboardState {
                day,
                habits: Vec::new(),
                todos: Vec::new(),
                notices: Vec::new(),
            })),
            remote,
            orders,
            cue,
        }
    }

    pub async fn snapshot(&self) -> DashboardState {
        self.state.lock().await.clone()
    }

    pub async fn habits(&self) -> Vec<HabitWithStats> {
        self.state.lock().await.habits.clone()
    }

    pub async fn todos(&self) -> Vec<Todo> {
        self.state.lock().await.todos.clone()
    }

    pub async fn day(&self) -> NaiveDate {
        self.state.lock().await.day
    }

    pub async fn drain_notices(&self) -> Vec<Notice> {
        std::mem::take(&mut self.state.lock().await.notices)
    }

    /// Switches to another day and reloads both lists.
    pub async fn set_date(&self, day: NaiveDate) {
        self.state.lock().await.day = day;
        self.refresh_habits().await;
        self.refresh_todos().await;
    }

    /// Replaces the habit list with the backend's, in the stored display
    /// order. On failure the current list is kept.
    pub async fn refresh_habits(&self) -> bool {
        let day = self.day().await;
        match self.remote.fetch_habits_for_day(day).await {
            Ok(mut habits) => {
                let order = self.orders.load(HABITS_ORDER_KEY);
                ordering::sort_by_stored_order(&mut habits, &order);
                self.state.lock().await.habits = habits;
                true
            }
            Err(e) => {
                error!("Failed to fetch habits for {}: {}", day, e);
                self.state
                    .lock()
                    .await
                    .notify(NoticeLevel::Error, format!("Failed to load habits: {}", e));
                false
            }
        }
    }

    pub async fn refresh_todos(&self) -> bool {
        match self.remote.fetch_todos().await {
            Ok(todos) => {
                self.state.lock().await.todos = todos;
                true
            }
            Err(e) => {
                error!("Failed to fetch todos: {}", e);
                self.state
                    .lock()
                    .await
                    .notify(NoticeLevel::Error, format!("Failed to load todos: {}", e));
                false
            }
        }
    }

    async fn revert_habits(&self, message: String) {
        self.state.lock().await.notify(NoticeLevel::Error, message);
        self.refresh_habits().await;
    }

    async fn revert_todos(&self, message: String) {
        self.state.lock().await.notify(NoticeLevel::Error, message);
        self.refresh_todos().await;
    }

    fn play_cue(&self) {
        if let Err(e) = self.cue.play() {
            warn!("Error playing completion cue: {}", e);
        }
    }

    /// Persists a new display order and applies it to the current list.
    pub async fn reorder_habits(&self, ids: Vec<String>) -> Result<(), OrderStoreError> {
        self.orders.save(HABITS_ORDER_KEY, &ids)?;
        let mut state = self.state.lock().await;
        ordering::sort_by_stored_order(&mut state.habits, &ids);
        Ok(())
    }

    pub async fn can_add_habit(&self, is_paid: bool) -> bool {
        self.state.lock().await.habits.len() < habit_limit(is_paid)
    }

    /// Not optimistic: the new habit shows up with the refetch.
    pub async fn create_habit(&self, req: NewHabitRequest, is_paid: bool) -> bool {
        if !self.can_add_habit(is_paid).await {
            self.state.lock().await.notify(
                NoticeLevel::Error,
                format!("You can track up to {} habits on your plan", habit_limit(is_paid)),
            );
            return false;
        }

        match self.remote.create_habit(&req).await {
            Ok(habit) => {
                debug!("Habit created: {}", habit.id);
                self.refresh_habits().await;
                true
            }
            Err(e) => {
                self.revert_habits(format!("Failed to create habit: {}", e)).await;
                false
            }
        }
    }

    /// Not optimistic either: the edited habit is reloaded with its stats
    /// for the selected day, whether the edit went through or not.
    pub async fn update_habit(&self, habit_id: &str, req: UpdateHabitRequest) -> bool {
        match self.remote.update_habit(habit_id, &req).await {
            Ok(habit) => {
                debug!("Habit updated: {}", habit.id);
                self.state
                    .lock()
                    .await
                    .notify(NoticeLevel::Success, "Habit updated successfully");
                self.refresh_habits().await;
                true
            }
            Err(e) => {
                error!("Failed to update habit {}: {}", habit_id, e);
                self.revert_habits(format!("Failed to update habit: {}", e)).await;
                false
            }
        }
    }

    /// Starts a partial-completion counter from what the habit already has
    /// done today.
    pub async fn open_partial_progress(&self, habit_id: &str) -> Option<PartialProgress> {
        let state = self.state.lock().await;
        let habit = state.habits.iter().find(|h| h.id() == habit_id)?;
        Some(PartialProgress::open(habit.habit.goal_count, habit.remaining_count))
    }

    /// Records the counter's value; reaching the goal completes the habit.
    pub async fn save_partial_progress(&self, habit_id: &str, progress: PartialProgress) {
        self.track_habit(habit_id, progress.status(), Some(progress.count()))
            .await;
    }

    pub async fn track_habit(&self, habit_id: &str, status: HabitStatus, completed_count: Option<i64>) {
        let day = {
            let mut state = self.state.lock().await;
            applier::set_habit_status(&mut state.habits, habit_id, status, completed_count);
            state.day
        };
        if status == HabitStatus::Completed {
            self.play_cue();
        }

        let req = TrackHabitRequest {
            date: stats::format_day(day),
            status,
            completed_count,
        };
        match self.remote.track_habit(habit_id, &req).await {
            Ok(tracked) => debug!("Habit tracked successfully: {:?}", tracked),
            Err(e) => {
                error!("Error tracking habit {}: {}", habit_id, e);
                self.revert_habits(format!("Failed to track habit: {}", e)).await;
            }
        }
    }

    pub async fn delete_habit(&self, habit_id: &str) {
        applier::remove_habit(&mut self.state.lock().await.habits, habit_id);

        match self.remote.delete_habit(habit_id).await {
            Ok(()) => self
                .state
                .lock()
                .await
                .notify(NoticeLevel::Info, "Habit deleted"),
            Err(e) => {
                error!("Failed to delete habit {}: {}", habit_id, e);
                self.revert_habits(format!("Failed to delete habit: {}", e)).await;
            }
        }
    }

    /// Shows the todo at once under a temporary id, then swaps in the
    /// backend's record. Returns the canonical id on success.
    pub async fn add_todo(&self, req: NewTodoRequest) -> Option<String> {
        let temp_id = applier::insert_placeholder(&mut self.state.lock().await.todos, &req);

        match self.remote.add_todo(&req).await {
            Ok(todo) => {
                let id = todo.id.clone();
                let mut state = self.state.lock().await;
                if !applier::replace_placeholder(&mut state.todos, &temp_id, todo) {
                    debug!("placeholder {} already gone, keeping current list", temp_id);
                }
                state.notify(NoticeLevel::Success, "Todo added successfully");
                Some(id)
            }
            Err(e) => {
                error!("Failed to add todo: {}", e);
                self.revert_todos(failure_message("Failed to add todo", &e)).await;
                None
            }
        }
    }

    pub async fn update_todo(&self, todo_id: &str, patch: UpdateTodoRequest) {
        if !applier::update_todo(&mut self.state.lock().await.todos, todo_id, &patch) {
            debug!("update for unknown todo {} ignored", todo_id);
            return;
        }

        match self.remote.update_todo(todo_id, &patch).await {
            Ok(todo) => {
                let mut state = self.state.lock().await;
                applier::reconcile_updated(&mut state.todos, todo);
                state.notify(NoticeLevel::Success, "Todo updated successfully");
            }
            Err(e) => {
                error!("Failed to update todo {}: {}", todo_id, e);
                self.revert_todos(failure_message("Failed to update todo", &e)).await;
            }
        }
    }

    pub async fn complete_todo(&self, todo_id: &str) {
        {
            let mut state = self.state.lock().await;
            applier::mark_todo_complete(&mut state.todos, todo_id);
            state.notify(NoticeLevel::Info, "Todo marked as completed");
        }
        self.play_cue();

        match self.remote.mark_todo_complete(todo_id).await {
            Ok(_) => debug!("Todo {} marked complete", todo_id),
            Err(e) => {
                error!("Failed to mark todo {} complete: {}", todo_id, e);
                self.revert_todos(failure_message("Failed to save completion", &e)).await;
            }
        }
    }

    pub async fn delete_todo(&self, todo_id: &str) {
        applier::remove_todo(&mut self.state.lock().await.todos, todo_id);

        match self.remote.delete_todo(todo_id).await {
            Ok(()) => self
                .state
                .lock()
                .await
                .notify(NoticeLevel::Info, "Todo deleted"),
            Err(e) => {
                error!("Failed to delete todo {}: {}", todo_id, e);
                self.revert_todos(failure_message("Failed to delete todo", &e)).await;
            }
        }
    }
}

fn failure_message(action: &str, err: &RemoteError) -> String {
    match err {
        RemoteError::Rejected(reason) => format!("{}: {}", action, reason),
        RemoteError::Transport(_) => format!("{}: a network error occurred, reverting", action),
    }
}
