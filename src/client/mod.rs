//! Client-side dashboard store: optimistic edits to the local habit and todo
//! lists, reconciled against the backend and reverted by refetch.

pub mod applier;
pub mod order_store;
pub mod ordering;
pub mod remote;
pub mod session;

pub use order_store::{FileOrderStore, HABITS_ORDER_KEY, MemoryOrderStore, OrderStore};
pub use remote::{HttpRemote, RemoteActions, RemoteConfig, RemoteError};
pub use session::{CompletionCue, DashboardSession, DashboardState, LogCue, Notice, NoticeLevel};
