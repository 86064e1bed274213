//! Reducer-style application state. The UI owns nothing mutable: it feeds
//! events into `AppState::reduce` and re-renders from the result. The
//! snapshot itself is a disposable cache, replaced wholesale on every
//! remote change notification.

use everdo_core::task::Task;

use crate::view::{progress, project, Filter, Progress};

/// Two-phase optimistic avatar value: `pending` is shown the moment the
/// user picks an image, then either promoted by the upload confirmation or
/// reverted to the last confirmed value on failure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AvatarState {
    pub confirmed: Option<String>,
    pub pending: Option<String>,
}

impl AvatarState {
    /// What the UI should display right now.
    pub fn shown(&self) -> Option<&str> {
        self.pending.as_deref().or(self.confirmed.as_deref())
    }
}

/// Everything a screen needs to render, as one immutable value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppState {
    pub tasks: Vec<Task>,
    pub filter: Filter,
    pub search: String,
    pub avatar: AvatarState,
}

/// State transitions. Remote snapshots and user interactions flow through
/// the same funnel.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// Full-collection replace from the remote subscription.
    SnapshotReceived(Vec<Task>),
    FilterSelected(Filter),
    /// Every change to the search text, including clearing it. Typing in
    /// the search box always snaps the filter back to All; this coupling
    /// is intentional, preserved behavior.
    SearchChanged(String),
    /// Subscription teardown; the local snapshot is discarded.
    SignedOut,
    AvatarPicked(String),
    AvatarUploaded(String),
    AvatarUploadFailed,
}

impl AppState {
    pub fn reduce(self, event: AppEvent) -> AppState {
        match event {
            AppEvent::SnapshotReceived(tasks) => AppState { tasks, ..self },
            AppEvent::FilterSelected(filter) => AppState { filter, ..self },
            AppEvent::SearchChanged(search) => AppState {
                search,
                filter: Filter::All,
                ..self
            },
            AppEvent::SignedOut => AppState::default(),
            AppEvent::AvatarPicked(local) => AppState {
                avatar: AvatarState {
                    pending: Some(local),
                    ..self.avatar
                },
                ..self
            },
            AppEvent::AvatarUploaded(url) => AppState {
                avatar: AvatarState {
                    confirmed: Some(url),
                    pending: None,
                },
                ..self
            },
            AppEvent::AvatarUploadFailed => AppState {
                avatar: AvatarState {
                    pending: None,
                    ..self.avatar
                },
                ..self
            },
        }
    }

    /// The list the user actually sees, derived through the pipeline.
    pub fn visible(&self) -> Vec<Task> {
        project(&self.tasks, self.filter, &self.search)
    }

    /// Counters over the full snapshot, independent of filter and search.
    pub fn progress(&self) -> Progress {
        progress(&self.tasks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use everdo_core::task::{Category, Priority};

    fn task(id: &str, completed: bool) -> Task {
        Task {
            id: id.to_string(),
            title: format!("task {id}"),
            description: None,
            date: "14/03/2026".to_string(),
            priority: Priority::Low,
            category: Category::Work,
            completed,
            subtasks: Vec::new(),
        }
    }

    #[test]
    fn snapshot_replaces_tasks_wholesale() {
        let state = AppState::default()
            .reduce(AppEvent::SnapshotReceived(vec![task("a", false)]))
            .reduce(AppEvent::SnapshotReceived(vec![task("b", true)]));
        assert_eq!(state.tasks.len(), 1);
        assert_eq!(state.tasks[0].id, "b");
    }

    #[test]
    fn typing_in_the_search_box_resets_the_filter() {
        let state = AppState::default()
            .reduce(AppEvent::FilterSelected(Filter::Completed))
            .reduce(AppEvent::SearchChanged("mil".to_string()));
        assert_eq!(state.filter, Filter::All);
        assert_eq!(state.search, "mil");

        // Clearing the box counts as a change too.
        let state = state
            .reduce(AppEvent::FilterSelected(Filter::Pending))
            .reduce(AppEvent::SearchChanged(String::new()));
        assert_eq!(state.filter, Filter::All);
    }

    #[test]
    fn filter_and_search_drive_the_visible_list() {
        let state = AppState::default().reduce(AppEvent::SnapshotReceived(vec![
            task("a", false),
            task("b", true),
        ]));
        let state = state.reduce(AppEvent::FilterSelected(Filter::Pending));
        assert_eq!(state.visible().len(), 1);
        assert_eq!(state.visible()[0].id, "a");

        let p = state.progress();
        assert_eq!((p.completed, p.total, p.remaining), (1, 2, 1));
    }

    #[test]
    fn sign_out_discards_everything() {
        let state = AppState::default()
            .reduce(AppEvent::SnapshotReceived(vec![task("a", false)]))
            .reduce(AppEvent::SearchChanged("a".to_string()))
            .reduce(AppEvent::AvatarUploaded("https://img/x.jpg".to_string()))
            .reduce(AppEvent::SignedOut);
        assert_eq!(state, AppState::default());
    }

    #[test]
    fn avatar_upload_is_two_phase() {
        let picked = AppState::default()
            .reduce(AppEvent::AvatarUploaded("https://img/old.jpg".to_string()))
            .reduce(AppEvent::AvatarPicked("file:///local.jpg".to_string()));
        assert_eq!(picked.avatar.shown(), Some("file:///local.jpg"));

        let confirmed = picked
            .clone()
            .reduce(AppEvent::AvatarUploaded("https://img/new.jpg".to_string()));
        assert_eq!(confirmed.avatar.shown(), Some("https://img/new.jpg"));
        assert_eq!(confirmed.avatar.pending, None);

        // A failed upload falls back to the last confirmed value.
        let reverted = picked.reduce(AppEvent::AvatarUploadFailed);
        assert_eq!(reverted.avatar.shown(), Some("https://img/old.jpg"));
    }
}
