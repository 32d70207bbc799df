//! Remote list loader
//!
//! A [`RemoteList`] owns one list-shaped screen's data: it fetches an
//! [`Endpoint`] with the session's bearer token, normalizes the body and
//! publishes a [`ListModel`] through a `watch` channel.
//!
//! All state changes go through the pure [`reduce`] function. Every load takes
//! a new generation number and results from older generations are dropped, so
//! whichever request started last decides what is shown.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::api::{ApiClient, ApiResult, Endpoint};
use crate::error::ApiError;
use crate::normalize::Shape;
use crate::session::{BearerToken, SessionStore};

/// What a list screen is showing
#[derive(Debug, Clone, PartialEq)]
pub enum ListState<T> {
    Loading,
    /// User-facing message of the last failure
    Failed(String),
    Loaded(Vec<T>),
}

/// Presentation of a [`ListState`]
#[derive(Debug, PartialEq)]
pub enum View<'a, T> {
    Spinner,
    Error(&'a str),
    Empty,
    Items(&'a [T]),
}

impl<T> ListState<T> {
    pub fn view(&self) -> View<'_, T> {
        match self {
            ListState::Loading => View::Spinner,
            ListState::Failed(message) => View::Error(message),
            ListState::Loaded(items) if items.is_empty() => View::Empty,
            ListState::Loaded(items) => View::Items(items),
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, ListState::Loading)
    }

    pub fn items(&self) -> Option<&[T]> {
        match self {
            ListState::Loaded(items) => Some(items),
            _ => None,
        }
    }
}

/// Loader state: what is shown plus the bookkeeping to order responses
#[derive(Debug, Clone)]
pub struct ListModel<T> {
    pub state: ListState<T>,
    /// Generation of the newest request; only its outcome is applied
    pub generation: u64,
    /// Last outcome that was applied, restored on cancel
    settled: Option<ListState<T>>,
}

impl<T> Default for ListModel<T> {
    fn default() -> Self {
        Self {
            state: ListState::Loading,
            generation: 0,
            settled: None,
        }
    }
}

impl<T> ListModel<T> {
    pub fn settled(&self) -> Option<&ListState<T>> {
        self.settled.as_ref()
    }
}

#[derive(Debug, Clone)]
pub enum ListAction<T> {
    Started { generation: u64 },
    Succeeded { generation: u64, items: Vec<T> },
    Failed { generation: u64, message: String },
    /// Invalidate everything before `generation`
    Cancelled { generation: u64 },
}

impl<T> ListAction<T> {
    pub fn generation(&self) -> u64 {
        match self {
            ListAction::Started { generation }
            | ListAction::Succeeded { generation, .. }
            | ListAction::Failed { generation, .. }
            | ListAction::Cancelled { generation } => *generation,
        }
    }
}

/// Whether `action` would change `model`
pub fn applies<T>(model: &ListModel<T>, action: &ListAction<T>) -> bool {
    match action {
        ListAction::Started { generation } | ListAction::Cancelled { generation } => {
            *generation > model.generation
        }
        ListAction::Succeeded { generation, .. } | ListAction::Failed { generation, .. } => {
            *generation == model.generation
        }
    }
}

/// Pure state transition
pub fn reduce<T: Clone>(model: ListModel<T>, action: ListAction<T>) -> ListModel<T> {
    if !applies(&model, &action) {
        return model;
    }

    match action {
        ListAction::Started { generation } => ListModel {
            state: ListState::Loading,
            generation,
            ..model
        },

        ListAction::Succeeded { items, .. } => {
            let state = ListState::Loaded(items);
            ListModel {
                settled: Some(state.clone()),
                state,
                ..model
            }
        }

        ListAction::Failed { message, .. } => {
            let state = ListState::Failed(message);
            ListModel {
                settled: Some(state.clone()),
                state,
                ..model
            }
        }

        ListAction::Cancelled { generation } => ListModel {
            state: model.settled.clone().unwrap_or(ListState::Loading),
            generation,
            ..model
        },
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct Inner<T> {
    api: ApiClient,
    session: SessionStore,
    shape: Shape,
    endpoint: Mutex<Endpoint>,
    generation: AtomicU64,
    model: watch::Sender<ListModel<T>>,
}

impl<T> Inner<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Apply `action`, reporting whether it was current
    fn dispatch(&self, action: ListAction<T>) -> bool {
        let mut applied = false;
        self.model.send_modify(|model| {
            applied = applies(model, &action);
            *model = reduce(std::mem::take(model), action);
        });
        applied
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    async fn load(&self) -> ApiResult<Vec<T>> {
        let api = self.api.clone();
        let shape = self.shape;
        self.load_with(|endpoint, token| async move {
            api.fetch::<T>(endpoint, shape, token.as_ref()).await
        })
        .await
    }

    async fn load_with<F, Fut>(&self, fetch: F) -> ApiResult<Vec<T>>
    where
        F: FnOnce(Endpoint, Option<BearerToken>) -> Fut,
        Fut: Future<Output = ApiResult<Vec<T>>>,
    {
        let generation = self.next_generation();
        self.dispatch(ListAction::Started { generation });

        let endpoint = lock(&self.endpoint).clone();
        let token = self.session.token();
        let result = fetch(endpoint.clone(), token).await;

        match result {
            Ok(items) => {
                let applied = self.dispatch(ListAction::Succeeded {
                    generation,
                    items: items.clone(),
                });
                if applied {
                    tracing::debug!(endpoint = %endpoint, count = items.len(), "List loaded");
                    Ok(items)
                } else {
                    tracing::debug!(endpoint = %endpoint, generation, "Discarding stale response");
                    Err(ApiError::Cancelled)
                }
            }
            Err(e) => {
                let applied = self.dispatch(ListAction::Failed {
                    generation,
                    message: e.user_message(),
                });
                if applied {
                    tracing::error!(endpoint = %endpoint, error = %e, "Failed to load list");
                    Err(e)
                } else {
                    tracing::debug!(endpoint = %endpoint, generation, "Discarding stale failure");
                    Err(ApiError::Cancelled)
                }
            }
        }
    }
}

/// Loader for one list-shaped screen
pub struct RemoteList<T> {
    inner: Arc<Inner<T>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<T> RemoteList<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    pub fn new(api: ApiClient, session: SessionStore, endpoint: Endpoint, shape: Shape) -> Self {
        let (model, _) = watch::channel(ListModel::default());
        Self {
            inner: Arc::new(Inner {
                api,
                session,
                shape,
                endpoint: Mutex::new(endpoint),
                generation: AtomicU64::new(0),
                model,
            }),
            task: Mutex::new(None),
        }
    }

    /// Fetch the current endpoint and settle the state
    ///
    /// The state goes to `Loading` first, even if a list was shown. Returns
    /// the loaded items, the failure, or `Cancelled` when a newer load or a
    /// [`cancel`](Self::cancel) overtook this one.
    pub async fn load(&self) -> ApiResult<Vec<T>> {
        self.inner.load().await
    }

    /// Like [`load`](Self::load), with a caller-supplied fetch
    ///
    /// `fetch` receives the current endpoint and bearer token. Ordering,
    /// cancellation and error reporting are the same as for a plain load.
    pub async fn load_with<F, Fut>(&self, fetch: F) -> ApiResult<Vec<T>>
    where
        F: FnOnce(Endpoint, Option<BearerToken>) -> Fut,
        Fut: Future<Output = ApiResult<Vec<T>>>,
    {
        self.inner.load_with(fetch).await
    }

    /// Run [`load`](Self::load) in the background
    ///
    /// The task is aborted when the loader is dropped or cancelled.
    pub fn spawn_load(&self) {
        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            let _ = inner.load().await;
        });
        if let Some(previous) = lock(&self.task).replace(handle) {
            previous.abort();
        }
    }

    /// Point the loader at another endpoint; takes effect on the next load
    pub fn set_endpoint(&self, endpoint: Endpoint) {
        *lock(&self.inner.endpoint) = endpoint;
    }

    pub fn endpoint(&self) -> Endpoint {
        lock(&self.inner.endpoint).clone()
    }

    pub fn state(&self) -> ListState<T> {
        self.inner.model.borrow().state.clone()
    }

    /// Loaded items, if the list is settled successfully
    pub fn items(&self) -> Option<Vec<T>> {
        self.inner.model.borrow().state.items().map(<[T]>::to_vec)
    }

    pub fn subscribe(&self) -> watch::Receiver<ListModel<T>> {
        self.inner.model.subscribe()
    }

    /// Apply a local edit to a loaded list
    ///
    /// Returns `false` and does nothing unless the list is `Loaded`.
    pub fn patch<F>(&self, f: F) -> bool
    where
        F: FnOnce(&mut Vec<T>),
    {
        self.inner.model.send_if_modified(|model| match &mut model.state {
            ListState::Loaded(items) => {
                f(items);
                model.settled = Some(model.state.clone());
                true
            }
            _ => false,
        })
    }

    /// Discard whatever request is in flight
    ///
    /// The state falls back to the last settled outcome, or stays `Loading`
    /// if nothing has settled yet.
    pub fn cancel(&self) {
        if let Some(handle) = lock(&self.task).take() {
            handle.abort();
        }
        let generation = self.inner.next_generation();
        self.inner.dispatch(ListAction::Cancelled { generation });
    }
}

impl<T> Drop for RemoteList<T> {
    fn drop(&mut self) {
        if let Some(handle) = lock(&self.task).take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(state: ListState<u32>, generation: u64) -> ListModel<u32> {
        ListModel {
            state,
            generation,
            settled: None,
        }
    }

    #[test]
    fn test_view_mapping() {
        assert_eq!(ListState::<u32>::Loading.view(), View::Spinner);
        assert_eq!(
            ListState::<u32>::Failed("Network request failed".to_string()).view(),
            View::Error("Network request failed")
        );
        assert_eq!(ListState::<u32>::Loaded(vec![]).view(), View::Empty);
        assert_eq!(ListState::Loaded(vec![1, 2]).view(), View::Items(&[1, 2][..]));
    }

    #[test]
    fn test_started_resets_to_loading() {
        let shown = model(ListState::Loaded(vec![1, 2, 3]), 1);
        let next = reduce(shown, ListAction::Started { generation: 2 });
        assert_eq!(next.state, ListState::Loading);
        assert_eq!(next.generation, 2);
    }

    #[test]
    fn test_latest_generation_wins() {
        let m = reduce(ListModel::default(), ListAction::Started { generation: 1 });
        let m = reduce(m, ListAction::Started { generation: 2 });

        let m = reduce(
            m,
            ListAction::Succeeded {
                generation: 2,
                items: vec![20],
            },
        );
        assert_eq!(m.state, ListState::Loaded(vec![20]));

        // The older request finishing later is ignored
        let m = reduce(
            m,
            ListAction::Succeeded {
                generation: 1,
                items: vec![10],
            },
        );
        assert_eq!(m.state, ListState::Loaded(vec![20]));
    }

    #[test]
    fn test_failure_replaces_shown_list() {
        let m = reduce(ListModel::default(), ListAction::Started { generation: 1 });
        let m = reduce(
            m,
            ListAction::Succeeded {
                generation: 1,
                items: vec![1, 2],
            },
        );
        let m = reduce(m, ListAction::Started { generation: 2 });
        let m = reduce(
            m,
            ListAction::Failed {
                generation: 2,
                message: "Network request failed".to_string(),
            },
        );
        assert_eq!(m.state, ListState::Failed("Network request failed".to_string()));
        assert_eq!(m.settled(), Some(&m.state));
    }

    #[test]
    fn test_cancel_restores_settled_state() {
        let m = reduce(ListModel::default(), ListAction::Started { generation: 1 });
        let m = reduce(
            m,
            ListAction::Succeeded {
                generation: 1,
                items: vec![7],
            },
        );
        let m = reduce(m, ListAction::Started { generation: 2 });
        let m = reduce(m, ListAction::Cancelled { generation: 3 });
        assert_eq!(m.state, ListState::Loaded(vec![7]));

        // The cancelled request can no longer land
        let m = reduce(
            m,
            ListAction::Succeeded {
                generation: 2,
                items: vec![8],
            },
        );
        assert_eq!(m.state, ListState::Loaded(vec![7]));
    }

    #[test]
    fn test_cancel_before_anything_settled_stays_loading() {
        let m = reduce(ListModel::<u32>::default(), ListAction::Started { generation: 1 });
        let m = reduce(m, ListAction::Cancelled { generation: 2 });
        assert_eq!(m.state, ListState::Loading);
    }
}
