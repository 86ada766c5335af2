//! Asynchronous views for opaque nodes.
//!
//! Each opaque node with a registered renderer gets a view that moves
//! `Pending -> Rendered | Errored`, and back to `Pending` when the node's
//! content attribute changes. Renders run as detached tasks and report back
//! over a channel; a result from a superseded render is discarded. Renderer
//! failures, panics included, stay inside the one view.

use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use n0_future::boxed::BoxFuture;
use n0_future::task::JoinHandle;
use smol_str::SmolStr;
use tokio::sync::mpsc;

use crate::error::RenderError;
use crate::html::{OpaqueBodies, OpaqueBody};
use crate::model::{Document, Node};
use crate::schema::{AttrValue, Attrs, Schema};

/// Produces the visual output for one opaque node kind from its attributes.
pub trait Renderer: Send + Sync + 'static {
    fn render(&self, attrs: Attrs) -> BoxFuture<Result<String, RenderError>>;
}

impl<F, Fut> Renderer for F
where
    F: Fn(Attrs) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<String, RenderError>> + Send + 'static,
{
    fn render(&self, attrs: Attrs) -> BoxFuture<Result<String, RenderError>> {
        Box::pin(self(attrs))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewState {
    Pending,
    Rendered(String),
    Errored(RenderError),
}

fn error_message(error: &RenderError) -> &str {
    match error {
        RenderError::Failed(message) => message,
        RenderError::Panicked => "renderer panicked",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ViewId(u64);

struct View {
    id: ViewId,
    path: Vec<usize>,
    kind: SmolStr,
    content: AttrValue,
    generation: u64,
    state: ViewState,
    task: Option<JoinHandle<()>>,
}

impl View {
    fn abort(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

struct Completed {
    id: ViewId,
    generation: u64,
    result: Result<String, RenderError>,
}

/// The views of one editor session.
pub struct NodeViews {
    renderers: HashMap<SmolStr, Arc<dyn Renderer>>,
    views: Vec<View>,
    results_tx: mpsc::UnboundedSender<Completed>,
    results_rx: mpsc::UnboundedReceiver<Completed>,
    next_id: u64,
    next_generation: u64,
    destroyed: bool,
}

impl Default for NodeViews {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for NodeViews {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<_> = self.renderers.keys().collect();
        kinds.sort();
        f.debug_struct("NodeViews")
            .field("renderers", &kinds)
            .field("views", &self.views.len())
            .field("destroyed", &self.destroyed)
            .finish()
    }
}

impl NodeViews {
    pub fn new() -> Self {
        let (results_tx, results_rx) = mpsc::unbounded_channel();
        Self {
            renderers: HashMap::new(),
            views: Vec::new(),
            results_tx,
            results_rx,
            next_id: 0,
            next_generation: 0,
            destroyed: false,
        }
    }

    /// Register the renderer for an opaque node kind, replacing any previous
    /// one. Takes effect at the next [`reconcile`](Self::reconcile).
    pub fn register(&mut self, kind: impl Into<SmolStr>, renderer: impl Renderer) {
        let kind = kind.into();
        tracing::debug!(target: "inkpad::node_view", %kind, "renderer registered");
        self.renderers.insert(kind.clone(), Arc::new(renderer));
        // Views of this kind were rendered by the old renderer.
        for view in self.views.iter_mut().filter(|view| view.kind == kind) {
            view.abort();
        }
        self.views.retain(|view| view.kind != kind);
    }

    pub fn has_renderer(&self, kind: &str) -> bool {
        self.renderers.contains_key(kind)
    }

    /// Bring views in line with `doc`.
    ///
    /// An opaque node whose kind and content attribute match an existing
    /// view keeps that view, even when it moved. A node at the same path
    /// whose content changed is re-rendered. Views without a node are
    /// abandoned.
    pub fn reconcile(&mut self, schema: &Schema, doc: &Document) {
        if self.destroyed {
            return;
        }
        let mut old: Vec<Option<View>> = self.views.drain(..).map(Some).collect();
        let mut views = Vec::new();

        for (path, node) in doc.opaque_nodes(schema) {
            if !self.renderers.contains_key(node.kind()) {
                continue;
            }
            let content = content_of(schema, node);

            let unchanged = old.iter().position(|view| {
                view.as_ref()
                    .is_some_and(|view| view.kind == node.kind() && view.content == content)
            });
            if let Some(mut view) = unchanged.and_then(|at| old[at].take()) {
                view.path = path;
                views.push(view);
                continue;
            }

            let same_place = old.iter().position(|view| {
                view.as_ref()
                    .is_some_and(|view| view.kind == node.kind() && view.path == path)
            });
            let mut view = match same_place.and_then(|at| old[at].take()) {
                Some(mut view) => {
                    tracing::trace!(target: "inkpad::node_view", kind = node.kind(), ?path, "content changed");
                    view.abort();
                    view.content = content;
                    view
                }
                None => {
                    self.next_id += 1;
                    View {
                        id: ViewId(self.next_id),
                        path,
                        kind: node.kind_name().clone(),
                        content,
                        generation: 0,
                        state: ViewState::Pending,
                        task: None,
                    }
                }
            };
            self.start_render(&mut view, node.attrs().clone());
            views.push(view);
        }

        for mut view in old.into_iter().flatten() {
            tracing::trace!(target: "inkpad::node_view", kind = %view.kind, "view removed");
            view.abort();
        }
        self.views = views;
    }

    fn start_render(&mut self, view: &mut View, attrs: Attrs) {
        let Some(renderer) = self.renderers.get(&view.kind).cloned() else {
            return;
        };
        self.next_generation += 1;
        let generation = self.next_generation;
        view.generation = generation;
        view.state = ViewState::Pending;

        let render = match std::panic::catch_unwind(AssertUnwindSafe(|| renderer.render(attrs))) {
            Ok(render) => render,
            Err(_) => {
                tracing::warn!(target: "inkpad::node_view", kind = %view.kind, "renderer panicked");
                view.state = ViewState::Errored(RenderError::Panicked);
                return;
            }
        };
        let tx = self.results_tx.clone();
        let id = view.id;
        view.task = Some(n0_future::task::spawn(async move {
            let result = match AssertUnwindSafe(render).catch_unwind().await {
                Ok(result) => result,
                Err(_) => Err(RenderError::Panicked),
            };
            // The receiver is gone once the session is dropped.
            let _ = tx.send(Completed {
                id,
                generation,
                result,
            });
        }));
    }

    fn apply(&mut self, done: Completed) -> bool {
        let Some(view) = self.views.iter_mut().find(|view| view.id == done.id) else {
            return false;
        };
        if view.generation != done.generation {
            tracing::trace!(target: "inkpad::node_view", kind = %view.kind, "discarded stale render");
            return false;
        }
        view.task = None;
        view.state = match done.result {
            Ok(output) => ViewState::Rendered(output),
            Err(error) => {
                tracing::warn!(target: "inkpad::node_view", kind = %view.kind, %error, "render failed");
                ViewState::Errored(error)
            }
        };
        true
    }

    /// Apply finished renders without waiting. Returns whether any view
    /// changed state.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        while let Ok(done) = self.results_rx.try_recv() {
            changed |= self.apply(done);
        }
        changed
    }

    fn has_pending(&self) -> bool {
        self.views
            .iter()
            .any(|view| view.state == ViewState::Pending && view.task.is_some())
    }

    /// Wait until no view is pending.
    pub async fn settle(&mut self) {
        self.poll();
        while self.has_pending() {
            match self.results_rx.recv().await {
                Some(done) => {
                    self.apply(done);
                }
                None => break,
            }
        }
    }

    pub fn state_at(&self, path: &[usize]) -> Option<&ViewState> {
        self.views
            .iter()
            .find(|view| view.path == path)
            .map(|view| &view.state)
    }

    /// Every view with its node path, in document order.
    pub fn states(&self) -> impl Iterator<Item = (&[usize], &ViewState)> {
        self.views.iter().map(|view| (view.path.as_slice(), &view.state))
    }

    /// Abandon all in-flight renders. Later reconciles do nothing.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        tracing::debug!(target: "inkpad::node_view", views = self.views.len(), "destroying node views");
        for view in &mut self.views {
            view.abort();
        }
        self.views.clear();
        self.destroyed = true;
    }
}

impl Drop for NodeViews {
    fn drop(&mut self) {
        for view in &mut self.views {
            view.abort();
        }
    }
}

impl OpaqueBodies for NodeViews {
    fn opaque_body(&self, path: &[usize]) -> Option<OpaqueBody<'_>> {
        Some(match self.state_at(path)? {
            ViewState::Pending => OpaqueBody::Pending,
            ViewState::Rendered(output) => OpaqueBody::Rendered(output),
            ViewState::Errored(error) => OpaqueBody::Errored(error_message(error)),
        })
    }
}

/// Value of the attribute whose change triggers a re-render.
fn content_of(schema: &Schema, node: &Node) -> AttrValue {
    schema
        .node_kind(node.kind())
        .ok()
        .and_then(|kind| kind.opaque.as_ref())
        .and_then(|attr| node.attr(attr))
        .cloned()
        .unwrap_or(AttrValue::Null)
}
