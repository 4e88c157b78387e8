//! # Navigation
//!
//! The view stack and the transitions between kubeswitch's pages.
//!
//! ```text
//! ContextList ──select──▶ Decision ──switch context──▶ Confirmation ──ack──▶ exit
//!     ▲  ▲                  │  │
//!     │  └──cancel / esc────┘  └──switch namespace──▶ NamespaceList ──select──▶ Confirmation ──ack──▶ exit
//!     └─────────────────────────esc──────────────────────────┘
//! ```
//!
//! `Navigator::plan` maps the focused page and an event to an `Outcome`
//! without touching anything. `Navigator::apply` then runs the outcome:
//! the commit (mutation, invariant check, save) first, the view change
//! second. A failed save returns before the stack moves.

use std::fmt;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use ks_core::{Category, Classifier, ConfigStore, CoreError, CoreResult, KubeConfig, NamespaceProvider};

/// A view on the stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Page {
    /// All contexts, the base of every stack.
    ContextList,
    /// Cancel / switch context / switch namespace for one context.
    Decision { context: String, guarded: bool },
    /// Namespaces offered for one context.
    NamespaceList {
        context: String,
        namespaces: Vec<String>,
    },
    /// Result of a committed switch; acknowledging it ends the run.
    Confirmation { message: String },
}

impl Page {
    /// Text shown by modal pages.
    pub fn message(&self) -> Option<String> {
        match self {
            Self::Decision {
                context,
                guarded: true,
            } => Some(format!(
                "Warning: You are switching to a PRODUCTION context: {context}\nAre you sure?"
            )),
            Self::Decision { context, .. } => {
                Some(format!("Context: {context}\nWhat would you like to do?"))
            }
            Self::Confirmation { message } => Some(message.clone()),
            Self::ContextList | Self::NamespaceList { .. } => None,
        }
    }
}

/// Buttons of the decision modal, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    Cancel,
    SwitchContext,
    SwitchNamespace,
}

impl Choice {
    pub const ALL: [Choice; 3] = [Choice::Cancel, Choice::SwitchContext, Choice::SwitchNamespace];

    pub fn label(self) -> &'static str {
        match self {
            Self::Cancel => "Cancel",
            Self::SwitchContext => "Switch Context",
            Self::SwitchNamespace => "Switch Namespace",
        }
    }
}

/// Input delivered to the navigator. Contexts and namespaces are named,
/// never addressed by list position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    SelectContext(String),
    Choose(Choice),
    SelectNamespace(String),
    /// Escape.
    Back,
    Acknowledge,
    /// Ctrl-C; honoured on every page.
    Interrupt,
}

/// A change to the document that must be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    SetCurrentContext(String),
    SetNamespace { context: String, namespace: String },
}

impl Mutation {
    fn apply(&self, config: &mut KubeConfig) -> CoreResult<()> {
        match self {
            Self::SetCurrentContext(name) => config.set_current_context(name),
            Self::SetNamespace { context, namespace } => config.set_namespace(context, namespace),
        }
    }
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SetCurrentContext(name) => write!(f, "current-context = {name}"),
            Self::SetNamespace { context, namespace } => {
                write!(f, "{context}.namespace = {namespace}")
            }
        }
    }
}

/// Why the run ended. Both end with exit status 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    Switched,
    Cancelled,
}

/// What happens to the view stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewOp {
    Stay,
    Push(Page),
    /// Pop the focused page and push another in its place.
    Replace(Page),
    Pop,
    Exit(ExitReason),
}

/// Planned reaction to one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub commit: Option<Mutation>,
    pub view: ViewOp,
}

impl Outcome {
    fn view(view: ViewOp) -> Self {
        Self { commit: None, view }
    }

    fn stay() -> Self {
        Self::view(ViewOp::Stay)
    }

    fn commit_then(mutation: Mutation, view: ViewOp) -> Self {
        Self {
            commit: Some(mutation),
            view,
        }
    }
}

/// Whether the driver keeps reading events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit(ExitReason),
}

static BASE_PAGE: Page = Page::ContextList;

/// Stack of pages above the context list. The top is focused and the
/// context list itself can never be popped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewStack {
    overlays: Vec<Page>,
}

impl ViewStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// The page receiving input.
    pub fn focused(&self) -> &Page {
        self.overlays.last().unwrap_or(&BASE_PAGE)
    }

    pub fn push(&mut self, page: Page) {
        self.overlays.push(page);
    }

    /// Remove the focused page, returning focus to the one beneath.
    pub fn pop(&mut self) -> Option<Page> {
        self.overlays.pop()
    }

    pub fn replace_top(&mut self, page: Page) {
        self.overlays.pop();
        self.overlays.push(page);
    }

    pub fn depth(&self) -> usize {
        self.overlays.len() + 1
    }

    /// Pages bottom to top, starting with the context list.
    pub fn pages(&self) -> impl Iterator<Item = &Page> {
        std::iter::once(&BASE_PAGE).chain(self.overlays.iter())
    }
}

/// A context as listed on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextRow {
    pub name: String,
    pub category: Category,
}

/// Contexts of `config` in display order, sorted by name.
pub fn context_rows(config: &KubeConfig, classifier: &dyn Classifier) -> Vec<ContextRow> {
    let mut rows: Vec<ContextRow> = config
        .context_names()
        .map(|name| ContextRow {
            name: name.to_string(),
            category: classifier.classify(name),
        })
        .collect();
    rows.sort_by(|a, b| a.name.cmp(&b.name));
    rows
}

/// Owns the document and the view stack and reacts to events.
pub struct Navigator {
    config: KubeConfig,
    path: PathBuf,
    rows: Vec<ContextRow>,
    stack: ViewStack,
    classifier: Box<dyn Classifier>,
    namespaces: Box<dyn NamespaceProvider>,
}

impl Navigator {
    /// Build the initial context list. Display order is fixed here and kept
    /// for the rest of the run.
    pub fn new(
        config: KubeConfig,
        path: PathBuf,
        classifier: Box<dyn Classifier>,
        namespaces: Box<dyn NamespaceProvider>,
    ) -> Self {
        let rows = context_rows(&config, classifier.as_ref());
        Self {
            config,
            path,
            rows,
            stack: ViewStack::new(),
            classifier,
            namespaces,
        }
    }

    pub fn config(&self) -> &KubeConfig {
        &self.config
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rows(&self) -> &[ContextRow] {
        &self.rows
    }

    pub fn stack(&self) -> &ViewStack {
        &self.stack
    }

    pub fn focused(&self) -> &Page {
        self.stack.focused()
    }

    /// Decide how the focused page reacts to `event`. Pure.
    pub fn plan(&self, event: &Event) -> Outcome {
        if *event == Event::Interrupt {
            return Outcome::view(ViewOp::Exit(ExitReason::Cancelled));
        }

        match (self.stack.focused(), event) {
            (Page::ContextList, Event::SelectContext(name)) => {
                if !self.config.contains(name) {
                    warn!("ignoring selection of unknown context '{name}'");
                    return Outcome::stay();
                }
                let guarded = self.classifier.classify(name) == Category::Production;
                Outcome::view(ViewOp::Push(Page::Decision {
                    context: name.clone(),
                    guarded,
                }))
            }
            (Page::Decision { .. }, Event::Choose(Choice::Cancel) | Event::Back) => {
                Outcome::view(ViewOp::Pop)
            }
            (Page::Decision { context, .. }, Event::Choose(Choice::SwitchContext)) => {
                Outcome::commit_then(
                    Mutation::SetCurrentContext(context.clone()),
                    ViewOp::Replace(Page::Confirmation {
                        message: format!("Switched to context: {context}"),
                    }),
                )
            }
            (Page::Decision { context, .. }, Event::Choose(Choice::SwitchNamespace)) => {
                let list = Page::NamespaceList {
                    context: context.clone(),
                    namespaces: self.namespaces.namespaces(context),
                };
                if self.config.is_current(context) {
                    Outcome::view(ViewOp::Replace(list))
                } else {
                    Outcome::commit_then(
                        Mutation::SetCurrentContext(context.clone()),
                        ViewOp::Replace(list),
                    )
                }
            }
            (
                Page::NamespaceList {
                    context,
                    namespaces,
                },
                Event::SelectNamespace(namespace),
            ) => {
                if !namespaces.contains(namespace) {
                    warn!("ignoring namespace '{namespace}' not offered for '{context}'");
                    return Outcome::stay();
                }
                Outcome::commit_then(
                    Mutation::SetNamespace {
                        context: context.clone(),
                        namespace: namespace.clone(),
                    },
                    ViewOp::Push(Page::Confirmation {
                        message: format!(
                            "Switched namespace to: {namespace} in context: {context}"
                        ),
                    }),
                )
            }
            (Page::NamespaceList { .. }, Event::Back) => Outcome::view(ViewOp::Pop),
            (Page::Confirmation { .. }, Event::Acknowledge | Event::Back) => {
                Outcome::view(ViewOp::Exit(ExitReason::Switched))
            }
            (page, event) => {
                debug!("{event:?} has no effect on {page:?}");
                Outcome::stay()
            }
        }
    }

    /// Run a planned outcome: commit first, then move the stack.
    pub fn apply(&mut self, outcome: Outcome, store: &dyn ConfigStore) -> CoreResult<Flow> {
        if let Some(mutation) = outcome.commit {
            self.commit(&mutation, store)?;
        }

        match outcome.view {
            ViewOp::Stay => {}
            ViewOp::Push(page) => self.stack.push(page),
            ViewOp::Replace(page) => self.stack.replace_top(page),
            ViewOp::Pop => {
                self.stack.pop();
            }
            ViewOp::Exit(reason) => {
                info!("exiting: {reason:?}");
                return Ok(Flow::Exit(reason));
            }
        }
        debug!("focused page: {:?}", self.stack.focused());
        Ok(Flow::Continue)
    }

    /// Plan and apply one event.
    pub fn dispatch(&mut self, event: Event, store: &dyn ConfigStore) -> CoreResult<Flow> {
        debug!("event: {event:?}");
        let outcome = self.plan(&event);
        self.apply(outcome, store)
    }

    fn commit(&mut self, mutation: &Mutation, store: &dyn ConfigStore) -> CoreResult<()> {
        // Plans only name contexts that exist, so a rejected mutation is a bug.
        mutation
            .apply(&mut self.config)
            .map_err(|err| CoreError::Invariant(err.to_string()))?;
        self.config.verify()?;
        store.save(&self.config, &self.path)?;
        info!("committed {mutation} to {}", self.path.display());
        Ok(())
    }
}
