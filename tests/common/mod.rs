//! Scripted browser session, connector, sink, and clock shared by the
//! integration tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::net::TcpListener as StdTcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use render_snapshot::{EmitReceipt, OutputSink, PollClock, RenderResult, RenderedDocument};
use wd_session::{BrowserSession, ElementId, ElementQuery, SessionConnector, SessionError};

pub const MARKUP: &str = "<head><title>t</title></head><body><main>rendered</main></body>";

/// Answer to one readiness-selector query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Answer {
    Present,
    Absent,
    NoSuchElement,
    Fail,
}

#[derive(Default)]
struct State {
    answers: VecDeque<Answer>,
    navigations: Vec<String>,
    selector_queries: Vec<String>,
    property_reads: usize,
    handle_lookups: usize,
    closes: usize,
}

/// Answers readiness queries from a script; the last answer repeats.
pub struct FakeSession {
    state: Mutex<State>,
    markup: Option<String>,
    fail_navigation: bool,
}

impl FakeSession {
    pub fn scripted(answers: &[Answer]) -> Arc<Self> {
        Self::build(answers, Some(MARKUP.to_string()), false)
    }

    pub fn without_markup(answers: &[Answer]) -> Arc<Self> {
        Self::build(answers, None, false)
    }

    pub fn failing_navigation() -> Arc<Self> {
        Self::build(&[Answer::Absent], Some(MARKUP.to_string()), true)
    }

    fn build(answers: &[Answer], markup: Option<String>, fail_navigation: bool) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(State {
                answers: answers.iter().copied().collect(),
                ..State::default()
            }),
            markup,
            fail_navigation,
        })
    }

    pub fn navigations(&self) -> Vec<String> {
        self.state.lock().navigations.clone()
    }

    pub fn selector_queries(&self) -> usize {
        self.state.lock().selector_queries.len()
    }

    pub fn property_reads(&self) -> usize {
        self.state.lock().property_reads
    }

    /// Queries that asked for an element handle rather than a match count.
    pub fn handle_lookups(&self) -> usize {
        self.state.lock().handle_lookups
    }

    pub fn closes(&self) -> usize {
        self.state.lock().closes
    }

    fn next_answer(&self, selector: &str) -> Answer {
        let mut state = self.state.lock();
        state.selector_queries.push(selector.to_string());
        if state.answers.len() > 1 {
            state.answers.pop_front().unwrap_or(Answer::Absent)
        } else {
            state.answers.front().copied().unwrap_or(Answer::Absent)
        }
    }
}

#[async_trait]
impl BrowserSession for FakeSession {
    async fn navigate(&self, url: &str) -> Result<(), SessionError> {
        self.state.lock().navigations.push(url.to_string());
        if self.fail_navigation {
            return Err(SessionError::Transport("net::ERR_CONNECTION_REFUSED".into()));
        }
        Ok(())
    }

    async fn query(&self, query: &ElementQuery) -> Result<Option<ElementId>, SessionError> {
        self.state.lock().handle_lookups += 1;
        if let ElementQuery::TagName(_) = query {
            return Ok(self.markup.as_ref().map(|_| ElementId::new()));
        }
        Ok(self.count_matches(query).await?.checked_sub(1).map(|_| ElementId::new()))
    }

    async fn count_matches(&self, query: &ElementQuery) -> Result<usize, SessionError> {
        match self.next_answer(query.as_css()) {
            Answer::Present => Ok(1),
            Answer::Absent => Ok(0),
            Answer::NoSuchElement => Err(SessionError::NoSuchElement(query.to_string())),
            Answer::Fail => Err(SessionError::Command("invalid session id".into())),
        }
    }

    async fn property(
        &self,
        _element: ElementId,
        _name: &str,
    ) -> Result<Option<String>, SessionError> {
        self.state.lock().property_reads += 1;
        Ok(self.markup.clone())
    }

    async fn close(&self) -> Result<(), SessionError> {
        self.state.lock().closes += 1;
        Ok(())
    }
}

/// Hands out the same scripted session and counts connects.
pub struct FakeConnector {
    session: Arc<FakeSession>,
    connects: Arc<AtomicUsize>,
    refuse: bool,
}

impl FakeConnector {
    pub fn new(session: Arc<FakeSession>) -> Self {
        Self {
            session,
            connects: Arc::new(AtomicUsize::new(0)),
            refuse: false,
        }
    }

    pub fn refusing(session: Arc<FakeSession>) -> Self {
        Self {
            refuse: true,
            ..Self::new(session)
        }
    }

    /// Shared counter that stays readable after the connector is moved.
    pub fn connect_counter(&self) -> ConnectCounter {
        ConnectCounter(Arc::clone(&self.connects))
    }
}

#[derive(Clone)]
pub struct ConnectCounter(Arc<AtomicUsize>);

impl ConnectCounter {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionConnector for FakeConnector {
    type Session = Arc<FakeSession>;

    async fn connect(&self) -> Result<Self::Session, SessionError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.refuse {
            return Err(SessionError::Start("session not created".into()));
        }
        Ok(Arc::clone(&self.session))
    }
}

/// Keeps every emitted document.
#[derive(Default)]
pub struct RecordingSink {
    pub emitted: Vec<String>,
}

#[async_trait]
impl OutputSink for RecordingSink {
    async fn emit(&mut self, document: RenderedDocument) -> RenderResult<EmitReceipt> {
        let markup = document.into_string();
        let bytes = markup.len();
        self.emitted.push(markup);
        Ok(EmitReceipt {
            destination: self.describe(),
            bytes,
        })
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/// Advances only when the poller sleeps.
pub struct ManualClock {
    origin: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }
}

#[async_trait]
impl PollClock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + *self.offset.lock()
    }

    async fn sleep(&self, duration: Duration) {
        *self.offset.lock() += duration;
    }
}

pub fn free_port() -> u16 {
    StdTcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}
