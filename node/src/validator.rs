//! The validator loop: the single scheduler that owns [`State`].
//!
//! Each pass checks shutdown, drains a bounded burst of state-advance work,
//! polls the minute-tick queue, then takes one message (timer messages first,
//! then network input) and delivers it. A pass that finds nothing sleeps for
//! the idle delay; that sleep is the loop's only suspension point.

use std::time::Duration;

use dirchain_store::ContentStore;

use crate::queues::LoopQueues;
use crate::shutdown::ShutdownSignal;
use crate::state::State;
use crate::timer::Timer;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    Progress,
    Idle,
    Terminated,
}

pub struct ValidatorLoop<S: ContentStore> {
    state: State<S>,
    timer: Timer,
    queues: LoopQueues,
    shutdown: ShutdownSignal,
    drain_limit: usize,
    idle_delay: Duration,
    terminated: bool,
}

impl<S: ContentStore> ValidatorLoop<S> {
    pub fn new(
        state: State<S>,
        queues: LoopQueues,
        shutdown: ShutdownSignal,
        drain_limit: usize,
        idle_delay: Duration,
    ) -> Self {
        let timer = Timer::new(state.params().last_minute);
        Self {
            state,
            timer,
            queues,
            shutdown,
            drain_limit: drain_limit.max(1),
            idle_delay,
            terminated: false,
        }
    }

    pub fn state(&self) -> &State<S> {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut State<S> {
        &mut self.state
    }

    pub fn into_state(self) -> State<S> {
        self.state
    }

    /// Run one outer pass. Component errors become journaled diagnostics;
    /// this never fails.
    pub fn step(&mut self) -> StepOutcome {
        if self.terminated {
            return StepOutcome::Terminated;
        }
        if self.shutdown.is_triggered() {
            if let Err(e) = self.state.close() {
                tracing::error!(error = %e, "failed to close state on shutdown");
            }
            self.terminated = true;
            tracing::info!(height = self.state.current_height(), "validator loop terminated");
            return StepOutcome::Terminated;
        }

        let mut progress = false;

        for _ in 0..self.drain_limit {
            match self.state.process_next() {
                Ok(true) => progress = true,
                Ok(false) => break,
                Err(e) => {
                    self.state.diagnostic("process", &e);
                    progress = true;
                    break;
                }
            }
        }

        if let Some(minute) = self.queues.try_tick() {
            if let Err(e) = self.timer.on_tick(minute, &mut self.state) {
                self.state.diagnostic("timer", &e);
            }
            progress = true;
        }

        let next = match self.state.pop_timer_message() {
            Some(m) => Some(m),
            None => self.queues.try_inbound(),
        };
        if let Some(message) = next {
            self.state.deliver(message);
            progress = true;
        }

        if progress {
            StepOutcome::Progress
        } else {
            StepOutcome::Idle
        }
    }

    /// Step until shutdown, then hand back the state.
    pub async fn run(mut self) -> State<S> {
        tracing::info!(
            height = self.state.current_height(),
            identity = ?self.state.identity(),
            "validator loop started"
        );
        loop {
            match self.step() {
                StepOutcome::Terminated => return self.state,
                StepOutcome::Idle => tokio::time::sleep(self.idle_delay).await,
                StepOutcome::Progress => tokio::task::yield_now().await,
            }
        }
    }
}
