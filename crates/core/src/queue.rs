use crate::command::Command;
use std::{
    mem::take,
    sync::{Arc, Condvar, Mutex},
};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    #[error("the other end of the command queue is gone")]
    Disconnected,
}

/// Create a single producer, single consumer command queue.
///
/// The producer pushes commands without blocking and hands a whole frame over with
/// [`CommandSender::submit`], which waits until the consumer has taken it.
pub fn channel() -> (CommandSender, CommandReceiver) {
    let shared = Arc::new(Shared {
        state: Mutex::new(State {
            commands: Vec::new(),
            queued: false,
            producer_alive: true,
            consumer_alive: true,
        }),
        cond: Condvar::new(),
    });

    (
        CommandSender {
            shared: shared.clone(),
        },
        CommandReceiver { shared },
    )
}

struct Shared {
    state: Mutex<State>,
    cond: Condvar,
}

struct State {
    commands: Vec<Command>,
    /// A submitted frame is waiting for the consumer
    queued: bool,
    producer_alive: bool,
    consumer_alive: bool,
}

pub struct CommandSender {
    shared: Arc<Shared>,
}

impl CommandSender {
    /// Append a command to the frame being recorded.
    pub fn push(&self, command: Command) {
        let mut state = self.shared.state.lock().unwrap();
        state.commands.push(command);
    }

    /// Number of commands recorded and not yet taken by the consumer
    pub fn pending(&self) -> usize {
        self.shared.state.lock().unwrap().commands.len()
    }

    /// Hand the recorded commands to the consumer and block until it has taken them.
    pub fn submit(&self) -> Result<(), QueueError> {
        let mut state = self.shared.state.lock().unwrap();
        if !state.consumer_alive {
            return Err(QueueError::Disconnected);
        }

        debug!(commands = state.commands.len(), "submitting frame");
        state.queued = true;
        self.shared.cond.notify_all();

        while state.queued {
            if !state.consumer_alive {
                return Err(QueueError::Disconnected);
            }
            state = self.shared.cond.wait(state).unwrap();
        }

        Ok(())
    }
}

impl Drop for CommandSender {
    fn drop(&mut self) {
        let mut state = self.shared.state.lock().unwrap();
        state.producer_alive = false;
        self.shared.cond.notify_all();
    }
}

pub struct CommandReceiver {
    shared: Arc<Shared>,
}

impl CommandReceiver {
    /// Block until a frame is submitted and take all of its commands.
    ///
    /// Fails once the producer is gone and nothing is left to take.
    pub fn recv(&self) -> Result<Vec<Command>, QueueError> {
        let mut state = self.shared.state.lock().unwrap();
        loop {
            if state.queued {
                let commands = take(&mut state.commands);
                state.queued = false;
                self.shared.cond.notify_all();
                return Ok(commands);
            }

            if !state.producer_alive {
                return Err(QueueError::Disconnected);
            }

            state = self.shared.cond.wait(state).unwrap();
        }
    }

    /// Take a submitted frame if there is one, without blocking.
    pub fn try_recv(&self) -> Result<Option<Vec<Command>>, QueueError> {
        let mut state = self.shared.state.lock().unwrap();
        if state.queued {
            let commands = take(&mut state.commands);
            state.queued = false;
            self.shared.cond.notify_all();
            return Ok(Some(commands));
        }

        if state.producer_alive {
            Ok(None)
        } else {
            Err(QueueError::Disconnected)
        }
    }
}

impl Drop for CommandReceiver {
    fn drop(&mut self) {
        let mut state = self.shared.state.lock().unwrap();
        state.consumer_alive = false;
        self.shared.cond.notify_all();
    }
}
