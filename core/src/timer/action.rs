use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use serde::{Deserialize, Serialize};

/// Error type a fallible action may return.
pub type ActionError = Box<dyn std::error::Error + Send + Sync>;

pub(crate) type BoxedAction = Box<dyn Fn() -> Result<(), ActionError> + Send + Sync>;

/// What a run does when its action fails or panics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultPolicy {
    /// Log the fault, count it, and keep the schedule going.
    #[default]
    LogAndContinue,
    /// End the run with `TimerError::ActionFault` on the first fault.
    Propagate,
}

pub(crate) fn infallible<F>(action: F) -> BoxedAction
where
    F: Fn() + Send + Sync + 'static,
{
    Box::new(move || {
        action();
        Ok(())
    })
}

pub(crate) fn fallible<F, E>(action: F) -> BoxedAction
where
    F: Fn() -> Result<(), E> + Send + Sync + 'static,
    E: Into<ActionError>,
{
    Box::new(move || action().map_err(Into::into))
}

/// Invoke the action once, folding a panic into an error message.
pub(crate) fn invoke(action: &BoxedAction) -> Result<(), String> {
    match panic::catch_unwind(AssertUnwindSafe(|| action())) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(e.to_string()),
        Err(payload) => Err(format!("action panicked: {}", panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string payload>"
    }
}
