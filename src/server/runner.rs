use std::sync::Arc;

use futures::{channel::mpsc::Receiver, StreamExt};
use tokio::task::JoinSet;
use tracing::Instrument;

use crate::event::InboundEvent;
use crate::workflow::CherryPicker;

/// Handle every received event in its own task until the sender disconnects,
/// then wait for the tasks still running.
pub(crate) async fn runner(mut receiver: Receiver<InboundEvent>, picker: Arc<CherryPicker>) {
    let mut tasks = JoinSet::new();
    loop {
        tokio::select! {
            Some(event) = receiver.next() => {
                let span = tracing::info_span!(
                    "handle_event",
                    repo = %event.repo(),
                    number = event.number(),
                );
                tasks.spawn(handle_event(picker.clone(), event).instrument(span));
            }
            Some(res) = tasks.join_next(), if !tasks.is_empty() => {
                if let Err(error) = res {
                    tracing::error!("Event handler died: {error}");
                }
            }
            else => break,
        }
    }
}

async fn handle_event(picker: Arc<CherryPicker>, event: InboundEvent) {
    if let Err(error) = picker.handle(event).await {
        tracing::error!("{error}");
    }
}
