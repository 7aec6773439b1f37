//! This module runs the single queue worker thread.
//!
//! The queue's ordering guarantees (FIFO among pushes, priority of `push_top`, totally ordered
//! watcher notifications per task) only hold when exactly one thread calls `pop`; per-task
//! internal parallelism is controlled separately by `engine.async_execute` and lives inside the
//! objective runner, not here.
//!

use std::sync::Arc;

use judge::runner::ObjectiveRunner;

use crate::AppContext;

error_chain::error_chain! {
    types {
        Error, ErrorKind, ResultExt, Result;
    }
}

/// Run the worker loop, blocking until the queue is stopped.
pub(crate) fn run(context: Arc<AppContext>) -> Result<()> {
    log::info!("Starting queue worker");

    let disallowed_syscalls = context.config.engine.disallowed_syscall.clone();
    let async_execute = context.config.engine.async_execute;
    let runner = ObjectiveRunner::new(
        &context.compilers,
        &context.scripts,
        disallowed_syscalls,
        async_execute,
    );

    context.queue.launch(&runner, &context.config.engine.temporary_folder);

    log::info!("Queue worker stopped");
    Ok(())
}
