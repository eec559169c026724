//! Task poller
//!
//! Drives one pilot worker through the coordinator protocol: pull a task,
//! run it, report the result, repeat. Empty polls back off exponentially.
//! The loop ends when the coordinator raises the exit flag, the task limit
//! is reached, or the shutdown future resolves; the worker unregisters in
//! every case so a task it still held goes back to the queue.

use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use pilot_client::PilotClient;
use pilot_core::domain::task::TaskResult;
use pilot_core::domain::worker::WorkerProcessId;
use tokio::time::{self, Duration};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::scheduler::backoff::Backoff;
use crate::service::ExecutionService;

const MAX_RETRIES: u32 = 10;
const INITIAL_DELAY_MS: u64 = 500;
const MAX_DELAY_MS: u64 = 30_000;

/// Why the worker left its loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The coordinator raised the exit flag
    ExitFlag,
    /// `max_tasks` tasks were completed
    TaskLimit,
    /// Interrupted by a signal
    Shutdown,
}

/// Task poller that pulls and executes tasks one at a time
pub struct TaskPoller {
    config: Config,
    client: Arc<PilotClient>,
    execution: Arc<dyn ExecutionService>,
    process_id: WorkerProcessId,
}

impl TaskPoller {
    pub fn new(
        config: Config,
        client: Arc<PilotClient>,
        execution: Arc<dyn ExecutionService>,
        process_id: WorkerProcessId,
    ) -> Self {
        Self {
            config,
            client,
            execution,
            process_id,
        }
    }

    /// Runs the worker loop until it is told to stop
    ///
    /// The worker must already be registered.
    pub async fn run(&self, shutdown: impl Future<Output = ()>) -> Result<ExitReason> {
        info!(
            "Starting task poller (poll interval: {:?}, max: {:?})",
            self.config.poll_interval, self.config.max_poll_interval
        );

        let heartbeat = self
            .config
            .heartbeat_interval
            .map(|interval| self.start_heartbeat_loop(interval));

        let outcome = tokio::select! {
            outcome = self.poll_loop() => outcome,
            _ = shutdown => {
                info!("Shutdown requested");
                Ok(ExitReason::Shutdown)
            }
        };

        if let Some(handle) = heartbeat {
            handle.abort();
        }

        self.unregister().await;

        outcome
    }

    async fn poll_loop(&self) -> Result<ExitReason> {
        let mut backoff = Backoff::new(self.config.poll_interval, self.config.max_poll_interval);
        let mut completed: u64 = 0;

        loop {
            debug!("Requesting next task");

            let assignment = match self.client.get_next_task(&self.process_id).await {
                Ok(assignment) => assignment,
                Err(e) if e.is_not_registered() => {
                    warn!("Coordinator no longer knows this worker, registering again");
                    register_with_retry(&self.client, &self.process_id).await?;
                    continue;
                }
                Err(e) if e.is_transport() => {
                    let delay = backoff.next_delay();
                    warn!("Failed to reach coordinator: {}; retrying in {:?}", e, delay);
                    time::sleep(delay).await;
                    continue;
                }
                Err(e) => return Err(e).context("GetNextTask failed"),
            };

            if assignment.exit_flag {
                info!("Coordinator raised the exit flag");
                return Ok(ExitReason::ExitFlag);
            }

            let Some(task) = assignment.task else {
                let delay = backoff.next_delay();
                debug!("No task available, sleeping {:?}", delay);
                time::sleep(delay).await;
                continue;
            };

            backoff.reset();
            info!("Executing task {}", task.task_id);

            let result = self.execution.execute(&task, &self.process_id).await;
            info!(
                "Task {} finished: {}",
                task.task_id,
                if result.success { "success" } else { "failure" }
            );

            self.report(&result).await;
            completed += 1;

            if self.config.max_tasks.is_some_and(|max| completed >= max) {
                info!("Completed {} task(s), reached task limit", completed);
                return Ok(ExitReason::TaskLimit);
            }
        }
    }

    /// Sends a result, retrying while the coordinator is unreachable
    ///
    /// Rejections are logged and dropped: the task was requeued or already
    /// completed, and nothing the worker does can change that.
    async fn report(&self, result: &TaskResult) {
        let mut delay = Duration::from_millis(INITIAL_DELAY_MS);

        for attempt in 1..=MAX_RETRIES {
            match self.client.set_task_result(result).await {
                Ok(()) => return,
                Err(e) if e.is_not_assigned() || e.is_unknown_task() => {
                    warn!("Result for task {} dropped: {}", result.task_id, e);
                    return;
                }
                Err(e) if e.is_transport() && attempt < MAX_RETRIES => {
                    warn!(
                        "Failed to report task {} (attempt {}/{}): {}",
                        result.task_id, attempt, MAX_RETRIES, e
                    );
                    time::sleep(delay).await;
                    delay = (delay * 2).min(Duration::from_millis(MAX_DELAY_MS));
                }
                Err(e) => {
                    error!("Failed to report task {}: {}", result.task_id, e);
                    return;
                }
            }
        }
    }

    async fn unregister(&self) {
        match self.client.unregister_worker(&self.process_id).await {
            Ok(()) => info!("Unregistered from coordinator"),
            Err(e) if e.is_not_registered() => debug!("Worker was already unregistered"),
            Err(e) => warn!("Failed to unregister: {}", e),
        }
    }

    /// Starts a background task that renews the worker's lease
    fn start_heartbeat_loop(&self, interval: Duration) -> tokio::task::JoinHandle<()> {
        let client = Arc::clone(&self.client);
        let process_id = self.process_id.clone();

        tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            // The first tick fires immediately; registration just renewed the lease
            ticker.tick().await;

            loop {
                ticker.tick().await;

                debug!("Sending heartbeat");

                if let Err(e) = client.heartbeat(&process_id).await {
                    warn!("Failed to send heartbeat: {}", e);
                }
            }
        })
    }
}

/// Register with the coordinator with retry logic and exponential backoff
///
/// The coordinator may not be up yet when the pilots start. A response lost
/// in transit can leave the registration in place, so `AlreadyRegistered`
/// after a failed attempt is taken as our own earlier registration.
pub async fn register_with_retry(client: &PilotClient, process_id: &WorkerProcessId) -> Result<()> {
    let mut attempt = 0;
    let mut delay_ms = INITIAL_DELAY_MS;

    loop {
        attempt += 1;

        match client.register_worker(process_id).await {
            Ok(()) => {
                info!(
                    "Registered as {} after {} attempt(s)",
                    process_id.key(),
                    attempt
                );
                return Ok(());
            }
            Err(e) if e.is_already_registered() && attempt > 1 => {
                info!("Registration of {} already recorded", process_id.key());
                return Ok(());
            }
            Err(e) if e.is_transport() && attempt < MAX_RETRIES => {
                warn!(
                    "Failed to register with coordinator (attempt {}/{}): {}",
                    attempt, MAX_RETRIES, e
                );
                warn!("Retrying in {} ms...", delay_ms);

                time::sleep(Duration::from_millis(delay_ms)).await;

                // Exponential backoff with cap
                delay_ms = (delay_ms * 2).min(MAX_DELAY_MS);
            }
            Err(e) => {
                error!(
                    "Failed to register with coordinator after {} attempt(s)",
                    attempt
                );
                return Err(e).with_context(|| format!("Failed to register {}", process_id.key()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::{FunctionRegistry, StandardExecutionService};
    use async_trait::async_trait;
    use axum::{Router, http::StatusCode, routing::post};
    use pilot_coordinator::{api, service::Coordinator, state::KindRouting};
    use pilot_core::codec::{Call, Codec, JsonCodec};
    use pilot_core::domain::task::{TaskDefn, TaskState};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn spawn_coordinator() -> (Arc<Coordinator>, Arc<PilotClient>) {
        let coordinator = Arc::new(Coordinator::new(KindRouting::Strict));
        let app = api::create_router(Arc::clone(&coordinator));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = PilotClient::new(format!("http://{}", addr));
        (coordinator, Arc::new(client))
    }

    fn config() -> Config {
        Config {
            poll_interval: Duration::from_millis(10),
            max_poll_interval: Duration::from_millis(50),
            heartbeat_interval: Some(Duration::from_millis(20)),
            ..Config::default()
        }
    }

    fn poller(config: Config, client: Arc<PilotClient>, name: &str) -> TaskPoller {
        let execution = Arc::new(StandardExecutionService::new(
            Arc::new(JsonCodec),
            FunctionRegistry::with_builtins(),
            config.task_timeout,
        ));
        TaskPoller::new(
            config,
            client,
            execution,
            WorkerProcessId::new("default", name),
        )
    }

    fn submit(coordinator: &Coordinator, id: &str, call: Call) {
        let task = JsonCodec.encode_call(&call).unwrap().into_task(id, "");
        coordinator.submit(task).unwrap();
    }

    #[tokio::test]
    async fn test_runs_tasks_until_exit_flag() {
        let (coordinator, client) = spawn_coordinator().await;
        submit(&coordinator, "t1", Call::new("sum").arg(1).arg(2));
        submit(&coordinator, "t2", Call::new("nope"));
        coordinator.close_submissions();

        let poller = poller(config(), Arc::clone(&client), "w0");
        register_with_retry(&client, &poller.process_id).await.unwrap();

        let reason = poller.run(std::future::pending()).await.unwrap();
        assert_eq!(reason, ExitReason::ExitFlag);

        let t1 = coordinator.poll("t1").unwrap();
        assert_eq!(t1.state, TaskState::Done);
        let value = JsonCodec
            .decode_value(&t1.result.unwrap().return_value.unwrap())
            .unwrap();
        assert_eq!(value, json!(3));

        let t2 = coordinator.poll("t2").unwrap();
        assert_eq!(t2.state, TaskState::Failed);
        assert_eq!(
            t2.result.unwrap().error_id.as_deref(),
            Some("UnknownFunction")
        );

        assert_eq!(coordinator.status().workers, 0);
    }

    #[tokio::test]
    async fn test_task_limit() {
        let (coordinator, client) = spawn_coordinator().await;
        for id in ["t1", "t2", "t3"] {
            submit(&coordinator, id, Call::new("echo").arg(id));
        }

        let config = Config {
            max_tasks: Some(2),
            ..config()
        };
        let poller = poller(config, Arc::clone(&client), "w0");
        register_with_retry(&client, &poller.process_id).await.unwrap();

        let reason = poller.run(std::future::pending()).await.unwrap();
        assert_eq!(reason, ExitReason::TaskLimit);
        assert_eq!(coordinator.status().tasks.done, 2);
        assert_eq!(coordinator.status().tasks.pending, 1);
    }

    #[tokio::test]
    async fn test_shutdown_requeues_running_task() {
        let (coordinator, client) = spawn_coordinator().await;
        submit(&coordinator, "slow", Call::new("sleep").kwarg("seconds", 30));

        let poller = poller(config(), Arc::clone(&client), "w0");
        register_with_retry(&client, &poller.process_id).await.unwrap();

        let reason = poller
            .run(time::sleep(Duration::from_millis(200)))
            .await
            .unwrap();
        assert_eq!(reason, ExitReason::Shutdown);

        let snapshot = coordinator.poll("slow").unwrap();
        assert_eq!(snapshot.state, TaskState::Pending);
        assert_eq!(snapshot.attempts, 1);
        assert_eq!(coordinator.status().workers, 0);
    }

    #[tokio::test]
    async fn test_reregisters_after_eviction() {
        let (coordinator, client) = spawn_coordinator().await;

        let poller = poller(config(), Arc::clone(&client), "w0");
        register_with_retry(&client, &poller.process_id).await.unwrap();
        coordinator
            .evict_worker(&poller.process_id.key())
            .unwrap();

        let coordinator_for_exit = Arc::clone(&coordinator);
        tokio::spawn(async move {
            time::sleep(Duration::from_millis(200)).await;
            coordinator_for_exit.set_exit_flag();
        });

        // The poller registers again, then leaves on the exit flag
        let reason = poller.run(std::future::pending()).await.unwrap();
        assert_eq!(reason, ExitReason::ExitFlag);
    }

    #[tokio::test]
    async fn test_name_collision_is_fatal() {
        let (_coordinator, client) = spawn_coordinator().await;
        let id = WorkerProcessId::new("default", "w0");

        register_with_retry(&client, &id).await.unwrap();
        let err = register_with_retry(&client, &id).await.unwrap_err();
        assert!(err.to_string().contains("Failed to register"));
    }

    /// Evicts its own worker during the first run, then behaves
    struct EvictedMidTask {
        coordinator: Arc<Coordinator>,
        runs: AtomicUsize,
    }

    #[async_trait]
    impl ExecutionService for EvictedMidTask {
        async fn execute(&self, task: &TaskDefn, process_id: &WorkerProcessId) -> TaskResult {
            if self.runs.fetch_add(1, Ordering::SeqCst) == 0 {
                self.coordinator.evict_worker(&process_id.key()).unwrap();
            }
            TaskResult::succeeded(task.task_id.clone(), process_id.clone(), b"null".to_vec())
        }
    }

    #[tokio::test]
    async fn test_result_for_requeued_task_is_dropped() {
        let (coordinator, client) = spawn_coordinator().await;
        submit(&coordinator, "t1", Call::new("echo").arg(1));
        coordinator.close_submissions();

        let execution = Arc::new(EvictedMidTask {
            coordinator: Arc::clone(&coordinator),
            runs: AtomicUsize::new(0),
        });
        let process_id = WorkerProcessId::new("default", "w0");
        let poller = TaskPoller::new(
            config(),
            Arc::clone(&client),
            Arc::clone(&execution) as Arc<dyn ExecutionService>,
            process_id.clone(),
        );
        register_with_retry(&client, &process_id).await.unwrap();

        // The first result is rejected as NotAssigned and dropped; the worker
        // registers again, gets the requeued task and completes it
        let reason = poller.run(std::future::pending()).await.unwrap();
        assert_eq!(reason, ExitReason::ExitFlag);
        assert_eq!(execution.runs.load(Ordering::SeqCst), 2);

        let snapshot = coordinator.poll("t1").unwrap();
        assert_eq!(snapshot.state, TaskState::Done);
        assert_eq!(snapshot.attempts, 2);
    }

    #[tokio::test]
    async fn test_report_retries_unavailable_coordinator() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let app = Router::new().route(
            "/rpc/SetTaskResult",
            post(move || {
                let counter = Arc::clone(&counter);
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        StatusCode::SERVICE_UNAVAILABLE
                    } else {
                        StatusCode::OK
                    }
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = Arc::new(PilotClient::new(format!("http://{}", addr)));
        let poller = poller(config(), client, "w0");
        let result = TaskResult::succeeded("t1", poller.process_id.clone(), b"1".to_vec());

        poller.report(&result).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
