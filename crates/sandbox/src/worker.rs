//! Sandbox worker: consumes code jobs, runs them, publishes results.

use futures::StreamExt;
use lapin::message::Delivery;
use lapin::options::{BasicAckOptions, BasicConsumeOptions, BasicNackOptions};
use lapin::types::FieldTable;
use lapin::Channel;

use optiflow_broker::gateway::{self, Broker};
use optiflow_core::config::BrokerSettings;
use optiflow_core::error::Result;
use optiflow_core::messages::SandboxJobMessage;

use crate::engine::CodeSandbox;

/// Long-running consumer of the sandbox in-queue. Holds exactly one
/// [`CodeSandbox`]; construction of that sandbox is fail-fast in the binary
/// so a broken worker never sits around silently failing every job.
pub struct SandboxWorker {
    sandbox: CodeSandbox,
    settings: BrokerSettings,
}

impl SandboxWorker {
    pub fn new(sandbox: CodeSandbox, settings: BrokerSettings) -> Self {
        Self { sandbox, settings }
    }

    /// Consume until the process is stopped. Connection loss re-enters the
    /// connect-with-backoff loop; the in-flight delivery stays unacked and
    /// is redelivered by the broker.
    pub async fn run(&self) -> Result<()> {
        loop {
            let broker = Broker::connect(
                &self.settings,
                &[
                    &self.settings.in_queue_sandbox,
                    &self.settings.out_queue_sandbox,
                ],
            )
            .await;

            if let Err(e) = broker.set_prefetch_one().await {
                tracing::warn!(error = %e, "prefetch setup failed, reconnecting");
                continue;
            }

            let mut consumer = match broker
                .channel()
                .basic_consume(
                    &self.settings.in_queue_sandbox,
                    "sandbox-worker",
                    BasicConsumeOptions::default(),
                    FieldTable::default(),
                )
                .await
            {
                Ok(consumer) => consumer,
                Err(e) => {
                    tracing::warn!(error = %e, "consume failed, reconnecting");
                    continue;
                }
            };

            tracing::info!(queue = %self.settings.in_queue_sandbox, "waiting for code jobs");

            while let Some(delivery) = consumer.next().await {
                match delivery {
                    Ok(delivery) => self.handle(broker.channel(), delivery).await,
                    Err(e) => {
                        tracing::warn!(error = %e, "delivery failed");
                        break;
                    }
                }
            }

            tracing::warn!("broker connection lost, reconnecting");
        }
    }

    async fn handle(&self, channel: &Channel, delivery: Delivery) {
        let job: SandboxJobMessage = match serde_json::from_slice(&delivery.data) {
            Ok(job) => job,
            Err(e) => {
                tracing::warn!(error = %e, "rejecting unparsable code job");
                reject(&delivery).await;
                return;
            }
        };

        if job.job_id.is_empty() || job.code.is_empty() {
            tracing::warn!("rejecting code job without jobId or code");
            reject(&delivery).await;
            return;
        }

        tracing::info!(job_id = %job.job_id, "got code job");

        let outcome = self.sandbox.run(&job.code).await;

        let reply_to = reply_target(
            job.response_queue.as_deref(),
            &self.settings.out_queue_sandbox,
        )
        .to_string();
        let reply = outcome.into_message(job.job_id.clone());

        match self.publish_reply(channel, &reply_to, &reply).await {
            Ok(()) => {
                tracing::info!(job_id = %job.job_id, queue = %reply_to, "published result");
                if let Err(e) = delivery.ack(BasicAckOptions::default()).await {
                    tracing::warn!(error = %e, "ack failed");
                }
            }
            Err(e) => {
                // The caller's own deadline surfaces this as a timeout.
                tracing::error!(job_id = %job.job_id, error = %e, "result publish failed");
                reject(&delivery).await;
            }
        }
    }

    async fn publish_reply(
        &self,
        channel: &Channel,
        reply_to: &str,
        reply: &optiflow_core::messages::SandboxResultMessage,
    ) -> Result<()> {
        // Exclusive caller-owned queues must not be redeclared; the caller
        // controls their lifecycle.
        if !is_caller_owned(reply_to) {
            gateway::declare_durable(channel, reply_to).await?;
        }
        gateway::publish_persistent(channel, reply_to, &serde_json::to_vec(reply)?).await
    }
}

async fn reject(delivery: &Delivery) {
    if let Err(e) = delivery
        .nack(BasicNackOptions {
            requeue: false,
            ..Default::default()
        })
        .await
    {
        tracing::warn!(error = %e, "nack failed");
    }
}

/// Pick the queue a result goes to.
fn reply_target<'a>(requested: Option<&'a str>, default: &'a str) -> &'a str {
    match requested {
        Some(queue) if !queue.is_empty() => queue,
        _ => default,
    }
}

/// Server-named exclusive queues carry the `amq.gen-` prefix.
fn is_caller_owned(queue: &str) -> bool {
    queue.starts_with("amq.gen-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_goes_to_requested_queue_when_present() {
        assert_eq!(
            reply_target(Some("amq.gen-xyz"), "code_results_queue"),
            "amq.gen-xyz"
        );
        assert_eq!(reply_target(None, "code_results_queue"), "code_results_queue");
        assert_eq!(reply_target(Some(""), "code_results_queue"), "code_results_queue");
    }

    #[test]
    fn caller_owned_queues_are_recognized() {
        assert!(is_caller_owned("amq.gen-JzTY20BRgKO-HjmUJj0wLg"));
        assert!(!is_caller_owned("code_results_queue"));
    }
}
