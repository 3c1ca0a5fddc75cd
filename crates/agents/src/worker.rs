//! Agent worker: consumes task messages, dispatches to a role, publishes
//! the completion or failure reply.

use futures::StreamExt;
use lapin::message::Delivery;
use lapin::options::{BasicAckOptions, BasicConsumeOptions, BasicNackOptions};
use lapin::types::FieldTable;
use lapin::Channel;

use optiflow_broker::gateway::{self, Broker};
use optiflow_core::config::BrokerSettings;
use optiflow_core::error::Result;
use optiflow_core::messages::{AgentResultMessage, TaskMessage};

use crate::registry::AgentRegistry;

/// Long-running consumer of the agent in-queue.
pub struct AgentWorker {
    registry: AgentRegistry,
    settings: BrokerSettings,
}

impl AgentWorker {
    pub fn new(registry: AgentRegistry, settings: BrokerSettings) -> Self {
        Self { registry, settings }
    }

    /// Consume until the process is stopped, reconnecting with backoff on
    /// connection loss.
    pub async fn run(&self) -> Result<()> {
        loop {
            let broker = Broker::connect(
                &self.settings,
                &[
                    &self.settings.in_queue_agent,
                    &self.settings.out_queue_agent,
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
                    &self.settings.in_queue_agent,
                    "agent-worker",
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

            tracing::info!(queue = %self.settings.in_queue_agent, "waiting for tasks");

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
        // Malformed messages get no reply; there is no jobId to answer to.
        let task: TaskMessage = match serde_json::from_slice(&delivery.data) {
            Ok(task) => task,
            Err(e) => {
                tracing::warn!(error = %e, "rejecting unparsable task");
                reject(&delivery).await;
                return;
            }
        };
        if let Err(e) = task.validate() {
            tracing::warn!(error = %e, "rejecting incomplete task");
            reject(&delivery).await;
            return;
        }

        tracing::info!(
            job_id = %task.job_id,
            agent_type = %task.agent_type,
            history = task.conversation_history.len(),
            "got task"
        );

        let Some(agent) = self.registry.lookup(&task.agent_type) else {
            tracing::warn!(agent_type = %task.agent_type, "no agent for role, rejecting");
            reject(&delivery).await;
            return;
        };

        match agent.run(&task).await {
            Ok(payload) => {
                let reply =
                    AgentResultMessage::completed(&task.job_id, &task.agent_type, payload);
                match self.publish_reply(channel, &reply).await {
                    Ok(()) => {
                        tracing::info!(job_id = %task.job_id, "task completed");
                        if let Err(e) = delivery.ack(BasicAckOptions::default()).await {
                            tracing::warn!(error = %e, "ack failed");
                        }
                    }
                    Err(e) => {
                        tracing::error!(job_id = %task.job_id, error = %e, "reply publish failed");
                        reject(&delivery).await;
                    }
                }
            }
            Err(e) => {
                tracing::error!(job_id = %task.job_id, error = %e, "task failed");
                let reply =
                    AgentResultMessage::failed(&task.job_id, &task.agent_type, e.to_string());
                // Best effort; the nack below is what settles the message.
                if let Err(publish_err) = self.publish_reply(channel, &reply).await {
                    tracing::error!(
                        job_id = %task.job_id,
                        error = %publish_err,
                        "failure reply publish failed"
                    );
                }
                reject(&delivery).await;
            }
        }
    }

    async fn publish_reply(&self, channel: &Channel, reply: &AgentResultMessage) -> Result<()> {
        gateway::publish_persistent(
            channel,
            &self.settings.out_queue_agent,
            &serde_json::to_vec(reply)?,
        )
        .await
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
