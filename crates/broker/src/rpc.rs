//! RPC-style sandbox calls over the broker.
//!
//! A shared results queue with several consumers would race: a consumer not
//! expecting a sandbox reply could ack-and-drop it. Each call therefore
//! declares its own server-named, exclusive, auto-delete queue and tells the
//! sandbox worker to reply there. Correlation is by queue identity; the
//! `jobId` check below is a defensive second layer.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::StreamExt;
use lapin::{
    options::{BasicAckOptions, BasicConsumeOptions, BasicNackOptions, QueueDeclareOptions},
    types::FieldTable,
    Channel, Connection, ConnectionProperties,
};

use optiflow_core::config::BrokerSettings;
use optiflow_core::error::{Error, Result};
use optiflow_core::messages::{SandboxJobMessage, SandboxResultMessage};
use optiflow_core::traits::SandboxExecutor;

use crate::gateway::{self, amqp_addr};

/// How long a caller waits for the sandbox reply before giving up.
const RPC_TIMEOUT: Duration = Duration::from_secs(60);

/// Granularity of the reply poll loop.
const POLL_SLICE: Duration = Duration::from_secs(1);

/// Broker-backed [`SandboxExecutor`]. One connection per call; the
/// exclusive reply queue dies with it.
#[derive(Clone)]
pub struct SandboxRpcClient {
    settings: BrokerSettings,
}

impl SandboxRpcClient {
    pub fn new(settings: BrokerSettings) -> Self {
        Self { settings }
    }

    async fn call(&self, connection: &Connection, job_id: &str, code: &str) -> Result<SandboxResultMessage> {
        let channel = connection
            .create_channel()
            .await
            .map_err(|e| Error::broker(format!("channel open failed: {}", e)))?;

        gateway::declare_durable(&channel, &self.settings.in_queue_sandbox).await?;

        // Server-named private reply queue, gone once the connection closes.
        let reply_queue = channel
            .queue_declare(
                "",
                QueueDeclareOptions {
                    exclusive: true,
                    auto_delete: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| Error::broker(format!("reply queue declare failed: {}", e)))?;
        let reply_queue_name = reply_queue.name().as_str().to_string();

        let job = SandboxJobMessage {
            job_id: job_id.to_string(),
            code: code.to_string(),
            response_queue: Some(reply_queue_name.clone()),
        };
        gateway::publish_persistent(
            &channel,
            &self.settings.in_queue_sandbox,
            &serde_json::to_vec(&job)?,
        )
        .await?;

        tracing::info!(
            job_id = %job_id,
            reply_queue = %reply_queue_name,
            "submitted code to sandbox"
        );

        self.await_reply(&channel, &reply_queue_name, job_id).await
    }

    /// Consume the private queue until the matching reply arrives or the
    /// deadline passes. Foreign jobIds are requeued; with an exclusive queue
    /// that should never happen, but a requeue is recoverable and a drop is
    /// not.
    async fn await_reply(
        &self,
        channel: &Channel,
        reply_queue: &str,
        job_id: &str,
    ) -> Result<SandboxResultMessage> {
        let mut consumer = channel
            .basic_consume(
                reply_queue,
                "sandbox-rpc",
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| Error::broker(format!("consume on reply queue failed: {}", e)))?;

        let deadline = Instant::now() + RPC_TIMEOUT;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(Error::RpcTimeout(job_id.to_string()));
            }

            let delivery = match tokio::time::timeout(POLL_SLICE.min(remaining), consumer.next())
                .await
            {
                Err(_) => continue,
                Ok(None) => {
                    return Err(Error::broker("reply consumer closed unexpectedly"));
                }
                Ok(Some(Err(e))) => {
                    return Err(Error::broker(format!("reply delivery failed: {}", e)));
                }
                Ok(Some(Ok(delivery))) => delivery,
            };

            let reply: SandboxResultMessage = match serde_json::from_slice(&delivery.data) {
                Ok(reply) => reply,
                Err(e) => {
                    tracing::warn!(error = %e, "undecodable message on reply queue");
                    delivery
                        .nack(BasicNackOptions {
                            requeue: false,
                            ..Default::default()
                        })
                        .await
                        .map_err(|e| Error::broker(format!("nack failed: {}", e)))?;
                    continue;
                }
            };

            if reply.job_id == job_id {
                delivery
                    .ack(BasicAckOptions::default())
                    .await
                    .map_err(|e| Error::broker(format!("ack failed: {}", e)))?;
                tracing::info!(job_id = %job_id, status = ?reply.status, "got sandbox result");
                return Ok(reply);
            }

            tracing::warn!(
                expected = %job_id,
                got = %reply.job_id,
                "foreign jobId on private reply queue, requeueing"
            );
            delivery
                .nack(BasicNackOptions {
                    requeue: true,
                    ..Default::default()
                })
                .await
                .map_err(|e| Error::broker(format!("nack failed: {}", e)))?;
        }
    }
}

#[async_trait]
impl SandboxExecutor for SandboxRpcClient {
    async fn execute(&self, job_id: &str, code: &str) -> Result<SandboxResultMessage> {
        let connection = Connection::connect(
            &amqp_addr(&self.settings),
            ConnectionProperties::default(),
        )
        .await
        .map_err(|e| Error::broker(format!("connect failed: {}", e)))?;

        let result = self.call(&connection, job_id, code).await;

        // The exclusive reply queue is auto-deleted with the connection.
        if let Err(e) = connection.close(0, "rpc done").await {
            tracing::debug!(error = %e, "rpc connection close failed");
        }

        result
    }
}
