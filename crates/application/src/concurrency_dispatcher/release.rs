use super::*;

impl ConcurrencyDispatcher {
    /// Releases the slot held by a finished execution and reroutes failed work.
    ///
    /// A decrement refused by the counter means the notification was already
    /// handled, so nothing is rerouted. Reroute send failures are logged and
    /// reported in the outcome without failing the release.
    pub async fn release(
        &self,
        notification: &CompletionNotification,
    ) -> AppResult<ReleaseOutcome> {
        if !notification.status.is_terminal() {
            return Err(AppError::Validation(format!(
                "execution '{}' has not finished, status is {}",
                notification.execution_arn, notification.status
            )));
        }

        let key = self.counter_key();
        if !self.counter_store.try_decrement(key).await? {
            warn!(
                workflow_id = %key,
                execution_arn = %notification.execution_arn,
                status = %notification.status,
                "counter already at zero, ignoring completion"
            );
            return Ok(ReleaseOutcome::AlreadyReleased);
        }

        if notification.status.is_success() {
            info!(
                workflow_id = %key,
                execution_arn = %notification.execution_arn,
                "execution succeeded, slot released"
            );
            return Ok(ReleaseOutcome::Released);
        }

        warn!(
            workflow_id = %key,
            execution_arn = %notification.execution_arn,
            status = %notification.status,
            error = notification.error.as_deref().unwrap_or_default(),
            cause = notification.cause.as_deref().unwrap_or_default(),
            "execution did not succeed"
        );

        let message = match notification.original_message() {
            Ok(message) => message,
            Err(parse_error) => {
                error!(
                    workflow_id = %key,
                    execution_arn = %notification.execution_arn,
                    error = %parse_error,
                    "cannot recover work from execution input"
                );
                return Ok(ReleaseOutcome::RerouteFailed {
                    reason: parse_error.to_string(),
                });
            }
        };

        if self.config.requeue_on_failure {
            let delay_seconds = rand::rng().random_range(self.config.requeue_delay.range());
            return Ok(
                match self.work_queue.send_message(&message, delay_seconds).await {
                    Ok(message_id) => {
                        info!(
                            workflow_id = %key,
                            message_id = %message_id,
                            delay_seconds,
                            "failed work requeued"
                        );
                        ReleaseOutcome::Requeued { delay_seconds }
                    }
                    Err(send_error) => self.reroute_failed(notification, send_error),
                },
            );
        }

        Ok(match self.dead_letter_queue.send_message(&message, 0).await {
            Ok(message_id) => {
                info!(
                    workflow_id = %key,
                    message_id = %message_id,
                    "failed work moved to dead-letter queue"
                );
                ReleaseOutcome::DeadLettered
            }
            Err(send_error) => self.reroute_failed(notification, send_error),
        })
    }

    fn reroute_failed(
        &self,
        notification: &CompletionNotification,
        send_error: AppError,
    ) -> ReleaseOutcome {
        error!(
            workflow_id = %self.counter_key(),
            execution_arn = %notification.execution_arn,
            error = %send_error,
            "failed to reroute work"
        );

        ReleaseOutcome::RerouteFailed {
            reason: send_error.to_string(),
        }
    }
}
