use super::*;

impl ConcurrencyDispatcher {
    /// Reserves a slot and starts one execution for a queued message.
    ///
    /// A full counter yields `AtCapacity`. When the executor refuses to
    /// start, the reserved slot is given back before the error is returned.
    pub async fn admit(&self, message: &InboundMessage) -> AppResult<AdmitOutcome> {
        let queue_message = QueueMessage::from_body(message.body.as_str())?;
        let key = self.counter_key();

        self.counter_store.ensure_counter(key).await?;
        if !self
            .counter_store
            .try_increment(key, self.config.limit)
            .await?
        {
            info!(
                workflow_id = %key,
                message_id = %message.message_id,
                limit = self.config.limit.value(),
                "concurrency limit reached, leaving message queued"
            );
            return Ok(AdmitOutcome::AtCapacity);
        }

        let execution_arn = match self
            .executor
            .start_execution(key, message.body.as_str(), message.message_id.as_str())
            .await
        {
            Ok(execution_arn) => execution_arn,
            Err(start_error) => {
                self.give_back_slot(message).await;
                return Err(start_error);
            }
        };

        info!(
            workflow_id = %key,
            message_id = %message.message_id,
            execution_arn = %execution_arn,
            physical_resource_id = %queue_message.physical_resource_id,
            "execution started"
        );

        let record = ExecutionRecord {
            physical_resource_id: queue_message.physical_resource_id,
            execution_arn: execution_arn.clone(),
            request_id: queue_message.request_id,
            recorded_at: Utc::now(),
        };
        if let Err(record_error) = self.record_store.put_record(record).await {
            error!(
                workflow_id = %key,
                execution_arn = %execution_arn,
                error = %record_error,
                "failed to record started execution"
            );
        }

        Ok(AdmitOutcome::Started { execution_arn })
    }

    /// Admits every message independently and reports the ones to redeliver.
    pub async fn admit_batch(&self, messages: &[InboundMessage]) -> AdmitBatchReport {
        let mut report = AdmitBatchReport::default();
        for message in messages {
            match self.admit(message).await {
                Ok(AdmitOutcome::Started { execution_arn }) => {
                    report.started_execution_arns.push(execution_arn);
                }
                Ok(AdmitOutcome::AtCapacity) => {
                    report.failed_message_ids.push(message.message_id.clone());
                }
                Err(admit_error) => {
                    error!(
                        workflow_id = %self.counter_key(),
                        message_id = %message.message_id,
                        error = %admit_error,
                        "failed to admit message"
                    );
                    report.failed_message_ids.push(message.message_id.clone());
                }
            }
        }

        report
    }

    async fn give_back_slot(&self, message: &InboundMessage) {
        match self.counter_store.try_decrement(self.counter_key()).await {
            Ok(true) => {}
            Ok(false) => warn!(
                workflow_id = %self.counter_key(),
                message_id = %message.message_id,
                "counter already at zero while giving back reserved slot"
            ),
            Err(release_error) => error!(
                workflow_id = %self.counter_key(),
                message_id = %message.message_id,
                error = %release_error,
                "failed to give back reserved slot"
            ),
        }
    }
}
