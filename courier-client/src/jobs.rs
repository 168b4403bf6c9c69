//! Job submission endpoint

use crate::ExecutionClient;
use crate::IDEMPOTENCY_KEY_HEADER;
use crate::error::Result;
use courier_core::dto::submit::{SubmitJobRequest, SubmitJobResponse};

impl ExecutionClient {
    /// Enqueue one job on the execution backend
    ///
    /// The request carries its idempotency key both as a header and in the
    /// body. Submitting the same key twice is expected to be answered with
    /// `409 Conflict` (see [`crate::ClientError::is_duplicate`]).
    pub async fn submit_job(&self, req: &SubmitJobRequest) -> Result<SubmitJobResponse> {
        let url = format!("{}/api/jobs", self.base_url);

        tracing::debug!(
            idempotency_key = %req.idempotency_key,
            kind = %req.kind,
            "Submitting job"
        );

        let response = self
            .client
            .post(&url)
            .header(IDEMPOTENCY_KEY_HEADER, req.idempotency_key.to_string())
            .json(req)
            .send()
            .await?;

        self.handle_response(response).await
    }
}
