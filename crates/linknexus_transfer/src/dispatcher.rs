use std::sync::Arc;

use chrono::Utc;
use linknexus_contract::error::megabytes;
use linknexus_contract::{
    normalize, HistoryLog, HistoryRecord, SentMessage, TransferError, TransferLink,
    TransferOutcome, TransferPath, TransferPlan, TransferRequest,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::direct::{DirectExecutor, SELF_HOSTED_LIMIT_BYTES};
use crate::progress::ProgressReporter;
use crate::relayed::RelayedExecutor;
use crate::selector::select;

pub const MAX_TRANSFER_BYTES: u64 = SELF_HOSTED_LIMIT_BYTES;

#[derive(Clone)]
pub struct Dispatcher {
    direct: DirectExecutor,
    relayed: RelayedExecutor,
    history: Arc<dyn HistoryLog>,
}

impl Dispatcher {
    pub fn new(
        direct: DirectExecutor,
        relayed: RelayedExecutor,
        history: Arc<dyn HistoryLog>,
    ) -> Self {
        Self {
            direct,
            relayed,
            history,
        }
    }

    pub async fn dispatch(
        &self,
        request: &TransferRequest,
        progress: &ProgressReporter,
    ) -> TransferOutcome {
        self.run(request, progress, None).await
    }

    /// Like [`Dispatcher::dispatch`], but abandons the in-flight upload when
    /// `cancel` fires. An aborted transfer is reported as a network error and
    /// never reaches the history log.
    pub async fn dispatch_cancellable(
        &self,
        request: &TransferRequest,
        progress: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> TransferOutcome {
        self.run(request, progress, Some(cancel)).await
    }

    async fn run(
        &self,
        request: &TransferRequest,
        progress: &ProgressReporter,
        cancel: Option<&CancellationToken>,
    ) -> TransferOutcome {
        check_applicable(request)?;

        let plan = select(&request.credentials, request.media_kind);
        info!(
            file = %request.file_name,
            path = ?plan.path,
            operation = plan.operation.method_name(),
            size = request.file_size_bytes,
            "dispatching transfer with at-most-once semantics"
        );

        let transfer = self.execute(request, plan, progress);
        let executed = match cancel {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => Err(TransferError::Network(
                    "transfer aborted before the platform replied".to_string(),
                )),
                result = transfer => result,
            },
            None => transfer.await,
        };

        let message = executed.inspect_err(|err| {
            warn!(file = %request.file_name, kind = ?err.kind(), error = %err, "transfer failed");
        })?;

        let link = normalize(&message);
        self.record(request, &link).await;
        Ok(link)
    }

    async fn execute(
        &self,
        request: &TransferRequest,
        plan: TransferPlan,
        progress: &ProgressReporter,
    ) -> Result<SentMessage, TransferError> {
        match plan.path {
            TransferPath::Direct => {
                self.direct
                    .execute(request, plan.operation, &request.credentials, progress)
                    .await
            }
            TransferPath::Relayed => {
                self.relayed
                    .execute(request, plan.operation.type_tag(), progress)
                    .await
            }
        }
    }

    async fn record(&self, request: &TransferRequest, link: &TransferLink) {
        let record = HistoryRecord {
            filename: request.file_name.clone(),
            file_type: request.media_kind,
            link: link.link.clone(),
            file_id: Some(link.file_id.clone()).filter(|id| !id.is_empty()),
            timestamp: Utc::now().timestamp_millis(),
            size: request.file_size_bytes,
        };

        // the link is already usable, so a history failure only gets logged
        if let Err(err) = self.history.append(record).await {
            warn!(file = %request.file_name, error = %err, "failed to append history record");
        }
    }
}

fn check_applicable(request: &TransferRequest) -> Result<(), TransferError> {
    if request.file_size_bytes > MAX_TRANSFER_BYTES {
        return Err(TransferError::oversize(
            MAX_TRANSFER_BYTES,
            format!(
                "file is {} MB; uploads are capped at {} MB, the most a self-hosted Bot API server accepts",
                megabytes(request.file_size_bytes),
                megabytes(MAX_TRANSFER_BYTES)
            ),
        ));
    }
    Ok(())
}
