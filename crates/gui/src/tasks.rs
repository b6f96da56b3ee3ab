#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::sync::mpsc::Sender;
use std::sync::Arc;

use formant_api::{DataApi, ListQuery};
use formant_core::RecordId;
use formant_fields::FetchPlan;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::model::FieldUpdate;

/// Run a paged list query in the background and report back over the
/// update channel. In-flight requests are not cancelled when superseded;
/// the generation stamp lets the receiver drop stale results instead.
pub(crate) fn start_page_fetch(
    api: Arc<dyn DataApi>,
    tx: Sender<FieldUpdate>,
    field: String,
    endpoint: String,
    plan: FetchPlan,
    filters: BTreeMap<String, String>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let query = ListQuery {
            search: plan.query.clone(),
            offset: plan.offset,
            limit: plan.limit,
            filters,
        };
        debug!(field = %field, endpoint = %endpoint, search = %query.search, offset = query.offset, "field: page fetch");
        match api.list(&endpoint, &query).await {
            Ok(records) => {
                let full_page = records.len() >= plan.limit;
                let _ = tx.send(FieldUpdate::PageLoaded {
                    field,
                    generation: plan.generation,
                    records,
                    full_page,
                });
            }
            Err(e) => {
                warn!(field = %field, endpoint = %endpoint, error = %e, "field: page fetch failed");
                let _ = tx.send(FieldUpdate::PageFailed {
                    field,
                    generation: plan.generation,
                    error: e.to_string(),
                });
            }
        }
    })
}

/// Resolve a single record by identifier, for reconciling an externally
/// bound foreign-key value. Failure is reported as `record: None`.
pub(crate) fn start_record_fetch(
    api: Arc<dyn DataApi>,
    tx: Sender<FieldUpdate>,
    field: String,
    endpoint: String,
    id: RecordId,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        debug!(field = %field, endpoint = %endpoint, id = %id, "field: record fetch");
        let record = match api.retrieve(&endpoint, &id).await {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(field = %field, endpoint = %endpoint, id = %id, error = %e, "field: record fetch failed");
                None
            }
        };
        let _ = tx.send(FieldUpdate::RecordResolved { field, id, record });
    })
}
