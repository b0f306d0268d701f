//! Defines the route handler for listing a wallet's ledger entries.

use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
};
use serde::{Deserialize, Serialize};

use crate::{
    Error, database_id::EntryId, error::ValidationErrors, ledger::WalletLedger,
    ledger_entry::LedgerEntry, owner::OwnerId,
};

/// The query parameters for a history request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryParams {
    /// The most entries to return. Uses the configured default if omitted.
    pub limit: Option<u64>,
    /// Only return entries older than the entry with this ID.
    pub before: Option<EntryId>,
}

/// A route handler for the caller's ledger entries, most recent first.
pub async fn get_history_endpoint(
    State(ledger): State<WalletLedger>,
    owner_id: OwnerId,
    params: Result<Query<HistoryParams>, QueryRejection>,
) -> Result<Json<Vec<LedgerEntry>>, Error> {
    let Query(HistoryParams { limit, before }) = params.map_err(|rejection| {
        tracing::warn!("rejected malformed history query: {rejection}");
        ValidationErrors::single(ValidationErrors::NON_FIELD, rejection.body_text())
    })?;

    ledger
        .run(move |ledger| ledger.list_history(owner_id, limit, before))
        .await
        .map(Json)
}

#[cfg(test)]
mod tests {
    use axum::{
        Router,
        http::{HeaderName, HeaderValue, StatusCode},
        routing::get,
    };
    use axum_test::TestServer;
    use rust_decimal_macros::dec;

    use crate::{
        config::LedgerConfig,
        endpoints,
        ledger::test_utils::get_test_ledger,
        ledger_entry::{EntryKind, LedgerEntry, get_history_endpoint},
        owner::{OWNER_ID_HEADER, OwnerId},
    };

    fn get_test_server() -> TestServer {
        let ledger = get_test_ledger(LedgerConfig::default());
        let owner_id = OwnerId::new(5);
        for amount in ["1.00", "2.00", "3.00"] {
            ledger
                .deposit(owner_id, amount.parse().unwrap(), None)
                .unwrap();
        }
        ledger
            .withdraw(owner_id, "0.50".parse().unwrap(), Some("Bus fare"))
            .unwrap();

        let app = Router::new()
            .route(endpoints::TRANSACTIONS, get(get_history_endpoint))
            .with_state(ledger);

        TestServer::new(app)
    }

    fn owner_header() -> (HeaderName, HeaderValue) {
        (
            HeaderName::from_static(OWNER_ID_HEADER),
            HeaderValue::from(5_i64),
        )
    }

    #[tokio::test]
    async fn lists_entries_most_recent_first() {
        let server = get_test_server();
        let (name, value) = owner_header();

        let response = server
            .get(endpoints::TRANSACTIONS)
            .add_header(name, value)
            .await;

        response.assert_status_ok();
        let entries = response.json::<Vec<LedgerEntry>>();
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[0].kind, EntryKind::Withdrawal);
        assert_eq!(entries[0].description, "Bus fare");
        assert_eq!(entries[0].amount, dec!(0.50));
        assert_eq!(entries[3].amount, dec!(1.00));
    }

    #[tokio::test]
    async fn serializes_kind_as_type() {
        let server = get_test_server();
        let (name, value) = owner_header();

        let response = server
            .get(endpoints::TRANSACTIONS)
            .add_query_param("limit", 1)
            .add_header(name, value)
            .await;

        let body = response.json::<serde_json::Value>();
        assert_eq!(body[0]["type"], "withdrawal");
        assert_eq!(body[0]["amount"], "0.50");
    }

    #[tokio::test]
    async fn pages_with_limit_and_cursor() {
        let server = get_test_server();
        let (name, value) = owner_header();

        let first_page = server
            .get(endpoints::TRANSACTIONS)
            .add_query_param("limit", 2)
            .add_header(name.clone(), value.clone())
            .await
            .json::<Vec<LedgerEntry>>();
        let second_page = server
            .get(endpoints::TRANSACTIONS)
            .add_query_param("limit", 2)
            .add_query_param("before", first_page[1].id)
            .add_header(name, value)
            .await
            .json::<Vec<LedgerEntry>>();

        assert_eq!(first_page.len(), 2);
        assert_eq!(second_page.len(), 2);
        assert!(second_page[0].id < first_page[1].id);
    }

    #[tokio::test]
    async fn malformed_limit_is_rejected() {
        let server = get_test_server();
        let (name, value) = owner_header();

        let response = server
            .get(endpoints::TRANSACTIONS)
            .add_query_param("limit", "lots")
            .add_header(name, value)
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn new_owner_has_empty_history() {
        let server = get_test_server();

        let response = server
            .get(endpoints::TRANSACTIONS)
            .add_header(
                HeaderName::from_static(OWNER_ID_HEADER),
                HeaderValue::from(99_i64),
            )
            .await;

        response.assert_status_ok();
        assert!(response.json::<Vec<LedgerEntry>>().is_empty());
    }
}
