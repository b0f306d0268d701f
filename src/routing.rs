//! Application router configuration.

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;

use crate::{
    AppState, Error, endpoints,
    ledger::{deposit_endpoint, reconcile_endpoint, withdraw_endpoint},
    ledger_entry::get_history_endpoint,
    wallet::{get_balance_endpoint, provision_wallet_endpoint},
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(endpoints::HEALTH, get(get_health))
        .route(endpoints::WALLETS, post(provision_wallet_endpoint))
        .route(endpoints::BALANCE, get(get_balance_endpoint))
        .route(endpoints::DEPOSIT, post(deposit_endpoint))
        .route(endpoints::WITHDRAW, post(withdraw_endpoint))
        .route(endpoints::TRANSACTIONS, get(get_history_endpoint))
        .route(endpoints::RECONCILE, get(reconcile_endpoint))
        .fallback(get_404_not_found)
        .with_state(state)
}

/// Report that the server is up.
async fn get_health() -> Response {
    (StatusCode::OK, Json(json!({ "status": "ok" }))).into_response()
}

async fn get_404_not_found() -> Error {
    Error::NotFound
}

#[cfg(test)]
mod tests {
    use axum::http::{HeaderName, HeaderValue, StatusCode};
    use axum_test::TestServer;
    use rusqlite::Connection;
    use serde_json::{Value, json};

    use crate::{AppState, build_router, config::LedgerConfig, endpoints, owner::OWNER_ID_HEADER};

    fn get_test_server() -> TestServer {
        let connection =
            Connection::open_in_memory().expect("Could not open in-memory SQLite database");
        let state = AppState::new(connection, LedgerConfig::default())
            .expect("Could not create app state");

        TestServer::new(build_router(state))
    }

    fn owner_header(owner_id: i64) -> (HeaderName, HeaderValue) {
        (
            HeaderName::from_static(OWNER_ID_HEADER),
            HeaderValue::from(owner_id),
        )
    }

    #[tokio::test]
    async fn health_check_succeeds() {
        let server = get_test_server();

        server.get(endpoints::HEALTH).await.assert_status_ok();
    }

    #[tokio::test]
    async fn unknown_route_is_json_not_found() {
        let server = get_test_server();

        let response = server.get("/api/nope").await;

        response.assert_status_not_found();
        assert_eq!(response.json::<Value>(), json!({"error": "Not found"}));
    }

    #[tokio::test]
    async fn wallet_routes_require_owner() {
        let server = get_test_server();

        for path in [
            endpoints::BALANCE,
            endpoints::TRANSACTIONS,
            endpoints::RECONCILE,
        ] {
            server
                .get(path)
                .await
                .assert_status(StatusCode::UNAUTHORIZED);
        }
    }

    #[tokio::test]
    async fn full_wallet_flow() {
        let server = get_test_server();
        let (name, value) = owner_header(1);

        let balance = server
            .get(endpoints::BALANCE)
            .add_header(name.clone(), value.clone())
            .await
            .json::<Value>();
        assert_eq!(balance["balance"], "0.00");
        assert_eq!(balance["currency"], "GHS");

        let deposit = server
            .post(endpoints::DEPOSIT)
            .add_header(name.clone(), value.clone())
            .json(&json!({"amount": "50.00"}))
            .await
            .json::<Value>();
        assert_eq!(deposit, json!({"message": "Deposit successful", "balance": "50.00"}));

        let withdrawal = server
            .post(endpoints::WITHDRAW)
            .add_header(name.clone(), value.clone())
            .json(&json!({"amount": "20.00"}))
            .await
            .json::<Value>();
        assert_eq!(
            withdrawal,
            json!({"message": "Withdrawal successful", "balance": "30.00"})
        );

        let rejected = server
            .post(endpoints::WITHDRAW)
            .add_header(name.clone(), value.clone())
            .json(&json!({"amount": "100.00"}))
            .await;
        rejected.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(rejected.json::<Value>(), json!({"error": "Insufficient balance"}));

        let history = server
            .get(endpoints::TRANSACTIONS)
            .add_header(name.clone(), value.clone())
            .await
            .json::<Value>();
        assert_eq!(history.as_array().map(Vec::len), Some(2));
        assert_eq!(history[0]["type"], "withdrawal");
        assert_eq!(history[0]["description"], "Withdrawal");
        assert_eq!(history[1]["type"], "deposit");

        let report = server
            .get(endpoints::RECONCILE)
            .add_header(name, value)
            .await
            .json::<Value>();
        assert_eq!(report["balance"], "30.00");
        assert_eq!(report["ledger_sum"], "30.00");
        assert_eq!(report["entry_count"], 2);
        assert_eq!(report["consistent"], true);
    }

    #[tokio::test]
    async fn owners_do_not_share_wallets() {
        let server = get_test_server();
        let (name, alice) = owner_header(1);
        let (_, bob) = owner_header(2);

        server
            .post(endpoints::DEPOSIT)
            .add_header(name.clone(), alice)
            .json(&json!({"amount": "10"}))
            .await
            .assert_status_ok();

        let balance = server
            .get(endpoints::BALANCE)
            .add_header(name, bob)
            .await
            .json::<Value>();
        assert_eq!(balance["balance"], "0.00");
    }
}
