use crate::infra::{apply_removals, build_opening, AppState, OpeningInputs, RemovalTally};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use opening_admittance::config::validate_threshold;
use opening_admittance::error::AppError;
use opening_admittance::workflows::admittance::{
    AdmissionSummary, ConfirmedDuplicates, Opening, OpeningReport, TimeslotSpec,
};
use opening_admittance::workflows::registrations::{
    ConfirmedDuplicatesImporter, PeopleColumns, PeopleTable, RegistrationImporter,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::io::Cursor;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct AdmittanceRunRequest {
    /// `NAME=CAPACITY` or `NAME`, in the same form as the CLI.
    pub(crate) timeslots: Vec<String>,
    pub(crate) registrations_csv: String,
    #[serde(default)]
    pub(crate) ban_list_csv: Option<String>,
    /// Timeslot name to a name,email CSV of people barred from it.
    #[serde(default)]
    pub(crate) disallowed_csv: BTreeMap<String, String>,
    #[serde(default)]
    pub(crate) confirmed_duplicates_csv: Option<String>,
    #[serde(default)]
    pub(crate) cancellations_csv: Option<String>,
    #[serde(default)]
    pub(crate) late_bans_csv: Option<String>,
    #[serde(default)]
    pub(crate) similarity_threshold: Option<f64>,
}

#[derive(Debug, Serialize)]
pub(crate) struct AdmittanceRunResponse {
    pub(crate) admission: AdmissionSummary,
    pub(crate) cancellations: RemovalTally,
    pub(crate) late_bans: RemovalTally,
    pub(crate) report: OpeningReport,
}

pub(crate) fn router() -> axum::Router {
    axum::Router::new()
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/admittance/run",
            axum::routing::post(admittance_run_endpoint),
        )
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn admittance_run_endpoint(
    Extension(state): Extension<AppState>,
    Json(payload): Json<AdmittanceRunRequest>,
) -> Result<Json<AdmittanceRunResponse>, AppError> {
    let AdmittanceRunRequest {
        timeslots,
        registrations_csv,
        ban_list_csv,
        disallowed_csv,
        confirmed_duplicates_csv,
        cancellations_csv,
        late_bans_csv,
        similarity_threshold,
    } = payload;

    if timeslots.is_empty() {
        return Err(AppError::InvalidRequest(
            "at least one timeslot is required".to_string(),
        ));
    }

    let mut settings = (*state.admittance).clone();
    if let Some(threshold) = similarity_threshold {
        settings.similarity_threshold = validate_threshold(threshold)
            .map_err(|err| AppError::InvalidRequest(err.to_string()))?;
    }

    let timeslots = timeslots
        .iter()
        .map(|raw| raw.parse::<TimeslotSpec>())
        .collect::<Result<Vec<_>, _>>()?;
    let registrations = RegistrationImporter::from_reader(
        Cursor::new(registrations_csv.into_bytes()),
        &settings.timestamp_format,
    )?;
    let ban_list = people_table(ban_list_csv)?;
    let disallowed = disallowed_csv
        .into_iter()
        .map(|(timeslot, csv)| people_table(Some(csv)).map(|people| (timeslot, people)))
        .collect::<Result<Vec<_>, _>>()?;
    let confirmed = match confirmed_duplicates_csv {
        Some(csv) => ConfirmedDuplicatesImporter::from_reader(Cursor::new(csv.into_bytes()))?,
        None => ConfirmedDuplicates::new(),
    };
    let cancellations = people_table(cancellations_csv)?;
    let late_bans = people_table(late_bans_csv)?;

    let mut opening = build_opening(
        OpeningInputs {
            timeslots,
            ban_list,
            disallowed,
            confirmed,
        },
        settings.preprocessor(),
    )?;

    let admission = opening.auto_admit(registrations);
    let cancellations = apply_removals(&mut opening, cancellations, Opening::cancel);
    let late_bans = apply_removals(&mut opening, late_bans, Opening::ban);

    Ok(Json(AdmittanceRunResponse {
        admission,
        cancellations,
        late_bans,
        report: OpeningReport::from_opening(&opening),
    }))
}

fn people_table(csv: Option<String>) -> Result<PeopleTable, AppError> {
    match csv {
        Some(csv) => Ok(PeopleTable::from_reader(
            Cursor::new(csv.into_bytes()),
            PeopleColumns::PLAIN,
        )?),
        None => Ok(PeopleTable::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use opening_admittance::config::AdmittanceConfig;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use tower::ServiceExt;

    const REGISTRATIONS: &str = "Timestamp,Email,Name,Timeslots\n\
18/08/2022 18:04:40,katemccoy@gmail.com,Kate Mccoy,\"10:00 - 11:00, 11:00 - 12:00\"\n\
18/08/2022 18:04:41,barrettingram@gmail.com,Barrett Ingram,10:00 - 11:00\n\
18/08/2022 18:04:42,zaydenjenkins@gmail.com,Zayden Jenkins,\"10:00 - 11:00, 11:00 - 12:00\"\n\
18/08/2022 18:04:43,zaydenjenkins@gmail.con,Zayden Jenkins,11:00 - 12:00\n";

    fn state(ready: bool) -> AppState {
        AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
            admittance: Arc::new(AdmittanceConfig::default()),
        }
    }

    fn request() -> AdmittanceRunRequest {
        AdmittanceRunRequest {
            timeslots: vec!["10:00 - 11:00=2".to_string(), "11:00 - 12:00".to_string()],
            registrations_csv: REGISTRATIONS.to_string(),
            ..AdmittanceRunRequest::default()
        }
    }

    async fn post_json(body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        let response = router()
            .layer(Extension(state(true)))
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/admittance/run")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .expect("request builds"),
            )
            .await
            .expect("router responds");

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body reads");
        let value = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn admittance_run_endpoint_returns_report() {
        let Json(body) = admittance_run_endpoint(Extension(state(true)), Json(request()))
            .await
            .expect("run succeeds");

        assert_eq!(body.admission.admitted, 4);
        assert_eq!(body.report.timeslots[0].spots_taken, 2);
        assert_eq!(body.report.timeslots[1].capacity, None);
        assert!(body.report.waiting_list.is_empty());
        assert!(body
            .report
            .remarked
            .iter()
            .any(|entry| entry.email == "zaydenjenkins@gmail.con"));
    }

    #[tokio::test]
    async fn admittance_run_endpoint_applies_cancellations() {
        let mut request = request();
        request.cancellations_csv =
            Some("Name,Email\nKate Mccoy,katemccoy@gmail.com\n".to_string());

        let Json(body) = admittance_run_endpoint(Extension(state(true)), Json(request))
            .await
            .expect("run succeeds");

        assert_eq!(body.cancellations.removed, 1);
        assert!(body.cancellations.not_found.is_empty());
        assert_eq!(body.report.totals.cancelled, 1);
        assert_eq!(body.report.timeslots[0].spots_taken, 1);
    }

    #[tokio::test]
    async fn unknown_cancellations_and_bans_are_reported() {
        let (status, body) = post_json(json!({
            "timeslots": ["10:00 - 11:00=2", "11:00 - 12:00"],
            "registrations_csv": REGISTRATIONS,
            "cancellations_csv": "Name,Email\nHarald Rex,harald.rex@example.org\n",
            "late_bans_csv": "Name,Email\nBarrett Ingram,barrettingram@gmail.com\n",
        }))
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["cancellations"]["removed"], 0);
        assert_eq!(
            body["cancellations"]["not_found"][0]["email"],
            "harald.rex@example.org"
        );
        assert_eq!(body["late_bans"]["removed"], 1);
        assert_eq!(body["late_bans"]["not_found"], json!([]));
        assert_eq!(body["report"]["totals"]["cancelled"], 0);
    }

    #[tokio::test]
    async fn invalid_threshold_is_rejected() {
        let mut request = request();
        request.similarity_threshold = Some(1.5);

        let error = admittance_run_endpoint(Extension(state(true)), Json(request))
            .await
            .expect_err("threshold rejected");
        assert!(matches!(error, AppError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn malformed_registrations_return_bad_request() {
        let (status, body) = post_json(json!({
            "timeslots": ["a=5"],
            "registrations_csv": "Timestamp,Email,Name,Timeslots\nyesterday,a@example.org,Anna First,a\n",
        }))
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let message = body["error"].as_str().expect("error message");
        assert!(message.contains("row 1"));
    }

    #[tokio::test]
    async fn malformed_timeslot_returns_bad_request() {
        let (status, body) = post_json(json!({
            "timeslots": ["a=many"],
            "registrations_csv": "Timestamp,Email,Name,Timeslots\n",
        }))
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn health_and_readiness_respond() {
        let response = router()
            .layer(Extension(state(false)))
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::OK);

        let response = router()
            .layer(Extension(state(false)))
            .oneshot(
                Request::builder()
                    .uri("/ready")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
