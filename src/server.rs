use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use std::sync::Arc;

use crate::agent::{FETCH_FAILED_ANSWER, WeatherAgent};
use crate::models::AskResponse;

#[derive(Debug, Deserialize)]
pub struct AskParams {
    pub question: String,
}

/// Build the HTTP router. When `bearer_token` is set every route except `/health` requires it.
pub fn router(agent: Arc<WeatherAgent>, bearer_token: Option<String>) -> Router {
    let mut router = Router::new()
        .route("/api/ask", get(ask))
        .route("/api/test", get(raw_forecast))
        .with_state(agent);

    if let Some(expected) = bearer_token {
        router = router.layer(middleware::from_fn_with_state(
            Arc::new(expected),
            require_bearer,
        ));
    }

    router.route("/health", get(|| async { "ok" }))
}

async fn ask(
    State(agent): State<Arc<WeatherAgent>>,
    Query(params): Query<AskParams>,
) -> Json<AskResponse> {
    let answer = agent.ask(&params.question).await;
    Json(AskResponse {
        question: params.question,
        answer,
    })
}

/// Raw forecast document for the default city, for checking provider connectivity
async fn raw_forecast(
    State(agent): State<Arc<WeatherAgent>>,
    Query(params): Query<AskParams>,
) -> Json<AskResponse> {
    let coordinate = agent.resolver().table().default_coordinate();
    let answer = match agent.forecast().fetch(coordinate).await {
        Ok(body) => body,
        Err(e) => {
            tracing::error!("[test] forecast call failed: {}", e);
            FETCH_FAILED_ANSWER.to_string()
        }
    };
    Json(AskResponse {
        question: params.question,
        answer,
    })
}

fn is_authorized(req: &Request<Body>, expected: &str) -> bool {
    let headers: &HeaderMap = req.headers();
    let bearer_ok = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {expected}"));
    if bearer_ok {
        return true;
    }

    // Fallback for clients that cannot set headers: access_token or token query parameter
    req.uri().query().is_some_and(|q| {
        q.split('&').any(|pair| {
            pair.split_once('=')
                .is_some_and(|(k, v)| (k == "access_token" || k == "token") && v == expected)
        })
    })
}

async fn require_bearer(
    State(expected): State<Arc<String>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if !is_authorized(&req, expected.as_str()) {
        return (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
    }
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::error::AgentError;
    use crate::forecast::MockForecastSource;
    use crate::test_support::MockTransport;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_agent(forecast: MockForecastSource, replies: Vec<Result<&str, &str>>) -> Arc<WeatherAgent> {
        Arc::new(
            WeatherAgent::with_collaborators(
                &Config::default(),
                Arc::new(MockTransport::new(replies)),
                Arc::new(forecast),
            )
            .unwrap(),
        )
    }

    async fn body_json(response: Response) -> AskResponse {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_ask_returns_question_and_answer() {
        let mut forecast = MockForecastSource::new();
        forecast.expect_fetch().never();
        let agent = test_agent(
            forecast,
            vec![Ok(r#"{"intent":"chitchat","city":""}"#), Ok("ยินดีครับ")],
        );

        let response = router(agent, None)
            .oneshot(get_request("/api/ask?question=%E0%B8%82%E0%B8%AD%E0%B8%9A%E0%B8%84%E0%B8%B8%E0%B8%93"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body.question, "ขอบคุณ");
        assert_eq!(body.answer, "ยินดีครับ");
    }

    #[tokio::test]
    async fn test_failures_still_return_ok() {
        let mut forecast = MockForecastSource::new();
        forecast
            .expect_fetch()
            .returning(|_| Err(AgentError::Fetch("down".to_string())));
        let agent = test_agent(forecast, vec![]);

        let response = router(agent, None)
            .oneshot(get_request("/api/ask?question=weather"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await.answer, FETCH_FAILED_ANSWER);
    }

    #[tokio::test]
    async fn test_raw_forecast_probe() {
        let mut forecast = MockForecastSource::new();
        forecast
            .expect_fetch()
            .returning(|_| Ok(r#"{"properties":{}}"#.to_string()));
        let agent = test_agent(forecast, vec![]);

        let response = router(agent, None)
            .oneshot(get_request("/api/test?question=ping"))
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body.question, "ping");
        assert_eq!(body.answer, r#"{"properties":{}}"#);
    }

    #[tokio::test]
    async fn test_bearer_token_guard() {
        let make = || {
            let mut forecast = MockForecastSource::new();
            forecast.expect_fetch().never();
            router(
                test_agent(forecast, vec![Ok(r#"{"intent":"chitchat"}"#), Ok("hi")]),
                Some("secret".to_string()),
            )
        };

        let response = make()
            .oneshot(get_request("/api/ask?question=hello"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = make()
            .oneshot(
                Request::builder()
                    .uri("/api/ask?question=hello")
                    .header("Authorization", "Bearer secret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = make()
            .oneshot(get_request("/api/ask?question=hello&token=secret"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = make().oneshot(get_request("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
