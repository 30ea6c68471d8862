//! End-to-end checks of the flow contract, driving every flow through the
//! scripted backend.

use std::sync::Arc;

use krishi_sakhi::prelude::*;
use serde_json::json;

fn weather_input(activities: Vec<RecentActivity>) -> WeatherAlertsInput {
    WeatherAlertsInput {
        recent_activities: activities,
        current_weather: "Heavy rain expected in the next 24 hours, wind 30 km/h".into(),
        location: "Alappuzha, Kerala".into(),
    }
}

#[tokio::test]
async fn chat_reply_passes_through_verbatim() {
    let stub = StubBackend::json(json!({"message": "SRI is a rice farming method."}));
    let input = ChatInput {
        history: vec![ChatTurn::user("Hi")],
        message: "What is SRI?".into(),
    };

    let out = execute(&ChatFlow, &stub, &input).await.unwrap();

    assert_eq!(out.message, "SRI is a rice farming method.");
    assert_eq!(input.history, vec![ChatTurn::user("Hi")]);
    let prompt = stub.last_prompt().unwrap();
    assert!(prompt.contains("- user: Hi"));
    assert!(prompt.contains("- user: What is SRI?"));
}

#[tokio::test]
async fn invalid_input_never_calls_backend() {
    let stub = StubBackend::json(json!({"crops": [], "reasoning": ""}));

    let err = execute_json(
        &CropRecommendationsFlow,
        &stub,
        json!({"location": "Kottayam", "historicalData": 42}),
    )
    .await
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(err.flow(), "crop_recommendations");
    let paths: Vec<&str> = err.violations().iter().map(|v| v.path.as_str()).collect();
    assert!(paths.contains(&"/historicalData"), "{paths:?}");
    assert!(err.violations().iter().any(|v| v.message.contains("soilType")));
    assert_eq!(stub.call_count(), 0);
}

#[tokio::test]
async fn unknown_chat_role_is_rejected() {
    let stub = StubBackend::json(json!({"message": "unused"}));
    let err = execute_json(
        &ChatFlow,
        &stub,
        json!({"history": [{"role": "assistant", "content": "hello"}], "message": "hi"}),
    )
    .await
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(err.violations()[0].path, "/history/0/role");
    assert_eq!(stub.call_count(), 0);
}

#[tokio::test]
async fn weather_alerts_without_activities() {
    let stub = StubBackend::json(json!({
        "alerts": [{
            "title": "Heavy rain",
            "description": "Check field drainage before tonight.",
            "severity": "Medium"
        }]
    }));
    let out = execute(&WeatherAlertsFlow, &stub, &weather_input(vec![]))
        .await
        .unwrap();
    assert_eq!(out.alerts.len(), 1);
    assert_eq!(out.alerts[0].severity, Severity::Medium);

    let quiet = StubBackend::json(json!({"alerts": []}));
    let out = execute(&WeatherAlertsFlow, &quiet, &weather_input(vec![]))
        .await
        .unwrap();
    assert!(out.alerts.is_empty());
}

#[tokio::test]
async fn malformed_weather_reply_is_output_error() {
    let stub = StubBackend::json(json!({"alerts": [{"title": "X"}]}));
    let activities = vec![RecentActivity {
        activity: "Pesticide spraying".into(),
        crop: "Paddy".into(),
        date: "yesterday".into(),
    }];

    let err = execute(&WeatherAlertsFlow, &stub, &weather_input(activities))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::OutputSchema);
    assert!(
        err.violations()
            .iter()
            .all(|v| v.path.starts_with("/alerts/0"))
    );
    assert_eq!(stub.call_count(), 1);
}

#[tokio::test]
async fn unknown_severity_is_output_error() {
    let stub = StubBackend::json(json!({
        "alerts": [{"title": "Storm", "description": "Stay in", "severity": "Critical"}]
    }));
    let err = execute(&WeatherAlertsFlow, &stub, &weather_input(vec![]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OutputSchema);
    assert_eq!(err.violations()[0].path, "/alerts/0/severity");
}

#[tokio::test]
async fn empty_reply_is_output_error() {
    let stub = StubBackend::empty();
    let input = SummarizeActivityLogsInput::from_entries(["Sowed paddy", "Weeded"]);
    let err = execute(&SummarizeActivityLogsFlow, &stub, &input)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OutputSchema);
    assert!(err.to_string().contains("empty reply"));
}

#[tokio::test]
async fn fenced_text_reply_is_accepted() {
    let stub = StubBackend::text(
        "Here are my suggestions:\n```json\n{\"suggestions\": [\"Switch to drip irrigation\"], \"reasoning\": \"Saves water.\"}\n```",
    );
    let input = EnhanceActivityLogInput {
        activity_type: "Irrigation".into(),
        activity_details: "Flood irrigated".into(),
        crop_type: "Banana".into(),
        soil_type: "Laterite".into(),
        irrigation_method: "Flood".into(),
        location: "Thrissur".into(),
    };
    let out = execute(&EnhanceActivityLogFlow, &stub, &input).await.unwrap();
    assert_eq!(out.suggestions, vec!["Switch to drip irrigation"]);
    assert_eq!(out.reasoning, "Saves water.");
}

#[tokio::test]
async fn backend_failure_is_not_retried() {
    let stub = StubBackend::failing(BackendError::Http {
        status: 429,
        body: "rate limited".into(),
    });
    let input = TranslateTextInput {
        text: "Harvest after the rain stops.".into(),
        target_language: "Malayalam".into(),
    };
    let err = execute(&TranslateTextFlow, &stub, &input).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Backend);
    assert!(err.is_retryable());
    assert_eq!(stub.call_count(), 1);
}

#[tokio::test]
async fn repeated_calls_are_idempotent() {
    let stub = StubBackend::json(json!({
        "crops": ["Rubber", "Pepper"],
        "reasoning": "Laterite soil on midland slopes."
    }));
    let input = CropRecommendationsInput {
        soil_type: "Laterite".into(),
        location: "Kottayam".into(),
        historical_data: "Rubber for ten years".into(),
    };

    let first = execute(&CropRecommendationsFlow, &stub, &input).await.unwrap();
    let second = execute(&CropRecommendationsFlow, &stub, &input).await.unwrap();

    assert_eq!(first, second);
    let prompts = stub.prompts();
    assert_eq!(prompts.len(), 2);
    assert_eq!(prompts[0], prompts[1]);
}

#[tokio::test]
async fn text_to_speech_returns_audio_uri() {
    let stub = StubBackend::empty().with_speech(SpeechAudio {
        pcm: vec![0, 0, 16, 0, 32, 0],
        sample_rate: 24_000,
        channels: 1,
    });
    let sakhi = Sakhi::new(stub);
    let out = sakhi
        .text_to_speech(&TextToSpeechInput {
            text: "Water the seedlings in the evening.".into(),
            language_code: "en-US".into(),
        })
        .await
        .unwrap();
    assert!(out.audio_data_uri.starts_with("data:audio/"));
    assert_eq!(out.wav_bytes().unwrap().len(), 44 + 6);
}

#[tokio::test]
async fn concurrent_flows_share_nothing() {
    let good = Arc::new(StubBackend::json(json!({"summary": "Two sowings this week."})));
    let bad = Arc::new(StubBackend::failing(BackendError::Request(
        "connection refused".into(),
    )));
    let sakhi = Sakhi::with_backend(good.clone());
    let broken = Sakhi::with_backend(bad.clone());
    let input = SummarizeActivityLogsInput::from_entries(["Sowed okra", "Sowed cowpea"]);

    let mut handles = Vec::new();
    for i in 0..8 {
        let sakhi = if i % 2 == 0 { sakhi.clone() } else { broken.clone() };
        let input = input.clone();
        handles.push(tokio::spawn(async move { sakhi.summarize_logs(&input).await }));
    }

    let mut ok = 0;
    let mut failed = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(out) => {
                assert_eq!(out.summary, "Two sowings this week.");
                ok += 1;
            }
            Err(e) => {
                assert_eq!(e.kind(), ErrorKind::Backend);
                failed += 1;
            }
        }
    }
    assert_eq!((ok, failed), (4, 4));
    assert_eq!(good.call_count(), 4);
    assert_eq!(bad.call_count(), 4);
}

#[test]
fn every_flow_declares_schemas() {
    let catalog = krishi_sakhi::flows::catalog();
    let names: Vec<&str> = catalog.iter().map(|d| d.name).collect();
    assert_eq!(
        names,
        vec![
            "chat",
            "crop_recommendations",
            "summarize_activity_logs",
            "enhance_activity_log",
            "weather_alerts",
            "text_to_speech",
            "translate_text",
        ]
    );
    for d in &catalog {
        assert_eq!(d.input_schema["type"], "object", "{}", d.name);
        assert_eq!(d.output_schema["type"], "object", "{}", d.name);
    }
}
