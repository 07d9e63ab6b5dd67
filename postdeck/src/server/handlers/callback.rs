use axum::{
    extract::{Query, State},
    response::Html,
};
use tracing::Instrument;

use crate::server::{
    error::ServerError,
    models::{CallbackParams, DemoParams},
    AppState,
};

const PAGE_STYLE: &str = r#"
        body {
            margin: 0;
            padding: 0;
            font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, "Helvetica Neue", Arial, sans-serif;
            background: #F3F4F6;
            display: flex;
            justify-content: center;
            align-items: center;
            height: 100vh;
        }
        .card {
            background: white;
            border-radius: 12px;
            padding: 40px;
            box-shadow: 0 4px 24px rgba(0, 0, 0, 0.08);
            text-align: center;
            max-width: 420px;
        }
        .badge {
            width: 56px;
            height: 56px;
            border-radius: 50%;
            color: white;
            display: inline-flex;
            align-items: center;
            justify-content: center;
            font-size: 28px;
            margin-bottom: 20px;
        }
        .ok { background: #10B981; }
        .fail { background: #EF4444; }
        .pending { background: #6366F1; }
        h1 { color: #111827; margin: 0 0 12px 0; font-size: 22px; }
        p { color: #6B7280; margin: 0 0 20px 0; line-height: 1.5; }
        .details {
            background: #FEE2E2;
            border-radius: 8px;
            padding: 12px;
            color: #991B1B;
            font-family: monospace;
            font-size: 13px;
            margin-bottom: 20px;
        }
        button {
            border: none;
            border-radius: 8px;
            padding: 12px 24px;
            font-size: 15px;
            cursor: pointer;
            background: #4F46E5;
            color: white;
        }
"#;

fn page(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>{title}</title>
    <style>{style}</style>
</head>
<body>
    <div class="card">
{body}
    </div>
</body>
</html>"#,
        style = PAGE_STYLE
    )
}

fn success_page(platform: &str) -> String {
    page(
        "Account Connected",
        &format!(
            r#"        <div class="badge ok">✓</div>
        <h1>{platform} connected</h1>
        <p>The account is linked. You can close this window and return to the dashboard.</p>"#,
            platform = escape_html(platform)
        ),
    )
}

fn error_page(error: &str) -> String {
    page(
        "Connection Failed",
        &format!(
            r#"        <div class="badge fail">✗</div>
        <h1>Connection failed</h1>
        <p>There was an error while linking the account.</p>
        <div class="details">{}</div>
        <p>Close this window and try connecting again from the dashboard.</p>"#,
            escape_html(error)
        ),
    )
}

fn demo_page(client_id: &str, platform: &str, label: &str, access_token: &str) -> String {
    let payload = serde_json::json!({
        "clientId": client_id,
        "platform": platform,
        "accessToken": access_token,
    })
    .to_string()
    .replace('<', "\\u003c");

    page(
        "Approve Connection",
        &format!(
            r#"        <div class="badge pending">?</div>
        <h1>Connect {label}</h1>
        <p>No live {label} integration is configured. Approving stores a demo connection for client <strong>{client}</strong>.</p>
        <button id="approve">Approve</button>
        <p id="result"></p>
        <script>
            document.getElementById("approve").addEventListener("click", async () => {{
                const result = document.getElementById("result");
                const response = await fetch("/oauth/complete", {{
                    method: "POST",
                    headers: {{ "Content-Type": "application/json" }},
                    body: JSON.stringify({payload}),
                }});
                result.textContent = response.ok
                    ? "Connected. You can close this window."
                    : "Connection failed: " + (await response.json()).error;
            }});
        </script>"#,
            label = escape_html(label),
            client = escape_html(client_id),
        ),
    )
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Provider redirect target. The connection is identified from the verified
/// state token, then the code is exchanged as `/oauth/exchange` would.
pub async fn oauth_callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Html<String> {
    if let Some(error) = params.error {
        let message = params.error_description.unwrap_or(error);
        tracing::warn!(error = %message, "OAuth callback error");
        return Html(error_page(&message));
    }

    let (Some(code), Some(state_token)) = (params.code, params.state) else {
        return Html(error_page("Missing authorization code or state"));
    };

    let (client_id, platform) = match state.oauth.inspect_state(&state_token) {
        Ok(pair) => pair,
        Err(e) => {
            tracing::warn!(error = %e, "OAuth callback with invalid state");
            return Html(error_page(&e.to_string()));
        }
    };

    let span = tracing::info_span!("oauth_callback", client_id = %client_id, platform = %platform);
    let result = state
        .oauth
        .exchange(
            Some(&code),
            Some(&state_token),
            Some(&client_id),
            Some(platform.as_str()),
        )
        .instrument(span.clone())
        .await;

    match result {
        Ok(_) => {
            tracing::info!(parent: &span, "OAuth callback successful");
            Html(success_page(platform.label()))
        }
        Err(e) => Html(error_page(&e.to_string())),
    }
}

/// Simulated approval screen for platforms without a live integration.
pub async fn demo_approval(
    State(state): State<AppState>,
    Query(params): Query<DemoParams>,
) -> Result<Html<String>, ServerError> {
    let span = tracing::info_span!(
        "demo_approval",
        client_id = %params.client_id,
        platform = %params.platform
    );
    let _enter = span.enter();

    let (platform, access_token) =
        state
            .oauth
            .approve_demo(&params.state, &params.client_id, &params.platform)?;

    tracing::info!("Rendered demo approval screen");

    Ok(Html(demo_page(
        &params.client_id,
        platform.as_str(),
        platform.label(),
        &access_token,
    )))
}
