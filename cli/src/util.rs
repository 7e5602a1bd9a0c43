use std::io::Read;

use serde_json::json;

pub const USER_ID_HEADER: &str = "x-user-id";

pub fn client() -> reqwest::Client {
    reqwest::Client::new()
}

pub fn exit_error(message: &str, docs_hint: Option<&str>) -> ! {
    let mut err = json!({
        "error": "cli_error",
        "message": message
    });
    if let Some(hint) = docs_hint {
        err["docs_hint"] = json!(hint);
    }
    eprintln!("{}", pretty(&err));
    std::process::exit(4);
}

pub fn require_user_id(user_id: Option<&str>) -> String {
    match user_id.map(str::trim).filter(|id| !id.is_empty()) {
        Some(id) => id.to_string(),
        None => exit_error(
            "A user id is required for this command",
            Some("Set --user-id or the MOODLOG_USER_ID env var"),
        ),
    }
}

pub fn pretty(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

fn build_url(
    api_url: &str,
    path: &str,
    query: &[(String, String)],
) -> Result<reqwest::Url, String> {
    let mut url = reqwest::Url::parse(&format!("{}{path}", api_url.trim_end_matches('/')))
        .map_err(|e| format!("Invalid URL: {api_url}{path}: {e}"))?;
    if !query.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (k, v) in query {
            pairs.append_pair(k, v);
        }
    }
    Ok(url)
}

/// Send a request and return the status and JSON body without printing.
pub async fn fetch_json(
    api_url: &str,
    method: reqwest::Method,
    path: &str,
    user_id: Option<&str>,
    body: Option<serde_json::Value>,
    query: &[(String, String)],
) -> Result<(u16, serde_json::Value), String> {
    let url = build_url(api_url, path, query)?;

    let mut req = client().request(method, url);
    if let Some(id) = user_id {
        req = req.header(USER_ID_HEADER, id);
    }
    if let Some(b) = body {
        req = req.json(&b);
    }

    tracing::debug!(path = path, "Sending request");
    let resp = req.send().await.map_err(|e| format!("{e}"))?;
    let status = resp.status().as_u16();

    // DELETE answers 204 with no body.
    let text = resp.text().await.map_err(|e| format!("{e}"))?;
    let body = if text.trim().is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_str(&text)
            .unwrap_or_else(|e| json!({"raw_error": format!("Failed to parse response as JSON: {e}")}))
    };

    Ok((status, body))
}

/// Execute an API request, print the response, and return a structured exit code.
///
/// Exit codes: 0=success (2xx), 1=client error (4xx), 2=server error (5xx),
///             3=connection error, 4=usage error
pub async fn api_request(
    api_url: &str,
    method: reqwest::Method,
    path: &str,
    user_id: Option<&str>,
    body: Option<serde_json::Value>,
    query: &[(String, String)],
) -> i32 {
    if let Err(e) = build_url(api_url, path, query) {
        eprintln!("{}", pretty(&json!({"error": "cli_error", "message": e})));
        return 4;
    }

    let (status, resp_body) = match fetch_json(api_url, method, path, user_id, body, query).await {
        Ok(result) => result,
        Err(e) => {
            let err = json!({
                "error": "connection_error",
                "message": e,
                "docs_hint": "Is the API server running? Check MOODLOG_API_URL."
            });
            eprintln!("{}", pretty(&err));
            return 3;
        }
    };

    let exit_code = exit_code_for_status(status);
    let output = if resp_body.is_null() {
        json!({"status": status})
    } else {
        resp_body
    };

    if exit_code == 0 {
        println!("{}", pretty(&output));
    } else {
        eprintln!("{}", pretty(&output));
    }

    exit_code
}

pub fn exit_code_for_status(status: u16) -> i32 {
    match status {
        200..=299 => 0,
        400..=499 => 1,
        _ => 2,
    }
}

/// Read text from a file path or stdin (when path is "-"). Invalid UTF-8 is replaced.
pub fn read_text(path: &str) -> Result<String, String> {
    let bytes = if path == "-" {
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .map_err(|e| format!("Failed to read stdin: {e}"))?;
        buf
    } else {
        std::fs::read(path).map_err(|e| format!("Failed to read file '{path}': {e}"))?
    };
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_map_to_exit_codes() {
        assert_eq!(exit_code_for_status(201), 0);
        assert_eq!(exit_code_for_status(204), 0);
        assert_eq!(exit_code_for_status(404), 1);
        assert_eq!(exit_code_for_status(503), 2);
    }

    #[test]
    fn url_joins_base_path_and_query() {
        let url = build_url(
            "http://localhost:3000/",
            "/v1/journal",
            &[("limit".to_string(), "5".to_string())],
        )
        .expect("url should build");
        assert_eq!(url.as_str(), "http://localhost:3000/v1/journal?limit=5");
    }

    #[test]
    fn invalid_base_url_is_reported() {
        assert!(build_url("not a url", "/health", &[]).is_err());
    }

    #[test]
    fn read_text_replaces_invalid_utf8() {
        let path = std::env::temp_dir().join(format!("moodlog-cli-{}.txt", std::process::id()));
        std::fs::write(&path, b"energy level: 7\xff0").expect("write temp file");
        let text = read_text(path.to_str().expect("utf-8 temp path")).expect("read temp file");
        std::fs::remove_file(&path).ok();
        assert_eq!(text, "energy level: 7\u{FFFD}0");
    }
}
