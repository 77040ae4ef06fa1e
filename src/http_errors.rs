use anyhow::anyhow;
use std::error::Error as StdError;
use std::io::ErrorKind;

fn error_chain_matches(
    err: &(dyn StdError + 'static),
    kind: ErrorKind,
    needle: &str,
) -> bool {
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(source) = current {
        if let Some(io_err) = source.downcast_ref::<std::io::Error>()
            && io_err.kind() == kind
        {
            return true;
        }

        if source.to_string().to_ascii_lowercase().contains(needle) {
            return true;
        }

        current = source.source();
    }

    false
}

pub(crate) fn chat_api_request_error(
    err: reqwest::Error,
    api_url: &str,
    timeout_secs: Option<u64>,
) -> anyhow::Error {
    if err.is_timeout() || error_chain_matches(&err, ErrorKind::TimedOut, "timed out") {
        let after = timeout_secs
            .map(|secs| format!(" after {secs}s"))
            .unwrap_or_default();
        return anyhow!(
            "Chat request timed out{} while calling '{}'. \
             Raise HALPT_REQUEST_TIMEOUT_SECS or try again later.",
            after,
            api_url
        );
    }

    if err.is_connect() {
        if error_chain_matches(&err, ErrorKind::ConnectionRefused, "connection refused") {
            return anyhow!(
                "Connection refused by chat API at '{}'. \
                 Check HALPT_API_BASE_URL.",
                api_url
            );
        }

        return anyhow!(
            "Failed to connect to chat API at '{}'. \
             Check HALPT_API_BASE_URL and network connectivity.",
            api_url
        );
    }

    anyhow!("Failed to call chat API at '{}': {}", api_url, err)
}

#[cfg(test)]
mod tests {
    use super::{chat_api_request_error, error_chain_matches};
    use reqwest::Client;
    use std::io::ErrorKind;
    use std::net::TcpListener;
    use std::time::Duration;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn free_local_addr() -> std::net::SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind should succeed");
        let addr = listener.local_addr().expect("address should be available");
        drop(listener);
        addr
    }

    #[tokio::test]
    async fn maps_connection_refused_errors_to_actionable_message() {
        let addr = free_local_addr();
        let api_url = format!("http://{}/v1/chat/completions", addr);
        let client = Client::builder()
            .timeout(Duration::from_millis(300))
            .build()
            .expect("client should build");

        let req_err = client
            .post(&api_url)
            .send()
            .await
            .expect_err("request should fail with connection-refused");
        let msg = format!("{:#}", chat_api_request_error(req_err, &api_url, None));

        assert!(
            msg.contains("Connection refused by chat API"),
            "unexpected message: {msg}"
        );
        assert!(msg.contains("HALPT_API_BASE_URL"), "unexpected message: {msg}");
    }

    #[tokio::test]
    async fn maps_timeout_errors_to_actionable_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(1)))
            .mount(&server)
            .await;

        let api_url = format!("{}/v1/chat/completions", server.uri());
        let client = Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("client should build");

        let req_err = client
            .post(&api_url)
            .send()
            .await
            .expect_err("request should fail with timeout");
        let msg = format!("{:#}", chat_api_request_error(req_err, &api_url, Some(2)));

        assert!(
            msg.contains("Chat request timed out after 2s"),
            "unexpected message: {msg}"
        );
        assert!(
            msg.contains("HALPT_REQUEST_TIMEOUT_SECS"),
            "unexpected message: {msg}"
        );
    }

    #[test]
    fn detects_matching_error_kind() {
        let err = std::io::Error::new(ErrorKind::TimedOut, "deadline");
        assert!(error_chain_matches(&err, ErrorKind::TimedOut, "timed out"));
        assert!(!error_chain_matches(
            &err,
            ErrorKind::ConnectionRefused,
            "connection refused"
        ));
    }
}
