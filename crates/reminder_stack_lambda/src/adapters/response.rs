/// Delivers a custom resource response to the toolkit's pre-signed URL.
pub trait ResponseSender {
    fn send(&self, response_url: &str, body: &[u8]) -> Result<(), String>;
}

#[derive(Clone, Default)]
pub struct HttpResponseSender {
    client: reqwest::Client,
}

impl ResponseSender for HttpResponseSender {
    fn send(&self, response_url: &str, body: &[u8]) -> Result<(), String> {
        // The pre-signed URL is signed for an empty content type.
        let request = self
            .client
            .put(response_url)
            .header(reqwest::header::CONTENT_TYPE, "")
            .body(body.to_vec());

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let response = request
                    .send()
                    .await
                    .map_err(|error| format!("failed to send custom resource response: {error}"))?;
                response
                    .error_for_status()
                    .map(|_| ())
                    .map_err(|error| format!("custom resource response rejected: {error}"))
            })
        })
    }
}
