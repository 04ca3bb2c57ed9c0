use crate::auth::{AuthError, FirebaseAuth};
use http::Extensions;
use reqwest::{header, Request, Response};
use reqwest_middleware::{Middleware, Next};

/// Authenticates requests to Firebase REST APIs the way a web client does.
///
/// Every request carries the web API key as `key=`. Once a user is signed in, their ID
/// token is sent as a bearer token so security rules see `request.auth`.
#[derive(Clone)]
pub struct SessionMiddleware {
    api_key: String,
    auth: FirebaseAuth,
}

impl SessionMiddleware {
    pub fn new(api_key: String, auth: FirebaseAuth) -> Self {
        Self { api_key, auth }
    }

    async fn bearer_token(&self) -> Result<Option<String>, anyhow::Error> {
        match self.auth.id_token().await {
            Ok(token) => Ok(Some(token)),
            Err(AuthError::NotSignedIn) => Ok(None),
            Err(e) => Err(anyhow::anyhow!(e)),
        }
    }
}

#[async_trait::async_trait]
impl Middleware for SessionMiddleware {
    async fn handle(
        &self,
        mut req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        req.url_mut()
            .query_pairs_mut()
            .append_pair("key", &self.api_key);

        let token = self.bearer_token().await.map_err(|e| {
            reqwest_middleware::Error::Middleware(anyhow::anyhow!("Failed to get ID token: {}", e))
        })?;

        if let Some(token) = token {
            let value = header::HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|e| {
                reqwest_middleware::Error::Middleware(anyhow::anyhow!("Invalid ID token: {}", e))
            })?;
            req.headers_mut().insert(header::AUTHORIZATION, value);
        }

        next.run(req, extensions).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::User;
    use chrono::{Duration, Utc};
    use httpmock::prelude::*;
    use reqwest::Client;
    use reqwest_middleware::ClientBuilder;

    fn create_auth(server: &MockServer) -> FirebaseAuth {
        FirebaseAuth::new_with_client(
            ClientBuilder::new(Client::new()).build(),
            "web-key".to_string(),
            server.url("/identity"),
            server.url("/securetoken"),
        )
    }

    #[tokio::test]
    async fn test_adds_api_key_without_user() {
        let server = MockServer::start();
        let auth = create_auth(&server);
        let client = ClientBuilder::new(Client::new())
            .with(SessionMiddleware::new("web-key".to_string(), auth))
            .build();

        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/documents/rooms/123456")
                .query_param("key", "web-key");
            then.status(200);
        });

        let response = client
            .get(server.url("/documents/rooms/123456"))
            .send()
            .await
            .unwrap();
        assert!(response.status().is_success());

        mock.assert();
    }

    #[tokio::test]
    async fn test_adds_bearer_token_for_signed_in_user() {
        let server = MockServer::start();
        let auth = create_auth(&server);
        auth.set_current_user(User {
            uid: "anon-uid".to_string(),
            id_token: "id-token-1".to_string(),
            refresh_token: "refresh-1".to_string(),
            expires_at: Utc::now() + Duration::hours(1),
            is_anonymous: true,
        })
        .await;

        let client = ClientBuilder::new(Client::new())
            .with(SessionMiddleware::new("web-key".to_string(), auth))
            .build();

        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/documents/rooms/123456")
                .query_param("key", "web-key")
                .header("authorization", "Bearer id-token-1");
            then.status(200);
        });

        client
            .get(server.url("/documents/rooms/123456"))
            .send()
            .await
            .unwrap();

        mock.assert();
    }
}
