//! Tests for credential propagation and application tokens.

use super::test_support::{Scripted, context, get};
use super::{APP_TOKEN_HEADER, AppToken, AuthPropagation};
use crate::policy::PolicySettings;
use crate::transport::Interceptor;
use http::StatusCode;
use http::header::AUTHORIZATION;

mod propagation {
    use super::*;

    #[tokio::test]
    async fn copies_credential_when_auth_required() {
        let wire = Scripted::status(StatusCode::OK);
        let transport = AuthPropagation::new().wrap(wire.shared());
        let cx = context(PolicySettings::new().with_require_auth(true))
            .with_credential("Bearer inbound-token");

        transport.send(get("http://api.test/me"), &cx).await.unwrap();

        let sent = wire.last();
        assert_eq!(sent.headers[AUTHORIZATION], "Bearer inbound-token");
        assert!(sent.headers[AUTHORIZATION].is_sensitive());
    }

    #[tokio::test]
    async fn ignores_credential_when_auth_not_required() {
        let wire = Scripted::status(StatusCode::OK);
        let transport = AuthPropagation::new().wrap(wire.shared());
        let cx = context(PolicySettings::new()).with_credential("Bearer inbound-token");

        transport.send(get("http://api.test/public"), &cx).await.unwrap();

        assert!(!wire.last().headers.contains_key(AUTHORIZATION));
    }

    #[tokio::test]
    async fn sends_without_credential_when_missing() {
        let wire = Scripted::status(StatusCode::OK);
        let transport = AuthPropagation::new().wrap(wire.shared());
        let cx = context(PolicySettings::new().with_require_auth(true));

        let response = transport.send(get("http://api.test/me"), &cx).await.unwrap();

        assert_eq!(response.status, StatusCode::OK);
        assert!(!wire.last().headers.contains_key(AUTHORIZATION));
    }

    #[tokio::test]
    async fn empty_credential_is_not_propagated() {
        let wire = Scripted::status(StatusCode::OK);
        let transport = AuthPropagation::new().wrap(wire.shared());
        let cx = context(PolicySettings::new().with_require_auth(true)).with_credential("");

        transport.send(get("http://api.test/me"), &cx).await.unwrap();

        assert!(!wire.last().headers.contains_key(AUTHORIZATION));
    }
}

mod app_token {
    use super::*;

    #[tokio::test]
    async fn attaches_configured_token() {
        let wire = Scripted::status(StatusCode::OK);
        let token = AppToken::new("app-secret");
        assert!(token.is_configured());

        token
            .wrap(wire.shared())
            .send(get("http://api.test/x"), &context(PolicySettings::new()))
            .await
            .unwrap();

        assert_eq!(wire.last().headers[APP_TOKEN_HEADER], "app-secret");
    }

    #[tokio::test]
    async fn empty_token_disables_decorator() {
        let wire = Scripted::status(StatusCode::OK);
        let token = AppToken::new("");
        assert!(!token.is_configured());

        token
            .wrap(wire.shared())
            .send(get("http://api.test/x"), &context(PolicySettings::new()))
            .await
            .unwrap();

        assert!(!wire.last().headers.contains_key(APP_TOKEN_HEADER));
    }

    #[test]
    fn invalid_header_value_disables_decorator() {
        assert!(!AppToken::new("bad\ntoken").is_configured());
    }
}
