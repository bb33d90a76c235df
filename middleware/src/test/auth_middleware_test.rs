//! Unit tests for AuthMiddleware and LoggingMiddleware.

use crate::{AuthMiddleware, LoggingMiddleware};
use chrono::Utc;
use konsul_core::{
    AuthUser, ChatMessage, ChatRole, HandlerError, HandlerResponse, Inbound, KonsulError,
    Middleware, Role,
};

fn inbound_as(user: AuthUser, sender: &str, role: ChatRole) -> Inbound {
    let message = ChatMessage::text(sender, "d-1", role, "Halo", Utc::now());
    Inbound::from_connection(message, 7, user)
}

/// **Test: A citizen sending as themselves passes.**
#[tokio::test]
async fn test_auth_allows_own_messages() {
    let inbound = inbound_as(
        AuthUser::new("c-1", Role::Masyarakat),
        "c-1",
        ChatRole::Citizen,
    );

    assert!(AuthMiddleware.before(&inbound).await.unwrap());
}

/// **Test: Sending on behalf of another user is rejected.**
///
/// **Setup:** Connection user c-1, message sender c-2.
/// **Action:** `before`.
/// **Expected:** `HandlerError::SenderMismatch`.
#[tokio::test]
async fn test_auth_rejects_sender_mismatch() {
    let inbound = inbound_as(
        AuthUser::new("c-1", Role::Masyarakat),
        "c-2",
        ChatRole::Citizen,
    );

    let result = AuthMiddleware.before(&inbound).await;

    assert!(matches!(
        result,
        Err(KonsulError::Handler(HandlerError::SenderMismatch { .. }))
    ));
}

/// **Test: A citizen cannot claim the doctor role.**
#[tokio::test]
async fn test_auth_rejects_role_mismatch() {
    let inbound = inbound_as(
        AuthUser::new("c-1", Role::Masyarakat),
        "c-1",
        ChatRole::Doctor,
    );

    let result = AuthMiddleware.before(&inbound).await;

    assert!(matches!(
        result,
        Err(KonsulError::Handler(HandlerError::Unauthorized))
    ));
}

/// **Test: System messages bypass the connection checks.**
#[tokio::test]
async fn test_auth_allows_system_messages() {
    let message = ChatMessage::text("d-1", "c-1", ChatRole::Doctor, "Halo", Utc::now());
    let inbound = Inbound::system(message);

    assert!(AuthMiddleware.before(&inbound).await.unwrap());
    AuthMiddleware
        .after(&inbound, &HandlerResponse::Delivered(2))
        .await
        .unwrap();
}

/// **Test: LoggingMiddleware always continues.**
#[tokio::test]
async fn test_logging_middleware_continues() {
    let inbound = inbound_as(
        AuthUser::new("c-1", Role::Masyarakat),
        "c-1",
        ChatRole::Citizen,
    );

    assert!(LoggingMiddleware.before(&inbound).await.unwrap());
    LoggingMiddleware
        .after(&inbound, &HandlerResponse::Continue)
        .await
        .unwrap();
}
