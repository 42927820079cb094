use super::*;
use crate::config::Settings;
use crate::services::session::SessionStore;
use crate::state::test_helpers::{TestApp, account_user, session_cookie};
use crate::services::user::Verification;

fn existing_with_user(user_id: Uuid) -> Session {
    Session::existing(
        generate_token(),
        SessionData { user_id: Some(user_id), ..SessionData::default() },
    )
}

// =============================================================================
// Session handle
// =============================================================================

#[test]
fn fresh_session_is_anonymous_and_unmodified() {
    let session = Session::fresh();
    assert_eq!(session.user_id(), None);
    let plan = session.commit_plan();
    assert!(plan.fresh);
    assert!(!plan.modified);
    assert_eq!(plan.token.len(), 64);
}

#[test]
fn return_url_take_clears_it() {
    let session = Session::fresh();
    session.set_return_url("/admin/users/?page=2");
    assert_eq!(session.return_url().as_deref(), Some("/admin/users/?page=2"));
    assert_eq!(session.take_return_url().as_deref(), Some("/admin/users/?page=2"));
    assert_eq!(session.return_url(), None);
}

#[test]
fn take_missing_return_url_does_not_mark_modified() {
    let session = Session::existing(generate_token(), SessionData::default());
    assert_eq!(session.take_return_url(), None);
    assert!(!session.commit_plan().modified);
}

#[test]
fn oauth_state_is_single_use() {
    let session = Session::fresh();
    session.set_oauth_state("abc");
    assert_eq!(session.take_oauth_state().as_deref(), Some("abc"));
    assert_eq!(session.take_oauth_state(), None);
}

#[test]
fn regenerate_existing_retires_old_token() {
    let session = existing_with_user(Uuid::new_v4());
    let before = session.token();
    session.regenerate();
    let plan = session.commit_plan();
    assert_ne!(plan.token, before);
    assert_eq!(plan.retired, vec![before]);
    assert!(plan.fresh);
    assert_eq!(plan.data.user_id, session.user_id());
}

#[test]
fn regenerate_fresh_has_nothing_to_retire() {
    let session = Session::fresh();
    session.regenerate();
    assert!(session.commit_plan().retired.is_empty());
}

#[test]
fn log_in_rotates_token_and_binds_user() {
    let session = Session::existing(generate_token(), SessionData::default());
    let before = session.token();
    let user_id = Uuid::new_v4();
    session.log_in(user_id);
    assert_ne!(session.token(), before);
    assert_eq!(session.user_id(), Some(user_id));
}

#[test]
fn log_out_clears_user_only() {
    let session = existing_with_user(Uuid::new_v4());
    session.set_return_url("/account/");
    session.log_out();
    assert_eq!(session.user_id(), None);
    assert_eq!(session.return_url().as_deref(), Some("/account/"));
}

#[test]
fn clones_share_state() {
    let session = Session::fresh();
    let other = session.clone();
    other.set_return_url("/x");
    assert_eq!(session.return_url().as_deref(), Some("/x"));
}

// =============================================================================
// commit
// =============================================================================

#[tokio::test]
async fn commit_untouched_fresh_session_writes_nothing() {
    let app = TestApp::new(Settings::default());
    let session = Session::fresh();
    let jar = commit(&app.state, &session, CookieJar::new()).await;
    assert!(jar.get(COOKIE_NAME).is_none());
    assert_eq!(app.sessions.load(&session.token()).await.unwrap(), None);
}

#[tokio::test]
async fn commit_fresh_session_with_data_saves_and_sets_cookie() {
    let app = TestApp::new(Settings::default());
    let session = Session::fresh();
    session.set_return_url("/account/");

    let jar = commit(&app.state, &session, CookieJar::new()).await;

    let cookie = jar.get(COOKIE_NAME).expect("cookie should be issued");
    assert_eq!(cookie.value(), session.token());
    assert_eq!(cookie.http_only(), Some(true));
    assert_eq!(cookie.path(), Some("/"));
    let stored = app.sessions.load(&session.token()).await.unwrap().unwrap();
    assert_eq!(stored.return_url.as_deref(), Some("/account/"));
}

#[tokio::test]
async fn commit_modified_existing_session_saves_without_new_cookie() {
    let app = TestApp::new(Settings::default());
    let session = existing_with_user(Uuid::new_v4());
    session.set_oauth_state("s");

    let jar = commit(&app.state, &session, CookieJar::new()).await;

    assert!(jar.get(COOKIE_NAME).is_none());
    let stored = app.sessions.load(&session.token()).await.unwrap().unwrap();
    assert_eq!(stored.oauth_state.as_deref(), Some("s"));
}

#[tokio::test]
async fn commit_emptied_existing_session_destroys_and_clears_cookie() {
    let app = TestApp::new(Settings::default());
    let session = existing_with_user(Uuid::new_v4());
    app.sessions
        .save(&session.token(), &session.commit_plan().data, Settings::default().session_ttl)
        .await
        .unwrap();
    session.log_out();

    let jar = commit(&app.state, &session, CookieJar::new()).await;

    assert_eq!(jar.get(COOKIE_NAME).map(Cookie::value), Some(""));
    assert_eq!(app.sessions.load(&session.token()).await.unwrap(), None);
}

#[tokio::test]
async fn commit_after_log_in_replaces_old_row() {
    let app = TestApp::new(Settings::default());
    let session = Session::existing(generate_token(), SessionData { return_url: Some("/a".into()), ..SessionData::default() });
    let old = session.token();
    app.sessions
        .save(&old, &session.commit_plan().data, Settings::default().session_ttl)
        .await
        .unwrap();

    let user_id = Uuid::new_v4();
    session.log_in(user_id);
    let jar = commit(&app.state, &session, CookieJar::new()).await;

    assert_eq!(app.sessions.load(&old).await.unwrap(), None);
    let new = jar.get(COOKIE_NAME).expect("rotated cookie").value().to_owned();
    assert_ne!(new, old);
    let stored = app.sessions.load(&new).await.unwrap().unwrap();
    assert_eq!(stored.user_id, Some(user_id));
}

#[tokio::test]
async fn secure_flag_follows_settings() {
    let app = TestApp::new(Settings { cookie_secure: true, ..Settings::default() });
    let session = Session::fresh();
    session.set_return_url("/");
    let jar = commit(&app.state, &session, CookieJar::new()).await;
    assert_eq!(jar.get(COOKIE_NAME).and_then(Cookie::secure), Some(true));
}

// =============================================================================
// session_layer (through the router)
// =============================================================================

#[tokio::test]
async fn anonymous_public_page_sets_no_cookie() {
    let app = TestApp::new(Settings::default());
    let response = app.send("GET", "/", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(session_cookie(&response).is_none());
}

#[tokio::test]
async fn unknown_cookie_is_treated_as_anonymous() {
    let app = TestApp::new(Settings::default());
    let cookie = format!("{COOKIE_NAME}={}", generate_token());
    let response = app.send("GET", "/account/", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers()["location"], "/login/");
}

#[tokio::test]
async fn inactive_user_is_treated_as_anonymous() {
    let app = TestApp::new(Settings::default());
    let mut user = account_user(Verification::Yes);
    user.is_active = false;
    let cookie = app.login_as(user).await;

    let response = app.send("GET", "/account/", Some(&cookie)).await;

    assert_eq!(response.headers()["location"], "/login/");
}

#[tokio::test]
async fn logged_in_user_reaches_handler_with_user_attached() {
    let app = TestApp::new(Settings::default());
    let cookie = app.login_as(account_user(Verification::Yes)).await;

    let response = app.send("GET", "/account/", Some(&cookie)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.pages.actions(), vec!["account.init"]);
    assert!(session_cookie(&response).is_none());
}

#[tokio::test]
async fn failed_save_still_answers_the_request() {
    let app = TestApp::new(Settings { session_ttl: std::time::Duration::from_secs(u64::MAX), ..Settings::default() });

    let response = app.send("GET", "/admin/", None).await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers()["location"], "/login/");
    assert!(session_cookie(&response).is_none());
}
