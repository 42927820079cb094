use super::*;
use crate::services::user::{Roles, Verification};
use crate::state::test_helpers::{account_user, admin_user, dual_role_user, plain_user};
use axum::http::StatusCode;

// =============================================================================
// Area::for_path
// =============================================================================

#[test]
fn area_matches_textual_prefixes() {
    assert_eq!(Area::for_path("/admin"), Some(Area::Admin));
    assert_eq!(Area::for_path("/admin/users/1/"), Some(Area::Admin));
    assert_eq!(Area::for_path("/administrators-x"), Some(Area::Admin));
    assert_eq!(Area::for_path("/account/settings/"), Some(Area::Account));
    assert_eq!(Area::for_path("/accounting"), Some(Area::Account));
}

#[test]
fn area_ignores_case() {
    assert_eq!(Area::for_path("/ADMIN/users/"), Some(Area::Admin));
    assert_eq!(Area::for_path("/Admin"), Some(Area::Admin));
    assert_eq!(Area::for_path("/AcCount/"), Some(Area::Account));
}

#[test]
fn area_ignores_other_paths() {
    assert_eq!(Area::for_path("/"), None);
    assert_eq!(Area::for_path("/adm"), None);
    assert_eq!(Area::for_path("/login/"), None);
    assert_eq!(Area::for_path("/about/admin/"), None);
}

// =============================================================================
// ensure_authenticated
// =============================================================================

#[test]
fn authenticated_passes_and_leaves_session_alone() {
    let session = Session::fresh();
    let admin = admin_user();
    let user = CurrentUser(Some(admin.clone()));
    assert_eq!(ensure_authenticated(&user, &session, "/admin/"), Ok(&admin));
    assert_eq!(session.return_url(), None);
}

#[test]
fn anonymous_is_sent_to_login_with_return_url() {
    let session = Session::fresh();
    let verdict = ensure_authenticated(&CurrentUser(None), &session, "/admin/users/?q=bob");
    assert_eq!(verdict, Err(Denial::LoginRequired));
    assert_eq!(session.return_url().as_deref(), Some("/admin/users/?q=bob"));
}

#[test]
fn login_required_response_is_flagged_redirect() {
    let response = Denial::LoginRequired.into_response();
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers()["location"], LOGIN_PATH);
    assert_eq!(response.headers()[&X_AUTH_REQUIRED], "true");
}

// =============================================================================
// ensure_admin / ensure_account
// =============================================================================

#[test]
fn admin_role_passes_admin_guard() {
    assert_eq!(ensure_admin(&admin_user()), Ok(()));
}

#[test]
fn non_admin_gets_empty_redirect() {
    let verdict = ensure_admin(&account_user(Verification::Yes));
    assert_eq!(verdict, Err(Denial::Redirect("")));
    let response = Denial::Redirect(ADMIN_DENIED_REDIRECT).into_response();
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers()["location"], "");
    assert!(response.headers().get(&X_AUTH_REQUIRED).is_none());
}

#[test]
fn user_without_account_goes_home() {
    assert_eq!(ensure_account(&admin_user(), false, "/account/"), Err(Denial::Redirect("/")));
    assert_eq!(
        ensure_account(&plain_user(Roles::default()), true, "/account/"),
        Err(Denial::Redirect("/"))
    );
}

#[test]
fn verified_account_passes_when_verification_required() {
    assert_eq!(ensure_account(&account_user(Verification::Yes), true, "/account/"), Ok(()));
}

#[test]
fn unverified_account_passes_when_verification_off() {
    assert_eq!(ensure_account(&account_user(Verification::No), false, "/account/settings/"), Ok(()));
}

#[test]
fn unverified_account_is_sent_to_verification() {
    assert_eq!(
        ensure_account(&account_user(Verification::No), true, "/account/settings/"),
        Err(Denial::Redirect(VERIFICATION_PATH))
    );
}

#[test]
fn verification_pages_stay_reachable_while_unverified() {
    let user = account_user(Verification::No);
    assert_eq!(ensure_account(&user, true, "/account/verification/"), Ok(()));
    assert_eq!(ensure_account(&user, true, "/account/verification/abc123/"), Ok(()));
}

#[test]
fn verification_exemption_needs_exact_spelling() {
    let user = account_user(Verification::No);
    assert_eq!(
        ensure_account(&user, true, "/account/verification"),
        Err(Denial::Redirect(VERIFICATION_PATH))
    );
    assert_eq!(
        ensure_account(&user, true, "/Account/Verification/"),
        Err(Denial::Redirect(VERIFICATION_PATH))
    );
}

// =============================================================================
// evaluate
// =============================================================================

#[test]
fn evaluate_stops_at_authentication() {
    let session = Session::fresh();
    let verdict = evaluate(Area::Account, &CurrentUser(None), &session, "/account/", "/account/", true);
    assert_eq!(verdict, Err(Denial::LoginRequired));
    assert_eq!(session.return_url().as_deref(), Some("/account/"));
}

#[test]
fn evaluate_admin_area_checks_admin_role() {
    let session = Session::fresh();
    let user = CurrentUser(Some(account_user(Verification::Yes)));
    assert_eq!(
        evaluate(Area::Admin, &user, &session, "/admin/", "/admin/", false),
        Err(Denial::Redirect(ADMIN_DENIED_REDIRECT))
    );
}

#[test]
fn evaluate_account_area_checks_verification() {
    let session = Session::fresh();
    let user = CurrentUser(Some(account_user(Verification::No)));
    assert_eq!(
        evaluate(Area::Account, &user, &session, "/account/", "/account/", true),
        Err(Denial::Redirect(VERIFICATION_PATH))
    );
    assert_eq!(evaluate(Area::Account, &user, &session, "/account/", "/account/", false), Ok(()));
}

#[test]
fn dual_role_user_passes_both_areas() {
    let user = CurrentUser(Some(dual_role_user()));
    let session = Session::fresh();
    assert_eq!(evaluate(Area::Admin, &user, &session, "/admin/", "/admin/", true), Ok(()));
    assert_eq!(evaluate(Area::Account, &user, &session, "/account/", "/account/", true), Ok(()));
}
