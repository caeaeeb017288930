use axum::http::StatusCode;

use crate::tests::helper;

#[tokio::test]
async fn test_clear_default_fallback() {
    let mut app = helper::setup_test_app().await;

    let (status_code, cleared) = helper::clear_default_fallback(&mut app).await;
    assert_eq!(StatusCode::OK, status_code);
    assert_eq!(1, cleared);

    let (status_code, cleared) = helper::clear_default_fallback(&mut app).await;
    assert_eq!(StatusCode::OK, status_code);
    assert_eq!(0, cleared);

    // nothing to fall back on
    let (status_code, _, _) = helper::root(&mut app, Some("doesnotexist"), None).await;
    assert_eq!(StatusCode::INTERNAL_SERVER_ERROR, status_code);

    // explicit fallbacks and regular aliases still work
    let (status_code, location, _) =
        helper::root(&mut app, Some("doesnotexist"), Some("g")).await;
    assert_eq!(StatusCode::TEMPORARY_REDIRECT, status_code);
    assert_eq!(
        Some("https://www.google.com/search?q=doesnotexist".to_string()),
        location
    );

    let (status_code, _, _) = helper::root(&mut app, Some("w hare"), None).await;
    assert_eq!(StatusCode::TEMPORARY_REDIRECT, status_code);
}

#[tokio::test]
async fn test_replace_default_fallback() {
    let mut app = helper::setup_empty_test_app().await;

    for (url, alias) in [
        ("https://duckduckgo.com/?q={}", "ddg"),
        ("https://www.google.com/search?q={}", "g"),
        ("https://www.bing.com/search?q={}", "bing"),
    ] {
        let (status_code, _, _) =
            helper::maybe_create_destination(&mut app, url, &[alias], true, true).await;
        assert_eq!(StatusCode::CREATED, status_code);

        let (_, destinations) = helper::list_destinations(&mut app).await;
        let defaults = destinations
            .iter()
            .filter(|destination| destination.is_default_fallback)
            .map(|destination| destination.url.as_str())
            .collect::<Vec<_>>();
        assert_eq!(vec![url], defaults);
    }
}

#[tokio::test]
async fn test_health() {
    let mut app = helper::setup_test_app().await;

    let (status_code, status) = helper::health(&mut app).await;
    assert_eq!(StatusCode::OK, status_code);
    assert_eq!("ok", status);
}
