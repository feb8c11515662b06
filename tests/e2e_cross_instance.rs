//! E2E tests for cross-instance URL resolution

mod common;

use common::{FakeTransport, actor, note, test_config, webfinger};
use fedi_lookup::service::CrossInstanceResolver;
use fedi_lookup::{Resolution, ResolveError, Resolver};
use serde_json::json;

const BOB: &str = "https://b.example/users/bob";
const CROSS_URL: &str = "https://a.example/@bob@b.example/42";

const EXPANDED: [&str; 6] = [
    "https://b.example/@bob/42",
    "https://b.example/users/bob/statuses/42",
    "https://b.example/notice/42",
    "https://b.example/notes/42",
    "https://b.example/display/42",
    "https://b.example/item/42",
];

#[tokio::test]
async fn test_templates_tried_in_order_until_success() {
    let transport = FakeTransport::new();
    transport
        .json(BOB, actor(BOB))
        .json(EXPANDED[1], note(EXPANDED[1], BOB, "original post"));

    let resolver = Resolver::with_transport(transport, test_config());
    let resolution = resolver.resolve(CROSS_URL).await.unwrap();

    let Resolution::Object(object) = resolution else {
        panic!("expected an object");
    };
    assert_eq!(object.url.as_str(), EXPANDED[1]);

    let urls = resolver.transport().requested_urls();
    assert_eq!(urls[0], EXPANDED[0]);
    assert_eq!(urls[1], EXPANDED[1]);
    assert!(!urls.iter().any(|url| url.starts_with("https://a.example")));
    for later in &EXPANDED[2..] {
        assert!(!urls.contains(&later.to_string()), "{later} should not be tried");
    }
}

#[tokio::test]
async fn test_all_templates_failing_names_origin_host() {
    let transport = FakeTransport::new();

    let resolver = Resolver::with_transport(transport, test_config());
    let error = resolver.resolve(CROSS_URL).await.unwrap_err();

    assert!(error.to_string().contains("b.example"));
    match error {
        ResolveError::CrossInstanceUnresolved {
            host,
            attempts,
            last_error,
        } => {
            assert_eq!(host, "b.example");
            assert_eq!(attempts, 6);
            assert!(matches!(
                last_error.as_deref(),
                Some(ResolveError::FetchFailed { status: 404, .. })
            ));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    assert_eq!(resolver.transport().requested_urls(), EXPANDED.map(String::from));
}

#[tokio::test]
async fn test_author_mismatch_is_accepted() {
    let mallory = "https://b.example/users/mallory";

    let transport = FakeTransport::new();
    transport
        .json(BOB, actor(BOB))
        .json(mallory, actor(mallory))
        .json(EXPANDED[0], note(EXPANDED[0], mallory, "not bob"));

    let resolver = Resolver::with_transport(transport, test_config());
    let output = resolver.resolve_and_render(CROSS_URL).await.unwrap();

    assert!(output.contains(&format!("Author: {}", mallory)));
}

#[tokio::test]
async fn test_cross_instance_result_skips_canonical_following() {
    let moved = "https://b.example/objects/7c1f";

    let transport = FakeTransport::new();
    transport
        .json(BOB, actor(BOB))
        .json(EXPANDED[0], note(moved, BOB, "hello"));

    let resolver = Resolver::with_transport(transport, test_config());
    let resolution = resolver.resolve(CROSS_URL).await.unwrap();

    let Resolution::Object(object) = resolution else {
        panic!("expected an object");
    };
    assert_eq!(object.url.as_str(), EXPANDED[0]);
    assert!(!resolver.transport().requested_urls().contains(&moved.to_string()));
}

#[tokio::test]
async fn test_custom_templates_are_used() {
    let custom = "https://b.example/objects/bob-42";

    let mut config = test_config();
    config.resolver.cross_instance_templates = vec!["https://{host}/objects/{user}-{id}".to_string()];

    let transport = FakeTransport::new();
    transport
        .json(BOB, actor(BOB))
        .json(custom, note(custom, BOB, "hello"));

    let resolver = Resolver::with_transport(transport, config);
    let resolution = resolver.resolve(CROSS_URL).await.unwrap();

    assert_eq!(resolution.document().get("id"), Some(&json!(custom)));
    assert_eq!(resolver.transport().requested_urls()[0], custom);
}

#[tokio::test]
async fn test_actor_guess_falls_back_to_webfinger() {
    let config = test_config();
    let transport = FakeTransport::new();
    transport.json(
        &webfinger("bob", "b.example"),
        json!({
            "subject": "acct:bob@b.example",
            "links": [{ "rel": "self", "type": "application/activity+json", "href": BOB }],
        }),
    );

    let guessed = CrossInstanceResolver::new(&transport, &config)
        .guess_actor_url("bob", "b.example")
        .await;

    assert_eq!(guessed.as_ref().map(|url| url.as_str()), Some(BOB));
    assert_eq!(
        transport.requested_urls(),
        vec![
            "https://b.example/users/bob".to_string(),
            "https://b.example/user/bob".to_string(),
            "https://b.example/accounts/bob".to_string(),
            "https://b.example/profile/bob".to_string(),
            webfinger("bob", "b.example"),
        ]
    );
}

#[tokio::test]
async fn test_actor_guess_stops_at_first_actor_document() {
    let config = test_config();
    let transport = FakeTransport::new();
    transport.json(BOB, actor(BOB));

    let guessed = CrossInstanceResolver::new(&transport, &config)
        .guess_actor_url("bob", "b.example")
        .await;

    assert_eq!(guessed.as_ref().map(|url| url.as_str()), Some(BOB));
    assert_eq!(transport.requested_urls(), vec![BOB.to_string()]);
}

#[tokio::test]
async fn test_author_confirmation_is_not_paced() {
    let profile = "https://b.example/profile/bob";

    let mut config = test_config();
    config.resolver.attempt_delay_ms = 60_000;

    let transport = FakeTransport::new();
    transport
        .json(profile, actor(profile))
        .json(EXPANDED[0], note(EXPANDED[0], profile, "hello"));

    let resolver = Resolver::with_transport(transport, config);
    let resolution = tokio::time::timeout(
        std::time::Duration::from_secs(30),
        resolver.resolve(CROSS_URL),
    )
    .await
    .expect("confirmation must not wait between actor guesses")
    .unwrap();

    assert!(matches!(resolution, Resolution::Object(_)));
    let urls = resolver.transport().requested_urls();
    assert!(urls.contains(&"https://b.example/accounts/bob".to_string()));
    assert_eq!(urls.iter().filter(|url| url.as_str() == profile).count(), 2);
}
